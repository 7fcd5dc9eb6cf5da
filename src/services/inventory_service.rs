// src/services/inventory_service.rs

use std::sync::Arc;

use chrono::TimeDelta;
use sqlx::PgPool;

use crate::{
    common::{
        cache::TtlCache,
        datetime,
        error::AppError,
        rfid::normalize_read_code,
        stats::{average, percent},
    },
    db::InventoryRepository,
    models::{
        inventory::{
            CollaboratorInventories, CsvReconciliation, InventoryDetails, InventoryFilters,
            InventoryItem, InventoryItems, InventoryStatistics, InventoryStatus, InventorySummary,
            ItemCounts, ItemFilters, ItemStatus,
        },
        pagination::{PageRequest, Paginated},
    },
    services::inventory_csv::{self, parse_epc_csv},
};

const TOP_COLLABORATORS: i64 = 5;
pub const MAX_STATISTICS_DAYS: i64 = 365;

#[derive(Clone)]
pub struct InventoryService {
    pool: PgPool,
    repo: InventoryRepository,
    cache: Arc<TtlCache>,
    // janela de leituras das antenas considerada na abertura
    read_window: TimeDelta,
}

impl InventoryService {
    pub fn new(pool: PgPool, repo: InventoryRepository, cache: Arc<TtlCache>, read_window_days: i64) -> Self {
        Self {
            pool,
            repo,
            cache,
            read_window: TimeDelta::days(read_window_days),
        }
    }

    /// Abre um inventário: copia as etiquetas ativas e já marca como
    /// localizadas as que alguma antena leu dentro da janela.
    pub async fn create_inventory(
        &self,
        id_colaborador: i32,
        observacao: Option<&str>,
    ) -> Result<InventorySummary, AppError> {
        let desde = datetime::now() - self.read_window;
        let mut tx = self.pool.begin().await?;

        let inventory = self
            .repo
            .create(&mut *tx, id_colaborador, observacao.map(str::trim).unwrap_or_default())
            .await?;
        let total = self.repo.snapshot_active_tags(&mut *tx, inventory.id).await?;
        let localizados = self
            .repo
            .locate_from_reads(&mut *tx, inventory.id, desde)
            .await?;
        let summary = self
            .repo
            .summary_by_id(&mut *tx, inventory.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("inventário {} sumiu logo após o INSERT", inventory.id))?;

        tx.commit().await?;
        self.cache.clear();

        tracing::info!(
            id = inventory.id,
            id_colaborador,
            total,
            localizados,
            "✅ Inventário criado"
        );
        Ok(summary)
    }

    pub async fn list_inventories(
        &self,
        filters: InventoryFilters,
        page: PageRequest,
        force_refresh: bool,
    ) -> Result<Paginated<InventorySummary>, AppError> {
        let key = TtlCache::key("inventarios", &(&filters, page));
        if !force_refresh {
            if let Some(mut cached) = self.cache.get::<Paginated<InventorySummary>>(&key) {
                cached.from_cache = true;
                return Ok(cached);
            }
        }

        let (inventories, total) = self.repo.list(&filters, page).await?;
        let result = page.wrap(inventories, total);
        self.cache.insert(key, &result);
        Ok(result)
    }

    pub async fn get_details(&self, id: i32) -> Result<InventoryDetails, AppError> {
        let inventario = self
            .repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or_else(inventory_not_found)?;
        let itens = self.repo.items(id, &ItemFilters::default()).await?;

        Ok(InventoryDetails {
            estatisticas: ItemCounts::from_items(&itens),
            inventario,
            itens,
        })
    }

    pub async fn list_items(&self, id: i32, filters: ItemFilters) -> Result<InventoryItems, AppError> {
        let inventario = self
            .repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or_else(inventory_not_found)?;
        let itens = self.repo.items(id, &filters).await?;

        Ok(InventoryItems {
            id_inventario: inventario.id,
            status_inventario: inventario.status,
            estatisticas_filtradas: ItemCounts::from_items(&itens),
            itens,
        })
    }

    /// Concilia a planilha do coletor com os itens do inventário.
    pub async fn process_csv(&self, id: i32, content: &[u8]) -> Result<CsvReconciliation, AppError> {
        // o arquivo é validado antes de abrir a transação
        let list = parse_epc_csv(content)?;
        if list.codes.is_empty() && list.erros.is_empty() {
            return Err(AppError::bad_request("Nenhuma etiqueta encontrada no arquivo CSV"));
        }

        let mut tx = self.pool.begin().await?;
        let inventory = self
            .repo
            .lock_by_id(&mut *tx, id)
            .await?
            .ok_or_else(inventory_not_found)?;
        if inventory.status == InventoryStatus::Finalizado {
            return Err(AppError::InventoryFinalized);
        }

        let roster = self.repo.roster_status(&mut *tx, id, &list.codes).await?;
        let atualizadas = self
            .repo
            .locate_from_handheld(&mut *tx, id, &list.codes)
            .await?;
        tx.commit().await?;
        self.cache.clear();

        let summary = inventory_csv::summarize(list, &roster, atualizadas);
        tracing::info!(
            id,
            processadas = summary.etiquetas_processadas,
            atualizadas = summary.etiquetas_atualizadas,
            nao_encontradas = summary.nao_encontradas.len(),
            "Planilha do coletor processada"
        );
        Ok(summary)
    }

    pub async fn set_item_status(
        &self,
        id: i32,
        etiqueta_hex: &str,
        status: ItemStatus,
        observacao: Option<&str>,
    ) -> Result<InventoryItem, AppError> {
        let etiqueta_hex = normalize_read_code(etiqueta_hex);
        let mut tx = self.pool.begin().await?;

        let inventory = self
            .repo
            .lock_by_id(&mut *tx, id)
            .await?
            .ok_or_else(inventory_not_found)?;
        if inventory.status == InventoryStatus::Finalizado {
            return Err(AppError::InventoryFinalized);
        }

        let item = self
            .repo
            .set_item_status(&mut *tx, id, &etiqueta_hex, status, observacao)
            .await?
            .ok_or_else(|| AppError::not_found("Etiqueta não faz parte deste inventário"))?;
        tx.commit().await?;
        self.cache.clear();

        tracing::info!(id, etiqueta = %etiqueta_hex, ?status, "Item do inventário atualizado manualmente");
        Ok(item)
    }

    pub async fn finalize(&self, id: i32) -> Result<InventorySummary, AppError> {
        let mut tx = self.pool.begin().await?;

        let inventory = self
            .repo
            .lock_by_id(&mut *tx, id)
            .await?
            .ok_or_else(inventory_not_found)?;
        if inventory.status == InventoryStatus::Finalizado {
            return Err(AppError::bad_request("Inventário já foi finalizado"));
        }

        self.repo.finalize(&mut *tx, id).await?;
        let summary = self
            .repo
            .summary_by_id(&mut *tx, id)
            .await?
            .ok_or_else(inventory_not_found)?;
        tx.commit().await?;
        self.cache.clear();

        tracing::info!(
            id,
            localizados = summary.itens_localizados,
            total = summary.total_itens,
            "🏁 Inventário finalizado"
        );
        Ok(summary)
    }

    pub async fn statistics(&self, dias: i64, force_refresh: bool) -> Result<InventoryStatistics, AppError> {
        if !(1..=MAX_STATISTICS_DAYS).contains(&dias) {
            return Err(AppError::bad_request(format!(
                "O período deve estar entre 1 e {MAX_STATISTICS_DAYS} dias"
            )));
        }

        let key = TtlCache::key("inventarios_estatisticas", &dias);
        if !force_refresh {
            if let Some(mut cached) = self.cache.get::<InventoryStatistics>(&key) {
                cached.from_cache = true;
                return Ok(cached);
            }
        }

        let desde = datetime::now() - TimeDelta::days(dias);
        let summaries = self.repo.summaries_since(desde).await?;
        let top = self.repo.top_collaborators(desde, TOP_COLLABORATORS).await?;
        let stats = aggregate(dias, &summaries, top);

        self.cache.insert(key, &stats);
        Ok(stats)
    }

    pub async fn latest(&self, id_colaborador: Option<i32>) -> Result<InventorySummary, AppError> {
        self.repo
            .latest(id_colaborador)
            .await?
            .ok_or_else(|| AppError::not_found("Nenhum inventário encontrado"))
    }

    pub async fn export_csv(&self, id: i32) -> Result<Vec<u8>, AppError> {
        let details = self.get_details(id).await?;
        inventory_csv::export_items(&details.itens)
    }
}

fn inventory_not_found() -> AppError {
    AppError::not_found("Inventário não encontrado")
}

fn aggregate(
    dias: i64,
    summaries: &[InventorySummary],
    top_colaboradores: Vec<CollaboratorInventories>,
) -> InventoryStatistics {
    let finalizados = summaries
        .iter()
        .filter(|s| s.inventario.status == InventoryStatus::Finalizado)
        .count() as i64;
    let total_itens: i64 = summaries.iter().map(|s| s.total_itens).sum();
    let total_localizados: i64 = summaries.iter().map(|s| s.itens_localizados).sum();
    // inventários vazios não puxam a média para baixo
    let rates: Vec<_> = summaries
        .iter()
        .filter(|s| s.total_itens > 0)
        .map(|s| percent(s.itens_localizados, s.total_itens))
        .collect();

    InventoryStatistics {
        periodo_dias: dias,
        total_inventarios: summaries.len() as i64,
        finalizados,
        em_andamento: summaries.len() as i64 - finalizados,
        total_itens,
        total_localizados,
        taxa_media_localizacao: average(&rates),
        top_colaboradores,
        from_cache: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inventory::Inventory;
    use rust_decimal::Decimal;

    fn summary(status: InventoryStatus, total: i64, localizados: i64) -> InventorySummary {
        InventorySummary {
            inventario: Inventory {
                id: 1,
                data_inventario: datetime::now(),
                id_colaborador: 3,
                observacao: String::new(),
                status,
                finalizado_em: None,
            },
            total_itens: total,
            itens_localizados: localizados,
            percentual_localizado: percent(localizados, total),
        }
    }

    #[test]
    fn aggregates_period_statistics() {
        let summaries = vec![
            summary(InventoryStatus::Finalizado, 10, 5),
            summary(InventoryStatus::Finalizado, 4, 4),
            summary(InventoryStatus::EmAndamento, 0, 0),
        ];

        let stats = aggregate(30, &summaries, vec![]);

        assert_eq!(stats.total_inventarios, 3);
        assert_eq!(stats.finalizados, 2);
        assert_eq!(stats.em_andamento, 1);
        assert_eq!(stats.total_itens, 14);
        assert_eq!(stats.total_localizados, 9);
        assert_eq!(stats.taxa_media_localizacao, Decimal::new(75, 0));
    }

    #[test]
    fn empty_period_has_zero_rate() {
        let stats = aggregate(7, &[], vec![]);
        assert_eq!(stats.total_inventarios, 0);
        assert_eq!(stats.taxa_media_localizacao, Decimal::ZERO);
    }

    mod with_database {
        use sqlx::PgPool;

        use super::super::*;
        use crate::{
            config::{AppState, Settings},
            models::{inventory::LocationOrigin, read::NewRead, tag::NewTag},
        };

        const DRILL: &str = "AAA0AAAA0000000000001A2B";
        const SAW: &str = "AAA0AAAA0000000000000002";
        const TAPE: &str = "AAA0AAAA0000000000000003";

        async fn register(state: &AppState, codes: &[(&str, &str)]) {
            for (code, descricao) in codes {
                state
                    .tag_service
                    .create_tag(NewTag::sample(code, descricao))
                    .await
                    .unwrap();
            }
        }

        fn antenna_read(code: &str, antena: i32, rssi: i32, dias_atras: i64) -> NewRead {
            NewRead {
                codigo_leitor: "CAM01".to_string(),
                horario: datetime::now() - TimeDelta::days(dias_atras),
                antena,
                etiqueta_hex: code.to_string(),
                rssi,
                foto: None,
            }
        }

        fn item<'a>(details: &'a InventoryDetails, code: &str) -> &'a InventoryItem {
            details
                .itens
                .iter()
                .find(|i| i.etiqueta_hex == code)
                .unwrap()
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn opening_marks_tools_seen_by_antennas_in_the_window(pool: PgPool) {
            let state = AppState::with_pool(pool, Settings::for_tests());
            register(&state, &[(DRILL, "Furadeira"), (SAW, "Serra"), (TAPE, "Trena")]).await;
            state
                .read_service
                .ingest(vec![
                    antenna_read(DRILL, 1, -55, 3),
                    // mais recente, porém sem sinal
                    antenna_read(DRILL, 4, 0, 1),
                    antenna_read(SAW, 2, -60, 200),
                    antenna_read(TAPE, 3, 0, 1),
                ])
                .await
                .unwrap();

            let summary = state
                .inventory_service
                .create_inventory(9, Some(" mensal "))
                .await
                .unwrap();
            assert_eq!(summary.total_itens, 3);
            assert_eq!(summary.itens_localizados, 1);
            assert_eq!(summary.inventario.status, InventoryStatus::EmAndamento);

            let details = state
                .inventory_service
                .get_details(summary.inventario.id)
                .await
                .unwrap();
            let drill = item(&details, DRILL);
            assert_eq!(drill.status, ItemStatus::Localizado);
            assert_eq!(drill.origem, Some(LocationOrigin::Antena));
            assert_eq!(drill.antena, Some(1));
            assert_eq!(drill.codigo_leitor.as_deref(), Some("CAM01"));
            assert_eq!(item(&details, SAW).status, ItemStatus::NaoLocalizado);
            assert_eq!(item(&details, TAPE).status, ItemStatus::NaoLocalizado);
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn handheld_csv_matches_short_codes(pool: PgPool) {
            let state = AppState::with_pool(pool, Settings::for_tests());
            register(&state, &[("1a2b", "Furadeira"), (SAW, "Serra")]).await;
            let id = state
                .inventory_service
                .create_inventory(9, None)
                .await
                .unwrap()
                .inventario
                .id;

            let csv = b"EPC;Observacao\n1A2B;bancada\nAAA0AAAA0000000000000099;\nZZZ;\n";
            let first = state.inventory_service.process_csv(id, csv).await.unwrap();
            assert_eq!(first.etiquetas_processadas, 2);
            assert_eq!(first.etiquetas_atualizadas, 1);
            assert_eq!(first.ja_localizadas, 0);
            assert_eq!(first.nao_encontradas, vec!["AAA0AAAA0000000000000099"]);
            assert_eq!(first.erros.len(), 1);

            let again = state.inventory_service.process_csv(id, csv).await.unwrap();
            assert_eq!(again.etiquetas_atualizadas, 0);
            assert_eq!(again.ja_localizadas, 1);

            let details = state.inventory_service.get_details(id).await.unwrap();
            assert_eq!(item(&details, DRILL).origem, Some(LocationOrigin::LeitorMovel));
            assert_eq!(item(&details, SAW).status, ItemStatus::NaoLocalizado);
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn finalized_inventory_is_frozen(pool: PgPool) {
            let state = AppState::with_pool(pool, Settings::for_tests());
            register(&state, &[(SAW, "Serra")]).await;
            let inventories = &state.inventory_service;
            let id = inventories.create_inventory(9, None).await.unwrap().inventario.id;

            let manual = inventories
                .set_item_status(id, SAW, ItemStatus::Localizado, Some("achada no depósito"))
                .await
                .unwrap();
            assert_eq!(manual.origem, Some(LocationOrigin::Manual));

            let finalized = inventories.finalize(id).await.unwrap();
            assert_eq!(finalized.inventario.status, InventoryStatus::Finalizado);
            assert!(finalized.inventario.finalizado_em.is_some());

            assert!(matches!(
                inventories.process_csv(id, format!("EPC\n{SAW}\n").as_bytes()).await,
                Err(AppError::InventoryFinalized)
            ));
            assert!(matches!(
                inventories
                    .set_item_status(id, SAW, ItemStatus::NaoLocalizado, None)
                    .await,
                Err(AppError::InventoryFinalized)
            ));
            assert!(matches!(inventories.finalize(id).await, Err(AppError::BadRequest(_))));
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn listing_respects_limit_and_offset(pool: PgPool) {
            let state = AppState::with_pool(pool, Settings::for_tests());
            for colaborador in 1..=3 {
                state
                    .inventory_service
                    .create_inventory(colaborador, None)
                    .await
                    .unwrap();
            }

            let filters = InventoryFilters {
                status: None,
                id_colaborador: None,
                data_inicio: None,
                data_fim: None,
            };
            let page = PageRequest::resolve(Some(1), Some(1), 20, 1000).unwrap();
            let listed = state
                .inventory_service
                .list_inventories(filters, page, true)
                .await
                .unwrap();

            assert_eq!(listed.total, 3);
            assert_eq!(listed.itens.len(), 1);
        }
    }
}
