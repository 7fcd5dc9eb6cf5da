// src/services/loan_service.rs

use std::sync::Arc;

use chrono::NaiveDateTime;
use sqlx::PgPool;

use crate::{
    common::{cache::TtlCache, datetime, error::AppError, rfid::normalize_read_code, stats::percent},
    db::{LoanRepository, TagRepository},
    models::{
        loan::{AvailabilityReason, Loan, LoanFilters, LoanStatistics, PendingLoan, ToolAvailability},
        pagination::{PageRequest, Paginated},
    },
};

const HISTORY_LIMIT: i64 = 1000;
const RANKING_SIZE: i64 = 10;
const ALERT_AFTER_DAYS: i64 = 7;

#[derive(Clone)]
pub struct LoanService {
    pool: PgPool,
    repo: LoanRepository,
    tag_repo: TagRepository,
    cache: Arc<TtlCache>,
}

impl LoanService {
    pub fn new(pool: PgPool, repo: LoanRepository, tag_repo: TagRepository, cache: Arc<TtlCache>) -> Self {
        Self {
            pool,
            repo,
            tag_repo,
            cache,
        }
    }

    /// Empresta a ferramenta. A etiqueta fica travada durante a checagem,
    /// então dois pedidos simultâneos não geram dois empréstimos ativos.
    pub async fn create_loan(
        &self,
        id_colaborador: i32,
        etiqueta_hex: &str,
        observacao: Option<&str>,
    ) -> Result<Loan, AppError> {
        let etiqueta_hex = normalize_read_code(etiqueta_hex);
        let mut tx = self.pool.begin().await?;

        let tag = self
            .tag_repo
            .find_by_hex_for_update(&mut *tx, &etiqueta_hex)
            .await?
            .filter(|t| t.ativa)
            .ok_or_else(|| AppError::bad_request("Etiqueta não encontrada ou está destruída"))?;

        if let Some(active) = self.repo.find_active_by_tag(&mut *tx, &tag.etiqueta_hex).await? {
            return Err(AppError::conflict(format!(
                "Ferramenta já está emprestada para o colaborador ID {}",
                active.id_colaborador
            )));
        }

        let observacao = observacao.map(str::trim).unwrap_or_default();
        let id = self
            .repo
            .create(&mut *tx, id_colaborador, &tag.etiqueta_hex, observacao)
            .await?;
        let loan = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("empréstimo {id} sumiu logo após o INSERT"))?;
        tx.commit().await?;
        self.cache.clear();

        tracing::info!(
            id,
            id_colaborador,
            etiqueta = %loan.etiqueta_hex,
            "✅ Empréstimo registrado"
        );
        Ok(loan)
    }

    pub async fn get_loan(&self, id: i32) -> Result<Loan, AppError> {
        self.repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::not_found("Empréstimo não encontrado"))
    }

    pub async fn return_loan(&self, id: i32, observacao: Option<&str>) -> Result<Loan, AppError> {
        let observacao = observacao.map(str::trim).filter(|o| !o.is_empty());
        let mut tx = self.pool.begin().await?;

        let existing = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Empréstimo não encontrado"))?;
        if existing.data_devolucao.is_some() {
            return Err(AppError::bad_request("Este empréstimo já foi devolvido"));
        }

        self.repo
            .mark_returned(&mut *tx, id, observacao)
            .await?
            .ok_or_else(|| AppError::bad_request("Este empréstimo já foi devolvido"))?;
        let loan = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Empréstimo não encontrado"))?;
        tx.commit().await?;
        self.cache.clear();

        tracing::info!(id, etiqueta = %loan.etiqueta_hex, "Devolução registrada");
        Ok(loan)
    }

    pub async fn list_loans(
        &self,
        filters: LoanFilters,
        page: PageRequest,
        force_refresh: bool,
    ) -> Result<Paginated<Loan>, AppError> {
        let key = TtlCache::key("emprestimos", &(&filters, page));
        if !force_refresh {
            if let Some(mut cached) = self.cache.get::<Paginated<Loan>>(&key) {
                cached.from_cache = true;
                return Ok(cached);
            }
        }

        let (loans, total) = self.repo.list(&filters, page).await?;
        let result = page.wrap(loans, total);
        self.cache.insert(key, &result);
        Ok(result)
    }

    pub async fn active_by_collaborator(&self, id_colaborador: i32) -> Result<Vec<Loan>, AppError> {
        self.repo.active_by_collaborator(id_colaborador).await
    }

    pub async fn tool_history(&self, etiqueta_hex: &str) -> Result<Vec<Loan>, AppError> {
        self.repo
            .history_by_tag(&normalize_read_code(etiqueta_hex), HISTORY_LIMIT)
            .await
    }

    pub async fn availability(&self, etiqueta_hex: &str) -> Result<ToolAvailability, AppError> {
        let etiqueta_hex = normalize_read_code(etiqueta_hex);

        let Some(tag) = self.tag_repo.find_by_hex(&self.pool, &etiqueta_hex).await? else {
            return Ok(ToolAvailability {
                etiqueta_hex,
                disponivel: false,
                motivo: AvailabilityReason::NaoCadastrada,
                descricao: None,
                emprestimo_ativo: None,
            });
        };

        let active = self.repo.find_active_by_tag(&self.pool, &etiqueta_hex).await?;
        let motivo = if !tag.ativa {
            AvailabilityReason::Destruida
        } else if active.is_some() {
            AvailabilityReason::Emprestada
        } else {
            AvailabilityReason::Disponivel
        };

        Ok(ToolAvailability {
            etiqueta_hex,
            disponivel: motivo == AvailabilityReason::Disponivel,
            motivo,
            descricao: tag.descricao,
            emprestimo_ativo: active,
        })
    }

    pub async fn statistics(&self, force_refresh: bool) -> Result<LoanStatistics, AppError> {
        let key = TtlCache::key("emprestimos_estatisticas", &());
        if !force_refresh {
            if let Some(mut cached) = self.cache.get::<LoanStatistics>(&key) {
                cached.from_cache = true;
                return Ok(cached);
            }
        }

        let (total, ativos) = self.repo.counts().await?;
        let stats = LoanStatistics {
            total,
            ativos,
            devolvidos: total - ativos,
            percentual_ativos: percent(ativos, total),
            ferramentas_mais_emprestadas: self.repo.most_loaned_tools(RANKING_SIZE).await?,
            colaboradores_com_emprestimos: self
                .repo
                .collaborators_with_active_loans(RANKING_SIZE)
                .await?,
            from_cache: false,
        };
        self.cache.insert(key, &stats);
        Ok(stats)
    }

    pub async fn pending(&self) -> Result<Vec<PendingLoan>, AppError> {
        let now = datetime::now();
        let loans = self.repo.pending().await?;
        Ok(loans
            .into_iter()
            .map(|loan| pending_loan(loan, now))
            .collect())
    }
}

fn pending_loan(loan: Loan, now: NaiveDateTime) -> PendingLoan {
    let (dias, tempo_decorrido) = elapsed_label(loan.data_emprestimo, now);
    PendingLoan {
        emprestimo: loan,
        dias,
        tempo_decorrido,
        alerta: dias > ALERT_AFTER_DAYS,
    }
}

/// Tempo desde o empréstimo, em dias completos e horas restantes.
fn elapsed_label(desde: NaiveDateTime, agora: NaiveDateTime) -> (i64, String) {
    let elapsed = (agora - desde).max(chrono::TimeDelta::zero());
    let dias = elapsed.num_days();
    let horas = elapsed.num_hours() - dias * 24;

    let label = if dias > 0 {
        format!("{dias} dia(s) e {horas} hora(s)")
    } else {
        format!("{horas} hora(s)")
    };
    (dias, label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, 15, 0)
            .unwrap()
    }

    fn loan(data_emprestimo: NaiveDateTime) -> Loan {
        Loan {
            id: 1,
            id_colaborador: 42,
            etiqueta_hex: "AAA0AAAA0000000000000001".into(),
            data_emprestimo,
            data_devolucao: None,
            observacao: String::new(),
            descricao_ferramenta: Some("Furadeira".into()),
            status: "ativo".into(),
            data_emprestimo_formatada: String::new(),
            data_devolucao_formatada: None,
        }
    }

    #[test]
    fn elapsed_under_a_day_shows_hours_only() {
        assert_eq!(elapsed_label(at(1, 8), at(1, 13)), (0, "5 hora(s)".to_string()));
    }

    #[test]
    fn elapsed_with_days_and_hours() {
        assert_eq!(
            elapsed_label(at(1, 8), at(3, 11)),
            (2, "2 dia(s) e 3 hora(s)".to_string())
        );
    }

    #[test]
    fn clock_skew_does_not_go_negative() {
        assert_eq!(elapsed_label(at(3, 8), at(1, 8)), (0, "0 hora(s)".to_string()));
    }

    #[test]
    fn alert_only_after_seven_full_days() {
        assert!(!pending_loan(loan(at(1, 8)), at(8, 9)).alerta);
        assert!(pending_loan(loan(at(1, 8)), at(9, 9)).alerta);
    }

    mod with_database {
        use sqlx::PgPool;

        use super::super::*;
        use crate::{
            config::{AppState, Settings},
            models::tag::NewTag,
        };

        const CODE: &str = "AAA0AAAA0000000000000077";

        #[sqlx::test(migrations = "./migrations")]
        async fn second_loan_of_the_same_tool_is_a_conflict(pool: PgPool) {
            let state = AppState::with_pool(pool, Settings::for_tests());
            state
                .tag_service
                .create_tag(NewTag::sample(CODE, "Esmerilhadeira"))
                .await
                .unwrap();
            let loans = &state.loan_service;

            let first = loans.create_loan(1, CODE, Some("  obra 12 ")).await.unwrap();
            assert_eq!(first.status, "ativo");
            assert_eq!(first.observacao, "obra 12");
            assert_eq!(first.descricao_ferramenta.as_deref(), Some("Esmerilhadeira"));

            match loans.create_loan(2, CODE, None).await {
                Err(AppError::Conflict(msg)) => assert!(msg.contains("ID 1"), "{msg}"),
                other => panic!("esperava Conflict, veio {other:?}"),
            }

            let returned = loans.return_loan(first.id, None).await.unwrap();
            assert_eq!(returned.status, "devolvido");
            assert!(returned.data_devolucao.is_some());
            assert!(matches!(
                loans.return_loan(first.id, None).await,
                Err(AppError::BadRequest(_))
            ));

            let second = loans.create_loan(2, CODE, None).await.unwrap();
            assert_eq!(second.id_colaborador, 2);
            assert_eq!(loans.tool_history(CODE).await.unwrap().len(), 2);
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn unknown_or_destroyed_tool_cannot_be_loaned(pool: PgPool) {
            let state = AppState::with_pool(pool, Settings::for_tests());

            assert!(matches!(
                state.loan_service.create_loan(1, CODE, None).await,
                Err(AppError::BadRequest(_))
            ));

            let tag = state
                .tag_service
                .create_tag(NewTag::sample(CODE, "Serra tico-tico"))
                .await
                .unwrap();
            state.tag_service.destroy_tag(tag.id).await.unwrap();

            assert!(matches!(
                state.loan_service.create_loan(1, CODE, None).await,
                Err(AppError::BadRequest(_))
            ));
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn listing_respects_limit_and_offset(pool: PgPool) {
            let state = AppState::with_pool(pool, Settings::for_tests());
            for n in 1..=4 {
                let code = format!("AAA0AAAA00000000000000{n:02}");
                state
                    .tag_service
                    .create_tag(NewTag::sample(&code, "Alicate"))
                    .await
                    .unwrap();
                state.loan_service.create_loan(n, &code, None).await.unwrap();
            }

            let filters = LoanFilters {
                id_colaborador: None,
                etiqueta: None,
                status: None,
                data_inicio: None,
                data_fim: None,
            };
            let page = PageRequest::resolve(Some(3), Some(2), 20, 1000).unwrap();
            let listed = state.loan_service.list_loans(filters, page, true).await.unwrap();

            assert_eq!(listed.total, 4);
            assert_eq!(listed.itens.len(), 2);
        }
    }
}
