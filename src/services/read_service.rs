// src/services/read_service.rs

use std::sync::Arc;

use chrono::TimeDelta;

use crate::{
    common::{
        cache::TtlCache,
        datetime,
        error::AppError,
        rfid::{is_ping_code, normalize_read_code},
    },
    db::ReadRepository,
    models::{
        pagination::{PageRequest, Paginated},
        ping::Period,
        read::{NewRead, Read, ReadFilters, ReadStatistics, RecentReads},
    },
};

pub const MAX_RECENT_MINUTES: i64 = 1440;
pub const MAX_RECENT_LIMIT: i64 = 200;

#[derive(Clone)]
pub struct ReadService {
    repo: ReadRepository,
    cache: Arc<TtlCache>,
    // pings moram na mesma tabela
    ping_cache: Arc<TtlCache>,
}

impl ReadService {
    pub fn new(repo: ReadRepository, cache: Arc<TtlCache>, ping_cache: Arc<TtlCache>) -> Self {
        Self {
            repo,
            cache,
            ping_cache,
        }
    }

    pub async fn ingest(&self, reads: Vec<NewRead>) -> Result<u64, AppError> {
        let reads: Vec<NewRead> = reads
            .into_iter()
            .map(|mut read| {
                read.codigo_leitor = read.codigo_leitor.trim().to_string();
                read.etiqueta_hex = normalize_read_code(&read.etiqueta_hex);
                read
            })
            .collect();

        if let Some(read) = reads.iter().find(|r| r.etiqueta_hex.is_empty() || r.codigo_leitor.is_empty()) {
            return Err(AppError::bad_request(format!(
                "Leitura sem código de etiqueta ou de leitor (antena {})",
                read.antena
            )));
        }

        let pings = reads.iter().filter(|r| is_ping_code(&r.etiqueta_hex)).count();
        let total = reads.len();
        let inseridas = self.repo.insert_batch(reads).await?;

        self.cache.clear();
        if pings > 0 {
            self.ping_cache.clear();
        }

        tracing::info!(recebidas = total, inseridas, pings, "Leituras registradas");
        Ok(inseridas)
    }

    pub async fn list_reads(
        &self,
        filters: ReadFilters,
        page: PageRequest,
        force_refresh: bool,
    ) -> Result<Paginated<Read>, AppError> {
        let key = TtlCache::key("leituras", &(&filters, page));
        if !force_refresh {
            if let Some(mut cached) = self.cache.get::<Paginated<Read>>(&key) {
                cached.from_cache = true;
                return Ok(cached);
            }
        }

        let (reads, total) = self.repo.list(&filters, page).await?;
        let result = page.wrap(reads, total);
        self.cache.insert(key, &result);
        Ok(result)
    }

    pub async fn statistics(
        &self,
        filters: ReadFilters,
        force_refresh: bool,
    ) -> Result<ReadStatistics, AppError> {
        let key = TtlCache::key("leituras_estatisticas", &filters);
        if !force_refresh {
            if let Some(mut cached) = self.cache.get::<ReadStatistics>(&key) {
                cached.from_cache = true;
                return Ok(cached);
            }
        }

        let stats = self.repo.statistics(&filters).await?;
        self.cache.insert(key, &stats);
        Ok(stats)
    }

    pub async fn tag_history(&self, etiqueta_hex: &str, limite: i64) -> Result<Vec<Read>, AppError> {
        self.repo.by_tag(&normalize_read_code(etiqueta_hex), limite).await
    }

    /// Leituras dos últimos `minutos`, sempre direto do banco.
    pub async fn recent(
        &self,
        minutos: i64,
        etiqueta: Option<String>,
        antena: Option<i32>,
        limite: i64,
        offset: i64,
    ) -> Result<RecentReads, AppError> {
        let (minutos, page) = recent_window(minutos, limite, offset)?;

        let fim = datetime::now();
        let inicio = fim - TimeDelta::minutes(minutos);
        let filters = ReadFilters {
            etiqueta: etiqueta.filter(|e| !e.trim().is_empty()),
            antena,
            horario_inicio: Some(inicio),
            horario_fim: Some(fim),
        };

        let (itens, total) = self.repo.list(&filters, page).await?;
        Ok(RecentReads {
            itens,
            total,
            periodo: Period { inicio, fim, minutos },
        })
    }
}

// Janela acima de 24h e limite acima de 200 são reduzidos, não recusados
fn recent_window(minutos: i64, limite: i64, offset: i64) -> Result<(i64, PageRequest), AppError> {
    if minutos < 1 {
        return Err(AppError::bad_request("O período deve ser de pelo menos 1 minuto"));
    }
    let page = PageRequest::resolve(
        Some(limite.min(MAX_RECENT_LIMIT)),
        Some(offset),
        MAX_RECENT_LIMIT,
        MAX_RECENT_LIMIT,
    )?;
    Ok((minutos.min(MAX_RECENT_MINUTES), page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_window_caps_minutes_and_limit() {
        let (minutos, page) = recent_window(5000, 999, 10).unwrap();
        assert_eq!(minutos, 1440);
        assert_eq!(page, PageRequest { limite: 200, offset: 10 });

        let (minutos, page) = recent_window(15, 100, 0).unwrap();
        assert_eq!(minutos, 15);
        assert_eq!(page.limite, 100);
    }

    #[test]
    fn recent_window_rejects_empty_period_and_bad_paging() {
        assert!(recent_window(0, 100, 0).is_err());
        assert!(recent_window(10, 0, 0).is_err());
        assert!(recent_window(10, 100, -1).is_err());
    }
}
