// src/services/ping_service.rs

use std::sync::Arc;

use chrono::{NaiveDateTime, TimeDelta};

use crate::{
    common::{
        cache::TtlCache,
        datetime::{self, format_br},
        error::AppError,
        rfid::normalize_read_code,
    },
    db::PingRepository,
    models::{
        pagination::{PageRequest, Paginated},
        ping::{
            Period, PhotoInfo, Ping, PingFilters, PingStatistics, ReaderAntennas, RecentPings,
        },
    },
};

pub const MAX_RECENT_MINUTES: i64 = 1440;
pub const MAX_RECENT_LIMIT: i64 = 200;

const NO_PING: &str = "--";

#[derive(Clone)]
pub struct PingService {
    repo: PingRepository,
    cache: Arc<TtlCache>,
}

impl PingService {
    pub fn new(repo: PingRepository, cache: Arc<TtlCache>) -> Self {
        Self { repo, cache }
    }

    /// Lista os pings. O total fica em cache separado, sem a paginação, e só é
    /// recontado na primeira página ou quando o cliente força a atualização.
    pub async fn list_pings(
        &self,
        filters: PingFilters,
        page: PageRequest,
        force_refresh: bool,
    ) -> Result<Paginated<Ping>, AppError> {
        let key = TtlCache::key("ping", &(&filters, page));
        if !force_refresh {
            if let Some(mut cached) = self.cache.get::<Paginated<Ping>>(&key) {
                cached.from_cache = true;
                return Ok(cached);
            }
        }

        let count_key = TtlCache::key("ping_total", &filters);
        let cached_total = if force_refresh || page.offset == 0 {
            None
        } else {
            self.cache.get::<i64>(&count_key)
        };
        let total = match cached_total {
            Some(total) => total,
            None => {
                let total = self.repo.count(&filters).await?;
                self.cache.insert(count_key, &total);
                total
            }
        };

        let pings = self.repo.list(&filters, page).await?;
        let result = page.wrap(pings, total);
        self.cache.insert(key, &result);
        Ok(result)
    }

    pub async fn statistics(&self, force_refresh: bool) -> Result<PingStatistics, AppError> {
        let key = TtlCache::key("ping_estatisticas", &());
        if !force_refresh {
            if let Some(mut cached) = self.cache.get::<PingStatistics>(&key) {
                cached.from_cache = true;
                return Ok(cached);
            }
        }

        let (total_pings, pings_unicos, antenas_unicas, primeiro, ultimo) = self.repo.totals().await?;
        let stats = PingStatistics {
            total_pings,
            pings_unicos,
            antenas_unicas,
            primeiro_ping: format_or_dash(primeiro),
            ultimo_ping: format_or_dash(ultimo),
            from_cache: false,
        };
        self.cache.insert(key, &stats);
        Ok(stats)
    }

    pub async fn tag_history(&self, etiqueta_hex: &str, limite: i64) -> Result<Vec<Ping>, AppError> {
        self.repo.by_tag(&normalize_read_code(etiqueta_hex), limite).await
    }

    /// Pings dos últimos `minutos`. Sempre consulta o banco.
    pub async fn recent(&self, minutos: i64, limite: i64) -> Result<RecentPings, AppError> {
        if !(1..=MAX_RECENT_MINUTES).contains(&minutos) {
            return Err(AppError::bad_request(format!(
                "O período deve estar entre 1 e {MAX_RECENT_MINUTES} minutos"
            )));
        }
        let page = PageRequest::resolve(Some(limite), None, limite, MAX_RECENT_LIMIT)?;

        let fim = datetime::now();
        let inicio = fim - TimeDelta::minutes(minutos);
        let filters = PingFilters {
            etiqueta: None,
            antena: None,
            codigo_leitor: None,
            horario_inicio: Some(inicio),
            horario_fim: None,
        };

        let total = self.repo.count(&filters).await?;
        let itens = self.repo.list(&filters, page).await?;
        Ok(RecentPings {
            itens,
            total,
            periodo: Period { inicio, fim, minutos },
        })
    }

    pub async fn antennas(&self, force_refresh: bool) -> Result<Vec<ReaderAntennas>, AppError> {
        let key = TtlCache::key("ping_antenas", &());
        if !force_refresh {
            if let Some(cached) = self.cache.get::<Vec<ReaderAntennas>>(&key) {
                return Ok(cached);
            }
        }

        let antennas = self.repo.antennas().await?;
        self.cache.insert(key, &antennas);
        Ok(antennas)
    }

    pub async fn latest_photo(&self, etiqueta_hex: &str) -> Result<Vec<u8>, AppError> {
        self.repo
            .latest_photo_by_tag(&normalize_read_code(etiqueta_hex))
            .await?
            .ok_or_else(photo_not_found)
    }

    pub async fn photo_at(
        &self,
        codigo_leitor: &str,
        antena: i32,
        horario: NaiveDateTime,
    ) -> Result<Vec<u8>, AppError> {
        self.repo
            .photo_at(codigo_leitor.trim(), antena, horario)
            .await?
            .ok_or_else(photo_not_found)
    }

    pub async fn photo_info(&self, etiqueta_hex: &str) -> Result<PhotoInfo, AppError> {
        self.repo.photo_info(&normalize_read_code(etiqueta_hex)).await
    }
}

fn photo_not_found() -> AppError {
    AppError::not_found("Foto não encontrada")
}

fn format_or_dash(value: Option<NaiveDateTime>) -> String {
    value.map(format_br).unwrap_or_else(|| NO_PING.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn missing_dates_render_as_dash() {
        assert_eq!(format_or_dash(None), "--");

        let dt = NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(format_or_dash(Some(dt)), "02/01/2025 03:04:05");
    }
}
