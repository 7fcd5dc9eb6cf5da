// src/models/ping.rs

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::common::error::AppError;

// --- Ping periódico das câmeras ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ping {
    pub id: i64,
    pub codigo_leitor: String,
    pub horario: NaiveDateTime,
    pub antena: i32,
    pub etiqueta_hex: String,
    pub rssi: i32,
    pub tem_foto: bool,
    #[schema(example = "[CAM01] A2")]
    pub antena_completa: String,
    pub horario_formatado: String,
}

static FULL_ANTENNA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([^\]]+)\]\s*A?(\d+)$").expect("regex válida"));

/// Filtro de antena aceito pela listagem de pings: só o número (`2`, `A2`)
/// ou o rótulo completo exibido na tela (`[CAM01] A2`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AntennaFilter {
    Antenna(i32),
    ReaderAntenna { codigo_leitor: String, antena: i32 },
}

impl AntennaFilter {
    pub fn parse(value: &str) -> Result<Self, AppError> {
        let value = value.trim();
        let invalid = || AppError::bad_request(format!("Filtro de antena inválido: '{value}'"));

        if let Some(caps) = FULL_ANTENNA.captures(value) {
            let antena = caps[2].parse().map_err(|_| invalid())?;
            return Ok(AntennaFilter::ReaderAntenna {
                codigo_leitor: caps[1].trim().to_string(),
                antena,
            });
        }

        let number = value.strip_prefix(['A', 'a']).unwrap_or(value);
        number
            .parse()
            .map(AntennaFilter::Antenna)
            .map_err(|_| invalid())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PingFilters {
    pub etiqueta: Option<String>,
    pub antena: Option<AntennaFilter>,
    pub codigo_leitor: Option<String>,
    pub horario_inicio: Option<NaiveDateTime>,
    pub horario_fim: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PingStatistics {
    pub total_pings: i64,
    pub pings_unicos: i64,
    pub antenas_unicas: i64,
    /// `--` quando não há pings
    pub primeiro_ping: String,
    pub ultimo_ping: String,
    pub from_cache: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub inicio: NaiveDateTime,
    pub fim: NaiveDateTime,
    pub minutos: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecentPings {
    pub itens: Vec<Ping>,
    pub total: i64,
    pub periodo: Period,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReaderAntennas {
    pub codigo_leitor: String,
    pub antenas: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PhotoInfo {
    pub etiqueta_hex: String,
    pub tem_foto: bool,
    pub total_fotos: i64,
    pub ultima_foto: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_antenna_label() {
        assert_eq!(
            AntennaFilter::parse("[CAM01] A3").unwrap(),
            AntennaFilter::ReaderAntenna {
                codigo_leitor: "CAM01".into(),
                antena: 3
            }
        );
        assert_eq!(
            AntennaFilter::parse("[Portaria 2]4").unwrap(),
            AntennaFilter::ReaderAntenna {
                codigo_leitor: "Portaria 2".into(),
                antena: 4
            }
        );
    }

    #[test]
    fn parses_plain_antenna_number() {
        assert_eq!(AntennaFilter::parse("2").unwrap(), AntennaFilter::Antenna(2));
        assert_eq!(AntennaFilter::parse(" A7 ").unwrap(), AntennaFilter::Antenna(7));
    }

    #[test]
    fn rejects_unknown_antenna_filter() {
        assert!(AntennaFilter::parse("[CAM01]").is_err());
        assert!(AntennaFilter::parse("sala").is_err());
    }
}
