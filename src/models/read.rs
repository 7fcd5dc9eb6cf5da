// src/models/read.rs

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::models::ping::Period;

// --- Leitura bruta de uma antena ---
// Vem sempre cruzada com o cadastro de etiquetas.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Read {
    pub id: i64,
    pub codigo_leitor: String,
    pub horario: NaiveDateTime,
    pub antena: i32,
    pub etiqueta_hex: String,
    pub rssi: i32,
    pub tem_foto: bool,
    #[schema(example = "Furadeira de impacto")]
    pub descricao_equipamento: String,
    /// `ativa`, `destruida` ou `nao_cadastrada`
    pub status_etiqueta: String,
    #[schema(example = "05/03/2025 14:30:12")]
    pub horario_formatado: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadFilters {
    pub etiqueta: Option<String>,
    pub antena: Option<i32>,
    pub horario_inicio: Option<NaiveDateTime>,
    pub horario_fim: Option<NaiveDateTime>,
}

/// Leitura já normalizada, pronta para gravar.
#[derive(Debug, Clone)]
pub struct NewRead {
    pub codigo_leitor: String,
    pub horario: NaiveDateTime,
    pub antena: i32,
    pub etiqueta_hex: String,
    pub rssi: i32,
    pub foto: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadStatistics {
    pub etiquetas_unicas: i64,
    pub total_leituras: i64,
    pub antenas_unicas: i64,
    pub dias_com_leitura: i64,
    pub primeira_leitura: Option<NaiveDateTime>,
    pub ultima_leitura: Option<NaiveDateTime>,
    pub etiquetas_cadastradas: i64,
    pub etiquetas_nao_cadastradas: i64,
    #[sqlx(default)]
    pub from_cache: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecentReads {
    pub itens: Vec<Read>,
    pub total: i64,
    pub periodo: Period,
}
