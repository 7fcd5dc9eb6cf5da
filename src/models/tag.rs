// src/models/tag.rs

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// --- Etiqueta RFID ---
// `destruida` é o marcador de exclusão lógica: NULL = ativa.
// A foto não vem nas listagens, só o indicador `temFoto`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: i32,
    #[schema(example = "AAA0AAAA0000000000001A2B")]
    pub etiqueta_hex: String,
    pub descricao: Option<String>,
    pub numero_serie: Option<String>,
    pub numero_patrimonio: Option<String>,
    pub destruida: Option<NaiveDateTime>,
    pub criada_em: NaiveDateTime,
    pub ativa: bool,
    pub tem_foto: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagFilters {
    pub etiqueta: Option<String>,
    pub descricao: Option<String>,
    pub destruida: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewTag {
    pub etiqueta_hex: String,
    pub descricao: Option<String>,
    pub numero_serie: Option<String>,
    pub numero_patrimonio: Option<String>,
    pub foto: Option<Vec<u8>>,
}

#[cfg(test)]
impl NewTag {
    pub fn sample(etiqueta_hex: &str, descricao: &str) -> Self {
        Self {
            etiqueta_hex: etiqueta_hex.to_string(),
            descricao: Some(descricao.to_string()),
            numero_serie: None,
            numero_patrimonio: None,
            foto: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TagChanges {
    pub descricao: Option<String>,
    pub numero_serie: Option<String>,
    pub numero_patrimonio: Option<String>,
    pub foto: Option<Vec<u8>>,
}

impl TagChanges {
    pub fn is_empty(&self) -> bool {
        self.descricao.is_none()
            && self.numero_serie.is_none()
            && self.numero_patrimonio.is_none()
            && self.foto.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TagStatistics {
    pub total: i64,
    pub ativas: i64,
    pub destruidas: i64,
    #[schema(value_type = f64)]
    pub percentual_ativas: Decimal,
    pub from_cache: bool,
}
