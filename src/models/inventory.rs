// src/models/inventory.rs

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::common::{error::AppError, stats::percent};

// --- 1. Enums espelhando os tipos do Postgres ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "status_inventario")]
pub enum InventoryStatus {
    #[sqlx(rename = "Em andamento")]
    #[serde(rename = "Em andamento")]
    EmAndamento,
    #[sqlx(rename = "Finalizado")]
    #[serde(rename = "Finalizado")]
    Finalizado,
}

impl InventoryStatus {
    /// Aceita apenas os dois valores exatos gravados no banco.
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "Em andamento" => Ok(InventoryStatus::EmAndamento),
            "Finalizado" => Ok(InventoryStatus::Finalizado),
            other => Err(AppError::bad_request(format!(
                "Status inválido: '{other}'. Use 'Em andamento' ou 'Finalizado'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "status_item_inventario")]
pub enum ItemStatus {
    #[sqlx(rename = "Localizado")]
    #[serde(rename = "Localizado")]
    Localizado,
    #[sqlx(rename = "Não localizado")]
    #[serde(rename = "Não localizado")]
    NaoLocalizado,
}

impl ItemStatus {
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "Localizado" => Ok(ItemStatus::Localizado),
            "Não localizado" => Ok(ItemStatus::NaoLocalizado),
            other => Err(AppError::bad_request(format!(
                "Status de item inválido: '{other}'. Use 'Localizado' ou 'Não localizado'"
            ))),
        }
    }
}

// Como o item foi localizado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "origem_localizacao")]
pub enum LocationOrigin {
    #[sqlx(rename = "Antena")]
    #[serde(rename = "Antena")]
    Antena,
    #[sqlx(rename = "Leitor móvel")]
    #[serde(rename = "Leitor móvel")]
    LeitorMovel,
    #[sqlx(rename = "Manual")]
    #[serde(rename = "Manual")]
    Manual,
}

// --- 2. Inventário (cabeçalho) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub id: i32,
    pub data_inventario: NaiveDateTime,
    pub id_colaborador: i32,
    pub observacao: String,
    pub status: InventoryStatus,
    pub finalizado_em: Option<NaiveDateTime>,
}

// Inventário com as contagens dos itens, usado nas listagens
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub inventario: Inventory,
    pub total_itens: i64,
    pub itens_localizados: i64,
    #[schema(value_type = f64)]
    pub percentual_localizado: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryFilters {
    pub status: Option<InventoryStatus>,
    pub id_colaborador: Option<i32>,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
}

// --- 3. Itens (uma linha por etiqueta do inventário) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: i32,
    pub id_inventario: i32,
    pub etiqueta_hex: String,
    pub descricao: Option<String>,
    pub status: ItemStatus,
    pub origem: Option<LocationOrigin>,
    pub codigo_leitor: Option<String>,
    pub antena: Option<i32>,
    pub data_localizacao: Option<NaiveDateTime>,
    pub observacao: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ItemFilters {
    pub status: Option<ItemStatus>,
    pub etiqueta: Option<String>,
    pub descricao: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemCounts {
    pub total: i64,
    pub localizados: i64,
    pub nao_localizados: i64,
    #[schema(value_type = f64)]
    pub percentual: Decimal,
}

impl ItemCounts {
    pub fn from_items(itens: &[InventoryItem]) -> Self {
        let total = itens.len() as i64;
        let localizados = itens
            .iter()
            .filter(|i| i.status == ItemStatus::Localizado)
            .count() as i64;

        Self {
            total,
            localizados,
            nao_localizados: total - localizados,
            percentual: percent(localizados, total),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryDetails {
    pub inventario: Inventory,
    pub itens: Vec<InventoryItem>,
    pub estatisticas: ItemCounts,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItems {
    pub id_inventario: i32,
    pub status_inventario: InventoryStatus,
    pub itens: Vec<InventoryItem>,
    pub estatisticas_filtradas: ItemCounts,
}

// Resultado da conciliação via planilha do coletor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CsvReconciliation {
    pub etiquetas_processadas: usize,
    pub etiquetas_atualizadas: usize,
    pub ja_localizadas: usize,
    pub nao_encontradas: Vec<String>,
    pub erros: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorInventories {
    pub id_colaborador: i32,
    pub total_inventarios: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStatistics {
    pub periodo_dias: i64,
    pub total_inventarios: i64,
    pub finalizados: i64,
    pub em_andamento: i64,
    pub total_itens: i64,
    pub total_localizados: i64,
    #[schema(value_type = f64)]
    pub taxa_media_localizacao: Decimal,
    pub top_colaboradores: Vec<CollaboratorInventories>,
    pub from_cache: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn item(hex: &str, status: ItemStatus) -> InventoryItem {
        InventoryItem {
            id: 1,
            id_inventario: 1,
            etiqueta_hex: hex.to_string(),
            descricao: None,
            status,
            origem: None,
            codigo_leitor: None,
            antena: None,
            data_localizacao: None,
            observacao: None,
        }
    }

    #[test]
    fn counts_located_items() {
        let itens = vec![
            item("A", ItemStatus::Localizado),
            item("B", ItemStatus::NaoLocalizado),
            item("C", ItemStatus::Localizado),
        ];
        let counts = ItemCounts::from_items(&itens);

        assert_eq!(counts.total, 3);
        assert_eq!(counts.localizados, 2);
        assert_eq!(counts.nao_localizados, 1);
        assert_eq!(counts.percentual, Decimal::new(6667, 2));
    }

    #[test]
    fn status_parsing_is_exact() {
        assert_eq!(
            InventoryStatus::parse("Em andamento").unwrap(),
            InventoryStatus::EmAndamento
        );
        assert!(InventoryStatus::parse("finalizado").is_err());
        assert_eq!(
            ItemStatus::parse("Não localizado").unwrap(),
            ItemStatus::NaoLocalizado
        );
    }

    #[test]
    fn statuses_serialize_as_stored() {
        assert_eq!(
            serde_json::to_string(&InventoryStatus::EmAndamento).unwrap(),
            "\"Em andamento\""
        );
        assert_eq!(
            serde_json::to_string(&LocationOrigin::LeitorMovel).unwrap(),
            "\"Leitor móvel\""
        );
    }
}
