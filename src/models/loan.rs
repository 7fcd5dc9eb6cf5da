// src/models/loan.rs

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::common::error::AppError;

// --- Empréstimo de ferramenta ---
// `dataDevolucao` NULL = empréstimo ativo. `status` vem calculado do banco.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: i32,
    pub id_colaborador: i32,
    pub etiqueta_hex: String,
    pub data_emprestimo: NaiveDateTime,
    pub data_devolucao: Option<NaiveDateTime>,
    pub observacao: String,
    pub descricao_ferramenta: Option<String>,
    #[schema(example = "ativo")]
    pub status: String,
    #[schema(example = "05/03/2025 14:30")]
    pub data_emprestimo_formatada: String,
    pub data_devolucao_formatada: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Ativo,
    Devolvido,
}

impl LoanStatus {
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value.trim().to_lowercase().as_str() {
            "ativo" => Ok(LoanStatus::Ativo),
            "devolvido" => Ok(LoanStatus::Devolvido),
            other => Err(AppError::bad_request(format!(
                "Status inválido: '{other}'. Use 'ativo' ou 'devolvido'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoanFilters {
    pub id_colaborador: Option<i32>,
    pub etiqueta: Option<String>,
    pub status: Option<LoanStatus>,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToolUsage {
    pub etiqueta_hex: String,
    pub descricao: Option<String>,
    pub total_emprestimos: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorLoans {
    pub id_colaborador: i32,
    pub emprestimos_ativos: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoanStatistics {
    pub total: i64,
    pub ativos: i64,
    pub devolvidos: i64,
    #[schema(value_type = f64)]
    pub percentual_ativos: Decimal,
    pub ferramentas_mais_emprestadas: Vec<ToolUsage>,
    pub colaboradores_com_emprestimos: Vec<CollaboratorLoans>,
    pub from_cache: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityReason {
    NaoCadastrada,
    Destruida,
    Emprestada,
    Disponivel,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToolAvailability {
    pub etiqueta_hex: String,
    pub disponivel: bool,
    pub motivo: AvailabilityReason,
    pub descricao: Option<String>,
    pub emprestimo_ativo: Option<Loan>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingLoan {
    #[serde(flatten)]
    pub emprestimo: Loan,
    pub dias: i64,
    #[schema(example = "8 dia(s) e 3 hora(s)")]
    pub tempo_decorrido: String,
    pub alerta: bool,
}
