// src/handlers/loans.rs

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    handlers::RefreshQuery,
    middleware::i18n::Locale,
    models::{
        loan::{Loan, LoanFilters, LoanStatistics, LoanStatus, PendingLoan, ToolAvailability},
        pagination::{PageRequest, Paginated},
    },
};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 1000;

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoanPayload {
    #[validate(range(min = 1, message = "Informe o colaborador"))]
    #[schema(example = 42)]
    pub id_colaborador: i32,

    #[validate(length(min = 1, max = 64, message = "Informe a etiqueta da ferramenta"))]
    #[schema(example = "AAA0AAAA0000000000001A2B")]
    pub etiqueta_hex: String,

    #[validate(length(max = 1000, message = "Observação muito longa"))]
    pub observacao: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnLoanPayload {
    #[validate(length(max = 1000, message = "Observação muito longa"))]
    #[schema(example = "Devolvida com a broca quebrada")]
    pub observacao: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LoanListQuery {
    pub id_colaborador: Option<i32>,
    /// Parte do código da etiqueta
    pub etiqueta: Option<String>,
    /// `ativo` ou `devolvido`
    pub status: Option<String>,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
    pub limite: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub force_refresh: bool,
}

// =============================================================================
//  HANDLERS
// =============================================================================

// POST /api/emprestimos
#[utoipa::path(
    post,
    path = "/api/emprestimos",
    tag = "Empréstimos",
    request_body = CreateLoanPayload,
    responses(
        (status = 201, description = "Empréstimo registrado", body = Loan),
        (status = 400, description = "Etiqueta não encontrada ou destruída"),
        (status = 409, description = "Ferramenta já emprestada")
    )
)]
pub async fn create_loan(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CreateLoanPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let loan = app_state
        .loan_service
        .create_loan(
            payload.id_colaborador,
            &payload.etiqueta_hex,
            payload.observacao.as_deref(),
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(loan)))
}

// GET /api/emprestimos/{id}
#[utoipa::path(
    get,
    path = "/api/emprestimos/{id}",
    tag = "Empréstimos",
    params(("id" = i32, Path, description = "ID do empréstimo")),
    responses(
        (status = 200, description = "Empréstimo", body = Loan),
        (status = 404, description = "Empréstimo não encontrado")
    )
)]
pub async fn get_loan(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let loan = app_state
        .loan_service
        .get_loan(id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(loan))
}

// POST /api/emprestimos/{id}/devolver
// O corpo é opcional: sem JSON a devolução é registrada sem observação.
#[utoipa::path(
    post,
    path = "/api/emprestimos/{id}/devolver",
    tag = "Empréstimos",
    request_body(content = Option<ReturnLoanPayload>),
    params(("id" = i32, Path, description = "ID do empréstimo")),
    responses(
        (status = 200, description = "Devolução registrada", body = Loan),
        (status = 400, description = "Empréstimo já devolvido"),
        (status = 404, description = "Empréstimo não encontrado")
    )
)]
pub async fn return_loan(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i32>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let payload: ReturnLoanPayload = if body.iter().all(u8::is_ascii_whitespace) {
        ReturnLoanPayload::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            AppError::bad_request(format!("JSON inválido: {e}")).to_api_error(&locale)
        })?
    };
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let loan = app_state
        .loan_service
        .return_loan(id, payload.observacao.as_deref())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(loan))
}

// GET /api/emprestimos
#[utoipa::path(
    get,
    path = "/api/emprestimos",
    tag = "Empréstimos",
    params(LoanListQuery),
    responses(
        (status = 200, description = "Página de empréstimos", body = Paginated<Loan>),
        (status = 400, description = "Filtro inválido")
    )
)]
pub async fn list_loans(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<LoanListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::resolve(query.limite, query.offset, DEFAULT_LIMIT, MAX_LIMIT)
        .map_err(|e| e.to_api_error(&locale))?;
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(LoanStatus::parse)
        .transpose()
        .map_err(|e| e.to_api_error(&locale))?;

    let filters = LoanFilters {
        id_colaborador: query.id_colaborador,
        etiqueta: query.etiqueta,
        status,
        data_inicio: query.data_inicio,
        data_fim: query.data_fim,
    };

    let loans = app_state
        .loan_service
        .list_loans(filters, page, query.force_refresh)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(loans))
}

// GET /api/emprestimos/colaborador/{id}/ativos
#[utoipa::path(
    get,
    path = "/api/emprestimos/colaborador/{id}/ativos",
    tag = "Empréstimos",
    params(("id" = i32, Path, description = "ID do colaborador")),
    responses((status = 200, description = "Empréstimos ativos do colaborador", body = Vec<Loan>))
)]
pub async fn active_by_collaborator(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id_colaborador): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let loans = app_state
        .loan_service
        .active_by_collaborator(id_colaborador)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(loans))
}

// GET /api/emprestimos/ferramenta/{hex}/historico
#[utoipa::path(
    get,
    path = "/api/emprestimos/ferramenta/{hex}/historico",
    tag = "Empréstimos",
    params(("hex" = String, Path, description = "Código da etiqueta")),
    responses((status = 200, description = "Histórico de empréstimos da ferramenta", body = Vec<Loan>))
)]
pub async fn tool_history(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(etiqueta_hex): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let loans = app_state
        .loan_service
        .tool_history(&etiqueta_hex)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(loans))
}

// GET /api/emprestimos/ferramenta/{hex}/disponibilidade
#[utoipa::path(
    get,
    path = "/api/emprestimos/ferramenta/{hex}/disponibilidade",
    tag = "Empréstimos",
    params(("hex" = String, Path, description = "Código da etiqueta")),
    responses((status = 200, description = "Situação da ferramenta", body = ToolAvailability))
)]
pub async fn tool_availability(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(etiqueta_hex): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let availability = app_state
        .loan_service
        .availability(&etiqueta_hex)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(availability))
}

// GET /api/emprestimos/estatisticas
#[utoipa::path(
    get,
    path = "/api/emprestimos/estatisticas",
    tag = "Empréstimos",
    params(RefreshQuery),
    responses((status = 200, description = "Totais e rankings", body = LoanStatistics))
)]
pub async fn loan_statistics(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<RefreshQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = app_state
        .loan_service
        .statistics(query.force_refresh)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(stats))
}

// GET /api/emprestimos/pendentes
#[utoipa::path(
    get,
    path = "/api/emprestimos/pendentes",
    tag = "Empréstimos",
    responses((status = 200, description = "Empréstimos ativos com tempo decorrido", body = Vec<PendingLoan>))
)]
pub async fn pending_loans(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let loans = app_state
        .loan_service
        .pending()
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(loans))
}
