// src/handlers/inventories.rs

use axum::{
    body::Bytes,
    extract::{FromRequest, Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::Multipart;
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::{
        inventory::{
            CsvReconciliation, InventoryDetails, InventoryFilters, InventoryItem, InventoryItems,
            InventoryStatistics, InventoryStatus, InventorySummary, ItemFilters, ItemStatus,
        },
        pagination::{PageRequest, Paginated},
    },
    services::inventory_csv::TEMPLATE,
};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 1000;
const DEFAULT_STATISTICS_DAYS: i64 = 30;
const CSV_FIELD: &str = "arquivo";

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInventoryPayload {
    #[validate(range(min = 1, message = "Informe o colaborador"))]
    #[schema(example = 42)]
    pub id_colaborador: i32,

    #[validate(length(max = 1000, message = "Observação muito longa"))]
    #[schema(example = "Inventário mensal do almoxarifado")]
    pub observacao: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CsvContentPayload {
    /// Conteúdo do arquivo exportado pelo coletor
    #[schema(example = "EPC\nAAA0AAAA0000000000001A2B")]
    pub csv_content: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemPayload {
    /// `Localizado` ou `Não localizado`
    #[schema(example = "Localizado")]
    pub status: String,

    #[validate(length(max = 1000, message = "Observação muito longa"))]
    pub observacao: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct InventoryListQuery {
    /// `Em andamento` ou `Finalizado`
    pub status: Option<String>,
    pub id_colaborador: Option<i32>,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
    pub limite: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ItemListQuery {
    pub status: Option<String>,
    pub etiqueta: Option<String>,
    pub descricao: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct StatisticsQuery {
    /// Janela em dias (1 a 365)
    pub dias: Option<i64>,
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LatestQuery {
    pub id_colaborador: Option<i32>,
}

// =============================================================================
//  HANDLERS
// =============================================================================

// POST /api/inventarios
#[utoipa::path(
    post,
    path = "/api/inventarios",
    tag = "Inventários",
    request_body = CreateInventoryPayload,
    responses(
        (status = 201, description = "Inventário aberto", body = InventorySummary),
        (status = 400, description = "Dados inválidos")
    )
)]
pub async fn create_inventory(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CreateInventoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let inventory = app_state
        .inventory_service
        .create_inventory(payload.id_colaborador, payload.observacao.as_deref())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(inventory)))
}

// GET /api/inventarios
#[utoipa::path(
    get,
    path = "/api/inventarios",
    tag = "Inventários",
    params(InventoryListQuery),
    responses(
        (status = 200, description = "Página de inventários", body = Paginated<InventorySummary>),
        (status = 400, description = "Filtro inválido")
    )
)]
pub async fn list_inventories(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<InventoryListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::resolve(query.limite, query.offset, DEFAULT_LIMIT, MAX_LIMIT)
        .map_err(|e| e.to_api_error(&locale))?;
    let status = query
        .status
        .as_deref()
        .map(InventoryStatus::parse)
        .transpose()
        .map_err(|e| e.to_api_error(&locale))?;

    let filters = InventoryFilters {
        status,
        id_colaborador: query.id_colaborador,
        data_inicio: query.data_inicio,
        data_fim: query.data_fim,
    };

    let inventories = app_state
        .inventory_service
        .list_inventories(filters, page, query.force_refresh)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(inventories))
}

// GET /api/inventarios/{id}
#[utoipa::path(
    get,
    path = "/api/inventarios/{id}",
    tag = "Inventários",
    params(("id" = i32, Path, description = "ID do inventário")),
    responses(
        (status = 200, description = "Inventário com itens", body = InventoryDetails),
        (status = 404, description = "Inventário não encontrado")
    )
)]
pub async fn get_inventory(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let details = app_state
        .inventory_service
        .get_details(id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(details))
}

// GET /api/inventarios/{id}/itens
#[utoipa::path(
    get,
    path = "/api/inventarios/{id}/itens",
    tag = "Inventários",
    params(("id" = i32, Path, description = "ID do inventário"), ItemListQuery),
    responses(
        (status = 200, description = "Itens filtrados", body = InventoryItems),
        (status = 404, description = "Inventário não encontrado")
    )
)]
pub async fn list_items(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i32>,
    Query(query): Query<ItemListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(ItemStatus::parse)
        .transpose()
        .map_err(|e| e.to_api_error(&locale))?;
    let filters = ItemFilters {
        status,
        etiqueta: query.etiqueta,
        descricao: query.descricao,
    };

    let items = app_state
        .inventory_service
        .list_items(id, filters)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(items))
}

// PUT /api/inventarios/{id}/itens/{hex}
#[utoipa::path(
    put,
    path = "/api/inventarios/{id}/itens/{hex}",
    tag = "Inventários",
    request_body = UpdateItemPayload,
    params(
        ("id" = i32, Path, description = "ID do inventário"),
        ("hex" = String, Path, description = "Código da etiqueta")
    ),
    responses(
        (status = 200, description = "Item atualizado", body = InventoryItem),
        (status = 400, description = "Status inválido ou inventário finalizado"),
        (status = 404, description = "Inventário ou item não encontrado")
    )
)]
pub async fn update_item(
    State(app_state): State<AppState>,
    locale: Locale,
    Path((id, etiqueta_hex)): Path<(i32, String)>,
    Json(payload): Json<UpdateItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;
    let status = ItemStatus::parse(&payload.status).map_err(|e| e.to_api_error(&locale))?;

    let item = app_state
        .inventory_service
        .set_item_status(id, &etiqueta_hex, status, payload.observacao.as_deref())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(item))
}

// POST /api/inventarios/{id}/processar-csv
// Aceita o arquivo em multipart (campo `arquivo`), JSON `{csvContent}` ou o
// próprio CSV no corpo com `Content-Type: text/csv`.
#[utoipa::path(
    post,
    path = "/api/inventarios/{id}/processar-csv",
    tag = "Inventários",
    request_body(content = CsvContentPayload, description = "Também aceita multipart com o campo `arquivo`"),
    params(("id" = i32, Path, description = "ID do inventário")),
    responses(
        (status = 200, description = "Resultado da conciliação", body = CsvReconciliation),
        (status = 400, description = "Arquivo inválido ou inventário finalizado"),
        (status = 404, description = "Inventário não encontrado")
    )
)]
pub async fn process_csv(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i32>,
    headers: HeaderMap,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let content = read_csv_upload(&headers, request)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let result = app_state
        .inventory_service
        .process_csv(id, &content)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(result))
}

async fn read_csv_upload(headers: &HeaderMap, request: Request) -> Result<Vec<u8>, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| AppError::bad_request(format!("Upload inválido: {e}")))?;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::bad_request(format!("Upload inválido: {e}")))?
        {
            if field.name() != Some(CSV_FIELD) {
                continue;
            }
            let is_csv = field
                .file_name()
                .is_some_and(|name| name.to_ascii_lowercase().ends_with(".csv"));
            if !is_csv {
                return Err(AppError::bad_request("O arquivo deve ter extensão .csv"));
            }
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::bad_request(format!("Falha ao ler o arquivo: {e}")))?;
            return Ok(bytes.to_vec());
        }
        return Err(AppError::bad_request("Nenhum arquivo enviado no campo 'arquivo'"));
    }

    let body = Bytes::from_request(request, &())
        .await
        .map_err(|e| AppError::bad_request(format!("Corpo inválido: {e}")))?;

    if content_type.starts_with("text/csv") {
        return Ok(body.to_vec());
    }

    let payload: CsvContentPayload = serde_json::from_slice(&body)
        .map_err(|_| AppError::bad_request("Envie o arquivo no campo 'arquivo' ou o conteúdo em 'csvContent'"))?;
    Ok(payload.csv_content.into_bytes())
}

// POST /api/inventarios/{id}/finalizar
#[utoipa::path(
    post,
    path = "/api/inventarios/{id}/finalizar",
    tag = "Inventários",
    params(("id" = i32, Path, description = "ID do inventário")),
    responses(
        (status = 200, description = "Inventário finalizado", body = InventorySummary),
        (status = 400, description = "Inventário já foi finalizado"),
        (status = 404, description = "Inventário não encontrado")
    )
)]
pub async fn finalize_inventory(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = app_state
        .inventory_service
        .finalize(id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(summary))
}

// GET /api/inventarios/estatisticas
#[utoipa::path(
    get,
    path = "/api/inventarios/estatisticas",
    tag = "Inventários",
    params(StatisticsQuery),
    responses(
        (status = 200, description = "Indicadores do período", body = InventoryStatistics),
        (status = 400, description = "Período inválido")
    )
)]
pub async fn inventory_statistics(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<StatisticsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = app_state
        .inventory_service
        .statistics(query.dias.unwrap_or(DEFAULT_STATISTICS_DAYS), query.force_refresh)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(stats))
}

// GET /api/inventarios/ultimo
#[utoipa::path(
    get,
    path = "/api/inventarios/ultimo",
    tag = "Inventários",
    params(LatestQuery),
    responses(
        (status = 200, description = "Inventário mais recente", body = InventorySummary),
        (status = 404, description = "Nenhum inventário encontrado")
    )
)]
pub async fn latest_inventory(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<LatestQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = app_state
        .inventory_service
        .latest(query.id_colaborador)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(summary))
}

// GET /api/inventarios/modelo-csv
#[utoipa::path(
    get,
    path = "/api/inventarios/modelo-csv",
    tag = "Inventários",
    responses((status = 200, description = "Planilha modelo", body = String, content_type = "text/csv"))
)]
pub async fn csv_template() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"modelo_inventario.csv\""),
        ],
        TEMPLATE,
    )
}

// GET /api/inventarios/{id}/exportar
#[utoipa::path(
    get,
    path = "/api/inventarios/{id}/exportar",
    tag = "Inventários",
    params(("id" = i32, Path, description = "ID do inventário")),
    responses(
        (status = 200, description = "Itens em CSV", body = String, content_type = "text/csv"),
        (status = 404, description = "Inventário não encontrado")
    )
)]
pub async fn export_inventory(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let csv = app_state
        .inventory_service
        .export_csv(id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let disposition = format!("attachment; filename=\"inventario_{id}.csv\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}
