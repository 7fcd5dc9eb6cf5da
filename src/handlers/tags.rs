// src/handlers/tags.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        rfid::decode_photo,
    },
    config::AppState,
    handlers::{image_response, RefreshQuery},
    middleware::i18n::Locale,
    models::{
        pagination::{PageRequest, Paginated},
        tag::{NewTag, Tag, TagChanges, TagFilters, TagStatistics},
    },
};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 1000;

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTagPayload {
    #[validate(length(min = 1, max = 64, message = "Informe o código da etiqueta"))]
    #[schema(example = "1A2B")]
    pub etiqueta_hex: String,

    #[validate(length(max = 500, message = "Descrição muito longa"))]
    #[schema(example = "Furadeira de impacto Bosch")]
    pub descricao: Option<String>,

    #[validate(length(max = 100, message = "Número de série muito longo"))]
    pub numero_serie: Option<String>,

    #[validate(length(max = 100, message = "Número de patrimônio muito longo"))]
    pub numero_patrimonio: Option<String>,

    /// Foto em base64 (aceita data URL)
    pub foto: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTagPayload {
    #[validate(length(max = 500, message = "Descrição muito longa"))]
    pub descricao: Option<String>,

    #[validate(length(max = 100, message = "Número de série muito longo"))]
    pub numero_serie: Option<String>,

    #[validate(length(max = 100, message = "Número de patrimônio muito longo"))]
    pub numero_patrimonio: Option<String>,

    pub foto: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TagListQuery {
    /// Parte do código da etiqueta
    pub etiqueta: Option<String>,
    /// Parte da descrição
    pub descricao: Option<String>,
    pub destruida: Option<bool>,
    pub limite: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub force_refresh: bool,
}

// =============================================================================
//  HANDLERS
// =============================================================================

// GET /api/etiquetas
#[utoipa::path(
    get,
    path = "/api/etiquetas",
    tag = "Etiquetas",
    params(TagListQuery),
    responses(
        (status = 200, description = "Página de etiquetas", body = Paginated<Tag>),
        (status = 400, description = "Paginação inválida")
    )
)]
pub async fn list_tags(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<TagListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::resolve(query.limite, query.offset, DEFAULT_LIMIT, MAX_LIMIT)
        .map_err(|e| e.to_api_error(&locale))?;
    let filters = TagFilters {
        etiqueta: query.etiqueta,
        descricao: query.descricao,
        destruida: query.destruida,
    };

    let tags = app_state
        .tag_service
        .list_tags(filters, page, query.force_refresh)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(tags))
}

// GET /api/etiquetas/{id}
#[utoipa::path(
    get,
    path = "/api/etiquetas/{id}",
    tag = "Etiquetas",
    params(("id" = i32, Path, description = "ID da etiqueta")),
    responses(
        (status = 200, description = "Etiqueta", body = Tag),
        (status = 404, description = "Etiqueta não encontrada")
    )
)]
pub async fn get_tag(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = app_state
        .tag_service
        .get_tag(id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(tag))
}

// GET /api/etiquetas/{id}/foto
#[utoipa::path(
    get,
    path = "/api/etiquetas/{id}/foto",
    tag = "Etiquetas",
    params(("id" = i32, Path, description = "ID da etiqueta")),
    responses(
        (status = 200, description = "Foto da ferramenta", body = Vec<u8>, content_type = "image/jpeg"),
        (status = 404, description = "Foto não encontrada")
    )
)]
pub async fn get_tag_photo(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let photo = app_state
        .tag_service
        .get_photo(id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(image_response(photo))
}

// POST /api/etiquetas
#[utoipa::path(
    post,
    path = "/api/etiquetas",
    tag = "Etiquetas",
    request_body = CreateTagPayload,
    responses(
        (status = 201, description = "Etiqueta cadastrada", body = Tag),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Código, série ou patrimônio já cadastrado")
    )
)]
pub async fn create_tag(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CreateTagPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let foto = payload
        .foto
        .as_deref()
        .filter(|f| !f.trim().is_empty())
        .map(decode_photo)
        .transpose()
        .map_err(|e| e.to_api_error(&locale))?;

    let tag = app_state
        .tag_service
        .create_tag(NewTag {
            etiqueta_hex: payload.etiqueta_hex,
            descricao: payload.descricao,
            numero_serie: payload.numero_serie,
            numero_patrimonio: payload.numero_patrimonio,
            foto,
        })
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(tag)))
}

// PUT /api/etiquetas/{id}
#[utoipa::path(
    put,
    path = "/api/etiquetas/{id}",
    tag = "Etiquetas",
    request_body = UpdateTagPayload,
    params(("id" = i32, Path, description = "ID da etiqueta")),
    responses(
        (status = 200, description = "Etiqueta atualizada", body = Tag),
        (status = 400, description = "Nenhum campo para atualizar"),
        (status = 404, description = "Etiqueta não encontrada")
    )
)]
pub async fn update_tag(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateTagPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let foto = payload
        .foto
        .as_deref()
        .map(decode_photo)
        .transpose()
        .map_err(|e| e.to_api_error(&locale))?;
    let changes = TagChanges {
        descricao: payload.descricao.map(|d| d.trim().to_string()),
        numero_serie: payload.numero_serie,
        numero_patrimonio: payload.numero_patrimonio,
        foto,
    };

    let tag = app_state
        .tag_service
        .update_tag(id, changes)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(tag))
}

// POST /api/etiquetas/{id}/destruir
#[utoipa::path(
    post,
    path = "/api/etiquetas/{id}/destruir",
    tag = "Etiquetas",
    params(("id" = i32, Path, description = "ID da etiqueta")),
    responses(
        (status = 200, description = "Etiqueta marcada como destruída", body = Tag),
        (status = 400, description = "Já destruída ou emprestada"),
        (status = 404, description = "Etiqueta não encontrada")
    )
)]
pub async fn destroy_tag(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = app_state
        .tag_service
        .destroy_tag(id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(tag))
}

// POST /api/etiquetas/{id}/restaurar
#[utoipa::path(
    post,
    path = "/api/etiquetas/{id}/restaurar",
    tag = "Etiquetas",
    params(("id" = i32, Path, description = "ID da etiqueta")),
    responses(
        (status = 200, description = "Etiqueta restaurada", body = Tag),
        (status = 400, description = "Etiqueta não está destruída"),
        (status = 404, description = "Etiqueta não encontrada")
    )
)]
pub async fn restore_tag(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = app_state
        .tag_service
        .restore_tag(id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(tag))
}

// GET /api/etiquetas/estatisticas
#[utoipa::path(
    get,
    path = "/api/etiquetas/estatisticas",
    tag = "Etiquetas",
    params(RefreshQuery),
    responses((status = 200, description = "Totais de etiquetas", body = TagStatistics))
)]
pub async fn tag_statistics(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<RefreshQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = app_state
        .tag_service
        .statistics(query.force_refresh)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(stats))
}
