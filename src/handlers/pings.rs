// src/handlers/pings.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    common::{
        datetime::{parse_datetime_filter, parse_optional},
        error::ApiError,
    },
    config::AppState,
    handlers::{image_response, RefreshQuery},
    middleware::i18n::Locale,
    models::{
        pagination::{PageRequest, Paginated},
        ping::{AntennaFilter, PhotoInfo, Ping, PingFilters, PingStatistics, ReaderAntennas, RecentPings},
    },
};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 1000;
const DEFAULT_RECENT_LIMIT: i64 = 100;

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PingListQuery {
    pub etiqueta: Option<String>,
    /// Número da antena (`2`) ou rótulo completo (`[CAM01] A2`)
    pub antena: Option<String>,
    pub codigo_leitor: Option<String>,
    pub horario_inicio: Option<String>,
    pub horario_fim: Option<String>,
    pub limite: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PingLimitQuery {
    pub limite: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PhotoQuery {
    pub codigo_leitor: String,
    pub antena: i32,
    /// Horário exato da leitura
    pub horario: String,
}

// GET /api/ping
#[utoipa::path(
    get,
    path = "/api/ping",
    tag = "Ping",
    params(PingListQuery),
    responses(
        (status = 200, description = "Página de pings", body = Paginated<Ping>),
        (status = 400, description = "Filtro inválido")
    )
)]
pub async fn list_pings(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<PingListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::resolve(query.limite, query.offset, DEFAULT_LIMIT, MAX_LIMIT)
        .map_err(|e| e.to_api_error(&locale))?;
    let antena = query
        .antena
        .as_deref()
        .filter(|a| !a.trim().is_empty())
        .map(AntennaFilter::parse)
        .transpose()
        .map_err(|e| e.to_api_error(&locale))?;

    let filters = PingFilters {
        etiqueta: query.etiqueta,
        antena,
        codigo_leitor: query.codigo_leitor,
        horario_inicio: parse_optional("horarioInicio", query.horario_inicio.as_deref())
            .map_err(|e| e.to_api_error(&locale))?,
        horario_fim: parse_optional("horarioFim", query.horario_fim.as_deref())
            .map_err(|e| e.to_api_error(&locale))?,
    };

    let pings = app_state
        .ping_service
        .list_pings(filters, page, query.force_refresh)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(pings))
}

// GET /api/ping/estatisticas
#[utoipa::path(
    get,
    path = "/api/ping/estatisticas",
    tag = "Ping",
    params(RefreshQuery),
    responses((status = 200, description = "Totais dos pings", body = PingStatistics))
)]
pub async fn ping_statistics(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<RefreshQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = app_state
        .ping_service
        .statistics(query.force_refresh)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(stats))
}

// GET /api/ping/etiqueta/{hex}
#[utoipa::path(
    get,
    path = "/api/ping/etiqueta/{hex}",
    tag = "Ping",
    params(("hex" = String, Path, description = "Código do ping"), PingLimitQuery),
    responses((status = 200, description = "Histórico do ping", body = Vec<Ping>))
)]
pub async fn pings_by_tag(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(etiqueta_hex): Path<String>,
    Query(query): Query<PingLimitQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::resolve(query.limite, None, DEFAULT_LIMIT, MAX_LIMIT)
        .map_err(|e| e.to_api_error(&locale))?;

    let pings = app_state
        .ping_service
        .tag_history(&etiqueta_hex, page.limite)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(pings))
}

// GET /api/ping/ultimos/{minutos}
#[utoipa::path(
    get,
    path = "/api/ping/ultimos/{minutos}",
    tag = "Ping",
    params(("minutos" = i64, Path, description = "Janela em minutos (1 a 1440)"), PingLimitQuery),
    responses(
        (status = 200, description = "Pings recentes", body = RecentPings),
        (status = 400, description = "Período ou limite inválido")
    )
)]
pub async fn recent_pings(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(minutos): Path<i64>,
    Query(query): Query<PingLimitQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let recent = app_state
        .ping_service
        .recent(minutos, query.limite.unwrap_or(DEFAULT_RECENT_LIMIT))
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(recent))
}

// GET /api/ping/antenas
#[utoipa::path(
    get,
    path = "/api/ping/antenas",
    tag = "Ping",
    params(RefreshQuery),
    responses((status = 200, description = "Antenas agrupadas por leitor", body = Vec<ReaderAntennas>))
)]
pub async fn list_antennas(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<RefreshQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let antennas = app_state
        .ping_service
        .antennas(query.force_refresh)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(antennas))
}

// GET /api/ping/foto
#[utoipa::path(
    get,
    path = "/api/ping/foto",
    tag = "Ping",
    params(PhotoQuery),
    responses(
        (status = 200, description = "Foto da leitura", body = Vec<u8>, content_type = "image/jpeg"),
        (status = 404, description = "Foto não encontrada")
    )
)]
pub async fn photo_at(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<PhotoQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let horario = parse_datetime_filter("horario", &query.horario).map_err(|e| e.to_api_error(&locale))?;

    let photo = app_state
        .ping_service
        .photo_at(&query.codigo_leitor, query.antena, horario)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(image_response(photo))
}

// GET /api/ping/foto/{hex}
#[utoipa::path(
    get,
    path = "/api/ping/foto/{hex}",
    tag = "Ping",
    params(("hex" = String, Path, description = "Código da etiqueta")),
    responses(
        (status = 200, description = "Foto mais recente", body = Vec<u8>, content_type = "image/jpeg"),
        (status = 404, description = "Foto não encontrada")
    )
)]
pub async fn latest_photo(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(etiqueta_hex): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let photo = app_state
        .ping_service
        .latest_photo(&etiqueta_hex)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(image_response(photo))
}

// GET /api/ping/foto/{hex}/info
#[utoipa::path(
    get,
    path = "/api/ping/foto/{hex}/info",
    tag = "Ping",
    params(("hex" = String, Path, description = "Código da etiqueta")),
    responses((status = 200, description = "Resumo das fotos", body = PhotoInfo))
)]
pub async fn photo_info(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(etiqueta_hex): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let info = app_state
        .ping_service
        .photo_info(&etiqueta_hex)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(info))
}
