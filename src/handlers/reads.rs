// src/handlers/reads.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    common::{
        datetime::{self, parse_datetime_filter, parse_optional},
        error::{ApiError, AppError},
        rfid::decode_photo,
    },
    config::AppState,
    middleware::i18n::Locale,
    models::{
        pagination::{PageRequest, Paginated},
        read::{NewRead, Read, ReadFilters, ReadStatistics, RecentReads},
    },
};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 1000;
const DEFAULT_RECENT_LIMIT: i64 = 100;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadPayload {
    #[validate(length(min = 1, max = 100, message = "Informe o leitor"))]
    #[schema(example = "CAM01")]
    pub codigo_leitor: String,

    #[validate(range(min = 0, message = "Antena inválida"))]
    #[schema(example = 2)]
    pub antena: i32,

    #[validate(length(min = 1, max = 64, message = "Informe o código da etiqueta"))]
    #[schema(example = "AAA0AAAA0000000000001A2B")]
    pub etiqueta_hex: String,

    #[schema(example = -61)]
    pub rssi: i32,

    /// `YYYY-MM-DD HH:MM:SS`; quando ausente vale o horário do servidor
    pub horario: Option<String>,

    /// Foto em base64
    pub foto: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestPayload {
    #[validate(length(min = 1, max = 500, message = "Envie entre 1 e 500 leituras"), nested)]
    pub leituras: Vec<ReadPayload>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub inseridas: u64,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReadListQuery {
    pub etiqueta: Option<String>,
    pub antena: Option<i32>,
    /// `YYYY-MM-DD HH:MM[:SS]` ou ISO
    pub horario_inicio: Option<String>,
    pub horario_fim: Option<String>,
    pub limite: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LimitQuery {
    pub limite: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReadStatisticsQuery {
    pub horario_inicio: Option<String>,
    pub horario_fim: Option<String>,
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecentReadsQuery {
    pub etiqueta: Option<String>,
    pub antena: Option<i32>,
    /// Máximo de 200
    pub limite: Option<i64>,
    pub offset: Option<i64>,
}

impl ReadPayload {
    fn into_new_read(self) -> Result<NewRead, AppError> {
        let horario = match self.horario.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
            Some(value) => parse_datetime_filter("horario", value)?,
            None => datetime::now(),
        };
        let foto = self
            .foto
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .map(decode_photo)
            .transpose()?;

        Ok(NewRead {
            codigo_leitor: self.codigo_leitor,
            horario,
            antena: self.antena,
            etiqueta_hex: self.etiqueta_hex,
            rssi: self.rssi,
            foto,
        })
    }
}

// POST /api/leituras
#[utoipa::path(
    post,
    path = "/api/leituras",
    tag = "Leituras",
    request_body = IngestPayload,
    responses(
        (status = 201, description = "Leituras gravadas", body = IngestResponse),
        (status = 400, description = "Lote inválido")
    )
)]
pub async fn ingest_reads(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<IngestPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let reads = payload
        .leituras
        .into_iter()
        .map(ReadPayload::into_new_read)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_api_error(&locale))?;

    let inseridas = app_state
        .read_service
        .ingest(reads)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(IngestResponse { inseridas })))
}

// GET /api/leituras
#[utoipa::path(
    get,
    path = "/api/leituras",
    tag = "Leituras",
    params(ReadListQuery),
    responses(
        (status = 200, description = "Página de leituras válidas", body = Paginated<Read>),
        (status = 400, description = "Filtro inválido")
    )
)]
pub async fn list_reads(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<ReadListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::resolve(query.limite, query.offset, DEFAULT_LIMIT, MAX_LIMIT)
        .map_err(|e| e.to_api_error(&locale))?;
    let filters = ReadFilters {
        etiqueta: query.etiqueta,
        antena: query.antena,
        horario_inicio: parse_optional("horarioInicio", query.horario_inicio.as_deref())
            .map_err(|e| e.to_api_error(&locale))?,
        horario_fim: parse_optional("horarioFim", query.horario_fim.as_deref())
            .map_err(|e| e.to_api_error(&locale))?,
    };

    let reads = app_state
        .read_service
        .list_reads(filters, page, query.force_refresh)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(reads))
}

// GET /api/leituras/estatisticas
#[utoipa::path(
    get,
    path = "/api/leituras/estatisticas",
    tag = "Leituras",
    params(ReadStatisticsQuery),
    responses(
        (status = 200, description = "Totais das leituras", body = ReadStatistics),
        (status = 400, description = "Data inválida")
    )
)]
pub async fn read_statistics(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<ReadStatisticsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filters = ReadFilters {
        etiqueta: None,
        antena: None,
        horario_inicio: parse_optional("horarioInicio", query.horario_inicio.as_deref())
            .map_err(|e| e.to_api_error(&locale))?,
        horario_fim: parse_optional("horarioFim", query.horario_fim.as_deref())
            .map_err(|e| e.to_api_error(&locale))?,
    };

    let stats = app_state
        .read_service
        .statistics(filters, query.force_refresh)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(stats))
}

// GET /api/leituras/etiqueta/{hex}
#[utoipa::path(
    get,
    path = "/api/leituras/etiqueta/{hex}",
    tag = "Leituras",
    params(("hex" = String, Path, description = "Código da etiqueta"), LimitQuery),
    responses((status = 200, description = "Leituras da etiqueta", body = Vec<Read>))
)]
pub async fn reads_by_tag(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(etiqueta_hex): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::resolve(query.limite, None, DEFAULT_LIMIT, MAX_LIMIT)
        .map_err(|e| e.to_api_error(&locale))?;

    let reads = app_state
        .read_service
        .tag_history(&etiqueta_hex, page.limite)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(reads))
}

// GET /api/leituras/ultimas/{minutos}
#[utoipa::path(
    get,
    path = "/api/leituras/ultimas/{minutos}",
    tag = "Leituras",
    params(("minutos" = i64, Path, description = "Janela em minutos (até 1440)"), RecentReadsQuery),
    responses(
        (status = 200, description = "Leituras recentes", body = RecentReads),
        (status = 400, description = "Período inválido")
    )
)]
pub async fn recent_reads(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(minutos): Path<i64>,
    Query(query): Query<RecentReadsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let recent = app_state
        .read_service
        .recent(
            minutos,
            query.etiqueta,
            query.antena,
            query.limite.unwrap_or(DEFAULT_RECENT_LIMIT),
            query.offset.unwrap_or(0),
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(recent))
}
