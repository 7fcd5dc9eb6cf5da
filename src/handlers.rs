use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::common::rfid::detect_image_mime;

pub mod inventories;
pub mod loans;
pub mod pings;
pub mod reads;
pub mod tags;

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RefreshQuery {
    /// Ignora o cache e consulta o banco
    #[serde(default)]
    pub force_refresh: bool,
}

/// Devolve uma foto armazenada no banco com o tipo detectado pelos bytes.
pub(crate) fn image_response(bytes: Vec<u8>) -> Response {
    let mime = detect_image_mime(&bytes);
    (
        [
            (header::CONTENT_TYPE, mime),
            (header::CONTENT_DISPOSITION, "inline"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        bytes,
    )
        .into_response()
}
