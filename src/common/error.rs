use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::middleware::i18n::Locale;

// Erro interno dos serviços e repositórios.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Inventário finalizado não pode ser alterado")]
    InventoryFinalized,

    #[error("Arquivo CSV inválido: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Foto inválida: {0}")]
    InvalidPhoto(#[from] base64::DecodeError),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::BadRequest(_)
            | AppError::InventoryFinalized
            | AppError::CsvError(_)
            | AppError::InvalidPhoto(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Converte o erro na resposta HTTP, traduzindo as mensagens genéricas
    /// conforme o idioma do cliente.
    pub fn to_api_error(self, locale: &Locale) -> ApiError {
        let status = self.status();
        let english = locale.is_english();

        match self {
            AppError::ValidationError(errors) => {
                let mut details: HashMap<String, Vec<String>> = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let error = if english {
                    "One or more fields are invalid."
                } else {
                    "Um ou mais campos são inválidos."
                };
                ApiError {
                    status,
                    error: error.to_string(),
                    details: Some(json!(details)),
                }
            }
            AppError::DatabaseError(ref e) => {
                tracing::error!("Erro de banco de dados: {}", e);
                ApiError::generic(status, english)
            }
            AppError::InternalServerError(ref e) => {
                tracing::error!("Erro Interno do Servidor: {:#}", e);
                ApiError::generic(status, english)
            }
            other => ApiError {
                status,
                error: other.to_string(),
                details: None,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}

/// Erro já pronto para ser devolvido ao cliente.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl ApiError {
    fn generic(status: StatusCode, english: bool) -> Self {
        let error = if english {
            "An unexpected error occurred."
        } else {
            "Ocorreu um erro inesperado."
        };
        Self {
            status,
            error: error.to_string(),
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "success": false, "error": self.error, "details": details }),
            None => json!({ "success": false, "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Payload {
        #[validate(range(min = 1, message = "Colaborador inválido"))]
        id_colaborador: i32,
    }

    #[test]
    fn domain_errors_map_to_status() {
        assert_eq!(AppError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(AppError::InventoryFinalized.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::DatabaseError(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_error_lists_field_messages() {
        let errors = Payload { id_colaborador: 0 }.validate().unwrap_err();
        let api = AppError::ValidationError(errors).to_api_error(&Locale::default());

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.error, "Um ou mais campos são inválidos.");
        assert_eq!(
            api.details.unwrap()["id_colaborador"][0],
            "Colaborador inválido"
        );
    }

    #[test]
    fn internal_errors_hide_the_cause() {
        let api = AppError::InternalServerError(anyhow::anyhow!("senha do banco"))
            .to_api_error(&Locale("en".into()));

        assert_eq!(api.error, "An unexpected error occurred.");
        assert!(api.details.is_none());
    }

    #[test]
    fn domain_message_is_kept() {
        let api = AppError::bad_request("Este empréstimo já foi devolvido")
            .to_api_error(&Locale::default());
        assert_eq!(api.error, "Este empréstimo já foi devolvido");
    }
}
