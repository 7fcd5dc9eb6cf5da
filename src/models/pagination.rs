// src/models/pagination.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::common::error::AppError;

/// Página de resultados devolvida pelas listagens.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub itens: Vec<T>,
    pub total: i64,
    pub limite: i64,
    pub offset: i64,
    pub from_cache: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub limite: i64,
    pub offset: i64,
}

impl PageRequest {
    pub fn resolve(
        limite: Option<i64>,
        offset: Option<i64>,
        default: i64,
        max: i64,
    ) -> Result<Self, AppError> {
        let limite = limite.unwrap_or(default);
        let offset = offset.unwrap_or(0);

        if limite < 1 || limite > max {
            return Err(AppError::bad_request(format!(
                "O limite deve estar entre 1 e {max}"
            )));
        }
        if offset < 0 {
            return Err(AppError::bad_request("O offset não pode ser negativo"));
        }

        Ok(Self { limite, offset })
    }

    pub fn wrap<T>(self, itens: Vec<T>, total: i64) -> Paginated<T> {
        Paginated {
            itens,
            total,
            limite: self.limite,
            offset: self.offset,
            from_cache: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_bounds() {
        let page = PageRequest::resolve(None, None, 20, 1000).unwrap();
        assert_eq!(page, PageRequest { limite: 20, offset: 0 });

        assert!(PageRequest::resolve(Some(0), None, 20, 1000).is_err());
        assert!(PageRequest::resolve(Some(1001), None, 20, 1000).is_err());
        assert!(PageRequest::resolve(Some(10), Some(-1), 20, 1000).is_err());
    }

    #[test]
    fn wrap_keeps_requested_window() {
        let page = PageRequest { limite: 2, offset: 4 }.wrap(vec!["a", "b"], 9);
        assert_eq!(page.total, 9);
        assert_eq!(page.offset, 4);
        assert!(!page.from_cache);
    }
}
