// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

const DEFAULT_LANG: &str = "pt";

// Idioma preferido do cliente, extraído do Accept-Language
#[derive(Debug, Clone)]
pub struct Locale(pub String);

impl Locale {
    pub fn is_english(&self) -> bool {
        self.0 == "en"
    }

    fn from_header(value: &str) -> Option<Self> {
        accept_language::parse(value).first().map(|tag| {
            // "pt-BR" -> "pt"
            let primary = tag.split('-').next().unwrap_or(tag);
            Locale(primary.to_lowercase())
        })
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LANG.to_string())
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let locale = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .and_then(Locale::from_header)
            .unwrap_or_default();

        Ok(locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_subtag_of_first_language() {
        let locale = Locale::from_header("en-US,pt-BR;q=0.8").unwrap();
        assert_eq!(locale.0, "en");
        assert!(locale.is_english());
    }

    #[test]
    fn empty_header_has_no_locale() {
        assert!(Locale::from_header("").is_none());
        assert_eq!(Locale::default().0, "pt");
    }
}
