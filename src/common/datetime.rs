use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::common::error::AppError;

const ACCEPTED_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Horário local do servidor. As antenas gravam horário local sem fuso.
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Interpreta os filtros de horário. Uma data sem hora vale a partir da
/// meia-noite.
pub fn parse_datetime_filter(field: &str, value: &str) -> Result<NaiveDateTime, AppError> {
    let value = value.trim();
    ACCEPTED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| {
            AppError::bad_request(format!(
                "Formato inválido para {field}: '{value}'. Use AAAA-MM-DD HH:MM:SS"
            ))
        })
}

pub fn parse_optional(field: &str, value: Option<&str>) -> Result<Option<NaiveDateTime>, AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse_datetime_filter(field, v).map(Some),
        None => Ok(None),
    }
}

pub fn format_br(value: NaiveDateTime) -> String {
    value.format("%d/%m/%Y %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_space_and_iso_separators() {
        let a = parse_datetime_filter("horarioInicio", "2025-03-05 14:30:00").unwrap();
        let b = parse_datetime_filter("horarioInicio", "2025-03-05T14:30").unwrap();
        assert_eq!(a, b);
        assert_eq!(format_br(a), "05/03/2025 14:30:00");
    }

    #[test]
    fn date_only_starts_at_midnight() {
        let d = parse_datetime_filter("horarioFim", "2025-03-05").unwrap();
        assert_eq!(d.to_string(), "2025-03-05 00:00:00");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_datetime_filter("horarioFim", "ontem").is_err());
        assert_eq!(parse_optional("horarioFim", Some(" ")).unwrap(), None);
    }
}
