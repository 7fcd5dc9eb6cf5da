// src/common/rfid.rs

use std::sync::LazyLock;

use base64::{engine::general_purpose::STANDARD, Engine};
use regex::Regex;

use crate::common::error::AppError;

/// Tamanho padrão dos códigos EPC gravados nas etiquetas.
pub const TAG_CODE_LEN: usize = 24;

const HEX_TAG_PREFIX: &str = "AAA0AAAA";

/// Prefixos de etiquetas reconhecidas pelas antenas. Leituras com outros
/// prefixos são ruído dos leitores.
pub const VALID_READ_PREFIXES: [&str; 4] = [
    "0000000000000000000",
    "617061720000000000",
    "AAA0AAAA",
    "32366259FC",
];

/// Prefixo das leituras "heartbeat" disparadas pelas câmeras.
pub const PING_PREFIX: &str = "PING_PERIODICO_";

static PATTERN_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}[0-9][A-Z]{4}").expect("regex válida"));

/// Padroniza o código digitado pelo operador para o formato de 24 caracteres.
pub fn normalize_tag_code(raw: &str) -> String {
    let code = raw.trim().to_uppercase();
    if code.is_empty() {
        return code;
    }
    let len = code.chars().count();

    if len >= TAG_CODE_LEN {
        return code.chars().take(TAG_CODE_LEN).collect();
    }

    if PATTERN_PREFIX.is_match(&code) {
        return pad_right(&code);
    }

    if code.chars().all(|c| c.is_ascii_hexdigit()) {
        let width = TAG_CODE_LEN - HEX_TAG_PREFIX.len();
        // hexadecimal puro cabe nos 16 caracteres depois do prefixo
        let tail = &code[code.len().saturating_sub(width)..];
        return format!("{HEX_TAG_PREFIX}{tail:0>width$}");
    }

    pad_right(&code)
}

fn pad_right(code: &str) -> String {
    format!("{code:0<TAG_CODE_LEN$}")
}

/// Normalização aplicada aos códigos vindos de leitores (antenas e coletores).
pub fn normalize_read_code(raw: &str) -> String {
    raw.trim().trim_matches('"').trim().to_uppercase()
}

pub fn is_ping_code(code: &str) -> bool {
    code.starts_with(PING_PREFIX)
}

/// Decodifica uma foto em base64, aceitando também data URLs
/// (`data:image/png;base64,...`).
pub fn decode_photo(encoded: &str) -> Result<Vec<u8>, AppError> {
    let data = match encoded.split_once(";base64,") {
        Some((header, data)) if header.starts_with("data:") => data,
        _ => encoded,
    };
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(STANDARD.decode(cleaned)?)
}

/// Descobre o tipo da imagem pelos primeiros bytes.
pub fn detect_image_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG") {
        "image/png"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        // JPEG (\xff\xd8) e qualquer coisa desconhecida
        "image/jpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_hex_code_gets_default_prefix() {
        assert_eq!(normalize_tag_code(" 1a2b "), "AAA0AAAA0000000000001A2B");
    }

    #[test]
    fn long_hex_code_keeps_last_sixteen_chars() {
        assert_eq!(
            normalize_tag_code("123456789ABCDEF012"),
            "AAA0AAAA3456789ABCDEF012"
        );
    }

    #[test]
    fn prefixed_code_is_padded_on_the_right() {
        assert_eq!(normalize_tag_code("aaa0aaaa12"), "AAA0AAAA1200000000000000");
    }

    #[test]
    fn full_length_code_is_truncated() {
        let code = "32366259FC00000000000001FFFF";
        assert_eq!(normalize_tag_code(code), "32366259FC00000000000001");
    }

    #[test]
    fn blank_code_stays_empty() {
        assert_eq!(normalize_tag_code(""), "");
        assert_eq!(normalize_tag_code("   "), "");
    }

    #[test]
    fn other_codes_are_right_padded() {
        assert_eq!(normalize_tag_code("XYZ-1"), "XYZ-10000000000000000000");
    }

    #[test]
    fn read_codes_are_trimmed_and_uppercased() {
        assert_eq!(normalize_read_code(" \"aaa0aaaa01\" "), "AAA0AAAA01");
        assert!(is_ping_code("PING_PERIODICO_CAM01"));
        assert!(!is_ping_code("AAA0AAAA01"));
    }

    #[test]
    fn photo_accepts_data_url() {
        let bytes = decode_photo("data:image/png;base64,iVBORw==").unwrap();
        assert_eq!(bytes, b"\x89PNG");
        assert!(decode_photo("***").is_err());
    }

    #[test]
    fn sniffs_image_types() {
        assert_eq!(detect_image_mime(b"\x89PNG\r\n"), "image/png");
        assert_eq!(detect_image_mime(b"GIF89a"), "image/gif");
        assert_eq!(detect_image_mime(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(detect_image_mime(b"\xff\xd8\xff"), "image/jpeg");
        assert_eq!(detect_image_mime(b""), "image/jpeg");
    }
}
