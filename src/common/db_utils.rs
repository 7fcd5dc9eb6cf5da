use sqlx::{Postgres, QueryBuilder};

use crate::models::pagination::PageRequest;

/// Monta o padrão `%termo%` para ILIKE, escapando os curingas digitados.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.trim().chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Filtro opcional vazio ("", "   ") conta como ausente.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// ` AND {column} ILIKE $n` quando o termo não está vazio.
pub(crate) fn push_contains(qb: &mut QueryBuilder<'_, Postgres>, column: &str, term: Option<&str>) {
    if let Some(term) = non_blank(term) {
        qb.push(format!(" AND {column} ILIKE "));
        qb.push_bind(like_pattern(term));
    }
}

pub(crate) fn push_page(qb: &mut QueryBuilder<'_, Postgres>, page: PageRequest) {
    qb.push(" LIMIT ");
    qb.push_bind(page.limite);
    qb.push(" OFFSET ");
    qb.push_bind(page.offset);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" furadeira "), "%furadeira%");
        assert_eq!(like_pattern("50%_a"), "%50\\%\\_a%");
    }

    #[test]
    fn blank_filters_are_ignored() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM etiquetas_rfid WHERE TRUE");
        push_contains(&mut qb, "descricao", Some("  "));
        push_contains(&mut qb, "etiqueta_hex", Some("AAA0"));
        push_page(&mut qb, PageRequest { limite: 20, offset: 40 });

        assert_eq!(
            qb.sql(),
            "SELECT * FROM etiquetas_rfid WHERE TRUE AND etiqueta_hex ILIKE $1 LIMIT $2 OFFSET $3"
        );
    }
}
