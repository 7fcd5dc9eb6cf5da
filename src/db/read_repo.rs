// src/db/read_repo.rs

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    common::{
        db_utils::{push_contains, push_page},
        error::AppError,
        rfid::VALID_READ_PREFIXES,
    },
    models::{
        pagination::PageRequest,
        read::{NewRead, Read, ReadFilters, ReadStatistics},
    },
};

const READ_SELECT: &str = r#"
    SELECT l.id, l.codigo_leitor, l.horario, l.antena, l.etiqueta_hex, l.rssi,
           (l.foto IS NOT NULL) AS tem_foto,
           COALESCE(t.descricao, 'Sem descrição') AS descricao_equipamento,
           CASE
               WHEN t.id IS NULL THEN 'nao_cadastrada'
               WHEN t.destruida IS NOT NULL THEN 'destruida'
               ELSE 'ativa'
           END AS status_etiqueta,
           to_char(l.horario, 'DD/MM/YYYY HH24:MI:SS') AS horario_formatado
    FROM leituras_rfid l
    LEFT JOIN etiquetas_rfid t ON t.etiqueta_hex = l.etiqueta_hex
"#;

#[derive(Clone)]
pub struct ReadRepository {
    pool: PgPool,
}

impl ReadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Ruído dos leitores fica de fora: RSSI zerado ou prefixo desconhecido
    fn push_valid_reads(qb: &mut QueryBuilder<'_, Postgres>) {
        let patterns: Vec<String> = VALID_READ_PREFIXES
            .iter()
            .map(|prefix| format!("{prefix}%"))
            .collect();
        qb.push(" WHERE l.rssi <> 0 AND l.etiqueta_hex LIKE ANY(");
        qb.push_bind(patterns);
        qb.push(")");
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &ReadFilters) {
        push_contains(qb, "l.etiqueta_hex", filters.etiqueta.as_deref());
        if let Some(antena) = filters.antena {
            qb.push(" AND l.antena = ");
            qb.push_bind(antena);
        }
        if let Some(inicio) = filters.horario_inicio {
            qb.push(" AND l.horario >= ");
            qb.push_bind(inicio);
        }
        if let Some(fim) = filters.horario_fim {
            qb.push(" AND l.horario <= ");
            qb.push_bind(fim);
        }
    }

    pub async fn list(
        &self,
        filters: &ReadFilters,
        page: PageRequest,
    ) -> Result<(Vec<Read>, i64), AppError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM leituras_rfid l");
        Self::push_valid_reads(&mut count);
        Self::push_filters(&mut count, filters);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::new(READ_SELECT);
        Self::push_valid_reads(&mut qb);
        Self::push_filters(&mut qb, filters);
        qb.push(" ORDER BY l.horario DESC, l.id DESC");
        push_page(&mut qb, page);
        let reads = qb.build_query_as::<Read>().fetch_all(&self.pool).await?;

        Ok((reads, total))
    }

    pub async fn by_tag(&self, etiqueta_hex: &str, limite: i64) -> Result<Vec<Read>, AppError> {
        let mut qb = QueryBuilder::new(READ_SELECT);
        Self::push_valid_reads(&mut qb);
        qb.push(" AND l.etiqueta_hex = ");
        qb.push_bind(etiqueta_hex.to_string());
        qb.push(" ORDER BY l.horario DESC, l.id DESC LIMIT ");
        qb.push_bind(limite);

        let reads = qb.build_query_as::<Read>().fetch_all(&self.pool).await?;
        Ok(reads)
    }

    pub async fn statistics(&self, filters: &ReadFilters) -> Result<ReadStatistics, AppError> {
        let mut qb = QueryBuilder::new(
            r#"
            SELECT COUNT(DISTINCT l.etiqueta_hex) AS etiquetas_unicas,
                   COUNT(*) AS total_leituras,
                   COUNT(DISTINCT l.antena) AS antenas_unicas,
                   COUNT(DISTINCT l.horario::date) AS dias_com_leitura,
                   MIN(l.horario) AS primeira_leitura,
                   MAX(l.horario) AS ultima_leitura,
                   COUNT(DISTINCT l.etiqueta_hex) FILTER (WHERE t.id IS NOT NULL) AS etiquetas_cadastradas,
                   COUNT(DISTINCT l.etiqueta_hex) FILTER (WHERE t.id IS NULL) AS etiquetas_nao_cadastradas
            FROM leituras_rfid l
            LEFT JOIN etiquetas_rfid t ON t.etiqueta_hex = l.etiqueta_hex
            "#,
        );
        Self::push_valid_reads(&mut qb);
        Self::push_filters(&mut qb, filters);

        let stats = qb
            .build_query_as::<ReadStatistics>()
            .fetch_one(&self.pool)
            .await?;
        Ok(stats)
    }

    /// Grava um lote de leituras num único INSERT.
    pub async fn insert_batch(&self, reads: Vec<NewRead>) -> Result<u64, AppError> {
        if reads.is_empty() {
            return Ok(0);
        }

        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO leituras_rfid (codigo_leitor, horario, antena, etiqueta_hex, rssi, foto) ",
        );
        qb.push_values(reads, |mut row, read| {
            row.push_bind(read.codigo_leitor)
                .push_bind(read.horario)
                .push_bind(read.antena)
                .push_bind(read.etiqueta_hex)
                .push_bind(read.rssi)
                .push_bind(read.foto);
        });

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
