// src/db/ping_repo.rs

use chrono::NaiveDateTime;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    common::{
        db_utils::{push_contains, push_page},
        error::AppError,
        rfid::PING_PREFIX,
    },
    models::{
        pagination::PageRequest,
        ping::{AntennaFilter, PhotoInfo, Ping, PingFilters, ReaderAntennas},
    },
};

const PING_SELECT: &str = r#"
    SELECT l.id, l.codigo_leitor, l.horario, l.antena, l.etiqueta_hex, l.rssi,
           (l.foto IS NOT NULL) AS tem_foto,
           format('[%s] A%s', l.codigo_leitor, l.antena) AS antena_completa,
           to_char(l.horario, 'DD/MM/YYYY HH24:MI:SS') AS horario_formatado
    FROM leituras_rfid l
"#;

/// (total, códigos distintos, pares leitor/antena, primeiro, último)
pub type PingTotals = (i64, i64, i64, Option<NaiveDateTime>, Option<NaiveDateTime>);

#[derive(Clone)]
pub struct PingRepository {
    pool: PgPool,
}

impl PingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_ping_only(qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE starts_with(l.etiqueta_hex, ");
        qb.push_bind(PING_PREFIX);
        qb.push(")");
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &PingFilters) {
        push_contains(qb, "l.etiqueta_hex", filters.etiqueta.as_deref());
        match &filters.antena {
            Some(AntennaFilter::Antenna(antena)) => {
                qb.push(" AND l.antena = ");
                qb.push_bind(*antena);
            }
            Some(AntennaFilter::ReaderAntenna { codigo_leitor, antena }) => {
                qb.push(" AND l.codigo_leitor = ");
                qb.push_bind(codigo_leitor.clone());
                qb.push(" AND l.antena = ");
                qb.push_bind(*antena);
            }
            None => {}
        }
        if let Some(codigo_leitor) = &filters.codigo_leitor {
            qb.push(" AND l.codigo_leitor = ");
            qb.push_bind(codigo_leitor.clone());
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

    pub async fn count(&self, filters: &PingFilters) -> Result<i64, AppError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM leituras_rfid l");
        Self::push_ping_only(&mut qb);
        Self::push_filters(&mut qb, filters);
        let total = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(total)
    }

    pub async fn list(&self, filters: &PingFilters, page: PageRequest) -> Result<Vec<Ping>, AppError> {
        let mut qb = QueryBuilder::new(PING_SELECT);
        Self::push_ping_only(&mut qb);
        Self::push_filters(&mut qb, filters);
        qb.push(" ORDER BY l.horario DESC, l.id DESC");
        push_page(&mut qb, page);

        let pings = qb.build_query_as::<Ping>().fetch_all(&self.pool).await?;
        Ok(pings)
    }

    pub async fn totals(&self) -> Result<PingTotals, AppError> {
        let mut qb = QueryBuilder::new(
            "SELECT COUNT(*), COUNT(DISTINCT l.etiqueta_hex), \
             COUNT(DISTINCT (l.codigo_leitor, l.antena)), MIN(l.horario), MAX(l.horario) \
             FROM leituras_rfid l",
        );
        Self::push_ping_only(&mut qb);

        let totals = qb.build_query_as::<PingTotals>().fetch_one(&self.pool).await?;
        Ok(totals)
    }

    pub async fn by_tag(&self, etiqueta_hex: &str, limite: i64) -> Result<Vec<Ping>, AppError> {
        let mut qb = QueryBuilder::new(PING_SELECT);
        Self::push_ping_only(&mut qb);
        qb.push(" AND l.etiqueta_hex = ");
        qb.push_bind(etiqueta_hex.to_string());
        qb.push(" ORDER BY l.horario DESC, l.id DESC LIMIT ");
        qb.push_bind(limite);

        let pings = qb.build_query_as::<Ping>().fetch_all(&self.pool).await?;
        Ok(pings)
    }

    pub async fn antennas(&self) -> Result<Vec<ReaderAntennas>, AppError> {
        let mut qb = QueryBuilder::new(
            "SELECT l.codigo_leitor, array_agg(DISTINCT l.antena ORDER BY l.antena) AS antenas \
             FROM leituras_rfid l",
        );
        Self::push_ping_only(&mut qb);
        qb.push(" GROUP BY l.codigo_leitor ORDER BY l.codigo_leitor");

        let antennas = qb
            .build_query_as::<ReaderAntennas>()
            .fetch_all(&self.pool)
            .await?;
        Ok(antennas)
    }

    pub async fn latest_photo_by_tag(&self, etiqueta_hex: &str) -> Result<Option<Vec<u8>>, AppError> {
        let photo = sqlx::query_scalar(
            "SELECT foto FROM leituras_rfid WHERE etiqueta_hex = $1 AND foto IS NOT NULL \
             ORDER BY horario DESC, id DESC LIMIT 1",
        )
        .bind(etiqueta_hex)
        .fetch_optional(&self.pool)
        .await?;
        Ok(photo)
    }

    /// Foto tirada por uma antena dentro do segundo informado.
    pub async fn photo_at(
        &self,
        codigo_leitor: &str,
        antena: i32,
        horario: NaiveDateTime,
    ) -> Result<Option<Vec<u8>>, AppError> {
        let photo = sqlx::query_scalar(
            r#"
            SELECT foto FROM leituras_rfid
            WHERE codigo_leitor = $1 AND antena = $2
              AND horario >= $3 AND horario < $3 + INTERVAL '1 second'
              AND foto IS NOT NULL
            ORDER BY horario DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(codigo_leitor)
        .bind(antena)
        .bind(horario)
        .fetch_optional(&self.pool)
        .await?;
        Ok(photo)
    }

    pub async fn photo_info(&self, etiqueta_hex: &str) -> Result<PhotoInfo, AppError> {
        let info = sqlx::query_as::<_, PhotoInfo>(
            r#"
            SELECT $1::text AS etiqueta_hex,
                   COUNT(*) > 0 AS tem_foto,
                   COUNT(*) AS total_fotos,
                   MAX(horario) AS ultima_foto
            FROM leituras_rfid
            WHERE etiqueta_hex = $1 AND foto IS NOT NULL
            "#,
        )
        .bind(etiqueta_hex)
        .fetch_one(&self.pool)
        .await?;
        Ok(info)
    }
}
