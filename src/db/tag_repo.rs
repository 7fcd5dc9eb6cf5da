// src/db/tag_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};

use crate::{
    common::{
        db_utils::{push_contains, push_page},
        error::AppError,
    },
    models::{
        pagination::PageRequest,
        tag::{NewTag, Tag, TagChanges, TagFilters, TagStatistics},
    },
};

const TAG_COLUMNS: &str = "id, etiqueta_hex, descricao, numero_serie, numero_patrimonio, \
    destruida, criada_em, (destruida IS NULL) AS ativa, (foto IS NOT NULL) AS tem_foto";

#[derive(Clone)]
pub struct TagRepository {
    pool: PgPool,
}

impl TagRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &TagFilters) {
        push_contains(qb, "etiqueta_hex", filters.etiqueta.as_deref());
        push_contains(qb, "descricao", filters.descricao.as_deref());
        match filters.destruida {
            Some(true) => {
                qb.push(" AND destruida IS NOT NULL");
            }
            Some(false) => {
                qb.push(" AND destruida IS NULL");
            }
            None => {}
        }
    }

    // ---
    // Leitura
    // ---

    pub async fn list(
        &self,
        filters: &TagFilters,
        page: PageRequest,
    ) -> Result<(Vec<Tag>, i64), AppError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM etiquetas_rfid WHERE TRUE");
        Self::push_filters(&mut count, filters);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::new(format!("SELECT {TAG_COLUMNS} FROM etiquetas_rfid WHERE TRUE"));
        Self::push_filters(&mut qb, filters);
        qb.push(" ORDER BY id DESC");
        push_page(&mut qb, page);
        let tags = qb.build_query_as::<Tag>().fetch_all(&self.pool).await?;

        Ok((tags, total))
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: i32) -> Result<Option<Tag>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tag = sqlx::query_as::<_, Tag>(&format!(
            "SELECT {TAG_COLUMNS} FROM etiquetas_rfid WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(tag)
    }

    /// Busca pelo código e trava a linha até o fim da transação.
    pub async fn find_by_hex_for_update<'e, E>(
        &self,
        executor: E,
        etiqueta_hex: &str,
    ) -> Result<Option<Tag>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tag = sqlx::query_as::<_, Tag>(&format!(
            "SELECT {TAG_COLUMNS} FROM etiquetas_rfid WHERE etiqueta_hex = $1 FOR UPDATE"
        ))
        .bind(etiqueta_hex)
        .fetch_optional(executor)
        .await?;
        Ok(tag)
    }

    pub async fn find_by_hex<'e, E>(&self, executor: E, etiqueta_hex: &str) -> Result<Option<Tag>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tag = sqlx::query_as::<_, Tag>(&format!(
            "SELECT {TAG_COLUMNS} FROM etiquetas_rfid WHERE etiqueta_hex = $1"
        ))
        .bind(etiqueta_hex)
        .fetch_optional(executor)
        .await?;
        Ok(tag)
    }

    pub async fn photo(&self, id: i32) -> Result<Option<Vec<u8>>, AppError> {
        let photo: Option<Option<Vec<u8>>> =
            sqlx::query_scalar("SELECT foto FROM etiquetas_rfid WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(photo.flatten())
    }

    pub async fn statistics(&self) -> Result<TagStatistics, AppError> {
        let (total, ativas): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE destruida IS NULL) FROM etiquetas_rfid",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(TagStatistics {
            total,
            ativas,
            destruidas: total - ativas,
            percentual_ativas: crate::common::stats::percent(ativas, total),
            from_cache: false,
        })
    }

    // ---
    // Escrita
    // ---

    pub async fn create<'e, E>(&self, executor: E, tag: &NewTag) -> Result<Tag, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Tag>(&format!(
            r#"
            INSERT INTO etiquetas_rfid (etiqueta_hex, descricao, numero_serie, numero_patrimonio, foto)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TAG_COLUMNS}
            "#
        ))
        .bind(&tag.etiqueta_hex)
        .bind(&tag.descricao)
        .bind(&tag.numero_serie)
        .bind(&tag.numero_patrimonio)
        .bind(&tag.foto)
        .fetch_one(executor)
        .await
        .map_err(|e| unique_violation(e, &tag.etiqueta_hex))
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: i32,
        changes: &TagChanges,
    ) -> Result<Option<Tag>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Só os campos informados são alterados
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE etiquetas_rfid SET ");
        let mut sets = qb.separated(", ");
        if let Some(descricao) = &changes.descricao {
            sets.push("descricao = ").push_bind_unseparated(descricao.clone());
        }
        if let Some(numero_serie) = &changes.numero_serie {
            sets.push("numero_serie = ")
                .push_bind_unseparated(blank_as_null(numero_serie));
        }
        if let Some(numero_patrimonio) = &changes.numero_patrimonio {
            sets.push("numero_patrimonio = ")
                .push_bind_unseparated(blank_as_null(numero_patrimonio));
        }
        if let Some(foto) = &changes.foto {
            sets.push("foto = ").push_bind_unseparated(foto.clone());
        }
        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.push(format!(" RETURNING {TAG_COLUMNS}"));

        qb.build_query_as::<Tag>()
            .fetch_optional(executor)
            .await
            .map_err(|e| unique_violation(e, ""))
    }

    /// Marca como destruída. `None` se a etiqueta não existe ou já estava destruída.
    pub async fn mark_destroyed<'e, E>(&self, executor: E, id: i32) -> Result<Option<Tag>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tag = sqlx::query_as::<_, Tag>(&format!(
            "UPDATE etiquetas_rfid SET destruida = LOCALTIMESTAMP \
             WHERE id = $1 AND destruida IS NULL RETURNING {TAG_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(tag)
    }

    pub async fn restore<'e, E>(&self, executor: E, id: i32) -> Result<Option<Tag>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tag = sqlx::query_as::<_, Tag>(&format!(
            "UPDATE etiquetas_rfid SET destruida = NULL \
             WHERE id = $1 AND destruida IS NOT NULL RETURNING {TAG_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(tag)
    }
}

fn blank_as_null(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

// Traduz as violações de UNIQUE para mensagens com o campo duplicado
fn unique_violation(e: sqlx::Error, etiqueta_hex: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or_default();
            if constraint.contains("numero_serie") {
                return AppError::conflict("Número de série já cadastrado em outra etiqueta");
            }
            if constraint.contains("numero_patrimonio") {
                return AppError::conflict("Número de patrimônio já cadastrado em outra etiqueta");
            }
            return AppError::conflict(format!("Etiqueta {etiqueta_hex} já está cadastrada"));
        }
    }
    e.into()
}
