// src/db/inventory_repo.rs

use chrono::NaiveDateTime;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};

use crate::{
    common::{
        db_utils::{push_contains, push_page},
        error::AppError,
    },
    models::{
        inventory::{
            CollaboratorInventories, Inventory, InventoryFilters, InventoryItem, InventoryStatus,
            InventorySummary, ItemFilters, ItemStatus,
        },
        pagination::PageRequest,
    },
};

const INVENTORY_COLUMNS: &str = "i.id, i.data_inventario, i.id_colaborador, i.observacao, i.status, i.finalizado_em";

// Cabeçalho + contagem dos itens. Precisa de GROUP BY i.id no final.
const SUMMARY_SELECT: &str = r#"
    SELECT i.id, i.data_inventario, i.id_colaborador, i.observacao, i.status, i.finalizado_em,
           COUNT(it.id) AS total_itens,
           COUNT(it.id) FILTER (WHERE it.status = 'Localizado') AS itens_localizados,
           COALESCE(ROUND(100.0 * COUNT(it.id) FILTER (WHERE it.status = 'Localizado')
                          / NULLIF(COUNT(it.id), 0), 2), 0) AS percentual_localizado
    FROM inventarios_rfid i
    LEFT JOIN inventario_itens_rfid it ON it.id_inventario = i.id
"#;

const ITEM_COLUMNS: &str = "id, id_inventario, etiqueta_hex, descricao, status, origem, \
    codigo_leitor, antena, data_localizacao, observacao";

#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
}

impl InventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &InventoryFilters) {
        if let Some(status) = filters.status {
            qb.push(" AND i.status = ");
            qb.push_bind(status);
        }
        if let Some(id_colaborador) = filters.id_colaborador {
            qb.push(" AND i.id_colaborador = ");
            qb.push_bind(id_colaborador);
        }
        if let Some(data_inicio) = filters.data_inicio {
            qb.push(" AND i.data_inventario::date >= ");
            qb.push_bind(data_inicio);
        }
        if let Some(data_fim) = filters.data_fim {
            qb.push(" AND i.data_inventario::date <= ");
            qb.push_bind(data_fim);
        }
    }

    // ---
    // Leitura
    // ---

    pub async fn list(
        &self,
        filters: &InventoryFilters,
        page: PageRequest,
    ) -> Result<(Vec<InventorySummary>, i64), AppError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM inventarios_rfid i WHERE TRUE");
        Self::push_filters(&mut count, filters);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::new(SUMMARY_SELECT);
        qb.push(" WHERE TRUE");
        Self::push_filters(&mut qb, filters);
        qb.push(" GROUP BY i.id ORDER BY i.data_inventario DESC, i.id DESC");
        push_page(&mut qb, page);
        let inventories = qb
            .build_query_as::<InventorySummary>()
            .fetch_all(&self.pool)
            .await?;

        Ok((inventories, total))
    }

    pub async fn summaries_since(
        &self,
        desde: NaiveDateTime,
    ) -> Result<Vec<InventorySummary>, AppError> {
        let inventories = sqlx::query_as::<_, InventorySummary>(&format!(
            "{SUMMARY_SELECT} WHERE i.data_inventario >= $1 GROUP BY i.id ORDER BY i.data_inventario DESC"
        ))
        .bind(desde)
        .fetch_all(&self.pool)
        .await?;
        Ok(inventories)
    }

    pub async fn summary_by_id<'e, E>(
        &self,
        executor: E,
        id: i32,
    ) -> Result<Option<InventorySummary>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let inventory = sqlx::query_as::<_, InventorySummary>(&format!(
            "{SUMMARY_SELECT} WHERE i.id = $1 GROUP BY i.id"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(inventory)
    }

    pub async fn latest(&self, id_colaborador: Option<i32>) -> Result<Option<InventorySummary>, AppError> {
        let mut qb = QueryBuilder::new(SUMMARY_SELECT);
        qb.push(" WHERE TRUE");
        if let Some(id_colaborador) = id_colaborador {
            qb.push(" AND i.id_colaborador = ");
            qb.push_bind(id_colaborador);
        }
        qb.push(" GROUP BY i.id ORDER BY i.data_inventario DESC, i.id DESC LIMIT 1");
        let inventory = qb
            .build_query_as::<InventorySummary>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(inventory)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: i32) -> Result<Option<Inventory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let inventory = sqlx::query_as::<_, Inventory>(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventarios_rfid i WHERE i.id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(inventory)
    }

    /// Trava o cabeçalho do inventário. Serializa escritas concorrentes com a finalização.
    pub async fn lock_by_id<'e, E>(&self, executor: E, id: i32) -> Result<Option<Inventory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let inventory = sqlx::query_as::<_, Inventory>(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventarios_rfid i WHERE i.id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(inventory)
    }

    pub async fn items(&self, id_inventario: i32, filters: &ItemFilters) -> Result<Vec<InventoryItem>, AppError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {ITEM_COLUMNS} FROM inventario_itens_rfid WHERE id_inventario = "
        ));
        qb.push_bind(id_inventario);
        if let Some(status) = filters.status {
            qb.push(" AND status = ");
            qb.push_bind(status);
        }
        push_contains(&mut qb, "etiqueta_hex", filters.etiqueta.as_deref());
        push_contains(&mut qb, "descricao", filters.descricao.as_deref());
        qb.push(" ORDER BY status DESC, descricao NULLS LAST, etiqueta_hex");

        let items = qb
            .build_query_as::<InventoryItem>()
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn top_collaborators(
        &self,
        desde: NaiveDateTime,
        limite: i64,
    ) -> Result<Vec<CollaboratorInventories>, AppError> {
        let collaborators = sqlx::query_as::<_, CollaboratorInventories>(
            r#"
            SELECT id_colaborador, COUNT(*) AS total_inventarios
            FROM inventarios_rfid
            WHERE data_inventario >= $1
            GROUP BY id_colaborador
            ORDER BY total_inventarios DESC, id_colaborador
            LIMIT $2
            "#,
        )
        .bind(desde)
        .bind(limite)
        .fetch_all(&self.pool)
        .await?;
        Ok(collaborators)
    }

    // ---
    // Escrita (rodam dentro da transação aberta pelo serviço)
    // ---

    pub async fn create<'e, E>(
        &self,
        executor: E,
        id_colaborador: i32,
        observacao: &str,
    ) -> Result<Inventory, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let inventory = sqlx::query_as::<_, Inventory>(
            r#"
            INSERT INTO inventarios_rfid (data_inventario, id_colaborador, observacao, status)
            VALUES (LOCALTIMESTAMP, $1, $2, 'Em andamento')
            RETURNING id, data_inventario, id_colaborador, observacao, status, finalizado_em
            "#,
        )
        .bind(id_colaborador)
        .bind(observacao)
        .fetch_one(executor)
        .await?;
        Ok(inventory)
    }

    /// Copia todas as etiquetas ativas para o inventário como "Não localizado".
    pub async fn snapshot_active_tags<'e, E>(&self, executor: E, id_inventario: i32) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO inventario_itens_rfid (id_inventario, etiqueta_hex, descricao, status)
            SELECT $1, etiqueta_hex, descricao, 'Não localizado'
            FROM etiquetas_rfid
            WHERE destruida IS NULL
            "#,
        )
        .bind(id_inventario)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Marca como localizados os itens lidos por alguma antena desde `desde`,
    /// usando a leitura mais recente de cada etiqueta.
    pub async fn locate_from_reads<'e, E>(
        &self,
        executor: E,
        id_inventario: i32,
        desde: NaiveDateTime,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE inventario_itens_rfid it
            SET status = 'Localizado',
                origem = 'Antena',
                codigo_leitor = r.codigo_leitor,
                antena = r.antena,
                data_localizacao = r.horario
            FROM (
                SELECT DISTINCT ON (etiqueta_hex) etiqueta_hex, codigo_leitor, antena, horario
                FROM leituras_rfid
                WHERE horario >= $2 AND rssi <> 0
                ORDER BY etiqueta_hex, horario DESC
            ) r
            WHERE it.id_inventario = $1 AND it.etiqueta_hex = r.etiqueta_hex
            "#,
        )
        .bind(id_inventario)
        .bind(desde)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Dentre os códigos informados, os que fazem parte do inventário e o
    /// status atual de cada um.
    pub async fn roster_status<'e, E>(
        &self,
        executor: E,
        id_inventario: i32,
        codes: &[String],
    ) -> Result<Vec<(String, ItemStatus)>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, (String, ItemStatus)>(
            "SELECT etiqueta_hex, status FROM inventario_itens_rfid \
             WHERE id_inventario = $1 AND etiqueta_hex = ANY($2)",
        )
        .bind(id_inventario)
        .bind(codes)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    /// Marca como localizados via coletor os itens ainda não localizados.
    pub async fn locate_from_handheld<'e, E>(
        &self,
        executor: E,
        id_inventario: i32,
        codes: &[String],
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE inventario_itens_rfid
            SET status = 'Localizado',
                origem = 'Leitor móvel',
                codigo_leitor = NULL,
                antena = NULL,
                data_localizacao = LOCALTIMESTAMP
            WHERE id_inventario = $1
              AND etiqueta_hex = ANY($2)
              AND status = 'Não localizado'
            "#,
        )
        .bind(id_inventario)
        .bind(codes)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn set_item_status<'e, E>(
        &self,
        executor: E,
        id_inventario: i32,
        etiqueta_hex: &str,
        status: ItemStatus,
        observacao: Option<&str>,
    ) -> Result<Option<InventoryItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            UPDATE inventario_itens_rfid
            SET status = $3,
                origem = CASE WHEN $3 = 'Localizado'::status_item_inventario
                              THEN 'Manual'::origem_localizacao END,
                codigo_leitor = NULL,
                antena = NULL,
                data_localizacao = CASE WHEN $3 = 'Localizado'::status_item_inventario
                                        THEN LOCALTIMESTAMP END,
                observacao = COALESCE($4, observacao)
            WHERE id_inventario = $1 AND etiqueta_hex = $2
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(id_inventario)
        .bind(etiqueta_hex)
        .bind(status)
        .bind(observacao)
        .fetch_optional(executor)
        .await?;
        Ok(item)
    }

    pub async fn finalize<'e, E>(&self, executor: E, id: i32) -> Result<Inventory, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let inventory = sqlx::query_as::<_, Inventory>(
            r#"
            UPDATE inventarios_rfid
            SET status = $2, finalizado_em = LOCALTIMESTAMP
            WHERE id = $1
            RETURNING id, data_inventario, id_colaborador, observacao, status, finalizado_em
            "#,
        )
        .bind(id)
        .bind(InventoryStatus::Finalizado)
        .fetch_one(executor)
        .await?;
        Ok(inventory)
    }
}
