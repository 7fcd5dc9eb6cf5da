// src/db/loan_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};

use crate::{
    common::{
        db_utils::{push_contains, push_page},
        error::AppError,
    },
    models::{
        loan::{CollaboratorLoans, Loan, LoanFilters, LoanStatus, ToolUsage},
        pagination::PageRequest,
    },
};

// Empréstimo com a descrição da ferramenta e o status calculado
const LOAN_SELECT: &str = r#"
    SELECT e.id, e.id_colaborador, e.etiqueta_hex, e.data_emprestimo, e.data_devolucao,
           e.observacao, t.descricao AS descricao_ferramenta,
           CASE WHEN e.data_devolucao IS NULL THEN 'ativo' ELSE 'devolvido' END AS status,
           to_char(e.data_emprestimo, 'DD/MM/YYYY HH24:MI') AS data_emprestimo_formatada,
           to_char(e.data_devolucao, 'DD/MM/YYYY HH24:MI') AS data_devolucao_formatada
    FROM emprestimos_rfid e
    LEFT JOIN etiquetas_rfid t ON t.etiqueta_hex = e.etiqueta_hex
"#;

#[derive(Clone)]
pub struct LoanRepository {
    pool: PgPool,
}

impl LoanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &LoanFilters) {
        if let Some(id_colaborador) = filters.id_colaborador {
            qb.push(" AND e.id_colaborador = ");
            qb.push_bind(id_colaborador);
        }
        push_contains(qb, "e.etiqueta_hex", filters.etiqueta.as_deref());
        match filters.status {
            Some(LoanStatus::Ativo) => {
                qb.push(" AND e.data_devolucao IS NULL");
            }
            Some(LoanStatus::Devolvido) => {
                qb.push(" AND e.data_devolucao IS NOT NULL");
            }
            None => {}
        }
        if let Some(data_inicio) = filters.data_inicio {
            qb.push(" AND e.data_emprestimo::date >= ");
            qb.push_bind(data_inicio);
        }
        if let Some(data_fim) = filters.data_fim {
            qb.push(" AND e.data_emprestimo::date <= ");
            qb.push_bind(data_fim);
        }
    }

    pub async fn list(
        &self,
        filters: &LoanFilters,
        page: PageRequest,
    ) -> Result<(Vec<Loan>, i64), AppError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM emprestimos_rfid e WHERE TRUE");
        Self::push_filters(&mut count, filters);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::new(LOAN_SELECT);
        qb.push(" WHERE TRUE");
        Self::push_filters(&mut qb, filters);
        qb.push(" ORDER BY e.data_emprestimo DESC, e.id DESC");
        push_page(&mut qb, page);
        let loans = qb.build_query_as::<Loan>().fetch_all(&self.pool).await?;

        Ok((loans, total))
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: i32) -> Result<Option<Loan>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let loan = sqlx::query_as::<_, Loan>(&format!("{LOAN_SELECT} WHERE e.id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(loan)
    }

    pub async fn find_active_by_tag<'e, E>(
        &self,
        executor: E,
        etiqueta_hex: &str,
    ) -> Result<Option<Loan>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let loan = sqlx::query_as::<_, Loan>(&format!(
            "{LOAN_SELECT} WHERE e.etiqueta_hex = $1 AND e.data_devolucao IS NULL \
             ORDER BY e.data_emprestimo DESC LIMIT 1"
        ))
        .bind(etiqueta_hex)
        .fetch_optional(executor)
        .await?;
        Ok(loan)
    }

    pub async fn active_by_collaborator(&self, id_colaborador: i32) -> Result<Vec<Loan>, AppError> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "{LOAN_SELECT} WHERE e.id_colaborador = $1 AND e.data_devolucao IS NULL \
             ORDER BY e.data_emprestimo DESC"
        ))
        .bind(id_colaborador)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    pub async fn history_by_tag(&self, etiqueta_hex: &str, limite: i64) -> Result<Vec<Loan>, AppError> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "{LOAN_SELECT} WHERE e.etiqueta_hex = $1 ORDER BY e.data_emprestimo DESC LIMIT $2"
        ))
        .bind(etiqueta_hex)
        .bind(limite)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    /// Empréstimos ativos, do mais antigo para o mais recente.
    pub async fn pending(&self) -> Result<Vec<Loan>, AppError> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "{LOAN_SELECT} WHERE e.data_devolucao IS NULL ORDER BY e.data_emprestimo ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    /// (total, ativos)
    pub async fn counts(&self) -> Result<(i64, i64), AppError> {
        let counts = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE data_devolucao IS NULL) FROM emprestimos_rfid",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(counts)
    }

    pub async fn most_loaned_tools(&self, limite: i64) -> Result<Vec<ToolUsage>, AppError> {
        let tools = sqlx::query_as::<_, ToolUsage>(
            r#"
            SELECT e.etiqueta_hex, MAX(t.descricao) AS descricao, COUNT(*) AS total_emprestimos
            FROM emprestimos_rfid e
            LEFT JOIN etiquetas_rfid t ON t.etiqueta_hex = e.etiqueta_hex
            GROUP BY e.etiqueta_hex
            ORDER BY total_emprestimos DESC, e.etiqueta_hex
            LIMIT $1
            "#,
        )
        .bind(limite)
        .fetch_all(&self.pool)
        .await?;
        Ok(tools)
    }

    pub async fn collaborators_with_active_loans(
        &self,
        limite: i64,
    ) -> Result<Vec<CollaboratorLoans>, AppError> {
        let collaborators = sqlx::query_as::<_, CollaboratorLoans>(
            r#"
            SELECT id_colaborador, COUNT(*) AS emprestimos_ativos
            FROM emprestimos_rfid
            WHERE data_devolucao IS NULL
            GROUP BY id_colaborador
            ORDER BY emprestimos_ativos DESC, id_colaborador
            LIMIT $1
            "#,
        )
        .bind(limite)
        .fetch_all(&self.pool)
        .await?;
        Ok(collaborators)
    }

    // ---
    // Escrita
    // ---

    pub async fn create<'e, E>(
        &self,
        executor: E,
        id_colaborador: i32,
        etiqueta_hex: &str,
        observacao: &str,
    ) -> Result<i32, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO emprestimos_rfid (id_colaborador, etiqueta_hex, data_emprestimo, observacao)
            VALUES ($1, $2, LOCALTIMESTAMP, $3)
            RETURNING id
            "#,
        )
        .bind(id_colaborador)
        .bind(etiqueta_hex)
        .bind(observacao)
        .fetch_one(executor)
        .await?;
        Ok(id)
    }

    /// Registra a devolução. `None` se o empréstimo já estava devolvido.
    pub async fn mark_returned<'e, E>(
        &self,
        executor: E,
        id: i32,
        observacao: Option<&str>,
    ) -> Result<Option<i32>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar(
            r#"
            UPDATE emprestimos_rfid
            SET data_devolucao = LOCALTIMESTAMP,
                observacao = CASE
                    WHEN $2::text IS NULL THEN observacao
                    ELSE observacao || E'\nDevolução: ' || $2::text
                END
            WHERE id = $1 AND data_devolucao IS NULL
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(observacao)
        .fetch_optional(executor)
        .await?;
        Ok(id)
    }
}
