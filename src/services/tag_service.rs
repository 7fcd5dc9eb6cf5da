// src/services/tag_service.rs

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    common::{cache::TtlCache, error::AppError, rfid::normalize_tag_code},
    db::{LoanRepository, TagRepository},
    models::{
        pagination::{PageRequest, Paginated},
        tag::{NewTag, Tag, TagChanges, TagFilters, TagStatistics},
    },
};

#[derive(Clone)]
pub struct TagService {
    pool: PgPool,
    repo: TagRepository,
    loan_repo: LoanRepository,
    cache: Arc<TtlCache>,
    // as listagens de empréstimos exibem a descrição da etiqueta
    loan_cache: Arc<TtlCache>,
}

impl TagService {
    pub fn new(
        pool: PgPool,
        repo: TagRepository,
        loan_repo: LoanRepository,
        cache: Arc<TtlCache>,
        loan_cache: Arc<TtlCache>,
    ) -> Self {
        Self {
            pool,
            repo,
            loan_repo,
            cache,
            loan_cache,
        }
    }

    fn invalidate(&self) {
        self.cache.clear();
        self.loan_cache.clear();
    }

    pub async fn list_tags(
        &self,
        filters: TagFilters,
        page: PageRequest,
        force_refresh: bool,
    ) -> Result<Paginated<Tag>, AppError> {
        let key = TtlCache::key("etiquetas", &(&filters, page));
        if !force_refresh {
            if let Some(mut cached) = self.cache.get::<Paginated<Tag>>(&key) {
                cached.from_cache = true;
                return Ok(cached);
            }
        }

        let (tags, total) = self.repo.list(&filters, page).await?;
        let result = page.wrap(tags, total);
        self.cache.insert(key, &result);
        Ok(result)
    }

    pub async fn get_tag(&self, id: i32) -> Result<Tag, AppError> {
        self.repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::not_found("Etiqueta não encontrada"))
    }

    pub async fn get_photo(&self, id: i32) -> Result<Vec<u8>, AppError> {
        self.repo
            .photo(id)
            .await?
            .ok_or_else(|| AppError::not_found("Foto não encontrada"))
    }

    pub async fn create_tag(&self, mut tag: NewTag) -> Result<Tag, AppError> {
        tag.etiqueta_hex = normalize_tag_code(&tag.etiqueta_hex);
        if tag.etiqueta_hex.is_empty() {
            return Err(AppError::bad_request("Informe o código da etiqueta"));
        }
        tag.descricao = tag.descricao.map(|d| d.trim().to_string()).filter(|d| !d.is_empty());
        tag.numero_serie = tag.numero_serie.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        tag.numero_patrimonio = tag
            .numero_patrimonio
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let created = self.repo.create(&self.pool, &tag).await?;
        self.invalidate();

        tracing::info!(id = created.id, etiqueta = %created.etiqueta_hex, "✅ Etiqueta cadastrada");
        Ok(created)
    }

    pub async fn update_tag(&self, id: i32, changes: TagChanges) -> Result<Tag, AppError> {
        if changes.is_empty() {
            return Err(AppError::bad_request("Nenhum campo para atualizar"));
        }

        let updated = self
            .repo
            .update(&self.pool, id, &changes)
            .await?
            .ok_or_else(|| AppError::not_found("Etiqueta não encontrada"))?;
        self.invalidate();

        tracing::info!(id, "Etiqueta atualizada");
        Ok(updated)
    }

    /// Exclusão lógica. Ferramenta emprestada não pode ser baixada.
    pub async fn destroy_tag(&self, id: i32) -> Result<Tag, AppError> {
        let mut tx = self.pool.begin().await?;

        let tag = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Etiqueta não encontrada"))?;
        if !tag.ativa {
            return Err(AppError::bad_request("Etiqueta já está destruída"));
        }

        // trava a etiqueta para não concorrer com um novo empréstimo
        self.repo.find_by_hex_for_update(&mut *tx, &tag.etiqueta_hex).await?;
        if let Some(loan) = self
            .loan_repo
            .find_active_by_tag(&mut *tx, &tag.etiqueta_hex)
            .await?
        {
            return Err(AppError::bad_request(format!(
                "Etiqueta possui empréstimo ativo para o colaborador ID {}",
                loan.id_colaborador
            )));
        }

        let destroyed = self
            .repo
            .mark_destroyed(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::bad_request("Etiqueta já está destruída"))?;
        tx.commit().await?;
        self.invalidate();

        tracing::info!(id, etiqueta = %destroyed.etiqueta_hex, "🔥 Etiqueta marcada como destruída");
        Ok(destroyed)
    }

    pub async fn restore_tag(&self, id: i32) -> Result<Tag, AppError> {
        let restored = match self.repo.restore(&self.pool, id).await? {
            Some(tag) => tag,
            None => {
                // distingue "não existe" de "já ativa"
                self.get_tag(id).await?;
                return Err(AppError::bad_request("Etiqueta não está destruída"));
            }
        };
        self.invalidate();

        tracing::info!(id, etiqueta = %restored.etiqueta_hex, "Etiqueta restaurada");
        Ok(restored)
    }

    pub async fn statistics(&self, force_refresh: bool) -> Result<TagStatistics, AppError> {
        let key = TtlCache::key("etiquetas_estatisticas", &());
        if !force_refresh {
            if let Some(mut cached) = self.cache.get::<TagStatistics>(&key) {
                cached.from_cache = true;
                return Ok(cached);
            }
        }

        let stats = self.repo.statistics().await?;
        self.cache.insert(key, &stats);
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use super::*;
    use crate::config::{AppState, Settings};

    fn no_filters() -> TagFilters {
        TagFilters {
            etiqueta: None,
            descricao: None,
            destruida: None,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn destroy_then_restore_round_trips(pool: PgPool) {
        let state = AppState::with_pool(pool, Settings::for_tests());
        let tags = &state.tag_service;

        let tag = tags.create_tag(NewTag::sample("1a2b", "Furadeira")).await.unwrap();
        assert_eq!(tag.etiqueta_hex, "AAA0AAAA0000000000001A2B");
        assert!(tag.ativa);

        let destroyed = tags.destroy_tag(tag.id).await.unwrap();
        assert!(!destroyed.ativa);
        assert!(destroyed.destruida.is_some());
        assert!(matches!(tags.destroy_tag(tag.id).await, Err(AppError::BadRequest(_))));

        let restored = tags.restore_tag(tag.id).await.unwrap();
        assert!(restored.ativa);
        assert!(restored.destruida.is_none());
        assert!(matches!(tags.restore_tag(tag.id).await, Err(AppError::BadRequest(_))));
        assert!(matches!(tags.restore_tag(9999).await, Err(AppError::NotFound(_))));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn loaned_tag_cannot_be_destroyed(pool: PgPool) {
        let state = AppState::with_pool(pool, Settings::for_tests());
        let tag = state
            .tag_service
            .create_tag(NewTag::sample("AAA0AAAA0000000000000042", "Chave de torque"))
            .await
            .unwrap();
        let loan = state
            .loan_service
            .create_loan(7, &tag.etiqueta_hex, None)
            .await
            .unwrap();

        match state.tag_service.destroy_tag(tag.id).await {
            Err(AppError::BadRequest(msg)) => assert!(msg.contains("ID 7"), "{msg}"),
            other => panic!("esperava BadRequest, veio {other:?}"),
        }
        assert!(state.tag_service.get_tag(tag.id).await.unwrap().ativa);

        state.loan_service.return_loan(loan.id, None).await.unwrap();
        assert!(!state.tag_service.destroy_tag(tag.id).await.unwrap().ativa);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn duplicated_code_is_a_conflict(pool: PgPool) {
        let state = AppState::with_pool(pool, Settings::for_tests());
        state
            .tag_service
            .create_tag(NewTag::sample("1a2b", "Furadeira"))
            .await
            .unwrap();

        let again = state
            .tag_service
            .create_tag(NewTag::sample("AAA0AAAA0000000000001A2B", "Outra"))
            .await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn blank_code_is_rejected_before_insert(pool: PgPool) {
        let state = AppState::with_pool(pool, Settings::for_tests());

        match state.tag_service.create_tag(NewTag::sample("   ", "Sem código")).await {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Informe o código da etiqueta"),
            other => panic!("esperava BadRequest, veio {other:?}"),
        }
        let page = PageRequest::resolve(None, None, 20, 1000).unwrap();
        let listed = state.tag_service.list_tags(no_filters(), page, true).await.unwrap();
        assert_eq!(listed.total, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn listing_respects_limit_and_offset(pool: PgPool) {
        let state = AppState::with_pool(pool, Settings::for_tests());
        let mut ids = Vec::new();
        for n in 1..=5 {
            let tag = state
                .tag_service
                .create_tag(NewTag::sample(&format!("{n:X}"), &format!("Ferramenta {n}")))
                .await
                .unwrap();
            ids.push(tag.id);
        }

        let page = PageRequest::resolve(Some(2), Some(1), 20, 1000).unwrap();
        let listed = state.tag_service.list_tags(no_filters(), page, true).await.unwrap();

        assert_eq!(listed.total, 5);
        assert_eq!((listed.limite, listed.offset), (2, 1));
        // mais recentes primeiro
        let listed_ids: Vec<i32> = listed.itens.iter().map(|t| t.id).collect();
        assert_eq!(listed_ids, vec![ids[3], ids[2]]);
    }
}
