// src/common/cache.rs

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

struct CachedEntry {
    payload: Value,
    cached_at: Instant,
}

/// Cache de resultados de consultas com validade fixa (TTL).
///
/// Cada serviço tem a sua instância. As chaves combinam um prefixo com o
/// hash dos parâmetros da consulta e qualquer escrita limpa o cache inteiro.
pub struct TtlCache {
    name: &'static str,
    ttl: Duration,
    entries: DashMap<String, CachedEntry>,
}

impl TtlCache {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Monta a chave `"{prefixo}_{sha256}"` a partir dos parâmetros.
    ///
    /// Os parâmetros passam por `serde_json::Value`, cujos objetos têm as
    /// chaves ordenadas, então a ordem dos campos não altera o hash.
    pub fn key<P: Serialize>(prefix: &str, params: &P) -> String {
        let canonical = serde_json::to_value(params)
            .map(|v| v.to_string())
            .unwrap_or_default();
        let digest = Sha256::digest(canonical.as_bytes());
        format!("{}_{:x}", prefix, digest)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.entries.get(key)?;
        if entry.cached_at.elapsed() > self.ttl {
            drop(entry); // libera o lock de leitura antes de remover
            self.entries.remove(key);
            return None;
        }

        match serde_json::from_value(entry.payload.clone()) {
            Ok(value) => {
                tracing::debug!(cache = self.name, key, "cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(cache = self.name, key, "entrada de cache ilegível: {}", e);
                None
            }
        }
    }

    pub fn insert<T: Serialize>(&self, key: String, value: &T) {
        match serde_json::to_value(value) {
            Ok(payload) => {
                self.entries.insert(
                    key,
                    CachedEntry {
                        payload,
                        cached_at: Instant::now(),
                    },
                );
            }
            Err(e) => tracing::warn!(cache = self.name, "falha ao serializar para o cache: {}", e),
        }
    }

    pub fn clear(&self) {
        let (total, validas) = self.stats();
        self.entries.clear();
        if total > 0 {
            tracing::debug!(cache = self.name, total, validas, "cache limpo");
        }
    }

    /// (total, válidas)
    fn stats(&self) -> (usize, usize) {
        let total = self.entries.len();
        let fresh = self
            .entries
            .iter()
            .filter(|e| e.cached_at.elapsed() <= self.ttl)
            .count();
        (total, fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_ignores_field_order() {
        let a = TtlCache::key("emprestimos", &json!({"limite": 20, "offset": 0, "status": "ativo"}));
        let b = TtlCache::key("emprestimos", &json!({"status": "ativo", "offset": 0, "limite": 20}));
        let c = TtlCache::key("emprestimos", &json!({"status": "devolvido", "offset": 0, "limite": 20}));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("emprestimos_"));
        assert_eq!(a.len(), "emprestimos_".len() + 64);
    }

    #[test]
    fn returns_fresh_entries_and_clears() {
        let cache = TtlCache::new("teste", Duration::from_secs(60));
        cache.insert("k".to_string(), &vec![1, 2, 3]);

        assert_eq!(cache.get::<Vec<i32>>("k"), Some(vec![1, 2, 3]));
        assert_eq!(cache.stats(), (1, 1));

        cache.clear();
        assert_eq!(cache.get::<Vec<i32>>("k"), None);
        assert_eq!(cache.stats(), (0, 0));
    }

    #[test]
    fn expired_entries_are_evicted_on_lookup() {
        let cache = TtlCache::new("teste", Duration::from_millis(10));
        cache.insert("k".to_string(), &"valor");
        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(cache.stats(), (1, 0));
        assert_eq!(cache.get::<String>("k"), None);
        assert_eq!(cache.stats(), (0, 0));
    }
}
