use crate::category::CategoryCatalog;
use crate::hash::{DigestError, DigestService};
use crate::types::{CategoryId, CategoryLabel, Digest};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Sizes of the resolver's memo tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoStats {
    pub item_digests: usize,
    pub probe_digests: usize,
    pub resolved: usize,
}

/// Recovers a category label from `digest(digest(item_id) ++ category_id)`
/// by enumerating the catalog.
///
/// All three tables are content-addressed and only ever grow. Locks are held
/// for a single map operation and never across an await, so two concurrent
/// calls may both compute the same digest; they store the same value.
pub struct DigestResolver {
    catalog: Arc<CategoryCatalog>,
    service: Arc<dyn DigestService>,
    item_digest: Mutex<HashMap<String, Digest>>,
    probe_digest: Mutex<HashMap<(Digest, CategoryId), Digest>>,
    resolved: Mutex<HashMap<Digest, CategoryLabel>>,
}

impl DigestResolver {
    pub fn new(catalog: Arc<CategoryCatalog>, service: Arc<dyn DigestService>) -> Self {
        Self {
            catalog,
            service,
            item_digest: Mutex::new(HashMap::new()),
            probe_digest: Mutex::new(HashMap::new()),
            resolved: Mutex::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    /// Resolve `observed` for `item_id`. `Ok(None)` means no catalog entry
    /// produced the digest; misses are not cached.
    pub async fn resolve(
        &self,
        item_id: &str,
        observed: &str,
    ) -> Result<Option<CategoryLabel>, DigestError> {
        let cached = lock(&self.resolved).get(observed).cloned();
        if let Some(label) = cached {
            tracing::trace!(digest = observed, %label, "resolved digest cache hit");
            return Ok(Some(label));
        }

        let base = self.item_digest(item_id).await?;

        for entry in self.catalog.entries() {
            let probe = self.probe_digest(&base, entry.id).await?;
            if probe == observed {
                lock(&self.resolved).insert(observed.to_string(), entry.label.clone());
                tracing::debug!(item_id, label = %entry.label, "resolved obfuscated category");
                return Ok(Some(entry.label.clone()));
            }
        }

        tracing::trace!(item_id, digest = observed, "digest matched no category");
        Ok(None)
    }

    /// Digest that a feed would publish for `item_id` under category `id`.
    pub async fn obfuscate(&self, item_id: &str, id: CategoryId) -> Result<Digest, DigestError> {
        let base = self.item_digest(item_id).await?;
        self.probe_digest(&base, id).await
    }

    pub fn stats(&self) -> MemoStats {
        MemoStats {
            item_digests: lock(&self.item_digest).len(),
            probe_digests: lock(&self.probe_digest).len(),
            resolved: lock(&self.resolved).len(),
        }
    }

    async fn item_digest(&self, item_id: &str) -> Result<Digest, DigestError> {
        let cached = lock(&self.item_digest).get(item_id).cloned();
        if let Some(d) = cached {
            return Ok(d);
        }
        let d = self.service.digest(item_id).await?;
        lock(&self.item_digest)
            .entry(item_id.to_string())
            .or_insert_with(|| d.clone());
        Ok(d)
    }

    async fn probe_digest(&self, base: &str, id: CategoryId) -> Result<Digest, DigestError> {
        let key = (base.to_string(), id);
        let cached = lock(&self.probe_digest).get(&key).cloned();
        if let Some(d) = cached {
            return Ok(d);
        }
        let d = self.service.digest(&format!("{base}{id}")).await?;
        lock(&self.probe_digest)
            .entry(key)
            .or_insert_with(|| d.clone());
        Ok(d)
    }
}

/// Memo tables hold plain strings, so a poisoned lock still guards valid data.
fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
