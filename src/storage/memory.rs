//! In-memory taxonomy store backend
//!
//! Reference implementation of `TaxonomyStore` for tests and embedded
//! deployments. Entries live in an id-indexed arena with name and alias
//! indexes, all behind a single `tokio::sync::RwLock`; each operation
//! holds one write guard, which supplies the atomicity the trait
//! requires: a concurrent reader sees fully-pre- or fully-post-operation
//! state, never a partial merge.

use crate::error::{Result, TaxonomyError};
use crate::storage::{seed, TaxonomyStore};
use crate::types::{NewSubcategory, Subcategory, SubcategoryId, SubcategoryStatus, Topic};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Inner {
    entries: HashMap<SubcategoryId, Subcategory>,

    // Non-merged entries only; merged names are released
    by_name: HashMap<(Topic, String), SubcategoryId>,
    by_alias: HashMap<(Topic, String), SubcategoryId>,
}

impl Inner {
    fn insert_entry(&mut self, entry: Subcategory) {
        let key = (entry.topic, entry.canonical_name.clone());
        self.by_name.insert(key, entry.id);
        for alias in &entry.aliases {
            let alias_key = (entry.topic, alias.clone());
            // First writer keeps a contested alias
            self.by_alias.entry(alias_key).or_insert(entry.id);
        }
        self.entries.insert(entry.id, entry);
    }

    fn lookup(&self, topic: Topic, name: &str) -> Option<SubcategoryId> {
        self.by_name
            .get(&(topic, name.to_string()))
            .or_else(|| self.by_alias.get(&(topic, name.to_string())))
            .copied()
    }
}

/// In-memory taxonomy store
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Create a store seeded with the predefined taxonomy
    pub fn with_defaults() -> Self {
        let mut inner = Inner::default();
        for mut entry in seed::predefined() {
            entry.status = SubcategoryStatus::Active;
            inner.insert_entry(entry);
        }
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Number of entries, across all statuses
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaxonomyStore for MemoryStore {
    async fn get(&self, id: SubcategoryId) -> Result<Subcategory> {
        self.inner
            .read()
            .await
            .entries
            .get(&id)
            .cloned()
            .ok_or_else(|| TaxonomyError::SubcategoryNotFound(id.to_string()))
    }

    async fn find_by_name_or_alias(
        &self,
        topic: Topic,
        name: &str,
    ) -> Result<Option<Subcategory>> {
        let inner = self.inner.read().await;
        Ok(inner
            .lookup(topic, name)
            .and_then(|id| inner.entries.get(&id))
            .cloned())
    }

    async fn list_topic(
        &self,
        topic: Topic,
        status: Option<SubcategoryStatus>,
    ) -> Result<Vec<Subcategory>> {
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .values()
            .filter(|e| e.topic == topic && status.map_or(true, |s| e.status == s))
            .cloned()
            .collect())
    }

    async fn compare_and_create(
        &self,
        topic: Topic,
        canonical_name: &str,
        entry: NewSubcategory,
    ) -> Result<(Subcategory, bool)> {
        if canonical_name.trim().is_empty() {
            return Err(TaxonomyError::InvalidName("empty canonical name".into()));
        }

        let mut inner = self.inner.write().await;

        // Another writer may have won the race for this key
        if let Some(id) = inner.lookup(topic, canonical_name) {
            let existing = inner.entries[&id].clone();
            return Ok((existing, false));
        }

        let mut created = Subcategory::new(
            topic,
            canonical_name,
            if entry.display_name.is_empty() {
                canonical_name.to_string()
            } else {
                entry.display_name
            },
            entry.description,
        );
        created.parent_id = entry.parent_id;
        for alias in entry.aliases {
            // Aliases already owned elsewhere in the topic are skipped to
            // preserve alias exclusivity
            if inner.lookup(topic, &alias).is_none() {
                created.aliases.insert(alias);
            } else {
                debug!(topic = %topic, alias = %alias, "skipping contested alias at create");
            }
        }

        inner.insert_entry(created.clone());
        Ok((created, true))
    }

    async fn attach_alias(&self, id: SubcategoryId, alias: &str) -> Result<Subcategory> {
        let alias = alias.trim().to_lowercase();
        if alias.is_empty() {
            return Err(TaxonomyError::InvalidName("empty alias".into()));
        }

        let mut inner = self.inner.write().await;
        let current = inner
            .entries
            .get(&id)
            .ok_or_else(|| TaxonomyError::SubcategoryNotFound(id.to_string()))?;
        if current.is_merged() {
            return Err(TaxonomyError::InvalidOperation(format!(
                "cannot attach alias to merged subcategory {id}"
            )));
        }
        let topic = current.topic;

        if let Some(holder) = inner.lookup(topic, &alias) {
            if holder != id {
                let holder_name = inner.entries[&holder].canonical_name.clone();
                return Err(TaxonomyError::AliasConflict {
                    alias,
                    holder: holder_name,
                });
            }
            // Already present here, or it is this entry's canonical name
            return Ok(inner.entries[&id].clone());
        }

        inner.by_alias.insert((topic, alias.clone()), id);
        let entry = inner.entries.get_mut(&id).unwrap();
        entry.aliases.insert(alias);
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn merge(&self, source: SubcategoryId, target: SubcategoryId) -> Result<Subcategory> {
        if source == target {
            return Err(TaxonomyError::InvalidOperation(
                "cannot merge a subcategory into itself".into(),
            ));
        }

        let mut inner = self.inner.write().await;
        let src = inner
            .entries
            .get(&source)
            .ok_or_else(|| TaxonomyError::SubcategoryNotFound(source.to_string()))?
            .clone();
        let tgt = inner
            .entries
            .get(&target)
            .ok_or_else(|| TaxonomyError::SubcategoryNotFound(target.to_string()))?
            .clone();

        if src.is_merged() {
            return Err(TaxonomyError::InvalidOperation(format!(
                "source {source} is already merged"
            )));
        }
        if tgt.is_merged() {
            return Err(TaxonomyError::InvalidOperation(format!(
                "target {target} is merged; resolve it first"
            )));
        }
        if src.topic != tgt.topic {
            return Err(TaxonomyError::InvalidOperation(
                "cannot merge across topics".into(),
            ));
        }

        // Release the source's name and re-point its aliases at the target
        inner
            .by_name
            .remove(&(src.topic, src.canonical_name.clone()));
        for alias in &src.aliases {
            inner
                .by_alias
                .insert((src.topic, alias.clone()), target);
        }

        let now = Utc::now();
        {
            let t = inner.entries.get_mut(&target).unwrap();
            t.aliases.extend(src.aliases.iter().cloned());
            t.usage_count += src.usage_count;
            t.confirmations += src.confirmations;
            t.rejections += src.rejections;
            t.confidence_stats.absorb(&src.confidence_stats);
            t.updated_at = now;
        }
        {
            let s = inner.entries.get_mut(&source).unwrap();
            s.status = SubcategoryStatus::Merged;
            s.merged_into = Some(target);
            s.updated_at = now;
        }

        debug!(source = %source, target = %target, "merged subcategories");
        Ok(inner.entries[&target].clone())
    }

    async fn record_usage(&self, id: SubcategoryId, confidence: f32) -> Result<()> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .entries
            .get_mut(&id)
            .ok_or_else(|| TaxonomyError::SubcategoryNotFound(id.to_string()))?;
        entry.usage_count += 1;
        entry.confidence_stats.record(confidence);
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn record_feedback(&self, id: SubcategoryId, confirmed: bool) -> Result<Subcategory> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .entries
            .get_mut(&id)
            .ok_or_else(|| TaxonomyError::SubcategoryNotFound(id.to_string()))?;
        if confirmed {
            entry.confirmations += 1;
        } else {
            entry.rejections += 1;
        }
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn set_status(
        &self,
        id: SubcategoryId,
        status: SubcategoryStatus,
    ) -> Result<Subcategory> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .entries
            .get_mut(&id)
            .ok_or_else(|| TaxonomyError::SubcategoryNotFound(id.to_string()))?;

        let allowed = match (entry.status, status) {
            // Idempotent promotion / deprecation
            (SubcategoryStatus::Active, SubcategoryStatus::Active) => true,
            (SubcategoryStatus::Deprecated, SubcategoryStatus::Deprecated) => true,
            (SubcategoryStatus::PendingReview, SubcategoryStatus::Active) => true,
            (SubcategoryStatus::PendingReview, SubcategoryStatus::Deprecated) => true,
            (SubcategoryStatus::Active, SubcategoryStatus::Deprecated) => true,
            _ => false,
        };
        if !allowed {
            return Err(TaxonomyError::InvalidOperation(format!(
                "cannot transition {} from {} to {}",
                id, entry.status, status
            )));
        }

        if entry.status != status {
            entry.status = status;
            entry.updated_at = Utc::now();
        }
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(display: &str) -> NewSubcategory {
        NewSubcategory {
            display_name: display.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_compare_and_create_returns_winner() {
        let store = MemoryStore::new();

        let (first, created) = store
            .compare_and_create(Topic::Traffic, "pothole", payload("Pothole"))
            .await
            .unwrap();
        assert!(created);

        let (second, created) = store
            .compare_and_create(Topic::Traffic, "pothole", payload("Pothole"))
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);

        // Same name under a different topic is a distinct entry
        let (other, created) = store
            .compare_and_create(Topic::Safety, "pothole", payload("Pothole"))
            .await
            .unwrap();
        assert!(created);
        assert_ne!(other.id, first.id);
    }

    #[tokio::test]
    async fn test_attach_alias_idempotent_and_exclusive() {
        let store = MemoryStore::new();
        let (a, _) = store
            .compare_and_create(Topic::Traffic, "accident", payload("Accident"))
            .await
            .unwrap();
        let (b, _) = store
            .compare_and_create(Topic::Traffic, "congestion", payload("Congestion"))
            .await
            .unwrap();

        let updated = store.attach_alias(a.id, "collision").await.unwrap();
        assert!(updated.aliases.contains("collision"));

        // No-op when already present
        let again = store.attach_alias(a.id, "collision").await.unwrap();
        assert_eq!(again.aliases.len(), 1);

        // Exclusive within the topic
        let err = store.attach_alias(b.id, "collision").await.unwrap_err();
        assert!(matches!(err, TaxonomyError::AliasConflict { .. }));
    }

    #[tokio::test]
    async fn test_merge_releases_name_for_reuse() {
        let store = MemoryStore::new();
        let (src, _) = store
            .compare_and_create(Topic::Weather, "drizzle", payload("Drizzle"))
            .await
            .unwrap();
        let (tgt, _) = store
            .compare_and_create(Topic::Weather, "rain", payload("Rain"))
            .await
            .unwrap();

        store.merge(src.id, tgt.id).await.unwrap();

        // The merged entry's canonical name can be claimed again
        let (reborn, created) = store
            .compare_and_create(Topic::Weather, "drizzle", payload("Drizzle"))
            .await
            .unwrap();
        assert!(created);
        assert_ne!(reborn.id, src.id);

        // But the old id still resolves through the chain
        let resolved = store.resolve(src.id).await.unwrap();
        assert_eq!(resolved.id, tgt.id);
    }

    #[tokio::test]
    async fn test_set_status_guards() {
        let store = MemoryStore::new();
        let (e, _) = store
            .compare_and_create(Topic::Events, "parade", payload("Parade"))
            .await
            .unwrap();

        // Promote, then promote again (idempotent)
        store
            .set_status(e.id, SubcategoryStatus::Active)
            .await
            .unwrap();
        store
            .set_status(e.id, SubcategoryStatus::Active)
            .await
            .unwrap();

        store
            .set_status(e.id, SubcategoryStatus::Deprecated)
            .await
            .unwrap();

        // Deprecated entries are never re-activated
        let err = store
            .set_status(e.id, SubcategoryStatus::Active)
            .await
            .unwrap_err();
        assert!(matches!(err, TaxonomyError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn test_with_defaults_seeds_active_entries() {
        let store = MemoryStore::with_defaults();
        assert!(!store.is_empty().await);

        let traffic = store
            .list_topic(Topic::Traffic, Some(SubcategoryStatus::Active))
            .await
            .unwrap();
        assert!(traffic.iter().any(|e| e.canonical_name == "accident"));

        let accident = store
            .find_by_name_or_alias(Topic::Traffic, "collision")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(accident.canonical_name, "accident");
    }
}
