//! Storage layer for the taxonomy
//!
//! Provides the abstraction over the external transactional
//! document/key-value store plus an in-memory reference backend. The core
//! never implements locking itself: it calls the store's atomic
//! primitives (compare-and-create, merge, counter increment) and handles
//! both outcomes of each race.

pub mod memory;
pub mod seed;

use crate::error::{Result, TaxonomyError};
use crate::types::{NewSubcategory, Subcategory, SubcategoryId, SubcategoryStatus, Topic};
use async_trait::async_trait;
use std::collections::HashSet;

/// Taxonomy store trait defining all required operations
///
/// Entries are keyed by id and by `(topic, canonical_name)`. Every
/// method is atomic at the store boundary: a reader never observes a
/// partially-applied create or merge.
#[async_trait]
pub trait TaxonomyStore: Send + Sync {
    /// Fetch an entry by ID
    async fn get(&self, id: SubcategoryId) -> Result<Subcategory>;

    /// Look up a non-merged entry by canonical name or alias
    async fn find_by_name_or_alias(
        &self,
        topic: Topic,
        name: &str,
    ) -> Result<Option<Subcategory>>;

    /// List entries under a topic, optionally filtered by status
    async fn list_topic(
        &self,
        topic: Topic,
        status: Option<SubcategoryStatus>,
    ) -> Result<Vec<Subcategory>>;

    /// Atomically create an entry under `(topic, canonical_name)`
    ///
    /// Returns `(entry, true)` when this call created it, or the
    /// pre-existing entry and `false` when another writer won the race.
    /// All racing callers converge on one entity.
    async fn compare_and_create(
        &self,
        topic: Topic,
        canonical_name: &str,
        entry: NewSubcategory,
    ) -> Result<(Subcategory, bool)>;

    /// Attach an alias to an entry
    ///
    /// Idempotent: attaching an alias already present on the same entry
    /// is a no-op. An alias held by a different non-merged entry in the
    /// topic is rejected with `AliasConflict`.
    async fn attach_alias(&self, id: SubcategoryId, alias: &str) -> Result<Subcategory>;

    /// Irreversibly merge `source` into `target`
    ///
    /// Unions alias sets, sums usage counts, absorbs confidence stats and
    /// feedback tallies, sets `source.status = Merged` and
    /// `source.merged_into = target`. Returns the updated target.
    async fn merge(&self, source: SubcategoryId, target: SubcategoryId) -> Result<Subcategory>;

    /// Atomically increment usage and record a confidence sample
    async fn record_usage(&self, id: SubcategoryId, confidence: f32) -> Result<()>;

    /// Record one confirmation or rejection; returns the updated entry
    /// so the caller can evaluate lifecycle policy against a snapshot
    async fn record_feedback(&self, id: SubcategoryId, confirmed: bool) -> Result<Subcategory>;

    /// Guarded status transition
    ///
    /// Promotion (`PendingReview` → `Active`) is idempotent: promoting an
    /// already-active entry is a no-op. `Deprecated` and `Merged` entries
    /// are never re-activated; merging happens only through `merge`.
    async fn set_status(
        &self,
        id: SubcategoryId,
        status: SubcategoryStatus,
    ) -> Result<Subcategory>;

    /// Follow the `merged_into` chain to the terminal entry
    ///
    /// A chain that revisits an entry is a data-corruption condition and
    /// is reported as `MergeCycle`, never looped forever.
    async fn resolve(&self, id: SubcategoryId) -> Result<Subcategory> {
        let mut visited = HashSet::new();
        let mut current = self.get(id).await?;
        visited.insert(current.id);

        while let Some(next) = current.merged_into {
            if visited.contains(&next) {
                return Err(TaxonomyError::MergeCycle(id.to_string()));
            }
            current = self.get(next).await?;
            visited.insert(current.id);
        }
        Ok(current)
    }
}

pub use memory::MemoryStore;
