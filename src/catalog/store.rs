// src/catalog/store.rs
//! Immutable catalog snapshots behind a thread-safe, swappable handle.
//! Readers clone an `Arc` to the snapshot they started with; a reload
//! publishes a whole new snapshot and never mutates a live one.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::{ContentKind, ContentRecord};

/// Which source actually produced the current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataSource {
    LocalCsv,
    RemoteApi,
    Sample,
}

impl DataSource {
    pub fn label(&self) -> &'static str {
        match self {
            DataSource::LocalCsv => "Local CSV",
            DataSource::RemoteApi => "Remote API",
            DataSource::Sample => "Sample Data",
        }
    }
}

/// One immutable snapshot of the catalog plus its provenance.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub records: Arc<Vec<ContentRecord>>,
    pub source: DataSource,
    pub loaded_at: DateTime<Utc>,
}

impl Catalog {
    pub fn new(records: Vec<ContentRecord>, source: DataSource) -> Self {
        Self {
            records: Arc::new(records),
            source,
            loaded_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn count_kind(&self, kind: ContentKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }

    /// (min, max) release year over the snapshot; `None` when empty.
    pub fn year_range(&self) -> Option<(i32, i32)> {
        let mut it = self.records.iter().map(|r| r.release_year);
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y))))
    }

    pub fn distinct_countries(&self) -> usize {
        self.records
            .iter()
            .flat_map(|r| r.countries.iter())
            .collect::<std::collections::BTreeSet<_>>()
            .len()
    }
}

/// Shared handle: cheap to clone, safe to read during a reload.
#[derive(Clone)]
pub struct CatalogHandle {
    inner: Arc<RwLock<Arc<Catalog>>>,
}

impl CatalogHandle {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(catalog))),
        }
    }

    /// Current snapshot. The returned `Arc` stays valid across reloads.
    pub fn snapshot(&self) -> Arc<Catalog> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&guard),
            // A poisoned lock still holds a coherent snapshot.
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Atomically publish a fresh snapshot.
    pub fn publish(&self, catalog: Catalog) {
        let fresh = Arc::new(catalog);
        match self.inner.write() {
            Ok(mut guard) => *guard = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::sample::sample_catalog;

    #[test]
    fn snapshot_survives_publish() {
        let handle = CatalogHandle::new(Catalog::new(sample_catalog(), DataSource::Sample));
        let before = handle.snapshot();
        let n_before = before.len();

        handle.publish(Catalog::new(Vec::new(), DataSource::Sample));

        // The old snapshot still reads consistently.
        assert_eq!(before.len(), n_before);
        // New readers see the new (empty) snapshot.
        assert!(handle.snapshot().is_empty());
    }

    #[test]
    fn year_range_and_counts() {
        let cat = Catalog::new(sample_catalog(), DataSource::Sample);
        let (lo, hi) = cat.year_range().expect("non-empty sample");
        assert!(lo >= 1900 && hi >= lo);
        assert_eq!(
            cat.count_kind(ContentKind::Movie) + cat.count_kind(ContentKind::Series),
            cat.len()
        );
    }
}
