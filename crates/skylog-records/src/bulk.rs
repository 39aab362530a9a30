//! Multi-record selection and deletion.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::record::{RecordKey, WeatherRecord};
use crate::store::RecordStore;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BulkDeleteError {
    #[error("No records selected")]
    EmptySelection,
}

/// Outcome of a bulk delete. Partial success is normal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkDeleteReport {
    pub requested: usize,
    pub deleted: usize,
    /// Keys that matched nothing at delete time
    pub missing: Vec<RecordKey>,
}

impl BulkDeleteReport {
    pub fn is_complete(&self) -> bool {
        self.deleted == self.requested
    }
}

/// Delete each record by key, one attempt per record.
///
/// An empty slice is rejected before the store is touched.
pub fn delete_many(
    store: &RecordStore,
    records: &[WeatherRecord],
) -> Result<BulkDeleteReport, BulkDeleteError> {
    if records.is_empty() {
        return Err(BulkDeleteError::EmptySelection);
    }

    let mut deleted = 0;
    let mut missing = Vec::new();

    for record in records {
        let key = record.key();
        if store.delete(&key) {
            deleted += 1;
        } else {
            missing.push(key);
        }
    }

    tracing::info!("Bulk delete removed {} of {} records", deleted, records.len());

    Ok(BulkDeleteReport {
        requested: records.len(),
        deleted,
        missing,
    })
}

/// A point-in-time listing with the user's current selection.
///
/// Indices refer to the snapshot, which is only ever replaced wholesale from
/// the store.
#[derive(Debug, Default)]
pub struct RecordSelection {
    filter: Option<String>,
    snapshot: Vec<WeatherRecord>,
    selected: BTreeSet<usize>,
}

impl RecordSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a fresh snapshot. A filter limits it to matching locations.
    pub fn load(&mut self, store: &RecordStore, filter: Option<&str>) {
        self.filter = filter
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string);
        self.reload(store);
    }

    /// Re-fetch with the current filter. Clears the selection.
    pub fn reload(&mut self, store: &RecordStore) {
        self.snapshot = match &self.filter {
            Some(filter) => store.list_by_location(filter),
            None => store.list_all(),
        };
        self.selected.clear();
    }

    pub fn records(&self) -> &[WeatherRecord] {
        &self.snapshot
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Flip one row. Returns the new state, or `None` if out of range.
    pub fn toggle(&mut self, index: usize) -> Option<bool> {
        if index >= self.snapshot.len() {
            return None;
        }
        if self.selected.remove(&index) {
            Some(false)
        } else {
            self.selected.insert(index);
            Some(true)
        }
    }

    pub fn select_all(&mut self) {
        self.selected = (0..self.snapshot.len()).collect();
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    pub fn selected_records(&self) -> Vec<WeatherRecord> {
        self.selected
            .iter()
            .filter_map(|&i| self.snapshot.get(i).cloned())
            .collect()
    }

    /// Delete the selected rows, then reload the snapshot from the store.
    pub fn delete_selected(
        &mut self,
        store: &RecordStore,
    ) -> Result<BulkDeleteReport, BulkDeleteError> {
        let report = delete_many(store, &self.selected_records())?;
        self.reload(store);
        Ok(report)
    }
}
