//! Saved-records panel: saving with overwrite confirmation, the filtered
//! listing with its selection, bulk delete and export.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use skylog_records::{
    default_export_file_name, export, BulkDeleteError, BulkDeleteReport, ConfirmationToken,
    NewRecord, RecordSelection, RecordStore, Resolution, SaveOutcome, SaveWorkflow,
    WeatherRecord,
};

pub struct RecordsModel {
    workflow: SaveWorkflow,
    selection: RecordSelection,
    export_dir: PathBuf,
}

impl RecordsModel {
    pub fn new(store: Arc<RecordStore>, export_dir: impl Into<PathBuf>) -> Self {
        let mut selection = RecordSelection::new();
        selection.load(&store, None);

        Self {
            workflow: SaveWorkflow::new(store),
            selection,
            export_dir: export_dir.into(),
        }
    }

    fn store(&self) -> &RecordStore {
        self.workflow.store()
    }

    pub fn save(&mut self, record: NewRecord) -> SaveOutcome {
        let outcome = self.workflow.request_save(record);
        if outcome == SaveOutcome::Saved {
            self.refresh();
        }
        outcome
    }

    pub fn confirm(&mut self, token: ConfirmationToken, overwrite: bool) -> Resolution {
        let resolution = self.workflow.resolve(token, overwrite);
        if resolution == Resolution::Committed(true) {
            self.refresh();
        }
        resolution
    }

    pub fn pending_count(&self) -> usize {
        self.workflow.pending_count()
    }

    /// Replace the listing. An empty or missing filter lists everything.
    pub fn list(&mut self, filter: Option<&str>) -> &[WeatherRecord] {
        self.selection.load(self.workflow.store(), filter);
        self.selection.records()
    }

    /// Re-fetch the listing with the current filter
    pub fn refresh(&mut self) {
        self.selection.reload(self.workflow.store());
    }

    pub fn records(&self) -> &[WeatherRecord] {
        self.selection.records()
    }

    pub fn filter(&self) -> Option<&str> {
        self.selection.filter()
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selection.is_selected(index)
    }

    /// Toggle a 1-based row. Returns the new state, `None` if out of range.
    pub fn toggle(&mut self, row: usize) -> Option<bool> {
        row.checked_sub(1).and_then(|i| self.selection.toggle(i))
    }

    pub fn select_all(&mut self) {
        self.selection.select_all();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selected_count(&self) -> usize {
        self.selection.selected_count()
    }

    pub fn delete_selected(&mut self) -> Result<BulkDeleteReport, BulkDeleteError> {
        self.selection.delete_selected(self.workflow.store())
    }

    /// Export every saved record. Returns the written path and how many
    /// records went into it.
    pub fn export(&self, path: Option<&Path>) -> Option<(PathBuf, usize)> {
        let target = match path {
            Some(p) => p.to_path_buf(),
            None => self.export_dir.join(default_export_file_name()),
        };

        let records = self.store().list_all();
        export(&records, &target).then(|| (target, records.len()))
    }

    pub fn count(&self) -> usize {
        self.store().count()
    }
}
