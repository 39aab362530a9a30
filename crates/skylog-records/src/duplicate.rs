//! Save-with-confirmation workflow.
//!
//! A save whose key is already taken is parked under a [`ConfirmationToken`]
//! until the user answers. Each token is independent, so several conflicting
//! saves can be outstanding at once.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::record::{NewRecord, WeatherRecord};
use crate::store::RecordStore;

/// Handle for one pending overwrite decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfirmationToken(Uuid);

impl ConfirmationToken {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(Self)
    }
}

impl std::fmt::Display for ConfirmationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of asking to save a record.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// No conflict; the record was written.
    Saved,
    /// No conflict, but the store rejected the write.
    Failed,
    /// A record already exists at this key. Nothing was written yet.
    NeedsConfirmation {
        token: ConfirmationToken,
        existing: WeatherRecord,
    },
}

/// Result of answering a confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Confirmed; carries the store's save result
    Committed(bool),
    Cancelled,
    /// Token was never issued or was already resolved
    UnknownToken,
}

pub struct SaveWorkflow {
    store: Arc<RecordStore>,
    pending: Mutex<HashMap<ConfirmationToken, NewRecord>>,
}

impl SaveWorkflow {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self {
            store,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// Save `record`, or park it for confirmation if its key is taken.
    pub fn request_save(&self, record: NewRecord) -> SaveOutcome {
        let key = record.key();

        let Some(existing) = self.store.get(&key) else {
            return if self.store.save(&record) {
                SaveOutcome::Saved
            } else {
                SaveOutcome::Failed
            };
        };

        let token = ConfirmationToken::new();
        tracing::info!("Record already exists for {}, awaiting confirmation", key);
        self.pending.lock().insert(token, record);

        SaveOutcome::NeedsConfirmation { token, existing }
    }

    /// Answer a pending confirmation. The entry is consumed either way.
    pub fn resolve(&self, token: ConfirmationToken, confirmed: bool) -> Resolution {
        let Some(record) = self.pending.lock().remove(&token) else {
            tracing::warn!("Confirmation for unknown token {}", token);
            return Resolution::UnknownToken;
        };

        if confirmed {
            Resolution::Committed(self.store.save(&record))
        } else {
            tracing::info!("Overwrite of {} cancelled", record.key());
            Resolution::Cancelled
        }
    }

    /// The record waiting on `token`, if any
    pub fn pending(&self, token: ConfirmationToken) -> Option<NewRecord> {
        self.pending.lock().get(&token).cloned()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}
