//! Lookup backend: geocoding and forecast retrieval off the interaction thread.
//! Results come back over mpsc, tagged with the request sequence number.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use skylog_weather::{ForecastReport, ForecastSource, Geocoder, LocationQuery, LookupError};
use tokio_util::sync::CancellationToken;

/// Messages sent from lookup tasks back to the interaction thread
#[derive(Debug)]
pub enum LookupServiceMessage {
    LookupDone {
        seq: u64,
        query: LocationQuery,
        result: Result<ForecastReport, LookupError>,
    },
}

/// Hands out sequence numbers and cancels whichever lookup is in flight
/// when a newer one starts.
#[derive(Debug, Default)]
pub struct LookupTracker {
    latest: AtomicU64,
    in_flight: Mutex<Option<CancellationToken>>,
}

impl LookupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new lookup, superseding the previous one.
    pub fn begin(&self) -> (u64, CancellationToken) {
        let token = CancellationToken::new();
        let mut in_flight = self.in_flight.lock();
        let seq = self.latest.fetch_add(1, Ordering::AcqRel) + 1;

        if let Some(previous) = in_flight.replace(token.clone()) {
            previous.cancel();
            tracing::debug!("Lookup {} superseded", seq - 1);
        }

        (seq, token)
    }

    /// True only for the most recently started lookup
    pub fn is_current(&self, seq: u64) -> bool {
        self.latest.load(Ordering::Acquire) == seq
    }

    /// Cancel the in-flight lookup, if any.
    pub fn cancel(&self) {
        if let Some(token) = self.in_flight.lock().take() {
            token.cancel();
            tracing::info!("Lookup cancelled");
        }
    }
}

/// Resolve `query` and fetch its forecast asynchronously.
///
/// Sends `LookupDone` on the channel when complete, unless a newer lookup
/// cancelled this one first. Returns the sequence number of this request.
pub fn request_lookup<G, F>(
    runtime: &tokio::runtime::Handle,
    tx: &std::sync::mpsc::Sender<LookupServiceMessage>,
    tracker: &LookupTracker,
    geocoder: Arc<G>,
    source: Arc<F>,
    query: LocationQuery,
) -> u64
where
    G: Geocoder + 'static,
    F: ForecastSource + 'static,
{
    let (seq, token) = tracker.begin();
    let tx = tx.clone();

    runtime.spawn(async move {
        let lookup_query = query.clone();
        let lookup = async move {
            let coordinates = geocoder.resolve(&lookup_query).await?;
            source.fetch_forecast(coordinates).await
        };

        let result = tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!("Lookup {} for {} dropped", seq, query);
                return;
            }
            result = lookup => result,
        };

        if let Err(e) = &result {
            tracing::warn!("Lookup {} for {} failed: {}", seq, query, e);
        }
        let _ = tx.send(LookupServiceMessage::LookupDone { seq, query, result });
    });

    seq
}
