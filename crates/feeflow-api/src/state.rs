use chrono::{DateTime, Utc};
use feeflow_collector::{CollectorError, FeeCollector, FeeCollectorConfig};
use feeflow_ledger::MemoryLedger;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<Mutex<FeeCollector<MemoryLedger>>>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(collector: FeeCollector<MemoryLedger>) -> Self {
        AppState {
            collector: Arc::new(Mutex::new(collector)),
            started_at: Utc::now(),
        }
    }

    /// Fresh collector over an empty in-memory ledger
    pub fn from_config(config: FeeCollectorConfig) -> Result<Self, CollectorError> {
        Ok(Self::new(FeeCollector::new(config, MemoryLedger::new())?))
    }

    /// `None` once a panicking request poisoned the lock
    pub fn lock(&self) -> Option<MutexGuard<'_, FeeCollector<MemoryLedger>>> {
        self.collector.lock().ok()
    }

    pub fn uptime_seconds(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }
}
