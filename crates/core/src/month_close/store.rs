//! Storage seam for the month-close gate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use coreops_shared::AppResult;

use super::month::Month;
use super::status::MonthCloseStatus;

/// Reads the gate needs from storage.
#[async_trait]
pub trait MonthCloseStore: Send + Sync {
    /// Whether the runtime enable flag is set.
    async fn enforcement_enabled(&self) -> AppResult<bool>;

    /// Current company-scope status of `month`; `Open` when no record exists.
    async fn company_status(&self, month: Month) -> AppResult<MonthCloseStatus>;
}

/// Month-close state held in memory, for wiring the gate without storage.
///
/// Counts reads so callers can check which decisions never touched storage.
#[derive(Debug, Default)]
pub struct InMemoryMonthCloseStore {
    enabled: AtomicBool,
    statuses: Mutex<HashMap<Month, MonthCloseStatus>>,
    reads: AtomicUsize,
}

impl InMemoryMonthCloseStore {
    /// Creates a store with the flag disabled and every month open.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the enable flag.
    #[must_use]
    pub fn enabled(self, enabled: bool) -> Self {
        self.enabled.store(enabled, Ordering::SeqCst);
        self
    }

    /// Sets the status of `month`.
    #[must_use]
    pub fn with_status(self, month: Month, status: MonthCloseStatus) -> Self {
        self.set_status(month, status);
        self
    }

    /// Replaces the status of `month`.
    pub fn set_status(&self, month: Month, status: MonthCloseStatus) {
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(month, status);
    }

    /// Number of storage reads served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MonthCloseStore for InMemoryMonthCloseStore {
    async fn enforcement_enabled(&self) -> AppResult<bool> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.enabled.load(Ordering::SeqCst))
    }

    async fn company_status(&self, month: Month) -> AppResult<MonthCloseStatus> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&month)
            .copied()
            .unwrap_or_default())
    }
}
