//! Loading indicators that clear themselves.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Count of in-flight loads behind one loading indicator.
///
/// Overlapping loads keep the indicator set until the last one finishes.
#[derive(Debug, Clone, Default)]
pub struct LoadingCounter {
    in_flight: Arc<AtomicUsize>,
}

impl LoadingCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a load as started; it ends when the guard drops.
    pub fn start(&self) -> LoadingGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        LoadingGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }
}

/// Ends one load on drop, including when the owning future is cancelled.
#[derive(Debug)]
pub struct LoadingGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
