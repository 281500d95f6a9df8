//! Cooperative cancellation shared between a caller and an in-flight resolution.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::TypeLoadError;

/// Cloneable cancellation flag.
///
/// Every fetch boundary checks the token; once cancelled, the resolution fails
/// with [`TypeLoadError::Cancelled`] and nothing further is written to the cache.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of ongoing work.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Returns `Err(Cancelled)` once cancellation has been requested.
    pub fn ensure_not_cancelled(&self) -> Result<(), TypeLoadError> {
        if self.is_cancelled() {
            Err(TypeLoadError::Cancelled)
        } else {
            Ok(())
        }
    }
}
