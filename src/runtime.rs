//! Worker pool and cancellation shared by propagation and detection

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{EngineError, Result};

/// Cooperative cancellation flag.
///
/// Cloned handles share the same flag. Batch loops check it at each object
/// (propagation) or tick (detection) boundary and bail out with
/// [`EngineError::Cancelled`] before anything is persisted.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Returns `Err(Cancelled)` once [`cancel`](Self::cancel) has been called
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Build a bounded rayon pool. `workers == 0` lets rayon pick the size.
pub fn worker_pool(workers: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| EngineError::InvalidConfig(format!("cannot build worker pool: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(token.check().is_ok());

        other.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(EngineError::Cancelled)));
    }

    #[test]
    fn test_worker_pool_size() {
        let pool = worker_pool(3).unwrap();
        assert_eq!(pool.current_num_threads(), 3);
    }
}
