//! Cooperative cancellation for a running simulation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared handle for stopping a run between ticks.
///
/// Clones share the same flag. The engine checks it before every tick, so a
/// tick in progress always completes.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    cancelled: Arc<AtomicBool>,
}

impl RunControl {
    /// A handle with no cancellation requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let control = RunControl::new();
        let handle = control.clone();
        assert!(!control.is_cancelled());
        handle.cancel();
        assert!(control.is_cancelled());
    }
}
