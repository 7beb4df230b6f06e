//! Cooperative shutdown flag
//!
//! Set from the interrupt handler, polled by the worker between poll cycles
//! and inside the device recovery loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "please stop" flag
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
}

impl Shutdown {
    /// Create a flag that is not yet raised
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder of this flag to stop
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_the_flag() {
        let shutdown = Shutdown::new();
        let observer = shutdown.clone();
        assert!(!observer.is_requested());

        shutdown.request();
        assert!(observer.is_requested());
    }
}
