//! Cooperative abort, polled by the loop before every round.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub trait AbortSignal: Send + Sync {
    fn is_aborted(&self) -> bool;
}

/// Signal that never fires
pub struct NeverAbort;

impl AbortSignal for NeverAbort {
    fn is_aborted(&self) -> bool {
        false
    }
}

/// Shared flag; clones observe the same state
#[derive(Debug, Clone, Default)]
pub struct AbortFlag {
    flag: Arc<AtomicBool>,
}

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

impl AbortSignal for AbortFlag {
    fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
