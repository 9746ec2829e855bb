//! Generation counter used to tell live activations from stale ones.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared counter. Every activation and every teardown bumps it, so at
/// most one [`Generation`] is live at a time.
#[derive(Debug, Clone, Default)]
pub(crate) struct Liveness {
    current: Arc<AtomicU64>,
}

impl Liveness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, retiring the previous one.
    pub fn begin(&self) -> Generation {
        let id = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        Generation {
            id,
            current: Arc::clone(&self.current),
        }
    }

    /// Retire whatever generation is live.
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }
}

/// Token held by one activation's tasks.
#[derive(Debug, Clone)]
pub(crate) struct Generation {
    id: u64,
    current: Arc<AtomicU64>,
}

impl Generation {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_live(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.id
    }
}
