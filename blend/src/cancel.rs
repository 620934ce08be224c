use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Stops a running blend before its next output row.
///
/// Clones share the same flag, so one may be handed to another thread
/// or a signal handler while the blend holds the other.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
