// src/workers/cancel.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cooperative stop flag.
///
/// Clones observe the same flag. Used both as the interpreter's global
/// "stop requested" state and to stop animation workers.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clears the flag so the token can be reused for the next show-list.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}
