//! Process-wide session state shared between the transport and the
//! command handling side of the daemon.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The "awaiting command" flag. Cloning shares the same flag.
#[derive(Debug, Clone, Default)]
pub struct SessionFlag {
    waiting_on_command: Arc<AtomicBool>,
}

impl SessionFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_waiting_on_command(&self, waiting: bool) {
        self.waiting_on_command.store(waiting, Ordering::SeqCst);
    }

    pub fn is_waiting_on_command(&self) -> bool {
        self.waiting_on_command.load(Ordering::SeqCst)
    }
}
