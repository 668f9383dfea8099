//! Escalation of unrecoverable transport failures.
//!
//! Fatal conditions travel up as `Err(GatorError)` to whoever owns the
//! top level, which hands them to a [`FatalHandler`]. The watchdog has no
//! caller to return to and invokes its handler directly.

use tracing::error;

use crate::GatorError;

/// Receives errors the daemon cannot continue past.
pub trait FatalHandler: Send + Sync {
    fn on_fatal(&self, error: &GatorError);
}

impl<F> FatalHandler for F
where
    F: Fn(&GatorError) + Send + Sync,
{
    fn on_fatal(&self, error: &GatorError) {
        self(error)
    }
}

/// Production handler: log and terminate the process.
#[derive(Debug, Clone, Copy)]
pub struct ExitProcess {
    exit_code: i32,
}

impl ExitProcess {
    pub fn new(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

impl Default for ExitProcess {
    fn default() -> Self {
        Self::new(1)
    }
}

impl FatalHandler for ExitProcess {
    fn on_fatal(&self, err: &GatorError) {
        error!("fatal: {err}");
        std::process::exit(self.exit_code);
    }
}

/// Unwrap `result`, routing an error to `handler`.
///
/// Returns `None` only when the handler returned instead of exiting.
pub fn escalate<T>(handler: &dyn FatalHandler, result: Result<T, GatorError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            handler.on_fatal(&e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn escalate_passes_values_through() {
        let calls = AtomicUsize::new(0);
        let handler = |_: &GatorError| {
            calls.fetch_add(1, Ordering::SeqCst);
        };
        assert_eq!(escalate(&handler, Ok::<_, GatorError>(7)), Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn escalate_invokes_handler_once() {
        let calls = AtomicUsize::new(0);
        let handler = |e: &GatorError| {
            assert!(matches!(e, GatorError::HandshakeDisconnected));
            calls.fetch_add(1, Ordering::SeqCst);
        };
        let out: Option<()> = escalate(&handler, Err(GatorError::HandshakeDisconnected));
        assert!(out.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
