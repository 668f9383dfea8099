//! Dead-peer watchdog.
//!
//! A single deadline timer serviced by a dedicated thread. While armed,
//! the deadline must be pushed forward ([`DeadlineTimer::arm`]) or
//! cancelled ([`DeadlineTimer::disarm`]) before it passes; otherwise the
//! fatal handler runs with [`GatorError::WatchdogExpired`]. Each arming
//! fires at most once.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::{FatalHandler, GatorError};

/// A cancellable deadline, re-armed while progress is being made.
pub trait DeadlineTimer: Send + Sync {
    /// Start (or restart) the countdown.
    fn arm(&self, after: Duration);

    /// Cancel the countdown.
    fn disarm(&self);
}

#[derive(Default)]
struct TimerState {
    /// `(fires_at, armed_for)`
    deadline: Option<(Instant, Duration)>,
    expirations: u64,
    shutdown: bool,
}

#[derive(Default)]
struct Shared {
    state: Mutex<TimerState>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Thread-backed [`DeadlineTimer`].
pub struct Watchdog {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Spawn the watchdog thread. `handler` runs on that thread when a
    /// deadline passes.
    pub fn spawn(handler: Arc<dyn FatalHandler>) -> std::io::Result<Self> {
        let shared = Arc::new(Shared::default());
        let thread_shared = Arc::clone(&shared);
        let thread = std::thread::Builder::new()
            .name("gator-watchdog".into())
            .spawn(move || run(&thread_shared, handler.as_ref()))?;
        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    pub fn is_armed(&self) -> bool {
        self.shared.lock().deadline.is_some()
    }

    /// Number of deadlines that have passed so far.
    pub fn expirations(&self) -> u64 {
        self.shared.lock().expirations
    }
}

impl DeadlineTimer for Watchdog {
    fn arm(&self, after: Duration) {
        self.shared.lock().deadline = Some((Instant::now() + after, after));
        self.shared.wake.notify_all();
    }

    fn disarm(&self) {
        self.shared.lock().deadline = None;
        self.shared.wake.notify_all();
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.wake.notify_all();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("watchdog thread panicked");
            }
        }
    }
}

fn run(shared: &Shared, handler: &dyn FatalHandler) {
    let mut state = shared.lock();
    loop {
        if state.shutdown {
            return;
        }
        match state.deadline {
            None => {
                state = shared.wake.wait(state).unwrap_or_else(PoisonError::into_inner);
            }
            Some((fires_at, armed_for)) => {
                let now = Instant::now();
                if now >= fires_at {
                    state.deadline = None;
                    state.expirations += 1;
                    drop(state);
                    debug!("watchdog expired after {armed_for:?}");
                    handler.on_fatal(&GatorError::WatchdogExpired(armed_for));
                    state = shared.lock();
                } else {
                    state = shared
                        .wake
                        .wait_timeout(state, fires_at - now)
                        .map(|(guard, _)| guard)
                        .unwrap_or_else(|e| e.into_inner().0);
                }
            }
        }
    }
}

/// Disarms its timer when dropped, so every exit from a send path
/// cancels the deadline it armed.
pub(crate) struct ArmedDeadline<'a, T: DeadlineTimer + ?Sized> {
    timer: &'a T,
}

impl<'a, T: DeadlineTimer + ?Sized> ArmedDeadline<'a, T> {
    pub(crate) fn arm(timer: &'a T, after: Duration) -> Self {
        timer.arm(after);
        Self { timer }
    }
}

impl<T: DeadlineTimer + ?Sized> Drop for ArmedDeadline<'_, T> {
    fn drop(&mut self) {
        self.timer.disarm();
    }
}
