//! Cancellable single-shot timers.
//!
//! A [`SingleShotTimer`] owns at most one pending shot. Starting it again
//! cancels the previous shot, which is exactly the behavior a debounce needs:
//! every new input pushes the deadline back and only the last one fires.
//! Dropping the timer cancels the pending shot, so a torn-down owner never
//! receives a late callback.
//!
//! Shots are driven by the ambient tokio runtime.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use crate::error::{Result, TimerError};
use crate::logging::targets;

/// Identifies one scheduled shot of a [`SingleShotTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// The shot currently waiting to fire.
#[derive(Debug)]
struct PendingShot {
    id: TimerId,
    abort: AbortHandle,
}

#[derive(Debug, Default)]
struct TimerState {
    /// Last issued shot number.
    last_id: u64,
    /// The only shot allowed to fire.
    pending: Option<PendingShot>,
}

/// A one-shot timer with a single owner and at most one pending callback.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use partscope_core::SingleShotTimer;
///
/// # async fn demo() -> partscope_core::Result<()> {
/// let timer = SingleShotTimer::new();
/// timer.start(Duration::from_millis(200), || println!("first"))?;
/// // Supersedes the first shot; only "second" is printed.
/// timer.start(Duration::from_millis(200), || println!("second"))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct SingleShotTimer {
    state: Arc<Mutex<TimerState>>,
}

impl SingleShotTimer {
    /// Create an idle timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `callback` to run once after `delay`.
    ///
    /// Any shot that is still pending is cancelled first. Fails with
    /// [`TimerError::NoRuntime`] when called outside a tokio runtime.
    pub fn start<F>(&self, delay: Duration, callback: F) -> Result<TimerId>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = Handle::try_current().map_err(|_| TimerError::NoRuntime)?;

        let mut state = self.state.lock();
        if let Some(previous) = state.pending.take() {
            previous.abort.abort();
            tracing::trace!(target: targets::TIMER, id = ?previous.id, "pending shot superseded");
        }

        state.last_id += 1;
        let id = TimerId(state.last_id);
        let weak = Arc::downgrade(&self.state);

        let task = handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if Self::claim(&weak, id) {
                tracing::trace!(target: targets::TIMER, ?id, "timer fired");
                callback();
            }
        });

        state.pending = Some(PendingShot {
            id,
            abort: task.abort_handle(),
        });
        tracing::debug!(target: targets::TIMER, ?id, delay_ms = delay.as_millis() as u64, "timer scheduled");
        Ok(id)
    }

    /// Take ownership of the pending slot if `id` is still the current shot.
    fn claim(state: &Weak<Mutex<TimerState>>, id: TimerId) -> bool {
        let Some(state) = state.upgrade() else {
            return false;
        };
        let mut state = state.lock();
        match state.pending {
            Some(ref pending) if pending.id == id => {
                state.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Cancel the pending shot, if any.
    ///
    /// Returns `true` if a shot was cancelled.
    pub fn cancel(&self) -> bool {
        match self.state.lock().pending.take() {
            Some(pending) => {
                pending.abort.abort();
                tracing::trace!(target: targets::TIMER, id = ?pending.id, "timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Whether a shot is scheduled and has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.state.lock().pending.is_some()
    }

    /// The ID of the pending shot, if any.
    pub fn pending_id(&self) -> Option<TimerId> {
        self.state.lock().pending.as_ref().map(|pending| pending.id)
    }
}

impl Drop for SingleShotTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

static_assertions::assert_impl_all!(SingleShotTimer: Send, Sync);
