// ── Activity counter ──
//
// Reference count of in-flight requests plus a debounced visibility
// boolean for a shared activity indicator. The hide transition waits a
// short quiescence window so back-to-back requests don't flicker the
// signal; any increment during the window wins over the scheduled hide.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Debug)]
struct State {
    count: usize,
    /// Bumped on every mutation so a scheduled hide can detect that the
    /// world moved on while it slept.
    epoch: u64,
}

#[derive(Debug)]
struct Inner {
    state: Mutex<State>,
    visible: watch::Sender<bool>,
    debounce: Duration,
}

/// Thread-safe in-flight request counter with a debounced visibility
/// signal.
///
/// Cheap to clone; all clones share one count. `decrement` schedules
/// the debounce on the ambient tokio runtime, so the counter must be
/// driven from within one.
#[derive(Debug, Clone)]
pub struct ActivityCounter {
    inner: Arc<Inner>,
}

impl ActivityCounter {
    pub fn new() -> Self {
        Self::with_debounce(DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(debounce: Duration) -> Self {
        let (visible, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State { count: 0, epoch: 0 }),
                visible,
                debounce,
            }),
        }
    }

    /// Current number of in-flight requests.
    pub fn count(&self) -> usize {
        self.lock().count
    }

    /// `true` while any request is in flight (undebounced).
    pub fn is_active(&self) -> bool {
        self.count() > 0
    }

    /// Subscribe to the debounced visibility signal.
    ///
    /// Turns `true` immediately on the first increment; turns `false`
    /// only after the count reaches zero and stays there for the full
    /// debounce window.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.visible.subscribe()
    }

    pub fn increment(&self) {
        let mut state = self.lock();
        state.count += 1;
        state.epoch += 1;
        // Publish under the lock: a delayed `true` racing a firing hide
        // could otherwise land after its `false` and stick the signal on.
        self.inner.visible.send_replace(true);
        drop(state);
    }

    /// Subtract one, clamped at zero so unmatched calls never go
    /// negative. Reaching zero schedules the debounced hide.
    pub fn decrement(&self) {
        let mut state = self.lock();
        state.count = state.count.saturating_sub(1);
        state.epoch += 1;
        let reached_zero = state.count == 0;
        let epoch = state.epoch;
        drop(state);

        if reached_zero {
            self.schedule_hide(epoch);
        }
    }

    /// Publish `false` after the debounce window, unless an increment
    /// intervened (epoch check: last writer wins).
    fn schedule_hide(&self, epoch: u64) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            let state = inner
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if state.epoch == epoch && state.count == 0 {
                inner.visible.send_replace(false);
            }
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ActivityCounter {
    fn default() -> Self {
        Self::new()
    }
}
