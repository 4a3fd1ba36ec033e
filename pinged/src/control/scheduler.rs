use std::sync::Arc;
use std::time::Duration;

use maybe_sync::{MaybeSend, MaybeSync};
use parking_lot::Mutex;

use crate::control::HoldToken;

/// Runs hold timers for the [`LiveMap`](crate::LiveMap).
///
/// When a timer fires, the host must call [`LiveMap::hold_elapsed`](crate::LiveMap::hold_elapsed)
/// with its token. Timers of sessions that are no longer armed are ignored, so cancelling is only
/// an optimization and may be called any number of times for the same token.
pub trait HoldScheduler: MaybeSend + MaybeSync {
    /// Starts a timer that fires after `delay`.
    fn schedule(&self, token: HoldToken, delay: Duration);
    /// Cancels the timer if it is still pending.
    fn cancel(&self, token: HoldToken);
}

/// Scheduler that does nothing. Use it when the host drives gestures with
/// [`LiveMap::tick`](crate::LiveMap::tick) instead of timers.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyScheduler;

impl HoldScheduler for DummyScheduler {
    fn schedule(&self, _token: HoldToken, _delay: Duration) {}
    fn cancel(&self, _token: HoldToken) {}
}

/// Scheduler that only records pending timers, leaving it to the owner to fire them. Clones share
/// the same list of timers.
#[derive(Debug, Default, Clone)]
pub struct ManualScheduler {
    pending: Arc<Mutex<Vec<(HoldToken, Duration)>>>,
}

impl ManualScheduler {
    /// Creates a scheduler with no pending timers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokens of the timers that are scheduled and not cancelled.
    pub fn pending(&self) -> Vec<HoldToken> {
        self.pending.lock().iter().map(|(token, _)| *token).collect()
    }

    /// Removes and returns all pending timers.
    pub fn take_pending(&self) -> Vec<(HoldToken, Duration)> {
        std::mem::take(&mut *self.pending.lock())
    }
}

impl HoldScheduler for ManualScheduler {
    fn schedule(&self, token: HoldToken, delay: Duration) {
        self.pending.lock().push((token, delay));
    }

    fn cancel(&self, token: HoldToken) {
        self.pending.lock().retain(|(t, _)| *t != token);
    }
}
