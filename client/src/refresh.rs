use std::sync::Mutex;

use tokio::sync::oneshot;

/// Outcome a queued request receives once the in-flight refresh resolves:
/// the fresh access token, or nothing if the refresh failed.
pub(crate) type RefreshOutcome = Result<String, RefreshFailed>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("token refresh failed")]
pub(crate) struct RefreshFailed;

enum GateState {
    Idle,
    Refreshing {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    },
}

/// What `acquire` handed the caller: either it owns the refresh, or it
/// waits for the owner's outcome.
pub(crate) enum Acquired {
    Leader,
    Waiter(oneshot::Receiver<RefreshOutcome>),
}

/// Single-flight coordinator for token refreshes.
///
/// At most one refresh is in flight per client. The first request that
/// observes a 401 becomes the leader and performs the refresh; every
/// further 401 during that window enqueues a waiter that is resolved, in
/// enqueue order, with the leader's outcome. The lock is never held across
/// an await point.
pub(crate) struct RefreshGate {
    state: Mutex<GateState>,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState::Idle),
        }
    }

    pub fn acquire(&self) -> Acquired {
        let mut state = self.state.lock().unwrap();
        match &mut *state {
            GateState::Idle => {
                *state = GateState::Refreshing {
                    waiters: Vec::new(),
                };
                Acquired::Leader
            }
            GateState::Refreshing { waiters } => {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                Acquired::Waiter(rx)
            }
        }
    }

    /// Resolve the refresh: return to idle and hand every waiter the
    /// outcome, in the order they queued up.
    pub fn complete(&self, outcome: RefreshOutcome) {
        let waiters = {
            let mut state = self.state.lock().unwrap();
            match std::mem::replace(&mut *state, GateState::Idle) {
                GateState::Refreshing { waiters } => waiters,
                GateState::Idle => Vec::new(),
            }
        };
        for waiter in waiters {
            // a dropped receiver means the caller gave up; nothing to do
            let _ = waiter.send(outcome.clone());
        }
    }
}
