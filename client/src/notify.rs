use std::sync::{Arc, Mutex};

/// Host-registered surface for the one-time "session expired" notice.
///
/// Many concurrent requests can fail together when a session dies; routing
/// them through this hook keeps the user from seeing one toast per call.
pub trait UnauthorizedNotifier: Send + Sync {
    fn show_unauthorized_error(&self, message: &str);
}

/// Delivery state for the current unauthorized-session episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoticeState {
    Pending,
    Notified,
}

struct NotifyInner {
    notifier: Option<Arc<dyn UnauthorizedNotifier>>,
    state: NoticeState,
}

pub(crate) struct NotifyHandle {
    inner: Mutex<NotifyInner>,
}

impl NotifyHandle {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(NotifyInner {
                notifier: None,
                state: NoticeState::Pending,
            }),
        }
    }

    /// Register the host's notifier and re-arm delivery.
    pub fn set(&self, notifier: Arc<dyn UnauthorizedNotifier>) {
        let mut inner = self.inner.lock().unwrap();
        inner.notifier = Some(notifier);
        inner.state = NoticeState::Pending;
    }

    /// Drop the registered notifier and re-arm delivery.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.notifier = None;
        inner.state = NoticeState::Pending;
    }

    /// Re-arm delivery without touching the registered notifier. Called
    /// when a fresh login starts a new session episode.
    pub fn rearm(&self) {
        self.inner.lock().unwrap().state = NoticeState::Pending;
    }

    /// Deliver the notice if this episode hasn't been notified yet. The
    /// state moves to `Notified` regardless of whether a notifier is
    /// registered, so late registration doesn't replay an old episode.
    pub fn notify(&self, message: &str) {
        let notifier = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state == NoticeState::Notified {
                return;
            }
            inner.state = NoticeState::Notified;
            inner.notifier.clone()
        };
        match notifier {
            Some(notifier) => notifier.show_unauthorized_error(message),
            None => tracing::warn!(message, "no unauthorized notifier set"),
        }
    }
}
