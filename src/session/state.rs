//! Session lifecycle states.

use std::fmt;

use tokio::sync::watch;

/// Lifecycle of one NETCONF session. Ordered, only ever advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionState {
    /// Waiting for the peer's hello.
    Init,
    /// Both hellos exchanged; requests are served.
    HelloReceived,
    /// A close was requested by either side.
    ClosingSession,
    /// Terminal.
    SessionClosed,
}

impl SessionState {
    pub fn is_closed(self) -> bool {
        self == SessionState::SessionClosed
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Init => "INIT",
            SessionState::HelloReceived => "HELLO_RECEIVED",
            SessionState::ClosingSession => "CLOSING_SESSION",
            SessionState::SessionClosed => "SESSION_CLOSED",
        };
        f.write_str(name)
    }
}

/// Shared, monotonic session state.
///
/// The processing task advances it; the I/O task and the host observe it.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    tx: watch::Sender<SessionState>,
}

impl SessionStatus {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SessionState::Init);
        Self { tx }
    }

    pub fn get(&self) -> SessionState {
        *self.tx.borrow()
    }

    /// Move to `next` if it is later than the current state.
    ///
    /// Returns `false` when the state was already at or past `next`.
    pub fn advance(&self, next: SessionState) -> bool {
        self.tx.send_if_modified(|current| {
            if next > *current {
                tracing::debug!("Session state {} -> {}", current, next);
                *current = next;
                true
            } else {
                false
            }
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    /// Resolve once the state reaches [`SessionState::SessionClosed`].
    pub async fn wait_closed(&self) {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so this cannot fail.
        let _ = rx.wait_for(|state| state.is_closed()).await;
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::new()
    }
}
