//! Connection lifecycle shared by every connector
//!
//! `Disconnected -> Connecting -> Connected -> Disconnecting -> Disconnected`.
//! Transitions are serialized by an async mutex so concurrent `connect` calls
//! open at most one session. The attempt handles reset the state when dropped,
//! which covers a connect future cancelled mid-flight.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::{Mutex, MutexGuard};

/// Connection state of a connector instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Disconnecting,
            _ => ConnectionState::Disconnected,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Disconnecting => 3,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disconnecting => write!(f, "disconnecting"),
        }
    }
}

/// State machine embedded in each connector
pub struct Lifecycle {
    state: AtomicU8,
    transition: Mutex<()>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Disconnected.as_u8()),
            transition: Mutex::new(()),
        }
    }

    /// Current state, readable without awaiting
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    fn set(&self, state: ConnectionState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Start a connect transition.
    ///
    /// Returns `None` when the connector is already connected. Otherwise the
    /// returned attempt must be completed with [`ConnectAttempt::succeed`];
    /// dropping it leaves the connector disconnected.
    pub async fn begin_connect(&self) -> Option<ConnectAttempt<'_>> {
        let guard = self.transition.lock().await;
        if self.is_connected() {
            return None;
        }
        self.set(ConnectionState::Connecting);
        Some(ConnectAttempt {
            lifecycle: self,
            _guard: guard,
            succeeded: false,
        })
    }

    /// Start a disconnect transition; `None` when there is no session
    pub async fn begin_disconnect(&self) -> Option<DisconnectAttempt<'_>> {
        let guard = self.transition.lock().await;
        if !self.is_connected() {
            return None;
        }
        self.set(ConnectionState::Disconnecting);
        Some(DisconnectAttempt {
            lifecycle: self,
            _guard: guard,
        })
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// An in-flight connect
pub struct ConnectAttempt<'a> {
    lifecycle: &'a Lifecycle,
    _guard: MutexGuard<'a, ()>,
    succeeded: bool,
}

impl ConnectAttempt<'_> {
    /// Mark the session as established
    pub fn succeed(mut self) {
        self.succeeded = true;
        self.lifecycle.set(ConnectionState::Connected);
    }
}

impl Drop for ConnectAttempt<'_> {
    fn drop(&mut self) {
        if !self.succeeded {
            self.lifecycle.set(ConnectionState::Disconnected);
        }
    }
}

/// An in-flight disconnect; always ends in `Disconnected`
pub struct DisconnectAttempt<'a> {
    lifecycle: &'a Lifecycle,
    _guard: MutexGuard<'a, ()>,
}

impl Drop for DisconnectAttempt<'_> {
    fn drop(&mut self) {
        self.lifecycle.set(ConnectionState::Disconnected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_connect_then_disconnect() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), ConnectionState::Disconnected);

        let attempt = lifecycle.begin_connect().await.unwrap();
        assert_eq!(lifecycle.state(), ConnectionState::Connecting);
        attempt.succeed();
        assert!(lifecycle.is_connected());

        // Second connect is a no-op
        assert!(lifecycle.begin_connect().await.is_none());

        let attempt = lifecycle.begin_disconnect().await.unwrap();
        assert_eq!(lifecycle.state(), ConnectionState::Disconnecting);
        drop(attempt);
        assert_eq!(lifecycle.state(), ConnectionState::Disconnected);
        assert!(lifecycle.begin_disconnect().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_connect_resets_state() {
        let lifecycle = Lifecycle::new();
        {
            let _attempt = lifecycle.begin_connect().await.unwrap();
        }
        assert_eq!(lifecycle.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_cancelled_connect_resets_state() {
        let lifecycle = Arc::new(Lifecycle::new());
        let inner = lifecycle.clone();
        let task = tokio::spawn(async move {
            let attempt = inner.begin_connect().await.unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
            attempt.succeed();
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(lifecycle.state(), ConnectionState::Connecting);
        task.abort();
        let _ = task.await;
        assert_eq!(lifecycle.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_concurrent_connects_open_one_session() {
        use std::sync::atomic::AtomicUsize;

        let lifecycle = Arc::new(Lifecycle::new());
        let sessions = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let lifecycle = lifecycle.clone();
            let sessions = sessions.clone();
            handles.push(tokio::spawn(async move {
                if let Some(attempt) = lifecycle.begin_connect().await {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    sessions.fetch_add(1, Ordering::SeqCst);
                    attempt.succeed();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(sessions.load(Ordering::SeqCst), 1);
        assert!(lifecycle.is_connected());
    }
}
