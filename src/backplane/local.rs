//! # In-process backplane.
//!
//! [`LocalBackplane`] is a thin wrapper around [`tokio::sync::broadcast`]
//! that implements [`BusConnector`]. Every session publishes into the same
//! ring buffer and every subscriber sees every message.
//!
//! ## Access modes
//! - [`LocalBackplane::open`]: any non-empty identity/secret pair is accepted
//! - [`LocalBackplane::with_accounts`]: only listed identity/secret pairs
//! - [`LocalBackplane::unreachable`]: every connect fails with a network error
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks.
//! - **No persistence**: messages are lost if nobody is subscribed.
//! - A released session refuses `publish`/`subscribe` with `ConnectionError::Closed`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{BusConnection, BusConnector, Message};
use crate::config::Secret;
use crate::error::ConnectionError;

enum Access {
    Open,
    Accounts(HashMap<String, String>),
    Unreachable(String),
}

struct Shared {
    tx: broadcast::Sender<Message>,
    access: Access,
    attempts: AtomicUsize,
    active: AtomicUsize,
    releases: AtomicUsize,
}

/// In-process backplane shared by any number of sessions.
#[derive(Clone)]
pub struct LocalBackplane {
    shared: Arc<Shared>,
}

impl LocalBackplane {
    fn with_access(capacity: usize, access: Access) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                tx,
                access,
                attempts: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                releases: AtomicUsize::new(0),
            }),
        }
    }

    /// Backplane accepting any non-empty credentials.
    pub fn open(capacity: usize) -> Self {
        Self::with_access(capacity, Access::Open)
    }

    /// Backplane accepting only the listed `(identity, secret)` pairs.
    pub fn with_accounts<I, K, V>(capacity: usize, accounts: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let accounts = accounts
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::with_access(capacity, Access::Accounts(accounts))
    }

    /// Backplane that cannot be reached.
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self::with_access(1, Access::Unreachable(reason.into()))
    }

    /// Publishes a message from outside any session (operator or peer).
    ///
    /// Returns the number of subscribers that received it.
    pub fn inject(&self, message: Message) -> usize {
        self.shared.tx.send(message).unwrap_or(0)
    }

    /// Observes all traffic from outside any session.
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.shared.tx.subscribe()
    }

    /// Live receivers, from sessions and observers alike.
    pub fn subscriber_count(&self) -> usize {
        self.shared.tx.receiver_count()
    }

    /// Number of `connect` calls so far, successful or not.
    pub fn connect_attempts(&self) -> usize {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    /// Sessions opened and not yet released.
    pub fn active_sessions(&self) -> usize {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Sessions released so far.
    pub fn releases(&self) -> usize {
        self.shared.releases.load(Ordering::SeqCst)
    }

    fn authenticate(&self, identity: &str, secret: &Secret) -> Result<(), ConnectionError> {
        let accepted = match &self.shared.access {
            Access::Unreachable(reason) => {
                return Err(ConnectionError::Network {
                    reason: reason.clone(),
                });
            }
            Access::Open => !identity.is_empty() && !secret.is_empty(),
            Access::Accounts(accounts) => accounts
                .get(identity)
                .is_some_and(|expected| expected == secret.expose()),
        };
        if accepted {
            Ok(())
        } else {
            Err(ConnectionError::Auth {
                identity: identity.to_string(),
            })
        }
    }
}

#[async_trait]
impl BusConnector for LocalBackplane {
    async fn connect(
        &self,
        identity: &str,
        secret: &Secret,
    ) -> Result<Arc<dyn BusConnection>, ConnectionError> {
        self.shared.attempts.fetch_add(1, Ordering::SeqCst);
        self.authenticate(identity, secret)?;
        self.shared.active.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(LocalSession {
            identity: identity.into(),
            shared: Arc::clone(&self.shared),
            open: AtomicBool::new(true),
        }))
    }
}

/// Session on a [`LocalBackplane`].
pub struct LocalSession {
    identity: Arc<str>,
    shared: Arc<Shared>,
    open: AtomicBool,
}

impl BusConnection for LocalSession {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn publish(&self, message: Message) -> Result<(), ConnectionError> {
        if !self.is_open() {
            return Err(ConnectionError::Closed);
        }
        // no receivers is not an error: the message is simply lost
        let _ = self.shared.tx.send(message);
        Ok(())
    }

    fn subscribe(&self) -> Result<broadcast::Receiver<Message>, ConnectionError> {
        if !self.is_open() {
            return Err(ConnectionError::Closed);
        }
        Ok(self.shared.tx.subscribe())
    }

    fn release(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            self.shared.active.fetch_sub(1, Ordering::SeqCst);
            self.shared.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

impl Drop for LocalSession {
    fn drop(&mut self) {
        self.release();
    }
}
