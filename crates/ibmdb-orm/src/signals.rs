//! "Connection created" notification.

use std::error::Error as StdError;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use ibmdb::{Dialect, ServerInfo};
use tracing::warn;

/// Outcome reported by an observer. Failures are logged, never propagated.
pub type ObserverResult = Result<(), Box<dyn StdError + Send + Sync>>;

/// Sent once per successful native connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionCreated {
    /// Database name or connection string the wrapper connected to.
    pub database: String,
    pub dialect: Dialect,
    pub server: ServerInfo,
}

pub trait ConnectionObserver: Send + Sync {
    fn connection_created(&self, event: &ConnectionCreated) -> ObserverResult;
}

impl<F> ConnectionObserver for F
where
    F: Fn(&ConnectionCreated) -> ObserverResult + Send + Sync,
{
    fn connection_created(&self, event: &ConnectionCreated) -> ObserverResult {
        self(event)
    }
}

/// Registered observers of one wrapper.
#[derive(Default, Clone)]
pub struct ConnectionSignal {
    observers: Vec<Arc<dyn ConnectionObserver>>,
}

impl ConnectionSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, observer: Arc<dyn ConnectionObserver>) {
        self.observers.push(observer);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Deliver `event` to every observer. Returns how many succeeded.
    ///
    /// A panicking observer counts as failed; the connection is kept.
    pub fn send(&self, event: &ConnectionCreated) -> usize {
        self.observers
            .iter()
            .filter(|observer| {
                match catch_unwind(AssertUnwindSafe(|| observer.connection_created(event))) {
                    Ok(Ok(())) => true,
                    Ok(Err(e)) => {
                        warn!(error = %e, database = %event.database, "connection observer failed");
                        false
                    }
                    Err(_) => {
                        warn!(database = %event.database, "connection observer panicked");
                        false
                    }
                }
            })
            .count()
    }
}

impl fmt::Debug for ConnectionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSignal")
            .field("observers", &self.observers.len())
            .finish()
    }
}
