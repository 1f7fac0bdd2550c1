//! Error taxonomy for provisioning and readiness waits.
//!
//! Collaborators (controllers, worker handles, key readers) fail with
//! `anyhow::Error`; the core wraps those into the variants below so callers can
//! tell "never came up" from "something broke while checking".

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Shared, cloneable error source. Outcomes are cached on the readiness future
/// and replayed to later waiters, so sources are reference counted.
pub type SharedSource = Arc<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Reading the key pair or installing it into the controller failed.
    /// No worker has been registered when this is returned.
    #[error("failed to install credential for principal '{principal}': {source}")]
    Credential { principal: String, #[source] source: SharedSource },

    /// The controller refused to register the worker.
    #[error("controller rejected registration of worker '{worker}' at {address}: {source}")]
    Registration { worker: String, address: String, #[source] source: SharedSource },

    /// The worker never reported online before the deadline.
    #[error("worker '{worker}' could not be online in {timeout_secs} seconds (waited {:.1}s)", .elapsed.as_secs_f64())]
    ReadinessTimeout { worker: String, timeout_secs: u64, elapsed: Duration },

    /// Querying the worker's online status failed while waiting.
    #[error("an error occurred while waiting for worker '{worker}' to be online in {timeout_secs} seconds: {source}")]
    Wait { worker: String, timeout_secs: u64, #[source] source: SharedSource },
}

impl Error {
    pub(crate) fn credential(principal: &str, err: anyhow::Error) -> Self {
        Error::Credential { principal: principal.to_string(), source: shared(err) }
    }

    pub(crate) fn registration(worker: &str, address: &str, err: anyhow::Error) -> Self {
        Error::Registration { worker: worker.to_string(), address: address.to_string(), source: shared(err) }
    }

    pub(crate) fn wait(worker: &str, timeout_secs: u64, err: anyhow::Error) -> Self {
        Error::Wait { worker: worker.to_string(), timeout_secs, source: shared(err) }
    }

    /// True for the expected "never came online" outcome.
    pub fn is_timeout(&self) -> bool { matches!(self, Error::ReadinessTimeout { .. }) }

    /// True for faults that should not be treated as an ordinary timeout.
    pub fn is_fatal(&self) -> bool { !self.is_timeout() }
}

fn shared(err: anyhow::Error) -> SharedSource {
    let boxed: Box<dyn std::error::Error + Send + Sync + 'static> = err.into();
    Arc::from(boxed)
}
