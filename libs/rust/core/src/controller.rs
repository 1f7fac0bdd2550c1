//! Narrow interfaces onto the orchestration controller.
//!
//! The controller owns the credential store and the worker inventory; this
//! crate only installs into one, registers into the other, and then polls the
//! registered worker for its online flag.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::machine::CredentialMaterial;

/// Scope a credential is installed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CredentialScope { Global }

/// Identifier the controller assigns to an installed credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialId(pub String);

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// What the controller needs to create a worker entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRegistration {
    pub name: String,
    /// Connection endpoint, the machine's reachable address.
    pub host: String,
    pub credential_id: CredentialId,
}

#[async_trait]
pub trait Controller: Send + Sync {
    async fn install_credential(&self, scope: CredentialScope, principal: &str, material: &CredentialMaterial) -> Result<CredentialId>;
    async fn register_worker(&self, registration: &WorkerRegistration) -> Result<Arc<dyn WorkerHandle>>;
}

/// A worker entity registered in the controller.
#[async_trait]
pub trait WorkerHandle: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;
    /// Side-effect free status query. Transport failures are returned, never
    /// folded into `Ok(false)`.
    async fn is_online(&self) -> Result<bool>;
}
