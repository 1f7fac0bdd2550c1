//! Target machine descriptor and the SSH key pair used to reach it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A reachable machine about to become a worker. Immutable for the lifetime of
/// a provisioning attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MachineDescriptor {
    id: String,
    user: String,
    address: String,
}

impl MachineDescriptor {
    pub fn new(id: impl Into<String>, user: impl Into<String>, address: impl Into<String>) -> Self {
        Self { id: id.into(), user: user.into(), address: address.into() }
    }
    pub fn id(&self) -> &str { &self.id }
    /// Principal the credential is installed for.
    pub fn user(&self) -> &str { &self.user }
    /// Public address the controller connects to.
    pub fn address(&self) -> &str { &self.address }
}

#[derive(Clone)]
enum KeySource { File(PathBuf), Inline(Vec<u8>) }

/// Caller-owned key pair. Only the private half is read here.
#[derive(Clone)]
pub struct KeyPair { source: KeySource }

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            KeySource::File(path) => f.debug_tuple("KeyPair").field(path).finish(),
            KeySource::Inline(_) => f.write_str("KeyPair(<inline>)"),
        }
    }
}

impl KeyPair {
    pub fn from_file(path: impl Into<PathBuf>) -> Self { Self { source: KeySource::File(path.into()) } }
    pub fn from_bytes(private_key: impl Into<Vec<u8>>) -> Self { Self { source: KeySource::Inline(private_key.into()) } }

    pub async fn read_private_key(&self) -> Result<CredentialMaterial> {
        let bytes = match &self.source {
            KeySource::File(path) => tokio::fs::read(path)
                .await
                .with_context(|| format!("reading private key {}", path.display()))?,
            KeySource::Inline(bytes) => bytes.clone(),
        };
        if bytes.is_empty() { anyhow::bail!("private key is empty"); }
        Ok(CredentialMaterial { private_key: bytes })
    }
}

/// Private key bytes read from a [`KeyPair`].
#[derive(Clone)]
pub struct CredentialMaterial { private_key: Vec<u8> }

impl CredentialMaterial {
    pub fn private_key(&self) -> &[u8] { &self.private_key }
}

impl std::fmt::Debug for CredentialMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialMaterial").field("len", &self.private_key.len()).finish()
    }
}
