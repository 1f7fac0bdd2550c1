//! JSON-over-HTTP controller client.
//!
//! Routes (relative to the controller base URL):
//! - `POST credentials` `{scope, principal, private_key}` -> `{id}`
//! - `POST workers` `{name, host, credential_id}` -> `{id}`
//! - `GET workers/{id}` -> `{online}`

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::controller::{Controller, CredentialId, CredentialScope, WorkerHandle, WorkerRegistration};
use crate::machine::CredentialMaterial;

#[derive(Debug, Serialize, Deserialize)]
pub struct CredentialRequest {
    pub scope: CredentialScope,
    pub principal: String,
    /// Base64 of the private key bytes.
    pub private_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse { pub id: String }

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkerStatus { pub online: bool }

#[derive(Debug, Clone)]
pub struct HttpController {
    client: reqwest::Client,
    base: String,
}

impl HttpController {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("building controller http client")?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self { client, base: base_url.trim_end_matches('/').to_string() }
    }

    fn url(&self, path: &str) -> String { format!("{}/{}", self.base, path) }
}

#[async_trait]
impl Controller for HttpController {
    async fn install_credential(&self, scope: CredentialScope, principal: &str, material: &CredentialMaterial) -> Result<CredentialId> {
        let body = CredentialRequest { scope, principal: principal.to_string(), private_key: STANDARD.encode(material.private_key()) };
        let created: CreatedResponse = self.client
            .post(self.url("credentials"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("decoding credential response")?;
        Ok(CredentialId(created.id))
    }

    async fn register_worker(&self, registration: &WorkerRegistration) -> Result<Arc<dyn WorkerHandle>> {
        let created: CreatedResponse = self.client
            .post(self.url("workers"))
            .json(registration)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("decoding worker response")?;
        Ok(Arc::new(HttpWorker {
            client: self.client.clone(),
            name: registration.name.clone(),
            status_url: self.url(&format!("workers/{}", created.id)),
        }))
    }
}

#[derive(Debug)]
pub struct HttpWorker {
    client: reqwest::Client,
    name: String,
    status_url: String,
}

#[async_trait]
impl WorkerHandle for HttpWorker {
    fn name(&self) -> &str { &self.name }

    async fn is_online(&self) -> Result<bool> {
        let status: WorkerStatus = self.client
            .get(&self.status_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("decoding worker status")?;
        Ok(status.online)
    }
}
