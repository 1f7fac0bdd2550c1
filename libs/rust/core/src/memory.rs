//! In-process controller for tests and local dry runs.
//!
//! [`InMemoryController`] records every credential and registration it
//! receives and hands out [`ScriptedWorker`]s whose online answers follow a
//! fixed script. Failures can be injected for either controller call.
//!
//! Not suitable for production: nothing is persisted and no remote machine is
//! ever contacted.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::controller::{Controller, CredentialId, CredentialScope, WorkerHandle, WorkerRegistration};
use crate::machine::CredentialMaterial;

/// One scripted answer to `is_online`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe { Online, Offline, Fail(String) }

#[derive(Debug)]
pub struct ScriptedWorker {
    name: String,
    script: Mutex<VecDeque<Probe>>,
    fallback: Probe,
    polls: AtomicUsize,
}

impl ScriptedWorker {
    pub fn with_script(name: impl Into<String>, script: Vec<Probe>, fallback: Probe) -> Self {
        Self { name: name.into(), script: Mutex::new(script.into()), fallback, polls: AtomicUsize::new(0) }
    }
    pub fn always(name: impl Into<String>, probe: Probe) -> Self { Self::with_script(name, Vec::new(), probe) }
    /// Offline for the first `offline_polls` queries, online afterwards.
    pub fn online_after(name: impl Into<String>, offline_polls: usize) -> Self {
        Self::with_script(name, vec![Probe::Offline; offline_polls], Probe::Online)
    }
    /// Number of `is_online` calls served so far.
    pub fn polls(&self) -> usize { self.polls.load(Ordering::SeqCst) }
}

#[async_trait]
impl WorkerHandle for ScriptedWorker {
    fn name(&self) -> &str { &self.name }

    async fn is_online(&self) -> Result<bool> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let probe = self.script.lock().pop_front().unwrap_or_else(|| self.fallback.clone());
        match probe {
            Probe::Online => Ok(true),
            Probe::Offline => Ok(false),
            Probe::Fail(msg) => Err(anyhow!(msg)),
        }
    }
}

/// A credential as the in-memory store received it.
#[derive(Debug, Clone)]
pub struct InstalledCredential {
    pub id: CredentialId,
    pub scope: CredentialScope,
    pub principal: String,
    pub key_len: usize,
}

#[derive(Debug)]
pub struct InMemoryController {
    credentials: RwLock<Vec<InstalledCredential>>,
    registrations: RwLock<Vec<WorkerRegistration>>,
    workers: RwLock<HashMap<String, Arc<ScriptedWorker>>>,
    script: Vec<Probe>,
    fallback: Probe,
    credential_fault: Option<String>,
    registration_fault: Option<String>,
}

impl Default for InMemoryController {
    fn default() -> Self { Self::new() }
}

impl InMemoryController {
    /// Workers registered here report online on their first query.
    pub fn new() -> Self {
        Self {
            credentials: RwLock::new(Vec::new()),
            registrations: RwLock::new(Vec::new()),
            workers: RwLock::new(HashMap::new()),
            script: Vec::new(),
            fallback: Probe::Online,
            credential_fault: None,
            registration_fault: None,
        }
    }

    pub fn with_online_after(self, offline_polls: usize) -> Self {
        self.with_worker_script(vec![Probe::Offline; offline_polls], Probe::Online)
    }

    pub fn with_worker_script(mut self, script: Vec<Probe>, fallback: Probe) -> Self {
        self.script = script;
        self.fallback = fallback;
        self
    }

    pub fn failing_credentials(mut self, message: impl Into<String>) -> Self {
        self.credential_fault = Some(message.into());
        self
    }

    pub fn failing_registration(mut self, message: impl Into<String>) -> Self {
        self.registration_fault = Some(message.into());
        self
    }

    pub fn credentials(&self) -> Vec<InstalledCredential> { self.credentials.read().clone() }
    pub fn registrations(&self) -> Vec<WorkerRegistration> { self.registrations.read().clone() }
    pub fn worker(&self, name: &str) -> Option<Arc<ScriptedWorker>> { self.workers.read().get(name).cloned() }
}

#[async_trait]
impl Controller for InMemoryController {
    async fn install_credential(&self, scope: CredentialScope, principal: &str, material: &CredentialMaterial) -> Result<CredentialId> {
        if let Some(msg) = &self.credential_fault {
            return Err(anyhow!("credential store write failed: {msg}"));
        }
        let id = CredentialId(uuid::Uuid::new_v4().to_string());
        self.credentials.write().push(InstalledCredential {
            id: id.clone(),
            scope,
            principal: principal.to_string(),
            key_len: material.private_key().len(),
        });
        Ok(id)
    }

    async fn register_worker(&self, registration: &WorkerRegistration) -> Result<Arc<dyn WorkerHandle>> {
        if let Some(msg) = &self.registration_fault {
            return Err(anyhow!("registration refused: {msg}"));
        }
        if !self.credentials.read().iter().any(|c| c.id == registration.credential_id) {
            return Err(anyhow!("unknown credential {}", registration.credential_id));
        }
        let mut workers = self.workers.write();
        if workers.contains_key(&registration.name) {
            return Err(anyhow!("worker '{}' already exists", registration.name));
        }
        let worker = Arc::new(ScriptedWorker::with_script(registration.name.clone(), self.script.clone(), self.fallback.clone()));
        workers.insert(registration.name.clone(), worker.clone());
        self.registrations.write().push(registration.clone());
        Ok(worker)
    }
}
