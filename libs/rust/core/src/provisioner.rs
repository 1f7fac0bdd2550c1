//! Turning a reachable machine into a registered worker.
//!
//! Install order is fixed: read key, install credential, register worker,
//! hand back a [`ReadinessFuture`]. A failure at any step aborts the rest.
//! Nothing installed or registered is rolled back if the worker later fails to
//! come online; cleanup belongs to the caller.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::config::ProvisionConfig;
use crate::controller::{Controller, CredentialScope, WorkerRegistration};
use crate::error::{Error, Result};
use crate::machine::{KeyPair, MachineDescriptor};
use crate::poll::PollPolicy;
use crate::readiness::ReadinessFuture;
use crate::telemetry::METRICS;
use crate::timeline::{ProvisionPhase, ProvisionTimeline};

#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn install(&self, controller: Arc<dyn Controller>) -> Result<ReadinessFuture>;

    /// Release transport resources. Nothing to do by default.
    async fn close(&self) -> anyhow::Result<()> { Ok(()) }
}

/// Transport used to reach the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProvisionerKind {
    #[default]
    Ssh,
}

pub fn build_provisioner(cfg: &ProvisionConfig) -> Box<dyn Provisioner> {
    match cfg.transport {
        ProvisionerKind::Ssh => Box::new(
            SshProvisioner::new(cfg.machine_descriptor(), KeyPair::from_file(&cfg.key_path), cfg.readiness_timeout_secs)
                .with_poll_policy(PollPolicy::from(&cfg.poll)),
        ),
    }
}

/// Registers the machine as an SSH-launched worker, trusting it through a
/// private key credential installed for the machine's user.
#[derive(Debug, Clone)]
pub struct SshProvisioner {
    machine: MachineDescriptor,
    key_pair: KeyPair,
    readiness_timeout_secs: u64,
    poll: PollPolicy,
}

impl SshProvisioner {
    pub fn new(machine: MachineDescriptor, key_pair: KeyPair, readiness_timeout_secs: u64) -> Self {
        Self { machine, key_pair, readiness_timeout_secs, poll: PollPolicy::default() }
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn machine(&self) -> &MachineDescriptor { &self.machine }
}

#[async_trait]
impl Provisioner for SshProvisioner {
    #[instrument(skip_all, fields(machine = %self.machine.id(), address = %self.machine.address()))]
    async fn install(&self, controller: Arc<dyn Controller>) -> Result<ReadinessFuture> {
        let mut timeline = ProvisionTimeline::start();
        let principal = self.machine.user();

        let credential_id = async {
            let material = self.key_pair.read_private_key().await?;
            controller.install_credential(CredentialScope::Global, principal, &material).await
        }
        .await
        .map_err(|e| {
            METRICS.credential_failures.add(1, &[]);
            Error::credential(principal, e)
        })?;
        info!(credential = %credential_id, principal, "credential installed");
        timeline.enter(ProvisionPhase::Registration);

        let registration = WorkerRegistration {
            name: self.machine.id().to_string(),
            host: self.machine.address().to_string(),
            credential_id,
        };
        let worker = controller.register_worker(&registration).await.map_err(|e| {
            METRICS.registration_failures.add(1, &[]);
            Error::registration(self.machine.id(), self.machine.address(), e)
        })?;
        info!(worker = %worker.name(), "worker registered");
        timeline.enter(ProvisionPhase::AwaitingOnline);

        Ok(ReadinessFuture::with_timeline(worker, self.readiness_timeout_secs, self.poll.clone(), timeline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryController;
    use crate::readiness::ReadinessState;

    fn machine() -> MachineDescriptor { MachineDescriptor::new("node-a", "jenkins", "10.0.0.5") }

    #[tokio::test]
    async fn install_registers_and_defers_polling() {
        let controller = Arc::new(InMemoryController::new());
        let p = SshProvisioner::new(machine(), KeyPair::from_bytes(b"private".to_vec()), 30);
        let fut = p.install(controller.clone()).await.unwrap();

        let creds = controller.credentials();
        assert_eq!(creds.len(), 1);
        assert_eq!(creds[0].scope, CredentialScope::Global);
        assert_eq!(creds[0].principal, "jenkins");
        let regs = controller.registrations();
        assert_eq!(regs[0].host, "10.0.0.5");
        assert_eq!(regs[0].credential_id, creds[0].id);

        assert_eq!(fut.state(), ReadinessState::NotStarted);
        assert_eq!(controller.worker("node-a").unwrap().polls(), 0);
        assert_eq!(fut.timeline().current(), ProvisionPhase::AwaitingOnline);
        assert_eq!(fut.timeline().spans().len(), 2);
        assert_eq!(fut.default_timeout_secs(), 30);
    }

    #[tokio::test]
    async fn unreadable_key_aborts_before_install() {
        let controller = Arc::new(InMemoryController::new());
        let path = std::env::temp_dir().join(format!("missing-{}", uuid::Uuid::new_v4()));
        let p = SshProvisioner::new(machine(), KeyPair::from_file(path), 30);
        let err = p.install(controller.clone()).await.unwrap_err();
        assert!(matches!(err, Error::Credential { .. }));
        assert!(controller.credentials().is_empty());
        assert!(controller.registrations().is_empty());
    }

    #[tokio::test]
    async fn rejected_registration_surfaces() {
        let controller = Arc::new(InMemoryController::new().failing_registration("quota exceeded"));
        let p = SshProvisioner::new(machine(), KeyPair::from_bytes(b"k".to_vec()), 30);
        let err = p.install(controller.clone()).await.unwrap_err();
        assert!(matches!(err, Error::Registration { .. }), "{err:?}");
        assert!(err.to_string().contains("10.0.0.5"));
        assert_eq!(controller.credentials().len(), 1);
        assert!(p.close().await.is_ok());
    }
}
