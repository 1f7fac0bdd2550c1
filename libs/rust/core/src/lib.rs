//! Worker provisioning for orchestration controllers.
//!
//! A [`Provisioner`] trusts and registers a machine with a [`Controller`] and
//! returns a [`ReadinessFuture`] that resolves once the new worker reports
//! online, or fails after a bounded wait.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::prelude::*;

pub mod config;
pub mod controller;
pub mod error;
pub mod http;
pub mod machine;
pub mod memory;
pub mod poll;
pub mod provisioner;
pub mod readiness;
pub mod timeline;
mod telemetry; // provisioning + readiness metrics

pub use config::{load_config, ProvisionConfig};
pub use controller::{Controller, CredentialId, CredentialScope, WorkerHandle, WorkerRegistration};
pub use error::{Error, Result as ProvisionResult};
pub use http::HttpController;
pub use machine::{CredentialMaterial, KeyPair, MachineDescriptor};
pub use memory::{InMemoryController, Probe, ScriptedWorker};
pub use poll::PollPolicy;
pub use provisioner::{build_provisioner, Provisioner, ProvisionerKind, SshProvisioner};
pub use readiness::{ReadinessFuture, ReadinessState, SharedWorker, TimeUnit};
pub use telemetry::{ProvisionMetrics, METRICS};
pub use timeline::{PhaseSpan, ProvisionPhase, ProvisionTimeline};

/// Install the global subscriber. `PROVISION_JSON_LOG=1` switches to JSON lines.
pub fn init_tracing(service: &str) -> Result<()> {
    let json = std::env::var("PROVISION_JSON_LOG").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true).with_current_span(true).with_span_list(false))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true).with_line_number(true))
            .try_init()?;
    }
    info!(target: "provision", service, "tracing initialized");
    Ok(())
}
