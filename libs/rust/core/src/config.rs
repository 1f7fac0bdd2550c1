//! Layered configuration: defaults, optional file, then `PROVISION__*` env vars.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::machine::MachineDescriptor;
use crate::poll::PollSettings;
use crate::provisioner::ProvisionerKind;

pub const DEFAULT_READINESS_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct MachineSettings {
    pub id: String,
    pub user: String,
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionConfig {
    #[serde(default)]
    pub transport: ProvisionerKind,
    pub controller_url: String,
    #[serde(default = "default_readiness_timeout")]
    pub readiness_timeout_secs: u64,
    pub machine: MachineSettings,
    pub key_path: PathBuf,
    #[serde(default)]
    pub poll: PollSettings,
}

fn default_readiness_timeout() -> u64 { DEFAULT_READINESS_TIMEOUT_SECS }

impl ProvisionConfig {
    pub fn machine_descriptor(&self) -> MachineDescriptor {
        MachineDescriptor::new(&self.machine.id, &self.machine.user, &self.machine.address)
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("controller_url", &self.controller_url),
            ("machine.id", &self.machine.id),
            ("machine.user", &self.machine.user),
            ("machine.address", &self.machine.address),
        ] {
            if value.trim().is_empty() { anyhow::bail!("{field} must not be empty"); }
        }
        self.poll.validate()
    }

    /// Parse a YAML document without consulting the environment.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Yaml))
            .build()?;
        let parsed: ProvisionConfig = cfg.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }
}

/// Load from `PROVISION_CONFIG_FILE` (if set) overlaid with `PROVISION__*`
/// variables, e.g. `PROVISION__MACHINE__ADDRESS=10.0.0.5`.
pub fn load_config() -> Result<ProvisionConfig> {
    let mut builder = config::Config::builder()
        .set_default("transport", "ssh")?
        .set_default("readiness_timeout_secs", DEFAULT_READINESS_TIMEOUT_SECS as i64)?;
    if let Ok(file) = std::env::var("PROVISION_CONFIG_FILE") {
        builder = builder.add_source(config::File::with_name(&file).required(false));
    }
    builder = builder.add_source(config::Environment::with_prefix("PROVISION").separator("__").try_parsing(true));
    let cfg = builder.build().context("building provisioner configuration")?;
    let parsed: ProvisionConfig = cfg.try_deserialize().context("invalid provisioner configuration")?;
    parsed.validate()?;
    Ok(parsed)
}
