use anyhow::Result;
use provision_core::{build_provisioner, init_tracing, load_config, HttpController};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("provisioner")?;
    let cfg = load_config()?;
    info!(target: "provisioner", machine = %cfg.machine.id, controller = %cfg.controller_url, "Starting provisioner");

    let controller = Arc::new(HttpController::new(&cfg.controller_url)?);
    let provisioner = build_provisioner(&cfg);
    let readiness = provisioner.install(controller).await?;
    let outcome = readiness.get().await;
    provisioner.close().await?;

    match outcome {
        Ok(worker) => {
            let timeline = readiness.timeline();
            info!(worker = %worker.name(), total_ms = timeline.total().as_millis() as u64, phases = ?timeline.spans(), "worker ready");
            Ok(())
        }
        Err(e) => {
            // worker stays registered; the operator decides whether to remove it
            error!(error = %e, fatal = e.is_fatal(), "worker did not become ready");
            Err(e.into())
        }
    }
}
