//! Provisioning and readiness metrics.
use once_cell::sync::Lazy;
use opentelemetry::metrics::{Counter, Histogram, Meter, Unit};

static METER: Lazy<Meter> = Lazy::new(|| opentelemetry::global::meter("provision"));

pub struct ProvisionMetrics {
    pub readiness_polls: Counter<u64>,
    pub readiness_ready: Counter<u64>,
    pub readiness_timeouts: Counter<u64>,
    pub readiness_faults: Counter<u64>,
    pub credential_failures: Counter<u64>,
    pub registration_failures: Counter<u64>,
    pub readiness_wait_seconds: Histogram<f64>,
}

pub static METRICS: Lazy<ProvisionMetrics> = Lazy::new(|| ProvisionMetrics {
    readiness_polls: METER
        .u64_counter("provision_readiness_polls_total")
        .with_description("Online-status queries issued while waiting for workers")
        .init(),
    readiness_ready: METER
        .u64_counter("provision_readiness_ready_total")
        .with_description("Workers confirmed online")
        .init(),
    readiness_timeouts: METER
        .u64_counter("provision_readiness_timeouts_total")
        .with_description("Waits that hit their deadline")
        .init(),
    readiness_faults: METER
        .u64_counter("provision_readiness_faults_total")
        .with_description("Waits aborted by a status query failure")
        .init(),
    credential_failures: METER
        .u64_counter("provision_credential_failures_total")
        .with_description("Credential reads or installs that failed")
        .init(),
    registration_failures: METER
        .u64_counter("provision_registration_failures_total")
        .with_description("Worker registrations rejected by the controller")
        .init(),
    readiness_wait_seconds: METER
        .f64_histogram("provision_readiness_wait_seconds")
        .with_description("Time spent waiting for a worker to come online")
        .with_unit(Unit::new("s"))
        .init(),
});
