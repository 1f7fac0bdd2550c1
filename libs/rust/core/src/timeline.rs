//! Where an install spent its time.
//!
//! Each install walks CredentialInstall -> Registration -> AwaitingOnline ->
//! Operational. Entering a phase closes the previous one into a [`PhaseSpan`].

use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProvisionPhase { CredentialInstall, Registration, AwaitingOnline, Operational }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSpan {
    pub phase: ProvisionPhase,
    pub took: Duration,
}

#[derive(Debug, Clone)]
pub struct ProvisionTimeline {
    started_at: Instant,
    current: ProvisionPhase,
    entered_at: Instant,
    spans: Vec<PhaseSpan>,
}

impl ProvisionTimeline {
    /// Timeline for a full install, opened at credential installation.
    pub fn start() -> Self { Self::opened_at(ProvisionPhase::CredentialInstall) }

    /// Timeline for a worker registered elsewhere.
    pub fn awaiting_online() -> Self { Self::opened_at(ProvisionPhase::AwaitingOnline) }

    fn opened_at(phase: ProvisionPhase) -> Self {
        let now = Instant::now();
        Self { started_at: now, current: phase, entered_at: now, spans: Vec::new() }
    }

    /// Close the current phase and open `next`. Phases only move forward;
    /// returns false (and records nothing) otherwise.
    pub fn enter(&mut self, next: ProvisionPhase) -> bool {
        if next <= self.current { return false; }
        let now = Instant::now();
        self.spans.push(PhaseSpan { phase: self.current, took: now - self.entered_at });
        self.current = next;
        self.entered_at = now;
        true
    }

    pub fn current(&self) -> ProvisionPhase { self.current }
    pub fn is_operational(&self) -> bool { self.current == ProvisionPhase::Operational }
    pub fn spans(&self) -> &[PhaseSpan] { &self.spans }
    pub fn time_in(&self, phase: ProvisionPhase) -> Option<Duration> {
        self.spans.iter().find(|s| s.phase == phase).map(|s| s.took)
    }
    pub fn total(&self) -> Duration { self.started_at.elapsed() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn spans_close_as_phases_are_entered() {
        let mut t = ProvisionTimeline::start();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(t.enter(ProvisionPhase::Registration));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(t.enter(ProvisionPhase::AwaitingOnline));
        assert_eq!(t.current(), ProvisionPhase::AwaitingOnline);
        assert!(t.time_in(ProvisionPhase::CredentialInstall).unwrap() >= Duration::from_secs(2));
        assert!(t.time_in(ProvisionPhase::Registration).unwrap() >= Duration::from_secs(1));
        assert!(t.time_in(ProvisionPhase::AwaitingOnline).is_none());
    }

    #[test]
    fn phases_never_move_backwards() {
        let mut t = ProvisionTimeline::awaiting_online();
        assert!(!t.enter(ProvisionPhase::Registration));
        assert!(t.enter(ProvisionPhase::Operational));
        assert!(!t.enter(ProvisionPhase::Operational));
        assert!(t.is_operational());
        assert_eq!(t.spans().len(), 1);
        assert_eq!(t.spans()[0].phase, ProvisionPhase::AwaitingOnline);
    }
}
