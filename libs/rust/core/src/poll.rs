//! Sleep-and-recheck pacing for readiness polling.
//! Fixed 1s interval by default; exponential growth and jitter are opt-in.

use rand::{thread_rng, Rng};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
    pub jitter: f64, // 0.0 - 1.0
}

impl Default for PollPolicy {
    fn default() -> Self { Self { interval: Duration::from_secs(1), max_interval: Duration::from_secs(1), multiplier: 1.0, jitter: 0.0 } }
}

/// Serialized form, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub interval_ms: u64,
    pub max_interval_ms: u64,
    pub multiplier: f64,
    pub jitter: f64,
}

impl Default for PollSettings {
    fn default() -> Self { Self { interval_ms: 1000, max_interval_ms: 1000, multiplier: 1.0, jitter: 0.0 } }
}

impl PollSettings {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.interval_ms == 0 { anyhow::bail!("poll.interval_ms must be greater than zero"); }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            anyhow::bail!("poll.multiplier must be a finite value >= 1.0, got {}", self.multiplier);
        }
        if !(0.0..=1.0).contains(&self.jitter) { anyhow::bail!("poll.jitter must be within [0, 1], got {}", self.jitter); }
        Ok(())
    }
}

impl From<&PollSettings> for PollPolicy {
    fn from(s: &PollSettings) -> Self {
        Self {
            interval: Duration::from_millis(s.interval_ms),
            max_interval: Duration::from_millis(s.max_interval_ms.max(s.interval_ms)),
            multiplier: s.multiplier,
            jitter: s.jitter,
        }
    }
}

impl PollPolicy {
    pub fn fixed(interval: Duration) -> Self { Self { interval, max_interval: interval, ..Self::default() } }

    /// Delay before check `attempt + 1`, clamped to `remaining`.
    pub fn delay(&self, attempt: u32, remaining: Duration) -> Duration {
        let cap = std::cmp::max(self.max_interval, self.interval);
        // grow in f64 seconds; Duration::mul_f64 panics on overflow
        let secs = self.interval.as_secs_f64() * self.multiplier.powi(attempt.min(63) as i32);
        let mut delay = if secs.is_finite() && secs < cap.as_secs_f64() { Duration::from_secs_f64(secs) } else { cap };
        if self.jitter > 0.0 {
            let jitter_ms = (delay.as_millis() as f64 * self.jitter) as i64;
            let offset: i64 = thread_rng().gen_range(-jitter_ms..=jitter_ms);
            delay = Duration::from_millis((delay.as_millis() as i64 + offset).max(1) as u64);
        }
        std::cmp::min(delay, remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_fixed_one_second() {
        let p = PollPolicy::default();
        for attempt in 0..5 { assert_eq!(p.delay(attempt, Duration::from_secs(60)), Duration::from_secs(1)); }
    }

    #[test]
    fn backoff_grows_then_caps() {
        let p = PollPolicy { interval: Duration::from_millis(100), max_interval: Duration::from_millis(350), multiplier: 2.0, jitter: 0.0 };
        let got: Vec<u128> = (0..4).map(|a| p.delay(a, Duration::from_secs(10)).as_millis()).collect();
        assert_eq!(got, vec![100, 200, 350, 350]);
    }

    #[test]
    fn steep_backoff_saturates_at_cap() {
        let p = PollPolicy { interval: Duration::from_secs(1), max_interval: Duration::from_secs(30), multiplier: 10.0, jitter: 0.0 };
        for attempt in 0..200 {
            assert!(p.delay(attempt, Duration::from_secs(3600)) <= Duration::from_secs(30));
        }
        assert_eq!(p.delay(199, Duration::from_secs(3600)), Duration::from_secs(30));
        let unbounded = PollPolicy { multiplier: f64::INFINITY, ..p };
        assert_eq!(unbounded.delay(5, Duration::from_secs(3600)), Duration::from_secs(30));
    }

    #[test]
    fn delay_never_passes_deadline() {
        let p = PollPolicy::default();
        assert_eq!(p.delay(0, Duration::from_millis(250)), Duration::from_millis(250));
    }

    #[test]
    fn jitter_stays_in_band() {
        let p = PollPolicy { jitter: 0.5, ..PollPolicy::fixed(Duration::from_millis(1000)) };
        for _ in 0..50 {
            let d = p.delay(0, Duration::from_secs(10)).as_millis();
            assert!((500..=1500).contains(&d), "{d}");
        }
    }

    #[test]
    fn settings_validation() {
        assert!(PollSettings::default().validate().is_ok());
        assert!(PollSettings { interval_ms: 0, ..Default::default() }.validate().is_err());
        assert!(PollSettings { multiplier: 0.5, ..Default::default() }.validate().is_err());
        assert!(PollSettings { multiplier: f64::INFINITY, ..Default::default() }.validate().is_err());
        assert!(PollSettings { multiplier: f64::NAN, ..Default::default() }.validate().is_err());
        assert!(PollSettings { jitter: 1.5, ..Default::default() }.validate().is_err());
        let p = PollPolicy::from(&PollSettings { interval_ms: 2000, max_interval_ms: 500, ..Default::default() });
        assert_eq!(p.max_interval, Duration::from_secs(2));
    }
}
