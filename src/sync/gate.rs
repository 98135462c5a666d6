// Clamp, dedupe and rate-limit decisions for incoming position signals

use std::time::Duration;

use tokio::time::Instant;

use super::RejectReason;
use crate::domain::models::{Percent, PositionSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Smallest change, in whole percent, worth acting on
    pub min_change: u8,
    /// Minimum spacing between two store writes
    pub min_interval: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            min_change: 1,
            min_interval: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Rejected(RejectReason),
    /// Show the value but skip the store write
    Display(Percent),
    Persist(Percent),
}

#[derive(Debug)]
pub struct SignalGate {
    settings: SyncSettings,
    last_accepted: Percent,
    last_persisted_at: Option<Instant>,
}

impl SignalGate {
    pub fn new(settings: SyncSettings) -> Self {
        Self {
            settings,
            last_accepted: Percent::ZERO,
            last_persisted_at: None,
        }
    }

    /// Start over from a freshly loaded value. The next qualifying signal is written immediately.
    pub fn reset(&mut self, initial: Percent) {
        self.last_accepted = initial;
        self.last_persisted_at = None;
    }

    pub fn last_accepted(&self) -> Percent {
        self.last_accepted
    }

    pub fn evaluate(&mut self, signal: &PositionSignal, now: Instant) -> GateDecision {
        let Some(percent) = signal.value().and_then(Percent::from_raw) else {
            return GateDecision::Rejected(RejectReason::NotNumeric);
        };
        // A repeated position is never a change, whatever the configured step
        if percent.abs_diff(self.last_accepted) < self.settings.min_change.max(1) {
            return GateDecision::Rejected(RejectReason::BelowThreshold);
        }
        self.last_accepted = percent;

        match self.last_persisted_at {
            Some(at) if now.saturating_duration_since(at) < self.settings.min_interval => {
                GateDecision::Display(percent)
            }
            _ => {
                self.last_persisted_at = Some(now);
                GateDecision::Persist(percent)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(v: u8) -> Percent {
        Percent::new(v).unwrap()
    }

    #[test]
    fn non_numeric_signals_change_nothing() {
        let mut gate = SignalGate::new(SyncSettings::default());
        let now = Instant::now();
        for raw in [PositionSignal::from(f64::NAN), PositionSignal::from("abc")] {
            assert_eq!(
                gate.evaluate(&raw, now),
                GateDecision::Rejected(RejectReason::NotNumeric)
            );
        }
        assert_eq!(gate.last_accepted(), Percent::ZERO);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let mut gate = SignalGate::new(SyncSettings::default());
        let t0 = Instant::now();
        gate.reset(pct(50));
        assert_eq!(
            gate.evaluate(&PositionSignal::from(150.0), t0),
            GateDecision::Persist(Percent::FULL)
        );
        assert_eq!(
            gate.evaluate(&PositionSignal::from(-5.0), t0 + Duration::from_secs(2)),
            GateDecision::Persist(Percent::ZERO)
        );
    }

    #[test]
    fn repeated_value_is_noise() {
        let mut gate = SignalGate::new(SyncSettings::default());
        let t0 = Instant::now();
        assert_eq!(gate.evaluate(&40.0.into(), t0), GateDecision::Persist(pct(40)));
        assert_eq!(
            gate.evaluate(&40.0.into(), t0 + Duration::from_secs(5)),
            GateDecision::Rejected(RejectReason::BelowThreshold)
        );
        assert_eq!(
            gate.evaluate(&41.0.into(), t0 + Duration::from_secs(10)),
            GateDecision::Persist(pct(41))
        );
    }

    #[test]
    fn zero_threshold_still_drops_repeats() {
        let mut gate = SignalGate::new(SyncSettings {
            min_change: 0,
            ..SyncSettings::default()
        });
        let t0 = Instant::now();
        gate.reset(pct(40));
        assert_eq!(
            gate.evaluate(&40.0.into(), t0),
            GateDecision::Rejected(RejectReason::BelowThreshold)
        );
        assert_eq!(gate.evaluate(&41.0.into(), t0), GateDecision::Persist(pct(41)));
    }

    #[test]
    fn larger_threshold_swallows_small_steps() {
        let mut gate = SignalGate::new(SyncSettings {
            min_change: 2,
            ..SyncSettings::default()
        });
        let t0 = Instant::now();
        gate.reset(pct(40));
        for (i, raw) in [40.0, 40.0, 41.0].into_iter().enumerate() {
            let at = t0 + Duration::from_secs(2 * i as u64);
            assert_eq!(
                gate.evaluate(&raw.into(), at),
                GateDecision::Rejected(RejectReason::BelowThreshold)
            );
        }
        assert_eq!(gate.last_accepted(), pct(40));
    }

    #[test]
    fn writes_are_spaced_by_min_interval() {
        let mut gate = SignalGate::new(SyncSettings::default());
        let t0 = Instant::now();
        assert_eq!(gate.evaluate(&30.0.into(), t0), GateDecision::Persist(pct(30)));
        assert_eq!(
            gate.evaluate(&35.0.into(), t0 + Duration::from_millis(500)),
            GateDecision::Display(pct(35))
        );
        // Interval counts from the last write, not the last signal
        assert_eq!(
            gate.evaluate(&40.0.into(), t0 + Duration::from_millis(1000)),
            GateDecision::Persist(pct(40))
        );
        assert_eq!(
            gate.evaluate(&45.0.into(), t0 + Duration::from_millis(2500)),
            GateDecision::Persist(pct(45))
        );
    }
}
