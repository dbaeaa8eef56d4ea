//! Fitness accounting for cart-pole controllers.
//!
//! While a specimen is alive the host feeds per-tick telemetry into its
//! [`FitnessTracker`]. When the host reports death, the tracker turns the
//! accumulated counters into a single score with [`FitnessTracker::score`].

// Tick counts are converted to floats for averaging
#![allow(clippy::cast_precision_loss)]

use serde::{Deserialize, Serialize};

/// Weights of the death-time fitness formula.
///
/// ```text
/// straightness = clamp(1 - mean(|angle|) / 180, 0, 1)
/// fitness = ticks * time_weight * straightness
///         - drift_weight * max_drift
///         - (movement < idle_threshold ? idle_penalty : 0)
///         + bonus
/// ```
///
/// A specimen that dies before its first tick scores exactly zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessConfig {
    /// Reward per tick survived, scaled by straightness.
    pub time_weight: f64,
    /// Penalty per unit of the furthest distance from the start position.
    pub drift_weight: f64,
    /// Accumulated movement below this counts as standing still.
    pub idle_threshold: f64,
    /// Subtracted once at death when the specimen stood still.
    pub idle_penalty: f64,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            time_weight: 0.01,
            drift_weight: 0.05,
            idle_threshold: 1.0,
            idle_penalty: 1.0,
        }
    }
}

/// Per-specimen counters accumulated while it is alive.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FitnessTracker {
    ticks: u64,
    angle_abs_sum: f64,
    movement: f64,
    max_drift: f64,
}

impl FitnessTracker {
    /// Count one simulation tick.
    pub fn tick(&mut self) {
        self.ticks += 1;
    }

    /// Record the pole's deviation from upright, in degrees.
    pub fn record_angle(&mut self, degrees: f64) {
        self.angle_abs_sum += degrees.abs();
    }

    /// Record the cart's signed displacement from its start position.
    pub fn record_displacement(&mut self, displacement: f64) {
        self.max_drift = self.max_drift.max(displacement.abs());
    }

    /// Record the magnitude of one actuator command.
    pub fn record_movement(&mut self, amount: f64) {
        self.movement += amount.abs();
    }

    /// Ticks survived so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Total actuator effort so far.
    #[must_use]
    pub fn movement(&self) -> f64 {
        self.movement
    }

    /// Furthest distance from the start position so far.
    #[must_use]
    pub fn max_drift(&self) -> f64 {
        self.max_drift
    }

    /// `1 - mean(|angle|) / 180`, in `[0, 1]`; 1 means always upright.
    #[must_use]
    pub fn straightness(&self) -> f64 {
        if self.ticks == 0 {
            return 1.0;
        }
        let mean = self.angle_abs_sum / self.ticks as f64;
        (1.0 - mean / 180.0).clamp(0.0, 1.0)
    }

    /// Final fitness at death, including the host's bonus.
    #[must_use]
    pub fn score(&self, config: &FitnessConfig, bonus: f64) -> f64 {
        if self.ticks == 0 {
            return 0.0;
        }

        let survival = self.ticks as f64 * config.time_weight * self.straightness();
        let drift = config.drift_weight * self.max_drift;
        let idle = if self.movement < config.idle_threshold {
            config.idle_penalty
        } else {
            0.0
        };

        survival - drift - idle + bonus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(ticks: u64, angle: f64, movement: f64, drift: f64) -> FitnessTracker {
        let mut t = FitnessTracker::default();
        for _ in 0..ticks {
            t.tick();
            t.record_angle(angle);
            t.record_movement(movement);
        }
        t.record_displacement(drift);
        t
    }

    #[test]
    fn test_zero_ticks_score_zero() {
        let t = FitnessTracker::default();
        assert!(t.score(&FitnessConfig::default(), 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_upright_survival() {
        let config = FitnessConfig::default();
        let t = tracker(500, 0.0, 0.5, 0.0);
        assert!((t.straightness() - 1.0).abs() < 1e-12);
        assert!((t.score(&config, 0.0) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_straightness_uses_absolute_angles() {
        let mut t = FitnessTracker::default();
        for angle in [90.0, -90.0] {
            t.tick();
            t.record_angle(angle);
        }
        assert!((t.straightness() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_idle_penalty() {
        let config = FitnessConfig::default();
        let still = tracker(100, 0.0, 0.0, 0.0);
        let moving = tracker(100, 0.0, 0.1, 0.0);
        let diff = moving.score(&config, 0.0) - still.score(&config, 0.0);
        assert!((diff - config.idle_penalty).abs() < 1e-9);
    }

    #[test]
    fn test_drift_penalty_uses_furthest_distance() {
        let config = FitnessConfig::default();
        let mut t = tracker(100, 0.0, 1.0, 0.0);
        t.record_displacement(-4.0);
        t.record_displacement(1.0);
        assert!((t.max_drift() - 4.0).abs() < f64::EPSILON);
        let expected = 1.0 - config.drift_weight * 4.0;
        assert!((t.score(&config, 0.0) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_bonus_is_added() {
        let config = FitnessConfig::default();
        let t = tracker(100, 0.0, 1.0, 0.0);
        assert!((t.score(&config, 2.5) - t.score(&config, 0.0) - 2.5).abs() < 1e-9);
    }
}
