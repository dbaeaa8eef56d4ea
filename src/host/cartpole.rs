//! Reference cart-pole host.
//!
//! Classic cart-pole dynamics integrated with explicit Euler steps. The
//! network's single output (a sigmoid in `(0, 1)`) maps to a push
//! `2 * out - 1` in `[-1, 1]`, scaled by the configured force.

use crate::host::{Habitat, SimulationUnit, Telemetry};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Physical constants and episode limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CartPoleConfig {
    /// Gravitational acceleration (m/s²).
    pub gravity: f64,
    /// Cart mass (kg).
    pub cart_mass: f64,
    /// Pole mass (kg).
    pub pole_mass: f64,
    /// Half the pole length (m).
    pub pole_half_length: f64,
    /// Force applied for a full push (N).
    pub force: f64,
    /// Integration step (s).
    pub time_step: f64,
    /// The cart dies when `|x|` exceeds this (m).
    pub track_limit: f64,
    /// The pole has fallen once `|angle|` exceeds this (degrees).
    pub max_angle: f64,
    /// Initial angle is drawn from `[-initial_angle, initial_angle]` (degrees).
    pub initial_angle: f64,
    /// Episode length cap.
    pub max_ticks: u64,
}

impl Default for CartPoleConfig {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            cart_mass: 1.0,
            pole_mass: 0.1,
            pole_half_length: 0.5,
            force: 10.0,
            time_step: 0.02,
            track_limit: 2.4,
            max_angle: 90.0,
            initial_angle: 5.0,
            max_ticks: 1000,
        }
    }
}

/// One cart with a hinged pole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartPole {
    config: CartPoleConfig,
    x: f64,
    velocity: f64,
    theta: f64,
    angular_velocity: f64,
    start_x: f64,
    bias: f64,
    ticks: u64,
}

impl CartPole {
    /// A cart at rest at the origin with the pole at `angle` degrees.
    #[must_use]
    pub fn new(config: CartPoleConfig, angle: f64, bias: f64) -> Self {
        Self {
            config,
            x: 0.0,
            velocity: 0.0,
            theta: angle.to_radians(),
            angular_velocity: 0.0,
            start_x: 0.0,
            bias,
            ticks: 0,
        }
    }

    /// Pole angle from upright, in degrees.
    #[must_use]
    pub fn angle(&self) -> f64 {
        self.theta.to_degrees()
    }

    /// Cart position.
    #[must_use]
    pub fn position(&self) -> f64 {
        self.x
    }

    /// Ticks simulated so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advance one Euler step with `push` in `[-1, 1]`.
    pub fn step(&mut self, push: f64) {
        let c = &self.config;
        let force = push.clamp(-1.0, 1.0) * c.force;
        let total_mass = c.cart_mass + c.pole_mass;
        let pole_moment = c.pole_mass * c.pole_half_length;
        let (sin, cos) = self.theta.sin_cos();

        let temp = (force + pole_moment * self.angular_velocity.powi(2) * sin) / total_mass;
        let angular_acc = (c.gravity * sin - cos * temp)
            / (c.pole_half_length * (4.0 / 3.0 - c.pole_mass * cos * cos / total_mass));
        let acc = temp - pole_moment * angular_acc * cos / total_mass;

        self.x += c.time_step * self.velocity;
        self.velocity += c.time_step * acc;
        self.theta += c.time_step * self.angular_velocity;
        self.angular_velocity += c.time_step * angular_acc;
        self.ticks += 1;
    }
}

impl SimulationUnit for CartPole {
    /// `[angle°, angular velocity °/s, x, velocity, bias]`.
    fn sense(&self) -> Vec<f64> {
        vec![
            self.angle(),
            self.angular_velocity.to_degrees(),
            self.x,
            self.velocity,
            self.bias,
        ]
    }

    fn actuate(&mut self, outputs: &[f64]) -> Telemetry {
        let out = outputs.first().copied().unwrap_or(0.5);
        let push = (out * 2.0 - 1.0).clamp(-1.0, 1.0);
        self.step(push);
        Telemetry {
            angle: self.angle(),
            displacement: self.x - self.start_x,
            movement: push.abs(),
        }
    }

    fn death(&self) -> Option<f64> {
        let fallen = self.angle().abs() > self.config.max_angle;
        let off_track = self.x.abs() > self.config.track_limit;
        let timed_out = self.ticks >= self.config.max_ticks;
        (fallen || off_track || timed_out).then_some(0.0)
    }
}

/// Spawns cart-poles sharing one random bias per generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartPoleHabitat {
    config: CartPoleConfig,
    bias: f64,
}

impl CartPoleHabitat {
    /// Habitat with the given physics.
    #[must_use]
    pub fn new(config: CartPoleConfig) -> Self {
        Self { config, bias: 0.0 }
    }

    /// Physics and limits used for every unit.
    #[must_use]
    pub fn config(&self) -> &CartPoleConfig {
        &self.config
    }

    /// Bias sensor value of the current generation.
    #[must_use]
    pub fn bias(&self) -> f64 {
        self.bias
    }
}

impl Default for CartPoleHabitat {
    fn default() -> Self {
        Self::new(CartPoleConfig::default())
    }
}

impl Habitat for CartPoleHabitat {
    type Unit = CartPole;

    fn begin_generation<R: Rng>(&mut self, _generation: u32, rng: &mut R) {
        self.bias = rng.gen_range(-1.0..=1.0);
    }

    fn spawn<R: Rng>(&mut self, _slot: usize, rng: &mut R) -> CartPole {
        let limit = self.config.initial_angle.abs();
        let angle = rng.gen_range(-limit..=limit);
        CartPole::new(self.config, angle, self.bias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn test_balanced_pole_survives_to_tick_limit() {
        let config = CartPoleConfig {
            max_ticks: 200,
            ..CartPoleConfig::default()
        };
        let mut cart = CartPole::new(config, 0.0, 0.0);

        let mut ticks = 0;
        while cart.death().is_none() {
            let t = cart.actuate(&[0.5]);
            assert!(t.angle.abs() < 1e-12);
            assert!(t.movement.abs() < 1e-12);
            ticks += 1;
        }

        assert_eq!(ticks, 200);
        assert_eq!(cart.death(), Some(0.0));
    }

    #[test]
    fn test_tilted_pole_falls() {
        let mut cart = CartPole::new(CartPoleConfig::default(), 10.0, 0.0);
        let mut last = cart.angle();
        while cart.death().is_none() {
            cart.actuate(&[0.5]);
            assert!(cart.angle() >= last);
            last = cart.angle();
        }
        assert!(cart.angle() > 90.0);
        assert!(cart.ticks() < CartPoleConfig::default().max_ticks);
    }

    #[test]
    fn test_full_push_moves_cart_right() {
        let mut cart = CartPole::new(CartPoleConfig::default(), 0.0, 0.0);
        let t = cart.actuate(&[1.0]);
        assert!((t.movement - 1.0).abs() < 1e-12);
        cart.actuate(&[1.0]);
        assert!(cart.position() > 0.0);
        // Pushing the cart right tips the pole left.
        assert!(cart.angle() < 0.0);
    }

    #[test]
    fn test_leaving_track_is_death() {
        let config = CartPoleConfig {
            track_limit: 0.01,
            max_angle: 180.0,
            ..CartPoleConfig::default()
        };
        let mut cart = CartPole::new(config, 0.0, 0.0);
        while cart.death().is_none() {
            cart.actuate(&[1.0]);
        }
        assert!(cart.position() > 0.01);
        assert!(cart.ticks() < config.max_ticks);
    }

    #[test]
    fn test_sense_layout() {
        let cart = CartPole::new(CartPoleConfig::default(), 3.0, -0.25);
        let s = cart.sense();
        assert_eq!(s.len(), 5);
        assert!((s[0] - 3.0).abs() < 1e-9);
        assert!((s[4] + 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_habitat_spawn_ranges() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut habitat = CartPoleHabitat::default();
        habitat.begin_generation(0, &mut rng);
        let bias = habitat.bias();
        assert!((-1.0..=1.0).contains(&bias));

        for slot in 0..50 {
            let cart = habitat.spawn(slot, &mut rng);
            assert!(cart.angle().abs() <= 5.0 + 1e-9);
            assert!((cart.sense()[4] - bias).abs() < f64::EPSILON);
        }
    }
}
