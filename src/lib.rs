//! Brickfall - brick-breaker combat simulation with RPG equipment
//!
//! Core modules:
//! - `sim`: Deterministic simulation (board, collisions, damage, events)
//! - `settings`: Run settings and sanity bounds
//! - `tuning`: Data-driven ball balance table

pub mod settings;
pub mod sim;
pub mod tuning;

pub use settings::{Settings, SettingsError};
pub use tuning::{BallKind, BallStats, Tuning};

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    /// Simulation ticks per second
    pub const SIM_HZ: u32 = 60;
    /// Ticks executed per rendered frame when speed-up is on
    pub const SPEED_UP_TICKS: u32 = 2;

    /// Sub-step length as a fraction of entity radius
    pub const SUBSTEP_RADIUS_FACTOR: f32 = 0.8;
    /// Hard cap on sub-steps per entity per tick
    pub const MAX_SUBSTEPS: u32 = 256;

    /// Ticks a brick stays immune to the same entity after a damaging hit
    pub const BRICK_HIT_COOLDOWN_TICKS: u32 = 3;

    /// Ball radius as a fraction of cell size (before kind/area scaling)
    pub const BALL_RADIUS_FACTOR: f32 = 0.3;
    /// Non-giant radius may exceed half a cell by this factor at most
    pub const RADIUS_TOLERANCE: f32 = 1.1;
    /// Mini-ball radius as a fraction of cell size
    pub const MINI_RADIUS_FACTOR: f32 = 0.15;
    /// Projectile radius as a fraction of cell size
    pub const PROJECTILE_RADIUS_FACTOR: f32 = 0.1;

    /// Base damage used when a ball kind has no entry in the tuning table
    pub const DEFAULT_BASE_DAMAGE: f32 = 10.0;

    /// Giant balls lose 1 HP per this much damage dealt
    pub const GIANT_DAMAGE_PER_HP: u32 = 100;

    /// Maximum burn stacks on a single ball
    pub const MAX_BURN_STACKS: u32 = 10;
    /// Ticks a burn stack survives without being refreshed
    pub const BURN_DECAY_TICKS: u32 = 120;

    /// Spinning spike angular speed (radians per tick)
    pub const SPIKE_SPIN_PER_TICK: f32 = 0.12;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Unit vector for an angle in radians
#[inline]
pub fn direction(theta: f32) -> Vec2 {
    Vec2::new(theta.cos(), theta.sin())
}

/// Angle of a vector in radians
#[inline]
pub fn heading(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_normalize_angle_wraps() {
        assert!((normalize_angle(5.0 * PI / 2.0) - PI / 2.0).abs() < 0.0001);
        assert!((normalize_angle(-3.0 * PI / 2.0) - PI / 2.0).abs() < 0.0001);
        assert!((normalize_angle(0.25) - 0.25).abs() < 0.0001);

        // Odd multiples of PI land on either end of the range in f32
        for angle in [3.0 * PI, -3.0 * PI, 7.0 * PI, -PI] {
            let wrapped = normalize_angle(angle);
            assert!((-PI..=PI).contains(&wrapped), "{} -> {}", angle, wrapped);
            assert!((wrapped.cos() - angle.cos()).abs() < 0.0001);
            assert!((wrapped.sin() - angle.sin()).abs() < 0.0001);
        }
    }

    #[test]
    fn test_direction_heading_agree() {
        let theta = 1.1;
        assert!((heading(direction(theta)) - theta).abs() < 0.0001);
    }
}
