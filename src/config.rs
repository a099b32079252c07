//! Simulation parameters.
//!
//! Everything here is plain numbers; [`SimulationConfig::from_ron_str`] accepts the
//! same structure written as RON, with missing fields falling back to the defaults.

use crate::color::Color;
use glam::{DVec2, IVec2};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a world and the actors it hosts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Tiles from the origin to the floor edge, per axis.
    pub half_size: IVec2,
    /// World-space size of a single tile.
    pub tile_size: DVec2,
    /// Color the floor is cleared to.
    pub clear_color: Color,
    /// Actor configuration shared by every spawned actor.
    pub actor: ActorConfig,
    /// Wall-clock time between simulation ticks.
    pub tick_interval_ms: u64,
    /// Simulated steps advanced per tick.
    pub steps_per_tick: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            half_size: IVec2::new(50, 50),
            tile_size: DVec2::ONE,
            clear_color: Color::WHITE,
            actor: ActorConfig::default(),
            tick_interval_ms: 40,
            steps_per_tick: 1,
        }
    }
}

impl SimulationConfig {
    /// Parses a RON document; absent fields keep their defaults.
    pub fn from_ron_str(source: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(source)
    }

    /// Wall-clock time between ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Per-actor motion and sensing parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Distance covered per step.
    pub linear_speed: f64,
    /// Turns covered per step.
    pub rotation_speed: f64,
    /// Physical radius, kept as a margin from the world walls.
    pub radius: f64,
    /// Half-width of the tile sensor square.
    pub sensor_radius: i32,
    /// Speed of the cosmetic hat color cycle.
    pub cycle_speed: f64,
    /// Initial pen color.
    pub pen_color: Color,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            linear_speed: 0.1,
            rotation_speed: 0.1,
            radius: 0.5,
            sensor_radius: 1,
            cycle_speed: 25.0,
            pen_color: Color::WHITE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_ron_keeps_defaults() {
        let config = SimulationConfig::from_ron_str("(half_size: (5, 5), actor: (linear_speed: 0.5))")
            .expect("valid config");
        assert_eq!(config.half_size, IVec2::new(5, 5));
        assert_eq!(config.actor.linear_speed, 0.5);
        assert_eq!(config.actor.rotation_speed, 0.1);
        assert_eq!(config.tick_interval(), Duration::from_millis(40));
    }
}
