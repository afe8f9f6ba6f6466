//! Battle pacing configuration with documented constants
//!
//! All timing magic numbers are collected here with explanations of their
//! purpose and how they interact with each other.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;

/// Configuration for battle pacing
///
/// These values have been tuned against the reference encounter feel.
/// Changing them affects how long turns take, not what they do.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Longest a turn may sit in the wait-for-action state (milliseconds)
    ///
    /// The active unit's action controller is the authoritative source of
    /// turn end; this bound forfeits the turn if the controller never
    /// resolves (e.g. the player walks away).
    pub turn_timeout_ms: u64,

    /// Shortest simulated "thinking" delay for enemy-controlled units
    /// (milliseconds)
    pub enemy_think_min_ms: u64,

    /// Longest simulated "thinking" delay for enemy-controlled units
    /// (milliseconds)
    ///
    /// The actual delay is drawn uniformly from
    /// [enemy_think_min_ms, enemy_think_max_ms] each turn.
    pub enemy_think_max_ms: u64,

    /// Capacity of the battle event broadcast channel
    ///
    /// Slow subscribers past this many buffered events start lagging
    /// (they miss events, the machine never blocks on them).
    pub event_capacity: usize,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            turn_timeout_ms: 3_000,
            enemy_think_min_ms: 1_000,
            enemy_think_max_ms: 3_000,
            event_capacity: 64,
        }
    }
}

impl BattleConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a config from a TOML file; missing keys fall back to defaults
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.turn_timeout_ms == 0 {
            return Err("turn_timeout_ms must be positive".into());
        }

        if self.enemy_think_min_ms > self.enemy_think_max_ms {
            return Err(format!(
                "enemy_think_min_ms ({}) should be <= enemy_think_max_ms ({})",
                self.enemy_think_min_ms, self.enemy_think_max_ms
            ));
        }

        if self.event_capacity == 0 {
            return Err("event_capacity must be positive".into());
        }

        Ok(())
    }

    pub fn turn_timeout(&self) -> Duration {
        Duration::from_millis(self.turn_timeout_ms)
    }

    pub fn enemy_think_range(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.enemy_think_min_ms),
            Duration::from_millis(self.enemy_think_max_ms),
        )
    }
}
