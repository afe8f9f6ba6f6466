//! Enemy spawning for dungeon encounters
//!
//! Picks a random template and assembles a fully-capable enemy combatant:
//! stats, enemy action control with the configured think delay, and timed
//! damage feedback.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::actions::{ActionController, EnemyActionController};
use crate::battle::animation::{AnimationController, TimedAnimation};
use crate::battle::unit::{Combatant, UnitHandle, UnitModel};
use crate::core::config::BattleConfig;
use crate::core::types::Side;

/// Blueprint for one enemy kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyTemplate {
    pub name: String,
    pub health: i32,
    pub damage: i32,
    #[serde(default)]
    pub description: String,
}

pub struct EnemyGenerator {
    config: BattleConfig,
}

impl EnemyGenerator {
    pub fn new(config: &BattleConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Spawn one enemy from a random template, or `None` when there is
    /// nothing to pick from
    pub fn spawn(&self, templates: &[EnemyTemplate]) -> Option<Combatant> {
        if templates.is_empty() {
            tracing::warn!("no enemy templates provided");
            return None;
        }

        let template = &templates[rand::thread_rng().gen_range(0..templates.len())];
        let unit = UnitModel::new(&template.name, template.health, template.damage)
            .with_description(&template.description);
        tracing::info!(name = %template.name, "enemy spawned");

        Some(Combatant::new(
            UnitHandle::new(unit),
            Side::Enemy,
            ActionController::Enemy(EnemyActionController::from_config(&self.config)),
            AnimationController::Timed(TimedAnimation::default()),
        ))
    }
}
