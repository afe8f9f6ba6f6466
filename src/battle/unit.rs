//! Combat unit stats and the shared handles the battle subsystem passes around
//!
//! A `UnitModel` is the mutable stat block for one combatant. The battle
//! orchestration never owns unit lifetime; it reads and mutates stats through
//! cloned `UnitHandle`s while an external spawner decides when units exist.
//! Capabilities (action control, animation feedback) are resolved once at
//! `Combatant` construction, not looked up ad hoc.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::battle::actions::ActionController;
use crate::battle::animation::AnimationController;
use crate::battle::queue::QueueEntry;
use crate::core::types::{Side, UnitId};

/// Mutable combat statistics for one combatant
///
/// Invariants: `max_health` and `damage` never drop below 1,
/// `current_health` stays in `[0, max_health]`. A unit at 0 current health
/// is defeated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitModel {
    id: UnitId,
    name: String,
    max_health: i32,
    current_health: i32,
    damage: i32,
    description: String,
    level: u32,
    experience: u32,
}

impl UnitModel {
    /// Create a unit at full health; health and damage are floored at 1
    pub fn new(name: impl Into<String>, health: i32, damage: i32) -> Self {
        let max_health = health.max(1);
        Self {
            id: UnitId::new(),
            name: name.into(),
            max_health,
            current_health: max_health,
            damage: damage.max(1),
            description: String::new(),
            level: 1,
            experience: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Design-time maximum health (the queue sorts on this)
    pub fn max_health(&self) -> i32 {
        self.max_health
    }

    pub fn current_health(&self) -> i32 {
        self.current_health
    }

    pub fn damage(&self) -> i32 {
        self.damage
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn experience(&self) -> u32 {
        self.experience
    }

    pub fn is_defeated(&self) -> bool {
        self.current_health == 0
    }

    /// Set maximum health (floored at 1) and re-clamp current health into
    /// the new range
    pub fn set_health(&mut self, health: i32) {
        self.max_health = health.max(1);
        self.current_health = self.current_health.clamp(0, self.max_health);
    }

    /// Set attack damage, floored at 1
    pub fn set_damage(&mut self, damage: i32) {
        self.damage = damage.max(1);
    }

    /// Reduce current health, floored at 0; negative amounts are ignored
    pub fn apply_damage(&mut self, amount: i32) {
        self.current_health = (self.current_health - amount.max(0)).max(0);
    }
}

/// Shared, clonable access to one unit's stats
///
/// All battle mutation happens on one logical thread, but the handle still
/// serializes access per unit so the orchestration can be driven from any
/// runtime. Locks are never held across a suspension point.
#[derive(Debug, Clone)]
pub struct UnitHandle {
    id: UnitId,
    model: Arc<Mutex<UnitModel>>,
}

impl UnitHandle {
    pub fn new(model: UnitModel) -> Self {
        Self {
            id: model.id(),
            model: Arc::new(Mutex::new(model)),
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Read stats through a closure
    pub fn with<R>(&self, f: impl FnOnce(&UnitModel) -> R) -> R {
        f(&self.lock())
    }

    /// Mutate stats through a closure
    pub fn update<R>(&self, f: impl FnOnce(&mut UnitModel) -> R) -> R {
        f(&mut self.lock())
    }

    /// Owned copy of the current stats, for UIs and logs
    pub fn snapshot(&self) -> UnitModel {
        self.with(UnitModel::clone)
    }

    fn lock(&self) -> MutexGuard<'_, UnitModel> {
        // a poisoned lock still holds valid stats; clamping keeps them sane
        self.model.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One participant in an encounter: stats plus the capabilities resolved at
/// construction time
pub struct Combatant {
    pub unit: UnitHandle,
    pub side: Side,
    pub controller: ActionController,
    pub animation: AnimationController,
}

impl Combatant {
    pub fn new(
        unit: UnitHandle,
        side: Side,
        controller: ActionController,
        animation: AnimationController,
    ) -> Self {
        Self {
            unit,
            side,
            controller,
            animation,
        }
    }

    pub fn id(&self) -> UnitId {
        self.unit.id()
    }

    pub fn is_defeated(&self) -> bool {
        self.unit.with(UnitModel::is_defeated)
    }

    pub fn queue_entry(&self) -> QueueEntry {
        QueueEntry {
            id: self.unit.id(),
            unit: self.unit.clone(),
        }
    }
}
