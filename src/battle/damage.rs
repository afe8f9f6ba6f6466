//! Damage resolution: one attacker-vs-defender exchange as an async sequence
//!
//! Order is fixed: attacker feedback, damage application, defender feedback.
//! The steps are not atomic with respect to outside observers; a subscriber
//! can read the defender's health as already decremented before the damage
//! feedback has started.

use crate::battle::events::{BattleEvent, BattleEventSender};
use crate::battle::unit::Combatant;

pub struct BattleDamageSystem {
    events: BattleEventSender,
}

impl BattleDamageSystem {
    pub fn new(events: BattleEventSender) -> Self {
        Self { events }
    }

    /// Resolve one exchange. A missing actor or target makes the whole call
    /// a no-op; a missing animation capability skips that step only.
    pub async fn resolve_damage(&self, actor: Option<&Combatant>, target: Option<&Combatant>) {
        let (Some(actor), Some(target)) = (actor, target) else {
            return;
        };

        actor.animation.play_attack().await;

        let amount = actor.unit.with(|u| u.damage());
        let remaining = target.unit.update(|u| {
            u.apply_damage(amount);
            u.current_health()
        });

        tracing::debug!(
            actor = ?actor.id(),
            target = ?target.id(),
            amount,
            remaining,
            "damage applied"
        );
        let _ = self.events.send(BattleEvent::DamageApplied {
            actor: actor.id(),
            target: target.id(),
            amount,
            remaining,
        });

        target.animation.play_damage().await;
    }
}
