//! Battle notifications published to external observers
//!
//! The channel is an explicit pub/sub registry handed to constructors; the
//! machine publishes synchronously from within trigger processing and never
//! blocks on subscribers. Subscription lifetime is the receiver's lifetime.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::battle::state::BattleState;
use crate::core::types::{Round, UnitId};

/// Result of an encounter, from the player side's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BattleOutcome {
    /// The session finished without the battle being decided
    /// (e.g. an externally fired finish)
    #[default]
    Undecided,
    Victory,
    Defeat,
}

/// Notifications emitted by a battle session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleEvent {
    /// Published for every committed transition, in commit order
    StateChanged { from: BattleState, to: BattleState },
    RoundStarted { round: Round },
    TurnStarted { unit: UnitId, round: Round },
    DamageApplied {
        actor: UnitId,
        target: UnitId,
        amount: i32,
        remaining: i32,
    },
    UnitDefeated { unit: UnitId },
    Finished { outcome: BattleOutcome },
}

pub type BattleEventSender = broadcast::Sender<BattleEvent>;
pub type BattleEventReceiver = broadcast::Receiver<BattleEvent>;

/// Create the pub/sub channel a session publishes through
pub fn battle_channel(capacity: usize) -> (BattleEventSender, BattleEventReceiver) {
    broadcast::channel(capacity)
}
