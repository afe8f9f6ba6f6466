//! Battle system - turn-based encounters with asynchronous action resolution
//!
//! The state machine drives a fixed phase loop per round and turn; the round
//! queue fixes acting order at round start; action controllers decide when a
//! turn's action happens (player input or simulated enemy thinking); the
//! damage system resolves one exchange at a time, bracketed by cosmetic
//! feedback. Observers subscribe to a broadcast channel passed in at
//! construction.

pub mod actions;
pub mod animation;
pub mod damage;
pub mod events;
pub mod machine;
pub mod queue;
pub mod spawn;
pub mod state;
pub mod unit;

// Re-exports for convenient access
pub use actions::{
    player_controller, ActionController, EnemyActionController, PlayerActionController,
    PlayerInputHandle,
};
pub use animation::{AnimationController, TimedAnimation};
pub use damage::BattleDamageSystem;
pub use events::{
    battle_channel, BattleEvent, BattleEventReceiver, BattleEventSender, BattleOutcome,
};
pub use machine::{BattleStateMachine, StopHandle};
pub use queue::{BattleQueue, NextUnit, QueueEntry};
pub use spawn::{EnemyGenerator, EnemyTemplate};
pub use state::{auto_trigger, transition, BattleState, Trigger};
pub use unit::{Combatant, UnitHandle, UnitModel};
