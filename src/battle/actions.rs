//! Action controllers: decide what a unit does on its turn
//!
//! A controller suspends until the acting unit's action is decided and
//! carries no payload; damage application happens afterwards in the damage
//! system. The two variants mirror who is in control: a player-controlled
//! unit waits on external input, an enemy-controlled unit waits out a
//! simulated thinking delay.

use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::battle::unit::UnitHandle;
use crate::core::config::BattleConfig;
use crate::core::error::{BattleError, Result};
use crate::core::types::UnitId;

/// Capability variant resolved once at combatant construction
pub enum ActionController {
    Player(PlayerActionController),
    Enemy(EnemyActionController),
}

impl ActionController {
    /// Suspend until the acting unit's action is decided.
    ///
    /// Resolves `Ok(())` when the unit acts, `Err(CancelledWait)` when the
    /// wait was cancelled out from under the caller.
    pub async fn resolve_action(&mut self, target: &UnitHandle) -> Result<()> {
        match self {
            ActionController::Player(controller) => controller.resolve_action(target).await,
            ActionController::Enemy(controller) => controller.resolve_action(target).await,
        }
    }
}

enum PlayerSignal {
    TargetSelected(UnitId),
    Disabled,
}

/// Input-side handle for a player controller; clonable so the input layer
/// can keep one wherever clicks are resolved
#[derive(Clone)]
pub struct PlayerInputHandle {
    sender: mpsc::UnboundedSender<PlayerSignal>,
}

impl PlayerInputHandle {
    /// Signal that the player targeted a valid enemy. The input layer is
    /// responsible for hit validation; the controller accepts any selection.
    pub fn select_target(&self, unit: UnitId) {
        let _ = self.sender.send(PlayerSignal::TargetSelected(unit));
    }

    /// Cancel any pending wait (controller disabled / scene torn down)
    pub fn disable(&self) {
        let _ = self.sender.send(PlayerSignal::Disabled);
    }
}

/// Waits for an external input event signalling a target selection
pub struct PlayerActionController {
    receiver: mpsc::UnboundedReceiver<PlayerSignal>,
}

/// Create a player controller and the input handle that feeds it
pub fn player_controller() -> (PlayerActionController, PlayerInputHandle) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        PlayerActionController { receiver },
        PlayerInputHandle { sender },
    )
}

impl PlayerActionController {
    pub async fn resolve_action(&mut self, _target: &UnitHandle) -> Result<()> {
        // selections queued before this wait opened are stale; each wait
        // starts fresh, like the completion source it replaces
        while self.receiver.try_recv().is_ok() {}

        match self.receiver.recv().await {
            Some(PlayerSignal::TargetSelected(unit)) => {
                tracing::debug!(?unit, "player selected a target");
                Ok(())
            }
            Some(PlayerSignal::Disabled) | None => Err(BattleError::CancelledWait),
        }
    }
}

/// Waits out a randomized "thinking" delay, then acts unconditionally
pub struct EnemyActionController {
    think_min: Duration,
    think_max: Duration,
}

impl EnemyActionController {
    pub fn new(think_min: Duration, think_max: Duration) -> Self {
        Self {
            think_min,
            think_max: think_max.max(think_min),
        }
    }

    pub fn from_config(config: &BattleConfig) -> Self {
        let (think_min, think_max) = config.enemy_think_range();
        Self::new(think_min, think_max)
    }

    pub async fn resolve_action(&mut self, _target: &UnitHandle) -> Result<()> {
        let min_ms = self.think_min.as_millis() as u64;
        let max_ms = self.think_max.as_millis() as u64;
        let delay = Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms));

        tracing::debug!(?delay, "enemy thinking");
        sleep(delay).await;

        Ok(())
    }
}
