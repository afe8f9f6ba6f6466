//! Animation capability: cosmetic feedback hooks the damage pipeline awaits
//!
//! Purely cosmetic, no gameplay effect. The variant is resolved once at
//! combatant construction; `Disabled` stands for a unit with no feedback
//! capability, and skipping it never blocks damage application.

use std::time::Duration;

use tokio::time::sleep;

/// Optional per-unit animation capability
#[derive(Debug, Clone)]
pub enum AnimationController {
    /// No feedback for this unit; both hooks complete immediately
    Disabled,
    /// Fixed-duration feedback windows, the engine-neutral stand-in for
    /// tweened attack lunges and damage blinks
    Timed(TimedAnimation),
}

#[derive(Debug, Clone)]
pub struct TimedAnimation {
    pub attack: Duration,
    pub damage: Duration,
}

impl Default for TimedAnimation {
    fn default() -> Self {
        // reference feel: a 0.3 s lunge and a 0.5 s damage blink
        Self {
            attack: Duration::from_millis(300),
            damage: Duration::from_millis(500),
        }
    }
}

impl AnimationController {
    /// Suspend until the attack feedback completes
    pub async fn play_attack(&self) {
        if let AnimationController::Timed(timing) = self {
            sleep(timing.attack).await;
        }
    }

    /// Suspend until the damage feedback completes
    pub async fn play_damage(&self) {
        if let AnimationController::Timed(timing) = self {
            sleep(timing.damage).await;
        }
    }
}
