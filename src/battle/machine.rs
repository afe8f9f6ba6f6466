//! Battle state machine: owns one session from start to stop
//!
//! Transitions commit one at a time; a trigger fired from within entry
//! processing cascades depth-first and synchronously until a state with no
//! follow-up trigger is reached. `WaitForAction` is the only state that
//! suspends: the async driver resolves the active unit's action there,
//! bounded by the configured turn timeout, then ends the turn.
//!
//! Stopping never cancels an in-flight wait. A `StopHandle` raises a flag
//! the driver checks after every suspension point before firing anything,
//! so a wait that resolves late finds a torn-down session instead of firing
//! triggers into it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::time::timeout;

use crate::battle::damage::BattleDamageSystem;
use crate::battle::events::{BattleEvent, BattleEventSender, BattleOutcome};
use crate::battle::queue::BattleQueue;
use crate::battle::state::{self, BattleState, Trigger};
use crate::battle::unit::Combatant;
use crate::core::config::BattleConfig;
use crate::core::error::{BattleError, Result};
use crate::core::types::{Side, UnitId};

/// Requests a session stop from outside the driver
///
/// The request takes effect after the current suspension resolves; nothing
/// in flight is cancelled.
#[derive(Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

pub struct BattleStateMachine {
    current: BattleState,
    roster: Vec<Combatant>,
    round_queue: Option<BattleQueue>,
    active_unit: Option<UnitId>,
    outcome: BattleOutcome,
    events: BattleEventSender,
    damage_system: BattleDamageSystem,
    config: BattleConfig,
    stop_flag: Arc<AtomicBool>,
}

impl BattleStateMachine {
    pub fn new(roster: Vec<Combatant>, events: BattleEventSender, config: BattleConfig) -> Self {
        let damage_system = BattleDamageSystem::new(events.clone());
        Self {
            current: BattleState::None,
            roster,
            round_queue: None,
            active_unit: None,
            outcome: BattleOutcome::Undecided,
            events,
            damage_system,
            config,
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> BattleState {
        self.current
    }

    pub fn roster(&self) -> &[Combatant] {
        &self.roster
    }

    pub fn active_unit(&self) -> Option<UnitId> {
        self.active_unit
    }

    pub fn outcome(&self) -> BattleOutcome {
        self.outcome
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: Arc::clone(&self.stop_flag),
        }
    }

    /// Start a session: build the round queue from the roster and fire the
    /// opening trigger. The cascade runs synchronously to `WaitForAction`
    /// (or straight to `Finish` when nothing can fight).
    ///
    /// Starting an already-running session fails with `InvalidTransition`
    /// and leaves the session untouched; starting a finished one is ignored.
    pub fn start(&mut self) -> Result<()> {
        if self.current == BattleState::Finish {
            return Ok(());
        }
        if state::transition(self.current, Trigger::InitRound).is_none() {
            return Err(BattleError::InvalidTransition {
                state: self.current,
                trigger: Trigger::InitRound,
            });
        }

        self.stop_flag.store(false, Ordering::SeqCst);
        self.outcome = BattleOutcome::Undecided;
        self.round_queue = Some(BattleQueue::new(
            self.roster.iter().map(Combatant::queue_entry),
        ));
        tracing::info!(units = self.roster.len(), "battle session starting");

        self.fire(Trigger::InitRound)
    }

    /// Tear the session down: state back to `None`, queue and active-unit
    /// cell discarded. Does not fire `Finish`; does not wait for (or cancel)
    /// any in-flight suspended operation.
    pub fn stop(&mut self) {
        self.current = BattleState::None;
        self.round_queue = None;
        self.active_unit = None;
        tracing::info!("battle session stopped");
    }

    /// Fire a trigger and process the full synchronous cascade it opens.
    ///
    /// A trigger the current state does not permit fails with
    /// `InvalidTransition` and leaves the state unchanged. From `Finish`
    /// every trigger is ignored without a notification.
    pub fn fire(&mut self, trigger: Trigger) -> Result<()> {
        let mut pending = Some(trigger);

        while let Some(trigger) = pending {
            if self.current == BattleState::Finish {
                return Ok(());
            }

            let from = self.current;
            let to = state::transition(from, trigger).ok_or(BattleError::InvalidTransition {
                state: from,
                trigger,
            })?;

            self.current = to;
            tracing::debug!(?from, ?to, "battle state changed");
            self.publish(BattleEvent::StateChanged { from, to });

            pending = self.entered(to);
        }

        Ok(())
    }

    /// Drive the session: start it, then resolve turns until the battle
    /// finishes or a stop request is observed.
    pub async fn run(&mut self) -> Result<()> {
        self.start()?;

        while self.current == BattleState::WaitForAction {
            if self.stopped() {
                self.stop();
                return Ok(());
            }
            self.resolve_active_turn().await?;
        }

        Ok(())
    }

    /// Entry processing for a just-committed state; returns the follow-up
    /// trigger, if any. `None` marks a suspension point or terminal state.
    fn entered(&mut self, entered: BattleState) -> Option<Trigger> {
        match entered {
            BattleState::RoundStart => {
                if let Some(queue) = &self.round_queue {
                    self.publish(BattleEvent::RoundStarted {
                        round: queue.round(),
                    });
                }
                state::auto_trigger(entered)
            }
            BattleState::TurnInit => self.enter_turn_init(),
            BattleState::TurnStart => {
                if let (Some(unit), Some(queue)) = (self.active_unit, &self.round_queue) {
                    self.publish(BattleEvent::TurnStarted {
                        unit,
                        round: queue.round(),
                    });
                }
                state::auto_trigger(entered)
            }
            BattleState::Finish => {
                tracing::info!(outcome = ?self.outcome, "battle finished");
                self.publish(BattleEvent::Finished {
                    outcome: self.outcome,
                });
                None
            }
            other => state::auto_trigger(other),
        }
    }

    /// Pick the next acting unit. Defeated units keep their queue slot but
    /// never act; when a whole side is down the battle finishes instead of
    /// cycling rounds forever.
    fn enter_turn_init(&mut self) -> Option<Trigger> {
        let player_alive = self.side_alive(Side::Player);
        let enemy_alive = self.side_alive(Side::Enemy);
        if !player_alive || !enemy_alive {
            self.outcome = if player_alive {
                BattleOutcome::Victory
            } else {
                BattleOutcome::Defeat
            };
            return Some(Trigger::Finish);
        }

        let queue = self.round_queue.as_mut()?;
        loop {
            let next = queue.next_unit();
            if next.round_ended {
                return Some(Trigger::EndRound);
            }
            let Some(entry) = next.unit else {
                return Some(Trigger::EndRound);
            };
            if entry.unit.with(|u| u.is_defeated()) {
                continue;
            }
            self.active_unit = Some(entry.id);
            return Some(Trigger::StartTurn);
        }
    }

    /// Resolve the active unit's turn: wait for its action (bounded by the
    /// turn timeout), apply damage if it acted, then end the turn. Every
    /// post-suspension step re-checks the stop flag before firing.
    async fn resolve_active_turn(&mut self) -> Result<()> {
        let Some((actor_idx, target_idx)) = self.active_pairing() else {
            return self.fire(Trigger::EndTurn);
        };

        let turn_timeout = self.config.turn_timeout();
        let acted = {
            let target = self.roster[target_idx].unit.clone();
            let actor = &mut self.roster[actor_idx];
            match timeout(turn_timeout, actor.controller.resolve_action(&target)).await {
                Ok(Ok(())) => true,
                Ok(Err(BattleError::CancelledWait)) => {
                    tracing::warn!(unit = ?actor.id(), "action wait cancelled, turn forfeited");
                    false
                }
                Ok(Err(other)) => return Err(other),
                Err(_) => {
                    tracing::debug!(unit = ?actor.id(), "turn timed out before an action was chosen");
                    false
                }
            }
        };

        if self.stopped() {
            self.stop();
            return Ok(());
        }

        if acted {
            let actor = &self.roster[actor_idx];
            let target = &self.roster[target_idx];
            self.damage_system
                .resolve_damage(Some(actor), Some(target))
                .await;

            if self.stopped() {
                self.stop();
                return Ok(());
            }

            let target = &self.roster[target_idx];
            if target.is_defeated() {
                self.publish(BattleEvent::UnitDefeated { unit: target.id() });
            }
        }

        self.fire(Trigger::EndTurn)
    }

    /// Roster indices for the active unit and its target (first surviving
    /// unit on the opposing side, roster order)
    fn active_pairing(&self) -> Option<(usize, usize)> {
        let active_id = self.active_unit?;
        let actor_idx = self.roster.iter().position(|c| c.id() == active_id)?;
        let opponent = self.roster[actor_idx].side.opponent();
        let target_idx = self
            .roster
            .iter()
            .position(|c| c.side == opponent && !c.is_defeated())?;
        Some((actor_idx, target_idx))
    }

    fn side_alive(&self, side: Side) -> bool {
        self.roster
            .iter()
            .any(|c| c.side == side && !c.is_defeated())
    }

    fn stopped(&self) -> bool {
        self.stop_flag.load(Ordering::SeqCst)
    }

    fn publish(&self, event: BattleEvent) {
        // no subscribers is fine; the machine never blocks on observers
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::actions::{player_controller, ActionController, EnemyActionController};
    use crate::battle::animation::AnimationController;
    use crate::battle::events::{battle_channel, BattleEventReceiver};
    use crate::battle::unit::{UnitHandle, UnitModel};
    use std::time::Duration;

    fn instant_enemy(name: &str, side: Side, health: i32, damage: i32) -> Combatant {
        Combatant::new(
            UnitHandle::new(UnitModel::new(name, health, damage)),
            side,
            ActionController::Enemy(EnemyActionController::new(
                Duration::ZERO,
                Duration::ZERO,
            )),
            AnimationController::Disabled,
        )
    }

    fn fast_config() -> BattleConfig {
        BattleConfig {
            turn_timeout_ms: 3_000,
            enemy_think_min_ms: 0,
            enemy_think_max_ms: 0,
            event_capacity: 256,
        }
    }

    fn drain(rx: &mut BattleEventReceiver) -> Vec<BattleEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn state_changes(events: &[BattleEvent]) -> Vec<(BattleState, BattleState)> {
        events
            .iter()
            .filter_map(|e| match e {
                BattleEvent::StateChanged { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_start_cascades_to_wait_for_action_in_one_burst() {
        let (events, mut rx) = battle_channel(64);
        let roster = vec![
            instant_enemy("hero", Side::Player, 30, 10),
            instant_enemy("goblin", Side::Enemy, 20, 5),
        ];
        let mut machine = BattleStateMachine::new(roster, events, fast_config());

        machine.start().unwrap();

        assert_eq!(machine.state(), BattleState::WaitForAction);
        let burst = drain(&mut rx);
        assert_eq!(
            state_changes(&burst),
            vec![
                (BattleState::None, BattleState::RoundInit),
                (BattleState::RoundInit, BattleState::RoundStart),
                (BattleState::RoundStart, BattleState::TurnInit),
                (BattleState::TurnInit, BattleState::TurnStart),
                (BattleState::TurnStart, BattleState::WaitForAction),
            ]
        );
        assert!(burst.contains(&BattleEvent::RoundStarted { round: 1 }));
    }

    #[test]
    fn test_first_turn_goes_to_highest_max_health() {
        let (events, mut rx) = battle_channel(64);
        let hero = instant_enemy("hero", Side::Player, 30, 10);
        let hero_id = hero.id();
        let roster = vec![instant_enemy("goblin", Side::Enemy, 20, 5), hero];
        let mut machine = BattleStateMachine::new(roster, events, fast_config());

        machine.start().unwrap();

        assert_eq!(machine.active_unit(), Some(hero_id));
        assert!(drain(&mut rx).contains(&BattleEvent::TurnStarted {
            unit: hero_id,
            round: 1
        }));
    }

    #[test]
    fn test_invalid_trigger_rejected_and_state_unchanged() {
        let (events, _rx) = battle_channel(64);
        let roster = vec![
            instant_enemy("hero", Side::Player, 30, 10),
            instant_enemy("goblin", Side::Enemy, 20, 5),
        ];
        let mut machine = BattleStateMachine::new(roster, events, fast_config());
        machine.start().unwrap();

        let result = machine.fire(Trigger::InitRound);
        assert!(matches!(
            result,
            Err(BattleError::InvalidTransition {
                state: BattleState::WaitForAction,
                trigger: Trigger::InitRound,
            })
        ));
        assert_eq!(machine.state(), BattleState::WaitForAction);
    }

    #[test]
    fn test_fire_before_start_is_invalid() {
        let (events, _rx) = battle_channel(64);
        let mut machine = BattleStateMachine::new(Vec::new(), events, fast_config());

        assert!(matches!(
            machine.fire(Trigger::EndTurn),
            Err(BattleError::InvalidTransition { .. })
        ));
        assert_eq!(machine.state(), BattleState::None);
    }

    #[test]
    fn test_finish_ignores_all_triggers_silently() {
        let (events, mut rx) = battle_channel(64);
        let roster = vec![
            instant_enemy("hero", Side::Player, 30, 10),
            instant_enemy("goblin", Side::Enemy, 20, 5),
        ];
        let mut machine = BattleStateMachine::new(roster, events, fast_config());
        machine.start().unwrap();
        machine.fire(Trigger::Finish).unwrap();
        assert_eq!(machine.state(), BattleState::Finish);
        drain(&mut rx);

        for trigger in [
            Trigger::InitRound,
            Trigger::StartRound,
            Trigger::InitTurn,
            Trigger::StartTurn,
            Trigger::ActionWait,
            Trigger::EndTurn,
            Trigger::EndRound,
            Trigger::Finish,
        ] {
            machine.fire(trigger).unwrap();
            assert_eq!(machine.state(), BattleState::Finish);
        }
        assert!(drain(&mut rx).is_empty(), "terminal state emits nothing");
    }

    #[test]
    fn test_externally_fired_finish_reports_undecided() {
        let (events, mut rx) = battle_channel(64);
        let roster = vec![
            instant_enemy("hero", Side::Player, 30, 10),
            instant_enemy("goblin", Side::Enemy, 20, 5),
        ];
        let mut machine = BattleStateMachine::new(roster, events, fast_config());
        machine.start().unwrap();
        machine.fire(Trigger::Finish).unwrap();

        assert!(drain(&mut rx).contains(&BattleEvent::Finished {
            outcome: BattleOutcome::Undecided
        }));
    }

    #[test]
    fn test_stop_resets_to_none_without_finish() {
        let (events, mut rx) = battle_channel(64);
        let roster = vec![
            instant_enemy("hero", Side::Player, 30, 10),
            instant_enemy("goblin", Side::Enemy, 20, 5),
        ];
        let mut machine = BattleStateMachine::new(roster, events, fast_config());
        machine.start().unwrap();
        drain(&mut rx);

        machine.stop();

        assert_eq!(machine.state(), BattleState::None);
        let after = drain(&mut rx);
        assert!(
            !after
                .iter()
                .any(|e| matches!(e, BattleEvent::Finished { .. })),
            "stop must not fire Finish"
        );

        // a stopped session can start again from scratch
        machine.start().unwrap();
        assert_eq!(machine.state(), BattleState::WaitForAction);
    }

    #[test]
    fn test_double_start_is_invalid() {
        let (events, _rx) = battle_channel(64);
        let roster = vec![
            instant_enemy("hero", Side::Player, 30, 10),
            instant_enemy("goblin", Side::Enemy, 20, 5),
        ];
        let mut machine = BattleStateMachine::new(roster, events, fast_config());
        machine.start().unwrap();

        assert!(matches!(
            machine.start(),
            Err(BattleError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_rejected_start_leaves_running_session_untouched() {
        let (events, mut rx) = battle_channel(256);
        let roster = vec![
            instant_enemy("hero", Side::Player, 30, 10),
            instant_enemy("goblin", Side::Enemy, 20, 5),
        ];
        let mut machine = BattleStateMachine::new(roster, events, fast_config());
        machine.start().unwrap();

        // end both round-1 turns so the session sits in round 2
        machine.fire(Trigger::EndTurn).unwrap();
        machine.fire(Trigger::EndTurn).unwrap();
        drain(&mut rx);

        assert!(matches!(
            machine.start(),
            Err(BattleError::InvalidTransition { .. })
        ));

        // the queue keeps its position: the next turn is still in round 2
        machine.fire(Trigger::EndTurn).unwrap();
        let rounds: Vec<u32> = drain(&mut rx)
            .iter()
            .filter_map(|e| match e {
                BattleEvent::TurnStarted { round, .. } => Some(*round),
                _ => None,
            })
            .collect();
        assert_eq!(rounds, vec![2]);
    }

    #[test]
    fn test_empty_roster_finishes_immediately_as_defeat() {
        let (events, mut rx) = battle_channel(64);
        let mut machine = BattleStateMachine::new(Vec::new(), events, fast_config());

        machine.start().unwrap();

        assert_eq!(machine.state(), BattleState::Finish);
        assert!(drain(&mut rx).contains(&BattleEvent::Finished {
            outcome: BattleOutcome::Defeat
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_fights_to_player_victory() {
        let (events, mut rx) = battle_channel(256);
        let hero = instant_enemy("hero", Side::Player, 30, 10);
        let goblin = instant_enemy("goblin", Side::Enemy, 20, 5);
        let goblin_id = goblin.id();
        let mut machine = BattleStateMachine::new(vec![hero, goblin], events, fast_config());

        machine.run().await.unwrap();

        assert_eq!(machine.state(), BattleState::Finish);
        assert_eq!(machine.outcome(), BattleOutcome::Victory);

        // hero (30 hp) acts first each round: goblin takes 10+10, hero takes 5
        assert_eq!(machine.roster()[0].unit.with(|u| u.current_health()), 25);
        assert_eq!(machine.roster()[1].unit.with(|u| u.current_health()), 0);

        let events = drain(&mut rx);
        assert!(events.contains(&BattleEvent::UnitDefeated { unit: goblin_id }));
        assert!(events.contains(&BattleEvent::Finished {
            outcome: BattleOutcome::Victory
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_with_unresponsive_player_times_out_each_turn() {
        let (events, mut rx) = battle_channel(256);
        let (controller, _input) = player_controller();
        let hero = Combatant::new(
            UnitHandle::new(UnitModel::new("hero", 20, 10)),
            Side::Player,
            ActionController::Player(controller),
            AnimationController::Disabled,
        );
        let goblin = instant_enemy("goblin", Side::Enemy, 10, 5);
        let mut machine = BattleStateMachine::new(vec![hero, goblin], events, fast_config());

        machine.run().await.unwrap();

        // the hero never acts; each of their turns burns the 3 s timeout and
        // the goblin whittles them down to defeat
        assert_eq!(machine.outcome(), BattleOutcome::Defeat);
        assert_eq!(machine.roster()[0].unit.with(|u| u.current_health()), 0);
        assert_eq!(machine.roster()[1].unit.with(|u| u.current_health()), 10);
        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, BattleEvent::UnitDefeated { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_request_tears_down_after_pending_wait_resolves() {
        let (events, mut rx) = battle_channel(256);
        let hero = instant_enemy("hero", Side::Player, 300, 1);
        let mut goblin = instant_enemy("goblin", Side::Enemy, 200, 1);
        goblin.controller = ActionController::Enemy(EnemyActionController::new(
            Duration::from_secs(1),
            Duration::from_secs(1),
        ));
        let mut machine = BattleStateMachine::new(vec![hero, goblin], events, fast_config());
        let stop = machine.stop_handle();

        let (result, ()) = tokio::join!(machine.run(), async {
            stop.stop();
        });
        result.unwrap();

        assert_eq!(machine.state(), BattleState::None);
        assert!(
            !drain(&mut rx)
                .iter()
                .any(|e| matches!(e, BattleEvent::Finished { .. })),
            "a stopped session never reports Finish"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_defeated_units_are_skipped_in_later_rounds() {
        let (events, mut rx) = battle_channel(1024);
        // two enemies; the weaker one dies first and must not act again
        let hero = instant_enemy("hero", Side::Player, 50, 10);
        let orc = instant_enemy("orc", Side::Enemy, 25, 2);
        let rat = instant_enemy("rat", Side::Enemy, 10, 1);
        let rat_id = rat.id();
        let mut machine = BattleStateMachine::new(vec![hero, orc, rat], events, fast_config());

        machine.run().await.unwrap();
        assert_eq!(machine.outcome(), BattleOutcome::Victory);

        let events = drain(&mut rx);
        let defeat_order: Vec<&BattleEvent> = events
            .iter()
            .filter(|e| matches!(e, BattleEvent::UnitDefeated { .. }))
            .collect();
        assert_eq!(defeat_order.len(), 2);

        // the hero targets the orc first (roster order), so the rat acts in
        // the early rounds and falls last; once defeated it takes no turn
        let mut rat_defeated = false;
        for event in &events {
            match event {
                BattleEvent::UnitDefeated { unit } if *unit == rat_id => rat_defeated = true,
                BattleEvent::TurnStarted { unit, .. } if *unit == rat_id => {
                    assert!(!rat_defeated, "defeated unit took a turn");
                }
                _ => {}
            }
        }
        assert!(rat_defeated);
    }
}
