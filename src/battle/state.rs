//! Battle phase enumeration and the transition tables that drive it
//!
//! The tables are plain data consulted by the state machine: one maps
//! (state, trigger) to a destination, the other marks which states fire a
//! follow-up trigger immediately on entry. `WaitForAction` and `Finish` are
//! the only states with no auto-trigger; `WaitForAction` is the single
//! suspension point of a running session.

use serde::{Deserialize, Serialize};

/// Battle session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BattleState {
    /// Marker for a session that has not started (or was stopped)
    #[default]
    None,
    RoundInit,
    RoundStart,
    TurnInit,
    TurnStart,
    WaitForAction,
    TurnEnd,
    RoundEnd,
    Finish,
}

/// Transition triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    InitRound,
    StartRound,
    InitTurn,
    StartTurn,
    ActionWait,
    EndTurn,
    EndRound,
    Finish,
}

/// Destination for `trigger` fired in `state`, or `None` if the pairing is
/// not permitted. `Finish` permits nothing here; the machine treats it as
/// terminal and ignores triggers rather than rejecting them.
pub fn transition(state: BattleState, trigger: Trigger) -> Option<BattleState> {
    use BattleState as S;
    use Trigger as T;

    match (state, trigger) {
        (S::None, T::InitRound) => Some(S::RoundInit),

        (S::RoundInit, T::StartRound) => Some(S::RoundStart),
        (S::RoundInit, T::Finish) => Some(S::Finish),

        (S::RoundStart, T::InitTurn) => Some(S::TurnInit),
        (S::RoundStart, T::Finish) => Some(S::Finish),

        (S::TurnInit, T::StartTurn) => Some(S::TurnStart),
        (S::TurnInit, T::EndRound) => Some(S::RoundEnd),
        (S::TurnInit, T::Finish) => Some(S::Finish),

        (S::TurnStart, T::ActionWait) => Some(S::WaitForAction),
        (S::TurnStart, T::Finish) => Some(S::Finish),

        (S::WaitForAction, T::EndTurn) => Some(S::TurnEnd),
        (S::WaitForAction, T::Finish) => Some(S::Finish),

        (S::TurnEnd, T::InitTurn) => Some(S::TurnInit),
        (S::TurnEnd, T::Finish) => Some(S::Finish),

        (S::RoundEnd, T::InitRound) => Some(S::RoundInit),
        (S::RoundEnd, T::Finish) => Some(S::Finish),

        _ => None,
    }
}

/// States whose entry immediately fires another trigger.
///
/// `TurnInit` is absent on purpose: its follow-up depends on the round queue
/// (next unit vs. round ended), so the machine decides it there.
pub fn auto_trigger(state: BattleState) -> Option<Trigger> {
    use BattleState as S;
    use Trigger as T;

    match state {
        S::RoundInit => Some(T::StartRound),
        S::RoundStart => Some(T::InitTurn),
        S::TurnStart => Some(T::ActionWait),
        S::TurnEnd => Some(T::InitTurn),
        S::RoundEnd => Some(T::InitRound),
        _ => None,
    }
}
