//! Round queue: answers "who acts next" for a fixed roster
//!
//! The ordering is computed once at construction (stable descending sort on
//! design-time max health) and never revisited, even if stats change
//! mid-round: a round is a fixed pass over the units present at round start.
//! The queue is never consumed; exhausting a pass yields a distinguished
//! round-ended answer, resets the cursor and bumps the round counter.

use std::cmp::Reverse;

use crate::battle::unit::UnitHandle;
use crate::core::types::{Round, UnitId};

/// One slot in the round ordering
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub id: UnitId,
    pub unit: UnitHandle,
}

/// Answer from [`BattleQueue::next_unit`]
#[derive(Debug, Clone)]
pub struct NextUnit {
    /// The acting unit, absent when the round just ended
    pub unit: Option<QueueEntry>,
    /// For a unit answer, the round it acts in; for a round-ended answer,
    /// the round that just completed
    pub round: Round,
    pub round_ended: bool,
}

impl NextUnit {
    fn round_ended(round: Round) -> Self {
        Self {
            unit: None,
            round,
            round_ended: true,
        }
    }
}

#[derive(Debug)]
pub struct BattleQueue {
    entries: Vec<QueueEntry>,
    cursor: usize,
    round: Round,
}

impl BattleQueue {
    pub fn new(units: impl IntoIterator<Item = QueueEntry>) -> Self {
        let mut entries: Vec<QueueEntry> = units.into_iter().collect();
        // stable sort: ties keep their roster order
        entries.sort_by_key(|entry| Reverse(entry.unit.with(|u| u.max_health())));
        Self {
            entries,
            cursor: 0,
            round: 1,
        }
    }

    pub fn round(&self) -> Round {
        self.round
    }

    pub fn next_unit(&mut self) -> NextUnit {
        if self.entries.is_empty() {
            // no cursor to advance, the round number never moves
            return NextUnit::round_ended(self.round);
        }

        if self.cursor >= self.entries.len() {
            let finished = self.round;
            self.round += 1;
            self.cursor = 0;
            return NextUnit::round_ended(finished);
        }

        let entry = self.entries[self.cursor].clone();
        self.cursor += 1;

        NextUnit {
            unit: Some(entry),
            round: self.round,
            round_ended: false,
        }
    }
}
