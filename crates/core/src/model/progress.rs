use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::UnitId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("a learning path needs at least one unit")]
    EmptyPath,

    #[error("unit {unit} is outside 1..={total}")]
    OutOfRange { unit: UnitId, total: u32 },

    #[error("unit {missing} is not completed but a later unit is")]
    CompletionGap { missing: UnitId },

    #[error("current step {step} is behind completed unit {completed}")]
    StepBehind { step: UnitId, completed: UnitId },

    #[error("current step {step} was never unlocked")]
    StepAhead { step: UnitId },
}

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// What happened when a unit completion was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The unit was newly recorded; `current_step` is the step after the update.
    Completed { current_step: UnitId },
    /// The unit was already recorded; nothing changed.
    AlreadyComplete,
    /// The unit has not been unlocked yet; nothing changed.
    Locked,
    /// The unit is not part of this path; nothing changed.
    OutOfRange,
}

impl CompletionOutcome {
    /// True when the record changed and should be persisted.
    #[must_use]
    pub fn is_change(&self) -> bool {
        matches!(self, CompletionOutcome::Completed { .. })
    }
}

/// Visual state of a single unit in a learning path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Completed,
    /// The furthest reached unit that is not yet complete.
    Active,
    Unlocked,
    Locked,
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UnitState::Completed => "completed",
            UnitState::Active => "active",
            UnitState::Unlocked => "unlocked",
            UnitState::Locked => "locked",
        };
        f.write_str(label)
    }
}

//
// ─── RECORD ────────────────────────────────────────────────────────────────────
//

/// Completion state of a learner across an ordered sequence of units.
///
/// Completed units always form a prefix `1..=k` of the path and the current
/// step is `k` or `k + 1` (capped at the path length). Both constructors and
/// every mutation keep that shape, so `is_unlocked(n)` holds exactly when
/// `n - 1` is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    total_units: u32,
    current_step: UnitId,
    completed: BTreeSet<UnitId>,
    counters: BTreeMap<String, u32>,
    saved_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// Fresh record for a path of `total_units` units, positioned on unit 1.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::EmptyPath` if `total_units` is zero.
    pub fn new(total_units: u32) -> Result<Self, ProgressError> {
        if total_units == 0 {
            return Err(ProgressError::EmptyPath);
        }
        Ok(Self {
            total_units,
            current_step: UnitId::FIRST,
            completed: BTreeSet::new(),
            counters: BTreeMap::new(),
            saved_at: None,
        })
    }

    /// Rehydrate a record from persisted fields, validating its shape.
    ///
    /// # Errors
    ///
    /// Returns a `ProgressError` describing the first inconsistency found:
    /// a unit outside the path, a hole in the completed prefix, or a current
    /// step that disagrees with the completed units.
    pub fn from_persisted(
        total_units: u32,
        current_step: UnitId,
        completed: impl IntoIterator<Item = UnitId>,
        counters: BTreeMap<String, u32>,
        saved_at: Option<DateTime<Utc>>,
    ) -> Result<Self, ProgressError> {
        let mut record = Self::new(total_units)?;
        let completed: BTreeSet<UnitId> = completed.into_iter().collect();

        for unit in completed.iter().copied().chain(std::iter::once(current_step)) {
            if !record.in_range(unit) {
                return Err(ProgressError::OutOfRange {
                    unit,
                    total: total_units,
                });
            }
        }

        // BTreeSet iterates in order, so the prefix check is positional.
        for (position, unit) in (1_u32..).zip(completed.iter()) {
            if unit.value() != position {
                return Err(ProgressError::CompletionGap {
                    missing: UnitId::new(position),
                });
            }
        }

        if let Some(last) = completed.last().copied() {
            if current_step < last {
                return Err(ProgressError::StepBehind {
                    step: current_step,
                    completed: last,
                });
            }
        }
        let furthest = record.step_after(completed.len());
        if current_step > furthest {
            return Err(ProgressError::StepAhead { step: current_step });
        }

        record.current_step = current_step;
        record.completed = completed;
        record.counters = counters;
        record.saved_at = saved_at;
        Ok(record)
    }

    /// Record `unit` as complete and advance the current step past it.
    ///
    /// Idempotent: completing an already completed unit changes nothing.
    /// Units that are locked or outside the path are refused.
    pub fn mark_unit_complete(&mut self, unit: UnitId) -> CompletionOutcome {
        if !self.in_range(unit) {
            return CompletionOutcome::OutOfRange;
        }
        if self.completed.contains(&unit) {
            return CompletionOutcome::AlreadyComplete;
        }
        if !self.is_unlocked(unit) {
            return CompletionOutcome::Locked;
        }

        self.completed.insert(unit);
        let next = UnitId::new(unit.next().value().min(self.total_units));
        self.current_step = self.current_step.max(next);
        CompletionOutcome::Completed {
            current_step: self.current_step,
        }
    }

    /// Unit 1 is always unlocked; unit `n` is unlocked when it has been
    /// reached or its predecessor is complete. Units past the end never are.
    #[must_use]
    pub fn is_unlocked(&self, unit: UnitId) -> bool {
        if unit == UnitId::FIRST {
            return true;
        }
        if !self.in_range(unit) {
            return false;
        }
        unit <= self.current_step
            || unit
                .previous()
                .is_some_and(|prev| self.completed.contains(&prev))
    }

    #[must_use]
    pub fn is_complete(&self, unit: UnitId) -> bool {
        self.completed.contains(&unit)
    }

    #[must_use]
    pub fn unit_state(&self, unit: UnitId) -> UnitState {
        if self.is_complete(unit) {
            UnitState::Completed
        } else if unit == self.current_step {
            UnitState::Active
        } else if self.is_unlocked(unit) {
            UnitState::Unlocked
        } else {
            UnitState::Locked
        }
    }

    /// State of every unit in path order.
    #[must_use]
    pub fn unit_states(&self) -> Vec<(UnitId, UnitState)> {
        (1..=self.total_units)
            .map(UnitId::new)
            .map(|unit| (unit, self.unit_state(unit)))
            .collect()
    }

    /// Share of completed units, in percent (`0.0..=100.0`).
    #[must_use]
    pub fn percent(&self) -> f64 {
        f64::from(self.completed_count()) / f64::from(self.total_units) * 100.0
    }

    /// True once every unit of the path is complete.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.completed_count() == self.total_units
    }

    #[must_use]
    pub fn total_units(&self) -> u32 {
        self.total_units
    }

    #[must_use]
    pub fn current_step(&self) -> UnitId {
        self.current_step
    }

    pub fn completed_units(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.completed.iter().copied()
    }

    #[must_use]
    pub fn completed_count(&self) -> u32 {
        // The set is bounded by `total_units`, which is a u32.
        u32::try_from(self.completed.len()).unwrap_or(u32::MAX)
    }

    /// Current value of a named counter (zero when never incremented).
    #[must_use]
    pub fn counter(&self, name: &str) -> u32 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    /// Add `by` to a named counter and return the new value.
    pub fn increment_counter(&mut self, name: &str, by: u32) -> u32 {
        let slot = self.counters.entry(name.to_owned()).or_insert(0);
        *slot = slot.saturating_add(by);
        *slot
    }

    #[must_use]
    pub fn counters(&self) -> &BTreeMap<String, u32> {
        &self.counters
    }

    #[must_use]
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.saved_at
    }

    pub fn mark_saved(&mut self, at: DateTime<Utc>) {
        self.saved_at = Some(at);
    }

    fn in_range(&self, unit: UnitId) -> bool {
        (1..=self.total_units).contains(&unit.value())
    }

    fn step_after(&self, completed_len: usize) -> UnitId {
        let completed_len = u32::try_from(completed_len).unwrap_or(u32::MAX);
        UnitId::new(completed_len.saturating_add(1).min(self.total_units))
    }
}
