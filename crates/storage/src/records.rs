//! Persisted JSON shapes for every tracked concern.
//!
//! These mirror the domain types so the key-value store only ever sees JSON
//! text, and the domain layer never sees serde attributes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use lesson_core::model::{
    ChallengeCode, ChallengeDraft, ChallengeId, ChallengeSolution, ExerciseIndex, LessonError,
    LessonProgress, ProgressError, ProgressRecord, SectionIndex, TutorialBookmark, UnitId,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::repository::StorageError;

/// Serialize a record to the JSON text written to the store.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the value cannot be encoded.
pub fn encode<T: Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Parse JSON text read from the store.
///
/// # Errors
///
/// Returns `StorageError::Serialization` for anything that is not a valid `T`.
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, StorageError> {
    serde_json::from_str(raw).map_err(|e| StorageError::Serialization(e.to_string()))
}

//
// ─── LEARNING PATH ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub current_step: UnitId,
    pub completed_units: Vec<UnitId>,
    #[serde(default)]
    pub counters: BTreeMap<String, u32>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl ProgressSnapshot {
    #[must_use]
    pub fn from_record(record: &ProgressRecord) -> Self {
        Self {
            current_step: record.current_step(),
            completed_units: record.completed_units().collect(),
            counters: record.counters().clone(),
            saved_at: record.saved_at(),
        }
    }

    /// Convert back into a domain record for a path of `total_units`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the snapshot does not describe a reachable state.
    pub fn into_record(self, total_units: u32) -> Result<ProgressRecord, ProgressError> {
        ProgressRecord::from_persisted(
            total_units,
            self.current_step,
            self.completed_units,
            self.counters,
            self.saved_at,
        )
    }
}

//
// ─── LESSON PAGE ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonSnapshot {
    pub current_section: SectionIndex,
    pub total_sections: u32,
    #[serde(default)]
    pub exercises_completed: Vec<ExerciseIndex>,
    /// Seconds spent on the page.
    #[serde(default)]
    pub time_spent: u64,
}

impl LessonSnapshot {
    #[must_use]
    pub fn from_progress(progress: &LessonProgress) -> Self {
        Self {
            current_section: progress.furthest_section(),
            total_sections: progress.total_sections(),
            exercises_completed: progress.exercises_viewed().collect(),
            time_spent: progress.time_spent_secs(),
        }
    }

    /// # Errors
    ///
    /// Returns `LessonError` if the snapshot does not fit its own section count.
    pub fn into_progress(self) -> Result<LessonProgress, LessonError> {
        LessonProgress::from_persisted(
            self.total_sections,
            self.current_section,
            self.exercises_completed,
            self.time_spent,
        )
    }
}

//
// ─── TUTORIAL BOOKMARK ─────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkSnapshot {
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub scroll_position: f64,
    #[serde(default)]
    pub exercise_code: Option<String>,
    #[serde(default)]
    pub percentage: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl BookmarkSnapshot {
    #[must_use]
    pub fn from_bookmark(bookmark: &TutorialBookmark) -> Self {
        Self {
            section: bookmark.section.clone(),
            scroll_position: bookmark.scroll_position,
            exercise_code: bookmark.exercise_code.clone(),
            percentage: bookmark.progress_label.clone(),
            timestamp: bookmark.saved_at,
        }
    }

    #[must_use]
    pub fn into_bookmark(self) -> TutorialBookmark {
        TutorialBookmark {
            section: self.section,
            scroll_position: self.scroll_position,
            exercise_code: self.exercise_code,
            progress_label: self.percentage,
            saved_at: self.timestamp,
        }
    }
}

//
// ─── CHALLENGES ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub code: ChallengeCode,
    pub timestamp: DateTime<Utc>,
}

impl From<&ChallengeDraft> for DraftSnapshot {
    fn from(draft: &ChallengeDraft) -> Self {
        Self {
            code: draft.code.clone(),
            timestamp: draft.saved_at,
        }
    }
}

impl From<DraftSnapshot> for ChallengeDraft {
    fn from(snapshot: DraftSnapshot) -> Self {
        Self {
            code: snapshot.code,
            saved_at: snapshot.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionSnapshot {
    pub challenge: ChallengeId,
    pub code: ChallengeCode,
    pub completed_at: DateTime<Utc>,
}

impl From<&ChallengeSolution> for SolutionSnapshot {
    fn from(solution: &ChallengeSolution) -> Self {
        Self {
            challenge: solution.challenge.clone(),
            code: solution.code.clone(),
            completed_at: solution.completed_at,
        }
    }
}

impl From<SolutionSnapshot> for ChallengeSolution {
    fn from(snapshot: SolutionSnapshot) -> Self {
        Self {
            challenge: snapshot.challenge,
            code: snapshot.code,
            completed_at: snapshot.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::time::fixed_now;

    #[test]
    fn progress_snapshot_uses_camel_case_fields() {
        let mut record = ProgressRecord::new(6).unwrap();
        record.mark_unit_complete(UnitId::new(1));
        record.increment_counter("exercises", 2);
        record.mark_saved(fixed_now());

        let json = encode(&ProgressSnapshot::from_record(&record)).unwrap();
        assert!(json.contains("\"currentStep\":2"));
        assert!(json.contains("\"completedUnits\":[1]"));

        let restored = decode::<ProgressSnapshot>(&json)
            .unwrap()
            .into_record(6)
            .unwrap();
        assert_eq!(restored, record);
    }

    #[test]
    fn progress_snapshot_tolerates_missing_optional_fields() {
        let snapshot: ProgressSnapshot =
            decode(r#"{"currentStep":1,"completedUnits":[]}"#).unwrap();
        assert!(snapshot.counters.is_empty());
        assert_eq!(snapshot.saved_at, None);
    }

    #[test]
    fn non_json_is_a_serialization_error() {
        let err = decode::<ProgressSnapshot>("not json at all").unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn draft_snapshot_keeps_code() {
        let draft = ChallengeDraft {
            code: ChallengeCode::new("<h1>x</h1>", "h1{}", ""),
            saved_at: fixed_now(),
        };
        let json = encode(&DraftSnapshot::from(&draft)).unwrap();
        let back: ChallengeDraft = decode::<DraftSnapshot>(&json).unwrap().into();
        assert_eq!(back, draft);
    }
}
