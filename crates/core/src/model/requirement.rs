use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable name of a requirement inside a requirement set (e.g. `"groups"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequirementId(String);

impl RequirementId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequirementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequirementId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Result of a single requirement check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementOutcome {
    pub id: RequirementId,
    pub passed: bool,
    /// Learner-facing feedback line, when the requirement provides one.
    pub feedback: Option<String>,
}

/// Ordered pass/fail results of one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementReport {
    outcomes: Vec<RequirementOutcome>,
}

impl RequirementReport {
    #[must_use]
    pub fn new(outcomes: Vec<RequirementOutcome>) -> Self {
        Self { outcomes }
    }

    /// Result for `id`, or `None` if the set has no such requirement.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<bool> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.id.as_str() == id)
            .map(|outcome| outcome.passed)
    }

    #[must_use]
    pub fn outcomes(&self) -> &[RequirementOutcome] {
        &self.outcomes
    }

    /// True iff every requirement passed. An empty set is never complete.
    #[must_use]
    pub fn all_met(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|outcome| outcome.passed)
    }

    #[must_use]
    pub fn met_count(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.passed).count()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Partial credit, rounded to a whole percent.
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.outcomes.is_empty() {
            return 0;
        }
        let share = self.met_count() * 100 / self.total();
        u8::try_from(share).unwrap_or(100)
    }
}
