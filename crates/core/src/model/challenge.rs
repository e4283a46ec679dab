use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a coding challenge, e.g. `settings-page`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChallengeId(String);

impl ChallengeId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Contents of the three challenge editors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeCode {
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub css: String,
    #[serde(default)]
    pub js: String,
}

impl ChallengeCode {
    #[must_use]
    pub fn new(html: impl Into<String>, css: impl Into<String>, js: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            css: css.into(),
            js: js.into(),
        }
    }

    /// True when all three editors are empty or whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.html.trim().is_empty() && self.css.trim().is_empty() && self.js.trim().is_empty()
    }
}

/// Work in progress, autosaved while the learner types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeDraft {
    pub code: ChallengeCode,
    pub saved_at: DateTime<Utc>,
}

/// A submission that met every requirement of its challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeSolution {
    pub challenge: ChallengeId,
    pub code: ChallengeCode,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_only_code_is_blank() {
        assert!(ChallengeCode::new(" \n", "", "\t").is_blank());
        assert!(!ChallengeCode::new("", "", "console.log(1)").is_blank());
    }
}
