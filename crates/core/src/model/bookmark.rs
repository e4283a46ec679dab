use chrono::{DateTime, Utc};

/// Where a learner left a tutorial page, offered back on the next visit.
#[derive(Debug, Clone, PartialEq)]
pub struct TutorialBookmark {
    /// Anchor of the active section, e.g. `#hierarchy`.
    pub section: Option<String>,
    pub scroll_position: f64,
    /// Exercise editor contents, for tutorials that have one.
    pub exercise_code: Option<String>,
    /// Reading progress label shown in the resume prompt, e.g. `40% Complete`.
    pub progress_label: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl TutorialBookmark {
    #[must_use]
    pub fn new(section: Option<String>, scroll_position: f64, saved_at: DateTime<Utc>) -> Self {
        Self {
            section,
            scroll_position,
            exercise_code: None,
            progress_label: None,
            saved_at,
        }
    }

    #[must_use]
    pub fn with_exercise_code(mut self, code: impl Into<String>) -> Self {
        self.exercise_code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = Some(label.into());
        self
    }

    /// A bookmark is worth offering only if it points somewhere.
    #[must_use]
    pub fn is_resumable(&self) -> bool {
        self.section.as_deref().is_some_and(|s| !s.trim().is_empty()) || self.scroll_position > 0.0
    }
}
