use std::collections::BTreeSet;

use thiserror::Error;
use url::Url;

use crate::model::ids::{ExerciseIndex, SectionIndex, UnitId};

/// Share of a section that must be on screen before it counts as viewed.
pub const VISIBILITY_THRESHOLD: f32 = 0.5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("a lesson needs at least one section")]
    NoSections,

    #[error("section {index} is outside a lesson of {total} sections")]
    SectionOutOfRange { index: SectionIndex, total: u32 },
}

/// A viewport-intersection observation for one lesson section.
///
/// Produced by whatever watches the page (a browser observer, a test, the CLI)
/// and fed to [`LessonProgress::observe`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionVisibility {
    pub index: SectionIndex,
    /// Visible fraction of the section, in `0.0..=1.0`.
    pub ratio: f32,
}

impl SectionVisibility {
    #[must_use]
    pub fn new(index: SectionIndex, ratio: f32) -> Self {
        Self { index, ratio }
    }

    /// Fully visible section; convenient for callers that only know "seen".
    #[must_use]
    pub fn seen(index: SectionIndex) -> Self {
        Self { index, ratio: 1.0 }
    }

    #[must_use]
    pub fn is_intersecting(&self) -> bool {
        self.ratio >= VISIBILITY_THRESHOLD
    }
}

/// Reading state of a single lesson page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonProgress {
    furthest_section: SectionIndex,
    total_sections: u32,
    exercises_viewed: BTreeSet<ExerciseIndex>,
    time_spent_secs: u64,
}

impl LessonProgress {
    /// # Errors
    ///
    /// Returns `LessonError::NoSections` if `total_sections` is zero.
    pub fn new(total_sections: u32) -> Result<Self, LessonError> {
        if total_sections == 0 {
            return Err(LessonError::NoSections);
        }
        Ok(Self {
            furthest_section: SectionIndex::new(0),
            total_sections,
            exercises_viewed: BTreeSet::new(),
            time_spent_secs: 0,
        })
    }

    /// Rehydrate from persisted fields.
    ///
    /// # Errors
    ///
    /// Returns `LessonError` if the furthest section does not fit the lesson.
    pub fn from_persisted(
        total_sections: u32,
        furthest_section: SectionIndex,
        exercises_viewed: impl IntoIterator<Item = ExerciseIndex>,
        time_spent_secs: u64,
    ) -> Result<Self, LessonError> {
        let mut progress = Self::new(total_sections)?;
        if furthest_section.value() >= total_sections {
            return Err(LessonError::SectionOutOfRange {
                index: furthest_section,
                total: total_sections,
            });
        }
        progress.furthest_section = furthest_section;
        progress.exercises_viewed = exercises_viewed.into_iter().collect();
        progress.time_spent_secs = time_spent_secs;
        Ok(progress)
    }

    /// Apply a visibility observation. Returns true if the furthest section moved.
    ///
    /// Observations below the threshold and sections past the end are ignored.
    pub fn observe(&mut self, visibility: SectionVisibility) -> bool {
        if !visibility.is_intersecting() || visibility.index.value() >= self.total_sections {
            return false;
        }
        if visibility.index > self.furthest_section {
            self.furthest_section = visibility.index;
            return true;
        }
        false
    }

    /// Record that the solution of `exercise` was revealed. Returns true the first time.
    pub fn reveal_solution(&mut self, exercise: ExerciseIndex) -> bool {
        self.exercises_viewed.insert(exercise)
    }

    pub fn tick(&mut self, secs: u64) {
        self.time_spent_secs = self.time_spent_secs.saturating_add(secs);
    }

    /// Reading progress in percent, counting the furthest section as read.
    #[must_use]
    pub fn percent(&self) -> f64 {
        f64::from(self.furthest_section.value() + 1) / f64::from(self.total_sections) * 100.0
    }

    #[must_use]
    pub fn furthest_section(&self) -> SectionIndex {
        self.furthest_section
    }

    #[must_use]
    pub fn total_sections(&self) -> u32 {
        self.total_sections
    }

    pub fn exercises_viewed(&self) -> impl Iterator<Item = ExerciseIndex> + '_ {
        self.exercises_viewed.iter().copied()
    }

    #[must_use]
    pub fn exercises_viewed_count(&self) -> u32 {
        u32::try_from(self.exercises_viewed.len()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn time_spent_secs(&self) -> u64 {
        self.time_spent_secs
    }

    /// Whole minutes spent, as shown on the completion dialog.
    #[must_use]
    pub fn time_spent_mins(&self) -> u64 {
        self.time_spent_secs / 60
    }
}

/// Extract the lesson number from a lesson page address such as
/// `https://example.org/lessons/lesson3/index.html`.
///
/// Falls back to lesson 1 when the path carries no `lessonN` segment.
#[must_use]
pub fn lesson_from_url(url: &Url) -> UnitId {
    lesson_from_path(url.path())
}

/// Lesson number of a page given either as a full address or as a bare path.
#[must_use]
pub fn lesson_from_page(page: &str) -> UnitId {
    Url::parse(page).map_or_else(|_| lesson_from_path(page), |url| lesson_from_url(&url))
}

/// Path-only variant of [`lesson_from_url`].
#[must_use]
pub fn lesson_from_path(path: &str) -> UnitId {
    path.match_indices("lesson")
        .find_map(|(at, word)| {
            let digits: String = path[at + word.len()..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            digits.parse::<UnitId>().ok()
        })
        .unwrap_or(UnitId::FIRST)
}
