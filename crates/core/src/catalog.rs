//! Fixed facts about the two learning sites: storage keys, path lengths and timers.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::model::{ChallengeId, UnitId};

/// Counter on the site path record that sums exercises across completed lessons.
pub const EXERCISES_COUNTER: &str = "exercises";

/// Quiet period before a progress mutation is written.
pub const PROGRESS_SAVE_DELAY: Duration = Duration::from_millis(500);

/// Quiet period before a challenge draft is written.
pub const DRAFT_SAVE_DELAY: Duration = Duration::from_millis(1000);

/// Lesson pages count time and persist on this cadence.
pub const LESSON_TICK: Duration = Duration::from_secs(1);

/// Tutorial pages autosave their bookmark on this cadence.
pub const TUTORIAL_AUTOSAVE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Site {
    /// Selenium learning site: six lessons unlocked in order.
    Selenium,
    /// Apple HIG site: design challenges unlocked in order.
    Hig,
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Site::Selenium => f.write_str("selenium"),
            Site::Hig => f.write_str("hig"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSite(pub String);

impl fmt::Display for UnknownSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown site: {}", self.0)
    }
}

impl std::error::Error for UnknownSite {}

impl FromStr for Site {
    type Err = UnknownSite;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "selenium" => Ok(Site::Selenium),
            "hig" | "apple-hig" => Ok(Site::Hig),
            other => Err(UnknownSite(other.to_owned())),
        }
    }
}

/// Static description of one site's tracked concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteCatalog {
    pub site: Site,
    /// Storage key of the site-wide learning path record.
    pub path_key: &'static str,
    pub total_units: u32,
    /// Denominator shown next to the exercise counter.
    pub exercise_total: u32,
    /// Storage key of the lesson page currently being read.
    pub lesson_key: &'static str,
    /// Storage key of the tutorial bookmark.
    pub tutorial_key: &'static str,
    /// Challenges in unlock order; empty for sites without challenges.
    pub challenges: &'static [&'static str],
}

static SELENIUM: SiteCatalog = SiteCatalog {
    site: Site::Selenium,
    path_key: "selenium-learning-progress",
    total_units: 6,
    exercise_total: 12,
    lesson_key: "current-lesson-progress",
    tutorial_key: "selenium-tutorial-progress",
    challenges: &[],
};

static HIG: SiteCatalog = SiteCatalog {
    site: Site::Hig,
    path_key: "hig-tutorial-path",
    total_units: 2,
    exercise_total: 0,
    lesson_key: "hig-lesson-progress",
    tutorial_key: "typography-tutorial-progress",
    challenges: &["typography", "settings-page"],
};

impl SiteCatalog {
    #[must_use]
    pub fn for_site(site: Site) -> &'static SiteCatalog {
        match site {
            Site::Selenium => &SELENIUM,
            Site::Hig => &HIG,
        }
    }

    /// Position of a challenge on this site's path, if it has one.
    #[must_use]
    pub fn challenge_unit(&self, challenge: &ChallengeId) -> Option<UnitId> {
        self.challenges
            .iter()
            .position(|id| *id == challenge.as_str())
            .and_then(|index| u32::try_from(index + 1).ok())
            .map(UnitId::new)
    }
}

/// Storage key of a challenge's autosaved draft (`challenge-settings-progress`).
#[must_use]
pub fn challenge_draft_key(challenge: &ChallengeId) -> String {
    format!("challenge-{}-progress", challenge_slug(challenge))
}

/// Storage key of a challenge's accepted solution (`challenge-settings-solution`).
#[must_use]
pub fn challenge_solution_key(challenge: &ChallengeId) -> String {
    format!("challenge-{}-solution", challenge_slug(challenge))
}

fn challenge_slug(challenge: &ChallengeId) -> &str {
    let id = challenge.as_str();
    id.strip_suffix("-page").unwrap_or(id)
}
