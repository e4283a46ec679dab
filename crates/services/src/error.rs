use lesson_core::model::{LessonError, ProgressError};
use storage::sqlite::SqliteInitError;
use thiserror::Error;

/// Why a single requirement could not inspect the preview.
///
/// Never escapes evaluation: the requirement is recorded as failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScanError {
    #[error("selector `{0}` is not supported")]
    InvalidSelector(String),

    #[error("stylesheet `{href}` cannot be read from the preview")]
    StyleAccessDenied { href: String },

    #[error("no element matches `{0}`")]
    MissingElement(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChallengeError {
    #[error("unknown challenge `{0}`")]
    UnknownChallenge(String),

    #[error("challenge `{0}` is not part of this site")]
    NotOnSite(String),
}

/// Errors surfaced while assembling services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),

    #[error(transparent)]
    Progress(#[from] ProgressError),

    #[error(transparent)]
    Lesson(#[from] LessonError),

    #[error(transparent)]
    Challenge(#[from] ChallengeError),
}
