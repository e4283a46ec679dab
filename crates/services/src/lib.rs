#![forbid(unsafe_code)]

pub mod app_services;
pub mod challenge;
pub mod debounce;
pub mod error;
pub mod evaluator;
pub mod lesson_tracker;
pub mod progress_store;
pub mod session_store;
pub mod tutorial;

pub use lesson_core::Clock;

pub use app_services::AppServices;
pub use challenge::{ChallengeKind, ChallengeWorkflow, SubmitOutcome};
pub use debounce::{Autosave, Debouncer};
pub use error::{AppServicesError, ChallengeError, ScanError};
pub use evaluator::{PreviewDocument, Requirement, RequirementSet};
pub use lesson_tracker::LessonTracker;
pub use progress_store::{Confirmation, ProgressStore};
pub use session_store::{Persistence, SessionStore};
pub use tutorial::TutorialBookmarks;
