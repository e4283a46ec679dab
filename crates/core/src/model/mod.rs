mod bookmark;
mod challenge;
mod ids;
pub mod lesson;
mod progress;
mod requirement;

pub use bookmark::TutorialBookmark;
pub use challenge::{ChallengeCode, ChallengeDraft, ChallengeId, ChallengeSolution};
pub use ids::{ExerciseIndex, ParseIdError, SectionIndex, UnitId};
pub use lesson::{
    LessonError, LessonProgress, SectionVisibility, lesson_from_page, lesson_from_path,
    lesson_from_url,
};
pub use progress::{CompletionOutcome, ProgressError, ProgressRecord, UnitState};
pub use requirement::{RequirementId, RequirementOutcome, RequirementReport};
