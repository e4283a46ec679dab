use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lesson_core::catalog::{EXERCISES_COUNTER, LESSON_TICK};
use lesson_core::model::{
    CompletionOutcome, ExerciseIndex, LessonError, LessonProgress, SectionVisibility, UnitId,
};
use storage::records::LessonSnapshot;
use tracing::{debug, info, warn};

use crate::debounce::Autosave;
use crate::progress_store::ProgressStore;
use crate::session_store::SessionStore;

/// Reading state of one open lesson page, plus the hand-off to the path
/// progress when the lesson is finished.
pub struct LessonTracker {
    lesson: UnitId,
    key: String,
    store: SessionStore,
    progress: Mutex<LessonProgress>,
    /// Elapsed time not yet counted, always under one second.
    carry: Mutex<Duration>,
    path: Arc<ProgressStore>,
}

impl LessonTracker {
    /// Restore the stored state of `lesson`, or start at its first section.
    ///
    /// State stored for a different section count is discarded.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::NoSections` if the page has no sections.
    pub async fn load(
        lesson: UnitId,
        total_sections: u32,
        base_key: &str,
        store: SessionStore,
        path: Arc<ProgressStore>,
    ) -> Result<Arc<Self>, LessonError> {
        let key = format!("{base_key}-{lesson}");
        let fresh = LessonProgress::new(total_sections)?;

        let progress = match store.read::<LessonSnapshot>(&key).await {
            None => fresh,
            Some(snapshot) if snapshot.total_sections != total_sections => {
                debug!(key = %key, stored = snapshot.total_sections, total_sections, "lesson layout changed; starting fresh");
                fresh
            }
            Some(snapshot) => snapshot.into_progress().unwrap_or_else(|err| {
                warn!(key = %key, error = %err, "stored lesson progress is inconsistent; starting fresh");
                fresh
            }),
        };

        Ok(Arc::new(Self {
            lesson,
            key,
            store,
            progress: Mutex::new(progress),
            carry: Mutex::new(Duration::ZERO),
            path,
        }))
    }

    #[must_use]
    pub fn lesson(&self) -> UnitId {
        self.lesson
    }

    /// Feed a section visibility change. Kept in memory until the next tick.
    pub fn observe(&self, visibility: SectionVisibility) -> bool {
        self.lock().observe(visibility)
    }

    /// Record a revealed solution and save right away the first time.
    pub async fn reveal_solution(&self, exercise: ExerciseIndex) -> bool {
        let first = self.lock().reveal_solution(exercise);
        if first {
            debug!(lesson = %self.lesson, %exercise, "solution revealed");
            self.save().await;
        }
        first
    }

    /// Count `secs` of reading time and save.
    pub async fn tick(&self, secs: u64) {
        self.lock().tick(secs);
        self.save().await;
    }

    /// Count `elapsed` wall time and save. Whole seconds go to the lesson;
    /// the remainder is kept for the next call.
    pub async fn elapse(&self, elapsed: Duration) {
        let secs = {
            let mut carry = self.carry.lock().unwrap_or_else(PoisonError::into_inner);
            let total = *carry + elapsed;
            let whole = Duration::from_secs(total.as_secs());
            *carry = total - whole;
            whole.as_secs()
        };
        self.lock().tick(secs);
        self.save().await;
    }

    /// Tick on the lesson cadence until the handle is dropped.
    pub fn start_ticking(self: &Arc<Self>) -> Option<Autosave> {
        self.tick_every(LESSON_TICK)
    }

    /// Count `period` every `period` in the background until the handle is dropped.
    pub fn tick_every(self: &Arc<Self>, period: Duration) -> Option<Autosave> {
        let this = Arc::clone(self);
        Autosave::spawn(period, move || {
            let this = Arc::clone(&this);
            async move { this.elapse(period).await }
        })
    }

    /// Mark the lesson complete on the learning path.
    ///
    /// Revealed exercises are added to the path's exercise count on the
    /// first completion only. The path is written immediately.
    pub async fn complete_lesson(&self) -> CompletionOutcome {
        let viewed = self.lock().exercises_viewed_count();
        let outcome = self
            .path
            .complete_with_counter(self.lesson, EXERCISES_COUNTER, viewed);
        if outcome.is_change() {
            info!(lesson = %self.lesson, exercises = viewed, "lesson finished");
        }
        self.path.flush().await;
        self.save().await;
        outcome
    }

    /// Write the lesson state now. Returns true if it reached storage.
    pub async fn save(&self) -> bool {
        let snapshot = LessonSnapshot::from_progress(&self.lock());
        self.store.write(&self.key, &snapshot).await
    }

    #[must_use]
    pub fn snapshot(&self) -> LessonProgress {
        self.lock().clone()
    }

    #[must_use]
    pub fn percent(&self) -> f64 {
        self.lock().percent()
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    fn lock(&self) -> MutexGuard<'_, LessonProgress> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::model::SectionIndex;
    use lesson_core::time::fixed_clock;
    use storage::repository::InMemoryStore;

    async fn open(kv: &InMemoryStore, lesson: u32) -> Arc<LessonTracker> {
        let store = SessionStore::new(Arc::new(kv.clone()));
        let path = ProgressStore::load(
            "selenium-learning-progress",
            6,
            fixed_clock(),
            store.clone(),
            Duration::from_millis(500),
        )
        .await
        .unwrap();
        LessonTracker::load(UnitId::new(lesson), 4, "current-lesson-progress", store, path)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn observations_below_threshold_are_ignored() {
        let tracker = open(&InMemoryStore::new(), 1).await;
        assert!(!tracker.observe(SectionVisibility::new(SectionIndex::new(2), 0.3)));
        assert!(tracker.observe(SectionVisibility::new(SectionIndex::new(2), 0.5)));
        assert!(!tracker.observe(SectionVisibility::seen(SectionIndex::new(1))));
        assert!((tracker.percent() - 75.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn state_survives_reload() {
        let kv = InMemoryStore::new();
        let tracker = open(&kv, 1).await;
        tracker.observe(SectionVisibility::seen(SectionIndex::new(1)));
        assert!(tracker.reveal_solution(ExerciseIndex::new(0)).await);
        assert!(!tracker.reveal_solution(ExerciseIndex::new(0)).await);
        tracker.tick(3).await;

        let reopened = open(&kv, 1).await;
        assert_eq!(reopened.snapshot(), tracker.snapshot());
        assert_eq!(reopened.snapshot().time_spent_secs(), 3);
    }

    #[tokio::test]
    async fn completion_adds_exercises_once() {
        let kv = InMemoryStore::new();
        let tracker = open(&kv, 1).await;
        tracker.reveal_solution(ExerciseIndex::new(0)).await;
        tracker.reveal_solution(ExerciseIndex::new(1)).await;

        assert!(tracker.complete_lesson().await.is_change());
        assert_eq!(
            tracker.complete_lesson().await,
            CompletionOutcome::AlreadyComplete
        );

        let path = tracker.path.snapshot();
        assert_eq!(path.counter(EXERCISES_COUNTER), 2);
        assert_eq!(path.current_step(), UnitId::new(2));
    }

    #[tokio::test]
    async fn locked_lesson_cannot_be_completed() {
        let tracker = open(&InMemoryStore::new(), 3).await;
        assert_eq!(tracker.complete_lesson().await, CompletionOutcome::Locked);
        assert_eq!(tracker.path.snapshot().completed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn ticking_accumulates_time() {
        let tracker = open(&InMemoryStore::new(), 1).await;
        let ticker = tracker.start_ticking().unwrap();
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        ticker.stop();
        assert_eq!(tracker.snapshot().time_spent_secs(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn sub_second_periods_add_up_to_wall_time() {
        let tracker = open(&InMemoryStore::new(), 1).await;
        let ticker = tracker.tick_every(Duration::from_millis(250)).unwrap();
        tokio::time::sleep(Duration::from_millis(2_100)).await;
        ticker.stop();
        assert_eq!(tracker.snapshot().time_spent_secs(), 2);
    }

    #[tokio::test]
    async fn elapsed_remainder_carries_over() {
        let tracker = open(&InMemoryStore::new(), 1).await;
        tracker.elapse(Duration::from_millis(700)).await;
        assert_eq!(tracker.snapshot().time_spent_secs(), 0);
        tracker.elapse(Duration::from_millis(700)).await;
        assert_eq!(tracker.snapshot().time_spent_secs(), 1);
        tracker.elapse(Duration::from_millis(2_600)).await;
        assert_eq!(tracker.snapshot().time_spent_secs(), 4);
    }
}
