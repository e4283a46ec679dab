use std::time::Duration;

use lesson_core::Site;
use lesson_core::catalog::{EXERCISES_COUNTER, PROGRESS_SAVE_DELAY};
use lesson_core::model::{
    CompletionOutcome, ExerciseIndex, SectionIndex, SectionVisibility, UnitId, UnitState,
};
use lesson_core::time::fixed_clock;
use services::{AppServices, ChallengeKind, Confirmation, Persistence, SubmitOutcome};
use storage::repository::{InMemoryStore, KeyValueStore, Storage};

async fn open(kv: &InMemoryStore, site: Site) -> AppServices {
    AppServices::from_storage(
        &Storage::from_store(kv.clone()),
        site,
        fixed_clock(),
        PROGRESS_SAVE_DELAY,
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn first_lesson_unlocks_the_second() {
    let kv = InMemoryStore::new();
    let services = open(&kv, Site::Selenium).await;
    let path = services.path();

    assert_eq!(
        path.mark_unit_complete(UnitId::new(1)),
        CompletionOutcome::Completed {
            current_step: UnitId::new(2)
        }
    );
    let record = path.snapshot();
    assert_eq!(record.completed_units().collect::<Vec<_>>(), vec![UnitId::new(1)]);
    assert_eq!(record.current_step(), UnitId::new(2));
    assert!(path.is_unlocked(UnitId::new(2)));
    assert!(!path.is_unlocked(UnitId::new(3)));

    let states = path.unit_states();
    assert_eq!(states[0].1, UnitState::Completed);
    assert_eq!(states[1].1, UnitState::Active);
    assert_eq!(states[2].1, UnitState::Locked);
}

#[tokio::test]
async fn completing_twice_equals_once() {
    let services = open(&InMemoryStore::new(), Site::Selenium).await;
    let path = services.path();
    path.mark_unit_complete(UnitId::new(1));
    path.mark_unit_complete(UnitId::new(2));
    let once = path.snapshot();

    assert_eq!(
        path.mark_unit_complete(UnitId::new(2)),
        CompletionOutcome::AlreadyComplete
    );
    assert_eq!(path.snapshot(), once);
}

#[tokio::test(start_paused = true)]
async fn debounced_save_reaches_the_next_session() {
    let kv = InMemoryStore::new();
    let services = open(&kv, Site::Selenium).await;
    services.path().mark_unit_complete(UnitId::new(1));

    assert_eq!(kv.get("selenium-learning-progress").await.unwrap(), None);
    tokio::time::sleep(PROGRESS_SAVE_DELAY + Duration::from_millis(50)).await;

    let next = open(&kv, Site::Selenium).await;
    assert_eq!(next.path().snapshot().completed_count(), 1);
}

#[tokio::test]
async fn lesson_page_feeds_the_path() {
    let kv = InMemoryStore::new();
    let services = open(&kv, Site::Selenium).await;
    let lesson = services.lesson(UnitId::new(1), 5).await.unwrap();

    for index in 0..5 {
        lesson.observe(SectionVisibility::seen(SectionIndex::new(index)));
    }
    lesson.reveal_solution(ExerciseIndex::new(0)).await;
    assert!((lesson.percent() - 100.0).abs() < f64::EPSILON);

    lesson.complete_lesson().await;

    let next = open(&kv, Site::Selenium).await;
    let record = next.path().snapshot();
    assert_eq!(record.counter(EXERCISES_COUNTER), 1);
    assert!(next.path().is_unlocked(UnitId::new(2)));
}

#[tokio::test]
async fn full_storage_degrades_without_errors() {
    let kv = InMemoryStore::with_quota(16);
    let services = open(&kv, Site::Selenium).await;
    let path = services.path();

    path.mark_unit_complete(UnitId::new(1));
    assert!(!path.flush().await);
    assert_eq!(services.persistence(), Persistence::Degraded);

    // The session keeps working in memory.
    path.mark_unit_complete(UnitId::new(2));
    assert_eq!(path.snapshot().completed_count(), 2);
    assert!(path.is_unlocked(UnitId::new(3)));
}

#[tokio::test]
async fn disabled_storage_starts_from_defaults() {
    let services = open(&InMemoryStore::disabled(), Site::Selenium).await;
    assert_eq!(services.path().snapshot().completed_count(), 0);
    assert_eq!(services.persistence(), Persistence::Degraded);
}

#[tokio::test]
async fn confirmed_reset_forgets_everything() {
    let kv = InMemoryStore::new();
    let services = open(&kv, Site::Selenium).await;
    let path = services.path();
    path.mark_unit_complete(UnitId::new(1));
    path.flush().await;

    assert!(path.reset(Confirmation::Confirmed).await);

    let next = open(&kv, Site::Selenium).await;
    assert_eq!(next.path().snapshot().completed_count(), 0);
    assert!(!next.path().is_unlocked(UnitId::new(2)));
}

#[tokio::test]
async fn hig_challenges_unlock_in_order() {
    let kv = InMemoryStore::new();
    let services = open(&kv, Site::Hig).await;

    let settings = services.challenge(ChallengeKind::SettingsPage).unwrap();
    let early = settings.submit(&ChallengeKind::SettingsPage.starter()).await;
    assert!(matches!(
        early,
        SubmitOutcome::Accepted {
            completion: Some(CompletionOutcome::Locked),
            ..
        }
    ));

    let typography = services.challenge(ChallengeKind::Typography).unwrap();
    assert!(typography.submit(&ChallengeKind::Typography.starter()).await.is_accepted());
    let late = settings.submit(&ChallengeKind::SettingsPage.starter()).await;
    assert!(matches!(
        late,
        SubmitOutcome::Accepted {
            completion: Some(CompletionOutcome::Completed { .. }),
            ..
        }
    ));

    let next = open(&kv, Site::Hig).await;
    assert!(next.path().snapshot().is_finished());
}

#[tokio::test]
async fn tutorial_bookmark_round_trips_through_services() {
    let kv = InMemoryStore::new();
    let services = open(&kv, Site::Selenium).await;
    let tutorial = services.tutorial();
    tutorial.update(Some("#locators".into()), 900.0);
    tutorial.set_progress(3, 6);
    assert!(tutorial.save().await);

    let restored = open(&kv, Site::Selenium)
        .await
        .tutorial()
        .restore()
        .await
        .unwrap();
    assert_eq!(restored.progress_label.as_deref(), Some("50% Complete"));
    assert!(kv.get("selenium-tutorial-progress").await.unwrap().is_some());
}
