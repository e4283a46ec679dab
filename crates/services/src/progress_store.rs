use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lesson_core::model::{CompletionOutcome, ProgressError, ProgressRecord, UnitId, UnitState};
use lesson_core::time::Clock;
use storage::records::ProgressSnapshot;
use tracing::{debug, info, warn};

use crate::debounce::Debouncer;
use crate::session_store::{Persistence, SessionStore};

/// Explicit user answer to a destructive prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

//
// ─── PROGRESS STORE ────────────────────────────────────────────────────────────
//

/// Session owner of one learning path's `ProgressRecord`.
///
/// Mutations apply in memory immediately and schedule a debounced save;
/// `flush` writes at once (page unload). Storage failures never reach the
/// caller: the session keeps working in memory.
///
/// Writes and resets are serialized, so a save that started before a reset
/// can never land after it.
pub struct ProgressStore {
    key: String,
    clock: Clock,
    store: SessionStore,
    record: Mutex<ProgressRecord>,
    debouncer: Debouncer,
    persist: tokio::sync::Mutex<()>,
    /// Bumped by every reset; debounced saves from an older generation are dropped.
    generation: AtomicU64,
}

impl ProgressStore {
    /// Restore the record stored under `key`, or start fresh.
    ///
    /// Absent, unparseable or inconsistent stored values all yield the
    /// default record.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::EmptyPath` if `total_units` is zero. Stored data
    /// never causes an error.
    pub async fn load(
        key: impl Into<String>,
        total_units: u32,
        clock: Clock,
        store: SessionStore,
        save_delay: Duration,
    ) -> Result<Arc<Self>, ProgressError> {
        let key = key.into();
        let fresh = ProgressRecord::new(total_units)?;

        let record = match store.read::<ProgressSnapshot>(&key).await {
            None => fresh,
            Some(snapshot) => match snapshot.into_record(total_units) {
                Ok(record) => record,
                Err(err) => {
                    warn!(key = %key, error = %err, "stored progress is inconsistent; starting fresh");
                    fresh
                }
            },
        };
        debug!(
            key = %key,
            step = %record.current_step(),
            completed = record.completed_count(),
            "progress loaded"
        );

        Ok(Arc::new(Self {
            key,
            clock,
            store,
            record: Mutex::new(record),
            debouncer: Debouncer::new(save_delay),
            persist: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
        }))
    }

    /// Mark `unit` complete and schedule a save if anything changed.
    pub fn mark_unit_complete(self: &Arc<Self>, unit: UnitId) -> CompletionOutcome {
        let outcome = self.lock().mark_unit_complete(unit);
        self.after_completion(unit, outcome);
        outcome
    }

    /// Mark `unit` complete and, only on its first completion, add `by` to
    /// the named counter in the same update.
    pub fn complete_with_counter(
        self: &Arc<Self>,
        unit: UnitId,
        counter: &str,
        by: u32,
    ) -> CompletionOutcome {
        let outcome = {
            let mut record = self.lock();
            let outcome = record.mark_unit_complete(unit);
            if outcome.is_change() && by > 0 {
                record.increment_counter(counter, by);
            }
            outcome
        };
        self.after_completion(unit, outcome);
        outcome
    }

    /// Add `by` to a named counter and schedule a save.
    pub fn increment_counter(self: &Arc<Self>, name: &str, by: u32) -> u32 {
        let value = self.lock().increment_counter(name, by);
        self.schedule_save();
        value
    }

    /// Write the current record now. Returns true if it reached storage.
    pub async fn save(&self) -> bool {
        let _persist = self.persist.lock().await;
        self.write_current().await
    }

    async fn save_scheduled(&self, generation: u64) {
        let _persist = self.persist.lock().await;
        if self.generation.load(Ordering::Acquire) != generation {
            debug!(key = %self.key, "scheduled save dropped after reset");
            return;
        }
        self.write_current().await;
    }

    /// Caller holds `persist`.
    async fn write_current(&self) -> bool {
        let now = self.clock.now();
        let snapshot = {
            let mut staged = self.lock().clone();
            staged.mark_saved(now);
            ProgressSnapshot::from_record(&staged)
        };
        let saved = self.store.write(&self.key, &snapshot).await;
        if saved {
            self.lock().mark_saved(now);
        }
        saved
    }

    /// Drop any pending debounced save and write immediately.
    pub async fn flush(&self) -> bool {
        self.debouncer.cancel();
        self.save().await
    }

    /// Forget all progress, in memory and in storage, once the user confirmed.
    ///
    /// Returns true if the reset happened.
    pub async fn reset(&self, confirmation: Confirmation) -> bool {
        if confirmation != Confirmation::Confirmed {
            return false;
        }
        let _persist = self.persist.lock().await;
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.debouncer.cancel();
        {
            let mut record = self.lock();
            let total = record.total_units();
            // `total` came from an existing record, so it is never zero.
            if let Ok(fresh) = ProgressRecord::new(total) {
                *record = fresh;
            }
        }
        self.store.remove(&self.key).await;
        info!(key = %self.key, "progress reset");
        true
    }

    #[must_use]
    pub fn is_unlocked(&self, unit: UnitId) -> bool {
        self.lock().is_unlocked(unit)
    }

    #[must_use]
    pub fn unit_states(&self) -> Vec<(UnitId, UnitState)> {
        self.lock().unit_states()
    }

    /// Completed share of the path, in percent.
    #[must_use]
    pub fn percent(&self) -> f64 {
        self.lock().percent()
    }

    /// Copy of the in-memory record.
    #[must_use]
    pub fn snapshot(&self) -> ProgressRecord {
        self.lock().clone()
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn persistence(&self) -> Persistence {
        self.store.persistence()
    }

    #[must_use]
    pub fn has_pending_save(&self) -> bool {
        self.debouncer.is_pending()
    }

    fn after_completion(self: &Arc<Self>, unit: UnitId, outcome: CompletionOutcome) {
        match outcome {
            CompletionOutcome::Completed { current_step } => {
                info!(key = %self.key, %unit, %current_step, "unit completed");
                self.schedule_save();
            }
            CompletionOutcome::AlreadyComplete => {}
            CompletionOutcome::Locked | CompletionOutcome::OutOfRange => {
                debug!(key = %self.key, %unit, ?outcome, "completion refused");
            }
        }
    }

    fn schedule_save(self: &Arc<Self>) {
        let this = Arc::clone(self);
        let generation = self.generation.load(Ordering::Acquire);
        self.debouncer.schedule(async move {
            this.save_scheduled(generation).await;
        });
    }

    fn lock(&self) -> MutexGuard<'_, ProgressRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lesson_core::time::fixed_clock;
    use storage::repository::{InMemoryStore, KeyValueStore, StorageError};
    use tokio::sync::{Notify, Semaphore};

    const KEY: &str = "selenium-learning-progress";

    /// Holds every `set` until a permit is released, to keep a write in flight.
    #[derive(Clone)]
    struct GatedStore {
        inner: InMemoryStore,
        entered: Arc<Notify>,
        release: Arc<Semaphore>,
    }

    impl GatedStore {
        fn new(inner: InMemoryStore) -> Self {
            Self {
                inner,
                entered: Arc::new(Notify::new()),
                release: Arc::new(Semaphore::new(0)),
            }
        }
    }

    #[async_trait]
    impl KeyValueStore for GatedStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.entered.notify_one();
            let permit = self
                .release
                .acquire()
                .await
                .map_err(|_| StorageError::Disabled)?;
            permit.forget();
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key).await
        }

        async fn keys(&self) -> Result<Vec<String>, StorageError> {
            self.inner.keys().await
        }
    }

    async fn open(kv: &InMemoryStore) -> Arc<ProgressStore> {
        ProgressStore::load(
            KEY,
            6,
            fixed_clock(),
            SessionStore::new(Arc::new(kv.clone())),
            Duration::from_millis(500),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn absent_storage_gives_default_record() {
        let store = open(&InMemoryStore::new()).await;
        assert_eq!(store.snapshot(), ProgressRecord::new(6).unwrap());
        assert!(store.is_unlocked(UnitId::FIRST));
        assert!(!store.is_unlocked(UnitId::new(2)));
    }

    #[tokio::test]
    async fn corrupt_value_gives_default_record() {
        let kv = InMemoryStore::new();
        kv.set(KEY, "definitely not json").await.unwrap();
        let store = open(&kv).await;
        assert_eq!(store.snapshot(), ProgressRecord::new(6).unwrap());
        assert_eq!(store.persistence(), Persistence::Durable);
    }

    #[tokio::test]
    async fn inconsistent_value_gives_default_record() {
        let kv = InMemoryStore::new();
        kv.set(KEY, r#"{"currentStep":5,"completedUnits":[1,3]}"#)
            .await
            .unwrap();
        let store = open(&kv).await;
        assert_eq!(store.snapshot().completed_count(), 0);
    }

    #[tokio::test]
    async fn save_then_load_reconstructs_record() {
        let kv = InMemoryStore::new();
        let store = open(&kv).await;
        store.mark_unit_complete(UnitId::new(1));
        store.increment_counter("exercises", 2);
        assert!(store.flush().await);

        let reopened = open(&kv).await;
        assert_eq!(reopened.snapshot(), store.snapshot());
        assert!(reopened.snapshot().saved_at().is_some());
    }

    #[tokio::test]
    async fn declined_reset_keeps_progress() {
        let kv = InMemoryStore::new();
        let store = open(&kv).await;
        store.mark_unit_complete(UnitId::new(1));
        store.flush().await;

        assert!(!store.reset(Confirmation::Declined).await);
        assert_eq!(store.snapshot().completed_count(), 1);

        assert!(store.reset(Confirmation::Confirmed).await);
        assert_eq!(store.snapshot().completed_count(), 0);
        assert_eq!(kv.get(KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn reset_waits_for_a_write_in_flight() {
        let kv = InMemoryStore::new();
        let gated = GatedStore::new(kv.clone());
        let store = ProgressStore::load(
            KEY,
            6,
            fixed_clock(),
            SessionStore::new(Arc::new(gated.clone())),
            Duration::from_millis(500),
        )
        .await
        .unwrap();
        store.mark_unit_complete(UnitId::new(1));

        let saving = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.save().await }
        });
        gated.entered.notified().await;

        let resetting = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.reset(Confirmation::Confirmed).await }
        });
        tokio::task::yield_now().await;
        gated.release.add_permits(1);

        assert!(saving.await.unwrap());
        assert!(resetting.await.unwrap());
        assert_eq!(kv.get(KEY).await.unwrap(), None);
        assert_eq!(store.snapshot().completed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_save_is_dropped_by_reset() {
        let kv = InMemoryStore::new();
        let store = open(&kv).await;
        store.mark_unit_complete(UnitId::new(1));
        assert!(store.has_pending_save());

        assert!(store.reset(Confirmation::Confirmed).await);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(kv.get(KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn counter_moves_only_on_first_completion() {
        let store = open(&InMemoryStore::new()).await;
        store.complete_with_counter(UnitId::new(1), "exercises", 2);
        store.complete_with_counter(UnitId::new(1), "exercises", 2);
        assert_eq!(store.snapshot().counter("exercises"), 2);
    }

    #[tokio::test]
    async fn refused_completion_schedules_nothing() {
        let store = open(&InMemoryStore::new()).await;
        assert_eq!(
            store.mark_unit_complete(UnitId::new(4)),
            CompletionOutcome::Locked
        );
        assert!(!store.has_pending_save());
    }
}
