use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lesson_core::catalog::TUTORIAL_AUTOSAVE;
use lesson_core::model::TutorialBookmark;
use lesson_core::time::Clock;
use storage::records::BookmarkSnapshot;
use tracing::debug;

use crate::debounce::Autosave;
use crate::session_store::SessionStore;

/// Label shown in the resume prompt, e.g. `40% Complete`.
#[must_use]
pub fn progress_label(active_section: u32, total_sections: u32) -> String {
    if total_sections == 0 {
        return "0% Complete".to_owned();
    }
    let percent = f64::from(active_section) / f64::from(total_sections) * 100.0;
    format!("{}% Complete", percent.round())
}

/// "Continue where you left off" state of a tutorial page.
pub struct TutorialBookmarks {
    key: String,
    clock: Clock,
    store: SessionStore,
    current: Mutex<Option<TutorialBookmark>>,
}

impl TutorialBookmarks {
    #[must_use]
    pub fn new(key: impl Into<String>, clock: Clock, store: SessionStore) -> Arc<Self> {
        Arc::new(Self {
            key: key.into(),
            clock,
            store,
            current: Mutex::new(None),
        })
    }

    /// Record the reader's position. Exercise code and label are kept.
    pub fn update(&self, section: Option<String>, scroll_position: f64) {
        let now = self.clock.now();
        let mut current = self.lock();
        match current.as_mut() {
            Some(bookmark) => {
                bookmark.section = section;
                bookmark.scroll_position = scroll_position;
            }
            None => *current = Some(TutorialBookmark::new(section, scroll_position, now)),
        }
    }

    pub fn set_exercise_code(&self, code: impl Into<String>) {
        let now = self.clock.now();
        let mut current = self.lock();
        let bookmark = current.take().unwrap_or_else(|| TutorialBookmark::new(None, 0.0, now));
        *current = Some(bookmark.with_exercise_code(code));
    }

    pub fn set_progress(&self, active_section: u32, total_sections: u32) {
        let now = self.clock.now();
        let mut current = self.lock();
        let bookmark = current.take().unwrap_or_else(|| TutorialBookmark::new(None, 0.0, now));
        *current = Some(bookmark.with_progress_label(progress_label(active_section, total_sections)));
    }

    /// Write the current position. Returns false when there is nothing to
    /// save or storage is unavailable.
    pub async fn save(&self) -> bool {
        let snapshot = {
            let mut current = self.lock();
            let Some(bookmark) = current.as_mut() else {
                return false;
            };
            bookmark.saved_at = self.clock.now();
            BookmarkSnapshot::from_bookmark(bookmark)
        };
        self.store.write(&self.key, &snapshot).await
    }

    /// The stored bookmark, if any. Adopted as the current position when
    /// nothing was recorded yet in this session.
    pub async fn restore(&self) -> Option<TutorialBookmark> {
        let bookmark = self
            .store
            .read::<BookmarkSnapshot>(&self.key)
            .await?
            .into_bookmark();
        let mut current = self.lock();
        if current.is_none() {
            *current = Some(bookmark.clone());
        }
        debug!(key = %self.key, section = ?bookmark.section, "bookmark restored");
        Some(bookmark)
    }

    /// "Start fresh": forget the stored and the current position.
    pub async fn dismiss(&self) -> bool {
        self.lock().take();
        self.store.remove(&self.key).await
    }

    #[must_use]
    pub fn current(&self) -> Option<TutorialBookmark> {
        self.lock().clone()
    }

    /// Save on the tutorial cadence until the handle is dropped.
    pub fn start_autosave(self: &Arc<Self>) -> Option<Autosave> {
        self.autosave_every(TUTORIAL_AUTOSAVE)
    }

    /// Save every `period` until the handle is dropped.
    pub fn autosave_every(self: &Arc<Self>, period: Duration) -> Option<Autosave> {
        let this = Arc::clone(self);
        Autosave::spawn(period, move || {
            let this = Arc::clone(&this);
            async move {
                this.save().await;
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<TutorialBookmark>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::time::{fixed_clock, fixed_now};
    use storage::repository::{InMemoryStore, KeyValueStore};

    const KEY: &str = "typography-tutorial-progress";

    fn bookmarks(kv: &InMemoryStore) -> Arc<TutorialBookmarks> {
        TutorialBookmarks::new(KEY, fixed_clock(), SessionStore::new(Arc::new(kv.clone())))
    }

    #[test]
    fn label_rounds_to_whole_percent() {
        assert_eq!(progress_label(2, 5), "40% Complete");
        assert_eq!(progress_label(1, 3), "33% Complete");
        assert_eq!(progress_label(0, 0), "0% Complete");
    }

    #[tokio::test]
    async fn nothing_to_save_before_any_update() {
        let kv = InMemoryStore::new();
        assert!(!bookmarks(&kv).save().await);
        assert_eq!(kv.get(KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn saved_bookmark_restores_in_next_session() {
        let kv = InMemoryStore::new();
        let first = bookmarks(&kv);
        first.update(Some("#hierarchy".into()), 640.0);
        first.set_exercise_code(".article-title { font-size: 2.5rem; }");
        first.set_progress(2, 5);
        assert!(first.save().await);

        let restored = bookmarks(&kv).restore().await.unwrap();
        assert_eq!(restored.section.as_deref(), Some("#hierarchy"));
        assert_eq!(restored.progress_label.as_deref(), Some("40% Complete"));
        assert_eq!(restored.saved_at, fixed_now());
        assert!(restored.is_resumable());
    }

    #[tokio::test]
    async fn malformed_bookmark_restores_nothing() {
        let kv = InMemoryStore::new();
        kv.set(KEY, r#"{"section": 12}"#).await.unwrap();
        assert_eq!(bookmarks(&kv).restore().await, None);
    }

    #[tokio::test]
    async fn dismiss_removes_the_bookmark() {
        let kv = InMemoryStore::new();
        let session = bookmarks(&kv);
        session.update(Some("#intro".into()), 10.0);
        session.save().await;

        assert!(session.dismiss().await);
        assert_eq!(session.current(), None);
        assert_eq!(bookmarks(&kv).restore().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn autosave_writes_latest_position() {
        let kv = InMemoryStore::new();
        let session = bookmarks(&kv);
        let _autosave = session.start_autosave().unwrap();

        session.update(Some("#spacing".into()), 120.0);
        tokio::time::sleep(Duration::from_millis(5_100)).await;

        let restored = bookmarks(&kv).restore().await.unwrap();
        assert_eq!(restored.section.as_deref(), Some("#spacing"));
    }
}
