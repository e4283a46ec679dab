use std::sync::Arc;
use std::time::Duration;

use lesson_core::catalog::{DRAFT_SAVE_DELAY, Site, SiteCatalog};
use lesson_core::model::UnitId;
use storage::repository::Storage;

use crate::Clock;
use crate::challenge::{ChallengeKind, ChallengeWorkflow};
use crate::error::AppServicesError;
use crate::lesson_tracker::LessonTracker;
use crate::progress_store::ProgressStore;
use crate::session_store::{Persistence, SessionStore};
use crate::tutorial::TutorialBookmarks;

/// Assembles the services of one site session over a shared store.
#[derive(Clone)]
pub struct AppServices {
    catalog: &'static SiteCatalog,
    clock: Clock,
    store: SessionStore,
    path: Arc<ProgressStore>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(
        db_url: &str,
        site: Site,
        clock: Clock,
        save_delay: Duration,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(&storage, site, clock, save_delay).await
    }

    /// Build services over any storage backend.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Progress` if the site catalog describes an
    /// empty path.
    pub async fn from_storage(
        storage: &Storage,
        site: Site,
        clock: Clock,
        save_delay: Duration,
    ) -> Result<Self, AppServicesError> {
        let catalog = SiteCatalog::for_site(site);
        let store = SessionStore::from_storage(storage);
        let path = ProgressStore::load(
            catalog.path_key,
            catalog.total_units,
            clock,
            store.clone(),
            save_delay,
        )
        .await?;
        Ok(Self {
            catalog,
            clock,
            store,
            path,
        })
    }

    #[must_use]
    pub fn catalog(&self) -> &'static SiteCatalog {
        self.catalog
    }

    #[must_use]
    pub fn path(&self) -> Arc<ProgressStore> {
        Arc::clone(&self.path)
    }

    #[must_use]
    pub fn persistence(&self) -> Persistence {
        self.store.persistence()
    }

    /// Open the tracker of a lesson page with `total_sections` sections.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Lesson` if the page has no sections.
    pub async fn lesson(
        &self,
        lesson: UnitId,
        total_sections: u32,
    ) -> Result<Arc<LessonTracker>, AppServicesError> {
        Ok(LessonTracker::load(
            lesson,
            total_sections,
            self.catalog.lesson_key,
            self.store.clone(),
            self.path(),
        )
        .await?)
    }

    #[must_use]
    pub fn tutorial(&self) -> Arc<TutorialBookmarks> {
        TutorialBookmarks::new(self.catalog.tutorial_key, self.clock, self.store.clone())
    }

    /// Open a challenge editor, tied to the learning path when the site has
    /// the challenge on it.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Challenge` if the challenge cannot be tied
    /// to the path.
    pub fn challenge(&self, kind: ChallengeKind) -> Result<ChallengeWorkflow, AppServicesError> {
        let workflow = ChallengeWorkflow::new(kind, self.clock, self.store.clone(), DRAFT_SAVE_DELAY);
        if self.catalog.challenge_unit(&kind.id()).is_some() {
            Ok(workflow.on_path(self.catalog, self.path())?)
        } else {
            Ok(workflow)
        }
    }
}
