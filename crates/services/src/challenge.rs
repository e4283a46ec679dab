use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use lesson_core::catalog::{SiteCatalog, challenge_draft_key, challenge_solution_key};
use lesson_core::model::{
    ChallengeCode, ChallengeDraft, ChallengeId, ChallengeSolution, CompletionOutcome,
    RequirementReport, UnitId,
};
use lesson_core::time::Clock;
use storage::records::{DraftSnapshot, SolutionSnapshot};
use tracing::{debug, info};

use crate::debounce::Debouncer;
use crate::error::ChallengeError;
use crate::evaluator::catalog::{
    settings_skeleton, settings_starter, typography_reset_css, typography_starter_css,
};
use crate::evaluator::{
    RequirementSet, compose_preview, compose_typography_preview, settings_requirements,
    typography_requirements,
};
use crate::progress_store::{Confirmation, ProgressStore};
use crate::session_store::SessionStore;

/// The hands-on exercises with a requirement battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChallengeKind {
    /// Style an article so its type forms a hierarchy. CSS only.
    Typography,
    /// Build a settings screen from scratch.
    SettingsPage,
}

impl ChallengeKind {
    pub const ALL: [ChallengeKind; 2] = [ChallengeKind::Typography, ChallengeKind::SettingsPage];

    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            ChallengeKind::Typography => "typography",
            ChallengeKind::SettingsPage => "settings-page",
        }
    }

    #[must_use]
    pub fn id(self) -> ChallengeId {
        ChallengeId::new(self.slug())
    }

    #[must_use]
    pub fn requirements(self) -> RequirementSet {
        match self {
            ChallengeKind::Typography => typography_requirements(),
            ChallengeKind::SettingsPage => settings_requirements(),
        }
    }

    /// The preview document the code renders to.
    #[must_use]
    pub fn compose(self, code: &ChallengeCode) -> String {
        match self {
            ChallengeKind::Typography => compose_typography_preview(&code.css),
            ChallengeKind::SettingsPage => compose_preview(code),
        }
    }

    /// Editor contents after a confirmed reset.
    #[must_use]
    pub fn skeleton(self) -> ChallengeCode {
        match self {
            ChallengeKind::Typography => ChallengeCode::new("", typography_reset_css(), ""),
            ChallengeKind::SettingsPage => settings_skeleton(),
        }
    }

    /// Worked example shown by "load starter".
    #[must_use]
    pub fn starter(self) -> ChallengeCode {
        match self {
            ChallengeKind::Typography => ChallengeCode::new("", typography_starter_css(), ""),
            ChallengeKind::SettingsPage => settings_starter(),
        }
    }
}

impl fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ChallengeKind {
    type Err = ChallengeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "typography" => Ok(ChallengeKind::Typography),
            "settings" | "settings-page" => Ok(ChallengeKind::SettingsPage),
            other => Err(ChallengeError::UnknownChallenge(other.to_owned())),
        }
    }
}

/// Result of a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Every requirement passed and the solution was recorded.
    Accepted {
        solution: ChallengeSolution,
        report: RequirementReport,
        /// Effect on the learning path, when the challenge is part of one.
        completion: Option<CompletionOutcome>,
    },
    /// Some requirements failed; nothing was recorded.
    Incomplete { report: RequirementReport },
}

impl SubmitOutcome {
    #[must_use]
    pub fn report(&self) -> &RequirementReport {
        match self {
            SubmitOutcome::Accepted { report, .. } | SubmitOutcome::Incomplete { report } => report,
        }
    }

    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted { .. })
    }
}

//
// ─── WORKFLOW ──────────────────────────────────────────────────────────────────
//

/// Editor session of one challenge: drafts, checks, submission and reset.
pub struct ChallengeWorkflow {
    kind: ChallengeKind,
    clock: Clock,
    store: SessionStore,
    draft_key: String,
    solution_key: String,
    path: Option<(Arc<ProgressStore>, UnitId)>,
    drafts: Debouncer,
}

impl ChallengeWorkflow {
    #[must_use]
    pub fn new(kind: ChallengeKind, clock: Clock, store: SessionStore, draft_delay: Duration) -> Self {
        let id = kind.id();
        Self {
            kind,
            clock,
            store,
            draft_key: challenge_draft_key(&id),
            solution_key: challenge_solution_key(&id),
            path: None,
            drafts: Debouncer::new(draft_delay),
        }
    }

    /// Complete this challenge's unit on `path` when a submission is accepted.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeError::NotOnSite` if the site's path has no unit for
    /// this challenge.
    pub fn on_path(
        mut self,
        catalog: &SiteCatalog,
        path: Arc<ProgressStore>,
    ) -> Result<Self, ChallengeError> {
        let unit = catalog
            .challenge_unit(&self.kind.id())
            .ok_or_else(|| ChallengeError::NotOnSite(self.kind.slug().to_owned()))?;
        self.path = Some((path, unit));
        Ok(self)
    }

    #[must_use]
    pub fn kind(&self) -> ChallengeKind {
        self.kind
    }

    /// Editor contents changed: save a draft once typing pauses.
    pub fn edit(&self, code: ChallengeCode) {
        let store = self.store.clone();
        let key = self.draft_key.clone();
        let snapshot = DraftSnapshot {
            code,
            timestamp: self.clock.now(),
        };
        self.drafts.schedule(async move {
            store.write(&key, &snapshot).await;
        });
    }

    /// Save a draft immediately, dropping any pending one.
    pub async fn save_draft(&self, code: &ChallengeCode) -> bool {
        self.drafts.cancel();
        let snapshot = DraftSnapshot {
            code: code.clone(),
            timestamp: self.clock.now(),
        };
        self.store.write(&self.draft_key, &snapshot).await
    }

    pub async fn restore_draft(&self) -> Option<ChallengeDraft> {
        self.store
            .read::<DraftSnapshot>(&self.draft_key)
            .await
            .map(ChallengeDraft::from)
    }

    /// Render `code` into its preview and evaluate the requirements.
    #[must_use]
    pub fn check(&self, code: &ChallengeCode) -> RequirementReport {
        self.kind.requirements().evaluate_html(&self.kind.compose(code))
    }

    /// Evaluate `code` and record it as the solution if every requirement passes.
    pub async fn submit(&self, code: &ChallengeCode) -> SubmitOutcome {
        let report = self.check(code);
        if !report.all_met() {
            info!(
                challenge = %self.kind,
                met = report.met_count(),
                total = report.total(),
                "submission incomplete"
            );
            return SubmitOutcome::Incomplete { report };
        }

        let solution = ChallengeSolution {
            challenge: self.kind.id(),
            code: code.clone(),
            completed_at: self.clock.now(),
        };
        self.store
            .write(&self.solution_key, &SolutionSnapshot::from(&solution))
            .await;

        let completion = match &self.path {
            Some((path, unit)) => {
                let outcome = path.mark_unit_complete(*unit);
                path.flush().await;
                Some(outcome)
            }
            None => None,
        };
        info!(challenge = %self.kind, ?completion, "challenge solved");

        SubmitOutcome::Accepted {
            solution,
            report,
            completion,
        }
    }

    /// The recorded solution, if the challenge was solved before.
    pub async fn solution(&self) -> Option<ChallengeSolution> {
        self.store
            .read::<SolutionSnapshot>(&self.solution_key)
            .await
            .map(ChallengeSolution::from)
    }

    /// Throw away the draft and return the skeleton code, once confirmed.
    pub async fn reset(&self, confirmation: Confirmation) -> Option<ChallengeCode> {
        if confirmation != Confirmation::Confirmed {
            return None;
        }
        self.drafts.cancel();
        self.store.remove(&self.draft_key).await;
        debug!(challenge = %self.kind, "challenge reset");
        Some(self.kind.skeleton())
    }
}
