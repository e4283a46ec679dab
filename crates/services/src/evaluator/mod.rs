//! Requirement checks over a rendered preview.
//!
//! Each requirement is an independent predicate. A predicate that cannot
//! inspect the document (unsupported selector, unreadable stylesheet, missing
//! element) counts as failed; evaluation itself never fails.

pub mod catalog;
pub mod compose;
pub mod document;
pub mod style;

use lesson_core::model::{RequirementId, RequirementOutcome, RequirementReport};
use tracing::debug;

use crate::error::ScanError;

pub use catalog::{settings_requirements, typography_requirements};
pub use compose::{compose_preview, compose_typography_preview};
pub use document::PreviewDocument;

pub trait Requirement: Send + Sync {
    fn id(&self) -> &str;

    /// Human-readable description shown beside the check mark.
    fn label(&self) -> &str;

    /// # Errors
    ///
    /// Returns `ScanError` when the document cannot be inspected for this rule.
    fn check(&self, document: &PreviewDocument) -> Result<bool, ScanError>;

    /// Message shown after evaluation, if the requirement has one.
    fn feedback(&self, _passed: bool) -> Option<&str> {
        None
    }
}

type Predicate = fn(&PreviewDocument) -> Result<bool, ScanError>;

/// A requirement backed by a plain function.
#[derive(Clone, Copy)]
pub struct Check {
    id: &'static str,
    label: &'static str,
    predicate: Predicate,
    feedback: Option<(&'static str, &'static str)>,
}

impl Check {
    #[must_use]
    pub const fn new(id: &'static str, label: &'static str, predicate: Predicate) -> Self {
        Self {
            id,
            label,
            predicate,
            feedback: None,
        }
    }

    /// Attach messages for the passing and the failing case.
    #[must_use]
    pub const fn with_feedback(mut self, passed: &'static str, failed: &'static str) -> Self {
        self.feedback = Some((passed, failed));
        self
    }
}

impl Requirement for Check {
    fn id(&self) -> &str {
        self.id
    }

    fn label(&self) -> &str {
        self.label
    }

    fn check(&self, document: &PreviewDocument) -> Result<bool, ScanError> {
        (self.predicate)(document)
    }

    fn feedback(&self, passed: bool) -> Option<&str> {
        self.feedback
            .map(|(ok, failed)| if passed { ok } else { failed })
    }
}

/// Ordered battery of requirements evaluated together.
pub struct RequirementSet {
    name: &'static str,
    requirements: Vec<Box<dyn Requirement>>,
}

impl RequirementSet {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            requirements: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, requirement: impl Requirement + 'static) -> Self {
        self.requirements.push(Box::new(requirement));
        self
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Requirement> {
        self.requirements.iter().map(|requirement| &**requirement)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Run every requirement against `document`, in order.
    #[must_use]
    pub fn evaluate(&self, document: &PreviewDocument) -> RequirementReport {
        let outcomes = self
            .requirements
            .iter()
            .map(|requirement| {
                let passed = requirement.check(document).unwrap_or_else(|err| {
                    debug!(set = self.name, requirement = requirement.id(), error = %err, "requirement could not be checked");
                    false
                });
                RequirementOutcome {
                    id: RequirementId::new(requirement.id()),
                    passed,
                    feedback: requirement.feedback(passed).map(str::to_owned),
                }
            })
            .collect();
        let report = RequirementReport::new(outcomes);
        debug!(
            set = self.name,
            met = report.met_count(),
            total = report.total(),
            "requirements evaluated"
        );
        report
    }

    /// Parse `html` and evaluate it.
    #[must_use]
    pub fn evaluate_html(&self, html: &str) -> RequirementReport {
        self.evaluate(&PreviewDocument::parse(html))
    }
}
