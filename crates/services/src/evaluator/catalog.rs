//! The requirement batteries and code templates of the HIG exercises.

use lesson_core::model::ChallengeCode;
use tracing::debug;

use super::document::PreviewDocument;
use super::{Check, RequirementSet};
use crate::error::ScanError;

//
// ─── SETTINGS-PAGE CHALLENGE ───────────────────────────────────────────────────
//

pub const SETTINGS_SET: &str = "settings-page";

const GROUP_SELECTOR: &str = "section, .group, .settings-group";

/// Trimmed length of the last script, in UTF-16 code units, that it must
/// exceed to count as behaviour.
const MIN_SCRIPT_UNITS: usize = 10;

#[must_use]
pub fn settings_requirements() -> RequirementSet {
    RequirementSet::new(SETTINGS_SET)
        .with(Check::new(
            "toggle",
            "Use toggle switches for on/off settings",
            has_toggle,
        ))
        .with(Check::new(
            "groups",
            "Group related settings into sections",
            has_groups,
        ))
        .with(Check::new(
            "hierarchy",
            "Give the page a title and section headings",
            has_heading_hierarchy,
        ))
        .with(Check::new(
            "spacing",
            "Space content with padding or margins",
            has_spacing,
        ))
        .with(Check::new(
            "interactive",
            "Make the settings respond to input",
            has_behaviour,
        ))
}

fn has_toggle(doc: &PreviewDocument) -> Result<bool, ScanError> {
    Ok(doc
        .select(r#"input[type="checkbox"]"#)?
        .iter()
        .any(|input| {
            input
                .attributes
                .borrow()
                .get("class")
                .is_some_and(|class| class.contains("toggle") || class.contains("switch"))
        }))
}

fn has_groups(doc: &PreviewDocument) -> Result<bool, ScanError> {
    Ok(doc.count(GROUP_SELECTOR)? >= 2)
}

fn has_heading_hierarchy(doc: &PreviewDocument) -> Result<bool, ScanError> {
    Ok(doc.select_first("h1")?.is_some() && doc.count("h2, h3")? > 0)
}

/// Any readable rule outside the preview's reset sheet that sets
/// `padding` or `margin`. Unreadable sheets are skipped.
fn has_spacing(doc: &PreviewDocument) -> Result<bool, ScanError> {
    let mut found = false;
    for sheet in doc.stylesheets().iter().filter(|sheet| !sheet.is_base()) {
        match sheet.rules() {
            Ok(rules) => {
                found |= rules
                    .iter()
                    .any(|rule| rule.declares("padding") || rule.declares("margin"));
            }
            Err(err) => debug!(error = %err, "skipping stylesheet"),
        }
    }
    Ok(found)
}

fn has_behaviour(doc: &PreviewDocument) -> Result<bool, ScanError> {
    Ok(doc
        .scripts()
        .last()
        .is_some_and(|script| script.trim().encode_utf16().count() > MIN_SCRIPT_UNITS))
}

/// Editor contents after a confirmed reset.
#[must_use]
pub fn settings_skeleton() -> ChallengeCode {
    ChallengeCode::new(
        "<!-- Settings Page HTML -->
<div class=\"settings-container\">
    <h1>Settings</h1>

    <!-- Add your settings groups here -->

</div>",
        "/* Settings Page Styles */
.settings-container {
    max-width: 600px;
    margin: 0 auto;
    padding: 2rem;
}

/* Add your styles here */
",
        "// Settings Page JavaScript

// Add your interactive functionality here
",
    )
}

/// A complete worked example that meets every settings requirement.
#[must_use]
pub fn settings_starter() -> ChallengeCode {
    ChallengeCode::new(
        r#"<div class="settings-container">
    <h1>Settings</h1>

    <section class="settings-group">
        <h2 class="group-title">General</h2>
        <div class="setting-item">
            <label for="notifications">Notifications</label>
            <input type="checkbox" id="notifications" class="toggle-switch">
        </div>
        <div class="setting-item">
            <label for="sound">Sound Effects</label>
            <input type="checkbox" id="sound" class="toggle-switch" checked>
        </div>
    </section>

    <section class="settings-group">
        <h2 class="group-title">Appearance</h2>
        <div class="setting-item">
            <label for="dark-mode">Dark Mode</label>
            <input type="checkbox" id="dark-mode" class="toggle-switch">
        </div>
    </section>
</div>"#,
        ".settings-container {
    max-width: 600px;
    margin: 0 auto;
    padding: 2rem;
}

.settings-group {
    margin-bottom: 2.5rem;
}

.setting-item {
    display: flex;
    justify-content: space-between;
    padding: 1rem 0;
}

.toggle-switch {
    appearance: none;
    width: 51px;
    height: 31px;
    border-radius: 31px;
}
",
        "document.querySelectorAll('.toggle-switch').forEach(toggle => {
    toggle.addEventListener('change', () => {
        console.log(`${toggle.id}: ${toggle.checked ? 'on' : 'off'}`);
    });
});

const darkMode = document.getElementById('dark-mode');
darkMode.addEventListener('change', () => {
    document.body.classList.toggle('dark-mode', darkMode.checked);
});
",
    )
}

//
// ─── TYPOGRAPHY EXERCISE ───────────────────────────────────────────────────────
//

pub const TYPOGRAPHY_SET: &str = "typography";

const MIN_TITLE_PX: f32 = 32.0;
const MIN_TITLE_WEIGHT: u16 = 600;
const MIN_SECTION_PX: f32 = 16.0;
const MIN_LINE_HEIGHT_RATIO: f32 = 1.5;

#[must_use]
pub fn typography_requirements() -> RequirementSet {
    RequirementSet::new(TYPOGRAPHY_SET)
        .with(
            Check::new("title-size", "Article title is large", title_is_large).with_feedback(
                "Title size stands out from the rest of the page",
                "Make the title larger to lead the hierarchy",
            ),
        )
        .with(
            Check::new("title-weight", "Article title is bold", title_is_bold).with_feedback(
                "Title weight is strong enough",
                "Give the title a heavier font weight",
            ),
        )
        .with(
            Check::new(
                "section-hierarchy",
                "Section headings sit between body and title",
                sections_sit_between,
            )
            .with_feedback(
                "Section headings form a clear middle level",
                "Size section headings above body text and below the title",
            ),
        )
        .with(
            Check::new(
                "body-readability",
                "Body text has comfortable line height",
                body_is_readable,
            )
            .with_feedback(
                "Body text line height reads comfortably",
                "Increase the body text line height",
            ),
        )
}

fn title_is_large(doc: &PreviewDocument) -> Result<bool, ScanError> {
    Ok(doc.computed_style(".article-title")?.font_size_px >= MIN_TITLE_PX)
}

fn title_is_bold(doc: &PreviewDocument) -> Result<bool, ScanError> {
    Ok(doc.computed_style(".article-title")?.font_weight >= MIN_TITLE_WEIGHT)
}

fn sections_sit_between(doc: &PreviewDocument) -> Result<bool, ScanError> {
    let title = doc.computed_style(".article-title")?.font_size_px;
    let section = doc.computed_style(".section-heading")?.font_size_px;
    Ok(section > MIN_SECTION_PX && section < title)
}

fn body_is_readable(doc: &PreviewDocument) -> Result<bool, ScanError> {
    Ok(doc.computed_style(".body-text")?.line_height_ratio() >= MIN_LINE_HEIGHT_RATIO)
}

/// Article the typography exercise styles.
pub const TYPOGRAPHY_MARKUP: &str = r#"<div id="preview-content">
    <h1 class="article-title">Designing for Clarity</h1>
    <h2 class="section-heading">Establish a hierarchy</h2>
    <p class="body-text">Size, weight and spacing tell readers what matters first. Keep body text calm and give it room to breathe.</p>
    <p class="caption">Updated for the latest platform guidelines</p>
</div>"#;

/// Neutral text styles the exercise starts from; user rules override them.
pub const TYPOGRAPHY_BASE_CSS: &str = "h1, h2, p {
    font-size: 1rem;
    font-weight: 400;
    line-height: normal;
    margin: 0;
}";

#[must_use]
pub fn typography_starter_css() -> &'static str {
    ".article-title {
    font-size: 2.5rem;
    font-weight: 700;
    margin-bottom: 1.5rem;
    letter-spacing: -0.02em;
}

.section-heading {
    font-size: 1.25rem;
    font-weight: 600;
    margin-top: 2rem;
    margin-bottom: 1rem;
}

.body-text {
    font-size: 1rem;
    line-height: 1.6;
    color: var(--color-text-secondary);
    margin-bottom: 1rem;
}

.caption {
    font-size: 0.875rem;
    font-weight: 400;
    margin-top: 2rem;
}"
}

#[must_use]
pub fn typography_reset_css() -> &'static str {
    "/* Add your styles here */
.article-title {
    /* Your styles */
}

.section-heading {
    /* Your styles */
}

.body-text {
    /* Your styles */
}

.caption {
    /* Your styles */
}"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::compose::{compose_preview, compose_typography_preview};

    #[test]
    fn no_sections_and_one_toggle() {
        let report = settings_requirements().evaluate_html(
            r#"<h1>Settings</h1><input type="checkbox" class="toggle-switch">"#,
        );
        assert_eq!(report.get("groups"), Some(false));
        assert_eq!(report.get("toggle"), Some(true));
        assert!(!report.all_met());
    }

    #[test]
    fn plain_checkbox_is_not_a_toggle() {
        let report = settings_requirements()
            .evaluate_html(r#"<input type="checkbox" class="big"><input type="checkbox">"#);
        assert_eq!(report.get("toggle"), Some(false));
    }

    #[test]
    fn starter_meets_every_settings_requirement() {
        let report = settings_requirements().evaluate_html(&compose_preview(&settings_starter()));
        assert!(report.all_met(), "{report:?}");
    }

    #[test]
    fn skeleton_meets_only_spacing_and_script_checks() {
        let report = settings_requirements().evaluate_html(&compose_preview(&settings_skeleton()));
        assert_eq!(report.get("toggle"), Some(false));
        assert_eq!(report.get("groups"), Some(false));
        assert_eq!(report.get("hierarchy"), Some(false));
        assert_eq!(report.get("spacing"), Some(true));
        // The skeleton script is only comments, but long enough to count.
        assert_eq!(report.get("interactive"), Some(true));
    }

    #[test]
    fn spacing_ignores_reset_and_external_sheets() {
        let code = ChallengeCode::new("<h1>x</h1>", ".x { color: red; padding-top: 2px; }", "");
        let report = settings_requirements().evaluate_html(&compose_preview(&code));
        assert_eq!(report.get("spacing"), Some(false));
    }

    #[test]
    fn quoted_comment_opener_keeps_later_spacing_rule() {
        let code = ChallengeCode::new(
            "<h1>x</h1>",
            ".a::before { content: \"/*\"; } .card { padding: 1rem; }",
            "",
        );
        let report = settings_requirements().evaluate_html(&compose_preview(&code));
        assert_eq!(report.get("spacing"), Some(true));
    }

    #[test]
    fn script_length_counts_utf16_units() {
        // Six astral characters are twelve UTF-16 units.
        let report = settings_requirements()
            .evaluate_html("<script>\u{1F600}\u{1F600}\u{1F600}\u{1F600}\u{1F600}\u{1F600}</script>");
        assert_eq!(report.get("interactive"), Some(true));

        let report = settings_requirements().evaluate_html("<script>toggle()</script>");
        assert_eq!(report.get("interactive"), Some(false));
    }

    #[test]
    fn quoted_brace_keeps_later_title_rule() {
        let css = ".article-title::after { content: \"}\"; }
                   .article-title { font-size: 40px; font-weight: 700; }
                   .section-heading { font-size: 24px; }
                   .body-text { line-height: 1.6; }";
        let report = typography_requirements().evaluate_html(&compose_typography_preview(css));
        assert!(report.all_met(), "{report:?}");
    }

    #[test]
    fn starter_typography_scores_full_marks() {
        let report =
            typography_requirements().evaluate_html(&compose_typography_preview(typography_starter_css()));
        assert!(report.all_met(), "{report:?}");
        assert_eq!(report.percent(), 100);
    }

    #[test]
    fn reset_typography_scores_nothing() {
        let report =
            typography_requirements().evaluate_html(&compose_typography_preview(typography_reset_css()));
        assert_eq!(report.met_count(), 0);
        assert_eq!(
            report.outcomes()[0].feedback.as_deref(),
            Some("Make the title larger to lead the hierarchy")
        );
    }

    #[test]
    fn section_heading_must_stay_below_title() {
        let css = ".article-title { font-size: 2rem; font-weight: 600; }
                   .section-heading { font-size: 40px; }
                   .body-text { line-height: 24px; }";
        let report = typography_requirements().evaluate_html(&compose_typography_preview(css));
        assert_eq!(report.get("title-size"), Some(true));
        assert_eq!(report.get("title-weight"), Some(true));
        assert_eq!(report.get("section-hierarchy"), Some(false));
        assert_eq!(report.get("body-readability"), Some(true));
        assert_eq!(report.percent(), 75);
    }
}
