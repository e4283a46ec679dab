//! Wrap editor contents into the full documents the live previews render.

use lesson_core::model::ChallengeCode;

use super::catalog::{TYPOGRAPHY_BASE_CSS, TYPOGRAPHY_MARKUP};
use super::document::BASE_STYLE_ATTR;

/// Site stylesheet linked by every challenge preview. Never readable from the preview.
pub const SITE_STYLESHEET: &str = "../css/main.css";

const PREVIEW_RESET_CSS: &str = "body {
            margin: 0;
            padding: 0;
            min-height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
        }";

/// Full preview document for challenge code: reset styles, user CSS, user
/// HTML and the user script last.
#[must_use]
pub fn compose_preview(code: &ChallengeCode) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <link rel="stylesheet" href="{SITE_STYLESHEET}">
    <style {BASE_STYLE_ATTR}>
        {PREVIEW_RESET_CSS}
    </style>
    <style>
{css}
    </style>
</head>
<body>
{html}
    <script>
{js}
    </script>
</body>
</html>"#,
        css = code.css,
        html = code.html,
        js = code.js,
    )
}

/// Preview of the typography exercise with `css` applied to its article.
#[must_use]
pub fn compose_typography_preview(css: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <style {BASE_STYLE_ATTR}>
{TYPOGRAPHY_BASE_CSS}
    </style>
    <style>
{css}
    </style>
</head>
<body>
{TYPOGRAPHY_MARKUP}
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::PreviewDocument;

    #[test]
    fn user_script_is_last_and_user_css_is_readable() {
        let code = ChallengeCode::new("<p>hi</p>", ".x { margin: 0; }", "run();");
        let doc = PreviewDocument::parse(&compose_preview(&code));

        assert_eq!(doc.scripts().last().map(|s| s.trim().to_owned()), Some("run();".into()));
        let sheets = doc.stylesheets();
        assert_eq!(sheets.len(), 3);
        assert!(sheets[0].rules().is_err());
        assert!(sheets[1].is_base());
        assert!(sheets[2].rules().unwrap()[0].declares("margin"));
    }
}
