use kuchiki::traits::TendrilSink;
use kuchiki::{ElementData, NodeDataRef, NodeRef};

use super::style::{Cascade, ComputedStyle, StyleSheet};
use crate::error::ScanError;

/// Marks the preview's own reset `<style>` so checks can tell it from user CSS.
pub const BASE_STYLE_ATTR: &str = "data-preview-base";

/// Read-only snapshot of a rendered preview.
///
/// Parsed once; every requirement inspects the same tree. The tree is
/// reference-counted and therefore stays on the thread that built it.
pub struct PreviewDocument {
    root: NodeRef,
    sheets: Vec<StyleSheet>,
    cascade: Cascade,
}

impl PreviewDocument {
    #[must_use]
    pub fn parse(html: &str) -> Self {
        let root = kuchiki::parse_html().one(html);
        let sheets = collect_sheets(&root);
        let cascade = Cascade::build(&sheets);
        Self {
            root,
            sheets,
            cascade,
        }
    }

    /// All elements matching a CSS selector, in document order.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::InvalidSelector` if the selector does not compile.
    pub fn select(&self, selector: &str) -> Result<Vec<NodeDataRef<ElementData>>, ScanError> {
        self.root
            .select(selector)
            .map(|found| found.collect())
            .map_err(|()| ScanError::InvalidSelector(selector.to_owned()))
    }

    /// # Errors
    ///
    /// Returns `ScanError::InvalidSelector` if the selector does not compile.
    pub fn count(&self, selector: &str) -> Result<usize, ScanError> {
        self.select(selector).map(|found| found.len())
    }

    /// # Errors
    ///
    /// Returns `ScanError::InvalidSelector` if the selector does not compile.
    pub fn select_first(
        &self,
        selector: &str,
    ) -> Result<Option<NodeDataRef<ElementData>>, ScanError> {
        Ok(self.select(selector)?.into_iter().next())
    }

    /// Stylesheets in document order, readable or not.
    #[must_use]
    pub fn stylesheets(&self) -> &[StyleSheet] {
        &self.sheets
    }

    /// Text of every `<script>` element, in document order.
    #[must_use]
    pub fn scripts(&self) -> Vec<String> {
        self.select("script")
            .unwrap_or_default()
            .iter()
            .map(|script| script.as_node().text_contents())
            .collect()
    }

    /// Computed font metrics of the first element matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::MissingElement` if nothing matches, or
    /// `ScanError::InvalidSelector` if the selector does not compile.
    pub fn computed_style(&self, selector: &str) -> Result<ComputedStyle, ScanError> {
        let element = self
            .select_first(selector)?
            .ok_or_else(|| ScanError::MissingElement(selector.to_owned()))?;
        Ok(self.cascade.computed_style(&element))
    }
}

fn collect_sheets(root: &NodeRef) -> Vec<StyleSheet> {
    let Ok(elements) = root.select("style, link") else {
        return Vec::new();
    };
    elements
        .filter_map(|element| {
            let attributes = element.attributes.borrow();
            match &*element.name.local {
                "style" => Some(StyleSheet::inline(
                    &element.as_node().text_contents(),
                    attributes.contains(BASE_STYLE_ATTR),
                )),
                "link" if is_stylesheet_link(attributes.get("rel")) => Some(StyleSheet::external(
                    attributes.get("href").unwrap_or_default(),
                )),
                _ => None,
            }
        })
        .collect()
}

fn is_stylesheet_link(rel: Option<&str>) -> bool {
    rel.is_some_and(|rel| {
        rel.split_ascii_whitespace()
            .any(|token| token.eq_ignore_ascii_case("stylesheet"))
    })
}
