//! Stylesheet reading and a reduced cascade for the preview document.
//!
//! Only what the requirement catalogs inspect is resolved: font size, font
//! weight and line height. Rules inside `@media` and other at-rule blocks are
//! not visible at the top level of a sheet and are skipped.

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationListParser, DeclarationParser, ParseError, Parser,
    ParserInput, QualifiedRuleParser, RuleListParser, SourceLocation, Token, parse_important,
};
use kuchiki::{ElementData, NodeDataRef, NodeRef, Selectors, Specificity};
use tracing::debug;

use crate::error::ScanError;

/// Root font size used for `rem` and `medium`.
pub const ROOT_FONT_PX: f32 = 16.0;

/// Used value of `line-height: normal`, relative to the font size.
pub const NORMAL_LINE_HEIGHT: f32 = 1.2;

//
// ─── PARSED SHEETS ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    pub selector_text: String,
    pub declarations: Vec<Declaration>,
}

impl StyleRule {
    /// Whether the rule sets `property` itself (a longhand such as
    /// `padding-top` does not count for `padding`).
    #[must_use]
    pub fn declares(&self, property: &str) -> bool {
        self.declarations
            .iter()
            .any(|d| d.property == property && !d.value.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSource {
    /// A `<style>` element. `base` marks the preview's own reset sheet.
    Inline { base: bool },
    /// A `<link rel="stylesheet">`; its rules are never readable here.
    External { href: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSheet {
    source: SheetSource,
    rules: Vec<StyleRule>,
}

impl StyleSheet {
    #[must_use]
    pub fn inline(css: &str, base: bool) -> Self {
        Self {
            source: SheetSource::Inline { base },
            rules: parse_stylesheet(css),
        }
    }

    #[must_use]
    pub fn external(href: impl Into<String>) -> Self {
        Self {
            source: SheetSource::External { href: href.into() },
            rules: Vec::new(),
        }
    }

    #[must_use]
    pub fn source(&self) -> &SheetSource {
        &self.source
    }

    #[must_use]
    pub fn is_base(&self) -> bool {
        matches!(self.source, SheetSource::Inline { base: true })
    }

    /// Top-level style rules of the sheet.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::StyleAccessDenied` for external sheets.
    pub fn rules(&self) -> Result<&[StyleRule], ScanError> {
        match &self.source {
            SheetSource::Inline { .. } => Ok(&self.rules),
            SheetSource::External { href } => Err(ScanError::StyleAccessDenied { href: href.clone() }),
        }
    }
}

/// Read CSS text into top-level style rules.
///
/// At-rules (with or without a block) are skipped, as are rules whose
/// prelude or body cannot be read. An unterminated final block still counts.
#[must_use]
pub fn parse_stylesheet(css: &str) -> Vec<StyleRule> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    RuleListParser::new_for_stylesheet(&mut parser, SheetParser)
        .filter_map(Result::ok)
        .filter(|rule| !rule.selector_text.is_empty())
        .collect()
}

/// Parse a declaration block body, as found between braces or in a `style` attribute.
#[must_use]
pub fn parse_declarations(block: &str) -> Vec<Declaration> {
    let mut input = ParserInput::new(block);
    let mut parser = Parser::new(&mut input);
    DeclarationListParser::new(&mut parser, DeclarationReader)
        .filter_map(Result::ok)
        .collect()
}

struct SheetParser;

impl<'i> QualifiedRuleParser<'i> for SheetParser {
    type Prelude = String;
    type QualifiedRule = StyleRule;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let start = input.position();
        while input.next().is_ok() {}
        Ok(input.slice_from(start).trim().to_owned())
    }

    fn parse_block<'t>(
        &mut self,
        selector_text: Self::Prelude,
        _location: SourceLocation,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        let declarations = DeclarationListParser::new(input, DeclarationReader)
            .filter_map(Result::ok)
            .collect();
        Ok(StyleRule {
            selector_text,
            declarations,
        })
    }
}

// Every at-rule is rejected, which skips it along with its block.
impl<'i> AtRuleParser<'i> for SheetParser {
    type PreludeNoBlock = ();
    type PreludeBlock = ();
    type AtRule = StyleRule;
    type Error = ();
}

struct DeclarationReader;

impl<'i> DeclarationParser<'i> for DeclarationReader {
    type Declaration = Declaration;
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let start = input.position();
        let mut end = start;
        let mut important = false;
        while !input.is_exhausted() {
            let before = input.position();
            let trailing_important = input.try_parse(|input| {
                parse_important(input)?;
                input.expect_exhausted()
            });
            if trailing_important.is_ok() {
                important = true;
                end = before;
                break;
            }
            input.next()?;
            end = input.position();
        }
        Ok(Declaration {
            property: name.to_ascii_lowercase(),
            value: input.slice(start..end).trim().to_owned(),
            important,
        })
    }
}

impl<'i> AtRuleParser<'i> for DeclarationReader {
    type PreludeNoBlock = ();
    type PreludeBlock = ();
    type AtRule = Declaration;
    type Error = ();
}

//
// ─── CASCADE ───────────────────────────────────────────────────────────────────
//

/// Precedence of a declaration. Field order is comparison order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Precedence {
    important: bool,
    origin: Origin,
    specificity: Option<Specificity>,
    order: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Origin {
    UserAgent,
    Author,
    Inline,
}

struct CompiledRule {
    selectors: Selectors,
    declarations: Vec<Declaration>,
}

/// Author rules of every readable sheet, compiled for matching.
pub struct Cascade {
    rules: Vec<CompiledRule>,
}

impl Cascade {
    #[must_use]
    pub fn build(sheets: &[StyleSheet]) -> Self {
        let mut rules = Vec::new();
        for sheet in sheets {
            let Ok(sheet_rules) = sheet.rules() else {
                continue;
            };
            for rule in sheet_rules {
                match Selectors::compile(&rule.selector_text) {
                    Ok(selectors) => rules.push(CompiledRule {
                        selectors,
                        declarations: rule.declarations.clone(),
                    }),
                    Err(()) => debug!(selector = %rule.selector_text, "skipping unsupported selector"),
                }
            }
        }
        Self { rules }
    }

    /// Computed font metrics of `element`.
    #[must_use]
    pub fn computed_style(&self, element: &NodeDataRef<ElementData>) -> ComputedStyle {
        let chain = ancestor_chain(element);
        let mut style = ComputedStyle::initial();
        for el in &chain {
            style = self.cascade_one(el, &style);
        }
        style
    }

    fn cascade_one(&self, el: &NodeDataRef<ElementData>, parent: &ComputedStyle) -> ComputedStyle {
        let font_size_px = self
            .winning(el, "font-size", |v| resolve_font_size(v, parent.font_size_px))
            .unwrap_or(parent.font_size_px);
        let font_weight = self
            .winning(el, "font-weight", |v| resolve_font_weight(v, parent.font_weight))
            .unwrap_or(parent.font_weight);
        let line_height = self
            .winning(el, "line-height", |v| {
                resolve_line_height(v, font_size_px, parent.line_height)
            })
            .unwrap_or(parent.line_height);
        ComputedStyle {
            font_size_px,
            font_weight,
            line_height,
        }
    }

    /// Highest-precedence declaration of `property` that `resolve` accepts.
    fn winning<T>(
        &self,
        el: &NodeDataRef<ElementData>,
        property: &str,
        resolve: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        let mut candidates: Vec<(Precedence, String)> = Vec::new();

        if let Some(value) = user_agent_default(&el.name.local, property) {
            candidates.push((
                Precedence {
                    important: false,
                    origin: Origin::UserAgent,
                    specificity: None,
                    order: 0,
                },
                value.to_owned(),
            ));
        }

        let mut order = 0;
        for rule in &self.rules {
            let specificity = rule
                .selectors
                .0
                .iter()
                .filter(|s| s.matches(el))
                .map(kuchiki::Selector::specificity)
                .max();
            for decl in &rule.declarations {
                order += 1;
                if specificity.is_some() && decl.property == property {
                    candidates.push((
                        Precedence {
                            important: decl.important,
                            origin: Origin::Author,
                            specificity,
                            order,
                        },
                        decl.value.clone(),
                    ));
                }
            }
        }

        if let Some(inline) = el.attributes.borrow().get("style") {
            for decl in parse_declarations(inline) {
                order += 1;
                if decl.property == property {
                    candidates.push((
                        Precedence {
                            important: decl.important,
                            origin: Origin::Inline,
                            specificity: None,
                            order,
                        },
                        decl.value,
                    ));
                }
            }
        }

        candidates.sort_by(|a, b| b.0.cmp(&a.0));
        candidates.iter().find_map(|(_, value)| resolve(value))
    }
}

/// Element and its element ancestors, outermost first.
fn ancestor_chain(element: &NodeDataRef<ElementData>) -> Vec<NodeDataRef<ElementData>> {
    let mut chain: Vec<NodeDataRef<ElementData>> = element
        .as_node()
        .ancestors()
        .filter_map(NodeRef::into_element_ref)
        .collect();
    chain.reverse();
    chain.push(element.clone());
    chain
}

fn user_agent_default(tag: &str, property: &str) -> Option<&'static str> {
    match (tag, property) {
        ("h1", "font-size") => Some("2em"),
        ("h2", "font-size") => Some("1.5em"),
        ("h3", "font-size") => Some("1.17em"),
        ("h4", "font-size") => Some("1em"),
        ("h5", "font-size") => Some("0.83em"),
        ("h6", "font-size") => Some("0.67em"),
        ("h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "b" | "strong" | "th", "font-weight") => {
            Some("bold")
        }
        _ => None,
    }
}

//
// ─── COMPUTED VALUES ───────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineHeight {
    Normal,
    /// Unitless multiplier; inherited as the factor itself.
    Factor(f32),
    /// Resolved length in pixels.
    Px(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComputedStyle {
    pub font_size_px: f32,
    pub font_weight: u16,
    pub line_height: LineHeight,
}

impl ComputedStyle {
    #[must_use]
    pub fn initial() -> Self {
        Self {
            font_size_px: ROOT_FONT_PX,
            font_weight: 400,
            line_height: LineHeight::Normal,
        }
    }

    /// Line height as a multiple of the font size.
    #[must_use]
    pub fn line_height_ratio(&self) -> f32 {
        match self.line_height {
            LineHeight::Normal => NORMAL_LINE_HEIGHT,
            LineHeight::Factor(f) => f,
            LineHeight::Px(_) if self.font_size_px <= 0.0 => 0.0,
            LineHeight::Px(px) => px / self.font_size_px,
        }
    }
}

/// The value as one CSS token, or `None` if it is empty or has several.
fn single_token(value: &str) -> Option<Token<'_>> {
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    let token = parser.next().ok()?.clone();
    parser.expect_exhausted().ok()?;
    Some(token)
}

fn resolve_length(token: &Token<'_>, font_px: f32, percent_base: f32) -> Option<f32> {
    let px = match token {
        Token::Dimension { value, unit, .. } => match unit.to_ascii_lowercase().as_str() {
            "px" => *value,
            "rem" => value * ROOT_FONT_PX,
            "em" => value * font_px,
            "pt" => value * 4.0 / 3.0,
            _ => return None,
        },
        Token::Percentage { unit_value, .. } => unit_value * percent_base,
        Token::Number { value, .. } if *value == 0.0 => 0.0,
        _ => return None,
    };
    (px >= 0.0).then_some(px)
}

/// Resolve a `font-size` value against the parent's computed size.
#[must_use]
pub fn resolve_font_size(value: &str, parent_px: f32) -> Option<f32> {
    let token = single_token(value)?;
    let Token::Ident(keyword) = &token else {
        return resolve_length(&token, parent_px, parent_px);
    };
    let px = match keyword.to_ascii_lowercase().as_str() {
        "inherit" | "unset" => parent_px,
        "initial" | "medium" => ROOT_FONT_PX,
        "xx-small" => 9.0,
        "x-small" => 10.0,
        "small" => 13.0,
        "large" => 18.0,
        "x-large" => 24.0,
        "xx-large" => 32.0,
        "xxx-large" => 48.0,
        "smaller" => parent_px / 1.2,
        "larger" => parent_px * 1.2,
        _ => return None,
    };
    Some(px)
}

/// Resolve a `font-weight` value against the parent's computed weight.
#[must_use]
pub fn resolve_font_weight(value: &str, parent: u16) -> Option<u16> {
    let weight = match single_token(value)? {
        Token::Number { value, .. } => {
            if !(1.0..=1000.0).contains(&value) {
                return None;
            }
            // Weights are whole numbers in 1..=1000.
            value.round() as u16
        }
        Token::Ident(keyword) => match keyword.to_ascii_lowercase().as_str() {
            "inherit" | "unset" => parent,
            "normal" | "initial" => 400,
            "bold" => 700,
            "bolder" => match parent {
                0..350 => 400,
                350..550 => 700,
                _ => 900,
            },
            "lighter" => match parent {
                0..550 => 100,
                550..750 => 400,
                _ => 700,
            },
            _ => return None,
        },
        _ => return None,
    };
    Some(weight)
}

/// Resolve a `line-height` value for an element of `font_px`.
#[must_use]
pub fn resolve_line_height(value: &str, font_px: f32, parent: LineHeight) -> Option<LineHeight> {
    let token = single_token(value)?;
    match &token {
        Token::Ident(keyword) => match keyword.to_ascii_lowercase().as_str() {
            "inherit" | "unset" => Some(parent),
            "normal" | "initial" => Some(LineHeight::Normal),
            _ => None,
        },
        Token::Number { value, .. } if *value >= 0.0 => Some(LineHeight::Factor(*value)),
        Token::Number { .. } => None,
        _ => resolve_length(&token, font_px, font_px).map(LineHeight::Px),
    }
}
