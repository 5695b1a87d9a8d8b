//! Stylesheet and declaration-list parsing.
//!
//! [§ 5 Parsing](https://www.w3.org/TR/css-syntax-3/#parsing)
//!
//! This is a block-structure parser: it finds rule preludes and `{}` blocks,
//! splits declaration lists, and leaves selector text for
//! [`compile_selector`](crate::selector::compile_selector) and values as raw
//! text. Nothing here evaluates property values.

use cascara_common::warning::warn_once;
use serde::Serialize;

use crate::page::MarginBoxName;
use crate::selector::Origin;

/// [§ 5.4.4 Consume a declaration](https://www.w3.org/TR/css-syntax-3/#consume-a-declaration)
///
/// A CSS declaration (e.g., `color: red`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    /// The property name, lowercased (custom properties keep their case).
    pub property: String,
    /// The value text, trimmed, without `!important`.
    pub value: String,
    /// Whether the declaration has `!important`.
    pub important: bool,
    /// Origin of the stylesheet or attribute this came from.
    pub origin: Origin,
}

/// The declarations of one style rule (or one inline style attribute).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Ruleset {
    /// Declarations in source order.
    pub declarations: Vec<Declaration>,
}

impl Ruleset {
    /// Whether the ruleset has no declarations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

/// Index of a [`Ruleset`] inside a style collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RulesetId(pub(crate) usize);

/// [§ 5.4.3 Consume a qualified rule](https://www.w3.org/TR/css-syntax-3/#consume-a-qualified-rule)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    /// Selector texts of the selector list, uncompiled.
    pub selectors: Vec<String>,
    /// The declarations in this rule block.
    pub declarations: Vec<Declaration>,
}

/// [CSS Paged Media § 3 Page selectors](https://www.w3.org/TR/css-page-3/#page-selectors)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBlock {
    /// Page type name (`@page toc`).
    pub name: Option<String>,
    /// Pseudo-page (`first`, `left`, `right`, `blank`), lowercased.
    pub pseudo_page: Option<String>,
    /// Declarations directly inside the rule.
    pub declarations: Vec<Declaration>,
    /// Declarations of nested margin-box at-rules, in source order.
    pub margin_boxes: Vec<(MarginBoxName, Vec<Declaration>)>,
}

/// A top-level or `@media`-nested rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// A style rule.
    Style(StyleRule),
    /// [CSS Conditional § 6 `@media`](https://www.w3.org/TR/css-conditional-3/#at-media)
    Media {
        /// Media types the block applies to, lowercased. Empty means all.
        media: Vec<String>,
        /// Nested rules.
        rules: Vec<Rule>,
    },
    /// `@page`
    Page(PageBlock),
    /// [CSS Fonts § 4 `@font-face`](https://www.w3.org/TR/css-fonts-4/#font-face-rule)
    FontFace(Vec<Declaration>),
    /// [CSS Namespaces § 2 `@namespace`](https://www.w3.org/TR/css-namespaces-3/#declaration)
    Namespace {
        /// Prefix; `None` declares the default namespace.
        prefix: Option<String>,
        /// Namespace URI.
        uri: String,
    },
}

/// [§ 5.3.2 Parse a stylesheet](https://www.w3.org/TR/css-syntax-3/#parse-stylesheet)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stylesheet {
    /// Origin of every declaration in the sheet.
    pub origin: Origin,
    /// The list of rules in the stylesheet.
    pub rules: Vec<Rule>,
}

impl Stylesheet {
    /// Parse stylesheet text. Never fails: malformed constructs are dropped.
    #[must_use]
    pub fn parse(text: &str, origin: Origin) -> Self {
        let text = strip_comments(text);
        Self {
            origin,
            rules: parse_rules(&text, origin),
        }
    }
}

/// A stylesheet together with the media it was linked for.
#[derive(Debug, Clone)]
pub struct StylesheetInfo {
    /// The parsed sheet.
    pub stylesheet: Stylesheet,
    /// Media list of the linking element (`<link media=...>`); empty means
    /// all media.
    pub media: Vec<String>,
}

impl StylesheetInfo {
    /// A sheet that applies to every medium.
    #[must_use]
    pub const fn all_media(stylesheet: Stylesheet) -> Self {
        Self {
            stylesheet,
            media: Vec::new(),
        }
    }
}

/// Whether a media list applies to `medium`: it is empty, names `all`, or
/// names `medium` (ASCII case-insensitively).
#[must_use]
pub fn media_list_matches(media: &[String], medium: &str) -> bool {
    media.is_empty()
        || media
            .iter()
            .any(|m| m.eq_ignore_ascii_case("all") || m.eq_ignore_ascii_case(medium))
}

/// Parses raw declaration text (a `style` attribute or presentational hints)
/// into a [`Ruleset`].
pub trait StyleTextParser {
    /// Parse `text` as a declaration list, tagging every declaration with
    /// `origin`.
    fn parse_declarations(&self, text: &str, origin: Origin) -> Ruleset;
}

/// The built-in [`StyleTextParser`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclarationParser;

impl StyleTextParser for DeclarationParser {
    fn parse_declarations(&self, text: &str, origin: Origin) -> Ruleset {
        Ruleset {
            declarations: parse_declaration_list(&strip_comments(text), origin),
        }
    }
}

/// [§ 5.4.5 Consume a list of declarations](https://www.w3.org/TR/css-syntax-3/#consume-list-of-declarations)
///
/// Input must already be free of comments.
#[must_use]
pub fn parse_declaration_list(text: &str, origin: Origin) -> Vec<Declaration> {
    split_top_level(text, ';')
        .into_iter()
        .filter_map(|item| parse_declaration(item, origin))
        .collect()
}

fn parse_declaration(text: &str, origin: Origin) -> Option<Declaration> {
    let (name, value) = text.split_once(':')?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }

    // "If the last two non-<whitespace-token>s in the declaration's value are
    // a <delim-token> with the value "!" followed by an <ident-token> with a
    // value that is an ASCII case-insensitive match for "important", remove
    // them from the declaration's value and set the declaration's important
    // flag to true."
    let mut value = value.trim();
    let mut important = false;
    if let Some(bang) = value.rfind('!') {
        if value[bang + 1..].trim().eq_ignore_ascii_case("important") {
            important = true;
            value = value[..bang].trim_end();
        }
    }
    if value.is_empty() {
        return None;
    }

    let property = if name.starts_with("--") {
        name.to_string()
    } else {
        name.to_ascii_lowercase()
    };
    Some(Declaration {
        property,
        value: value.to_string(),
        important,
        origin,
    })
}

/// [§ 5.4.1 Consume a list of rules](https://www.w3.org/TR/css-syntax-3/#consume-list-of-rules)
fn parse_rules(text: &str, origin: Origin) -> Vec<Rule> {
    let mut rules = Vec::new();
    let mut pos = 0;
    while pos < text.len() {
        let rest = &text[pos..];
        pos += rest.len() - rest.trim_start().len();
        if pos >= text.len() {
            break;
        }
        pos = if text[pos..].starts_with('@') {
            parse_at_rule(text, pos, origin, &mut rules)
        } else {
            parse_qualified_rule(text, pos, origin, &mut rules)
        };
    }
    rules
}

/// Returns the position just after the rule.
fn parse_qualified_rule(text: &str, start: usize, origin: Origin, rules: &mut Vec<Rule>) -> usize {
    let Some(open) = scan_to(text, start, &['{']) else {
        warn_once("CSS", &format!("ignoring trailing text '{}'", text[start..].trim()));
        return text.len();
    };
    let (block, next) = block_contents(text, open);

    let selectors: Vec<String> = split_top_level(&text[start..open], ',')
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if selectors.is_empty() {
        warn_once("CSS", "ignoring style rule without selectors");
        return next;
    }

    rules.push(Rule::Style(StyleRule {
        selectors,
        declarations: parse_declaration_list(block, origin),
    }));
    next
}

/// [§ 5.4.2 Consume an at-rule](https://www.w3.org/TR/css-syntax-3/#consume-an-at-rule)
fn parse_at_rule(text: &str, start: usize, origin: Origin, rules: &mut Vec<Rule>) -> usize {
    let name_end = text[start + 1..]
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .map_or(text.len(), |i| start + 1 + i);
    let name = text[start + 1..name_end].to_ascii_lowercase();

    let Some(end) = scan_to(text, name_end, &['{', ';']) else {
        return text.len();
    };
    let prelude = text[name_end..end].trim();

    if text[end..].starts_with(';') {
        match name.as_str() {
            "namespace" => match parse_namespace_prelude(prelude) {
                Some((prefix, uri)) => rules.push(Rule::Namespace { prefix, uri }),
                None => warn_once("CSS", &format!("malformed @namespace '{prelude}'")),
            },
            "charset" => {}
            "import" => warn_once("CSS", &format!("@import is not supported: '{prelude}'")),
            other => warn_once("CSS", &format!("skipping unsupported at-rule '@{other}'")),
        }
        return end + 1;
    }

    let (block, next) = block_contents(text, end);
    match name.as_str() {
        "media" => rules.push(Rule::Media {
            media: parse_media_list(prelude),
            rules: parse_rules(block, origin),
        }),
        "page" => match parse_page_prelude(prelude) {
            Some((page_name, pseudo_page)) => {
                rules.push(Rule::Page(parse_page_block(block, page_name, pseudo_page, origin)));
            }
            None => warn_once("CSS", &format!("malformed @page selector '{prelude}'")),
        },
        "font-face" => rules.push(Rule::FontFace(parse_declaration_list(block, origin))),
        other => warn_once("CSS", &format!("skipping unsupported at-rule '@{other}'")),
    }
    next
}

/// [Media Queries § 3](https://www.w3.org/TR/mediaqueries-4/#mq-syntax)
///
/// Only media types are evaluated: each query contributes its type (after an
/// optional `only`), and a query with no type (`(min-width: ...)`) counts as
/// `all`. `not` queries are dropped.
fn parse_media_list(prelude: &str) -> Vec<String> {
    split_top_level(prelude, ',')
        .into_iter()
        .filter_map(|query| {
            let mut words = query.split_whitespace().map(str::to_ascii_lowercase);
            let mut first = words.next()?;
            if first == "not" {
                return None;
            }
            if first == "only" {
                first = words.next()?;
            }
            Some(if first.starts_with('(') { "all".to_string() } else { first })
        })
        .collect()
}

/// `prefix? (<string> | <url>)`
fn parse_namespace_prelude(prelude: &str) -> Option<(Option<String>, String)> {
    let (prefix, target) = if prelude.starts_with(['"', '\'']) || prelude.starts_with("url(") {
        (None, prelude)
    } else {
        let (prefix, rest) = prelude.split_once(char::is_whitespace)?;
        (Some(prefix.to_string()), rest.trim())
    };

    let uri = target
        .strip_prefix("url(")
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(target)
        .trim()
        .trim_matches(|c| c == '"' || c == '\'');
    Some((prefix, uri.to_string()))
}

/// `@page name? (:pseudo)?`
fn parse_page_prelude(prelude: &str) -> Option<(Option<String>, Option<String>)> {
    let (name, pseudo) = match prelude.split_once(':') {
        Some((name, pseudo)) => (name.trim(), Some(pseudo.trim().to_ascii_lowercase())),
        None => (prelude.trim(), None),
    };
    if pseudo
        .as_deref()
        .is_some_and(|p| !matches!(p, "first" | "left" | "right" | "blank"))
    {
        return None;
    }
    let name = (!name.is_empty()).then(|| name.to_string());
    Some((name, pseudo))
}

/// [CSS Paged Media § 4.2 Margin boxes](https://www.w3.org/TR/css-page-3/#margin-boxes)
fn parse_page_block(
    block: &str,
    name: Option<String>,
    pseudo_page: Option<String>,
    origin: Origin,
) -> PageBlock {
    let mut declarations = Vec::new();
    let mut margin_boxes = Vec::new();
    let mut pos = 0;

    while pos < block.len() {
        let rest = &block[pos..];
        pos += rest.len() - rest.trim_start().len();
        if pos >= block.len() {
            break;
        }

        if block[pos..].starts_with('@') {
            let Some(open) = scan_to(block, pos, &['{', ';']) else {
                break;
            };
            if block[open..].starts_with(';') {
                pos = open + 1;
                continue;
            }
            let at_name = block[pos + 1..open].trim().to_ascii_lowercase();
            let (inner, next) = block_contents(block, open);
            match MarginBoxName::from_at_keyword(&at_name) {
                Some(margin_box) => {
                    margin_boxes.push((margin_box, parse_declaration_list(inner, origin)));
                }
                None => warn_once("CSS", &format!("unknown margin box '@{at_name}'")),
            }
            pos = next;
        } else {
            let end = scan_to(block, pos, &[';']).unwrap_or(block.len());
            declarations.extend(parse_declaration(&block[pos..end], origin));
            pos = end + 1;
        }
    }

    PageBlock {
        name,
        pseudo_page,
        declarations,
        margin_boxes,
    }
}

/// Contents of the `{}` block opening at `open`, and the position after it.
/// An unterminated block runs to the end of input.
fn block_contents(text: &str, open: usize) -> (&str, usize) {
    match scan_to(text, open + 1, &['}']) {
        Some(close) => (&text[open + 1..close], close + 1),
        None => (&text[open + 1..], text.len()),
    }
}

/// Position of the first of `stops` at nesting depth zero, outside strings,
/// at or after `from`.
fn scan_to(text: &str, from: usize, stops: &[char]) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text[from..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        if depth == 0 && stops.contains(&c) {
            return Some(from + i);
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

/// Split on `separator` at nesting depth zero, outside strings.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    while let Some(at) = scan_to(text, start, &[separator]) {
        parts.push(&text[start..at]);
        start = at + separator.len_utf8();
    }
    parts.push(&text[start..]);
    parts
}

/// [§ 4.3.2 Consume comments](https://www.w3.org/TR/css-syntax-3/#consume-comment)
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }
        if c == '/' && chars.peek() == Some(&'*') {
            let _ = chars.next();
            let mut previous = '\0';
            for inner in chars.by_ref() {
                if previous == '*' && inner == '/' {
                    break;
                }
                previous = inner;
            }
            out.push(' ');
            continue;
        }
        if matches!(c, '"' | '\'') {
            quote = Some(c);
        }
        out.push(c);
    }
    out
}
