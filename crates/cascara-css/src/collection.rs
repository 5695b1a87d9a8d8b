//! The combined, rank-ordered selector population of a document.
//!
//! [§ 6.1 Cascade Sorting Order](https://www.w3.org/TR/css-cascade-4/#cascade-sort)
//!
//! All applicable stylesheets are flattened into one list of top-level
//! selectors sorted by [`Rank`]. A selector's index in that list is its
//! *position*; the selector index, the matcher, and the cascade all order
//! selectors by position.

use std::collections::BTreeMap;

use cascara_common::warning::warn_once;

use crate::page::{FontFaceRule, PageRule};
use crate::parser::{
    Declaration, PageBlock, Rule, Ruleset, RulesetId, StylesheetInfo, media_list_matches,
};
use crate::selector::{
    Axis, ComplexSelector, Compound, NamespaceMap, Origin, Rank, Selector, SelectorArena,
    SelectorId, compile_selector,
};

/// Compiled selectors, their rulesets, and the page and font-face rules of
/// every stylesheet that applies to the target medium.
#[derive(Debug, Clone, Default)]
pub struct StyleCollection {
    arena: SelectorArena,
    /// Top-level selectors; index is position.
    top_level: Vec<SelectorId>,
    rulesets: Vec<Ruleset>,
    page_rules: Vec<PageRule>,
    font_face_rules: Vec<FontFaceRule>,
}

impl StyleCollection {
    /// Flatten `sheets`, in the order given, for `medium`.
    ///
    /// Sheets whose media list excludes `medium` are skipped entirely, as
    /// are `@media` blocks that exclude it. Selectors that fail to compile
    /// are dropped with a warning; the rest of their rule survives.
    #[must_use]
    pub fn build(sheets: &[StylesheetInfo], medium: &str) -> Self {
        let mut builder = StyleCollectionBuilder::default();
        for info in sheets {
            if !media_list_matches(&info.media, medium) {
                continue;
            }
            let mut namespaces = NamespaceMap::new();
            builder.add_rules(
                &info.stylesheet.rules,
                info.stylesheet.origin,
                medium,
                &mut namespaces,
            );
        }
        builder.finish()
    }

    /// Arena holding every compound selector.
    #[must_use]
    pub const fn arena(&self) -> &SelectorArena {
        &self.arena
    }

    /// Top-level selectors in rank order; the slice index is the position.
    #[must_use]
    pub fn top_level(&self) -> &[SelectorId] {
        &self.top_level
    }

    /// The top-level selector at `position`.
    ///
    /// # Panics
    ///
    /// Panics if `position` is out of range.
    #[must_use]
    pub fn at_position(&self, position: usize) -> SelectorId {
        self.top_level[position]
    }

    /// Look up a compiled selector.
    #[must_use]
    pub fn selector(&self, id: SelectorId) -> &Selector {
        self.arena.get(id)
    }

    /// Look up a ruleset.
    #[must_use]
    pub fn ruleset(&self, id: RulesetId) -> &Ruleset {
        &self.rulesets[id.0]
    }

    /// `@page` rules in rank order: origin first, then page selector
    /// specificity. Rules equal on both keep their source position, so a
    /// later rule wins over an earlier one of the same weight.
    #[must_use]
    pub fn page_rules(&self) -> &[PageRule] {
        &self.page_rules
    }

    /// `@font-face` rules in source order.
    #[must_use]
    pub fn font_face_rules(&self) -> &[FontFaceRule] {
        &self.font_face_rules
    }

    /// Number of top-level selectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.top_level.len()
    }

    /// Whether there are no selectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.top_level.is_empty()
    }
}

struct PendingSelector {
    rank: Rank,
    selector: ComplexSelector,
    ruleset: RulesetId,
}

/// Incremental construction of a [`StyleCollection`] from already compiled
/// parts.
#[derive(Default)]
pub struct StyleCollectionBuilder {
    pending: Vec<PendingSelector>,
    rulesets: Vec<Ruleset>,
    page_rules: Vec<PageRule>,
    font_face_rules: Vec<FontFaceRule>,
    next_order: usize,
}

impl StyleCollectionBuilder {
    /// Store a ruleset for selectors to refer to.
    pub fn add_ruleset(&mut self, ruleset: Ruleset) -> RulesetId {
        let id = RulesetId(self.rulesets.len());
        self.rulesets.push(ruleset);
        id
    }

    /// Add a compiled selector. Source order is the order of calls. A
    /// selector with no compounds is ignored.
    pub fn add_selector(&mut self, selector: ComplexSelector, origin: Origin, ruleset: RulesetId) {
        if selector.links.is_empty() {
            return;
        }
        let rank = Rank {
            origin,
            specificity: selector.specificity,
            order: self.take_order(),
        };
        self.pending.push(PendingSelector {
            rank,
            selector,
            ruleset,
        });
    }

    /// Add an `@page` rule.
    pub fn add_page_rule(&mut self, block: &PageBlock, origin: Origin) {
        let mut margin_boxes: BTreeMap<_, Vec<Declaration>> = BTreeMap::new();
        for (name, declarations) in &block.margin_boxes {
            margin_boxes
                .entry(*name)
                .or_default()
                .extend(declarations.iter().cloned());
        }
        let order = self.take_order();
        self.page_rules.push(PageRule {
            name: block.name.clone(),
            pseudo_page: block.pseudo_page.clone(),
            origin,
            specificity: PageRule::page_specificity(
                block.name.as_deref(),
                block.pseudo_page.as_deref(),
            ),
            order,
            declarations: block.declarations.clone(),
            margin_boxes,
        });
    }

    /// Add an `@font-face` rule.
    pub fn add_font_face(&mut self, declarations: Vec<Declaration>, origin: Origin) {
        self.font_face_rules.push(FontFaceRule {
            origin,
            declarations,
        });
    }

    fn take_order(&mut self) -> usize {
        let order = self.next_order;
        self.next_order += 1;
        order
    }

    fn add_rules(
        &mut self,
        rules: &[Rule],
        origin: Origin,
        medium: &str,
        namespaces: &mut NamespaceMap,
    ) {
        for rule in rules {
            match rule {
                Rule::Style(style_rule) => {
                    let ruleset = self.add_ruleset(Ruleset {
                        declarations: style_rule.declarations.clone(),
                    });
                    for text in &style_rule.selectors {
                        match compile_selector(text, namespaces) {
                            Ok(selector) => self.add_selector(selector, origin, ruleset),
                            Err(err) => {
                                warn_once("CSS", &format!("dropping selector '{text}': {err}"));
                            }
                        }
                    }
                }
                Rule::Media { media, rules } => {
                    if media_list_matches(media, medium) {
                        self.add_rules(rules, origin, medium, namespaces);
                    }
                }
                Rule::Page(block) => self.add_page_rule(block, origin),
                Rule::FontFace(declarations) => self.add_font_face(declarations.clone(), origin),
                Rule::Namespace { prefix, uri } => {
                    let _ = namespaces.insert(prefix.clone().unwrap_or_default(), uri.clone());
                }
            }
        }
    }

    /// Sort by rank, assign positions, and allocate every compound.
    #[must_use]
    pub fn finish(mut self) -> StyleCollection {
        self.pending.sort_by_key(|p| p.rank);
        self.page_rules
            .sort_by_key(|r| (r.origin, r.specificity, r.order));

        let mut arena = SelectorArena::default();
        let mut top_level = Vec::with_capacity(self.pending.len());
        for pending in self.pending {
            let position = top_level.len();
            if let Some(id) = alloc_complex(&mut arena, pending.selector, pending.ruleset, position) {
                top_level.push(id);
            }
        }

        StyleCollection {
            arena,
            top_level,
            rulesets: self.rulesets,
            page_rules: self.page_rules,
            font_face_rules: self.font_face_rules,
        }
    }
}

/// Allocate the links right to left so each compound can point at the next
/// one. Returns the leftmost compound.
fn alloc_complex(
    arena: &mut SelectorArena,
    complex: ComplexSelector,
    ruleset: RulesetId,
    position: usize,
) -> Option<SelectorId> {
    let subject = complex.links.len().checked_sub(1)?;
    let mut chain = None;
    for (i, link) in complex.links.into_iter().enumerate().rev() {
        let sibling = alloc_siblings(arena, link.siblings, ruleset, position);
        let pseudo_element = if i == subject {
            complex.pseudo_element.clone()
        } else {
            None
        };
        chain = Some(arena.alloc(compound_selector(
            link.compound,
            link.axis,
            sibling,
            chain,
            pseudo_element,
            ruleset,
            position,
        )));
    }
    chain
}

/// Siblings are in document order; each one points at the one before it.
/// Returns the compound for the immediately preceding sibling.
fn alloc_siblings(
    arena: &mut SelectorArena,
    siblings: Vec<Compound>,
    ruleset: RulesetId,
    position: usize,
) -> Option<SelectorId> {
    let mut previous = None;
    for compound in siblings {
        previous = Some(arena.alloc(compound_selector(
            compound,
            Axis::ImmediateSibling,
            previous,
            None,
            None,
            ruleset,
            position,
        )));
    }
    previous
}

fn compound_selector(
    compound: Compound,
    axis: Axis,
    sibling: Option<SelectorId>,
    chain: Option<SelectorId>,
    pseudo_element: Option<String>,
    ruleset: RulesetId,
    position: usize,
) -> Selector {
    Selector {
        tag: compound.tag,
        namespace: compound.namespace,
        conditions: compound.conditions,
        dynamic: compound.dynamic,
        axis,
        sibling,
        chain,
        pseudo_element,
        ruleset,
        position,
    }
}
