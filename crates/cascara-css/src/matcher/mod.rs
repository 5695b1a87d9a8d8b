//! Per-document style matching.
//!
//! [`Matcher`] answers "which declarations apply to this element" for one
//! document. Elements are matched top-down and lazily: asking for an
//! element's style first resolves its parent's [`Mapper`], then maps the
//! element under it. Results stay cached until [`Matcher::remove_style`]
//! evicts them or a restyle is requested.

mod mapper;

pub use mapper::{DynamicStateSets, Mapper, MapperId, MapperTree, SelectorSetKey};

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use crate::cascade::{CascadedStyle, assemble};
use crate::collection::StyleCollection;
use crate::index::SelectorIndex;
use crate::page::{FontFaceRule, PageCascadedStyle, PageRule};
use crate::parser::{DeclarationParser, StyleTextParser, StylesheetInfo};
use crate::resolver::{AttributeResolver, TreeResolver};
use crate::selector::{DynamicPseudoClass, Origin};

/// Style matcher for one document.
///
/// The matcher owns the document handle `D` so that state changes (hover,
/// focus, ...) go through [`Matcher::document_mut`] and are followed by an
/// explicit restyle of the affected elements.
pub struct Matcher<E, D, P = DeclarationParser> {
    document: D,
    parser: P,
    styles: StyleCollection,
    index: SelectorIndex,
    mappers: MapperTree,
    element_mappers: HashMap<E, MapperId>,
    dynamic: DynamicStateSets<E>,
}

impl<E, D> Matcher<E, D>
where
    E: Copy + Eq + Hash,
    D: TreeResolver<E> + AttributeResolver<E>,
{
    /// Build a matcher for `document` from `sheets` (in cascade source
    /// order) as they apply to `medium`.
    #[must_use]
    pub fn new(document: D, sheets: &[StylesheetInfo], medium: &str) -> Self {
        Self::with_parser(document, StyleCollection::build(sheets, medium), DeclarationParser)
    }
}

impl<E, D, P> Matcher<E, D, P>
where
    E: Copy + Eq + Hash,
    D: TreeResolver<E> + AttributeResolver<E>,
    P: StyleTextParser,
{
    /// Build a matcher from an already flattened collection and a custom
    /// parser for `style` attributes and presentational hints.
    #[must_use]
    pub fn with_parser(document: D, styles: StyleCollection, parser: P) -> Self {
        let index = SelectorIndex::populate(&styles);
        Self {
            document,
            parser,
            styles,
            index,
            mappers: MapperTree::new(),
            element_mappers: HashMap::new(),
            dynamic: DynamicStateSets::default(),
        }
    }

    /// The styled document.
    pub const fn document(&self) -> &D {
        &self.document
    }

    /// Mutable access to the document, for state changes. Cached results are
    /// not invalidated; restyle or [`remove_style`](Self::remove_style) the
    /// elements that changed.
    pub const fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    /// Match `e` afresh under its parent's mapper (matching ancestors first
    /// if they were never matched) and cache the result.
    pub fn match_element(&mut self, e: E) -> MapperId {
        // Unmatched ancestors, nearest first.
        let mut pending = Vec::new();
        let mut parent = self.mappers.root();
        let mut next = self.document.parent_element(e);
        while let Some(ancestor) = next {
            if let Some(&id) = self.element_mappers.get(&ancestor) {
                parent = id;
                break;
            }
            pending.push(ancestor);
            next = self.document.parent_element(ancestor);
        }

        for ancestor in pending.into_iter().rev() {
            parent = self.map_under(parent, ancestor);
        }
        self.map_under(parent, e)
    }

    fn map_under(&mut self, parent: MapperId, e: E) -> MapperId {
        let id = self.mappers.map_child(
            parent,
            e,
            &self.styles,
            &self.index,
            &self.document,
            &mut self.dynamic,
        );
        let _ = self.element_mappers.insert(e, id);
        id
    }

    fn get_mapper(&mut self, e: E) -> MapperId {
        match self.element_mappers.get(&e) {
            Some(&id) => id,
            None => self.match_element(e),
        }
    }

    /// Cascaded style of `e`: presentational hints, then matched rules in
    /// rank order, then the `style` attribute. With `restyle`, `e` is matched
    /// again first (its ancestors keep their cached results).
    pub fn get_cascaded_style(&mut self, e: E, restyle: bool) -> CascadedStyle {
        let mapper = if restyle {
            self.match_element(e)
        } else {
            self.get_mapper(e)
        };

        // [§ 6.3 Precedence of non-CSS presentational hints](https://www.w3.org/TR/css-cascade-4/#preshint)
        // "treated as if they were in the author-level cascade origin"
        let hints = self
            .document
            .non_css_styling(e)
            .map(|text| self.parser.parse_declarations(&text, Origin::Author));
        let inline = self
            .document
            .element_styling(e)
            .map(|text| self.parser.parse_declarations(text, Origin::Author));

        let matched = self
            .mappers
            .get(mapper)
            .mapped()
            .iter()
            .map(|&id| self.styles.ruleset(self.styles.selector(id).ruleset));
        assemble(hints.as_ref(), matched, inline.as_ref())
    }

    /// Cascaded style of the `pseudo_element` of `e`.
    ///
    /// `None` when no pseudo-element selector of any kind matched `e`; an
    /// empty style when some did, but none for `pseudo_element`.
    pub fn get_pe_cascaded_style(&mut self, e: E, pseudo_element: &str) -> Option<CascadedStyle> {
        let id = self.get_mapper(e);
        let mapper = self.mappers.get(id);
        if !mapper.has_pseudo_selectors() {
            return None;
        }
        let name = pseudo_element.to_ascii_lowercase();
        let matched = mapper
            .pseudo_selectors(&name)
            .iter()
            .map(|&id| self.styles.selector(id))
            .filter(|selector| selector.matches_dynamic(e, &self.document))
            .map(|selector| self.styles.ruleset(selector.ruleset));
        Some(assemble(None, matched, None))
    }

    /// [CSS Paged Media § 6 Cascading in the page context](https://www.w3.org/TR/css-page-3/#page-cascade)
    ///
    /// Declarations of every `@page` rule that applies to a page of type
    /// `page_name` that is the `pseudo_page` page (`first`, `left`, `right`,
    /// `blank`), in rule order, plus the same for each margin box.
    #[must_use]
    pub fn get_page_cascaded_style(
        &self,
        page_name: Option<&str>,
        pseudo_page: Option<&str>,
    ) -> PageCascadedStyle {
        let mut style = CascadedStyle::empty();
        let mut margin_boxes: BTreeMap<_, CascadedStyle> = BTreeMap::new();
        for rule in self.styles.page_rules() {
            if !rule.applies(page_name, pseudo_page) {
                continue;
            }
            style.declarations.extend(rule.declarations.iter().cloned());
            for (name, declarations) in &rule.margin_boxes {
                margin_boxes
                    .entry(*name)
                    .or_default()
                    .declarations
                    .extend(declarations.iter().cloned());
            }
        }
        PageCascadedStyle { style, margin_boxes }
    }

    /// Forget the cached match of `e`. The next query matches it again.
    pub fn remove_style(&mut self, e: E) {
        let _ = self.element_mappers.remove(&e);
    }

    /// Whether `e` structurally matched a `:hover` selector.
    #[must_use]
    pub fn is_hover_styled(&self, e: E) -> bool {
        self.dynamic.contains(e, DynamicPseudoClass::Hover)
    }

    /// Whether `e` structurally matched an `:active` selector.
    #[must_use]
    pub fn is_active_styled(&self, e: E) -> bool {
        self.dynamic.contains(e, DynamicPseudoClass::Active)
    }

    /// Whether `e` structurally matched a `:focus` selector.
    #[must_use]
    pub fn is_focus_styled(&self, e: E) -> bool {
        self.dynamic.contains(e, DynamicPseudoClass::Focus)
    }

    /// Whether `e` structurally matched a `:visited` selector.
    #[must_use]
    pub fn is_visited_styled(&self, e: E) -> bool {
        self.dynamic.contains(e, DynamicPseudoClass::Visited)
    }

    /// `@font-face` rules of all applicable stylesheets.
    #[must_use]
    pub fn font_face_rules(&self) -> &[FontFaceRule] {
        self.styles.font_face_rules()
    }

    /// `@page` rules in cascade order: by origin, then page selector
    /// specificity, with source order breaking ties.
    #[must_use]
    pub fn page_rules(&self) -> &[PageRule] {
        self.styles.page_rules()
    }

    /// Number of top-level selectors.
    #[must_use]
    pub fn selector_count(&self) -> usize {
        self.styles.len()
    }

    /// Number of mappers created so far, including the root.
    #[must_use]
    pub fn mapper_count(&self) -> usize {
        self.mappers.len()
    }

    /// The mapper cached for `e`, if `e` has been matched.
    #[must_use]
    pub fn cached_mapper(&self, e: E) -> Option<MapperId> {
        self.element_mappers.get(&e).copied()
    }

    /// Look up a mapper.
    #[must_use]
    pub fn mapper(&self, id: MapperId) -> &Mapper {
        self.mappers.get(id)
    }

    /// The flattened selector collection.
    #[must_use]
    pub const fn styles(&self) -> &StyleCollection {
        &self.styles
    }

    /// The selector index.
    #[must_use]
    pub const fn index(&self) -> &SelectorIndex {
        &self.index
    }
}
