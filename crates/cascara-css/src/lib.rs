//! Selector indexing, incremental matching, and cascade assembly for the
//! Cascara style engine.
//!
//! # Scope
//!
//! This crate implements:
//! - **Stylesheet compilation** ([§ 5 Parsing](https://www.w3.org/TR/css-syntax-3/#parsing))
//!   - Style rules, `@media`, `@page` with margin boxes, `@font-face`, `@namespace`
//!   - Declaration lists with `!important`
//!
//! - **Selectors** ([Selectors Level 4](https://www.w3.org/TR/selectors-4/))
//!   - Type (with namespaces), universal, class, ID, and attribute selectors
//!   - Structural and dynamic pseudo-classes, pseudo-elements
//!   - Descendant, child, and next-sibling combinators
//!   - Specificity and rank ordering
//!
//! - **Matching**
//!   - A selector index that prunes candidates by tag, class, and id
//!   - A matcher that caches per-element results in a tree of mappers shared
//!     between elements with identical matched selector sets
//!
//! - **Cascade** ([CSS Cascading Level 4](https://www.w3.org/TR/css-cascade-4/))
//!   - Presentational hints, rule declarations, and inline style in order
//!   - Origin and importance resolution per property
//!   - Page and margin-box styles ([CSS Paged Media](https://www.w3.org/TR/css-page-3/))
//!
//! # Not Yet Implemented
//!
//! - Subsequent-sibling combinator (`~`)
//! - Media queries beyond media types
//! - `@import`
//! - Computed values and inheritance
//!
//! # Example
//!
//! ```
//! use cascara_css::{Matcher, Origin, Stylesheet, StylesheetInfo};
//! use cascara_dom::{DomTree, ElementData, NodeId};
//!
//! let mut tree = DomTree::new();
//! let body = tree.append_element(NodeId::ROOT, ElementData::new("body"));
//! let p = tree.append_element(body, ElementData::new("p").with_attr("class", "lead"));
//!
//! let sheet = Stylesheet::parse("body p { color: gray } .lead { color: black }", Origin::Author);
//! let mut matcher: Matcher<NodeId, DomTree> =
//!     Matcher::new(tree, &[StylesheetInfo::all_media(sheet)], "screen");
//!
//! let style = matcher.get_cascaded_style(p, false);
//! assert_eq!(style.get("color").map(|d| d.value.as_str()), Some("black"));
//! ```

/// Cascade assembly per [CSS Cascading Level 4](https://www.w3.org/TR/css-cascade-4/).
pub mod cascade;
/// The rank-ordered selector population of a document.
pub mod collection;
/// Stylesheet compilation errors.
pub mod error;
/// Coarse selector filter.
pub mod index;
/// Per-document matching and the mapper cache.
pub mod matcher;
/// `@page` and `@font-face` rules per [CSS Paged Media](https://www.w3.org/TR/css-page-3/).
pub mod page;
/// Stylesheet parsing per [§ 5 Parsing](https://www.w3.org/TR/css-syntax-3/#parsing).
pub mod parser;
/// Document access traits and their `DomTree` implementations.
pub mod resolver;
/// Compiled selectors per [Selectors Level 4](https://www.w3.org/TR/selectors-4/).
pub mod selector;

// Re-exports for convenience
pub use cascade::{CascadedStyle, assemble};
pub use collection::{StyleCollection, StyleCollectionBuilder};
pub use error::SelectorError;
pub use index::SelectorIndex;
pub use matcher::{Mapper, MapperId, Matcher};
pub use page::{FontFaceRule, MarginBoxName, PageCascadedStyle, PageRule};
pub use parser::{
    Declaration, DeclarationParser, Rule, Ruleset, RulesetId, StyleTextParser, Stylesheet,
    StylesheetInfo,
};
pub use resolver::{AttributeResolver, TreeResolver};
pub use selector::{
    Axis, ComplexSelector, Compound, Origin, SelectorId, SelectorLink, Specificity,
    compile_selector,
};
