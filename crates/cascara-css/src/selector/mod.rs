//! Compiled selectors and structural matching.
//!
//! A complex selector such as `ul > li a:hover` is stored as a chain of
//! compound selectors running *left to right*: the top-level [`Selector`] is
//! the leftmost compound (`ul`), its `chain` points at `li` (axis
//! [`Axis::Child`]), whose `chain` points at `a` (axis [`Axis::Descendant`]).
//! The matcher walks the document top-down, so a compound that matches an
//! element hands its chain link down to that element's descendants.
//!
//! Next-sibling combinators (`h1 + p`) are not chain links: the compound on
//! the left is attached to the one on the right as its `sibling` selector
//! and is checked against the previous element sibling during matching.
//!
//! [Selectors Level 4](https://www.w3.org/TR/selectors-4/)

mod parse;

pub use parse::{ComplexSelector, Compound, NamespaceMap, SelectorLink, compile_selector};

use serde::Serialize;

use crate::parser::RulesetId;
use crate::resolver::{AttributeResolver, TreeResolver};

/// [§ 6.2 Cascading Origins](https://www.w3.org/TR/css-cascade-4/#cascading-origins)
///
/// Ordered so that later origins win for normal declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    /// Defaults supplied by the rendering engine.
    UserAgent,
    /// Preferences supplied by the reader.
    User,
    /// The document's own stylesheets, inline styles, and presentational hints.
    Author,
}

/// [§ 17 Calculating Specificity](https://www.w3.org/TR/selectors-4/#specificity-rules)
///
/// (ids, classes/attributes/pseudo-classes, types/pseudo-elements), compared
/// component by component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Specificity(pub u32, pub u32, pub u32);

/// Total cascade order of a top-level selector: origin, then specificity,
/// then source order. Field order matters for the derived `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rank {
    /// Stylesheet origin.
    pub origin: Origin,
    /// Selector specificity.
    pub specificity: Specificity,
    /// Source order across all stylesheets, in the order they were supplied.
    pub order: usize,
}

/// [§ 16 Combinators](https://www.w3.org/TR/selectors-4/#combinators)
///
/// The relationship a compound requires with the compound before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Anywhere below the previous compound (also used by top-level selectors).
    Descendant,
    /// Directly below the previous compound.
    Child,
    /// Immediately after the compound it is attached to. Only valid on
    /// sibling selectors; never on a chain link or top-level selector.
    ImmediateSibling,
}

/// Which namespaces a type or attribute selector accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum NamespaceConstraint {
    /// `*|name`, or no prefix and no default namespace.
    #[default]
    Any,
    /// `|name`: only elements or attributes in no namespace.
    None,
    /// `prefix|name` (or a default namespace): exactly this URI.
    Uri(String),
}

impl NamespaceConstraint {
    /// Whether a node in `namespace` satisfies this constraint.
    #[must_use]
    pub fn accepts(&self, namespace: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::None => namespace.is_none(),
            Self::Uri(uri) => namespace == Some(uri.as_str()),
        }
    }
}

/// [§ 6 Attribute selectors](https://www.w3.org/TR/selectors-4/#attribute-selectors)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeOperator {
    /// `[attr]`
    Exists,
    /// `[attr=value]`
    Equals(String),
    /// `[attr~=value]`: one of the whitespace-separated words.
    Includes(String),
    /// `[attr|=value]`: exactly `value` or starting with `value-`.
    DashMatch(String),
    /// `[attr^=value]`
    Prefix(String),
    /// `[attr$=value]`
    Suffix(String),
    /// `[attr*=value]`
    Substring(String),
}

impl AttributeOperator {
    /// Apply the operator to an attribute value.
    #[must_use]
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Self::Exists => true,
            Self::Equals(expected) => value == expected,
            Self::Includes(word) => {
                !word.is_empty() && value.split_ascii_whitespace().any(|w| w == word)
            }
            Self::DashMatch(prefix) => {
                value == prefix
                    || value
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('-'))
            }
            // "If 'val' is the empty string then the selector does not represent anything."
            Self::Prefix(prefix) => !prefix.is_empty() && value.starts_with(prefix.as_str()),
            Self::Suffix(suffix) => !suffix.is_empty() && value.ends_with(suffix.as_str()),
            Self::Substring(part) => !part.is_empty() && value.contains(part.as_str()),
        }
    }
}

/// An attribute predicate with its (optional) namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeCondition {
    /// Namespace the attribute must be in.
    pub namespace: NamespaceConstraint,
    /// Attribute local name.
    pub name: String,
    /// Test applied to the value.
    pub operator: AttributeOperator,
}

/// One non-type predicate of a compound selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Condition {
    /// `.name`
    Class(String),
    /// `#name`
    Id(String),
    /// `[...]`
    Attribute(AttributeCondition),
    /// `:lang(code)`
    Lang(String),
    /// `:first-child`
    FirstChild,
    /// `:last-child`
    LastChild,
    /// `:only-child`
    OnlyChild,
    /// `:nth-child(an+b)`, including `odd` and `even`.
    NthChild {
        /// Step.
        a: i32,
        /// Offset (one-based).
        b: i32,
    },
    /// `:root`
    Root,
    /// `:link`
    Link,
    /// A pseudo-class this engine does not evaluate; never matches.
    Unsupported(String),
}

impl Condition {
    /// Whether this is a class or id predicate, the only kinds the selector
    /// index can bucket.
    #[must_use]
    pub const fn is_class_or_id(&self) -> bool {
        matches!(self, Self::Class(_) | Self::Id(_))
    }

    /// Evaluate against element `e`.
    pub fn matches<E, A, T>(&self, e: E, attrs: &A, tree: &T) -> bool
    where
        E: Copy,
        A: AttributeResolver<E> + ?Sized,
        T: TreeResolver<E> + ?Sized,
    {
        match self {
            Self::Class(name) => attrs
                .class(e)
                .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == name)),
            Self::Id(id) => attrs.id(e) == Some(id.as_str()),
            Self::Attribute(attr) => attrs
                .attribute_value_ns(e, &attr.namespace, &attr.name)
                .is_some_and(|value| attr.operator.accepts(value)),
            // [§ 7.2 :lang()](https://www.w3.org/TR/selectors-4/#the-lang-pseudo)
            Self::Lang(code) => attrs.lang(e).is_some_and(|lang| {
                lang.eq_ignore_ascii_case(code)
                    || (lang.len() > code.len()
                        && lang.is_char_boundary(code.len())
                        && lang[..code.len()].eq_ignore_ascii_case(code)
                        && lang[code.len()..].starts_with('-'))
            }),
            Self::FirstChild => tree.is_first_child(e),
            Self::LastChild => tree.is_last_child(e),
            Self::OnlyChild => tree.is_first_child(e) && tree.is_last_child(e),
            Self::NthChild { a, b } => {
                let index = i64::try_from(tree.position_of_element(e)).unwrap_or(i64::MAX) + 1;
                nth_matches(i64::from(*a), i64::from(*b), index)
            }
            Self::Root => tree.is_root(e),
            Self::Link => attrs.is_link(e),
            Self::Unsupported(_) => false,
        }
    }
}

/// [§ 14.1 An+B notation](https://www.w3.org/TR/css-syntax-3/#anb-microsyntax)
///
/// True if `index = a*n + b` for some integer `n >= 0`.
const fn nth_matches(a: i64, b: i64, index: i64) -> bool {
    if a == 0 {
        return index == b;
    }
    let diff = index - b;
    diff % a == 0 && diff / a >= 0
}

/// A user-interaction pseudo-class whose truth changes without any change to
/// the document's markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamicPseudoClass {
    /// `:hover`
    Hover,
    /// `:active`
    Active,
    /// `:focus`
    Focus,
    /// `:visited`
    Visited,
}

impl DynamicPseudoClass {
    /// All dynamic pseudo-classes in flag order.
    pub const ALL: [Self; 4] = [Self::Hover, Self::Active, Self::Focus, Self::Visited];

    const fn bit(self) -> u8 {
        match self {
            Self::Hover => 1,
            Self::Active => 1 << 1,
            Self::Focus => 1 << 2,
            Self::Visited => 1 << 3,
        }
    }

    /// Recognize a pseudo-class name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "hover" => Some(Self::Hover),
            "active" => Some(Self::Active),
            "focus" => Some(Self::Focus),
            "visited" => Some(Self::Visited),
            _ => None,
        }
    }
}

/// The set of dynamic pseudo-classes a compound requires.
///
/// Kept apart from [`Condition`] so that `a:hover` still lands in the `a`
/// tag bucket of the selector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DynamicPseudoClasses(u8);

impl DynamicPseudoClasses {
    /// Add a pseudo-class to the set.
    pub const fn insert(&mut self, pc: DynamicPseudoClass) {
        self.0 |= pc.bit();
    }

    /// Whether the set contains `pc`.
    #[must_use]
    pub const fn contains(self, pc: DynamicPseudoClass) -> bool {
        self.0 & pc.bit() != 0
    }

    /// Whether the set is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate over the members.
    pub fn iter(self) -> impl Iterator<Item = DynamicPseudoClass> {
        DynamicPseudoClass::ALL
            .into_iter()
            .filter(move |&pc| self.contains(pc))
    }
}

/// Identity of a compound selector inside a [`SelectorArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SelectorId(pub(crate) usize);

/// A compiled compound selector. Immutable once allocated.
#[derive(Debug, Clone)]
pub struct Selector {
    /// Local name; `None` is the universal selector.
    pub tag: Option<String>,
    /// Namespace the element must be in.
    pub namespace: NamespaceConstraint,
    /// Conditions in source order.
    pub conditions: Vec<Condition>,
    /// Dynamic pseudo-classes required.
    pub dynamic: DynamicPseudoClasses,
    /// Relationship to the previous compound of the chain.
    pub axis: Axis,
    /// Compound that must match the previous element sibling (`a + b`).
    pub sibling: Option<SelectorId>,
    /// Next compound to the right, still owed by descendants.
    pub chain: Option<SelectorId>,
    /// Pseudo-element targeted by the complex selector (subject compound only).
    pub pseudo_element: Option<String>,
    /// Declarations this selector contributes.
    pub ruleset: RulesetId,
    /// Position of the owning top-level selector in rank order.
    pub position: usize,
}

impl Selector {
    /// Full structural test of this compound against `e`: sibling selector,
    /// name and namespace, and every condition. Dynamic pseudo-classes are
    /// *not* checked here; see [`Selector::matches_dynamic`].
    pub fn matches<E, A, T>(&self, arena: &SelectorArena, e: E, attrs: &A, tree: &T) -> bool
    where
        E: Copy,
        A: AttributeResolver<E> + ?Sized,
        T: TreeResolver<E> + ?Sized,
    {
        if let Some(sibling_id) = self.sibling {
            let sibling = arena.get(sibling_id);
            let Some(previous) = tree.previous_sibling_element(e) else {
                return false;
            };
            if !sibling.matches(arena, previous, attrs, tree)
                || !sibling.matches_dynamic(previous, attrs)
            {
                return false;
            }
        }

        if !tree.matches_element(e, &self.namespace, self.tag.as_deref()) {
            return false;
        }

        self.conditions.iter().all(|c| c.matches(e, attrs, tree))
    }

    /// Whether `e` is currently in every dynamic state this compound requires.
    pub fn matches_dynamic<E, A>(&self, e: E, attrs: &A) -> bool
    where
        E: Copy,
        A: AttributeResolver<E> + ?Sized,
    {
        self.dynamic.iter().all(|pc| match pc {
            DynamicPseudoClass::Hover => attrs.is_hover(e),
            DynamicPseudoClass::Active => attrs.is_active(e),
            DynamicPseudoClass::Focus => attrs.is_focus(e),
            DynamicPseudoClass::Visited => attrs.is_visited(e),
        })
    }

    /// Whether the compound carries any class or id condition.
    #[must_use]
    pub fn has_class_or_id(&self) -> bool {
        self.conditions.iter().any(Condition::is_class_or_id)
    }
}

/// Owner of every compiled compound selector; chain and sibling links are
/// [`SelectorId`]s into this arena.
#[derive(Debug, Clone, Default)]
pub struct SelectorArena {
    selectors: Vec<Selector>,
}

impl SelectorArena {
    /// Store a selector and return its identity.
    pub fn alloc(&mut self, selector: Selector) -> SelectorId {
        let id = SelectorId(self.selectors.len());
        self.selectors.push(selector);
        id
    }

    /// Look up a selector.
    ///
    /// # Panics
    ///
    /// Panics if `id` came from a different arena.
    #[must_use]
    pub fn get(&self, id: SelectorId) -> &Selector {
        &self.selectors[id.0]
    }

    /// Number of compounds stored (top-level, chain, and sibling).
    #[must_use]
    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    /// Whether the arena holds no selectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }
}
