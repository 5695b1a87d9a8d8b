//! Cascade assembly.
//!
//! [CSS Cascading and Inheritance Level 4](https://www.w3.org/TR/css-cascade-4/)
//!
//! The matcher hands over matched rulesets already in rank order; this module
//! only concatenates them between presentational hints and the inline style,
//! and answers "which declaration wins" per property.

use serde::Serialize;

use crate::parser::{Declaration, Ruleset};
use crate::selector::Origin;

/// Ordered declarations that apply to one element (or pseudo-element, or
/// page box). Later declarations take precedence over earlier ones of the
/// same cascade level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadedStyle {
    /// Declarations in cascade order.
    pub declarations: Vec<Declaration>,
}

impl CascadedStyle {
    /// The style with no declarations.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            declarations: Vec::new(),
        }
    }

    /// Whether no declaration applies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// [§ 6.1 Cascade Sorting Order](https://www.w3.org/TR/css-cascade-4/#cascade-sort)
    ///
    /// The winning declaration for `property`: highest cascade level first,
    /// then the latest in order.
    #[must_use]
    pub fn get(&self, property: &str) -> Option<&Declaration> {
        self.declarations
            .iter()
            .enumerate()
            .filter(|(_, d)| d.property == property)
            .max_by_key(|&(i, d)| (cascade_level(d), i))
            .map(|(_, d)| d)
    }

    /// One winning declaration per property, in order of first appearance.
    #[must_use]
    pub fn resolved(&self) -> Vec<&Declaration> {
        let mut seen: Vec<&str> = Vec::new();
        let mut out = Vec::new();
        for declaration in &self.declarations {
            if seen.contains(&declaration.property.as_str()) {
                continue;
            }
            seen.push(&declaration.property);
            if let Some(winner) = self.get(&declaration.property) {
                out.push(winner);
            }
        }
        out
    }
}

/// "Declarations from origins earlier in this list win over declarations
/// from later origins":
///
/// 1. Important user-agent
/// 2. Important user
/// 3. Important author
/// 4. Normal author
/// 5. Normal user
/// 6. Normal user-agent
const fn cascade_level(declaration: &Declaration) -> u8 {
    match (declaration.important, declaration.origin) {
        (false, Origin::UserAgent) => 0,
        (false, Origin::User) => 1,
        (false, Origin::Author) => 2,
        (true, Origin::Author) => 3,
        (true, Origin::User) => 4,
        (true, Origin::UserAgent) => 5,
    }
}

/// Concatenate presentational hints, matched rulesets (already in rank
/// order), and the inline style, in that order.
///
/// Hints rank below every stylesheet rule and the inline style above,
/// whatever the selectors' specificity.
#[must_use]
pub fn assemble<'a, I>(
    hints: Option<&'a Ruleset>,
    matched: I,
    inline: Option<&'a Ruleset>,
) -> CascadedStyle
where
    I: IntoIterator<Item = &'a Ruleset>,
{
    let declarations: Vec<Declaration> = hints
        .into_iter()
        .chain(matched)
        .chain(inline)
        .flat_map(|ruleset| ruleset.declarations.iter().cloned())
        .collect();
    CascadedStyle { declarations }
}
