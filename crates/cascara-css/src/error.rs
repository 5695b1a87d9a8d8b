//! Recoverable stylesheet compilation errors.
//!
//! Only the compiler produces errors. Matching and cascading never fail:
//! absence is an empty or `None` result, and broken invariants panic.

use thiserror::Error;

/// Why a selector could not be compiled. The stylesheet compiler drops the
/// selector (not the whole rule) and reports the error as a warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    /// The selector text was empty or only whitespace.
    #[error("empty selector")]
    Empty,

    /// A character that cannot appear at this point of a selector.
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),

    /// A combinator with no compound selector on one of its sides.
    #[error("combinator without a compound selector on both sides")]
    DanglingCombinator,

    /// A combinator this engine does not match (`~`).
    #[error("unsupported combinator '{0}'")]
    UnsupportedCombinator(char),

    /// A `prefix|name` whose prefix was never declared with `@namespace`.
    #[error("undeclared namespace prefix '{0}'")]
    UnknownNamespacePrefix(String),

    /// An attribute selector that is not terminated or has no name.
    #[error("malformed attribute selector")]
    MalformedAttribute,

    /// A functional pseudo-class whose argument could not be understood.
    #[error("malformed argument to ':{0}()'")]
    MalformedPseudoClass(String),

    /// A pseudo-element followed by further selector text.
    #[error("pseudo-element '::{0}' must end the selector")]
    MisplacedPseudoElement(String),
}
