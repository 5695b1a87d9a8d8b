//! Selector text compilation.
//!
//! [§ 4 Selector syntax](https://www.w3.org/TR/selectors-4/#syntax)
//!
//! Produces a [`ComplexSelector`]: compound selectors in source order, each
//! tagged with the combinator that connects it to the compound before it.
//! Next-sibling compounds are folded into the compound they precede.

use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

use cascara_common::warning::warn_once;

use super::{
    AttributeCondition, AttributeOperator, Axis, Condition, DynamicPseudoClass,
    DynamicPseudoClasses, NamespaceConstraint, Specificity,
};
use crate::error::SelectorError;

/// `@namespace` declarations in effect: prefix to URI. The empty prefix is
/// the default namespace.
pub type NamespaceMap = HashMap<String, String>;

/// [§ 5 Compound selectors](https://www.w3.org/TR/selectors-4/#compound)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Compound {
    /// Lowercased local name; `None` for `*` or an omitted type selector.
    pub tag: Option<String>,
    /// Namespace constraint of the type selector.
    pub namespace: NamespaceConstraint,
    /// Non-type predicates in source order.
    pub conditions: Vec<Condition>,
    /// Dynamic pseudo-classes.
    pub dynamic: DynamicPseudoClasses,
}

/// One compound of a complex selector with the combinator before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorLink {
    /// How this compound relates to the previous link. The first link of a
    /// selector uses [`Axis::Descendant`].
    pub axis: Axis,
    /// The compound itself.
    pub compound: Compound,
    /// Compounds joined to this one with `+`, in document order: the last
    /// entry must match the immediately preceding element sibling.
    pub siblings: Vec<Compound>,
}

/// A compiled complex selector, before arena allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    /// Compounds from left to right; never empty.
    pub links: Vec<SelectorLink>,
    /// `::name` on the subject compound, lowercased.
    pub pseudo_element: Option<String>,
    /// Specificity of the whole selector.
    pub specificity: Specificity,
}

/// Compile one selector (no commas) into a [`ComplexSelector`].
///
/// # Errors
///
/// Returns a [`SelectorError`] if the text is not a selector this engine
/// can match. Callers drop the selector, not the whole rule.
pub fn compile_selector(
    text: &str,
    namespaces: &NamespaceMap,
) -> Result<ComplexSelector, SelectorError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(SelectorError::Empty);
    }

    let mut parser = SelectorParser {
        chars: trimmed.chars().peekable(),
        namespaces,
        specificity: Specificity::default(),
        pseudo_element: None,
    };

    let mut links = Vec::new();
    let mut pending_siblings: Vec<Compound> = Vec::new();
    let mut axis = Axis::Descendant;

    loop {
        let compound = parser.parse_compound()?;

        if let Some(pe) = &parser.pseudo_element {
            // "Pseudo-elements may only be appended after the last compound."
            if parser.chars.peek().is_some() {
                return Err(SelectorError::MisplacedPseudoElement(pe.clone()));
            }
        }

        match parser.parse_combinator()? {
            None => {
                links.push(SelectorLink {
                    axis,
                    compound,
                    siblings: pending_siblings,
                });
                break;
            }
            Some('+') => pending_siblings.push(compound),
            Some(c) => {
                links.push(SelectorLink {
                    axis,
                    compound,
                    siblings: std::mem::take(&mut pending_siblings),
                });
                axis = if c == '>' { Axis::Child } else { Axis::Descendant };
            }
        }
    }

    Ok(ComplexSelector {
        links,
        pseudo_element: parser.pseudo_element,
        specificity: parser.specificity,
    })
}

struct SelectorParser<'a> {
    chars: Peekable<Chars<'a>>,
    namespaces: &'a NamespaceMap,
    specificity: Specificity,
    pseudo_element: Option<String>,
}

impl SelectorParser<'_> {
    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while self.chars.peek().is_some_and(char::is_ascii_whitespace) {
            let _ = self.chars.next();
            skipped = true;
        }
        skipped
    }

    fn consume_ident(&mut self) -> String {
        let mut ident = String::new();
        while let Some(&c) = self.chars.peek() {
            if !is_ident_char(c) {
                break;
            }
            ident.push(c);
            let _ = self.chars.next();
        }
        ident
    }

    /// [§ 16 Combinators](https://www.w3.org/TR/selectors-4/#combinators)
    ///
    /// Returns `None` at the end of input, `' '` for a descendant combinator,
    /// otherwise the combinator character.
    fn parse_combinator(&mut self) -> Result<Option<char>, SelectorError> {
        let had_space = self.skip_whitespace();
        let combinator = match self.chars.peek() {
            None => return Ok(None),
            Some(&c @ ('>' | '+')) => {
                let _ = self.chars.next();
                c
            }
            Some('~') => return Err(SelectorError::UnsupportedCombinator('~')),
            Some(_) if had_space => ' ',
            Some(&c) => return Err(SelectorError::UnexpectedCharacter(c)),
        };
        let _ = self.skip_whitespace();
        if self.chars.peek().is_none() || self.chars.peek().is_some_and(|c| matches!(c, '>' | '+'))
        {
            return Err(SelectorError::DanglingCombinator);
        }
        Ok(Some(combinator))
    }

    /// [§ 5.1 Type selectors](https://www.w3.org/TR/selectors-4/#type-selectors)
    /// and [§ 5.3 Namespaces](https://www.w3.org/TR/selectors-4/#type-nmsp)
    ///
    /// Returns whether a type or universal selector was present.
    fn parse_type_selector(&mut self, compound: &mut Compound) -> Result<bool, SelectorError> {
        // Namespace prefix part: `ns|`, `*|`, or `|`.
        let mut first: Option<String> = None;
        match self.chars.peek() {
            Some('*') => {
                let _ = self.chars.next();
                first = Some("*".to_string());
            }
            Some(&c) if is_ident_start_char(c) || c == '-' => {
                first = Some(self.consume_ident());
            }
            Some('|') => {}
            _ => {
                // No type selector; the default namespace still applies.
                compound.namespace = self.default_namespace();
                return Ok(false);
            }
        }

        if self.chars.peek() == Some(&'|') {
            let _ = self.chars.next();
            compound.namespace = match first.as_deref() {
                None => NamespaceConstraint::None,
                Some("*") => NamespaceConstraint::Any,
                Some(prefix) => NamespaceConstraint::Uri(
                    self.namespaces
                        .get(prefix)
                        .cloned()
                        .ok_or_else(|| SelectorError::UnknownNamespacePrefix(prefix.to_string()))?,
                ),
            };
            let name = match self.chars.peek() {
                Some('*') => {
                    let _ = self.chars.next();
                    "*".to_string()
                }
                Some(&c) if is_ident_start_char(c) || c == '-' => self.consume_ident(),
                Some(&c) => return Err(SelectorError::UnexpectedCharacter(c)),
                None => return Err(SelectorError::UnexpectedCharacter('|')),
            };
            self.set_tag(compound, &name);
        } else if let Some(name) = first {
            compound.namespace = self.default_namespace();
            self.set_tag(compound, &name);
        }
        Ok(true)
    }

    fn set_tag(&mut self, compound: &mut Compound, name: &str) {
        if name != "*" {
            compound.tag = Some(name.to_ascii_lowercase());
            self.specificity.2 += 1;
        }
    }

    fn default_namespace(&self) -> NamespaceConstraint {
        self.namespaces
            .get("")
            .map_or(NamespaceConstraint::Any, |uri| NamespaceConstraint::Uri(uri.clone()))
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let mut has_content = self.parse_type_selector(&mut compound)?;

        while let Some(&c) = self.chars.peek() {
            if !matches!(c, '.' | '#' | '[' | ':') {
                break;
            }
            if let Some(pe) = &self.pseudo_element {
                return Err(SelectorError::MisplacedPseudoElement(pe.clone()));
            }
            let _ = self.chars.next();
            match c {
                // [§ 6.6 Class selectors](https://www.w3.org/TR/selectors-4/#class-html)
                '.' => {
                    let name = self.consume_ident();
                    if name.is_empty() {
                        return Err(SelectorError::UnexpectedCharacter('.'));
                    }
                    compound.conditions.push(Condition::Class(name));
                    self.specificity.1 += 1;
                }
                // [§ 6.7 ID selectors](https://www.w3.org/TR/selectors-4/#id-selectors)
                '#' => {
                    let name = self.consume_ident();
                    if name.is_empty() {
                        return Err(SelectorError::UnexpectedCharacter('#'));
                    }
                    compound.conditions.push(Condition::Id(name));
                    self.specificity.0 += 1;
                }
                '[' => {
                    let condition = self.parse_attribute()?;
                    compound.conditions.push(condition);
                    self.specificity.1 += 1;
                }
                _ => self.parse_pseudo(&mut compound)?,
            }
            has_content = true;
        }

        if has_content {
            return Ok(compound);
        }
        Err(match self.chars.peek() {
            Some('>' | '+') => SelectorError::DanglingCombinator,
            Some(&c) => SelectorError::UnexpectedCharacter(c),
            None => SelectorError::Empty,
        })
    }

    /// [§ 6 Attribute selectors](https://www.w3.org/TR/selectors-4/#attribute-selectors)
    ///
    /// Called with the opening `[` already consumed.
    fn parse_attribute(&mut self) -> Result<Condition, SelectorError> {
        let _ = self.skip_whitespace();

        let mut namespace = NamespaceConstraint::None;
        let mut name = if self.chars.peek() == Some(&'*') {
            let _ = self.chars.next();
            "*".to_string()
        } else {
            self.consume_ident()
        };

        // `ns|attr`, `*|attr`, or `|attr`; but not the `|=` operator.
        if self.chars.peek() == Some(&'|') {
            let mut lookahead = self.chars.clone();
            let _ = lookahead.next();
            if lookahead.peek() != Some(&'=') {
                let _ = self.chars.next();
                namespace = match name.as_str() {
                    "" => NamespaceConstraint::None,
                    "*" => NamespaceConstraint::Any,
                    prefix => NamespaceConstraint::Uri(
                        self.namespaces
                            .get(prefix)
                            .cloned()
                            .ok_or_else(|| SelectorError::UnknownNamespacePrefix(prefix.to_string()))?,
                    ),
                };
                name = self.consume_ident();
            }
        }

        if name.is_empty() || name == "*" {
            return Err(SelectorError::MalformedAttribute);
        }
        let _ = self.skip_whitespace();

        let operator = match self.chars.next() {
            Some(']') => {
                return Ok(Condition::Attribute(AttributeCondition {
                    namespace,
                    name,
                    operator: AttributeOperator::Exists,
                }));
            }
            Some('=') => "=",
            Some(c @ ('~' | '|' | '^' | '$' | '*')) => {
                if self.chars.next() != Some('=') {
                    return Err(SelectorError::MalformedAttribute);
                }
                match c {
                    '~' => "~=",
                    '|' => "|=",
                    '^' => "^=",
                    '$' => "$=",
                    _ => "*=",
                }
            }
            _ => return Err(SelectorError::MalformedAttribute),
        };

        let value = self.parse_attribute_value()?;
        let _ = self.skip_whitespace();
        // Case-sensitivity flags are accepted and ignored.
        if self.chars.peek().is_some_and(|c| matches!(c, 'i' | 's' | 'I' | 'S')) {
            let _ = self.chars.next();
            let _ = self.skip_whitespace();
        }
        if self.chars.next() != Some(']') {
            return Err(SelectorError::MalformedAttribute);
        }

        let operator = match operator {
            "=" => AttributeOperator::Equals(value),
            "~=" => AttributeOperator::Includes(value),
            "|=" => AttributeOperator::DashMatch(value),
            "^=" => AttributeOperator::Prefix(value),
            "$=" => AttributeOperator::Suffix(value),
            _ => AttributeOperator::Substring(value),
        };
        Ok(Condition::Attribute(AttributeCondition {
            namespace,
            name,
            operator,
        }))
    }

    /// Quoted string or identifier.
    fn parse_attribute_value(&mut self) -> Result<String, SelectorError> {
        let _ = self.skip_whitespace();
        match self.chars.peek() {
            Some(&q @ ('"' | '\'')) => {
                let _ = self.chars.next();
                let mut value = String::new();
                for c in self.chars.by_ref() {
                    if c == q {
                        return Ok(value);
                    }
                    value.push(c);
                }
                Err(SelectorError::MalformedAttribute)
            }
            Some(_) => {
                let value = self.consume_ident();
                if value.is_empty() {
                    Err(SelectorError::MalformedAttribute)
                } else {
                    Ok(value)
                }
            }
            None => Err(SelectorError::MalformedAttribute),
        }
    }

    /// Called with the first `:` already consumed.
    ///
    /// [§ 3.6 Pseudo-elements](https://www.w3.org/TR/selectors-4/#pseudo-elements)
    /// [§ 4 Pseudo-classes](https://www.w3.org/TR/selectors-4/#pseudo-classes)
    fn parse_pseudo(&mut self, compound: &mut Compound) -> Result<(), SelectorError> {
        let double = self.chars.peek() == Some(&':');
        if double {
            let _ = self.chars.next();
        }
        let name = self.consume_ident().to_ascii_lowercase();
        if name.is_empty() {
            return Err(self
                .chars
                .peek()
                .map_or(SelectorError::UnexpectedCharacter(':'), |&c| {
                    SelectorError::UnexpectedCharacter(c)
                }));
        }

        // "For compatibility with existing style sheets, user agents must
        // also accept the previous one-colon notation for pseudo-elements
        // introduced in CSS levels 1 and 2."
        let legacy_pseudo_element = !double
            && matches!(
                name.as_str(),
                "before" | "after" | "first-line" | "first-letter"
            );
        if double || legacy_pseudo_element {
            if self.pseudo_element.is_some() {
                return Err(SelectorError::MisplacedPseudoElement(name));
            }
            self.specificity.2 += 1;
            self.pseudo_element = Some(name);
            return Ok(());
        }
        if let Some(pe) = &self.pseudo_element {
            return Err(SelectorError::MisplacedPseudoElement(pe.clone()));
        }

        self.specificity.1 += 1;
        let argument = if self.chars.peek() == Some(&'(') {
            let _ = self.chars.next();
            Some(self.consume_parenthesized(&name)?)
        } else {
            None
        };

        if let Some(dynamic) = DynamicPseudoClass::from_name(&name) {
            compound.dynamic.insert(dynamic);
            return Ok(());
        }

        let condition = match (name.as_str(), argument) {
            ("first-child", None) => Condition::FirstChild,
            ("last-child", None) => Condition::LastChild,
            ("only-child", None) => Condition::OnlyChild,
            ("root", None) => Condition::Root,
            ("link", None) => Condition::Link,
            ("nth-child", Some(arg)) => {
                let (a, b) = parse_nth(&arg)
                    .ok_or_else(|| SelectorError::MalformedPseudoClass(name.clone()))?;
                Condition::NthChild { a, b }
            }
            ("lang", Some(arg)) => {
                let code = arg.trim().trim_matches(|c| c == '"' || c == '\'');
                if code.is_empty() {
                    return Err(SelectorError::MalformedPseudoClass(name.clone()));
                }
                Condition::Lang(code.to_string())
            }
            _ => {
                warn_once(
                    "CSS",
                    &format!("pseudo-class ':{name}' is not supported and never matches"),
                );
                Condition::Unsupported(name.clone())
            }
        };
        compound.conditions.push(condition);
        Ok(())
    }

    /// Consume up to the matching `)` and return the text inside.
    fn consume_parenthesized(&mut self, name: &str) -> Result<String, SelectorError> {
        let mut depth = 1u32;
        let mut inner = String::new();
        for c in self.chars.by_ref() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(inner);
                    }
                }
                _ => {}
            }
            inner.push(c);
        }
        Err(SelectorError::MalformedPseudoClass(name.to_string()))
    }
}

/// [§ 6 The An+B microsyntax](https://www.w3.org/TR/css-syntax-3/#anb-microsyntax)
fn parse_nth(arg: &str) -> Option<(i32, i32)> {
    let compact: String = arg
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();

    match compact.as_str() {
        "odd" => return Some((2, 1)),
        "even" => return Some((2, 0)),
        "" => return None,
        _ => {}
    }

    let Some((a_part, b_part)) = compact.split_once('n') else {
        return compact.parse().ok().map(|b| (0, b));
    };
    let a = match a_part {
        "" | "+" => 1,
        "-" => -1,
        digits => digits.parse().ok()?,
    };
    let b = if b_part.is_empty() {
        0
    } else if b_part.starts_with('+') || b_part.starts_with('-') {
        b_part.parse().ok()?
    } else {
        return None;
    };
    Some((a, b))
}

/// [§ 4.3.10 ident-start code point](https://www.w3.org/TR/css-syntax-3/#ident-start-code-point)
const fn is_ident_start_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

/// [§ 4.3.9 ident code point](https://www.w3.org/TR/css-syntax-3/#ident-code-point)
const fn is_ident_char(c: char) -> bool {
    is_ident_start_char(c) || c.is_ascii_digit() || c == '-'
}
