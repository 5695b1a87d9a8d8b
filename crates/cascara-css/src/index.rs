//! Coarse selector filter.
//!
//! Top-level selectors are bucketed by the class, id, and tag names they
//! require, so that for a given element only the selectors that could
//! possibly match it are evaluated. Lookups return a superset of the
//! selectors that actually match; everything the buckets cannot reason about
//! lands in `misc` and is always returned.

use std::collections::HashSet;

use crate::collection::StyleCollection;
use crate::resolver::{AttributeResolver, TreeResolver};
use crate::selector::{Axis, Condition};

/// Bucketed positions of every top-level selector. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct SelectorIndex {
    /// `(class name, position)`, sorted by name then position.
    class_bucket: Vec<(String, usize)>,
    /// `(id, position)`, sorted.
    id_bucket: Vec<(String, usize)>,
    /// `(lowercased tag, position)`, sorted.
    tag_bucket: Vec<(String, usize)>,
    /// Eligible selectors with no type selector.
    no_tag: HashSet<usize>,
    /// Eligible selectors with no conditions.
    no_condition: HashSet<usize>,
    /// Ineligible selectors; candidates for every element.
    misc: HashSet<usize>,
}

impl SelectorIndex {
    /// Bucket every top-level selector of `styles`.
    ///
    /// A selector is eligible for bucketing when it has the descendant axis,
    /// no sibling selector, and either no conditions or at least one class or
    /// id condition. A selector with class/id conditions *and* other
    /// conditions is still bucketed by its class/id names: the bucket only
    /// narrows the candidates, full matching runs afterwards.
    #[must_use]
    pub fn populate(styles: &StyleCollection) -> Self {
        let mut index = Self::default();

        for (position, &id) in styles.top_level().iter().enumerate() {
            let selector = styles.selector(id);

            let eligible = selector.axis == Axis::Descendant
                && selector.sibling.is_none()
                && (selector.conditions.is_empty() || selector.has_class_or_id());
            if !eligible {
                let _ = index.misc.insert(position);
                continue;
            }

            match &selector.tag {
                Some(tag) => index.tag_bucket.push((tag.to_ascii_lowercase(), position)),
                None => {
                    let _ = index.no_tag.insert(position);
                }
            }

            if selector.conditions.is_empty() {
                let _ = index.no_condition.insert(position);
                continue;
            }
            for condition in &selector.conditions {
                match condition {
                    Condition::Class(name) => index.class_bucket.push((name.clone(), position)),
                    Condition::Id(name) => index.id_bucket.push((name.clone(), position)),
                    _ => {}
                }
            }
        }

        index.class_bucket.sort_unstable();
        index.id_bucket.sort_unstable();
        index.tag_bucket.sort_unstable();
        index
    }

    /// Positions of the selectors that might match `e`, ascending.
    pub fn get_possible_matches<E, A, T>(&self, e: E, attrs: &A, tree: &T) -> Vec<usize>
    where
        E: Copy,
        A: AttributeResolver<E> + ?Sized,
        T: TreeResolver<E> + ?Sized,
    {
        let mut class_id = self.no_condition.clone();
        if let Some(id) = attrs.id(e) {
            lookup(&self.id_bucket, id, &mut class_id);
        }
        if let Some(classes) = attrs.class(e) {
            for class in classes.split_ascii_whitespace() {
                lookup(&self.class_bucket, class, &mut class_id);
            }
        }

        let mut by_tag = HashSet::new();
        lookup(
            &self.tag_bucket,
            &tree.element_name(e).to_ascii_lowercase(),
            &mut by_tag,
        );

        let mut result: Vec<usize> = class_id
            .into_iter()
            .filter(|position| self.no_tag.contains(position) || by_tag.contains(position))
            .chain(self.misc.iter().copied())
            .collect();
        result.sort_unstable();
        result.dedup();
        result
    }

    /// Number of selectors that every lookup returns.
    #[must_use]
    pub fn misc_len(&self) -> usize {
        self.misc.len()
    }
}

/// Binary search for the first entry named `name`, then scan forward while
/// the name matches.
fn lookup(bucket: &[(String, usize)], name: &str, out: &mut HashSet<usize>) {
    let start = bucket.partition_point(|(entry, _)| entry.as_str() < name);
    for (_, position) in bucket[start..].iter().take_while(|(entry, _)| entry == name) {
        let _ = out.insert(*position);
    }
}
