//! Incremental matching cache.
//!
//! A [`Mapper`] stands for "an element reached through this sequence of
//! matched selector sets". It remembers which chain links its descendants
//! still owe (`axes`), which links its children must not see again
//! (`discounted`), and the selectors that fully matched. Children are keyed
//! by the exact set of selectors that matched them, so siblings with the
//! same outcome share one node and the next element below them starts from
//! the same state.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;

use crate::collection::StyleCollection;
use crate::index::SelectorIndex;
use crate::resolver::{AttributeResolver, TreeResolver};
use crate::selector::{Axis, DynamicPseudoClass, DynamicPseudoClasses, SelectorId};

/// Index of a [`Mapper`] in a [`MapperTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MapperId(pub(crate) usize);

/// Identity of a matched selector set: selector ids in match order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectorSetKey(Vec<SelectorId>);

/// A `(position, selector)` pair; positions order the cascade.
type Entry = (usize, SelectorId);

/// One node of the matching cache.
#[derive(Debug, Clone, Default)]
pub struct Mapper {
    /// Chain links descendants may still complete, ordered by position.
    axes: Vec<Entry>,
    /// Child-axis links that already had their one chance at the parent
    /// level.
    discounted: HashSet<SelectorId>,
    /// Fully matched selectors without a pseudo-element, in match order.
    mapped: Vec<SelectorId>,
    /// Fully matched pseudo-element selectors, grouped by pseudo-element.
    pseudo_selectors: BTreeMap<String, Vec<SelectorId>>,
    children: HashMap<SelectorSetKey, MapperId>,
}

impl Mapper {
    /// Terminal selectors whose declarations apply, in cascade order.
    #[must_use]
    pub fn mapped(&self) -> &[SelectorId] {
        &self.mapped
    }

    /// Pseudo-element selectors for `name`, in cascade order.
    #[must_use]
    pub fn pseudo_selectors(&self, name: &str) -> &[SelectorId] {
        self.pseudo_selectors.get(name).map_or(&[], Vec::as_slice)
    }

    /// Whether any pseudo-element selector matched.
    #[must_use]
    pub fn has_pseudo_selectors(&self) -> bool {
        !self.pseudo_selectors.is_empty()
    }

    /// Pending chain links as `(position, selector)`.
    #[must_use]
    pub fn axes(&self) -> &[(usize, SelectorId)] {
        &self.axes
    }

    /// Number of distinct matched-set children created so far.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// Elements registered against each dynamic pseudo-class: every element
/// that structurally matched a selector requiring it, whatever its current
/// state. A change of that state is what can restyle these elements.
#[derive(Debug, Clone)]
pub struct DynamicStateSets<E> {
    hover: HashSet<E>,
    active: HashSet<E>,
    focus: HashSet<E>,
    visited: HashSet<E>,
}

impl<E> Default for DynamicStateSets<E> {
    fn default() -> Self {
        Self {
            hover: HashSet::new(),
            active: HashSet::new(),
            focus: HashSet::new(),
            visited: HashSet::new(),
        }
    }
}

impl<E: Copy + Eq + Hash> DynamicStateSets<E> {
    fn set_mut(&mut self, pc: DynamicPseudoClass) -> &mut HashSet<E> {
        match pc {
            DynamicPseudoClass::Hover => &mut self.hover,
            DynamicPseudoClass::Active => &mut self.active,
            DynamicPseudoClass::Focus => &mut self.focus,
            DynamicPseudoClass::Visited => &mut self.visited,
        }
    }

    /// Register `e` for every pseudo-class in `classes`.
    pub fn register(&mut self, e: E, classes: DynamicPseudoClasses) {
        for pc in classes.iter() {
            let _ = self.set_mut(pc).insert(e);
        }
    }

    /// Whether `e` is registered for `pc`.
    #[must_use]
    pub fn contains(&self, e: E, pc: DynamicPseudoClass) -> bool {
        match pc {
            DynamicPseudoClass::Hover => self.hover.contains(&e),
            DynamicPseudoClass::Active => self.active.contains(&e),
            DynamicPseudoClass::Focus => self.focus.contains(&e),
            DynamicPseudoClass::Visited => self.visited.contains(&e),
        }
    }
}

/// Arena of [`Mapper`]s; the root lives at index 0.
#[derive(Debug, Clone)]
pub struct MapperTree {
    nodes: Vec<Mapper>,
}

impl Default for MapperTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MapperTree {
    /// A tree holding only the root mapper, with no pending links.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Mapper::default()],
        }
    }

    /// The root mapper: the virtual parent of the document element.
    #[must_use]
    pub const fn root(&self) -> MapperId {
        MapperId(0)
    }

    /// Look up a mapper.
    ///
    /// # Panics
    ///
    /// Panics if `id` came from another tree.
    #[must_use]
    pub fn get(&self, id: MapperId) -> &Mapper {
        &self.nodes[id.0]
    }

    /// Number of mappers, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root exists from construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Match `e`, a child element of the element mapped by `parent`, and
    /// return the (possibly shared) mapper for it.
    ///
    /// Candidates are the index's coarse matches merged with the parent's
    /// pending chain links. Every element that structurally matches a
    /// selector requiring a dynamic pseudo-class is registered in
    /// `dynamic`, matched or not.
    ///
    /// # Panics
    ///
    /// Panics if a candidate or a chain link has the next-sibling axis. The
    /// stylesheet compiler attaches next-sibling compounds as sibling
    /// selectors, so this only happens for hand-built selectors.
    pub fn map_child<E, D>(
        &mut self,
        parent: MapperId,
        e: E,
        styles: &StyleCollection,
        index: &SelectorIndex,
        document: &D,
        dynamic: &mut DynamicStateSets<E>,
    ) -> MapperId
    where
        E: Copy + Eq + Hash,
        D: TreeResolver<E> + AttributeResolver<E> + ?Sized,
    {
        let arena = styles.arena();
        let parent_node = &self.nodes[parent.0];

        let from_index: Vec<Entry> = index
            .get_possible_matches(e, document, document)
            .into_iter()
            .map(|position| (position, styles.at_position(position)))
            .collect();
        let candidates = merge_ordered(&from_index, &parent_node.axes);

        let mut matched: Vec<Entry> = Vec::new();
        let mut child_axis: Vec<SelectorId> = Vec::new();
        for &(position, id) in &candidates {
            if parent_node.discounted.contains(&id) {
                continue;
            }
            let selector = arena.get(id);
            match selector.axis {
                Axis::ImmediateSibling => panic!(
                    "selector at position {position} has a next-sibling axis and cannot be \
                     matched against descendants"
                ),
                Axis::Child => child_axis.push(id),
                Axis::Descendant => {}
            }

            if !selector.matches(arena, e, document, document) {
                continue;
            }
            dynamic.register(e, selector.dynamic);
            // Pseudo-element selectors check dynamic state when queried.
            if selector.pseudo_element.is_none() && !selector.matches_dynamic(e, document) {
                continue;
            }
            matched.push((position, id));
        }

        let key = SelectorSetKey(matched.iter().map(|&(_, id)| id).collect());
        if let Some(&existing) = parent_node.children.get(&key) {
            #[cfg(feature = "match-trace")]
            eprintln!(
                "[MATCH] reuse mapper {} under {} ({} selectors)",
                existing.0,
                parent.0,
                key.0.len()
            );
            return existing;
        }

        let mut new_axes: Vec<Entry> = Vec::new();
        let mut mapped = Vec::new();
        let mut pseudo_selectors: BTreeMap<String, Vec<SelectorId>> = BTreeMap::new();
        for &(position, id) in &matched {
            let selector = arena.get(id);
            if let Some(chain) = selector.chain {
                assert!(
                    arena.get(chain).axis != Axis::ImmediateSibling,
                    "chain link of selector at position {position} has a next-sibling axis"
                );
                new_axes.push((position, chain));
            } else if let Some(pe) = &selector.pseudo_element {
                pseudo_selectors.entry(pe.clone()).or_default().push(id);
            } else {
                mapped.push(id);
            }
        }
        new_axes.sort_unstable();

        // A child-axis link gets one chance, at this level. It comes back
        // only when something at this level re-adds it.
        let mut discounted = parent_node.discounted.clone();
        discounted.extend(child_axis);
        for (_, id) in &new_axes {
            let _ = discounted.remove(id);
        }

        let child = Mapper {
            axes: merge_ordered(&new_axes, &parent_node.axes),
            discounted,
            mapped,
            pseudo_selectors,
            children: HashMap::new(),
        };

        let id = MapperId(self.nodes.len());
        self.nodes.push(child);
        let _ = self.nodes[parent.0].children.insert(key, id);

        #[cfg(feature = "match-trace")]
        eprintln!(
            "[MATCH] new mapper {} under {}: {} mapped, {} axes",
            id.0,
            parent.0,
            self.nodes[id.0].mapped.len(),
            self.nodes[id.0].axes.len()
        );
        id
    }
}

/// Merge two `(position, selector)` lists that are each sorted, keeping the
/// result sorted and dropping exact duplicates.
fn merge_ordered(left: &[Entry], right: &[Entry]) -> Vec<Entry> {
    let mut out: Vec<Entry> = Vec::with_capacity(left.len() + right.len());
    let (mut i, mut j) = (0, 0);
    while i < left.len() || j < right.len() {
        let next = match (left.get(i), right.get(j)) {
            (Some(&l), Some(&r)) if l <= r => {
                i += 1;
                if l == r {
                    j += 1;
                }
                l
            }
            (Some(_), Some(&r)) | (None, Some(&r)) => {
                j += 1;
                r
            }
            (Some(&l), None) => {
                i += 1;
                l
            }
            (None, None) => break,
        };
        if out.last() != Some(&next) {
            out.push(next);
        }
    }
    out
}
