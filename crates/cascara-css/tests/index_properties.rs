//! Property tests for the selector index: whatever the document and the
//! stylesheet, a lookup never loses a selector that actually matches.

use cascara_css::{Matcher, Origin, SelectorIndex, StyleCollection, Stylesheet, StylesheetInfo};
use cascara_dom::{DomTree, ElementData, NodeId};
use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;

const TAGS: &[&str] = &["div", "p", "span", "li"];
const CLASSES: &[&str] = &["a", "b", "c"];
const IDS: &[&str] = &["x", "y"];
const SIMPLE: &[&str] = &[
    ".a", ".b", ".c", "#x", "#y", "[title]", ":first-child", ":last-child", ":hover", ":nth-child(odd)",
];
const PREFIXES: &[&str] = &["", "", "", "div ", "div > ", "p + ", "span "];

#[derive(Debug, Clone)]
struct Element {
    /// Index of the parent among earlier elements; `None` for the root.
    parent: Option<usize>,
    tag: &'static str,
    classes: Vec<&'static str>,
    id: Option<&'static str>,
    title: bool,
}

#[derive(Debug, Clone)]
struct Case {
    elements: Vec<Element>,
    selectors: Vec<String>,
}

fn pick<T: Copy>(g: &mut Gen, items: &[T]) -> T {
    *g.choose(items).unwrap_or(&items[0])
}

impl Arbitrary for Case {
    fn arbitrary(g: &mut Gen) -> Self {
        let element_count = usize::arbitrary(g) % 12 + 1;
        let elements = (0..element_count)
            .map(|i| Element {
                parent: (i > 0).then(|| usize::arbitrary(g) % i),
                tag: pick(g, TAGS),
                classes: CLASSES
                    .iter()
                    .copied()
                    .filter(|_| bool::arbitrary(g))
                    .collect(),
                id: if bool::arbitrary(g) { Some(pick(g, IDS)) } else { None },
                title: bool::arbitrary(g),
            })
            .collect();

        let selector_count = usize::arbitrary(g) % 10 + 1;
        let selectors = (0..selector_count)
            .map(|_| {
                let mut text = pick(g, PREFIXES).to_string();
                let tag = pick(g, &["*", "div", "p", "span", "li", ""]);
                text.push_str(tag);
                for _ in 0..usize::arbitrary(g) % 3 {
                    text.push_str(pick(g, SIMPLE));
                }
                if text.is_empty() || text.ends_with(' ') {
                    text.push('*');
                }
                text
            })
            .collect();

        Self {
            elements,
            selectors,
        }
    }
}

fn build_tree(case: &Case) -> (DomTree, Vec<NodeId>) {
    let mut tree = DomTree::new();
    let mut ids = Vec::with_capacity(case.elements.len());
    for element in &case.elements {
        let parent = element.parent.map_or(NodeId::ROOT, |i| ids[i]);
        let mut data = ElementData::new(element.tag);
        if !element.classes.is_empty() {
            data = data.with_attr("class", &element.classes.join(" "));
        }
        if let Some(id) = element.id {
            data = data.with_attr("id", id);
        }
        if element.title {
            data = data.with_attr("title", "t");
        }
        ids.push(tree.append_element(parent, data));
    }
    (tree, ids)
}

fn collection(case: &Case) -> StyleCollection {
    let css: String = case
        .selectors
        .iter()
        .map(|s| format!("{s} {{ x: 1 }}\n"))
        .collect();
    StyleCollection::build(
        &[StylesheetInfo::all_media(Stylesheet::parse(&css, Origin::Author))],
        "screen",
    )
}

#[quickcheck]
fn prop_lookup_is_superset_of_structural_matches(case: Case) -> bool {
    let (tree, elements) = build_tree(&case);
    let styles = collection(&case);
    let index = SelectorIndex::populate(&styles);

    elements.iter().all(|&e| {
        let candidates = index.get_possible_matches(e, &tree, &tree);
        styles.top_level().iter().enumerate().all(|(position, &id)| {
            let selector = styles.selector(id);
            !selector.matches(styles.arena(), e, &tree, &tree) || candidates.contains(&position)
        })
    })
}

#[quickcheck]
fn prop_lookup_is_sorted_and_unique(case: Case) -> bool {
    let (tree, elements) = build_tree(&case);
    let styles = collection(&case);
    let index = SelectorIndex::populate(&styles);

    elements.iter().all(|&e| {
        let candidates = index.get_possible_matches(e, &tree, &tree);
        candidates.windows(2).all(|w| w[0] < w[1])
            && candidates.iter().all(|&p| p < styles.len())
    })
}

#[quickcheck]
fn prop_cached_styles_are_stable(case: Case) -> bool {
    let (tree, elements) = build_tree(&case);
    let css: String = case
        .selectors
        .iter()
        .map(|s| format!("{s} {{ x: 1 }}\n"))
        .collect();
    let mut matcher: Matcher<NodeId, DomTree> = Matcher::new(
        tree,
        &[StylesheetInfo::all_media(Stylesheet::parse(&css, Origin::Author))],
        "screen",
    );

    let first: Vec<_> = elements
        .iter()
        .map(|&e| matcher.get_cascaded_style(e, false))
        .collect();
    let second: Vec<_> = elements
        .iter()
        .map(|&e| matcher.get_cascaded_style(e, false))
        .collect();
    first == second
}
