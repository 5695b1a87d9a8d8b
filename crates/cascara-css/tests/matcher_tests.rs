//! Integration tests for element matching, mapper sharing, and cascaded
//! style queries.

use cascara_css::{
    Axis, CascadedStyle, DeclarationParser, Matcher, Origin, StyleCollectionBuilder, Stylesheet,
    StylesheetInfo, compile_selector,
};
use cascara_css::parser::Ruleset;
use cascara_css::selector::NamespaceMap;
use cascara_dom::{DomTree, ElementData, NodeId};

fn author(css: &str) -> StylesheetInfo {
    StylesheetInfo::all_media(Stylesheet::parse(css, Origin::Author))
}

fn matcher(tree: DomTree, css: &str) -> Matcher<NodeId, DomTree> {
    Matcher::new(tree, &[author(css)], "screen")
}

/// All values of `property`, in cascade order.
fn values<'a>(style: &'a CascadedStyle, property: &str) -> Vec<&'a str> {
    style
        .declarations
        .iter()
        .filter(|d| d.property == property)
        .map(|d| d.value.as_str())
        .collect()
}

fn winner<'a>(style: &'a CascadedStyle, property: &str) -> Option<&'a str> {
    style.get(property).map(|d| d.value.as_str())
}

// ========== ordering ==========

#[test]
fn test_rank_order_within_one_element() {
    let mut tree = DomTree::new();
    let div = tree.append_element(
        NodeId::ROOT,
        ElementData::new("div").with_attr("id", "b").with_attr("class", "a"),
    );

    let mut m = matcher(tree, ".a { x: 1 } #b { x: 2 } div { x: 3 }");
    let style = m.get_cascaded_style(div, false);

    assert_eq!(values(&style, "x"), vec!["3", "1", "2"]);
    assert_eq!(winner(&style, "x"), Some("2"));
}

#[test]
fn test_origins_order_before_specificity() {
    let mut tree = DomTree::new();
    let p = tree.append_element(NodeId::ROOT, ElementData::new("p").with_attr("id", "intro"));

    let sheets = [
        author("p { color: author }"),
        StylesheetInfo::all_media(Stylesheet::parse("#intro { color: ua }", Origin::UserAgent)),
        StylesheetInfo::all_media(Stylesheet::parse("p { color: user }", Origin::User)),
    ];
    let mut m: Matcher<NodeId, DomTree> = Matcher::new(tree, &sheets, "screen");
    let style = m.get_cascaded_style(p, false);

    assert_eq!(values(&style, "color"), vec!["ua", "user", "author"]);
    assert_eq!(winner(&style, "color"), Some("author"));
}

#[test]
fn test_important_user_beats_author() {
    let mut tree = DomTree::new();
    let p = tree.append_element(NodeId::ROOT, ElementData::new("p"));

    let sheets = [
        StylesheetInfo::all_media(Stylesheet::parse(
            "p { color: black !important }",
            Origin::User,
        )),
        author("#x, p { color: red !important } p { color: blue }"),
    ];
    let mut m: Matcher<NodeId, DomTree> = Matcher::new(tree, &sheets, "screen");
    let style = m.get_cascaded_style(p, false);

    assert_eq!(winner(&style, "color"), Some("black"));
}

#[test]
fn test_hints_below_rules_below_inline() {
    let mut tree = DomTree::new();
    let body = tree.append_element(NodeId::ROOT, ElementData::new("body"));
    let hinted = tree.append_element(body, ElementData::new("div").with_attr("bgcolor", "red"));
    let inline = tree.append_element(
        body,
        ElementData::new("div")
            .with_attr("bgcolor", "red")
            .with_attr("style", "background-color: blue"),
    );

    let mut m = matcher(tree, "body > div { background-color: green }");

    let style = m.get_cascaded_style(hinted, false);
    assert_eq!(values(&style, "background-color"), vec!["red", "green"]);
    assert_eq!(winner(&style, "background-color"), Some("green"));

    let style = m.get_cascaded_style(inline, false);
    assert_eq!(values(&style, "background-color"), vec!["red", "green", "blue"]);
    assert_eq!(winner(&style, "background-color"), Some("blue"));
}

#[test]
fn test_inline_style_beats_id_selector() {
    let mut tree = DomTree::new();
    let p = tree.append_element(
        NodeId::ROOT,
        ElementData::new("p").with_attr("id", "main").with_attr("style", "color: red"),
    );

    let mut m = matcher(tree, "#main#main { color: blue }");
    assert_eq!(winner(&m.get_cascaded_style(p, false), "color"), Some("red"));
}

#[test]
fn test_no_match_is_empty() {
    let mut tree = DomTree::new();
    let p = tree.append_element(NodeId::ROOT, ElementData::new("p"));

    let mut m = matcher(tree, "div { color: red }");
    let style = m.get_cascaded_style(p, false);
    assert!(style.is_empty());
    assert_eq!(style, CascadedStyle::empty());
}

#[test]
fn test_repeated_queries_are_deterministic() {
    let mut tree = DomTree::new();
    let ul = tree.append_element(NodeId::ROOT, ElementData::new("ul"));
    let li = tree.append_element(ul, ElementData::new("li").with_attr("class", "item"));

    let mut m = matcher(tree, "ul li { a: 1 } .item { b: 2 } li:first-child { c: 3 }");
    let first = m.get_cascaded_style(li, false);
    let mappers = m.mapper_count();
    let second = m.get_cascaded_style(li, false);

    assert_eq!(first, second);
    assert_eq!(m.mapper_count(), mappers);
    assert_eq!(first.declarations.len(), 3);
}

// ========== combinators ==========

#[test]
fn test_child_axis_is_not_inherited_by_grandchildren() {
    let mut tree = DomTree::new();
    let div = tree.append_element(NodeId::ROOT, ElementData::new("div"));
    let p = tree.append_element(div, ElementData::new("p"));
    let span = tree.append_element(p, ElementData::new("span"));
    let section = tree.append_element(div, ElementData::new("section"));
    let nested_p = tree.append_element(section, ElementData::new("p"));

    let mut m = matcher(tree, "div > p { x: 1 }");

    assert_eq!(values(&m.get_cascaded_style(p, false), "x"), vec!["1"]);
    assert!(m.get_cascaded_style(span, false).is_empty());
    assert!(m.get_cascaded_style(nested_p, false).is_empty());
}

#[test]
fn test_child_chain_through_nested_same_tags() {
    // <div><div><div><p/></div></div></div>: the innermost p is a child of a
    // div that is a child of a div.
    let mut tree = DomTree::new();
    let outer = tree.append_element(NodeId::ROOT, ElementData::new("div"));
    let middle = tree.append_element(outer, ElementData::new("div"));
    let inner = tree.append_element(middle, ElementData::new("div"));
    let p = tree.append_element(inner, ElementData::new("p"));

    let mut m = matcher(tree, "div > div > p { x: 1 }");
    assert_eq!(values(&m.get_cascaded_style(p, false), "x"), vec!["1"]);
}

#[test]
fn test_child_chain_requires_direct_parent() {
    let mut tree = DomTree::new();
    let div = tree.append_element(NodeId::ROOT, ElementData::new("div"));
    let span = tree.append_element(div, ElementData::new("span"));
    let p = tree.append_element(span, ElementData::new("p"));

    let mut m = matcher(tree, "div > div > p { x: 1 }");
    assert!(m.get_cascaded_style(p, false).is_empty());
}

#[test]
fn test_descendant_chain() {
    let mut tree = DomTree::new();
    let ul = tree.append_element(NodeId::ROOT, ElementData::new("ul"));
    let li = tree.append_element(ul, ElementData::new("li"));
    let good = tree.append_element(li, ElementData::new("a"));
    let div = tree.append_element(ul, ElementData::new("div"));
    let bad = tree.append_element(div, ElementData::new("a"));

    let mut m = matcher(tree, "ul li a { x: 1 }");

    assert_eq!(values(&m.get_cascaded_style(good, false), "x"), vec!["1"]);
    assert!(m.get_cascaded_style(bad, false).is_empty());
}

#[test]
fn test_descendant_links_propagate_down_the_tree() {
    let mut tree = DomTree::new();
    let ul = tree.append_element(NodeId::ROOT, ElementData::new("ul"));
    let li = tree.append_element(ul, ElementData::new("li"));
    let div = tree.append_element(ul, ElementData::new("div"));

    let mut m = matcher(tree, "ul li a { x: 1 }");
    let ul_mapper = m.match_element(ul);
    let li_mapper = m.match_element(li);
    let div_mapper = m.match_element(div);

    // `ul` leaves a pending `li a`; `li` adds `a` and keeps `li a` for
    // deeper list items.
    assert_eq!(m.mapper(ul_mapper).axes().len(), 1);
    assert_eq!(m.mapper(li_mapper).axes().len(), 2);
    assert_eq!(m.mapper(div_mapper).axes(), m.mapper(ul_mapper).axes());
    assert!(m.mapper(li_mapper).mapped().is_empty());
}

#[test]
fn test_deep_document_matched_leaf_first() {
    let mut tree = DomTree::new();
    let mut leaf = tree.append_element(NodeId::ROOT, ElementData::new("div"));
    for _ in 1..20_000 {
        leaf = tree.append_element(leaf, ElementData::new("div"));
    }

    let mut m = matcher(tree, "div div { x: 1 }");
    assert_eq!(values(&m.get_cascaded_style(leaf, false), "x"), vec!["1"]);

    let document_element = m.document().document_element().unwrap();
    assert!(m.cached_mapper(document_element).is_some());
    assert!(m.get_cascaded_style(document_element, false).is_empty());
}

#[test]
fn test_descendant_chain_skips_generations() {
    let mut tree = DomTree::new();
    let html = tree.append_element(NodeId::ROOT, ElementData::new("html"));
    let body = tree.append_element(html, ElementData::new("body"));
    let main = tree.append_element(body, ElementData::new("main"));
    let em = tree.append_element(main, ElementData::new("em"));

    let mut m = matcher(tree, "html em { x: 1 } body > em { y: 2 }");
    let style = m.get_cascaded_style(em, false);
    assert_eq!(values(&style, "x"), vec!["1"]);
    assert!(values(&style, "y").is_empty());
}

#[test]
fn test_next_sibling_selector() {
    let mut tree = DomTree::new();
    let div = tree.append_element(NodeId::ROOT, ElementData::new("div"));
    let _ = tree.append_element(div, ElementData::new("h1"));
    let first = tree.append_element(div, ElementData::new("p"));
    let second = tree.append_element(div, ElementData::new("p"));

    let mut m = matcher(tree, "h1 + p { x: 1 } div h1 + p + p { y: 2 }");

    let style = m.get_cascaded_style(first, false);
    assert_eq!(values(&style, "x"), vec!["1"]);
    assert!(values(&style, "y").is_empty());

    let style = m.get_cascaded_style(second, false);
    assert!(values(&style, "x").is_empty());
    assert_eq!(values(&style, "y"), vec!["2"]);
}

#[test]
#[should_panic(expected = "next-sibling axis")]
fn test_sibling_axis_candidate_is_fatal() {
    let mut tree = DomTree::new();
    let p = tree.append_element(NodeId::ROOT, ElementData::new("p"));

    let mut builder = StyleCollectionBuilder::default();
    let ruleset = builder.add_ruleset(Ruleset::default());
    let mut selector = compile_selector("p", &NamespaceMap::new()).unwrap();
    selector.links[0].axis = Axis::ImmediateSibling;
    builder.add_selector(selector, Origin::Author, ruleset);

    let mut m = Matcher::with_parser(tree, builder.finish(), DeclarationParser);
    let _ = m.get_cascaded_style(p, false);
}

// ========== sharing and caching ==========

#[test]
fn test_siblings_with_equal_matches_share_a_mapper() {
    let mut tree = DomTree::new();
    let ul = tree.append_element(NodeId::ROOT, ElementData::new("ul"));
    let a = tree.append_element(ul, ElementData::new("li"));
    let b = tree.append_element(ul, ElementData::new("li"));
    let c = tree.append_element(ul, ElementData::new("li").with_attr("class", "hot"));

    let mut m = matcher(tree, "li { x: 1 } .hot { y: 2 }");
    let ma = m.match_element(a);
    let mb = m.match_element(b);
    let mc = m.match_element(c);

    assert_eq!(ma, mb);
    assert_ne!(ma, mc);
    // root + ul + shared li + hot li
    assert_eq!(m.mapper_count(), 4);

    let ul_mapper = m.cached_mapper(ul).unwrap();
    assert_eq!(m.mapper(ul_mapper).child_count(), 2);
    assert_eq!(m.mapper(ma).child_count(), 0);
}

#[test]
fn test_ancestors_are_matched_on_demand() {
    let mut tree = DomTree::new();
    let html = tree.append_element(NodeId::ROOT, ElementData::new("html"));
    let body = tree.append_element(html, ElementData::new("body"));
    let p = tree.append_element(body, ElementData::new("p"));

    let mut m = matcher(tree, "p { x: 1 }");
    let _ = m.get_cascaded_style(p, false);

    assert!(m.cached_mapper(html).is_some());
    assert!(m.cached_mapper(body).is_some());
    assert!(m.cached_mapper(p).is_some());
}

#[test]
fn test_remove_style_then_rematch() {
    let mut tree = DomTree::new();
    let p = tree.append_element(NodeId::ROOT, ElementData::new("p"));

    let mut m = matcher(tree, ".hot { color: red }");
    assert!(m.get_cascaded_style(p, false).is_empty());

    if let Some(element) = m.document_mut().as_element_mut(p) {
        let _ = element.attrs.insert("class".to_string(), "hot".to_string());
    }
    // Cached result survives until evicted.
    assert!(m.get_cascaded_style(p, false).is_empty());

    m.remove_style(p);
    assert!(m.cached_mapper(p).is_none());
    assert_eq!(winner(&m.get_cascaded_style(p, false), "color"), Some("red"));
}

// ========== pseudo-elements and dynamic pseudo-classes ==========

#[test]
fn test_pseudo_element_rules_are_isolated() {
    let mut tree = DomTree::new();
    let body = tree.append_element(NodeId::ROOT, ElementData::new("body"));
    let p = tree.append_element(body, ElementData::new("p"));
    let div = tree.append_element(body, ElementData::new("div"));

    let mut m = matcher(tree, "p { color: black } p::first-line { color: red } p:before { content: 'x' }");

    let style = m.get_cascaded_style(p, false);
    assert_eq!(values(&style, "color"), vec!["black"]);
    assert!(values(&style, "content").is_empty());

    let first_line = m.get_pe_cascaded_style(p, "first-line").unwrap();
    assert_eq!(values(&first_line, "color"), vec!["red"]);
    let before = m.get_pe_cascaded_style(p, "before").unwrap();
    assert_eq!(values(&before, "content"), vec!["'x'"]);
    assert!(m.get_pe_cascaded_style(p, "after").unwrap().is_empty());

    assert!(m.get_pe_cascaded_style(div, "first-line").is_none());
}

#[test]
fn test_hover_selector_registers_every_candidate() {
    let mut tree = DomTree::new();
    let body = tree.append_element(NodeId::ROOT, ElementData::new("body"));
    let first = tree.append_element(body, ElementData::new("a").with_attr("href", "#1"));
    let second = tree.append_element(body, ElementData::new("a").with_attr("href", "#2"));
    let span = tree.append_element(body, ElementData::new("span"));

    let mut m = matcher(tree, "a:hover { color: red }");
    assert!(m.get_cascaded_style(first, false).is_empty());
    assert!(m.get_cascaded_style(second, false).is_empty());
    let _ = m.get_cascaded_style(span, false);

    assert!(m.is_hover_styled(first));
    assert!(m.is_hover_styled(second));
    assert!(!m.is_hover_styled(span));
    assert!(!m.is_focus_styled(first));
}

#[test]
fn test_hover_restyle() {
    let mut tree = DomTree::new();
    let body = tree.append_element(NodeId::ROOT, ElementData::new("body"));
    let a = tree.append_element(body, ElementData::new("a").with_attr("href", "/"));
    let label = tree.append_element(a, ElementData::new("span"));

    let mut m = matcher(tree, "a:hover { color: red } a:hover span { color: blue }");
    assert!(m.get_cascaded_style(a, false).is_empty());
    assert!(m.get_cascaded_style(label, false).is_empty());

    if let Some(state) = m.document_mut().state_mut(a) {
        state.hover = true;
    }
    assert_eq!(winner(&m.get_cascaded_style(a, true), "color"), Some("red"));
    assert_eq!(winner(&m.get_cascaded_style(label, true), "color"), Some("blue"));
}

#[test]
fn test_dynamic_pseudo_element_checked_at_query_time() {
    let mut tree = DomTree::new();
    let body = tree.append_element(NodeId::ROOT, ElementData::new("body"));
    let a = tree.append_element(body, ElementData::new("a").with_attr("href", "/"));

    let mut m = matcher(tree, "a:hover::before { content: \"x\" }");

    let before = m.get_pe_cascaded_style(a, "before");
    assert_eq!(before, Some(CascadedStyle::empty()));
    assert!(m.is_hover_styled(a));

    if let Some(state) = m.document_mut().state_mut(a) {
        state.hover = true;
    }
    let mapper = m.cached_mapper(a);
    let before = m.get_pe_cascaded_style(a, "before").unwrap();
    assert_eq!(values(&before, "content"), vec!["\"x\""]);
    // No restyle happened.
    assert_eq!(m.cached_mapper(a), mapper);
}

#[test]
fn test_focus_active_visited_registration() {
    let mut tree = DomTree::new();
    let body = tree.append_element(NodeId::ROOT, ElementData::new("body"));
    let input = tree.append_element(body, ElementData::new("input"));
    let link = tree.append_element(body, ElementData::new("a").with_attr("href", "/"));

    let mut m = matcher(tree, "input:focus { x: 1 } a:active { y: 2 } a:visited { z: 3 }");
    let _ = m.get_cascaded_style(input, false);
    let _ = m.get_cascaded_style(link, false);

    assert!(m.is_focus_styled(input));
    assert!(m.is_active_styled(link));
    assert!(m.is_visited_styled(link));
    assert!(!m.is_active_styled(input));
}

// ========== conditions ==========

#[test]
fn test_structural_pseudo_classes() {
    let mut tree = DomTree::new();
    let ul = tree.append_element(NodeId::ROOT, ElementData::new("ul"));
    let items: Vec<NodeId> = (0..4)
        .map(|_| tree.append_element(ul, ElementData::new("li")))
        .collect();

    let mut m = matcher(
        tree,
        "li:first-child { f: 1 } li:last-child { l: 1 } li:nth-child(2n) { e: 1 } :root { r: 1 }",
    );

    assert_eq!(values(&m.get_cascaded_style(items[0], false), "f"), vec!["1"]);
    assert!(values(&m.get_cascaded_style(items[1], false), "f").is_empty());
    assert_eq!(values(&m.get_cascaded_style(items[1], false), "e"), vec!["1"]);
    assert_eq!(values(&m.get_cascaded_style(items[3], false), "e"), vec!["1"]);
    assert_eq!(values(&m.get_cascaded_style(items[3], false), "l"), vec!["1"]);
    assert_eq!(values(&m.get_cascaded_style(ul, false), "r"), vec!["1"]);
    assert!(values(&m.get_cascaded_style(items[2], false), "r").is_empty());
}

#[test]
fn test_attribute_and_lang_conditions() {
    let mut tree = DomTree::new();
    let html = tree.append_element(NodeId::ROOT, ElementData::new("html").with_attr("lang", "fr-CA"));
    let link = tree.append_element(
        html,
        ElementData::new("a")
            .with_attr("href", "https://example.com/doc.pdf")
            .with_attr("rel", "nofollow external"),
    );

    let mut m = matcher(
        tree,
        "a[href$='.pdf'] { p: 1 } a[rel~=external] { q: 1 } :lang(fr) { r: 1 } a:link { s: 1 } \
         a[href^=mailto] { t: 1 }",
    );
    let style = m.get_cascaded_style(link, false);

    for property in ["p", "q", "r", "s"] {
        assert_eq!(values(&style, property), vec!["1"], "{property}");
    }
    assert!(values(&style, "t").is_empty());
}

#[test]
fn test_unsupported_pseudo_class_never_matches() {
    let mut tree = DomTree::new();
    let p = tree.append_element(NodeId::ROOT, ElementData::new("p"));

    let mut m = matcher(tree, "p:empty { x: 1 } p { y: 2 }");
    let style = m.get_cascaded_style(p, false);
    assert!(values(&style, "x").is_empty());
    assert_eq!(values(&style, "y"), vec!["2"]);
}

#[test]
fn test_namespaced_type_selectors() {
    let mut tree = DomTree::new();
    let html = tree.append_element(NodeId::ROOT, ElementData::new("html"));
    let svg = tree.append_element(
        html,
        ElementData::new("svg").with_namespace(Some("http://www.w3.org/2000/svg")),
    );
    let a = tree.append_element(
        svg,
        ElementData::new("a").with_namespace(Some("http://www.w3.org/2000/svg")),
    );
    let html_a = tree.append_element(html, ElementData::new("a"));

    let mut m = matcher(
        tree,
        "@namespace svg url(http://www.w3.org/2000/svg); svg|a { x: 1 } *|a { y: 1 }",
    );

    let style = m.get_cascaded_style(a, false);
    assert_eq!(values(&style, "x"), vec!["1"]);
    assert_eq!(values(&style, "y"), vec!["1"]);

    let style = m.get_cascaded_style(html_a, false);
    assert!(values(&style, "x").is_empty());
    assert_eq!(values(&style, "y"), vec!["1"]);
}

// ========== media ==========

#[test]
fn test_media_filtering() {
    let mut tree = DomTree::new();
    let p = tree.append_element(NodeId::ROOT, ElementData::new("p"));

    let mut print_sheet = author("p { a: print-sheet }");
    print_sheet.media = vec!["print".to_string()];
    let sheets = [
        print_sheet,
        author("@media print { p { b: print } } @media screen, tv { p { c: screen } } p { d: all }"),
    ];

    let mut m: Matcher<NodeId, DomTree> = Matcher::new(tree.clone(), &sheets, "screen");
    let style = m.get_cascaded_style(p, false);
    let properties: Vec<_> = style.declarations.iter().map(|d| d.property.as_str()).collect();
    assert_eq!(properties, vec!["c", "d"]);

    let mut m: Matcher<NodeId, DomTree> = Matcher::new(tree, &sheets, "print");
    let style = m.get_cascaded_style(p, false);
    let properties: Vec<_> = style.declarations.iter().map(|d| d.property.as_str()).collect();
    assert_eq!(properties, vec!["a", "b", "d"]);
}
