//! `@page` and `@font-face` handling through the matcher.

use cascara_css::{MarginBoxName, Matcher, Origin, Stylesheet, StylesheetInfo};
use cascara_dom::{DomTree, ElementData, NodeId};

fn matcher(sheets: &[(&str, Origin)]) -> Matcher<NodeId, DomTree> {
    let mut tree = DomTree::new();
    let _ = tree.append_element(NodeId::ROOT, ElementData::new("html"));
    let infos: Vec<_> = sheets
        .iter()
        .map(|&(css, origin)| StylesheetInfo::all_media(Stylesheet::parse(css, origin)))
        .collect();
    Matcher::new(tree, &infos, "print")
}

fn values<'a>(style: &'a cascara_css::CascadedStyle, property: &str) -> Vec<&'a str> {
    style
        .declarations
        .iter()
        .filter(|d| d.property == property)
        .map(|d| d.value.as_str())
        .collect()
}

#[test]
fn test_unqualified_page_rule_applies_to_every_page() {
    let m = matcher(&[("@page { margin: 1in }", Origin::Author)]);
    for pseudo in [None, Some("first"), Some("left"), Some("blank")] {
        let page = m.get_page_cascaded_style(None, pseudo);
        assert_eq!(values(&page.style, "margin"), ["1in"]);
    }
}

#[test]
fn test_pseudo_page_rules_apply_selectively() {
    let m = matcher(&[(
        "@page :left { margin-left: 2cm } @page :right { margin-right: 2cm }",
        Origin::Author,
    )]);

    let left = m.get_page_cascaded_style(None, Some("left"));
    assert_eq!(values(&left.style, "margin-left"), ["2cm"]);
    assert!(values(&left.style, "margin-right").is_empty());

    // The first page of a left-to-right document is a right page.
    let first = m.get_page_cascaded_style(None, Some("first"));
    assert_eq!(values(&first.style, "margin-right"), ["2cm"]);
    assert!(values(&first.style, "margin-left").is_empty());

    let plain = m.get_page_cascaded_style(None, None);
    assert!(plain.style.is_empty());
}

#[test]
fn test_named_page_rules_need_matching_name() {
    let m = matcher(&[("@page toc { size: a5 } @page { size: a4 }", Origin::Author)]);

    let toc = m.get_page_cascaded_style(Some("toc"), None);
    assert_eq!(values(&toc.style, "size"), ["a4", "a5"]);
    assert_eq!(toc.style.get("size").map(|d| d.value.as_str()), Some("a5"));

    let body = m.get_page_cascaded_style(Some("body"), None);
    assert_eq!(values(&body.style, "size"), ["a4"]);
}

#[test]
fn test_page_rules_ordered_by_specificity_then_source() {
    let m = matcher(&[(
        "@page :first { color: red } @page { color: blue } @page :first { color: green }",
        Origin::Author,
    )]);
    let first = m.get_page_cascaded_style(None, Some("first"));
    assert_eq!(values(&first.style, "color"), ["blue", "red", "green"]);
    assert_eq!(first.style.get("color").map(|d| d.value.as_str()), Some("green"));
}

#[test]
fn test_page_rules_ordered_by_origin_first() {
    let m = matcher(&[
        ("@page :first { size: letter }", Origin::Author),
        ("@page :first { size: a4 }", Origin::UserAgent),
    ]);
    let origins: Vec<_> = m.page_rules().iter().map(|r| r.origin).collect();
    assert_eq!(origins, [Origin::UserAgent, Origin::Author]);

    let first = m.get_page_cascaded_style(None, Some("first"));
    assert_eq!(first.style.get("size").map(|d| d.value.as_str()), Some("letter"));
}

#[test]
fn test_margin_boxes_collected_per_box() {
    let m = matcher(&[(
        "@page { margin: 1in; @top-center { content: \"Title\" } }
         @page :left { @bottom-left { content: counter(page) } }
         @page :right { @bottom-right { content: counter(page) } }",
        Origin::Author,
    )]);

    let left = m.get_page_cascaded_style(None, Some("left"));
    assert_eq!(values(&left.style, "margin"), ["1in"]);
    let boxes: Vec<_> = left.margin_boxes.keys().copied().collect();
    assert_eq!(boxes, [MarginBoxName::TopCenter, MarginBoxName::BottomLeft]);
    assert_eq!(
        values(&left.margin_boxes[&MarginBoxName::TopCenter], "content"),
        ["\"Title\""]
    );

    let right = m.get_page_cascaded_style(None, Some("right"));
    assert!(right.margin_boxes.contains_key(&MarginBoxName::BottomRight));
    assert!(!right.margin_boxes.contains_key(&MarginBoxName::BottomLeft));
}

#[test]
fn test_page_rules_inside_media_blocks() {
    let m = matcher(&[(
        "@media print { @page { size: a4 } } @media screen { @page { size: a3 } }",
        Origin::Author,
    )]);
    assert_eq!(m.page_rules().len(), 1);
    let page = m.get_page_cascaded_style(None, None);
    assert_eq!(values(&page.style, "size"), ["a4"]);
}

#[test]
fn test_font_face_rules_kept_in_source_order() {
    let m = matcher(&[
        (
            "@font-face { font-family: \"Body\"; src: url(body.woff2) }",
            Origin::UserAgent,
        ),
        (
            "@font-face { font-family: \"Title\"; src: url(a.woff); src: url(b.woff2) }",
            Origin::Author,
        ),
    ]);

    let faces = m.font_face_rules();
    assert_eq!(faces.len(), 2);
    assert_eq!(faces[0].origin, Origin::UserAgent);
    assert_eq!(faces[0].descriptor("font-family"), Some("\"Body\""));
    assert_eq!(faces[1].descriptor("src"), Some("url(b.woff2)"));
    assert_eq!(faces[1].descriptor("font-weight"), None);
}

#[test]
fn test_page_style_serializes() {
    let m = matcher(&[("@page { margin: 0; @top-left { content: none } }", Origin::User)]);
    let page = m.get_page_cascaded_style(None, None);
    let json = serde_json::to_value(&page).unwrap_or_default();
    assert_eq!(json["style"]["declarations"][0]["property"], "margin");
    assert_eq!(json["style"]["declarations"][0]["origin"], "user");
    assert_eq!(
        json["margin_boxes"]["top-left"]["declarations"][0]["value"],
        "none"
    );
}
