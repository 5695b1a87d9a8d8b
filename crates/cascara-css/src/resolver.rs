//! Document access for the matcher.
//!
//! The matcher never touches a document directly. Everything it needs to know
//! about tree shape comes through [`TreeResolver`], everything about element
//! attributes and interaction state through [`AttributeResolver`]. Both are
//! generic over the element handle `E` so any arena or pointer-based tree can
//! be styled; [`DomTree`] implementations are provided for `cascara-dom`.

use cascara_dom::{DomTree, ElementData, HTML_NAMESPACE, NodeId};

use crate::selector::NamespaceConstraint;

/// [XML namespace](https://www.w3.org/XML/1998/namespace), used by `xml:lang`.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Structural queries about the element tree.
pub trait TreeResolver<E> {
    /// The parent element, or `None` for the document element.
    fn parent_element(&self, e: E) -> Option<E>;

    /// The closest preceding sibling that is an element.
    fn previous_sibling_element(&self, e: E) -> Option<E>;

    /// Local name of the element.
    fn element_name(&self, e: E) -> &str;

    /// Whether no element sibling precedes `e`.
    fn is_first_child(&self, e: E) -> bool;

    /// Whether no element sibling follows `e`.
    fn is_last_child(&self, e: E) -> bool;

    /// Type selector test: the element's namespace satisfies `namespace` and,
    /// when `name` is given, its local name equals `name` (ASCII
    /// case-insensitively).
    fn matches_element(&self, e: E, namespace: &NamespaceConstraint, name: Option<&str>) -> bool;

    /// Zero-based index among the parent's element children.
    fn position_of_element(&self, e: E) -> usize;

    /// [`:root`](https://www.w3.org/TR/selectors-4/#the-root-pseudo): the
    /// element has no parent element.
    fn is_root(&self, e: E) -> bool {
        self.parent_element(e).is_none()
    }
}

/// Attribute and state queries about a single element.
pub trait AttributeResolver<E> {
    /// Value of an attribute in no namespace.
    fn attribute_value(&self, e: E, name: &str) -> Option<&str>;

    /// Value of the attribute `name` whose namespace satisfies `namespace`.
    fn attribute_value_ns(&self, e: E, namespace: &NamespaceConstraint, name: &str)
    -> Option<&str>;

    /// The class attribute, unsplit.
    fn class(&self, e: E) -> Option<&str>;

    /// The id attribute.
    fn id(&self, e: E) -> Option<&str>;

    /// Declarations implied by presentational attributes (`bgcolor`,
    /// `align`, ...), as declaration-list text.
    fn non_css_styling(&self, e: E) -> Option<String>;

    /// The inline `style` attribute.
    fn element_styling(&self, e: E) -> Option<&str>;

    /// Language of the element, inherited from the nearest ancestor that
    /// declares one.
    fn lang(&self, e: E) -> Option<&str>;

    /// Whether the element is an unvisited or visited hyperlink source.
    fn is_link(&self, e: E) -> bool;

    /// `:visited` state.
    fn is_visited(&self, e: E) -> bool;

    /// `:hover` state.
    fn is_hover(&self, e: E) -> bool;

    /// `:active` state.
    fn is_active(&self, e: E) -> bool;

    /// `:focus` state.
    fn is_focus(&self, e: E) -> bool;
}

/// Key under which a namespaced attribute is stored in an
/// [`AttributesMap`](cascara_dom::AttributesMap): `{uri}local`.
#[must_use]
pub fn namespaced_attribute_key(uri: &str, local: &str) -> String {
    format!("{{{uri}}}{local}")
}

impl TreeResolver<NodeId> for DomTree {
    fn parent_element(&self, e: NodeId) -> Option<NodeId> {
        DomTree::parent_element(self, e)
    }

    fn previous_sibling_element(&self, e: NodeId) -> Option<NodeId> {
        self.previous_element_sibling(e)
    }

    fn element_name(&self, e: NodeId) -> &str {
        self.as_element(e).map_or("", |data| data.tag_name.as_str())
    }

    fn is_first_child(&self, e: NodeId) -> bool {
        self.previous_element_sibling(e).is_none()
    }

    fn is_last_child(&self, e: NodeId) -> bool {
        self.next_element_sibling(e).is_none()
    }

    fn matches_element(&self, e: NodeId, namespace: &NamespaceConstraint, name: Option<&str>) -> bool {
        let Some(data) = self.as_element(e) else {
            return false;
        };
        namespace.accepts(data.namespace.as_deref())
            && name.is_none_or(|n| data.tag_name.eq_ignore_ascii_case(n))
    }

    fn position_of_element(&self, e: NodeId) -> usize {
        self.element_index(e)
    }
}

impl AttributeResolver<NodeId> for DomTree {
    fn attribute_value(&self, e: NodeId, name: &str) -> Option<&str> {
        self.as_element(e)?.attrs.get(name).map(String::as_str)
    }

    fn attribute_value_ns(
        &self,
        e: NodeId,
        namespace: &NamespaceConstraint,
        name: &str,
    ) -> Option<&str> {
        let attrs = &self.as_element(e)?.attrs;
        match namespace {
            NamespaceConstraint::None => attrs.get(name).map(String::as_str),
            NamespaceConstraint::Uri(uri) => attrs
                .get(&namespaced_attribute_key(uri, name))
                .map(String::as_str),
            NamespaceConstraint::Any => attrs.get(name).map(String::as_str).or_else(|| {
                attrs.iter().find_map(|(key, value)| {
                    let (_, local) = key.strip_prefix('{')?.split_once('}')?;
                    (local == name).then_some(value.as_str())
                })
            }),
        }
    }

    fn class(&self, e: NodeId) -> Option<&str> {
        self.attribute_value(e, "class")
    }

    fn id(&self, e: NodeId) -> Option<&str> {
        self.as_element(e)?.id()
    }

    fn non_css_styling(&self, e: NodeId) -> Option<String> {
        let hints = presentational_hints(self.as_element(e)?);
        (!hints.is_empty()).then_some(hints)
    }

    fn element_styling(&self, e: NodeId) -> Option<&str> {
        self.attribute_value(e, "style")
    }

    /// [§ 7.2 The Language Pseudo-class](https://www.w3.org/TR/selectors-4/#the-lang-pseudo)
    ///
    /// "the content language of an element is defined by the document
    /// language", here `xml:lang` or `lang` on the element or its closest
    /// ancestor carrying either.
    fn lang(&self, e: NodeId) -> Option<&str> {
        let xml_lang = namespaced_attribute_key(XML_NAMESPACE, "lang");
        std::iter::once(e)
            .chain(self.ancestors(e))
            .filter_map(|id| self.as_element(id))
            .find_map(|data| {
                data.attrs
                    .get(&xml_lang)
                    .or_else(|| data.attrs.get("xml:lang"))
                    .or_else(|| data.attrs.get("lang"))
                    .map(String::as_str)
            })
    }

    /// [§ 9.2 The Link History Pseudo-classes](https://www.w3.org/TR/selectors-4/#link)
    ///
    /// In HTML, `a`, `area`, and `link` elements with an `href` attribute.
    fn is_link(&self, e: NodeId) -> bool {
        self.as_element(e).is_some_and(|data| {
            data.namespace.as_deref() == Some(HTML_NAMESPACE)
                && matches!(data.tag_name.as_str(), "a" | "area" | "link")
                && data.attrs.contains_key("href")
        })
    }

    fn is_visited(&self, e: NodeId) -> bool {
        self.as_element(e).is_some_and(|data| data.state.visited)
    }

    fn is_hover(&self, e: NodeId) -> bool {
        self.as_element(e).is_some_and(|data| data.state.hover)
    }

    fn is_active(&self, e: NodeId) -> bool {
        self.as_element(e).is_some_and(|data| data.state.active)
    }

    fn is_focus(&self, e: NodeId) -> bool {
        self.as_element(e).is_some_and(|data| data.state.focus)
    }
}

/// [WHATWG HTML § 15 Rendering](https://html.spec.whatwg.org/multipage/rendering.html#presentational-hints)
///
/// Translate the legacy presentational attributes of an HTML element into
/// declaration-list text. Elements outside the HTML namespace have none.
#[must_use]
pub fn presentational_hints(element: &ElementData) -> String {
    if element.namespace.as_deref() != Some(HTML_NAMESPACE) {
        return String::new();
    }

    let mut out = Vec::new();
    let attr = |name: &str| {
        element
            .attrs
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    };
    let tag = element.tag_name.as_str();

    // "The hidden attribute ... display: none"
    if element.attrs.contains_key("hidden") {
        out.push("display: none".to_string());
    }

    if let Some(color) = attr("bgcolor") {
        out.push(format!("background-color: {color}"));
    }

    if let Some(align) = attr("align") {
        match tag {
            "img" | "object" | "iframe" => {
                if matches!(align, "left" | "right") {
                    out.push(format!("float: {align}"));
                }
            }
            "table" => {}
            _ => out.push(format!("text-align: {}", align.to_ascii_lowercase())),
        }
    }

    match tag {
        "font" => {
            if let Some(color) = attr("color") {
                out.push(format!("color: {color}"));
            }
            if let Some(face) = attr("face") {
                out.push(format!("font-family: {face}"));
            }
        }
        "body" => {
            if let Some(color) = attr("text") {
                out.push(format!("color: {color}"));
            }
        }
        _ => {}
    }

    if matches!(
        tag,
        "img" | "table" | "td" | "th" | "col" | "iframe" | "canvas" | "video" | "object" | "embed"
    ) {
        for dimension in ["width", "height"] {
            if let Some(value) = attr(dimension) {
                out.push(format!("{dimension}: {}", dimension_value(value)));
            }
        }
    }

    if matches!(tag, "table" | "img") {
        if let Some(border) = attr("border") {
            let width = dimension_value(border);
            out.push(format!("border-width: {width}"));
            out.push("border-style: solid".to_string());
        }
    }

    out.join("; ")
}

/// "parse dimension values": bare numbers are CSS pixels.
fn dimension_value(value: &str) -> String {
    if value.parse::<f64>().is_ok() {
        format!("{value}px")
    } else {
        value.to_string()
    }
}
