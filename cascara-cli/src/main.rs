//! Cascara CLI
//!
//! Matches stylesheets against a document described as JSON and prints the
//! cascaded style of every element.
//!
//! The document is a tree of element objects:
//!
//! ```json
//! { "tag": "html", "children": [
//!     { "tag": "body", "attrs": { "class": "home" }, "children": [] }
//! ] }
//! ```
//!
//! `namespace` defaults to HTML; an empty string puts the element in no
//! namespace.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cascara_common::warning::warn_once;
use cascara_css::{
    CascadedStyle, FontFaceRule, Matcher, Origin, PageCascadedStyle, Stylesheet, StylesheetInfo,
};
use cascara_dom::{DomTree, ElementData, ElementState, HTML_NAMESPACE, NodeId};
use clap::Parser;
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};

/// Cascara — print cascaded styles for a document
#[derive(Parser, Debug)]
#[command(name = "cascara")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Author stylesheet only
    cascara page.json -s site.css

    # Full cascade with a hovered element
    cascara page.json --ua-style ua.css --user-style me.css -s site.css --hover nav

    # Print-medium styles and the first page box, as JSON
    cascara page.json -s print.css --medium print --page :first --json
"#)]
struct Cli {
    /// Document tree as JSON
    #[arg(value_name = "DOCUMENT")]
    document: PathBuf,

    /// Author stylesheet (repeatable, in source order)
    #[arg(short = 's', long = "style", value_name = "FILE")]
    author: Vec<PathBuf>,

    /// User stylesheet (repeatable)
    #[arg(long = "user-style", value_name = "FILE")]
    user: Vec<PathBuf>,

    /// User-agent stylesheet (repeatable)
    #[arg(long = "ua-style", value_name = "FILE")]
    user_agent: Vec<PathBuf>,

    /// Medium that `@media` blocks are evaluated against
    #[arg(long, default_value = "screen")]
    medium: String,

    /// Put the element with this id in the :hover state
    #[arg(long, value_name = "ID")]
    hover: Vec<String>,

    /// Put the element with this id in the :active state
    #[arg(long, value_name = "ID")]
    active: Vec<String>,

    /// Put the element with this id in the :focus state
    #[arg(long, value_name = "ID")]
    focus: Vec<String>,

    /// Put the element with this id in the :visited state
    #[arg(long, value_name = "ID")]
    visited: Vec<String>,

    /// Also print ::before and ::after styles
    #[arg(long)]
    pseudo_elements: bool,

    /// Print the page box style for a page such as `toc`, `:first` or `toc:left`
    #[arg(long, value_name = "PAGE")]
    page: Option<String>,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

/// One element of the input document.
#[derive(Deserialize, Debug)]
struct DocumentNode {
    tag: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    attrs: BTreeMap<String, String>,
    #[serde(default)]
    children: Vec<DocumentNode>,
}

#[derive(Serialize)]
struct ElementReport {
    element: String,
    depth: usize,
    style: CascadedStyle,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pseudo_elements: BTreeMap<&'static str, CascadedStyle>,
}

#[derive(Serialize)]
struct Report<'a> {
    elements: Vec<ElementReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<PageCascadedStyle>,
    font_faces: &'a [FontFaceRule],
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut tree = load_document(&cli.document)?;
    apply_states(&mut tree, &cli);
    let sheets = load_stylesheets(&cli)?;

    let mut matcher: Matcher<NodeId, DomTree> = Matcher::new(tree, &sheets, &cli.medium);
    let elements = matcher.document().elements_in_tree_order();
    let reports: Vec<ElementReport> = elements
        .into_iter()
        .map(|e| report(&mut matcher, e, cli.pseudo_elements))
        .collect();

    let page = cli.page.as_deref().map(|query| {
        let (name, pseudo) = parse_page_query(query);
        matcher.get_page_cascaded_style(name, pseudo)
    });

    if cli.json {
        let report = Report {
            elements: reports,
            page,
            font_faces: matcher.font_face_rules(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_reports(&reports);
        if let Some(page) = &page {
            print_page(page);
        }
        print_font_faces(matcher.font_face_rules());
    }
    Ok(())
}

/// Parse the JSON document into a tree under the document node.
fn load_document(path: &Path) -> Result<DomTree> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading document {}", path.display()))?;
    let root: DocumentNode = serde_json::from_str(&text)
        .with_context(|| format!("parsing document {}", path.display()))?;

    let mut tree = DomTree::new();
    append_node(&mut tree, NodeId::ROOT, &root);
    Ok(tree)
}

fn append_node(tree: &mut DomTree, parent: NodeId, node: &DocumentNode) {
    let namespace = match node.namespace.as_deref() {
        None => Some(HTML_NAMESPACE),
        Some("") => None,
        Some(uri) => Some(uri),
    };
    let mut data = ElementData::new(&node.tag).with_namespace(namespace);
    for (name, value) in &node.attrs {
        data = data.with_attr(name, value);
    }
    let id = tree.append_element(parent, data);
    for child in &node.children {
        append_node(tree, id, child);
    }
}

/// Set interaction state on the elements named by `--hover` and friends.
fn apply_states(tree: &mut DomTree, cli: &Cli) {
    let flags: [(&[String], fn(&mut ElementState)); 4] = [
        (cli.hover.as_slice(), |s| s.hover = true),
        (cli.active.as_slice(), |s| s.active = true),
        (cli.focus.as_slice(), |s| s.focus = true),
        (cli.visited.as_slice(), |s| s.visited = true),
    ];
    for (ids, set) in flags {
        for wanted in ids {
            let target = tree
                .elements_in_tree_order()
                .into_iter()
                .find(|&e| tree.as_element(e).and_then(ElementData::id) == Some(wanted.as_str()));
            match target.and_then(|e| tree.state_mut(e)) {
                Some(state) => set(state),
                None => warn_once("CLI", &format!("no element with id '{wanted}'")),
            }
        }
    }
}

/// User-agent sheets first, then user, then author.
fn load_stylesheets(cli: &Cli) -> Result<Vec<StylesheetInfo>> {
    let groups = [
        (&cli.user_agent, Origin::UserAgent),
        (&cli.user, Origin::User),
        (&cli.author, Origin::Author),
    ];
    let mut sheets = Vec::new();
    for (paths, origin) in groups {
        for path in paths {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading stylesheet {}", path.display()))?;
            sheets.push(StylesheetInfo::all_media(Stylesheet::parse(&text, origin)));
        }
    }
    Ok(sheets)
}

fn report(matcher: &mut Matcher<NodeId, DomTree>, e: NodeId, pseudo_elements: bool) -> ElementReport {
    let document = matcher.document();
    let depth = std::iter::successors(document.parent_element(e), |&p| document.parent_element(p))
        .count();
    let element = document.as_element(e).map(describe).unwrap_or_default();

    let style = matcher.get_cascaded_style(e, false);
    let mut pseudo = BTreeMap::new();
    if pseudo_elements {
        for name in ["before", "after"] {
            if let Some(style) = matcher
                .get_pe_cascaded_style(e, name)
                .filter(|style| !style.is_empty())
            {
                let _ = pseudo.insert(name, style);
            }
        }
    }

    ElementReport {
        element,
        depth,
        style,
        pseudo_elements: pseudo,
    }
}

/// `tag#id.class1.class2`
fn describe(data: &ElementData) -> String {
    let mut out = data.tag_name.clone();
    if let Some(id) = data.id() {
        out.push('#');
        out.push_str(id);
    }
    for class in data.classes() {
        out.push('.');
        out.push_str(class);
    }
    out
}

/// `name`, `:pseudo`, or `name:pseudo`.
fn parse_page_query(query: &str) -> (Option<&str>, Option<&str>) {
    let (name, pseudo) = match query.split_once(':') {
        Some((name, pseudo)) => (name, Some(pseudo)),
        None => (query, None),
    };
    ((!name.is_empty()).then_some(name), pseudo)
}

fn print_style(style: &CascadedStyle, indent: &str) {
    for declaration in style.resolved() {
        let important = if declaration.important { " !important" } else { "" };
        println!(
            "{indent}{}: {}{important} {}",
            declaration.property.green(),
            declaration.value,
            format!("({:?})", declaration.origin).dimmed()
        );
    }
}

fn print_reports(reports: &[ElementReport]) {
    println!("=== Cascaded Styles ===");
    for report in reports {
        let indent = "  ".repeat(report.depth);
        println!("{indent}{}", report.element.cyan().bold());
        print_style(&report.style, &format!("{indent}  "));
        for (name, style) in &report.pseudo_elements {
            println!("{indent}  {}", format!("::{name}").magenta());
            print_style(style, &format!("{indent}    "));
        }
    }
}

fn print_page(page: &PageCascadedStyle) {
    println!("\n=== Page ===");
    print_style(&page.style, "  ");
    for (name, style) in &page.margin_boxes {
        println!("  {}", format!("@{}", name.as_str()).magenta());
        print_style(style, "    ");
    }
}

fn print_font_faces(faces: &[FontFaceRule]) {
    if faces.is_empty() {
        return;
    }
    println!("\n=== Font Faces ===");
    for face in faces {
        println!(
            "  {} {}",
            face.descriptor("font-family").unwrap_or("(unnamed)").cyan(),
            face.descriptor("src").unwrap_or_default()
        );
    }
}
