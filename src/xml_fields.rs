//! Schema-driven field access on parsed XML nodes.
//!
//! A [`Field`] names an output column and the element path that feeds it,
//! relative to some context node. Paths are matched on local tag names so that
//! exports carrying a default namespace resolve the same way as plain ones.

use regex::Regex;
use roxmltree::Node;
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// One column of a record and where its value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub column: &'static str,
    pub path: &'static [&'static str],
}

impl Field {
    pub const fn new(column: &'static str, path: &'static [&'static str]) -> Self {
        Self { column, path }
    }
}

/// First element child of `node` with the given local name.
pub fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

/// All element children of `node` with the given local name, in document order.
pub fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

/// Follows `path` one child element at a time, taking the first match at each step.
pub fn find<'a, 'input>(node: Node<'a, 'input>, path: &[&str]) -> Option<Node<'a, 'input>> {
    path.iter().try_fold(node, |current, name| child(current, name))
}

/// Normalized text at `path`, or `""` when the element or its text is absent.
pub fn text_at(node: Node<'_, '_>, path: &[&str]) -> String {
    find(node, path)
        .and_then(|n| n.text())
        .map(clean_text)
        .unwrap_or_default()
}

/// Evaluates every field of `schema` against `node`. A missing context node
/// yields an all-empty record.
pub fn extract<const N: usize>(node: Option<Node<'_, '_>>, schema: &[Field; N]) -> [String; N] {
    std::array::from_fn(|i| match node {
        Some(node) => text_at(node, schema[i].path),
        None => String::new(),
    })
}

/// Makes a text node safe for a single spreadsheet cell: whitespace runs
/// (including CR, LF and TAB) become one space, the ends are trimmed, and any
/// other control characters are dropped.
pub fn clean_text(raw: &str) -> String {
    let printable: String = raw
        .chars()
        .filter(|c| c.is_whitespace() || !c.is_control())
        .collect();
    WHITESPACE.replace_all(printable.trim(), " ").into_owned()
}
