//! Tree-sitter grammar handle and node helpers.

use std::sync::LazyLock;

use arborium_tree_sitter as tree_sitter;
use tree_sitter::{Language, Node, Tree};

use intarsia_core::span::Span;

static TYPESCRIPT: LazyLock<Language> =
    LazyLock::new(|| arborium_typescript::language().into());

/// Parse TypeScript source. `None` when the parser bails or the tree
/// contains syntax errors; callers treat that as malformed input.
pub fn parse(source: &str) -> Option<Tree> {
    let mut parser = tree_sitter::Parser::new();
    parser.set_language(&TYPESCRIPT).ok()?;
    let tree = parser.parse(source, None)?;
    if tree.root_node().has_error() {
        return None;
    }
    Some(tree)
}

pub fn span(node: Node<'_>) -> Span {
    Span::new(node.start_byte(), node.end_byte())
}

pub fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    &source[node.start_byte()..node.end_byte()]
}

/// Value of a string literal node with its quotes stripped.
pub fn string_value<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    let raw = text(node, source);
    raw.trim_matches(|c| c == '\'' || c == '"' || c == '`')
}

pub fn field<'t>(node: Node<'t>, name: &str) -> Option<Node<'t>> {
    node.child_by_field_name(name)
}

pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

pub fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// Flatten a possibly left-nested `union_type` into its member nodes.
pub fn union_members<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut members = Vec::new();
    collect_union(node, &mut members);
    members
}

fn collect_union<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    for child in named_children(node) {
        if child.kind() == "union_type" {
            collect_union(child, out);
        } else {
            out.push(child);
        }
    }
}

/// Innermost type node of a `type_annotation` (`: T`).
pub fn annotated_type<'t>(annotation: Node<'t>) -> Option<Node<'t>> {
    annotation.named_child(0)
}
