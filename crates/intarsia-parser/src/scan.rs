//! One-pass file scan.
//!
//! `scan` parses a file once and lifts everything later stages need into
//! plain owned indexes: the named type declarations, the import statements,
//! and the four export surfaces (inline aliases, re-exports, wildcards,
//! default). The syntax tree is kept alive alongside the source so the
//! resolver can revisit a declaration's nodes by span.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use arborium_tree_sitter as tree_sitter;
use serde::Serialize;
use tree_sitter::{Node, Tree};

use intarsia_core::decl::DeclKind;
use intarsia_core::imports::{ImportSpecifier, ImportStatement, SpecifierKind};
use intarsia_core::span::Span;

use crate::error::ExtractError;
use crate::syntax;

pub const MACRO_PROPS: &str = "defineProps";
pub const MACRO_EMITS: &str = "defineEmits";
pub const MACRO_DEFAULTS: &str = "withDefaults";

/// A named type declaration found in one file.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DeclEntry {
    pub kind: DeclKind,
    /// The declaration node itself.
    pub span: Span,
    /// The whole statement, `export` wrapper included.
    pub removal: Span,
}

/// `export { X as Y } from './mod'`.
#[derive(Debug, Clone, Serialize)]
pub struct ReexportRecord {
    pub exported: String,
    pub imported: String,
    pub specifier: String,
}

/// A macro type argument found in the entry region.
#[derive(Debug, Clone)]
pub struct RootRequest {
    pub name: String,
    /// Span of the type-argument identifier at the call site.
    pub span: Span,
}

/// Scanned view of one file.
#[derive(Debug)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub source: String,
    tree: Tree,
    pub declarations: HashMap<String, DeclEntry>,
    pub imports: Vec<ImportStatement>,
    /// `export { local as exported }`, no source.
    pub export_aliases: HashMap<String, String>,
    pub reexports: Vec<ReexportRecord>,
    /// Targets of `export * from`.
    pub export_all: Vec<String>,
    /// Local identifier behind `export default Foo`.
    pub default_export: Option<String>,
}

impl ScannedFile {
    /// Revisit a previously recorded node by its span.
    pub fn node_at(&self, span: Span) -> Option<Node<'_>> {
        let mut node = self
            .tree
            .root_node()
            .named_descendant_for_byte_range(span.start, span.end)?;
        while let Some(parent) = node.parent() {
            if parent.start_byte() == span.start && parent.end_byte() == span.end {
                node = parent;
            } else {
                break;
            }
        }
        Some(node)
    }

    /// Import statement binding `local`, if any.
    pub fn import_of(&self, local: &str) -> Option<(&ImportStatement, &ImportSpecifier)> {
        for stmt in &self.imports {
            if let Some(spec) = stmt.specifiers.iter().find(|s| s.local == local) {
                return Some((stmt, spec));
            }
        }
        None
    }
}

pub fn scan(path: impl Into<PathBuf>, source: String) -> Result<ScannedFile, ExtractError> {
    let path = path.into();
    let tree = syntax::parse(&source).ok_or_else(|| ExtractError::Parse { path: path.clone() })?;

    let mut declarations = HashMap::new();
    let mut imports = Vec::new();
    let mut export_aliases = HashMap::new();
    let mut reexports = Vec::new();
    let mut export_all = Vec::new();
    let mut default_export = None;

    {
        let root = tree.root_node();
        for stmt in syntax::named_children(root) {
            match stmt.kind() {
                "import_statement" => {
                    if let Some(import) = scan_import(stmt, &source) {
                        imports.push(import);
                    }
                }
                "export_statement" => scan_export(
                    stmt,
                    &source,
                    &path,
                    &mut declarations,
                    &mut export_aliases,
                    &mut reexports,
                    &mut export_all,
                    &mut default_export,
                )?,
                "type_alias_declaration" | "interface_declaration" | "enum_declaration" => {
                    record_decl(stmt, stmt, &source, &path, &mut declarations)?;
                }
                _ => {}
            }
        }
    }

    Ok(ScannedFile {
        path,
        source,
        tree,
        declarations,
        imports,
        export_aliases,
        reexports,
        export_all,
        default_export,
    })
}

fn decl_kind(node: Node<'_>) -> Option<DeclKind> {
    match node.kind() {
        "type_alias_declaration" => Some(DeclKind::Alias),
        "interface_declaration" => Some(DeclKind::Interface),
        "enum_declaration" => Some(DeclKind::Enum),
        _ => None,
    }
}

fn record_decl(
    decl: Node<'_>,
    statement: Node<'_>,
    source: &str,
    path: &Path,
    declarations: &mut HashMap<String, DeclEntry>,
) -> Result<(), ExtractError> {
    let Some(kind) = decl_kind(decl) else {
        return Ok(());
    };
    let Some(name) = syntax::field(decl, "name") else {
        return Ok(());
    };
    let name = syntax::text(name, source).to_string();
    let entry = DeclEntry {
        kind,
        span: syntax::span(decl),
        removal: syntax::span(statement),
    };
    if declarations.insert(name.clone(), entry).is_some() {
        return Err(ExtractError::DuplicateDeclaration {
            name,
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn scan_import(stmt: Node<'_>, source: &str) -> Option<ImportStatement> {
    let source_node = syntax::field(stmt, "source")?;
    let type_only = syntax::children(stmt)
        .iter()
        .any(|c| !c.is_named() && c.kind() == "type");
    let raw = syntax::text(stmt, source);

    let mut specifiers = Vec::new();
    for child in syntax::named_children(stmt) {
        if child.kind() != "import_clause" {
            continue;
        }
        for part in syntax::named_children(child) {
            match part.kind() {
                "identifier" => specifiers.push(ImportSpecifier {
                    local: syntax::text(part, source).to_string(),
                    imported: "default".to_string(),
                    text: syntax::text(part, source).to_string(),
                    kind: SpecifierKind::Default,
                }),
                "namespace_import" => {
                    let local = syntax::named_children(part)
                        .first()
                        .map(|id| syntax::text(*id, source).to_string())?;
                    specifiers.push(ImportSpecifier {
                        imported: local.clone(),
                        local,
                        text: syntax::text(part, source).to_string(),
                        kind: SpecifierKind::Namespace,
                    });
                }
                "named_imports" => {
                    for spec in syntax::named_children(part) {
                        if spec.kind() != "import_specifier" {
                            continue;
                        }
                        let name = syntax::field(spec, "name")?;
                        let imported = syntax::text(name, source).to_string();
                        let local = syntax::field(spec, "alias")
                            .map(|a| syntax::text(a, source).to_string())
                            .unwrap_or_else(|| imported.clone());
                        specifiers.push(ImportSpecifier {
                            local,
                            imported,
                            text: syntax::text(spec, source).to_string(),
                            kind: SpecifierKind::Named,
                        });
                    }
                }
                _ => {}
            }
        }
    }

    Some(ImportStatement {
        span: syntax::span(stmt),
        specifier: syntax::string_value(source_node, source).to_string(),
        source_text: syntax::text(source_node, source).to_string(),
        type_only,
        trailing_semi: raw.ends_with(';'),
        specifiers,
    })
}

#[allow(clippy::too_many_arguments)]
fn scan_export(
    stmt: Node<'_>,
    source: &str,
    path: &Path,
    declarations: &mut HashMap<String, DeclEntry>,
    export_aliases: &mut HashMap<String, String>,
    reexports: &mut Vec<ReexportRecord>,
    export_all: &mut Vec<String>,
    default_export: &mut Option<String>,
) -> Result<(), ExtractError> {
    if let Some(decl) = syntax::field(stmt, "declaration") {
        return record_decl(decl, stmt, source, path, declarations);
    }

    let source_node = syntax::field(stmt, "source");
    let wildcard = syntax::children(stmt)
        .iter()
        .any(|c| !c.is_named() && c.kind() == "*");
    if wildcard {
        if let Some(source_node) = source_node {
            export_all.push(syntax::string_value(source_node, source).to_string());
        }
        return Ok(());
    }

    if let Some(value) = syntax::field(stmt, "value") {
        // `export default Foo`; expressions other than a plain
        // identifier cannot name a type declaration.
        if value.kind() == "identifier" {
            *default_export = Some(syntax::text(value, source).to_string());
        }
        return Ok(());
    }

    for child in syntax::named_children(stmt) {
        if child.kind() != "export_clause" {
            continue;
        }
        for spec in syntax::named_children(child) {
            if spec.kind() != "export_specifier" {
                continue;
            }
            let Some(name) = syntax::field(spec, "name") else {
                continue;
            };
            let local = syntax::text(name, source).to_string();
            let exported = syntax::field(spec, "alias")
                .map(|a| syntax::text(a, source).to_string())
                .unwrap_or_else(|| local.clone());
            match source_node {
                Some(source_node) => reexports.push(ReexportRecord {
                    exported,
                    imported: local,
                    specifier: syntax::string_value(source_node, source).to_string(),
                }),
                None => {
                    export_aliases.insert(exported, local);
                }
            }
        }
    }
    Ok(())
}

/// Macro type arguments in the scanned region: `defineProps<T>()`,
/// `defineEmits<T>()`, either bare, bound with `const`, or as the first
/// argument of `withDefaults`.
pub fn macro_roots(file: &ScannedFile) -> Vec<RootRequest> {
    let mut roots = Vec::new();
    let root = file.tree.root_node();
    for stmt in syntax::named_children(root) {
        let call = match stmt.kind() {
            "expression_statement" => stmt.named_child(0),
            "lexical_declaration" | "variable_declaration" => syntax::named_children(stmt)
                .into_iter()
                .find(|c| c.kind() == "variable_declarator")
                .and_then(|d| syntax::field(d, "value")),
            _ => None,
        };
        let Some(call) = call else { continue };
        if call.kind() != "call_expression" {
            continue;
        }
        if let Some(request) = macro_type_argument(call, &file.source) {
            roots.push(request);
        }
    }
    roots
}

fn macro_type_argument(call: Node<'_>, source: &str) -> Option<RootRequest> {
    let function = syntax::field(call, "function")?;
    let name = syntax::text(function, source);
    if name == MACRO_DEFAULTS {
        let arguments = syntax::field(call, "arguments")?;
        let first = syntax::named_children(arguments).into_iter().next()?;
        if first.kind() != "call_expression" {
            return None;
        }
        return macro_type_argument(first, source);
    }
    if name != MACRO_PROPS && name != MACRO_EMITS {
        return None;
    }
    let type_arguments = syntax::field(call, "type_arguments")?;
    let types = syntax::named_children(type_arguments);
    // Only a lone named type reference is extractable; inline literals
    // and generic instantiations stay as written.
    if types.len() != 1 || types[0].kind() != "type_identifier" {
        return None;
    }
    Some(RootRequest {
        name: syntax::text(types[0], source).to_string(),
        span: syntax::span(types[0]),
    })
}
