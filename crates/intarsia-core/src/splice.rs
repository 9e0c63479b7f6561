//! Final assembly: render the inlined type block and the source edits.
//!
//! Everything the resolver collected is combined here in one pass over the
//! session. Bodies get their reference rewrites applied, inheritance bases
//! are folded into derived interfaces, declarations are rendered in
//! dependency order, and the entry file receives its import, call-site,
//! and clean-mode edits. Edits carry absolute spans; the caller applies
//! them through [`crate::span::apply_edits`].

use tracing::{debug, trace};

use crate::decl::DeclBody;
use crate::graph::TypeGraph;
use crate::imports::{ImportSpecifier, ImportStatement, SpecifierKind};
use crate::session::Session;
use crate::span::{apply_replacements, SourceEdit, Span};

/// Entry-file inputs the splicer needs beyond the session.
pub struct EntryContext<'a> {
    /// Source of the region being transformed.
    pub source: &'a str,
    /// Import statements scanned from that region.
    pub imports: &'a [ImportStatement],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpliceOutput {
    /// Self-contained declaration block, empty when nothing was extracted.
    pub block: String,
    /// Edits against the original region, not yet applied.
    pub edits: Vec<SourceEdit>,
}

pub fn finalize(session: &Session, entry: &EntryContext<'_>) -> SpliceOutput {
    let mut graph = TypeGraph::from_session(session);

    // Per-declaration reference rewrites, highest offset first.
    let mut bodies: Vec<(String, String)> = Vec::new();
    for decl in session.declarations() {
        let text = match &decl.body {
            DeclBody::Alias { text, .. } | DeclBody::Interface { text, .. } => {
                apply_replacements(text, &decl.local_replacements())
            }
            DeclBody::Enum { text } => text.clone(),
        };
        bodies.push((decl.canonical.clone(), text));
    }

    merge_extends(session, &mut graph, &mut bodies);

    let block = render_block(session, &graph, &bodies);
    let mut edits = Vec::new();
    import_edits(session, entry, &mut edits);
    call_site_edits(session, &mut edits);
    if session.inline_entry_locals {
        removal_edits(session, entry, &mut edits);
    }

    debug!(
        declarations = bodies.len(),
        edits = edits.len(),
        "splice finalized"
    );
    SpliceOutput { block, edits }
}

/// Fold each inheritance base's members into the derived interface body,
/// deepest base first so chains merge transitively. The base's dependency
/// edges move over with its members.
fn merge_extends(session: &Session, graph: &mut TypeGraph, bodies: &mut [(String, String)]) {
    for canonical in graph.merge_order() {
        let Some(decl) = session.decl_by_canonical(&canonical) else {
            continue;
        };
        for base in decl.extends.clone() {
            let Some(inner) = body_of(bodies, &base).and_then(brace_inner) else {
                continue;
            };
            let inner = inner.to_string();
            let carried: Vec<String> = graph.dependencies_of(&base).to_vec();
            if let Some((_, body)) = bodies.iter_mut().find(|(name, _)| *name == canonical) {
                if let Some(open) = body.find('{') {
                    trace!(derived = %canonical, base = %base, "merging inherited members");
                    body.insert_str(open + 1, &inner);
                }
            }
            for dep in carried {
                graph.add_dependency(&canonical, &dep);
            }
        }
    }
}

fn render_block(session: &Session, graph: &TypeGraph, bodies: &[(String, String)]) -> String {
    let mut roots: Vec<String> = Vec::new();
    for root in &session.roots {
        if !roots.contains(&root.canonical) {
            roots.push(root.canonical.clone());
        }
    }
    let mut lines: Vec<String> = Vec::new();
    for canonical in graph.emission_order(&roots) {
        let Some(decl) = session.decl_by_canonical(&canonical) else {
            continue;
        };
        let Some(body) = body_of(bodies, &canonical) else {
            continue;
        };
        let line = match decl.body {
            DeclBody::Interface { .. } => format!("interface {canonical} {body}"),
            DeclBody::Alias { .. } | DeclBody::Enum { .. } => {
                format!("type {canonical} = {body};")
            }
        };
        lines.push(line);
    }
    lines.join("\n")
}

/// Drop import specifiers whose referent was inlined; delete statements
/// that end up empty, rewrite the rest with the surviving subset.
fn import_edits(session: &Session, entry: &EntryContext<'_>, edits: &mut Vec<SourceEdit>) {
    for stmt in entry.imports {
        let (kept, dropped): (Vec<_>, Vec<_>) = stmt.specifiers.iter().partition(|spec| {
            spec.kind == SpecifierKind::Namespace
                || !session.resolved_imports.contains(&spec.local)
                || session.extra_specifiers.contains(&spec.local)
        });
        if dropped.is_empty() {
            continue;
        }
        if kept.is_empty() {
            trace!(specifier = %stmt.specifier, "removing emptied import");
            edits.push(SourceEdit {
                span: through_newline(entry.source, stmt.span),
                text: String::new(),
            });
        } else {
            let text = rewrite_import(stmt, &kept);
            trace!(specifier = %stmt.specifier, rewritten = %text, "trimming import");
            edits.push(SourceEdit {
                span: stmt.span,
                text,
            });
        }
    }
}

fn rewrite_import(stmt: &ImportStatement, kept: &[&ImportSpecifier]) -> String {
    let mut out = String::from("import ");
    if stmt.type_only {
        out.push_str("type ");
    }
    let mut heads: Vec<&str> = Vec::new();
    let mut named: Vec<&str> = Vec::new();
    for spec in kept {
        match spec.kind {
            SpecifierKind::Named => named.push(&spec.text),
            SpecifierKind::Default | SpecifierKind::Namespace => heads.push(&spec.text),
        }
    }
    let mut parts: Vec<String> = heads.iter().map(|h| h.to_string()).collect();
    if !named.is_empty() {
        parts.push(format!("{{ {} }}", named.join(", ")));
    }
    out.push_str(&parts.join(", "));
    out.push_str(" from ");
    out.push_str(&stmt.source_text);
    if stmt.trailing_semi {
        out.push(';');
    }
    out
}

/// Rewrite macro type arguments whose declaration was emitted under a
/// different name than the one spelled at the call site.
fn call_site_edits(session: &Session, edits: &mut Vec<SourceEdit>) {
    for root in &session.roots {
        if root.canonical == root.spelled {
            continue;
        }
        for span in &root.call_sites {
            trace!(from = %root.spelled, to = %root.canonical, "rewriting call site");
            edits.push(SourceEdit {
                span: *span,
                text: root.canonical.clone(),
            });
        }
    }
}

/// Clean mode: delete extracted entry-local declarations from the region.
fn removal_edits(session: &Session, entry: &EntryContext<'_>, edits: &mut Vec<SourceEdit>) {
    for decl in session.declarations() {
        if !session.is_entry(&decl.key.file) {
            continue;
        }
        if let Some(span) = decl.removal {
            trace!(decl = %decl.key, "removing inlined local declaration");
            edits.push(SourceEdit {
                span: through_newline(entry.source, span),
                text: String::new(),
            });
        }
    }
}

fn body_of<'a>(bodies: &'a [(String, String)], canonical: &str) -> Option<&'a str> {
    bodies
        .iter()
        .find(|(name, _)| name == canonical)
        .map(|(_, body)| body.as_str())
}

/// Member text between an interface body's outer braces.
fn brace_inner(body: &str) -> Option<&str> {
    body.strip_prefix('{')?.strip_suffix('}')
}

/// Extend a deletion span through one trailing newline so no blank line
/// is left behind.
fn through_newline(source: &str, span: Span) -> Span {
    if source.as_bytes().get(span.end) == Some(&b'\n') {
        Span::new(span.start, span.end + 1)
    } else {
        span
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{DeclKey, Declaration};
    use crate::imports::ImportSpecifier;
    use crate::session::RootBinding;
    use pretty_assertions::assert_eq;

    fn interface(file: &str, name: &str, canonical: &str, text: &str, at: usize) -> Declaration {
        Declaration {
            key: DeclKey::new(file, name),
            canonical: canonical.into(),
            body: DeclBody::Interface {
                text: text.into(),
                span: Span::new(at, at + text.len()),
                collapsed: false,
            },
            replacements: Vec::new(),
            dependencies: Vec::new(),
            extends: Vec::new(),
            removal: None,
        }
    }

    fn alias(file: &str, name: &str, canonical: &str, text: &str, at: usize) -> Declaration {
        Declaration {
            key: DeclKey::new(file, name),
            canonical: canonical.into(),
            body: DeclBody::Alias {
                text: text.into(),
                span: Span::new(at, at + text.len()),
            },
            replacements: Vec::new(),
            dependencies: Vec::new(),
            extends: Vec::new(),
            removal: None,
        }
    }

    fn root(session: &mut Session, canonical: &str) {
        session.roots.push(RootBinding {
            spelled: canonical.into(),
            canonical: canonical.into(),
            call_sites: Vec::new(),
        });
    }

    const ENTRY: &str = "/src/app.vue";

    #[test]
    fn renders_in_dependency_order() {
        let mut session = Session::new(ENTRY, false);
        let mut props = interface("/src/types.ts", "Props", "Props", "{ foo: _ITA_Foo }", 0);
        props.dependencies.push("_ITA_Foo".into());
        session.register(props);
        session.register(alias("/src/types.ts", "Foo", "_ITA_Foo", "string", 100));
        root(&mut session, "Props");

        let out = finalize(
            &session,
            &EntryContext {
                source: "",
                imports: &[],
            },
        );
        assert_eq!(
            out.block,
            "type _ITA_Foo = string;\ninterface Props { foo: _ITA_Foo }"
        );
        assert!(out.edits.is_empty());
    }

    #[test]
    fn applies_body_replacements() {
        let mut session = Session::new(ENTRY, false);
        let mut props = interface("/src/types.ts", "Props", "Props", "{ foo: Foo }", 50);
        // "Foo" sits at absolute 57..60 within the body span 50..62.
        props.replacements.push((Span::new(57, 60), "_ITA_Foo".into()));
        props.dependencies.push("_ITA_Foo".into());
        session.register(props);
        session.register(alias("/src/other.ts", "Foo", "_ITA_Foo", "number", 0));
        root(&mut session, "Props");

        let out = finalize(
            &session,
            &EntryContext {
                source: "",
                imports: &[],
            },
        );
        assert_eq!(
            out.block,
            "type _ITA_Foo = number;\ninterface Props { foo: _ITA_Foo }"
        );
    }

    #[test]
    fn merges_inherited_members_after_open_brace() {
        let mut session = Session::new(ENTRY, false);
        let mut props = interface("/src/types.ts", "Props", "Props", "{ foo: number }", 0);
        props.extends.push("_ITA_Base".into());
        session.register(props);
        let mut base = interface("/src/types.ts", "Base", "_ITA_Base", "{ baz: string }", 100);
        base.dependencies.push("_ITA_Qux".into());
        session.register(base);
        session.register(alias("/src/types.ts", "Qux", "_ITA_Qux", "boolean", 200));
        root(&mut session, "Props");

        let out = finalize(
            &session,
            &EntryContext {
                source: "",
                imports: &[],
            },
        );
        // Base is not independently referenced so it is not emitted, but
        // its members and its dependency on _ITA_Qux carry over.
        assert_eq!(
            out.block,
            "type _ITA_Qux = boolean;\ninterface Props { baz: string  foo: number }"
        );
    }

    #[test]
    fn merged_base_is_emitted_when_referenced() {
        let mut session = Session::new(ENTRY, false);
        let mut props = interface("/src/types.ts", "Props", "Props", "{ foo: number }", 0);
        props.extends.push("_ITA_Base".into());
        session.register(props);
        session.register(interface(
            "/src/types.ts",
            "Base",
            "_ITA_Base",
            "{ baz: string }",
            100,
        ));
        root(&mut session, "Props");
        root(&mut session, "_ITA_Base");

        let out = finalize(
            &session,
            &EntryContext {
                source: "",
                imports: &[],
            },
        );
        assert_eq!(
            out.block,
            "interface _ITA_Base { baz: string }\ninterface Props { baz: string  foo: number }"
        );
    }

    #[test]
    fn trims_resolved_specifiers_and_keeps_the_rest() {
        let mut session = Session::new(ENTRY, false);
        session.register(interface("/src/types.ts", "Props", "Props", "{}", 0));
        session.resolved_imports.insert("Props".into());
        root(&mut session, "Props");

        let source = "import { keep, Props, Another } from './types';\n";
        let imports = [ImportStatement {
            span: Span::new(0, 47),
            specifier: "./types".into(),
            source_text: "'./types'".into(),
            type_only: false,
            trailing_semi: true,
            specifiers: vec![
                ImportSpecifier {
                    local: "keep".into(),
                    imported: "keep".into(),
                    text: "keep".into(),
                    kind: SpecifierKind::Named,
                },
                ImportSpecifier {
                    local: "Props".into(),
                    imported: "Props".into(),
                    text: "Props".into(),
                    kind: SpecifierKind::Named,
                },
                ImportSpecifier {
                    local: "Another".into(),
                    imported: "Another".into(),
                    text: "Another".into(),
                    kind: SpecifierKind::Named,
                },
            ],
        }];
        let out = finalize(
            &session,
            &EntryContext {
                source,
                imports: &imports,
            },
        );
        assert_eq!(out.edits.len(), 1);
        assert_eq!(
            out.edits[0].text,
            "import { keep, Another } from './types';"
        );
    }

    #[test]
    fn deletes_emptied_import_with_trailing_newline() {
        let mut session = Session::new(ENTRY, false);
        session.register(interface("/src/types.ts", "Props", "Props", "{}", 0));
        session.resolved_imports.insert("Props".into());
        root(&mut session, "Props");

        let source = "import type { Props } from './types';\nconst x = 1;\n";
        let imports = [ImportStatement {
            span: Span::new(0, 37),
            specifier: "./types".into(),
            source_text: "'./types'".into(),
            type_only: true,
            trailing_semi: true,
            specifiers: vec![ImportSpecifier {
                local: "Props".into(),
                imported: "Props".into(),
                text: "Props".into(),
                kind: SpecifierKind::Named,
            }],
        }];
        let out = finalize(
            &session,
            &EntryContext {
                source,
                imports: &imports,
            },
        );
        assert_eq!(out.edits.len(), 1);
        assert_eq!(out.edits[0].span, Span::new(0, 38));
        assert_eq!(out.edits[0].text, "");
    }

    #[test]
    fn enum_extra_specifier_survives_cleanup() {
        let mut session = Session::new(ENTRY, false);
        session.register(Declaration {
            key: DeclKey::new("/src/types.ts", "Color"),
            canonical: "_ITA_Color0".into(),
            body: DeclBody::Enum {
                text: "number".into(),
            },
            replacements: Vec::new(),
            dependencies: Vec::new(),
            extends: Vec::new(),
            removal: None,
        });
        session.resolved_imports.insert("Color".into());
        session.extra_specifiers.insert("Color".into());
        root(&mut session, "_ITA_Color0");

        let source = "import { Color } from './types';\n";
        let imports = [ImportStatement {
            span: Span::new(0, 32),
            specifier: "./types".into(),
            source_text: "'./types'".into(),
            type_only: false,
            trailing_semi: true,
            specifiers: vec![ImportSpecifier {
                local: "Color".into(),
                imported: "Color".into(),
                text: "Color".into(),
                kind: SpecifierKind::Named,
            }],
        }];
        let out = finalize(
            &session,
            &EntryContext {
                source,
                imports: &imports,
            },
        );
        assert!(out.edits.is_empty());
        assert_eq!(out.block, "type _ITA_Color0 = number;");
    }

    #[test]
    fn rewrites_renamed_call_sites() {
        let mut session = Session::new(ENTRY, false);
        session.register(alias("/src/types.ts", "Foo", "_ITA_Foo0", "string", 0));
        session.roots.push(RootBinding {
            spelled: "Bar".into(),
            canonical: "_ITA_Foo0".into(),
            call_sites: vec![Span::new(20, 23)],
        });

        let out = finalize(
            &session,
            &EntryContext {
                source: "",
                imports: &[],
            },
        );
        assert_eq!(
            out.edits,
            vec![SourceEdit {
                span: Span::new(20, 23),
                text: "_ITA_Foo0".into(),
            }]
        );
    }

    #[test]
    fn clean_mode_deletes_local_declarations() {
        let source = "interface Props { foo: number }\nconst p = defineProps<Props>();\n";
        let mut session = Session::new(ENTRY, true);
        let mut props = interface(ENTRY, "Props", "Props", "{ foo: number }", 16);
        props.removal = Some(Span::new(0, 31));
        session.register(props);
        root(&mut session, "Props");

        let out = finalize(
            &session,
            &EntryContext {
                source,
                imports: &[],
            },
        );
        assert_eq!(
            out.edits,
            vec![SourceEdit {
                span: Span::new(0, 32),
                text: String::new(),
            }]
        );
        assert_eq!(out.block, "interface Props { foo: number }");
    }
}
