//! Recursive reference resolution.
//!
//! ## Design
//!
//! A request names a type in some file's scope and carries the origin that
//! wants it: a macro call site, a reference slot inside an already
//! extracted body, or an inheritance clause. Resolution hops through
//! export aliases and default exports, extracts the declaration on a
//! registry hit (spawning one child request per reference inside it), and
//! otherwise forwards the request through the file's imports and
//! re-exports to the next file. A declaration already in the session
//! fulfills the origin immediately, which is what unifies aliases and
//! closes diamonds. Unresolved names are returned, never an error.

use std::collections::VecDeque;

use tracing::{debug, trace, warn};

use arborium_tree_sitter::Node;

use intarsia_core::decl::{DeclBody, DeclKey, DeclKind, Declaration};
use intarsia_core::session::{RootBinding, Session};
use intarsia_core::span::Span;

use crate::error::ExtractError;
use crate::loader::{ModuleLoader, SourceReader};
use crate::scan::{DeclEntry, ScannedFile};
use crate::syntax;

/// What a resolved name must be wired back into.
#[derive(Debug, Clone)]
pub enum Origin {
    /// Macro type argument in the entry region.
    Root { spelled: String, call_sites: Vec<Span> },
    /// Reference inside an extracted body. `nested` marks an interface
    /// property annotation, whose interface referent is collapsed.
    Slot {
        owner: DeclKey,
        span: Span,
        nested: bool,
    },
    /// Inheritance base of an extracted interface.
    Extends { owner: DeclKey },
}

#[derive(Debug, Clone)]
pub struct TypeRequest {
    pub name: String,
    pub origin: Origin,
    /// Entry-region import local this request travelled through, so import
    /// cleanup knows the specifier resolved.
    pub import_local: Option<String>,
}

impl TypeRequest {
    pub fn root(name: String, call_site: Span) -> Self {
        Self {
            name: name.clone(),
            origin: Origin::Root {
                spelled: name,
                call_sites: vec![call_site],
            },
            import_local: None,
        }
    }
}

pub struct Resolver<'a, R> {
    session: &'a mut Session,
    loader: &'a mut ModuleLoader<R>,
}

impl<'a, R: SourceReader> Resolver<'a, R> {
    pub fn new(session: &'a mut Session, loader: &'a mut ModuleLoader<R>) -> Self {
        Self { session, loader }
    }

    /// Resolve `requests` against `file`, recursing into further files as
    /// needed. Returns the requests that could not be resolved anywhere.
    pub fn extract(
        &mut self,
        file: &ScannedFile,
        requests: Vec<TypeRequest>,
    ) -> Result<Vec<TypeRequest>, ExtractError> {
        let mut queue: VecDeque<TypeRequest> = requests.into();
        let mut missing = Vec::new();
        while let Some(request) = queue.pop_front() {
            let children = self.resolve_name(file, request, &mut missing)?;
            queue.extend(children);
        }

        let mut unresolved = self.forward_imports(file, missing)?;

        // Names still missing may come in through a wildcard re-export.
        for target in &file.export_all {
            if unresolved.is_empty() {
                break;
            }
            trace!(target, file = %file.path.display(), "retrying via wildcard re-export");
            if let Some(next) = self.loader.load(target, &file.path)? {
                unresolved = self.extract(&next, unresolved)?;
            }
        }
        Ok(unresolved)
    }

    /// Resolve one request within `file`'s own scope. Child requests for
    /// references inside a freshly extracted body are returned; requests
    /// the file cannot satisfy locally are pushed onto `missing`.
    fn resolve_name(
        &mut self,
        file: &ScannedFile,
        request: TypeRequest,
        missing: &mut Vec<TypeRequest>,
    ) -> Result<Vec<TypeRequest>, ExtractError> {
        let mut name = request.name.clone();

        if name == "default" {
            match &file.default_export {
                Some(local) => {
                    debug!(file = %file.path.display(), local, "following default export");
                    name = local.clone();
                }
                None => {
                    missing.push(request);
                    return Ok(Vec::new());
                }
            }
        }

        if !file.declarations.contains_key(&name) {
            if let Some(local) = file.export_aliases.get(&name) {
                debug!(exported = %name, local, "following export alias");
                name = local.clone();
            }
        }

        let key = DeclKey::new(file.path.clone(), name.clone());
        if let Some(canonical) = self.session.canonical_of(&key) {
            let canonical = canonical.to_string();
            if let Origin::Root { spelled, call_sites } = &request.origin {
                if *spelled != canonical {
                    warn!(
                        alias = %spelled,
                        canonical = %canonical,
                        file = %file.path.display(),
                        offset = call_sites.first().map(|s| s.start).unwrap_or_default(),
                        "redundant import alias, unifying"
                    );
                }
            }
            let kind = self
                .session
                .decl_by_canonical(&canonical)
                .map(|d| d.kind())
                .unwrap_or(DeclKind::Alias);
            self.fulfill(request, &canonical, kind);
            return Ok(Vec::new());
        }

        match file.declarations.get(&name) {
            Some(entry) => self.extract_decl(file, &name, *entry, request),
            None => {
                missing.push(TypeRequest { name, ..request });
                Ok(Vec::new())
            }
        }
    }

    fn extract_decl(
        &mut self,
        file: &ScannedFile,
        name: &str,
        entry: DeclEntry,
        request: TypeRequest,
    ) -> Result<Vec<TypeRequest>, ExtractError> {
        let is_entry_local = self.session.is_entry(&file.path);
        if is_entry_local && !self.session.inline_entry_locals {
            // The host understands declarations that sit right in the
            // region; leaving them alone keeps re-runs the identity.
            trace!(name, "entry-local declaration left in place");
            return Ok(Vec::new());
        }

        let key = DeclKey::new(file.path.clone(), name.to_string());
        let collapsed = matches!(request.origin, Origin::Slot { nested: true, .. })
            && entry.kind == DeclKind::Interface;

        let canonical = if entry.kind == DeclKind::Enum {
            self.session.names_mut().synthesize(name, true)
        } else if let Origin::Root { spelled, .. } = &request.origin {
            let spelled = spelled.clone();
            self.session
                .names_mut()
                .claim(&spelled)
                .unwrap_or_else(|| self.session.names_mut().synthesize(name, false))
        } else if is_entry_local {
            self.session
                .names_mut()
                .claim(name)
                .unwrap_or_else(|| self.session.names_mut().synthesize(name, false))
        } else {
            self.session.names_mut().synthesize(name, false)
        };
        debug!(decl = %key, canonical = %canonical, kind = %entry.kind, "extracting declaration");

        let node = file
            .node_at(entry.span)
            .ok_or_else(|| ExtractError::Parse {
                path: file.path.clone(),
            })?;

        let (body, children) = match entry.kind {
            DeclKind::Interface if collapsed => {
                let body_node = syntax::field(node, "body").ok_or_else(|| ExtractError::Parse {
                    path: file.path.clone(),
                })?;
                (
                    DeclBody::Interface {
                        text: "{}".to_string(),
                        span: syntax::span(body_node),
                        collapsed: true,
                    },
                    Vec::new(),
                )
            }
            DeclKind::Alias => {
                let value = syntax::field(node, "value").ok_or_else(|| ExtractError::Parse {
                    path: file.path.clone(),
                })?;
                let children = alias_slots(value, &file.source, &key);
                (
                    DeclBody::Alias {
                        text: syntax::text(value, &file.source).to_string(),
                        span: syntax::span(value),
                    },
                    children,
                )
            }
            DeclKind::Interface => {
                let body_node = syntax::field(node, "body").ok_or_else(|| ExtractError::Parse {
                    path: file.path.clone(),
                })?;
                let mut children = extends_requests(node, &file.source, &key);
                children.extend(property_slots(body_node, &file.source, &key));
                (
                    DeclBody::Interface {
                        text: syntax::text(body_node, &file.source).to_string(),
                        span: syntax::span(body_node),
                        collapsed: false,
                    },
                    children,
                )
            }
            DeclKind::Enum => (
                DeclBody::Enum {
                    text: enum_body(node),
                },
                Vec::new(),
            ),
        };

        self.session.register(Declaration {
            key,
            canonical: canonical.clone(),
            body,
            replacements: Vec::new(),
            dependencies: Vec::new(),
            extends: Vec::new(),
            removal: is_entry_local.then_some(entry.removal),
        });
        self.fulfill(request, &canonical, entry.kind);
        Ok(children)
    }

    fn fulfill(&mut self, request: TypeRequest, canonical: &str, kind: DeclKind) {
        match request.origin {
            Origin::Root { spelled, call_sites } => {
                self.session.roots.push(RootBinding {
                    spelled,
                    canonical: canonical.to_string(),
                    call_sites,
                });
            }
            Origin::Slot { owner, span, .. } => {
                self.session
                    .add_replacement(&owner, span, canonical.to_string());
                self.session.add_dependency(&owner, canonical);
            }
            Origin::Extends { owner } => {
                self.session.add_extends(&owner, canonical);
            }
        }
        if let Some(local) = request.import_local {
            if kind == DeclKind::Enum {
                // Enum names double as values; the import has to stay.
                self.session.extra_specifiers.insert(local.clone());
            }
            self.session.resolved_imports.insert(local);
        }
    }

    /// Group requests the file cannot satisfy by the module specifier
    /// their name travels through, then recurse into each target file.
    fn forward_imports(
        &mut self,
        file: &ScannedFile,
        missing: Vec<TypeRequest>,
    ) -> Result<Vec<TypeRequest>, ExtractError> {
        let is_entry = self.session.is_entry(&file.path);
        let mut unresolved = Vec::new();
        let mut groups: Vec<(String, Vec<TypeRequest>)> = Vec::new();

        for request in missing {
            if let Some((stmt, spec)) = file.import_of(&request.name) {
                use intarsia_core::imports::SpecifierKind;
                if spec.kind == SpecifierKind::Namespace {
                    // `ns.Foo` references are out of scope.
                    unresolved.push(request);
                    continue;
                }
                let import_local = if is_entry {
                    Some(request.name.clone())
                } else {
                    request.import_local.clone()
                };
                push_group(
                    &mut groups,
                    stmt.specifier.clone(),
                    TypeRequest {
                        name: spec.imported.clone(),
                        origin: request.origin,
                        import_local,
                    },
                );
                continue;
            }
            if let Some(re) = file.reexports.iter().find(|r| r.exported == request.name) {
                push_group(
                    &mut groups,
                    re.specifier.clone(),
                    TypeRequest {
                        name: re.imported.clone(),
                        origin: request.origin,
                        import_local: request.import_local,
                    },
                );
                continue;
            }
            unresolved.push(request);
        }

        for (specifier, requests) in groups {
            match self.loader.load(&specifier, &file.path)? {
                Some(next) => unresolved.extend(self.extract(&next, requests)?),
                None => unresolved.extend(requests),
            }
        }
        Ok(unresolved)
    }
}

fn push_group(groups: &mut Vec<(String, Vec<TypeRequest>)>, specifier: String, request: TypeRequest) {
    if let Some((_, requests)) = groups.iter_mut().find(|(s, _)| *s == specifier) {
        requests.push(request);
    } else {
        groups.push((specifier, vec![request]));
    }
}

/// Reference slots in a type alias value: every type-identifier member of
/// a union, or the value itself when it is a lone type reference. Anything
/// else stays verbatim.
fn alias_slots(value: Node<'_>, source: &str, owner: &DeclKey) -> Vec<TypeRequest> {
    let refs: Vec<Node<'_>> = match value.kind() {
        "union_type" => syntax::union_members(value)
            .into_iter()
            .filter(|n| n.kind() == "type_identifier")
            .collect(),
        "type_identifier" => vec![value],
        _ => Vec::new(),
    };
    refs.into_iter()
        .map(|n| TypeRequest {
            name: syntax::text(n, source).to_string(),
            origin: Origin::Slot {
                owner: owner.clone(),
                span: syntax::span(n),
                nested: false,
            },
            import_local: None,
        })
        .collect()
}

/// Reference slots in an interface body. A property annotated with a lone
/// type reference is a nested slot (its interface referent collapses); a
/// union annotation contributes one plain slot per reference member.
fn property_slots(body: Node<'_>, source: &str, owner: &DeclKey) -> Vec<TypeRequest> {
    let mut slots = Vec::new();
    for member in syntax::named_children(body) {
        if member.kind() != "property_signature" {
            continue;
        }
        let Some(annotation) = syntax::field(member, "type") else {
            continue;
        };
        let Some(ty) = syntax::annotated_type(annotation) else {
            continue;
        };
        match ty.kind() {
            "type_identifier" => slots.push(TypeRequest {
                name: syntax::text(ty, source).to_string(),
                origin: Origin::Slot {
                    owner: owner.clone(),
                    span: syntax::span(ty),
                    nested: true,
                },
                import_local: None,
            }),
            "union_type" => {
                for part in syntax::union_members(ty) {
                    if part.kind() == "type_identifier" {
                        slots.push(TypeRequest {
                            name: syntax::text(part, source).to_string(),
                            origin: Origin::Slot {
                                owner: owner.clone(),
                                span: syntax::span(part),
                                nested: false,
                            },
                            import_local: None,
                        });
                    }
                }
            }
            _ => {}
        }
    }
    slots
}

/// One request per identifier base in the `extends` clause.
fn extends_requests(decl: Node<'_>, source: &str, owner: &DeclKey) -> Vec<TypeRequest> {
    let mut requests = Vec::new();
    for child in syntax::named_children(decl) {
        if child.kind() != "extends_type_clause" {
            continue;
        }
        let mut cursor = child.walk();
        for base in child.children_by_field_name("type", &mut cursor) {
            if base.kind() == "type_identifier" {
                requests.push(TypeRequest {
                    name: syntax::text(base, source).to_string(),
                    origin: Origin::Extends {
                        owner: owner.clone(),
                    },
                    import_local: None,
                });
            }
        }
    }
    requests
}

/// Normalized value union of an enum: member initializers decide between
/// `number`, `string`, or both; bare members auto-increment numerically.
fn enum_body(decl: Node<'_>) -> String {
    let mut has_number = false;
    let mut has_string = false;
    if let Some(body) = syntax::field(decl, "body") {
        for member in syntax::named_children(body) {
            match member.kind() {
                "enum_assignment" => match syntax::field(member, "value").map(|v| v.kind()) {
                    Some("number") => has_number = true,
                    Some("string") | Some("template_string") => has_string = true,
                    _ => {
                        has_number = true;
                        has_string = true;
                    }
                },
                "property_identifier" | "string" => has_number = true,
                _ => {}
            }
        }
    }
    match (has_number, has_string) {
        (true, false) => "number".to_string(),
        (false, true) => "string".to_string(),
        _ => "number | string".to_string(),
    }
}
