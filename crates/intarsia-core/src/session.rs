//! Shared extraction session.
//!
//! One `Session` is created per top-level transform and passed `&mut`
//! through every recursive resolution step. It owns the declaration
//! registry, the canonical-name table, the resolved root bindings, and the
//! bookkeeping import cleanup needs afterwards. Nothing here is global.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::decl::{DeclKey, Declaration};
use crate::naming::CanonicalNames;
use crate::span::Span;

/// A resolved macro type argument.
#[derive(Debug, Clone)]
pub struct RootBinding {
    /// Name as written at the call site.
    pub spelled: String,
    /// Canonical name of the declaration it resolved to.
    pub canonical: String,
    /// Call-site identifier spans, rewritten when the names differ.
    pub call_sites: Vec<Span>,
}

#[derive(Debug)]
pub struct Session {
    entry: PathBuf,
    /// When set, entry-file local declarations are extracted and their
    /// originals removed; otherwise they stay in place untouched.
    pub inline_entry_locals: bool,
    decls: HashMap<DeclKey, Declaration>,
    by_canonical: HashMap<String, DeclKey>,
    /// Registration order, which the splicer's graph seeds rely on being
    /// deterministic.
    order: Vec<DeclKey>,
    names: CanonicalNames,
    pub roots: Vec<RootBinding>,
    /// Entry-file import locals whose referent was extracted.
    pub resolved_imports: HashSet<String>,
    /// Entry-file import locals that must survive cleanup anyway (enum
    /// names usable in value position).
    pub extra_specifiers: HashSet<String>,
}

impl Session {
    pub fn new(entry: impl Into<PathBuf>, inline_entry_locals: bool) -> Self {
        Self {
            entry: entry.into(),
            inline_entry_locals,
            decls: HashMap::new(),
            by_canonical: HashMap::new(),
            order: Vec::new(),
            names: CanonicalNames::new(),
            roots: Vec::new(),
            resolved_imports: HashSet::new(),
            extra_specifiers: HashSet::new(),
        }
    }

    pub fn entry(&self) -> &Path {
        &self.entry
    }

    pub fn is_entry(&self, file: &Path) -> bool {
        self.entry == file
    }

    pub fn names_mut(&mut self) -> &mut CanonicalNames {
        &mut self.names
    }

    /// Canonical name of an already-extracted declaration.
    pub fn canonical_of(&self, key: &DeclKey) -> Option<&str> {
        self.decls.get(key).map(|d| d.canonical.as_str())
    }

    pub fn decl_by_canonical(&self, canonical: &str) -> Option<&Declaration> {
        self.by_canonical
            .get(canonical)
            .and_then(|key| self.decls.get(key))
    }

    pub fn register(&mut self, decl: Declaration) {
        self.by_canonical
            .insert(decl.canonical.clone(), decl.key.clone());
        self.order.push(decl.key.clone());
        self.decls.insert(decl.key.clone(), decl);
    }

    /// Declarations in registration order.
    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.order.iter().filter_map(|key| self.decls.get(key))
    }

    pub fn add_replacement(&mut self, owner: &DeclKey, span: Span, text: String) {
        if let Some(decl) = self.decls.get_mut(owner) {
            decl.replacements.push((span, text));
        }
    }

    pub fn add_dependency(&mut self, owner: &DeclKey, canonical: &str) {
        if let Some(decl) = self.decls.get_mut(owner) {
            if !decl.dependencies.iter().any(|d| d == canonical) {
                decl.dependencies.push(canonical.to_string());
            }
        }
    }

    pub fn add_extends(&mut self, owner: &DeclKey, canonical: &str) {
        if let Some(decl) = self.decls.get_mut(owner) {
            if !decl.extends.iter().any(|e| e == canonical) {
                decl.extends.push(canonical.to_string());
            }
        }
    }
}
