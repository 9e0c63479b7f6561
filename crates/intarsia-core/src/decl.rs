//! Extracted declaration records.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::span::{Replacement, Span};

/// Identity of a declaration: the file it lives in plus its local name.
///
/// Two imports of the same declaration under different local spellings
/// resolve to the same key, which is what unifies aliases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DeclKey {
    pub file: PathBuf,
    pub local_name: String,
}

impl DeclKey {
    pub fn new(file: impl Into<PathBuf>, local_name: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            local_name: local_name.into(),
        }
    }
}

impl fmt::Display for DeclKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.file.display(), self.local_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Alias,
    Interface,
    Enum,
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclKind::Alias => write!(f, "type alias"),
            DeclKind::Interface => write!(f, "interface"),
            DeclKind::Enum => write!(f, "enum"),
        }
    }
}

/// Body of an extracted declaration.
///
/// Alias and interface bodies are verbatim source slices and keep the
/// absolute span they were cut from, so replacement spans can be rebased
/// into them. Enum bodies are synthesized and carry no span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclBody {
    /// Right-hand side of `type N = ...`.
    Alias { text: String, span: Span },
    /// Brace-delimited member block of `interface N {...}`. `collapsed`
    /// marks a nested-shape interface registered with an empty body.
    Interface {
        text: String,
        span: Span,
        collapsed: bool,
    },
    /// Synthesized union of the enum's value kinds.
    Enum { text: String },
}

impl DeclBody {
    pub fn kind(&self) -> DeclKind {
        match self {
            DeclBody::Alias { .. } => DeclKind::Alias,
            DeclBody::Interface { .. } => DeclKind::Interface,
            DeclBody::Enum { .. } => DeclKind::Enum,
        }
    }
}

/// One declaration pulled into the session.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub key: DeclKey,
    /// Session-unique name it is emitted under.
    pub canonical: String,
    pub body: DeclBody,
    /// Pending reference rewrites inside `body`, spans still absolute.
    pub replacements: Vec<(Span, String)>,
    /// Canonical names this body references.
    pub dependencies: Vec<String>,
    /// Canonical names of inheritance bases, in source order.
    pub extends: Vec<String>,
    /// Span of the whole declaration (export wrapper included) when it sits
    /// in the entry file; clean mode deletes it.
    pub removal: Option<Span>,
}

impl Declaration {
    pub fn kind(&self) -> DeclKind {
        self.body.kind()
    }

    /// Replacements rebased into the body slice, ready to apply.
    pub fn local_replacements(&self) -> Vec<Replacement> {
        let base = match &self.body {
            DeclBody::Alias { span, .. } => *span,
            DeclBody::Interface { span, .. } => *span,
            DeclBody::Enum { .. } => return Vec::new(),
        };
        self.replacements
            .iter()
            .map(|(span, text)| Replacement {
                span: span.rebase(base),
                text: text.clone(),
            })
            .collect()
    }
}
