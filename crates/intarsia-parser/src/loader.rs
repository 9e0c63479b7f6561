//! Cross-module loading.
//!
//! Turns a module specifier into a scanned file: alias table first, then a
//! bare-specifier lookup under `node_modules`, then a relative join against
//! the importing file's directory, each candidate probed with the usual
//! TypeScript suffixes. Reads go through the `SourceReader` seam so tests
//! run against an in-memory tree, and every path is scanned at most once
//! per session.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::ExtractError;
use crate::scan::{scan, ScannedFile};

const SUFFIXES: &[&str] = &["", ".ts", ".d.ts", "/index.ts", "/index.d.ts"];

/// File access seam.
pub trait SourceReader {
    fn read(&self, path: &Path) -> std::io::Result<String>;
    fn exists(&self, path: &Path) -> bool;
}

/// Reader over the real filesystem.
#[derive(Debug, Default)]
pub struct FsReader;

impl SourceReader for FsReader {
    fn read(&self, path: &Path) -> std::io::Result<String> {
        fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// One path-alias rule, matching the bundler convention: `find` matches the
/// whole specifier or a prefix terminated by `/`.
#[derive(Debug, Clone)]
pub struct AliasEntry {
    pub find: String,
    pub replacement: String,
}

impl AliasEntry {
    fn matches(&self, specifier: &str) -> bool {
        specifier == self.find
            || (specifier.starts_with(&self.find)
                && specifier[self.find.len()..].starts_with('/'))
    }

    fn apply(&self, specifier: &str) -> String {
        format!("{}{}", self.replacement, &specifier[self.find.len()..])
    }
}

pub struct ModuleLoader<R> {
    reader: R,
    root: Option<PathBuf>,
    aliases: Vec<AliasEntry>,
    cache: HashMap<PathBuf, Arc<ScannedFile>>,
}

impl<R: SourceReader> ModuleLoader<R> {
    pub fn new(reader: R, root: Option<PathBuf>, aliases: Vec<AliasEntry>) -> Self {
        Self {
            reader,
            root,
            aliases,
            cache: HashMap::new(),
        }
    }

    /// Pre-seed the cache, used for the entry file which is scanned by the
    /// caller before resolution starts.
    pub fn insert(&mut self, file: Arc<ScannedFile>) {
        self.cache.insert(file.path.clone(), file);
    }

    /// Load and scan the file a specifier refers to. `Ok(None)` when the
    /// specifier does not resolve; requests against it stay unresolved.
    pub fn load(
        &mut self,
        specifier: &str,
        origin: &Path,
    ) -> Result<Option<Arc<ScannedFile>>, ExtractError> {
        let Some(path) = self.resolve(specifier, origin) else {
            debug!(specifier, origin = %origin.display(), "unresolvable module specifier");
            return Ok(None);
        };
        if let Some(cached) = self.cache.get(&path) {
            trace!(path = %path.display(), "module cache hit");
            return Ok(Some(Arc::clone(cached)));
        }
        let source = self.reader.read(&path).map_err(|source| ExtractError::Read {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), specifier, "scanning module");
        let file = Arc::new(scan(path.clone(), source)?);
        self.cache.insert(path, Arc::clone(&file));
        Ok(Some(file))
    }

    /// Specifier to path, without reading the file.
    pub fn resolve(&self, specifier: &str, origin: &Path) -> Option<PathBuf> {
        if let Some(alias) = self.aliases.iter().find(|a| a.matches(specifier)) {
            let candidate = PathBuf::from(alias.apply(specifier));
            trace!(specifier, alias = %alias.find, "alias matched");
            return self.probe(&candidate);
        }
        if !specifier.starts_with('.') && !specifier.starts_with('/') {
            let root = self.root.as_ref()?;
            return self.probe(&root.join("node_modules").join(specifier));
        }
        let base = origin.parent().unwrap_or_else(|| Path::new(""));
        self.probe(&normalize(&base.join(specifier)))
    }

    fn probe(&self, base: &Path) -> Option<PathBuf> {
        let base = base.to_string_lossy();
        SUFFIXES
            .iter()
            .map(|suffix| PathBuf::from(format!("{base}{suffix}")))
            .find(|candidate| self.reader.exists(candidate))
    }
}

/// Collapse `.` and `..` segments without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
