//! Host-facing entry points.
//!
//! `extract_types` is the core interface: requested names and a scanned
//! region in, the inlined block and the byte edits out. `transform_script`
//! runs it over a TypeScript region and returns the rewritten text, and
//! `transform_sfc` does the same for a whole component file, locating the
//! typed script block itself.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use intarsia_core::session::Session;
use intarsia_core::span::apply_edits;
use intarsia_core::splice::{self, EntryContext, SpliceOutput};

use crate::error::ExtractError;
use crate::loader::{AliasEntry, ModuleLoader, SourceReader};
use crate::resolve::{Resolver, TypeRequest};
use crate::scan::{self, RootRequest, ScannedFile};

/// Configuration the host or CLI builds once per run.
#[derive(Debug, Default, Clone)]
pub struct TransformOptions {
    /// Project root, used for bare-specifier lookup under `node_modules`.
    pub root: Option<PathBuf>,
    pub aliases: Vec<AliasEntry>,
    /// Also inline declarations local to the entry region and delete the
    /// originals.
    pub remove_local_types: bool,
}

/// Core extraction: resolve `requests` starting from the entry region and
/// splice the session into a block plus edits.
pub fn extract_types<R: SourceReader>(
    entry: Arc<ScannedFile>,
    requests: Vec<RootRequest>,
    options: &TransformOptions,
    reader: R,
) -> Result<SpliceOutput, ExtractError> {
    let mut session = Session::new(entry.path.clone(), options.remove_local_types);
    let mut loader = ModuleLoader::new(reader, options.root.clone(), options.aliases.clone());
    loader.insert(Arc::clone(&entry));

    let requests: Vec<TypeRequest> = requests
        .into_iter()
        .map(|r| TypeRequest::root(r.name, r.span))
        .collect();
    let unresolved = Resolver::new(&mut session, &mut loader).extract(&entry, requests)?;
    for request in &unresolved {
        debug!(name = %request.name, "type reference left unresolved");
    }

    Ok(splice::finalize(
        &session,
        &EntryContext {
            source: &entry.source,
            imports: &entry.imports,
        },
    ))
}

/// Transform one TypeScript region and return the rewritten text.
pub fn transform_script<R: SourceReader>(
    path: impl Into<PathBuf>,
    source: &str,
    options: &TransformOptions,
    reader: R,
) -> Result<String, ExtractError> {
    let entry = Arc::new(scan::scan(path, source.to_string())?);
    let roots = scan::macro_roots(&entry);
    if roots.is_empty() {
        trace!("no macro type arguments, region unchanged");
        return Ok(source.to_string());
    }
    let output = extract_types(Arc::clone(&entry), roots, options, reader)?;
    let edited = apply_edits(source, &output.edits);
    if output.block.is_empty() {
        return Ok(edited);
    }
    Ok(format!("{}\n{}", output.block, edited))
}

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)(<script\b[^>]*\bsetup\b[^>]*>)(.*?)(</script>)").unwrap()
});

/// Transform the `<script setup lang="ts">` block of a component file.
/// Files without one, or with an untyped script, pass through unchanged.
pub fn transform_sfc<R: SourceReader>(
    path: impl Into<PathBuf>,
    code: &str,
    options: &TransformOptions,
    reader: R,
) -> Result<String, ExtractError> {
    let Some((opening, region)) = SCRIPT_BLOCK
        .captures(code)
        .and_then(|c| Some((c.get(1)?, c.get(2)?)))
    else {
        trace!("no setup script block, file unchanged");
        return Ok(code.to_string());
    };
    let opening = opening.as_str();
    if !opening.contains("lang=\"ts\"") && !opening.contains("lang='ts'") {
        trace!("script block is not TypeScript, file unchanged");
        return Ok(code.to_string());
    }
    let transformed = transform_script(path, region.as_str(), options, reader)?;
    let span = region.range();
    let mut out = String::with_capacity(code.len() + transformed.len());
    out.push_str(&code[..span.start]);
    out.push_str(&transformed);
    out.push_str(&code[span.end..]);
    Ok(out)
}
