use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use intarsia_parser::{
    scan, transform_script, transform_sfc, AliasEntry, FsReader, TransformOptions,
};

#[derive(Parser)]
#[command(name = "intarsia")]
#[command(about = "Inline imported TypeScript types into component macro calls", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite a component or script file with its types inlined
    Transform {
        /// Input file (.vue or .ts)
        input: PathBuf,

        /// Output file path; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Project root for bare-specifier resolution
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Path alias, repeatable: --alias @=./src
        #[arg(long = "alias", value_parser = parse_alias)]
        aliases: Vec<AliasEntry>,

        /// Also inline file-local declarations and remove the originals
        #[arg(long)]
        clean: bool,
    },

    /// Print the declarations, imports, and exports a file exposes
    Scan {
        /// Input TypeScript file
        input: PathBuf,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_alias(raw: &str) -> std::result::Result<AliasEntry, String> {
    let (find, replacement) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected find=replacement, got `{raw}`"))?;
    if find.is_empty() {
        return Err("alias find part is empty".to_string());
    }
    Ok(AliasEntry {
        find: find.to_string(),
        replacement: replacement.to_string(),
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug {
        tracing::Level::TRACE
    } else if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(cli.debug)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Transform {
            input,
            output,
            root,
            aliases,
            clean,
        } => handle_transform(input, output, root, aliases, clean),
        Commands::Scan { input, json } => handle_scan(input, json),
    }
}

fn handle_transform(
    input: PathBuf,
    output: Option<PathBuf>,
    root: Option<PathBuf>,
    aliases: Vec<AliasEntry>,
    clean: bool,
) -> Result<()> {
    let code = fs::read_to_string(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let options = TransformOptions {
        root,
        aliases,
        remove_local_types: clean,
    };

    let is_component = input
        .extension()
        .map(|ext| ext == "vue")
        .unwrap_or(false);
    let result = if is_component {
        transform_sfc(&input, &code, &options, FsReader)
    } else {
        transform_script(&input, &code, &options, FsReader)
    };

    // Fatal faults leave the file as it was rather than half-rewritten.
    let rewritten = match result {
        Ok(text) => text,
        Err(err) => {
            warn!(error = %err, "transform failed, emitting input unchanged");
            code
        }
    };

    match output {
        Some(path) => {
            fs::write(&path, rewritten)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("wrote {}", path.display());
        }
        None => print!("{rewritten}"),
    }
    Ok(())
}

#[derive(Serialize)]
struct ScanReport {
    path: PathBuf,
    declarations: Vec<DeclReport>,
    imports: Vec<intarsia_core::imports::ImportStatement>,
    export_aliases: Vec<(String, String)>,
    reexports: Vec<scan::ReexportRecord>,
    export_all: Vec<String>,
    default_export: Option<String>,
    macro_roots: Vec<String>,
}

#[derive(Serialize)]
struct DeclReport {
    name: String,
    #[serde(flatten)]
    entry: scan::DeclEntry,
}

fn handle_scan(input: PathBuf, json: bool) -> Result<()> {
    let source = fs::read_to_string(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let file = scan::scan(&input, source)?;

    let mut declarations: Vec<DeclReport> = file
        .declarations
        .iter()
        .map(|(name, entry)| DeclReport {
            name: name.clone(),
            entry: *entry,
        })
        .collect();
    declarations.sort_by(|a, b| a.entry.span.start.cmp(&b.entry.span.start));
    let mut export_aliases: Vec<(String, String)> = file
        .export_aliases
        .iter()
        .map(|(e, l)| (e.clone(), l.clone()))
        .collect();
    export_aliases.sort();

    let report = ScanReport {
        path: file.path.clone(),
        macro_roots: scan::macro_roots(&file)
            .into_iter()
            .map(|r| r.name)
            .collect(),
        imports: file.imports.clone(),
        export_aliases,
        reexports: file.reexports.clone(),
        export_all: file.export_all.clone(),
        default_export: file.default_export.clone(),
        declarations,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.path.display());
        for decl in &report.declarations {
            println!(
                "  {} {} @ {}..{}",
                decl.entry.kind, decl.name, decl.entry.span.start, decl.entry.span.end
            );
        }
        for import in &report.imports {
            let locals: Vec<&str> = import.locals().collect();
            println!("  import {{ {} }} from {}", locals.join(", "), import.specifier);
        }
        if !report.macro_roots.is_empty() {
            println!("  macro roots: {}", report.macro_roots.join(", "));
        }
    }
    Ok(())
}
