use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use log::{debug, LevelFilter};
use serde::Serialize;

use cool_common::manifest::{self, CoolManifest};
use cool_common::Diagnostic;
use cool_semant::ast::{Class, Program};
use cool_semant::semantic::ClassTags;

/// Cool semantic analyzer.
///
/// Reads a parsed program (JSON AST), checks it, and writes the tree with
/// every expression annotated by its static type.
#[derive(Parser)]
#[command(
    name = "coolc-semant",
    version,
    about,
    long_about = "Cool semantic analyzer.\n\nReads the JSON AST produced by the parser, validates the class hierarchy,\ntype-checks every class, and writes the decorated tree for code generation.\n\nExamples:\n  coolc-semant prog.json               Analyze to prog.typed.json\n  coolc-semant prog.json -o out.json   Write to a custom output path\n  coolc-semant prog.json --check       Check for errors only\n  coolc-semant prog.json --emit-ast    Print the decorated tree to stdout"
)]
struct Cli {
    /// Input JSON AST file.
    input: PathBuf,

    /// Output file path (default: <input stem>.typed.json).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Check for errors without writing output.
    #[arg(long)]
    check: bool,

    /// Emit the decorated tree to stdout instead of writing to file.
    #[arg(long = "emit-ast")]
    emit_ast: bool,

    /// Print the class tag table to stdout.
    #[arg(long = "emit-tags", conflicts_with = "emit_ast")]
    emit_tags: bool,

    /// Log analysis progress to stderr.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress warning output.
    #[arg(short, long)]
    quiet: bool,
}

/// Shape of the file handed to code generation.
#[derive(Serialize)]
struct TypedOutput<'a> {
    classes: &'a [Class],
    tags: &'a ClassTags,
}

fn main() {
    let cli = Cli::parse();

    // === Manifest ===
    // Find and load Cool.toml from the input file's directory (walks up).
    let abs_input = fs::canonicalize(&cli.input).unwrap_or_else(|_| cli.input.clone());
    let manifest = match manifest::find_and_load_manifest(&abs_input) {
        Ok(m) => Some(m),
        Err(manifest::ManifestError::NotFound(_)) => None,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    init_logging(&cli, manifest.as_ref());
    if let Some(m) = &manifest {
        debug!(
            "using manifest for {} {} at {}",
            m.project.name,
            m.project.version,
            m.root_dir.display()
        );
    }
    let max_errors = manifest.as_ref().and_then(|m| m.analysis.max_errors);

    // === Input ===
    let source = match fs::read_to_string(&cli.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: could not read '{}': {}", cli.input.display(), e);
            process::exit(1);
        }
    };
    let program: Program = match serde_json::from_str(&source) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: invalid AST in '{}': {}", cli.input.display(), e);
            process::exit(1);
        }
    };
    debug!("loaded {} classes from {}", program.classes.len(), cli.input.display());

    // === Semantic Analysis ===
    let analysis = match cool_semant::analyze(program) {
        Ok(a) => a,
        Err(halt) => {
            print_diagnostics(halt.diagnostics.diagnostics(), max_errors);
            eprintln!("{}", halt);
            process::exit(1);
        }
    };

    if !cli.quiet {
        print_diagnostics(analysis.diagnostics(), max_errors);
    }

    if cli.emit_tags {
        for entry in analysis.tags().iter() {
            println!("{:>4} {}", entry.tag, entry.name);
        }
    }

    if cli.check {
        println!("No errors found.");
        return;
    }

    let (classes, tags) = analysis.into_parts();
    let output = TypedOutput {
        classes: &classes,
        tags: &tags,
    };
    let json = match serde_json::to_string_pretty(&output) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("error: failed to serialize typed AST: {}", e);
            process::exit(1);
        }
    };

    // --emit-ast: print JSON to stdout
    if cli.emit_ast {
        println!("{}", json);
        return;
    }

    let output_path = cli
        .output
        .unwrap_or_else(|| default_output_path(&cli.input));

    match fs::write(&output_path, &json) {
        Ok(()) => {
            if !cli.quiet {
                println!(
                    "Analyzed {} -> {} ({} classes)",
                    cli.input.display(),
                    output_path.display(),
                    classes.len()
                );
            }
        }
        Err(e) => {
            eprintln!("error: could not write '{}': {}", output_path.display(), e);
            process::exit(1);
        }
    }
}

fn init_logging(cli: &Cli, manifest: Option<&CoolManifest>) {
    let debug = manifest.is_some_and(|m| m.analysis.debug);
    let level = if cli.verbose || debug {
        LevelFilter::Debug
    } else if cli.quiet {
        LevelFilter::Error
    } else {
        LevelFilter::Warn
    };
    if let Err(e) = simple_logger::SimpleLogger::new().with_level(level).init() {
        eprintln!("warning: could not initialize logging: {}", e);
    }
}

/// `<dir>/<stem>.typed.json` next to the input.
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    input.with_file_name(format!("{}.typed.json", stem))
}

/// One diagnostic per line, stopping after `limit` if one is configured.
fn print_diagnostics(diagnostics: &[Diagnostic], limit: Option<usize>) {
    let limit = limit.unwrap_or(usize::MAX);
    for diag in diagnostics.iter().take(limit) {
        eprintln!("{}", diag);
    }
    if diagnostics.len() > limit {
        eprintln!("... {} more not shown", diagnostics.len() - limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_sits_next_to_input() {
        assert_eq!(
            default_output_path(Path::new("dir/prog.json")),
            PathBuf::from("dir/prog.typed.json")
        );
        assert_eq!(
            default_output_path(Path::new("prog")),
            PathBuf::from("prog.typed.json")
        );
    }

    #[test]
    fn cli_flags_parse() {
        let cli = Cli::parse_from(["coolc-semant", "a.json", "--check", "-v", "--emit-tags"]);
        assert_eq!(cli.input, PathBuf::from("a.json"));
        assert!(cli.check && cli.verbose && cli.emit_tags);
        assert!(!cli.quiet && !cli.emit_ast);
        assert!(cli.output.is_none());
    }

    #[test]
    fn emit_tags_and_emit_ast_conflict() {
        let err = Cli::try_parse_from(["coolc-semant", "a.json", "--emit-tags", "--emit-ast"])
            .err()
            .expect("both stdout dumps at once must be rejected");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
