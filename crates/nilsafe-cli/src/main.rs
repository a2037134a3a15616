mod logging;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process;

use nilsafe_core::{wire, Error, Report, SchemaDocument, Tier, Type, TypeRegistry, Value};

use crate::logging::{init_logging, LogConfig, LogFormat};

/// nilsafe — replace absent arrays and maps in JSON documents
///
/// Decode a document against a record schema, normalize it, and print it.
#[derive(Parser)]
#[command(name = "nilsafe", version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a document and print it as JSON
    Normalize {
        /// Path to the schema document
        schema: PathBuf,
        /// Path to the JSON document
        input: PathBuf,
        /// Root record type (defaults to the schema's root)
        #[arg(long, env = "NILSAFE_ROOT")]
        root: Option<String>,
        /// basic, advanced or recoverable (unknown names mean basic)
        #[arg(long, env = "NILSAFE_TIER", default_value = "advanced", value_parser = parse_tier)]
        tier: Tier,
        /// Print without indentation
        #[arg(long)]
        compact: bool,
    },

    /// List absent containers in a document without changing it
    Check {
        /// Path to the schema document
        schema: PathBuf,
        /// Path to the JSON document
        input: PathBuf,
        /// Root record type (defaults to the schema's root)
        #[arg(long, env = "NILSAFE_ROOT")]
        root: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute the SHA-256 fingerprint of a normalized document
    Hash {
        /// Path to the schema document
        schema: PathBuf,
        /// Path to the JSON document
        input: PathBuf,
        /// Root record type (defaults to the schema's root)
        #[arg(long, env = "NILSAFE_ROOT")]
        root: Option<String>,
        /// basic, advanced or recoverable (unknown names mean basic)
        #[arg(long, env = "NILSAFE_TIER", default_value = "advanced", value_parser = parse_tier)]
        tier: Tier,
    },

    /// Show version information
    Version,
}

fn parse_tier(s: &str) -> Result<Tier, std::convert::Infallible> {
    s.parse()
}

fn main() {
    let cli = Cli::parse();

    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    init_logging(
        &LogConfig::from_verbosity(cli.verbose)
            .with_format(format)
            .with_ansi(io::stderr().is_terminal()),
    );

    let exit_code = match cli.command {
        Commands::Normalize {
            schema,
            input,
            root,
            tier,
            compact,
        } => cmd_normalize(&schema, &input, root.as_deref(), tier, compact),
        Commands::Check {
            schema,
            input,
            root,
            json,
        } => cmd_check(&schema, &input, root.as_deref(), json),
        Commands::Hash {
            schema,
            input,
            root,
            tier,
        } => cmd_hash(&schema, &input, root.as_deref(), tier),
        Commands::Version => {
            println!(
                "nilsafe {} (nilsafe-core {})",
                env!("CARGO_PKG_VERSION"),
                env!("CARGO_PKG_VERSION")
            );
            0
        }
    };

    process::exit(exit_code);
}

// ── Commands ──────────────────────────────────────────────

fn cmd_normalize(schema: &Path, input: &Path, root: Option<&str>, tier: Tier, compact: bool) -> i32 {
    let mut graph = match load_graph(schema, input, root) {
        Ok(graph) => graph,
        Err(message) => return fail(&message),
    };
    if let Err(code) = run_tier(&mut graph, tier) {
        return code;
    }

    match wire::encode(&graph) {
        Ok(json) => {
            let text = if compact {
                serde_json::to_string(&json)
            } else {
                serde_json::to_string_pretty(&json)
            };
            match text {
                Ok(text) => {
                    println!("{}", text);
                    0
                }
                Err(e) => fail(&e.to_string()),
            }
        }
        Err(Error::AbsentContainer(path)) => {
            eprintln!(
                "{} absent container remains at {} after {} normalization",
                "error:".red().bold(),
                path,
                tier
            );
            1
        }
        Err(e) => fail(&e.to_string()),
    }
}

fn cmd_check(schema: &Path, input: &Path, root: Option<&str>, json: bool) -> i32 {
    let graph = match load_graph(schema, input, root) {
        Ok(graph) => graph,
        Err(message) => return fail(&message),
    };
    let paths = match wire::absent_paths(&graph) {
        Ok(paths) => paths,
        Err(e) => return fail(&e.to_string()),
    };

    if json {
        let report = serde_json::json!({
            "clean": paths.is_empty(),
            "absent": paths,
        });
        println!("{}", report);
    } else if paths.is_empty() {
        println!("{} no absent containers", "✓".green().bold());
    } else {
        for path in &paths {
            println!("{} {}", "absent".yellow().bold(), path);
        }
        eprintln!("{} {} absent container(s)", "✗".red().bold(), paths.len());
    }

    if paths.is_empty() {
        0
    } else {
        1
    }
}

fn cmd_hash(schema: &Path, input: &Path, root: Option<&str>, tier: Tier) -> i32 {
    let mut graph = match load_graph(schema, input, root) {
        Ok(graph) => graph,
        Err(message) => return fail(&message),
    };
    if let Err(code) = run_tier(&mut graph, tier) {
        return code;
    }
    match nilsafe_core::fingerprint(&graph) {
        Ok(hash) => {
            println!("{}", hash);
            0
        }
        Err(e) => fail(&e.to_string()),
    }
}

// ── Helpers ───────────────────────────────────────────────

/// Read the schema and the document, decode the root record, and wrap it in
/// a reference so every tier can mutate it in place
fn load_graph(schema: &Path, input: &Path, root: Option<&str>) -> Result<Value, String> {
    let registry_text = read(schema)?;
    let document =
        SchemaDocument::from_json(&registry_text).map_err(|e| format!("{}: {}", schema.display(), e))?;
    let root = root
        .map(str::to_string)
        .or_else(|| document.root.clone())
        .ok_or_else(|| format!("{}: no root record type; pass --root", schema.display()))?;
    let registry: TypeRegistry = document
        .into_registry()
        .map_err(|e| format!("{}: {}", schema.display(), e))?;

    let input_text = read(input)?;
    let json: serde_json::Value =
        serde_json::from_str(&input_text).map_err(|e| format!("{}: {}", input.display(), e))?;
    let record = wire::decode(&json, &Type::record(root), &registry)
        .map_err(|e| format!("{}: {}", input.display(), e))?;
    Ok(Value::reference(record))
}

fn read(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))
}

/// Normalize. `Err` carries the exit code.
///
/// Each isolated fault is already logged by the core as a `warn` event;
/// only a one-line count is added here.
fn run_tier(graph: &mut Value, tier: Tier) -> Result<(), i32> {
    match nilsafe_core::normalize(graph, tier) {
        Ok(report) => {
            if let Some(summary) = fault_summary(&report) {
                eprintln!("{} {}", "warning:".yellow().bold(), summary);
            }
            Ok(())
        }
        Err(e) => Err(fail(&e.to_string())),
    }
}

fn fault_summary(report: &Report) -> Option<String> {
    match report.faults().len() {
        0 => None,
        1 => Some("1 normalization step was skipped".to_string()),
        n => Some(format!("{} normalization steps were skipped", n)),
    }
}

fn fail(message: &str) -> i32 {
    eprintln!("{} {}", "error:".red().bold(), message);
    2
}
