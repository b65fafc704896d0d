use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use solhawk::config::{load_foundry_config, AnalyzerConfig, DetectorSelection};
use solhawk::detectors::{DetectorRegistry, Severity};
use solhawk::{analyse_project, render_output, OutputFormat};

// ── CLI definition ───────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "solhawk",
    version = env!("CARGO_PKG_VERSION"),
    about = "Static analyzer for Solidity smart contracts over forge AST artifacts",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a Foundry project.
    Analyze(AnalyzeArgs),
    /// List all available detectors.
    ListDetectors,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Path to the project root (the directory holding foundry.toml).
    path: PathBuf,

    /// Output format.
    #[arg(long, default_value = "human")]
    format: FormatArg,

    /// Minimum severity to report (info, low, medium, high, critical).
    #[arg(long, default_value = "low")]
    min_severity: SeverityArg,

    /// Comma-separated list of detector IDs to run (default: all).
    #[arg(long)]
    detectors: Option<String>,

    /// Comma-separated list of detector IDs to exclude.
    #[arg(long)]
    exclude: Option<String>,

    /// Read config from foundry.toml at this path instead of <path>/foundry.toml.
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Skip `forge clean && forge build --ast`; use existing artifacts.
    #[arg(long)]
    no_build: bool,

    /// Dump per-entrypoint IR (blocks, SSA, calls) before the findings table.
    #[arg(long)]
    print_ir: bool,

    /// Exit with code 1 when findings exist, not only on contract failures.
    #[arg(long)]
    fail_on_findings: bool,
}

#[derive(Clone, clap::ValueEnum)]
enum FormatArg {
    Human,
    Json,
}

#[derive(Clone, clap::ValueEnum)]
enum SeverityArg {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl From<SeverityArg> for Severity {
    fn from(s: SeverityArg) -> Self {
        match s {
            SeverityArg::Info => Severity::Info,
            SeverityArg::Low => Severity::Low,
            SeverityArg::Medium => Severity::Medium,
            SeverityArg::High => Severity::High,
            SeverityArg::Critical => Severity::Critical,
        }
    }
}

impl From<FormatArg> for OutputFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Human => OutputFormat::Human,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

// ── Entry point ──────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Analyze(args) => run_analyze(args),
        Command::ListDetectors => run_list_detectors(),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(2);
        }
    }
}

fn run_analyze(args: AnalyzeArgs) -> Result<i32> {
    // Merge foundry.toml → CLI flags (CLI takes precedence).
    let manifest = args
        .manifest
        .clone()
        .unwrap_or_else(|| args.path.join("foundry.toml"));
    let mut config = match load_foundry_config(&manifest)? {
        Some(foundry_config) => AnalyzerConfig::from_foundry(foundry_config)
            .context("invalid foundry.toml [tool.solhawk] config")?,
        None => AnalyzerConfig::default(),
    };

    if let Some(d) = &args.detectors {
        config.detectors =
            DetectorSelection::Include(d.split(',').map(|s| s.trim().to_string()).collect());
    }
    if let Some(e) = &args.exclude {
        config.detectors =
            DetectorSelection::Exclude(e.split(',').map(|s| s.trim().to_string()).collect());
    }
    config.min_severity = args.min_severity.clone().into();
    config.no_build = args.no_build;
    config.fail_on_findings = args.fail_on_findings;

    let registry = DetectorRegistry::all();
    let result = analyse_project(&args.path, &config, &registry).context("analysis failed")?;

    if args.print_ir {
        let mut buf = Vec::new();
        solhawk::output::human::print_ir(&mut buf, &result.contracts)
            .context("IR dump failed")?;
        print!("{}", String::from_utf8_lossy(&buf));
    }

    let output = render_output(&result, args.format.into()).context("render failed")?;
    print!("{output}");

    Ok(result.exit_code(config.fail_on_findings))
}

fn run_list_detectors() -> Result<i32> {
    println!(
        "{:<20} {:<10} {:<10} Description",
        "ID", "SEVERITY", "CONFIDENCE"
    );
    println!("{}", "-".repeat(80));

    let registry = DetectorRegistry::all();
    for detector in registry.iter() {
        println!(
            "{:<20} {:<10} {:<10} {}",
            detector.id(),
            detector.severity(),
            detector.confidence(),
            detector.description()
        );
    }
    Ok(0)
}
