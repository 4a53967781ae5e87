//! Policy Guard CLI: prove or refute privilege escalations between two
//! policy files.
//!
//! # Examples
//!
//! ```bash
//! # Compare the deployed policy against a proposed replacement
//! policy-guard check deployed.hcl proposed.hcl
//!
//! # Structured output with the solver formulas included
//! policy-guard check --json --diagnostics deployed.hcl proposed.hcl
//!
//! # Validate a single policy file and show its rules in priority order
//! policy-guard lint proposed.hcl
//! ```
//!
//! Exit codes: `0` no escalation, `1` escalation found, `2` any error.
//! An error is never reported as a safe verdict.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use policy_guard::{check, CheckOptions, EscalationResult, Policy};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod parse;

/// Privilege-escalation checker for secrets-engine path policies
#[derive(Parser)]
#[command(name = "policy-guard")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a proposed policy for escalations against the current one
    Check(CheckArgs),

    /// Parse a policy file and print its rules in priority order
    Lint(LintArgs),
}

#[derive(Args)]
struct CheckArgs {
    /// The currently deployed policy (.json, or policy text)
    current: PathBuf,

    /// The proposed replacement policy
    proposed: PathBuf,

    /// Emit the structured response as JSON
    #[arg(long)]
    json: bool,

    /// Include the solver formulas in the output
    #[arg(long)]
    diagnostics: bool,

    /// Solver timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[derive(Args)]
struct LintArgs {
    /// The policy file to validate
    file: PathBuf,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("policy_guard=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Check(args) => run_check(args),
        Commands::Lint(args) => run_lint(args),
    }
}

fn run_check(args: CheckArgs) -> Result<ExitCode> {
    let current = load_policy(&args.current)?;
    let proposed = load_policy(&args.proposed)?;
    info!(
        current = %args.current.display(),
        proposed = %args.proposed.display(),
        "checking for privilege escalation"
    );

    let options = CheckOptions {
        diagnostics: args.diagnostics,
        timeout_ms: args.timeout_ms,
    };
    let report = check(&current, &proposed, &options)?;
    let escalation = report.result.is_escalation();

    if args.json {
        let response = report.into_response();
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        match &report.result {
            EscalationResult::NoEscalation => {
                println!("no escalation: the proposed policy grants nothing new");
            }
            EscalationResult::Escalation(witness) => {
                println!(
                    "escalation: capability \"{}\" on path \"{}\" is granted by the proposed policy but not the current one",
                    witness.capability, witness.path
                );
            }
        }
        if let Some(diagnostics) = &report.diagnostics {
            println!("\ncurrent policy formula:\n{}", diagnostics.current_formula);
            println!("\nproposed policy formula:\n{}", diagnostics.new_formula);
        }
    }

    Ok(ExitCode::from(u8::from(escalation)))
}

fn run_lint(args: LintArgs) -> Result<ExitCode> {
    let policy = load_policy(&args.file)?;

    let mut rules: Vec<_> = policy.rules().collect();
    rules.sort_by(|(a, _), (b, _)| policy_guard::compare(a, b).reverse());

    println!("{} rule(s), highest priority first:", rules.len());
    for (pattern, caps) in rules {
        let caps: Vec<&str> = caps.iter().map(|c| c.as_str()).collect();
        println!("  {} = [{}]", pattern, caps.join(", "));
    }
    Ok(ExitCode::SUCCESS)
}

/// Load a policy by extension: `.json` via serde, anything else as
/// policy source text.
fn load_policy(path: &Path) -> Result<Policy> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&source)
            .with_context(|| format!("invalid JSON policy in {}", path.display()))
    } else {
        parse::parse_policy(&source)
            .with_context(|| format!("invalid policy source in {}", path.display()))
    }
}
