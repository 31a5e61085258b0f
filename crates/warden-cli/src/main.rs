//! Warden CLI - check agent execution traces against temporal contracts
//!
//! # Quick Start
//!
//! ```bash
//! # Check a trace against the built-in governance contracts
//! warden check --trace run.json
//!
//! # Check against a custom contract set, machine-readable output
//! warden check --trace run.json --contracts contracts.yaml --format json
//!
//! # Show the canonical form of a formula
//! warden parse "G(request -> F response)" --alphabet request,response
//!
//! # Invoke any configured capability on a file
//! warden validate --config service.yaml --capability json_payload --input order.json
//! ```
//!
//! Exit codes: 0 valid, 1 a contract or payload failed validation, 2 error.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;
use warden_core::contract::parse_formula_with_alphabet;
use warden_core::providers::default_contract_set;
use warden_core::{
    parse_formula, ContractSet, ExecutionTrace, TraceChecker, ValidationInput, ValidationResult,
    Verdict, VerdictStatus,
};

mod config;
mod xml;

use config::ServiceConfig;

/// Warden - composable validation with temporal trace contracts
#[derive(Parser)]
#[command(name = "warden")]
#[command(version)]
#[command(about = "Check agent execution traces against LTLf contracts", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log more (repeat for trace-level logs); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a trace against the built-in or given contracts
    Check {
        /// Trace file (JSON)
        #[arg(short, long)]
        trace: PathBuf,

        /// Contract set file (YAML or JSON)
        #[arg(short, long)]
        contracts: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Parse a formula and print its canonical form
    Parse {
        formula: String,

        /// Restrict predicates to these names
        #[arg(short, long, value_delimiter = ',')]
        alphabet: Vec<String>,
    },

    /// List the capabilities a service config installs
    Capabilities {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Invoke one capability on a file
    Validate {
        #[arg(long)]
        capability: String,

        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcome = run(cli.command);
    if let Err(e) = &outcome {
        eprintln!("error: {:#}", e);
    }
    ExitCode::from(exit_status(&outcome))
}

/// 0 when everything checked was valid, 1 on a failed validation, 2 on error.
fn exit_status(outcome: &Result<bool>) -> u8 {
    match outcome {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(_) => 2,
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns whether everything checked was valid.
fn run(command: Commands) -> Result<bool> {
    match command {
        Commands::Check {
            trace,
            contracts,
            format,
        } => check(&trace, contracts.as_deref(), format),
        Commands::Parse { formula, alphabet } => parse(&formula, alphabet),
        Commands::Capabilities { config } => {
            let manager = ServiceConfig::load_or_default(config.as_deref())?.build_manager()?;
            println!("{}", manager.service());
            for capability in manager.available_capabilities() {
                println!("  {}", capability);
            }
            Ok(true)
        }
        Commands::Validate {
            capability,
            input,
            config,
            format,
        } => validate(&capability, &input, config.as_deref(), format),
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn check(trace: &Path, contracts: Option<&Path>, format: OutputFormat) -> Result<bool> {
    let execution = ExecutionTrace::from_json(&read(trace)?)
        .with_context(|| format!("decoding trace {}", trace.display()))?;
    let set = match contracts {
        Some(path) => ContractSet::from_file(path)
            .with_context(|| format!("loading contracts {}", path.display()))?,
        None => default_contract_set()?,
    };

    let verdicts = TraceChecker::new().check_all(&set, &execution);
    let valid = !verdicts.iter().any(Verdict::is_violated);
    info!(
        trace = %trace.display(),
        events = execution.len(),
        contracts = set.len(),
        valid,
        "Trace checked"
    );

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&verdicts)?),
        OutputFormat::Text => {
            for (verdict, contract) in verdicts.iter().zip(set.contracts()) {
                let mark = match verdict.status {
                    VerdictStatus::Satisfied => "ok",
                    VerdictStatus::Violated => "FAIL",
                    VerdictStatus::Inconclusive => "??",
                };
                println!("{:<4} {}  {}", mark, contract.name(), contract.formula());
                if let Some(counterexample) = &verdict.counterexample {
                    for event in counterexample.events() {
                        let labels: Vec<&str> = event.labels.iter().map(String::as_str).collect();
                        println!("       #{} {{{}}}", event.index, labels.join(", "));
                    }
                }
            }
        }
    }
    Ok(valid)
}

fn parse(formula: &str, alphabet: Vec<String>) -> Result<bool> {
    let parsed = if alphabet.is_empty() {
        parse_formula(formula)
    } else {
        let alphabet: BTreeSet<String> = alphabet.into_iter().collect();
        parse_formula_with_alphabet(formula, &alphabet)
    }?;
    println!("{}", parsed);
    Ok(true)
}

fn validate(
    capability: &str,
    input: &Path,
    config: Option<&Path>,
    format: OutputFormat,
) -> Result<bool> {
    let manager = ServiceConfig::load_or_default(config)?.build_manager()?;
    let result = manager.invoke(capability, &ValidationInput::text(read(input)?))?;
    print_result(&result, format)?;
    Ok(result.valid)
}

fn print_result(result: &ValidationResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Text => {
            println!("{}", if result.valid { "valid" } else { "invalid" });
            for error in &result.errors {
                match &error.location {
                    Some(location) => {
                        println!("  {} at {}: {}", error.code, location, error.message)
                    }
                    None => println!("  {}: {}", error.code, error.message),
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn check_trace(trace: &str) -> Result<bool> {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "trace.json", trace);
        check(&path, None, OutputFormat::Json)
    }

    #[test]
    fn test_check_compliant_trace_exits_zero() {
        let outcome = check_trace(
            r#"[{"index": 0, "labels": ["request", "authorized"]},
                {"index": 1, "labels": ["action"]},
                {"index": 2, "labels": ["response", "terminal"]}]"#,
        );
        assert!(matches!(outcome, Ok(true)));
        assert_eq!(exit_status(&outcome), 0);
    }

    #[test]
    fn test_check_violation_exits_one() {
        let outcome = check_trace(
            r#"{"events": [{"index": 0, "labels": ["authorized"]},
                           {"index": 1, "labels": ["unauthorized_action"]}]}"#,
        );
        assert!(matches!(outcome, Ok(false)));
        assert_eq!(exit_status(&outcome), 1);
    }

    #[test]
    fn test_check_inconclusive_counts_as_valid() {
        // the escalation is still pending when the trace ends
        let outcome = check_trace(
            r#"[{"index": 0, "labels": ["authorized"]}, {"index": 1, "labels": ["error"]}]"#,
        );
        assert!(matches!(outcome, Ok(true)));
        assert_eq!(exit_status(&outcome), 0);
    }

    #[test]
    fn test_check_errors_exit_two() {
        let dir = TempDir::new().unwrap();

        let missing = check(&dir.path().join("absent.json"), None, OutputFormat::Text);
        assert!(missing.is_err());
        assert_eq!(exit_status(&missing), 2);

        let ill_ordered = check_trace(r#"[{"index": 3}, {"index": 1}]"#);
        assert_eq!(exit_status(&ill_ordered), 2);

        let trace = write(&dir, "trace.json", r#"[{"index": 0}]"#);
        let contracts = write(
            &dir,
            "contracts.yaml",
            "alphabet: [a]\ncontracts:\n  - name: broken\n    formula: \"G(a\"\n",
        );
        let malformed = check(&trace, Some(&contracts), OutputFormat::Text);
        assert_eq!(exit_status(&malformed), 2);
    }

    #[test]
    fn test_check_custom_contracts() {
        let dir = TempDir::new().unwrap();
        let trace = write(&dir, "trace.json", r#"[{"index": 0, "labels": ["login"]}, {"index": 1}]"#);
        let contracts = write(
            &dir,
            "contracts.json",
            r#"{"alphabet": ["login", "logout"],
                "contracts": [{"name": "logout-after-login", "formula": "G(login -> F logout)"}]}"#,
        );
        assert!(matches!(check(&trace, Some(&contracts), OutputFormat::Text), Ok(false)));
    }

    #[test]
    fn test_validate_json_payload() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "order.schema.json",
            r#"{"type": "object", "required": ["id"]}"#,
        );
        let config = write(
            &dir,
            "service.yaml",
            "service: web_api_service\njson_schema: order.schema.json\nagent_governance: false\n",
        );
        let good = write(&dir, "good.json", r#"{"id": "o-1"}"#);
        let bad = write(&dir, "bad.json", r#"{"quantity": 2}"#);

        let valid = validate("json_payload", &good, Some(&config), OutputFormat::Json);
        assert_eq!(exit_status(&valid), 0);

        let invalid = validate("json_payload", &bad, Some(&config), OutputFormat::Text);
        assert_eq!(exit_status(&invalid), 1);

        let unknown = validate("agent_execution", &good, Some(&config), OutputFormat::Text);
        assert_eq!(exit_status(&unknown), 2);
    }

    #[test]
    fn test_parse_respects_alphabet() {
        assert!(matches!(parse("G(a -> F b)", vec![]), Ok(true)));
        assert!(parse("G(a -> F b)", vec!["a".to_string()]).is_err());
        assert!(parse("G(", vec![]).is_err());
    }
}
