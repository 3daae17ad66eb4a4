//! ForgeCred - credential verification driver
//!
//! Lists the discovered checks, shows their input schemas and runs one check
//! against the inputs given on the command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use forgecred_checks::{builtin, discover, Catalog, CompositeSource, DirectorySource, Invoker};
use forgecred_common::config::Config;
use forgecred_common::logging::{init_logging_with_config, LogConfig};
use forgecred_core::{CheckSchema, RawInputs, Value};
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_CONFIG: &str = "/etc/forgecred/forgecred.toml";

/// ForgeCred credential verification
#[derive(Parser, Debug)]
#[command(name = "forgecred")]
#[command(author = "Forge Cyber Defense")]
#[command(version)]
#[command(about = "Verify credentials against target services", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Directory of YAML check manifests (overrides config)
    #[arg(long, global = true)]
    checks_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format (pretty, json, compact)
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every discovered check and whether it can be run
    List,

    /// Print the input schema of a check as JSON
    Show {
        /// Check identifier
        id: String,
    },

    /// Run a check and print its outcome as JSON
    Run {
        /// Check identifier
        id: String,

        /// Input value, repeatable
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
        inputs: Vec<(String, String)>,

        /// Abort the check after this many seconds (overrides config)
        #[arg(long)]
        budget_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_logging_with_config(LogConfig::from(&config.logging));
    debug!("Configuration: {:?}", config);

    let catalog = build_catalog(&config)?;

    match args.command {
        Command::List => {
            print_list(&catalog);
            Ok(ExitCode::SUCCESS)
        }
        Command::Show { id } => {
            let schema = redact_defaults(catalog.schema(&id)?);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Run {
            id,
            inputs,
            budget_secs,
        } => {
            let budget = budget_secs
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .or_else(|| config.invocation.budget());
            let invoker = match budget {
                Some(budget) => Invoker::with_budget(budget),
                None => Invoker::new(),
            };

            let raw: RawInputs = inputs
                .into_iter()
                .map(|(key, value)| (key, Value::Text(value)))
                .collect();

            info!("Running check {}", id);
            let outcome = invoker.invoke_by_id(&catalog, &id, &raw).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);

            Ok(if outcome.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

/// Config file, then `FORGECRED_*` environment, then command-line flags
fn load_config(args: &Args) -> Result<Config> {
    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path))?,
        None if Path::new(DEFAULT_CONFIG).exists() => Config::from_file(DEFAULT_CONFIG)?,
        None => Config::default(),
    };
    Ok(apply_flags(config.merge_env(), args))
}

/// Command-line flags win over the file and the environment
fn apply_flags(mut config: Config, args: &Args) -> Config {
    if let Some(dir) = &args.checks_dir {
        config.checks.manifest_dir = Some(dir.clone());
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = &args.log_format {
        config.logging.format = format.clone();
    }
    config
}

fn build_catalog(config: &Config) -> Result<Catalog> {
    let mut source = CompositeSource::new();
    if config.checks.include_builtin {
        source = source.with(builtin::source());
    }
    if let Some(dir) = &config.checks.manifest_dir {
        source = source.with(DirectorySource::new(dir, builtin::drivers()));
    }
    discover(&source).context("check discovery failed")
}

fn print_list(catalog: &Catalog) {
    let width = catalog.ids().map(str::len).max().unwrap_or(0);
    for entry in catalog.entries() {
        match entry.unavailable_reason() {
            None => println!("{:<width$}  {}", entry.identifier, entry.description),
            Some(reason) => println!(
                "{:<width$}  (unavailable: {})",
                entry.identifier, reason
            ),
        }
    }
}

/// Secret fields never show their default values
fn redact_defaults(mut schema: CheckSchema) -> CheckSchema {
    for field in schema.fields.iter_mut().filter(|f| f.is_secret()) {
        if field.default.as_ref().is_some_and(|v| !v.is_blank()) {
            field.default = Some(Value::text("<redacted>"));
        }
    }
    schema
}

fn parse_assignment(arg: &str) -> std::result::Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", arg)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use forgecred_core::FieldSpec;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let args = Args::try_parse_from([
            "forgecred",
            "run",
            "tcp-connect",
            "--set",
            "host=db.example.com",
            "--set",
            "password=a=b",
            "--budget-secs",
            "5",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(args.log_level.as_deref(), Some("debug"));
        match args.command {
            Command::Run {
                id,
                inputs,
                budget_secs,
            } => {
                assert_eq!(id, "tcp-connect");
                assert_eq!(inputs[0], ("host".into(), "db.example.com".into()));
                assert_eq!(inputs[1], ("password".into(), "a=b".into()));
                assert_eq!(budget_secs, Some(5));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_assignment_rejects_garbage() {
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=value").is_err());
        assert_eq!(parse_assignment("host=").unwrap(), ("host".into(), String::new()));
    }

    #[test]
    fn test_secret_defaults_are_redacted() {
        let schema = CheckSchema::new("Test")
            .field(FieldSpec::secret("password").with_default("hunter2"))
            .field(FieldSpec::text("username").with_default("admin"));
        let schema = redact_defaults(schema);
        assert_eq!(schema.fields[0].default, Some(Value::text("<redacted>")));
        assert_eq!(schema.fields[1].default, Some(Value::text("admin")));
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::try_parse_from([
            "forgecred",
            "--checks-dir",
            "/srv/checks",
            "--log-format",
            "json",
            "list",
        ])
        .unwrap();
        let env = |key: &str| match key {
            "FORGECRED_CHECKS_DIR" => Some("/opt/checks".to_string()),
            "FORGECRED_LOG_FORMAT" => Some("compact".to_string()),
            "FORGECRED_LOG_LEVEL" => Some("trace".to_string()),
            _ => None,
        };
        let file = Config::from_toml("[logging]\nlevel = \"warn\"\nformat = \"pretty\"").unwrap();

        let config = apply_flags(file.merge_vars(env), &args);
        assert_eq!(config.checks.manifest_dir.as_deref(), Some("/srv/checks"));
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "trace");
    }
}
