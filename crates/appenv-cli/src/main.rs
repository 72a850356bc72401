//! appenv - layered configuration lookup from the shell.
//!
//! Keys are resolved against, in order:
//! - `--set KEY=VALUE` overrides
//! - arguments after `--` (`--key=value`, `/key:value`, `key=value`, `--flag`)
//! - environment variables, optionally restricted to a prefix
//!
//! Values may reference other keys as `%name%`.

mod exit_codes;
mod logging;

use std::sync::Arc;

use appenv_common::{
    coerce, Error, ParameterSources, Provenance, Result, StructuredError, ValueKind,
};
use appenv_config::{CommandLineSource, EnvSource, Resolver};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::debug;

use exit_codes::ExitCode;
use logging::{init_logging, LogConfig, LogFormat, LogLevel};

/// Resolve configuration keys from overrides, arguments and the environment
#[derive(Parser)]
#[command(name = "appenv")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum OutputFormat {
    /// Plain text
    #[default]
    Human,
    /// Pretty-printed JSON
    Json,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Log level: trace, debug, info, warn, error, off
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format: human or json
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Only consult environment variables with this prefix
    #[arg(long, global = true, env = "APPENV_ENV_PREFIX", default_value = "")]
    env_prefix: String,

    /// Do not consult environment variables
    #[arg(long, global = true)]
    no_env: bool,

    /// Override a key for this run (repeatable)
    #[arg(long = "set", global = true, value_name = "KEY=VALUE")]
    overrides: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a single key
    Get(GetArgs),

    /// Resolve a multi-valued key
    Values(ValuesArgs),

    /// Resolve keys and show where every value came from
    Sources(SourcesArgs),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Get(_) => "get",
            Commands::Values(_) => "values",
            Commands::Sources(_) => "sources",
        }
    }

    fn passthrough(&self) -> &[String] {
        match self {
            Commands::Get(args) => &args.passthrough.args,
            Commands::Values(args) => &args.passthrough.args,
            Commands::Sources(args) => &args.passthrough.args,
        }
    }
}

/// Arguments handed to the command line source.
#[derive(Args, Debug)]
struct Passthrough {
    /// Values for the command line source, after `--`
    #[arg(last = true, value_name = "ARGS")]
    args: Vec<String>,
}

#[derive(Args, Debug)]
struct GetArgs {
    /// Key to resolve
    key: String,

    /// Value used when no source knows the key
    #[arg(long, short = 'd')]
    default: Option<String>,

    /// Convert the value: bool, int16, int32, int64, decimal, double, datetime, string
    #[arg(long, short = 'k')]
    kind: Option<ValueKind>,

    #[command(flatten)]
    passthrough: Passthrough,
}

#[derive(Args, Debug)]
struct ValuesArgs {
    /// Key to resolve
    key: String,

    /// Values used when no source knows the key (repeatable)
    #[arg(long = "default", short = 'd', value_name = "VALUE")]
    defaults: Vec<String>,

    #[command(flatten)]
    passthrough: Passthrough,
}

#[derive(Args, Debug)]
struct SourcesArgs {
    /// Keys to resolve before printing the provenance log
    #[arg(required = true)]
    keys: Vec<String>,

    #[command(flatten)]
    passthrough: Passthrough,
}

fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::from_env(cli.global.log_level, cli.global.log_format);
    init_logging(&log_config);

    let exit_code = match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            report_error(cli.global.format, &err);
            ExitCode::from(&err)
        }
    };

    std::process::exit(exit_code.as_i32());
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let resolver = build_resolver(&cli.global, cli.command.passthrough())?;
    debug!(command = cli.command.name(), chain = %resolver.description(), "dispatching");

    match &cli.command {
        Commands::Get(args) => run_get(&cli.global, &resolver, args),
        Commands::Values(args) => run_values(&cli.global, &resolver, args),
        Commands::Sources(args) => run_sources(&cli.global, &resolver, args),
    }
}

/// Command line source first, then the environment; `--set` values go to
/// the override registry.
fn build_resolver(global: &GlobalOpts, passthrough: &[String]) -> Result<Resolver> {
    let resolver = Resolver::new();
    resolver.register_source(Arc::new(CommandLineSource::from_args(passthrough)));
    if !global.no_env {
        resolver.register_source(Arc::new(EnvSource::with_prefix(global.env_prefix.as_str())));
    }
    for assignment in &global.overrides {
        let (key, value) = parse_assignment(assignment)?;
        resolver.register_key_value(key, value);
    }
    Ok(resolver)
}

fn parse_assignment(text: &str) -> Result<(&str, &str)> {
    match text.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => Err(Error::InvalidArgument(format!(
            "expected KEY=VALUE, got '{}'",
            text
        ))),
    }
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Serialize)]
struct GetOutput<'a> {
    key: &'a str,
    value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<ValueKind>,
    is_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    provenance: Option<Provenance>,
}

fn run_get(global: &GlobalOpts, resolver: &Resolver, args: &GetArgs) -> Result<ExitCode> {
    let resolved = resolver.get_string_value(&args.key, args.default.as_deref());

    let value = match (resolved, args.kind) {
        (Some(text), Some(kind)) => {
            let typed = coerce(kind, &text).ok_or_else(|| Error::Coercion {
                key: args.key.clone(),
                value: text.clone(),
                target: kind,
            })?;
            Some(typed.to_string())
        }
        (resolved, _) => resolved,
    };
    let code = if value.is_some() {
        ExitCode::Clean
    } else {
        ExitCode::NotFound
    };

    match global.format {
        OutputFormat::Human => match &value {
            Some(value) => println!("{}", value),
            None => eprintln!("appenv: key '{}' not found", args.key),
        },
        OutputFormat::Json => print_json(&GetOutput {
            key: &args.key,
            value,
            kind: args.kind,
            is_default: resolver.is_default(&args.key),
            provenance: resolver.registry().provenance(&args.key),
        })?,
    }
    Ok(code)
}

#[derive(Serialize)]
struct ValuesOutput<'a> {
    key: &'a str,
    values: Option<Vec<String>>,
    is_default: bool,
}

fn run_values(global: &GlobalOpts, resolver: &Resolver, args: &ValuesArgs) -> Result<ExitCode> {
    let defaults = (!args.defaults.is_empty()).then(|| args.defaults.clone());
    let values = resolver.get_string_values(&args.key, defaults);
    let code = if values.is_some() {
        ExitCode::Clean
    } else {
        ExitCode::NotFound
    };

    match global.format {
        OutputFormat::Human => match &values {
            Some(values) => values.iter().for_each(|value| println!("{}", value)),
            None => eprintln!("appenv: key '{}' not found", args.key),
        },
        OutputFormat::Json => print_json(&ValuesOutput {
            key: &args.key,
            values,
            is_default: resolver
                .registry()
                .provenance(&args.key)
                .is_some_and(|provenance| provenance.is_default()),
        })?,
    }
    Ok(code)
}

#[derive(Serialize)]
struct SourcesOutput {
    chain: String,
    defaulted: Vec<String>,
    parameters: ParameterSources,
}

fn run_sources(global: &GlobalOpts, resolver: &Resolver, args: &SourcesArgs) -> Result<ExitCode> {
    for key in &args.keys {
        resolver.get_string_value(key, None);
    }
    let parameters = resolver.parameters_sources();
    let defaulted: Vec<String> = parameters
        .iter()
        .filter(|(_, provenance)| provenance.is_default())
        .map(|(key, _)| key.clone())
        .collect();

    match global.format {
        OutputFormat::Human => {
            println!("chain: {}", resolver.description());
            if !defaulted.is_empty() {
                println!("defaulted: {}", defaulted.join(", "));
            }
            for (key, provenance) in &parameters {
                println!("{}: {}", key, provenance);
            }
        }
        OutputFormat::Json => print_json(&SourcesOutput {
            chain: resolver.description(),
            defaulted,
            parameters,
        })?,
    }
    Ok(ExitCode::Clean)
}

// ============================================================================
// Output helpers
// ============================================================================

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report_error(format: OutputFormat, err: &Error) {
    match format {
        OutputFormat::Human => {
            eprintln!("error: {}: {}", err.headline(), err);
            eprintln!("hint: {}", err.remediation());
        }
        OutputFormat::Json => eprintln!("{}", StructuredError::from(err).to_json()),
    }
}
