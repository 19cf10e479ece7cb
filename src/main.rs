//! layerconf CLI
//!
//! Entry point for the `layerconf` command-line tool.

use clap::{Parser, Subcommand};
use layerconf::config::{ConfigError, ConfigSource, SettingsOverrides};
use layerconf::merge::{select_stages, PreprocessContext, PREPROCESS_KEY};
use layerconf::{EffectiveConfig, MergeSettings, SystemEnvironment};
use serde::Serialize;
use serde_json::Value;
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "layerconf")]
#[command(about = "Merge layered configuration files", version)]
struct Cli {
    /// Enable debug logging on stderr (overrides RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge sources in order, lowest precedence first
    Merge {
        /// Source files (.json, .toml, .yaml, .yml)
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        #[command(flatten)]
        merge: MergeArgs,

        /// Keep deleted values as null instead of erasing them
        #[arg(long)]
        keep_null: bool,

        /// Print only the value at this dot-separated path
        #[arg(long)]
        get: Option<String>,

        /// Print the merged config with sources and stage context
        #[arg(long, conflicts_with = "get")]
        provenance: bool,

        /// Print compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Show which fragments of a stages source apply on this host
    Stages {
        /// Stages source file
        source: PathBuf,

        #[command(flatten)]
        merge: MergeArgs,

        /// Print compact JSON
        #[arg(long)]
        compact: bool,
    },
}

#[derive(clap::Args)]
struct MergeArgs {
    /// Path to merge settings (default: ./layerconf.toml when present)
    #[arg(long, short = 's')]
    settings: Option<PathBuf>,

    /// Template key inside `_instances` nodes
    #[arg(long)]
    wildcard: Option<String>,

    /// Environment variable matched against stage `env`
    #[arg(long)]
    stage_env: Option<String>,

    /// Use this hostname for stage matching instead of the system hostname
    #[arg(long)]
    hostname: Option<String>,
}

impl MergeArgs {
    fn environment(&self) -> SystemEnvironment {
        match &self.hostname {
            Some(hostname) => SystemEnvironment::with_hostname(hostname.clone()),
            None => SystemEnvironment::new(),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Merge {
            sources,
            merge,
            keep_null,
            get,
            provenance,
            compact,
        } => {
            run_merge(&sources, &merge, keep_null, get.as_deref(), provenance, compact);
        }
        Commands::Stages {
            source,
            merge,
            compact,
        } => {
            run_stages(&source, &merge, compact);
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn overrides(args: &MergeArgs, keep_null: bool) -> SettingsOverrides {
    SettingsOverrides {
        wildcard: args.wildcard.clone(),
        stage_env: args.stage_env.clone(),
        keep_null,
    }
}

fn current_dir() -> PathBuf {
    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn run_merge(
    paths: &[PathBuf],
    args: &MergeArgs,
    keep_null: bool,
    get: Option<&str>,
    provenance: bool,
    compact: bool,
) {
    let environment = args.environment();
    let resolved = EffectiveConfig::resolve(
        paths,
        args.settings.as_deref(),
        &current_dir(),
        &overrides(args, keep_null),
        &environment,
    );

    let effective = match resolved {
        Ok(effective) => effective,
        Err(ConfigError::Settings(e)) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error loading sources: {}", e);
            process::exit(1);
        }
    };

    if provenance {
        print_json(&effective, compact);
        return;
    }

    match get {
        Some(path) => match effective.get(path) {
            Some(value) => print_json(value, compact),
            None => {
                eprintln!("No value at '{}'", path);
                process::exit(2);
            }
        },
        None => print_json(&effective.config, compact),
    }
}

fn run_stages(path: &Path, args: &MergeArgs, compact: bool) {
    let settings = MergeSettings::discover(args.settings.as_deref(), &current_dir())
        .and_then(|settings| settings.with_overrides(&overrides(args, false)));
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };
    let environment = args.environment();

    let value = match ConfigSource::load(path) {
        Ok((_, value)) => value,
        Err(e) => {
            eprintln!("Error loading source: {}", e);
            process::exit(1);
        }
    };

    let Value::Object(mut stages) = value else {
        eprintln!("{} is not a stages source: expected an object", path.display());
        process::exit(1);
    };
    stages.shift_remove(PREPROCESS_KEY);

    let context = PreprocessContext {
        stage_env: &settings.merge.stage_env,
        environment: &environment,
    };
    let selection = select_stages(stages, &context);

    match &selection.matched {
        Some(matched) => eprintln!(
            "Applied stages: {} (matched '{}')",
            selection.applied.join(", "),
            matched
        ),
        None => eprintln!(
            "Applied stages: {} (no stage matched)",
            selection.applied.join(", ")
        ),
    }
    print_json(&selection.config, compact);
}

fn print_json<T: Serialize + ?Sized>(value: &T, compact: bool) {
    let rendered = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    match rendered {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}
