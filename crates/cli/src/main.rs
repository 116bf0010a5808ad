mod generate;
mod inspect;

use std::path::PathBuf;
use std::process::Command;

use clap::{Parser, Subcommand, ValueEnum};
use structmap_core::GoEnv;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Go struct mapping generator.
#[derive(Parser)]
#[command(name = "structmap", version, about = "Go struct mapping generator")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log resolution progress to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate mapping functions from a mapping configuration
    Generate {
        /// Path to the mapping configuration (YAML)
        #[arg(long, short)]
        config: PathBuf,
        /// Path to the shared conversions file (YAML)
        #[arg(long)]
        conversions: Option<PathBuf>,
        /// Root of the Go module (directory containing go.mod)
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Print the generated file instead of writing it
        #[arg(long)]
        stdout: bool,
        /// Pipe the generated file through gofmt
        #[arg(long)]
        gofmt: bool,
    },

    /// Print the resolved fields of a struct type as JSON
    Inspect {
        /// Import path of the package ("." for the module root)
        module: String,
        /// Name of the struct type
        #[arg(value_name = "TYPE")]
        type_name: String,
        /// Root of the Go module (directory containing go.mod)
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            config,
            conversions,
            root,
            stdout,
            gofmt,
        } => {
            generate::cmd_generate(generate::GenerateOptions {
                config: &config,
                conversions: conversions.as_deref(),
                root: &root,
                stdout,
                gofmt,
                verbose: cli.verbose,
                output: cli.output,
                quiet: cli.quiet,
            });
        }
        Commands::Inspect {
            module,
            type_name,
            root,
        } => {
            init_tracing(if cli.verbose { "debug" } else { "warn" });
            inspect::cmd_inspect(&module, &type_name, &root, cli.output, cli.quiet);
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` takes precedence over
/// `default_level`.
pub(crate) fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Build settings from the environment. When `GOROOT` is unset the `go`
/// tool is asked for it; without one, standard-library packages stay
/// unresolved and their names are guessed.
pub(crate) fn go_env() -> GoEnv {
    let mut env = GoEnv::from_env();
    if env.goroot.is_none() {
        match Command::new("go").args(["env", "GOROOT"]).output() {
            Ok(out) if out.status.success() => {
                let goroot = String::from_utf8_lossy(&out.stdout).trim().to_string();
                if !goroot.is_empty() {
                    env.goroot = Some(PathBuf::from(goroot));
                }
            }
            Ok(out) => tracing::debug!(status = %out.status, "go env GOROOT failed"),
            Err(err) => tracing::debug!(error = %err, "go tool not available"),
        }
    }
    tracing::debug!(
        goos = %env.goos,
        goarch = %env.goarch,
        mod_cache = ?env.mod_cache,
        goroot = ?env.goroot,
        "build environment"
    );
    env
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
