//! mockingjay CLI - fake HTTP server, contract checker and monkey middleware

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mockingjay_core::{BehaviorTable, Config, load_endpoints};
use mockingjay_runner::{CompatibilityChecker, fake, monkey_around};

#[derive(Parser)]
#[command(name = "mockingjay")]
#[command(about = "Fake HTTP server, contract checker and monkey middleware")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "terminal")]
    output: OutputFormat,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the endpoint set as a fake server
    Serve {
        /// Config file (default: .mockingjay.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Endpoint expectation set (YAML)
        #[arg(short, long)]
        endpoints: Option<PathBuf>,

        /// Behavior table for the monkey layer (YAML)
        #[arg(short, long)]
        monkey: Option<PathBuf>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check a real service is compatible with the endpoint set
    Check {
        /// Config file (default: .mockingjay.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Endpoint expectation set (YAML)
        #[arg(short, long)]
        endpoints: Option<PathBuf>,

        /// Base URL of the real service
        #[arg(long)]
        real_url: Option<String>,

        /// Per-request timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Max in-flight checks
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Initialize config file
    Init,

    /// Export JSON Schema for the compatibility report
    Schema,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Terminal,
    Json,
    Silent,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.output);

    match run(cli).await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(3)
        }
    }
}

/// `RUST_LOG` wins; otherwise info, debug with `--verbose`, warn when silent.
fn init_logging(verbose: bool, output: OutputFormat) {
    let default = match (verbose, output) {
        (true, _) => "debug",
        (false, OutputFormat::Silent) => "warn",
        (false, _) => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    Ok(config)
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Serve {
            config,
            endpoints,
            monkey,
            port,
        } => {
            let mut cfg = load_config(config.as_deref())?;
            if let Some(endpoints) = endpoints {
                cfg.endpoints = endpoints;
            }
            if monkey.is_some() {
                cfg.monkey = monkey;
            }
            if let Some(port) = port {
                cfg.port = port;
            }
            serve(&cfg).await?;
            Ok(0)
        }

        Commands::Check {
            config,
            endpoints,
            real_url,
            timeout_ms,
            concurrency,
        } => {
            let mut cfg = load_config(config.as_deref())?;
            if let Some(endpoints) = endpoints {
                cfg.endpoints = endpoints;
            }
            if real_url.is_some() {
                cfg.real_url = real_url;
            }
            if let Some(timeout_ms) = timeout_ms {
                cfg.timeout_ms = timeout_ms;
            }
            if concurrency.is_some() {
                cfg.concurrency = concurrency;
            }
            check(&cfg, cli.output).await
        }

        Commands::Init => {
            let config_path = ".mockingjay.toml";
            if Path::new(config_path).exists() {
                eprintln!("{config_path} already exists");
                return Ok(1);
            }

            std::fs::write(config_path, Config::example())?;
            println!("Created {config_path}");
            println!("\nEdit the file to configure:");
            println!("  - endpoints: your endpoint expectation set (YAML)");
            println!("  - monkey: optional behavior table for fault injection");
            println!("  - real_url: the service `mockingjay check` replays against");
            Ok(0)
        }

        Commands::Schema => {
            let schema = mockingjay_core::schema::generate_schema();
            println!("{schema}");
            Ok(0)
        }
    }
}

async fn serve(cfg: &Config) -> Result<()> {
    let endpoints = load_endpoints(&cfg.endpoints)?;
    let table = cfg
        .monkey
        .as_deref()
        .map(BehaviorTable::load)
        .transpose()?;
    if endpoints.is_empty() {
        warn!(path = %cfg.endpoints.display(), "endpoint set is empty, every request will 404");
    }
    info!(endpoints = endpoints.len(), path = %cfg.endpoints.display(), "loaded endpoints");

    let router = monkey_around(fake::router(endpoints), table);
    let addr = SocketAddr::from(([127, 0, 0, 1], cfg.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot listen on {addr}"))?;

    tokio::select! {
        served = fake::serve(listener, router) => served.context("fake server stopped")?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("cannot listen for Ctrl-C")?;
            info!("shutting down");
        }
    }
    Ok(())
}

async fn check(cfg: &Config, output: OutputFormat) -> Result<i32> {
    let Some(real_url) = cfg.real_url.as_deref() else {
        bail!("no real_url configured (set it in the config file or pass --real-url)");
    };
    let endpoints = load_endpoints(&cfg.endpoints)?;

    let checker = CompatibilityChecker::from_config(cfg)?;
    let report = checker.check_report(&endpoints, real_url).await;
    let verdict = report.verdict();

    match output {
        OutputFormat::Terminal => {
            println!("{}", report.to_terminal());
            println!("  Exit code: {}", verdict.exit_code);
        }
        OutputFormat::Json => {
            let json_output = serde_json::json!({
                "verdict": verdict,
                "report": report,
            });
            println!("{}", serde_json::to_string_pretty(&json_output)?);
        }
        OutputFormat::Silent => {}
    }

    Ok(verdict.exit_code)
}
