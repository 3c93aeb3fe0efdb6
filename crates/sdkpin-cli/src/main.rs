mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_FAILURE, EXIT_MANIFEST_ERROR, EXIT_WRITE_ERROR};
use sdkpin_core::{install_signal_handler, Engine, SdkpinConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "sdkpin",
    version,
    about = "Keep SDK-managed dependency versions consistent across a JavaScript workspace"
)]
struct Cli {
    /// Workspace root containing the root package.json.
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Config file (defaults to <root>/sdkpin.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Maximum number of SDK probes running at once.
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Seconds before a single SDK probe is abandoned.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate every manifest against the catalog rules.
    Check,
    /// Convert concrete SDK-managed dependencies in members to catalog references.
    Promote {
        /// Report changes without writing.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Remove catalog entries no manifest references.
    Prune {
        /// Report changes without writing.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Promote then prune.
    Fix {
        /// Report changes without writing.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Re-apply catalog references to manifests changed by an external tool.
    Restore {
        /// Report changes without writing.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Copy the app's SDK-managed versions into the catalog.
    Sync {
        /// Report changes without writing.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// List SDK-managed packages members use that the catalog lacks.
    Missing,
    /// Show whether packages are SDK-managed and why.
    Managed {
        /// Packages to classify (default: every package the workspace uses).
        packages: Vec<String>,
    },
    /// Run diagnostic checks on the workspace and tooling.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("SDKPIN_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    install_signal_handler();

    let json = cli.json;
    let with_engine = |run: &dyn Fn(&Engine) -> Result<u8, String>| {
        build_engine(&cli).and_then(|engine| run(&engine))
    };
    let result = match &cli.command {
        Commands::Check => with_engine(&|e| commands::check::run(e, json)),
        Commands::Promote { dry_run } => {
            with_engine(&|e| commands::promote::run(e, *dry_run, json))
        }
        Commands::Prune { dry_run } => with_engine(&|e| commands::prune::run(e, *dry_run, json)),
        Commands::Fix { dry_run } => with_engine(&|e| commands::fix::run(e, *dry_run, json)),
        Commands::Restore { dry_run } => {
            with_engine(&|e| commands::restore::run(e, *dry_run, json))
        }
        Commands::Sync { dry_run } => with_engine(&|e| commands::sync::run(e, *dry_run, json)),
        Commands::Missing => with_engine(&|e| commands::missing::run(e, json)),
        Commands::Managed { packages } => {
            with_engine(&|e| commands::managed::run(e, packages, json))
        }
        Commands::Doctor => commands::doctor::run(&cli.root, cli.config.as_deref(), json),
        Commands::Completions { shell } => commands::completions::run::<Cli>(*shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("manifest error:")
                || msg.starts_with("invalid config")
                || msg.starts_with("workspace error: cannot load root manifest")
                || msg.starts_with("workspace error: invalid workspace pattern")
            {
                EXIT_MANIFEST_ERROR
            } else if msg.starts_with("workspace error: failed to write")
                || msg.starts_with("workspace error: lock acquisition failed")
            {
                EXIT_WRITE_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}

fn build_engine(cli: &Cli) -> Result<Engine, String> {
    let mut config = load_config(&cli.root, cli.config.as_deref())?;
    if let Some(n) = cli.concurrency {
        config.probe.concurrency = n.max(1);
    }
    if let Some(secs) = cli.timeout {
        config.probe.timeout_secs = secs.max(1);
    }
    Ok(Engine::new(&cli.root, config))
}

pub(crate) fn load_config(root: &Path, explicit: Option<&Path>) -> Result<SdkpinConfig, String> {
    SdkpinConfig::load(root, explicit).map_err(|e| e.to_string())
}
