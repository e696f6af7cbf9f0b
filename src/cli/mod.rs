//! Command-line interface for kiln.
//!
//! Subcommands cover the burn-in lifecycle (`promote`, `burnin`,
//! `deflake`, `demote`, `status`) and the analysis surfaces (`parse`,
//! `graph`, `predict`, `merge-discovery`). Configuration precedence is
//! CLI flags > `.kiln/config.toml` > defaults.

mod commands;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

use crate::config::FileConfig;
use crate::exit_codes::{ExitCode, exit_code_for};

/// kiln - test orchestration and burn-in engine
#[derive(Parser)]
#[command(name = "kiln")]
#[command(version)]
#[command(about = "Test orchestration and burn-in engine with SPRT-based flakiness classification")]
#[command(long_about = r#"
kiln runs declared test targets, repeatedly executes probationary tests
until a sequential probability ratio test classifies them as stable or
flaky, and demotes previously-trusted tests when they regress.

EXAMPLES:
  # Move a newly added test into burn-in
  kiln promote //shop:checkout_test

  # Sweep all burning-in tests to a decision
  kiln burnin --manifest manifest.json

  # Re-evaluate a stable test that just failed
  kiln demote --manifest manifest.json //shop:checkout_test

  # Reset a flaky test after a fix
  kiln deflake //shop:checkout_test

  # Inspect the status store
  kiln status --json

  # Build the co-occurrence graph from a git-log capture
  git log --name-only --format='COMMIT %H %aI' | kiln graph build --output .kiln/graph.json

CONFIGURATION:
  Flags override .kiln/config.toml, discovered by searching upward from
  the working directory; defaults apply last.
"#)]
pub struct Cli {
    /// Verbose logging (kiln=debug)
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Explicit config file path (skips discovery)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Status store path (default: .kiln/status.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub status_file: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the burn-in sweep over burning-in tests
    Burnin {
        /// Manifest with the executable test targets
        #[arg(long, value_name = "PATH")]
        manifest: Utf8PathBuf,

        /// Specific test labels to sweep (default: all burning-in)
        tests: Vec<String>,

        /// Cap on full sweep iterations
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Per-test wall-clock timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Override the store's target pass rate
        #[arg(long)]
        min_reliability: Option<f64>,

        /// Override the store's required confidence
        #[arg(long)]
        statistical_significance: Option<f64>,
    },

    /// Promote new tests into burn-in
    Promote {
        /// Test labels to promote
        #[arg(required = true)]
        tests: Vec<String>,
    },

    /// Reset flaky tests into burn-in, clearing their counters
    Deflake {
        /// Test labels to deflake
        #[arg(required = true)]
        tests: Vec<String>,
    },

    /// Evaluate a failed stable test for demotion
    Demote {
        /// Manifest with the executable test targets
        #[arg(long, value_name = "PATH")]
        manifest: Utf8PathBuf,

        /// The failed stable test
        test: String,

        /// Maximum re-runs for the evaluation
        #[arg(long, default_value_t = 20)]
        max_reruns: u32,

        /// Per-test wall-clock timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Show the status store
    Status {
        /// Emit canonical JSON instead of the human summary
        #[arg(long)]
        json: bool,
    },

    /// Parse a captured test output stream
    Parse {
        /// File holding the captured stdout
        file: Utf8PathBuf,

        /// Manifest for dependency inference
        #[arg(long, value_name = "PATH")]
        manifest: Option<Utf8PathBuf>,

        /// Label of the test the capture belongs to (enables inference)
        #[arg(long)]
        test: Option<String>,

        /// Explicit feature-to-test map for inference
        #[arg(long, value_name = "PATH")]
        feature_map: Option<Utf8PathBuf>,
    },

    /// Co-occurrence graph operations
    Graph {
        #[command(subcommand)]
        command: GraphCommand,
    },

    /// Predict targets impacted by changed files
    Predict {
        /// Saved co-occurrence graph
        #[arg(long, value_name = "PATH")]
        graph: Utf8PathBuf,

        /// Manifest whose targets are matched
        #[arg(long, value_name = "PATH")]
        manifest: Utf8PathBuf,

        /// Changed file paths
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// Merge a workspace discovery document into a manifest copy
    MergeDiscovery {
        /// Manifest to decorate
        #[arg(long, value_name = "PATH")]
        manifest: Utf8PathBuf,

        /// Discovery document (tests + test sets)
        #[arg(long, value_name = "PATH")]
        discovery: Utf8PathBuf,

        /// Output path (default: stdout)
        #[arg(long, value_name = "PATH")]
        output: Option<Utf8PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum GraphCommand {
    /// Build or incrementally refresh a graph from a git-log capture
    Build {
        /// File with `git log --name-only --format='COMMIT %H %aI'`
        /// output; stdin when omitted
        #[arg(long, value_name = "PATH")]
        git_log: Option<Utf8PathBuf>,

        /// Graph path; an existing graph is updated in place
        #[arg(long, value_name = "PATH")]
        output: Utf8PathBuf,
    },
}

/// CLI entrypoint: parse, configure, dispatch, map errors to exit codes.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    // A second init in tests is harmless; ignore the error.
    let _ = kiln_utils::init_tracing(cli.verbose);

    let file_config = match load_file_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err:#}");
            return Err(ExitCode::new(crate::exit_codes::codes::CLI_ARGS));
        }
    };

    commands::dispatch(&cli, &file_config).map_err(|err| {
        eprintln!("error: {err:#}");
        exit_code_for(&err)
    })
}

fn load_file_config(cli: &Cli) -> anyhow::Result<FileConfig> {
    match &cli.config {
        Some(path) => FileConfig::load(path),
        None => {
            let cwd = std::env::current_dir()?;
            FileConfig::discover(&cwd)
        }
    }
}
