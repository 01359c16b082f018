//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use fbcorpus_core::diagnostics::{self, EvidenceShape, RecordShape};
use fbcorpus_core::pipeline::{
    self, ProgressReporter, SmokePlan, SmokeReport, StageOutcome,
};
use fbcorpus_core::runtime::Runtime;
use fbcorpus_core::stage::{ProcessRunner, StageSpec};
use fbcorpus_core::summary;
use fbcorpus_shared::{AppConfig, init_config, load_config, load_config_from};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// fbcorpus: smoke-test the thread-to-corpus pipeline on one thread.
#[derive(Parser)]
#[command(
    name = "fbcorpus",
    version,
    about = "Run the extract, slice, build and QA stages against a single thread.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.fbcorpus/fbcorpus.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Thread URL to seed the run with.
    pub thread_url: Option<String>,

    /// Browser profile directory for the extraction stage.
    pub profile_dir: Option<String>,

    /// Name of the person to extract observations about.
    pub target: Option<String>,

    /// Print the planned invocations without writing or running anything.
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Subcommands besides the default smoke run.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Hash the debug dumps of the most recent extracted thread.
    VerifyHashes {
        /// Debug dump root (defaults to <out_dir>/debug).
        #[arg(long)]
        debug_dir: Option<PathBuf>,
    },

    /// Show the key layout of the first observation records.
    InspectObservations {
        /// Observations file (defaults to <out_dir>/observations.jsonl).
        #[arg(long)]
        file: Option<PathBuf>,

        /// Number of records to inspect.
        #[arg(long, default_value = "3")]
        limit: usize,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout
/// carries only the run summary.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = format!("fbcorpus_cli={level},fbcorpus_core={level},fbcorpus_shared={level}");

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    let Some(command) = cli.command else {
        return cmd_smoke(cli.thread_url, cli.profile_dir, cli.target, cli.dry_run, &config).await;
    };

    if cli.thread_url.is_some() || cli.dry_run {
        return Err(eyre!(
            "smoke-run arguments cannot be combined with a subcommand"
        ));
    }

    match command {
        Command::VerifyHashes { debug_dir } => cmd_verify_hashes(debug_dir, &config).await,
        Command::InspectObservations { file, limit } => {
            cmd_inspect_observations(file, limit, &config).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

// ---------------------------------------------------------------------------
// Smoke run
// ---------------------------------------------------------------------------

async fn cmd_smoke(
    thread_url: Option<String>,
    profile_dir: Option<String>,
    target: Option<String>,
    dry_run: bool,
    config: &AppConfig,
) -> Result<()> {
    let args = pipeline::resolve_args(thread_url, profile_dir, target, &config.smoke)?;
    let runtime = Runtime::resolve(&config.runtime)?;
    let plan = pipeline::build_plan(&args, config, &runtime);

    info!(
        url = %args.thread_url,
        target = %args.target,
        interpreter = %runtime.program.display(),
        isolated = runtime.isolated,
        "smoke run configured"
    );

    if dry_run {
        print_plan(&plan, &args.thread_url);
        return Ok(());
    }

    let reporter = CliProgress::new(plan.stages.len());
    let result = pipeline::run_smoke(&plan, &args, &ProcessRunner, &reporter).await;
    reporter.finish();
    let report = result?;

    debug!(report = %serde_json::to_string(&report)?, "run report");
    println!("{}", summary::format_summary(report.corpus_rows));

    Ok(())
}

fn print_plan(plan: &SmokePlan, thread_url: &str) {
    for line in plan.render(thread_url) {
        println!("{line}");
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Stage counter drawn on stderr between the stages' own output.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{pos}/{len}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn stage_started(&self, stage: &StageSpec, current: usize, total: usize) {
        self.bar
            .println(format!("==> [{current}/{total}] {}", stage.kind.label()));
        self.bar.set_message(stage.kind.label());
    }

    fn stage_finished(&self, outcome: &StageOutcome) {
        self.bar.inc(1);
        self.bar.println(format!(
            "    {} done in {:.1}s",
            outcome.kind,
            outcome.elapsed.as_secs_f64()
        ));
    }

    // Cleared by `finish`, which also runs when a stage fails.
    fn done(&self, _report: &SmokeReport) {}
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

async fn cmd_verify_hashes(debug_dir: Option<PathBuf>, config: &AppConfig) -> Result<()> {
    let root = debug_dir.unwrap_or_else(|| config.paths.debug_path());
    info!(root = %root.display(), "verifying debug dump hashes");

    let report = diagnostics::verify_hashes(&root)?;
    println!("Latest thread dir: {}", report.thread_dir.display());
    for artifact in &report.artifacts {
        println!("{artifact}");
    }
    Ok(())
}

async fn cmd_inspect_observations(
    file: Option<PathBuf>,
    limit: usize,
    config: &AppConfig,
) -> Result<()> {
    let path = file.unwrap_or_else(|| config.paths.observations_path());
    info!(path = %path.display(), limit, "inspecting observations");

    for shape in diagnostics::inspect_observations(&path, limit)? {
        match shape {
            RecordShape::Parsed {
                index,
                keys,
                evidence,
            } => {
                println!("Record {index}:");
                println!("  keys: {keys:?}");
                match evidence {
                    EvidenceShape::Object { keys, debug_dir } => {
                        println!("  evidence keys: {keys:?}");
                        match debug_dir {
                            Some(serde_json::Value::String(dir)) => {
                                println!("  debug_dir example: {dir}");
                            }
                            Some(other) => println!("  debug_dir example: {other}"),
                            None => println!("  debug_dir example: (none)"),
                        }
                    }
                    EvidenceShape::Other { json_type } => {
                        println!("  evidence type: {json_type}");
                    }
                }
                println!("---");
            }
            RecordShape::Invalid { index, error } => {
                println!("Error parsing line {index}: {error}");
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_args_is_a_default_smoke_run() {
        let cli = Cli::try_parse_from(["fbcorpus"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.thread_url.is_none());
        assert!(cli.profile_dir.is_none());
        assert!(cli.target.is_none());
        assert!(!cli.dry_run);
    }

    #[test]
    fn three_positionals() {
        let cli = Cli::try_parse_from([
            "fbcorpus",
            "https://example.com/t/1",
            "profiles/me",
            "Jane Doe",
        ])
        .unwrap();
        assert_eq!(cli.thread_url.as_deref(), Some("https://example.com/t/1"));
        assert_eq!(cli.profile_dir.as_deref(), Some("profiles/me"));
        assert_eq!(cli.target.as_deref(), Some("Jane Doe"));
        assert!(cli.command.is_none());
    }

    #[test]
    fn fourth_positional_is_rejected() {
        assert!(Cli::try_parse_from(["fbcorpus", "u", "p", "t", "extra"]).is_err());
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::try_parse_from(["fbcorpus", "verify-hashes", "--debug-dir", "d"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::VerifyHashes { debug_dir: Some(_) })
        ));

        let cli = Cli::try_parse_from(["fbcorpus", "-v", "inspect-observations"]).unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(
            cli.command,
            Some(Command::InspectObservations { limit: 3, .. })
        ));

        let cli = Cli::try_parse_from(["fbcorpus", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config {
                action: ConfigAction::Show
            })
        ));
    }

    #[tokio::test]
    async fn dry_run_writes_and_spawns_nothing() {
        use fbcorpus_shared::{PathsConfig, RuntimeConfig};

        let root = std::env::temp_dir().join(format!("fbc_cli_{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&root).unwrap();
        let out_dir = root.join("fb_extract_out");
        let config = AppConfig {
            paths: PathsConfig {
                out_dir: out_dir.to_string_lossy().into_owned(),
                ..PathsConfig::default()
            },
            runtime: RuntimeConfig {
                venv_dir: root.join(".venv").to_string_lossy().into_owned(),
                // Would fail with 127 if anything were spawned.
                interpreter: "fbc-definitely-not-installed-binary".into(),
                ..RuntimeConfig::default()
            },
            ..AppConfig::default()
        };

        cmd_smoke(None, None, None, true, &config).await.unwrap();

        assert!(!out_dir.exists());
        assert!(!config.paths.seed_path().exists());

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
