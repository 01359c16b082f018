//! End-to-end smoke run: args → seed file → extract → slice → build → QA → row count.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, instrument};
use url::Url;

use fbcorpus_shared::{AppConfig, FbCorpusError, Result, RunId, SmokeArgs, SmokeConfig, StageKind};

use crate::runtime::Runtime;
use crate::stage::{StageRunner, StageSpec};
use crate::summary;

// Fixed smoke-mode flags for the extraction stage.
const HEADLESS: &str = "0";
const DUMP_HTML: &str = "1";
const RESUME: &str = "0";
const ONLY_ONE: &str = "1";

/// Everything a smoke run touches, resolved up front.
#[derive(Debug, Clone)]
pub struct SmokePlan {
    /// Directory created before the seed file is written.
    pub out_dir: PathBuf,
    /// Single-URL input of the extraction stage.
    pub seed_file: PathBuf,
    /// File counted by the summary step.
    pub corpus_file: PathBuf,
    /// Stages in execution order.
    pub stages: Vec<StageSpec>,
}

impl SmokePlan {
    /// Human-readable listing of what a run would do, one line per step.
    pub fn render(&self, thread_url: &str) -> Vec<String> {
        let total = self.stages.len();
        let mut lines = Vec::with_capacity(total + 2);
        lines.push(format!("seed:    {} <- {thread_url}", self.seed_file.display()));
        for (i, stage) in self.stages.iter().enumerate() {
            lines.push(format!("[{}/{total}] {}: {}", i + 1, stage.kind, stage.command_line()));
        }
        lines.push(format!("summary: {}", self.corpus_file.display()));
        lines
    }
}

/// Result of one stage that exited zero.
#[derive(Debug, Clone, Serialize)]
pub struct StageOutcome {
    pub kind: StageKind,
    pub exit_code: i32,
    pub elapsed: Duration,
}

/// Result of a completed smoke run.
#[derive(Debug, Clone, Serialize)]
pub struct SmokeReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub stages: Vec<StageOutcome>,
    /// Non-blank lines in the corpus file, 0 if it was never written.
    pub corpus_rows: usize,
    pub elapsed: Duration,
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called for steps that are not external stages.
    fn phase(&self, name: &str);
    /// Called right before a stage is spawned.
    fn stage_started(&self, stage: &StageSpec, current: usize, total: usize);
    /// Called after a stage exits zero.
    fn stage_finished(&self, outcome: &StageOutcome);
    /// Called when the run completes.
    fn done(&self, report: &SmokeReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn stage_started(&self, _stage: &StageSpec, _current: usize, _total: usize) {}
    fn stage_finished(&self, _outcome: &StageOutcome) {}
    fn done(&self, _report: &SmokeReport) {}
}

/// Merge positional arguments over config defaults and validate the URL.
pub fn resolve_args(
    thread_url: Option<String>,
    profile_dir: Option<String>,
    target: Option<String>,
    defaults: &SmokeConfig,
) -> Result<SmokeArgs> {
    let thread_url = thread_url.unwrap_or_else(|| defaults.thread_url.clone());

    // `Url::parse` drops tabs and newlines, so check the raw string first:
    // the seed file must stay a single line.
    if thread_url.is_empty() || thread_url.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(FbCorpusError::validation(format!(
            "thread URL must be a single non-empty token without whitespace, got {thread_url:?}"
        )));
    }

    // Scheme-less input is handed to the extraction stage unchanged.
    match Url::parse(&thread_url) {
        Ok(parsed) if !matches!(parsed.scheme(), "http" | "https") => {
            return Err(FbCorpusError::validation(format!(
                "thread URL must be http(s), got '{thread_url}'"
            )));
        }
        Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => {}
        Err(e) => {
            return Err(FbCorpusError::validation(format!(
                "invalid thread URL '{thread_url}': {e}"
            )));
        }
    }

    Ok(SmokeArgs {
        thread_url,
        profile_dir: profile_dir.unwrap_or_else(|| defaults.profile_dir.clone()),
        target: target.unwrap_or_else(|| defaults.target.clone()),
    })
}

/// Create the seed file's directory and overwrite it with the single URL.
pub fn write_seed_file(seed_file: &Path, thread_url: &str) -> Result<()> {
    if let Some(parent) = seed_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| FbCorpusError::io(parent, e))?;
    }
    std::fs::write(seed_file, format!("{thread_url}\n"))
        .map_err(|e| FbCorpusError::io(seed_file, e))
}

/// Resolve the four stage invocations for a smoke run.
pub fn build_plan(args: &SmokeArgs, config: &AppConfig, runtime: &Runtime) -> SmokePlan {
    let paths = &config.paths;
    let scripts = &config.scripts;
    let seed_file = paths.seed_path();
    let observations = paths.observations_path();

    let stage = |kind: StageKind, script: &str, args: Vec<String>| {
        let mut argv = vec![runtime.script(script).to_string_lossy().into_owned()];
        argv.extend(args);
        StageSpec {
            kind,
            program: runtime.program.clone(),
            args: argv,
            env: runtime.env.clone(),
            env_remove: runtime.env_remove.clone(),
        }
    };

    let stages = vec![
        stage(
            StageKind::Extract,
            &scripts.extract,
            vec![
                "--threads-file".into(),
                seed_file.to_string_lossy().into_owned(),
                "--out-file".into(),
                observations.to_string_lossy().into_owned(),
                "--target".into(),
                args.target.clone(),
                "--profile-dir".into(),
                args.profile_dir.clone(),
                "--headless".into(),
                HEADLESS.into(),
                "--dump-html".into(),
                DUMP_HTML.into(),
                "--resume".into(),
                RESUME.into(),
                "--only-one".into(),
                ONLY_ONE.into(),
            ],
        ),
        stage(
            StageKind::Slice,
            &scripts.slice,
            vec![
                "--observations".into(),
                observations.to_string_lossy().into_owned(),
            ],
        ),
        stage(StageKind::BuildCorpus, &scripts.build_corpus, Vec::new()),
        stage(StageKind::CorpusQa, &scripts.corpus_qa, Vec::new()),
    ];

    SmokePlan {
        out_dir: paths.out_dir(),
        seed_file,
        corpus_file: paths.corpus_path(),
        stages,
    }
}

/// Run the smoke pipeline.
///
/// Stages run strictly in order. The first non-zero exit aborts the run
/// with [`FbCorpusError::StageFailed`]; nothing after it is started and
/// nothing already written is cleaned up.
#[instrument(skip_all, fields(url = %args.thread_url, target = %args.target))]
pub async fn run_smoke<R: StageRunner>(
    plan: &SmokePlan,
    args: &SmokeArgs,
    runner: &R,
    progress: &dyn ProgressReporter,
) -> Result<SmokeReport> {
    let start = Instant::now();
    let started_at = Utc::now();
    let run_id = RunId::new();

    info!(%run_id, stages = plan.stages.len(), "starting smoke run");

    progress.phase("Writing seed file");
    std::fs::create_dir_all(&plan.out_dir).map_err(|e| FbCorpusError::io(&plan.out_dir, e))?;
    write_seed_file(&plan.seed_file, &args.thread_url)?;
    info!(seed = %plan.seed_file.display(), "seed file written");

    let total = plan.stages.len();
    let mut outcomes = Vec::with_capacity(total);

    for (i, stage) in plan.stages.iter().enumerate() {
        progress.stage_started(stage, i + 1, total);
        info!(stage = %stage.kind, command = %stage.command_line(), "running stage");

        let stage_start = Instant::now();
        let code = runner.run(stage).await?;
        let elapsed = stage_start.elapsed();

        if code != 0 {
            error!(stage = %stage.kind, code, "stage failed, aborting run");
            return Err(FbCorpusError::StageFailed {
                stage: stage.kind.to_string(),
                code,
            });
        }

        info!(stage = %stage.kind, elapsed_ms = elapsed.as_millis() as u64, "stage finished");
        let outcome = StageOutcome {
            kind: stage.kind,
            exit_code: code,
            elapsed,
        };
        progress.stage_finished(&outcome);
        outcomes.push(outcome);
    }

    progress.phase("Counting corpus rows");
    let corpus_rows = summary::count_corpus_rows(&plan.corpus_file)?;

    let report = SmokeReport {
        run_id,
        started_at,
        stages: outcomes,
        corpus_rows,
        elapsed: start.elapsed(),
    };
    info!(corpus_rows, elapsed_ms = report.elapsed.as_millis() as u64, "smoke run complete");
    progress.done(&report);

    Ok(report)
}
