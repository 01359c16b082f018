//! External stage invocations and the runner that executes them.

use std::ffi::OsString;
use std::future::Future;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tracing::{debug, instrument};

use fbcorpus_shared::{FbCorpusError, Result, StageKind};

/// One fully-resolved external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    pub kind: StageKind,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: Vec<(String, OsString)>,
    pub env_remove: Vec<String>,
}

impl StageSpec {
    /// Shell-like rendering of the command for logs and dry runs.
    pub fn command_line(&self) -> String {
        let mut parts = vec![quote(&self.program.to_string_lossy())];
        parts.extend(self.args.iter().map(|a| quote(a)));
        parts.join(" ")
    }
}

fn quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Executes a stage and reports its exit code.
///
/// A non-zero code is a normal return value here; deciding to abort is the
/// pipeline's job. `Err` is reserved for failing to run the stage at all.
pub trait StageRunner: Send + Sync {
    fn run(&self, stage: &StageSpec) -> impl Future<Output = Result<i32>> + Send;
}

/// Runs stages as child processes with inherited stdio.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl StageRunner for ProcessRunner {
    #[instrument(skip_all, fields(stage = %stage.kind))]
    async fn run(&self, stage: &StageSpec) -> Result<i32> {
        debug!(command = %stage.command_line(), "spawning stage");

        let mut cmd = Command::new(&stage.program);
        cmd.args(&stage.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        for key in &stage.env_remove {
            cmd.env_remove(key);
        }
        for (key, value) in &stage.env {
            cmd.env(key, value);
        }

        let status = cmd.status().await.map_err(|source| FbCorpusError::Spawn {
            program: stage.program.to_string_lossy().into_owned(),
            source,
        })?;

        Ok(exit_code(status))
    }
}

/// Exit code of a finished child, using the shell's `128 + signal`
/// convention for signal-terminated processes.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
