//! Interpreter selection for the stage scripts.
//!
//! Mirrors what activating an isolated environment does for a child
//! process: the environment's interpreter is used, `VIRTUAL_ENV` points at
//! it, its bin directory leads `PATH`, and `PYTHONHOME` is unset.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use fbcorpus_shared::{FbCorpusError, Result, RuntimeConfig};

#[cfg(windows)]
const ENV_BIN_DIR: &str = "Scripts";
#[cfg(not(windows))]
const ENV_BIN_DIR: &str = "bin";

#[cfg(windows)]
const ENV_INTERPRETER: &str = "python.exe";
#[cfg(not(windows))]
const ENV_INTERPRETER: &str = "python";

/// Resolved interpreter plus the environment changes every stage inherits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Runtime {
    /// Program used to run each stage script.
    pub program: PathBuf,
    /// Directory the stage script names are resolved against.
    pub scripts_dir: PathBuf,
    /// Variables set on every child process.
    pub env: Vec<(String, OsString)>,
    /// Variables removed from every child process.
    pub env_remove: Vec<String>,
    /// Whether `program` came from the isolated environment.
    pub isolated: bool,
}

impl Runtime {
    /// Resolve the runtime from config, preferring the isolated environment.
    pub fn resolve(config: &RuntimeConfig) -> Result<Self> {
        let venv = PathBuf::from(&config.venv_dir);
        let bin_dir = venv.join(ENV_BIN_DIR);
        let interpreter = bin_dir.join(ENV_INTERPRETER);
        let scripts_dir = PathBuf::from(&config.scripts_dir);

        if !interpreter.is_file() {
            warn!(
                venv = %venv.display(),
                fallback = %config.interpreter,
                "isolated environment not found, using interpreter from PATH"
            );
            return Ok(Self {
                program: PathBuf::from(&config.interpreter),
                scripts_dir,
                env: Vec::new(),
                env_remove: Vec::new(),
                isolated: false,
            });
        }

        let venv_abs = std::fs::canonicalize(&venv).map_err(|e| FbCorpusError::io(&venv, e))?;
        let bin_abs = venv_abs.join(ENV_BIN_DIR);
        let path = prepend_path(&bin_abs, std::env::var_os("PATH"))?;

        info!(venv = %venv_abs.display(), "using isolated environment");

        Ok(Self {
            program: bin_abs.join(ENV_INTERPRETER),
            scripts_dir,
            env: vec![
                ("VIRTUAL_ENV".to_string(), venv_abs.into_os_string()),
                ("PATH".to_string(), path),
            ],
            env_remove: vec!["PYTHONHOME".to_string()],
            isolated: true,
        })
    }

    /// Path of a stage script inside the scripts directory.
    pub fn script(&self, name: &str) -> PathBuf {
        self.scripts_dir.join(name)
    }
}

fn prepend_path(dir: &Path, current: Option<OsString>) -> Result<OsString> {
    let mut entries = vec![dir.to_path_buf()];
    if let Some(current) = current {
        entries.extend(std::env::split_paths(&current));
    }
    std::env::join_paths(entries)
        .map_err(|e| FbCorpusError::config(format!("cannot build PATH for {}: {e}", dir.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fbc_{tag}_{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn falls_back_to_path_interpreter() {
        let dir = temp_dir("rt_fallback");
        let config = RuntimeConfig {
            venv_dir: dir.join("missing-env").to_string_lossy().into_owned(),
            interpreter: "python3".into(),
            scripts_dir: "scripts".into(),
        };

        let rt = Runtime::resolve(&config).expect("resolve");
        assert!(!rt.isolated);
        assert_eq!(rt.program, PathBuf::from("python3"));
        assert!(rt.env.is_empty());
        assert_eq!(rt.script("phase5_corpus_qa.py"), PathBuf::from("scripts/phase5_corpus_qa.py"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn prefers_environment_interpreter() {
        let dir = temp_dir("rt_venv");
        let venv = dir.join(".venv");
        std::fs::create_dir_all(venv.join(ENV_BIN_DIR)).unwrap();
        std::fs::write(venv.join(ENV_BIN_DIR).join(ENV_INTERPRETER), b"").unwrap();

        let config = RuntimeConfig {
            venv_dir: venv.to_string_lossy().into_owned(),
            ..RuntimeConfig::default()
        };

        let rt = Runtime::resolve(&config).expect("resolve");
        let venv_abs = std::fs::canonicalize(&venv).unwrap();
        assert!(rt.isolated);
        assert_eq!(rt.program, venv_abs.join(ENV_BIN_DIR).join(ENV_INTERPRETER));
        assert_eq!(rt.env_remove, vec!["PYTHONHOME".to_string()]);

        let virtual_env = rt.env.iter().find(|(k, _)| k == "VIRTUAL_ENV").unwrap();
        assert_eq!(PathBuf::from(&virtual_env.1), venv_abs);

        let path = rt.env.iter().find(|(k, _)| k == "PATH").unwrap();
        let first = std::env::split_paths(&path.1).next().unwrap();
        assert_eq!(first, venv_abs.join(ENV_BIN_DIR));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn prepend_keeps_existing_entries() {
        let joined = std::env::join_paths([PathBuf::from("/a"), PathBuf::from("/b")]).unwrap();
        let path = prepend_path(Path::new("/env/bin"), Some(joined)).unwrap();
        let entries: Vec<_> = std::env::split_paths(&path).collect();
        assert_eq!(
            entries,
            vec![PathBuf::from("/env/bin"), PathBuf::from("/a"), PathBuf::from("/b")]
        );
    }
}
