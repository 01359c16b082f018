//! Application configuration for fbcorpus.
//!
//! User config lives at `~/.fbcorpus/fbcorpus.toml`.
//! Positional CLI arguments override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FbCorpusError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "fbcorpus.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".fbcorpus";

// ---------------------------------------------------------------------------
// Config structs (matching fbcorpus.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Smoke-run defaults for the positional arguments.
    #[serde(default)]
    pub smoke: SmokeConfig,

    /// Output locations shared between the stages.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Interpreter selection.
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Stage script file names.
    #[serde(default)]
    pub scripts: ScriptsConfig,
}

/// `[smoke]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmokeConfig {
    /// Thread URL used when none is given on the command line.
    #[serde(default = "default_thread_url")]
    pub thread_url: String,

    /// Browser profile directory.
    #[serde(default = "default_profile_dir")]
    pub profile_dir: String,

    /// Target person name.
    #[serde(default = "default_target")]
    pub target: String,
}

impl Default for SmokeConfig {
    fn default() -> Self {
        Self {
            thread_url: default_thread_url(),
            profile_dir: default_profile_dir(),
            target: default_target(),
        }
    }
}

fn default_thread_url() -> String {
    "https://www.facebook.com/groups/1535839996641127/posts/3934719740086462/".into()
}
fn default_profile_dir() -> String {
    "fb_extract_out/playwright_profile".into()
}
fn default_target() -> String {
    "Sean Roy".into()
}

/// `[paths]` section. File names are relative to `out_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    #[serde(default = "default_seed_file")]
    pub seed_file: String,

    #[serde(default = "default_observations_file")]
    pub observations_file: String,

    #[serde(default = "default_corpus_file")]
    pub corpus_file: String,

    /// Debug dump root written by the extraction stage.
    #[serde(default = "default_debug_dir")]
    pub debug_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
            seed_file: default_seed_file(),
            observations_file: default_observations_file(),
            corpus_file: default_corpus_file(),
            debug_dir: default_debug_dir(),
        }
    }
}

fn default_out_dir() -> String {
    "fb_extract_out".into()
}
fn default_seed_file() -> String {
    "threads_smoke.txt".into()
}
fn default_observations_file() -> String {
    "observations.jsonl".into()
}
fn default_corpus_file() -> String {
    "phase4_corpus.jsonl".into()
}
fn default_debug_dir() -> String {
    "debug".into()
}

impl PathsConfig {
    pub fn out_dir(&self) -> PathBuf {
        PathBuf::from(&self.out_dir)
    }

    pub fn seed_path(&self) -> PathBuf {
        self.out_dir().join(&self.seed_file)
    }

    pub fn observations_path(&self) -> PathBuf {
        self.out_dir().join(&self.observations_file)
    }

    pub fn corpus_path(&self) -> PathBuf {
        self.out_dir().join(&self.corpus_file)
    }

    pub fn debug_path(&self) -> PathBuf {
        self.out_dir().join(&self.debug_dir)
    }
}

/// `[runtime]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Isolated environment whose interpreter runs every stage.
    #[serde(default = "default_venv_dir")]
    pub venv_dir: String,

    /// Interpreter looked up on `PATH` when the environment has none.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Directory holding the stage scripts.
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            venv_dir: default_venv_dir(),
            interpreter: default_interpreter(),
            scripts_dir: default_scripts_dir(),
        }
    }
}

fn default_venv_dir() -> String {
    ".venv".into()
}
fn default_interpreter() -> String {
    "python3".into()
}
fn default_scripts_dir() -> String {
    ".".into()
}

/// `[scripts]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptsConfig {
    #[serde(default = "default_extract_script")]
    pub extract: String,

    #[serde(default = "default_slice_script")]
    pub slice: String,

    #[serde(default = "default_build_corpus_script")]
    pub build_corpus: String,

    #[serde(default = "default_corpus_qa_script")]
    pub corpus_qa: String,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            extract: default_extract_script(),
            slice: default_slice_script(),
            build_corpus: default_build_corpus_script(),
            corpus_qa: default_corpus_qa_script(),
        }
    }
}

fn default_extract_script() -> String {
    "extract_observations.py".into()
}
fn default_slice_script() -> String {
    "phase3_slice_blocks.py".into()
}
fn default_build_corpus_script() -> String {
    "phase4_build_corpus.py".into()
}
fn default_corpus_qa_script() -> String {
    "phase5_corpus_qa.py".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.fbcorpus/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| FbCorpusError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.fbcorpus/fbcorpus.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| FbCorpusError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| FbCorpusError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| FbCorpusError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| FbCorpusError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| FbCorpusError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).expect("serialize");
        assert!(toml_str.contains("thread_url"));
        assert!(toml_str.contains("phase4_corpus.jsonl"));
        assert!(toml_str.contains("python3"));
    }

    #[test]
    fn default_paths() {
        let paths = PathsConfig::default();
        assert_eq!(
            paths.seed_path(),
            PathBuf::from("fb_extract_out").join("threads_smoke.txt")
        );
        assert_eq!(
            paths.corpus_path(),
            PathBuf::from("fb_extract_out").join("phase4_corpus.jsonl")
        );
        assert_eq!(
            paths.debug_path(),
            PathBuf::from("fb_extract_out").join("debug")
        );
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let toml_str = r#"
[smoke]
target = "Jane Doe"

[runtime]
venv_dir = "/opt/envs/fb"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.smoke.target, "Jane Doe");
        assert_eq!(config.smoke.profile_dir, "fb_extract_out/playwright_profile");
        assert_eq!(config.runtime.venv_dir, "/opt/envs/fb");
        assert_eq!(config.runtime.interpreter, "python3");
        assert_eq!(config.scripts.corpus_qa, "phase5_corpus_qa.py");
    }

    #[test]
    fn load_from_file_and_reject_garbage() {
        let dir = std::env::temp_dir().join(format!("fbc_cfg_{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();

        let good = dir.join("good.toml");
        std::fs::write(&good, "[paths]\nout_dir = \"out\"\n").unwrap();
        let config = load_config_from(&good).expect("load");
        assert_eq!(config.paths.out_dir, "out");

        let bad = dir.join("bad.toml");
        std::fs::write(&bad, "[paths\n").unwrap();
        let err = load_config_from(&bad).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));

        let missing = load_config_from(&dir.join("nope.toml")).unwrap_err();
        assert!(matches!(missing, FbCorpusError::Io { .. }));

        std::fs::remove_dir_all(&dir).ok();
    }
}
