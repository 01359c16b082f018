//! Post-run checks on what the extraction stage left behind.
//!
//! - [`verify_hashes`] fingerprints the debug dumps of the newest thread.
//! - [`inspect_observations`] reports the shape of the first observation records.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use fbcorpus_shared::{FbCorpusError, Result};

/// Dump files the extraction stage writes per thread.
pub const THREAD_ARTIFACTS: [&str; 4] = [
    "start.html",
    "after_expand.html",
    "start.png",
    "after_expand.png",
];

/// Hex characters of the SHA-256 digest kept in reports.
const SHORT_HASH_LEN: usize = 16;

// ---------------------------------------------------------------------------
// verify_hashes
// ---------------------------------------------------------------------------

/// Fingerprint of one dump file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactHash {
    pub name: String,
    /// `None` when the file is missing.
    pub digest: Option<ArtifactDigest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactDigest {
    pub short_hash: String,
    pub size: u64,
}

/// Hashes for the newest thread directory.
#[derive(Debug, Clone, Serialize)]
pub struct HashReport {
    pub thread_dir: PathBuf,
    pub artifacts: Vec<ArtifactHash>,
}

impl std::fmt::Display for ArtifactHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.digest {
            Some(d) => write!(f, "{:15} hash={} size={}", self.name, d.short_hash, d.size),
            None => write!(f, "{} MISSING", self.name),
        }
    }
}

/// Hash the dump files of the most recently modified `run_*/thread_*` dir.
pub fn verify_hashes(debug_root: &Path) -> Result<HashReport> {
    if !debug_root.is_dir() {
        return Err(FbCorpusError::validation(format!(
            "directory not found: {}",
            debug_root.display()
        )));
    }

    let thread_dir = latest_thread_dir(debug_root)?.ok_or_else(|| {
        FbCorpusError::validation(format!("no thread dirs found under {}", debug_root.display()))
    })?;
    debug!(thread_dir = %thread_dir.display(), "selected latest thread dir");

    let artifacts = THREAD_ARTIFACTS
        .iter()
        .map(|name| {
            let path = thread_dir.join(name);
            let digest = match std::fs::read(&path) {
                Ok(bytes) => Some(ArtifactDigest {
                    short_hash: short_sha256(&bytes),
                    size: bytes.len() as u64,
                }),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => return Err(FbCorpusError::io(&path, e)),
            };
            Ok(ArtifactHash {
                name: (*name).to_string(),
                digest,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(HashReport {
        thread_dir,
        artifacts,
    })
}

fn latest_thread_dir(debug_root: &Path) -> Result<Option<PathBuf>> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;

    for run in prefixed_dirs(debug_root, "run_")? {
        for thread in prefixed_dirs(&run, "thread_")? {
            let modified = std::fs::metadata(&thread)
                .and_then(|m| m.modified())
                .map_err(|e| FbCorpusError::io(&thread, e))?;
            if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
                newest = Some((modified, thread));
            }
        }
    }

    Ok(newest.map(|(_, path)| path))
}

fn prefixed_dirs(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| FbCorpusError::io(dir, e))?;
    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| FbCorpusError::io(dir, e))?;
        let path = entry.path();
        let matches = entry.file_name().to_string_lossy().starts_with(prefix);
        if matches && path.is_dir() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

fn short_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(SHORT_HASH_LEN);
    hex
}

// ---------------------------------------------------------------------------
// inspect_observations
// ---------------------------------------------------------------------------

/// Shape of the `evidence` field of an observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvidenceShape {
    Object {
        keys: Vec<String>,
        debug_dir: Option<serde_json::Value>,
    },
    Other { json_type: String },
}

/// Shape of one observation line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordShape {
    Parsed {
        index: usize,
        keys: Vec<String>,
        evidence: EvidenceShape,
    },
    Invalid {
        index: usize,
        error: String,
    },
}

/// Describe the first `limit` records of an observations file.
///
/// Lines that fail to parse are reported, not fatal.
pub fn inspect_observations(path: &Path, limit: usize) -> Result<Vec<RecordShape>> {
    let content = std::fs::read_to_string(path).map_err(|e| FbCorpusError::io(path, e))?;

    Ok(content
        .lines()
        .take(limit)
        .enumerate()
        .map(|(index, line)| match serde_json::from_str::<serde_json::Value>(line) {
            Ok(value) => describe_record(index, &value),
            Err(e) => RecordShape::Invalid {
                index,
                error: e.to_string(),
            },
        })
        .collect())
}

fn describe_record(index: usize, value: &serde_json::Value) -> RecordShape {
    let Some(obj) = value.as_object() else {
        return RecordShape::Invalid {
            index,
            error: format!("expected a JSON object, got {}", json_type(value)),
        };
    };

    let mut keys: Vec<String> = obj.keys().cloned().collect();
    keys.sort();

    // Absent evidence is treated as an empty object.
    let evidence = match obj.get("evidence") {
        None => EvidenceShape::Object {
            keys: Vec::new(),
            debug_dir: None,
        },
        Some(serde_json::Value::Object(ev)) => {
            let mut ev_keys: Vec<String> = ev.keys().cloned().collect();
            ev_keys.sort();
            EvidenceShape::Object {
                keys: ev_keys,
                debug_dir: ev.get("debug_dir").cloned(),
            }
        }
        Some(other) => EvidenceShape::Other {
            json_type: json_type(other).to_string(),
        },
    };

    RecordShape::Parsed {
        index,
        keys,
        evidence,
    }
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
