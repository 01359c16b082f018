//! Core domain types for smoke runs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one driver run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SmokeArgs
// ---------------------------------------------------------------------------

/// The three resolved positional inputs of a smoke run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmokeArgs {
    /// Thread URL written to the seed file.
    pub thread_url: String,
    /// Browser profile directory handed to the extraction stage.
    pub profile_dir: String,
    /// Person whose observations are extracted.
    pub target: String,
}

// ---------------------------------------------------------------------------
// StageKind
// ---------------------------------------------------------------------------

/// The external stages, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Extract,
    Slice,
    BuildCorpus,
    CorpusQa,
}

impl StageKind {
    /// All stages in execution order.
    pub const ORDER: [StageKind; 4] = [
        StageKind::Extract,
        StageKind::Slice,
        StageKind::BuildCorpus,
        StageKind::CorpusQa,
    ];

    /// Stable name used in logs and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Slice => "slice",
            Self::BuildCorpus => "build_corpus",
            Self::CorpusQa => "corpus_qa",
        }
    }

    /// Human-readable label for progress output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Extract => "Extracting observations",
            Self::Slice => "Slicing blocks",
            Self::BuildCorpus => "Building corpus",
            Self::CorpusQa => "Running corpus QA",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
