//! Row-count summary of the corpus file.

use std::path::Path;

use fbcorpus_shared::{FbCorpusError, Result};

/// Label printed in front of the corpus row count.
pub const SUMMARY_LABEL: &str = "phase4_corpus_rows";

/// Count non-blank lines in the corpus file. A missing file counts as 0.
pub fn count_corpus_rows(path: &Path) -> Result<usize> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "corpus file absent, counting 0 rows");
            return Ok(0);
        }
        Err(e) => return Err(FbCorpusError::io(path, e)),
    };

    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .count())
}

/// The final line printed after a successful run.
pub fn format_summary(rows: usize) -> String {
    format!("[OK] {SUMMARY_LABEL}: {rows}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_file(contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("fbc_rows_{}.jsonl", uuid::Uuid::now_v7()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_counts_zero() {
        let path = std::env::temp_dir().join(format!("fbc_absent_{}.jsonl", uuid::Uuid::now_v7()));
        assert_eq!(count_corpus_rows(&path).unwrap(), 0);
    }

    #[test]
    fn blank_and_trailing_lines_are_skipped() {
        let path = temp_file(b"{\"a\":1}\n\n{\"a\":2}\n   \n{\"a\":3}\r\n\n\n");
        assert_eq!(count_corpus_rows(&path).unwrap(), 3);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn last_line_without_newline_counts() {
        let path = temp_file(b"{\"a\":1}\n{\"a\":2}");
        assert_eq!(count_corpus_rows(&path).unwrap(), 2);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn empty_file_and_invalid_utf8() {
        let empty = temp_file(b"");
        assert_eq!(count_corpus_rows(&empty).unwrap(), 0);
        std::fs::remove_file(&empty).ok();

        let binary = temp_file(b"\xff\xfe row\n\n");
        assert_eq!(count_corpus_rows(&binary).unwrap(), 1);
        std::fs::remove_file(&binary).ok();
    }

    #[test]
    fn directory_is_an_error() {
        let dir = std::env::temp_dir().join(format!("fbc_dir_{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        assert!(count_corpus_rows(&dir).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn summary_line() {
        assert_eq!(format_summary(0), "[OK] phase4_corpus_rows: 0");
        assert_eq!(format_summary(42), "[OK] phase4_corpus_rows: 42");
    }
}
