//! Corpus loading with size guard and fingerprint.

use cardio_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// The medical corpus, read once per index build.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub path: PathBuf,
    pub text: String,

    /// Hex SHA-256 of the file contents
    pub sha256: String,
}

/// Read the corpus file.
///
/// # Errors
/// - `CorpusMissing` when the file does not exist
/// - `CorpusTooLarge` when it exceeds `max_bytes`
/// - `Io` when it cannot be read as UTF-8
pub fn read_corpus(path: &Path, max_bytes: u64) -> AppResult<Corpus> {
    if !path.is_file() {
        return Err(AppError::CorpusMissing(path.to_path_buf()));
    }

    let size = std::fs::metadata(path)?.len();
    if size > max_bytes {
        return Err(AppError::CorpusTooLarge {
            size,
            limit: max_bytes,
        });
    }

    let text = std::fs::read_to_string(path)?;
    let sha256 = fingerprint(&text);

    tracing::debug!("Read corpus {:?} ({} bytes)", path, size);

    Ok(Corpus {
        path: path.to_path_buf(),
        text,
        sha256,
    })
}

/// Hex-encoded SHA-256 of the text.
pub fn fingerprint(text: &str) -> String {
    Sha256::digest(text.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_corpus() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("corpus.txt");
        std::fs::write(&path, "Le cœur.\n\nLes artères.").unwrap();

        let corpus = read_corpus(&path, 1024).unwrap();
        assert_eq!(corpus.text, "Le cœur.\n\nLes artères.");
        assert_eq!(corpus.sha256.len(), 64);
    }

    #[test]
    fn test_missing_corpus() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.txt");
        assert!(matches!(
            read_corpus(&path, 1024),
            Err(AppError::CorpusMissing(p)) if p == path
        ));
    }

    #[test]
    fn test_corpus_too_large() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("corpus.txt");
        std::fs::write(&path, "x".repeat(11)).unwrap();

        assert!(matches!(
            read_corpus(&path, 10),
            Err(AppError::CorpusTooLarge { size: 11, limit: 10 })
        ));
    }

    #[test]
    fn test_fingerprint() {
        assert_eq!(
            fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(fingerprint("a"), fingerprint("b"));
    }
}
