//! Errors raised while saving or loading trajectories and reports.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IoError {
    /// A filesystem call on `path` failed.
    #[error("{action} {}: {source}", .path.display())]
    File {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no file at {}", .0.display())]
    Missing(PathBuf),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// An rkyv archive could not be written, checked or read back.
    #[error("rkyv {stage} failed: {detail}")]
    Archive { stage: &'static str, detail: String },

    #[error("invalid trajectory: {0}")]
    InvalidTrajectory(String),
}

pub type Result<T> = std::result::Result<T, IoError>;

impl IoError {
    pub(crate) fn file(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::File {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn archive<E: std::fmt::Debug>(stage: &'static str, err: E) -> Self {
        Self::Archive {
            stage,
            detail: format!("{err:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_error_names_path() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = IoError::file("writing", Path::new("runs/episode.json.gz"), source);
        let msg = err.to_string();
        assert!(msg.starts_with("writing runs/episode.json.gz"));
        assert!(msg.contains("denied"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_archive_error_display() {
        let err = IoError::archive("validation", "bad root");
        assert_eq!(err.to_string(), "rkyv validation failed: \"bad root\"");
    }

    #[test]
    fn test_json_error_converts() {
        let parse = serde_json::from_str::<Vec<f64>>("[1.0,").unwrap_err();
        let err: IoError = parse.into();
        assert!(matches!(err, IoError::Json(_)));
    }
}
