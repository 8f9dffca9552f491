//! JSON files for reports and controller parameters, gzip JSON for
//! trajectories.

use crate::error::{IoError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// SHA-256 of the compact JSON form, hex encoded.
pub fn json_digest<T: Serialize>(data: &T) -> Result<String> {
    let json = serde_json::to_vec(data)?;
    Ok(hex::encode(Sha256::digest(&json)))
}

pub fn write_json_file<T: Serialize>(data: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json).map_err(|e| IoError::file("writing", path, e))
}

pub fn read_json_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|e| IoError::file("reading", path, e))?;
    Ok(serde_json::from_str(&json)?)
}

pub fn write_json_gz<T: Serialize>(data: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| IoError::file("creating", path, e))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    serde_json::to_writer(&mut encoder, data)?;
    encoder
        .finish()
        .and_then(|mut inner| inner.flush())
        .map_err(|e| IoError::file("compressing", path, e))
}

/// Reads gzip JSON. Files that are not gzip streams are parsed as plain
/// JSON.
pub fn read_json_gz<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(IoError::Missing(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|e| IoError::file("opening", path, e))?;
    let mut decoded = Vec::new();
    match GzDecoder::new(BufReader::new(file)).read_to_end(&mut decoded) {
        Ok(_) => Ok(serde_json::from_slice(&decoded)?),
        Err(_) => read_json_file(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Params {
        label: String,
        weights: Vec<f64>,
    }

    fn params() -> Params {
        Params {
            label: "elman".to_string(),
            weights: vec![0.5, -0.25, 1.0],
        }
    }

    #[test]
    fn test_digest_is_stable() {
        let a = params();
        let mut b = params();
        b.weights[0] = 0.75;
        let da = json_digest(&a).unwrap();
        assert_eq!(da.len(), 64);
        assert_eq!(da, json_digest(&a).unwrap());
        assert_ne!(da, json_digest(&b).unwrap());
    }

    #[test]
    fn test_gz_file_and_plain_fallback() {
        let dir = tempdir().unwrap();
        let gz = dir.path().join("params.json.gz");
        write_json_gz(&params(), &gz).unwrap();
        let restored: Params = read_json_gz(&gz).unwrap();
        assert_eq!(restored, params());

        let plain = dir.path().join("params.json");
        write_json_file(&params(), &plain).unwrap();
        let restored: Params = read_json_gz(&plain).unwrap();
        assert_eq!(restored, params());
    }

    #[test]
    fn test_truncated_json_file_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, "{\"label\": \"elman\", \"weights\": [0.5,").unwrap();
        let result: Result<Params> = read_json_file(&path);
        assert!(matches!(result, Err(IoError::Json(_))));
    }

    #[test]
    fn test_missing_gz_file() {
        let dir = tempdir().unwrap();
        let result: Result<Params> = read_json_gz(dir.path().join("absent.json.gz"));
        assert!(matches!(result, Err(IoError::Missing(_))));
    }

    #[test]
    fn test_missing_plain_file_names_path() {
        let dir = tempdir().unwrap();
        let err = read_json_file::<Params>(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, IoError::File { action: "reading", .. }));
        assert!(err.to_string().contains("absent.json"));
    }
}
