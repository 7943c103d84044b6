//! Artifact file helpers
//!
//! Stage artifacts are handed between independently scheduled stages, so a
//! reader must never observe a half-written file. Writes go to a sibling
//! `.tmp` file first and are renamed into place.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}

/// Write bytes to `target` atomically (temp file + rename)
///
/// Parent directories are created when missing.
pub fn atomic_write(target: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp = temp_path_for(target);
    std::fs::write(&temp, contents)?;

    if let Err(e) = std::fs::rename(&temp, target) {
        let _ = std::fs::remove_file(&temp);
        return Err(Error::Io(e));
    }

    debug!(path = %target.display(), bytes = contents.len(), "Atomic write complete");
    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically
pub fn save_json<T: Serialize>(value: &T, target: &Path) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    atomic_write(target, &json)?;
    info!("Saved {}", target.display());
    Ok(())
}

/// Read and deserialize a JSON file
pub fn load_json<T: DeserializeOwned>(source: &Path) -> Result<T> {
    if !source.exists() {
        return Err(Error::NotFound(format!(
            "Artifact not found: {}",
            source.display()
        )));
    }

    let content = std::fs::read(source)?;
    let value = serde_json::from_slice(&content)?;
    info!("Loaded {}", source.display());
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        vin: String,
        count: u32,
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("artifact.json");

        atomic_write(&target, b"{}").unwrap();

        assert!(target.exists());
        assert!(!dir.path().join("artifact.json.tmp").exists());
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested/deeper/report.json");

        atomic_write(&target, b"[]").unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "[]");
    }

    #[test]
    fn test_atomic_write_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.json");

        atomic_write(&target, b"old").unwrap();
        atomic_write(&target, b"new").unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
    }

    #[test]
    fn test_save_then_load_json() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("sample.json");
        let sample = Sample {
            vin: "WP0AA29936S715303".to_string(),
            count: 3,
        };

        save_json(&sample, &target).unwrap();
        let loaded: Sample = load_json(&target).unwrap();

        assert_eq!(loaded, sample);
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load_json::<Sample>(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_load_malformed_json_is_json_error() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("bad.json");
        std::fs::write(&target, "{not json").unwrap();

        let err = load_json::<Sample>(&target).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
