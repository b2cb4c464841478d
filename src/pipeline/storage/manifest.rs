use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::MANIFEST_FILE;
use crate::error::Result;

/// One written table and the digest of its bytes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestEntry {
    pub table: String,
    pub file: String,
    pub rows: usize,
    pub sha256: String,
}

/// Listing of every table a stage wrote. Contains no timestamps, so two runs
/// over the same input produce identical manifests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

impl Manifest {
    pub fn record(&mut self, table: &str, path: &Path, rows: usize) -> Result<()> {
        let file = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.entries.push(ManifestEntry {
            table: table.to_string(),
            file,
            rows,
            sha256: file_sha256(path)?,
        });
        Ok(())
    }

    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(MANIFEST_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let content = fs::read_to_string(dir.join(MANIFEST_FILE))?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn rows_for(&self, table: &str) -> Option<usize> {
        self.entries.iter().find(|e| e.table == table).map(|e| e.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_manifest_digest_tracks_file_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dim_genre.csv");
        fs::write(&path, "genre_name\nDrama\n").unwrap();

        let mut manifest = Manifest::default();
        manifest.record("dim_genre", &path, 1).unwrap();
        manifest.write(dir.path()).unwrap();

        let loaded = Manifest::load(dir.path()).unwrap();
        assert_eq!(loaded, manifest);
        assert_eq!(loaded.rows_for("dim_genre"), Some(1));
        assert_eq!(loaded.entries[0].sha256.len(), 64);

        fs::write(&path, "genre_name\nComedy\n").unwrap();
        assert_ne!(file_sha256(&path).unwrap(), loaded.entries[0].sha256);
    }
}
