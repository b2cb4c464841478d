//! Paired JSON + Markdown diagnostics written into the docs directory.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::error::Result;

/// Wraps a report body with the run it came from.
#[derive(Debug, Serialize)]
pub struct ReportEnvelope<'a, T: Serialize> {
    pub report: &'a str,
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub body: &'a T,
}

/// Writes `<docs_dir>/<name>.json` and `<docs_dir>/<name>.md`.
pub fn write_report<T: Serialize>(
    docs_dir: &Path,
    name: &str,
    run_id: Uuid,
    body: &T,
    markdown: &str,
) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(docs_dir)?;
    let envelope = ReportEnvelope {
        report: name,
        run_id,
        generated_at: Utc::now(),
        body,
    };
    let json_path = docs_dir.join(format!("{name}.json"));
    fs::write(&json_path, serde_json::to_string_pretty(&envelope)?)?;

    let md_path = docs_dir.join(format!("{name}.md"));
    fs::write(
        &md_path,
        format!("{markdown}\n---\nRun `{run_id}` at {}\n", envelope.generated_at.to_rfc3339()),
    )?;

    info!(report = name, path = %json_path.display(), "Wrote report");
    Ok((json_path, md_path))
}

/// Serializes `value` as pretty JSON at `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[derive(Serialize)]
    struct Counts {
        rows: usize,
    }

    #[test]
    fn test_report_pair_carries_run_id() {
        let dir = tempdir().unwrap();
        let run_id = Uuid::new_v4();
        let (json, md) = write_report(dir.path(), "demo", run_id, &Counts { rows: 3 }, "# Demo\n").unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(json).unwrap()).unwrap();
        assert_eq!(value["rows"], 3);
        assert_eq!(value["report"], "demo");
        assert_eq!(value["run_id"], run_id.to_string());
        assert!(fs::read_to_string(md).unwrap().starts_with("# Demo"));
    }
}
