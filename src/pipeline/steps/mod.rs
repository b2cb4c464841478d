//! One module per stage: load inputs from disk, run the stage, write outputs.

pub mod curate;
pub mod graph;
pub mod insights;
pub mod profile;
pub mod transform;

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::OutputFormat;
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::storage::manifest::Manifest;
use crate::pipeline::storage::{write_table, Table};

/// What a stage left on disk.
#[derive(Debug, Clone, Serialize)]
pub struct StageOutcome {
    pub stage: &'static str,
    pub files_written: Vec<PathBuf>,
    pub rows_written: usize,
}

impl StageOutcome {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            files_written: Vec::new(),
            rows_written: 0,
        }
    }
}

/// Writes each table into `dir` and records it in the directory manifest.
pub(crate) fn write_tables(
    tables: &[Table],
    dir: &Path,
    format: OutputFormat,
    outcome: &mut StageOutcome,
) -> Result<Manifest> {
    let mut manifest = Manifest::default();
    for table in tables {
        let path = write_table(table, dir, format)?;
        manifest.record(&table.name, &path, table.len())?;
        metrics::tables::rows_written(&table.name, table.len());
        outcome.rows_written += table.len();
        outcome.files_written.push(path);
    }
    outcome.files_written.push(manifest.write(dir)?);
    Ok(manifest)
}
