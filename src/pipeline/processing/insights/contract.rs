//! Columns the dashboard reads from each curated table.
//!
//! A missing optional column is synthesized as nulls. A missing required
//! column is reported but does not fail the load.

use std::path::Path;
use tracing::warn;

use crate::config::OutputFormat;
use crate::constants::{CURATED_GENRE_STATS, CURATED_MOVIE_OVERVIEW, CURATED_YEAR_TRENDS};
use crate::error::Result;
use crate::pipeline::storage::{read_table, table_columns, table_path, ColumnKind, ColumnSpec, Table};

#[derive(Debug, Clone)]
pub struct TableContract {
    pub table: &'static str,
    pub required: Vec<ColumnSpec>,
    pub optional: Vec<ColumnSpec>,
}

fn specs(columns: &[(&str, ColumnKind)]) -> Vec<ColumnSpec> {
    columns.iter().map(|(name, kind)| ColumnSpec::new(*name, *kind)).collect()
}

pub fn overview_contract() -> TableContract {
    use ColumnKind::*;
    TableContract {
        table: CURATED_MOVIE_OVERVIEW,
        required: specs(&[
            ("movie_id", Int),
            ("title", Text),
            ("release_year", Int),
            ("budget", Float),
            ("revenue", Float),
            ("profit", Float),
            ("roi", Float),
        ]),
        optional: specs(&[
            ("avg_rating", Float),
            ("rating_count", Int),
            ("vote_average", Float),
            ("genre_list", Text),
            ("keyword_list", Text),
            ("top_companies", Text),
            ("original_language", Text),
        ]),
    }
}

pub fn genre_stats_contract() -> TableContract {
    use ColumnKind::*;
    TableContract {
        table: CURATED_GENRE_STATS,
        required: specs(&[("genre_name", Text), ("movie_count", Int), ("avg_roi", Float)]),
        optional: specs(&[("avg_rating", Float)]),
    }
}

pub fn year_trends_contract() -> TableContract {
    use ColumnKind::*;
    TableContract {
        table: CURATED_YEAR_TRENDS,
        required: specs(&[
            ("release_year", Int),
            ("movie_count", Int),
            ("avg_budget", Float),
            ("avg_revenue", Float),
        ]),
        optional: specs(&[("avg_rating", Float)]),
    }
}

/// A curated table as the dashboard sees it.
#[derive(Debug, Clone)]
pub struct ContractTable {
    pub table: Table,
    pub missing_required: Vec<String>,
}

impl TableContract {
    /// Loads the table, or `None` when the file does not exist.
    pub fn load(&self, dir: &Path, format: OutputFormat) -> Result<Option<ContractTable>> {
        if !table_path(dir, self.table, format).exists() {
            warn!(table = self.table, "Curated table not found");
            return Ok(None);
        }
        let present = table_columns(dir, self.table, format)?;
        let stored: Vec<ColumnSpec> = self
            .required
            .iter()
            .chain(&self.optional)
            .filter(|spec| present.contains(&spec.name))
            .cloned()
            .collect();

        let mut table = read_table(dir, self.table, &stored, format)?;
        let missing_required = table.ensure_columns(&self.required, &self.optional);
        if !missing_required.is_empty() {
            warn!(table = self.table, missing = ?missing_required, "Curated table breaks the column contract");
        }
        Ok(Some(ContractTable {
            table,
            missing_required,
        }))
    }
}
