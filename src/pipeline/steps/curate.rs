use std::fs;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

use super::{write_tables, StageOutcome};
use crate::config::{OutputFormat, PipelineConfig};
use crate::constants::{RATINGS_RECONCILIATION_FILE, REPORT_CURATE_QUALITY, STAGE_CURATE};
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::processing::curate::{curate, CurateInputs};
use crate::pipeline::processing::normalize::ratings::RatingsReconciliation;
use crate::pipeline::report::write_report;
use crate::pipeline::storage::{read_records, Table};

pub fn load_inputs(dir: &Path, format: OutputFormat) -> Result<CurateInputs> {
    Ok(CurateInputs {
        movies: read_records(dir, format)?,
        movie_genres: read_records(dir, format)?,
        movie_companies: read_records(dir, format)?,
        movie_keywords: read_records(dir, format)?,
        cast: read_records(dir, format)?,
        ratings: read_records(dir, format)?,
    })
}

/// The transform stage's reconciliation log, if it is there to read.
pub fn load_reconciliation(dir: &Path) -> Result<Option<RatingsReconciliation>> {
    let path = dir.join(RATINGS_RECONCILIATION_FILE);
    if !path.exists() {
        warn!(path = %path.display(), "Ratings reconciliation log not found");
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

pub fn run(config: &PipelineConfig, run_id: Uuid) -> Result<StageOutcome> {
    let processed = &config.paths.processed_dir;
    let inputs = load_inputs(processed, config.output_format)?;
    let reconciliation = load_reconciliation(processed)?;
    let curation = curate(&inputs, &config.params, reconciliation);

    let tables = [
        Table::from_records(&curation.overview),
        Table::from_records(&curation.genre_stats),
        Table::from_records(&curation.year_trends),
    ];
    let mut outcome = StageOutcome::new(STAGE_CURATE);
    write_tables(&tables, &config.paths.curated_dir, config.output_format, &mut outcome)?;

    let (json, md) = write_report(
        &config.paths.docs_dir,
        REPORT_CURATE_QUALITY,
        run_id,
        &curation.quality,
        &curation.quality.to_markdown(),
    )?;
    outcome.files_written.extend([json, md]);

    metrics::curate::rating_fallbacks(curation.quality.overview.rating_fallback);
    info!(rows = outcome.rows_written, "Curated tables written");
    Ok(outcome)
}
