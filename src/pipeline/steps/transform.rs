use tracing::info;
use uuid::Uuid;

use super::{write_tables, StageOutcome};
use crate::config::PipelineConfig;
use crate::constants::{RATINGS_RECONCILIATION_FILE, REPORT_TRANSFORM_QUALITY, STAGE_TRANSFORM};
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::processing::normalize::normalize;
use crate::pipeline::report::{write_json, write_report};
use crate::pipeline::storage::raw::load_raw_inputs;

pub fn run(config: &PipelineConfig, run_id: Uuid) -> Result<StageOutcome> {
    let inputs = load_raw_inputs(config)?;
    let result = normalize(&inputs, &config.params);

    let dir = &config.paths.processed_dir;
    let mut outcome = StageOutcome::new(STAGE_TRANSFORM);
    write_tables(&result.tables.to_tables(), dir, config.output_format, &mut outcome)?;

    let log_path = dir.join(RATINGS_RECONCILIATION_FILE);
    write_json(&log_path, &result.reconciliation)?;
    outcome.files_written.push(log_path);

    let (json, md) = write_report(
        &config.paths.docs_dir,
        REPORT_TRANSFORM_QUALITY,
        run_id,
        &result.quality,
        &result.quality.to_markdown(),
    )?;
    outcome.files_written.extend([json, md]);

    metrics::normalize::rows_dropped(&result.quality.dropped_rows);
    for (field, stats) in &result.quality.list_parsing {
        metrics::normalize::list_fields(field, stats);
    }
    metrics::ratings::reconciliation(&result.reconciliation);

    info!(
        rows = outcome.rows_written,
        matched_movies = result.reconciliation.matched_movies,
        "Processed tables written"
    );
    Ok(outcome)
}
