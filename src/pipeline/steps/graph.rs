use uuid::Uuid;

use super::StageOutcome;
use crate::config::PipelineConfig;
use crate::constants::{REPORT_GRAPH_SUMMARY, STAGE_GRAPH};
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::processing::graph_export::{build_graph, GraphInputs};
use crate::pipeline::report::write_report;
use crate::pipeline::storage::read_records;

pub fn run(config: &PipelineConfig, run_id: Uuid) -> Result<StageOutcome> {
    let dir = &config.paths.processed_dir;
    let format = config.output_format;
    let inputs = GraphInputs {
        movies: read_records(dir, format)?,
        persons: read_records(dir, format)?,
        genres: read_records(dir, format)?,
        keywords: read_records(dir, format)?,
        companies: read_records(dir, format)?,
        cast: read_records(dir, format)?,
        directors: read_records(dir, format)?,
        movie_genres: read_records(dir, format)?,
        movie_keywords: read_records(dir, format)?,
        movie_companies: read_records(dir, format)?,
        ratings: read_records(dir, format)?,
    };

    let export = build_graph(&inputs);
    let mut outcome = StageOutcome::new(STAGE_GRAPH);
    outcome.files_written = export.write(&config.paths.graph_dir)?;
    outcome.rows_written = export
        .nodes
        .iter()
        .chain(&export.relationships)
        .map(|f| f.table.len())
        .sum();

    let (json, md) = write_report(
        &config.paths.docs_dir,
        REPORT_GRAPH_SUMMARY,
        run_id,
        &export.summary,
        &export.summary.to_markdown(),
    )?;
    outcome.files_written.extend([json, md]);

    metrics::graph::exported(&export.summary);
    Ok(outcome)
}
