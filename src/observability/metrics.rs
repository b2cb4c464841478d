//! Metrics for the movie ETL pipeline.
//!
//! Stages record through the phase modules below. The binary installs a
//! Prometheus recorder with [`init`] and writes the rendered snapshot next to
//! the reports at the end of a run. Without a recorder every call is a no-op,
//! which is what the tests rely on.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::constants::METRICS_SNAPSHOT_FILE;
use crate::error::Result;

/// Every metric name the pipeline emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Stage lifecycle
    StageRuns,
    StageFailures,
    StageSkips,
    StageDuration,

    // Tables
    TableRows,

    // Normalize metrics
    NormalizeRowsDropped,
    NormalizeListFields,

    // Ratings mapping metrics
    RatingsMatchedMovies,
    RatingsRowsUnmapped,
    RatingsMappingDuplicates,

    // Curate metrics
    CurateRatingFallbacks,

    // Graph metrics
    GraphNodes,
    GraphRelationships,
    GraphRelationshipsDropped,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::StageRuns => "movie_etl_stage_runs_total",
            MetricName::StageFailures => "movie_etl_stage_failures_total",
            MetricName::StageSkips => "movie_etl_stage_skips_total",
            MetricName::StageDuration => "movie_etl_stage_duration_seconds",

            MetricName::TableRows => "movie_etl_table_rows",

            MetricName::NormalizeRowsDropped => "movie_etl_normalize_rows_dropped_total",
            MetricName::NormalizeListFields => "movie_etl_normalize_list_fields_total",

            MetricName::RatingsMatchedMovies => "movie_etl_ratings_matched_movies",
            MetricName::RatingsRowsUnmapped => "movie_etl_ratings_rows_unmapped",
            MetricName::RatingsMappingDuplicates => "movie_etl_ratings_mapping_duplicate_keys",

            MetricName::CurateRatingFallbacks => "movie_etl_curate_rating_fallbacks",

            MetricName::GraphNodes => "movie_etl_graph_nodes",
            MetricName::GraphRelationships => "movie_etl_graph_relationships",
            MetricName::GraphRelationshipsDropped => "movie_etl_graph_relationships_dropped",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            StageRuns,
            StageFailures,
            StageSkips,
            StageDuration,
            TableRows,
            NormalizeRowsDropped,
            NormalizeListFields,
            RatingsMatchedMovies,
            RatingsRowsUnmapped,
            RatingsMappingDuplicates,
            CurateRatingFallbacks,
            GraphNodes,
            GraphRelationships,
            GraphRelationshipsDropped,
        ]
        .into_iter()
    }

    /// (phase, description)
    pub fn metadata(&self) -> (&'static str, &'static str) {
        match self {
            MetricName::StageRuns => ("pipeline", "Stage runs completed"),
            MetricName::StageFailures => ("pipeline", "Stage runs that aborted the pipeline"),
            MetricName::StageSkips => ("pipeline", "Stages skipped by flag"),
            MetricName::StageDuration => ("pipeline", "Wall time of the last stage run"),
            MetricName::TableRows => ("storage", "Rows written per table"),
            MetricName::NormalizeRowsDropped => ("normalize", "Raw rows dropped, by reason"),
            MetricName::NormalizeListFields => ("normalize", "List fields seen, by parse outcome"),
            MetricName::RatingsMatchedMovies => ("ratings", "Catalog movies with at least one mapped rating"),
            MetricName::RatingsRowsUnmapped => ("ratings", "Ratings rows whose key had no catalog mapping"),
            MetricName::RatingsMappingDuplicates => ("ratings", "Ratings keys mapped more than once"),
            MetricName::CurateRatingFallbacks => ("curate", "Movies whose chosen rating is the vote average"),
            MetricName::GraphNodes => ("graph", "Nodes exported, by label"),
            MetricName::GraphRelationships => ("graph", "Relationships exported, by type"),
            MetricName::GraphRelationshipsDropped => ("graph", "Relationships dropped for a missing endpoint"),
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static METRICS_HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Installs the global Prometheus recorder. Calling it twice keeps the first.
pub fn init() -> Result<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| crate::error::EtlError::Config(format!("Failed to install Prometheus recorder: {e}")))?;

    for name in MetricName::all_metrics() {
        let (phase, help) = name.metadata();
        let help = format!("[{phase}] {help}");
        if name.as_str().ends_with("_total") {
            ::metrics::describe_counter!(name.as_str(), help);
        } else {
            ::metrics::describe_gauge!(name.as_str(), help);
        }
    }

    let _ = METRICS_HANDLE.set(handle);
    info!("Metrics recorder installed");
    Ok(())
}

/// Prometheus text exposition of everything recorded so far.
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

/// Writes the rendered snapshot into `docs_dir`, or nothing without a recorder.
pub fn write_snapshot(docs_dir: &Path) -> Result<Option<PathBuf>> {
    let Some(text) = render() else {
        warn!("No metrics recorder installed, skipping snapshot");
        return Ok(None);
    };
    std::fs::create_dir_all(docs_dir)?;
    let path = docs_dir.join(METRICS_SNAPSHOT_FILE);
    std::fs::write(&path, text)?;
    info!(path = %path.display(), "Wrote metrics snapshot");
    Ok(Some(path))
}

// ============================================================================
// Stage lifecycle
// ============================================================================

pub mod stages {
    use super::MetricName;

    pub fn completed(stage: &'static str, duration_secs: f64) {
        ::metrics::counter!(MetricName::StageRuns.as_str(), "stage" => stage).increment(1);
        ::metrics::gauge!(MetricName::StageDuration.as_str(), "stage" => stage).set(duration_secs);
    }

    pub fn failed(stage: &'static str) {
        ::metrics::counter!(MetricName::StageFailures.as_str(), "stage" => stage).increment(1);
    }

    pub fn skipped(stage: &'static str) {
        ::metrics::counter!(MetricName::StageSkips.as_str(), "stage" => stage).increment(1);
    }
}

// ============================================================================
// Tables
// ============================================================================

pub mod tables {
    use super::MetricName;

    pub fn rows_written(table: &str, rows: usize) {
        ::metrics::gauge!(MetricName::TableRows.as_str(), "table" => table.to_string()).set(rows as f64);
    }
}

// ============================================================================
// Normalize
// ============================================================================

pub mod normalize {
    use super::MetricName;
    use crate::pipeline::processing::normalize::list_field::ListParseStats;
    use crate::pipeline::processing::normalize::quality::DroppedRows;

    pub fn rows_dropped(dropped: &DroppedRows) {
        let reasons = [
            ("movies_invalid_id", dropped.movies_invalid_id),
            ("movies_duplicate_id", dropped.movies_duplicate_id),
            ("credits_orphan", dropped.credits.orphan),
            ("credits_duplicate", dropped.credits.duplicate),
            ("keywords_orphan", dropped.keywords.orphan),
            ("keywords_duplicate", dropped.keywords.duplicate),
            ("cast_beyond_limit", dropped.cast_beyond_limit),
        ];
        for (reason, count) in reasons {
            ::metrics::counter!(MetricName::NormalizeRowsDropped.as_str(), "reason" => reason)
                .increment(count as u64);
        }
    }

    pub fn list_fields(field: &str, stats: &ListParseStats) {
        let outcomes = [
            ("missing", stats.missing),
            ("json", stats.json),
            ("literal", stats.literal),
            ("quote_swapped", stats.quote_swapped),
            ("not_a_list", stats.not_a_list),
            ("unparseable", stats.unparseable),
        ];
        for (outcome, count) in outcomes {
            ::metrics::counter!(
                MetricName::NormalizeListFields.as_str(),
                "field" => field.to_string(),
                "outcome" => outcome
            )
            .increment(count as u64);
        }
    }
}

// ============================================================================
// Ratings mapping
// ============================================================================

pub mod ratings {
    use super::MetricName;
    use crate::pipeline::processing::normalize::ratings::RatingsReconciliation;

    pub fn reconciliation(log: &RatingsReconciliation) {
        ::metrics::gauge!(MetricName::RatingsMatchedMovies.as_str()).set(log.matched_movies as f64);
        ::metrics::gauge!(MetricName::RatingsRowsUnmapped.as_str()).set(log.ratings_rows_unmapped as f64);
        ::metrics::gauge!(MetricName::RatingsMappingDuplicates.as_str())
            .set(log.mapping_duplicate_keys as f64);
    }
}

// ============================================================================
// Curate
// ============================================================================

pub mod curate {
    use super::MetricName;

    pub fn rating_fallbacks(count: usize) {
        ::metrics::gauge!(MetricName::CurateRatingFallbacks.as_str()).set(count as f64);
    }
}

// ============================================================================
// Graph export
// ============================================================================

pub mod graph {
    use super::MetricName;
    use crate::pipeline::processing::graph_export::GraphExportSummary;

    pub fn exported(summary: &GraphExportSummary) {
        for n in &summary.nodes {
            ::metrics::gauge!(MetricName::GraphNodes.as_str(), "label" => n.label.clone()).set(n.count as f64);
        }
        for r in &summary.relationships {
            ::metrics::gauge!(MetricName::GraphRelationships.as_str(), "type" => r.label.clone())
                .set(r.count as f64);
        }
        for d in &summary.dropped_relationships {
            ::metrics::gauge!(MetricName::GraphRelationshipsDropped.as_str(), "type" => d.label.clone())
                .set(d.count as f64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_names_are_unique_and_prefixed() {
        let names: Vec<&str> = MetricName::all_metrics().map(|m| m.as_str()).collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(unique.len(), names.len());
        assert!(names.iter().all(|n| n.starts_with("movie_etl_")));
    }

    #[test]
    fn test_recording_without_recorder_is_a_noop() {
        stages::completed("profile_raw", 0.5);
        tables::rows_written("dim_movie", 3);
        curate::rating_fallbacks(2);
    }
}
