//! Runs the stages in order against one immutable configuration.

use serde::Serialize;
use std::time::Instant;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::constants::{STAGE_CURATE, STAGE_GRAPH, STAGE_INSIGHTS, STAGE_PROFILE, STAGE_TRANSFORM};
use crate::error::{EtlError, Result};
use crate::observability::metrics;
use crate::pipeline::steps::{self, StageOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Profile,
    Transform,
    Curate,
    ExportGraph,
    Insights,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Profile,
        Stage::Transform,
        Stage::Curate,
        Stage::ExportGraph,
        Stage::Insights,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Profile => STAGE_PROFILE,
            Stage::Transform => STAGE_TRANSFORM,
            Stage::Curate => STAGE_CURATE,
            Stage::ExportGraph => STAGE_GRAPH,
            Stage::Insights => STAGE_INSIGHTS,
        }
    }
}

/// Stages the `run` command may leave out.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub skip_profile: bool,
    pub skip_graph: bool,
    pub skip_insights: bool,
}

impl RunOptions {
    pub fn skips(&self, stage: Stage) -> bool {
        match stage {
            Stage::Profile => self.skip_profile,
            Stage::ExportGraph => self.skip_graph,
            Stage::Insights => self.skip_insights,
            Stage::Transform | Stage::Curate => false,
        }
    }
}

/// Result of a complete pipeline run
#[derive(Debug, Serialize)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub completed: Vec<StageOutcome>,
    pub skipped: Vec<&'static str>,
}

pub struct Orchestrator {
    config: PipelineConfig,
    run_id: Uuid,
}

impl Orchestrator {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Runs one stage. A failure is logged with its full chain and returned
    /// wrapped with the stage name.
    pub fn run_stage(&self, stage: Stage) -> Result<StageOutcome> {
        let span = info_span!("stage", stage = stage.name(), run_id = %self.run_id);
        let _enter = span.enter();

        info!("Stage started");
        let started = Instant::now();
        let result = match stage {
            Stage::Profile => steps::profile::run(&self.config, self.run_id),
            Stage::Transform => steps::transform::run(&self.config, self.run_id),
            Stage::Curate => steps::curate::run(&self.config, self.run_id),
            Stage::ExportGraph => steps::graph::run(&self.config, self.run_id),
            Stage::Insights => steps::insights::run(&self.config),
        };

        match result {
            Ok(outcome) => {
                let elapsed = started.elapsed().as_secs_f64();
                metrics::stages::completed(stage.name(), elapsed);
                info!(
                    files = outcome.files_written.len(),
                    rows = outcome.rows_written,
                    duration_secs = elapsed,
                    "Stage complete"
                );
                Ok(outcome)
            }
            Err(e) => {
                metrics::stages::failed(stage.name());
                error!(error = ?e, "Stage failed");
                Err(EtlError::StageFailed {
                    stage: stage.name().to_string(),
                    source: Box::new(e),
                })
            }
        }
    }

    /// Runs every stage in order, stopping at the first failure.
    /// Outputs of earlier stages stay on disk.
    pub fn run(&self, options: &RunOptions) -> Result<PipelineRun> {
        self.config.paths.ensure_output_dirs()?;
        info!(
            run_id = %self.run_id,
            format = %self.config.output_format,
            min_rating_count = self.config.params.min_rating_count,
            "Pipeline run started"
        );

        let mut run = PipelineRun {
            run_id: self.run_id,
            completed: Vec::new(),
            skipped: Vec::new(),
        };
        for stage in Stage::ALL {
            if options.skips(stage) {
                warn!(stage = stage.name(), "Stage skipped");
                metrics::stages::skipped(stage.name());
                run.skipped.push(stage.name());
                continue;
            }
            run.completed.push(self.run_stage(stage)?);
        }

        info!(stages = run.completed.len(), "Pipeline run complete");
        Ok(run)
    }
}
