use uuid::Uuid;

use super::StageOutcome;
use crate::config::PipelineConfig;
use crate::constants::{REPORT_RAW_PROFILE, STAGE_PROFILE};
use crate::error::Result;
use crate::pipeline::processing::profile::profile;
use crate::pipeline::report::write_report;

pub fn run(config: &PipelineConfig, run_id: Uuid) -> Result<StageOutcome> {
    let report = profile(config)?;
    let (json, md) = write_report(
        &config.paths.docs_dir,
        REPORT_RAW_PROFILE,
        run_id,
        &report,
        &report.to_markdown(),
    )?;

    let mut outcome = StageOutcome::new(STAGE_PROFILE);
    outcome.files_written.extend([json, md]);
    Ok(outcome)
}
