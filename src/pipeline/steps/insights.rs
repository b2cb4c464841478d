use tracing::info;

use super::StageOutcome;
use crate::config::PipelineConfig;
use crate::constants::{INSIGHTS_FILE, STAGE_INSIGHTS};
use crate::error::Result;
use crate::pipeline::processing::insights::build_insights;
use crate::pipeline::report::write_json;

pub fn run(config: &PipelineConfig) -> Result<StageOutcome> {
    let dir = &config.paths.curated_dir;
    let insights = build_insights(dir, config.output_format)?;
    let path = dir.join(INSIGHTS_FILE);
    write_json(&path, &insights)?;
    info!(path = %path.display(), "Wrote dashboard insights");

    let mut outcome = StageOutcome::new(STAGE_INSIGHTS);
    outcome.files_written.push(path);
    Ok(outcome)
}
