// Movie ETL pipeline: storage, stage logic, stage runners and reports

pub mod orchestrator;
pub mod processing;
pub mod report;
pub mod steps;
pub mod storage;

pub use orchestrator::{Orchestrator, PipelineRun, RunOptions, Stage};
