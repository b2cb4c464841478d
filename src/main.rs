use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

use movie_etl::config::{ConfigOverrides, PipelineConfig};
use movie_etl::error::EtlError;
use movie_etl::logging;
use movie_etl::observability;
use movie_etl::pipeline::steps::StageOutcome;
use movie_etl::pipeline::{Orchestrator, RunOptions, Stage};

#[derive(Parser)]
#[command(name = "movie_etl")]
#[command(about = "Normalize the Kaggle movies export into dimensional, curated and graph-import tables")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// TOML config file (defaults to ./movie_etl.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Table format for processed and curated tables: parquet or csv
    #[arg(long, global = true)]
    format: Option<String>,
    /// Root under which data/, docs/ and logs/ live
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
    /// Ratings needed before a movie's mean rating is trusted
    #[arg(long, global = true)]
    min_rating_count: Option<u64>,
    /// Cast members kept per movie
    #[arg(long, global = true)]
    max_cast: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Profile the raw CSVs and write docs/raw_profile.{json,md}
    Profile,
    /// Build the processed dimension, bridge and fact tables
    Transform,
    /// Build the curated overview, genre and year tables
    Curate,
    /// Write node and relationship CSVs for the graph bulk importer
    ExportGraph,
    /// Write curated/insights.json from the curated tables
    Insights,
    /// Run every stage in order
    Run {
        #[arg(long)]
        skip_profile: bool,
        #[arg(long)]
        skip_graph: bool,
        #[arg(long)]
        skip_insights: bool,
    },
}

impl GlobalArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            base_dir: self.base_dir.clone(),
            output_format: self.format.clone(),
            min_rating_count: self.min_rating_count,
            max_cast_per_movie: self.max_cast,
        }
    }
}

fn print_outcome(outcome: &StageOutcome) {
    println!("✅ {}: {} files, {} rows", outcome.stage, outcome.files_written.len(), outcome.rows_written);
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Configuration is validated before anything touches the filesystem.
    let config = match PipelineConfig::load(cli.global.config.as_deref(), &cli.global.overrides()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Invalid configuration: {e}");
            return ExitCode::from(2);
        }
    };

    let _guard = logging::init_logging(&config.paths.logs_dir);
    if let Err(e) = observability::init() {
        warn!("Metrics disabled: {}", e);
    }

    let docs_dir = config.paths.docs_dir.clone();
    let orchestrator = Orchestrator::new(config);
    info!(run_id = %orchestrator.run_id(), "movie_etl starting");

    let result = match cli.command {
        Commands::Profile => orchestrator.run_stage(Stage::Profile).map(|o| vec![o]),
        Commands::Transform => orchestrator.run_stage(Stage::Transform).map(|o| vec![o]),
        Commands::Curate => orchestrator.run_stage(Stage::Curate).map(|o| vec![o]),
        Commands::ExportGraph => orchestrator.run_stage(Stage::ExportGraph).map(|o| vec![o]),
        Commands::Insights => orchestrator.run_stage(Stage::Insights).map(|o| vec![o]),
        Commands::Run {
            skip_profile,
            skip_graph,
            skip_insights,
        } => {
            let options = RunOptions {
                skip_profile,
                skip_graph,
                skip_insights,
            };
            orchestrator.run(&options).map(|run| {
                for stage in &run.skipped {
                    println!("⏭️  {stage}: skipped");
                }
                run.completed
            })
        }
    };

    if let Err(e) = observability::write_snapshot(&docs_dir) {
        warn!("Failed to write metrics snapshot: {}", e);
    }

    match result {
        Ok(outcomes) => {
            outcomes.iter().for_each(print_outcome);
            ExitCode::SUCCESS
        }
        Err(EtlError::StageFailed { stage, source }) => {
            eprintln!("❌ Pipeline aborted at {stage}: {source}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("❌ Pipeline aborted: {e}");
            ExitCode::FAILURE
        }
    }
}
