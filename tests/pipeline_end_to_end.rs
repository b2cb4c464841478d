mod common;

use std::collections::HashMap;
use std::fs;
use tempfile::tempdir;

use movie_etl::config::OutputFormat;
use movie_etl::constants::*;
use movie_etl::domain::*;
use movie_etl::pipeline::processing::insights::Insights;
use movie_etl::pipeline::storage::read_records;
use movie_etl::pipeline::{Orchestrator, RunOptions};

use common::fixture_config;

#[test]
fn test_three_movie_run_produces_every_artifact() {
    let dir = tempdir().unwrap();
    let config = fixture_config(dir.path(), OutputFormat::Csv);
    let paths = config.paths.clone();

    let run = Orchestrator::new(config).run(&RunOptions::default()).unwrap();
    let stages: Vec<&str> = run.completed.iter().map(|o| o.stage).collect();
    assert_eq!(
        stages,
        vec![STAGE_PROFILE, STAGE_TRANSFORM, STAGE_CURATE, STAGE_GRAPH, STAGE_INSIGHTS]
    );

    let overview: Vec<CuratedOverview> = read_records(&paths.curated_dir, OutputFormat::Csv).unwrap();
    let by_id: HashMap<i64, &CuratedOverview> = overview.iter().map(|o| (o.movie_id.0, o)).collect();
    assert_eq!(by_id.len(), 3);

    // Zero budget: ROI is null, profit is still computed
    assert_eq!(by_id[&1].roi, None);
    assert_eq!(by_id[&1].profit, Some(100.0));
    assert_eq!(by_id[&2].roi, Some(2.0));

    // Genre round-trip
    assert_eq!(by_id[&1].genre_list.as_deref(), Some("Action, Drama"));
    let genres: Vec<MovieGenre> = read_records(&paths.processed_dir, OutputFormat::Csv).unwrap();
    assert_eq!(genres.iter().filter(|g| g.movie_id == MovieId(1)).count(), 2);

    // Ratings arrive through the links mapping, in catalog space
    assert_eq!(by_id[&1].avg_rating, Some(4.5));
    assert_eq!(by_id[&1].rating_count, Some(2));
    assert_eq!(by_id[&1].avg_rating_curated, Some(4.5));
    // Below the minimum sample: falls back to the vote average
    assert_eq!(by_id[&2].avg_rating_curated, Some(7.0));
    assert_eq!(by_id[&3].avg_rating, None);
    assert_eq!(by_id[&3].rating_count, None);

    // Overview ids are a subset of the movie dimension
    let movies: Vec<Movie> = read_records(&paths.processed_dir, OutputFormat::Csv).unwrap();
    assert!(overview.iter().all(|o| movies.iter().any(|m| m.movie_id == o.movie_id)));

    let trends: Vec<CuratedYearTrend> = read_records(&paths.curated_dir, OutputFormat::Csv).unwrap();
    let years: Vec<(i64, i64)> = trends.iter().map(|t| (t.release_year, t.movie_count)).collect();
    assert_eq!(years, vec![(1999, 1), (2001, 2)]);

    for report in [
        REPORT_RAW_PROFILE,
        REPORT_TRANSFORM_QUALITY,
        REPORT_CURATE_QUALITY,
        REPORT_GRAPH_SUMMARY,
    ] {
        assert!(paths.docs_dir.join(format!("{report}.json")).exists(), "{report}.json");
        assert!(paths.docs_dir.join(format!("{report}.md")).exists(), "{report}.md");
    }

    let args = fs::read_to_string(paths.graph_dir.join(GRAPH_IMPORT_ARGS_FILE)).unwrap();
    assert!(args.contains("--nodes=Movie=nodes_movie.csv"));
    assert!(args.contains("--relationships=ACTED_IN=rel_ACTED_IN.csv"));

    let insights: Insights =
        serde_json::from_str(&fs::read_to_string(paths.curated_dir.join(INSIGHTS_FILE)).unwrap()).unwrap();
    assert_eq!(insights.overview.kpis.movies_total, Some(3));
    assert_eq!(insights.trends.kpis.top_year_by_movies, Some(2001));
    assert_eq!(insights.roi.kpis.top_genre_by_roi.as_deref(), Some("Drama"));
    assert_eq!(insights.collab.coactor_pairs, 0);
}

#[test]
fn test_ratings_reconciliation_log_counts_unmapped_rows() {
    let dir = tempdir().unwrap();
    let config = fixture_config(dir.path(), OutputFormat::Csv);
    let paths = config.paths.clone();
    let options = RunOptions {
        skip_profile: true,
        skip_graph: true,
        skip_insights: true,
    };
    let run = Orchestrator::new(config).run(&options).unwrap();
    assert_eq!(run.skipped, vec![STAGE_PROFILE, STAGE_GRAPH, STAGE_INSIGHTS]);

    let log: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(paths.processed_dir.join(RATINGS_RECONCILIATION_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(log["matched_movies"], 2);
    assert_eq!(log["movies_without_ratings"], 1);
    assert_eq!(log["ratings_rows_unmapped"], 1);
    assert_eq!(log["ratings_rows_total"], 4);

    let ratings: Vec<RatingAggregate> = read_records(&paths.processed_dir, OutputFormat::Csv).unwrap();
    let ids: Vec<i64> = ratings.iter().map(|r| r.movie_id.0).collect();
    assert_eq!(ids, vec![1, 2]);
}
