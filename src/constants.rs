/// Table and stage name constants shared by the stages, reports and tests.

// Stage names, as logged and reported on failure
pub const STAGE_PROFILE: &str = "profile_raw";
pub const STAGE_TRANSFORM: &str = "transform_processed";
pub const STAGE_CURATE: &str = "build_curated";
pub const STAGE_GRAPH: &str = "export_graph";
pub const STAGE_INSIGHTS: &str = "build_insights";

// Processed tables
pub const DIM_MOVIE: &str = "dim_movie";
pub const DIM_PERSON: &str = "dim_person";
pub const DIM_GENRE: &str = "dim_genre";
pub const DIM_COMPANY: &str = "dim_company";
pub const DIM_KEYWORD: &str = "dim_keyword";
pub const BRIDGE_MOVIE_GENRE: &str = "bridge_movie_genre";
pub const BRIDGE_MOVIE_COMPANY: &str = "bridge_movie_company";
pub const BRIDGE_MOVIE_CAST: &str = "bridge_movie_cast";
pub const BRIDGE_MOVIE_CREW: &str = "bridge_movie_crew";
pub const BRIDGE_MOVIE_DIRECTOR: &str = "bridge_movie_director";
pub const BRIDGE_MOVIE_KEYWORD: &str = "bridge_movie_keyword";
pub const FACT_MOVIE_RATINGS_AGG: &str = "fact_movie_ratings_agg";

// Curated tables
pub const CURATED_MOVIE_OVERVIEW: &str = "curated_movie_overview";
pub const CURATED_GENRE_STATS: &str = "curated_genre_stats";
pub const CURATED_YEAR_TRENDS: &str = "curated_year_trends";
pub const GRAPH_INSIGHTS_TOP_COACTORS: &str = "graph_insights_top_coactors";

// Side artifacts
pub const MANIFEST_FILE: &str = "_manifest.json";
pub const RATINGS_RECONCILIATION_FILE: &str = "ratings_reconciliation.json";
pub const INSIGHTS_FILE: &str = "insights.json";
pub const GRAPH_IMPORT_ARGS_FILE: &str = "import_args.txt";
pub const METRICS_SNAPSHOT_FILE: &str = "metrics.prom";

// Report base names inside the docs directory (".json" and ".md" are appended)
pub const REPORT_RAW_PROFILE: &str = "raw_profile";
pub const REPORT_TRANSFORM_QUALITY: &str = "transform_quality";
pub const REPORT_CURATE_QUALITY: &str = "curate_quality";
pub const REPORT_GRAPH_SUMMARY: &str = "graph_export_summary";

/// Processed tables in the order the normalizer writes them.
pub fn processed_tables() -> Vec<&'static str> {
    vec![
        DIM_MOVIE,
        DIM_PERSON,
        DIM_GENRE,
        DIM_COMPANY,
        DIM_KEYWORD,
        BRIDGE_MOVIE_GENRE,
        BRIDGE_MOVIE_COMPANY,
        BRIDGE_MOVIE_CAST,
        BRIDGE_MOVIE_CREW,
        BRIDGE_MOVIE_DIRECTOR,
        BRIDGE_MOVIE_KEYWORD,
        FACT_MOVIE_RATINGS_AGG,
    ]
}

/// Curated tables in the order the curator writes them.
pub fn curated_tables() -> Vec<&'static str> {
    vec![
        CURATED_MOVIE_OVERVIEW,
        CURATED_GENRE_STATS,
        CURATED_YEAR_TRENDS,
    ]
}
