//! Three-movie raw snapshot shared by the integration tests.
//!
//! Movie 1 has no budget but some revenue, two genres and two ratings.
//! Movie 2 has a budget of 50 and revenue of 100 and one rating.
//! Movie 3 has no ratings at all.

use std::fs;
use std::path::Path;

use movie_etl::config::{DataPaths, OutputFormat, Parameters, PipelineConfig};

pub const MOVIES: &str = r#"id,title,release_date,original_language,budget,revenue,runtime,popularity,vote_average,vote_count,genres,production_companies
1,Alpha,1999-05-01,en,0,100,90,1.5,6.0,10,"[{'id': 28, 'name': 'Action'}, {'id': 18, 'name': 'Drama'}]","[{'name': 'Studio A', 'id': 1}]"
2,Beta,2001-01-01,en,50,100,100,2.0,7.0,20,"[{""id"": 18, ""name"": ""Drama""}]",[]
3,Gamma,2001-06-01,fr,,,80,0.5,5.0,5,[],
"#;

pub const CREDITS: &str = r#"cast,crew,id
"[{'cast_id': 1, 'character': 'Hero', 'credit_id': 'a', 'id': 100, 'name': 'Ann Actor', 'order': 0}, {'cast_id': 2, 'character': 'Foe', 'credit_id': 'b', 'id': 101, 'name': 'Bob Actor', 'order': 1}]","[{'credit_id': 'c', 'department': 'Directing', 'id': 200, 'job': 'Director', 'name': 'Dee Director'}]",1
"[{'id': 100, 'name': 'Ann Actor', 'character': 'Lead', 'order': 0}]",[],2
[],[],3
"#;

pub const KEYWORDS: &str = r#"id,keywords
1,"[{'id': 5, 'name': 'heist'}]"
2,[]
3,[]
"#;

pub const RATINGS: &str = "userId,movieId,rating,timestamp
1,10,4.0,100
2,10,5.0,101
1,20,3.0,102
3,99,2.0,103
";

pub const LINKS: &str = "movieId,imdbId,tmdbId
10,1,1
20,2,2
";

/// Writes the snapshot under `base` and returns a config pointing at it.
pub fn fixture_config(base: &Path, format: OutputFormat) -> PipelineConfig {
    let paths = DataPaths::under(base);
    fs::create_dir_all(&paths.raw_dir).unwrap();
    for (file, content) in [
        ("movies_metadata.csv", MOVIES),
        ("credits.csv", CREDITS),
        ("keywords.csv", KEYWORDS),
        ("ratings_small.csv", RATINGS),
        ("links_small.csv", LINKS),
    ] {
        fs::write(paths.raw_dir.join(file), content).unwrap();
    }

    PipelineConfig {
        paths,
        params: Parameters {
            min_rating_count: 2,
            ..Parameters::default()
        },
        output_format: format,
        ..PipelineConfig::default()
    }
}
