//! Raw tables to the dimensional/bridge model.
//!
//! Movies are built first; credits, keywords and ratings only keep rows for
//! movies that made it into the movie dimension.

pub mod credits;
pub mod ids;
pub mod keywords;
pub mod list_field;
pub mod literal;
pub mod movies;
pub mod quality;
pub mod ratings;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

use crate::config::Parameters;
use crate::domain::*;
use crate::pipeline::storage::raw::{RawInputs, RawTable};
use crate::pipeline::storage::Table;

use self::ids::coerce_id;
use self::quality::TransformQuality;
use self::ratings::RatingsReconciliation;

/// Distinct values in first-seen order.
pub fn distinct_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}

/// What happened to the rows of a table keyed by catalog `id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSelection {
    pub kept: usize,
    pub invalid_id: usize,
    /// Rows for a movie not in the movie dimension.
    pub orphan: usize,
    pub duplicate: usize,
}

/// Picks the first row per known movie from a table with an `id` column.
pub fn select_movie_rows(raw: &RawTable, known: &HashSet<MovieId>) -> (Vec<(usize, MovieId)>, RowSelection) {
    let col_id = raw.column_or_empty("id");
    let mut selection = RowSelection::default();
    let mut seen = HashSet::new();
    let mut rows = Vec::new();

    for (row, cell) in raw.column_cells(col_id).enumerate() {
        let Some(movie_id) = cell.and_then(coerce_id).map(MovieId) else {
            selection.invalid_id += 1;
            continue;
        };
        if !known.contains(&movie_id) {
            selection.orphan += 1;
        } else if !seen.insert(movie_id) {
            selection.duplicate += 1;
        } else {
            rows.push((row, movie_id));
        }
    }
    selection.kept = rows.len();
    (rows, selection)
}

/// All processed tables of one run.
#[derive(Debug, Clone, Default)]
pub struct NormalizedTables {
    pub movies: Vec<Movie>,
    pub persons: Vec<Person>,
    pub genres: Vec<Genre>,
    pub companies: Vec<Company>,
    pub keywords: Vec<Keyword>,
    pub movie_genres: Vec<MovieGenre>,
    pub movie_companies: Vec<MovieCompany>,
    pub cast: Vec<Appearance>,
    pub crew: Vec<CrewCredit>,
    pub directors: Vec<DirectorCredit>,
    pub movie_keywords: Vec<MovieKeyword>,
    pub ratings: Vec<RatingAggregate>,
}

impl NormalizedTables {
    /// Tables in write order.
    pub fn to_tables(&self) -> Vec<Table> {
        vec![
            Table::from_records(&self.movies),
            Table::from_records(&self.persons),
            Table::from_records(&self.genres),
            Table::from_records(&self.companies),
            Table::from_records(&self.keywords),
            Table::from_records(&self.movie_genres),
            Table::from_records(&self.movie_companies),
            Table::from_records(&self.cast),
            Table::from_records(&self.crew),
            Table::from_records(&self.directors),
            Table::from_records(&self.movie_keywords),
            Table::from_records(&self.ratings),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct Normalization {
    pub tables: NormalizedTables,
    pub quality: TransformQuality,
    pub reconciliation: RatingsReconciliation,
}

pub fn normalize(inputs: &RawInputs, params: &Parameters) -> Normalization {
    let movie_build = movies::build_movies(&inputs.movies);
    let known = movie_build.movie_ids();
    let credit_build = credits::build_credits(&inputs.credits, &known, params.max_cast_per_movie);
    let keyword_build = keywords::build_keywords(&inputs.keywords, &known);
    let ratings_build = ratings::build_ratings(&inputs.ratings, &inputs.links, &known);

    let tables = NormalizedTables {
        movies: movie_build.movies,
        persons: credit_build.persons,
        genres: movie_build.genres,
        companies: movie_build.companies,
        keywords: keyword_build.keywords,
        movie_genres: movie_build.movie_genres,
        movie_companies: movie_build.movie_companies,
        cast: credit_build.cast,
        crew: credit_build.crew,
        directors: credit_build.directors,
        movie_keywords: keyword_build.movie_keywords,
        ratings: ratings_build.aggregates,
    };

    let quality = TransformQuality::assess(
        &tables,
        &movie_build.stats,
        &credit_build.stats,
        &keyword_build.stats,
        &ratings_build.reconciliation,
    );

    info!(
        movies = tables.movies.len(),
        persons = tables.persons.len(),
        ratings = tables.ratings.len(),
        "Normalized raw inputs"
    );

    Normalization {
        tables,
        quality,
        reconciliation: ratings_build.reconciliation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_names_keeps_first_seen_order() {
        assert_eq!(
            distinct_names(["Drama", "Action", "Drama", "Comedy"]),
            vec!["Drama", "Action", "Comedy"]
        );
    }

    #[test]
    fn test_normalize_enforces_movie_containment() {
        let parse = |name: &str, content: &str| RawTable::parse(name, content, "utf-8").unwrap();
        let inputs = RawInputs {
            movies: parse("movies_metadata", "id,title,genres\n1,A,\"[{'name': 'Drama'}]\"\n"),
            credits: parse("credits", "cast,crew,id\n\"[{'id': 5, 'name': 'P', 'order': 0}]\",[],1\n\"[{'id': 6, 'name': 'Q'}]\",[],2\n"),
            keywords: parse("keywords", "id,keywords\n2,\"[{'name': 'k'}]\"\n"),
            ratings: parse("ratings", "userId,movieId,rating,timestamp\n1,10,4.0,0\n"),
            links: parse("links", "movieId,imdbId,tmdbId\n10,1,1\n"),
        };
        let result = normalize(&inputs, &Parameters::default());
        let tables = &result.tables;
        assert_eq!(tables.cast.len(), 1);
        assert!(tables.movie_keywords.is_empty());
        assert_eq!(tables.ratings.len(), 1);
        assert_eq!(result.quality.movies_without_keywords, 1);
        assert_eq!(result.quality.dropped_rows.credits.orphan, 1);
        assert_eq!(result.quality.row_counts.len(), 12);
        assert_eq!(result.reconciliation.matched_movies, 1);

        let md = result.quality.to_markdown();
        assert!(md.starts_with("# Transform Quality\n\n## Row Counts\n"));
        assert!(md.contains("- Credits: 0 invalid id, 1 without movie, 0 duplicate\n"));
        assert!(md.contains("\n## Ratings Mapping\n"));
        assert!(md.ends_with("(0 duplicate keys, 0 invalid rows)\n"));
    }
}
