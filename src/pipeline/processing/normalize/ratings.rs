//! Ratings aggregation across the two movie identifier spaces.
//!
//! Ratings are keyed by [`RatingsMovieId`]; the links table maps those keys to
//! catalog [`MovieId`]s. Only mapped rows are aggregated, and the aggregate is
//! keyed entirely by catalog id.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

use super::ids::{coerce_f64, coerce_id};
use crate::domain::{IdMapping, MovieId, RatingAggregate, RatingsMovieId};
use crate::pipeline::storage::raw::RawTable;

/// Coverage of the ratings bridge. Written next to the processed tables and
/// carried into every quality report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingsReconciliation {
    /// Catalog movies that received at least one mapped rating.
    pub matched_movies: usize,
    /// Catalog movies with no mapped rating.
    pub movies_without_ratings: usize,
    /// Mapped, aggregated movie ids with no catalog row. Excluded from the fact table.
    pub rated_movies_without_metadata: usize,
    pub ratings_rows_total: usize,
    /// Ratings rows whose `movieId` is not an integer.
    pub ratings_rows_invalid_key: usize,
    /// Ratings rows with a missing or non-numeric rating.
    pub ratings_rows_invalid_rating: usize,
    /// Ratings rows whose key has no entry in the links table.
    pub ratings_rows_unmapped: usize,
    pub ratings_rows_mapped: usize,
    pub mapping_entries: usize,
    /// Links rows dropped because either side was not an integer.
    pub mapping_rows_invalid: usize,
    /// Links rows repeating a ratings key; the first mapping was kept.
    pub mapping_duplicate_keys: usize,
    pub key_column: String,
}

#[derive(Debug, Clone, Default)]
pub struct RatingsBuild {
    pub aggregates: Vec<RatingAggregate>,
    pub reconciliation: RatingsReconciliation,
}

/// Builds the ratings-key to catalog-id bridge from the links table.
pub fn build_id_mapping(links: &RawTable) -> (IdMapping, usize) {
    let col_movie = links.column_or_empty("movieId");
    let col_tmdb = links.column_or_empty("tmdbId");
    let mut mapping = IdMapping::default();
    let mut invalid = 0;

    for row in 0..links.len() {
        let key = links.cell(row, col_movie).and_then(coerce_id);
        let target = links.cell(row, col_tmdb).and_then(coerce_id);
        match (key, target) {
            (Some(key), Some(target)) => mapping.insert(RatingsMovieId(key), MovieId(target)),
            _ => invalid += 1,
        }
    }
    (mapping, invalid)
}

pub fn build_ratings(ratings: &RawTable, links: &RawTable, catalog: &HashSet<MovieId>) -> RatingsBuild {
    let (mapping, mapping_rows_invalid) = build_id_mapping(links);
    let col_movie = ratings.column_or_empty("movieId");
    let col_rating = ratings.column_or_empty("rating");

    let mut log = RatingsReconciliation {
        ratings_rows_total: ratings.len(),
        mapping_entries: mapping.len(),
        mapping_rows_invalid,
        mapping_duplicate_keys: mapping.duplicate_keys(),
        key_column: "movie_id (tmdbId via links)".to_string(),
        ..Default::default()
    };

    let mut sums: BTreeMap<MovieId, (f64, i64)> = BTreeMap::new();
    for row in 0..ratings.len() {
        let Some(key) = ratings.cell(row, col_movie).and_then(coerce_id).map(RatingsMovieId) else {
            log.ratings_rows_invalid_key += 1;
            continue;
        };
        let Some(movie_id) = mapping.resolve(key) else {
            log.ratings_rows_unmapped += 1;
            continue;
        };
        let Some(rating) = ratings.cell(row, col_rating).and_then(coerce_f64) else {
            log.ratings_rows_invalid_rating += 1;
            continue;
        };
        log.ratings_rows_mapped += 1;
        let entry = sums.entry(movie_id).or_insert((0.0, 0));
        entry.0 += rating;
        entry.1 += 1;
    }

    let rated: HashSet<MovieId> = sums.keys().copied().collect();
    log.matched_movies = rated.intersection(catalog).count();
    log.movies_without_ratings = catalog.difference(&rated).count();
    log.rated_movies_without_metadata = rated.difference(catalog).count();

    let aggregates: Vec<RatingAggregate> = sums
        .into_iter()
        .filter(|(movie_id, _)| catalog.contains(movie_id))
        .map(|(movie_id, (sum, count))| RatingAggregate {
            movie_id,
            avg_rating: Some(sum / count as f64),
            rating_count: count,
        })
        .collect();

    debug!(aggregates = aggregates.len(), "Aggregated ratings in catalog space");
    info!(
        matched = log.matched_movies,
        without_ratings = log.movies_without_ratings,
        without_metadata = log.rated_movies_without_metadata,
        unmapped_rows = log.ratings_rows_unmapped,
        "Ratings reconciliation"
    );

    RatingsBuild {
        aggregates,
        reconciliation: log,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, content: &str) -> RawTable {
        RawTable::parse(name, content, "utf-8").unwrap()
    }

    #[test]
    fn test_aggregate_is_keyed_in_catalog_space() {
        let ratings = table(
            "ratings",
            "userId,movieId,rating,timestamp\n\
             1,1,4.0,0\n\
             2,1,5.0,0\n\
             3,2,3.0,0\n\
             4,3,2.0,0\n\
             5,oops,2.0,0\n\
             6,1,,0\n",
        );
        let links = table("links", "movieId,imdbId,tmdbId\n1,114709,862\n2,113497,8844\n2,0,9999\n4,1,\n");
        let catalog = HashSet::from([MovieId(862), MovieId(5)]);

        let build = build_ratings(&ratings, &links, &catalog);
        assert_eq!(build.aggregates.len(), 1);
        assert_eq!(build.aggregates[0].movie_id, MovieId(862));
        assert_eq!(build.aggregates[0].avg_rating, Some(4.5));
        assert_eq!(build.aggregates[0].rating_count, 2);

        let log = &build.reconciliation;
        assert_eq!(log.ratings_rows_total, 6);
        assert_eq!(log.ratings_rows_invalid_key, 1);
        assert_eq!(log.ratings_rows_invalid_rating, 1);
        assert_eq!(log.ratings_rows_unmapped, 1);
        assert_eq!(log.ratings_rows_mapped, 3);
        assert_eq!(log.matched_movies, 1);
        assert_eq!(log.movies_without_ratings, 1);
        assert_eq!(log.rated_movies_without_metadata, 1);
        assert_eq!(log.mapping_duplicate_keys, 1);
        assert_eq!(log.mapping_rows_invalid, 1);
    }

    #[test]
    fn test_raw_keys_never_reach_the_fact_table() {
        // Ratings key 862 collides numerically with a catalog id but maps elsewhere.
        let ratings = table("ratings", "userId,movieId,rating,timestamp\n1,862,4.0,0\n");
        let links = table("links", "movieId,imdbId,tmdbId\n862,1,31\n");
        let catalog = HashSet::from([MovieId(862), MovieId(31)]);
        let build = build_ratings(&ratings, &links, &catalog);
        assert_eq!(build.aggregates.len(), 1);
        assert_eq!(build.aggregates[0].movie_id, MovieId(31));
    }
}
