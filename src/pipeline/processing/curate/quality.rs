use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use super::{rating_trusted, CurateInputs};
use crate::domain::{CuratedGenreStats, CuratedOverview, CuratedYearTrend, MovieId};
use crate::pipeline::processing::normalize::quality::{movies_without, write_reconciliation};
use crate::pipeline::processing::normalize::ratings::RatingsReconciliation;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverviewQuality {
    pub movies_total: usize,
    pub movies_without_genre: usize,
    pub movies_without_cast: usize,
    pub movies_without_keywords: usize,
    pub budget_zero: usize,
    pub revenue_zero: usize,
    /// Movies whose mean rating met the threshold.
    pub rated_above_threshold: usize,
    /// Movies whose chosen rating fell back to the vote average.
    pub rating_fallback: usize,
    pub without_ratings: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupQuality {
    pub groups: usize,
    pub movies_counted: usize,
    pub movies_in_rating_mean: usize,
    /// Counted movies left out of the rating mean for a small or missing sample.
    pub movies_excluded_from_rating_mean: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurationQuality {
    pub min_rating_count: u64,
    pub overview: OverviewQuality,
    pub genre_stats: RollupQuality,
    pub year_trends: RollupQuality,
    /// Present when the transform stage left its reconciliation log behind.
    pub ratings_mapping: Option<RatingsReconciliation>,
}

fn rollup(groups: usize, movies: &HashSet<MovieId>, trusted: &HashSet<MovieId>) -> RollupQuality {
    let rated = movies.intersection(trusted).count();
    RollupQuality {
        groups,
        movies_counted: movies.len(),
        movies_in_rating_mean: rated,
        movies_excluded_from_rating_mean: movies.len() - rated,
    }
}

impl CurationQuality {
    pub fn assess(
        inputs: &CurateInputs,
        overview: &[CuratedOverview],
        genre_stats: &[CuratedGenreStats],
        year_trends: &[CuratedYearTrend],
        min_rating_count: u64,
        ratings_mapping: Option<RatingsReconciliation>,
    ) -> Self {
        let ids: HashSet<MovieId> = overview.iter().map(|o| o.movie_id).collect();
        let trusted: HashSet<MovieId> = inputs
            .ratings
            .iter()
            .filter(|r| rating_trusted(r.avg_rating, Some(r.rating_count), min_rating_count))
            .map(|r| r.movie_id)
            .collect();
        let rated: HashMap<MovieId, i64> =
            inputs.ratings.iter().map(|r| (r.movie_id, r.rating_count)).collect();

        let rated_above_threshold = overview
            .iter()
            .filter(|o| rating_trusted(o.avg_rating, o.rating_count, min_rating_count))
            .count();

        let overview_quality = OverviewQuality {
            movies_total: overview.len(),
            movies_without_genre: movies_without(&ids, inputs.movie_genres.iter().map(|b| b.movie_id)),
            movies_without_cast: movies_without(&ids, inputs.cast.iter().map(|b| b.movie_id)),
            movies_without_keywords: movies_without(&ids, inputs.movie_keywords.iter().map(|b| b.movie_id)),
            budget_zero: overview.iter().filter(|o| o.budget == Some(0.0)).count(),
            revenue_zero: overview.iter().filter(|o| o.revenue == Some(0.0)).count(),
            rated_above_threshold,
            rating_fallback: overview.len() - rated_above_threshold,
            without_ratings: ids.iter().filter(|id| !rated.contains_key(id)).count(),
        };

        let genre_movies: HashSet<MovieId> = inputs
            .movie_genres
            .iter()
            .map(|b| b.movie_id)
            .filter(|id| ids.contains(id))
            .collect();
        let year_movies: HashSet<MovieId> = overview
            .iter()
            .filter(|o| o.release_year.is_some())
            .map(|o| o.movie_id)
            .collect();

        Self {
            min_rating_count,
            overview: overview_quality,
            genre_stats: rollup(genre_stats.len(), &genre_movies, &trusted),
            year_trends: rollup(year_trends.len(), &year_movies, &trusted),
            ratings_mapping,
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::from("# Curate Quality\n\n");
        // Writing into a String cannot fail.
        let _ = self.write_markdown(&mut md);
        md
    }

    fn write_markdown(&self, md: &mut String) -> std::fmt::Result {
        let o = &self.overview;
        writeln!(md, "Minimum rating count: {}\n", self.min_rating_count)?;

        md.push_str("## curated_movie_overview\n");
        writeln!(md, "- Movies: {}", o.movies_total)?;
        writeln!(md, "- Without genre: {}", o.movies_without_genre)?;
        writeln!(md, "- Without cast: {}", o.movies_without_cast)?;
        writeln!(md, "- Without keywords: {}", o.movies_without_keywords)?;
        writeln!(md, "- budget == 0: {}", o.budget_zero)?;
        writeln!(md, "- revenue == 0: {}", o.revenue_zero)?;
        writeln!(md, "- Rated at or above threshold: {}", o.rated_above_threshold)?;
        writeln!(md, "- Chosen rating from vote average: {}", o.rating_fallback)?;
        writeln!(md, "- Without any ratings: {}\n", o.without_ratings)?;

        for (name, r) in [
            ("curated_genre_stats", &self.genre_stats),
            ("curated_year_trends", &self.year_trends),
        ] {
            writeln!(md, "## {name}")?;
            writeln!(md, "- Groups: {}", r.groups)?;
            writeln!(md, "- Movies counted: {}", r.movies_counted)?;
            writeln!(md, "- Movies in rating mean: {}", r.movies_in_rating_mean)?;
            writeln!(md, "- Movies excluded from rating mean: {}\n", r.movies_excluded_from_rating_mean)?;
        }

        match &self.ratings_mapping {
            Some(log) => write_reconciliation(md, log),
            None => {
                md.push_str("## Ratings Mapping\n- Reconciliation log not found\n");
                Ok(())
            }
        }
    }
}
