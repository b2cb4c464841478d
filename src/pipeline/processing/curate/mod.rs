//! Dashboard-facing aggregates over the processed tables.
//!
//! A movie's mean rating is trusted once it has at least `min_rating_count`
//! ratings. Below that the overview falls back to the vote average, while the
//! genre and year rollups leave the movie out of their rating means but still
//! count it.

pub mod quality;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::info;

use crate::config::Parameters;
use crate::domain::*;
use crate::pipeline::processing::normalize::distinct_names;
use crate::pipeline::processing::normalize::ratings::RatingsReconciliation;

use self::quality::CurationQuality;

/// Processed tables the curator reads.
#[derive(Debug, Clone, Default)]
pub struct CurateInputs {
    pub movies: Vec<Movie>,
    pub movie_genres: Vec<MovieGenre>,
    pub movie_companies: Vec<MovieCompany>,
    pub movie_keywords: Vec<MovieKeyword>,
    pub cast: Vec<Appearance>,
    pub ratings: Vec<RatingAggregate>,
}

#[derive(Debug, Clone)]
pub struct Curation {
    pub overview: Vec<CuratedOverview>,
    pub genre_stats: Vec<CuratedGenreStats>,
    pub year_trends: Vec<CuratedYearTrend>,
    pub quality: CurationQuality,
}

pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Joins each movie's distinct values in bridge order, keeping at most `top_n`.
pub fn list_aggregate<'a>(
    pairs: impl IntoIterator<Item = (MovieId, &'a str)>,
    top_n: Option<usize>,
) -> BTreeMap<MovieId, String> {
    let mut grouped: BTreeMap<MovieId, Vec<&'a str>> = BTreeMap::new();
    for (movie_id, value) in pairs {
        grouped.entry(movie_id).or_default().push(value);
    }
    grouped
        .into_iter()
        .map(|(movie_id, values)| {
            let mut distinct = distinct_names(values);
            if let Some(n) = top_n {
                distinct.truncate(n);
            }
            (movie_id, distinct.join(", "))
        })
        .collect()
}

/// Whether a mean rating can be trusted: it exists and its sample is large
/// enough. Missing counts are zero.
pub fn rating_trusted(avg_rating: Option<f64>, rating_count: Option<i64>, min_rating_count: u64) -> bool {
    avg_rating.is_some() && rating_count.unwrap_or(0).max(0) as u64 >= min_rating_count
}

pub fn chosen_rating(
    avg_rating: Option<f64>,
    rating_count: Option<i64>,
    vote_average: Option<f64>,
    min_rating_count: u64,
) -> Option<f64> {
    if rating_trusted(avg_rating, rating_count, min_rating_count) {
        avg_rating
    } else {
        vote_average
    }
}

pub fn build_overview(inputs: &CurateInputs, min_rating_count: u64) -> Vec<CuratedOverview> {
    let ratings: HashMap<MovieId, &RatingAggregate> =
        inputs.ratings.iter().map(|r| (r.movie_id, r)).collect();
    let genres = list_aggregate(
        inputs.movie_genres.iter().map(|b| (b.movie_id, b.genre_name.as_str())),
        None,
    );
    let companies = list_aggregate(
        inputs.movie_companies.iter().map(|b| (b.movie_id, b.company_name.as_str())),
        Some(3),
    );
    let keywords = list_aggregate(
        inputs.movie_keywords.iter().map(|b| (b.movie_id, b.keyword_name.as_str())),
        Some(10),
    );

    inputs
        .movies
        .iter()
        .map(|m| {
            let rating = ratings.get(&m.movie_id);
            let avg_rating = rating.and_then(|r| r.avg_rating);
            let rating_count = rating.map(|r| r.rating_count);
            CuratedOverview {
                movie_id: m.movie_id,
                title: m.title.clone(),
                release_year: m.release_year,
                original_language: m.original_language.clone(),
                budget: m.budget,
                revenue: m.revenue,
                runtime: m.runtime,
                popularity: m.popularity,
                vote_average: m.vote_average,
                vote_count: m.vote_count,
                profit: m.profit,
                roi: m.roi,
                avg_rating,
                rating_count,
                genre_list: genres.get(&m.movie_id).cloned(),
                top_companies: companies.get(&m.movie_id).cloned(),
                keyword_list: keywords.get(&m.movie_id).cloned(),
                avg_rating_curated: chosen_rating(avg_rating, rating_count, m.vote_average, min_rating_count),
            }
        })
        .collect()
}

/// Mean ratings of movies whose sample meets the threshold.
fn trusted_ratings(ratings: &[RatingAggregate], min_rating_count: u64) -> HashMap<MovieId, f64> {
    ratings
        .iter()
        .filter(|r| rating_trusted(r.avg_rating, Some(r.rating_count), min_rating_count))
        .filter_map(|r| r.avg_rating.map(|avg| (r.movie_id, avg)))
        .collect()
}

pub fn build_genre_stats(inputs: &CurateInputs, min_rating_count: u64) -> Vec<CuratedGenreStats> {
    let movies: HashMap<MovieId, &Movie> = inputs.movies.iter().map(|m| (m.movie_id, m)).collect();
    let trusted = trusted_ratings(&inputs.ratings, min_rating_count);

    let mut by_genre: BTreeMap<&str, BTreeSet<MovieId>> = BTreeMap::new();
    for bridge in &inputs.movie_genres {
        by_genre
            .entry(bridge.genre_name.as_str())
            .or_default()
            .insert(bridge.movie_id);
    }

    by_genre
        .into_iter()
        .map(|(genre, ids)| CuratedGenreStats {
            genre_name: genre.to_string(),
            movie_count: ids.len() as i64,
            avg_roi: mean(ids.iter().filter_map(|id| movies.get(id).and_then(|m| m.roi))),
            avg_rating: mean(ids.iter().filter_map(|id| trusted.get(id).copied())),
        })
        .collect()
}

pub fn build_year_trends(inputs: &CurateInputs, min_rating_count: u64) -> Vec<CuratedYearTrend> {
    let trusted = trusted_ratings(&inputs.ratings, min_rating_count);

    let mut by_year: BTreeMap<i64, Vec<&Movie>> = BTreeMap::new();
    for movie in &inputs.movies {
        if let Some(year) = movie.release_year {
            by_year.entry(year).or_default().push(movie);
        }
    }

    by_year
        .into_iter()
        .map(|(year, movies)| CuratedYearTrend {
            release_year: year,
            movie_count: movies.len() as i64,
            avg_budget: mean(movies.iter().filter_map(|m| m.budget)),
            avg_revenue: mean(movies.iter().filter_map(|m| m.revenue)),
            avg_rating: mean(movies.iter().filter_map(|m| trusted.get(&m.movie_id).copied())),
        })
        .collect()
}

pub fn curate(
    inputs: &CurateInputs,
    params: &Parameters,
    reconciliation: Option<RatingsReconciliation>,
) -> Curation {
    let min = params.min_rating_count;
    let overview = build_overview(inputs, min);
    let genre_stats = build_genre_stats(inputs, min);
    let year_trends = build_year_trends(inputs, min);
    let quality = CurationQuality::assess(inputs, &overview, &genre_stats, &year_trends, min, reconciliation);

    info!(
        overview = overview.len(),
        genres = genre_stats.len(),
        years = year_trends.len(),
        min_rating_count = min,
        "Built curated tables"
    );

    Curation {
        overview,
        genre_stats,
        year_trends,
        quality,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn movie(id: i64, year: Option<i64>, budget: f64, revenue: f64, vote: f64) -> Movie {
        Movie {
            movie_id: MovieId(id),
            title: Some(format!("Movie {id}")),
            release_year: year,
            original_language: Some("en".into()),
            budget: Some(budget),
            revenue: Some(revenue),
            runtime: None,
            popularity: None,
            vote_average: Some(vote),
            vote_count: None,
            profit: Movie::profit(Some(budget), Some(revenue)),
            roi: Movie::roi(Some(budget), Some(revenue)),
        }
    }

    fn inputs() -> CurateInputs {
        let genre = |id, name: &str| MovieGenre {
            movie_id: MovieId(id),
            genre_name: name.to_string(),
        };
        CurateInputs {
            movies: vec![
                movie(1, Some(2000), 50.0, 100.0, 6.0),
                movie(2, Some(2000), 0.0, 100.0, 7.0),
                movie(3, None, 10.0, 10.0, 8.0),
            ],
            movie_genres: vec![genre(1, "Action"), genre(1, "Drama"), genre(2, "Drama")],
            ratings: vec![
                RatingAggregate { movie_id: MovieId(1), avg_rating: Some(4.0), rating_count: 60 },
                RatingAggregate { movie_id: MovieId(2), avg_rating: Some(2.0), rating_count: 3 },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_list_aggregate_dedupes_and_caps() {
        let pairs = vec![
            (MovieId(1), "A"),
            (MovieId(1), "B"),
            (MovieId(1), "A"),
            (MovieId(1), "C"),
            (MovieId(2), "Z"),
        ];
        let joined = list_aggregate(pairs.clone(), None);
        assert_eq!(joined[&MovieId(1)], "A, B, C");
        let capped = list_aggregate(pairs, Some(2));
        assert_eq!(capped[&MovieId(1)], "A, B");
        assert_eq!(capped[&MovieId(2)], "Z");
    }

    #[test]
    fn test_chosen_rating_respects_threshold() {
        let overview = build_overview(&inputs(), 50);
        assert_eq!(overview[0].avg_rating_curated, Some(4.0));
        assert_eq!(overview[1].avg_rating_curated, Some(7.0));
        assert_eq!(overview[2].avg_rating, None);
        assert_eq!(overview[2].rating_count, None);
        assert_eq!(overview[2].avg_rating_curated, Some(8.0));
        assert_eq!(overview[0].genre_list.as_deref(), Some("Action, Drama"));
        assert_eq!(overview[2].genre_list, None);
    }

    #[test]
    fn test_rollups_count_all_but_rate_only_trusted() {
        let inputs = inputs();
        let genres = build_genre_stats(&inputs, 50);
        let names: Vec<&str> = genres.iter().map(|g| g.genre_name.as_str()).collect();
        assert_eq!(names, vec!["Action", "Drama"]);
        let drama = &genres[1];
        assert_eq!(drama.movie_count, 2);
        assert_eq!(drama.avg_rating, Some(4.0));
        assert_eq!(drama.avg_roi, Some(2.0));

        let years = build_year_trends(&inputs, 50);
        assert_eq!(years.len(), 1);
        assert_eq!(years[0].movie_count, 2);
        assert_eq!(years[0].avg_budget, Some(25.0));
        assert_eq!(years[0].avg_rating, Some(4.0));
    }

    #[test]
    fn test_lower_threshold_trusts_small_samples() {
        let years = build_year_trends(&inputs(), 1);
        assert_eq!(years[0].avg_rating, Some(3.0));
    }
}
