use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use super::distinct_names;
use super::ids::{coerce_f64, coerce_id};
use super::list_field::{parse_counted, ListParseStats};
use crate::domain::{Company, Genre, Movie, MovieCompany, MovieGenre, MovieId};
use crate::pipeline::storage::raw::RawTable;

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];

/// Year of a release date, or `None` when no known layout matches.
pub fn release_year(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date.year() as i64);
        }
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.year() as i64);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.year() as i64);
    }
    if raw.len() == 4 && raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw.parse().ok();
    }
    None
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieBuildStats {
    pub rows_read: usize,
    /// Rows dropped because `id` was not an integer.
    pub invalid_id: usize,
    /// Rows dropped as repeats of an earlier `id`.
    pub duplicate_id: usize,
    pub unparseable_release_date: usize,
    pub genres: ListParseStats,
    pub production_companies: ListParseStats,
}

#[derive(Debug, Clone, Default)]
pub struct MovieBuild {
    pub movies: Vec<Movie>,
    pub genres: Vec<Genre>,
    pub companies: Vec<Company>,
    pub movie_genres: Vec<MovieGenre>,
    pub movie_companies: Vec<MovieCompany>,
    pub stats: MovieBuildStats,
}

impl MovieBuild {
    pub fn movie_ids(&self) -> HashSet<MovieId> {
        self.movies.iter().map(|m| m.movie_id).collect()
    }
}

pub fn build_movies(raw: &RawTable) -> MovieBuild {
    let col_id = raw.column_or_empty("id");
    let col_title = raw.column_or_empty("title");
    let col_release = raw.column_or_empty("release_date");
    let col_language = raw.column_or_empty("original_language");
    let col_budget = raw.column_or_empty("budget");
    let col_revenue = raw.column_or_empty("revenue");
    let col_runtime = raw.column_or_empty("runtime");
    let col_popularity = raw.column_or_empty("popularity");
    let col_vote_average = raw.column_or_empty("vote_average");
    let col_vote_count = raw.column_or_empty("vote_count");
    let col_genres = raw.column_or_empty("genres");
    let col_companies = raw.column_or_empty("production_companies");

    let mut build = MovieBuild::default();
    build.stats.rows_read = raw.len();
    let mut seen = HashSet::new();
    let numeric = |row: usize, col| raw.cell(row, col).and_then(coerce_f64);

    for row in 0..raw.len() {
        let Some(movie_id) = raw.cell(row, col_id).and_then(coerce_id).map(MovieId) else {
            build.stats.invalid_id += 1;
            continue;
        };
        if !seen.insert(movie_id) {
            build.stats.duplicate_id += 1;
            continue;
        }

        let release = raw.cell(row, col_release);
        let release_year = release.and_then(release_year);
        if release.is_some() && release_year.is_none() {
            build.stats.unparseable_release_date += 1;
        }

        let budget = numeric(row, col_budget);
        let revenue = numeric(row, col_revenue);
        build.movies.push(Movie {
            movie_id,
            title: raw.cell(row, col_title).map(str::to_string),
            release_year,
            original_language: raw.cell(row, col_language).map(str::to_string),
            budget,
            revenue,
            runtime: numeric(row, col_runtime),
            popularity: numeric(row, col_popularity),
            vote_average: numeric(row, col_vote_average),
            vote_count: numeric(row, col_vote_count),
            profit: Movie::profit(budget, revenue),
            roi: Movie::roi(budget, revenue),
        });

        let genres = parse_counted(raw.cell(row, col_genres), &mut build.stats.genres);
        build
            .movie_genres
            .extend(genres.names().map(|name| MovieGenre {
                movie_id,
                genre_name: name.to_string(),
            }));

        let companies = parse_counted(
            raw.cell(row, col_companies),
            &mut build.stats.production_companies,
        );
        build
            .movie_companies
            .extend(companies.names().map(|name| MovieCompany {
                movie_id,
                company_name: name.to_string(),
            }));
    }

    build.genres = distinct_names(build.movie_genres.iter().map(|b| b.genre_name.as_str()))
        .into_iter()
        .map(|genre_name| Genre { genre_name })
        .collect();
    build.companies = distinct_names(build.movie_companies.iter().map(|b| b.company_name.as_str()))
        .into_iter()
        .map(|company_name| Company { company_name })
        .collect();

    debug!(
        movies = build.movies.len(),
        invalid_id = build.stats.invalid_id,
        duplicate_id = build.stats.duplicate_id,
        "Built movie dimension"
    );
    build
}
