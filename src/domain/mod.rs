//! Row shapes of the processed and curated tables.
//!
//! The two movie identifier spaces are separate types: [`MovieId`] is the
//! catalog id used by metadata, credits and keywords; [`RatingsMovieId`] is the
//! key of the ratings source. The only way from one to the other is
//! [`IdMapping`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::constants::*;
use crate::pipeline::storage::{Cell, ColumnKind, Value};
use crate::record;

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Cell for $name {
            const KIND: ColumnKind = ColumnKind::Int;

            fn to_value(&self) -> Value {
                Value::Int(self.0)
            }

            fn from_value(value: &Value) -> Option<Self> {
                value.as_i64().map($name)
            }
        }
    };
}

integer_id!(
    /// Catalog movie identifier.
    MovieId
);
integer_id!(PersonId);
integer_id!(
    /// Movie key of the ratings source. Never stored in an output table.
    RatingsMovieId
);

/// The bridge between the ratings key space and the catalog key space.
#[derive(Debug, Clone, Default)]
pub struct IdMapping {
    entries: HashMap<RatingsMovieId, MovieId>,
    duplicate_keys: usize,
}

impl IdMapping {
    /// Adds a pair; the first catalog id seen for a ratings key wins.
    pub fn insert(&mut self, ratings_key: RatingsMovieId, movie_id: MovieId) {
        if self.entries.contains_key(&ratings_key) {
            self.duplicate_keys += 1;
        } else {
            self.entries.insert(ratings_key, movie_id);
        }
    }

    pub fn resolve(&self, ratings_key: RatingsMovieId) -> Option<MovieId> {
        self.entries.get(&ratings_key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn duplicate_keys(&self) -> usize {
        self.duplicate_keys
    }
}

record! {
    pub struct Movie => DIM_MOVIE {
        pub movie_id: MovieId,
        pub title: Option<String>,
        pub release_year: Option<i64>,
        pub original_language: Option<String>,
        pub budget: Option<f64>,
        pub revenue: Option<f64>,
        pub runtime: Option<f64>,
        pub popularity: Option<f64>,
        pub vote_average: Option<f64>,
        pub vote_count: Option<f64>,
        pub profit: Option<f64>,
        /// Null whenever budget is null or not positive.
        pub roi: Option<f64>,
    }
}

impl Movie {
    pub fn profit(budget: Option<f64>, revenue: Option<f64>) -> Option<f64> {
        Some(revenue? - budget?).filter(|p| p.is_finite())
    }

    pub fn roi(budget: Option<f64>, revenue: Option<f64>) -> Option<f64> {
        match (budget, revenue) {
            (Some(b), Some(r)) if b > 0.0 => Some(r / b).filter(|v| v.is_finite()),
            _ => None,
        }
    }
}

record! {
    pub struct Person => DIM_PERSON {
        pub person_id: PersonId,
        pub name: Option<String>,
    }
}

record! {
    pub struct Genre => DIM_GENRE {
        pub genre_name: String,
    }
}

record! {
    pub struct Company => DIM_COMPANY {
        pub company_name: String,
    }
}

record! {
    pub struct Keyword => DIM_KEYWORD {
        pub keyword_name: String,
    }
}

record! {
    pub struct MovieGenre => BRIDGE_MOVIE_GENRE {
        pub movie_id: MovieId,
        pub genre_name: String,
    }
}

record! {
    pub struct MovieCompany => BRIDGE_MOVIE_COMPANY {
        pub movie_id: MovieId,
        pub company_name: String,
    }
}

record! {
    pub struct MovieKeyword => BRIDGE_MOVIE_KEYWORD {
        pub movie_id: MovieId,
        pub keyword_name: String,
    }
}

record! {
    /// Billed cast member of a movie.
    pub struct Appearance => BRIDGE_MOVIE_CAST {
        pub movie_id: MovieId,
        pub person_id: Option<PersonId>,
        pub person_name: Option<String>,
        pub character: Option<String>,
        pub cast_order: Option<i64>,
    }
}

record! {
    pub struct CrewCredit => BRIDGE_MOVIE_CREW {
        pub movie_id: MovieId,
        pub person_id: Option<PersonId>,
        pub person_name: Option<String>,
        pub job: Option<String>,
        pub department: Option<String>,
    }
}

record! {
    pub struct DirectorCredit => BRIDGE_MOVIE_DIRECTOR {
        pub movie_id: MovieId,
        pub person_id: Option<PersonId>,
        pub person_name: Option<String>,
    }
}

record! {
    /// Mean rating and count per catalog movie.
    pub struct RatingAggregate => FACT_MOVIE_RATINGS_AGG {
        pub movie_id: MovieId,
        pub avg_rating: Option<f64>,
        pub rating_count: i64,
    }
}

record! {
    /// Dashboard row: one per movie with ratings and list aggregates joined in.
    pub struct CuratedOverview => CURATED_MOVIE_OVERVIEW {
        pub movie_id: MovieId,
        pub title: Option<String>,
        pub release_year: Option<i64>,
        pub original_language: Option<String>,
        pub budget: Option<f64>,
        pub revenue: Option<f64>,
        pub runtime: Option<f64>,
        pub popularity: Option<f64>,
        pub vote_average: Option<f64>,
        pub vote_count: Option<f64>,
        pub profit: Option<f64>,
        pub roi: Option<f64>,
        pub avg_rating: Option<f64>,
        pub rating_count: Option<i64>,
        pub genre_list: Option<String>,
        pub top_companies: Option<String>,
        pub keyword_list: Option<String>,
        /// Mean rating when the sample is large enough, vote average otherwise.
        pub avg_rating_curated: Option<f64>,
    }
}

record! {
    pub struct CuratedGenreStats => CURATED_GENRE_STATS {
        pub genre_name: String,
        pub movie_count: i64,
        pub avg_roi: Option<f64>,
        pub avg_rating: Option<f64>,
    }
}

record! {
    pub struct CuratedYearTrend => CURATED_YEAR_TRENDS {
        pub release_year: i64,
        pub movie_count: i64,
        pub avg_budget: Option<f64>,
        pub avg_revenue: Option<f64>,
        pub avg_rating: Option<f64>,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::storage::Record;

    #[test]
    fn test_roi_is_null_for_non_positive_budget() {
        assert_eq!(Movie::roi(Some(0.0), Some(100.0)), None);
        assert_eq!(Movie::roi(Some(-5.0), Some(100.0)), None);
        assert_eq!(Movie::roi(None, Some(100.0)), None);
        assert_eq!(Movie::roi(Some(50.0), None), None);
        assert_eq!(Movie::roi(Some(50.0), Some(100.0)), Some(2.0));
    }

    #[test]
    fn test_profit_requires_both_sides() {
        assert_eq!(Movie::profit(Some(50.0), Some(100.0)), Some(50.0));
        assert_eq!(Movie::profit(None, Some(100.0)), None);
    }

    #[test]
    fn test_mapping_keeps_first_catalog_id() {
        let mut mapping = IdMapping::default();
        mapping.insert(RatingsMovieId(1), MovieId(862));
        mapping.insert(RatingsMovieId(1), MovieId(999));
        assert_eq!(mapping.resolve(RatingsMovieId(1)), Some(MovieId(862)));
        assert_eq!(mapping.resolve(RatingsMovieId(2)), None);
        assert_eq!(mapping.duplicate_keys(), 1);
    }

    #[test]
    fn test_overview_schema_starts_with_movie_columns() {
        let overview: Vec<String> = CuratedOverview::schema().into_iter().map(|c| c.name).collect();
        let movie: Vec<String> = Movie::schema().into_iter().map(|c| c.name).collect();
        assert_eq!(&overview[..movie.len()], movie.as_slice());
        assert_eq!(overview.last().map(String::as_str), Some("avg_rating_curated"));
    }
}
