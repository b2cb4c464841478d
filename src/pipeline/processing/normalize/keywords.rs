use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::list_field::{parse_counted, ListParseStats};
use super::{distinct_names, select_movie_rows, RowSelection};
use crate::domain::{Keyword, MovieId, MovieKeyword};
use crate::pipeline::storage::raw::RawTable;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordBuildStats {
    pub rows: RowSelection,
    pub keywords: ListParseStats,
}

#[derive(Debug, Clone, Default)]
pub struct KeywordBuild {
    pub keywords: Vec<Keyword>,
    pub movie_keywords: Vec<MovieKeyword>,
    pub stats: KeywordBuildStats,
}

pub fn build_keywords(raw: &RawTable, known: &HashSet<MovieId>) -> KeywordBuild {
    let col_keywords = raw.column_or_empty("keywords");
    let (rows, selection) = select_movie_rows(raw, known);
    let mut stats = KeywordBuildStats {
        rows: selection,
        ..Default::default()
    };

    let mut movie_keywords = Vec::new();
    for (row, movie_id) in rows {
        let parsed = parse_counted(raw.cell(row, col_keywords), &mut stats.keywords);
        movie_keywords.extend(parsed.names().map(|name| MovieKeyword {
            movie_id,
            keyword_name: name.to_string(),
        }));
    }

    let keywords = distinct_names(movie_keywords.iter().map(|k| k.keyword_name.as_str()))
        .into_iter()
        .map(|keyword_name| Keyword { keyword_name })
        .collect();

    KeywordBuild {
        keywords,
        movie_keywords,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_explode_into_bridge_and_distinct_dimension() {
        let raw = RawTable::parse(
            "keywords",
            "id,keywords\n\
             1,\"[{'id': 1, 'name': 'jealousy'}, {'id': 2, 'name': 'toy'}]\"\n\
             2,\"[{\"\"id\"\": 2, \"\"name\"\": \"\"toy\"\"}]\"\n\
             3,garbage\n",
            "utf-8",
        )
        .unwrap();
        let known = HashSet::from([MovieId(1), MovieId(2), MovieId(3)]);
        let build = build_keywords(&raw, &known);
        assert_eq!(build.movie_keywords.len(), 3);
        let names: Vec<&str> = build.keywords.iter().map(|k| k.keyword_name.as_str()).collect();
        assert_eq!(names, vec!["jealousy", "toy"]);
        assert_eq!(build.stats.keywords.unparseable, 1);
    }
}
