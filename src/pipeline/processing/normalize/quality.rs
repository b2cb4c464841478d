use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write;

use super::credits::CreditsBuildStats;
use super::keywords::KeywordBuildStats;
use super::list_field::ListParseStats;
use super::movies::MovieBuildStats;
use super::ratings::RatingsReconciliation;
use super::{NormalizedTables, RowSelection};
use crate::domain::MovieId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRowCount {
    pub table: String,
    pub rows: usize,
}

/// Rows removed before they reached a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedRows {
    pub movies_invalid_id: usize,
    pub movies_duplicate_id: usize,
    pub credits: RowSelection,
    pub keywords: RowSelection,
    pub cast_beyond_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformQuality {
    pub row_counts: Vec<TableRowCount>,
    pub movies_without_genre: usize,
    pub movies_without_cast: usize,
    pub movies_without_keywords: usize,
    pub budget_zero: usize,
    pub revenue_zero: usize,
    pub unparseable_release_dates: usize,
    pub dropped_rows: DroppedRows,
    /// Outcome counts per embedded list field, keyed `<table>.<column>`.
    pub list_parsing: BTreeMap<String, ListParseStats>,
    pub ratings_mapping: RatingsReconciliation,
}

/// Catalog movies with no row in a bridge.
pub fn movies_without(all: &HashSet<MovieId>, linked: impl IntoIterator<Item = MovieId>) -> usize {
    let linked: HashSet<MovieId> = linked.into_iter().collect();
    all.difference(&linked).count()
}

impl TransformQuality {
    pub fn assess(
        tables: &NormalizedTables,
        movie_stats: &MovieBuildStats,
        credit_stats: &CreditsBuildStats,
        keyword_stats: &KeywordBuildStats,
        ratings: &RatingsReconciliation,
    ) -> Self {
        let ids: HashSet<MovieId> = tables.movies.iter().map(|m| m.movie_id).collect();

        let list_parsing = BTreeMap::from([
            ("movies_metadata.genres".to_string(), movie_stats.genres.clone()),
            (
                "movies_metadata.production_companies".to_string(),
                movie_stats.production_companies.clone(),
            ),
            ("credits.cast".to_string(), credit_stats.cast.clone()),
            ("credits.crew".to_string(), credit_stats.crew.clone()),
            ("keywords.keywords".to_string(), keyword_stats.keywords.clone()),
        ]);

        Self {
            row_counts: tables
                .to_tables()
                .iter()
                .map(|t| TableRowCount {
                    table: t.name.clone(),
                    rows: t.len(),
                })
                .collect(),
            movies_without_genre: movies_without(&ids, tables.movie_genres.iter().map(|b| b.movie_id)),
            movies_without_cast: movies_without(&ids, tables.cast.iter().map(|b| b.movie_id)),
            movies_without_keywords: movies_without(&ids, tables.movie_keywords.iter().map(|b| b.movie_id)),
            budget_zero: tables.movies.iter().filter(|m| m.budget == Some(0.0)).count(),
            revenue_zero: tables.movies.iter().filter(|m| m.revenue == Some(0.0)).count(),
            unparseable_release_dates: movie_stats.unparseable_release_date,
            dropped_rows: DroppedRows {
                movies_invalid_id: movie_stats.invalid_id,
                movies_duplicate_id: movie_stats.duplicate_id,
                credits: credit_stats.rows.clone(),
                keywords: keyword_stats.rows.clone(),
                cast_beyond_limit: credit_stats.cast_truncated,
            },
            list_parsing,
            ratings_mapping: ratings.clone(),
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::from("# Transform Quality\n\n");
        // Writing into a String cannot fail.
        let _ = self.write_markdown(&mut md);
        md
    }

    fn write_markdown(&self, md: &mut String) -> std::fmt::Result {
        md.push_str("## Row Counts\n");
        for count in &self.row_counts {
            writeln!(md, "- {}: {}", count.table, count.rows)?;
        }

        md.push_str("\n## Coverage\n");
        writeln!(md, "- Movies without genre: {}", self.movies_without_genre)?;
        writeln!(md, "- Movies without cast: {}", self.movies_without_cast)?;
        writeln!(md, "- Movies without keywords: {}", self.movies_without_keywords)?;
        writeln!(md, "- Unparseable release dates: {}", self.unparseable_release_dates)?;

        md.push_str("\n## Budget/Revenue\n");
        writeln!(md, "- budget == 0: {}", self.budget_zero)?;
        writeln!(md, "- revenue == 0: {}", self.revenue_zero)?;

        let d = &self.dropped_rows;
        md.push_str("\n## Dropped Rows\n");
        writeln!(md, "- Movies with invalid id: {}", d.movies_invalid_id)?;
        writeln!(md, "- Duplicate movies: {}", d.movies_duplicate_id)?;
        for (label, sel) in [("Credits", &d.credits), ("Keywords", &d.keywords)] {
            writeln!(
                md,
                "- {label}: {} invalid id, {} without movie, {} duplicate",
                sel.invalid_id, sel.orphan, sel.duplicate
            )?;
        }
        writeln!(md, "- Cast entries beyond limit: {}", d.cast_beyond_limit)?;

        md.push_str("\n## List Parsing\n");
        md.push_str("| field | json | literal | quote_swapped | unparseable | not_a_list | missing |\n");
        md.push_str("|---|---|---|---|---|---|---|\n");
        for (field, s) in &self.list_parsing {
            writeln!(
                md,
                "| {field} | {} | {} | {} | {} | {} | {} |",
                s.json, s.literal, s.quote_swapped, s.unparseable, s.not_a_list, s.missing
            )?;
        }

        md.push('\n');
        write_reconciliation(md, &self.ratings_mapping)
    }
}

/// Markdown section shared by every report that carries the ratings log.
pub fn write_reconciliation(md: &mut String, log: &RatingsReconciliation) -> std::fmt::Result {
    md.push_str("## Ratings Mapping\n");
    writeln!(md, "- Key column: {}", log.key_column)?;
    writeln!(md, "- Movies matched via links (movieId -> tmdbId): {}", log.matched_movies)?;
    writeln!(md, "- Movies without ratings after mapping: {}", log.movies_without_ratings)?;
    writeln!(md, "- Ratings without movie metadata: {}", log.rated_movies_without_metadata)?;
    writeln!(
        md,
        "- Ratings rows: {} total, {} mapped, {} unmapped, {} invalid key, {} invalid rating",
        log.ratings_rows_total,
        log.ratings_rows_mapped,
        log.ratings_rows_unmapped,
        log.ratings_rows_invalid_key,
        log.ratings_rows_invalid_rating
    )?;
    writeln!(
        md,
        "- Mapping entries: {} ({} duplicate keys, {} invalid rows)",
        log.mapping_entries, log.mapping_duplicate_keys, log.mapping_rows_invalid
    )?;
    Ok(())
}
