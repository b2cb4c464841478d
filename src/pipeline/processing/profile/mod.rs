//! Diagnostics over the raw inputs. Nothing here mutates a table.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline::processing::normalize::ids::coerce_id;
use crate::pipeline::storage::raw::{load_raw_inputs, RawInputs, RawTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    Int64,
    Float64,
    Object,
}

impl Dtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dtype::Int64 => "int64",
            Dtype::Float64 => "float64",
            Dtype::Object => "object",
        }
    }
}

/// Type a column would load as: integers only without gaps, floats when
/// every present cell is numeric, text otherwise.
pub fn infer_dtype<'a>(cells: impl Iterator<Item = Option<&'a str>>) -> Dtype {
    let mut all_int = true;
    let mut all_float = true;
    for cell in cells {
        match cell {
            None => all_int = false,
            Some(raw) => {
                let raw = raw.trim();
                if raw.parse::<i64>().is_err() {
                    all_int = false;
                    if raw.parse::<f64>().is_err() {
                        all_float = false;
                        break;
                    }
                }
            }
        }
    }
    if all_int {
        Dtype::Int64
    } else if all_float {
        Dtype::Float64
    } else {
        Dtype::Object
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub dtype: Dtype,
    pub missing_count: usize,
    /// Percentage of rows, rounded to two decimals.
    pub missing_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableProfile {
    pub name: String,
    pub encoding: String,
    pub rows: usize,
    pub columns: usize,
    pub column_names: Vec<String>,
    pub column_profiles: Vec<ColumnProfile>,
    pub duplicate_rows: usize,
    /// Estimated in-memory size of the decoded cells.
    pub memory_bytes: usize,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn profile_table(table: &RawTable) -> TableProfile {
    let rows = table.len();
    let column_profiles = table
        .headers
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let missing_count = table.column_cells(Some(i)).filter(Option::is_none).count();
            let missing_pct = if rows == 0 {
                0.0
            } else {
                round2(missing_count as f64 / rows as f64 * 100.0)
            };
            ColumnProfile {
                name: name.clone(),
                dtype: infer_dtype(table.column_cells(Some(i))),
                missing_count,
                missing_pct,
            }
        })
        .collect();

    let mut seen = HashSet::new();
    let duplicate_rows = table.rows.iter().filter(|row| !seen.insert(*row)).count();

    let cell_overhead = std::mem::size_of::<Option<String>>();
    let memory_bytes = table
        .rows
        .iter()
        .flatten()
        .map(|cell| cell_overhead + cell.as_ref().map_or(0, String::len))
        .sum();

    TableProfile {
        name: table.name.clone(),
        encoding: table.encoding.to_string(),
        rows,
        columns: table.headers.len(),
        column_names: table.headers.clone(),
        column_profiles,
        duplicate_rows,
        memory_bytes,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyOverlap {
    pub matches: usize,
    pub missing_in_right: usize,
    pub missing_in_left: usize,
}

impl KeyOverlap {
    pub fn compare(left: &HashSet<i64>, right: &HashSet<i64>) -> Self {
        Self {
            matches: left.intersection(right).count(),
            missing_in_right: left.difference(right).count(),
            missing_in_left: right.difference(left).count(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinChecks {
    pub movies_vs_credits: KeyOverlap,
    pub movies_vs_keywords: KeyOverlap,
}

fn id_set(table: &RawTable, column: &str) -> HashSet<i64> {
    table
        .column_cells(table.column_or_empty(column))
        .filter_map(|cell| cell.and_then(coerce_id))
        .collect()
}

pub fn join_checks(movies: &RawTable, credits: &RawTable, keywords: &RawTable) -> JoinChecks {
    let movie_ids = id_set(movies, "id");
    JoinChecks {
        movies_vs_credits: KeyOverlap::compare(&movie_ids, &id_set(credits, "id")),
        movies_vs_keywords: KeyOverlap::compare(&movie_ids, &id_set(keywords, "id")),
    }
}

/// Overlap between the ratings key space and the catalog, before and after mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingsKeyCheck {
    pub key_column_ratings: String,
    pub key_column_movies: String,
    /// Catalog ids that equal a raw ratings key. Expected near zero.
    pub direct_overlap: usize,
    pub requires_mapping: bool,
    pub mapped_matches: usize,
    pub movies_without_ratings_after_mapping: usize,
    pub ratings_without_movies_after_mapping: usize,
}

pub fn ratings_key_check(ratings: &RawTable, movies: &RawTable, links: &RawTable) -> RatingsKeyCheck {
    let movie_ids = id_set(movies, "id");
    let rating_keys = id_set(ratings, "movieId");
    // Every tmdbId in links, including ones a duplicate movieId would shadow.
    let mapped = id_set(links, "tmdbId");

    RatingsKeyCheck {
        key_column_ratings: "movieId (ratings)".to_string(),
        key_column_movies: "id (catalog)".to_string(),
        direct_overlap: movie_ids.intersection(&rating_keys).count(),
        requires_mapping: true,
        mapped_matches: movie_ids.intersection(&mapped).count(),
        movies_without_ratings_after_mapping: movie_ids.difference(&mapped).count(),
        ratings_without_movies_after_mapping: mapped.difference(&movie_ids).count(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProfileReport {
    pub files: Vec<TableProfile>,
    pub join_checks: JoinChecks,
    pub ratings_key_check: RatingsKeyCheck,
}

impl RawProfileReport {
    pub fn build(inputs: &RawInputs) -> Self {
        Self {
            files: inputs.tables().into_iter().map(profile_table).collect(),
            join_checks: join_checks(&inputs.movies, &inputs.credits, &inputs.keywords),
            ratings_key_check: ratings_key_check(&inputs.ratings, &inputs.movies, &inputs.links),
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::from("# Raw Data Profile\n\n");
        // Writing into a String cannot fail.
        let _ = self.write_markdown(&mut md);
        md
    }

    fn write_markdown(&self, md: &mut String) -> std::fmt::Result {
        for file in &self.files {
            writeln!(md, "## {}", file.name)?;
            writeln!(md, "- Encoding: {}", file.encoding)?;
            writeln!(md, "- Rows: {}", file.rows)?;
            writeln!(md, "- Columns: {}", file.columns)?;
            writeln!(md, "- Column names: {}", file.column_names.join(", "))?;
            let dtypes: Vec<String> = file
                .column_profiles
                .iter()
                .map(|c| format!("{}={}", c.name, c.dtype.as_str()))
                .collect();
            writeln!(md, "- Dtypes: {}", dtypes.join(", "))?;
            md.push_str("- Missing values:\n");
            for col in &file.column_profiles {
                writeln!(md, "  - {}: {} ({}%)", col.name, col.missing_count, col.missing_pct)?;
            }
            writeln!(md, "- Duplicate rows: {}", file.duplicate_rows)?;
            writeln!(md, "- Memory usage (bytes, estimated): {}\n", file.memory_bytes)?;
        }

        let join = &self.join_checks;
        md.push_str("## Join Checks\n");
        writeln!(
            md,
            "- Movies vs Credits: matches={}, missing_in_credits={}, missing_in_movies={}",
            join.movies_vs_credits.matches,
            join.movies_vs_credits.missing_in_right,
            join.movies_vs_credits.missing_in_left
        )?;
        writeln!(
            md,
            "- Movies vs Keywords: matches={}, missing_in_keywords={}, missing_in_movies={}",
            join.movies_vs_keywords.matches,
            join.movies_vs_keywords.missing_in_right,
            join.movies_vs_keywords.missing_in_left
        )?;

        let r = &self.ratings_key_check;
        writeln!(
            md,
            "- Ratings vs Movies (different ID spaces): ratings={}, movies={}",
            r.key_column_ratings, r.key_column_movies
        )?;
        writeln!(md, "- Direct overlap (should be low): {}", r.direct_overlap)?;
        writeln!(md, "- Mapping via links required: {}", r.requires_mapping)?;
        writeln!(md, "- Mapped matches (movieId -> tmdbId): {}", r.mapped_matches)?;
        writeln!(
            md,
            "- Movies without ratings after mapping: {}",
            r.movies_without_ratings_after_mapping
        )?;
        writeln!(
            md,
            "- Ratings without movies after mapping: {}",
            r.ratings_without_movies_after_mapping
        )?;
        Ok(())
    }
}

/// Loads the raw inputs and profiles them.
pub fn profile(config: &PipelineConfig) -> Result<RawProfileReport> {
    let inputs = load_raw_inputs(config)?;
    let report = RawProfileReport::build(&inputs);
    info!(
        tables = report.files.len(),
        direct_overlap = report.ratings_key_check.direct_overlap,
        mapped_matches = report.ratings_key_check.mapped_matches,
        "Profiled raw inputs"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, content: &str) -> RawTable {
        RawTable::parse(name, content, "utf-8").unwrap()
    }

    #[test]
    fn test_dtype_inference() {
        assert_eq!(infer_dtype([Some("1"), Some("2")].into_iter()), Dtype::Int64);
        assert_eq!(infer_dtype([Some("1"), None].into_iter()), Dtype::Float64);
        assert_eq!(infer_dtype([Some("1.5"), Some("2")].into_iter()), Dtype::Float64);
        assert_eq!(infer_dtype([None, None].into_iter()), Dtype::Float64);
        assert_eq!(infer_dtype([Some("1"), Some("x")].into_iter()), Dtype::Object);
    }

    #[test]
    fn test_profile_counts_missing_and_duplicates() {
        let t = table("t", "a,b\n1,\n1,\n2,x\n");
        let profile = profile_table(&t);
        assert_eq!(profile.rows, 3);
        assert_eq!(profile.duplicate_rows, 1);
        assert_eq!(profile.column_profiles[1].missing_count, 2);
        assert_eq!(profile.column_profiles[1].missing_pct, 66.67);
        assert_eq!(profile.column_profiles[0].dtype, Dtype::Int64);
        assert!(profile.memory_bytes > 0);
    }

    #[test]
    fn test_ratings_key_check_reports_both_spaces() {
        let movies = table("movies_metadata", "id\n862\n8844\n500\n");
        let ratings = table("ratings_small", "userId,movieId,rating\n1,1,4\n1,2,3\n");
        let links = table("links_small", "movieId,imdbId,tmdbId\n1,0,862\n2,0,8844\n3,0,77\n");
        let check = ratings_key_check(&ratings, &movies, &links);
        assert_eq!(check.direct_overlap, 0);
        assert_eq!(check.mapped_matches, 2);
        assert_eq!(check.movies_without_ratings_after_mapping, 1);
        assert_eq!(check.ratings_without_movies_after_mapping, 1);
    }

    #[test]
    fn test_ratings_key_check_counts_every_linked_tmdb_id() {
        let movies = table("movies_metadata", "id\n862\n8844\n");
        let ratings = table("ratings_small", "userId,movieId,rating\n1,1,4\n");
        let links = table("links_small", "movieId,imdbId,tmdbId\n1,0,862\n1,0,8844\n2,0,\n");
        let check = ratings_key_check(&ratings, &movies, &links);
        assert_eq!(check.mapped_matches, 2);
        assert_eq!(check.movies_without_ratings_after_mapping, 0);
        assert_eq!(check.ratings_without_movies_after_mapping, 0);
    }

    #[test]
    fn test_markdown_lists_each_file_and_key_check() {
        let movies = table("movies_metadata", "id\n862\n");
        let links = table("links_small", "movieId,imdbId,tmdbId\n1,0,862\n");
        let ratings = table("ratings_small", "userId,movieId,rating\n1,1,4\n");
        let report = RawProfileReport {
            files: vec![profile_table(&movies)],
            join_checks: JoinChecks::default(),
            ratings_key_check: ratings_key_check(&ratings, &movies, &links),
        };
        let md = report.to_markdown();
        assert!(md.starts_with("# Raw Data Profile\n\n## movies_metadata\n"));
        assert!(md.contains("- Mapped matches (movieId -> tmdbId): 1\n"));
        assert!(md.ends_with("- Ratings without movies after mapping: 0\n"));
    }

    #[test]
    fn test_join_checks_compare_catalog_ids() {
        let movies = table("m", "id\n1\n2\n3\n");
        let credits = table("c", "id\n1\n2.0\n9\n");
        let keywords = table("k", "id\n1\n");
        let checks = join_checks(&movies, &credits, &keywords);
        assert_eq!(checks.movies_vs_credits, KeyOverlap { matches: 2, missing_in_right: 1, missing_in_left: 1 });
        assert_eq!(checks.movies_vs_keywords.missing_in_right, 2);
    }
}
