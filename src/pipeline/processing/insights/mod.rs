//! Headline figures for the dashboard, derived from the curated tables.

pub mod contract;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::config::OutputFormat;
use crate::constants::GRAPH_INSIGHTS_TOP_COACTORS;
use crate::error::Result;
use crate::pipeline::processing::curate::mean;
use crate::pipeline::processing::profile::round2;
use crate::pipeline::storage::{read_table, table_path, ColumnKind, ColumnSpec, Table, Value};

use self::contract::{genre_stats_contract, overview_contract, year_trends_contract, ContractTable};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverviewKpis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movies_total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_rating_overall: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewSection {
    pub title: String,
    pub subtitle: String,
    pub kpis: OverviewKpis,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendKpis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_year_by_movies: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSection {
    pub intro: String,
    pub kpis: TrendKpis,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoiKpis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_genre_by_roi: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiSection {
    pub intro: String,
    pub data_quality_notes: Vec<String>,
    pub kpis: RoiKpis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoactorPair {
    pub actor_1: String,
    pub actor_2: String,
    pub shared_movies_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollabSection {
    pub intro: String,
    pub coactor_pairs: usize,
    pub top_pair: Option<CoactorPair>,
    pub top_pairs_preview: Vec<CoactorPair>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMissing {
    pub column: String,
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableQuality {
    pub rows: usize,
    pub cols: usize,
    /// Ten columns with the highest share of nulls.
    pub missing_pct: Vec<ColumnMissing>,
    pub dtypes: BTreeMap<String, ColumnKind>,
    pub missing_required_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub overview: OverviewSection,
    pub trends: TrendSection,
    pub roi: RoiSection,
    pub collab: CollabSection,
    pub data_quality: BTreeMap<String, TableQuality>,
}

fn ints(table: &Table, column: &str) -> Vec<i64> {
    table.column_values(column).into_iter().filter_map(Value::as_i64).collect()
}

fn floats(table: &Table, column: &str) -> Vec<f64> {
    table.column_values(column).into_iter().filter_map(Value::as_f64).collect()
}

pub fn overview_section(overview: Option<&Table>) -> OverviewSection {
    let mut kpis = OverviewKpis::default();
    let mut subtitle = vec!["Data source: The Movies Dataset.".to_string()];

    if let Some(table) = overview.filter(|t| !t.is_empty()) {
        kpis.movies_total = Some(table.len());
        subtitle.push(format!("Curated movies: {}.", table.len()));

        let years = ints(table, "release_year");
        if let (Some(min), Some(max)) = (years.iter().min(), years.iter().max()) {
            kpis.year_min = Some(*min);
            kpis.year_max = Some(*max);
            subtitle.push(format!("Period: {min}-{max}."));
        }
        kpis.avg_rating_overall =
            mean(floats(table, "avg_rating")).map(|v| (v * 1000.0).round() / 1000.0);
    }

    OverviewSection {
        title: "Movie & Collaboration Insights".to_string(),
        subtitle: subtitle.join(" "),
        kpis,
    }
}

pub fn trend_section(years: Option<&Table>) -> TrendSection {
    let mut kpis = TrendKpis::default();
    if let Some(table) = years.filter(|t| !t.is_empty()) {
        let year_values = ints(table, "release_year");
        let distinct: std::collections::BTreeSet<i64> = year_values.iter().copied().collect();
        kpis.years_count = Some(distinct.len());

        let (year_col, count_col) = (table.column_index("release_year"), table.column_index("movie_count"));
        if let (Some(y), Some(c)) = (year_col, count_col) {
            let mut best: Option<(i64, i64)> = None;
            for row in &table.rows {
                if let (Some(year), Some(count)) = (row[y].as_i64(), row[c].as_i64()) {
                    if best.map_or(true, |(_, top)| count > top) {
                        best = Some((year, count));
                    }
                }
            }
            kpis.top_year_by_movies = best.map(|(year, _)| year);
        }
    }
    TrendSection {
        intro: "Time series of movies and key metrics by release year.".to_string(),
        kpis,
    }
}

pub fn roi_section(overview: Option<&Table>, genres: Option<&Table>) -> RoiSection {
    let mut kpis = RoiKpis::default();
    let mut notes = Vec::new();

    if let Some(table) = genres.filter(|t| !t.is_empty()) {
        kpis.genres_count = Some(table.len());
        if let (Some(g), Some(r)) = (table.column_index("genre_name"), table.column_index("avg_roi")) {
            let mut best: Option<(&str, f64)> = None;
            for row in &table.rows {
                if let (Some(name), Some(roi)) = (row[g].as_str(), row[r].as_f64()) {
                    if best.map_or(true, |(_, top)| roi > top) {
                        best = Some((name, roi));
                    }
                }
            }
            kpis.top_genre_by_roi = best.map(|(name, _)| name.to_string());
        }
    }

    if let Some(table) = overview.filter(|t| !t.is_empty()) {
        let budgets: Vec<Option<f64>> = table.column_values("budget").into_iter().map(Value::as_f64).collect();
        let total = budgets.len() as f64;
        let missing_or_zero = budgets.iter().filter(|b| b.map_or(true, |v| v <= 0.0)).count() as f64;
        if missing_or_zero / total > 0.05 {
            notes.push("Note: many budgets are missing/<=0, ROI can be distorted.".to_string());
        }
        let valid: Vec<f64> = budgets.into_iter().flatten().collect();
        if !valid.is_empty() {
            let small = valid.iter().filter(|v| **v < 100_000.0).count() as f64;
            if small / valid.len() as f64 > 0.05 {
                notes.push("Note: very small budgets (<100k) can create extreme ROI outliers.".to_string());
            }
        }
    }

    RoiSection {
        intro: "ROI & Success: compare budget, revenue, and ROI across genres.".to_string(),
        data_quality_notes: notes,
        kpis,
    }
}

fn coactor_schema() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("actor_1", ColumnKind::Text),
        ColumnSpec::new("actor_2", ColumnKind::Text),
        ColumnSpec::new("shared_movies_count", ColumnKind::Int),
    ]
}

/// Co-actor pairs exported from the graph database, when someone has put them in place.
pub fn collab_section(pairs: Option<&Table>) -> CollabSection {
    let Some(table) = pairs.filter(|t| !t.is_empty()) else {
        return CollabSection {
            intro: format!(
                "Graph insights file not found. Export the co-actor query from the graph database and store it as {GRAPH_INSIGHTS_TOP_COACTORS} in the curated directory."
            ),
            coactor_pairs: 0,
            top_pair: None,
            top_pairs_preview: Vec::new(),
        };
    };

    let mut rows: Vec<CoactorPair> = table
        .rows
        .iter()
        .filter_map(|row| {
            Some(CoactorPair {
                actor_1: row[0].as_str()?.to_string(),
                actor_2: row[1].as_str()?.to_string(),
                shared_movies_count: row[2].as_i64()?,
            })
        })
        .collect();
    rows.sort_by(|a, b| b.shared_movies_count.cmp(&a.shared_movies_count));

    CollabSection {
        intro: format!("Top {} co-actor pairs based on shared movies.", rows.len()),
        coactor_pairs: rows.len(),
        top_pair: rows.first().cloned(),
        top_pairs_preview: rows.iter().take(10).cloned().collect(),
    }
}

pub fn table_quality(table: &Table, missing_required: &[String]) -> TableQuality {
    let rows = table.len();
    let mut missing: Vec<ColumnMissing> = table
        .columns
        .iter()
        .map(|spec| {
            let nulls = table.column_values(&spec.name).iter().filter(|v| v.is_null()).count();
            let pct = if rows == 0 { 0.0 } else { round2(nulls as f64 / rows as f64 * 100.0) };
            ColumnMissing {
                column: spec.name.clone(),
                pct,
            }
        })
        .collect();
    missing.sort_by(|a, b| b.pct.total_cmp(&a.pct));
    missing.truncate(10);

    TableQuality {
        rows,
        cols: table.columns.len(),
        missing_pct: if rows == 0 { Vec::new() } else { missing },
        dtypes: table.columns.iter().map(|c| (c.name.clone(), c.kind)).collect(),
        missing_required_columns: missing_required.to_vec(),
    }
}

fn table_of(loaded: &Option<ContractTable>) -> Option<&Table> {
    loaded.as_ref().map(|c| &c.table)
}

pub fn build_insights(curated_dir: &Path, format: OutputFormat) -> Result<Insights> {
    let overview = overview_contract().load(curated_dir, format)?;
    let years = year_trends_contract().load(curated_dir, format)?;
    let genres = genre_stats_contract().load(curated_dir, format)?;
    let coactors = if table_path(curated_dir, GRAPH_INSIGHTS_TOP_COACTORS, format).exists() {
        Some(ContractTable {
            table: read_table(curated_dir, GRAPH_INSIGHTS_TOP_COACTORS, &coactor_schema(), format)?,
            missing_required: Vec::new(),
        })
    } else {
        None
    };

    let mut data_quality = BTreeMap::new();
    for loaded in [&overview, &years, &genres, &coactors].into_iter().flatten() {
        data_quality.insert(
            loaded.table.name.clone(),
            table_quality(&loaded.table, &loaded.missing_required),
        );
    }

    let insights = Insights {
        overview: overview_section(table_of(&overview)),
        trends: trend_section(table_of(&years)),
        roi: roi_section(table_of(&overview), table_of(&genres)),
        collab: collab_section(table_of(&coactors)),
        data_quality,
    };
    info!(tables = insights.data_quality.len(), "Built dashboard insights");
    Ok(insights)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[(&str, ColumnKind)], rows: Vec<Vec<Value>>) -> Table {
        let mut t = Table::new(
            "t",
            columns.iter().map(|(n, k)| ColumnSpec::new(*n, *k)).collect(),
        );
        t.rows = rows;
        t
    }

    #[test]
    fn test_overview_kpis() {
        let t = table(
            &[("release_year", ColumnKind::Int), ("avg_rating", ColumnKind::Float)],
            vec![
                vec![Value::Int(1995), Value::Float(3.5)],
                vec![Value::Int(2001), Value::Null],
                vec![Value::Null, Value::Float(4.0)],
            ],
        );
        let section = overview_section(Some(&t));
        assert_eq!(section.kpis.movies_total, Some(3));
        assert_eq!(section.kpis.year_min, Some(1995));
        assert_eq!(section.kpis.year_max, Some(2001));
        assert_eq!(section.kpis.avg_rating_overall, Some(3.75));
        assert!(section.subtitle.contains("Period: 1995-2001."));
    }

    #[test]
    fn test_busiest_year_and_top_roi_genre() {
        let years = table(
            &[("release_year", ColumnKind::Int), ("movie_count", ColumnKind::Int)],
            vec![
                vec![Value::Int(1999), Value::Int(4)],
                vec![Value::Int(2000), Value::Int(9)],
                vec![Value::Int(2001), Value::Int(9)],
            ],
        );
        assert_eq!(trend_section(Some(&years)).kpis.top_year_by_movies, Some(2000));

        let genres = table(
            &[("genre_name", ColumnKind::Text), ("avg_roi", ColumnKind::Float)],
            vec![
                vec![Value::Text("Action".into()), Value::Float(1.5)],
                vec![Value::Text("Horror".into()), Value::Float(7.0)],
                vec![Value::Text("Drama".into()), Value::Null],
            ],
        );
        let roi = roi_section(None, Some(&genres));
        assert_eq!(roi.kpis.top_genre_by_roi.as_deref(), Some("Horror"));
        assert_eq!(roi.kpis.genres_count, Some(3));
    }

    #[test]
    fn test_budget_notes() {
        let overview = table(
            &[("budget", ColumnKind::Float)],
            vec![
                vec![Value::Float(0.0)],
                vec![Value::Float(5_000.0)],
                vec![Value::Float(50_000_000.0)],
            ],
        );
        let roi = roi_section(Some(&overview), None);
        assert_eq!(roi.data_quality_notes.len(), 2);
    }

    #[test]
    fn test_missing_collab_file_yields_placeholder() {
        let collab = collab_section(None);
        assert_eq!(collab.coactor_pairs, 0);
        assert!(collab.intro.contains(GRAPH_INSIGHTS_TOP_COACTORS));
    }

    #[test]
    fn test_table_quality_orders_by_missing_share() {
        let t = table(
            &[("a", ColumnKind::Int), ("b", ColumnKind::Int)],
            vec![vec![Value::Int(1), Value::Null], vec![Value::Int(2), Value::Null]],
        );
        let q = table_quality(&t, &[]);
        assert_eq!(q.missing_pct[0].column, "b");
        assert_eq!(q.missing_pct[0].pct, 100.0);
        assert_eq!(q.cols, 2);
    }
}
