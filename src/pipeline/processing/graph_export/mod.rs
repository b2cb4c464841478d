//! Node and relationship files for the graph database bulk importer.
//!
//! Headers carry the importer's key annotations (`:ID(Label)`,
//! `:START_ID(Label)`, `:END_ID(Label)`, `:int`, `:float`). An edge is only
//! written when both of its endpoints exist as nodes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::GRAPH_IMPORT_ARGS_FILE;
use crate::domain::*;
use crate::error::Result;
use crate::pipeline::storage::{csv_store, Cell, ColumnKind, ColumnSpec, Table, Value};

/// Processed tables the exporter reads.
#[derive(Debug, Clone, Default)]
pub struct GraphInputs {
    pub movies: Vec<Movie>,
    pub persons: Vec<Person>,
    pub genres: Vec<Genre>,
    pub keywords: Vec<Keyword>,
    pub companies: Vec<Company>,
    pub cast: Vec<Appearance>,
    pub directors: Vec<DirectorCredit>,
    pub movie_genres: Vec<MovieGenre>,
    pub movie_keywords: Vec<MovieKeyword>,
    pub movie_companies: Vec<MovieCompany>,
    pub ratings: Vec<RatingAggregate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastSize {
    pub movie_id: MovieId,
    pub title: Option<String>,
    pub cast_entries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphExportSummary {
    pub nodes: Vec<LabelCount>,
    pub relationships: Vec<LabelCount>,
    /// Edges left out because an endpoint was null or not a node.
    pub dropped_relationships: Vec<LabelCount>,
    pub top_cast_by_movie: Vec<CastSize>,
}

impl GraphExportSummary {
    pub fn to_markdown(&self) -> String {
        let mut md = String::from("# Graph Export Summary\n\n");
        // Writing into a String cannot fail.
        let _ = self.write_markdown(&mut md);
        md
    }

    fn write_markdown(&self, md: &mut String) -> std::fmt::Result {
        md.push_str("## Nodes\n");
        for n in &self.nodes {
            writeln!(md, "- {}: {}", n.label, n.count)?;
        }
        md.push_str("\n## Relationships\n");
        for r in &self.relationships {
            writeln!(md, "- {}: {}", r.label, r.count)?;
        }
        md.push_str("\n## Dropped Relationships\n");
        for r in &self.dropped_relationships {
            writeln!(md, "- {}: {}", r.label, r.count)?;
        }
        md.push_str("\n## Top 5 Movies by Cast Count\n");
        for c in &self.top_cast_by_movie {
            writeln!(
                md,
                "- movie_id {} ({}): {} cast entries",
                c.movie_id,
                c.title.as_deref().unwrap_or("untitled"),
                c.cast_entries
            )?;
        }
        Ok(())
    }
}

/// A node or relationship file: importer label plus its table.
#[derive(Debug, Clone)]
pub struct GraphFile {
    pub label: &'static str,
    pub table: Table,
}

#[derive(Debug, Clone)]
pub struct GraphExport {
    pub nodes: Vec<GraphFile>,
    pub relationships: Vec<GraphFile>,
    pub summary: GraphExportSummary,
}

fn graph_table(name: &str, columns: &[(&str, ColumnKind)]) -> Table {
    Table::new(
        name,
        columns
            .iter()
            .map(|(col, kind)| ColumnSpec::new(*col, *kind))
            .collect(),
    )
}

/// Keyless edges are written once per distinct pair.
struct EdgeSet {
    table: Table,
    seen: HashSet<(String, String)>,
    dedupe: bool,
    dropped: usize,
}

impl EdgeSet {
    fn new(table: Table, dedupe: bool) -> Self {
        Self {
            table,
            seen: HashSet::new(),
            dedupe,
            dropped: 0,
        }
    }

    fn push(&mut self, row: Option<Vec<Value>>) {
        let Some(row) = row else {
            self.dropped += 1;
            return;
        };
        if self.dedupe && !self.seen.insert((row[0].to_string(), row[1].to_string())) {
            return;
        }
        self.table.rows.push(row);
    }
}

/// Name-keyed nodes, first occurrence of each name kept.
fn name_nodes<'a>(name: &str, header: &str, values: impl Iterator<Item = &'a str>) -> (Table, HashSet<String>) {
    let mut table = graph_table(name, &[(header, ColumnKind::Text)]);
    let mut seen = HashSet::new();
    for v in values {
        if seen.insert(v.to_string()) {
            table.rows.push(vec![Value::Text(v.to_string())]);
        }
    }
    (table, seen)
}

/// Movie-to-name edges. `movie_first` orders the columns; PRODUCED starts at the company.
fn name_edges<'a>(
    table: Table,
    movie_ids: &HashSet<MovieId>,
    names: &HashSet<String>,
    pairs: impl Iterator<Item = (MovieId, &'a str)>,
    movie_first: bool,
) -> EdgeSet {
    let mut edges = EdgeSet::new(table, true);
    for (movie, name) in pairs {
        let valid = movie_ids.contains(&movie) && names.contains(name);
        edges.push(valid.then(|| {
            let (m, n) = (movie.to_value(), Value::Text(name.to_string()));
            if movie_first {
                vec![m, n]
            } else {
                vec![n, m]
            }
        }));
    }
    edges
}

pub fn build_graph(inputs: &GraphInputs) -> GraphExport {
    let ratings: HashMap<MovieId, &RatingAggregate> =
        inputs.ratings.iter().map(|r| (r.movie_id, r)).collect();

    let mut movie_ids = HashSet::new();
    let mut nodes_movie = graph_table(
        "nodes_movie",
        &[
            ("movie_id:ID(Movie)", ColumnKind::Int),
            ("title", ColumnKind::Text),
            ("release_year:int", ColumnKind::Int),
            ("budget:float", ColumnKind::Float),
            ("revenue:float", ColumnKind::Float),
            ("avg_rating:float", ColumnKind::Float),
            ("rating_count:int", ColumnKind::Int),
        ],
    );
    for m in &inputs.movies {
        if !movie_ids.insert(m.movie_id) {
            continue;
        }
        let rating = ratings.get(&m.movie_id);
        nodes_movie.rows.push(vec![
            m.movie_id.to_value(),
            m.title.to_value(),
            m.release_year.to_value(),
            m.budget.to_value(),
            m.revenue.to_value(),
            rating.and_then(|r| r.avg_rating).to_value(),
            rating.map(|r| r.rating_count).to_value(),
        ]);
    }

    let mut person_ids = HashSet::new();
    let mut nodes_person = graph_table(
        "nodes_person",
        &[("person_id:ID(Person)", ColumnKind::Int), ("name", ColumnKind::Text)],
    );
    for p in &inputs.persons {
        if person_ids.insert(p.person_id) {
            nodes_person.rows.push(vec![p.person_id.to_value(), p.name.to_value()]);
        }
    }

    let (nodes_genre, genre_names) = name_nodes(
        "nodes_genre",
        "name:ID(Genre)",
        inputs.genres.iter().map(|g| g.genre_name.as_str()),
    );
    let (nodes_keyword, keyword_names) = name_nodes(
        "nodes_keyword",
        "name:ID(Keyword)",
        inputs.keywords.iter().map(|k| k.keyword_name.as_str()),
    );
    let (nodes_company, company_names) = name_nodes(
        "nodes_company",
        "name:ID(Company)",
        inputs.companies.iter().map(|c| c.company_name.as_str()),
    );

    let person_movie = |person: Option<PersonId>, movie: MovieId| {
        person
            .filter(|p| person_ids.contains(p) && movie_ids.contains(&movie))
            .map(|p| (p, movie))
    };

    let mut acted_in = EdgeSet::new(
        graph_table(
            "rel_ACTED_IN",
            &[
                (":START_ID(Person)", ColumnKind::Int),
                (":END_ID(Movie)", ColumnKind::Int),
                ("character", ColumnKind::Text),
                ("cast_order:int", ColumnKind::Int),
            ],
        ),
        false,
    );
    let mut cast_sizes: BTreeMap<MovieId, usize> = BTreeMap::new();
    for a in &inputs.cast {
        let edge = person_movie(a.person_id, a.movie_id);
        if let Some((_, movie)) = edge {
            *cast_sizes.entry(movie).or_default() += 1;
        }
        acted_in.push(edge.map(|(p, m)| {
            vec![p.to_value(), m.to_value(), a.character.to_value(), a.cast_order.to_value()]
        }));
    }

    let mut directed = EdgeSet::new(
        graph_table(
            "rel_DIRECTED",
            &[(":START_ID(Person)", ColumnKind::Int), (":END_ID(Movie)", ColumnKind::Int)],
        ),
        true,
    );
    for d in &inputs.directors {
        directed.push(person_movie(d.person_id, d.movie_id).map(|(p, m)| vec![p.to_value(), m.to_value()]));
    }

    let in_genre = name_edges(
        graph_table("rel_IN_GENRE", &[(":START_ID(Movie)", ColumnKind::Int), (":END_ID(Genre)", ColumnKind::Text)]),
        &movie_ids,
        &genre_names,
        inputs.movie_genres.iter().map(|b| (b.movie_id, b.genre_name.as_str())),
        true,
    );
    let has_keyword = name_edges(
        graph_table("rel_HAS_KEYWORD", &[(":START_ID(Movie)", ColumnKind::Int), (":END_ID(Keyword)", ColumnKind::Text)]),
        &movie_ids,
        &keyword_names,
        inputs.movie_keywords.iter().map(|b| (b.movie_id, b.keyword_name.as_str())),
        true,
    );
    let produced = name_edges(
        graph_table("rel_PRODUCED", &[(":START_ID(Company)", ColumnKind::Text), (":END_ID(Movie)", ColumnKind::Int)]),
        &movie_ids,
        &company_names,
        inputs.movie_companies.iter().map(|b| (b.movie_id, b.company_name.as_str())),
        false,
    );

    let titles: HashMap<MovieId, &Option<String>> = inputs.movies.iter().map(|m| (m.movie_id, &m.title)).collect();
    let mut ranked: Vec<(MovieId, usize)> = cast_sizes.into_iter().collect();
    // BTreeMap order is ascending id, so a stable sort keeps ties in id order.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let top_cast_by_movie = ranked
        .into_iter()
        .take(5)
        .map(|(movie_id, cast_entries)| CastSize {
            movie_id,
            title: titles.get(&movie_id).and_then(|t| (*t).clone()),
            cast_entries,
        })
        .collect();

    let nodes = vec![
        GraphFile { label: "Movie", table: nodes_movie },
        GraphFile { label: "Person", table: nodes_person },
        GraphFile { label: "Genre", table: nodes_genre },
        GraphFile { label: "Keyword", table: nodes_keyword },
        GraphFile { label: "Company", table: nodes_company },
    ];
    let edge_sets = [
        ("ACTED_IN", acted_in),
        ("DIRECTED", directed),
        ("IN_GENRE", in_genre),
        ("HAS_KEYWORD", has_keyword),
        ("PRODUCED", produced),
    ];

    let count = |label: &str, count: usize| LabelCount {
        label: label.to_string(),
        count,
    };
    let summary = GraphExportSummary {
        nodes: nodes.iter().map(|n| count(n.label, n.table.len())).collect(),
        relationships: edge_sets.iter().map(|(l, e)| count(*l, e.table.len())).collect(),
        dropped_relationships: edge_sets.iter().map(|(l, e)| count(*l, e.dropped)).collect(),
        top_cast_by_movie,
    };
    let relationships = edge_sets
        .into_iter()
        .map(|(label, edges)| GraphFile { label, table: edges.table })
        .collect();

    debug!(
        dropped = summary.dropped_relationships.iter().map(|d| d.count).sum::<usize>(),
        "Dropped edges with missing endpoints"
    );

    GraphExport {
        nodes,
        relationships,
        summary,
    }
}

/// Bulk import arguments, one per line, naming the files written next to it.
pub fn import_args(export: &GraphExport) -> String {
    let nodes = export
        .nodes
        .iter()
        .map(|n| format!("--nodes={}={}.csv\n", n.label, n.table.name));
    let relationships = export
        .relationships
        .iter()
        .map(|r| format!("--relationships={}={}.csv\n", r.label, r.table.name));
    nodes.chain(relationships).collect()
}

impl GraphExport {
    /// Writes every node and relationship file plus the import arguments.
    /// Always delimited text; the importer reads nothing else.
    pub fn write(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::new();
        for file in self.nodes.iter().chain(&self.relationships) {
            let path = dir.join(format!("{}.csv", file.table.name));
            csv_store::write(&file.table, &path)?;
            written.push(path);
        }
        let args_path = dir.join(GRAPH_IMPORT_ARGS_FILE);
        std::fs::write(&args_path, import_args(self))?;
        written.push(args_path);

        info!(files = written.len(), dir = %dir.display(), "Wrote graph import files");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: i64) -> Movie {
        Movie {
            movie_id: MovieId(id),
            title: Some(format!("M{id}")),
            release_year: Some(2000),
            original_language: None,
            budget: None,
            revenue: None,
            runtime: None,
            popularity: None,
            vote_average: None,
            vote_count: None,
            profit: None,
            roi: None,
        }
    }

    fn appearance(movie: i64, person: Option<i64>) -> Appearance {
        Appearance {
            movie_id: MovieId(movie),
            person_id: person.map(PersonId),
            person_name: None,
            character: Some("x".into()),
            cast_order: Some(0),
        }
    }

    fn inputs() -> GraphInputs {
        GraphInputs {
            movies: vec![movie(1), movie(2), movie(3)],
            persons: vec![
                Person { person_id: PersonId(10), name: Some("A".into()) },
                Person { person_id: PersonId(11), name: Some("B".into()) },
            ],
            genres: vec![Genre { genre_name: "Drama".into() }],
            cast: vec![
                appearance(1, Some(10)),
                appearance(1, Some(11)),
                appearance(2, Some(10)),
                appearance(3, Some(11)),
                appearance(1, None),
                appearance(99, Some(10)),
            ],
            movie_genres: vec![
                MovieGenre { movie_id: MovieId(1), genre_name: "Drama".into() },
                MovieGenre { movie_id: MovieId(1), genre_name: "Drama".into() },
                MovieGenre { movie_id: MovieId(2), genre_name: "Horror".into() },
            ],
            ratings: vec![RatingAggregate { movie_id: MovieId(1), avg_rating: Some(4.0), rating_count: 3 }],
            ..Default::default()
        }
    }

    #[test]
    fn test_edges_need_both_endpoints() {
        let export = build_graph(&inputs());
        let acted = &export.relationships[0];
        assert_eq!(acted.table.len(), 4);
        assert_eq!(export.summary.dropped_relationships[0].count, 2);

        let in_genre = &export.relationships[2];
        assert_eq!(in_genre.table.len(), 1);
        assert_eq!(export.summary.dropped_relationships[2].count, 1);
    }

    #[test]
    fn test_movie_nodes_carry_ratings_and_annotated_headers() {
        let export = build_graph(&inputs());
        let movies = &export.nodes[0].table;
        assert_eq!(movies.columns[0].name, "movie_id:ID(Movie)");
        assert_eq!(movies.rows[0][5], Value::Float(4.0));
        assert_eq!(movies.rows[1][6], Value::Null);
    }

    #[test]
    fn test_top_cast_breaks_ties_by_id() {
        let export = build_graph(&inputs());
        let top: Vec<(i64, usize)> = export
            .summary
            .top_cast_by_movie
            .iter()
            .map(|c| (c.movie_id.0, c.cast_entries))
            .collect();
        assert_eq!(top, vec![(1, 2), (2, 1), (3, 1)]);
    }

    #[test]
    fn test_summary_markdown_sections() {
        let md = build_graph(&inputs()).summary.to_markdown();
        assert!(md.starts_with("# Graph Export Summary\n\n## Nodes\n"));
        assert!(md.contains("\n## Dropped Relationships\n"));
        assert!(md.ends_with("- movie_id 3 (M3): 1 cast entries\n"));
    }

    #[test]
    fn test_import_args_list_every_file() {
        let export = build_graph(&inputs());
        let args = import_args(&export);
        assert!(args.contains("--nodes=Movie=nodes_movie.csv"));
        assert!(args.contains("--relationships=PRODUCED=rel_PRODUCED.csv"));
        assert_eq!(args.lines().count(), 10);
    }
}
