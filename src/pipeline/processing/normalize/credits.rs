use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;

use super::ids::json_id;
use super::list_field::{parse_counted, ListParseStats};
use super::{select_movie_rows, RowSelection};
use crate::domain::{Appearance, CrewCredit, DirectorCredit, MovieId, Person, PersonId};
use crate::pipeline::storage::raw::RawTable;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditsBuildStats {
    pub rows: RowSelection,
    pub cast: ListParseStats,
    pub crew: ListParseStats,
    /// Cast entries beyond the per-movie cap.
    pub cast_truncated: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CreditsBuild {
    pub cast: Vec<Appearance>,
    pub crew: Vec<CrewCredit>,
    pub directors: Vec<DirectorCredit>,
    pub persons: Vec<Person>,
    pub stats: CreditsBuildStats,
}

fn text(entry: &Map<String, Value>, key: &str) -> Option<String> {
    match entry.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn person_id(entry: &Map<String, Value>) -> Option<PersonId> {
    entry.get("id").and_then(json_id).map(PersonId)
}

pub fn is_director(job: Option<&str>) -> bool {
    job.is_some_and(|j| j.to_lowercase() == "director")
}

/// Builds cast, crew, director and person tables for the known movies.
///
/// Cast is ordered by billing `order` ascending (missing order sorts as 0,
/// ties keep list order) and capped at `max_cast` per movie.
pub fn build_credits(raw: &RawTable, known: &HashSet<MovieId>, max_cast: usize) -> CreditsBuild {
    let col_cast = raw.column_or_empty("cast");
    let col_crew = raw.column_or_empty("crew");
    let (rows, selection) = select_movie_rows(raw, known);

    let mut build = CreditsBuild {
        stats: CreditsBuildStats {
            rows: selection,
            ..Default::default()
        },
        ..Default::default()
    };

    for (row, movie_id) in rows {
        let cast = parse_counted(raw.cell(row, col_cast), &mut build.stats.cast);
        let mut members: Vec<&Map<String, Value>> = cast.objects().collect();
        members.sort_by_key(|m| m.get("order").and_then(json_id).unwrap_or(0));
        build.stats.cast_truncated += members.len().saturating_sub(max_cast);

        build
            .cast
            .extend(members.into_iter().take(max_cast).map(|m| Appearance {
                movie_id,
                person_id: person_id(m),
                person_name: text(m, "name"),
                character: text(m, "character"),
                cast_order: m.get("order").and_then(json_id),
            }));

        let crew = parse_counted(raw.cell(row, col_crew), &mut build.stats.crew);
        build.crew.extend(crew.objects().map(|m| CrewCredit {
            movie_id,
            person_id: person_id(m),
            person_name: text(m, "name"),
            job: text(m, "job"),
            department: text(m, "department"),
        }));
    }

    build.directors = build
        .crew
        .iter()
        .filter(|c| is_director(c.job.as_deref()))
        .map(|c| DirectorCredit {
            movie_id: c.movie_id,
            person_id: c.person_id,
            person_name: c.person_name.clone(),
        })
        .collect();

    let mut seen = HashSet::new();
    let appearances = build
        .cast
        .iter()
        .map(|a| (a.person_id, &a.person_name))
        .chain(build.crew.iter().map(|c| (c.person_id, &c.person_name)));
    for (id, name) in appearances {
        if let Some(id) = id {
            if seen.insert(id) {
                build.persons.push(Person {
                    person_id: id,
                    name: name.clone(),
                });
            }
        }
    }

    debug!(
        cast = build.cast.len(),
        crew = build.crew.len(),
        persons = build.persons.len(),
        "Built credit bridges"
    );
    build
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credits(body: &str) -> RawTable {
        RawTable::parse("credits", &format!("cast,crew,id\n{body}"), "utf-8").unwrap()
    }

    #[test]
    fn test_cast_sorted_by_order_and_capped() {
        let raw = credits(
            "\"[{'id': 3, 'name': 'C', 'character': 'c', 'order': 2}, {'id': 1, 'name': 'A', 'character': 'a', 'order': 0}, {'id': 2, 'name': 'B', 'character': 'b', 'order': 1}]\",[],10\n",
        );
        let known = HashSet::from([MovieId(10)]);
        let build = build_credits(&raw, &known, 2);
        let names: Vec<_> = build.cast.iter().map(|a| a.person_name.clone().unwrap()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(build.stats.cast_truncated, 1);
        assert_eq!(build.cast[1].cast_order, Some(1));
    }

    #[test]
    fn test_directors_and_person_union() {
        let raw = credits(
            "\"[{'id': 1, 'name': 'Tom', 'order': 0}]\",\"[{'id': 7, 'name': 'John', 'job': 'DIRECTOR', 'department': 'Directing'}, {'id': 1, 'name': 'Tom', 'job': 'Producer'}, {'id': 8, 'name': 'Ann', 'job': 'Editor'}]\",10\n",
        );
        let known = HashSet::from([MovieId(10)]);
        let build = build_credits(&raw, &known, 20);
        assert_eq!(build.crew.len(), 3);
        assert_eq!(build.directors.len(), 1);
        assert_eq!(build.directors[0].person_id, Some(PersonId(7)));
        let ids: Vec<i64> = build.persons.iter().map(|p| p.person_id.0).collect();
        assert_eq!(ids, vec![1, 7, 8]);
    }

    #[test]
    fn test_orphan_and_repeated_movies_are_dropped() {
        let raw = credits(
            "\"[{'id': 1, 'name': 'A'}]\",[],10\n\
             \"[{'id': 2, 'name': 'B'}]\",[],10\n\
             \"[{'id': 3, 'name': 'C'}]\",[],99\n\
             [],[],x\n",
        );
        let known = HashSet::from([MovieId(10)]);
        let build = build_credits(&raw, &known, 20);
        assert_eq!(build.cast.len(), 1);
        assert_eq!(build.stats.rows.duplicate, 1);
        assert_eq!(build.stats.rows.orphan, 1);
        assert_eq!(build.stats.rows.invalid_id, 1);
    }
}
