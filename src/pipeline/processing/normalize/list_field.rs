//! Lenient parsing of list-of-object fields embedded in CSV cells.
//!
//! The same logical list shows up as strict JSON, as the looser literal form,
//! or as literal text that only parses once quotes are swapped. Each form is a
//! separate attempt; the first one that parses wins.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::literal::parse_literal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListFormat {
    Json,
    Literal,
    QuoteSwapped,
}

pub type ListAttempt = fn(&str) -> Option<Value>;

/// Attempts in the order they are tried.
pub const LIST_ATTEMPTS: [(ListFormat, ListAttempt); 3] = [
    (ListFormat::Json, parse_json),
    (ListFormat::Literal, parse_loose_literal),
    (ListFormat::QuoteSwapped, parse_quote_swapped),
];

pub fn parse_json(raw: &str) -> Option<Value> {
    serde_json::from_str(raw).ok()
}

pub fn parse_loose_literal(raw: &str) -> Option<Value> {
    parse_literal(raw).ok()
}

pub fn parse_quote_swapped(raw: &str) -> Option<Value> {
    serde_json::from_str(&raw.replace('\'', "\"")).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOutcome {
    /// The cell was empty.
    Missing,
    Parsed(ListFormat),
    /// Parsed, but the value was not a list.
    NotAList(ListFormat),
    /// No attempt could parse the text.
    Unparseable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedList {
    pub items: Vec<Value>,
    pub outcome: ListOutcome,
}

impl ParsedList {
    pub fn format(&self) -> Option<ListFormat> {
        match self.outcome {
            ListOutcome::Parsed(format) | ListOutcome::NotAList(format) => Some(format),
            _ => None,
        }
    }

    /// The `name` of every object item, in order, skipping blank names.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.items
            .iter()
            .filter_map(|item| item.get("name").and_then(Value::as_str))
            .filter(|name| !name.is_empty())
    }

    /// Object items only; scalars inside the list are ignored.
    pub fn objects(&self) -> impl Iterator<Item = &serde_json::Map<String, Value>> + '_ {
        self.items.iter().filter_map(Value::as_object)
    }
}

/// Parses an embedded list field. Never fails: unusable input yields an empty list.
pub fn parse_list_field(raw: Option<&str>) -> ParsedList {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return ParsedList {
            items: Vec::new(),
            outcome: ListOutcome::Missing,
        };
    };

    for (format, attempt) in LIST_ATTEMPTS {
        if let Some(value) = attempt(raw) {
            return match value {
                Value::Array(items) => ParsedList {
                    items,
                    outcome: ListOutcome::Parsed(format),
                },
                _ => ParsedList {
                    items: Vec::new(),
                    outcome: ListOutcome::NotAList(format),
                },
            };
        }
    }

    ParsedList {
        items: Vec::new(),
        outcome: ListOutcome::Unparseable,
    }
}

/// Outcome counts for one embedded field across a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParseStats {
    pub missing: usize,
    pub json: usize,
    pub literal: usize,
    pub quote_swapped: usize,
    pub unparseable: usize,
    /// Parsed successfully but held something other than a list.
    pub not_a_list: usize,
}

impl ListParseStats {
    pub fn observe(&mut self, parsed: &ParsedList) {
        match parsed.outcome {
            ListOutcome::Missing => self.missing += 1,
            ListOutcome::Unparseable => self.unparseable += 1,
            ListOutcome::NotAList(_) => self.not_a_list += 1,
            ListOutcome::Parsed(_) => {}
        }
        match parsed.format() {
            Some(ListFormat::Json) => self.json += 1,
            Some(ListFormat::Literal) => self.literal += 1,
            Some(ListFormat::QuoteSwapped) => self.quote_swapped += 1,
            None => {}
        }
    }

    pub fn total(&self) -> usize {
        self.missing + self.json + self.literal + self.quote_swapped + self.unparseable
    }
}

/// Parses a field and records the outcome in `stats`.
pub fn parse_counted(raw: Option<&str>, stats: &mut ListParseStats) -> ParsedList {
    let parsed = parse_list_field(raw);
    stats.observe(&parsed);
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_is_tried_first() {
        let parsed = parse_list_field(Some(r#"[{"id": 28, "name": "Action"}]"#));
        assert_eq!(parsed.format(), Some(ListFormat::Json));
        assert_eq!(parsed.names().collect::<Vec<_>>(), vec!["Action"]);
    }

    #[test]
    fn test_literal_form_matches_json_equivalent() {
        let json = parse_list_field(Some(r#"[{"id": 28, "name": "Action"}, {"id": 18, "name": "Drama"}]"#));
        let literal = parse_list_field(Some("[{'id': 28, 'name': 'Action'}, {'id': 18, 'name': 'Drama'}]"));
        assert_eq!(literal.format(), Some(ListFormat::Literal));
        assert_eq!(json.items, literal.items);
    }

    #[test]
    fn test_quote_swap_rescues_unbalanced_literal() {
        // Mixed quoting the literal parser rejects, but JSON accepts after swapping.
        let raw = r#"[{'name': "Drama'}]"#;
        assert!(parse_loose_literal(raw).is_none());
        let parsed = parse_list_field(Some(raw));
        assert_eq!(parsed.format(), Some(ListFormat::QuoteSwapped));
        assert_eq!(parsed.items, vec![json!({"name": "Drama"})]);
    }

    #[test]
    fn test_non_list_and_garbage_yield_empty() {
        let dict = parse_list_field(Some(r#"{"name": "Action"}"#));
        assert!(dict.items.is_empty());
        assert_eq!(dict.outcome, ListOutcome::NotAList(ListFormat::Json));

        let garbage = parse_list_field(Some("[{'id': 1, 'name': "));
        assert!(garbage.items.is_empty());
        assert_eq!(garbage.outcome, ListOutcome::Unparseable);

        let missing = parse_list_field(None);
        assert_eq!(missing.outcome, ListOutcome::Missing);
    }

    #[test]
    fn test_stats_count_each_outcome() {
        let mut stats = ListParseStats::default();
        parse_counted(Some("[]"), &mut stats);
        parse_counted(Some("[{'name': 'A'}]"), &mut stats);
        parse_counted(Some("{}"), &mut stats);
        parse_counted(Some("???"), &mut stats);
        parse_counted(None, &mut stats);
        assert_eq!(stats.json, 2);
        assert_eq!(stats.literal, 1);
        assert_eq!(stats.not_a_list, 1);
        assert_eq!(stats.unparseable, 1);
        assert_eq!(stats.missing, 1);
        assert_eq!(stats.total(), 5);
    }
}
