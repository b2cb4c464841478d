//! Parser for the loose literal notation some exports use for embedded lists.
//!
//! Accepted forms: single- or double-quoted strings with backslash escapes,
//! `None`/`True`/`False` (and their JSON spellings), integers and floats,
//! lists, tuples and dicts, trailing commas. Adjacent string literals are
//! concatenated. The result is expressed as a `serde_json::Value`, tuples
//! becoming arrays.

use serde_json::{Map, Number, Value};
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at offset {position}")]
pub struct LiteralError {
    pub position: usize,
    pub message: String,
}

pub fn parse_literal(input: &str) -> Result<Value, LiteralError> {
    let mut parser = Parser {
        chars: input.chars().peekable(),
        position: 0,
    };
    parser.skip_whitespace();
    let value = parser.value()?;
    parser.skip_whitespace();
    if parser.chars.peek().is_some() {
        return Err(parser.error("trailing characters"));
    }
    Ok(value)
}

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
    position: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: &str) -> LiteralError {
        LiteralError {
            position: self.position,
            message: message.to_string(),
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.position += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn expect(&mut self, wanted: char) -> Result<(), LiteralError> {
        match self.bump() {
            Some(c) if c == wanted => Ok(()),
            _ => Err(self.error(&format!("expected '{wanted}'"))),
        }
    }

    fn value(&mut self) -> Result<Value, LiteralError> {
        match self.chars.peek().copied() {
            Some('[') => {
                self.bump();
                self.sequence(']')
            }
            Some('(') => {
                self.bump();
                self.sequence(')')
            }
            Some('{') => {
                self.bump();
                self.dict()
            }
            Some('\'') | Some('"') => self.strings().map(Value::String),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_alphabetic() => self.word(),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn sequence(&mut self, close: char) -> Result<Value, LiteralError> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.chars.peek() == Some(&close) {
                self.bump();
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some(c) if c == close => return Ok(Value::Array(items)),
                _ => return Err(self.error("expected ',' or closing bracket")),
            }
        }
    }

    fn dict(&mut self) -> Result<Value, LiteralError> {
        let mut map = Map::new();
        loop {
            self.skip_whitespace();
            if self.chars.peek() == Some(&'}') {
                self.bump();
                return Ok(Value::Object(map));
            }
            let key = match self.value()? {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => "None".to_string(),
                _ => return Err(self.error("unhashable dict key")),
            };
            self.skip_whitespace();
            self.expect(':')?;
            self.skip_whitespace();
            let value = self.value()?;
            map.insert(key, value);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(Value::Object(map)),
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    /// One or more adjacent quoted strings, concatenated.
    fn strings(&mut self) -> Result<String, LiteralError> {
        let mut out = self.string()?;
        loop {
            self.skip_whitespace();
            match self.chars.peek() {
                Some('\'') | Some('"') => out.push_str(&self.string()?),
                _ => return Ok(out),
            }
        }
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        let quote = self.bump().ok_or_else(|| self.error("expected string"))?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => {
                    let escaped = self.bump().ok_or_else(|| self.error("dangling escape"))?;
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        '\\' | '\'' | '"' => out.push(escaped),
                        'x' => out.push(self.code_point(2)?),
                        'u' => out.push(self.code_point(4)?),
                        'U' => out.push(self.code_point(8)?),
                        '\n' => {}
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn code_point(&mut self, digits: usize) -> Result<char, LiteralError> {
        let mut hex = String::with_capacity(digits);
        for _ in 0..digits {
            hex.push(self.bump().ok_or_else(|| self.error("truncated escape"))?);
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error("invalid escape"))
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.' | '_') {
                if c != '_' {
                    text.push(c);
                }
                self.bump();
            } else {
                break;
            }
        }
        if let Ok(v) = text.parse::<i64>() {
            return Ok(Value::Number(v.into()));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| self.error("invalid number"))
    }

    fn word(&mut self) -> Result<Value, LiteralError> {
        let mut word = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        match word.as_str() {
            "None" | "null" => Ok(Value::Null),
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            _ => Err(self.error("unknown name")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_quoted_dict_list() {
        let parsed = parse_literal("[{'id': 16, 'name': 'Animation'}, {'id': 35, 'name': 'Comedy'}]").unwrap();
        assert_eq!(
            parsed,
            json!([{"id": 16, "name": "Animation"}, {"id": 35, "name": "Comedy"}])
        );
    }

    #[test]
    fn test_embedded_apostrophe_in_double_quotes() {
        let parsed = parse_literal(r#"[{'character': "Woody's friend", 'order': 0}]"#).unwrap();
        assert_eq!(parsed, json!([{"character": "Woody's friend", "order": 0}]));
    }

    #[test]
    fn test_python_constants_tuples_and_trailing_commas() {
        let parsed = parse_literal("({'a': None, 'b': True, 'c': -1.5,},)").unwrap();
        assert_eq!(parsed, json!([{"a": null, "b": true, "c": -1.5}]));
    }

    #[test]
    fn test_escapes() {
        assert_eq!(parse_literal(r"'it\'s'").unwrap(), json!("it's"));
        assert_eq!(parse_literal(r"'caf\xe9'").unwrap(), json!("café"));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_literal("[{'id': 1").is_err());
        assert!(parse_literal("not a list").is_err());
        assert!(parse_literal("[1] extra").is_err());
    }

    #[test]
    fn test_error_reports_offset() {
        let err = parse_literal("[1] extra").unwrap_err();
        assert_eq!(err.position, 4);
        assert_eq!(err.to_string(), "trailing characters at offset 4");
    }
}
