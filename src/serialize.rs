//! The default on-disk row format.
//!
//! Each line of a row file is one row, written as a mapping literal —
//! `{'key': value, ...}`. Values may be integers, floats, strings, booleans,
//! `(lon, lat)` coordinate pairs, lists, or nested mappings. Parsing and
//! rendering are both pluggable: a [`crate::sources::FileSource`] takes any
//! `Fn(&str) -> Result<Row>`, of which [`parse_row`] is only the default.

use crate::error::{Error, Result};
use crate::value::Value;
use std::fmt::Write as _;

/// A cursor over a string with the lexing conveniences the literal grammar needs.
struct LexBuf<'a> {
    buf: &'a str,
    pos: usize,
}

impl<'a> LexBuf<'a> {
    fn new(buf: &'a str) -> Self {
        LexBuf { buf, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.buf[self.pos..].chars().next()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.pos += c.len_utf8();
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.next();
        }
    }

    fn consume(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.next();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ch: char) -> Result<()> {
        self.skip_whitespace();
        if self.consume(ch) {
            Ok(())
        } else {
            Err(parse_err(format!(
                "expected {ch:?} at position {}",
                self.pos
            )))
        }
    }

    fn take_while(&mut self, mut predicate: impl FnMut(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if predicate(c) {
                self.next();
            } else {
                break;
            }
        }
        &self.buf[start..self.pos]
    }
}

fn parse_err(message: impl Into<String>) -> Error {
    Error::Parse {
        path: "<string>".into(),
        line: 0,
        message: message.into(),
    }
}

/// Parses one line of the default row text form into a [`crate::value::Row`].
pub fn parse_row(line: &str) -> Result<crate::value::Row> {
    let mut buf = LexBuf::new(line.trim());
    let value = parse_value(&mut buf)?;
    match value {
        Value::Map(entries) => Ok(entries.into_iter().collect()),
        _ => Err(parse_err("top-level value must be a mapping")),
    }
}

fn parse_value(buf: &mut LexBuf) -> Result<Value> {
    buf.skip_whitespace();
    match buf.peek() {
        Some('{') => parse_map(buf),
        Some('[') => parse_list(buf),
        Some('(') => parse_tuple(buf),
        Some('\'') | Some('"') => Ok(Value::Str(parse_string(buf)?)),
        Some(c) if c.is_ascii_digit() || c == '-' || c == '+' => parse_number(buf),
        Some(_) => parse_keyword(buf),
        None => Err(parse_err("unexpected end of input")),
    }
}

fn parse_map(buf: &mut LexBuf) -> Result<Value> {
    buf.expect('{')?;
    let mut entries = Vec::new();
    buf.skip_whitespace();
    if buf.consume('}') {
        return Ok(Value::Map(entries));
    }
    loop {
        buf.skip_whitespace();
        let key = match buf.peek() {
            Some('\'') | Some('"') => parse_string(buf)?,
            _ => return Err(parse_err("expected a string key")),
        };
        buf.expect(':')?;
        let value = parse_value(buf)?;
        entries.push((key, value));
        buf.skip_whitespace();
        if buf.consume(',') {
            buf.skip_whitespace();
            if buf.peek() == Some('}') {
                buf.next();
                break;
            }
            continue;
        }
        buf.expect('}')?;
        break;
    }
    Ok(Value::Map(entries))
}

fn parse_list(buf: &mut LexBuf) -> Result<Value> {
    buf.expect('[')?;
    let items = parse_sequence_items(buf, ']')?;
    Ok(Value::List(items))
}

/// Parses a parenthesized literal. A two-element numeric tuple is the
/// `(lon, lat)` coordinate form; anything else is a generic list,
/// so that the grammar stays closed under round-tripping arbitrary output.
fn parse_tuple(buf: &mut LexBuf) -> Result<Value> {
    buf.expect('(')?;
    let items = parse_sequence_items(buf, ')')?;
    if let [a, b] = items.as_slice() {
        if let (Some(lon), Some(lat)) = (a.as_f64(), b.as_f64()) {
            return Ok(Value::point(lon, lat));
        }
    }
    Ok(Value::List(items))
}

fn parse_sequence_items(buf: &mut LexBuf, close: char) -> Result<Vec<Value>> {
    let mut items = Vec::new();
    buf.skip_whitespace();
    if buf.consume(close) {
        return Ok(items);
    }
    loop {
        items.push(parse_value(buf)?);
        buf.skip_whitespace();
        if buf.consume(',') {
            buf.skip_whitespace();
            if buf.peek() == Some(close) {
                buf.next();
                break;
            }
            continue;
        }
        buf.expect(close)?;
        break;
    }
    Ok(items)
}

fn parse_string(buf: &mut LexBuf) -> Result<String> {
    let quote = buf.next().ok_or_else(|| parse_err("expected a quote"))?;
    let mut s = String::new();
    loop {
        match buf.next() {
            None => return Err(parse_err("unterminated string literal")),
            Some(c) if c == quote => break,
            Some('\\') => match buf.next() {
                Some('n') => s.push('\n'),
                Some('t') => s.push('\t'),
                Some(c) => s.push(c),
                None => return Err(parse_err("unterminated escape sequence")),
            },
            Some(c) => s.push(c),
        }
    }
    Ok(s)
}

fn parse_number(buf: &mut LexBuf) -> Result<Value> {
    let text = buf.take_while(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'));
    if text.contains('.') || text.contains('e') || text.contains('E') {
        text.parse::<f64>()
            .map(Value::float)
            .map_err(|e| parse_err(format!("invalid float {text:?}: {e}")))
    } else {
        text.parse::<i64>()
            .map(Value::Int)
            .map_err(|e| parse_err(format!("invalid integer {text:?}: {e}")))
    }
}

fn parse_keyword(buf: &mut LexBuf) -> Result<Value> {
    let text = buf.take_while(|c| c.is_alphanumeric() || c == '_');
    match text {
        "True" | "true" => Ok(Value::Bool(true)),
        "False" | "false" => Ok(Value::Bool(false)),
        "None" | "null" => Ok(Value::List(Vec::new())),
        other => Err(parse_err(format!("unrecognized literal {other:?}"))),
    }
}

/// Renders a [`crate::value::Row`] back into the default text form.
///
/// `render_row(parse_row(s)?)` is not guaranteed to equal `s` byte-for-byte
/// (field order is not preserved, since `Row` is an unordered map), but
/// re-parsing the rendered text yields an equal row.
pub fn render_row(row: &crate::value::Row) -> String {
    let mut out = String::from("{");
    for (i, (key, value)) in row.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{key:?}: {}", render_value(value));
    }
    out.push('}');
    out
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Map(entries) => {
            let mut out = String::from("{");
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{k:?}: {}", render_value(v));
            }
            out.push('}');
            out
        }
        other => other.to_string(),
    }
}
