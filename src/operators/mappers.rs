//! The built-in stateless per-row mappers.

use super::map::Mapper;
use crate::error::{Error, Result};
use crate::value::{Row, Value};
use regex::Regex;
use std::f64::consts::PI;

/// Characters stripped by [`FilterPunctuation`]: the fixed ASCII punctuation
/// set plus the Unicode curly quotation marks.
const PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~\u{201c}\u{201d}\u{2018}\u{2019}";

/// Removes every character in [`PUNCTUATION`] from the string at `col`.
pub struct FilterPunctuation {
    pub col: String,
}

impl FilterPunctuation {
    pub fn new(col: impl Into<String>) -> Self {
        FilterPunctuation { col: col.into() }
    }
}

impl Mapper for FilterPunctuation {
    fn apply(&self, mut row: Row) -> Result<Vec<Row>> {
        let value = field_str(&row, &self.col)?;
        let cleaned: String = value.chars().filter(|c| !PUNCTUATION.contains(*c)).collect();
        row.insert(self.col.clone(), Value::Str(cleaned));
        Ok(vec![row])
    }
}

/// Replaces `col`'s string value with its lowercased form.
pub struct LowerCase {
    pub col: String,
}

impl LowerCase {
    pub fn new(col: impl Into<String>) -> Self {
        LowerCase { col: col.into() }
    }
}

impl Mapper for LowerCase {
    fn apply(&self, mut row: Row) -> Result<Vec<Row>> {
        let value = field_str(&row, &self.col)?;
        row.insert(self.col.clone(), Value::Str(value.to_lowercase()));
        Ok(vec![row])
    }
}

/// Emits one row per fragment of `row[col]` split on a regex separator
/// (default `\s+`), preserving every other field. Empty fragments survive —
/// a leading or trailing separator produces an empty fragment, matching the
/// behavior of splitting on non-overlapping separator matches.
pub struct Split {
    pub col: String,
    separator: Regex,
}

impl Split {
    pub fn new(col: impl Into<String>) -> Result<Self> {
        Self::with_separator(col, r"\s+")
    }

    pub fn with_separator(col: impl Into<String>, separator: &str) -> Result<Self> {
        let separator = Regex::new(separator)
            .map_err(|e| Error::UserFunction(format!("invalid split separator: {e}")))?;
        Ok(Split {
            col: col.into(),
            separator,
        })
    }
}

impl Mapper for Split {
    fn apply(&self, row: Row) -> Result<Vec<Row>> {
        let text = field_str(&row, &self.col)?.to_string();
        let mut out = Vec::new();
        for fragment in self.separator.split(&text) {
            let mut fragment_row = row.clone();
            fragment_row.insert(self.col.clone(), Value::Str(fragment.to_string()));
            out.push(fragment_row);
        }
        Ok(out)
    }
}

/// Emits a row containing exactly the listed fields.
pub struct Project {
    pub cols: Vec<String>,
}

impl Project {
    pub fn new(cols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Project {
            cols: cols.into_iter().map(Into::into).collect(),
        }
    }
}

impl Mapper for Project {
    fn apply(&self, row: Row) -> Result<Vec<Row>> {
        let mut out = Row::default();
        for col in &self.cols {
            let value = row
                .get(col)
                .cloned()
                .ok_or_else(|| Error::MissingField(col.clone()))?;
            out.insert(col.clone(), value);
        }
        Ok(vec![out])
    }
}

/// Emits the row iff `predicate(&row)` returns `Ok(true)`.
pub struct Filter<F> {
    predicate: F,
}

impl<F> Filter<F>
where
    F: Fn(&Row) -> Result<bool>,
{
    pub fn new(predicate: F) -> Self {
        Filter { predicate }
    }
}

impl<F> Mapper for Filter<F>
where
    F: Fn(&Row) -> Result<bool>,
{
    fn apply(&self, row: Row) -> Result<Vec<Row>> {
        if (self.predicate)(&row)? {
            Ok(vec![row])
        } else {
            Ok(vec![])
        }
    }
}

/// Sets `row[out]` to the arithmetic product of `row[cols]`.
///
/// The result is an `Int` when every input is an `Int`, and a `Float`
/// otherwise, mirroring the source language's dynamic `*` operator.
pub struct Product {
    pub cols: Vec<String>,
    pub out: String,
}

impl Product {
    pub fn new(cols: impl IntoIterator<Item = impl Into<String>>, out: impl Into<String>) -> Self {
        Product {
            cols: cols.into_iter().map(Into::into).collect(),
            out: out.into(),
        }
    }
}

impl Mapper for Product {
    fn apply(&self, mut row: Row) -> Result<Vec<Row>> {
        let mut product = 1.0;
        let mut all_ints = true;
        for col in &self.cols {
            let value = row.get(col).ok_or_else(|| Error::MissingField(col.clone()))?;
            if !matches!(value, Value::Int(_)) {
                all_ints = false;
            }
            let n = value.as_f64().ok_or_else(|| Error::TypeMismatch {
                field: col.clone(),
                message: "Product requires numeric fields".into(),
            })?;
            product *= n;
        }
        let result = if all_ints {
            Value::Int(product as i64)
        } else {
            Value::float(product)
        };
        row.insert(self.out.clone(), result);
        Ok(vec![row])
    }
}

/// Earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6373.0;

/// Great-circle distance in kilometres between two `(lon, lat)` points.
pub struct Haversine {
    pub start_col: String,
    pub end_col: String,
    pub out: String,
}

impl Haversine {
    pub fn new(start_col: impl Into<String>, end_col: impl Into<String>, out: impl Into<String>) -> Self {
        Haversine {
            start_col: start_col.into(),
            end_col: end_col.into(),
            out: out.into(),
        }
    }
}

impl Mapper for Haversine {
    fn apply(&self, mut row: Row) -> Result<Vec<Row>> {
        let (lon1, lat1) = field_point(&row, &self.start_col)?;
        let (lon2, lat2) = field_point(&row, &self.end_col)?;
        let distance = haversine_km(lon1, lat1, lon2, lat2);
        row.insert(self.out.clone(), Value::float(distance));
        Ok(vec![row])
    }
}

/// `d = 2R asin(sqrt(h))`.
pub fn haversine_km(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (lambda1, phi1) = (to_radians(lon1), to_radians(lat1));
    let (lambda2, phi2) = (to_radians(lon2), to_radians(lat2));
    let h = ((phi2 - phi1) / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * ((lambda2 - lambda1) / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

fn to_radians(deg: f64) -> f64 {
    deg * PI / 180.0
}

fn field_str<'a>(row: &'a Row, col: &str) -> Result<&'a str> {
    row.get(col)
        .ok_or_else(|| Error::MissingField(col.to_string()))?
        .as_str()
        .ok_or_else(|| Error::TypeMismatch {
            field: col.to_string(),
            message: "expected a string".into(),
        })
}

fn field_point(row: &Row, col: &str) -> Result<(f64, f64)> {
    row.get(col)
        .ok_or_else(|| Error::MissingField(col.to_string()))?
        .as_point()
        .ok_or_else(|| Error::TypeMismatch {
            field: col.to_string(),
            message: "expected a (lon, lat) point".into(),
        })
}
