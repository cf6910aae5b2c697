//! The dynamically-typed row model.
//!
//! Operators are generic across schemas, so a [`Row`] is a string-keyed map
//! from field name to a tagged [`Value`] rather than a fixed struct.

use fnv::FnvHashMap;
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::fmt;

/// A single dynamically-typed field value.
///
/// `Float` is stored as [`OrderedFloat`] so that `Value` (and hence a row's
/// key tuple) has a total order, as required for external sort and sort-merge
/// join to have well-defined behavior on arbitrary inputs.
#[derive(Clone, Debug, PartialEq, Hash)]
pub enum Value {
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
    Bool(bool),
    /// A `(lon, lat)` coordinate pair, as consumed by [`crate::operators::mappers::Haversine`].
    Point(OrderedFloat<f64>, OrderedFloat<f64>),
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
}

impl Value {
    pub fn int(v: i64) -> Self {
        Value::Int(v)
    }

    pub fn float(v: f64) -> Self {
        Value::Float(OrderedFloat(v))
    }

    pub fn str(v: impl Into<String>) -> Self {
        Value::Str(v.into())
    }

    pub fn point(lon: f64, lat: f64) -> Self {
        Value::Point(OrderedFloat(lon), OrderedFloat(lat))
    }

    /// The value as `f64`, widening `Int` and `Bool` as needed.
    ///
    /// Used by the arithmetic mappers and reducers (`Product`, `Sum`, `Mean`),
    /// which are defined over "numbers" without distinguishing int from float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(f.0),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a `(lon, lat)` pair. Accepts both the dedicated `Point`
    /// variant and a plain two-element numeric `List`, since on-disk data in
    /// the wild encodes coordinates as `[lon, lat]` as often as `(lon, lat)`.
    pub fn as_point(&self) -> Option<(f64, f64)> {
        match self {
            Value::Point(lon, lat) => Some((lon.0, lat.0)),
            Value::List(items) if items.len() == 2 => {
                Some((items[0].as_f64()?, items[1].as_f64()?))
            }
            _ => None,
        }
    }
}

impl Eq for Value {}

/// Lexicographic order over the tagged variants, consistent with `PartialEq`.
///
/// Values of different variants are ordered by a fixed variant rank so that
/// a key tuple with mismatched types per-position still has a total order
/// (this only matters if a caller compares rows with inconsistent schemas;
/// recipes never do).
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;
        match (self, other) {
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.cmp(b),
            (Int(a), Float(b)) => OrderedFloat(*a as f64).cmp(b),
            (Float(a), Int(b)) => a.cmp(&OrderedFloat(*b as f64)),
            (Str(a), Str(b)) => a.cmp(b),
            (Bool(a), Bool(b)) => a.cmp(b),
            (Point(a1, a2), Point(b1, b2)) => (a1, a2).cmp(&(b1, b2)),
            (List(a), List(b)) => a.cmp(b),
            (Map(a), Map(b)) => a.cmp(b),
            _ => variant_rank(self).cmp(&variant_rank(other)),
        }
    }
}

fn variant_rank(v: &Value) -> u8 {
    match v {
        Value::Int(_) => 0,
        Value::Float(_) => 1,
        Value::Str(_) => 2,
        Value::Bool(_) => 3,
        Value::Point(..) => 4,
        Value::List(_) => 5,
        Value::Map(_) => 6,
    }
}

/// Renders `x` so the text always carries a decimal point or exponent.
///
/// Rust's `{}` formats an integral float like `2.0` as `"2"`, which
/// [`parse_number`](crate::serialize::parse_number) would read back as an
/// `Int` — silently changing the value's type across a round trip (e.g. an
/// external-sort spill). Forcing a `.0` when the default formatting omits any
/// fractional or exponent marker keeps the on-disk form unambiguous.
fn format_float(x: f64) -> String {
    if !x.is_finite() {
        return format!("{x}");
    }
    let rendered = format!("{x}");
    if rendered.contains(['.', 'e', 'E']) {
        rendered
    } else {
        format!("{rendered}.0")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{}", format_float(x.0)),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Point(lon, lat) => write!(f, "({}, {})", format_float(lon.0), format_float(lat.0)),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k:?}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// A table row: an unordered mapping from field name to [`Value`].
///
/// Field lookup uses `fnv` hashing rather than the default SipHash, since row
/// field names are short, caller-controlled strings rather than adversarial
/// input.
pub type Row = FnvHashMap<String, Value>;

/// Builds a [`Row`] from `(name, value)` pairs, for tests and recipes.
#[macro_export]
macro_rules! row {
    ($($k:expr => $v:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut r: $crate::value::Row = ::std::collections::HashMap::default();
        $(r.insert($k.to_string(), $v);)*
        r
    }};
}

/// The ordered tuple of values a row projects to for a given key-column list.
pub fn key_tuple(row: &Row, keys: &[String]) -> crate::error::Result<Vec<Value>> {
    keys.iter()
        .map(|k| {
            row.get(k)
                .cloned()
                .ok_or_else(|| crate::error::Error::MissingField(k.clone()))
        })
        .collect()
}
