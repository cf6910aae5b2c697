//! The built-in reducers.

use super::reduce::Reducer;
use crate::error::{Error, Result};
use crate::value::{Row, Value};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Emits the first row of the group, unchanged.
pub struct FirstReducer;

impl Reducer for FirstReducer {
    fn reduce(&self, _keys: &[String], rows: &mut dyn Iterator<Item = Result<Row>>) -> Result<Vec<Row>> {
        match rows.next() {
            Some(row) => Ok(vec![row?]),
            None => Ok(vec![]),
        }
    }
}

fn key_columns_of(row: &Row, keys: &[String]) -> Row {
    keys.iter()
        .filter_map(|k| row.get(k).map(|v| (k.clone(), v.clone())))
        .collect()
}

/// One row: the key columns of the last row in the group, plus `out = |group|`.
pub struct Count {
    pub out: String,
}

impl Count {
    pub fn new(out: impl Into<String>) -> Self {
        Count { out: out.into() }
    }
}

impl Reducer for Count {
    fn reduce(&self, keys: &[String], rows: &mut dyn Iterator<Item = Result<Row>>) -> Result<Vec<Row>> {
        let mut count = 0usize;
        let mut last = None;
        for row in rows {
            let row = row?;
            count += 1;
            last = Some(row);
        }
        let Some(last) = last else { return Ok(vec![]) };
        let mut out = key_columns_of(&last, keys);
        out.insert(self.out.clone(), Value::Int(count as i64));
        Ok(vec![out])
    }
}

/// Adds (or tracks) whether every summed value so far has been an `Int`.
struct NumericAccumulator {
    total: f64,
    all_ints: bool,
    count: usize,
}

impl NumericAccumulator {
    fn new() -> Self {
        NumericAccumulator {
            total: 0.0,
            all_ints: true,
            count: 0,
        }
    }

    fn push(&mut self, value: &Value, field: &str) -> Result<()> {
        if !matches!(value, Value::Int(_)) {
            self.all_ints = false;
        }
        let n = value.as_f64().ok_or_else(|| Error::TypeMismatch {
            field: field.to_string(),
            message: "expected a numeric field".into(),
        })?;
        self.total += n;
        self.count += 1;
        Ok(())
    }

    fn sum_value(&self) -> Value {
        if self.all_ints {
            Value::Int(self.total as i64)
        } else {
            Value::float(self.total)
        }
    }
}

/// One row: the key columns of the last row, with `col` replaced by the sum
/// of `row[col]` over the group.
pub struct Sum {
    pub col: String,
}

impl Sum {
    pub fn new(col: impl Into<String>) -> Self {
        Sum { col: col.into() }
    }
}

impl Reducer for Sum {
    fn reduce(&self, keys: &[String], rows: &mut dyn Iterator<Item = Result<Row>>) -> Result<Vec<Row>> {
        let mut acc = NumericAccumulator::new();
        let mut last = None;
        for row in rows {
            let row = row?;
            let value = row.get(&self.col).ok_or_else(|| Error::MissingField(self.col.clone()))?;
            acc.push(value, &self.col)?;
            last = Some(row);
        }
        let Some(last) = last else { return Ok(vec![]) };
        let mut out = key_columns_of(&last, keys);
        out.insert(self.col.clone(), acc.sum_value());
        Ok(vec![out])
    }
}

/// One row: key columns of the last row, with `out` = arithmetic mean of
/// `row[col]` over the group. The mean is always a `Float`, regardless of
/// whether the inputs were integral, matching true division.
pub struct Mean {
    pub col: String,
    pub out: String,
}

impl Mean {
    pub fn new(col: impl Into<String>, out: impl Into<String>) -> Self {
        Mean {
            col: col.into(),
            out: out.into(),
        }
    }
}

impl Reducer for Mean {
    fn reduce(&self, keys: &[String], rows: &mut dyn Iterator<Item = Result<Row>>) -> Result<Vec<Row>> {
        let mut acc = NumericAccumulator::new();
        let mut last = None;
        for row in rows {
            let row = row?;
            let value = row.get(&self.col).ok_or_else(|| Error::MissingField(self.col.clone()))?;
            acc.push(value, &self.col)?;
            last = Some(row);
        }
        let Some(last) = last else { return Ok(vec![]) };
        let mut out = key_columns_of(&last, keys);
        out.insert(self.out.clone(), Value::float(acc.total / acc.count as f64));
        Ok(vec![out])
    }
}

/// For each distinct value of `words_column` in the group, emits
/// `{K-fields, out: n_w / n_group, words_column: w}`.
///
/// The group need not be sorted by `words_column` — a plain tally keyed by
/// the word value itself is correct regardless of row order, since only the
/// final per-word count matters.
pub struct TermFrequency {
    pub words_column: String,
    pub out: String,
}

impl TermFrequency {
    pub fn new(words_column: impl Into<String>) -> Self {
        TermFrequency::with_output(words_column, "tf")
    }

    pub fn with_output(words_column: impl Into<String>, out: impl Into<String>) -> Self {
        TermFrequency {
            words_column: words_column.into(),
            out: out.into(),
        }
    }
}

impl Reducer for TermFrequency {
    fn reduce(&self, keys: &[String], rows: &mut dyn Iterator<Item = Result<Row>>) -> Result<Vec<Row>> {
        let mut tally: HashMap<Value, usize> = HashMap::new();
        // Preserve first-seen order of distinct words so output is deterministic.
        let mut order: Vec<Value> = Vec::new();
        let mut size = 0usize;
        let mut main_part = None;
        for row in rows {
            let row = row?;
            let word = row
                .get(&self.words_column)
                .ok_or_else(|| Error::MissingField(self.words_column.clone()))?
                .clone();
            if !tally.contains_key(&word) {
                order.push(word.clone());
            }
            *tally.entry(word).or_insert(0) += 1;
            size += 1;
            main_part = Some(row);
        }
        let Some(main_part) = main_part else { return Ok(vec![]) };
        let base = key_columns_of(&main_part, keys);
        let mut out = Vec::with_capacity(order.len());
        for word in order {
            let n_w = tally[&word];
            let mut row = base.clone();
            row.insert(self.out.clone(), Value::float(n_w as f64 / size as f64));
            row.insert(self.words_column.clone(), word);
            out.push(row);
        }
        Ok(out)
    }
}

/// Emits up to `n` rows of the group with the largest `row[col]`, descending.
///
/// Keeps a bounded min-heap of size `n` — the only reducer allowed more than
/// O(1) per-group state.
pub struct TopN {
    pub col: String,
    pub n: usize,
}

impl TopN {
    pub fn new(col: impl Into<String>, n: usize) -> Self {
        TopN { col: col.into(), n }
    }
}

impl Reducer for TopN {
    fn reduce(&self, _keys: &[String], rows: &mut dyn Iterator<Item = Result<Row>>) -> Result<Vec<Row>> {
        if self.n == 0 {
            for row in rows {
                row?;
            }
            return Ok(vec![]);
        }
        let mut heap: BinaryHeap<Reverse<(Value, usize)>> = BinaryHeap::with_capacity(self.n);
        let mut storage: Vec<Option<Row>> = Vec::new();
        for row in rows {
            let row = row?;
            let value = row
                .get(&self.col)
                .cloned()
                .ok_or_else(|| Error::MissingField(self.col.clone()))?;
            let seq = storage.len();
            storage.push(Some(row));
            if heap.len() < self.n {
                heap.push(Reverse((value, seq)));
            } else if let Some(&Reverse((ref min_value, min_seq))) = heap.peek() {
                if value > *min_value {
                    heap.pop();
                    storage[min_seq] = None;
                    heap.push(Reverse((value, seq)));
                } else {
                    storage[seq] = None;
                }
            }
        }
        let mut kept: Vec<(Value, usize)> = heap.into_iter().map(|Reverse(t)| t).collect();
        // Descending by value; ties broken by first-seen order, for determinism.
        kept.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        Ok(kept
            .into_iter()
            .map(|(_, seq)| storage[seq].take().expect("kept row was evicted"))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    fn ok(rows: Vec<Row>) -> Vec<Result<Row>> {
        rows.into_iter().map(Ok).collect()
    }

    #[test]
    fn count_emits_group_size() {
        let rows = ok(vec![
            row! {"k" => Value::int(1)},
            row! {"k" => Value::int(1)},
            row! {"k" => Value::int(1)},
        ]);
        let mut iter = rows.into_iter();
        let out = Count::new("n").reduce(&["k".into()], &mut iter).unwrap();
        assert_eq!(out[0]["n"], Value::Int(3));
        assert_eq!(out[0]["k"], Value::int(1));
    }

    #[test]
    fn mean_is_always_float() {
        let rows = ok(vec![
            row! {"v" => Value::int(1)},
            row! {"v" => Value::int(2)},
        ]);
        let mut iter = rows.into_iter();
        let out = Mean::new("v", "mean").reduce(&[], &mut iter).unwrap();
        assert_eq!(out[0]["mean"], Value::float(1.5));
    }

    #[test]
    fn term_frequency_tallies_by_word_regardless_of_order() {
        let rows = ok(vec![
            row! {"doc" => Value::int(1), "w" => Value::str("a")},
            row! {"doc" => Value::int(1), "w" => Value::str("b")},
            row! {"doc" => Value::int(1), "w" => Value::str("a")},
        ]);
        let mut iter = rows.into_iter();
        let out = TermFrequency::new("w")
            .reduce(&["doc".into()], &mut iter)
            .unwrap();
        assert_eq!(out.len(), 2);
        let a = out.iter().find(|r| r["w"] == Value::str("a")).unwrap();
        assert_eq!(a["tf"], Value::float(2.0 / 3.0));
    }

    #[test]
    fn top_n_orders_descending_and_bounds_size() {
        let rows = ok(vec![
            row! {"v" => Value::int(3)},
            row! {"v" => Value::int(1)},
            row! {"v" => Value::int(5)},
            row! {"v" => Value::int(2)},
        ]);
        let mut iter = rows.into_iter();
        let out = TopN::new("v", 2).reduce(&[], &mut iter).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["v"], Value::int(5));
        assert_eq!(out[1]["v"], Value::int(3));
    }
}
