//! Sort-merge join: co-iterates two streams already sorted by
//! the same key, advancing whichever side currently holds the smaller key.
//!
//! The right-hand group of each aligned key is materialized into a `Vec<Row>`
//! so the Cartesian product can be replayed once per left row; the left side
//! is still streamed one row at a time, so only the right group's size counts
//! against the join's memory ceiling.

use crate::error::Result;
use crate::stream::RowStream;
use crate::value::{key_tuple, Row, Value};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::rc::Rc;

/// Controls what happens when one side of a key-aligned group is empty.
/// The Cartesian-product case (both sides non-empty) is the same for every
/// joiner, so it is not part of this trait.
pub trait Joiner {
    /// Emit the left group's rows unchanged when the right group is empty.
    fn emit_left_only(&self) -> bool;
    /// Emit the right group's rows unchanged when the left group is empty.
    fn emit_right_only(&self) -> bool;
}

pub struct InnerJoiner;
impl Joiner for InnerJoiner {
    fn emit_left_only(&self) -> bool {
        false
    }
    fn emit_right_only(&self) -> bool {
        false
    }
}

pub struct LeftJoiner;
impl Joiner for LeftJoiner {
    fn emit_left_only(&self) -> bool {
        true
    }
    fn emit_right_only(&self) -> bool {
        false
    }
}

pub struct RightJoiner;
impl Joiner for RightJoiner {
    fn emit_left_only(&self) -> bool {
        false
    }
    fn emit_right_only(&self) -> bool {
        true
    }
}

pub struct OuterJoiner;
impl Joiner for OuterJoiner {
    fn emit_left_only(&self) -> bool {
        true
    }
    fn emit_right_only(&self) -> bool {
        true
    }
}

/// The default suffixes applied to colliding non-key field names.
pub fn default_suffixes() -> (String, String) {
    ("_1".to_string(), "_2".to_string())
}

/// Combines one left row and one right row of an aligned key group.
///
/// Key columns are copied once; a non-key field present on both sides is
/// emitted twice, suffixed; a field unique to one side keeps its name.
fn combine_pair(keys: &HashSet<&String>, left: &Row, right: &Row, suffixes: &(String, String)) -> Row {
    let mut out = Row::default();
    for (k, v) in left.iter() {
        if keys.contains(k) {
            out.insert(k.clone(), v.clone());
        } else if right.contains_key(k) {
            out.insert(format!("{k}{}", suffixes.0), v.clone());
        } else {
            out.insert(k.clone(), v.clone());
        }
    }
    for (k, v) in right.iter() {
        if keys.contains(k) {
            continue;
        }
        if left.contains_key(k) {
            out.insert(format!("{k}{}", suffixes.1), v.clone());
        } else {
            out.insert(k.clone(), v.clone());
        }
    }
    out
}

struct Side {
    upstream: RowStream,
    lookahead: Option<Row>,
    exhausted: bool,
}

impl Side {
    fn new(upstream: RowStream) -> Self {
        Side {
            upstream,
            lookahead: None,
            exhausted: false,
        }
    }

    fn peek_key(&mut self, keys: &[String]) -> Result<Option<Vec<Value>>> {
        if self.lookahead.is_none() && !self.exhausted {
            match self.upstream.next() {
                None => self.exhausted = true,
                Some(Err(e)) => return Err(e),
                Some(Ok(row)) => self.lookahead = Some(row),
            }
        }
        match &self.lookahead {
            None => Ok(None),
            Some(row) => Ok(Some(key_tuple(row, keys)?)),
        }
    }

    fn pop(&mut self) -> Row {
        self.lookahead.take().expect("pop called without a peeked row")
    }

    /// Drains every consecutive row whose key equals `key`.
    fn gather_group(&mut self, keys: &[String], key: &[Value]) -> Result<Vec<Row>> {
        let mut group = Vec::new();
        loop {
            match self.peek_key(keys)? {
                Some(k) if k == key => group.push(self.pop()),
                _ => break,
            }
        }
        Ok(group)
    }
}

struct JoinIter {
    left: Side,
    right: Side,
    keys: Rc<Vec<String>>,
    key_set: Rc<HashSet<String>>,
    joiner: Rc<dyn Joiner>,
    suffixes: Rc<(String, String)>,
    pending: VecDeque<Row>,
    done: bool,
}

impl Iterator for JoinIter {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Result<Row>> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Some(Ok(row));
            }
            if self.done {
                return None;
            }

            let lkey = match self.left.peek_key(&self.keys) {
                Ok(k) => k,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            let rkey = match self.right.peek_key(&self.keys) {
                Ok(k) => k,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            let key_set: HashSet<&String> = self.key_set.iter().collect();

            match (lkey, rkey) {
                (None, None) => {
                    self.done = true;
                    return None;
                }
                (Some(lk), None) => {
                    let group = match self.left.gather_group(&self.keys, &lk) {
                        Ok(g) => g,
                        Err(e) => {
                            self.done = true;
                            return Some(Err(e));
                        }
                    };
                    if self.joiner.emit_left_only() {
                        self.pending.extend(group);
                    }
                }
                (None, Some(rk)) => {
                    let group = match self.right.gather_group(&self.keys, &rk) {
                        Ok(g) => g,
                        Err(e) => {
                            self.done = true;
                            return Some(Err(e));
                        }
                    };
                    if self.joiner.emit_right_only() {
                        self.pending.extend(group);
                    }
                }
                (Some(lk), Some(rk)) => match lk.cmp(&rk) {
                    Ordering::Less => {
                        let group = match self.left.gather_group(&self.keys, &lk) {
                            Ok(g) => g,
                            Err(e) => {
                                self.done = true;
                                return Some(Err(e));
                            }
                        };
                        if self.joiner.emit_left_only() {
                            self.pending.extend(group);
                        }
                    }
                    Ordering::Greater => {
                        let group = match self.right.gather_group(&self.keys, &rk) {
                            Ok(g) => g,
                            Err(e) => {
                                self.done = true;
                                return Some(Err(e));
                            }
                        };
                        if self.joiner.emit_right_only() {
                            self.pending.extend(group);
                        }
                    }
                    Ordering::Equal => {
                        let right_group = match self.right.gather_group(&self.keys, &rk) {
                            Ok(g) => g,
                            Err(e) => {
                                self.done = true;
                                return Some(Err(e));
                            }
                        };
                        loop {
                            match self.left.peek_key(&self.keys) {
                                Ok(Some(k)) if k == lk => {
                                    let left_row = self.left.pop();
                                    for right_row in &right_group {
                                        self.pending.push_back(combine_pair(
                                            &key_set,
                                            &left_row,
                                            right_row,
                                            &self.suffixes,
                                        ));
                                    }
                                }
                                Ok(_) => break,
                                Err(e) => {
                                    self.done = true;
                                    return Some(Err(e));
                                }
                            }
                        }
                    }
                },
            }
        }
    }
}

pub(crate) fn join_stage(
    left: RowStream,
    right: RowStream,
    keys: Vec<String>,
    joiner: Rc<dyn Joiner>,
    suffixes: (String, String),
) -> RowStream {
    let key_set: HashSet<String> = keys.iter().cloned().collect();
    Box::new(JoinIter {
        left: Side::new(left),
        right: Side::new(right),
        keys: Rc::new(keys),
        key_set: Rc::new(key_set),
        joiner,
        suffixes: Rc::new(suffixes),
        pending: VecDeque::new(),
        done: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    fn ok_rows(rows: Vec<Row>) -> RowStream {
        Box::new(rows.into_iter().map(Ok))
    }

    #[test]
    fn inner_join_emits_cartesian_product_and_drops_unmatched() {
        let left = ok_rows(vec![
            row! {"id" => Value::int(1), "name" => Value::str("alice")},
            row! {"id" => Value::int(2), "name" => Value::str("bob")},
        ]);
        let right = ok_rows(vec![
            row! {"id" => Value::int(1), "age" => Value::int(30)},
            row! {"id" => Value::int(3), "age" => Value::int(40)},
        ]);
        let out = join_stage(left, right, vec!["id".into()], Rc::new(InnerJoiner), default_suffixes());
        let rows: Vec<Row> = out.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], Value::str("alice"));
        assert_eq!(rows[0]["age"], Value::int(30));
    }

    #[test]
    fn left_join_keeps_unmatched_left_rows() {
        let left = ok_rows(vec![
            row! {"id" => Value::int(1)},
            row! {"id" => Value::int(2)},
        ]);
        let right = ok_rows(vec![row! {"id" => Value::int(1), "age" => Value::int(30)}]);
        let out = join_stage(left, right, vec!["id".into()], Rc::new(LeftJoiner), default_suffixes());
        let rows: Vec<Row> = out.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|r| r["id"] == Value::int(2) && !r.contains_key("age")));
    }

    #[test]
    fn right_exhausts_before_left() {
        let left = ok_rows(vec![
            row! {"id" => Value::int(1)},
            row! {"id" => Value::int(2)},
            row! {"id" => Value::int(3)},
        ]);
        let right = ok_rows(vec![row! {"id" => Value::int(1), "x" => Value::int(9)}]);
        let out = join_stage(left, right, vec!["id".into()], Rc::new(OuterJoiner), default_suffixes());
        let rows: Vec<Row> = out.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn left_exhausts_before_right() {
        let left = ok_rows(vec![row! {"id" => Value::int(1)}]);
        let right = ok_rows(vec![
            row! {"id" => Value::int(1), "x" => Value::int(9)},
            row! {"id" => Value::int(2), "x" => Value::int(10)},
        ]);
        let out = join_stage(left, right, vec!["id".into()], Rc::new(OuterJoiner), default_suffixes());
        let rows: Vec<Row> = out.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn both_sides_exhaust_simultaneously() {
        let left = ok_rows(vec![row! {"id" => Value::int(1)}]);
        let right = ok_rows(vec![row! {"id" => Value::int(1), "x" => Value::int(9)}]);
        let out = join_stage(left, right, vec!["id".into()], Rc::new(InnerJoiner), default_suffixes());
        let rows: Vec<Row> = out.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn non_key_collisions_are_suffixed() {
        let left = ok_rows(vec![row! {"id" => Value::int(1), "v" => Value::int(10)}]);
        let right = ok_rows(vec![row! {"id" => Value::int(1), "v" => Value::int(20)}]);
        let out = join_stage(left, right, vec!["id".into()], Rc::new(InnerJoiner), default_suffixes());
        let rows: Vec<Row> = out.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(rows[0]["v_1"], Value::int(10));
        assert_eq!(rows[0]["v_2"], Value::int(20));
        assert!(!rows[0].contains_key("v"));
    }
}
