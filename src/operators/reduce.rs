//! `Reduce`: scans a pre-sorted upstream and feeds each contiguous key-group
//! to a [`Reducer`].
//!
//! Group boundaries are defined purely by inequality of consecutive key
//! tuples — the upstream is assumed already sorted by `keys` (normally via a
//! preceding [`crate::operators::sort`]). A group is handed to the reducer as
//! a single-pass iterator sharing the upstream, rather than a materialized
//! vector, so a reducer that only needs O(1) state (`Count`, `Sum`, `Mean`)
//! never buffers the group; a reducer that stops
//! early (`FirstReducer`) still leaves the shared cursor correctly
//! positioned, because the stage drains any rows of the group the reducer
//! didn't consume itself.

use crate::error::{Error, Result};
use crate::stream::RowStream;
use crate::value::{key_tuple, Row, Value};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// A function applied to one group at a time, emitting zero or more rows.
///
/// `rows` yields exactly the rows of the current group, in upstream order;
/// the reducer need not consume it to exhaustion.
pub trait Reducer {
    fn reduce(&self, keys: &[String], rows: &mut dyn Iterator<Item = Result<Row>>) -> Result<Vec<Row>>;
}

struct GroupState {
    upstream: RowStream,
    current_key: Option<Vec<Value>>,
    lookahead: Option<Row>,
    finished: bool,
}

/// Iterates exactly the rows of `state`'s current group.
struct GroupRows {
    state: Rc<RefCell<GroupState>>,
    keys: Rc<Vec<String>>,
}

impl Iterator for GroupRows {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Result<Row>> {
        let mut state = self.state.borrow_mut();
        if state.lookahead.is_none() && !state.finished {
            match state.upstream.next() {
                None => state.finished = true,
                Some(Err(e)) => return Some(Err(e)),
                Some(Ok(row)) => state.lookahead = Some(row),
            }
        }
        let row = state.lookahead.take()?;
        let key = match key_tuple(&row, &self.keys) {
            Ok(k) => k,
            Err(e) => return Some(Err(e)),
        };
        if Some(&key) == state.current_key.as_ref() {
            Some(Ok(row))
        } else {
            state.lookahead = Some(row);
            None
        }
    }
}

fn drain_group(state: &Rc<RefCell<GroupState>>, keys: &Rc<Vec<String>>) -> Result<()> {
    let mut rest = GroupRows {
        state: state.clone(),
        keys: keys.clone(),
    };
    while let Some(row) = rest.next() {
        row?;
    }
    Ok(())
}

struct ReduceIter {
    state: Rc<RefCell<GroupState>>,
    keys: Rc<Vec<String>>,
    reducer: Rc<dyn Reducer>,
    pending: VecDeque<Row>,
    exhausted: bool,
}

impl Iterator for ReduceIter {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Result<Row>> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Some(Ok(row));
            }
            if self.exhausted {
                return None;
            }

            let next_key = {
                let mut state = self.state.borrow_mut();
                if state.lookahead.is_none() && !state.finished {
                    match state.upstream.next() {
                        None => state.finished = true,
                        Some(Err(e)) => {
                            self.exhausted = true;
                            return Some(Err(e));
                        }
                        Some(Ok(row)) => state.lookahead = Some(row),
                    }
                }
                let Some(row) = state.lookahead.as_ref() else {
                    self.exhausted = true;
                    return None;
                };
                match key_tuple(row, &self.keys) {
                    Ok(key) => key,
                    Err(e) => {
                        self.exhausted = true;
                        return Some(Err(e));
                    }
                }
            };

            {
                let mut state = self.state.borrow_mut();
                if let Some(previous) = &state.current_key {
                    if next_key < *previous {
                        self.exhausted = true;
                        return Some(Err(Error::OutOfOrder {
                            keys: (*self.keys).clone(),
                            index: 0,
                        }));
                    }
                }
                state.current_key = Some(next_key);
            }

            let mut group_rows = GroupRows {
                state: self.state.clone(),
                keys: self.keys.clone(),
            };
            let outputs = match self.reducer.reduce(&self.keys, &mut group_rows) {
                Ok(outputs) => outputs,
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            };
            if let Err(e) = drain_group(&self.state, &self.keys) {
                self.exhausted = true;
                return Some(Err(e));
            }
            self.pending.extend(outputs);
        }
    }
}

pub(crate) fn reduce_stage(upstream: RowStream, reducer: Rc<dyn Reducer>, keys: Vec<String>) -> RowStream {
    Box::new(ReduceIter {
        state: Rc::new(RefCell::new(GroupState {
            upstream,
            current_key: None,
            lookahead: None,
            finished: false,
        })),
        keys: Rc::new(keys),
        reducer,
        pending: VecDeque::new(),
        exhausted: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::reducers::FirstReducer;
    use crate::row;
    use crate::value::Value;

    fn ok_rows(rows: Vec<Row>) -> RowStream {
        Box::new(rows.into_iter().map(Ok))
    }

    #[test]
    fn reduce_without_sort_consistency() {
        let input = ok_rows(vec![
            row! {"k" => Value::int(1), "v" => Value::int(10)},
            row! {"k" => Value::int(1), "v" => Value::int(20)},
            row! {"k" => Value::int(2), "v" => Value::int(30)},
        ]);
        let out = reduce_stage(input, Rc::new(FirstReducer), vec!["k".into()]);
        let rows: Result<Vec<Row>> = out.collect();
        let rows = rows.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["v"], Value::int(10));
        assert_eq!(rows[1]["v"], Value::int(30));
    }

    #[test]
    fn empty_key_groups_everything() {
        let input = ok_rows(vec![
            row! {"v" => Value::int(1)},
            row! {"v" => Value::int(2)},
        ]);
        let out = reduce_stage(input, Rc::new(FirstReducer), vec![]);
        let rows: Result<Vec<Row>> = out.collect();
        assert_eq!(rows.unwrap().len(), 1);
    }

    #[test]
    fn out_of_order_key_is_reported() {
        let input = ok_rows(vec![
            row! {"k" => Value::int(2)},
            row! {"k" => Value::int(1)},
        ]);
        let out = reduce_stage(input, Rc::new(FirstReducer), vec!["k".into()]);
        let rows: Vec<Result<Row>> = out.collect();
        assert!(matches!(rows.last(), Some(Err(Error::OutOfOrder { .. }))));
    }
}
