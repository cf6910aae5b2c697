//! `Map`: flat-maps a pure per-row function across a stream.

use crate::error::Result;
use crate::stream::RowStream;
use crate::value::Row;
use std::rc::Rc;

/// A pure row-to-rows function: zero, one, or many output rows per input row.
pub trait Mapper {
    fn apply(&self, row: Row) -> Result<Vec<Row>>;
}

/// Wraps a caller-supplied closure as a [`Mapper`].
pub struct UserMap<F>(pub F);

impl<F> Mapper for UserMap<F>
where
    F: Fn(Row) -> Result<Vec<Row>>,
{
    fn apply(&self, row: Row) -> Result<Vec<Row>> {
        (self.0)(row)
    }
}

/// Flat-maps `mapper` across the upstream, lazily.
pub(crate) fn map_stage(upstream: RowStream, mapper: Rc<dyn Mapper>) -> RowStream {
    Box::new(MapIter {
        upstream,
        mapper,
        pending: Vec::new().into_iter(),
    })
}

struct MapIter {
    upstream: RowStream,
    mapper: Rc<dyn Mapper>,
    pending: std::vec::IntoIter<Row>,
}

impl Iterator for MapIter {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.pending.next() {
                return Some(Ok(row));
            }
            match self.upstream.next()? {
                Ok(row) => match self.mapper.apply(row) {
                    Ok(rows) => self.pending = rows.into_iter(),
                    Err(e) => return Some(Err(e)),
                },
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
