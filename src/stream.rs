//! The lazy row-stream abstraction.
//!
//! A row stream is "a finite lazy sequence of rows, single-pass". Rust's
//! `Iterator` already is exactly that — a single `next()` call returning an
//! optional item — so there is no bespoke stream trait here, just a type
//! alias over a boxed iterator and resource release via `Drop` on the
//! concrete adapters ([`crate::sources::FileSource`], the external-sort
//! run files) rather than an explicit `close()`.

use crate::error::Result;
use crate::value::Row;

/// A boxed, single-pass, forward-only sequence of rows.
///
/// Every operator consumes zero or more `RowStream`s and produces exactly one.
/// The implicit `'static` bound is what lets a [`crate::graph::Graph`] hold its
/// stage closures in an `Rc` and run them more than once.
pub type RowStream = Box<dyn Iterator<Item = Result<Row>>>;
