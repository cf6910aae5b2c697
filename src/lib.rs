//! A lazy, single-threaded, pull-based computational-graph engine for
//! streaming tabular data: row and stream primitives, the map/reduce/sort/join
//! operator family, a graph builder/executor, and a handful of algorithmic
//! recipes built from them .

pub mod algorithms;
pub mod config;
pub mod error;
pub mod graph;
pub mod operators;
pub mod serialize;
pub mod sources;
pub mod stream;
pub mod value;

pub use error::{Error, Result};
pub use graph::{Graph, Inputs};
pub use stream::RowStream;
pub use value::{Row, Value};
