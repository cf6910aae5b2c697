//! The operator family: `map`, `reduce`, `sort`, `join`.

pub mod join;
pub mod map;
pub mod mappers;
pub mod reduce;
pub mod reducers;
pub mod sort;

pub use join::{default_suffixes, InnerJoiner, Joiner, LeftJoiner, OuterJoiner, RightJoiner};
pub use map::{Mapper, UserMap};
pub use reduce::Reducer;

pub(crate) use join::join_stage;
pub(crate) use map::map_stage;
pub(crate) use reduce::reduce_stage;
pub(crate) use sort::sort_stage;
