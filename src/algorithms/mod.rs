//! Algorithmic recipes: named compositions of the core operators.
//!
//! Each recipe is a plain function from (input name(s), column overrides,
//! `filemod`) to a [`Graph`] — building one does no work; running it does.

mod inverted_index;
mod pmi;
mod word_count;
mod yandex_maps;

pub use inverted_index::inverted_index_graph;
pub use pmi::pmi_graph;
pub use word_count::word_count_graph;
pub use yandex_maps::yandex_maps_graph;

use crate::graph::Graph;
use crate::sources::LineParser;
use std::rc::Rc;

/// The default on-disk row parser, shared by every recipe.
pub fn default_parser() -> LineParser {
    Rc::new(crate::serialize::parse_row)
}

/// Picks the source kind every recipe starts from: a file, read line by
/// line, or a named in-memory binding resolved at `run` time.
fn iter_or_file(filemod: bool, input_stream_name: impl Into<String>, parser: LineParser) -> Graph {
    let name = input_stream_name.into();
    if filemod {
        Graph::from_file(name, parser)
    } else {
        Graph::from_iter(name)
    }
}
