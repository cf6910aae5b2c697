//! The graph builder and executor.
//!
//! A [`Graph`] is an immutable value: a source factory plus an ordered list
//! of stage factories, both held behind `Rc`. Chaining a method never
//! mutates `self` — it returns a new `Graph` sharing the old stage list's
//! `Rc`, so branching off the same prefix twice costs a handful of refcount
//! bumps rather than a deep clone (the source language achieves the same
//! immutability guarantee by deep-cloning on every chain step; §9).

use crate::config::EngineConfig;
use crate::error::Result;
use crate::operators::{
    default_suffixes, join_stage, map_stage, reduce_stage, sort_stage, Joiner, Mapper, Reducer,
};
use crate::sources::{FileSource, InMemorySource, LineParser, RowFactory};
use crate::stream::RowStream;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

/// The input bindings a [`Graph`] is run with: a name-to-factory map feeding
/// every `InMemorySource` the graph (or any graph it joins against) contains.
///
/// Each factory must be callable afresh per `run` and yield a new stream each
/// time — enforced here only by convention,
/// since `Fn() -> RowStream` is exactly "callable repeatedly, fresh each time".
#[derive(Default)]
pub struct Inputs {
    bindings: HashMap<String, RowFactory>,
}

impl Inputs {
    pub fn new() -> Self {
        Inputs::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, factory: impl Fn() -> RowStream + 'static) -> &mut Self {
        self.bindings.insert(name.into(), Rc::new(factory));
        self
    }

    pub(crate) fn get(&self, name: &str) -> Option<&RowFactory> {
        self.bindings.get(name)
    }
}

type SourceFn = dyn Fn(&Inputs) -> Result<RowStream>;
type StageFn = dyn Fn(RowStream, &Inputs) -> Result<RowStream>;

/// An append-only description of a dataflow: where rows start, and which
/// operators they pass through. Building a graph does no work; only `run`
/// pulls anything.
#[derive(Clone)]
pub struct Graph {
    source: Rc<SourceFn>,
    stages: Rc<Vec<Rc<StageFn>>>,
}

impl Graph {
    /// A graph whose rows come from an [`InMemorySource`] bound at run time.
    pub fn from_iter(name: impl Into<String>) -> Self {
        let source = InMemorySource::new(name);
        Graph {
            source: Rc::new(move |inputs| source.run(inputs)),
            stages: Rc::new(Vec::new()),
        }
    }

    /// A graph whose rows come from a text file, parsed line by line.
    pub fn from_file(path: impl Into<PathBuf>, parser: LineParser) -> Self {
        let source = FileSource::new(path, parser);
        Graph {
            source: Rc::new(move |_inputs| source.run()),
            stages: Rc::new(Vec::new()),
        }
    }

    fn with_stage(&self, stage: Rc<StageFn>) -> Self {
        let mut stages = (*self.stages).clone();
        stages.push(stage);
        Graph {
            source: self.source.clone(),
            stages: Rc::new(stages),
        }
    }

    /// Appends a `Map` stage.
    pub fn map(&self, mapper: impl Mapper + 'static) -> Self {
        let mapper: Rc<dyn Mapper> = Rc::new(mapper);
        self.with_stage(Rc::new(move |upstream, _inputs| Ok(map_stage(upstream, mapper.clone()))))
    }

    /// Appends a `Reduce` stage over `keys`. The upstream must
    /// already be sorted by `keys`.
    pub fn reduce(&self, reducer: impl Reducer + 'static, keys: Vec<String>) -> Self {
        let reducer: Rc<dyn Reducer> = Rc::new(reducer);
        self.with_stage(Rc::new(move |upstream, _inputs| {
            Ok(reduce_stage(upstream, reducer.clone(), keys.clone()))
        }))
    }

    /// Appends an external-sort stage over `keys`, honoring
    /// `COMPGRAPH_SORT_RUN_ROWS`/`COMPGRAPH_SORT_SPILL_DIR` if set.
    pub fn sort(&self, keys: Vec<String>) -> Self {
        self.sort_with_config(keys, EngineConfig::from_env())
    }

    /// Appends an external-sort stage with an explicit [`EngineConfig`].
    pub fn sort_with_config(&self, keys: Vec<String>, config: EngineConfig) -> Self {
        self.with_stage(Rc::new(move |upstream, _inputs| Ok(sort_stage(upstream, keys.clone(), config.clone()))))
    }

    /// Appends a sort-merge join against `other`, both already sorted by `keys`
    ///, using the default `_1`/`_2` suffixes for colliding fields.
    pub fn join(&self, other: Graph, joiner: impl Joiner + 'static, keys: Vec<String>) -> Self {
        self.join_with_suffixes(other, joiner, keys, default_suffixes())
    }

    /// As [`Graph::join`], with explicit suffixes for colliding non-key fields.
    pub fn join_with_suffixes(
        &self,
        other: Graph,
        joiner: impl Joiner + 'static,
        keys: Vec<String>,
        suffixes: (String, String),
    ) -> Self {
        let joiner: Rc<dyn Joiner> = Rc::new(joiner);
        self.with_stage(Rc::new(move |upstream, inputs| {
            let right = other.run(inputs)?;
            Ok(join_stage(upstream, right, keys.clone(), joiner.clone(), suffixes.clone()))
        }))
    }

    /// Instantiates the source and threads it through every stage, in order.
    /// A graph may be run any number of times; each run re-executes the
    /// source and every stage from scratch (no memoization of branches).
    pub fn run(&self, inputs: &Inputs) -> Result<RowStream> {
        let mut stream = (self.source)(inputs)?;
        for stage in self.stages.iter() {
            stream = stage(stream, inputs)?;
        }
        Ok(stream)
    }
}
