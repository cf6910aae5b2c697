use crate::error::Error;
use crate::stream::RowStream;
use crate::value::Row;
use std::rc::Rc;
use tracing::warn;

/// A caller-supplied generator: called once per `run`, it must hand back a
/// fresh iterator each time.
pub type RowFactory = Rc<dyn Fn() -> RowStream>;

/// Adapts a named, caller-supplied row generator into the start of a graph.
///
/// Bound at `run()` time via [`crate::graph::Inputs`]; fails with
/// [`Error::UnboundSource`] if nothing is bound for `name`.
pub struct InMemorySource {
    pub(crate) name: String,
}

impl InMemorySource {
    pub fn new(name: impl Into<String>) -> Self {
        InMemorySource { name: name.into() }
    }

    pub(crate) fn run(&self, inputs: &crate::graph::Inputs) -> Result<RowStream, Error> {
        match inputs.get(&self.name) {
            Some(factory) => Ok(factory()),
            None => {
                warn!(name = %self.name, "in-memory source has no binding");
                Err(Error::UnboundSource(self.name.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Inputs;
    use crate::row;

    #[test]
    fn yields_bound_rows_in_order() {
        let mut inputs = Inputs::new();
        inputs.bind("docs", || {
            Box::new(
                vec![row! {"a" => crate::value::Value::int(1)}].into_iter().map(Ok),
            ) as RowStream
        });
        let source = InMemorySource::new("docs");
        let rows: Result<Vec<Row>, Error> = source.run(&inputs).unwrap().collect();
        assert_eq!(rows.unwrap().len(), 1);
    }

    #[test]
    fn fails_when_unbound() {
        let inputs = Inputs::new();
        let source = InMemorySource::new("missing");
        assert!(matches!(
            source.run(&inputs),
            Err(Error::UnboundSource(name)) if name == "missing"
        ));
    }
}
