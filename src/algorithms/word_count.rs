use super::iter_or_file;
use crate::graph::Graph;
use crate::operators::mappers::{FilterPunctuation, LowerCase, Split};
use crate::operators::reducers::Count;
use crate::sources::LineParser;

/// Counts occurrences of each lowercased, punctuation-stripped word.
///
/// Output: one row per distinct word, `(word, count)`, sorted ascending by
/// `(count, word)`.
pub fn word_count_graph(
    input_stream_name: impl Into<String>,
    text_column: &str,
    count_column: &str,
    filemod: bool,
    parser: LineParser,
) -> Graph {
    iter_or_file(filemod, input_stream_name, parser)
        .map(FilterPunctuation::new(text_column))
        .map(LowerCase::new(text_column))
        .map(Split::new(text_column).expect("default split separator is a valid regex"))
        .sort(vec![text_column.to_string()])
        .reduce(Count::new(count_column), vec![text_column.to_string()])
        .sort(vec![count_column.to_string(), text_column.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Inputs;
    use crate::row;
    use crate::stream::RowStream;
    use crate::value::{Row, Value};
    use std::rc::Rc;

    #[test]
    fn counts_and_orders_by_count_then_word() {
        let docs = vec![
            row! {"doc_id" => Value::int(1), "text" => Value::str("hello, my little WORLD")},
            row! {"doc_id" => Value::int(2), "text" => Value::str("Hello, my little little hell")},
        ];
        let mut inputs = Inputs::new();
        let docs = Rc::new(docs);
        inputs.bind("docs", move || {
            let docs = (*docs).clone();
            Box::new(docs.into_iter().map(Ok)) as RowStream
        });

        let graph = word_count_graph("docs", "text", "count", false, super::super::default_parser());
        let out: Vec<Row> = graph.run(&inputs).unwrap().collect::<crate::error::Result<Vec<_>>>().unwrap();

        let observed: Vec<(i64, &str)> = out
            .iter()
            .map(|r| {
                let count = match r["count"] {
                    Value::Int(n) => n,
                    _ => panic!("count should be an int"),
                };
                (count, r["text"].as_str().unwrap())
            })
            .collect();
        assert_eq!(
            observed,
            vec![(1, "hell"), (1, "world"), (2, "hello"), (2, "my"), (3, "little")]
        );
    }
}
