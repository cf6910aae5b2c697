use super::iter_or_file;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::operators::mappers::{FilterPunctuation, LowerCase, Project, Split};
use crate::operators::UserMap;
use crate::operators::reducers::{Count, TermFrequency, TopN};
use crate::operators::InnerJoiner;
use crate::sources::LineParser;
use crate::value::Value;

/// For each word, the top 3 documents by TF-IDF.
///
/// Output: `(doc_id, word, tf_idf)`, sorted by `(doc_id, word)`.
pub fn inverted_index_graph(
    input_stream_name: impl Into<String>,
    doc_column: &str,
    text_column: &str,
    result_column: &str,
    filemod: bool,
    parser: LineParser,
) -> Graph {
    let doc_column = doc_column.to_string();
    let text_column = text_column.to_string();
    let result_column = result_column.to_string();

    let input_stream = iter_or_file(filemod, input_stream_name, parser);
    let split_word = input_stream
        .map(FilterPunctuation::new(text_column.as_str()))
        .map(LowerCase::new(text_column.as_str()))
        .map(Split::new(text_column.as_str()).expect("default split separator is a valid regex"));

    let count_docs = input_stream.reduce(Count::new("size"), vec![]);

    let idf = {
        move |row: crate::value::Row| -> Result<Vec<crate::value::Row>> {
            let size = field_f64(&row, "size")?;
            let doc_count = field_f64(&row, "doc_count")?;
            let mut row = row;
            row.insert("idf".to_string(), Value::float((size / doc_count).ln()));
            Ok(vec![row])
        }
    };

    let count_idf = split_word
        .sort(vec![doc_column.clone(), text_column.clone()])
        .reduce(TopN::new(doc_column.as_str(), 1), vec![doc_column.clone(), text_column.clone()])
        .sort(vec![text_column.clone()])
        .reduce(Count::new("doc_count"), vec![text_column.clone()])
        .join(count_docs, InnerJoiner, vec![])
        .map(UserMap(idf))
        .sort(vec![text_column.clone()]);

    let tf = split_word
        .sort(vec![doc_column.clone()])
        .reduce(TermFrequency::new(text_column.as_str()), vec![doc_column.clone()])
        .sort(vec![text_column.clone()]);

    let tf_idf = {
        let result_column = result_column.clone();
        move |row: crate::value::Row| -> Result<Vec<crate::value::Row>> {
            let tf = field_f64(&row, "tf")?;
            let idf = field_f64(&row, "idf")?;
            let mut row = row;
            row.insert(result_column.clone(), Value::float(tf * idf));
            Ok(vec![row])
        }
    };

    count_idf
        .join(tf, InnerJoiner, vec![text_column.clone()])
        .map(UserMap(tf_idf))
        .sort(vec![text_column.clone()])
        .reduce(TopN::new(result_column.as_str(), 3), vec![text_column.clone()])
        .map(Project::new([doc_column.clone(), text_column.clone(), result_column.clone()]))
        .sort(vec![doc_column, text_column])
}

fn field_f64(row: &crate::value::Row, field: &str) -> Result<f64> {
    row.get(field)
        .ok_or_else(|| Error::MissingField(field.to_string()))?
        .as_f64()
        .ok_or_else(|| Error::TypeMismatch {
            field: field.to_string(),
            message: "expected a numeric field".into(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Inputs;
    use crate::row;
    use crate::stream::RowStream;
    use crate::value::Row;
    use std::rc::Rc;

    fn reference_docs() -> Vec<Row> {
        vec![
            row! {"doc_id" => Value::int(1), "text" => Value::str("hello little world")},
            row! {"doc_id" => Value::int(2), "text" => Value::str("little little hello")},
            row! {"doc_id" => Value::int(3), "text" => Value::str("little hello hello world")},
            row! {"doc_id" => Value::int(4), "text" => Value::str("hello world")},
            row! {"doc_id" => Value::int(5), "text" => Value::str("hello hello world")},
            row! {"doc_id" => Value::int(6), "text" => Value::str("world world")},
        ]
    }

    #[test]
    fn produces_bounded_tf_idf_rows() {
        let mut inputs = Inputs::new();
        let docs = Rc::new(reference_docs());
        inputs.bind("docs", move || {
            let docs = (*docs).clone();
            Box::new(docs.into_iter().map(Ok)) as RowStream
        });
        let graph = inverted_index_graph("docs", "doc_id", "text", "tf_idf", false, super::super::default_parser());
        let out: Vec<Row> = graph.run(&inputs).unwrap().collect::<crate::error::Result<Vec<_>>>().unwrap();
        assert!(!out.is_empty());
        for row in &out {
            assert!(row.contains_key("doc_id"));
            assert!(row.contains_key("text"));
            assert!(row.contains_key("tf_idf"));
        }
    }
}
