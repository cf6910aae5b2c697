use super::iter_or_file;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::operators::mappers::{Filter, FilterPunctuation, LowerCase, Project, Split};
use crate::operators::reducers::{Count, Sum, TopN};
use crate::operators::{InnerJoiner, UserMap};
use crate::sources::LineParser;
use crate::value::{Row, Value};

/// For each document, the top 10 words (length > 4, occurring at least twice
/// in that document) ranked by pointwise mutual information against the
/// whole corpus.
///
/// Output: `(doc_id, pmi, word)`.
pub fn pmi_graph(
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
    let count_column = "count_in_doc".to_string();
    let frequency_column = "frequency".to_string();

    let length_filter = {
        let text_column = text_column.clone();
        move |row: &Row| -> Result<bool> {
            Ok(field_str(row, &text_column)?.chars().count() > 4)
        }
    };
    let at_least_twice = {
        let count_column = count_column.clone();
        move |row: &Row| -> Result<bool> { Ok(field_f64(row, &count_column)? >= 2.0) }
    };

    let split_word = iter_or_file(filemod, input_stream_name, parser)
        .map(FilterPunctuation::new(text_column.as_str()))
        .map(LowerCase::new(text_column.as_str()))
        .map(Split::new(text_column.as_str()).expect("default split separator is a valid regex"))
        .map(Filter::new(length_filter))
        .sort(vec![doc_column.clone(), text_column.clone()])
        .reduce(Count::new(count_column.as_str()), vec![doc_column.clone(), text_column.clone()])
        .map(Filter::new(at_least_twice));

    let word_count = split_word
        .sort(vec![text_column.clone()])
        .reduce(Sum::new(count_column.as_str()), vec![text_column.clone()]);

    let all_words = split_word.reduce(Sum::new(count_column.as_str()), vec![]);
    let words_in_doc = split_word
        .sort(vec![doc_column.clone()])
        .reduce(Sum::new(count_column.as_str()), vec![doc_column.clone()]);

    let in_all = all_words
        .join(word_count, InnerJoiner, vec![])
        .map(UserMap(freq_mapper(
            format!("{count_column}_1"),
            format!("{count_column}_2"),
            frequency_column.clone(),
        )))
        .sort(vec![text_column.clone()]);

    let in_doc = words_in_doc
        .join(split_word, InnerJoiner, vec![doc_column.clone()])
        .map(UserMap(freq_mapper(
            format!("{count_column}_1"),
            format!("{count_column}_2"),
            frequency_column.clone(),
        )))
        .sort(vec![text_column.clone()]);

    let ln_mapper = {
        let result_column = result_column.clone();
        let frequency_column = frequency_column.clone();
        move |row: Row| -> Result<Vec<Row>> {
            let frequency = field_f64(&row, &frequency_column)?;
            let mut row = row;
            row.insert(result_column.clone(), Value::float(frequency.ln()));
            Ok(vec![row])
        }
    };

    in_all
        .join(in_doc, InnerJoiner, vec![text_column.clone()])
        .map(UserMap(freq_mapper(
            format!("{frequency_column}_1"),
            format!("{frequency_column}_2"),
            frequency_column.clone(),
        )))
        .map(UserMap(ln_mapper))
        .sort(vec![doc_column.clone()])
        .reduce(TopN::new(result_column.as_str(), 10), vec![doc_column.clone()])
        .map(Project::new([doc_column, result_column, text_column]))
}

/// Builds the repeated `row[out] = row[count_col] / row[size_col]` shape.
fn freq_mapper(size_col: String, count_col: String, out_col: String) -> impl Fn(Row) -> Result<Vec<Row>> {
    move |row: Row| -> Result<Vec<Row>> {
        let size = field_f64(&row, &size_col)?;
        let count = field_f64(&row, &count_col)?;
        let mut row = row;
        row.insert(out_col.clone(), Value::float(count / size));
        Ok(vec![row])
    }
}

fn field_str<'a>(row: &'a Row, field: &str) -> Result<&'a str> {
    row.get(field)
        .ok_or_else(|| Error::MissingField(field.to_string()))?
        .as_str()
        .ok_or_else(|| Error::TypeMismatch {
            field: field.to_string(),
            message: "expected a string".into(),
        })
}

fn field_f64(row: &Row, field: &str) -> Result<f64> {
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
    use std::rc::Rc;

    #[test]
    fn restricts_to_top_ten_per_document() {
        let docs = vec![
            row! {"doc_id" => Value::int(1), "text" => Value::str("hello little world little little")},
            row! {"doc_id" => Value::int(2), "text" => Value::str("hello hello world world little little")},
        ];
        let mut inputs = Inputs::new();
        let docs = Rc::new(docs);
        inputs.bind("docs", move || {
            let docs = (*docs).clone();
            Box::new(docs.into_iter().map(Ok)) as RowStream
        });
        let graph = pmi_graph("docs", "doc_id", "text", "pmi", false, super::super::default_parser());
        let out: Vec<Row> = graph.run(&inputs).unwrap().collect::<crate::error::Result<Vec<_>>>().unwrap();
        for row in &out {
            assert!(row.contains_key("pmi"));
            assert!(row["text"].as_str().unwrap().chars().count() > 4);
        }
        let per_doc = out.iter().filter(|r| r["doc_id"] == Value::int(1)).count();
        assert!(per_doc <= 10);
    }
}
