use crate::error::{Error, Result};
use crate::stream::RowStream;
use crate::value::Row;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::rc::Rc;
use tracing::debug;

/// A parser from one line of text to a [`Row`], as supplied by the caller.
pub type LineParser = Rc<dyn Fn(&str) -> Result<Row>>;

/// Reads rows from a text file, one per line, via a caller-supplied parser.
///
/// Opens the file lazily — only when the graph actually runs — and releases
/// the handle whether the stream is drained to completion or simply dropped
/// early, since the handle lives inside the iterator `std::fs::File` returns
/// to `Drop`.
pub struct FileSource {
    path: PathBuf,
    parser: LineParser,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, parser: LineParser) -> Self {
        FileSource {
            path: path.into(),
            parser,
        }
    }

    pub(crate) fn run(&self) -> Result<RowStream> {
        let file = File::open(&self.path).map_err(Error::Io)?;
        debug!(path = %self.path.display(), "opened file source");
        let lines = BufReader::new(file).lines();
        let path = self.path.display().to_string();
        let parser = self.parser.clone();
        let iter = lines.enumerate().map(move |(index, line)| {
            let line = line.map_err(Error::Io)?;
            parser(&line).map_err(|e| match e {
                Error::Parse { message, .. } => Error::Parse {
                    path: path.clone(),
                    line: index + 1,
                    message,
                },
                other => other,
            })
        });
        Ok(Box::new(ClosingIter {
            inner: iter,
            path: self.path.display().to_string(),
        }))
    }
}

/// Wraps the line iterator so closing the file is logged on drop, whether
/// the stream was drained or abandoned partway through.
struct ClosingIter<I> {
    inner: I,
    path: String,
}

impl<I: Iterator<Item = Result<Row>>> Iterator for ClosingIter<I> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl<I> Drop for ClosingIter<I> {
    fn drop(&mut self) {
        debug!(path = %self.path, "closed file source");
    }
}
