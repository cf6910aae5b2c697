//! CLI front-end for the `word_count` recipe.

use clap::Parser;
use compgraph::algorithms::{default_parser, word_count_graph};
use compgraph::serialize::render_row;
use compgraph::Inputs;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::process::ExitCode;

/// Counts occurrences of each lowercased, punctuation-stripped word.
#[derive(Parser)]
struct Args {
    /// Input row file, one JSON-like mapping per line.
    #[arg(long)]
    input: String,
    /// Output row file.
    #[arg(long)]
    output: String,
    /// Column holding the document text.
    #[arg(long, default_value = "text")]
    text_column: String,
    /// Column the per-word count is written to.
    #[arg(long, default_value = "count")]
    count_column: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::try_init().ok();
    let args = Args::parse();

    let graph = word_count_graph(
        args.input,
        &args.text_column,
        &args.count_column,
        true,
        default_parser(),
    );

    match run(&graph, &args.output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("word_count: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(graph: &compgraph::Graph, output: &str) -> compgraph::Result<()> {
    let stream = graph.run(&Inputs::new())?;
    let mut out = BufWriter::new(File::create(output)?);
    for row in stream {
        writeln!(out, "{}", render_row(&row?))?;
    }
    out.flush()?;
    Ok(())
}
