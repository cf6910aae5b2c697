//! CLI front-end for the `inverted_index` recipe.

use clap::Parser;
use compgraph::algorithms::{default_parser, inverted_index_graph};
use compgraph::serialize::render_row;
use compgraph::Inputs;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::process::ExitCode;

/// For each word, the top 3 documents by TF-IDF.
#[derive(Parser)]
struct Args {
    #[arg(long)]
    input: String,
    #[arg(long)]
    output: String,
    #[arg(long, default_value = "doc_id")]
    doc_column: String,
    #[arg(long, default_value = "text")]
    text_column: String,
    #[arg(long, default_value = "tf_idf")]
    result_column: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::try_init().ok();
    let args = Args::parse();

    let graph = inverted_index_graph(
        args.input,
        &args.doc_column,
        &args.text_column,
        &args.result_column,
        true,
        default_parser(),
    );

    match run(&graph, &args.output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("inverted_index: {e}");
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
