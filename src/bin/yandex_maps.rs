//! CLI front-end for the `yandex_maps` recipe.

use clap::Parser;
use compgraph::algorithms::{default_parser, yandex_maps_graph};
use compgraph::serialize::render_row;
use compgraph::Inputs;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::process::ExitCode;

/// Average speed in km/h grouped by (weekday, hour) of trip start.
#[derive(Parser)]
struct Args {
    #[arg(long)]
    input_time: String,
    #[arg(long)]
    input_length: String,
    #[arg(long)]
    output: String,
    #[arg(long, default_value = "enter_time")]
    enter_time_column: String,
    #[arg(long, default_value = "leave_time")]
    leave_time_column: String,
    #[arg(long, default_value = "edge_id")]
    edge_id_column: String,
    #[arg(long, default_value = "start")]
    start_coord_column: String,
    #[arg(long, default_value = "end")]
    end_coord_column: String,
    #[arg(long, default_value = "weekday")]
    weekday_column: String,
    #[arg(long, default_value = "hour")]
    hour_column: String,
    #[arg(long, default_value = "speed")]
    speed_column: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::try_init().ok();
    let args = Args::parse();

    let graph = yandex_maps_graph(
        args.input_time,
        args.input_length,
        &args.enter_time_column,
        &args.leave_time_column,
        &args.edge_id_column,
        &args.start_coord_column,
        &args.end_coord_column,
        &args.weekday_column,
        &args.hour_column,
        &args.speed_column,
        true,
        default_parser(),
    );

    match run(&graph, &args.output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("yandex_maps: {e}");
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
