//! Cross-operator properties that only make sense against the public
//! `Graph`/`Inputs` API.

use compgraph::config::EngineConfig;
use compgraph::operators::mappers::LowerCase;
use compgraph::operators::{InnerJoiner, OuterJoiner};
use compgraph::row;
use compgraph::value::{Row, Value};
use compgraph::{Graph, Inputs, RowStream};
use std::rc::Rc;

fn bind(inputs: &mut Inputs, name: &str, rows: Vec<Row>) {
    let rows = Rc::new(rows);
    inputs.bind(name.to_string(), move || {
        let rows = (*rows).clone();
        Box::new(rows.into_iter().map(Ok)) as RowStream
    });
}

fn drain(graph: &Graph, inputs: &Inputs) -> Vec<Row> {
    graph.run(inputs).unwrap().collect::<compgraph::Result<Vec<_>>>().unwrap()
}

#[test]
fn identity_map_reproduces_input() {
    let mut inputs = Inputs::new();
    let rows = vec![row! {"v" => Value::int(1)}, row! {"v" => Value::int(2)}];
    bind(&mut inputs, "src", rows.clone());
    let identity_fn = |row: Row| -> compgraph::Result<Vec<Row>> { Ok(vec![row]) };
    let identity = Graph::from_iter("src").map(compgraph::operators::UserMap(identity_fn));
    assert_eq!(drain(&identity, &inputs), rows);
}

#[test]
fn builder_is_immutable_across_branches() {
    let mut inputs = Inputs::new();
    bind(&mut inputs, "src", vec![row! {"v" => Value::int(1)}]);
    let base = Graph::from_iter("src");
    let identity_fn = |row: Row| -> compgraph::Result<Vec<Row>> { Ok(vec![row]) };
    let branched = base.map(compgraph::operators::UserMap(identity_fn));
    let _ = branched; // g2 exists, but base.run(...) must still see the unmapped stream
    assert_eq!(drain(&base, &inputs), vec![row! {"v" => Value::int(1)}]);
}

#[test]
fn inner_join_is_symmetric_modulo_suffix_rename() {
    let mut inputs = Inputs::new();
    bind(
        &mut inputs,
        "left",
        vec![
            row! {"id" => Value::int(1), "v" => Value::str("x")},
            row! {"id" => Value::int(2), "v" => Value::str("y")},
        ],
    );
    bind(
        &mut inputs,
        "right",
        vec![
            row! {"id" => Value::int(1), "v" => Value::str("p")},
            row! {"id" => Value::int(2), "v" => Value::str("q")},
        ],
    );

    // "v" collides on both sides, so the join suffixes it `_1`/`_2` in both
    // directions; swapping the operands should swap which suffix holds which
    // value, but not which pairs end up joined.
    let forward = Graph::from_iter("left")
        .sort(vec!["id".into()])
        .join(
            Graph::from_iter("right").sort(vec!["id".into()]),
            InnerJoiner,
            vec!["id".into()],
        )
        .sort(vec!["id".into()]);
    let backward = Graph::from_iter("right")
        .sort(vec!["id".into()])
        .join(
            Graph::from_iter("left").sort(vec!["id".into()]),
            InnerJoiner,
            vec!["id".into()],
        )
        .sort(vec!["id".into()]);

    let fwd = drain(&forward, &inputs);
    let bwd = drain(&backward, &inputs);
    assert_eq!(fwd.len(), bwd.len());
    for (f, b) in fwd.iter().zip(bwd.iter()) {
        assert_eq!(f["id"], b["id"]);
        assert_eq!(f["v_1"], b["v_2"]);
        assert_eq!(f["v_2"], b["v_1"]);
    }
}

#[test]
fn outer_join_is_a_superset_of_inner_join() {
    let mut inputs = Inputs::new();
    bind(
        &mut inputs,
        "left",
        vec![row! {"id" => Value::int(1)}, row! {"id" => Value::int(2)}],
    );
    bind(&mut inputs, "right", vec![row! {"id" => Value::int(1), "x" => Value::int(9)}]);

    let inner = Graph::from_iter("left").join(Graph::from_iter("right"), InnerJoiner, vec!["id".into()]);
    let outer = Graph::from_iter("left").join(Graph::from_iter("right"), OuterJoiner, vec!["id".into()]);

    let inner_rows = drain(&inner, &inputs);
    let outer_rows = drain(&outer, &inputs);
    assert!(outer_rows.len() >= inner_rows.len());
    for row in &inner_rows {
        assert!(outer_rows.contains(row));
    }
}

#[test]
fn branch_reuse_yields_one_row_per_source_row() {
    let mut inputs = Inputs::new();
    bind(
        &mut inputs,
        "src",
        vec![
            row! {"id" => Value::int(1), "text" => Value::str("A")},
            row! {"id" => Value::int(2), "text" => Value::str("B")},
        ],
    );

    let base = Graph::from_iter("src");
    let left = base.map(LowerCase::new("text")).sort(vec!["id".into()]);
    let right = base.sort(vec!["id".into()]);
    let joined = left.join(right, InnerJoiner, vec!["id".into()]);

    let out = drain(&joined, &inputs);
    assert_eq!(out.len(), 2);
}

#[test]
fn abandoning_external_sort_removes_spill_files() {
    let spill_dir = std::env::temp_dir().join(format!("compgraph-test-{}", std::process::id()));
    std::fs::create_dir_all(&spill_dir).unwrap();
    let before: Vec<_> = std::fs::read_dir(&spill_dir).unwrap().collect();
    assert!(before.is_empty());

    let rows: Vec<Row> = (0..500).rev().map(|i| row! {"k" => Value::int(i)}).collect();
    let mut inputs = Inputs::new();
    bind(&mut inputs, "src", rows);

    let config = EngineConfig::new(32, spill_dir.clone());
    let graph = Graph::from_iter("src").sort_with_config(vec!["k".into()], config);
    {
        let mut stream = graph.run(&inputs).unwrap();
        // Pull a handful of rows, then abandon the stream without draining it.
        let _ = stream.next();
        let _ = stream.next();
    }

    let after: Vec<_> = std::fs::read_dir(&spill_dir).unwrap().collect();
    assert!(after.is_empty(), "spill files leaked: {after:?}");
    std::fs::remove_dir(&spill_dir).unwrap();
}
