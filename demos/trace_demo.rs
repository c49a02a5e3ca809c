//! Trace a small scripted program into SQLite and the console.
//!
//! Run with `cargo run --example trace_demo`. The database path and other
//! settings come from `FRAMELOG_*` variables, optionally set in a `.env` file.

use chrono::NaiveDate;
use framelog::prelude::*;
use framelog::host::sim::{SimHost, Step};
use framelog::serializer::ClassHook;
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("framelog - call-stack snapshot demo\n");

    let mut host = SimHost::new(TraceSwitch::new());
    let build = host.define(Code::new("build_graph", "main.py", 10));
    let visit = host.define(Code::new("visit", "main.py", 30));

    // A two-node cycle plus a few values the serializer has special handling for
    let heap = host.heap_mut();
    let a = heap.instance("Node", vec![("name", Value::from("a"))]);
    let b = heap.instance("Node", vec![("name", Value::from("b")), ("next", a.clone())]);
    let a_id = a.as_ref_id().ok_or_else(|| anyhow::anyhow!("node is not on the heap"))?;
    let payload = heap.bytes(b"\x00\x01frame".to_vec());
    let started = heap.timestamp(
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_micro_opt(9, 30, 0, 250))
            .ok_or_else(|| anyhow::anyhow!("invalid demo timestamp"))?,
    );
    let origin = heap.slotted("Point", vec![("x", Value::Int(0)), ("y", Value::Int(0))]);

    let config = SqliteConfig::default();
    println!("Writing snapshots to {}\n", config.path.display());
    let mut store = SqliteSink::open(&config)?;

    let mut session = TraceSession::start(
        Arc::new(host.switch().clone()),
        (&mut store, PrintSink::stdout()),
        TraceConfig::default(),
    )?;
    session
        .serializer_mut()
        .register_hook(Box::new(ClassHook::new("Point", |_| json!("Point(0, 0)"))));

    host.run(
        &[
            Step::assign("payload", payload),
            Step::assign("started", started),
            Step::Line(2),
            Step::Call(build),
            Step::assign("a", a),
            Step::assign("b", b.clone()),
            Step::Line(11),
            Step::SetAttr(a_id, "next".to_string(), b.clone()),
            Step::Line(12),
            Step::Call(visit),
            Step::assign("node", b),
            Step::assign("origin", origin),
            Step::Line(31),
            Step::Return(Value::None),
            Step::Return(Value::None),
            Step::Line(3),
        ],
        &mut session,
    )?;

    let summary = session.finish();
    if let Some(error) = &summary.flush_error {
        eprintln!("Final flush failed: {error}");
    }
    println!("\nRun summary:\n{}", serde_json::to_string_pretty(&summary)?);

    let deepest = store
        .snapshots_for_run(&summary.run_id)?
        .into_iter()
        .find(|r| r.function == "visit")
        .ok_or_else(|| anyhow::anyhow!("no snapshot from visit"))?;

    println!("\nCall stack at snapshot #{}:", deepest.frame_id);
    for record in store.back_chain(&summary.run_id, deepest.frame_id)? {
        println!("  {}", record.printable_summary());
    }

    Ok(())
}
