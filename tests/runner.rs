//! The assemble-and-run facade.

mod common;

use common::fixtures;
use loomflow::component::Binding;
use loomflow::runner::{FlowRunner, RunError};
use loomflow::types::Value;

#[tokio::test]
async fn collects_terminal_outputs() {
    loomflow::telemetry::init();
    let source = fixtures::constant_text("src", "hello");
    let upper = fixtures::upper("up");
    let greet = fixtures::greeter("greet");
    upper.set("text", Binding::component(&source)).unwrap();
    greet.set("name", Binding::component(&upper)).unwrap();

    let runner = FlowRunner::from_roots(&[greet]).unwrap();
    let outcome = runner.run().await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.terminals.len(), 1);
    assert_eq!(
        outcome.terminal("greet", "greeting"),
        Some(&Value::String("Hello, HELLO!".into()))
    );
    // Intermediate outputs are still reachable through the report.
    assert_eq!(
        outcome.report.output("up", "result"),
        Some(&Value::String("HELLO".into()))
    );
}

#[tokio::test]
async fn assembly_errors_surface_before_running() {
    let upper = fixtures::upper("up"); // required input left unbound
    let err = FlowRunner::from_roots(&[upper]).unwrap_err();
    assert!(matches!(err, RunError::Assembly(_)));
}

#[tokio::test]
async fn lenient_run_reports_failures_without_erroring() {
    let boom = fixtures::failing("boom", "nope");
    let greet = fixtures::greeter("greet");
    greet.set("name", Binding::component(&boom)).unwrap();

    let healthy = fixtures::constant_text("ok", "fine");
    let runner = FlowRunner::from_roots(&[greet, healthy]).unwrap();
    let outcome = runner.run().await.unwrap();

    assert!(!outcome.is_success());
    assert_eq!(outcome.report.first_failure().unwrap().vertex_id, "boom");
    // The independent terminal still produced its value.
    assert_eq!(
        outcome.terminal("ok", "value"),
        Some(&Value::String("fine".into()))
    );
}

#[tokio::test]
async fn strict_run_carries_the_unreached_set() {
    let boom = fixtures::failing("boom", "nope");
    let greet = fixtures::greeter("greet");
    greet.set("name", Binding::component(&boom)).unwrap();

    let runner = FlowRunner::from_roots(&[greet]).unwrap();
    let err = runner.run_strict().await.unwrap_err();
    match err {
        RunError::Execution { failure, unreached } => {
            assert_eq!(failure.vertex_id, "boom");
            assert_eq!(unreached, vec!["greet".to_string()]);
        }
        other => panic!("expected Execution, got {other:?}"),
    }
}

#[tokio::test]
async fn overrides_replace_literals_for_one_run() {
    let greet = fixtures::greeter("greet");
    greet.set("name", Binding::literal("wired")).unwrap();

    let runner = FlowRunner::from_roots(&[greet]).unwrap();
    let outcome = runner.run().await.unwrap();
    assert_eq!(
        outcome.terminal("greet", "greeting"),
        Some(&Value::String("Hello, wired!".into()))
    );

    let overridden = runner.with_override("greet", "name", "tweaked");
    let outcome = overridden.run().await.unwrap();
    assert_eq!(
        outcome.terminal("greet", "greeting"),
        Some(&Value::String("Hello, tweaked!".into()))
    );
}

#[tokio::test]
async fn edge_values_win_over_overrides() {
    let source = fixtures::constant_text("src", "edge");
    let greet = fixtures::greeter("greet");
    greet.set("name", Binding::component(&source)).unwrap();

    let runner = FlowRunner::from_roots(&[greet])
        .unwrap()
        .with_override("greet", "name", "ignored");
    let outcome = runner.run().await.unwrap();
    assert_eq!(
        outcome.terminal("greet", "greeting"),
        Some(&Value::String("Hello, edge!".into()))
    );
}

#[tokio::test]
async fn multiple_terminals_are_all_collected() {
    let source = fixtures::constant_text("src", "x");
    let left = fixtures::upper("left");
    let right = fixtures::greeter("right");
    left.set("text", Binding::component(&source)).unwrap();
    right.set("name", Binding::component(&source)).unwrap();

    let runner = FlowRunner::from_roots(&[left, right]).unwrap();
    let outcome = runner.run().await.unwrap();
    assert_eq!(outcome.terminals.len(), 2);
    assert_eq!(
        outcome.terminal("left", "result"),
        Some(&Value::String("X".into()))
    );
    assert_eq!(
        outcome.terminal("right", "greeting"),
        Some(&Value::String("Hello, x!".into()))
    );
}
