//! Contract declaration and wiring-time validation.

mod common;

use common::fixtures;
use loomflow::component::{Binding, Component, ComponentLike, WiringError, sync_producer};
use loomflow::contract::{ContractError, InputSlot, OutputSlot};
use loomflow::resolver::ResolveError;
use loomflow::types::{TypeTag, Value};

#[test]
fn literal_binding_overrides_default() {
    let component = Component::builder("WithDefault")
        .id("d-1")
        .input(
            InputSlot::new("text", [TypeTag::Text])
                .with_default(Value::String("fallback".into())),
        )
        .producer("echo", sync_producer(|args| Ok(args["text"].clone())))
        .output(OutputSlot::new("result", [TypeTag::Text], "echo"))
        .build_ref()
        .unwrap();

    assert_eq!(
        component.bound_value("text"),
        Some(Value::String("fallback".into()))
    );
    component.set("text", Binding::literal("explicit")).unwrap();
    assert_eq!(
        component.bound_value("text"),
        Some(Value::String("explicit".into()))
    );
}

#[test]
fn unknown_input_names_the_declared_set() {
    let upper = fixtures::upper("u-1");
    let err = upper.set("txet", Binding::literal("oops")).unwrap_err();
    match err {
        WiringError::UnknownInput {
            component,
            input,
            declared,
        } => {
            assert_eq!(component, "u-1");
            assert_eq!(input, "txet");
            assert_eq!(declared, vec!["text".to_string()]);
        }
        other => panic!("expected UnknownInput, got {other:?}"),
    }
}

#[test]
fn bare_component_picks_first_compatible_output() {
    // pair_source declares `num` (Integer) before `text` (Text); a Text
    // input must skip `num` and land on `text`.
    let source = fixtures::pair_source("p-1");
    let upper = fixtures::upper("u-1");
    upper.set("text", Binding::component(&source)).unwrap();

    let links = upper.links();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].edge.source_output, "text");

    // An Integer input takes the first output directly.
    let doubler = fixtures::doubler("dbl-1");
    doubler.set("count", Binding::component(&source)).unwrap();
    assert_eq!(doubler.links()[0].edge.source_output, "num");
}

#[test]
fn no_matching_output_reports_both_type_sets() {
    let source = fixtures::constant_text("c-1", "hi");
    let doubler = fixtures::doubler("dbl-1");
    let err = doubler
        .set("count", Binding::component(&source))
        .unwrap_err();
    match err {
        WiringError::Resolve(ResolveError::NoMatchingOutput {
            source_id,
            produced_types,
            target_id,
            target_input,
            accepted_types,
        }) => {
            assert_eq!(source_id, "c-1");
            assert_eq!(produced_types, vec![TypeTag::Text]);
            assert_eq!(target_id, "dbl-1");
            assert_eq!(target_input, "count");
            assert_eq!(accepted_types, vec![TypeTag::Integer]);
        }
        other => panic!("expected NoMatchingOutput, got {other:?}"),
    }
}

#[test]
fn explicit_output_must_exist_and_type_check() {
    let source = fixtures::pair_source("p-1");
    let upper = fixtures::upper("u-1");

    let err = upper
        .set("text", Binding::output(&source, "nope"))
        .unwrap_err();
    assert!(matches!(
        err,
        WiringError::Resolve(ResolveError::UnknownOutput { .. })
    ));

    let err = upper
        .set("text", Binding::output(&source, "num"))
        .unwrap_err();
    assert!(matches!(
        err,
        WiringError::Resolve(ResolveError::IncompatibleEdge { .. })
    ));

    // A compatible explicit pick works even when it is not first.
    upper.set("text", Binding::output(&source, "text")).unwrap();
    assert_eq!(upper.links()[0].edge.source_output, "text");
}

#[test]
fn set_many_binds_in_order_and_stops_at_the_first_failure() {
    let join = Component::builder("Join")
        .id("j-1")
        .input(InputSlot::new("left", [TypeTag::Text]))
        .input(InputSlot::new("right", [TypeTag::Text]))
        .producer("echo", sync_producer(|_| Ok(Value::Null)))
        .output(OutputSlot::new("result", [TypeTag::Text], "echo"))
        .build_ref()
        .unwrap();

    join.set_many(vec![
        ("left".to_string(), Binding::literal("a")),
        ("right".to_string(), Binding::literal("b")),
    ])
    .unwrap();
    assert_eq!(join.bound_value("left"), Some(Value::String("a".into())));
    assert_eq!(join.bound_value("right"), Some(Value::String("b".into())));

    // The first binding lands, the unknown input aborts the batch, and the
    // binding after it is never applied.
    let err = join
        .set_many(vec![
            ("left".to_string(), Binding::literal("changed")),
            ("nope".to_string(), Binding::literal("x")),
            ("right".to_string(), Binding::literal("never")),
        ])
        .unwrap_err();
    assert!(matches!(err, WiringError::UnknownInput { input, .. } if input == "nope"));
    assert_eq!(
        join.bound_value("left"),
        Some(Value::String("changed".into()))
    );
    assert_eq!(join.bound_value("right"), Some(Value::String("b".into())));
}

#[test]
fn rewiring_a_scalar_input_replaces_the_link() {
    let a = fixtures::constant_text("a", "one");
    let b = fixtures::constant_text("b", "two");
    let upper = fixtures::upper("u-1");

    upper.set("text", Binding::component(&a)).unwrap();
    upper.set("text", Binding::component(&b)).unwrap();

    let links = upper.links();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].edge.source_id, "b");
}

#[test]
fn list_input_accumulates_links() {
    let a = fixtures::constant_text("a", "one");
    let b = fixtures::constant_text("b", "two");
    let concat = fixtures::concat("cat-1");

    concat.set("parts", Binding::component(&a)).unwrap();
    concat.set("parts", Binding::component(&b)).unwrap();

    assert_eq!(concat.links().len(), 2);
}

#[test]
fn any_tag_is_permissive_in_both_directions() {
    let failing = fixtures::failing("f-1", "unused");
    let upper = fixtures::upper("u-1");
    // failing produces [Any], which satisfies a Text input.
    upper.set("text", Binding::component(&failing)).unwrap();
}

#[test]
fn duplicate_slot_names_fail_at_build() {
    let err = Component::builder("Dup")
        .input(InputSlot::new("text", [TypeTag::Text]))
        .input(InputSlot::new("text", [TypeTag::Data]))
        .build()
        .unwrap_err();
    assert!(matches!(err, ContractError::DuplicateInput { .. }));

    let err = Component::builder("Dup")
        .producer("p", sync_producer(|_| Ok(Value::Null)))
        .output(OutputSlot::new("out", [TypeTag::Any], "p"))
        .output(OutputSlot::new("out", [TypeTag::Any], "p"))
        .build()
        .unwrap_err();
    assert!(matches!(err, ContractError::DuplicateOutput { .. }));
}

#[test]
fn unknown_producer_fails_at_build() {
    let err = Component::builder("NoProducer")
        .output(OutputSlot::new("out", [TypeTag::Any], "missing"))
        .build()
        .unwrap_err();
    match err {
        ContractError::InvalidProducer {
            output, producer, ..
        } => {
            assert_eq!(output, "out");
            assert_eq!(producer, "missing");
        }
        other => panic!("expected InvalidProducer, got {other:?}"),
    }
}

#[test]
fn empty_type_sets_fail_at_build() {
    let err = Component::builder("Empty")
        .input(InputSlot::new("text", []))
        .build()
        .unwrap_err();
    assert!(matches!(err, ContractError::EmptyTypeSet { .. }));
}

#[test]
fn generated_ids_derive_from_the_type_name() {
    let component = Component::builder("Upper")
        .producer("p", sync_producer(|_| Ok(Value::Null)))
        .output(OutputSlot::new("out", [TypeTag::Any], "p"))
        .build()
        .unwrap();
    assert!(component.id().starts_with("upper-"));
}
