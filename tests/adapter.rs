//! Function adaptation: signatures, derived contracts, fidelity.

mod common;

use common::fixtures;
use loomflow::adapter::{AdapterError, FnParam, FnSignature, FunctionComponent, ParamType};
use loomflow::assembler::assemble;
use loomflow::component::{Binding, ComponentLike, sync_producer};
use loomflow::scheduler::Scheduler;
use loomflow::types::{TypeTag, Value};

fn repeat_signature() -> FnSignature {
    FnSignature::new("repeat_text")
        .param(FnParam::new("text", ParamType::Text))
        .param(FnParam::new("times", ParamType::Integer).with_default(2))
        .returns(ParamType::Text)
        .with_doc("Repeat a string.\n\nArgs:\n    text: The text to repeat.\n    times: How many copies.\n")
}

fn repeat_component() -> loomflow::component::ComponentRef {
    FunctionComponent::from_fn(
        repeat_signature(),
        sync_producer(|args| {
            let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
            let times = args.get("times").and_then(Value::as_i64).unwrap_or(1);
            Ok(Value::String(text.repeat(usize::try_from(times).unwrap_or(1))))
        }),
    )
    .unwrap()
    .into_ref()
}

#[test]
fn signature_becomes_a_full_contract() {
    let component = repeat_component();

    assert_eq!(component.component_type(), "Function:repeat_text");
    assert_eq!(component.display_name(), "Repeat Text");

    let inputs = component.inputs();
    assert_eq!(inputs.len(), 2);

    // No default means required; doc string feeds the info text.
    assert_eq!(inputs[0].name, "text");
    assert!(inputs[0].required);
    assert_eq!(inputs[0].accepted_types, vec![TypeTag::Text]);
    assert_eq!(inputs[0].info, "The text to repeat.");

    assert_eq!(inputs[1].name, "times");
    assert!(!inputs[1].required);
    assert_eq!(inputs[1].default, Some(Value::from(2)));
    assert_eq!(inputs[1].info, "How many copies.");

    let outputs = component.outputs();
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].name, "result");
    assert_eq!(outputs[0].produced_types, vec![TypeTag::Text]);
}

#[test]
fn explicit_info_wins_over_doc_string() {
    let signature = FnSignature::new("f")
        .param(FnParam::new("x", ParamType::Text).with_info("explicit"))
        .with_doc("Args:\n    x: from the docs.\n");
    let component = FunctionComponent::from_fn(
        signature,
        sync_producer(|_| Ok(Value::Null)),
    )
    .unwrap();
    assert_eq!(component.inputs()[0].info, "explicit");
}

#[test]
fn list_params_become_list_inputs() {
    let signature = FnSignature::new("gather")
        .param(FnParam::new("items", ParamType::List(Box::new(ParamType::Text))))
        .returns(ParamType::Data);
    let component =
        FunctionComponent::from_fn(signature, sync_producer(|_| Ok(Value::Null))).unwrap();
    let slot = &component.inputs()[0];
    assert!(slot.is_list);
    assert_eq!(slot.accepted_types, vec![TypeTag::Text]);
}

#[test]
fn unmapped_types_fall_back_to_any() {
    let signature = FnSignature::new("mystery")
        .param(FnParam::new("blob", ParamType::Opaque))
        .returns(ParamType::Opaque);
    let component =
        FunctionComponent::from_fn(signature, sync_producer(|_| Ok(Value::Null))).unwrap();
    assert_eq!(component.inputs()[0].accepted_types, vec![TypeTag::Any]);
    assert_eq!(component.outputs()[0].produced_types, vec![TypeTag::Any]);
}

#[test]
fn receivers_and_variadics_are_skipped() {
    let signature = FnSignature::new("method_like")
        .param(FnParam::receiver("self"))
        .param(FnParam::new("text", ParamType::Text))
        .param(FnParam::variadic("rest"))
        .returns(ParamType::Text);
    let component =
        FunctionComponent::from_fn(signature, sync_producer(|_| Ok(Value::Null))).unwrap();
    let inputs = component.inputs();
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].name, "text");
}

#[test]
fn opaque_signatures_cannot_be_adapted() {
    let err = FunctionComponent::from_fn(
        FnSignature::opaque("native_blob"),
        sync_producer(|_| Ok(Value::Null)),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        AdapterError::Uninspectable { name } if name == "native_blob"
    ));
}

#[tokio::test]
async fn adapted_components_mix_with_hand_declared_ones() {
    // constant_text -> repeat_text -> upper, crossing the adapter boundary
    // twice. Downstream code never learns which nodes were functions.
    let source = fixtures::constant_text("src", "ab");
    let repeat = repeat_component();
    let upper = fixtures::upper("up");

    repeat.set("text", Binding::component(&source)).unwrap();
    upper.set("text", Binding::component(&repeat)).unwrap();

    let graph = assemble(&[upper.clone()]).unwrap();
    let report = Scheduler::new().run(&graph).await.unwrap();

    assert!(report.is_success());
    // Default times = 2, then uppercased.
    assert_eq!(
        report.output("up", "result"),
        Some(&Value::String("ABAB".into()))
    );
}

#[tokio::test]
async fn adapter_output_equals_direct_call() {
    // Invoking through the graph must match calling the producer directly.
    let repeat = repeat_component();
    repeat.set("text", Binding::literal("xy")).unwrap();
    repeat.set("times", Binding::literal(3)).unwrap();

    let graph = assemble(&[repeat.clone()]).unwrap();
    let report = Scheduler::new().run(&graph).await.unwrap();
    assert_eq!(
        report.output(repeat.id(), "result"),
        Some(&Value::String("xyxyxy".into()))
    );
}
