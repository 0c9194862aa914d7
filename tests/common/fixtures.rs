//! Shared component fixtures for integration tests.

use std::time::Duration;

use loomflow::component::{Component, ComponentRef, ProducerError, producer, sync_producer};
use loomflow::contract::{InputSlot, OutputSlot};
use loomflow::types::{TypeTag, Value};

/// Text -> Text: uppercases its `text` input.
pub fn upper(id: &str) -> ComponentRef {
    Component::builder("Upper")
        .id(id)
        .input(InputSlot::new("text", [TypeTag::Text]).required(true))
        .producer(
            "to_upper",
            sync_producer(|args| {
                let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
                Ok(Value::String(text.to_uppercase()))
            }),
        )
        .output(OutputSlot::new("result", [TypeTag::Text], "to_upper"))
        .build_ref()
        .unwrap()
}

/// Text -> Text: greets the `name` input.
pub fn greeter(id: &str) -> ComponentRef {
    Component::builder("Greeter")
        .id(id)
        .input(InputSlot::new("name", [TypeTag::Text]).required(true))
        .producer(
            "make_greeting",
            sync_producer(|args| {
                let name = args.get("name").and_then(Value::as_str).unwrap_or("world");
                Ok(Value::String(format!("Hello, {name}!")))
            }),
        )
        .output(OutputSlot::new("greeting", [TypeTag::Text], "make_greeting"))
        .build_ref()
        .unwrap()
}

/// Source with no inputs emitting a fixed text value. The text lives in a
/// builder param so it survives serialization.
pub fn constant_text(id: &str, text: &str) -> ComponentRef {
    Component::builder("ConstantText")
        .id(id)
        .param("text", text)
        .producer(
            "emit",
            sync_producer(|args| Ok(args.get("text").cloned().unwrap_or(Value::Null))),
        )
        .output(OutputSlot::new("value", [TypeTag::Text], "emit"))
        .build_ref()
        .unwrap()
}

/// List-collecting sink: joins every `parts` value with a space.
pub fn concat(id: &str) -> ComponentRef {
    Component::builder("Concat")
        .id(id)
        .input(InputSlot::new("parts", [TypeTag::Text]).list(true))
        .producer(
            "join",
            sync_producer(|args| {
                let parts = args
                    .get("parts")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                let joined = parts
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(" ");
                Ok(Value::String(joined))
            }),
        )
        .output(OutputSlot::new("result", [TypeTag::Text], "join"))
        .build_ref()
        .unwrap()
}

/// Integer -> Integer: doubles its `count` input.
pub fn doubler(id: &str) -> ComponentRef {
    Component::builder("Doubler")
        .id(id)
        .input(InputSlot::new("count", [TypeTag::Integer]).required(true))
        .producer(
            "double",
            sync_producer(|args| {
                let count = args.get("count").and_then(Value::as_i64).unwrap_or(0);
                Ok(Value::from(count * 2))
            }),
        )
        .output(OutputSlot::new("result", [TypeTag::Integer], "double"))
        .build_ref()
        .unwrap()
}

/// Two outputs in a fixed declaration order, for tie-break tests:
/// `num` (Integer) first, `text` (Text) second.
pub fn pair_source(id: &str) -> ComponentRef {
    Component::builder("PairSource")
        .id(id)
        .producer("make_num", sync_producer(|_| Ok(Value::from(7))))
        .producer(
            "make_text",
            sync_producer(|_| Ok(Value::String("seven".into()))),
        )
        .output(OutputSlot::new("num", [TypeTag::Integer], "make_num"))
        .output(OutputSlot::new("text", [TypeTag::Text], "make_text"))
        .build_ref()
        .unwrap()
}

/// Source whose producer always fails with the given message.
pub fn failing(id: &str, message: &str) -> ComponentRef {
    let message = message.to_string();
    Component::builder("Failing")
        .id(id)
        .producer(
            "explode",
            sync_producer(move |_args| Err(ProducerError::new(message.clone()))),
        )
        .output(OutputSlot::new("result", [TypeTag::Any], "explode"))
        .build_ref()
        .unwrap()
}

/// Source that sleeps before emitting, for deadline and cancellation tests.
pub fn slow_text(id: &str, delay: Duration, text: &str) -> ComponentRef {
    let text = text.to_string();
    Component::builder("SlowText")
        .id(id)
        .producer(
            "emit",
            producer(move |_args| {
                let text = text.clone();
                async move {
                    tokio::time::sleep(delay).await;
                    Ok(Value::String(text))
                }
            }),
        )
        .output(OutputSlot::new("result", [TypeTag::Text], "emit"))
        .build_ref()
        .unwrap()
}
