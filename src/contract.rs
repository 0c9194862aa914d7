//! Contract model: the static description of a component's typed slots.
//!
//! A contract is pure data: it declares what a component accepts
//! ([`InputSlot`]) and produces ([`OutputSlot`]) without any behavior.
//! Producers are referenced *by name* and resolved against the component's
//! producer table when the component is built, so an output can never exist
//! without a callable backing it.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{TypeTag, Value};

/// A named, typed slot through which a component consumes a value.
///
/// # Examples
///
/// ```rust
/// use loomflow::contract::InputSlot;
/// use loomflow::types::TypeTag;
///
/// let slot = InputSlot::new("text", [TypeTag::Text])
///     .required(true)
///     .with_info("The text to transform");
/// assert!(slot.required);
/// assert_eq!(slot.accepted_types, vec![TypeTag::Text]);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputSlot {
    /// Slot name, unique within the owning component.
    pub name: String,
    /// Non-empty set of tags this slot accepts.
    pub accepted_types: Vec<TypeTag>,
    /// Whether a value (literal or edge) must be supplied before assembly.
    pub required: bool,
    /// Declared default value, used when nothing is bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// When true, the slot collects every incoming edge value into a list.
    #[serde(default)]
    pub is_list: bool,
    /// Human-readable description, carried into persisted documents.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub info: String,
}

impl InputSlot {
    /// Create an optional input accepting the given tags.
    pub fn new(name: impl Into<String>, accepted: impl IntoIterator<Item = TypeTag>) -> Self {
        Self {
            name: name.into(),
            accepted_types: accepted.into_iter().collect(),
            required: false,
            default: None,
            is_list: false,
            info: String::new(),
        }
    }

    /// Mark the input as required (or not).
    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Attach a declared default value.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Mark the input as list-collecting.
    #[must_use]
    pub fn list(mut self, is_list: bool) -> Self {
        self.is_list = is_list;
        self
    }

    /// Attach a human-readable description.
    #[must_use]
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }
}

/// A named, typed slot through which a component produces a value.
///
/// The `producer` field names a callable registered on the owning
/// component; resolution happens at component build time and fails with
/// [`ContractError::InvalidProducer`] when the name is unknown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputSlot {
    /// Slot name, unique within the owning component.
    pub name: String,
    /// Non-empty set of tags this slot produces.
    pub produced_types: Vec<TypeTag>,
    /// Name of the producer method backing this output.
    pub producer: String,
}

impl OutputSlot {
    /// Create an output producing the given tags, backed by a named producer.
    pub fn new(
        name: impl Into<String>,
        produced: impl IntoIterator<Item = TypeTag>,
        producer: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            produced_types: produced.into_iter().collect(),
            producer: producer.into(),
        }
    }
}

/// Errors raised while declaring a component's contract.
///
/// All variants are wiring-time errors: they surface when the component is
/// built, before any graph exists, and are always recoverable by fixing
/// the declaration.
#[derive(Debug, Error, Diagnostic)]
pub enum ContractError {
    /// An input name was declared twice on the same component.
    #[error("component '{component}' declares input '{name}' more than once")]
    #[diagnostic(
        code(loomflow::contract::duplicate_input),
        help("Input names must be unique within a component.")
    )]
    DuplicateInput { component: String, name: String },

    /// An output name was declared twice on the same component.
    #[error("component '{component}' declares output '{name}' more than once")]
    #[diagnostic(
        code(loomflow::contract::duplicate_output),
        help("Output names must be unique within a component.")
    )]
    DuplicateOutput { component: String, name: String },

    /// An output references a producer name with no registered callable.
    #[error(
        "output '{output}' on component '{component}' references unknown producer '{producer}'"
    )]
    #[diagnostic(
        code(loomflow::contract::invalid_producer),
        help("Register the producer with ComponentBuilder::producer before declaring the output.")
    )]
    InvalidProducer {
        component: String,
        output: String,
        producer: String,
    },

    /// A slot was declared with an empty type set.
    #[error("slot '{slot}' on component '{component}' declares no type tags")]
    #[diagnostic(
        code(loomflow::contract::empty_type_set),
        help("Every input and output must carry at least one type tag; use TypeTag::Any for permissive slots.")
    )]
    EmptyTypeSet { component: String, slot: String },
}
