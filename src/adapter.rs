//! Function adapter: turning a plain function into a full component.
//!
//! A function participates in a graph once its shape is described by a
//! [`FnSignature`]: parameter names, types and defaults become input
//! slots, the return type becomes a single `result` output, and the
//! callable itself becomes that output's producer. Signatures are explicit
//! metadata, declared alongside the function rather than recovered by
//! runtime inspection; a signature marked [opaque](FnSignature::opaque)
//! cannot be adapted and fails with [`AdapterError::Uninspectable`].
//!
//! Per-parameter descriptions can be supplied directly or mined from an
//! attached doc string's `Args:` section (see [`parse_param_docs`]).
//!
//! # Examples
//!
//! ```rust
//! use loomflow::adapter::{FnParam, FnSignature, FunctionComponent, ParamType};
//! use loomflow::component::{sync_producer, Binding, ComponentLike};
//! use loomflow::types::Value;
//!
//! let signature = FnSignature::new("shout")
//!     .param(FnParam::new("text", ParamType::Text))
//!     .returns(ParamType::Text);
//! let component = FunctionComponent::from_fn(
//!     signature,
//!     sync_producer(|args| {
//!         let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
//!         Ok(Value::String(format!("{}!", text.to_uppercase())))
//!     }),
//! )
//! .unwrap()
//! .into_ref();
//!
//! assert_eq!(component.display_name(), "Shout");
//! component.set("text", Binding::literal("hey")).unwrap();
//! ```

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::component::{
    Binding, Component, ComponentLike, ComponentRef, InvokeError, Link, Producer, ProducerArgs,
    WiringError,
};
use crate::contract::{ContractError, InputSlot, OutputSlot};
use crate::types::{TypeTag, Value};
use crate::utils::title_case;

/// The parameter/return type vocabulary for adapted functions.
///
/// Each variant maps onto a [`TypeTag`]; `List` additionally marks the
/// input as list-collecting. `Opaque` is the fallback for types with no
/// mapping and resolves to the permissive `Any` tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamType {
    Text,
    Integer,
    Number,
    Boolean,
    Data,
    /// A list of some element type; the element type gates connections.
    List(Box<ParamType>),
    /// A domain-defined named type.
    Custom(String),
    /// No usable type information; treated as `Any`.
    Opaque,
}

impl ParamType {
    /// The type tag this parameter type gates connections with.
    #[must_use]
    pub fn tag(&self) -> TypeTag {
        match self {
            ParamType::Text => TypeTag::Text,
            ParamType::Integer => TypeTag::Integer,
            ParamType::Number => TypeTag::Number,
            ParamType::Boolean => TypeTag::Boolean,
            ParamType::Data => TypeTag::Data,
            ParamType::List(element) => element.tag(),
            ParamType::Custom(name) => TypeTag::Custom(name.clone()),
            ParamType::Opaque => TypeTag::Any,
        }
    }

    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self, ParamType::List(_))
    }
}

/// How a parameter participates in the call.
///
/// Only `Normal` parameters become input slots; receivers and variadic
/// catch-alls are skipped during adaptation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ParamKind {
    #[default]
    Normal,
    Receiver,
    Variadic,
}

/// One declared parameter of an adapted function.
#[derive(Clone, Debug)]
pub struct FnParam {
    pub name: String,
    pub param_type: ParamType,
    pub kind: ParamKind,
    /// Declared default; a parameter without one becomes a required input.
    pub default: Option<Value>,
    /// Explicit description; overrides anything mined from the doc string.
    pub info: Option<String>,
}

impl FnParam {
    pub fn new(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            kind: ParamKind::Normal,
            default: None,
            info: None,
        }
    }

    /// A receiver parameter (`self`-like); never becomes an input.
    pub fn receiver(name: impl Into<String>) -> Self {
        Self {
            kind: ParamKind::Receiver,
            ..Self::new(name, ParamType::Opaque)
        }
    }

    /// A variadic catch-all; never becomes an input.
    pub fn variadic(name: impl Into<String>) -> Self {
        Self {
            kind: ParamKind::Variadic,
            ..Self::new(name, ParamType::Opaque)
        }
    }

    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }
}

/// Explicit shape metadata for a function: the adapter's replacement for
/// runtime reflection.
#[derive(Clone, Debug)]
pub struct FnSignature {
    pub name: String,
    pub params: Vec<FnParam>,
    pub return_type: ParamType,
    /// Attached doc string; its `Args:` section feeds per-input info.
    pub doc: Option<String>,
    inspectable: bool,
}

impl FnSignature {
    /// Start describing an inspectable function.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type: ParamType::Opaque,
            doc: None,
            inspectable: true,
        }
    }

    /// A signature whose shape could not be determined. Adapting it always
    /// fails with [`AdapterError::Uninspectable`].
    #[must_use]
    pub fn opaque(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type: ParamType::Opaque,
            doc: None,
            inspectable: false,
        }
    }

    /// Declare a parameter, in call order.
    #[must_use]
    pub fn param(mut self, param: FnParam) -> Self {
        self.params.push(param);
        self
    }

    /// Declare the return type.
    #[must_use]
    pub fn returns(mut self, return_type: ParamType) -> Self {
        self.return_type = return_type;
        self
    }

    /// Attach the function's doc string.
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// The registry type name adapted components carry, e.g. `Function:shout`.
    #[must_use]
    pub fn type_name(&self) -> String {
        format!("Function:{}", self.name)
    }
}

/// Errors raised while adapting a function.
#[derive(Debug, Error, Diagnostic)]
pub enum AdapterError {
    /// The signature carries no usable shape information.
    #[error("function '{name}' cannot be adapted: its signature is not inspectable")]
    #[diagnostic(
        code(loomflow::adapter::uninspectable),
        help("Describe the function with FnSignature::new and explicit parameters.")
    )]
    Uninspectable { name: String },

    /// The derived contract failed validation (e.g. duplicate parameter names).
    #[error(transparent)]
    #[diagnostic(transparent)]
    Contract(#[from] ContractError),
}

/// A component synthesized from a function signature and a producer.
///
/// Indistinguishable from a hand-declared component everywhere downstream:
/// the resolver, assembler, scheduler and serializer all see it through
/// [`ComponentLike`]. The only addition is an optional captured source
/// text that travels with persisted documents.
pub struct FunctionComponent {
    inner: Component,
    source: Option<String>,
}

impl std::fmt::Debug for FunctionComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionComponent")
            .field("id", &self.inner.id())
            .field("component_type", &self.inner.component_type())
            .field("source", &self.source)
            .finish()
    }
}

impl FunctionComponent {
    /// Adapt a function with a generated component id.
    pub fn from_fn(signature: FnSignature, producer: Producer) -> Result<Self, AdapterError> {
        Self::build(signature, producer, None)
    }

    /// Adapt a function with an explicit component id (used when
    /// rebuilding from a persisted document).
    pub fn from_fn_with_id(
        signature: FnSignature,
        producer: Producer,
        id: impl Into<String>,
    ) -> Result<Self, AdapterError> {
        Self::build(signature, producer, Some(id.into()))
    }

    fn build(
        signature: FnSignature,
        producer: Producer,
        id: Option<String>,
    ) -> Result<Self, AdapterError> {
        if !signature.inspectable {
            return Err(AdapterError::Uninspectable {
                name: signature.name,
            });
        }

        let param_docs = signature
            .doc
            .as_deref()
            .map(parse_param_docs)
            .unwrap_or_default();

        let mut builder = Component::builder(signature.type_name())
            .display_name(title_case(&signature.name));
        if let Some(id) = id {
            builder = builder.id(id);
        }
        for param in &signature.params {
            if param.kind != ParamKind::Normal {
                continue;
            }
            let mut slot = InputSlot::new(&param.name, [param.param_type.tag()])
                .required(param.default.is_none())
                .list(param.param_type.is_list());
            if let Some(default) = &param.default {
                slot = slot.with_default(default.clone());
            }
            let info = param
                .info
                .clone()
                .or_else(|| param_docs.get(&param.name).cloned());
            if let Some(info) = info {
                slot = slot.with_info(info);
            }
            builder = builder.input(slot);
        }
        builder = builder
            .producer("invoke", producer)
            .output(OutputSlot::new(
                "result",
                [signature.return_type.tag()],
                "invoke",
            ));

        Ok(Self {
            inner: builder.build()?,
            source: None,
        })
    }

    /// Attach the function's source text so it travels with persisted
    /// documents. The text is carried verbatim and never evaluated.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Wrap into a shared [`ComponentRef`].
    #[must_use]
    pub fn into_ref(self) -> ComponentRef {
        std::sync::Arc::new(self)
    }
}

#[async_trait]
impl ComponentLike for FunctionComponent {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn component_type(&self) -> &str {
        self.inner.component_type()
    }

    fn display_name(&self) -> &str {
        self.inner.display_name()
    }

    fn inputs(&self) -> &[InputSlot] {
        self.inner.inputs()
    }

    fn outputs(&self) -> &[OutputSlot] {
        self.inner.outputs()
    }

    fn params(&self) -> &FxHashMap<String, Value> {
        self.inner.params()
    }

    fn bound_value(&self, input: &str) -> Option<Value> {
        self.inner.bound_value(input)
    }

    fn links(&self) -> Vec<Link> {
        self.inner.links()
    }

    fn take_links(&self) -> Vec<Link> {
        self.inner.take_links()
    }

    fn set(&self, input: &str, binding: Binding) -> Result<(), WiringError> {
        self.inner.set(input, binding)
    }

    async fn invoke(&self, output: &str, args: ProducerArgs) -> Result<Value, InvokeError> {
        self.inner.invoke(output, args).await
    }

    fn source(&self) -> Option<String> {
        self.source.clone()
    }
}

/// Extract per-parameter descriptions from a doc string's `Args:` section
/// (`Arguments:` and `Parameters:` are accepted as synonyms).
///
/// Lines after the header of the form `name: description` or
/// `name (type): description` start an entry; indented lines without a
/// colon continue the previous entry. A blank line or another section
/// header (`Returns:`, `Raises:`, ...) ends the section.
#[must_use]
pub fn parse_param_docs(doc: &str) -> FxHashMap<String, String> {
    let mut docs: FxHashMap<String, String> = FxHashMap::default();
    let mut in_args = false;
    let mut current: Option<String> = None;

    for line in doc.lines() {
        let trimmed = line.trim();
        if !in_args {
            if matches!(trimmed, "Args:" | "Arguments:" | "Parameters:") {
                in_args = true;
            }
            continue;
        }
        if trimmed.is_empty() {
            break;
        }
        // Another section header ends Args.
        if trimmed.ends_with(':') && !trimmed[..trimmed.len() - 1].contains(':') {
            let header = &trimmed[..trimmed.len() - 1];
            if !header.contains(' ') && header.chars().next().is_some_and(char::is_uppercase) {
                break;
            }
        }
        if let Some((raw_name, description)) = trimmed.split_once(':') {
            let name = raw_name
                .split('(')
                .next()
                .unwrap_or(raw_name)
                .trim()
                .to_string();
            if !name.is_empty() && !name.contains(' ') {
                docs.insert(name.clone(), description.trim().to_string());
                current = Some(name);
                continue;
            }
        }
        // Continuation of the previous entry.
        if let Some(name) = &current {
            if let Some(existing) = docs.get_mut(name) {
                if !existing.is_empty() {
                    existing.push(' ');
                }
                existing.push_str(trimmed);
            }
        }
    }
    docs
}
