//! Components: nodes that own a contract plus bound values and producers.
//!
//! This module provides the [`ComponentLike`] capability trait that the
//! rest of the engine depends on, the hand-declared [`Component`] with its
//! fluent [`ComponentBuilder`], and the [`set`](ComponentLike::set)
//! operation that binds literals or wires edges through the resolver.
//!
//! # Design Principles
//!
//! - **Contract first**: slots are immutable once a component is built;
//!   only bound values and links change afterwards.
//! - **Uniform capability**: the assembler, scheduler and serializer see
//!   only [`ComponentLike`], never concrete types, so adapter-synthesized
//!   components participate everywhere a hand-declared one can.
//! - **Wiring-time validation**: every edge goes through the resolver when
//!   `set` is called; type errors surface before any execution.
//!
//! # Examples
//!
//! ```rust
//! use loomflow::component::{Binding, Component, ComponentLike, sync_producer};
//! use loomflow::contract::{InputSlot, OutputSlot};
//! use loomflow::types::{TypeTag, Value};
//!
//! let upper = Component::builder("Upper")
//!     .id("upper-1")
//!     .input(InputSlot::new("text", [TypeTag::Text]).required(true))
//!     .producer(
//!         "to_upper",
//!         sync_producer(|args| {
//!             let text = args
//!                 .get("text")
//!                 .and_then(Value::as_str)
//!                 .unwrap_or_default();
//!             Ok(Value::String(text.to_uppercase()))
//!         }),
//!     )
//!     .output(OutputSlot::new("result", [TypeTag::Text], "to_upper"))
//!     .build_ref()
//!     .expect("valid contract");
//!
//! upper.set("text", Binding::literal("Hello")).unwrap();
//! assert_eq!(
//!     upper.bound_value("text"),
//!     Some(Value::String("Hello".into()))
//! );
//! ```

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use miette::Diagnostic;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

use crate::contract::{ContractError, InputSlot, OutputSlot};
use crate::resolver::{self, Edge, ResolveError};
use crate::types::Value;
use crate::utils::id_generator::IdGenerator;

/// Gathered argument values handed to a producer, keyed by input name.
pub type ProducerArgs = FxHashMap<String, Value>;

/// A callable that computes one output value from gathered inputs.
///
/// Producers are always asynchronous at the trait boundary; use
/// [`sync_producer`] to lift a plain function.
pub type Producer =
    Arc<dyn Fn(ProducerArgs) -> BoxFuture<'static, Result<Value, ProducerError>> + Send + Sync>;

/// Lift an async closure into a [`Producer`].
pub fn producer<F, Fut>(f: F) -> Producer
where
    F: Fn(ProducerArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ProducerError>> + Send + 'static,
{
    Arc::new(move |args| Box::pin(f(args)))
}

/// Lift a synchronous closure into a [`Producer`].
pub fn sync_producer<F>(f: F) -> Producer
where
    F: Fn(ProducerArgs) -> Result<Value, ProducerError> + Send + Sync + 'static,
{
    Arc::new(move |args| {
        let out = f(args);
        Box::pin(async move { out })
    })
}

/// Error raised by producer code during execution.
///
/// Producers report failures as messages; the scheduler wraps them with
/// the failing vertex's identity before surfacing them to the caller.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(loomflow::component::producer))]
pub struct ProducerError {
    pub message: String,
}

impl ProducerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<&str> for ProducerError {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ProducerError {
    fn from(s: String) -> Self {
        Self { message: s }
    }
}

/// Errors raised when invoking a component's output directly.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum InvokeError {
    /// The requested output does not exist on this component.
    #[error("component '{component}' has no output named '{output}'")]
    #[diagnostic(code(loomflow::component::unknown_output))]
    UnknownOutput { component: String, output: String },

    /// The output's producer table entry vanished; indicates an engine bug,
    /// since build-time validation guarantees resolution.
    #[error("component '{component}' lost producer '{producer}' after build")]
    #[diagnostic(code(loomflow::component::missing_producer))]
    MissingProducer { component: String, producer: String },

    /// The producer itself failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Producer(#[from] ProducerError),
}

/// Errors raised synchronously by [`ComponentLike::set`].
#[derive(Debug, Error, Diagnostic)]
pub enum WiringError {
    /// The binding names an input the component never declared.
    #[error("component '{component}' has no input named '{input}' (declared: {declared:?})")]
    #[diagnostic(
        code(loomflow::component::unknown_input),
        help("Check the input name against the component's declared contract.")
    )]
    UnknownInput {
        component: String,
        input: String,
        declared: Vec<String>,
    },

    /// Edge resolution failed (no matching output, unknown output, or
    /// incompatible types).
    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolve(#[from] ResolveError),
}

/// Shared handle to anything that satisfies the component capability set.
pub type ComponentRef = Arc<dyn ComponentLike>;

/// A validated connection from an upstream component into one of this
/// component's inputs, recorded on the target at wiring time.
///
/// The edge itself is id-based (a relation, not ownership); the `source`
/// handle exists so the assembler can traverse into upstream components.
///
/// The handle is strong, so mutually wired components keep each other
/// alive: a cyclic wiring is not reclaimed until at least one side's
/// links are cleared with [`ComponentLike::take_links`].
#[derive(Clone)]
pub struct Link {
    /// The resolver-validated edge.
    pub edge: Edge,
    /// Handle to the upstream component for graph discovery.
    pub source: ComponentRef,
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link").field("edge", &self.edge).finish()
    }
}

/// How a value arrives at an input: a literal, a bare component (output
/// inferred by the resolver), or an explicit output.
pub enum Binding {
    /// Bind a literal value to the input.
    Literal(Value),
    /// Wire from a component, letting the resolver pick the first
    /// type-compatible output in declaration order.
    Component(ComponentRef),
    /// Wire from an explicitly named output.
    Output {
        component: ComponentRef,
        output: String,
    },
}

impl Binding {
    /// Bind a literal value.
    pub fn literal(value: impl Into<Value>) -> Self {
        Binding::Literal(value.into())
    }

    /// Wire from a component, output inferred by type compatibility.
    pub fn component(source: &ComponentRef) -> Self {
        Binding::Component(Arc::clone(source))
    }

    /// Wire from an explicit output of a component.
    pub fn output(source: &ComponentRef, output: impl Into<String>) -> Self {
        Binding::Output {
            component: Arc::clone(source),
            output: output.into(),
        }
    }
}

/// Capability set every graph node exposes.
///
/// Hand-declared [`Component`]s and adapter-synthesized
/// [`FunctionComponent`](crate::adapter::FunctionComponent)s both implement
/// this trait; everything downstream (resolver, assembler, scheduler,
/// serializer) is oblivious to the distinction.
#[async_trait]
pub trait ComponentLike: Send + Sync {
    /// Stable identity, unique within a graph.
    fn id(&self) -> &str;

    /// Type name used for registry lookup on deserialization.
    fn component_type(&self) -> &str;

    /// Human-readable name; defaults to the component type.
    fn display_name(&self) -> &str {
        self.component_type()
    }

    /// Declared inputs, in declaration order.
    fn inputs(&self) -> &[InputSlot];

    /// Declared outputs, in declaration order.
    fn outputs(&self) -> &[OutputSlot];

    /// Scalar parameters not exposed as inputs.
    fn params(&self) -> &FxHashMap<String, Value>;

    /// Currently bound literal for an input, falling back to the declared
    /// default. `None` when the input is unset.
    fn bound_value(&self, input: &str) -> Option<Value>;

    /// Snapshot of the recorded incoming links.
    fn links(&self) -> Vec<Link>;

    /// Remove and return every recorded link, leaving the component
    /// unwired. Also the release valve for cyclic wirings, whose strong
    /// [`Link`] handles otherwise keep each other alive.
    fn take_links(&self) -> Vec<Link> {
        Vec::new()
    }

    /// Bind a literal or wire an edge into the named input.
    ///
    /// Edge bindings are validated through the resolver; all failures are
    /// raised here, never deferred to execution time.
    fn set(&self, input: &str, binding: Binding) -> Result<(), WiringError>;

    /// Bind several inputs in order, stopping at the first failure.
    fn set_many(&self, bindings: Vec<(String, Binding)>) -> Result<(), WiringError> {
        for (input, binding) in bindings {
            self.set(&input, binding)?;
        }
        Ok(())
    }

    /// Invoke the named output's producer with gathered argument values.
    async fn invoke(&self, output: &str, args: ProducerArgs) -> Result<Value, InvokeError>;

    /// Captured source text, when this component wraps a function whose
    /// definition should travel with the persisted document.
    fn source(&self) -> Option<String> {
        None
    }
}

#[derive(Default)]
struct WiringState {
    values: FxHashMap<String, Value>,
    links: Vec<Link>,
}

/// A hand-declared component: a named node owning typed slots, scalar
/// parameters and a producer table.
///
/// Built through [`Component::builder`]; the contract is validated once at
/// build time and immutable afterwards. Wiring state (bound values and
/// links) lives behind a lock so shared handles can be mutated through
/// [`set`](ComponentLike::set) until the graph is assembled.
pub struct Component {
    id: String,
    component_type: String,
    display_name: String,
    inputs: Vec<InputSlot>,
    outputs: Vec<OutputSlot>,
    params: FxHashMap<String, Value>,
    producers: FxHashMap<String, Producer>,
    wiring: RwLock<WiringState>,
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.id)
            .field("component_type", &self.component_type)
            .field("display_name", &self.display_name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("params", &self.params)
            .finish()
    }
}

impl Component {
    /// Start building a component of the given type.
    #[must_use]
    pub fn builder(component_type: impl Into<String>) -> ComponentBuilder {
        ComponentBuilder::new(component_type)
    }

    fn attach_link(&self, slot_name: &str, is_list: bool, link: Link) {
        let mut wiring = self.wiring.write();
        if !is_list {
            wiring.links.retain(|l| l.edge.target_input != slot_name);
        }
        wiring.links.push(link);
    }

    fn find_input(&self, input: &str) -> Result<&InputSlot, WiringError> {
        self.inputs
            .iter()
            .find(|s| s.name == input)
            .ok_or_else(|| WiringError::UnknownInput {
                component: self.id.clone(),
                input: input.to_string(),
                declared: self.inputs.iter().map(|s| s.name.clone()).collect(),
            })
    }
}

impl Drop for Component {
    fn drop(&mut self) {
        // Unwind deep wirings iteratively: dropping the tail of a long
        // chain must not recurse once per upstream component. Draining a
        // sole-owner source's links before its handle drops keeps each
        // nested drop shallow.
        let mut stack: Vec<Link> = std::mem::take(&mut self.wiring.get_mut().links);
        while let Some(link) = stack.pop() {
            if Arc::strong_count(&link.source) == 1 {
                stack.extend(link.source.take_links());
            }
        }
    }
}

#[async_trait]
impl ComponentLike for Component {
    fn id(&self) -> &str {
        &self.id
    }

    fn component_type(&self) -> &str {
        &self.component_type
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn inputs(&self) -> &[InputSlot] {
        &self.inputs
    }

    fn outputs(&self) -> &[OutputSlot] {
        &self.outputs
    }

    fn params(&self) -> &FxHashMap<String, Value> {
        &self.params
    }

    fn bound_value(&self, input: &str) -> Option<Value> {
        if let Some(v) = self.wiring.read().values.get(input) {
            return Some(v.clone());
        }
        self.inputs
            .iter()
            .find(|s| s.name == input)
            .and_then(|s| s.default.clone())
    }

    fn links(&self) -> Vec<Link> {
        self.wiring.read().links.clone()
    }

    fn take_links(&self) -> Vec<Link> {
        std::mem::take(&mut self.wiring.write().links)
    }

    fn set(&self, input: &str, binding: Binding) -> Result<(), WiringError> {
        let slot = self.find_input(input)?;
        match binding {
            Binding::Literal(value) => {
                tracing::debug!(component = %self.id, input, "binding literal value");
                self.wiring
                    .write()
                    .values
                    .insert(slot.name.clone(), value);
            }
            Binding::Component(source) => {
                let edge = resolver::resolve_component(source.as_ref(), &self.id, slot)?;
                tracing::debug!(
                    source = %edge.source_id,
                    output = %edge.source_output,
                    target = %self.id,
                    input,
                    "wired edge (output inferred)"
                );
                self.attach_link(&slot.name, slot.is_list, Link { edge, source });
            }
            Binding::Output { component, output } => {
                let edge = resolver::resolve_output(component.as_ref(), &output, &self.id, slot)?;
                tracing::debug!(
                    source = %edge.source_id,
                    output = %edge.source_output,
                    target = %self.id,
                    input,
                    "wired edge (explicit output)"
                );
                self.attach_link(
                    &slot.name,
                    slot.is_list,
                    Link {
                        edge,
                        source: component,
                    },
                );
            }
        }
        Ok(())
    }

    async fn invoke(&self, output: &str, args: ProducerArgs) -> Result<Value, InvokeError> {
        let slot = self
            .outputs
            .iter()
            .find(|s| s.name == output)
            .ok_or_else(|| InvokeError::UnknownOutput {
                component: self.id.clone(),
                output: output.to_string(),
            })?;
        let producer =
            self.producers
                .get(&slot.producer)
                .ok_or_else(|| InvokeError::MissingProducer {
                    component: self.id.clone(),
                    producer: slot.producer.clone(),
                })?;
        Ok(producer(args).await?)
    }
}

/// Fluent builder for hand-declared components.
///
/// `build` validates the whole contract at once: duplicate slot names,
/// empty type sets, and producer resolution all fail here, before the
/// component can participate in any wiring.
pub struct ComponentBuilder {
    id: Option<String>,
    component_type: String,
    display_name: Option<String>,
    inputs: Vec<InputSlot>,
    outputs: Vec<OutputSlot>,
    params: FxHashMap<String, Value>,
    producers: FxHashMap<String, Producer>,
}

impl ComponentBuilder {
    fn new(component_type: impl Into<String>) -> Self {
        Self {
            id: None,
            component_type: component_type.into(),
            display_name: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            params: FxHashMap::default(),
            producers: FxHashMap::default(),
        }
    }

    /// Supply a stable id; generated from the type name when omitted.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Override the human-readable name.
    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Declare an input slot.
    #[must_use]
    pub fn input(mut self, slot: InputSlot) -> Self {
        self.inputs.push(slot);
        self
    }

    /// Declare an output slot; its producer name is resolved at build.
    #[must_use]
    pub fn output(mut self, slot: OutputSlot) -> Self {
        self.outputs.push(slot);
        self
    }

    /// Register a named producer callable.
    #[must_use]
    pub fn producer(mut self, name: impl Into<String>, producer: Producer) -> Self {
        self.producers.insert(name.into(), producer);
        self
    }

    /// Attach a scalar parameter not exposed as an input.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Validate the contract and produce the component.
    pub fn build(self) -> Result<Component, ContractError> {
        let id = self
            .id
            .unwrap_or_else(|| IdGenerator::new().component_id(&self.component_type));

        let mut seen_inputs: Vec<&str> = Vec::new();
        for slot in &self.inputs {
            if seen_inputs.contains(&slot.name.as_str()) {
                return Err(ContractError::DuplicateInput {
                    component: id,
                    name: slot.name.clone(),
                });
            }
            if slot.accepted_types.is_empty() {
                return Err(ContractError::EmptyTypeSet {
                    component: id,
                    slot: slot.name.clone(),
                });
            }
            seen_inputs.push(&slot.name);
        }

        let mut seen_outputs: Vec<&str> = Vec::new();
        for slot in &self.outputs {
            if seen_outputs.contains(&slot.name.as_str()) {
                return Err(ContractError::DuplicateOutput {
                    component: id,
                    name: slot.name.clone(),
                });
            }
            if slot.produced_types.is_empty() {
                return Err(ContractError::EmptyTypeSet {
                    component: id,
                    slot: slot.name.clone(),
                });
            }
            if !self.producers.contains_key(&slot.producer) {
                return Err(ContractError::InvalidProducer {
                    component: id,
                    output: slot.name.clone(),
                    producer: slot.producer.clone(),
                });
            }
            seen_outputs.push(&slot.name);
        }

        Ok(Component {
            id,
            display_name: self
                .display_name
                .unwrap_or_else(|| self.component_type.clone()),
            component_type: self.component_type,
            inputs: self.inputs,
            outputs: self.outputs,
            params: self.params,
            producers: self.producers,
            wiring: RwLock::new(WiringState::default()),
        })
    }

    /// Validate and return a shared [`ComponentRef`] directly.
    pub fn build_ref(self) -> Result<ComponentRef, ContractError> {
        Ok(Arc::new(self.build()?))
    }
}
