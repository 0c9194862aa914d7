//! Persistence: saving assembled graphs and loading them back.
//!
//! A [`GraphDocument`] is a self-describing JSON structure: every node
//! carries its full contract (slots with type tags), its literal parameter
//! values and, for function-backed components, the captured source text.
//! Producer *code* is never persisted; reloading goes through a
//! [`ComponentRegistry`] that maps type names back to factories supplying
//! the behavior.
//!
//! Loading re-validates every edge against the freshly built contracts, so
//! a hand-edited document cannot smuggle in a type-incompatible wiring:
//! the same [`check_edge`](crate::resolver::check_edge) rule that gated
//! the original `set` call gates the reload.
//!
//! Serialization is deterministic: nodes appear in discovery order, edges
//! in wiring order, and parameter maps are sorted by key, so serializing
//! an unchanged graph twice produces byte-identical output.

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::adapter::FnSignature;
use crate::assembler::{self, AssemblyError, Graph};
use crate::component::{Binding, ComponentRef, Producer, WiringError};
use crate::contract::{ContractError, InputSlot, OutputSlot};
use crate::resolver::{Edge, ResolveError};
use crate::types::Value;

/// Current document format version.
pub const DOCUMENT_VERSION: u32 = 1;

/// One persisted component: identity, full contract, literal values and
/// optional captured source text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    pub id: String,
    pub component_type: String,
    pub display_name: String,
    pub inputs: Vec<InputSlot>,
    pub outputs: Vec<OutputSlot>,
    /// Literal values at assembly time, sorted by key for stable output.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, Value>,
    /// Source text carried verbatim for function-backed components. Never
    /// evaluated on load; behavior always comes from the registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// The persisted form of an assembled graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub version: u32,
    pub nodes: Vec<NodeDocument>,
    pub edges: Vec<Edge>,
}

/// Errors raised while serializing or loading a graph document.
#[derive(Debug, Error, Diagnostic)]
pub enum SerializeError {
    /// The document's format version is not supported by this build.
    #[error("unsupported document version {found} (supported: {DOCUMENT_VERSION})")]
    #[diagnostic(code(loomflow::serializer::unsupported_version))]
    UnsupportedVersion { found: u32 },

    /// A node names a component type with no registered factory.
    #[error("node '{id}' has component type '{component_type}' with no registered factory")]
    #[diagnostic(
        code(loomflow::serializer::unknown_component_type),
        help("Register a factory for this type on the ComponentRegistry before loading.")
    )]
    UnknownComponentType { id: String, component_type: String },

    /// Two nodes in the document share an id.
    #[error("document contains two nodes with the id '{id}'")]
    #[diagnostic(code(loomflow::serializer::duplicate_node))]
    DuplicateNode { id: String },

    /// An edge references a node id absent from the document.
    #[error("edge {edge} references missing node '{missing}'")]
    #[diagnostic(code(loomflow::serializer::dangling_edge))]
    DanglingEdge { edge: Edge, missing: String },

    /// A factory failed to rebuild its component.
    #[error("factory for '{component_type}' failed: {message}")]
    #[diagnostic(code(loomflow::serializer::factory))]
    Factory {
        component_type: String,
        message: String,
    },

    /// Rebuilt contract failed validation.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Contract(#[from] ContractError),

    /// A persisted edge failed re-validation against the rebuilt contracts.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Incompatible(#[from] ResolveError),

    /// Re-wiring a persisted edge failed (unknown input or output name).
    #[error(transparent)]
    #[diagnostic(transparent)]
    Wiring(#[from] WiringError),

    /// Reassembly of the loaded graph failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Assembly(#[from] AssemblyError),

    /// The document is not valid JSON for this format.
    #[error("graph document JSON error: {0}")]
    #[diagnostic(code(loomflow::serializer::json))]
    Json(#[from] serde_json::Error),
}

/// Factory rebuilding a live component from its persisted node.
pub type ComponentFactory =
    Arc<dyn Fn(&NodeDocument) -> Result<ComponentRef, SerializeError> + Send + Sync>;

/// Maps component type names to the factories that supply their behavior.
///
/// Function-backed components registered through
/// [`register_function`](Self::register_function) are stored under the
/// `Function:`-prefixed type name the adapter assigns them.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    factories: FxHashMap<String, ComponentFactory>,
}

impl ComponentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for a component type. Replaces any previous
    /// registration for the same type name.
    pub fn register(
        &mut self,
        component_type: impl Into<String>,
        factory: impl Fn(&NodeDocument) -> Result<ComponentRef, SerializeError>
        + Send
        + Sync
        + 'static,
    ) {
        self.factories.insert(component_type.into(), Arc::new(factory));
    }

    /// Register a function adapter entry: the signature describes the
    /// contract, the producer supplies the behavior. Nodes persisted from
    /// the matching [`FunctionComponent`] rebuild through this entry.
    ///
    /// [`FunctionComponent`]: crate::adapter::FunctionComponent
    pub fn register_function(&mut self, signature: FnSignature, producer: Producer) {
        let type_name = signature.type_name();
        self.register(type_name, move |node: &NodeDocument| {
            let component = crate::adapter::FunctionComponent::from_fn_with_id(
                signature.clone(),
                producer.clone(),
                node.id.clone(),
            )
            .map_err(|e| SerializeError::Factory {
                component_type: node.component_type.clone(),
                message: e.to_string(),
            })?;
            let component = match &node.source {
                Some(text) => component.with_source(text.clone()),
                None => component,
            };
            let component = component.into_ref();
            bind_literals(&component, node)?;
            Ok(component)
        });
    }

    /// Whether a factory exists for the given type name.
    #[must_use]
    pub fn contains(&self, component_type: &str) -> bool {
        self.factories.contains_key(component_type)
    }

    fn get(&self, component_type: &str) -> Option<&ComponentFactory> {
        self.factories.get(component_type)
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        f.debug_struct("ComponentRegistry")
            .field("types", &types)
            .finish()
    }
}

/// Bind every persisted param whose key matches a declared input as a
/// literal. Keys without a matching input are builder-level params the
/// factory is expected to have handled itself.
pub fn bind_literals(component: &ComponentRef, node: &NodeDocument) -> Result<(), SerializeError> {
    for (key, value) in &node.params {
        let is_input = component.inputs().iter().any(|s| s.name == *key);
        if is_input {
            component.set(key, Binding::Literal(value.clone()))?;
        }
    }
    Ok(())
}

/// Project an assembled graph into its persisted document form.
#[must_use]
pub fn serialize(graph: &Graph) -> GraphDocument {
    let nodes = graph
        .order()
        .iter()
        .filter_map(|id| graph.vertex(id))
        .map(|vertex| NodeDocument {
            id: vertex.id.clone(),
            component_type: vertex.component_type.clone(),
            display_name: vertex.component.display_name().to_string(),
            inputs: vertex.component.inputs().to_vec(),
            outputs: vertex.component.outputs().to_vec(),
            params: vertex
                .params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            source: vertex.component.source(),
        })
        .collect();
    GraphDocument {
        version: DOCUMENT_VERSION,
        nodes,
        edges: graph.edges().to_vec(),
    }
}

/// Serialize a graph straight to pretty-printed JSON.
pub fn to_json(graph: &Graph) -> Result<String, SerializeError> {
    Ok(serde_json::to_string_pretty(&serialize(graph))?)
}

/// Rebuild a live, assembled graph from a persisted document.
///
/// Every node is rebuilt through the registry, every persisted literal is
/// re-bound, and every edge is re-wired through the resolver so the loaded
/// graph passes exactly the checks the original construction did.
#[tracing::instrument(skip(doc, registry), fields(nodes = doc.nodes.len(), edges = doc.edges.len()))]
pub fn deserialize(doc: &GraphDocument, registry: &ComponentRegistry) -> Result<Graph, SerializeError> {
    if doc.version != DOCUMENT_VERSION {
        return Err(SerializeError::UnsupportedVersion { found: doc.version });
    }

    let mut components: FxHashMap<String, ComponentRef> = FxHashMap::default();
    let mut roots: Vec<ComponentRef> = Vec::with_capacity(doc.nodes.len());
    for node in &doc.nodes {
        if components.contains_key(&node.id) {
            return Err(SerializeError::DuplicateNode {
                id: node.id.clone(),
            });
        }
        let factory =
            registry
                .get(&node.component_type)
                .ok_or_else(|| SerializeError::UnknownComponentType {
                    id: node.id.clone(),
                    component_type: node.component_type.clone(),
                })?;
        let component = factory(node)?;
        components.insert(node.id.clone(), component.clone());
        roots.push(component);
    }

    for edge in &doc.edges {
        let source = components
            .get(&edge.source_id)
            .ok_or_else(|| SerializeError::DanglingEdge {
                edge: edge.clone(),
                missing: edge.source_id.clone(),
            })?;
        let target = components
            .get(&edge.target_id)
            .ok_or_else(|| SerializeError::DanglingEdge {
                edge: edge.clone(),
                missing: edge.target_id.clone(),
            })?;
        // set() with an explicit output runs the full resolver check, so
        // an edited document cannot reconnect incompatible slots.
        target.set(
            &edge.target_input,
            Binding::output(source, edge.source_output.clone()),
        )?;
    }

    Ok(assembler::assemble(&roots)?)
}

/// Parse a JSON document and rebuild the graph in one step.
pub fn from_json(json: &str, registry: &ComponentRegistry) -> Result<Graph, SerializeError> {
    let doc: GraphDocument = serde_json::from_str(json)?;
    deserialize(&doc, registry)
}
