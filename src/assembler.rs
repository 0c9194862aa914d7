//! Graph assembly: expanding a root set into a complete, flat graph.
//!
//! Assembly is a depth-first, memoized traversal driven by an explicit
//! work stack, so graph depth never translates into call-stack depth.
//! Starting from the roots, every transitively connected component is
//! discovered exactly once (a visited set keyed by component id makes
//! cycle tolerance structural), projected into a [`Vertex`], and its
//! recorded edges collected. True circular *data* dependencies are
//! deliberately not rejected here: assembly is cycle-safe, and the
//! scheduler reports them with the set of stuck vertices once in-degrees
//! are known.
//!
//! Assembling the same unmutated root set twice yields identical vertex
//! ids and identical edge lists.

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::component::ComponentRef;
use crate::resolver::Edge;
use crate::types::Value;

/// The execution-ready projection of a component within an assembled graph.
///
/// A vertex resolves everything the scheduler needs up front: literal
/// parameter values (scalar params, bound inputs and declared defaults),
/// the inputs still pending upstream values, and the incoming edges it
/// depends on.
#[derive(Clone)]
pub struct Vertex {
    /// Component id, unique within the graph.
    pub id: String,
    /// Component type name, used by the serializer's registry.
    pub component_type: String,
    /// Handle to the underlying component (treated as immutable from here on).
    pub component: ComponentRef,
    /// Literal values resolved at assembly time, keyed by name.
    pub params: FxHashMap<String, Value>,
    /// Inputs awaiting an upstream value, in edge order.
    pub pending_inputs: Vec<String>,
    /// Incoming edges this vertex depends on.
    pub incoming: Vec<Edge>,
}

impl std::fmt::Debug for Vertex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vertex")
            .field("id", &self.id)
            .field("component_type", &self.component_type)
            .field("pending_inputs", &self.pending_inputs)
            .field("incoming", &self.incoming)
            .finish()
    }
}

/// The full set of vertices and edges reachable from a root set.
///
/// A graph has no lifecycle beyond a single build/run cycle: mutating any
/// underlying component afterwards requires assembling a new graph.
#[derive(Clone, Debug)]
pub struct Graph {
    vertices: FxHashMap<String, Vertex>,
    order: Vec<String>,
    edges: Vec<Edge>,
}

impl Graph {
    /// All vertices, keyed by id.
    #[must_use]
    pub fn vertices(&self) -> &FxHashMap<String, Vertex> {
        &self.vertices
    }

    /// Look up a vertex by id.
    #[must_use]
    pub fn vertex(&self, id: &str) -> Option<&Vertex> {
        self.vertices.get(id)
    }

    /// Vertex ids in deterministic discovery order. The scheduler uses
    /// this order as its stable tie-break.
    #[must_use]
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Every edge in the graph, in discovery order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Ids of vertices with no outgoing edges, in discovery order.
    /// These are the graph's natural result vertices.
    #[must_use]
    pub fn terminal_ids(&self) -> Vec<String> {
        let sources: FxHashSet<&str> = self.edges.iter().map(|e| e.source_id.as_str()).collect();
        self.order
            .iter()
            .filter(|id| !sources.contains(id.as_str()))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Errors raised while assembling a graph.
#[derive(Debug, Error, Diagnostic)]
pub enum AssemblyError {
    /// A required input has neither a bound value nor an incoming edge.
    #[error("required input '{input}' of component '{component}' is unbound and has no incoming edge")]
    #[diagnostic(
        code(loomflow::assembler::missing_required_input),
        help("Bind a literal with set(), wire an upstream output, or declare a default.")
    )]
    MissingRequiredInput { component: String, input: String },

    /// Two distinct components share one id within the reachable set.
    #[error("two distinct components share the id '{id}'")]
    #[diagnostic(
        code(loomflow::assembler::duplicate_vertex_id),
        help("Component ids must be unique within a graph; supply explicit ids or let them be generated.")
    )]
    DuplicateVertexId { id: String },

    /// The assembled graph violated an internal consistency rule. This is
    /// an engine bug, not a user error.
    #[error("internal invariant violated during assembly: {detail}")]
    #[diagnostic(code(loomflow::assembler::internal_invariant))]
    InternalInvariant { detail: String },
}

/// Expand a root set into a complete, flat [`Graph`].
#[tracing::instrument(skip(roots), fields(roots = roots.len()))]
pub fn assemble(roots: &[ComponentRef]) -> Result<Graph, AssemblyError> {
    let mut graph = Graph {
        vertices: FxHashMap::default(),
        order: Vec::new(),
        edges: Vec::new(),
    };
    let mut visited: FxHashMap<String, ComponentRef> = FxHashMap::default();

    for root in roots {
        visit(root, &mut graph, &mut visited)?;
    }

    // Every edge endpoint must reference a vertex in this graph; a miss
    // here means the traversal itself is broken.
    for edge in &graph.edges {
        if !graph.vertices.contains_key(&edge.source_id)
            || !graph.vertices.contains_key(&edge.target_id)
        {
            return Err(AssemblyError::InternalInvariant {
                detail: format!("edge {edge} references a vertex outside the reachable set"),
            });
        }
    }

    tracing::debug!(
        vertices = graph.vertices.len(),
        edges = graph.edges.len(),
        "graph assembled"
    );
    Ok(graph)
}

fn visit(
    root: &ComponentRef,
    graph: &mut Graph,
    visited: &mut FxHashMap<String, ComponentRef>,
) -> Result<(), AssemblyError> {
    // Explicit work stack: a deep chain must not turn into deep recursion.
    // Link sources are pushed in reverse so pop order matches declaration
    // order, keeping discovery order identical to a recursive pre-order.
    let mut stack: Vec<ComponentRef> = vec![root.clone()];
    while let Some(component) = stack.pop() {
        let id = component.id().to_string();
        if let Some(seen) = visited.get(&id) {
            if std::sync::Arc::ptr_eq(seen, &component) {
                continue;
            }
            return Err(AssemblyError::DuplicateVertexId { id });
        }
        // Mark before expanding: components reachable via two paths (or a
        // cycle) are assembled once.
        visited.insert(id.clone(), component.clone());

        let links = component.links();
        let incoming: Vec<Edge> = links.iter().map(|l| l.edge.clone()).collect();

        let mut pending_inputs: Vec<String> = Vec::new();
        for edge in &incoming {
            if !pending_inputs.contains(&edge.target_input) {
                pending_inputs.push(edge.target_input.clone());
            }
        }

        let mut params = component.params().clone();
        for slot in component.inputs() {
            if let Some(value) = component.bound_value(&slot.name) {
                params.insert(slot.name.clone(), value);
            } else if slot.required && !pending_inputs.contains(&slot.name) {
                return Err(AssemblyError::MissingRequiredInput {
                    component: id,
                    input: slot.name.clone(),
                });
            }
        }

        graph.edges.extend(incoming.iter().cloned());
        graph.order.push(id.clone());
        graph.vertices.insert(
            id.clone(),
            Vertex {
                id,
                component_type: component.component_type().to_string(),
                component: component.clone(),
                params,
                pending_inputs,
                incoming,
            },
        );

        for link in links.iter().rev() {
            stack.push(link.source.clone());
        }
    }
    Ok(())
}
