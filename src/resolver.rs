//! Edge resolution: type-compatibility checks and output selection.
//!
//! The resolver is the only place edges are created. Given a candidate
//! source (a bare component or an explicit output) and a target input, it
//! decides whether a connection is legal and which output feeds it:
//!
//! 1. An explicit output is used directly, after a type check.
//! 2. A bare component is scanned in output declaration order; the first
//!    output whose produced types intersect the input's accepted types
//!    wins. This is a documented deterministic tie-break, not an error;
//!    callers wanting a different output use [`Binding::Output`].
//! 3. No qualifying output fails with [`ResolveError::NoMatchingOutput`],
//!    naming both components and *both* type sets.
//!
//! Resolution happens synchronously at wiring time; nothing executes here,
//! and failures are never deferred to a run.
//!
//! [`Binding::Output`]: crate::component::Binding::Output

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::component::ComponentLike;
use crate::contract::InputSlot;
use crate::types::{TypeTag, format_type_set, types_overlap};

/// A directed, validated relation from one component's output to another
/// component's input. Endpoints are referenced by id; an edge never owns
/// the components it connects.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source_id: String,
    pub source_output: String,
    pub target_id: String,
    pub target_input: String,
}

impl Edge {
    // Edges are only minted by the resolver; direct construction would
    // bypass the type check.
    pub(crate) fn new(
        source_id: impl Into<String>,
        source_output: impl Into<String>,
        target_id: impl Into<String>,
        target_input: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            source_output: source_output.into(),
            target_id: target_id.into(),
            target_input: target_input.into(),
        }
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.source_id, self.source_output, self.target_id, self.target_input
        )
    }
}

/// Errors raised during edge resolution, always at wiring time.
#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    /// No output on the source component can feed the target input.
    #[error(
        "no output of component '{source_id}' (produces {produced}) matches input '{target_input}' of '{target_id}' (accepts {accepted})",
        produced = format_type_set(.produced_types),
        accepted = format_type_set(.accepted_types)
    )]
    #[diagnostic(
        code(loomflow::resolver::no_matching_output),
        help("Connect an output whose produced types intersect the input's accepted types, or widen one of the type sets.")
    )]
    NoMatchingOutput {
        source_id: String,
        produced_types: Vec<TypeTag>,
        target_id: String,
        target_input: String,
        accepted_types: Vec<TypeTag>,
    },

    /// The caller named an output the source component never declared.
    #[error("component '{source_id}' has no output named '{output}'")]
    #[diagnostic(code(loomflow::resolver::unknown_output))]
    UnknownOutput { source_id: String, output: String },

    /// An explicitly chosen output does not type-check against the input.
    #[error(
        "output '{source_output}' of '{source_id}' (produces {produced}) is incompatible with input '{target_input}' of '{target_id}' (accepts {accepted})",
        produced = format_type_set(.produced_types),
        accepted = format_type_set(.accepted_types)
    )]
    #[diagnostic(
        code(loomflow::resolver::incompatible_edge),
        help("The produced and accepted type sets must share at least one tag.")
    )]
    IncompatibleEdge {
        source_id: String,
        source_output: String,
        produced_types: Vec<TypeTag>,
        target_id: String,
        target_input: String,
        accepted_types: Vec<TypeTag>,
    },
}

/// Resolve a bare-component connection: scan the source's outputs in
/// declaration order and select the first whose produced types intersect
/// the target input's accepted types.
pub fn resolve_component(
    source: &dyn ComponentLike,
    target_id: &str,
    input: &InputSlot,
) -> Result<Edge, ResolveError> {
    for output in source.outputs() {
        if types_overlap(&output.produced_types, &input.accepted_types) {
            return Ok(Edge::new(
                source.id(),
                output.name.clone(),
                target_id,
                input.name.clone(),
            ));
        }
    }
    // Diagnostic carries the union of everything the source can produce so
    // the caller sees both sides of the mismatch.
    let produced: Vec<TypeTag> = source
        .outputs()
        .iter()
        .flat_map(|o| o.produced_types.iter().cloned())
        .collect();
    Err(ResolveError::NoMatchingOutput {
        source_id: source.id().to_string(),
        produced_types: produced,
        target_id: target_id.to_string(),
        target_input: input.name.clone(),
        accepted_types: input.accepted_types.clone(),
    })
}

/// Resolve an explicit-output connection; the named output must exist and
/// still passes the type check.
pub fn resolve_output(
    source: &dyn ComponentLike,
    output: &str,
    target_id: &str,
    input: &InputSlot,
) -> Result<Edge, ResolveError> {
    let slot = source
        .outputs()
        .iter()
        .find(|o| o.name == output)
        .ok_or_else(|| ResolveError::UnknownOutput {
            source_id: source.id().to_string(),
            output: output.to_string(),
        })?;
    check_edge(
        source.id(),
        &slot.name,
        &slot.produced_types,
        target_id,
        &input.name,
        &input.accepted_types,
    )?;
    Ok(Edge::new(
        source.id(),
        slot.name.clone(),
        target_id,
        input.name.clone(),
    ))
}

/// Re-validate an edge's type compatibility from raw slot data.
///
/// Shared with the serializer so an externally edited document cannot
/// silently load an invalid wiring.
pub fn check_edge(
    source_id: &str,
    source_output: &str,
    produced_types: &[TypeTag],
    target_id: &str,
    target_input: &str,
    accepted_types: &[TypeTag],
) -> Result<(), ResolveError> {
    if types_overlap(produced_types, accepted_types) {
        return Ok(());
    }
    Err(ResolveError::IncompatibleEdge {
        source_id: source_id.to_string(),
        source_output: source_output.to_string(),
        produced_types: produced_types.to_vec(),
        target_id: target_id.to_string(),
        target_input: target_input.to_string(),
        accepted_types: accepted_types.to_vec(),
    })
}
