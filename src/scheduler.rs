//! Execution scheduling: running an assembled graph in dependency order.
//!
//! The scheduler drives one run of a [`Graph`] to completion. Each vertex
//! moves through a small state machine (`Pending -> Ready -> Running ->
//! Done | Failed`, with `Unreached` for vertices whose upstream never
//! completed). Independent vertices are dispatched concurrently as tasks,
//! but the coordinating loop is a single task: it alone reads and writes
//! the output cache, which keeps the cache a plain map with a write-once
//! discipline instead of a locked structure.
//!
//! # Failure policy
//!
//! A failing producer marks its vertex `Failed` and leaves every vertex
//! that transitively depends on it `Unreached`. Branches with no
//! dependency path from the failure run to completion; the run never
//! aborts unrelated work. This is the documented, consistent policy;
//! callers that want all-or-nothing semantics can check
//! [`RunReport::is_success`] and discard the outputs.
//!
//! # Cancellation
//!
//! A [`CancelToken`] (or the run deadline, which behaves identically) is
//! checked at every vertex-start boundary; in-flight producers are raced
//! against the token and their vertex marked `Failed` with a
//! cancellation-specific failure kind. Producers are asked to stop
//! cooperatively, never forcibly terminated.

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::{JoinError, JoinSet};
use tracing::instrument;

use crate::assembler::{Graph, Vertex};
use crate::component::{ComponentRef, InvokeError, ProducerArgs};
use crate::types::Value;
use crate::utils::id_generator::IdGenerator;

/// Per-vertex execution state for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexState {
    /// Dependencies not yet satisfied.
    Pending,
    /// All dependencies satisfied; waiting for dispatch.
    Ready,
    /// Producer in flight.
    Running,
    /// All outputs computed and cached.
    Done,
    /// Producer failed or was cancelled.
    Failed,
    /// Never became ready because an upstream vertex failed or the run
    /// was cancelled. Distinct from `Failed`: nothing here ever ran.
    Unreached,
}

/// Why a vertex failed during a run.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum VertexFailure {
    /// The vertex's producer (or output lookup) failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Invoke(#[from] InvokeError),

    /// The run was cancelled (explicitly or by deadline) while this
    /// vertex was in flight.
    #[error("execution cancelled")]
    #[diagnostic(code(loomflow::scheduler::cancelled))]
    Cancelled,
}

/// A producer failure re-raised with the failing vertex's identity.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("vertex '{vertex_id}' failed: {failure}")]
#[diagnostic(code(loomflow::scheduler::vertex_execution))]
pub struct VertexExecutionError {
    /// Id of the vertex whose producer failed.
    pub vertex_id: String,
    /// The underlying failure.
    #[source]
    pub failure: VertexFailure,
}

/// Errors that fail a whole run before or during scheduling.
#[derive(Debug, Error, Diagnostic)]
pub enum SchedulerError {
    /// No vertex was ready while unscheduled vertices remained: a true
    /// circular data dependency. Lists the stuck vertex ids.
    #[error("cyclic dependency detected; stuck vertices: {stuck:?}")]
    #[diagnostic(
        code(loomflow::scheduler::cyclic_dependency),
        help("Break the cycle by binding a literal to one of the stuck inputs.")
    )]
    CyclicDependency { stuck: Vec<String> },

    /// A scheduler task could not be joined; indicates a panic inside a
    /// producer task.
    #[error("scheduler task join error: {0}")]
    #[diagnostic(code(loomflow::scheduler::join))]
    Join(#[from] JoinError),
}

#[derive(Debug, Default)]
struct CancelInner {
    flag: AtomicBool,
    notify: Notify,
}

/// Run-level cooperative cancellation token.
///
/// Cloning yields another handle to the same token. Cancellation stops
/// the scheduler from dispatching new vertices and resolves in-flight
/// producer races.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; idempotent.
    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Wait until cancellation is requested.
    pub async fn cancelled(&self) {
        while !self.is_cancelled() {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                break;
            }
            notified.await;
        }
    }
}

/// Options controlling one run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Optional per-run deadline; exceeding it behaves exactly like
    /// cancellation.
    pub deadline: Option<Duration>,
    /// Optional externally held cancellation token.
    pub cancel: Option<CancelToken>,
    /// Per-run literal overrides, keyed by vertex id then input name.
    /// Overrides replace the literal resolved at assembly; edge-fed
    /// values still take precedence.
    pub overrides: FxHashMap<String, FxHashMap<String, Value>>,
}

/// The outcome of one run: per-vertex states, the output cache, and any
/// producer failures, with enough context to act on without re-running.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Generated identifier for this run.
    pub run_id: String,
    /// Whether the run was cancelled (explicitly or by deadline).
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    statuses: FxHashMap<String, VertexState>,
    outputs: FxHashMap<(String, String), Value>,
    errors: Vec<VertexExecutionError>,
}

impl RunReport {
    /// Cached output value for `(vertex, output)`, when the vertex ran.
    #[must_use]
    pub fn output(&self, vertex: &str, output: &str) -> Option<&Value> {
        self.outputs
            .get(&(vertex.to_string(), output.to_string()))
    }

    /// Final state of a vertex.
    #[must_use]
    pub fn state(&self, vertex: &str) -> Option<VertexState> {
        self.statuses.get(vertex).copied()
    }

    /// All per-vertex states.
    #[must_use]
    pub fn statuses(&self) -> &FxHashMap<String, VertexState> {
        &self.statuses
    }

    /// Every producer failure observed during the run.
    #[must_use]
    pub fn errors(&self) -> &[VertexExecutionError] {
        &self.errors
    }

    /// The first failure, when any occurred.
    #[must_use]
    pub fn first_failure(&self) -> Option<&VertexExecutionError> {
        self.errors.first()
    }

    /// Ids of vertices that never ran because an upstream failed or the
    /// run was cancelled.
    #[must_use]
    pub fn unreached(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .statuses
            .iter()
            .filter(|(_, s)| **s == VertexState::Unreached)
            .map(|(id, _)| id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// True when every vertex reached `Done` and nothing was cancelled.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.cancelled
            && self.errors.is_empty()
            && self.statuses.values().all(|s| *s == VertexState::Done)
    }
}

struct TaskOutcome {
    vertex_id: String,
    result: Result<Vec<(String, Value)>, VertexFailure>,
}

/// Runs assembled graphs in dependency order.
///
/// # Examples
///
/// ```rust,no_run
/// use loomflow::assembler::Graph;
/// use loomflow::scheduler::{RunOptions, Scheduler};
///
/// # async fn example(graph: Graph) -> Result<(), Box<dyn std::error::Error>> {
/// let report = Scheduler::new().run(&graph).await?;
/// if let Some(err) = report.first_failure() {
///     eprintln!("run failed at {}: {err}", err.vertex_id);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    options: RunOptions,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_options(options: RunOptions) -> Self {
        Self { options }
    }

    /// Run the graph to completion.
    ///
    /// Returns `Err` only for whole-run failures (cycles, task panics);
    /// per-vertex producer failures are reported on the [`RunReport`] so
    /// the outputs of unaffected branches stay retrievable.
    #[instrument(skip(self, graph), fields(vertices = graph.len()))]
    pub async fn run(&self, graph: &Graph) -> Result<RunReport, SchedulerError> {
        let started_at = Utc::now();
        let run_id = IdGenerator::new().run_id();
        let cancel = self.options.cancel.clone().unwrap_or_default();
        let deadline_at = self
            .options
            .deadline
            .map(|d| tokio::time::Instant::now() + d);

        // In-degrees and forward adjacency from the edge list.
        let mut remaining_deps: FxHashMap<String, usize> =
            graph.order().iter().map(|id| (id.clone(), 0)).collect();
        let mut dependents: FxHashMap<String, Vec<String>> = FxHashMap::default();
        for edge in graph.edges() {
            if let Some(count) = remaining_deps.get_mut(&edge.target_id) {
                *count += 1;
            }
            dependents
                .entry(edge.source_id.clone())
                .or_default()
                .push(edge.target_id.clone());
        }

        let mut statuses: FxHashMap<String, VertexState> = graph
            .order()
            .iter()
            .map(|id| (id.clone(), VertexState::Pending))
            .collect();
        let mut ready: Vec<String> = Vec::new();
        for id in graph.order() {
            if remaining_deps.get(id).copied() == Some(0) {
                statuses.insert(id.clone(), VertexState::Ready);
                ready.push(id.clone());
            }
        }

        let mut cache: FxHashMap<(String, String), Value> = FxHashMap::default();
        let mut errors: Vec<VertexExecutionError> = Vec::new();
        let mut failed_ids: Vec<String> = Vec::new();
        let mut join_set: JoinSet<TaskOutcome> = JoinSet::new();

        loop {
            if !cancel.is_cancelled() {
                for id in ready.drain(..) {
                    let vertex = match graph.vertex(&id) {
                        Some(v) => v,
                        None => continue,
                    };
                    statuses.insert(id.clone(), VertexState::Running);
                    tracing::debug!(vertex = %id, "dispatching vertex");
                    dispatch(
                        &mut join_set,
                        vertex,
                        &cache,
                        self.options.overrides.get(&id),
                        &cancel,
                    );
                }
            }

            if join_set.is_empty() {
                break;
            }

            let joined = match deadline_at {
                Some(at) if !cancel.is_cancelled() => {
                    tokio::select! {
                        j = join_set.join_next() => j,
                        _ = tokio::time::sleep_until(at) => {
                            tracing::warn!("run deadline exceeded, cancelling");
                            cancel.cancel();
                            continue;
                        }
                    }
                }
                _ => join_set.join_next().await,
            };

            let Some(joined) = joined else { break };
            let outcome = joined?;

            match outcome.result {
                Ok(values) => {
                    statuses.insert(outcome.vertex_id.clone(), VertexState::Done);
                    for (output, value) in values {
                        let key = (outcome.vertex_id.clone(), output);
                        // Publish-once: a vertex is never re-executed
                        // within one run.
                        debug_assert!(!cache.contains_key(&key));
                        cache.insert(key, value);
                    }
                    if let Some(targets) = dependents.get(&outcome.vertex_id) {
                        for target in targets {
                            if let Some(count) = remaining_deps.get_mut(target) {
                                *count = count.saturating_sub(1);
                            }
                        }
                    }
                    // Promote in discovery order so ties break the same
                    // way on every run.
                    for id in graph.order() {
                        if statuses.get(id).copied() == Some(VertexState::Pending)
                            && remaining_deps.get(id).copied() == Some(0)
                        {
                            statuses.insert(id.clone(), VertexState::Ready);
                            ready.push(id.clone());
                        }
                    }
                }
                Err(failure) => {
                    tracing::warn!(vertex = %outcome.vertex_id, error = %failure, "vertex failed");
                    statuses.insert(outcome.vertex_id.clone(), VertexState::Failed);
                    failed_ids.push(outcome.vertex_id.clone());
                    errors.push(VertexExecutionError {
                        vertex_id: outcome.vertex_id,
                        failure,
                    });
                }
            }
        }

        let cancelled = cancel.is_cancelled();

        // Vertices never promoted: downstream of a failure (or stranded
        // by cancellation) are Unreached; anything else still Pending is
        // stuck in a cycle.
        let downstream = transitive_dependents(graph, &failed_ids);
        let mut stuck: Vec<String> = Vec::new();
        for id in graph.order() {
            match statuses.get(id).copied() {
                Some(VertexState::Pending) => {
                    if cancelled || downstream.contains(id.as_str()) {
                        statuses.insert(id.clone(), VertexState::Unreached);
                    } else {
                        stuck.push(id.clone());
                    }
                }
                Some(VertexState::Ready) => {
                    // Promoted but never dispatched: only possible after
                    // cancellation.
                    statuses.insert(id.clone(), VertexState::Unreached);
                }
                _ => {}
            }
        }
        if !stuck.is_empty() {
            return Err(SchedulerError::CyclicDependency { stuck });
        }

        Ok(RunReport {
            run_id,
            cancelled,
            started_at,
            finished_at: Utc::now(),
            statuses,
            outputs: cache,
            errors,
        })
    }
}

fn dispatch(
    join_set: &mut JoinSet<TaskOutcome>,
    vertex: &Vertex,
    cache: &FxHashMap<(String, String), Value>,
    overrides: Option<&FxHashMap<String, Value>>,
    cancel: &CancelToken,
) {
    let args = gather_args(vertex, cache, overrides);
    let component = vertex.component.clone();
    let outputs: Vec<String> = component.outputs().iter().map(|o| o.name.clone()).collect();
    let token = cancel.clone();
    let vertex_id = vertex.id.clone();

    join_set.spawn(async move {
        let result = tokio::select! {
            _ = token.cancelled() => Err(VertexFailure::Cancelled),
            r = invoke_outputs(component, outputs, args) => r,
        };
        TaskOutcome { vertex_id, result }
    });
}

async fn invoke_outputs(
    component: ComponentRef,
    outputs: Vec<String>,
    args: ProducerArgs,
) -> Result<Vec<(String, Value)>, VertexFailure> {
    let mut values = Vec::with_capacity(outputs.len());
    for output in outputs {
        let value = component.invoke(&output, args.clone()).await?;
        values.push((output, value));
    }
    Ok(values)
}

/// Gather argument values for a vertex: literals resolved at assembly,
/// replaced by any per-run overrides, then overlaid with cached upstream
/// outputs. List inputs collect every incoming edge value in edge order,
/// appended after any bound literal.
fn gather_args(
    vertex: &Vertex,
    cache: &FxHashMap<(String, String), Value>,
    overrides: Option<&FxHashMap<String, Value>>,
) -> ProducerArgs {
    let mut args = vertex.params.clone();
    if let Some(overrides) = overrides {
        for (name, value) in overrides {
            args.insert(name.clone(), value.clone());
        }
    }
    for slot in vertex.component.inputs() {
        let fed: Vec<&crate::resolver::Edge> = vertex
            .incoming
            .iter()
            .filter(|e| e.target_input == slot.name)
            .collect();
        if fed.is_empty() {
            continue;
        }
        if slot.is_list {
            let mut items: Vec<Value> = match args.get(&slot.name) {
                Some(Value::Array(existing)) => existing.clone(),
                Some(other) => vec![other.clone()],
                None => Vec::new(),
            };
            for edge in fed {
                if let Some(value) =
                    cache.get(&(edge.source_id.clone(), edge.source_output.clone()))
                {
                    items.push(value.clone());
                }
            }
            args.insert(slot.name.clone(), Value::Array(items));
        } else {
            for edge in fed {
                if let Some(value) =
                    cache.get(&(edge.source_id.clone(), edge.source_output.clone()))
                {
                    args.insert(slot.name.clone(), value.clone());
                }
            }
        }
    }
    args
}

/// Ids of every vertex reachable downstream from `roots` along edges.
fn transitive_dependents(graph: &Graph, roots: &[String]) -> FxHashSet<String> {
    let mut forward: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
    for edge in graph.edges() {
        forward
            .entry(edge.source_id.as_str())
            .or_default()
            .push(edge.target_id.as_str());
    }
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut stack: Vec<&str> = roots.iter().map(String::as_str).collect();
    while let Some(id) = stack.pop() {
        if let Some(targets) = forward.get(id) {
            for target in targets {
                if seen.insert((*target).to_string()) {
                    stack.push(target);
                }
            }
        }
    }
    seen
}
