//! High-level facade: assemble, run, and collect terminal outputs.
//!
//! [`FlowRunner`] is the front door for the common case: wire components,
//! hand over the roots, get the results of the graph's terminal vertices
//! back. Everything it does is reachable through the underlying modules;
//! embedders with unusual needs (custom readiness handling, streaming
//! result consumption) drop down to [`assemble`](crate::assembler::assemble)
//! and [`Scheduler`] directly.

use miette::Diagnostic;
use thiserror::Error;

use crate::assembler::{self, AssemblyError, Graph};
use crate::component::ComponentRef;
use crate::scheduler::{
    RunOptions, RunReport, Scheduler, SchedulerError, VertexExecutionError,
};
use crate::types::Value;

/// Errors raised by a full assemble-and-run cycle.
#[derive(Debug, Error, Diagnostic)]
pub enum RunError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Scheduler(#[from] SchedulerError),

    /// A vertex failed during a strict run. Carries the first failure and
    /// the ids of vertices left unreached by it.
    #[error("{failure} ({} vertices unreached)", .unreached.len())]
    #[diagnostic(
        code(loomflow::runner::execution),
        help("Inspect the failure and the unreached set; independent branches still completed.")
    )]
    Execution {
        #[source]
        failure: VertexExecutionError,
        unreached: Vec<String>,
    },
}

/// One terminal vertex output produced by a run.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalOutput {
    pub vertex_id: String,
    pub output: String,
    pub value: Value,
}

/// The result of one [`FlowRunner`] run: the full report plus the values
/// of every terminal vertex output that completed.
#[derive(Debug, Clone)]
pub struct FlowOutcome {
    pub report: RunReport,
    pub terminals: Vec<TerminalOutput>,
}

impl FlowOutcome {
    /// Value of a terminal output by vertex id and output name.
    #[must_use]
    pub fn terminal(&self, vertex_id: &str, output: &str) -> Option<&Value> {
        self.terminals
            .iter()
            .find(|t| t.vertex_id == vertex_id && t.output == output)
            .map(|t| &t.value)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.report.is_success()
    }
}

/// Assembles a root set once and runs the resulting graph.
///
/// # Examples
///
/// ```rust,no_run
/// use loomflow::component::ComponentRef;
/// use loomflow::runner::FlowRunner;
///
/// # async fn example(roots: Vec<ComponentRef>) -> Result<(), Box<dyn std::error::Error>> {
/// let runner = FlowRunner::from_roots(&roots)?;
/// let outcome = runner.run().await?;
/// for terminal in &outcome.terminals {
///     println!("{}.{} = {}", terminal.vertex_id, terminal.output, terminal.value);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FlowRunner {
    graph: Graph,
    options: RunOptions,
}

impl FlowRunner {
    /// Assemble the graph reachable from `roots`.
    pub fn from_roots(roots: &[ComponentRef]) -> Result<Self, RunError> {
        Ok(Self::new(assembler::assemble(roots)?))
    }

    /// Wrap an already assembled graph.
    #[must_use]
    pub fn new(graph: Graph) -> Self {
        Self {
            graph,
            options: RunOptions::default(),
        }
    }

    /// Set run options (deadline, cancellation token).
    #[must_use]
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Override a vertex's literal input for subsequent runs without
    /// rewiring the graph. Edge-fed inputs still win over overrides.
    #[must_use]
    pub fn with_override(
        mut self,
        vertex_id: impl Into<String>,
        input: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.options
            .overrides
            .entry(vertex_id.into())
            .or_default()
            .insert(input.into(), value.into());
        self
    }

    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Run the graph. Per-vertex failures do not fail the call; they are
    /// reported on the outcome while completed branches keep their values.
    pub async fn run(&self) -> Result<FlowOutcome, RunError> {
        let report = Scheduler::with_options(self.options.clone())
            .run(&self.graph)
            .await?;
        let terminals = self.collect_terminals(&report);
        Ok(FlowOutcome { report, terminals })
    }

    /// Run the graph, treating any vertex failure (including cancellation)
    /// as an error carrying the unreached set.
    pub async fn run_strict(&self) -> Result<FlowOutcome, RunError> {
        let outcome = self.run().await?;
        if let Some(failure) = outcome.report.first_failure() {
            return Err(RunError::Execution {
                failure: failure.clone(),
                unreached: outcome
                    .report
                    .unreached()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            });
        }
        Ok(outcome)
    }

    fn collect_terminals(&self, report: &RunReport) -> Vec<TerminalOutput> {
        let mut terminals = Vec::new();
        for id in self.graph.terminal_ids() {
            let Some(vertex) = self.graph.vertex(&id) else {
                continue;
            };
            for output in vertex.component.outputs() {
                if let Some(value) = report.output(&id, &output.name) {
                    terminals.push(TerminalOutput {
                        vertex_id: id.clone(),
                        output: output.name.clone(),
                        value: value.clone(),
                    });
                }
            }
        }
        terminals
    }
}
