//! # Loomflow: Typed Component Wiring and Graph Execution
//!
//! Loomflow is an engine for wiring typed components into executable
//! dataflow graphs: declare what each component accepts and produces,
//! connect them with type-checked edges, and run the resulting graph with
//! dependency-ordered concurrent scheduling.
//!
//! ## Core Concepts
//!
//! - **Contracts**: Typed input and output slots a component declares up front
//! - **Components**: Nodes owning a contract, literal values and producer callables
//! - **Edges**: Resolver-validated connections from one output to one input
//! - **Graph**: The flat, execution-ready projection of a wired root set
//! - **Scheduler**: Concurrent execution with per-vertex states and failure isolation
//!
//! ## Quick Start
//!
//! ### Declaring and Wiring Components
//!
//! ```
//! use loomflow::component::{Binding, Component, ComponentLike, sync_producer};
//! use loomflow::contract::{InputSlot, OutputSlot};
//! use loomflow::types::{TypeTag, Value};
//!
//! let greet = Component::builder("Greeter")
//!     .id("greet-1")
//!     .input(InputSlot::new("name", [TypeTag::Text]).required(true))
//!     .producer(
//!         "make_greeting",
//!         sync_producer(|args| {
//!             let name = args.get("name").and_then(Value::as_str).unwrap_or("world");
//!             Ok(Value::String(format!("Hello, {name}!")))
//!         }),
//!     )
//!     .output(OutputSlot::new("greeting", [TypeTag::Text], "make_greeting"))
//!     .build_ref()
//!     .unwrap();
//!
//! let upper = Component::builder("Upper")
//!     .id("upper-1")
//!     .input(InputSlot::new("text", [TypeTag::Text]).required(true))
//!     .producer(
//!         "to_upper",
//!         sync_producer(|args| {
//!             let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
//!             Ok(Value::String(text.to_uppercase()))
//!         }),
//!     )
//!     .output(OutputSlot::new("result", [TypeTag::Text], "to_upper"))
//!     .build_ref()
//!     .unwrap();
//!
//! // Literal binding, then a type-checked edge. The resolver picks the
//! // first compatible output of `greet` for the `text` input.
//! greet.set("name", Binding::literal("loom")).unwrap();
//! upper.set("text", Binding::component(&greet)).unwrap();
//! ```
//!
//! ### Running a Graph
//!
//! ```
//! # use loomflow::component::{Binding, Component, ComponentLike, sync_producer};
//! # use loomflow::contract::{InputSlot, OutputSlot};
//! # use loomflow::types::{TypeTag, Value};
//! use loomflow::runner::FlowRunner;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let upper = Component::builder("Upper")
//! #     .id("upper-1")
//! #     .input(InputSlot::new("text", [TypeTag::Text]).required(true))
//! #     .producer(
//! #         "to_upper",
//! #         sync_producer(|args| {
//! #             let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
//! #             Ok(Value::String(text.to_uppercase()))
//! #         }),
//! #     )
//! #     .output(OutputSlot::new("result", [TypeTag::Text], "to_upper"))
//! #     .build_ref()?;
//! # upper.set("text", Binding::literal("hello"))?;
//! let runner = FlowRunner::from_roots(&[upper])?;
//! let outcome = runner.run().await?;
//! assert_eq!(
//!     outcome.terminal("upper-1", "result"),
//!     Some(&Value::String("HELLO".into()))
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ### Adapting Plain Functions
//!
//! Functions join a graph through an explicit [`adapter::FnSignature`]:
//! parameters become typed inputs, the return type becomes a single
//! `result` output, and the callable becomes its producer.
//!
//! ### Persistence
//!
//! [`serializer`] saves assembled graphs as self-describing JSON documents
//! and reloads them through a [`serializer::ComponentRegistry`]; every
//! edge is re-validated on load, so hand-edited documents cannot smuggle
//! in incompatible wirings.
//!
//! ## Module Guide
//!
//! - [`types`] - Type tags, the compatibility rule, and the runtime value alias
//! - [`contract`] - Input and output slot declarations
//! - [`component`] - The component capability trait, builder, and wiring operations
//! - [`resolver`] - Edge creation and type-compatibility checks
//! - [`assembler`] - Expanding a wired root set into a flat graph
//! - [`scheduler`] - Dependency-ordered concurrent execution
//! - [`serializer`] - Graph documents, registries, save and load
//! - [`adapter`] - Turning plain functions into components
//! - [`runner`] - High-level assemble-and-run facade
//! - [`telemetry`] - Optional tracing subscriber setup

pub mod adapter;
pub mod assembler;
pub mod component;
pub mod contract;
pub mod resolver;
pub mod runner;
pub mod scheduler;
pub mod serializer;
pub mod telemetry;
pub mod types;
pub mod utils;
