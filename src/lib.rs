/// Workflow Pilot: run stored URL-backed workflows through a text-generation backend
///
/// A workflow pairs a task description with a source URL. Executing one
/// fetches the URL, extracts its visible text, folds it into a fixed prompt
/// with the caller's request and returns what the model generates.

// Core configuration and setup
pub mod config;

// Error taxonomy shared by the store and the pipeline
pub mod error;

// Workflow management layer - definitions and record store
pub mod workflow;

// Execution pipeline - fetch, compose, generate
pub mod runtime;

// HTTP API layer - REST endpoints for workflow management and execution
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use error::{PipelineError, PipelineResult};
pub use runtime::WorkflowExecutor;
pub use server::start_server;
pub use workflow::{Workflow, WorkflowStore};
