/// HTTP API Layer
///
/// REST endpoints for workflow management and execution.

// Workflow CRUD and execute endpoints
pub mod workflows;

// Re-export router builder and state
pub use workflows::{create_workflow_routes, ApiError, AppState};
