/// Workflow Management Layer
///
/// Workflow definitions and their record store:
/// - Type definitions (Workflow, NewWorkflow, WorkflowPatch)
/// - SQLite persistence with sqlx, plus an in-memory store

// Core workflow type definitions
pub mod types;

// Record store trait and implementations
pub mod storage;

// Re-export commonly used types
pub use storage::{MemoryWorkflowStore, SqliteWorkflowStore, WorkflowStore};
pub use types::{NewWorkflow, Workflow, WorkflowPatch};
