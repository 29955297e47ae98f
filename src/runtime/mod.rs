/// Runtime Execution Pipeline
///
/// Everything one execution touches after the record lookup:
/// - Fetching a URL and extracting its visible text
/// - Filling the instruction template
/// - Calling the text-generation backend
/// - Sequencing the stages and mapping their failures

// Remote content retrieval and text extraction
pub mod fetcher;

// Prompt template
pub mod prompt;

// Generation backends
pub mod generation;

// Stage orchestration
pub mod executor;

// Re-export main types
pub use executor::{ExecutionStage, WorkflowExecutor};
pub use fetcher::ContentFetcher;
pub use generation::{GenerationClient, TextGenerator};
