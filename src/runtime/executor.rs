/// Workflow execution pipeline
///
/// Runs one execution as a fixed sequence of stages:
/// Lookup -> Fetch -> ExtractCheck -> Compose -> Invoke.
/// Any stage may end the run with exactly one `PipelineError`; nothing is
/// retried and no partial result escapes. The executor keeps no state between
/// calls, so concurrent executions (even of the same workflow) never wait on
/// each other.

use crate::{
    error::{PipelineError, PipelineResult},
    runtime::{
        fetcher::{extract_content, ContentFetcher},
        generation::TextGenerator,
        prompt::compose,
    },
    workflow::storage::{require, WorkflowStore},
};
use std::{fmt, sync::Arc};
use tracing::Instrument;
use uuid::Uuid;

/// Pipeline stage, used to label log lines and failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStage {
    Lookup,
    Fetch,
    ExtractCheck,
    Compose,
    Invoke,
}

impl fmt::Display for ExecutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lookup => "lookup",
            Self::Fetch => "fetch",
            Self::ExtractCheck => "extract_check",
            Self::Compose => "compose",
            Self::Invoke => "invoke",
        };
        f.write_str(name)
    }
}

/// Orchestrates store lookup, content retrieval, prompt composition and generation
#[derive(Clone)]
pub struct WorkflowExecutor {
    store: Arc<dyn WorkflowStore>,
    fetcher: ContentFetcher,
    generator: Arc<dyn TextGenerator>,
}

impl WorkflowExecutor {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        fetcher: ContentFetcher,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            store,
            fetcher,
            generator,
        }
    }

    /// Execute workflow `workflow_id` with the user's `prompt` on `model`
    ///
    /// Returns the backend's text unmodified. An empty prompt is rejected
    /// with `Validation` before any stage runs.
    pub async fn execute(
        &self,
        workflow_id: i64,
        prompt: &str,
        model: &str,
    ) -> PipelineResult<String> {
        let span = tracing::info_span!(
            "execution",
            execution_id = %Uuid::new_v4(),
            workflow_id,
            model
        );

        self.run(workflow_id, prompt, model).instrument(span).await
    }

    async fn run(&self, workflow_id: i64, prompt: &str, model: &str) -> PipelineResult<String> {
        let started = std::time::Instant::now();
        tracing::info!("🚀 Starting workflow execution");

        if prompt.trim().is_empty() {
            return Err(PipelineError::Validation("prompt is required".to_string()));
        }

        enter(ExecutionStage::Lookup);
        let workflow = require(self.store.as_ref(), workflow_id)
            .await
            .map_err(failed(ExecutionStage::Lookup))?;

        enter(ExecutionStage::Fetch);
        let html = self
            .fetcher
            .retrieve(&workflow.url)
            .await
            .map_err(failed(ExecutionStage::Fetch))?;

        enter(ExecutionStage::ExtractCheck);
        let content =
            extract_content(&workflow.url, &html).map_err(failed(ExecutionStage::ExtractCheck))?;

        enter(ExecutionStage::Compose);
        let composed = compose(&workflow.description, prompt, &content);

        enter(ExecutionStage::Invoke);
        let result = self
            .generator
            .generate(model, &composed)
            .await
            .map_err(failed(ExecutionStage::Invoke))?;

        tracing::info!(
            "🎉 Workflow '{}' executed in {:?} ({} characters generated)",
            workflow.name,
            started.elapsed(),
            result.chars().count()
        );

        Ok(result)
    }
}

fn enter(stage: ExecutionStage) {
    tracing::debug!(%stage, "📍 Entering stage");
}

fn failed(stage: ExecutionStage) -> impl FnOnce(PipelineError) -> PipelineError {
    move |err| {
        match err {
            PipelineError::NotFound(_) => tracing::warn!(%stage, "❌ {}", err),
            _ => tracing::error!(%stage, kind = err.kind(), "❌ Execution failed: {}", err),
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{fetcher::MAX_CONTENT_CHARS, prompt::content_segment};
    use crate::workflow::{storage::MemoryWorkflowStore, types::NewWorkflow};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Records every prompt and answers with a fixed reply
    #[derive(Default)]
    struct RecordingGenerator {
        prompts: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl TextGenerator for RecordingGenerator {
        async fn generate(&self, model: &str, prompt: &str) -> PipelineResult<String> {
            self.prompts
                .lock()
                .await
                .push((model.to_string(), prompt.to_string()));
            Ok("generated".to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _model: &str, _prompt: &str) -> PipelineResult<String> {
            Err(PipelineError::Generation("quota exceeded".to_string()))
        }
    }

    async fn setup(
        url: &str,
        generator: Arc<dyn TextGenerator>,
    ) -> (WorkflowExecutor, i64) {
        let store = Arc::new(MemoryWorkflowStore::new());
        let workflow = store
            .create(NewWorkflow::new("Digest", "summarising news", url))
            .await
            .unwrap();
        let fetcher = ContentFetcher::new(Duration::from_secs(5)).unwrap();
        (WorkflowExecutor::new(store, fetcher, generator), workflow.id)
    }

    async fn serve(body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn composes_prompt_from_workflow_and_content() {
        let server = serve("<html><body><p>Markets rallied.</p></body></html>").await;
        let generator = Arc::new(RecordingGenerator::default());
        let (executor, id) = setup(&server.uri(), generator.clone()).await;

        let result = executor.execute(id, "Summarise.", "gpt-4o-mini").await.unwrap();
        assert_eq!(result, "generated");

        let prompts = generator.prompts.lock().await;
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].0, "gpt-4o-mini");
        assert_eq!(
            prompts[0].1,
            "You are an AI assistant specialized in summarising news. Summarise.\nContent:\nMarkets rallied."
        );
    }

    #[tokio::test]
    async fn long_content_is_cut_to_the_cap() {
        let body = format!("<html><body>{}</body></html>", "x".repeat(MAX_CONTENT_CHARS * 2));
        let server = serve(&body).await;
        let generator = Arc::new(RecordingGenerator::default());
        let (executor, id) = setup(&server.uri(), generator.clone()).await;

        executor.execute(id, "Go.", "gpt-4o-mini").await.unwrap();

        let prompts = generator.prompts.lock().await;
        let content = content_segment(&prompts[0].1).unwrap();
        assert_eq!(content.chars().count(), MAX_CONTENT_CHARS);
    }

    #[tokio::test]
    async fn unknown_workflow_is_not_found() {
        let (executor, _) = setup("http://127.0.0.1:1/", Arc::new(RecordingGenerator::default())).await;
        let result = executor.execute(404, "Go.", "gpt-4o-mini").await;
        assert!(matches!(result, Err(PipelineError::NotFound(404))));
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_before_lookup() {
        let generator = Arc::new(RecordingGenerator::default());
        let (executor, id) = setup("http://127.0.0.1:1/", generator.clone()).await;
        let result = executor.execute(id, "  ", "gpt-4o-mini").await;
        assert!(matches!(result, Err(PipelineError::Validation(_))));
        assert!(generator.prompts.lock().await.is_empty());
    }

    #[tokio::test]
    async fn unreachable_url_is_fetch_error() {
        let generator = Arc::new(RecordingGenerator::default());
        let (executor, id) = setup("http://127.0.0.1:1/", generator.clone()).await;
        let result = executor.execute(id, "Go.", "gpt-4o-mini").await;
        assert!(matches!(result, Err(PipelineError::Fetch(_))));
        assert!(generator.prompts.lock().await.is_empty());
    }

    #[tokio::test]
    async fn blank_document_is_empty_content() {
        let server = serve("<html><body>   \n  </body></html>").await;
        let (executor, id) = setup(&server.uri(), Arc::new(RecordingGenerator::default())).await;
        let result = executor.execute(id, "Go.", "gpt-4o-mini").await;
        assert!(matches!(result, Err(PipelineError::EmptyContent(_))));
    }

    #[tokio::test]
    async fn backend_failure_is_generation_error() {
        let server = serve("<body>text</body>").await;
        let (executor, id) = setup(&server.uri(), Arc::new(FailingGenerator)).await;
        let result = executor.execute(id, "Go.", "gpt-4o-mini").await;
        assert!(matches!(result, Err(PipelineError::Generation(_))));
    }

    #[tokio::test]
    async fn concurrent_executions_of_one_workflow_both_complete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<body>slow page</body>")
                    .set_delay(Duration::from_millis(500)),
            )
            .expect(2)
            .mount(&server)
            .await;
        let generator = Arc::new(RecordingGenerator::default());
        let (executor, id) = setup(&server.uri(), generator.clone()).await;

        let started = std::time::Instant::now();
        let (first, second) = tokio::join!(
            executor.execute(id, "First.", "gpt-4o-mini"),
            executor.execute(id, "Second.", "gpt-4-turbo"),
        );
        let elapsed = started.elapsed();

        assert_eq!(first.unwrap(), "generated");
        assert_eq!(second.unwrap(), "generated");
        assert_eq!(generator.prompts.lock().await.len(), 2);
        // Serialized runs would need at least twice the delay
        assert!(elapsed < Duration::from_millis(1000), "took {:?}", elapsed);
    }
}
