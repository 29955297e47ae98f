/// Workflow REST API endpoints
///
/// CRUD over stored workflows plus the execute endpoint. Errors leave as
/// `{"error": "..."}` with a status derived from the pipeline error kind;
/// causes are logged here and never echoed to the client.

use crate::{
    error::PipelineError,
    runtime::executor::WorkflowExecutor,
    workflow::{
        storage::WorkflowStore,
        types::{NewWorkflow, Workflow, WorkflowPatch},
    },
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// Workflow record store
    pub store: Arc<dyn WorkflowStore>,
    /// Execution pipeline
    pub executor: WorkflowExecutor,
    /// Model used when an execute request omits one
    pub default_model: String,
}

/// Response for workflow creation
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedWorkflow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub url: String,
}

/// Request body for execution
#[derive(Debug, Default, Deserialize)]
pub struct ExecuteRequest {
    pub prompt: Option<String>,
    pub model: Option<String>,
}

/// Response for a successful execution
#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub result: String,
}

/// Client-facing error: status plus a short message
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Workflow not found")
    }

    /// Map a pipeline error, using `context` as the message for store failures
    pub fn from_pipeline(err: PipelineError, context: &str) -> Self {
        match err {
            PipelineError::Validation(ref cause) => {
                tracing::warn!("Rejected request: {}", cause);
                Self::new(StatusCode::BAD_REQUEST, validation_message(cause))
            }
            PipelineError::NotFound(_) => Self::not_found(),
            PipelineError::Fetch(ref cause) => {
                tracing::error!("{}: {}", context, cause);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch content from URL")
            }
            PipelineError::EmptyContent(ref url) => {
                tracing::error!("No content found in the body fetched from {}", url);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "No content found at the URL")
            }
            PipelineError::Generation(ref cause) => {
                tracing::error!("{}: {}", context, cause);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Error executing the workflow")
            }
            PipelineError::Storage(ref cause) => {
                tracing::error!("{}: {}", context, cause);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, context)
            }
        }
    }

    fn bad_body(rejection: JsonRejection) -> Self {
        tracing::warn!("Invalid JSON body: {}", rejection.body_text());
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

fn validation_message(cause: &str) -> &'static str {
    if cause.starts_with("prompt") {
        "Prompt is required."
    } else {
        "Name, description, and URL are required."
    }
}

/// Ids that are not integers cannot name a stored workflow
fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse().map_err(|_| ApiError::not_found())
}

/// Create workflow management routes
pub fn create_workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/workflows", get(list_workflows).post(create_workflow))
        .route(
            "/workflows/{id}",
            get(get_workflow).put(update_workflow).delete(delete_workflow),
        )
        .route("/workflows/{id}/execute", post(execute_workflow))
}

/// GET /workflows
async fn list_workflows(State(state): State<AppState>) -> Result<Json<Vec<Workflow>>, ApiError> {
    let workflows = state
        .store
        .list()
        .await
        .map_err(|e| ApiError::from_pipeline(e, "Error fetching workflows"))?;

    Ok(Json(workflows))
}

/// POST /workflows
/// Body: { "name": "...", "description": "...", "url": "..." }
async fn create_workflow(
    State(state): State<AppState>,
    payload: Result<Json<NewWorkflow>, JsonRejection>,
) -> Result<Json<CreatedWorkflow>, ApiError> {
    let Json(input) = payload.map_err(ApiError::bad_body)?;

    let workflow = state
        .store
        .create(input)
        .await
        .map_err(|e| ApiError::from_pipeline(e, "Error creating workflow"))?;

    tracing::info!("🔥 Created workflow: {} ({})", workflow.id, workflow.name);

    Ok(Json(CreatedWorkflow {
        id: workflow.id,
        name: workflow.name,
        description: workflow.description,
        url: workflow.url,
    }))
}

/// GET /workflows/{id}
async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Workflow>, ApiError> {
    let id = parse_id(&id)?;

    match state.store.get(id).await {
        Ok(Some(workflow)) => Ok(Json(workflow)),
        Ok(None) => Err(ApiError::not_found()),
        Err(e) => Err(ApiError::from_pipeline(e, "Error fetching workflow")),
    }
}

/// PUT /workflows/{id}
/// Body: any subset of { "name", "description", "url" }; omitted or empty fields keep their value
async fn update_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<WorkflowPatch>, JsonRejection>,
) -> Result<Json<Workflow>, ApiError> {
    let id = parse_id(&id)?;
    let Json(patch) = payload.map_err(ApiError::bad_body)?;

    match state.store.update(id, patch).await {
        Ok(Some(workflow)) => {
            tracing::info!("✏️ Updated workflow: {} ({})", workflow.id, workflow.name);
            Ok(Json(workflow))
        }
        Ok(None) => Err(ApiError::not_found()),
        Err(e) => Err(ApiError::from_pipeline(e, "Error updating workflow")),
    }
}

/// DELETE /workflows/{id}
async fn delete_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;

    match state.store.delete(id).await {
        Ok(true) => {
            tracing::info!("🗑️ Deleted workflow: {}", id);
            Ok(Json(json!({ "message": "Workflow deleted successfully" })))
        }
        Ok(false) => Err(ApiError::not_found()),
        Err(e) => Err(ApiError::from_pipeline(e, "Error deleting workflow")),
    }
}

/// POST /workflows/{id}/execute
/// Body: { "prompt": "...", "model": "gpt-4o-mini" } with `model` optional
async fn execute_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let id = parse_id(&id)?;
    let Json(request) = payload.map_err(ApiError::bad_body)?;

    let prompt = request.prompt.unwrap_or_default();
    let model = request
        .model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| state.default_model.clone());

    let result = state
        .executor
        .execute(id, &prompt, &model)
        .await
        .map_err(|e| ApiError::from_pipeline(e, "Error executing the workflow"))?;

    Ok(Json(ExecuteResponse { result }))
}
