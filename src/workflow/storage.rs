/// Workflow record store
///
/// `WorkflowStore` is the capability the API layer and the executor depend on.
/// `SqliteWorkflowStore` persists to a SQLite file through sqlx and relies on
/// SQLite's own locking for concurrent access. `MemoryWorkflowStore` keeps the
/// same contract in process memory for tests and ephemeral runs.

use crate::error::{PipelineError, PipelineResult};
use crate::workflow::types::{
    next_modified_at, now_millis, NewWorkflow, Workflow, WorkflowPatch,
};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::{collections::BTreeMap, path::Path};
use tokio::sync::RwLock;

/// CRUD contract over workflow records
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Insert a new workflow; fails with `Validation` if a field is missing or empty
    async fn create(&self, input: NewWorkflow) -> PipelineResult<Workflow>;

    async fn get(&self, id: i64) -> PipelineResult<Option<Workflow>>;

    /// All workflows in insertion (id) order
    async fn list(&self) -> PipelineResult<Vec<Workflow>>;

    /// Coalescing partial update; `None` when the id does not exist
    async fn update(&self, id: i64, patch: WorkflowPatch) -> PipelineResult<Option<Workflow>>;

    /// Returns whether a record existed
    async fn delete(&self, id: i64) -> PipelineResult<bool>;
}

/// SQLite-based workflow storage
#[derive(Debug, Clone)]
pub struct SqliteWorkflowStore {
    pool: SqlitePool,
}

impl SqliteWorkflowStore {
    /// Wrap an existing pool. Call `init_schema` before use.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database file at `path` and ensure the schema
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("🗄️ Opening workflow database: {}", path.display());

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    /// Private in-memory database. A single connection keeps every query on the same database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    /// Create the workflows table. Safe to call multiple times.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS workflows (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                url TEXT NOT NULL,
                created_at TEXT NOT NULL,
                modified_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl WorkflowStore for SqliteWorkflowStore {
    async fn create(&self, input: NewWorkflow) -> PipelineResult<Workflow> {
        let input = input.validate()?;
        let now = now_millis();

        let result = sqlx::query(
            r#"
            INSERT INTO workflows (name, description, url, created_at, modified_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.url)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Workflow {
            id: result.last_insert_rowid(),
            name: input.name,
            description: input.description,
            url: input.url,
            created_at: now,
            modified_at: now,
        })
    }

    async fn get(&self, id: i64) -> PipelineResult<Option<Workflow>> {
        let workflow = sqlx::query_as::<_, Workflow>(
            "SELECT id, name, description, url, created_at, modified_at FROM workflows WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(workflow)
    }

    async fn list(&self) -> PipelineResult<Vec<Workflow>> {
        let workflows = sqlx::query_as::<_, Workflow>(
            "SELECT id, name, description, url, created_at, modified_at FROM workflows ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(workflows)
    }

    async fn update(&self, id: i64, patch: WorkflowPatch) -> PipelineResult<Option<Workflow>> {
        let Some(existing) = self.get(id).await? else {
            return Ok(None);
        };

        let patch = patch.normalized();
        let modified_at = next_modified_at(existing.modified_at);

        let result = sqlx::query(
            r#"
            UPDATE workflows
            SET
                name = COALESCE(?, name),
                description = COALESCE(?, description),
                url = COALESCE(?, url),
                modified_at = ?
            WHERE id = ?
            "#,
        )
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.url.as_deref())
        .bind(modified_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        // Deleted between the read and the write
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get(id).await
    }

    async fn delete(&self, id: i64) -> PipelineResult<bool> {
        let result = sqlx::query("DELETE FROM workflows WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// In-process workflow store with the same semantics as the SQLite one
#[derive(Debug, Default)]
pub struct MemoryWorkflowStore {
    inner: RwLock<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    workflows: BTreeMap<i64, Workflow>,
}

impl MemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowStore for MemoryWorkflowStore {
    async fn create(&self, input: NewWorkflow) -> PipelineResult<Workflow> {
        let input = input.validate()?;
        let now = now_millis();

        let mut state = self.inner.write().await;
        state.next_id += 1;
        let workflow = Workflow {
            id: state.next_id,
            name: input.name,
            description: input.description,
            url: input.url,
            created_at: now,
            modified_at: now,
        };
        state.workflows.insert(workflow.id, workflow.clone());

        Ok(workflow)
    }

    async fn get(&self, id: i64) -> PipelineResult<Option<Workflow>> {
        Ok(self.inner.read().await.workflows.get(&id).cloned())
    }

    async fn list(&self) -> PipelineResult<Vec<Workflow>> {
        Ok(self.inner.read().await.workflows.values().cloned().collect())
    }

    async fn update(&self, id: i64, patch: WorkflowPatch) -> PipelineResult<Option<Workflow>> {
        let mut state = self.inner.write().await;
        let Some(workflow) = state.workflows.get_mut(&id) else {
            return Ok(None);
        };

        let modified_at = next_modified_at(workflow.modified_at);
        patch.apply_to(workflow, modified_at);

        Ok(Some(workflow.clone()))
    }

    async fn delete(&self, id: i64) -> PipelineResult<bool> {
        Ok(self.inner.write().await.workflows.remove(&id).is_some())
    }
}

/// Convenience for callers that treat a missing record as an error
pub async fn require(store: &dyn WorkflowStore, id: i64) -> PipelineResult<Workflow> {
    store.get(id).await?.ok_or(PipelineError::NotFound(id))
}
