/// Workflow Pilot server entry point
///
/// Loads configuration from the environment (and `.env` when present) and
/// starts the HTTP server:
/// - Workflow CRUD at /workflows
/// - Execution at /workflows/{id}/execute
/// - Health check at /healthz

use workflow_pilot::{config::Config, server::start_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real environment variables still apply
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    start_server(config).await?;

    Ok(())
}
