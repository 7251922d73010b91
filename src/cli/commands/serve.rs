//! Serve command: the web upload form and JSON API.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::credential::Credential;
use crate::orchestrator::Orchestrator;
use crate::web::{self, AppState};
use std::sync::Arc;

/// Run the web server.
pub async fn run_serve(
    host: &str,
    port: u16,
    api_key: Option<&str>,
    settings: Settings,
) -> anyhow::Result<()> {
    let credential = preflight::check(Operation::Serve, api_key, &settings)?;
    let has_credential = credential.is_some();

    // Without a server key every request must bring its own.
    let orchestrator =
        Orchestrator::new(&settings, credential.unwrap_or_else(|| Credential::new("")))?;

    let state = Arc::new(AppState {
        orchestrator,
        has_credential,
    });
    let app = web::router(state, settings.server.max_upload_bytes());

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Kangui Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Upload form", "GET  /");
    Output::kv("Analyze (HTML)", "POST /analyze");
    Output::kv("Analyze (JSON)", "POST /api/analyze");
    Output::kv("Levels", "GET  /levels");
    Output::kv("Health", "GET  /health");
    println!();
    if !has_credential {
        Output::warning("No OpenAI API key configured; the form will ask for one.");
    }
    Output::kv("Max upload", &format!("{} MB", settings.server.max_upload_mb));
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}
