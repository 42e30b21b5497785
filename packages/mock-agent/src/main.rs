//! `eidagent-mock`: scripted stand-in for the local eID agent.
//!
//! # Quick start
//!
//! ```sh
//! # Listen on the agent's default address:
//! eidagent-mock
//!
//! # Different port and PIN:
//! EIDAGENT_MOCK_BIND=127.0.0.1:8080 EIDAGENT_MOCK_PIN=654321 eidagent-mock
//! ```
//!
//! # Environment variables
//!
//! See [`AgentConfig`] for the full list.

use std::process::ExitCode;
use std::sync::Arc;

use eidagent_mock::{build_router, AgentConfig, AgentState};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eidagent_mock=info".into()),
        )
        .init();

    let config = match AgentConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::from(2);
        }
    };

    let bind_addr = config.bind_addr;
    tracing::info!(
        "command path {}, reader {:?}",
        config.path,
        config.reader_name
    );
    let app = build_router(Arc::new(AgentState::new()), config);

    tracing::info!("listening on {bind_addr}");
    let listener = match tokio::net::TcpListener::bind(bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("failed to bind {bind_addr}: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
