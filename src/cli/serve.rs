use crate::api::{self, AppState};
use crate::cli::commands::ServeArgs;
use crate::cli::context::{build_controller, load_config};
use crate::config::parser::build_catalog;
use crate::errors::FlowscopeError;
use tracing::info;

pub async fn handle_serve(args: ServeArgs) -> Result<(), FlowscopeError> {
    let config = load_config(args.config.as_deref()).await?;
    let catalog = build_catalog(&config)?;
    let controller = build_controller(&config, config.controller_settings(), None)?;

    info!(host = %args.host, port = args.port, tasks = catalog.tasks().len(), "Starting API server");
    let state = AppState::new(controller, catalog);
    let app = api::build_router(state.clone());

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .map_err(|e| FlowscopeError::Internal(format!("Server error: {}", e)))?;

    state.controller.lock().await.stop().await;
    info!("API server stopped");
    Ok(())
}
