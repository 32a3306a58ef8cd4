use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use crate::audit::TranscriptLogger;
use crate::cli::commands::RunArgs;
use crate::cli::context::{build_controller, load_config};
use crate::config::parser::build_catalog;
use crate::drivers::ExecutionEvent;
use crate::errors::FlowscopeError;
use crate::render::ExecutionProgress;
use crate::workflow::ConnectionStatus;

enum Outcome {
    Completed,
    Stopped,
    StreamClosed,
    TimedOut,
}

pub async fn handle_run(args: RunArgs, quiet: bool) -> Result<(), FlowscopeError> {
    let config = load_config(args.config.as_deref()).await?;
    let catalog = build_catalog(&config)?;
    let model = catalog.require(&args.task)?;

    let mut settings = config.controller_settings();
    if let Some(scale) = args.scale {
        if scale == 0 {
            return Err(FlowscopeError::Config("--scale must be greater than 0".into()));
        }
        settings.simulation.scale_factor = scale;
    }
    if model.is_file_upload_gated && args.file.is_none() {
        return Err(FlowscopeError::Config(format!(
            "Task '{}' needs a document: pass --file",
            model.task_id
        )));
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut controller = build_controller(&config, settings, args.backend_url.as_deref())?
        .with_event_channel(tx);
    let transcript = args.transcript.as_deref().map(|p| TranscriptLogger::new(Path::new(p)));
    let mut progress = ExecutionProgress::new(!quiet, !args.no_logs);

    let session_id = controller.start(Some(model.clone())).await;
    info!(session_id = %session_id, task_id = %model.task_id, "Running task");
    if let Some(t) = &transcript {
        t.initialize(&model.task_id, &session_id).await?;
    }

    if let Some(file) = &args.file {
        if model.is_file_upload_gated {
            let path = Path::new(file);
            let bytes = tokio::fs::read(path).await?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.clone());
            if !controller.upload(&name, bytes).await? {
                controller.stop().await;
                return Err(FlowscopeError::Backend(format!("Upload of {} was rejected", name)));
            }
            if !model.auto_start {
                controller.trigger_start().await?;
            }
        } else {
            warn!(task_id = %model.task_id, "Task is not file-gated; ignoring --file");
        }
    }

    let timeout = tokio::time::sleep(Duration::from_secs(args.timeout));
    tokio::pin!(timeout);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = loop {
        tokio::select! {
            _ = &mut ctrl_c => break Outcome::Stopped,
            _ = &mut timeout => break Outcome::TimedOut,
            event = rx.recv() => {
                let Some(event) = event else { break Outcome::Stopped };
                progress.handle_event(&event);
                if let Some(t) = &transcript {
                    if let Err(e) = t.record(&event).await {
                        warn!(error = %e, "Failed to write transcript");
                    }
                }
                match event {
                    ExecutionEvent::ExecutionCompleted { .. } => break Outcome::Completed,
                    ExecutionEvent::ConnectionChanged { status: ConnectionStatus::Disconnected } => {
                        break Outcome::StreamClosed
                    }
                    _ => {}
                }
            }
        }
    };

    let view = controller.view().await;
    controller.stop().await;
    while let Ok(event) = rx.try_recv() {
        progress.handle_event(&event);
        if let Some(t) = &transcript {
            let _ = t.record(&event).await;
        }
    }
    progress.finish();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    }

    match outcome {
        Outcome::Completed => {
            info!(session_id = %session_id, completed = view.completed_count, "Task completed");
            Ok(())
        }
        Outcome::Stopped => {
            info!(session_id = %session_id, "Run interrupted");
            Ok(())
        }
        Outcome::StreamClosed => Err(FlowscopeError::Stream(format!(
            "Event stream closed after {}/{} steps",
            view.completed_count, view.total_steps
        ))),
        Outcome::TimedOut => Err(FlowscopeError::Timeout(format!(
            "Task '{}' did not finish within {}s",
            model.task_id, args.timeout
        ))),
    }
}
