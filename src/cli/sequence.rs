use tokio::sync::mpsc;
use tracing::info;
use crate::cli::commands::SequenceArgs;
use crate::cli::context::load_config;
use crate::errors::FlowscopeError;
use crate::render::SequenceProgress;
use crate::sequencer::{SequencerEvent, StageSequencer, PRE_MEETING_STEPS};

pub async fn handle_sequence(args: SequenceArgs, quiet: bool) -> Result<(), FlowscopeError> {
    let config = load_config(args.config.as_deref()).await?;
    let timings = config.sequencer_timings();
    info!(expected_ms = timings.total(PRE_MEETING_STEPS.len()).as_millis() as u64, "Starting pre-meeting sequencer");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut sequencer = StageSequencer::pre_meeting(timings).with_event_channel(tx);
    let mut progress = SequenceProgress::new(!quiet, PRE_MEETING_STEPS.len());
    sequencer.start();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                sequencer.stop();
                info!("Sequencer interrupted");
                break;
            }
            event = rx.recv() => {
                let Some(event) = event else { break };
                progress.handle_event(&event);
                if matches!(event, SequencerEvent::Finished { .. }) {
                    break;
                }
            }
        }
    }

    if args.json {
        let snapshot = sequencer.snapshot().await;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    Ok(())
}
