pub mod ws;
pub mod channel;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use channel::ChannelTransport;
pub use ws::WsTransport;

/// Transport-level occurrences on a live event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Opened,
    Message(String),
    Error(String),
    Closed,
}

/// Opens one event-stream connection per execution.
///
/// Connection failures are reported in-band as `Error` followed by `Closed`
/// so the caller never has to unwind its own state.
pub trait EventTransport: Send + Sync {
    fn open(
        &self,
        url: &str,
        token: CancellationToken,
    ) -> (mpsc::UnboundedReceiver<StreamEvent>, Option<JoinHandle<()>>);
}

pub fn stream_url(template: &str, session_id: &str) -> String {
    template.replace("{session_id}", session_id)
}
