use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use super::{EventTransport, StreamEvent};

/// In-process transport: each `open` takes the next feed queued with `feed()`.
///
/// Useful for embedding flowscope behind another event source, and for tests.
#[derive(Default)]
pub struct ChannelTransport {
    feeds: Mutex<VecDeque<mpsc::UnboundedReceiver<StreamEvent>>>,
    opened: Mutex<Vec<String>>,
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a feed for the next `open` and return its sending half.
    pub fn feed(&self) -> mpsc::UnboundedSender<StreamEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut feeds) = self.feeds.lock() {
            feeds.push_back(rx);
        }
        tx
    }

    /// URLs passed to `open`, oldest first.
    pub fn opened_urls(&self) -> Vec<String> {
        self.opened.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

impl EventTransport for ChannelTransport {
    fn open(
        &self,
        url: &str,
        _token: CancellationToken,
    ) -> (mpsc::UnboundedReceiver<StreamEvent>, Option<JoinHandle<()>>) {
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(url.to_string());
        }
        let next = self.feeds.lock().ok().and_then(|mut f| f.pop_front());
        match next {
            Some(rx) => (rx, None),
            None => {
                let (tx, rx) = mpsc::unbounded_channel();
                let _ = tx.send(StreamEvent::Error(format!("no feed queued for {}", url)));
                let _ = tx.send(StreamEvent::Closed);
                (rx, None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_feeds_are_handed_out_in_order() {
        let transport = ChannelTransport::new();
        let first = transport.feed();
        let _second = transport.feed();
        first.send(StreamEvent::Opened).unwrap();

        let (mut rx, handle) = transport.open("ws://a", CancellationToken::new());
        assert!(handle.is_none());
        assert_eq!(rx.recv().await, Some(StreamEvent::Opened));
        assert_eq!(transport.opened_urls(), vec!["ws://a".to_string()]);
    }

    #[tokio::test]
    async fn test_open_without_feed_reports_error() {
        let transport = ChannelTransport::new();
        let (mut rx, _) = transport.open("ws://b", CancellationToken::new());
        assert!(matches!(rx.recv().await, Some(StreamEvent::Error(_))));
        assert_eq!(rx.recv().await, Some(StreamEvent::Closed));
        assert_eq!(rx.recv().await, None);
    }
}
