use std::time::Duration;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use super::{EventTransport, StreamEvent};

/// WebSocket event stream.
pub struct WsTransport {
    connect_timeout: Duration,
}

impl WsTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl EventTransport for WsTransport {
    fn open(
        &self,
        url: &str,
        token: CancellationToken,
    ) -> (mpsc::UnboundedReceiver<StreamEvent>, Option<JoinHandle<()>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(pump(url.to_string(), self.connect_timeout, token, tx));
        (rx, Some(handle))
    }
}

async fn pump(
    url: String,
    connect_timeout: Duration,
    token: CancellationToken,
    tx: mpsc::UnboundedSender<StreamEvent>,
) {
    debug!(url = %url, "Opening event stream");
    let connect = tokio::select! {
        biased;
        _ = token.cancelled() => return,
        result = timeout(connect_timeout, connect_async(url.as_str())) => result,
    };

    let ws_stream = match connect {
        Ok(Ok((ws_stream, _response))) => ws_stream,
        Ok(Err(e)) => {
            warn!(url = %url, error = %e, "Event stream connection failed");
            let _ = tx.send(StreamEvent::Error(e.to_string()));
            let _ = tx.send(StreamEvent::Closed);
            return;
        }
        Err(_) => {
            warn!(url = %url, "Event stream connection timed out");
            let _ = tx.send(StreamEvent::Error(format!(
                "connection timed out after {:?}",
                connect_timeout
            )));
            let _ = tx.send(StreamEvent::Closed);
            return;
        }
    };

    info!(url = %url, "Event stream connected");
    let _ = tx.send(StreamEvent::Opened);
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                debug!(url = %url, "Event stream closed on teardown");
                break;
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let _ = tx.send(StreamEvent::Message(text));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    let _ = tx.send(StreamEvent::Message(String::from_utf8_lossy(&bytes).into_owned()));
                }
                Some(Ok(Message::Close(_))) | None => {
                    let _ = tx.send(StreamEvent::Closed);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(url = %url, error = %e, "Event stream error");
                    let _ = tx.send(StreamEvent::Error(e.to_string()));
                    let _ = tx.send(StreamEvent::Closed);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_error_then_closed() {
        let transport = WsTransport::new(Duration::from_secs(2));
        // Port 9 (discard) on loopback is not a WebSocket server.
        let (mut rx, handle) = transport.open("ws://127.0.0.1:9/ws/session_1", CancellationToken::new());
        assert!(matches!(rx.recv().await, Some(StreamEvent::Error(_))));
        assert_eq!(rx.recv().await, Some(StreamEvent::Closed));
        handle.unwrap().await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_before_connect_sends_nothing() {
        let transport = WsTransport::default();
        let token = CancellationToken::new();
        token.cancel();
        let (mut rx, handle) = transport.open("ws://127.0.0.1:9/ws/session_1", token);
        handle.unwrap().await.unwrap();
        assert_eq!(rx.recv().await, None);
    }

    async fn listener() -> (tokio::net::TcpListener, String) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws/session_1", listener.local_addr().unwrap());
        (listener, url)
    }

    #[tokio::test]
    async fn test_frames_become_messages_and_teardown_sends_close() {
        let (listener, url) = listener().await;
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
            ws.send(Message::Text(r#"{"agentId":"a0"}"#.to_string())).await.unwrap();
            ws.send(Message::Binary(b"binary frame".to_vec())).await.unwrap();
            while let Some(frame) = ws.next().await {
                if matches!(frame, Ok(Message::Close(_))) {
                    return true;
                }
            }
            false
        });

        let token = CancellationToken::new();
        let (mut rx, handle) = WsTransport::default().open(&url, token.clone());
        assert_eq!(rx.recv().await, Some(StreamEvent::Opened));
        assert_eq!(rx.recv().await, Some(StreamEvent::Message(r#"{"agentId":"a0"}"#.to_string())));
        assert_eq!(rx.recv().await, Some(StreamEvent::Message("binary frame".to_string())));

        token.cancel();
        handle.unwrap().await.unwrap();
        assert!(server.await.unwrap(), "server never saw a close frame");
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_server_close_becomes_closed() {
        let (listener, url) = listener().await;
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
            ws.send(Message::Text("last words".to_string())).await.unwrap();
            let _ = ws.close(None).await;
        });

        let (mut rx, handle) = WsTransport::default().open(&url, CancellationToken::new());
        assert_eq!(rx.recv().await, Some(StreamEvent::Opened));
        assert_eq!(rx.recv().await, Some(StreamEvent::Message("last words".to_string())));
        assert_eq!(rx.recv().await, Some(StreamEvent::Closed));
        assert_eq!(rx.recv().await, None);
        handle.unwrap().await.unwrap();
        server.await.unwrap();
    }
}
