// WebSocket implementation of the live feed transport
use crate::application::feed_transport::{FeedError, FeedTarget, FeedTransport, MessageStream};
use async_trait::async_trait;
use futures::StreamExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FeedTransport for WebSocketTransport {
    async fn open(&self, target: &FeedTarget) -> Result<MessageStream, FeedError> {
        let (mut socket, _response) = connect_async(target.as_str())
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        tracing::debug!("WebSocket feed open: {}", target);

        // Text and UTF-8 binary frames carry telemetry; control frames are
        // handled by tungstenite while the socket is polled.
        let stream = async_stream::stream! {
            while let Some(frame) = socket.next().await {
                match frame {
                    Ok(Message::Text(text)) => yield Ok(text),
                    Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                        Ok(text) => yield Ok(text),
                        Err(_) => tracing::debug!("Skipping non UTF-8 binary frame"),
                    },
                    Ok(Message::Close(frame)) => {
                        tracing::debug!("WebSocket feed closed by peer: {:?}", frame);
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        yield Err(FeedError::Transport(e.to_string()));
                        break;
                    }
                }
            }
        };

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::ws::{Message as ServerMessage, WebSocket, WebSocketUpgrade};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;

    async fn feed_handler(ws: WebSocketUpgrade) -> impl IntoResponse {
        ws.on_upgrade(|mut socket: WebSocket| async move {
            let _ = socket
                .send(ServerMessage::Text(r#"{"ts":1000,"rpm":3600}"#.to_string()))
                .await;
            let _ = socket
                .send(ServerMessage::Binary(br#"{"ts":2000}"#.to_vec()))
                .await;
            let _ = socket.send(ServerMessage::Close(None)).await;
        })
    }

    async fn spawn_feed_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = Router::new().route("/feed", get(feed_handler));
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("ws://{}/feed", addr)
    }

    #[tokio::test]
    async fn test_streams_frames_until_close() {
        let url = spawn_feed_server().await;
        let target = FeedTarget::parse(&url).unwrap();

        let mut stream = WebSocketTransport::new().open(&target).await.unwrap();

        assert_eq!(stream.next().await.unwrap().unwrap(), r#"{"ts":1000,"rpm":3600}"#);
        assert_eq!(stream.next().await.unwrap().unwrap(), r#"{"ts":2000}"#);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let target = FeedTarget::parse(&format!("ws://{}/feed", addr)).unwrap();
        let result = WebSocketTransport::new().open(&target).await;
        assert!(matches!(result, Err(FeedError::Transport(_))));
    }
}
