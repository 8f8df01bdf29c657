// HTTP request handlers
use crate::application::feed_controller::FeedSnapshot;
use crate::domain::telemetry::ConnectionMode;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Deserialize)]
pub struct ConnectQuery {
    pub url: Option<String>,
}

#[derive(Serialize)]
pub struct ModeResponse {
    pub mode: ConnectionMode,
    pub target: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Mode, latest sample and the rolling buffer for tiles and chart
pub async fn telemetry(State(state): State<Arc<AppState>>) -> Json<FeedSnapshot> {
    Json(state.feed.snapshot())
}

pub async fn mode(State(state): State<Arc<AppState>>) -> Json<ModeResponse> {
    Json(ModeResponse {
        mode: state.feed.mode(),
        target: state.feed.target(),
    })
}

/// Server-sent events: the current mode, then every transition
pub async fn mode_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = mode_changes(state.feed.subscribe())
        .map(|mode| Ok(Event::default().event("mode").data(mode.as_str())));
    Sse::new(events).keep_alive(KeepAlive::default())
}

fn mode_changes(mut rx: watch::Receiver<ConnectionMode>) -> impl Stream<Item = ConnectionMode> {
    async_stream::stream! {
        loop {
            let mode = *rx.borrow_and_update();
            yield mode;
            if rx.changed().await.is_err() {
                break;
            }
        }
    }
}

/// Connect to a user-entered feed URL; no URL selects demo mode
pub async fn connect(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Json<FeedSnapshot> {
    let url = query.url.unwrap_or_default();
    tracing::info!(url = %url, "connect requested");
    state.feed.enter_target(&url);
    Json(state.feed.snapshot())
}

pub async fn start_demo(State(state): State<Arc<AppState>>) -> Json<FeedSnapshot> {
    state.feed.start_demo();
    Json(state.feed.snapshot())
}

pub async fn stop(State(state): State<Arc<AppState>>) -> Json<FeedSnapshot> {
    state.feed.stop();
    Json(state.feed.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::feed_controller::{FeedController, FeedOptions};
    use crate::application::feed_transport::{FeedError, FeedTarget, FeedTransport, MessageStream};
    use crate::application::target_store::memory::MemoryTargetStore;
    use crate::domain::synthetic::SyntheticGenerator;
    use async_trait::async_trait;

    struct RefusingTransport;

    #[async_trait]
    impl FeedTransport for RefusingTransport {
        async fn open(&self, _target: &FeedTarget) -> Result<MessageStream, FeedError> {
            Err(FeedError::Transport("connection refused".to_string()))
        }
    }

    fn app_state() -> (Arc<AppState>, Arc<MemoryTargetStore>) {
        let store = Arc::new(MemoryTargetStore::default());
        let feed = FeedController::new(
            FeedOptions::default(),
            Arc::new(RefusingTransport),
            store.clone(),
            SyntheticGenerator::seeded(5),
        );
        (Arc::new(AppState { feed }), store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_changes_follow_controller() {
        let (state, _) = app_state();
        let mut modes = Box::pin(mode_changes(state.feed.subscribe()));

        assert_eq!(modes.next().await, Some(ConnectionMode::Disconnected));

        state.feed.start_demo();
        assert_eq!(modes.next().await, Some(ConnectionMode::Demo));

        let Json(response) = mode(State(state)).await;
        assert_eq!(response.mode, ConnectionMode::Demo);
        assert_eq!(response.target, None);
    }

    #[tokio::test]
    async fn test_health_check() {
        assert_eq!(health_check().await, "ok");
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_without_url_starts_demo() {
        let (state, store) = app_state();

        let Json(snapshot) = connect(State(state.clone()), Query(ConnectQuery { url: None })).await;
        assert_eq!(snapshot.mode, ConnectionMode::Demo);
        assert_eq!(snapshot.samples.len(), 30);
        assert!(snapshot.latest.is_some());
        assert!(store.saved().is_none());

        let Json(response) = mode(State(state)).await;
        assert_eq!(response.mode, ConnectionMode::Demo);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_persists_url() {
        let (state, store) = app_state();
        let url = "ws://turbine.local/feed".to_string();

        let Json(snapshot) = connect(State(state), Query(ConnectQuery { url: Some(url.clone()) })).await;
        assert_eq!(snapshot.mode, ConnectionMode::Connecting);
        assert_eq!(snapshot.target, Some(url.clone()));
        assert_eq!(store.saved(), Some(url));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_keeps_mode_and_buffer() {
        let (state, _) = app_state();
        let _ = start_demo(State(state.clone())).await;

        let Json(snapshot) = stop(State(state.clone())).await;
        assert_eq!(snapshot.mode, ConnectionMode::Demo);
        assert_eq!(snapshot.samples.len(), 30);

        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        let Json(snapshot) = telemetry(State(state)).await;
        assert_eq!(snapshot.samples.len(), 30);
    }
}
