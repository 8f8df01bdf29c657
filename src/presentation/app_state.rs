// Application state for HTTP handlers
use crate::application::feed_controller::FeedController;

pub struct AppState {
    pub feed: FeedController,
}
