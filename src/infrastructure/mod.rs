// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod file_target_store;
pub mod websocket_transport;
