// Application layer - Feed orchestration and the traits it depends on
pub mod feed_controller;
pub mod feed_transport;
pub mod target_store;
