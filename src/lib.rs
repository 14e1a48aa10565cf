pub mod core;
pub mod engine;
pub mod pipeline;
pub mod server;
pub mod sessions;
pub mod sources;
pub mod state;
pub mod transcript;
