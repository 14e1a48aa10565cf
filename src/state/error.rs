use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to initialize answer engine client: {0}")]
    Engine(#[source] anyhow::Error),
}
