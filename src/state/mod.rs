use std::sync::Arc;

use crate::core::config::{AppPaths, ConfigService};
use crate::engine::{AnswerEngine, RemoteAnswerEngine};
use crate::pipeline::TurnPipeline;
use crate::sessions::SessionManager;

pub mod error;

use error::InitializationError;

/// Global application state shared across all routes and the WebSocket
/// handler.
///
/// The answer engine is constructed exactly once here and injected into the
/// turn pipeline; nothing else in the crate reaches for it directly.
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub sessions: SessionManager,
    pub pipeline: TurnPipeline,
}

impl AppState {
    pub fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let config = ConfigService::new(paths.clone());

        let engine = RemoteAnswerEngine::new(
            config.engine_base_url(),
            config.engine_timeout_secs(),
        )
        .map_err(|e| InitializationError::Engine(e.into()))?;

        Ok(Self::with_engine(paths, config, Arc::new(engine)))
    }

    /// Assembles state around an arbitrary engine implementation; the
    /// production path and tests share this constructor.
    pub fn with_engine(
        paths: Arc<AppPaths>,
        config: ConfigService,
        engine: Arc<dyn AnswerEngine>,
    ) -> Arc<Self> {
        let sessions = SessionManager::new(config.max_concurrent_generations());
        let pipeline = TurnPipeline::new(engine);

        Arc::new(AppState {
            paths,
            config,
            sessions,
            pipeline,
        })
    }
}
