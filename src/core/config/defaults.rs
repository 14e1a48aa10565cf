use serde_json::{json, Value};

/// Built-in configuration. `config.yml` values are deep-merged on top.
pub fn default_config() -> Value {
    json!({
        "server": {
            "cors_allowed_origins": [
                "http://localhost",
                "http://localhost:3000",
                "http://localhost:5173",
                "http://127.0.0.1",
                "http://127.0.0.1:3000",
                "http://127.0.0.1:5173",
            ],
        },
        "engine": {
            "base_url": "http://127.0.0.1:8091",
            "request_timeout_secs": 120,
        },
        "chat": {
            "max_concurrent_generations": 16,
            "transcript_snapshot_limit": 100,
        },
    })
}
