use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::defaults::default_config;
use super::paths::AppPaths;

/// Read-only view over the merged configuration: built-in defaults with the
/// user's `config.yml` deep-merged on top.
#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("RAGDOCS_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn load_config(&self) -> Value {
        let user_config = load_yaml_file(&self.config_path());
        deep_merge(&default_config(), &user_config)
    }

    pub fn engine_base_url(&self) -> String {
        self.load_config()
            .pointer("/engine/base_url")
            .and_then(|v| v.as_str())
            .unwrap_or("http://127.0.0.1:8091")
            .trim_end_matches('/')
            .to_string()
    }

    pub fn engine_timeout_secs(&self) -> u64 {
        self.load_config()
            .pointer("/engine/request_timeout_secs")
            .and_then(|v| v.as_u64())
            .unwrap_or(120)
    }

    pub fn max_concurrent_generations(&self) -> usize {
        let slots = self
            .load_config()
            .pointer("/chat/max_concurrent_generations")
            .and_then(|v| v.as_u64())
            .unwrap_or(16);
        (slots as usize).max(1)
    }

    pub fn transcript_snapshot_limit(&self) -> usize {
        self.load_config()
            .pointer("/chat/transcript_snapshot_limit")
            .and_then(|v| v.as_u64())
            .unwrap_or(100) as usize
    }
}

fn load_yaml_file(path: &Path) -> Value {
    let Ok(raw) = fs::read_to_string(path) else {
        return Value::Null;
    };

    match serde_yaml::from_str::<Value>(&raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {}; ignoring file", path.display(), err);
            Value::Null
        }
    }
}

fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in overlay_map {
                let entry = merged.entry(key.clone()).or_insert(Value::Null);
                *entry = deep_merge(entry, value);
            }
            Value::Object(merged)
        }
        (_, Value::Null) => base.clone(),
        (_, other) => other.clone(),
    }
}
