use std::env;
use std::fs;
use std::path::Path;

use clientela_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct Sources {
    doc: Option<Value>,
    path: Option<String>,
}

impl Sources {
    fn detect(explicit: Option<&Path>) -> Self {
        let path = resolve_config_path(explicit);
        let doc = path.as_deref().and_then(load_config_file_doc);
        Self { doc, path: path.map(|path| path.display().to_string()) }
    }

    fn line(&self, key: &str, value: &str, env_keys: &[&str]) -> String {
        format!("- {key} = {value} (source: {})", self.source(key, env_keys))
    }

    fn source(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.doc {
            if contains_path(doc, key_path) {
                let file_path = self.path.as_deref().unwrap_or("config file");
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

pub fn run(options: LoadOptions) -> String {
    let sources = Sources::detect(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let store = &config.store;
    let api_token = match &store.rest_api_token {
        Some(token) => redact_token(token.expose_secret()),
        None => "<unset>".to_string(),
    };

    let lines = vec![
        "effective config (source precedence: env > file > default):".to_string(),
        sources.line("store.backend", store.backend.as_str(), &["CLIENTELA_STORE_BACKEND"]),
        sources.line(
            "store.data_dir",
            &store.data_dir.display().to_string(),
            &["CLIENTELA_STORE_DATA_DIR"],
        ),
        sources.line("store.slot_key", &store.slot_key, &["CLIENTELA_STORE_SLOT_KEY"]),
        sources.line(
            "store.database_url",
            &store.database_url,
            &["CLIENTELA_STORE_DATABASE_URL"],
        ),
        sources.line(
            "store.max_connections",
            &store.max_connections.to_string(),
            &["CLIENTELA_STORE_MAX_CONNECTIONS"],
        ),
        sources.line(
            "store.rest_base_url",
            &store.rest_base_url,
            &["CLIENTELA_STORE_REST_BASE_URL"],
        ),
        sources.line("store.rest_api_token", &api_token, &["CLIENTELA_STORE_REST_API_TOKEN"]),
        sources.line(
            "store.timeout_secs",
            &store.timeout_secs.to_string(),
            &["CLIENTELA_STORE_TIMEOUT_SECS"],
        ),
        sources.line(
            "store.simulate_latency",
            &store.simulate_latency.to_string(),
            &["CLIENTELA_STORE_SIMULATE_LATENCY"],
        ),
        sources.line(
            "server.bind_address",
            &config.server.bind_address,
            &["CLIENTELA_SERVER_BIND_ADDRESS"],
        ),
        sources.line("server.port", &config.server.port.to_string(), &["CLIENTELA_SERVER_PORT"]),
        sources.line(
            "server.graceful_shutdown_secs",
            &config.server.graceful_shutdown_secs.to_string(),
            &["CLIENTELA_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        sources.line(
            "logging.level",
            &config.logging.level,
            &["CLIENTELA_LOGGING_LEVEL", "CLIENTELA_LOG_LEVEL"],
        ),
        sources.line(
            "logging.format",
            config.logging.format.as_str(),
            &["CLIENTELA_LOGGING_FORMAT", "CLIENTELA_LOG_FORMAT"],
        ),
    ];

    lines.join("\n")
}

fn load_config_file_doc(path: &Path) -> Option<Value> {
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
