//! Configuration loading for perplexity-mcp
//!
//! Each field is resolved on its own, highest priority first:
//! 1. Environment variable (e.g. `PERPLEXITY_API_KEY`)
//! 2. Config file (`[perplexity]`, `[server]`, `[proxy]` sections; TOML, or
//!    JSON when the file name ends in `.json`)
//! 3. Built-in default
//!
//! A file may set some fields while the environment overrides others.
//! Validation runs once over the merged result and reports every problem.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::proxy::{redact_proxy_url, ProxySettings};

pub const DEFAULT_API_URL: &str = "https://api.perplexity.ai/chat/completions";
pub const DEFAULT_MODEL: &str = "sonar";
pub const DEFAULT_SYSTEM_MESSAGE: &str = "Be precise and concise.";
pub const DEFAULT_TIMEOUT_SECONDS: f64 = 30.0;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_PATH: &str = "/mcp";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_MAX_REQUEST_SIZE: u64 = 1024 * 1024;

/// Models the Perplexity API is known to accept. Others are passed through.
pub const KNOWN_MODELS: &[&str] = &[
    "sonar",
    "sonar-pro",
    "sonar-reasoning",
    "sonar-reasoning-pro",
    "sonar-deep-research",
];

/// Environment variable names
pub mod env {
    pub const API_KEY: &str = "PERPLEXITY_API_KEY";
    pub const API_URL: &str = "PERPLEXITY_API_URL";
    pub const MODEL: &str = "PERPLEXITY_MODEL";
    pub const MODEL_PREFIX: &str = "PERPLEXITY_MODEL_PREFIX";
    pub const SYSTEM_MESSAGE: &str = "PERPLEXITY_SYSTEM_MESSAGE";
    pub const TIMEOUT: &str = "PERPLEXITY_TIMEOUT";
    pub const HTTP_PROXY: &str = "HTTP_PROXY";
    pub const HTTPS_PROXY: &str = "HTTPS_PROXY";
    pub const ALL_PROXY: &str = "ALL_PROXY";
    pub const NO_PROXY: &str = "NO_PROXY";
    pub const HOST: &str = "MCP_HOST";
    pub const PORT: &str = "MCP_PORT";
    pub const PATH: &str = "MCP_PATH";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const MAX_REQUEST_SIZE: &str = "MAX_REQUEST_SIZE";
    pub const DEBUG: &str = "DEBUG";
}

/// Configuration errors; all of them abort startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// How an empty string in the config file is treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyFileValue {
    /// `model = ""` counts as not set; the default applies
    #[default]
    FallThrough,
    /// `model = ""` replaces the default with an empty string
    Override,
}

/// Inputs to [`Settings::resolve`]
///
/// The environment is a snapshot rather than a live view so resolution can
/// be exercised without touching the process environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub file: Option<PathBuf>,
    pub env: HashMap<String, String>,
    pub empty_file_values: EmptyFileValue,
}

impl ConfigSources {
    /// Snapshot the current process environment
    pub fn from_process(file: Option<PathBuf>) -> Self {
        Self {
            file,
            env: std::env::vars().collect(),
            empty_file_values: EmptyFileValue::default(),
        }
    }

    fn env(&self, key: &str) -> Option<&str> {
        self.env
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Resolved, validated settings
///
/// Built once at startup and shared read-only (`Arc<Settings>`) by every
/// search call.
#[derive(Clone)]
pub struct Settings {
    pub api_key: String,
    pub api_url: String,
    pub default_model: String,
    /// Prepended to the model name unless already present
    pub model_prefix: String,
    pub default_system_message: String,
    pub timeout_seconds: f64,
    pub proxy: ProxySettings,
    pub bind_host: String,
    pub bind_port: u16,
    pub bind_path: String,
    pub log_level: String,
    pub max_request_size: u64,
    pub debug: bool,
    /// File the settings were read from, if any
    pub config_file: Option<PathBuf>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("model_prefix", &self.model_prefix)
            .field("default_system_message", &self.default_system_message)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("proxy", &self.proxy.routes())
            .field("bind_host", &self.bind_host)
            .field("bind_port", &self.bind_port)
            .field("bind_path", &self.bind_path)
            .field("log_level", &self.log_level)
            .field("max_request_size", &self.max_request_size)
            .field("debug", &self.debug)
            .field("config_file", &self.config_file)
            .finish()
    }
}

// Config file layout. Everything is optional so that "not in the file" is
// distinguishable from "set to the default value".

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    perplexity: FilePerplexity,
    server: FileServer,
    proxy: FileProxy,
    debug: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FilePerplexity {
    api_key: Option<String>,
    api_url: Option<String>,
    model: Option<String>,
    model_prefix: Option<String>,
    system_message: Option<String>,
    timeout: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileServer {
    host: Option<String>,
    port: Option<i64>,
    path: Option<String>,
    log_level: Option<String>,
    max_request_size: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileProxy {
    http_proxy: Option<String>,
    https_proxy: Option<String>,
    all_proxy: Option<String>,
    no_proxy: Option<String>,
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let parsed = if is_json {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    } else {
        toml::from_str(&content).map_err(|e| e.to_string())
    };

    parsed.map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Per-field layering of environment over file over default
struct Layers<'a> {
    sources: &'a ConfigSources,
    errors: Vec<String>,
}

impl Layers<'_> {
    fn file_text(&self, value: Option<String>) -> Option<String> {
        match self.sources.empty_file_values {
            EmptyFileValue::FallThrough => value.filter(|v| !v.trim().is_empty()),
            EmptyFileValue::Override => value,
        }
    }

    fn optional_text(&self, key: &str, file: Option<String>) -> Option<String> {
        self.sources
            .env(key)
            .map(str::to_string)
            .or_else(|| self.file_text(file))
    }

    fn text(&self, key: &str, file: Option<String>, default: &str) -> String {
        self.optional_text(key, file)
            .unwrap_or_else(|| default.to_string())
    }

    fn number<T: FromStr>(&mut self, key: &str, file: Option<T>, default: T) -> T {
        if let Some(raw) = self.sources.env(key) {
            match raw.parse() {
                Ok(value) => return value,
                Err(_) => self
                    .errors
                    .push(format!("{} must be a number (got {:?})", key, raw)),
            }
        }
        file.unwrap_or(default)
    }

    fn flag(&self, key: &str, file: Option<bool>) -> bool {
        match self.sources.env(key) {
            Some(raw) => matches!(
                raw.to_ascii_lowercase().as_str(),
                "true" | "1" | "yes" | "on"
            ),
            None => file.unwrap_or(false),
        }
    }
}

/// Map a log level name onto a `tracing` level
///
/// Accepts the names Python/uvicorn style configs use as well.
fn normalize_log_level(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" | "critical" => Some("error"),
        _ => None,
    }
}

impl Settings {
    /// Resolve settings from the process environment and a config file
    ///
    /// With no explicit `path`, the first existing default location is used.
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let file = path.or_else(find_config_path);
        Self::resolve(&ConfigSources::from_process(file))
    }

    /// Resolve settings from explicit sources
    pub fn resolve(sources: &ConfigSources) -> Result<Self, ConfigError> {
        let file = match &sources.file {
            Some(path) => read_file_config(path)?,
            None => FileConfig::default(),
        };
        let FileConfig {
            perplexity,
            server,
            proxy,
            debug,
        } = file;

        let mut layers = Layers {
            sources,
            errors: Vec::new(),
        };

        let api_key = layers.text(env::API_KEY, perplexity.api_key, "");
        let api_url = layers.text(env::API_URL, perplexity.api_url, DEFAULT_API_URL);
        let default_model = layers.text(env::MODEL, perplexity.model, DEFAULT_MODEL);
        let model_prefix = layers.text(env::MODEL_PREFIX, perplexity.model_prefix, "");
        let default_system_message = layers.text(
            env::SYSTEM_MESSAGE,
            perplexity.system_message,
            DEFAULT_SYSTEM_MESSAGE,
        );
        let timeout_seconds =
            layers.number(env::TIMEOUT, perplexity.timeout, DEFAULT_TIMEOUT_SECONDS);

        let proxy = ProxySettings {
            http: layers.optional_text(env::HTTP_PROXY, proxy.http_proxy),
            https: layers.optional_text(env::HTTPS_PROXY, proxy.https_proxy),
            all: layers.optional_text(env::ALL_PROXY, proxy.all_proxy),
            no_proxy: layers.optional_text(env::NO_PROXY, proxy.no_proxy),
        };

        let bind_host = layers.text(env::HOST, server.host, DEFAULT_HOST);
        let port = layers.number(env::PORT, server.port, i64::from(DEFAULT_PORT));
        let bind_path = layers.text(env::PATH, server.path, DEFAULT_PATH);
        let raw_log_level = layers.text(env::LOG_LEVEL, server.log_level, DEFAULT_LOG_LEVEL);
        let max_request_size = layers.number(
            env::MAX_REQUEST_SIZE,
            server.max_request_size,
            DEFAULT_MAX_REQUEST_SIZE as i64,
        );
        let debug = layers.flag(env::DEBUG, debug);

        let mut errors = layers.errors;

        if api_key.trim().is_empty() {
            errors.push(format!(
                "api_key is required (set {} or perplexity.api_key)",
                env::API_KEY
            ));
        }
        if !(timeout_seconds.is_finite() && timeout_seconds > 0.0)
            || Duration::try_from_secs_f64(timeout_seconds).is_err()
        {
            errors.push(format!(
                "timeout_seconds must be a positive number (got {})",
                timeout_seconds
            ));
        }
        let bind_port = match u16::try_from(port) {
            Ok(p) if p > 0 => p,
            _ => {
                errors.push(format!("bind_port must be within 1-65535 (got {})", port));
                0
            }
        };
        if !bind_path.starts_with('/') {
            errors.push(format!("bind_path must start with '/' (got {:?})", bind_path));
        }
        if max_request_size <= 0 {
            errors.push(format!(
                "max_request_size must be greater than 0 (got {})",
                max_request_size
            ));
        }
        let log_level = normalize_log_level(&raw_log_level).unwrap_or_else(|| {
            errors.push(format!(
                "log_level must be one of trace, debug, info, warn, error (got {:?})",
                raw_log_level
            ));
            DEFAULT_LOG_LEVEL
        });
        errors.extend(proxy.validate());

        if !errors.is_empty() {
            return Err(ConfigError::Invalid(errors));
        }

        Ok(Self {
            api_key,
            api_url,
            default_model,
            model_prefix,
            default_system_message,
            timeout_seconds,
            proxy,
            bind_host,
            bind_port,
            bind_path,
            log_level: log_level.to_string(),
            max_request_size: max_request_size as u64,
            debug,
            config_file: sources.file.clone(),
        })
    }

    /// Non-fatal findings from resolution
    ///
    /// [`Settings::resolve`] does not log; callers report these once tracing
    /// is initialized.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !KNOWN_MODELS.contains(&self.default_model.as_str()) {
            warnings.push(format!(
                "Model '{}' is not a known Perplexity model; passing it through",
                self.default_model
            ));
        }
        warnings
    }

    /// Level used for tracing, raised to `debug` when debug mode is on
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.log_level
        }
    }

    /// Human-readable summary with secrets masked
    pub fn status_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!(
                "Config file: {}",
                self.config_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(none)".to_string())
            ),
            format!(
                "API key: {}",
                if self.api_key.is_empty() { "not set" } else { "set" }
            ),
            format!("API URL: {}", self.api_url),
            format!("Model: {}", self.default_model),
            format!(
                "Model prefix: {}",
                if self.model_prefix.is_empty() {
                    "(none)"
                } else {
                    &self.model_prefix
                }
            ),
            format!("System message: {}", preview(&self.default_system_message, 50)),
            format!("Timeout: {}s", self.timeout_seconds),
            format!(
                "Server: {}:{}{}",
                self.bind_host, self.bind_port, self.bind_path
            ),
            format!("Log level: {}", self.log_level),
            format!("Debug: {}", if self.debug { "on" } else { "off" }),
        ];

        let routes = self.proxy.routes();
        if routes.is_empty() {
            lines.push("Proxy: none (direct connection)".to_string());
        } else {
            for (scheme, url) in routes {
                lines.push(format!("Proxy {}: {}", scheme, redact_proxy_url(url)));
            }
        }
        if let Some(bypass) = &self.proxy.no_proxy {
            lines.push(format!("No proxy: {}", bypass));
        }

        lines
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// First existing default config location
///
/// 1. `./perplexity-mcp.toml`
/// 2. `./config.json`
/// 3. `~/.perplexity-mcp/config.toml`
pub fn find_config_path() -> Option<PathBuf> {
    let mut candidates = vec![
        PathBuf::from("perplexity-mcp.toml"),
        PathBuf::from("config.json"),
    ];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".perplexity-mcp").join("config.toml"));
    }

    candidates.into_iter().find(|p| p.is_file())
}

/// Annotated sample configuration file
pub fn sample_config_toml() -> &'static str {
    r#"# perplexity-mcp configuration
#
# Every value can be overridden by an environment variable (shown in
# brackets). Environment variables always win over this file.

# Verbose logging [DEBUG]
debug = false

[perplexity]
# Required. [PERPLEXITY_API_KEY]
api_key = "your-perplexity-api-key-here"
# Chat completions endpoint [PERPLEXITY_API_URL]
api_url = "https://api.perplexity.ai/chat/completions"
# sonar, sonar-pro, sonar-reasoning, sonar-reasoning-pro, sonar-deep-research [PERPLEXITY_MODEL]
model = "sonar"
# Prepended to the model name, e.g. for gateways that namespace models [PERPLEXITY_MODEL_PREFIX]
model_prefix = ""
# Default system prompt [PERPLEXITY_SYSTEM_MESSAGE]
system_message = "Be precise and concise."
# Request timeout in seconds [PERPLEXITY_TIMEOUT]
timeout = 30.0

[server]
# Streamable HTTP binding [MCP_HOST, MCP_PORT, MCP_PATH]
host = "127.0.0.1"
port = 8000
path = "/mcp"
# trace, debug, info, warn, error [LOG_LEVEL]
log_level = "info"
# Maximum request body in bytes [MAX_REQUEST_SIZE]
max_request_size = 1048576

[proxy]
# Per-scheme proxies; all_proxy applies to schemes without their own
# [HTTP_PROXY, HTTPS_PROXY, ALL_PROXY, NO_PROXY]
# http_proxy = "http://127.0.0.1:7890"
# https_proxy = "http://127.0.0.1:7890"
# all_proxy = "socks5://127.0.0.1:1080"
# no_proxy = "localhost,127.0.0.1"
"#
}
