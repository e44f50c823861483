use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration field: {0}")]
    MissingField(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error(transparent)]
    Source(#[from] config::ConfigError),
}

/// Fully validated service configuration, built once at startup.
#[derive(Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreKind,
    pub persistence: Option<PersistenceConfig>,
    pub completion: CompletionConfig,
    pub transcription: TranscriptionConfig,
    pub rooms: Option<RoomsConfig>,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted request body; audio clips arrive base64-encoded
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Which persistence backend the service talks to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Rest,
    Memory,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rest => "rest",
            Self::Memory => "memory",
        }
    }
}

#[derive(Debug)]
pub struct PersistenceConfig {
    /// Base URL of the managed store, e.g. `https://project.supabase.co`
    pub endpoint: String,
    pub key: SecretString,
    /// Upper bound on optimistic write attempts per append
    pub max_write_attempts: u32,
}

#[derive(Debug)]
pub struct CompletionConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug)]
pub struct TranscriptionConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub language: String,
}

#[derive(Debug)]
pub struct RoomsConfig {
    pub api_key: String,
    pub api_secret: SecretString,
    pub token_ttl: Duration,
}

// Raw shape as it comes out of file + environment; every required field is
// optional here so a missing one is reported by name.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    store: StoreKind,
    #[serde(default)]
    persistence: RawPersistence,
    #[serde(default)]
    completion: RawCompletion,
    #[serde(default)]
    transcription: RawTranscription,
    #[serde(default)]
    rooms: RawRooms,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPersistence {
    endpoint: Option<String>,
    key: Option<String>,
    max_write_attempts: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCompletion {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTranscription {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRooms {
    api_key: Option<String>,
    api_secret: Option<String>,
    token_ttl_secs: Option<u64>,
}

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// The speech-to-text upload cap (25 MiB) after base64 expansion, plus room
/// for the JSON envelope.
pub const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024 / 3 * 4 + 64 * 1024;

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingField(field))
}

impl Config {
    /// Load configuration from an optional TOML file layered under
    /// `WEBINAR_AGENT_*` environment variables (`__` separates sections).
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        Self::load_with_store(path, None)
    }

    /// Same as [`Config::load`], with the store backend forced from the CLI.
    pub fn load_with_store(path: &str, store: Option<StoreKind>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("WEBINAR_AGENT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Some(store) = store {
            builder = builder.set_override("store", store.as_str())?;
        }

        Self::from_settings(builder.build()?)
    }

    pub fn from_settings(settings: config::Config) -> Result<Self, ConfigError> {
        let raw: RawConfig = settings.try_deserialize()?;
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> Result<Self, ConfigError> {
        let persistence = match raw.store {
            StoreKind::Rest => Some(PersistenceConfig {
                endpoint: required(raw.persistence.endpoint, "persistence.endpoint")?
                    .trim_end_matches('/')
                    .to_string(),
                key: required(raw.persistence.key, "persistence.key")?.into(),
                max_write_attempts: raw.persistence.max_write_attempts.unwrap_or(5).max(1),
            }),
            StoreKind::Memory => None,
        };

        let completion = CompletionConfig {
            api_key: required(raw.completion.api_key, "completion.api_key")?.into(),
            base_url: raw
                .completion
                .base_url
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            model: raw.completion.model.unwrap_or_else(|| "gpt-4".to_string()),
            max_tokens: raw.completion.max_tokens.unwrap_or(500),
            temperature: raw.completion.temperature.unwrap_or(0.7),
        };

        let transcription = TranscriptionConfig {
            api_key: required(raw.transcription.api_key, "transcription.api_key")?.into(),
            base_url: raw
                .transcription
                .base_url
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            model: raw
                .transcription
                .model
                .unwrap_or_else(|| "whisper-1".to_string()),
            language: raw.transcription.language.unwrap_or_else(|| "es".to_string()),
        };

        let rooms = match (raw.rooms.api_key, raw.rooms.api_secret) {
            (Some(api_key), Some(api_secret)) => Some(RoomsConfig {
                api_key,
                api_secret: api_secret.into(),
                token_ttl: Duration::from_secs(raw.rooms.token_ttl_secs.unwrap_or(6 * 60 * 60)),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid(
                    "rooms.api_key and rooms.api_secret must be set together".to_string(),
                ))
            }
        };

        Ok(Self {
            server: raw.server,
            store: raw.store,
            persistence,
            completion,
            transcription,
            rooms,
            request_timeout: Duration::from_secs(raw.request_timeout_secs.unwrap_or(30)),
        })
    }
}
