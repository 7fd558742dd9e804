use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "OftalmoIA";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Signed bearer tokens stay valid for 7 days after issuance.
pub const TOKEN_LIFETIME_SECS: i64 = 7 * 24 * 60 * 60;

/// PBKDF2-SHA256 rounds for newly hashed passwords.
pub const PBKDF2_ITERATIONS: u32 = 600_000;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_ADVISORY_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_SYMPTOM_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_CHAT_MODEL: &str = "gpt-4";
const DEFAULT_ADVISORY_TIMEOUT_SECS: u64 = 30;

/// Default `EnvFilter` directive when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "oftalmo=info,oftalmo_lib=info,tower_http=info"
}

/// Get the application data directory (~/OftalmoIA/)
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the SQLite database file.
pub fn default_database_path() -> PathBuf {
    app_data_dir().join("oftalmo.db")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("JWT_SECRET must be set outside development")]
    MissingTokenSecret,
}

/// Deployment flavor. Controls error detail exposure and secret defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(ConfigError::InvalidValue {
                key: "APP_ENV",
                value: value.to_string(),
            }),
        }
    }

    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

/// Settings for the external completion service behind symptom triage and chat.
#[derive(Debug, Clone)]
pub struct AdvisoryConfig {
    /// `None` disables upstream calls; every advisory request uses its fallback.
    pub api_key: Option<String>,
    pub base_url: String,
    pub symptom_model: String,
    pub chat_model: String,
    pub timeout_secs: u64,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_ADVISORY_BASE_URL.to_string(),
            symptom_model: DEFAULT_SYMPTOM_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            timeout_secs: DEFAULT_ADVISORY_TIMEOUT_SECS,
        }
    }
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub database_path: PathBuf,
    pub token_secret: Vec<u8>,
    pub cors_origin: String,
    pub environment: Environment,
    pub password_iterations: u32,
    pub advisory: AdvisoryConfig,
}

impl AppConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (environment in production, maps in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = match get("APP_ENV").or_else(|| get("NODE_ENV")) {
            Some(v) => Environment::parse(&v)?,
            None => Environment::Production,
        };

        let port = match get("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: v,
            })?,
            None => DEFAULT_PORT,
        };

        let bind_addr = match get("BIND_ADDR") {
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "BIND_ADDR",
                value: v,
            })?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let token_secret = match get("JWT_SECRET") {
            Some(secret) => secret.into_bytes(),
            None if environment.is_development() => {
                tracing::warn!("JWT_SECRET not set, using an ephemeral development secret");
                let bytes: [u8; 32] = rand::random();
                bytes.to_vec()
            }
            None => return Err(ConfigError::MissingTokenSecret),
        };

        let timeout_secs = match get("ADVISORY_TIMEOUT_SECS") {
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "ADVISORY_TIMEOUT_SECS",
                value: v,
            })?,
            None => DEFAULT_ADVISORY_TIMEOUT_SECS,
        };

        let defaults = AdvisoryConfig::default();
        let advisory = AdvisoryConfig {
            api_key: get("OPENAI_API_KEY"),
            base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            symptom_model: get("OPENAI_MODEL").unwrap_or(defaults.symptom_model),
            chat_model: get("OPENAI_CHAT_MODEL").unwrap_or(defaults.chat_model),
            timeout_secs,
        };

        Ok(Self {
            bind_addr,
            port,
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_database_path),
            token_secret,
            cors_origin: get("CORS_ORIGIN").unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
            environment,
            password_iterations: PBKDF2_ITERATIONS,
            advisory,
        })
    }

    /// Config for tests: file-backed database at `database_path`, fixed secret,
    /// cheap password hashing, advisory disabled.
    #[cfg(test)]
    pub fn for_tests(database_path: PathBuf) -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            database_path,
            token_secret: b"test-secret-not-for-production".to_vec(),
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
            environment: Environment::Production,
            password_iterations: 1_000,
            advisory: AdvisoryConfig::default(),
        }
    }
}
