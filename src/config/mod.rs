use anyhow::{Context, Result};
use rand::Rng;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub advisor: AdvisorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Display name for the bootstrap root administrator.
    #[serde(default = "default_admin_name")]
    pub admin_name: String,
    /// Email for the root administrator. This account can never be deleted.
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
    /// Plaintext bootstrap password, hashed before it reaches the store.
    /// Supply via config file or MODRESOLVE_ADMIN_PASSWORD.
    #[serde(default)]
    pub admin_password: Option<String>,
    /// HS256 key for session tokens. Randomly generated per process if not
    /// provided, which invalidates sessions across restarts.
    #[serde(default = "default_session_secret")]
    pub session_secret: String,
    /// Session lifetime in days.
    #[serde(default = "default_session_days")]
    pub session_days: i64,
    /// Set the `Secure` attribute on the session cookie.
    #[serde(default)]
    pub secure_cookies: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_name: default_admin_name(),
            admin_email: default_admin_email(),
            admin_password: None,
            session_secret: default_session_secret(),
            session_days: default_session_days(),
            secure_cookies: false,
        }
    }
}

fn default_admin_name() -> String {
    "Admin".to_string()
}

fn default_admin_email() -> String {
    "admin@modresolve.local".to_string()
}

fn default_session_secret() -> String {
    // Generate a random key if not provided
    let bytes: [u8; 32] = rand::rng().random();
    hex::encode(bytes)
}

fn default_session_days() -> i64 {
    7
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdvisorConfig {
    /// Gemini API key. Supply via config file or MODRESOLVE_GEMINI_API_KEY.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Hard timeout around every advisory call in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content).with_context(|| "Failed to parse configuration file")?
        } else {
            info!("No config file found, using defaults");
            Config::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Secrets may come from the environment instead of the config file.
    fn apply_env_overrides(&mut self) {
        if let Ok(password) = std::env::var("MODRESOLVE_ADMIN_PASSWORD") {
            self.auth.admin_password = Some(password);
        }
        if let Ok(email) = std::env::var("MODRESOLVE_ADMIN_EMAIL") {
            self.auth.admin_email = email;
        }
        if let Ok(secret) = std::env::var("MODRESOLVE_SESSION_SECRET") {
            self.auth.session_secret = secret;
        }
        if let Ok(key) = std::env::var("MODRESOLVE_GEMINI_API_KEY") {
            self.advisor.api_key = Some(key);
        }
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            advisor: AdvisorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
