//! TOML-based configuration for the admissions server
//!
//! Settings live in `admissions.toml`. Secrets are never stored in the file:
//! it names the environment variables that hold them (`jwt_secret_env`,
//! `api_key_env`, ...) and they are resolved at runtime.
//!
//! # Hot Reloading
//!
//! Configuration changes are detected and applied at runtime.
//! Use `AdmissionsConfigManager` for thread-safe access to the current configuration.

use arc_swap::ArcSwap;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Root configuration structure loaded from admissions.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdmissionsConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human readable text
    #[serde(default)]
    pub log_json: bool,

    /// Origins allowed to call the API with credentials
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Log the first `X-Forwarded-For` address instead of the peer address.
    /// Enable only behind a proxy that sets the header.
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_json: false,
            cors_origins: default_cors_origins(),
            trust_forwarded_for: false,
        }
    }
}

// ============= Authentication Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Environment variable name containing the JWT secret
    #[serde(default = "default_jwt_secret_env")]
    pub jwt_secret_env: String,

    /// Session token lifetime in seconds
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64,

    /// Password reset link lifetime in seconds
    #[serde(default = "default_reset_token_expiry")]
    pub reset_token_expiry: i64,

    /// Mark the session cookie `Secure` (HTTPS deployments)
    #[serde(default)]
    pub secure_cookies: bool,

    #[serde(default = "default_allowed_campuses")]
    pub allowed_campuses: Vec<String>,
}

fn default_jwt_secret_env() -> String {
    "JWT_SECRET".to_string()
}

fn default_access_token_expiry() -> i64 {
    3600
}

fn default_reset_token_expiry() -> i64 {
    900
}

fn default_allowed_campuses() -> Vec<String> {
    ["Pilani", "Goa", "Hyderabad"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret_env: default_jwt_secret_env(),
            access_token_expiry: default_access_token_expiry(),
            reset_token_expiry: default_reset_token_expiry(),
            secure_cookies: false,
            allowed_campuses: default_allowed_campuses(),
        }
    }
}

impl AuthConfig {
    pub fn is_allowed_campus(&self, campus: &str) -> bool {
        self.allowed_campuses.iter().any(|c| c == campus)
    }
}

// ============= Database Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Local database path, or `:memory:`
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Environment variable for Turso URL (optional cloud config)
    pub turso_url_env: Option<String>,

    /// Environment variable for Turso auth token
    pub turso_token_env: Option<String>,
}

fn default_database_url() -> String {
    "./data/admissions.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            turso_url_env: None,
            turso_token_env: None,
        }
    }
}

// ============= Mail Configuration =============

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailProvider {
    /// Deliver through the SendGrid v3 API
    Sendgrid,
    /// Write messages to the log only
    #[default]
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub provider: MailProvider,

    /// Environment variable name containing the SendGrid API key
    #[serde(default = "default_mail_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_mail_api_base")]
    pub api_base: String,

    #[serde(default = "default_mail_sender")]
    pub sender: String,

    /// Frontend page that accepts `?token=`
    #[serde(default = "default_reset_url")]
    pub reset_url: String,
}

fn default_mail_api_key_env() -> String {
    "SENDGRID_API_KEY".to_string()
}

fn default_mail_api_base() -> String {
    "https://api.sendgrid.com".to_string()
}

fn default_mail_sender() -> String {
    "admissions@localhost".to_string()
}

fn default_reset_url() -> String {
    "http://localhost:3000/reset-password".to_string()
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            provider: MailProvider::default(),
            api_key_env: default_mail_api_key_env(),
            api_base: default_mail_api_base(),
            sender: default_mail_sender(),
            reset_url: default_reset_url(),
        }
    }
}

// ============= Upload Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Largest accepted request body in bytes
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
}

fn default_max_file_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Configuration warnings that don't prevent operation but may indicate issues
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub kind: ConfigWarningKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarningKind {
    InsecureCookies,
    MailNotDelivered,
    LocalDatabase,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("Watch error: {0}")]
    WatchError(#[from] notify::Error),
}

impl AdmissionsConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: AdmissionsConfig = toml::from_str(&content)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for internal consistency and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_env_var(&self.auth.jwt_secret_env)?;

        if let Some(ref env) = self.database.turso_url_env {
            self.validate_env_var(env)?;
        }
        if let Some(ref env) = self.database.turso_token_env {
            self.validate_env_var(env)?;
        }
        if self.mail.provider == MailProvider::Sendgrid {
            self.validate_env_var(&self.mail.api_key_env)?;
        }

        if self.auth.access_token_expiry <= 0 || self.auth.reset_token_expiry <= 0 {
            return Err(ConfigError::ValidationError(
                "Token lifetimes must be positive".to_string(),
            ));
        }

        if self.auth.allowed_campuses.is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.allowed_campuses must list at least one campus".to_string(),
            ));
        }

        if self.upload.max_file_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "upload.max_file_bytes must be greater than zero".to_string(),
            ));
        }

        if !self.mail.reset_url.starts_with("http://") && !self.mail.reset_url.starts_with("https://")
        {
            return Err(ConfigError::ValidationError(format!(
                "mail.reset_url must be an http(s) URL, got '{}'",
                self.mail.reset_url
            )));
        }

        Ok(())
    }

    /// Validate and collect non-fatal warnings
    pub fn validate_with_warnings(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        self.validate()?;

        let mut warnings = Vec::new();

        if !self.auth.secure_cookies {
            warnings.push(ConfigWarning {
                kind: ConfigWarningKind::InsecureCookies,
                message: "auth.secure_cookies is off; session cookies are sent over plain HTTP"
                    .to_string(),
            });
        }

        if self.mail.provider == MailProvider::Log {
            warnings.push(ConfigWarning {
                kind: ConfigWarningKind::MailNotDelivered,
                message: "mail.provider is 'log'; password reset emails are only logged"
                    .to_string(),
            });
        }

        if self.database.turso_url_env.is_none() && self.database.url == ":memory:" {
            warnings.push(ConfigWarning {
                kind: ConfigWarningKind::LocalDatabase,
                message: "database.url is ':memory:'; data is lost on restart".to_string(),
            });
        }

        Ok(warnings)
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok()
    }

    /// Get the JWT secret from the environment
    pub fn jwt_secret(&self) -> Result<String, ConfigError> {
        self.resolve_env(&self.auth.jwt_secret_env)
            .ok_or_else(|| ConfigError::MissingEnvVar(self.auth.jwt_secret_env.clone()))
    }

    /// Get the SendGrid API key from the environment
    pub fn mail_api_key(&self) -> Result<String, ConfigError> {
        self.resolve_env(&self.mail.api_key_env)
            .ok_or_else(|| ConfigError::MissingEnvVar(self.mail.api_key_env.clone()))
    }

    /// Turso URL and token, when both env vars are configured and set
    pub fn turso_credentials(&self) -> Option<(String, String)> {
        let url = self.resolve_env(self.database.turso_url_env.as_deref()?)?;
        let token = self.resolve_env(self.database.turso_token_env.as_deref()?)?;
        Some((url, token))
    }
}

// ============= Hot Reloading Configuration Manager =============

/// The live configuration and the file it is reloaded from.
struct ConfigSource {
    current: ArcSwap<AdmissionsConfig>,
    path: PathBuf,
}

impl ConfigSource {
    /// Swaps in the file's contents; on failure the current config stays.
    fn reload(&self) -> Result<(), ConfigError> {
        let config = AdmissionsConfig::load(&self.path)?;
        self.current.store(Arc::new(config));
        info!(path = %self.path.display(), "Configuration reloaded");
        Ok(())
    }
}

/// Shared handle to the current configuration.
///
/// Handlers read it per request, so edits to `admissions.toml` reach the
/// campus list, the cookie `Secure` flag, the forwarded-for trust and the
/// reset link URL without a restart. Everything built at startup (listener,
/// CORS, body limit, database, token lifetimes, mailer) needs one.
#[derive(Clone)]
pub struct AdmissionsConfigManager {
    source: Arc<ConfigSource>,
    watcher: Arc<Mutex<Option<RecommendedWatcher>>>,
}

impl AdmissionsConfigManager {
    /// Loads `path`, resolved against the working directory so the watcher
    /// keeps pointing at the same file.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(ConfigError::ReadError)?
                .join(path)
        };

        let config = AdmissionsConfig::load(&path)?;
        Ok(Self::with_source(config, path))
    }

    /// Wraps an already built config; nothing is watched or reloaded.
    pub fn from_config(config: AdmissionsConfig) -> Self {
        Self::with_source(config, PathBuf::new())
    }

    fn with_source(config: AdmissionsConfig, path: PathBuf) -> Self {
        Self {
            source: Arc::new(ConfigSource {
                current: ArcSwap::from_pointee(config),
                path,
            }),
            watcher: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> Arc<AdmissionsConfig> {
        self.source.current.load_full()
    }

    pub fn path(&self) -> &Path {
        &self.source.path
    }

    /// Re-reads the file now.
    pub fn reload(&self) -> Result<(), ConfigError> {
        self.source.reload()
    }

    /// Reloads whenever the config file changes, until the manager and all
    /// of its clones are dropped.
    pub fn start_watching(&self) -> Result<(), ConfigError> {
        let Some(dir) = self.source.path.parent() else {
            return Err(ConfigError::ValidationError(format!(
                "Cannot watch {}",
                self.source.path.display()
            )));
        };

        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let target = self.source.path.clone();

        // Editors often replace the file, so watch its directory.
        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) if event.paths.iter().any(|p| p == &target) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        let _ = tx.send(());
                    }
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "Config watcher error"),
            }
        })?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        *self.watcher.lock() = Some(watcher);

        let source = Arc::downgrade(&self.source);
        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                // let the write settle, then fold any burst into one reload
                tokio::time::sleep(RELOAD_DEBOUNCE).await;
                while rx.try_recv().is_ok() {}

                let Some(source) = source.upgrade() else {
                    break;
                };
                if let Err(e) = source.reload() {
                    warn!(error = %e, "Config reload failed, keeping previous settings");
                }
            }
        });

        info!(path = %self.source.path.display(), "Watching configuration file");
        Ok(())
    }
}

const RELOAD_DEBOUNCE: Duration = Duration::from_millis(300);
