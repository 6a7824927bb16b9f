//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: `WEBCOMMON_`, nested keys joined by `__`,
//!    e.g. `WEBCOMMON_DATABASE__HOST`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/webcommon/{service_name}/config.toml
//! 4. System directory: /etc/webcommon/{service_name}/config.toml
//! 5. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::crud::Dialect;
use crate::error::Result;

const APP_DIR: &str = "webcommon";
const ENV_PREFIX: &str = "WEBCOMMON_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// HTTP listener configuration
    #[serde(default)]
    pub web: WebConfig,

    /// Database configuration (optional)
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Log filter directive (trace, debug, info, warn, error or a full EnvFilter)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Environment (dev, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Forces debug logging
    #[serde(default)]
    pub debug: bool,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Token signing secret
    #[serde(default)]
    pub secret: String,

    /// TLS certificate (PEM); TLS is on when both files are set
    #[serde(default)]
    pub cert_file: String,

    /// TLS private key (PEM)
    #[serde(default)]
    pub key_file: String,

    /// Comma separated request URIs that bypass authentication
    #[serde(default)]
    pub auth_skip: String,

    /// Comma separated CORS origins
    #[serde(default = "default_allow_origins")]
    pub allow_origins: String,
}

impl WebConfig {
    /// `host:port` to bind the listener to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn allow_origin_list(&self) -> Vec<String> {
        split_list(&self.allow_origins)
    }

    pub fn auth_skip_paths(&self) -> Vec<String> {
        split_list(&self.auth_skip)
    }

    /// Whether `uri` is listed in `auth_skip`
    pub fn is_auth_skipped(&self, uri: &str) -> bool {
        self.auth_skip
            .split(',')
            .map(str::trim)
            .any(|skip| !skip.is_empty() && skip == uri)
    }

    pub fn tls_enabled(&self) -> bool {
        !self.cert_file.is_empty() && !self.key_file.is_empty()
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            debug: false,
            host: default_host(),
            port: default_port(),
            secret: String::new(),
            cert_file: String::new(),
            key_file: String::new(),
            auth_skip: String::new(),
            allow_origins: default_allow_origins(),
        }
    }
}

/// Database configuration
///
/// Either give a full `url`, or the parts (`host`, `port`, `name`, `user`,
/// `passwd`) and let [`DatabaseConfig::connection_url`] assemble it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQL dialect; detected from the URL scheme when unset
    #[serde(default)]
    pub dialect: Option<Dialect>,

    /// Database connection URL
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_db_host")]
    pub host: String,

    /// Server port; the dialect default when unset
    #[serde(default)]
    pub port: Option<u16>,

    /// Database name, or the file path for SQLite
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub passwd: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections", alias = "max_conn")]
    pub max_connections: u32,

    /// Minimum idle connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Maximum retry attempts for establishing database connection
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retry attempts in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// Log every generated statement at DEBUG
    #[serde(default)]
    pub log_sql: bool,
}

impl DatabaseConfig {
    /// The configured URL, or one built from the individual parts
    ///
    /// Credentials are inserted as given; use `url` when they contain
    /// characters that need percent-encoding.
    pub fn connection_url(&self) -> String {
        if !self.url.is_empty() {
            return self.url.clone();
        }

        let dialect = self.dialect.unwrap_or_default();
        if dialect == Dialect::Sqlite {
            return if self.name.is_empty() {
                "sqlite::memory:".to_string()
            } else {
                format!("sqlite://{}", self.name)
            };
        }

        let credentials = match (self.user.is_empty(), self.passwd.is_empty()) {
            (true, _) => String::new(),
            (false, true) => format!("{}@", self.user),
            (false, false) => format!("{}:{}@", self.user, self.passwd),
        };
        let port = self.port.or(dialect.default_port());
        let host = match port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        };
        format!("{}://{}{}/{}", dialect.scheme(), credentials, host, self.name)
    }

    /// Configured dialect, else the one implied by the URL, else MySQL
    pub fn dialect(&self) -> Dialect {
        self.dialect
            .or_else(|| Dialect::from_url(&self.url))
            .unwrap_or_default()
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dialect: None,
            url: String::new(),
            host: default_db_host(),
            port: None,
            name: String::new(),
            user: String::new(),
            passwd: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout_secs: default_connection_timeout(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
            log_sql: false,
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_allow_origins() -> String {
    "*".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_db_host() -> String {
    "127.0.0.1".to_string()
}

fn default_max_connections() -> u32 {
    50
}

fn default_min_connections() -> u32 {
    5
}

fn default_connection_timeout() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    2
}

impl Config {
    /// Load configuration from all sources
    ///
    /// The service name is taken from the executable name.
    pub fn load() -> Result<Self> {
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| APP_DIR.to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment =
            Figment::new().merge(Serialized::defaults(Config::with_service_name(service_name)));

        // Lowest priority first so later files override earlier ones
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config = figment.extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file, plus environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Candidate config files, highest priority first
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_DIR);
        let config_file_path = Path::new(service_name).join("config.toml");
        if let Ok(path) = xdg_dirs.place_config_file(&config_file_path) {
            paths.push(path);
        }

        paths.push(
            PathBuf::from("/etc")
                .join(APP_DIR)
                .join(service_name)
                .join("config.toml"),
        );

        paths
    }

    fn with_service_name(service_name: &str) -> Self {
        let mut config = Self::default();
        config.service.name = service_name.to_string();
        config
    }

    /// Effective log filter, `debug` when either debug switch is on
    pub fn log_filter(&self) -> &str {
        if self.service.debug || self.web.debug {
            "debug"
        } else {
            &self.service.log_level
        }
    }

    pub fn database_url(&self) -> Option<String> {
        self.database.as_ref().map(DatabaseConfig::connection_url)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: APP_DIR.to_string(),
                log_level: default_log_level(),
                environment: default_environment(),
                debug: false,
            },
            web: WebConfig::default(),
            database: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.web.port, 8080);
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.log_filter(), "info");
        assert!(config.database.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[service]
name = "devices"
debug = true

[web]
port = 9000
auth_skip = "/login, /health"
allow_origins = "https://a.example,https://b.example"

[database]
dialect = "postgres"
host = "db"
name = "devices"
user = "app"
passwd = "secret"
max_conn = 12
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.service.name, "devices");
        assert_eq!(config.log_filter(), "debug");
        assert_eq!(config.web.bind_address(), "0.0.0.0:9000");
        assert!(config.web.is_auth_skipped("/health"));
        assert!(!config.web.is_auth_skipped("/health/deep"));
        assert_eq!(config.web.allow_origin_list().len(), 2);

        let db = config.database.unwrap();
        assert_eq!(db.max_connections, 12);
        assert_eq!(db.dialect(), Dialect::Postgres);
        assert_eq!(
            db.connection_url(),
            "postgres://app:secret@db:5432/devices"
        );
    }

    #[test]
    fn test_connection_url_variants() {
        let explicit = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            ..DatabaseConfig::default()
        };
        assert_eq!(explicit.connection_url(), "sqlite::memory:");
        assert_eq!(explicit.dialect(), Dialect::Sqlite);

        let mysql = DatabaseConfig {
            name: "app".to_string(),
            user: "root".to_string(),
            port: Some(3307),
            ..DatabaseConfig::default()
        };
        assert_eq!(mysql.connection_url(), "mysql://root@127.0.0.1:3307/app");
        assert_eq!(mysql.dialect(), Dialect::MySql);

        let sqlite = DatabaseConfig {
            dialect: Some(Dialect::Sqlite),
            name: "/var/lib/app.db".to_string(),
            ..DatabaseConfig::default()
        };
        assert_eq!(sqlite.connection_url(), "sqlite:///var/lib/app.db");
    }

    #[test]
    fn test_tls_enabled_needs_both_files() {
        let mut web = WebConfig::default();
        assert!(!web.tls_enabled());
        web.cert_file = "cert.pem".to_string();
        assert!(!web.tls_enabled());
        web.key_file = "key.pem".to_string();
        assert!(web.tls_enabled());
    }
}
