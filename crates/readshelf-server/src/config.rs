use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Redis configuration
    #[serde(default)]
    pub redis: RedisConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Upstream fetch retry policy
    #[serde(default)]
    pub fetch: FetchConfig,
    /// NYT Books API
    #[serde(default)]
    pub nyt: NytConfig,
    /// Google Books API
    #[serde(default)]
    pub google_books: GoogleBooksConfig,
    /// Open Library API
    #[serde(default)]
    pub open_library: OpenLibraryConfig,
}

// Default derived via field defaults

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Fetch validations
        if self.fetch.retries == 0 {
            return Err("fetch.retries must be > 0".into());
        }
        if self.fetch.timeout_ms == 0 {
            return Err("fetch.timeout_ms must be > 0".into());
        }
        // Stale entries must outlive every fresh horizon
        let max_fresh = [
            self.nyt.ttl_names_secs,
            self.nyt.ttl_overview_secs,
            self.nyt.ttl_list_secs,
            self.google_books.ttl_search_secs,
            self.google_books.ttl_volume_secs,
            self.google_books.ttl_isbn_secs,
            self.open_library.ttl_search_secs,
            self.open_library.ttl_book_secs,
        ]
        .into_iter()
        .max()
        .unwrap_or(0);
        if self.cache.stale_ttl_secs < max_fresh {
            return Err("cache.stale_ttl_secs must be >= every fresh TTL".into());
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    pub fn stale_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.stale_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Redis configuration for horizontal scaling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Enable Redis (gracefully degrades without it)
    /// Default: false (disabled for single-instance deployments)
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_enabled() -> bool {
    false
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Stale shadow-entry TTL in seconds
    #[serde(default = "default_stale_ttl_secs")]
    pub stale_ttl_secs: u64,
}

fn default_stale_ttl_secs() -> u64 {
    24 * 3600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_ttl_secs: default_stale_ttl_secs(),
        }
    }
}

/// Retry policy for upstream fetches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Total HTTP attempts per fetch before giving up
    #[serde(default = "default_fetch_retries")]
    pub retries: u32,

    /// Base backoff delay in milliseconds (doubles per attempt)
    #[serde(default = "default_fetch_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_fetch_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_fetch_retries() -> u32 {
    3
}

fn default_fetch_base_delay_ms() -> u64 {
    400
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            retries: default_fetch_retries(),
            base_delay_ms: default_fetch_base_delay_ms(),
            timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

/// NYT Best Sellers API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NytConfig {
    /// API key; endpoints answer 501 when unset
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_nyt_base_url")]
    pub base_url: String,

    /// Fresh TTL for the list-names catalog in seconds
    #[serde(default = "default_nyt_ttl_names")]
    pub ttl_names_secs: u64,

    /// Fresh TTL for overview payloads in seconds
    #[serde(default = "default_nyt_ttl_overview")]
    pub ttl_overview_secs: u64,

    /// Fresh TTL for single-list payloads in seconds
    #[serde(default = "default_nyt_ttl_list")]
    pub ttl_list_secs: u64,
}

fn default_nyt_base_url() -> String {
    "https://api.nytimes.com/svc/books/v3".to_string()
}

fn default_nyt_ttl_names() -> u64 {
    7200
}

fn default_nyt_ttl_overview() -> u64 {
    900
}

fn default_nyt_ttl_list() -> u64 {
    900
}

impl Default for NytConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_nyt_base_url(),
            ttl_names_secs: default_nyt_ttl_names(),
            ttl_overview_secs: default_nyt_ttl_overview(),
            ttl_list_secs: default_nyt_ttl_list(),
        }
    }
}

impl NytConfig {
    pub fn ttl_names(&self) -> Duration {
        Duration::from_secs(self.ttl_names_secs)
    }
    pub fn ttl_overview(&self) -> Duration {
        Duration::from_secs(self.ttl_overview_secs)
    }
    pub fn ttl_list(&self) -> Duration {
        Duration::from_secs(self.ttl_list_secs)
    }
}

/// Google Books API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleBooksConfig {
    /// API key; endpoints answer 501 when unset
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_gbooks_base_url")]
    pub base_url: String,

    /// Fresh TTL for volume searches in seconds
    #[serde(default = "default_gbooks_ttl_search")]
    pub ttl_search_secs: u64,

    /// Fresh TTL for single-volume payloads in seconds
    #[serde(default = "default_gbooks_ttl_volume")]
    pub ttl_volume_secs: u64,

    /// Fresh TTL for per-ISBN enrichment records in seconds
    #[serde(default = "default_gbooks_ttl_isbn")]
    pub ttl_isbn_secs: u64,
}

fn default_gbooks_base_url() -> String {
    "https://www.googleapis.com/books/v1".to_string()
}

fn default_gbooks_ttl_search() -> u64 {
    600
}

fn default_gbooks_ttl_volume() -> u64 {
    1800
}

fn default_gbooks_ttl_isbn() -> u64 {
    600
}

impl Default for GoogleBooksConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_gbooks_base_url(),
            ttl_search_secs: default_gbooks_ttl_search(),
            ttl_volume_secs: default_gbooks_ttl_volume(),
            ttl_isbn_secs: default_gbooks_ttl_isbn(),
        }
    }
}

impl GoogleBooksConfig {
    pub fn ttl_search(&self) -> Duration {
        Duration::from_secs(self.ttl_search_secs)
    }
    pub fn ttl_volume(&self) -> Duration {
        Duration::from_secs(self.ttl_volume_secs)
    }
    pub fn ttl_isbn(&self) -> Duration {
        Duration::from_secs(self.ttl_isbn_secs)
    }
}

/// Open Library API configuration (no credential required)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenLibraryConfig {
    #[serde(default = "default_ol_base_url")]
    pub base_url: String,

    /// Fresh TTL for searches in seconds
    #[serde(default = "default_ol_ttl_search")]
    pub ttl_search_secs: u64,

    /// Fresh TTL for book records in seconds
    #[serde(default = "default_ol_ttl_book")]
    pub ttl_book_secs: u64,
}

fn default_ol_base_url() -> String {
    "https://openlibrary.org".to_string()
}

fn default_ol_ttl_search() -> u64 {
    600
}

fn default_ol_ttl_book() -> u64 {
    3600
}

impl Default for OpenLibraryConfig {
    fn default() -> Self {
        Self {
            base_url: default_ol_base_url(),
            ttl_search_secs: default_ol_ttl_search(),
            ttl_book_secs: default_ol_ttl_book(),
        }
    }
}

impl OpenLibraryConfig {
    pub fn ttl_search(&self) -> Duration {
        Duration::from_secs(self.ttl_search_secs)
    }
    pub fn ttl_book(&self) -> Duration {
        Duration::from_secs(self.ttl_book_secs)
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if pathbuf.exists() {
                    builder = builder.add_source(File::from(pathbuf));
                }
            }
            None => {
                // Try default root-level file
                let default_path = PathBuf::from("readshelf.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., READSHELF__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("READSHELF")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
