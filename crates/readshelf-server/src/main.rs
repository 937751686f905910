use std::env;

use readshelf_server::config::loader::load_config;
use readshelf_server::{ServerBuilder, warmup};

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From READSHELF_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (readshelf.toml)
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (READSHELF_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present, so local development can set API keys
    // without exporting them
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    // Initialize tracing early with the default level
    readshelf_server::observability::init_tracing();

    let (config_path, source) = resolve_config_path();

    let cfg = match load_config(Some(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        path = %config_path,
        source = %source,
        "Configuration loaded"
    );

    readshelf_server::observability::apply_logging_level(&cfg.logging.level);

    if cfg.nyt.api_key.as_deref().unwrap_or("").is_empty() {
        tracing::warn!("NYT API key not set; /api/nyt endpoints will answer 501");
    }
    if cfg.google_books.api_key.as_deref().unwrap_or("").is_empty() {
        tracing::warn!("Google Books API key not set; /api/books endpoints will answer 501");
    }

    let (server, state) = match ServerBuilder::new().with_config(cfg).build().await {
        Ok(built) => built,
        Err(e) => {
            eprintln!("Server initialization failed: {e}");
            std::process::exit(2);
        }
    };

    warmup::spawn_warmup(state);

    if let Err(err) = server.run().await {
        eprintln!("Server error: {err}");
    }
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: READSHELF_CONFIG
/// 3. Default: readshelf.toml
fn resolve_config_path() -> (String, ConfigSource) {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return (path, ConfigSource::CliArgument);
            }
        }
    }

    if let Ok(path) = env::var("READSHELF_CONFIG") {
        if !path.is_empty() {
            return (path, ConfigSource::EnvironmentVariable);
        }
    }

    ("readshelf.toml".to_string(), ConfigSource::Default)
}
