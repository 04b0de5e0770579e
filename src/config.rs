use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub fetch: FetchConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Location of the catalog document: file:// or http(s):// URL, or a path
    pub metadata_uri: String,
    /// Name the catalog is registered under in the query engine
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub style: String,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Try to load from .env file
        let _ = dotenv::dotenv();

        let mut builder = config::Config::builder()
            .set_default("catalog.metadata_uri", "./catalog.json")?
            .set_default("catalog.name", "elasticsearch")?
            .set_default("fetch.timeout_secs", 10)?
            .set_default("fetch.max_concurrency", num_cpus::get() as u64)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("logging.level", "info")?
            .set_default("logging.style", "auto")?;

        if let Ok(uri) = env::var("CATALOG_METADATA_URI") {
            builder = builder.set_override("catalog.metadata_uri", uri)?;
        }

        if let Ok(name) = env::var("CATALOG_NAME") {
            builder = builder.set_override("catalog.name", name)?;
        }

        if let Ok(timeout) = env::var("FETCH_TIMEOUT_SECS") {
            builder = builder.set_override("fetch.timeout_secs", timeout.parse::<u64>().unwrap_or(10))?;
        }

        if let Ok(concurrency) = env::var("FETCH_MAX_CONCURRENCY") {
            let concurrency = concurrency.parse::<u64>().unwrap_or(num_cpus::get() as u64);
            builder = builder.set_override("fetch.max_concurrency", concurrency)?;
        }

        if let Ok(host) = env::var("HOST") {
            builder = builder.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            builder = builder.set_override("server.port", port.parse::<u16>().unwrap_or(3000))?;
        }

        if let Ok(log_level) = env::var("RUST_LOG") {
            builder = builder.set_override("logging.level", log_level)?;
        }

        if let Ok(log_style) = env::var("RUST_LOG_STYLE") {
            builder = builder.set_override("logging.style", log_style)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs)
    }
}
