//! HTTP listener settings.
//!
//! Crawl tuning lives in [`mapletrack_core::config::CrawlerConfig`]; this
//! struct only covers what the axum server itself needs.

use std::net::{AddrParseError, IpAddr, SocketAddr};

use mapletrack_core::config::{env_parse, env_string};

const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// Upper bound on draining in-flight crawl runs after the listener closes.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            cors_origins: vec![DEFAULT_CORS_ORIGIN.into()],
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Overlay `HOST`, `PORT`, `CORS_ORIGINS`, `REQUEST_TIMEOUT_SECS` and
    /// `SHUTDOWN_TIMEOUT_SECS` on the defaults.
    ///
    /// Bad numbers keep the default and log a warning rather than aborting
    /// startup.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            host: env_string("HOST", d.host),
            port: env_parse("PORT", d.port),
            cors_origins: parse_origins(&env_string("CORS_ORIGINS", DEFAULT_CORS_ORIGIN.into())),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", d.request_timeout_secs),
            shutdown_timeout_secs: env_parse("SHUTDOWN_TIMEOUT_SECS", d.shutdown_timeout_secs),
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, AddrParseError> {
        let ip: IpAddr = self.host.parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
