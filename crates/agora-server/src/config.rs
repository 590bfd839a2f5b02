use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Server settings, read from `AGORA_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub reader_pool_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = get("AGORA_PORT", "3000")
            .parse()
            .context("AGORA_PORT must be a port number")?;
        let reader_pool_size = get(
            "AGORA_READER_POOL",
            &agora_db::DEFAULT_READER_POOL_SIZE.to_string(),
        )
        .parse()
        .context("AGORA_READER_POOL must be a non-negative integer")?;

        Ok(Self {
            db_path: PathBuf::from(get("AGORA_DB_PATH", "agora.db")),
            host: get("AGORA_HOST", "0.0.0.0"),
            port,
            jwt_secret: get("AGORA_JWT_SECRET", "dev-secret-change-me"),
            reader_pool_size,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}
