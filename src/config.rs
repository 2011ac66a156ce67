use std::net::SocketAddr;

use anyhow::{anyhow, Context, Result};

const DEFAULT_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
}

impl Config {
    /// Reads the process environment, loading `.env` first when one exists.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(e).context("Failed to load .env file");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| anyhow!("DATABASE_URL must be set"))?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid DATABASE_MAX_CONNECTIONS {raw:?}"))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let raw_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .trim()
            .parse()
            .with_context(|| format!("Invalid BIND_ADDR {raw_addr:?}"))?;

        Ok(Self {
            database_url,
            max_connections,
            bind_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const URL: (&str, &str) = ("DATABASE_URL", "postgres://localhost/parley");

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[URL]).unwrap();
        assert_eq!(config.database_url, "postgres://localhost/parley");
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.bind_addr, "0.0.0.0:3000".parse().unwrap());
    }

    #[test]
    fn database_url_is_required() {
        assert!(config(&[]).is_err());
        assert!(config(&[("DATABASE_URL", "  ")]).is_err());
        // There is no database-free mode to fall back to.
        assert!(config(&[("STORE_BACKEND", "memory")]).is_err());
    }

    #[test]
    fn overrides() {
        let config = config(&[
            URL,
            ("DATABASE_MAX_CONNECTIONS", " 5 "),
            ("BIND_ADDR", "127.0.0.1:8080"),
        ])
        .unwrap();
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[URL, ("DATABASE_MAX_CONNECTIONS", "lots")]).is_err());
        assert!(config(&[URL, ("BIND_ADDR", "nowhere")]).is_err());
    }
}
