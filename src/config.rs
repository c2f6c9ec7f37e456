use std::net::SocketAddr;

use anyhow::Context;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://todos.db";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Sqlite { database_url: String, max_connections: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub backend: Backend,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    /// Reads `DATABASE_URL`, `BIND_ADDR` and `DB_MAX_CONNECTIONS` from the process
    /// environment. Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse().with_context(|| format!("DB_MAX_CONNECTIONS must be a positive integer, got {v:?}"))?,
            None => 5,
        };
        let backend = if database_url == "memory" {
            Backend::Memory
        } else {
            Backend::Sqlite { database_url, max_connections }
        };
        let bind = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind.parse().with_context(|| format!("BIND_ADDR is not a socket address: {bind:?}"))?;
        Ok(Self { backend, bind_addr })
    }

    /// The SQLite URL, falling back to the default file when the memory backend is selected.
    pub fn sqlite_url(&self) -> &str {
        match &self.backend {
            Backend::Sqlite { database_url, .. } => database_url,
            Backend::Memory => DEFAULT_DATABASE_URL,
        }
    }
}
