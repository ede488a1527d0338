//! Server Configuration
//!
//! Everything the binary reads from the environment (after `.env` is loaded).

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use axum::http::HeaderValue;
use directory::{DirectoryConfig, TokenMode};
use platform::crypto::from_base64;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:31113";
const DEFAULT_BASE_PATH: &str = "/users";
const DEFAULT_FRONTEND_ORIGINS: &str = "http://localhost:40922,http://127.0.0.1:40922";

/// Administrator created on startup when absent
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct BootstrapConfig {
    pub admin: Option<BootstrapAdmin>,
    pub cities: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Mount point of the directory routes
    pub base_path: String,
    /// In-memory store when unset
    pub database_url: Option<String>,
    pub frontend_origins: Vec<HeaderValue>,
    pub directory: DirectoryConfig,
    pub bootstrap: BootstrapConfig,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = var_or("BIND_ADDR", DEFAULT_BIND_ADDR)
            .parse()
            .context("BIND_ADDR must be a socket address")?;

        let base_path = normalize_base_path(&var_or("API_BASE_PATH", DEFAULT_BASE_PATH));

        let frontend_origins = var_or("FRONTEND_ORIGINS", DEFAULT_FRONTEND_ORIGINS)
            .split(',')
            .filter_map(|origin| origin.trim().parse().ok())
            .collect();

        Ok(Self {
            bind_addr,
            base_path,
            database_url: var_opt("DATABASE_URL"),
            frontend_origins,
            directory: directory_config_from_env()?,
            bootstrap: bootstrap_from_env()?,
        })
    }
}

fn directory_config_from_env() -> anyhow::Result<DirectoryConfig> {
    let mut config = match var_opt("SESSION_SECRET") {
        Some(secret_b64) => DirectoryConfig {
            session_secret: decode_secret(&secret_b64)?,
            cookie_secure: !cfg!(debug_assertions),
            ..DirectoryConfig::default()
        },
        None if cfg!(debug_assertions) => DirectoryConfig::development(),
        None => bail!("SESSION_SECRET must be set in production"),
    };

    if let Some(mode) = var_opt("SESSION_TOKEN_MODE") {
        config.token_mode = mode.parse::<TokenMode>().map_err(|e| anyhow!(e))?;
    }

    if let Some(ttl) = var_opt("SESSION_TTL_SECS") {
        let secs: u64 = ttl
            .parse()
            .context("SESSION_TTL_SECS must be a whole number of seconds")?;
        config.session_ttl = Duration::from_secs(secs);
    }

    config.password_pepper = var_opt("PASSWORD_PEPPER").map(String::into_bytes);

    Ok(config)
}

fn bootstrap_from_env() -> anyhow::Result<BootstrapConfig> {
    let admin = match (
        var_opt("BOOTSTRAP_ADMIN_EMAIL"),
        var_opt("BOOTSTRAP_ADMIN_PASSWORD"),
    ) {
        (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
        (None, None) => None,
        _ => bail!("BOOTSTRAP_ADMIN_EMAIL and BOOTSTRAP_ADMIN_PASSWORD must be set together"),
    };

    let cities = var_opt("SEED_CITIES")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(BootstrapConfig { admin, cities })
}

fn decode_secret(secret_b64: &str) -> anyhow::Result<[u8; 32]> {
    let bytes = from_base64(secret_b64.trim()).context("SESSION_SECRET must be base64")?;

    bytes
        .try_into()
        .map_err(|bytes: Vec<u8>| anyhow!("SESSION_SECRET must decode to 32 bytes, got {}", bytes.len()))
}

/// Leading slash, no trailing slash
fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    format!("/{trimmed}")
}

fn var_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn var_or(key: &str, default: &str) -> String {
    var_opt(key).unwrap_or_else(|| default.to_string())
}
