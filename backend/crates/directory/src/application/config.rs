//! Application Configuration
//!
//! Configuration for the Directory application layer.

use std::time::Duration;

use platform::cookie::CookieConfig;
use platform::password::HashCost;

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;

/// How the session cookie encodes the user id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenMode {
    /// The literal user id
    Plain,
    /// `"{id}.{base64url(hmac_sha256(secret, id))}"`
    #[default]
    Signed,
}

impl std::str::FromStr for TokenMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(TokenMode::Plain),
            "signed" => Ok(TokenMode::Signed),
            other => Err(format!("unknown session token mode: {other}")),
        }
    }
}

/// Directory application configuration
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Session cookie name
    pub session_cookie_name: String,
    /// Cookie lifetime set at login
    pub session_ttl: Duration,
    /// Session token encoding
    pub token_mode: TokenMode,
    /// Session secret key for HMAC signing (32 bytes)
    pub session_secret: [u8; 32],
    /// Whether to require Secure cookie
    pub cookie_secure: bool,
    /// SameSite policy
    pub cookie_same_site: SameSite,
    /// Cookie path
    pub cookie_path: String,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
    /// Argon2 cost for newly hashed passwords
    pub hash_cost: HashCost,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: "userid".to_string(),
            session_ttl: Duration::from_secs(300),
            token_mode: TokenMode::Signed,
            session_secret: [0u8; 32],
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            cookie_path: "/".to_string(),
            password_pepper: None,
            hash_cost: HashCost::default(),
        }
    }
}

impl DirectoryConfig {
    /// Create config with a random session secret
    pub fn with_random_secret() -> Self {
        Self {
            session_secret: platform::crypto::random_key(),
            ..Default::default()
        }
    }

    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Self::with_random_secret()
        }
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }

    /// Cookie attributes for the session cookie
    pub fn session_cookie(&self) -> CookieConfig {
        CookieConfig {
            name: self.session_cookie_name.clone(),
            secure: self.cookie_secure,
            http_only: true,
            same_site: self.cookie_same_site,
            path: self.cookie_path.clone(),
            max_age_secs: Some(self.session_ttl.as_secs()),
        }
    }
}
