use anyhow::{anyhow, Result};

pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_LOGIN_URL: &str = "/admin/ring_central/login/";

#[derive(Debug, Clone)]
pub struct RingCentralConfig {
    pub server: String,
    pub client_id: String,
    pub client_secret: String,
    /// Also used as the caller id on outbound calls and texts.
    pub username: String,
    pub extension: String,
    pub password: String,
    /// Make the user press 1 before the call is connected.
    pub play_prompt: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Empty disables the bearer check.
    pub api_key: String,
    /// Where clients are sent when the provider needs a fresh login.
    pub login_url: String,
    pub ring_central: RingCentralConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow!("{} is not set", key))
        };

        let port: u16 = match lookup("DIALER_API_PORT") {
            Some(p) => p
                .parse()
                .map_err(|e| anyhow!("DIALER_API_PORT={}: {}", p, e))?,
            None => DEFAULT_PORT,
        };

        let ring_central = RingCentralConfig {
            server: required("RING_CENTRAL_SERVER")?,
            client_id: required("RING_CENTRAL_CLIENTID")?,
            client_secret: required("RING_CENTRAL_CLIENTSECRET")?,
            username: required("RING_CENTRAL_USERNAME")?,
            extension: lookup("RING_CENTRAL_EXTENSION").unwrap_or_default(),
            password: required("RING_CENTRAL_PASSWORD")?,
            play_prompt: lookup("RING_CENTRAL_PLAY_PROMPT")
                .map(|v| flag(&v))
                .unwrap_or(false),
        };

        Ok(Self {
            port,
            api_key: lookup("DIALER_API_KEY").unwrap_or_default(),
            login_url: lookup("DIALER_LOGIN_URL")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string()),
            ring_central,
        })
    }
}

fn flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "y" | "yes" | "true" | "1"
    )
}
