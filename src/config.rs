#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} is required but not set")]
    Missing(&'static str),
    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub debug: bool,
    pub echo_active: bool,
    pub auth_token: String,
    pub auth_token_prod: Option<String>,
    pub skip_auth: bool,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Each key is tried in
    /// lowercase first, then uppercase.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| {
            lookup(key)
                .or_else(|| lookup(&key.to_ascii_uppercase()))
                .filter(|v| !v.trim().is_empty())
        };
        let flag = |key: &'static str| match get(key) {
            Some(v) => parse_bool(key, &v),
            None => Ok(false),
        };

        let port = match get("port") {
            Some(v) => v
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { key: "port", value: v })?,
            None => 8080,
        };

        Ok(Self {
            debug: flag("debug")?,
            echo_active: flag("echo_active")?,
            auth_token: get("app_auth_token").ok_or(ConfigError::Missing("app_auth_token"))?,
            auth_token_prod: get("app_auth_token_prod"),
            skip_auth: flag("skip_auth")?,
            port,
        })
    }

    pub fn auth_bypassed(&self) -> bool {
        self.debug && self.skip_auth
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { key, value: value.to_string() }),
    }
}
