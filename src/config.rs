//! Process-scoped configuration, read once from the environment at startup.

use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::dispatcher::NotificationMode;

pub const ACCOUNT_SID_VAR: &str = "TWILIO_ACCOUNT_SID";
pub const AUTH_TOKEN_VAR: &str = "TWILIO_AUTH_TOKEN";
pub const SENDER_NUMBER_VAR: &str = "TWILIO_PHONE_NUMBER";
pub const OWNER_NUMBER_VAR: &str = "YOUR_PERSONAL_PHONE_NUMBER";
pub const PORT_VAR: &str = "PORT";
pub const MODE_VAR: &str = "NOTIFICATION_MODE";
pub const API_BASE_URL_VAR: &str = "TWILIO_API_BASE_URL";

pub const REQUIRED_VARS: [&str; 4] = [
    ACCOUNT_SID_VAR,
    AUTH_TOKEN_VAR,
    SENDER_NUMBER_VAR,
    OWNER_NUMBER_VAR,
];

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_API_BASE_URL: &str = "https://api.twilio.com";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("invalid PORT value {0:?}: expected a number between 0 and 65535")]
    InvalidPort(String),
    #[error("invalid NOTIFICATION_MODE value {0:?}: expected \"dual\" or \"single\"")]
    InvalidMode(String),
}

/// Gateway credentials and the two fixed phone numbers.
#[derive(Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub account_id: String,
    pub auth_secret: String,
    pub sender_number: String,
    pub owner_number: String,
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("account_id", &self.account_id)
            .field("auth_secret", &"<redacted>")
            .field("sender_number", &self.sender_number)
            .field("owner_number", &self.owner_number)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub port: u16,
    pub mode: NotificationMode,
    pub api_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// Empty values are treated the same as unset ones. Every missing
    /// required variable is reported, not just the first.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let missing: Vec<&'static str> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|name| read(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let gateway = GatewayConfig {
            account_id: read(ACCOUNT_SID_VAR).unwrap_or_default(),
            auth_secret: read(AUTH_TOKEN_VAR).unwrap_or_default(),
            sender_number: read(SENDER_NUMBER_VAR).unwrap_or_default(),
            owner_number: read(OWNER_NUMBER_VAR).unwrap_or_default(),
        };

        let port = match read(PORT_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        let mode = match read(MODE_VAR) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidMode(raw))?,
            None => NotificationMode::default(),
        };

        let api_base_url = read(API_BASE_URL_VAR)
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        debug!(port, ?mode, %api_base_url, "Configuration loaded");

        Ok(Self {
            gateway,
            port,
            mode,
            api_base_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    const COMPLETE: [(&str, &str); 4] = [
        (ACCOUNT_SID_VAR, "AC123"),
        (AUTH_TOKEN_VAR, "tok-s3cr3t"),
        (SENDER_NUMBER_VAR, "+15550000000"),
        (OWNER_NUMBER_VAR, "+15559999999"),
    ];

    #[test]
    fn loads_required_values_with_defaults() {
        let config = Config::from_lookup(lookup(&COMPLETE)).unwrap();

        assert_eq!(config.gateway.account_id, "AC123");
        assert_eq!(config.gateway.sender_number, "+15550000000");
        assert_eq!(config.gateway.owner_number, "+15559999999");
        assert_eq!(config.port, 3000);
        assert_eq!(config.mode, NotificationMode::Dual);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn reports_every_missing_variable() {
        let err = Config::from_lookup(lookup(&[(ACCOUNT_SID_VAR, "AC123")])).unwrap_err();

        assert_eq!(
            err,
            ConfigError::Missing(vec![AUTH_TOKEN_VAR, SENDER_NUMBER_VAR, OWNER_NUMBER_VAR])
        );
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let mut vars = COMPLETE.to_vec();
        vars[1] = (AUTH_TOKEN_VAR, "");

        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert_eq!(err, ConfigError::Missing(vec![AUTH_TOKEN_VAR]));
    }

    #[test]
    fn reads_optional_overrides() {
        let mut vars = COMPLETE.to_vec();
        vars.push((PORT_VAR, "8080"));
        vars.push((MODE_VAR, "Single"));
        vars.push((API_BASE_URL_VAR, "http://127.0.0.1:9000/"));

        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.mode, NotificationMode::Single);
        assert_eq!(config.api_base_url, "http://127.0.0.1:9000");
    }

    #[test]
    fn rejects_bad_port_and_mode() {
        let mut vars = COMPLETE.to_vec();
        vars.push((PORT_VAR, "eighty"));
        assert_eq!(
            Config::from_lookup(lookup(&vars)).unwrap_err(),
            ConfigError::InvalidPort("eighty".to_string())
        );

        let mut vars = COMPLETE.to_vec();
        vars.push((MODE_VAR, "both"));
        assert_eq!(
            Config::from_lookup(lookup(&vars)).unwrap_err(),
            ConfigError::InvalidMode("both".to_string())
        );
    }

    #[test]
    fn debug_output_hides_auth_secret() {
        let config = Config::from_lookup(lookup(&COMPLETE)).unwrap();
        let printed = format!("{:?}", config.gateway);

        assert!(!printed.contains("tok-s3cr3t"));
        assert!(printed.contains("<redacted>"));
    }
}
