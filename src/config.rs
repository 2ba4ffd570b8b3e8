use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use twelf::{Layer, config};

const DEFAULT_CONFIG_FILE: &str = "bookgate.yaml";
const DEFAULT_PAYSTACK_BASE_URL: &str = "https://api.paystack.co";
const DEFAULT_DB_CONNECTION_STRING: &str = "sqlite://bookgate.sqlite?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_GATEWAY_TIMEOUT_MS: u64 = 10_000;
/// Pages 1..=3 are readable without payment unless configured otherwise.
const DEFAULT_FREE_PAGE_LIMIT: u64 = 3;

pub const ENV_PREFIX: &str = "BOOKGATE_";

#[config]
#[derive(Debug)]
pub struct Config {
    #[serde(default)]
    pub paystack_secret_key: String,
    #[serde(default = "default_paystack_base_url")]
    pub paystack_base_url: String,
    #[serde(default = "default_gateway_timeout_ms")]
    pub gateway_timeout_ms: u64,
    #[serde(default = "default_free_page_limit")]
    pub free_page_limit: u64,
    #[serde(default = "default_db_connection_string")]
    pub db_connection_string: String,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_paystack_base_url() -> String {
    DEFAULT_PAYSTACK_BASE_URL.into()
}

fn default_gateway_timeout_ms() -> u64 {
    DEFAULT_GATEWAY_TIMEOUT_MS
}

fn default_free_page_limit() -> u64 {
    DEFAULT_FREE_PAGE_LIMIT
}

fn default_db_connection_string() -> String {
    DEFAULT_DB_CONNECTION_STRING.into()
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.into()
}

impl Config {
    /// Optional YAML file first, then `BOOKGATE_*` environment variables on top.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(format!("{ENV_PREFIX}CONFIG"))
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut layers = Vec::new();
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading config file");
            layers.push(Layer::Yaml(path));
        }
        layers.push(Layer::Env(Some(ENV_PREFIX.to_string())));

        Config::with_layers(&layers).with_context(|| "Failed to load configuration")
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.paystack_secret_key.is_empty() {
            return Err(format!("{ENV_PREFIX}PAYSTACK_SECRET_KEY is missing"));
        }
        if self.paystack_base_url.is_empty() {
            return Err(format!("{ENV_PREFIX}PAYSTACK_BASE_URL is empty"));
        }
        if self.gateway_timeout_ms == 0 {
            return Err(format!("{ENV_PREFIX}GATEWAY_TIMEOUT_MS must be greater than 0"));
        }
        if self.free_page_limit == 0 || u32::try_from(self.free_page_limit).is_err() {
            return Err(format!(
                "{ENV_PREFIX}FREE_PAGE_LIMIT must be between 1 and {}",
                u32::MAX
            ));
        }
        Ok(())
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_millis(self.gateway_timeout_ms)
    }

    /// Only meaningful after `validate` has accepted the config.
    pub fn free_page_limit(&self) -> u32 {
        u32::try_from(self.free_page_limit).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            paystack_secret_key: "sk_test_123".into(),
            paystack_base_url: default_paystack_base_url(),
            gateway_timeout_ms: default_gateway_timeout_ms(),
            free_page_limit: default_free_page_limit(),
            db_connection_string: default_db_connection_string(),
            bind_addr: default_bind_addr(),
        }
    }

    #[test]
    fn defaults_are_valid() {
        let c = config();
        assert!(c.validate().is_ok());
        assert_eq!(c.free_page_limit(), 3);
        assert_eq!(c.gateway_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn missing_secret_is_rejected() {
        let c = Config {
            paystack_secret_key: String::new(),
            ..config()
        };
        assert!(c.validate().unwrap_err().contains("PAYSTACK_SECRET_KEY"));
    }

    #[test]
    fn zero_free_page_limit_is_rejected() {
        let c = Config {
            free_page_limit: 0,
            ..config()
        };
        assert!(c.validate().unwrap_err().contains("FREE_PAGE_LIMIT"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let c = Config {
            gateway_timeout_ms: 0,
            ..config()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn yaml_layer_fills_in_defaults() {
        let path = std::env::temp_dir().join(format!("bookgate-{}.yaml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "paystack_secret_key: sk_test_yaml\nfree_page_limit: 5\n").unwrap();

        let c = Config::with_layers(&[Layer::Yaml(path.clone())]).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(c.paystack_secret_key, "sk_test_yaml");
        assert_eq!(c.free_page_limit(), 5);
        assert_eq!(c.paystack_base_url, DEFAULT_PAYSTACK_BASE_URL);
        assert_eq!(c.gateway_timeout_ms, DEFAULT_GATEWAY_TIMEOUT_MS);
        assert!(c.validate().is_ok());
    }
}
