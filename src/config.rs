use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::billing::FALLBACK_UNIT_PRICE;
use crate::domain::DeviceCategory;

pub const ENV_PREFIX: &str = "HU__";
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub db: DbConfig,
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub devices: DevicesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub admin_token: String,
}

impl AuthConfig {
    /// Unset tokens ship as a `__SET_VIA_ENV...` placeholder
    pub fn is_placeholder(&self) -> bool {
        self.admin_token.trim().is_empty() || self.admin_token.starts_with("__SET_VIA_ENV")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    pub backend: DbBackend,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Price per unit when no contract or tariff applies
    pub fallback_unit_price: f64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            fallback_unit_price: FALLBACK_UNIT_PRICE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicesConfig {
    pub enabled_categories: Vec<DeviceCategory>,
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            enabled_categories: vec![DeviceCategory::Consumer, DeviceCategory::Generator],
        }
    }
}

fn default_request_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_max_connections() -> u32 {
    10
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// TOML file first, then `HU__SECTION__KEY` environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Ok(figment.extract()?)
    }

    /// In-memory configuration used by tests and local runs
    pub fn for_memory(admin_token: &str) -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                request_timeout_secs: default_request_timeout(),
                enable_cors: true,
            },
            auth: AuthConfig {
                admin_token: admin_token.to_string(),
            },
            db: DbConfig {
                backend: DbBackend::Memory,
                url: String::new(),
                max_connections: default_max_connections(),
            },
            billing: BillingConfig::default(),
            devices: DevicesConfig::default(),
        }
    }

    /// Layer overrides on top of an existing config
    pub fn merged(&self, overrides: Figment) -> Result<Self> {
        Ok(Figment::from(Serialized::defaults(self))
            .merge(overrides)
            .extract()?)
    }
}
