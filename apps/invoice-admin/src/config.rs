//! Layered configuration: defaults, then an optional YAML file, then
//! `INVOICES__*` environment variables (`INVOICES__DATABASE__DSN=...`).

use std::path::Path;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use tenantkit_db::DbConfig;

pub const ENV_PREFIX: &str = "INVOICES__";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub database: DbConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DbConfig {
                schema: Some(invoices::INVOICE_SCHEMA.to_owned()),
                ..DbConfig::default()
            },
        }
    }
}

impl AppConfig {
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// # Errors
    /// Fails when the file is missing or malformed, or the database section is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path
            && !path.is_file()
        {
            anyhow::bail!("config file does not exist: {}", path.display());
        }
        let config: Self = Self::figment(path)
            .extract()
            .context("failed to load configuration")?;
        config
            .database
            .validate()
            .context("invalid database configuration")?;
        Ok(config)
    }
}
