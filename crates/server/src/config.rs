use std::{collections::HashMap, path::Path, time::Duration};

use anyhow::Context;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use server_api::OipaConfig;
use url::Url;

pub const SETTINGS_FILE: &str = "server.toml";

/// Older variable names still honoured, below their `APP__` counterparts.
const LEGACY_ENV: [(&str, &str); 4] = [
    ("SERVER_BIND", "bind_addr"),
    ("OIPA_URL", "oipa_url"),
    ("OIPA_POST_URL", "oipa_post_url"),
    ("OIPA_DELETE_URL", "oipa_delete_url"),
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub bind_addr: String,
    /// Read host.
    pub oipa_url: String,
    /// Create/update host.
    pub oipa_post_url: String,
    pub oipa_delete_url: String,
    pub request_timeout_seconds: u64,
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:2000".into(),
            oipa_url: "http://localhost:8000".into(),
            oipa_post_url: "https://dev-post.oipa.nl".into(),
            oipa_delete_url: "https://dev.oipa.nl".into(),
            request_timeout_seconds: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl Settings {
    pub fn oipa(&self) -> anyhow::Result<OipaConfig> {
        Ok(OipaConfig::new(
            parse_url("oipa_url", &self.oipa_url)?,
            parse_url("oipa_post_url", &self.oipa_post_url)?,
            parse_url("oipa_delete_url", &self.oipa_delete_url)?,
        ))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from(Path::new(SETTINGS_FILE), std::env::vars().collect())
}

/// Defaults, then `file` when it exists, then `APP__*` variables from `env`.
pub fn load_settings_from(file: &Path, env: HashMap<String, String>) -> anyhow::Result<Settings> {
    let defaults = Settings::default();
    let mut builder = Config::builder()
        .set_default("bind_addr", defaults.bind_addr)?
        .set_default("oipa_url", defaults.oipa_url)?
        .set_default("oipa_post_url", defaults.oipa_post_url)?
        .set_default("oipa_delete_url", defaults.oipa_delete_url)?
        .set_default("request_timeout_seconds", defaults.request_timeout_seconds)?
        .set_default("max_body_bytes", defaults.max_body_bytes as u64)?
        .add_source(File::from(file).format(FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true)
                .source(Some(env.clone())),
        );

    for (legacy, key) in LEGACY_ENV {
        let modern = format!("APP__{}", key.to_ascii_uppercase());
        if env.contains_key(&modern) {
            continue;
        }
        builder = builder.set_override_option(key, env.get(legacy).cloned())?;
    }

    builder
        .build()
        .context("failed to assemble server settings")?
        .try_deserialize()
        .context("invalid server settings")
}

fn parse_url(name: &str, raw: &str) -> anyhow::Result<Url> {
    Url::parse(raw.trim()).with_context(|| format!("{name} is not a valid url: '{raw}'"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
