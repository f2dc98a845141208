//! Panel configuration: one flat JSON record, created with defaults on
//! first run and rewritten in full on every settings change.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Password seeded into a fresh config. Change it in any real deployment.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

fn default_admin_user() -> String {
    "admin".to_string()
}

/// Endpoint paths probed in order when listing keys.
fn default_list_endpoints() -> Vec<String> {
    [
        "/api/keys",
        "/api/key/list",
        "/api/key/all",
        "/api/keys/list",
        "/keys",
        "/api/list",
        "/api/key/listall",
    ]
    .iter()
    .map(|p| (*p).to_string())
    .collect()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Base URL of the remote key service; empty disables remote calls.
    #[serde(default)]
    pub api_base: String,
    #[serde(default = "default_admin_user")]
    pub admin_user: String,
    /// bcrypt hash of the operator password.
    #[serde(default)]
    pub admin_password_hash: String,
    #[serde(default = "default_list_endpoints")]
    pub auto_try_list_endpoints: Vec<String>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            admin_user: default_admin_user(),
            admin_password_hash: String::new(),
            auto_try_list_endpoints: default_list_endpoints(),
        }
    }
}

impl PanelConfig {
    /// Read the config from `path`, creating it with defaults on first run.
    ///
    /// A missing or blank password hash (e.g. a hand-edited file) is
    /// re-seeded with the default credential and persisted immediately.
    pub fn load_or_init(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        } else {
            PanelConfig::default()
        };
        if config.admin_password_hash.is_empty() {
            config.admin_password_hash = hash_password(DEFAULT_ADMIN_PASSWORD)?;
            config.save(path)?;
        }
        Ok(config)
    }

    /// Overwrite the backing file with the current state.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self).context("serializing config")?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))
    }

    /// Check a login attempt against the stored credential.
    pub fn verify_login(&self, username: &str, password: &str) -> bool {
        username == self.admin_user
            && bcrypt::verify(password, &self.admin_password_hash).unwrap_or(false)
    }
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).context("hashing password")
}
