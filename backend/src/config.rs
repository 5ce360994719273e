use std::path::PathBuf;
use shared::validation::ADMIN_ACCESS_CODE;
use shuttle_runtime::SecretStore;
use tracing::warn;

pub const DEFAULT_STORE_PATH: &str = "data/election.json";
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub store_path: PathBuf,
    pub access_code: String,
    pub allowed_origin: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            access_code: ADMIN_ACCESS_CODE.to_string(),
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_secrets(secrets: &SecretStore) -> Self {
        Self::from_lookup(|key| secrets.get(key))
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("STORE_PATH") {
            config.store_path = PathBuf::from(path);
        }
        match lookup("ADMIN_ACCESS_CODE") {
            Some(code) if !code.is_empty() => config.access_code = code,
            _ => warn!("ADMIN_ACCESS_CODE not set - using the demo access code"),
        }
        if let Some(origin) = lookup("ALLOWED_ORIGIN") {
            config.allowed_origin = origin;
        }
        config
    }
}
