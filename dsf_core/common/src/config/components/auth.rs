use crate::config::error::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const PROFILE_ENV_VAR: &str = "DECODABLE_PROFILE";

#[derive(Debug, Deserialize)]
struct AuthFile {
    #[serde(default)]
    tokens: HashMap<String, AccessToken>,
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
}

/// `~/.decodable/auth`, if a home directory can be found.
pub fn default_auth_path() -> Option<PathBuf> {
    home::home_dir().map(|h| h.join(".decodable").join("auth"))
}

/// Profile name from the environment, used when the target does not set one.
pub fn profile_from_env() -> Option<String> {
    std::env::var(PROFILE_ENV_VAR)
        .ok()
        .filter(|p| !p.trim().is_empty())
}

/// Every access token in the auth file, keyed by profile name.
pub fn load_access_tokens(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::missing_credentials(format!(
            "No decodable profile under path: {}. Execute 'decodable login' first",
            path.display()
        )));
    }
    let contents = fs::read_to_string(path)?;
    let file: AuthFile = serde_yaml::from_str(&contents)?;
    Ok(file
        .tokens
        .into_iter()
        .map(|(profile, token)| (profile, token.access_token))
        .collect())
}

pub fn read_access_token(path: &Path, profile: &str) -> Result<String, ConfigError> {
    let mut tokens = load_access_tokens(path)?;
    tokens.remove(profile).ok_or_else(|| {
        ConfigError::missing_credentials(format!(
            "No access token for profile '{profile}' in {}",
            path.display()
        ))
    })
}
