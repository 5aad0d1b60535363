use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const DEFAULT_API_URL: &str = "api.decodable.co/v1alpha2";
pub const DEFAULT_PREVIEW_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_TARGET: &str = "default";

/// Where a preview starts reading its input streams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewStart {
    #[default]
    Earliest,
    Latest,
}

impl fmt::Display for PreviewStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviewStart::Earliest => f.write_str("earliest"),
            PreviewStart::Latest => f.write_str("latest"),
        }
    }
}

/// One resolved target of a profile.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetProfile {
    pub account_name: String,
    pub profile_name: String,
    pub materialize_tests: bool,
    pub preview_timeout_ms: u64,
    pub preview_start: PreviewStart,
    pub local_namespace: Option<String>,
    pub api_url: String,
}

impl TargetProfile {
    pub fn new(account_name: &str, profile_name: &str) -> Self {
        Self {
            account_name: account_name.to_string(),
            profile_name: profile_name.to_string(),
            materialize_tests: false,
            preview_timeout_ms: DEFAULT_PREVIEW_TIMEOUT_MS,
            preview_start: PreviewStart::default(),
            local_namespace: None,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    pub fn base_url(&self) -> String {
        format!("https://{}.{}", self.account_name, self.api_url)
    }
}

/// profile name -> target name -> target.
pub type ProfilesConfig = HashMap<String, HashMap<String, TargetProfile>>;
