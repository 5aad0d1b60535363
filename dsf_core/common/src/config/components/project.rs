use serde::Deserialize;

pub const PROJECT_FILE: &str = "dsf_project.yml";

// ---------------- Project Config ----------------
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProjectConfig {
    pub name: String,
    pub profile: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default = "default_profiles_path")]
    pub profiles_path: String,
    /// Overrides `~/.decodable/auth`.
    #[serde(default)]
    pub auth_path: Option<String>,
    #[serde(default = "default_models_dir")]
    pub models_dir: String,
    #[serde(default = "default_seeds_dir")]
    pub seeds_dir: String,
    #[serde(default = "default_tests_dir")]
    pub tests_dir: String,
    #[serde(default)]
    pub full_refresh: bool,
}

fn default_profiles_path() -> String {
    "profiles.yml".to_string()
}

fn default_models_dir() -> String {
    "models".to_string()
}

fn default_seeds_dir() -> String {
    "seeds".to_string()
}

fn default_tests_dir() -> String {
    "tests".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_project_gets_directory_defaults() {
        let cfg: ProjectConfig = serde_yaml::from_str("name: demo\nprofile: dev\n").unwrap();
        assert_eq!(cfg.profiles_path, "profiles.yml");
        assert_eq!(cfg.models_dir, "models");
        assert_eq!(cfg.seeds_dir, "seeds");
        assert_eq!(cfg.tests_dir, "tests");
        assert!(cfg.target.is_none());
        assert!(!cfg.full_refresh);
    }
}
