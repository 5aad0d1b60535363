use crate::config::components::auth::{default_auth_path, profile_from_env};
use crate::config::components::global::{resolve_path, DsfConfig};
use crate::config::components::model::{ModelConfig, ModelsFile};
use crate::config::components::profile::{
    PreviewStart, ProfilesConfig, TargetProfile, DEFAULT_API_URL, DEFAULT_PREVIEW_TIMEOUT_MS,
    DEFAULT_TARGET,
};
use crate::config::components::project::{ProjectConfig, PROJECT_FILE};
use crate::config::components::seed::{SeedConfig, SeedsFile};
use crate::config::error::ConfigError;
use crate::traits::ConfigName;
use crate::utils::paths_with_ext;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_yaml::{self, Error as YamlError, Value};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Collect every named entry from the `.yml` files below `dir`.
pub fn load_config<F, V>(
    dir: &Path,
    entries: impl Fn(F) -> Vec<V>,
    kind: &str,
) -> Result<HashMap<String, V>, ConfigError>
where
    F: DeserializeOwned,
    V: ConfigName,
{
    let mut loaded: HashMap<String, V> = HashMap::new();
    for path in paths_with_ext(dir, "yml") {
        debug!("loading {kind} config from {}", path.display());
        let file = fs::File::open(&path)?;
        let parsed: F = serde_yaml::from_reader(file)?;
        for entry in entries(parsed) {
            let name = entry.name().to_string();
            if loaded.contains_key(&name) {
                return Err(ConfigError::duplicate(kind, name));
            }
            loaded.insert(name, entry);
        }
    }
    Ok(loaded)
}

/// Read `dsf_project.yml` from `project_dir` (or the cwd) and resolve the target.
pub fn read_config(
    project_dir: Option<PathBuf>,
    target_override: Option<&str>,
) -> Result<DsfConfig, ConfigError> {
    let project_file_path = match project_dir {
        Some(dir) => dir.join(PROJECT_FILE),
        None => PathBuf::from(PROJECT_FILE),
    };
    if !project_file_path.exists() {
        return Err(ConfigError::incorrect_path(&project_file_path));
    }

    let project_file = fs::File::open(&project_file_path)?;
    let project: ProjectConfig = serde_yaml::from_reader(project_file)?;

    let root = project_file_path
        .parent()
        .map(Path::to_path_buf)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from("."));

    let profiles_path = resolve_path(&root, Path::new(&project.profiles_path));
    let mut profiles = read_profiles(&profiles_path)?;
    let mut targets = profiles.remove(&project.profile).ok_or_else(|| {
        ConfigError::missing_profile(&project.profile, None, &profiles_path)
    })?;

    let target_name = match target_override.or(project.target.as_deref()) {
        Some(name) => name.to_string(),
        None if targets.len() == 1 => targets.keys().next().cloned().unwrap_or_default(),
        None => DEFAULT_TARGET.to_string(),
    };
    let target = targets.remove(&target_name).ok_or_else(|| {
        ConfigError::missing_profile(&project.profile, Some(&target_name), &profiles_path)
    })?;

    let auth_path = match &project.auth_path {
        Some(p) => resolve_path(&root, Path::new(p)),
        None => default_auth_path().ok_or_else(|| {
            ConfigError::missing_credentials("could not determine the home directory")
        })?,
    };

    let models = load_config::<ModelsFile, ModelConfig>(
        &resolve_path(&root, Path::new(&project.models_dir)),
        |f| f.models,
        "model",
    )?;
    let seeds = load_config::<SeedsFile, SeedConfig>(
        &resolve_path(&root, Path::new(&project.seeds_dir)),
        |f| f.seeds,
        "seed",
    )?;

    debug!(
        "resolved project '{}' with target '{}' ({} model configs, {} seed configs)",
        project.name,
        target_name,
        models.len(),
        seeds.len()
    );

    Ok(DsfConfig {
        project,
        root,
        target_name,
        target,
        auth_path,
        models,
        seeds,
    })
}

pub fn read_profiles(path: &Path) -> Result<ProfilesConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::incorrect_path(path));
    }
    let file = fs::File::open(path)?;
    let raw: HashMap<String, Value> = serde_yaml::from_reader(file)?;

    let mut profiles = ProfilesConfig::new();
    for (profile, value) in raw.into_iter() {
        let targets = parse_target_profile(value)
            .map_err(|err| ConfigError::parse_error(format!("profile {profile}: {err}")))?;
        profiles.insert(profile, targets);
    }
    Ok(profiles)
}

fn parse_target_profile(value: Value) -> Result<HashMap<String, TargetProfile>, YamlError> {
    // A profile is either a single target or a map of named targets.
    if let Ok(single) = serde_yaml::from_value::<RawTarget>(value.clone()) {
        let mut map = HashMap::new();
        map.insert(DEFAULT_TARGET.to_string(), single.into_target());
        return Ok(map);
    }

    let nested: HashMap<String, RawTarget> = serde_yaml::from_value(value)?;
    Ok(nested
        .into_iter()
        .map(|(name, raw)| (name, raw.into_target()))
        .collect())
}

#[derive(Debug, Deserialize)]
struct RawTarget {
    #[serde(alias = "account")]
    account_name: String,
    #[serde(default, alias = "profile")]
    profile_name: Option<String>,
    #[serde(default)]
    materialize_tests: bool,
    #[serde(
        default,
        alias = "request_timeout_ms",
        alias = "timeout_ms",
        alias = "timeout",
        deserialize_with = "deserialize_timeout"
    )]
    preview_timeout_ms: Option<u64>,
    #[serde(default)]
    preview_start: PreviewStart,
    #[serde(default, alias = "name_prefix")]
    local_namespace: Option<String>,
    #[serde(default)]
    api_url: Option<String>,
}

impl RawTarget {
    fn into_target(self) -> TargetProfile {
        let profile_name = self
            .profile_name
            .or_else(profile_from_env)
            .unwrap_or_else(|| DEFAULT_TARGET.to_string());
        TargetProfile {
            account_name: self.account_name,
            profile_name,
            materialize_tests: self.materialize_tests,
            preview_timeout_ms: self.preview_timeout_ms.unwrap_or(DEFAULT_PREVIEW_TIMEOUT_MS),
            preview_start: self.preview_start,
            local_namespace: self.local_namespace.filter(|n| !n.is_empty()),
            api_url: self.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        }
    }
}

fn deserialize_timeout<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct TimeoutVisitor;

    impl<'de> serde::de::Visitor<'de> for TimeoutVisitor {
        type Value = Option<u64>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer timeout in milliseconds")
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            u64::try_from(value)
                .map(Some)
                .map_err(|_| E::custom("timeout cannot be negative"))
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            value
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| E::custom(format!("invalid timeout '{value}'")))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(TimeoutVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn single_target_profile_gets_defaults() {
        let value: Value = serde_yaml::from_str(
            "account_name: acme\nprofile_name: work\npreview_start: latest\n",
        )
        .unwrap();
        let targets = parse_target_profile(value).unwrap();
        let target = &targets[DEFAULT_TARGET];
        assert_eq!(target.account_name, "acme");
        assert_eq!(target.profile_name, "work");
        assert_eq!(target.preview_timeout_ms, DEFAULT_PREVIEW_TIMEOUT_MS);
        assert_eq!(target.preview_start, PreviewStart::Latest);
        assert_eq!(target.base_url(), "https://acme.api.decodable.co/v1alpha2");
    }

    #[test]
    fn nested_targets_accept_aliases_and_string_timeouts() {
        let value: Value = serde_yaml::from_str(
            r#"
dev:
  account: acme
  profile: dev
  request_timeout_ms: "1500"
  name_prefix: jdoe
prod:
  account_name: acme
  profile_name: prod
  timeout: 30000
  materialize_tests: true
"#,
        )
        .unwrap();
        let targets = parse_target_profile(value).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets["dev"].preview_timeout_ms, 1500);
        assert_eq!(targets["dev"].local_namespace.as_deref(), Some("jdoe"));
        assert_eq!(targets["prod"].preview_timeout_ms, 30000);
        assert!(targets["prod"].materialize_tests);
    }

    #[test]
    fn negative_timeout_is_rejected() {
        let value: Value =
            serde_yaml::from_str("account_name: acme\nprofile_name: p\ntimeout: -1\n").unwrap();
        assert!(parse_target_profile(value).is_err());
    }

    #[test]
    fn reads_project_with_models_and_seeds() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "dsf_project.yml",
            "name: demo\nprofile: demo\ntarget: dev\nauth_path: auth\n",
        );
        write(
            root,
            "profiles.yml",
            "demo:\n  dev:\n    account_name: acme\n    profile_name: default\n",
        );
        write(root, "auth", "tokens:\n  default:\n    access_token: t0k3n\n");
        write(
            root,
            "models/schema.yml",
            "models:\n  - name: http_events\n    config:\n      primary_key: id\n",
        );
        write(
            root,
            "seeds/seeds.yml",
            "seeds:\n  - name: countries\n    column_types:\n      code: STRING\n",
        );

        let config = read_config(Some(root.to_path_buf()), None).unwrap();
        assert_eq!(config.target_name, "dev");
        assert_eq!(config.target.account_name, "acme");
        assert_eq!(config.access_token().unwrap(), "t0k3n");
        assert_eq!(config.models["http_events"].primary_key(), vec!["id"]);
        assert_eq!(config.seeds["countries"].column_types["code"], "STRING");
        assert_eq!(config.models_dir(), root.join("models"));
    }

    #[test]
    fn unknown_target_fails_before_anything_else() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "dsf_project.yml", "name: demo\nprofile: demo\n");
        write(
            root,
            "profiles.yml",
            "demo:\n  dev:\n    account_name: acme\n    profile_name: default\n",
        );

        let err = read_config(Some(root.to_path_buf()), Some("prod")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingProfile { .. }));

        let ok = read_config(Some(root.to_path_buf()), None).unwrap();
        assert_eq!(ok.target_name, "dev");
    }

    #[test]
    fn duplicate_model_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.yml", "models:\n  - name: m\n");
        write(dir.path(), "b.yml", "models:\n  - name: m\n");

        let res = load_config::<ModelsFile, ModelConfig>(dir.path(), |f| f.models, "model");
        assert!(matches!(res, Err(ConfigError::Duplicate { .. })));
    }

    #[test]
    fn missing_project_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_config(Some(dir.path().to_path_buf()), None).unwrap_err();
        assert!(matches!(err, ConfigError::IncorrectPath { .. }));
    }
}
