use crate::config::components::auth::read_access_token;
use crate::config::components::model::ModelConfig;
use crate::config::components::profile::TargetProfile;
use crate::config::components::project::ProjectConfig;
use crate::config::components::seed::SeedConfig;
use crate::config::error::ConfigError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Fully resolved project configuration for one target.
#[derive(Debug, Clone)]
pub struct DsfConfig {
    pub project: ProjectConfig,
    /// Directory holding the project file; relative paths resolve against it.
    pub root: PathBuf,
    pub target_name: String,
    pub target: TargetProfile,
    pub auth_path: PathBuf,
    pub models: HashMap<String, ModelConfig>,
    pub seeds: HashMap<String, SeedConfig>,
}

impl DsfConfig {
    pub fn models_dir(&self) -> PathBuf {
        resolve_path(&self.root, Path::new(&self.project.models_dir))
    }

    pub fn seeds_dir(&self) -> PathBuf {
        resolve_path(&self.root, Path::new(&self.project.seeds_dir))
    }

    pub fn tests_dir(&self) -> PathBuf {
        resolve_path(&self.root, Path::new(&self.project.tests_dir))
    }

    pub fn access_token(&self) -> Result<String, ConfigError> {
        read_access_token(&self.auth_path, &self.target.profile_name)
    }

    pub fn namespace(&self) -> Option<&str> {
        self.target.local_namespace.as_deref()
    }
}

pub(crate) fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
