use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const TEST_ACCOUNT: &str = "acme";
pub const TEST_PROFILE: &str = "default";
pub const TEST_TOKEN: &str = "test-token";

/// Throwaway project on disk: project file, profiles, auth tokens and the
/// models/seeds/tests directories. Removed when dropped.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    /// Project `demo` with a single `dev` target.
    pub fn new() -> std::io::Result<Self> {
        Self::with_target("")
    }

    /// Like `new`, with extra YAML lines appended to the `dev` target.
    pub fn with_target(extra_target_yaml: &str) -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let project = Self { dir };
        project.write(
            "dsf_project.yml",
            "name: demo\nprofile: demo\ntarget: dev\nauth_path: auth\n",
        )?;
        let mut target = format!(
            "demo:\n  dev:\n    account_name: {TEST_ACCOUNT}\n    profile_name: {TEST_PROFILE}\n"
        );
        for line in extra_target_yaml.lines().filter(|l| !l.trim().is_empty()) {
            target.push_str(&format!("    {}\n", line.trim()));
        }
        project.write("profiles.yml", &target)?;
        project.write(
            "auth",
            &format!("tokens:\n  {TEST_PROFILE}:\n    access_token: {TEST_TOKEN}\n"),
        )?;
        for sub in ["models", "seeds", "tests"] {
            fs::create_dir_all(project.path().join(sub))?;
        }
        Ok(project)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn path_buf(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Write `contents` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn model(&self, name: &str, sql: &str) -> std::io::Result<PathBuf> {
        self.write(&format!("models/{name}.sql"), sql)
    }

    pub fn models_config(&self, yaml: &str) -> std::io::Result<PathBuf> {
        self.write("models/schema.yml", yaml)
    }

    pub fn seed(&self, name: &str, csv: &str) -> std::io::Result<PathBuf> {
        self.write(&format!("seeds/{name}.csv"), csv)
    }

    pub fn seeds_config(&self, yaml: &str) -> std::io::Result<PathBuf> {
        self.write("seeds/seeds.yml", yaml)
    }

    pub fn test(&self, name: &str, sql: &str) -> std::io::Result<PathBuf> {
        self.write(&format!("tests/{name}.sql"), sql)
    }
}
