use common::config::{read_config, DsfConfig};
use common::error::DsfError;
use dag::{load_project, ProjectDag};
use executor::Executor;
use std::path::PathBuf;
use tokio::runtime::Runtime;

/// Options every command shares.
#[derive(Debug, Clone, Default)]
pub struct GlobalOpts {
    pub config_path: Option<PathBuf>,
    pub target: Option<String>,
}

impl GlobalOpts {
    pub fn config(&self) -> Result<DsfConfig, DsfError> {
        read_config(self.config_path.clone(), self.target.as_deref()).map_err(DsfError::init)
    }
}

/// A loaded project wired to its target.
pub struct Project {
    pub config: DsfConfig,
    pub dag: ProjectDag,
    pub executor: Executor,
}

impl Project {
    pub fn load(opts: &GlobalOpts) -> Result<Self, DsfError> {
        let config = opts.config()?;
        let executor = Executor::from_config(&config).map_err(DsfError::init)?;
        Self::with_executor(config, executor)
    }

    pub fn with_executor(config: DsfConfig, executor: Executor) -> Result<Self, DsfError> {
        let dag = load_project(&config).map_err(DsfError::compile)?;
        Ok(Self {
            config,
            dag,
            executor,
        })
    }
}

pub fn runtime() -> Result<Runtime, DsfError> {
    Runtime::new().map_err(DsfError::init)
}

/// Split `a,b` style name lists; empty entries are dropped.
pub fn split_names(raw: Option<&str>) -> Option<Vec<String>> {
    raw.map(|names| {
        names
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect()
    })
}
