use crate::commands::project::{runtime, GlobalOpts, Project};
use clap::Args;
use common::error::DsfError;
use common::types::relation::ResourceKind;
use executor::{run_project, RunOptions, RunSummary};
use log::{error, info};
use std::collections::BTreeSet;

#[derive(Debug, Args, Default)]
pub struct RunArgs {
    /// Drop and recreate every selected resource
    #[arg(long)]
    pub full_refresh: bool,

    /// Only run the named nodes (repeat or comma separate)
    #[arg(long, short = 's', value_delimiter = ',')]
    pub select: Vec<String>,
}

impl RunArgs {
    fn options(&self, kinds: &[ResourceKind]) -> RunOptions {
        let select = (!self.select.is_empty())
            .then(|| self.select.iter().cloned().collect::<BTreeSet<String>>());
        RunOptions::new(kinds)
            .with_select(select)
            .with_full_refresh(self.full_refresh)
    }
}

pub async fn execute(
    project: &Project,
    kinds: &[ResourceKind],
    args: &RunArgs,
) -> Result<RunSummary, DsfError> {
    let summary = run_project(
        &project.executor,
        &project.dag,
        &project.config,
        &args.options(kinds),
    )
    .await
    .map_err(DsfError::run)?;

    for result in &summary.results {
        info!("{} {}: {:?}", result.relation.kind, result.relation.name(), result.status);
    }
    Ok(summary)
}

/// `run`, `seed`, `test` and `build` differ only in the kinds they cover.
pub fn handle_run(kinds: &[ResourceKind], args: &RunArgs, opts: &GlobalOpts) -> Result<(), DsfError> {
    let project = Project::load(opts)?;
    let summary = runtime()?.block_on(execute(&project, kinds, args))?;
    if summary.is_success() {
        info!("{summary}");
        Ok(())
    } else {
        error!("{summary}");
        Err(DsfError::run_msg(summary.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::read_config;
    use common::types::field_type::FieldType;
    use common::types::schema::{SchemaField, StreamSchema};
    use executor::{ExecutionSettings, Executor, NodeStatus, Outcome};
    use std::sync::Arc;
    use test_utils::{FakeStreamingApi, TestProject};

    fn fixture() -> (TestProject, Arc<FakeStreamingApi>, Project) {
        let dir = TestProject::new().unwrap();
        dir.seed("countries", "code\nNZ\n").unwrap();
        dir.model("orders", "SELECT * FROM {{ ref('countries') }}").unwrap();
        dir.test("orders_exist", "SELECT * FROM {{ ref('orders') }} WHERE code != 'NZ'")
            .unwrap();
        let api = Arc::new(FakeStreamingApi::new().with_default_output_schema(StreamSchema::new(
            vec![SchemaField::physical("code", FieldType::String)],
        )));
        let config = read_config(Some(dir.path_buf()), None).unwrap();
        let executor = Executor::new(api.clone(), ExecutionSettings::default());
        let project = Project::with_executor(config, executor).unwrap();
        (dir, api, project)
    }

    #[tokio::test]
    async fn seed_command_only_loads_seeds() {
        let (_dir, api, project) = fixture();
        let summary = execute(&project, &[ResourceKind::Seed], &RunArgs::default())
            .await
            .unwrap();
        assert_eq!(summary.results.len(), 1);
        assert!(api.pipeline_names().is_empty());
        assert_eq!(api.stream_names(), vec!["countries"]);
    }

    #[tokio::test]
    async fn build_runs_seeds_models_then_tests() {
        let (_dir, _api, project) = fixture();
        let summary = execute(&project, &ResourceKind::ALL, &RunArgs::default())
            .await
            .unwrap();
        let kinds: Vec<ResourceKind> = summary.results.iter().map(|r| r.relation.kind).collect();
        assert_eq!(
            kinds,
            vec![ResourceKind::Seed, ResourceKind::Table, ResourceKind::Test]
        );
        assert_eq!(
            summary.status_of("orders_exist"),
            Some(&NodeStatus::Done(Outcome::Passed))
        );
    }

    #[tokio::test]
    async fn select_limits_the_run() {
        let (_dir, api, project) = fixture();
        let args = RunArgs {
            full_refresh: false,
            select: vec!["orders".to_string()],
        };
        let summary = execute(&project, &[ResourceKind::Table], &args).await.unwrap();
        assert_eq!(summary.results.len(), 1);
        assert_eq!(api.pipeline_names(), vec!["orders"]);
    }
}
