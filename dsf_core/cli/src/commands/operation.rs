use crate::commands::project::{runtime, split_names, GlobalOpts, Project};
use clap::{Args, Subcommand};
use common::error::DsfError;
use executor::{project_relations, CleanupOptions, OperationSummary};
use log::info;

#[derive(Debug, Args, Default)]
pub struct TargetArgs {
    /// Comma separated names to restrict the operation to
    #[arg(long, value_name = "a,b")]
    pub names: Option<String>,

    /// Log failures and carry on instead of stopping
    #[arg(long)]
    pub skip_errors: bool,
}

#[derive(Debug, Args, Default)]
pub struct CleanupArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[arg(long)]
    pub no_models: bool,

    #[arg(long)]
    pub no_seeds: bool,

    #[arg(long)]
    pub no_tests: bool,
}

#[derive(Debug, Subcommand)]
pub enum OperationSubcommand {
    /// Deactivate running pipelines
    #[command(name = "stop-pipelines")]
    StopPipelines(TargetArgs),
    /// Stop and delete pipelines
    #[command(name = "delete-pipelines")]
    DeletePipelines(TargetArgs),
    /// Delete streams
    #[command(name = "delete-streams")]
    DeleteStreams(TargetArgs),
    /// Remove the project's pipelines, connections and streams
    Cleanup(CleanupArgs),
}

pub async fn execute(
    project: &Project,
    operation: &OperationSubcommand,
) -> Result<OperationSummary, DsfError> {
    let executor = &project.executor;
    let result = match operation {
        OperationSubcommand::StopPipelines(args) => {
            let names = split_names(args.names.as_deref());
            executor
                .stop_pipelines(names.as_deref(), args.skip_errors)
                .await
        }
        OperationSubcommand::DeletePipelines(args) => {
            let names = split_names(args.names.as_deref());
            executor
                .delete_pipelines(names.as_deref(), args.skip_errors)
                .await
        }
        OperationSubcommand::DeleteStreams(args) => {
            let names = split_names(args.names.as_deref());
            executor
                .delete_streams(names.as_deref(), args.skip_errors)
                .await
        }
        OperationSubcommand::Cleanup(args) => {
            let relations = project_relations(&project.dag).map_err(DsfError::compile)?;
            let options = CleanupOptions {
                names: split_names(args.target.names.as_deref()),
                models: !args.no_models,
                seeds: !args.no_seeds,
                tests: !args.no_tests,
                skip_errors: args.target.skip_errors,
            };
            executor.cleanup(&relations, &options).await
        }
    };
    result.map_err(DsfError::run)
}

pub fn handle_operation(operation: &OperationSubcommand, opts: &GlobalOpts) -> Result<(), DsfError> {
    let project = Project::load(opts)?;
    let summary = runtime()?.block_on(execute(&project, operation))?;
    for (name, message) in &summary.failed {
        info!("failed: {name}: {message}");
    }
    info!("{summary}");
    Ok(())
}
