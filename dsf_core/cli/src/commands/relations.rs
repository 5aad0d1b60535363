use crate::commands::project::{runtime, GlobalOpts, Project};
use clap::Args;
use common::error::DsfError;
use common::types::relation::{Relation, ResourceKind};
use common::types::schema::StreamSchema;
use executor::Executor;
use log::info;

#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Stream to describe
    pub name: String,
}

#[derive(Debug, Args)]
pub struct RenameArgs {
    /// Current name of the stream and pipeline
    pub from: String,
    /// New name
    pub to: String,
}

/// Names of every stream, marking the ones this project defines.
pub async fn list(project: &Project) -> Result<Vec<String>, DsfError> {
    let relations = project
        .executor
        .list_relations()
        .await
        .map_err(DsfError::run)?;
    Ok(relations
        .iter()
        .map(|r| {
            let owned = project
                .dag
                .graph
                .node_weights()
                .any(|n| n.resolved_name == r.name());
            if owned {
                format!("{} *", r.name())
            } else {
                r.name().to_string()
            }
        })
        .collect())
}

pub async fn describe(executor: &Executor, name: &str) -> Result<String, DsfError> {
    let fields = executor
        .columns_in_relation(&Relation::new(name, ResourceKind::Table))
        .await
        .map_err(DsfError::run)?;
    if fields.is_empty() {
        return Err(DsfError::run_msg(format!("stream `{name}` does not exist")));
    }
    Ok(StreamSchema::new(fields).pretty(0, Some(name)))
}

pub fn handle_ls(opts: &GlobalOpts) -> Result<(), DsfError> {
    let project = Project::load(opts)?;
    for line in runtime()?.block_on(list(&project))? {
        info!("{line}");
    }
    Ok(())
}

pub fn handle_describe(args: &DescribeArgs, opts: &GlobalOpts) -> Result<(), DsfError> {
    let project = Project::load(opts)?;
    let rendered = runtime()?.block_on(describe(&project.executor, &args.name))?;
    info!("\n{rendered}");
    Ok(())
}

pub fn handle_rename(args: &RenameArgs, opts: &GlobalOpts) -> Result<(), DsfError> {
    let project = Project::load(opts)?;
    runtime()?
        .block_on(project.executor.rename_relation(
            &Relation::new(args.from.as_str(), ResourceKind::Table),
            &Relation::new(args.to.as_str(), ResourceKind::Table),
        ))
        .map_err(DsfError::run)?;
    info!("Renamed `{}` to `{}`", args.from, args.to);
    Ok(())
}
