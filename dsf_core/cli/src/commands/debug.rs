use crate::commands::project::{runtime, GlobalOpts, Project};
use common::error::DsfError;
use log::info;
use shared_clients::StreamingApi;

/// Check the project loads and the target answers.
pub fn handle_debug(opts: &GlobalOpts) -> Result<(), DsfError> {
    let project = Project::load(opts)?;
    let config = &project.config;
    info!("project: {} ({})", config.project.name, config.root.display());
    info!(
        "target: {} -> {} (profile '{}')",
        config.target_name,
        config.target.base_url(),
        config.target.profile_name
    );
    if let Some(namespace) = config.namespace() {
        info!("namespace: {namespace}");
    }
    info!("{} nodes in the project graph", project.dag.graph.node_count());

    runtime()?
        .block_on(project.executor.api().test_connection())
        .map_err(DsfError::init)?;
    info!("Connection test: OK");
    Ok(())
}
