use crate::types::{DagNode, DagResult};
use crate::ProjectDag;
use common::config::DsfConfig;
use common::types::relation::ResourceKind;
use common::utils::{file_stem, paths_with_ext};
use log::{debug, warn};
use planner::resolve_name;
use std::fs;

/// Build the graph for a project: `models/*.sql`, `seeds/*.csv`, `tests/*.sql`.
pub fn load_project(config: &DsfConfig) -> DagResult<ProjectDag> {
    let namespace = config.namespace();
    let mut dag = ProjectDag::new();

    for path in paths_with_ext(&config.seeds_dir(), "csv") {
        let Some(name) = file_stem(&path) else {
            continue;
        };
        let alias = config
            .seeds
            .get(&name)
            .map(|s| s.alias().to_string())
            .unwrap_or_else(|| name.clone());
        let resolved = resolve_name(&alias, namespace);
        debug!("seed '{name}' -> '{resolved}'");
        dag.add_node(DagNode::seed(&name, &resolved, Some(path)))?;
    }

    for path in paths_with_ext(&config.models_dir(), "sql") {
        let Some(name) = file_stem(&path) else {
            continue;
        };
        let alias = config
            .models
            .get(&name)
            .map(|m| m.alias().to_string())
            .unwrap_or_else(|| name.clone());
        let resolved = resolve_name(&alias, namespace);
        let raw = fs::read_to_string(&path)?;
        debug!("model '{name}' -> '{resolved}'");
        dag.add_node(DagNode::query(&name, &resolved, ResourceKind::Table, &raw).with_path(path))?;
    }

    for path in paths_with_ext(&config.tests_dir(), "sql") {
        let Some(name) = file_stem(&path) else {
            continue;
        };
        let resolved = resolve_name(&name, namespace);
        let raw = fs::read_to_string(&path)?;
        dag.add_node(DagNode::query(&name, &resolved, ResourceKind::Test, &raw).with_path(path))?;
    }

    for name in config.models.keys() {
        if dag.get(name).is_none() {
            warn!("model config '{name}' has no matching .sql file");
        }
    }

    dag.build()?;
    Ok(dag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::read_config;
    use std::path::Path;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn loads_project_tree_with_namespace_and_alias() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "dsf_project.yml", "name: demo\nprofile: demo\nauth_path: auth\n");
        write(
            root,
            "profiles.yml",
            "demo:\n  account_name: acme\n  profile_name: default\n  local_namespace: dev\n",
        );
        write(root, "models/schema.yml", "models:\n  - name: orders\n    alias: orders_v2\n");
        write(root, "models/orders.sql", "SELECT * FROM {{ ref('countries') }}");
        write(root, "seeds/countries.csv", "code,name\nNZ,New Zealand\n");
        write(root, "tests/orders_not_empty.sql", "SELECT * FROM {{ ref('orders') }}");

        let config = read_config(Some(root.to_path_buf()), None).unwrap();
        let dag = load_project(&config).unwrap();

        assert_eq!(dag.get("orders").unwrap().resolved_name, "dev__orders_v2");
        assert_eq!(dag.get("countries").unwrap().kind, ResourceKind::Seed);
        assert_eq!(
            dag.get("orders_not_empty").unwrap().sql(),
            "SELECT * FROM dev__orders_v2"
        );
        assert_eq!(dag.get("orders").unwrap().sql(), "SELECT * FROM dev__countries");
    }
}
