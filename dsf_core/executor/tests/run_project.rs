use common::config::read_config;
use common::types::field_type::FieldType;
use common::types::relation::ResourceKind;
use common::types::schema::{SchemaField, StreamSchema};
use dag::load_project;
use executor::{
    project_relations, run_project, CleanupOptions, ExecutionSettings, Executor, NodeStatus,
    Outcome, RunOptions,
};
use std::sync::Arc;
use test_utils::{FakeStreamingApi, TestProject};

fn orders_schema() -> StreamSchema {
    StreamSchema::new(vec![
        SchemaField::physical("id", FieldType::BigInt),
        SchemaField::physical("code", FieldType::String),
    ])
}

fn project() -> TestProject {
    let project = TestProject::with_target("local_namespace: dev").unwrap();
    project
        .seed("countries", "code,name\nNZ,New Zealand\nNL,Netherlands\n")
        .unwrap();
    project
        .model("orders", "SELECT o.id, c.code FROM raw_orders o JOIN {{ ref('countries') }} c ON o.code = c.code")
        .unwrap();
    project
        .model("orders_daily", "SELECT * FROM {{ ref('orders') }}")
        .unwrap();
    project
        .models_config("models:\n  - name: orders\n    config:\n      primary_key: id\n")
        .unwrap();
    project
        .test("orders_have_ids", "SELECT * FROM {{ ref('orders') }} WHERE id IS NULL")
        .unwrap();
    project
}

#[tokio::test]
async fn full_run_builds_everything_under_the_namespace() {
    let project = project();
    let config = read_config(Some(project.path_buf()), None).unwrap();
    let dag = load_project(&config).unwrap();
    let api = Arc::new(FakeStreamingApi::new().with_default_output_schema(orders_schema()));
    api.seed_stream("raw_orders", orders_schema());
    let executor = Executor::new(api.clone(), ExecutionSettings::default());

    let summary = run_project(&executor, &dag, &config, &RunOptions::new(&ResourceKind::ALL))
        .await
        .unwrap();

    assert!(summary.is_success(), "{summary}");
    assert_eq!(
        summary.status_of("dev__countries"),
        Some(&NodeStatus::Done(Outcome::Seeded { rows: 2 }))
    );
    assert_eq!(
        summary.status_of("dev__orders"),
        Some(&NodeStatus::Done(Outcome::Created))
    );
    assert_eq!(
        summary.status_of("dev__orders_have_ids"),
        Some(&NodeStatus::Done(Outcome::Passed))
    );
    assert_eq!(
        api.pipeline("dev__orders").unwrap().sql,
        "INSERT INTO dev__orders SELECT o.id, c.code FROM raw_orders o JOIN dev__countries c ON o.code = c.code"
    );
    assert_eq!(
        api.stream("dev__orders").unwrap().schema.constraints.primary_key,
        vec!["id"]
    );
    assert_eq!(
        summary.to_string(),
        "Completed 1 seed, 2 models, 1 test. OK=4 FAIL=0 ERROR=0 SKIP=0"
    );

    // a second run leaves the models alone
    let again = run_project(
        &executor,
        &dag,
        &config,
        &RunOptions::new(&[ResourceKind::Table]),
    )
    .await
    .unwrap();
    assert_eq!(
        again.status_of("dev__orders_daily"),
        Some(&NodeStatus::Done(Outcome::Unchanged))
    );

    // and cleanup takes it all down again
    let relations = project_relations(&dag).unwrap();
    executor
        .cleanup(&relations, &CleanupOptions::default())
        .await
        .unwrap();
    assert_eq!(api.stream_names(), vec!["raw_orders"]);
    assert!(api.pipeline_names().is_empty());
}

#[tokio::test]
async fn failure_skips_downstream_nodes_only() {
    let project = project();
    let config = read_config(Some(project.path_buf()), None).unwrap();
    let dag = load_project(&config).unwrap();
    let api = Arc::new(
        FakeStreamingApi::new()
            .with_default_output_schema(orders_schema())
            .with_output_schema("dev__orders", StreamSchema::default()),
    );
    let executor = Executor::new(api.clone(), ExecutionSettings::default());

    let summary = run_project(&executor, &dag, &config, &RunOptions::new(&ResourceKind::ALL))
        .await
        .unwrap();

    assert!(!summary.is_success());
    assert!(matches!(
        summary.status_of("dev__orders"),
        Some(NodeStatus::Error(_))
    ));
    assert_eq!(summary.status_of("dev__orders_daily"), Some(&NodeStatus::Skipped));
    assert_eq!(summary.status_of("dev__orders_have_ids"), Some(&NodeStatus::Skipped));
    assert!(matches!(
        summary.status_of("dev__countries"),
        Some(NodeStatus::Done(Outcome::Seeded { .. }))
    ));
    assert_eq!(summary.errors(), 1);
    assert_eq!(summary.skipped(), 2);
}

#[tokio::test]
async fn select_and_full_refresh_narrow_the_run() {
    let project = project();
    let config = read_config(Some(project.path_buf()), None).unwrap();
    let dag = load_project(&config).unwrap();
    let api = Arc::new(FakeStreamingApi::new().with_default_output_schema(orders_schema()));
    let executor = Executor::new(api.clone(), ExecutionSettings::default());
    let all = RunOptions::new(&ResourceKind::ALL);
    run_project(&executor, &dag, &config, &all).await.unwrap();

    let options = RunOptions::new(&[ResourceKind::Table])
        .with_select(Some(["orders_daily".to_string()].into()))
        .with_full_refresh(true);
    let summary = run_project(&executor, &dag, &config, &options)
        .await
        .unwrap();

    assert_eq!(summary.results.len(), 1);
    assert_eq!(
        summary.status_of("dev__orders_daily"),
        Some(&NodeStatus::Done(Outcome::Rebuilt))
    );
}
