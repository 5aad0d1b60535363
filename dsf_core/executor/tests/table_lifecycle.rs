use common::types::field_type::FieldType;
use common::types::model::{ColumnConstraint, FieldHint, ModelDefinition};
use common::types::schema::{SchemaField, StreamSchema};
use executor::{ExecutionSettings, Executor, ExecutorError, Materialization, Outcome, TableModel};
use planner::{PipelineStatus, PlanStep};
use shared_clients::StreamingApi;
use std::collections::BTreeMap;
use std::sync::Arc;
use test_utils::FakeStreamingApi;

const MUTATIONS: &[&str] = &[
    "create_stream",
    "create_pipeline",
    "activate_pipeline",
    "deactivate_pipeline",
    "delete_pipeline",
    "delete_stream",
];

fn events_schema() -> StreamSchema {
    StreamSchema::new(vec![
        SchemaField::physical("id", FieldType::PrimaryKey(Box::new(FieldType::BigInt))),
        SchemaField::physical("payload", FieldType::String),
        SchemaField::physical("ts", FieldType::TimestampLocal(3)),
    ])
}

fn setup() -> (Arc<FakeStreamingApi>, Executor) {
    let api = Arc::new(
        FakeStreamingApi::new().with_output_schema("http_events", events_schema()),
    );
    let executor = Executor::new(api.clone(), ExecutionSettings::default());
    (api, executor)
}

fn http_events(sql: &str, full_refresh: bool) -> Materialization {
    Materialization::Table(TableModel {
        name: "http_events".to_string(),
        definition: ModelDefinition::new(sql).with_primary_key(["id"]),
        column_types: BTreeMap::new(),
        full_refresh,
    })
}

fn rebuild_calls() -> Vec<String> {
    [
        "deactivate_pipeline",
        "delete_pipeline",
        "delete_stream",
        "create_stream",
        "create_pipeline",
        "activate_pipeline",
    ]
    .iter()
    .map(|op| format!("{op}:http_events"))
    .collect()
}

#[tokio::test]
async fn http_events_four_runs() {
    let (api, executor) = setup();

    // first run: nothing deployed
    let result = executor
        .materialize(&http_events("SELECT * FROM raw_events", false))
        .await
        .unwrap();
    assert_eq!(result.outcome, Outcome::Created);
    assert_eq!(result.relations[0].name(), "http_events");
    assert_eq!(
        api.calls_of(MUTATIONS),
        vec![
            "create_stream:http_events",
            "create_pipeline:http_events",
            "activate_pipeline:http_events"
        ]
    );
    let stream = api.stream("http_events").unwrap();
    assert_eq!(stream.schema.constraints.primary_key, vec!["id"]);
    let pipeline = api.pipeline("http_events").unwrap();
    assert_eq!(pipeline.sql, "INSERT INTO http_events SELECT * FROM raw_events");
    assert!(pipeline.is_running());

    // second run: same SQL, different layout
    api.clear_calls();
    let result = executor
        .materialize(&http_events("SELECT *\n    FROM raw_events\n", false))
        .await
        .unwrap();
    assert_eq!(result.outcome, Outcome::Unchanged);
    assert!(api.calls_of(MUTATIONS).is_empty());

    // third run: edited SQL body
    api.clear_calls();
    let result = executor
        .materialize(&http_events("SELECT * FROM raw_events WHERE id > 0", false))
        .await
        .unwrap();
    assert_eq!(result.outcome, Outcome::Rebuilt);
    assert_eq!(api.calls_of(MUTATIONS), rebuild_calls());

    // fourth run: unchanged SQL, forced refresh
    api.clear_calls();
    let result = executor
        .materialize(&http_events("SELECT * FROM raw_events WHERE id > 0", true))
        .await
        .unwrap();
    assert_eq!(result.outcome, Outcome::Rebuilt);
    assert_eq!(api.calls_of(MUTATIONS), rebuild_calls());
}

#[tokio::test]
async fn remote_state_reflects_deployed_definition() {
    let (_api, executor) = setup();
    let definition = ModelDefinition::new("SELECT * FROM raw_events")
        .with_primary_key(["id"])
        .with_watermark("ts AS ts - INTERVAL '5' SECOND")
        .with_hint(
            "payload",
            FieldHint {
                watermarks: vec![],
                constraints: vec![ColumnConstraint::NotNull],
            },
        );
    let model = Materialization::Table(TableModel {
        name: "http_events".to_string(),
        definition: definition.clone(),
        column_types: BTreeMap::new(),
        full_refresh: false,
    });
    executor.materialize(&model).await.unwrap();

    let state = executor.remote_state("http_events").await.unwrap();
    assert!(state.exists);
    assert_eq!(state.prior_sql_text.as_deref(), Some("SELECT * FROM raw_events"));
    assert_eq!(state.prior_primary_key, vec!["id"]);
    assert_eq!(state.prior_watermark, definition.watermark);
    assert_eq!(state.prior_schema_hints, definition.output_stream_schema_hints);
    assert_eq!(state.pipeline_status, PipelineStatus::Running);

    let second = executor.materialize(&model).await.unwrap();
    assert_eq!(second.outcome, Outcome::Unchanged);
}

fn watermarked(watermark: &str) -> Materialization {
    Materialization::Table(TableModel {
        name: "http_events".to_string(),
        definition: ModelDefinition::new("SELECT * FROM raw_events")
            .with_primary_key(["id"])
            .with_watermark(watermark),
        column_types: BTreeMap::new(),
        full_refresh: false,
    })
}

#[tokio::test]
async fn multi_line_watermark_is_stable_across_runs() {
    for watermark in [
        "ts AS ts\n  - INTERVAL '5' SECOND",
        "ts\tAS ts - INTERVAL '5' SECOND\n",
        "ts\nAS\n  ts - INTERVAL '5' SECOND",
    ] {
        let (api, executor) = setup();
        let first = executor.materialize(&watermarked(watermark)).await.unwrap();
        assert_eq!(first.outcome, Outcome::Created);

        api.clear_calls();
        let second = executor.materialize(&watermarked(watermark)).await.unwrap();
        assert_eq!(second.outcome, Outcome::Unchanged, "{watermark:?}");
        assert!(api.calls_of(MUTATIONS).is_empty());
    }
}

#[tokio::test]
async fn watermark_layout_change_is_not_a_rebuild() {
    let (api, executor) = setup();
    executor
        .materialize(&watermarked("ts AS ts - INTERVAL '5' SECOND"))
        .await
        .unwrap();

    api.clear_calls();
    let relaid = executor
        .materialize(&watermarked("ts  AS  ts\n    - INTERVAL '5' SECOND\n"))
        .await
        .unwrap();
    assert_eq!(relaid.outcome, Outcome::Unchanged);
    assert!(api.calls_of(MUTATIONS).is_empty());

    let moved = executor
        .materialize(&watermarked("ts AS ts - INTERVAL '10' SECOND"))
        .await
        .unwrap();
    assert_eq!(moved.outcome, Outcome::Rebuilt);
}

#[tokio::test]
async fn primary_key_order_change_rebuilds() {
    let (api, executor) = setup();
    let with_key = |key: &[&str]| {
        Materialization::Table(TableModel {
            name: "http_events".to_string(),
            definition: ModelDefinition::new("SELECT * FROM raw_events")
                .with_primary_key(key.iter().copied()),
            column_types: BTreeMap::new(),
            full_refresh: false,
        })
    };
    executor.materialize(&with_key(&["id", "ts"])).await.unwrap();
    let result = executor.materialize(&with_key(&["ts", "id"])).await.unwrap();
    assert_eq!(result.outcome, Outcome::Rebuilt);
    assert_eq!(
        api.stream("http_events").unwrap().schema.constraints.primary_key,
        vec!["ts", "id"]
    );
}

#[tokio::test]
async fn empty_output_schema_fails_before_creating_anything() {
    let api = Arc::new(FakeStreamingApi::new().with_output_schema("empty", StreamSchema::default()));
    let executor = Executor::new(api.clone(), ExecutionSettings::default());
    let model = Materialization::Table(TableModel {
        name: "empty".to_string(),
        definition: ModelDefinition::new("SELECT 1"),
        column_types: BTreeMap::new(),
        full_refresh: false,
    });

    let err = executor.materialize(&model).await.unwrap_err();
    assert!(matches!(err, ExecutorError::FailedToExecute { .. }));
    assert!(api.stream_names().is_empty());
    assert!(api.pipeline_names().is_empty());
}

#[tokio::test]
async fn failed_step_leaves_earlier_steps_in_place() {
    let (api, executor) = setup();
    api.fail_on("create_pipeline", "http_events");

    let err = executor
        .materialize(&http_events("SELECT * FROM raw_events", false))
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutorError::UnexpectedError { .. }));
    assert!(api.stream("http_events").is_some());
    assert!(api.pipeline("http_events").is_none());

    // the half-built stream is seen on the next attempt and rebuilt
    let state = executor.remote_state("http_events").await.unwrap();
    assert!(state.exists);
    assert!(state.prior_sql_text.is_none());
}

#[tokio::test]
async fn dropping_a_stream_drops_its_readers_first() {
    let (api, executor) = setup();
    api.seed_stream("raw", events_schema());
    api.seed_stream("enriched", events_schema());
    api.seed_pipeline("enriched", "INSERT INTO enriched SELECT * FROM raw", true);

    assert!(executor.drop_stream("raw").await.unwrap());
    assert_eq!(
        api.calls_of(MUTATIONS),
        vec![
            "deactivate_pipeline:enriched",
            "delete_pipeline:enriched",
            "delete_stream:raw"
        ]
    );
    assert!(!executor.drop_stream("raw").await.unwrap());
}

#[tokio::test]
async fn plan_steps_map_onto_service_calls() {
    let (api, executor) = setup();
    let definition = ModelDefinition::new("SELECT * FROM raw_events").with_primary_key(["id"]);
    let plan = planner::decide(&definition, &planner::RemoteState::absent(), false);
    assert_eq!(
        plan.steps(),
        &[
            PlanStep::CreateStream,
            PlanStep::CreatePipeline,
            PlanStep::ActivatePipeline
        ]
    );
    executor
        .execute_plan("http_events", &definition, &BTreeMap::new(), &plan)
        .await
        .unwrap();
    assert!(api.get_pipeline("http_events").await.unwrap().is_some());
}
