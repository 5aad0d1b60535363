use crate::error::ExecutorError;
use crate::remote::{fetch_remote_state, pipeline_description, wrap_as_pipeline};
use crate::types::Outcome;
use crate::Executor;
use common::types::field_type::FieldType;
use common::types::model::{ColumnConstraint, ModelDefinition};
use common::types::schema::{Constraints, SchemaField, StreamSchema, Watermark};
use log::{debug, info, warn};
use planner::{decide, PlanReason, PlanStep, ReconciliationPlan, RemoteState};
use shared_clients::decodable::types::{CreatePipeline, CreateStream};
use std::collections::BTreeMap;

fn nullable(field_type: &FieldType) -> &FieldType {
    match field_type {
        FieldType::NotNull(inner) => inner,
        other => other,
    }
}

impl Executor {
    /// Deployed state under `name`, read through the cache.
    pub async fn remote_state(&self, name: &str) -> Result<RemoteState, ExecutorError> {
        if let Some(state) = self.cache.get(name) {
            return Ok(state);
        }
        let state = fetch_remote_state(self.api(), name).await?;
        self.cache.insert(name, state.clone());
        Ok(state)
    }

    pub(crate) async fn reconcile(
        &self,
        name: &str,
        definition: &ModelDefinition,
        column_types: &BTreeMap<String, String>,
        full_refresh: bool,
    ) -> Result<Outcome, ExecutorError> {
        if definition.sql_text.trim().is_empty() {
            return Err(ExecutorError::config(format!(
                "Model '{name}' has no SQL to materialize"
            )));
        }
        let remote = self.remote_state(name).await?;
        let plan = decide(definition, &remote, full_refresh);
        info!("{name}: {plan}");

        let result = self
            .execute_plan(name, definition, column_types, &plan)
            .await;
        self.cache.invalidate(name);
        result?;

        Ok(match plan.reason() {
            PlanReason::Absent => Outcome::Created,
            PlanReason::Unchanged => Outcome::Unchanged,
            PlanReason::FullRefresh | PlanReason::Changed(_) => Outcome::Rebuilt,
        })
    }

    /// Run every step of `plan` in order, stopping at the first failure.
    /// Steps already taken stay in effect.
    pub async fn execute_plan(
        &self,
        name: &str,
        definition: &ModelDefinition,
        column_types: &BTreeMap<String, String>,
        plan: &ReconciliationPlan,
    ) -> Result<(), ExecutorError> {
        for step in plan.steps() {
            debug!("{name}: {step}");
            match step {
                PlanStep::DropPipeline => {
                    self.drop_pipeline(name).await?;
                }
                PlanStep::DropStream => {
                    self.drop_stream(name).await?;
                }
                PlanStep::CreateStream => {
                    self.create_stream(name, definition, column_types).await?
                }
                PlanStep::CreatePipeline => self.create_pipeline(name, definition).await?,
                PlanStep::ActivatePipeline => self.api().activate_pipeline(name).await?,
                PlanStep::Noop => {}
            }
        }
        Ok(())
    }

    async fn create_stream(
        &self,
        name: &str,
        definition: &ModelDefinition,
        column_types: &BTreeMap<String, String>,
    ) -> Result<(), ExecutorError> {
        let sql = wrap_as_pipeline(name, &definition.sql_text);
        let mut schema = self.api().output_schema(&sql).await?;
        if schema.fields.is_empty() {
            return Err(ExecutorError::failed_to_execute(format!(
                "Error creating the {name} stream: empty schema returned for sql:\n{}",
                definition.sql_text
            )));
        }
        schema.strip_primary_key_markers();
        schema.watermarks.clear();
        schema.constraints = Constraints::default();

        warn_on_declared_types(name, &schema, column_types);
        apply_definition(name, &mut schema, definition)?;

        self.api()
            .create_stream(&CreateStream {
                name: name.to_string(),
                description: format!("Stream for the '{name}' model"),
                schema,
            })
            .await?;
        debug!("Stream '{name}' successfully created");
        Ok(())
    }

    async fn create_pipeline(
        &self,
        name: &str,
        definition: &ModelDefinition,
    ) -> Result<(), ExecutorError> {
        self.api()
            .create_pipeline(&CreatePipeline {
                name: name.to_string(),
                sql: wrap_as_pipeline(name, &definition.sql_text),
                description: pipeline_description(name, definition)?,
            })
            .await?;
        debug!("Pipeline '{name}' successfully created");
        Ok(())
    }

    /// Stop and delete the pipeline `name`. Returns false when there was none.
    pub async fn drop_pipeline(&self, name: &str) -> Result<bool, ExecutorError> {
        let Some(pipeline) = self.api().get_pipeline(name).await? else {
            debug!("Pipeline '{name}' does not exist, nothing to drop");
            return Ok(false);
        };
        if pipeline.is_running() {
            self.api().deactivate_pipeline(name).await?;
        }
        self.api().delete_pipeline(name).await?;
        self.cache.invalidate(name);
        debug!("Pipeline '{name}' deleted successfully");
        Ok(true)
    }

    /// Delete the stream `name`, first dropping every pipeline that reads it.
    /// Returns false when there was no stream.
    pub async fn drop_stream(&self, name: &str) -> Result<bool, ExecutorError> {
        if self.api().get_stream(name).await?.is_none() {
            debug!("Stream '{name}' does not exist, nothing to drop");
            return Ok(false);
        }
        for reader in self.readers_of(name).await? {
            warn!("Dropping pipeline '{reader}' because it reads from stream '{name}'");
            self.drop_pipeline(&reader).await?;
        }
        self.api().delete_stream(name).await?;
        self.cache.invalidate(name);
        debug!("Stream '{name}' deleted successfully");
        Ok(true)
    }

    /// Pipelines that take `stream` as an input.
    pub(crate) async fn readers_of(&self, stream: &str) -> Result<Vec<String>, ExecutorError> {
        let mut readers = Vec::new();
        for pipeline in self.api().list_pipelines().await? {
            let sources = self.api().pipeline_sources(&pipeline.name).await?;
            if sources.iter().any(|s| s == stream) {
                readers.push(pipeline.name);
            }
        }
        Ok(readers)
    }
}

/// Attach the requested key, nullability and watermarks to a derived schema.
fn apply_definition(
    name: &str,
    schema: &mut StreamSchema,
    definition: &ModelDefinition,
) -> Result<(), ExecutorError> {
    let hints = &definition.output_stream_schema_hints;
    for column in hints.keys() {
        if schema.field(column).is_none() {
            warn!("Schema hint for '{column}' does not match any column of '{name}'");
        }
    }

    let mut not_null: Vec<&str> = hints
        .iter()
        .filter(|(_, hint)| hint.has(ColumnConstraint::NotNull))
        .map(|(column, _)| column.as_str())
        .collect();
    for column in &definition.primary_key {
        if schema.field(column).is_none() {
            return Err(ExecutorError::config(format!(
                "Primary key column '{column}' is not in the output schema of '{name}'"
            )));
        }
        not_null.push(column.as_str());
    }
    for field in schema.fields.iter_mut() {
        if !not_null.contains(&field.name()) {
            continue;
        }
        if let Some(field_type) = field.field_type_mut() {
            *field_type = field_type.clone().not_null();
        }
    }
    schema.constraints.primary_key = definition.primary_key.clone();

    let mut watermarks = Vec::new();
    if let Some(raw) = &definition.watermark {
        let watermark = Watermark::parse(raw).ok_or_else(|| {
            ExecutorError::config(format!(
                "Invalid watermark '{raw}' for '{name}', expected '<field> AS <expression>'"
            ))
        })?;
        watermarks.push(watermark);
    }
    for (column, hint) in hints {
        for expression in &hint.watermarks {
            if watermarks.iter().any(|w: &Watermark| &w.name == column) {
                warn!("Ignoring second watermark on '{column}' of '{name}'");
                continue;
            }
            watermarks.push(Watermark {
                name: column.clone(),
                expression: expression.clone(),
            });
        }
    }
    schema.watermarks = watermarks;
    Ok(())
}

/// Warn when column types declared in config disagree with what the service derived.
fn warn_on_declared_types(
    name: &str,
    schema: &StreamSchema,
    column_types: &BTreeMap<String, String>,
) {
    let mut declared = Vec::new();
    let mut mismatch = false;
    for (column, raw) in column_types {
        let Some(expected) = FieldType::parse(raw) else {
            warn!("Type '{raw}' declared for column '{column}' of '{name}' is not recognized");
            continue;
        };
        let matches = schema
            .field(column)
            .and_then(SchemaField::field_type)
            .is_some_and(|actual| nullable(actual) == nullable(&expected));
        mismatch |= !matches;
        declared.push(SchemaField::physical(column.clone(), expected));
    }
    if mismatch {
        warn!(
            "Column hints for '{name}' don't match the resulting schema:\n{}\n{}",
            StreamSchema::new(declared).pretty(1, Some("hints")),
            schema.pretty(1, Some("schema"))
        );
    }
}
