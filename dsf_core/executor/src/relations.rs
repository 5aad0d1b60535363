use crate::error::ExecutorError;
use crate::remote::{description_for_rename, replace_sink, replace_source};
use crate::Executor;
use common::types::relation::{Relation, ResourceKind};
use common::types::schema::SchemaField;
use log::debug;
use shared_clients::decodable::types::PipelineUpdate;

impl Executor {
    /// Remove everything stored under the relation's name: pipeline, inbound
    /// connection, then stream.
    pub async fn drop_relation(&self, relation: &Relation) -> Result<(), ExecutorError> {
        let name = relation.name();
        debug!("Dropping {} '{name}'", relation.kind);
        self.drop_pipeline(name).await?;
        if relation.kind == ResourceKind::Seed {
            self.drop_connection(name).await?;
        }
        self.drop_stream(name).await?;
        self.cache.invalidate(name);
        Ok(())
    }

    /// Remove every record from the relation's stream, keeping its definition.
    pub async fn truncate_relation(&self, relation: &Relation) -> Result<(), ExecutorError> {
        let name = relation.name();
        if self.api().get_stream(name).await?.is_none() {
            return Err(ExecutorError::resource_not_found(format!(
                "Error clearing stream `{name}`: stream doesn't exist"
            )));
        }
        self.api().clear_stream(name).await?;
        Ok(())
    }

    /// Rename stream and pipeline, and point every pipeline reading the old
    /// stream at the new name.
    pub async fn rename_relation(&self, from: &Relation, to: &Relation) -> Result<(), ExecutorError> {
        let (old, new) = (from.name(), to.name());
        if new.is_empty() {
            return Err(ExecutorError::config(format!(
                "Cannot rename relation {old} to nothing"
            )));
        }
        if self.api().get_stream(old).await?.is_none() {
            return Err(ExecutorError::resource_not_found(format!(
                "Cannot rename '{old}': stream does not exist"
            )));
        }
        let Some(pipeline) = self.api().get_pipeline(old).await? else {
            return Err(ExecutorError::resource_not_found(format!(
                "Cannot rename '{old}': pipeline does not exist"
            )));
        };
        if pipeline.sql.trim().is_empty() {
            return Err(ExecutorError::failed_to_execute(format!(
                "Cannot rename relation '{old}': pipeline returned no sql"
            )));
        }
        let readers = self.readers_of(old).await?;

        self.api().rename_stream(old, new).await?;
        debug!("Renamed stream '{old}' to '{new}'");

        self.api()
            .update_pipeline(
                old,
                &PipelineUpdate {
                    name: Some(new.to_string()),
                    sql: Some(replace_sink(old, new, &pipeline.sql)),
                    description: Some(description_for_rename(old, new, &pipeline.description)),
                },
            )
            .await?;
        debug!("Renamed pipeline '{old}' to '{new}'");

        let mut renamed_sources = 0;
        for reader in readers.iter().filter(|r| r.as_str() != old) {
            let Some(info) = self.api().get_pipeline(reader).await? else {
                continue;
            };
            if info.sql.is_empty() {
                continue;
            }
            self.api()
                .update_pipeline(
                    reader,
                    &PipelineUpdate {
                        sql: Some(replace_source(old, new, &info.sql)),
                        ..Default::default()
                    },
                )
                .await?;
            self.cache.invalidate(reader);
            renamed_sources += 1;
        }
        debug!("Renamed sources from '{old}' to '{new}' in {renamed_sources} pipelines");

        self.cache.rename(old, new);
        self.cache.invalidate(new);
        Ok(())
    }

    /// Every stream on the account, as table relations.
    pub async fn list_relations(&self) -> Result<Vec<Relation>, ExecutorError> {
        Ok(self
            .api()
            .list_streams()
            .await?
            .into_iter()
            .map(|s| Relation::new(s.name, ResourceKind::Table))
            .collect())
    }

    /// Fields of the relation's stream; empty when the stream does not exist.
    pub async fn columns_in_relation(
        &self,
        relation: &Relation,
    ) -> Result<Vec<SchemaField>, ExecutorError> {
        Ok(self
            .api()
            .get_stream(relation.name())
            .await?
            .map(|s| s.schema.fields)
            .unwrap_or_default())
    }
}
