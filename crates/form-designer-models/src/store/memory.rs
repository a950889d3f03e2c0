//! In-memory store.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use form_designer_core::FormDesignerError;

use super::{not_found, require_id, FormStore};
use crate::definition::{FormDefinition, FormLog, LogEntry};

#[derive(Debug, Default)]
struct State {
    last_definition_id: i64,
    last_field_id: i64,
    last_log_id: i64,
    definitions: BTreeMap<i64, FormDefinition>,
    logs: Vec<FormLog>,
}

impl State {
    fn name_taken(&self, name: &str, except: Option<i64>) -> bool {
        self.definitions
            .values()
            .any(|d| d.name == name && d.id != except)
    }

    fn assign_field_ids(&mut self, definition: &mut FormDefinition) {
        definition.sort_fields();
        for field in &mut definition.fields {
            self.last_field_id += 1;
            field.id = Some(self.last_field_id);
        }
    }
}

/// A [`FormStore`] keeping everything in memory. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn name_conflict(name: &str) -> FormDesignerError {
    FormDesignerError::IntegrityError(format!(
        "UNIQUE constraint failed: form_definition.name ({name})"
    ))
}

#[async_trait]
impl FormStore for InMemoryStore {
    async fn migrate(&self) -> Result<(), FormDesignerError> {
        Ok(())
    }

    async fn create_definition(
        &self,
        definition: &FormDefinition,
    ) -> Result<FormDefinition, FormDesignerError> {
        let mut state = self.state.write().await;
        if state.name_taken(&definition.name, None) {
            return Err(name_conflict(&definition.name));
        }
        let mut definition = definition.clone();
        state.last_definition_id += 1;
        let id = state.last_definition_id;
        definition.id = Some(id);
        state.assign_field_ids(&mut definition);
        state.definitions.insert(id, definition.clone());
        Ok(definition)
    }

    async fn update_definition(
        &self,
        definition: &FormDefinition,
    ) -> Result<FormDefinition, FormDesignerError> {
        let id = require_id(definition)?;
        let mut state = self.state.write().await;
        if !state.definitions.contains_key(&id) {
            return Err(not_found(id));
        }
        if state.name_taken(&definition.name, Some(id)) {
            return Err(name_conflict(&definition.name));
        }
        let mut definition = definition.clone();
        state.assign_field_ids(&mut definition);
        state.definitions.insert(id, definition.clone());
        Ok(definition)
    }

    async fn get_definition(&self, id: i64) -> Result<FormDefinition, FormDesignerError> {
        self.state
            .read()
            .await
            .definitions
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn get_definition_by_name(
        &self,
        name: &str,
    ) -> Result<FormDefinition, FormDesignerError> {
        self.state
            .read()
            .await
            .definitions
            .values()
            .find(|d| d.name == name)
            .cloned()
            .ok_or_else(|| not_found(format!("'{name}'")))
    }

    async fn list_definitions(&self) -> Result<Vec<FormDefinition>, FormDesignerError> {
        let mut definitions: Vec<_> = self
            .state
            .read()
            .await
            .definitions
            .values()
            .cloned()
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(definitions)
    }

    async fn delete_definition(&self, id: i64) -> Result<(), FormDesignerError> {
        let mut state = self.state.write().await;
        if state.definitions.remove(&id).is_none() {
            return Err(not_found(id));
        }
        state.logs.retain(|log| log.form_definition_id != id);
        Ok(())
    }

    async fn add_log(
        &self,
        definition_id: i64,
        data: Vec<LogEntry>,
    ) -> Result<FormLog, FormDesignerError> {
        let mut state = self.state.write().await;
        if !state.definitions.contains_key(&definition_id) {
            return Err(FormDesignerError::IntegrityError(format!(
                "FOREIGN KEY constraint failed: form definition {definition_id}"
            )));
        }
        state.last_log_id += 1;
        let log = FormLog {
            id: state.last_log_id,
            form_definition_id: definition_id,
            created: Utc::now(),
            data,
        };
        state.logs.push(log.clone());
        Ok(log)
    }

    async fn list_logs(&self, definition_id: i64) -> Result<Vec<FormLog>, FormDesignerError> {
        let mut logs: Vec<_> = self
            .state
            .read()
            .await
            .logs
            .iter()
            .filter(|log| log.form_definition_id == definition_id)
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        Ok(logs)
    }

    async fn count_fields(&self, definition_id: i64) -> Result<usize, FormDesignerError> {
        Ok(self.get_definition(definition_id).await?.count_fields())
    }
}
