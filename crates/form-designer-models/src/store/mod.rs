//! Persistence of form definitions and submission logs.
//!
//! [`FormStore`] is implemented by [`SqliteStore`] and, for tests and
//! throwaway setups, [`InMemoryStore`]. Deleting a definition deletes its
//! fields and logs. Logs are returned newest first.

mod memory;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use form_designer_core::settings::DatabaseSettings;
use form_designer_core::FormDesignerError;

use crate::definition::{FormDefinition, FormLog, LogEntry};

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// Storage for definitions and logs.
#[async_trait]
pub trait FormStore: Send + Sync {
    /// Creates the schema if it does not exist yet.
    async fn migrate(&self) -> Result<(), FormDesignerError>;

    /// Stores a new definition with its fields and returns it with ids
    /// assigned. Fails with `IntegrityError` if the name is taken.
    async fn create_definition(
        &self,
        definition: &FormDefinition,
    ) -> Result<FormDefinition, FormDesignerError>;

    /// Replaces a stored definition and its fields. Logs are kept.
    async fn update_definition(
        &self,
        definition: &FormDefinition,
    ) -> Result<FormDefinition, FormDesignerError>;

    /// Loads a definition by id.
    async fn get_definition(&self, id: i64) -> Result<FormDefinition, FormDesignerError>;

    /// Loads a definition by its unique name.
    async fn get_definition_by_name(&self, name: &str)
        -> Result<FormDefinition, FormDesignerError>;

    /// Lists all definitions ordered by name.
    async fn list_definitions(&self) -> Result<Vec<FormDefinition>, FormDesignerError>;

    /// Deletes a definition together with its fields and logs.
    async fn delete_definition(&self, id: i64) -> Result<(), FormDesignerError>;

    /// Stores a submission log for a definition.
    async fn add_log(
        &self,
        definition_id: i64,
        data: Vec<LogEntry>,
    ) -> Result<FormLog, FormDesignerError>;

    /// Lists the logs of a definition, newest first.
    async fn list_logs(&self, definition_id: i64) -> Result<Vec<FormLog>, FormDesignerError>;

    /// Counts the fields of a definition.
    async fn count_fields(&self, definition_id: i64) -> Result<usize, FormDesignerError>;
}

/// Opens the store configured in the database settings. `:memory:` opens a
/// private in-memory `SQLite` database.
///
/// # Errors
///
/// Returns `OperationalError` if the database cannot be opened.
pub fn store_from_settings(
    settings: &DatabaseSettings,
) -> Result<Arc<dyn FormStore>, FormDesignerError> {
    Ok(Arc::new(SqliteStore::open(&settings.path)?))
}

fn require_id(definition: &FormDefinition) -> Result<i64, FormDesignerError> {
    definition.id.ok_or_else(|| {
        FormDesignerError::BadRequest(format!(
            "Form '{}' has not been stored yet",
            definition.name
        ))
    })
}

fn not_found(what: impl std::fmt::Display) -> FormDesignerError {
    FormDesignerError::DoesNotExist(format!("Form definition {what} does not exist"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::FormDefinitionField;

    fn contact() -> FormDefinition {
        let mut def = FormDefinition::new("contact");
        def.title = Some("Contact".into());
        let mut email = FormDefinitionField::new("email", "forms.EmailField");
        email.position = 2;
        let mut name = FormDefinitionField::new("name", "forms.CharField");
        name.position = 1;
        def.fields = vec![email, name];
        def
    }

    fn entry(value: &str) -> Vec<LogEntry> {
        vec![LogEntry {
            name: "name".into(),
            label: "Name".into(),
            value: serde_json::Value::from(value),
        }]
    }

    async fn exercise(store: &dyn FormStore) {
        store.migrate().await.unwrap();

        let created = store.create_definition(&contact()).await.unwrap();
        let id = created.id.unwrap();
        assert!(created.fields.iter().all(|f| f.id.is_some()));
        assert_eq!(created.fields[0].name, "name");

        assert!(matches!(
            store.create_definition(&contact()).await,
            Err(FormDesignerError::IntegrityError(_))
        ));

        let loaded = store.get_definition_by_name("contact").await.unwrap();
        assert_eq!(loaded, created);
        assert_eq!(store.get_definition(id).await.unwrap(), created);
        assert_eq!(store.count_fields(id).await.unwrap(), 2);

        let mut changed = loaded.clone();
        changed.title = None;
        changed.fields.pop();
        let updated = store.update_definition(&changed).await.unwrap();
        assert_eq!(updated.title, None);
        assert_eq!(store.count_fields(id).await.unwrap(), 1);

        store.add_log(id, entry("first")).await.unwrap();
        store.add_log(id, entry("second")).await.unwrap();
        store.add_log(id, entry("third")).await.unwrap();
        let logs = store.list_logs(id).await.unwrap();
        let values: Vec<_> = logs.iter().map(|l| l.data[0].value.clone()).collect();
        assert_eq!(values, ["third", "second", "first"]);
        assert!(logs[0].created >= logs[2].created);

        let mut other = FormDefinition::new("another");
        other.fields.push(FormDefinitionField::new("x", "forms.CharField"));
        store.create_definition(&other).await.unwrap();
        let names: Vec<_> = store
            .list_definitions()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, ["another", "contact"]);

        store.delete_definition(id).await.unwrap();
        assert!(matches!(
            store.get_definition(id).await,
            Err(FormDesignerError::DoesNotExist(_))
        ));
        assert!(store.list_logs(id).await.unwrap().is_empty());
        assert!(store.delete_definition(id).await.is_err());
        assert!(store.add_log(id, entry("late")).await.is_err());
    }

    #[tokio::test]
    async fn test_sqlite_store() {
        let store = SqliteStore::memory().unwrap();
        exercise(&store).await;
    }

    #[tokio::test]
    async fn test_sqlite_store_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forms.sqlite3");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.migrate().await.unwrap();
            store.create_definition(&contact()).await.unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        store.migrate().await.unwrap();
        assert_eq!(
            store.get_definition_by_name("contact").await.unwrap().fields.len(),
            2
        );
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryStore::new();
        exercise(&store).await;
    }

    #[tokio::test]
    async fn test_update_requires_id() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.update_definition(&contact()).await,
            Err(FormDesignerError::BadRequest(_))
        ));
    }
}
