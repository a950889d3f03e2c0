//! `SQLite` store using `rusqlite`.
//!
//! The connection sits behind a `tokio` mutex and every statement runs in
//! `spawn_blocking`. Foreign keys are switched on so that deleting a
//! definition cascades to its fields and logs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;

use form_designer_core::FormDesignerError;

use super::{not_found, require_id, FormStore};
use crate::definition::{FormDefinition, FormDefinitionField, FormLog, FormMethod, LogEntry};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS form_definition (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    title TEXT,
    action TEXT,
    mail_to TEXT,
    mail_from TEXT,
    mail_subject TEXT,
    method TEXT NOT NULL DEFAULT 'POST',
    success_message TEXT,
    error_message TEXT,
    submit_label TEXT,
    log_data INTEGER NOT NULL DEFAULT 1,
    success_redirect INTEGER NOT NULL DEFAULT 0,
    success_clear INTEGER NOT NULL DEFAULT 1,
    allow_get_initial INTEGER NOT NULL DEFAULT 1,
    message_template TEXT,
    form_template_name TEXT
);
CREATE TABLE IF NOT EXISTS form_definition_field (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    form_definition_id INTEGER NOT NULL
        REFERENCES form_definition(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    field_class TEXT NOT NULL,
    required INTEGER NOT NULL DEFAULT 1,
    initial TEXT,
    label TEXT,
    widget TEXT NOT NULL DEFAULT '',
    help_text TEXT,
    position INTEGER NOT NULL DEFAULT 0,
    max_length INTEGER,
    min_length INTEGER,
    max_value REAL,
    min_value REAL,
    max_digits INTEGER,
    decimal_places INTEGER,
    regex TEXT,
    choice_values TEXT,
    choice_labels TEXT,
    choice_model TEXT,
    choice_model_empty_label TEXT,
    include_result INTEGER NOT NULL DEFAULT 1
);
CREATE INDEX IF NOT EXISTS form_definition_field_form
    ON form_definition_field (form_definition_id, position);
CREATE TABLE IF NOT EXISTS form_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    form_definition_id INTEGER NOT NULL
        REFERENCES form_definition(id) ON DELETE CASCADE,
    created TEXT NOT NULL,
    data TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS form_log_form_created
    ON form_log (form_definition_id, created);
";

const DEFINITION_COLUMNS: &str = "id, name, title, action, mail_to, mail_from, mail_subject, \
     method, success_message, error_message, submit_label, log_data, success_redirect, \
     success_clear, allow_get_initial, message_template, form_template_name";

const FIELD_COLUMNS: &str = "id, name, field_class, required, initial, label, widget, \
     help_text, position, max_length, min_length, max_value, min_value, max_digits, \
     decimal_places, regex, choice_values, choice_labels, choice_model, \
     choice_model_empty_label, include_result";

fn db_error(e: rusqlite::Error) -> FormDesignerError {
    let message = e.to_string();
    match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            FormDesignerError::IntegrityError(message)
        }
        _ => FormDesignerError::DatabaseError(message),
    }
}

/// A `SQLite` backed [`FormStore`].
pub struct SqliteStore {
    path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens the database at `path`; `:memory:` opens an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns `OperationalError` if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FormDesignerError> {
        let path = path.as_ref().to_path_buf();
        let conn = if path.to_str() == Some(":memory:") {
            Connection::open_in_memory()
        } else {
            Connection::open(&path)
        }
        .map_err(|e| FormDesignerError::OperationalError(format!("SQLite open failed: {e}")))?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| {
                FormDesignerError::OperationalError(format!("Failed to set pragmas: {e}"))
            })?;

        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn memory() -> Result<Self, FormDesignerError> {
        Self::open(":memory:")
    }

    /// Returns the database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, FormDesignerError>
    where
        F: FnOnce(&mut Connection) -> Result<T, FormDesignerError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            f(&mut conn)
        })
        .await
        .map_err(|e| FormDesignerError::DatabaseError(format!("Task join error: {e}")))?
    }
}

fn definition_from_row(row: &Row<'_>) -> rusqlite::Result<FormDefinition> {
    let method_idx = row.as_ref().column_index("method")?;
    let method = row
        .get::<_, String>(method_idx)?
        .parse::<FormMethod>()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(method_idx, Type::Text, Box::new(e))
        })?;
    Ok(FormDefinition {
        id: Some(row.get("id")?),
        name: row.get("name")?,
        title: row.get("title")?,
        action: row.get("action")?,
        mail_to: row.get("mail_to")?,
        mail_from: row.get("mail_from")?,
        mail_subject: row.get("mail_subject")?,
        method,
        success_message: row.get("success_message")?,
        error_message: row.get("error_message")?,
        submit_label: row.get("submit_label")?,
        log_data: row.get("log_data")?,
        success_redirect: row.get("success_redirect")?,
        success_clear: row.get("success_clear")?,
        allow_get_initial: row.get("allow_get_initial")?,
        message_template: row.get("message_template")?,
        form_template_name: row.get("form_template_name")?,
        fields: Vec::new(),
    })
}

fn field_from_row(row: &Row<'_>) -> rusqlite::Result<FormDefinitionField> {
    Ok(FormDefinitionField {
        id: Some(row.get("id")?),
        name: row.get("name")?,
        field_class: row.get("field_class")?,
        required: row.get("required")?,
        initial: row.get("initial")?,
        label: row.get("label")?,
        widget: row.get("widget")?,
        help_text: row.get("help_text")?,
        position: row.get("position")?,
        max_length: row.get("max_length")?,
        min_length: row.get("min_length")?,
        max_value: row.get("max_value")?,
        min_value: row.get("min_value")?,
        max_digits: row.get("max_digits")?,
        decimal_places: row.get("decimal_places")?,
        regex: row.get("regex")?,
        choice_values: row.get("choice_values")?,
        choice_labels: row.get("choice_labels")?,
        choice_model: row.get("choice_model")?,
        choice_model_empty_label: row.get("choice_model_empty_label")?,
        include_result: row.get("include_result")?,
    })
}

fn load_fields(conn: &Connection, definition_id: i64) -> Result<Vec<FormDefinitionField>, FormDesignerError> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {FIELD_COLUMNS} FROM form_definition_field \
             WHERE form_definition_id = ?1 ORDER BY position, id"
        ))
        .map_err(db_error)?;
    let fields = stmt
        .query_map(params![definition_id], field_from_row)
        .map_err(db_error)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_error)?;
    Ok(fields)
}

fn load_definition(
    conn: &Connection,
    column: &str,
    value: &dyn rusqlite::ToSql,
) -> Result<Option<FormDefinition>, FormDesignerError> {
    let definition = conn
        .query_row(
            &format!("SELECT {DEFINITION_COLUMNS} FROM form_definition WHERE {column} = ?1"),
            [value],
            definition_from_row,
        )
        .optional()
        .map_err(db_error)?;
    match definition {
        Some(mut definition) => {
            if let Some(id) = definition.id {
                definition.fields = load_fields(conn, id)?;
            }
            Ok(Some(definition))
        }
        None => Ok(None),
    }
}

fn insert_fields(
    tx: &rusqlite::Transaction<'_>,
    definition_id: i64,
    fields: &mut [FormDefinitionField],
) -> Result<(), FormDesignerError> {
    let mut stmt = tx
        .prepare(
            "INSERT INTO form_definition_field (form_definition_id, name, field_class, required, \
             initial, label, widget, help_text, position, max_length, min_length, max_value, \
             min_value, max_digits, decimal_places, regex, choice_values, choice_labels, \
             choice_model, choice_model_empty_label, include_result) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, \
             ?17, ?18, ?19, ?20, ?21)",
        )
        .map_err(db_error)?;
    for field in fields.iter_mut() {
        stmt.execute(params![
            definition_id,
            field.name,
            field.field_class,
            field.required,
            field.initial,
            field.label,
            field.widget,
            field.help_text,
            field.position,
            field.max_length,
            field.min_length,
            field.max_value,
            field.min_value,
            field.max_digits,
            field.decimal_places,
            field.regex,
            field.choice_values,
            field.choice_labels,
            field.choice_model,
            field.choice_model_empty_label,
            field.include_result,
        ])
        .map_err(db_error)?;
        field.id = Some(tx.last_insert_rowid());
    }
    Ok(())
}

fn format_created(created: DateTime<Utc>) -> String {
    created.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_created(text: &str) -> Result<DateTime<Utc>, FormDesignerError> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| FormDesignerError::DatabaseError(format!("Invalid log timestamp '{text}': {e}")))
}

#[async_trait]
impl FormStore for SqliteStore {
    async fn migrate(&self) -> Result<(), FormDesignerError> {
        self.with_conn(|conn| conn.execute_batch(SCHEMA).map_err(db_error))
            .await?;
        tracing::info!(path = %self.path.display(), "database schema ready");
        Ok(())
    }

    async fn create_definition(
        &self,
        definition: &FormDefinition,
    ) -> Result<FormDefinition, FormDesignerError> {
        let mut definition = definition.clone();
        definition.sort_fields();
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(db_error)?;
            tx.execute(
                "INSERT INTO form_definition (name, title, action, mail_to, mail_from, \
                 mail_subject, method, success_message, error_message, submit_label, log_data, \
                 success_redirect, success_clear, allow_get_initial, message_template, \
                 form_template_name) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    definition.name,
                    definition.title,
                    definition.action,
                    definition.mail_to,
                    definition.mail_from,
                    definition.mail_subject,
                    definition.method.as_str(),
                    definition.success_message,
                    definition.error_message,
                    definition.submit_label,
                    definition.log_data,
                    definition.success_redirect,
                    definition.success_clear,
                    definition.allow_get_initial,
                    definition.message_template,
                    definition.form_template_name,
                ],
            )
            .map_err(db_error)?;
            let id = tx.last_insert_rowid();
            definition.id = Some(id);
            insert_fields(&tx, id, &mut definition.fields)?;
            tx.commit().map_err(db_error)?;
            Ok(definition)
        })
        .await
    }

    async fn update_definition(
        &self,
        definition: &FormDefinition,
    ) -> Result<FormDefinition, FormDesignerError> {
        let id = require_id(definition)?;
        let mut definition = definition.clone();
        definition.sort_fields();
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(db_error)?;
            let updated = tx
                .execute(
                    "UPDATE form_definition SET name = ?2, title = ?3, action = ?4, \
                     mail_to = ?5, mail_from = ?6, mail_subject = ?7, method = ?8, \
                     success_message = ?9, error_message = ?10, submit_label = ?11, \
                     log_data = ?12, success_redirect = ?13, success_clear = ?14, \
                     allow_get_initial = ?15, message_template = ?16, \
                     form_template_name = ?17 WHERE id = ?1",
                    params![
                        id,
                        definition.name,
                        definition.title,
                        definition.action,
                        definition.mail_to,
                        definition.mail_from,
                        definition.mail_subject,
                        definition.method.as_str(),
                        definition.success_message,
                        definition.error_message,
                        definition.submit_label,
                        definition.log_data,
                        definition.success_redirect,
                        definition.success_clear,
                        definition.allow_get_initial,
                        definition.message_template,
                        definition.form_template_name,
                    ],
                )
                .map_err(db_error)?;
            if updated == 0 {
                return Err(not_found(id));
            }
            tx.execute(
                "DELETE FROM form_definition_field WHERE form_definition_id = ?1",
                params![id],
            )
            .map_err(db_error)?;
            insert_fields(&tx, id, &mut definition.fields)?;
            tx.commit().map_err(db_error)?;
            Ok(definition)
        })
        .await
    }

    async fn get_definition(&self, id: i64) -> Result<FormDefinition, FormDesignerError> {
        self.with_conn(move |conn| load_definition(conn, "id", &id)?.ok_or_else(|| not_found(id)))
            .await
    }

    async fn get_definition_by_name(
        &self,
        name: &str,
    ) -> Result<FormDefinition, FormDesignerError> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            load_definition(conn, "name", &name)?.ok_or_else(|| not_found(format!("'{name}'")))
        })
        .await
    }

    async fn list_definitions(&self) -> Result<Vec<FormDefinition>, FormDesignerError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {DEFINITION_COLUMNS} FROM form_definition ORDER BY name"
                ))
                .map_err(db_error)?;
            let mut definitions = stmt
                .query_map([], definition_from_row)
                .map_err(db_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(db_error)?;
            for definition in &mut definitions {
                if let Some(id) = definition.id {
                    definition.fields = load_fields(conn, id)?;
                }
            }
            Ok(definitions)
        })
        .await
    }

    async fn delete_definition(&self, id: i64) -> Result<(), FormDesignerError> {
        self.with_conn(move |conn| {
            let deleted = conn
                .execute("DELETE FROM form_definition WHERE id = ?1", params![id])
                .map_err(db_error)?;
            if deleted == 0 {
                return Err(not_found(id));
            }
            Ok(())
        })
        .await
    }

    async fn add_log(
        &self,
        definition_id: i64,
        data: Vec<LogEntry>,
    ) -> Result<FormLog, FormDesignerError> {
        let created = Utc::now();
        let json = serde_json::to_string(&data)?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO form_log (form_definition_id, created, data) VALUES (?1, ?2, ?3)",
                params![definition_id, format_created(created), json],
            )
            .map_err(db_error)?;
            Ok(FormLog {
                id: conn.last_insert_rowid(),
                form_definition_id: definition_id,
                created,
                data,
            })
        })
        .await
    }

    async fn list_logs(&self, definition_id: i64) -> Result<Vec<FormLog>, FormDesignerError> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, created, data FROM form_log WHERE form_definition_id = ?1 \
                     ORDER BY created DESC, id DESC",
                )
                .map_err(db_error)?;
            let rows = stmt
                .query_map(params![definition_id], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })
                .map_err(db_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(db_error)?;
            rows.into_iter()
                .map(|(id, created, data)| -> Result<FormLog, FormDesignerError> {
                    Ok(FormLog {
                        id,
                        form_definition_id: definition_id,
                        created: parse_created(&created)?,
                        data: serde_json::from_str(&data)?,
                    })
                })
                .collect()
        })
        .await
    }

    async fn count_fields(&self, definition_id: i64) -> Result<usize, FormDesignerError> {
        self.with_conn(move |conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM form_definition_field WHERE form_definition_id = ?1",
                    params![definition_id],
                    |row| row.get(0),
                )
                .map_err(db_error)?;
            Ok(usize::try_from(count).unwrap_or_default())
        })
        .await
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
