//! JSON API for managing definitions and reading their logs.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use form_designer_core::FormDesignerError;
use form_designer_models::{FormDefinition, FormLog};

use super::checks::check_definition;
use super::export::logs_to_csv;
use crate::response::HandlerResult;
use crate::services::FormServices;

/// One row of the definition list.
#[derive(Debug, Clone, Serialize)]
pub struct DefinitionSummary {
    /// Storage id.
    pub id: Option<i64>,
    /// Unique name.
    pub name: String,
    /// Title, or the name when untitled.
    pub title: String,
    /// Number of fields.
    pub field_count: usize,
    /// Whether submissions are logged.
    pub log_data: bool,
    /// Recipients, if mails are sent.
    pub mail_to: Option<String>,
}

impl From<&FormDefinition> for DefinitionSummary {
    fn from(definition: &FormDefinition) -> Self {
        Self {
            id: definition.id,
            name: definition.name.clone(),
            title: definition.display_name().to_string(),
            field_count: definition.count_fields(),
            log_data: definition.log_data,
            mail_to: definition.mail_to.clone(),
        }
    }
}

/// Builds the admin router:
///
/// - `GET /forms/` - list definitions
/// - `POST /forms/` - create a definition
/// - `GET /forms/{id}/` - get a definition with its fields
/// - `PUT /forms/{id}/` - replace a definition
/// - `DELETE /forms/{id}/` - delete a definition, its fields and logs
/// - `GET /forms/{id}/logs/` - list logs, newest first
/// - `GET /forms/{id}/logs.csv` - export logs as CSV
pub fn router(services: FormServices) -> Router {
    Router::new()
        .route("/forms/", get(list_definitions).post(create_definition))
        .route(
            "/forms/{id}/",
            get(get_definition)
                .put(update_definition)
                .delete(delete_definition),
        )
        .route("/forms/{id}/logs/", get(list_logs))
        .route("/forms/{id}/logs.csv", get(export_logs))
        .with_state(services)
}

async fn list_definitions(
    State(services): State<FormServices>,
) -> HandlerResult<Json<Vec<DefinitionSummary>>> {
    let definitions = services.store.list_definitions().await?;
    Ok(Json(definitions.iter().map(DefinitionSummary::from).collect()))
}

fn checked(
    services: &FormServices,
    definition: &FormDefinition,
) -> Result<(), FormDesignerError> {
    check_definition(definition, &services.settings).map_err(FormDesignerError::ValidationError)
}

async fn create_definition(
    State(services): State<FormServices>,
    Json(mut definition): Json<FormDefinition>,
) -> HandlerResult<impl IntoResponse> {
    definition.id = None;
    checked(&services, &definition)?;
    let created = services.store.create_definition(&definition).await?;
    tracing::info!(form = %created.name, id = ?created.id, "form definition created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_definition(
    State(services): State<FormServices>,
    Path(id): Path<i64>,
) -> HandlerResult<Json<FormDefinition>> {
    Ok(Json(services.store.get_definition(id).await?))
}

async fn update_definition(
    State(services): State<FormServices>,
    Path(id): Path<i64>,
    Json(mut definition): Json<FormDefinition>,
) -> HandlerResult<Json<FormDefinition>> {
    definition.id = Some(id);
    checked(&services, &definition)?;
    let updated = services.store.update_definition(&definition).await?;
    tracing::info!(form = %updated.name, id, "form definition updated");
    Ok(Json(updated))
}

async fn delete_definition(
    State(services): State<FormServices>,
    Path(id): Path<i64>,
) -> HandlerResult<StatusCode> {
    services.store.delete_definition(id).await?;
    tracing::info!(id, "form definition deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_logs(
    State(services): State<FormServices>,
    Path(id): Path<i64>,
) -> HandlerResult<Json<Vec<FormLog>>> {
    services.store.get_definition(id).await?;
    Ok(Json(services.store.list_logs(id).await?))
}

async fn export_logs(
    State(services): State<FormServices>,
    Path(id): Path<i64>,
) -> HandlerResult<impl IntoResponse> {
    let definition = services.store.get_definition(id).await?;
    let logs = services.store.list_logs(id).await?;
    let csv = logs_to_csv(&logs)?;
    let disposition = format!("attachment; filename=\"{}-logs.csv\"", definition.name);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}
