//! # form-designer
//!
//! Forms configured as data: a [`FormDefinition`](models::FormDefinition)
//! with its fields is stored in a database and turned into a validated,
//! rendered HTML form at request time. Valid submissions are logged and
//! mailed.
//!
//! This is the meta-crate that re-exports all sub-crates. Depend on the
//! individual crates for finer-grained control.

/// Settings, errors, logging and `QueryDict`.
pub use form_designer_core as core;

/// DTL-compatible template engine.
pub use form_designer_template as template;

/// Field taxonomy, widgets and `BaseForm`.
pub use form_designer_forms as forms;

/// Mail messages and backends.
pub use form_designer_mail as mail;

/// Definitions, field translation, delivery and storage.
pub use form_designer_models as models;

/// Form view, axum routes and admin API.
#[cfg(feature = "views")]
pub use form_designer_views as views;

/// Management commands.
#[cfg(feature = "cli")]
pub use form_designer_cli as cli;

/// Third-party crates re-exported for convenience.
pub mod deps {
    pub use async_trait;
    pub use axum;
    pub use chrono;
    pub use serde;
    pub use serde_json;
    pub use tokio;
    pub use tracing;
    pub use tracing_subscriber;
}

/// The commonly used types.
pub mod prelude {
    pub use crate::core::{FormDesignerError, FormDesignerResult, FormDesignerSettings, QueryDict};
    pub use crate::forms::{BaseForm, FormFieldDef, FormFieldType, WidgetType};
    pub use crate::mail::{EmailBackend, EmailMessage};
    pub use crate::models::store::FormStore;
    pub use crate::models::{build_form, FormDefinition, FormDefinitionField, FormLog};
    pub use crate::template::{Context, ContextValue, Engine};

    #[cfg(feature = "views")]
    pub use crate::views::{process_form, FormApp, FormRequest, FormServices};
}
