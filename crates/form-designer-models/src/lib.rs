//! # form-designer-models
//!
//! The configuration records behind designed forms and everything that
//! works on them directly.
//!
//! ## Modules
//!
//! - [`definition`] - `FormDefinition`, `FormDefinitionField` and `FormLog`
//! - [`translation`] - field records to form fields, choice model registry
//! - [`designed`] - the runtime form of a definition, with its submit flag
//! - [`delivery`] - result data, message bodies, logging and mail
//! - [`store`] - `SQLite` and in-memory persistence

pub mod definition;
pub mod delivery;
pub mod designed;
pub mod store;
pub mod translation;

pub use definition::{FormDefinition, FormDefinitionField, FormLog, FormMethod, LogEntry};
pub use delivery::FormDataEntry;
pub use designed::build_form;
pub use store::{FormStore, InMemoryStore, SqliteStore};
pub use translation::{ChoiceModelRegistry, ChoiceSource, FieldInitArgs};
