//! # form-designer-core
//!
//! Core types, settings, and error types shared by every form-designer crate.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Form designer settings (field classes, widgets, mail, storage)
//! - [`settings_loader`] - Loading settings from TOML/JSON and the environment
//! - [`logging`] - Tracing-based logging integration
//! - [`utils`] - Submitted-data containers (`QueryDict`)

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;
pub mod utils;

// Re-export the most commonly used types at the crate root.
pub use error::{FormDesignerError, FormDesignerResult, ValidationError};
pub use settings::FormDesignerSettings;
pub use utils::QueryDict;
