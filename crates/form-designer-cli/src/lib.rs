//! # form-designer-cli
//!
//! Management commands for form-designer.
//!
//! ```rust
//! use form_designer_cli::command::CommandRegistry;
//! use form_designer_cli::commands::register_builtin_commands;
//!
//! let mut registry = CommandRegistry::new();
//! register_builtin_commands(&mut registry);
//!
//! let names = registry.list_commands();
//! assert!(names.contains(&"runserver"));
//! assert!(names.contains(&"loaddata"));
//! assert!(names.contains(&"exportlogs"));
//! ```

pub mod command;
pub mod commands;

pub use command::{CommandRegistry, ManagementCommand};
