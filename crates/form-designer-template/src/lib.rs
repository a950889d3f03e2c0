//! # form-designer-template
//!
//! A Django Template Language compatible subset used to render submission
//! messages, to expand mail recipients/senders/subjects, and to lay out
//! forms.
//!
//! Supported syntax: `{{ variable.path|filter:arg }}`, `{% if %}` with
//! `elif`/`else`, `{% for %}` with `empty` and `forloop`, `{% with %}`,
//! `{% include %}`, `{% comment %}` and `{# ... #}`.

pub mod builtins;
pub mod context;
pub mod engine;
pub mod filters;
pub mod lexer;
pub mod loaders;
pub mod parser;

pub use context::{Context, ContextValue};
pub use engine::Engine;
