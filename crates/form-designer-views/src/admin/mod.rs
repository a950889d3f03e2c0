//! Administration: configuration checks, the JSON API and log export.

pub mod api;
pub mod checks;
pub mod export;

pub use api::router;
pub use checks::check_definition;
pub use export::logs_to_csv;
