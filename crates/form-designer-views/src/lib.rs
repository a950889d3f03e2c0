//! # form-designer-views
//!
//! The HTTP side of form-designer.
//!
//! ## Modules
//!
//! - [`process`] - the form view: submission detection, validation, delivery
//! - [`server`] - [`FormApp`], the axum application serving designed forms
//! - [`admin`] - configuration checks, JSON API and CSV export of logs
//! - [`multipart`] - `multipart/form-data` bodies flattened to form data
//! - [`services`] - settings, templates, storage and mail shared by handlers
//! - [`response`] - error to HTTP response mapping

pub mod admin;
pub mod multipart;
pub mod process;
pub mod response;
pub mod server;
pub mod services;

pub use process::{process_form, FormRequest, ProcessedForm};
pub use server::FormApp;
pub use services::FormServices;
