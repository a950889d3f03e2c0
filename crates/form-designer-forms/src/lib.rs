//! # form-designer-forms
//!
//! The field taxonomy behind designed forms: typed fields with their
//! constraints ([`fields`]), HTML widgets ([`widgets`]), fields bound to
//! submitted data ([`bound_field`]), and [`BaseForm`] which binds, validates
//! and renders a list of fields.

pub mod bound_field;
pub mod fields;
pub mod form;
pub mod value;
pub mod widgets;

pub use bound_field::BoundField;
pub use fields::{clean_field_value, FormFieldDef, FormFieldType};
pub use form::BaseForm;
pub use value::Value;
pub use widgets::WidgetType;
