//! Configuration checks run before a definition is saved through the admin.
//!
//! Storage itself accepts any record; these checks catch the mistakes that
//! would otherwise only surface when the form is built.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;

use form_designer_core::{FormDesignerSettings, ValidationError};
use form_designer_models::{FormDefinition, FormDefinitionField};

const MODEL_CLASSES: [&str; 2] = ["forms.ModelChoiceField", "forms.ModelMultipleChoiceField"];

const INVALID_SLUG: &str =
    "Enter a valid \"slug\" consisting of letters, numbers, underscores or hyphens.";

/// Form names are URL path segments and field names are submitted keys.
fn is_slug(value: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid regex"))
        .is_match(value)
}

#[derive(Default)]
struct Errors(BTreeMap<String, Vec<ValidationError>>);

impl Errors {
    fn add(&mut self, key: impl Into<String>, message: impl Into<String>, code: &str) {
        self.0
            .entry(key.into())
            .or_default()
            .push(ValidationError::new(message, code));
    }
}

/// Checks a definition against the configured choices.
///
/// Errors are keyed by attribute, with field attributes written as
/// `fields[<index>].<attribute>`.
///
/// # Errors
///
/// Returns a `ValidationError` with per-attribute errors.
pub fn check_definition(
    definition: &FormDefinition,
    settings: &FormDesignerSettings,
) -> Result<(), ValidationError> {
    let mut errors = Errors::default();

    if definition.name.trim().is_empty() {
        errors.add("name", "This field is required.", "required");
    } else if !is_slug(&definition.name) {
        errors.add("name", INVALID_SLUG, "invalid");
    }
    if let Some(template) = definition.form_template_name.as_deref() {
        if !settings.is_form_template(template) {
            errors.add(
                "form_template_name",
                format!("Select a valid choice. {template} is not one of the available choices."),
                "invalid_choice",
            );
        }
    }

    let mut seen = BTreeSet::new();
    for (index, field) in definition.fields.iter().enumerate() {
        let key = |attr: &str| format!("fields[{index}].{attr}");
        if field.name.trim().is_empty() {
            errors.add(key("name"), "This field is required.", "required");
        } else if !is_slug(&field.name) {
            errors.add(key("name"), INVALID_SLUG, "invalid");
        } else if !seen.insert(field.name.as_str()) {
            errors.add(key("name"), "Field names must be unique.", "unique");
        }
        check_field(field, settings, |attr, message, code| {
            errors.add(key(attr), message, code);
        });
    }

    if errors.0.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::with_field_errors(errors.0))
    }
}

fn check_field(
    field: &FormDefinitionField,
    settings: &FormDesignerSettings,
    mut report: impl FnMut(&str, String, &str),
) {
    if !settings.is_field_class(&field.field_class) {
        report(
            "field_class",
            format!(
                "Select a valid choice. {} is not one of the available choices.",
                field.field_class
            ),
            "invalid_choice",
        );
    }
    if !settings.is_widget_class(&field.widget) {
        report(
            "widget",
            format!(
                "Select a valid choice. {} is not one of the available choices.",
                field.widget
            ),
            "invalid_choice",
        );
    }

    if field.field_class == "forms.RegexField" && is_blank(field.regex.as_deref()) {
        report(
            "regex",
            "This field class requires a regular expression.".to_string(),
            "required",
        );
    }
    if MODEL_CLASSES.contains(&field.field_class.as_str()) {
        match field.choice_model.as_deref().filter(|m| !m.is_empty()) {
            None => report(
                "choice_model",
                "This field class requires a model.".to_string(),
                "required",
            ),
            Some(model) if !settings.is_choice_model_allowed(model) => report(
                "choice_model",
                format!("Select a valid choice. {model} is not one of the available choices."),
                "invalid_choice",
            ),
            Some(_) => {}
        }
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}
