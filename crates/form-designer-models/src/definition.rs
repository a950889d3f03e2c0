//! The stored configuration records.
//!
//! A [`FormDefinition`] owns its [`FormDefinitionField`]s; [`FormLog`]s
//! reference their definition by id. Field records carry every constraint
//! attribute for every field class; attributes that do not apply to a class
//! are simply ignored when the form field is built.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use form_designer_core::{FormDesignerError, FormDesignerSettings};

/// HTTP method a designed form submits with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FormMethod {
    /// Submit in the request body.
    #[default]
    Post,
    /// Submit in the query string.
    Get,
}

impl FormMethod {
    /// Returns `POST` or `GET`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Get => "GET",
        }
    }
}

impl fmt::Display for FormMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormMethod {
    type Err = FormDesignerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "POST" => Ok(Self::Post),
            "GET" => Ok(Self::Get),
            other => Err(FormDesignerError::BadRequest(format!(
                "Unsupported form method '{other}'"
            ))),
        }
    }
}

/// A form and its delivery options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormDefinition {
    /// Storage id; `None` until stored.
    pub id: Option<i64>,
    /// Unique slug identifying the form in URLs.
    pub name: String,
    /// Title shown above the form and used as the fallback mail subject.
    pub title: Option<String>,
    /// External URL the form posts to. Empty means the page itself.
    pub action: Option<String>,
    /// Recipients, separated by `,` or `;`. Each is expanded as a template.
    pub mail_to: Option<String>,
    /// Sender address, expanded as a template.
    pub mail_from: Option<String>,
    /// Mail subject, expanded as a template.
    pub mail_subject: Option<String>,
    /// Submission method.
    pub method: FormMethod,
    /// Message shown after a valid submission.
    pub success_message: Option<String>,
    /// Message shown after an invalid submission.
    pub error_message: Option<String>,
    /// Label of the submit button.
    pub submit_label: Option<String>,
    /// Store a [`FormLog`] for each valid submission.
    pub log_data: bool,
    /// Redirect after a valid submission.
    pub success_redirect: bool,
    /// Show an empty form after a valid submission.
    pub success_clear: bool,
    /// Fill initial values from the query string.
    pub allow_get_initial: bool,
    /// Template source for the mail body.
    pub message_template: Option<String>,
    /// Template used to render the form itself.
    pub form_template_name: Option<String>,
    /// The fields, kept ordered by position.
    pub fields: Vec<FormDefinitionField>,
}

impl Default for FormDefinition {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            title: None,
            action: None,
            mail_to: None,
            mail_from: None,
            mail_subject: None,
            method: FormMethod::Post,
            success_message: None,
            error_message: None,
            submit_label: None,
            log_data: true,
            success_redirect: false,
            success_clear: true,
            allow_get_initial: true,
            message_template: None,
            form_template_name: None,
            fields: Vec::new(),
        }
    }
}

/// Returns the value of an optional text attribute when it is set and
/// not empty.
pub(crate) fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

impl FormDefinition {
    /// Creates a definition with default options.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the title, falling back to the name.
    pub fn display_name(&self) -> &str {
        non_empty(self.title.as_ref()).unwrap_or(&self.name)
    }

    /// Returns the number of fields.
    pub fn count_fields(&self) -> usize {
        self.fields.len()
    }

    /// Returns the field definition with the given name.
    pub fn field(&self, name: &str) -> Option<&FormDefinitionField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Sorts the fields by position, keeping the order of equal positions.
    pub fn sort_fields(&mut self) {
        self.fields.sort_by_key(|f| f.position);
    }

    /// Returns the name of the hidden field marking a submission.
    ///
    /// The settings pattern is filled with the form name; while a field of
    /// that name exists, `_` is appended.
    pub fn submit_flag_name(&self, settings: &FormDesignerSettings) -> String {
        let mut name = settings.submit_flag_name_for(&self.name);
        while self.field(&name).is_some() {
            name.push('_');
        }
        name
    }
}

impl fmt::Display for FormDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One field of a [`FormDefinition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormDefinitionField {
    /// Storage id; `None` until stored.
    pub id: Option<i64>,
    /// Slug used as the input name.
    pub name: String,
    /// Field class identifier such as `forms.EmailField`.
    pub field_class: String,
    /// Whether a value is required.
    pub required: bool,
    /// Initial value. Multi-valued classes take one value per line.
    pub initial: Option<String>,
    /// Label; empty renders no label text.
    pub label: Option<String>,
    /// Widget identifier; empty uses the class default.
    pub widget: String,
    /// Help text.
    pub help_text: Option<String>,
    /// Sort key within the form.
    pub position: i32,
    /// Maximum text length.
    pub max_length: Option<i64>,
    /// Minimum text length.
    pub min_length: Option<i64>,
    /// Maximum numeric value.
    pub max_value: Option<f64>,
    /// Minimum numeric value.
    pub min_value: Option<f64>,
    /// Maximum number of digits of a decimal.
    pub max_digits: Option<i64>,
    /// Maximum number of decimal places.
    pub decimal_places: Option<i64>,
    /// Pattern for regex fields.
    pub regex: Option<String>,
    /// Choice values, one per line.
    pub choice_values: Option<String>,
    /// Choice labels, one per line.
    pub choice_labels: Option<String>,
    /// Registered choice model for model-backed choices.
    pub choice_model: Option<String>,
    /// Label of the empty option of a model choice.
    pub choice_model_empty_label: Option<String>,
    /// Include the value in logs and mails.
    pub include_result: bool,
}

impl Default for FormDefinitionField {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            field_class: "forms.CharField".to_string(),
            required: true,
            initial: None,
            label: None,
            widget: String::new(),
            help_text: None,
            position: 0,
            max_length: None,
            min_length: None,
            max_value: None,
            min_value: None,
            max_digits: None,
            decimal_places: None,
            regex: None,
            choice_values: None,
            choice_labels: None,
            choice_model: None,
            choice_model_empty_label: None,
            include_result: true,
        }
    }
}

impl FormDefinitionField {
    /// Creates a required field of the given class.
    pub fn new(name: impl Into<String>, field_class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_class: field_class.into(),
            ..Self::default()
        }
    }
}

impl fmt::Display for FormDefinitionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(non_empty(self.label.as_ref()).unwrap_or(&self.name))
    }
}

/// One `{name, label, value}` triple of a submission log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Field name.
    pub name: String,
    /// Field label at the time of submission.
    pub label: String,
    /// The cleaned value.
    pub value: serde_json::Value,
}

/// A stored snapshot of one valid submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormLog {
    /// Storage id.
    pub id: i64,
    /// Id of the owning definition.
    pub form_definition_id: i64,
    /// When the submission was logged.
    pub created: DateTime<Utc>,
    /// The submitted data.
    pub data: Vec<LogEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let def = FormDefinition::new("contact");
        assert!(def.log_data);
        assert!(!def.success_redirect);
        assert!(def.success_clear);
        assert!(def.allow_get_initial);
        assert_eq!(def.method, FormMethod::Post);

        let field = FormDefinitionField::new("email", "forms.EmailField");
        assert!(field.required);
        assert!(field.include_result);
        assert_eq!(field.position, 0);
    }

    #[test]
    fn test_display_name() {
        let mut def = FormDefinition::new("contact");
        assert_eq!(def.display_name(), "contact");
        def.title = Some(String::new());
        assert_eq!(def.display_name(), "contact");
        def.title = Some("Contact us".into());
        assert_eq!(def.to_string(), "Contact us");
    }

    #[test]
    fn test_submit_flag_name_avoids_field_names() {
        let settings = FormDesignerSettings::default();
        let mut def = FormDefinition::new("contact");
        assert_eq!(def.submit_flag_name(&settings), "submit__contact");
        def.fields.push(FormDefinitionField::new("submit__contact", "forms.CharField"));
        def.fields.push(FormDefinitionField::new("submit__contact_", "forms.CharField"));
        assert_eq!(def.submit_flag_name(&settings), "submit__contact__");
        assert_eq!(def.count_fields(), 2);
    }

    #[test]
    fn test_sort_fields_is_stable() {
        let mut def = FormDefinition::new("f");
        for (name, pos) in [("c", 2), ("a", 1), ("b", 1)] {
            let mut field = FormDefinitionField::new(name, "forms.CharField");
            field.position = pos;
            def.fields.push(field);
        }
        def.sort_fields();
        let names: Vec<_> = def.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let def: FormDefinition = serde_json::from_str(
            r#"{"name": "poll", "method": "GET", "fields": [{"name": "q", "label": "Question"}]}"#,
        )
        .unwrap();
        assert_eq!(def.method, FormMethod::Get);
        assert!(def.log_data);
        assert_eq!(def.fields[0].field_class, "forms.CharField");
        assert_eq!(def.fields[0].to_string(), "Question");
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("post".parse::<FormMethod>().unwrap(), FormMethod::Post);
        assert!("PUT".parse::<FormMethod>().is_err());
    }
}
