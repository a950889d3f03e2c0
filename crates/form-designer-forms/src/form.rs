//! [`BaseForm`]: an ordered list of fields that binds, validates and renders.
//!
//! A form is either unbound (rendering initial values) or bound to submitted
//! data. Calling [`BaseForm::is_valid`] on a bound form cleans every field and
//! fills [`BaseForm::errors`] and [`BaseForm::cleaned_data`].

use std::collections::BTreeMap;
use std::fmt::Write;

use form_designer_core::QueryDict;
use form_designer_template::context::escape_html;
use form_designer_template::ContextValue;

use crate::bound_field::BoundField;
use crate::fields::{clean_field_value, FormFieldDef};
use crate::value::Value;

/// Key under which form-level errors are stored.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// A general-purpose form built from field definitions.
///
/// # Examples
///
/// ```
/// use form_designer_core::QueryDict;
/// use form_designer_forms::{BaseForm, FormFieldDef, FormFieldType};
///
/// let mut form = BaseForm::new(vec![FormFieldDef::new(
///     "name",
///     FormFieldType::Char { min_length: None, max_length: Some(20) },
/// )]);
/// form.bind(&QueryDict::parse("name=Ann"));
/// assert!(form.is_valid());
/// assert_eq!(form.cleaned_data()["name"].to_string(), "Ann");
/// ```
#[derive(Debug, Clone, Default)]
pub struct BaseForm {
    fields: Vec<FormFieldDef>,
    initial: BTreeMap<String, Vec<String>>,
    bound: bool,
    data: BTreeMap<String, Vec<String>>,
    errors: BTreeMap<String, Vec<String>>,
    cleaned_data: BTreeMap<String, Value>,
}

impl BaseForm {
    /// Creates an unbound form.
    pub fn new(fields: Vec<FormFieldDef>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    /// Sets initial values that take precedence over the field definitions'
    /// own initial values.
    #[must_use]
    pub fn with_initial(mut self, initial: BTreeMap<String, Vec<String>>) -> Self {
        self.initial = initial;
        self
    }

    /// Binds submitted data, discarding previous validation results.
    pub fn bind(&mut self, data: &QueryDict) {
        self.bound = true;
        self.errors.clear();
        self.cleaned_data.clear();
        self.data = self
            .fields
            .iter()
            .filter_map(|field| {
                data.get_list(&field.name)
                    .map(|values| (field.name.clone(), values.clone()))
            })
            .collect();
    }

    /// Returns `true` once data has been bound.
    pub const fn is_bound(&self) -> bool {
        self.bound
    }

    /// Cleans every field. Returns `false` for unbound forms.
    pub fn is_valid(&mut self) -> bool {
        if !self.bound {
            return false;
        }
        self.errors.clear();
        self.cleaned_data.clear();

        for field in &self.fields {
            let raw = self.data.get(&field.name).map_or(&[][..], Vec::as_slice);
            match clean_field_value(field, raw) {
                Ok(value) => {
                    self.cleaned_data.insert(field.name.clone(), value);
                }
                Err(errors) => {
                    self.errors.insert(field.name.clone(), errors);
                }
            }
        }
        self.errors.is_empty()
    }

    /// Returns the field definitions in order.
    pub fn fields(&self) -> &[FormFieldDef] {
        &self.fields
    }

    /// Returns the field definition with the given name.
    pub fn field(&self, name: &str) -> Option<&FormFieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns per-field errors. Form-level errors live under
    /// [`NON_FIELD_ERRORS`].
    pub const fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    /// Returns the cleaned values of the fields that validated.
    pub const fn cleaned_data(&self) -> &BTreeMap<String, Value> {
        &self.cleaned_data
    }

    /// Records an error; `None` records a form-level error. A field with an
    /// error is dropped from the cleaned data.
    pub fn add_error(&mut self, field: Option<&str>, message: impl Into<String>) {
        let key = field.unwrap_or(NON_FIELD_ERRORS).to_string();
        self.cleaned_data.remove(&key);
        self.errors.entry(key).or_default().push(message.into());
    }

    /// Returns the form-level errors.
    pub fn non_field_errors(&self) -> &[String] {
        self.errors.get(NON_FIELD_ERRORS).map_or(&[], Vec::as_slice)
    }

    /// Returns bound fields in order.
    pub fn bound_fields(&self) -> Vec<BoundField> {
        self.fields
            .iter()
            .map(|field| {
                let values = if self.bound {
                    self.data.get(&field.name).cloned().unwrap_or_default()
                } else {
                    self.initial
                        .get(&field.name)
                        .cloned()
                        .unwrap_or_else(|| field.initial.clone())
                };
                let errors = self.errors.get(&field.name).cloned().unwrap_or_default();
                BoundField::new(field, values, errors)
            })
            .collect()
    }

    /// Returns the bound fields rendered with a label.
    pub fn visible_fields(&self) -> Vec<BoundField> {
        self.bound_fields()
            .into_iter()
            .filter(|f| !f.is_hidden())
            .collect()
    }

    /// Returns the bound fields rendered without a label.
    pub fn hidden_fields(&self) -> Vec<BoundField> {
        self.bound_fields()
            .into_iter()
            .filter(BoundField::is_hidden)
            .collect()
    }

    /// Returns `true` if any widget needs `multipart/form-data`.
    pub fn is_multipart(&self) -> bool {
        self.fields.iter().any(|f| f.widget.needs_multipart())
    }

    /// Renders the fields as paragraphs.
    pub fn as_p(&self) -> String {
        self.render_rows(|out, field| {
            let _ = writeln!(
                out,
                "{}<p>{} {}{}</p>",
                field.errors_as_ul(),
                field.label_tag(),
                field.render(),
                help_text(field, "")
            );
        })
    }

    /// Renders the fields as table rows (without the `<table>` element).
    pub fn as_table(&self) -> String {
        self.render_rows(|out, field| {
            let _ = writeln!(
                out,
                "<tr><th>{}</th><td>{}{}{}</td></tr>",
                field.label_tag(),
                field.errors_as_ul(),
                field.render(),
                help_text(field, "<br>")
            );
        })
    }

    /// Renders the fields as list items (without the `<ul>` element).
    pub fn as_ul(&self) -> String {
        self.render_rows(|out, field| {
            let _ = writeln!(
                out,
                "<li>{}{} {}{}</li>",
                field.errors_as_ul(),
                field.label_tag(),
                field.render(),
                help_text(field, "")
            );
        })
    }

    fn render_rows(&self, mut row: impl FnMut(&mut String, &BoundField)) -> String {
        let mut out = String::new();
        let non_field = self.non_field_errors();
        if !non_field.is_empty() {
            let items: String = non_field
                .iter()
                .map(|e| format!("<li>{}</li>", escape_html(e)))
                .collect();
            let _ = writeln!(out, r#"<ul class="errorlist nonfield">{items}</ul>"#);
        }
        let mut hidden = String::new();
        for field in self.bound_fields() {
            if field.is_hidden() {
                hidden.push_str(&field.render());
            } else {
                row(&mut out, &field);
            }
        }
        out.push_str(&hidden);
        out
    }

    /// Returns the template representation of this form.
    pub fn as_context(&self) -> ContextValue {
        let to_list = |fields: Vec<BoundField>| {
            ContextValue::List(fields.iter().map(BoundField::as_context).collect())
        };
        let errors: BTreeMap<String, ContextValue> = self
            .errors
            .iter()
            .map(|(k, v)| (k.clone(), ContextValue::from(v.clone())))
            .collect();

        let mut map = BTreeMap::new();
        map.insert("fields".to_string(), to_list(self.bound_fields()));
        map.insert("visible_fields".to_string(), to_list(self.visible_fields()));
        map.insert("hidden_fields".to_string(), to_list(self.hidden_fields()));
        map.insert(
            "non_field_errors".to_string(),
            ContextValue::from(self.non_field_errors().to_vec()),
        );
        map.insert("errors".to_string(), ContextValue::Dict(errors));
        map.insert("is_bound".to_string(), ContextValue::Bool(self.bound));
        map.insert(
            "is_multipart".to_string(),
            ContextValue::Bool(self.is_multipart()),
        );
        map.insert("as_p".to_string(), ContextValue::SafeString(self.as_p()));
        map.insert(
            "as_table".to_string(),
            ContextValue::SafeString(self.as_table()),
        );
        map.insert("as_ul".to_string(), ContextValue::SafeString(self.as_ul()));
        ContextValue::Dict(map)
    }
}

fn help_text(field: &BoundField, separator: &str) -> String {
    if field.help_text.is_empty() {
        String::new()
    } else {
        format!(
            r#"{separator}<span class="helptext">{}</span>"#,
            escape_html(&field.help_text)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FormFieldType;
    use crate::widgets::WidgetType;

    fn contact_form() -> BaseForm {
        BaseForm::new(vec![
            FormFieldDef::new(
                "name",
                FormFieldType::Char {
                    min_length: None,
                    max_length: Some(10),
                },
            ),
            FormFieldDef::new(
                "age",
                FormFieldType::Integer {
                    min_value: Some(0),
                    max_value: None,
                },
            )
            .required(false),
            FormFieldDef::new(
                "topics",
                FormFieldType::MultipleChoice {
                    choices: vec![("a".into(), "A".into()), ("b".into(), "B".into())],
                },
            )
            .required(false),
            FormFieldDef::new("submit__contact", FormFieldType::Boolean)
                .required(false)
                .initial("1")
                .widget(WidgetType::HiddenInput),
        ])
    }

    #[test]
    fn test_unbound_form_is_invalid() {
        let mut form = contact_form();
        assert!(!form.is_bound());
        assert!(!form.is_valid());
    }

    #[test]
    fn test_valid_submission() {
        let mut form = contact_form();
        form.bind(&QueryDict::parse("name=Ann&age=30&topics=a&topics=b"));
        assert!(form.is_valid());
        let data = form.cleaned_data();
        assert_eq!(data["name"], Value::String("Ann".into()));
        assert_eq!(data["age"], Value::Int(30));
        assert_eq!(data["topics"].to_string(), "a, b");
        assert_eq!(data["submit__contact"], Value::Bool(false));
    }

    #[test]
    fn test_invalid_submission_collects_errors() {
        let mut form = contact_form();
        form.bind(&QueryDict::parse("age=-1"));
        assert!(!form.is_valid());
        assert_eq!(form.errors()["name"], vec!["This field is required."]);
        assert_eq!(
            form.errors()["age"],
            vec!["Ensure this value is greater than or equal to 0."]
        );
        assert!(!form.cleaned_data().contains_key("age"));
    }

    #[test]
    fn test_add_error() {
        let mut form = contact_form();
        form.bind(&QueryDict::parse("name=Ann"));
        assert!(form.is_valid());
        form.add_error(None, "Try again later.");
        form.add_error(Some("name"), "Taken.");
        assert_eq!(form.non_field_errors(), ["Try again later."]);
        assert!(!form.cleaned_data().contains_key("name"));
        assert!(form.as_p().contains("errorlist nonfield"));
    }

    #[test]
    fn test_initial_values() {
        let mut initial = BTreeMap::new();
        initial.insert("name".to_string(), vec!["Bob".to_string()]);
        let form = contact_form().with_initial(initial);
        let fields = form.bound_fields();
        assert_eq!(fields[0].values, vec!["Bob"]);
        assert_eq!(fields[3].values, vec!["1"]);
    }

    #[test]
    fn test_hidden_fields_are_split_out() {
        let form = contact_form();
        assert_eq!(form.visible_fields().len(), 3);
        assert_eq!(form.hidden_fields().len(), 1);
        let html = form.as_p();
        assert!(html.contains(r#"<p><label for="id_name">Name:</label> <input type="text" name="name" id="id_name" required></p>"#));
        assert!(html.ends_with(r#"<input type="hidden" name="submit__contact" value="1" id="id_submit__contact">"#));
    }

    #[test]
    fn test_bound_form_renders_submitted_values() {
        let mut form = contact_form();
        form.bind(&QueryDict::parse("name=%3Cb%3E"));
        form.is_valid();
        let html = form.as_ul();
        assert!(html.contains(r#"value="&lt;b&gt;""#));
    }

    #[test]
    fn test_as_context() {
        let mut form = contact_form();
        form.bind(&QueryDict::parse("age=x"));
        form.is_valid();
        let ctx = form.as_context();
        assert_eq!(ctx.resolve_path("is_bound"), Some(&ContextValue::Bool(true)));
        assert_eq!(ctx.resolve_path("visible_fields").and_then(ContextValue::len), Some(3));
        let errors = ctx.resolve_path("errors").unwrap();
        assert!(errors.resolve_path("age").is_some());
        assert!(!form.is_multipart());
    }
}
