//! Bound fields: form fields paired with their current values and errors.
//!
//! A [`BoundField`] is what form templates iterate over. It owns a snapshot
//! of the field definition so it can outlive the form it came from.

use std::collections::BTreeMap;

use form_designer_template::context::escape_html;
use form_designer_template::ContextValue;

use crate::fields::{Choice, FormFieldDef};
use crate::widgets::WidgetType;

/// A form field bound to data and validation state.
#[derive(Debug, Clone)]
pub struct BoundField {
    /// The HTML name attribute.
    pub name: String,
    /// Human-readable label.
    pub label: String,
    /// Help text.
    pub help_text: String,
    /// Whether the field is required.
    pub required: bool,
    /// The widget used for rendering.
    pub widget: WidgetType,
    /// Current raw values: submitted data when bound, initial values otherwise.
    pub values: Vec<String>,
    /// Validation error messages.
    pub errors: Vec<String>,
    /// Choices offered by the widget.
    pub choices: Vec<Choice>,
}

impl BoundField {
    /// Creates a bound field from a definition and its current state.
    pub fn new(field: &FormFieldDef, values: Vec<String>, errors: Vec<String>) -> Self {
        Self {
            name: field.name.clone(),
            label: field.label.clone(),
            help_text: field.help_text.clone(),
            required: field.required,
            widget: field.widget,
            values,
            errors,
            choices: field.field_type.widget_choices(),
        }
    }

    /// Returns the auto-generated HTML `id`.
    pub fn auto_id(&self) -> String {
        format!("id_{}", self.name)
    }

    /// Returns `true` if the field is rendered without a label.
    pub const fn is_hidden(&self) -> bool {
        self.widget.is_hidden()
    }

    /// Renders the widget HTML.
    pub fn render(&self) -> String {
        let mut attrs = BTreeMap::new();
        attrs.insert("id".to_string(), self.auto_id());
        // Browsers would refuse to submit an unchecked required choice list.
        if self.required
            && !matches!(
                self.widget,
                WidgetType::CheckboxSelectMultiple | WidgetType::HiddenInput
            )
        {
            attrs.insert("required".to_string(), String::new());
        }
        self.widget
            .render(&self.name, &self.values, &self.choices, &attrs)
    }

    /// Renders a `<label>` element. The `:` suffix is left out for an empty
    /// label.
    pub fn label_tag(&self) -> String {
        let suffix = if self.label.is_empty() { "" } else { ":" };
        format!(
            r#"<label for="{}">{}{suffix}</label>"#,
            escape_html(&self.widget.id_for_label(&self.auto_id())),
            escape_html(&self.label)
        )
    }

    /// Renders the error list as `<ul class="errorlist">`, or nothing.
    pub fn errors_as_ul(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        let items: String = self
            .errors
            .iter()
            .map(|e| format!("<li>{}</li>", escape_html(e)))
            .collect();
        format!(r#"<ul class="errorlist">{items}</ul>"#)
    }

    /// Returns the template representation of this field.
    pub fn as_context(&self) -> ContextValue {
        let mut map = BTreeMap::new();
        map.insert("name".to_string(), ContextValue::from(self.name.as_str()));
        map.insert("html_name".to_string(), ContextValue::from(self.name.as_str()));
        map.insert("label".to_string(), ContextValue::from(self.label.as_str()));
        map.insert(
            "label_tag".to_string(),
            ContextValue::SafeString(self.label_tag()),
        );
        map.insert("widget".to_string(), ContextValue::SafeString(self.render()));
        map.insert(
            "help_text".to_string(),
            ContextValue::from(self.help_text.as_str()),
        );
        map.insert(
            "errors".to_string(),
            ContextValue::List(
                self.errors
                    .iter()
                    .map(|e| ContextValue::from(e.as_str()))
                    .collect(),
            ),
        );
        map.insert("is_hidden".to_string(), ContextValue::Bool(self.is_hidden()));
        map.insert("required".to_string(), ContextValue::Bool(self.required));
        map.insert(
            "id_for_label".to_string(),
            ContextValue::from(self.widget.id_for_label(&self.auto_id()).as_str()),
        );
        map.insert(
            "value".to_string(),
            self.values
                .last()
                .map_or(ContextValue::None, |v| ContextValue::from(v.as_str())),
        );
        ContextValue::Dict(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FormFieldType;

    fn field() -> FormFieldDef {
        FormFieldDef::new(
            "email",
            FormFieldType::Email {
                min_length: None,
                max_length: None,
            },
        )
        .label("E-Mail <work>")
        .help_text("We reply here.")
    }

    #[test]
    fn test_render_sets_id_and_required() {
        let bf = BoundField::new(&field(), vec!["a@b.ch".into()], vec![]);
        assert_eq!(
            bf.render(),
            r#"<input type="email" name="email" value="a@b.ch" id="id_email" required>"#
        );
    }

    #[test]
    fn test_optional_field_is_not_required() {
        let bf = BoundField::new(&field().required(false), vec![], vec![]);
        assert!(!bf.render().contains("required"));
    }

    #[test]
    fn test_label_tag_escapes() {
        let bf = BoundField::new(&field(), vec![], vec![]);
        assert_eq!(
            bf.label_tag(),
            r#"<label for="id_email">E-Mail &lt;work&gt;:</label>"#
        );
    }

    #[test]
    fn test_label_for_radio_points_at_first_option() {
        let f = FormFieldDef::new(
            "topic",
            FormFieldType::Choice {
                choices: vec![("a".into(), "A".into())],
            },
        )
        .widget(WidgetType::RadioSelect);
        let bf = BoundField::new(&f, vec![], vec![]);
        assert!(bf.label_tag().contains(r#"for="id_topic_0""#));
    }

    #[test]
    fn test_errors_as_ul() {
        let bf = BoundField::new(&field(), vec![], vec!["Bad <value>".into()]);
        assert_eq!(
            bf.errors_as_ul(),
            r#"<ul class="errorlist"><li>Bad &lt;value&gt;</li></ul>"#
        );
        let clean = BoundField::new(&field(), vec![], vec![]);
        assert_eq!(clean.errors_as_ul(), "");
    }

    #[test]
    fn test_as_context() {
        let bf = BoundField::new(&field(), vec!["x".into()], vec!["oops".into()]);
        let ctx = bf.as_context();
        assert_eq!(
            ctx.resolve_path("value"),
            Some(&ContextValue::from("x"))
        );
        assert!(matches!(
            ctx.resolve_path("widget"),
            Some(ContextValue::SafeString(_))
        ));
        assert_eq!(ctx.resolve_path("errors").and_then(ContextValue::len), Some(1));
    }
}
