//! HTML widgets.
//!
//! A [`WidgetType`] renders a field's current values as HTML. Widgets are
//! chosen by the field type by default and can be overridden per field
//! definition by identifier (`widgets.Textarea`, `widgets.RadioSelect`, ...).

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use form_designer_template::context::escape_html;

/// Every widget a designed form can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetType {
    /// `<input type="text">`.
    TextInput,
    /// `<input type="number">`.
    NumberInput,
    /// `<input type="email">`.
    EmailInput,
    /// `<input type="url">`.
    UrlInput,
    /// `<input type="password">`. Never echoes its value.
    PasswordInput,
    /// `<input type="hidden">`.
    HiddenInput,
    /// `<textarea>`.
    Textarea,
    /// A single `<input type="checkbox">`.
    CheckboxInput,
    /// `<select>`.
    Select,
    /// `<select multiple>`.
    SelectMultiple,
    /// A list of `<input type="radio">`.
    RadioSelect,
    /// A list of `<input type="checkbox">`.
    CheckboxSelectMultiple,
    /// `<input type="date">`.
    DateInput,
    /// `<input type="datetime-local">`.
    DateTimeInput,
    /// `<input type="time">`.
    TimeInput,
    /// `<input type="file">`.
    FileInput,
}

impl WidgetType {
    /// Resolves a configured widget identifier such as `widgets.Textarea`.
    ///
    /// Only the last dotted segment is significant.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        let class = identifier.rsplit('.').next().unwrap_or(identifier);
        Some(match class {
            "TextInput" => Self::TextInput,
            "NumberInput" => Self::NumberInput,
            "EmailInput" => Self::EmailInput,
            "URLInput" | "UrlInput" => Self::UrlInput,
            "PasswordInput" => Self::PasswordInput,
            "HiddenInput" => Self::HiddenInput,
            "Textarea" => Self::Textarea,
            "CheckboxInput" => Self::CheckboxInput,
            "Select" => Self::Select,
            "SelectMultiple" => Self::SelectMultiple,
            "RadioSelect" => Self::RadioSelect,
            "CheckboxSelectMultiple" => Self::CheckboxSelectMultiple,
            "DateInput" => Self::DateInput,
            "DateTimeInput" => Self::DateTimeInput,
            "TimeInput" => Self::TimeInput,
            "FileInput" | "ClearableFileInput" => Self::FileInput,
            _ => return None,
        })
    }

    /// Returns `true` for widgets rendered without a visible label.
    pub const fn is_hidden(self) -> bool {
        matches!(self, Self::HiddenInput)
    }

    /// Returns `true` for widgets that need a multipart form.
    pub const fn needs_multipart(self) -> bool {
        matches!(self, Self::FileInput)
    }

    /// Returns the `id` a `<label>` should point at. Widgets rendering a
    /// list of inputs point at the first one.
    pub fn id_for_label(self, id: &str) -> String {
        match self {
            Self::RadioSelect | Self::CheckboxSelectMultiple => format!("{id}_0"),
            _ => id.to_string(),
        }
    }

    /// Renders the widget.
    ///
    /// `values` are the current raw values (bound data or initial values);
    /// single-valued widgets use the last one. `choices` are only read by
    /// the choice widgets. Attribute values are escaped; an empty attribute
    /// value renders as a bare boolean attribute.
    pub fn render(
        self,
        name: &str,
        values: &[String],
        choices: &[(String, String)],
        attrs: &BTreeMap<String, String>,
    ) -> String {
        let value = values.last().map_or("", String::as_str);
        let name = escape_html(name);
        let extra = render_attrs(attrs);

        match self {
            Self::TextInput
            | Self::NumberInput
            | Self::EmailInput
            | Self::UrlInput
            | Self::HiddenInput
            | Self::DateInput
            | Self::DateTimeInput
            | Self::TimeInput => {
                format!(
                    r#"<input type="{}" name="{name}"{}{extra}>"#,
                    self.input_type(),
                    value_attr(value)
                )
            }
            Self::PasswordInput | Self::FileInput => {
                format!(r#"<input type="{}" name="{name}"{extra}>"#, self.input_type())
            }
            Self::Textarea => format!(
                r#"<textarea name="{name}" cols="40" rows="10"{extra}>{}</textarea>"#,
                escape_html(value)
            ),
            Self::CheckboxInput => {
                let checked = if is_checked(value) { " checked" } else { "" };
                format!(r#"<input type="checkbox" name="{name}"{extra}{checked}>"#)
            }
            Self::Select | Self::SelectMultiple => {
                let multiple = if self == Self::SelectMultiple {
                    " multiple"
                } else {
                    ""
                };
                let mut out = format!("<select name=\"{name}\"{multiple}{extra}>\n");
                for (choice_value, label) in choices {
                    let selected = if self.is_selected(choice_value, value, values) {
                        " selected"
                    } else {
                        ""
                    };
                    let _ = writeln!(
                        out,
                        r#"<option value="{}"{selected}>{}</option>"#,
                        escape_html(choice_value),
                        escape_html(label)
                    );
                }
                out.push_str("</select>");
                out
            }
            Self::RadioSelect | Self::CheckboxSelectMultiple => {
                let input_type = if self == Self::RadioSelect {
                    "radio"
                } else {
                    "checkbox"
                };
                let base_id = attrs.get("id").cloned();
                let mut out = match &base_id {
                    Some(id) => format!("<ul id=\"{}\">\n", escape_html(id)),
                    None => "<ul>\n".to_string(),
                };
                for (idx, (choice_value, label)) in choices.iter().enumerate() {
                    let mut option_attrs = attrs.clone();
                    if let Some(id) = &base_id {
                        option_attrs.insert("id".to_string(), format!("{id}_{idx}"));
                    }
                    let checked = if self.is_selected(choice_value, value, values) {
                        " checked"
                    } else {
                        ""
                    };
                    let input = format!(
                        r#"<input type="{input_type}" name="{name}" value="{}"{}{checked}>"#,
                        escape_html(choice_value),
                        render_attrs(&option_attrs)
                    );
                    let _ = match &base_id {
                        Some(id) => writeln!(
                            out,
                            r#"<li><label for="{}">{input} {}</label></li>"#,
                            escape_html(&format!("{id}_{idx}")),
                            escape_html(label)
                        ),
                        None => writeln!(out, "<li><label>{input} {}</label></li>", escape_html(label)),
                    };
                }
                out.push_str("</ul>");
                out
            }
        }
    }

    const fn input_type(self) -> &'static str {
        match self {
            Self::NumberInput => "number",
            Self::EmailInput => "email",
            Self::UrlInput => "url",
            Self::PasswordInput => "password",
            Self::HiddenInput => "hidden",
            Self::DateInput => "date",
            Self::DateTimeInput => "datetime-local",
            Self::TimeInput => "time",
            Self::FileInput => "file",
            _ => "text",
        }
    }

    fn is_selected(self, choice: &str, value: &str, values: &[String]) -> bool {
        match self {
            Self::SelectMultiple | Self::CheckboxSelectMultiple => {
                values.iter().any(|v| v == choice)
            }
            _ => value == choice,
        }
    }
}

impl fmt::Display for WidgetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

fn value_attr(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        format!(r#" value="{}""#, escape_html(value))
    }
}

fn is_checked(value: &str) -> bool {
    !value.is_empty() && !matches!(value.to_lowercase().as_str(), "false" | "0" | "off")
}

fn render_attrs(attrs: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (key, value) in attrs {
        if value.is_empty() {
            let _ = write!(out, " {key}");
        } else {
            let _ = write!(out, r#" {key}="{}""#, escape_html(value));
        }
    }
    out
}
