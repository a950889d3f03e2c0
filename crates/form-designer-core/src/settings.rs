//! Settings for form-designer.
//!
//! [`FormDesignerSettings`] holds the choice lists offered to administrators
//! (field classes, widgets, form templates), the submit flag pattern, and the
//! mail, storage, template and server configuration. Defaults reproduce a
//! working setup with a local `SQLite` file and an SMTP relay on localhost.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A `(value, human label)` pair offered as a choice in the admin.
pub type Choice = (String, String);

fn choices(pairs: &[(&str, &str)]) -> Vec<Choice> {
    pairs
        .iter()
        .map(|(value, label)| ((*value).to_string(), (*label).to_string()))
        .collect()
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Path of the `SQLite` database file, or `:memory:`.
    pub path: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("form_designer.sqlite3"),
        }
    }
}

/// Outgoing mail configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSettings {
    /// The backend to use: `smtp`, `console`, `file` or `memory`.
    pub backend: String,
    /// The SMTP host.
    pub host: String,
    /// The SMTP port.
    pub port: u16,
    /// Optional SMTP username.
    pub username: Option<String>,
    /// Optional SMTP password.
    pub password: Option<String>,
    /// Whether to require TLS for SMTP.
    pub use_tls: bool,
    /// Directory used by the `file` backend.
    pub file_path: PathBuf,
    /// Sender used when a form has no sender address of its own.
    pub default_from_email: String,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            backend: "smtp".to_string(),
            host: "localhost".to_string(),
            port: 25,
            username: None,
            password: None,
            use_tls: false,
            file_path: PathBuf::from("sent_mail"),
            default_from_email: "webmaster@localhost".to_string(),
        }
    }
}

/// The complete set of form-designer settings.
///
/// # Examples
///
/// ```
/// use form_designer_core::settings::FormDesignerSettings;
///
/// let settings = FormDesignerSettings::default();
/// assert_eq!(settings.submit_flag_name_for("contact"), "submit__contact");
/// assert!(settings.is_field_class("forms.RegexField"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormDesignerSettings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode is enabled.
    pub debug: bool,
    /// The log level filter (e.g. "info", "form_designer=debug").
    pub log_level: String,
    /// Address the HTTP server binds to.
    pub bind: String,

    // ── Field configuration ──────────────────────────────────────────

    /// Field classes administrators may choose from.
    pub field_classes: Vec<Choice>,
    /// Widget overrides administrators may choose from. The empty value
    /// means "default widget for the field class".
    pub widget_classes: Vec<Choice>,
    /// Form templates administrators may choose from.
    pub form_templates: Vec<Choice>,
    /// Template used when a form has no template of its own.
    pub default_form_template: String,
    /// Pattern for the hidden submit flag; `{}` is replaced by the form name.
    pub submit_flag_name: String,
    /// Restricts the models offered for model-backed choice fields.
    /// `None` means any registered model may be named.
    pub choice_model_choices: Option<Vec<Choice>>,
    /// Static choice models available to model-backed choice fields, keyed
    /// by model identifier (`shop.Country`). Each entry lists `(key, label)`
    /// records.
    pub choice_models: BTreeMap<String, Vec<Choice>>,

    // ── Messages ─────────────────────────────────────────────────────

    /// Message shown after a successful submission when the form has none.
    pub default_success_message: String,
    /// Message shown after a failed submission when the form has none.
    pub default_error_message: String,

    // ── Templates ────────────────────────────────────────────────────

    /// Directories searched for templates before the built-in ones.
    pub template_dirs: Vec<PathBuf>,

    // ── Storage & mail ───────────────────────────────────────────────

    /// Database configuration.
    pub database: DatabaseSettings,
    /// Mail configuration.
    pub email: EmailSettings,
}

impl Default for FormDesignerSettings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            bind: "127.0.0.1:8000".to_string(),

            field_classes: choices(&[
                ("forms.CharField", "Text"),
                ("forms.EmailField", "E-mail address"),
                ("forms.URLField", "Web address"),
                ("forms.IntegerField", "Number"),
                ("forms.DecimalField", "Decimal number"),
                ("forms.BooleanField", "Yes/No"),
                ("forms.DateField", "Date"),
                ("forms.DateTimeField", "Date & time"),
                ("forms.TimeField", "Time"),
                ("forms.ChoiceField", "Choice"),
                ("forms.MultipleChoiceField", "Multiple Choice"),
                ("forms.ModelChoiceField", "Model Choice"),
                ("forms.ModelMultipleChoiceField", "Model Multiple Choice"),
                ("forms.RegexField", "Regex"),
                ("forms.FileField", "File"),
            ]),
            widget_classes: choices(&[
                ("", "Default"),
                ("widgets.Textarea", "Text area"),
                ("widgets.PasswordInput", "Password input"),
                ("widgets.HiddenInput", "Hidden input"),
                ("widgets.RadioSelect", "Radio button"),
                ("widgets.CheckboxSelectMultiple", "Checkbox"),
            ]),
            form_templates: choices(&[
                ("", "Default"),
                ("html/formdefinition/forms/as_p.html", "as paragraphs"),
                ("html/formdefinition/forms/as_table.html", "as table"),
                (
                    "html/formdefinition/forms/as_table_h.html",
                    "as table (horizontal)",
                ),
                ("html/formdefinition/forms/as_ul.html", "as list"),
            ]),
            default_form_template: "html/formdefinition/forms/as_p.html".to_string(),
            submit_flag_name: "submit__{}".to_string(),
            choice_model_choices: None,
            choice_models: BTreeMap::new(),

            default_success_message: "Thank you, the data was submitted successfully."
                .to_string(),
            default_error_message: "The data could not be submitted, please try again."
                .to_string(),

            template_dirs: Vec::new(),

            database: DatabaseSettings::default(),
            email: EmailSettings::default(),
        }
    }
}

impl FormDesignerSettings {
    /// Returns the submit flag name for a form, before collision handling.
    pub fn submit_flag_name_for(&self, form_name: &str) -> String {
        self.submit_flag_name.replace("{}", form_name)
    }

    /// Returns `true` if `identifier` is one of the configured field classes.
    pub fn is_field_class(&self, identifier: &str) -> bool {
        self.field_classes.iter().any(|(value, _)| value == identifier)
    }

    /// Returns `true` if `identifier` is one of the configured widgets.
    pub fn is_widget_class(&self, identifier: &str) -> bool {
        self.widget_classes.iter().any(|(value, _)| value == identifier)
    }

    /// Returns `true` if `name` is one of the configured form templates.
    pub fn is_form_template(&self, name: &str) -> bool {
        self.form_templates.iter().any(|(value, _)| value == name)
    }

    /// Returns `true` if `model` may be used for model-backed choices.
    pub fn is_choice_model_allowed(&self, model: &str) -> bool {
        self.choice_model_choices
            .as_ref()
            .map_or(true, |allowed| allowed.iter().any(|(value, _)| value == model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = FormDesignerSettings::default();
        assert!(settings.debug);
        assert_eq!(settings.field_classes.len(), 15);
        assert_eq!(
            settings.default_form_template,
            "html/formdefinition/forms/as_p.html"
        );
        assert_eq!(settings.email.port, 25);
    }

    #[test]
    fn test_submit_flag_name_for() {
        let settings = FormDesignerSettings::default();
        assert_eq!(settings.submit_flag_name_for("newsletter"), "submit__newsletter");
    }

    #[test]
    fn test_choice_lookups() {
        let settings = FormDesignerSettings::default();
        assert!(settings.is_field_class("forms.ChoiceField"));
        assert!(!settings.is_field_class("forms.SplitDateTimeField"));
        assert!(settings.is_widget_class(""));
        assert!(settings.is_widget_class("widgets.Textarea"));
        assert!(settings.is_form_template("html/formdefinition/forms/as_table.html"));
    }

    #[test]
    fn test_choice_model_restriction() {
        let mut settings = FormDesignerSettings::default();
        assert!(settings.is_choice_model_allowed("shop.Product"));
        settings.choice_model_choices =
            Some(vec![("shop.Country".to_string(), "Country".to_string())]);
        assert!(settings.is_choice_model_allowed("shop.Country"));
        assert!(!settings.is_choice_model_allowed("shop.Product"));
    }

    #[test]
    fn test_settings_serde_roundtrip() {
        let settings = FormDesignerSettings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let back: FormDesignerSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.widget_classes, settings.widget_classes);
    }
}
