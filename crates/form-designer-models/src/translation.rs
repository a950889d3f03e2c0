//! Translation of stored field records into form fields.
//!
//! The field class identifier selects the [`FormFieldType`]; only the
//! constraint attributes of that class are read. Model-backed choice fields
//! look their records up in a [`ChoiceModelRegistry`].

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use form_designer_core::settings::Choice;
use form_designer_core::{FormDesignerError, FormDesignerSettings};
use form_designer_forms::{FormFieldDef, FormFieldType, WidgetType};

use crate::definition::{non_empty, FormDefinitionField};

/// Supplies the records of a choice model as `(key, label)` pairs.
pub trait ChoiceSource: Send + Sync {
    /// Returns the current records.
    fn choices(&self) -> Vec<Choice>;
}

impl ChoiceSource for Vec<Choice> {
    fn choices(&self) -> Vec<Choice> {
        self.clone()
    }
}

/// The choice models model-backed fields may name.
#[derive(Clone, Default)]
pub struct ChoiceModelRegistry {
    models: BTreeMap<String, Arc<dyn ChoiceSource>>,
}

impl ChoiceModelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the static `choice_models` of the settings.
    pub fn from_settings(settings: &FormDesignerSettings) -> Self {
        let mut registry = Self::new();
        for (name, records) in &settings.choice_models {
            registry.register(name.clone(), Arc::new(records.clone()));
        }
        registry
    }

    /// Registers or replaces a model.
    pub fn register(&mut self, name: impl Into<String>, source: Arc<dyn ChoiceSource>) {
        self.models.insert(name.into(), source);
    }

    /// Returns the source registered under `name`.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ChoiceSource>> {
        self.models.get(name)
    }

    /// Returns `true` if a model is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Returns the registered model names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for ChoiceModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.models.keys()).finish()
    }
}

/// Everything needed to construct a form field from a stored record.
#[derive(Debug, Clone)]
pub struct FieldInitArgs {
    /// Whether a value is required.
    pub required: bool,
    /// Label, empty if unset.
    pub label: String,
    /// Initial value, `None` if unset or empty.
    pub initial: Option<String>,
    /// Help text, empty if unset.
    pub help_text: String,
    /// Field type with the class-specific constraints.
    pub field_type: FormFieldType,
    /// Widget overriding the class default.
    pub widget: Option<WidgetType>,
}

fn line_split_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\n\s*").expect("valid regex"))
}

/// Splits newline-delimited text, trimming whitespace around each line.
pub fn split_lines(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    line_split_regex()
        .split(text)
        .map(str::to_string)
        .collect()
}

fn to_usize(value: Option<i64>) -> Option<usize> {
    value.and_then(|v| usize::try_from(v).ok())
}

fn to_u32(value: Option<i64>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

#[allow(clippy::cast_possible_truncation)]
fn to_int(value: Option<f64>) -> Option<i64> {
    value.map(|v| v.trunc() as i64)
}

fn configuration_error(message: impl Into<String>) -> FormDesignerError {
    FormDesignerError::ImproperlyConfigured(message.into())
}

impl FormDefinitionField {
    /// Returns the class name without its module path (`EmailField` for
    /// `forms.EmailField`).
    pub fn field_class_name(&self) -> &str {
        self.field_class
            .rsplit('.')
            .next()
            .unwrap_or(&self.field_class)
    }

    /// Returns `true` for classes that accept several values.
    pub fn is_multi_valued(&self) -> bool {
        matches!(
            self.field_class_name(),
            "MultipleChoiceField" | "ModelMultipleChoiceField"
        )
    }

    /// Returns the `(value, label)` choices from `choice_values` and
    /// `choice_labels`. A missing label falls back to the value.
    pub fn choices(&self) -> Vec<Choice> {
        let values = self
            .choice_values
            .as_deref()
            .map(split_lines)
            .unwrap_or_default();
        let labels = self
            .choice_labels
            .as_deref()
            .map(split_lines)
            .unwrap_or_default();
        values
            .into_iter()
            .enumerate()
            .map(|(idx, value)| {
                let label = labels.get(idx).cloned().unwrap_or_else(|| value.clone());
                (value, label)
            })
            .collect()
    }

    fn model_choices(&self, registry: &ChoiceModelRegistry) -> Result<Vec<Choice>, FormDesignerError> {
        let model = non_empty(self.choice_model.as_ref())
            .ok_or_else(|| configuration_error("This field class requires a model."))?;
        let source = registry
            .get(model)
            .ok_or_else(|| configuration_error(format!("Unknown choice model '{model}'.")))?;
        Ok(source.choices())
    }

    /// Collects the constructor arguments for this field.
    ///
    /// # Errors
    ///
    /// Returns `ImproperlyConfigured` for an unknown field class or widget, a
    /// regex field without a (valid) pattern, or a model choice field without
    /// a registered model.
    pub fn form_field_init_args(
        &self,
        registry: &ChoiceModelRegistry,
    ) -> Result<FieldInitArgs, FormDesignerError> {
        let min_length = to_usize(self.min_length);
        let max_length = to_usize(self.max_length);

        let field_type = match self.field_class_name() {
            "CharField" => FormFieldType::Char {
                min_length,
                max_length,
            },
            "EmailField" => FormFieldType::Email {
                min_length,
                max_length,
            },
            "RegexField" => {
                let pattern = non_empty(self.regex.as_ref()).ok_or_else(|| {
                    configuration_error("This field class requires a regular expression.")
                })?;
                FormFieldType::regex(pattern, min_length, max_length)?
            }
            "URLField" => FormFieldType::Url,
            "IntegerField" => FormFieldType::Integer {
                min_value: to_int(self.min_value),
                max_value: to_int(self.max_value),
            },
            "DecimalField" => FormFieldType::Decimal {
                min_value: self.min_value,
                max_value: self.max_value,
                max_digits: to_u32(self.max_digits),
                decimal_places: to_u32(self.decimal_places),
            },
            "BooleanField" => FormFieldType::Boolean,
            "DateField" => FormFieldType::Date,
            "DateTimeField" => FormFieldType::DateTime,
            "TimeField" => FormFieldType::Time,
            "ChoiceField" => FormFieldType::Choice {
                choices: self.choices(),
            },
            "MultipleChoiceField" => FormFieldType::MultipleChoice {
                choices: self.choices(),
            },
            "ModelChoiceField" => FormFieldType::ModelChoice {
                choices: self.model_choices(registry)?,
                empty_label: self.choice_model_empty_label.clone(),
            },
            "ModelMultipleChoiceField" => FormFieldType::ModelMultipleChoice {
                choices: self.model_choices(registry)?,
            },
            "FileField" => FormFieldType::File,
            other => {
                return Err(configuration_error(format!(
                    "Unknown field class '{other}'."
                )))
            }
        };

        let widget = if self.widget.is_empty() {
            None
        } else {
            Some(WidgetType::from_identifier(&self.widget).ok_or_else(|| {
                configuration_error(format!("Unknown widget '{}'.", self.widget))
            })?)
        };

        Ok(FieldInitArgs {
            required: self.required,
            label: self.label.clone().unwrap_or_default(),
            initial: non_empty(self.initial.as_ref()).map(str::to_string),
            help_text: self.help_text.clone().unwrap_or_default(),
            field_type,
            widget,
        })
    }

    /// Builds the form field for this record.
    ///
    /// # Errors
    ///
    /// See [`FormDefinitionField::form_field_init_args`].
    pub fn form_field(&self, registry: &ChoiceModelRegistry) -> Result<FormFieldDef, FormDesignerError> {
        let args = self.form_field_init_args(registry)?;
        let initial = match &args.initial {
            Some(text) if self.is_multi_valued() => split_lines(text),
            Some(text) => vec![text.clone()],
            None => Vec::new(),
        };
        let mut field = FormFieldDef::new(self.name.clone(), args.field_type)
            .required(args.required)
            .label(args.label)
            .help_text(args.help_text)
            .initial_values(initial);
        if let Some(widget) = args.widget {
            field = field.widget(widget);
        }
        Ok(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(class: &str) -> FormDefinitionField {
        let mut f = FormDefinitionField::new("f", class);
        f.max_length = Some(20);
        f.min_length = Some(2);
        f.max_value = Some(9.7);
        f.min_value = Some(1.2);
        f.max_digits = Some(5);
        f.decimal_places = Some(2);
        f.regex = Some(r"^\d+$".into());
        f.choice_values = Some("a\nb".into());
        f
    }

    fn registry() -> ChoiceModelRegistry {
        let mut registry = ChoiceModelRegistry::new();
        registry.register(
            "geo.Country",
            Arc::new(vec![
                ("1".to_string(), "Switzerland".to_string()),
                ("2".to_string(), "Austria".to_string()),
            ]),
        );
        registry
    }

    #[test]
    fn test_char_field_takes_only_lengths() {
        let args = field("forms.CharField").form_field_init_args(&registry()).unwrap();
        assert!(matches!(
            args.field_type,
            FormFieldType::Char {
                min_length: Some(2),
                max_length: Some(20)
            }
        ));
        assert_eq!(args.widget, None);
    }

    #[test]
    fn test_integer_truncates_bounds() {
        let args = field("forms.IntegerField").form_field_init_args(&registry()).unwrap();
        assert!(matches!(
            args.field_type,
            FormFieldType::Integer {
                min_value: Some(1),
                max_value: Some(9)
            }
        ));
    }

    #[test]
    fn test_decimal_keeps_float_bounds() {
        let args = field("forms.DecimalField").form_field_init_args(&registry()).unwrap();
        match args.field_type {
            FormFieldType::Decimal {
                min_value,
                max_value,
                max_digits,
                decimal_places,
            } => {
                assert_eq!(min_value, Some(1.2));
                assert_eq!(max_value, Some(9.7));
                assert_eq!(max_digits, Some(5));
                assert_eq!(decimal_places, Some(2));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_irrelevant_attributes_are_ignored() {
        let args = field("forms.BooleanField").form_field_init_args(&registry()).unwrap();
        assert!(matches!(args.field_type, FormFieldType::Boolean));
        let args = field("forms.URLField").form_field_init_args(&registry()).unwrap();
        assert!(matches!(args.field_type, FormFieldType::Url));
    }

    #[test]
    fn test_common_args() {
        let mut f = FormDefinitionField::new("email", "forms.EmailField");
        f.required = false;
        f.initial = Some(String::new());
        f.help_text = Some("Work address".into());
        let args = f.form_field_init_args(&registry()).unwrap();
        assert!(!args.required);
        assert_eq!(args.label, "");
        assert_eq!(args.initial, None);
        assert_eq!(args.help_text, "Work address");
    }

    #[test]
    fn test_regex_field_requires_pattern() {
        let mut f = field("forms.RegexField");
        assert!(f.form_field_init_args(&registry()).is_ok());
        f.regex = None;
        assert!(matches!(
            f.form_field_init_args(&registry()),
            Err(FormDesignerError::ImproperlyConfigured(_))
        ));
        f.regex = Some("(".into());
        assert!(f.form_field_init_args(&registry()).is_err());
    }

    #[test]
    fn test_choices_split_and_label_fallback() {
        let mut f = FormDefinitionField::new("topic", "forms.ChoiceField");
        f.choice_values = Some(" s \n  t\r\nu ".into());
        f.choice_labels = Some("Sales\nTech".into());
        assert_eq!(
            f.choices(),
            vec![
                ("s".to_string(), "Sales".to_string()),
                ("t".to_string(), "Tech".to_string()),
                ("u".to_string(), "u".to_string()),
            ]
        );
    }

    #[test]
    fn test_model_choice() {
        let mut f = FormDefinitionField::new("country", "forms.ModelChoiceField");
        assert!(f.form_field_init_args(&registry()).is_err());
        f.choice_model = Some("geo.Country".into());
        f.choice_model_empty_label = Some("Pick one".into());
        let args = f.form_field_init_args(&registry()).unwrap();
        match args.field_type {
            FormFieldType::ModelChoice {
                choices,
                empty_label,
            } => {
                assert_eq!(choices.len(), 2);
                assert_eq!(empty_label.as_deref(), Some("Pick one"));
            }
            other => panic!("unexpected {other:?}"),
        }
        f.choice_model = Some("geo.City".into());
        assert!(f.form_field_init_args(&registry()).is_err());
    }

    #[test]
    fn test_widget_override() {
        let mut f = FormDefinitionField::new("topic", "forms.ChoiceField");
        f.widget = "widgets.RadioSelect".into();
        let built = f.form_field(&registry()).unwrap();
        assert_eq!(built.widget, WidgetType::RadioSelect);
        f.widget = "widgets.Nope".into();
        assert!(f.form_field(&registry()).is_err());
    }

    #[test]
    fn test_unknown_class() {
        assert!(matches!(
            FormDefinitionField::new("x", "forms.SplitDateTimeField").form_field(&registry()),
            Err(FormDesignerError::ImproperlyConfigured(_))
        ));
    }

    #[test]
    fn test_multi_valued_initial_is_split() {
        let mut f = FormDefinitionField::new("topics", "forms.MultipleChoiceField");
        f.choice_values = Some("a\nb".into());
        f.initial = Some("a\nb".into());
        assert_eq!(f.form_field(&registry()).unwrap().initial, vec!["a", "b"]);
    }

    #[test]
    fn test_registry_from_settings() {
        let mut settings = FormDesignerSettings::default();
        settings
            .choice_models
            .insert("geo.Country".into(), vec![("ch".into(), "Switzerland".into())]);
        let registry = ChoiceModelRegistry::from_settings(&settings);
        assert!(registry.contains("geo.Country"));
        assert_eq!(registry.names().collect::<Vec<_>>(), ["geo.Country"]);
    }
}
