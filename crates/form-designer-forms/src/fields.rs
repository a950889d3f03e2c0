//! Form field definitions and type-level validation.
//!
//! Each [`FormFieldDef`] describes one input: its [`FormFieldType`] with the
//! type's constraints, whether it is required, its label, help text, initial
//! values and widget. [`clean_field_value`] turns the raw submitted strings
//! into a typed [`Value`] or a list of error messages.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use form_designer_core::FormDesignerError;

use crate::value::Value;
use crate::widgets::WidgetType;

/// A `(value, label)` choice.
pub type Choice = (String, String);

/// The type of a form field together with its type-specific constraints.
#[derive(Debug, Clone)]
pub enum FormFieldType {
    /// Free text.
    Char {
        /// Minimum length in characters.
        min_length: Option<usize>,
        /// Maximum length in characters.
        max_length: Option<usize>,
    },
    /// An e-mail address.
    Email {
        /// Minimum length in characters.
        min_length: Option<usize>,
        /// Maximum length in characters.
        max_length: Option<usize>,
    },
    /// Text that must match a regular expression.
    Regex {
        /// The compiled pattern, searched anywhere in the value.
        regex: Regex,
        /// Minimum length in characters.
        min_length: Option<usize>,
        /// Maximum length in characters.
        max_length: Option<usize>,
    },
    /// An absolute URL. A missing scheme defaults to `http://`.
    Url,
    /// A whole number.
    Integer {
        /// Smallest accepted value.
        min_value: Option<i64>,
        /// Largest accepted value.
        max_value: Option<i64>,
    },
    /// A decimal number.
    Decimal {
        /// Smallest accepted value.
        min_value: Option<f64>,
        /// Largest accepted value.
        max_value: Option<f64>,
        /// Maximum number of digits in total.
        max_digits: Option<u32>,
        /// Maximum number of digits after the decimal point.
        decimal_places: Option<u32>,
    },
    /// A checkbox.
    Boolean,
    /// A calendar date.
    Date,
    /// A date and time.
    DateTime,
    /// A time of day.
    Time,
    /// One value from a fixed list.
    Choice {
        /// Available choices.
        choices: Vec<Choice>,
    },
    /// Any number of values from a fixed list.
    MultipleChoice {
        /// Available choices.
        choices: Vec<Choice>,
    },
    /// One record of a registered choice model. The cleaned value is the
    /// record's label.
    ModelChoice {
        /// Records as `(key, label)`.
        choices: Vec<Choice>,
        /// Label of the leading empty option; `None` renders no empty option.
        empty_label: Option<String>,
    },
    /// Any number of records of a registered choice model.
    ModelMultipleChoice {
        /// Records as `(key, label)`.
        choices: Vec<Choice>,
    },
    /// An uploaded file, recorded by its file name.
    File,
}

impl FormFieldType {
    /// Builds a [`FormFieldType::Regex`], compiling `pattern`.
    ///
    /// # Errors
    ///
    /// Returns `ImproperlyConfigured` if the pattern does not compile.
    pub fn regex(
        pattern: &str,
        min_length: Option<usize>,
        max_length: Option<usize>,
    ) -> Result<Self, FormDesignerError> {
        let regex = Regex::new(pattern).map_err(|e| {
            FormDesignerError::ImproperlyConfigured(format!(
                "Invalid regular expression '{pattern}': {e}"
            ))
        })?;
        Ok(Self::Regex {
            regex,
            min_length,
            max_length,
        })
    }

    /// Returns `true` for types that accept several submitted values.
    pub const fn is_multi_valued(&self) -> bool {
        matches!(
            self,
            Self::MultipleChoice { .. } | Self::ModelMultipleChoice { .. }
        )
    }

    /// Returns the choices a widget should offer, including the empty option
    /// of a model choice field.
    pub fn widget_choices(&self) -> Vec<Choice> {
        match self {
            Self::Choice { choices }
            | Self::MultipleChoice { choices }
            | Self::ModelMultipleChoice { choices } => choices.clone(),
            Self::ModelChoice {
                choices,
                empty_label,
            } => empty_label
                .iter()
                .map(|label| (String::new(), label.clone()))
                .chain(choices.iter().cloned())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Returns the widget used when a field does not override it.
    pub const fn default_widget(&self) -> WidgetType {
        match self {
            Self::Char { .. } | Self::Regex { .. } => WidgetType::TextInput,
            Self::Email { .. } => WidgetType::EmailInput,
            Self::Url => WidgetType::UrlInput,
            Self::Integer { .. } | Self::Decimal { .. } => WidgetType::NumberInput,
            Self::Boolean => WidgetType::CheckboxInput,
            Self::Date => WidgetType::DateInput,
            Self::DateTime => WidgetType::DateTimeInput,
            Self::Time => WidgetType::TimeInput,
            Self::Choice { .. } | Self::ModelChoice { .. } => WidgetType::Select,
            Self::MultipleChoice { .. } | Self::ModelMultipleChoice { .. } => {
                WidgetType::SelectMultiple
            }
            Self::File => WidgetType::FileInput,
        }
    }
}

/// Complete definition of a form field.
#[derive(Debug, Clone)]
pub struct FormFieldDef {
    /// The field name (HTML `name` attribute).
    pub name: String,
    /// The field type and its constraints.
    pub field_type: FormFieldType,
    /// Whether a value must be submitted.
    pub required: bool,
    /// Initial raw values shown by an unbound form.
    pub initial: Vec<String>,
    /// Human-readable label.
    pub label: String,
    /// Help text shown next to the widget.
    pub help_text: String,
    /// The widget used for rendering.
    pub widget: WidgetType,
}

impl FormFieldDef {
    /// Creates a required field with the type's default widget. The label
    /// defaults to the name with underscores replaced by spaces, first
    /// letter capitalized.
    pub fn new(name: impl Into<String>, field_type: FormFieldType) -> Self {
        let name = name.into();
        let widget = field_type.default_widget();
        Self {
            label: pretty_name(&name),
            name,
            field_type,
            required: true,
            initial: Vec::new(),
            help_text: String::new(),
            widget,
        }
    }

    /// Sets whether this field is required.
    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets a single initial value.
    #[must_use]
    pub fn initial(mut self, value: impl Into<String>) -> Self {
        self.initial = vec![value.into()];
        self
    }

    /// Sets all initial values (multi-valued fields).
    #[must_use]
    pub fn initial_values(mut self, values: Vec<String>) -> Self {
        self.initial = values;
        self
    }

    /// Sets the label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    /// Sets the widget.
    #[must_use]
    pub const fn widget(mut self, widget: WidgetType) -> Self {
        self.widget = widget;
        self
    }
}

fn pretty_name(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

const REQUIRED: &str = "This field is required.";

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,}$")
            .expect("valid regex")
    })
}

/// Cleans the raw submitted values of one field.
///
/// Single-valued fields read the last submitted value; multi-valued fields
/// read them all. Text is trimmed before validation. Returns the typed value,
/// or every error message that applies.
pub fn clean_field_value(field: &FormFieldDef, raw_values: &[String]) -> Result<Value, Vec<String>> {
    if field.field_type.is_multi_valued() {
        return clean_multiple(field, raw_values);
    }

    let raw = raw_values.last().map_or("", |v| v.trim());

    if let FormFieldType::Boolean = field.field_type {
        let checked = !raw.is_empty() && !matches!(raw.to_lowercase().as_str(), "false" | "0");
        if field.required && !checked {
            return Err(vec![REQUIRED.to_string()]);
        }
        return Ok(Value::Bool(checked));
    }

    if raw.is_empty() {
        if field.required {
            return Err(vec![REQUIRED.to_string()]);
        }
        return Ok(match field.field_type {
            FormFieldType::Char { .. }
            | FormFieldType::Email { .. }
            | FormFieldType::Regex { .. }
            | FormFieldType::Url
            | FormFieldType::Choice { .. } => Value::String(String::new()),
            _ => Value::Null,
        });
    }

    let mut errors = Vec::new();
    let value = match &field.field_type {
        FormFieldType::Char {
            min_length,
            max_length,
        } => {
            check_length(raw, *min_length, *max_length, &mut errors);
            Value::String(raw.to_string())
        }
        FormFieldType::Email {
            min_length,
            max_length,
        } => {
            if !email_regex().is_match(raw) {
                errors.push("Enter a valid email address.".to_string());
            }
            check_length(raw, *min_length, *max_length, &mut errors);
            Value::String(raw.to_string())
        }
        FormFieldType::Regex {
            regex,
            min_length,
            max_length,
        } => {
            if !regex.is_match(raw) {
                errors.push("Enter a valid value.".to_string());
            }
            check_length(raw, *min_length, *max_length, &mut errors);
            Value::String(raw.to_string())
        }
        FormFieldType::Url => match clean_url(raw) {
            Some(url) => Value::String(url),
            None => return Err(vec!["Enter a valid URL.".to_string()]),
        },
        FormFieldType::Integer {
            min_value,
            max_value,
        } => {
            let Ok(n) = raw.parse::<i64>() else {
                return Err(vec!["Enter a whole number.".to_string()]);
            };
            check_range(n, *min_value, *max_value, &mut errors);
            Value::Int(n)
        }
        FormFieldType::Decimal {
            min_value,
            max_value,
            max_digits,
            decimal_places,
        } => {
            let Some(n) = parse_decimal(raw) else {
                return Err(vec!["Enter a number.".to_string()]);
            };
            check_range(n, *min_value, *max_value, &mut errors);
            check_digits(raw, *max_digits, *decimal_places, &mut errors);
            Value::Decimal(raw.trim_start_matches('+').to_string())
        }
        FormFieldType::Boolean => unreachable!("booleans are cleaned above"),
        FormFieldType::Date => match parse_date(raw) {
            Some(d) => Value::Date(d),
            None => return Err(vec!["Enter a valid date.".to_string()]),
        },
        FormFieldType::DateTime => match parse_datetime(raw) {
            Some(dt) => Value::DateTime(dt),
            None => return Err(vec!["Enter a valid date/time.".to_string()]),
        },
        FormFieldType::Time => match parse_time(raw) {
            Some(t) => Value::Time(t),
            None => return Err(vec!["Enter a valid time.".to_string()]),
        },
        FormFieldType::Choice { choices } => {
            if !choices.iter().any(|(v, _)| v == raw) {
                return Err(vec![invalid_choice(raw)]);
            }
            Value::String(raw.to_string())
        }
        FormFieldType::ModelChoice { choices, .. } => {
            let Some((_, label)) = choices.iter().find(|(key, _)| key == raw) else {
                return Err(vec![
                    "Select a valid choice. That choice is not one of the available choices."
                        .to_string(),
                ]);
            };
            Value::String(label.clone())
        }
        FormFieldType::MultipleChoice { .. } | FormFieldType::ModelMultipleChoice { .. } => {
            unreachable!("multi-valued fields are cleaned above")
        }
        FormFieldType::File => Value::String(raw.to_string()),
    };

    if errors.is_empty() {
        Ok(value)
    } else {
        Err(errors)
    }
}

fn clean_multiple(field: &FormFieldDef, raw_values: &[String]) -> Result<Value, Vec<String>> {
    let selected: Vec<&str> = raw_values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect();

    if selected.is_empty() {
        if field.required {
            return Err(vec![REQUIRED.to_string()]);
        }
        return Ok(Value::List(Vec::new()));
    }

    let (FormFieldType::MultipleChoice { choices } | FormFieldType::ModelMultipleChoice { choices }) =
        &field.field_type
    else {
        return Err(vec![REQUIRED.to_string()]);
    };
    let by_model = matches!(field.field_type, FormFieldType::ModelMultipleChoice { .. });

    let mut values = Vec::with_capacity(selected.len());
    let mut errors = Vec::new();
    for raw in selected {
        match choices.iter().find(|(key, _)| key == raw) {
            Some((key, label)) => {
                values.push(Value::String(if by_model { label } else { key }.clone()));
            }
            None => errors.push(invalid_choice(raw)),
        }
    }

    if errors.is_empty() {
        Ok(Value::List(values))
    } else {
        Err(errors)
    }
}

fn invalid_choice(raw: &str) -> String {
    format!("Select a valid choice. {raw} is not one of the available choices.")
}

fn check_length(s: &str, min: Option<usize>, max: Option<usize>, errors: &mut Vec<String>) {
    let len = s.chars().count();
    if let Some(min) = min {
        if len < min {
            errors.push(format!(
                "Ensure this value has at least {min} characters (it has {len})."
            ));
        }
    }
    if let Some(max) = max {
        if len > max {
            errors.push(format!(
                "Ensure this value has at most {max} characters (it has {len})."
            ));
        }
    }
}

fn check_range<T>(n: T, min: Option<T>, max: Option<T>, errors: &mut Vec<String>)
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if let Some(min) = min {
        if n < min {
            errors.push(format!(
                "Ensure this value is greater than or equal to {min}."
            ));
        }
    }
    if let Some(max) = max {
        if n > max {
            errors.push(format!("Ensure this value is less than or equal to {max}."));
        }
    }
}

fn parse_decimal(raw: &str) -> Option<f64> {
    let unsigned = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    let valid = !unsigned.is_empty()
        && unsigned != "."
        && unsigned.chars().all(|c| c.is_ascii_digit() || c == '.')
        && unsigned.matches('.').count() <= 1;
    if valid {
        raw.parse::<f64>().ok()
    } else {
        None
    }
}

fn check_digits(
    raw: &str,
    max_digits: Option<u32>,
    decimal_places: Option<u32>,
    errors: &mut Vec<String>,
) {
    let unsigned = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let whole = whole.trim_start_matches('0');
    let fraction = fraction.trim_end_matches('0');
    let digits = whole.len() + fraction.len();

    if let Some(max) = max_digits {
        if digits > max as usize {
            errors.push(format!(
                "Ensure that there are no more than {max} digits in total."
            ));
        }
    }
    if let Some(places) = decimal_places {
        if fraction.len() > places as usize {
            errors.push(format!(
                "Ensure that there are no more than {places} decimal places."
            ));
        }
    }
    if let (Some(max), Some(places)) = (max_digits, decimal_places) {
        let whole_max = max.saturating_sub(places);
        if whole.len() > whole_max as usize && digits <= max as usize {
            errors.push(format!(
                "Ensure that there are no more than {whole_max} digits before the decimal point."
            ));
        }
    }
}

fn clean_url(raw: &str) -> Option<String> {
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    let parsed = url::Url::parse(&candidate).ok()?;
    let scheme_ok = matches!(parsed.scheme(), "http" | "https" | "ftp" | "ftps");
    let host_ok = parsed
        .host_str()
        .is_some_and(|h| h.contains('.') || h == "localhost");
    (scheme_ok && host_ok).then_some(candidate)
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"];
const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| parse_date(raw).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
}
