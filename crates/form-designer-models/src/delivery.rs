//! Delivery of valid submissions: result data, message bodies, logs and
//! mails.
//!
//! Only fields defined on the [`FormDefinition`] with `include_result` set
//! take part; the submit flag never does.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use form_designer_core::{FormDesignerError, FormDesignerSettings};
use form_designer_forms::{BaseForm, Value};
use form_designer_mail::{EmailBackend, EmailMessage};
use form_designer_template::builtins;
use form_designer_template::{Context, ContextValue, Engine};

use crate::definition::{non_empty, FormDefinition, FormLog, LogEntry};
use crate::store::FormStore;

/// One `{name, label, value}` entry of the submitted data.
#[derive(Debug, Clone, PartialEq)]
pub struct FormDataEntry {
    /// Field name.
    pub name: String,
    /// Field label.
    pub label: String,
    /// Cleaned value.
    pub value: Value,
}

impl FormDataEntry {
    /// Returns the entry as a template dict with `name`, `label` and `value`.
    pub fn as_context(&self) -> ContextValue {
        let mut map = BTreeMap::new();
        map.insert("name".to_string(), ContextValue::from(self.name.as_str()));
        map.insert("label".to_string(), ContextValue::from(self.label.as_str()));
        map.insert("value".to_string(), ContextValue::from(&self.value));
        ContextValue::Dict(map)
    }

    /// Returns the entry as stored in a [`FormLog`].
    pub fn to_log_entry(&self) -> LogEntry {
        LogEntry {
            name: self.name.clone(),
            label: self.label.clone(),
            value: serde_json::Value::from(&self.value),
        }
    }
}

/// Collects the result data of a validated form, in form order.
pub fn form_data(definition: &FormDefinition, form: &BaseForm) -> Vec<FormDataEntry> {
    form.fields()
        .iter()
        .filter(|field| {
            definition
                .field(&field.name)
                .is_some_and(|record| record.include_result)
        })
        .map(|field| FormDataEntry {
            name: field.name.clone(),
            label: field.label.clone(),
            value: form
                .cleaned_data()
                .get(&field.name)
                .cloned()
                .unwrap_or(Value::Null),
        })
        .collect()
}

/// Maps field names to their values.
pub fn form_data_dict(data: &[FormDataEntry]) -> BTreeMap<String, ContextValue> {
    data.iter()
        .map(|entry| (entry.name.clone(), ContextValue::from(&entry.value)))
        .collect()
}

fn message_context(data: &[FormDataEntry]) -> Context {
    let mut context = Context::from_map(form_data_dict(data));
    context.set(
        "data",
        ContextValue::List(data.iter().map(FormDataEntry::as_context).collect()),
    );
    context
}

/// Renders the mail body for `data`.
///
/// Uses the named `template` if given, else the definition's
/// `message_template`, else the built-in data message. Every value is
/// available under its field name, and the entries as `data`.
///
/// # Errors
///
/// Returns template errors.
pub fn compile_message(
    engine: &Engine,
    definition: &FormDefinition,
    data: &[FormDataEntry],
    template: Option<&str>,
) -> Result<String, FormDesignerError> {
    let mut context = message_context(data);
    if let Some(name) = template {
        return engine.render_to_string(name, &mut context);
    }
    match non_empty(definition.message_template.as_ref()) {
        Some(source) => {
            context.set_auto_escape(false);
            engine.render_string(source, &mut context)
        }
        None => engine.render_to_string(builtins::DATA_MESSAGE, &mut context),
    }
}

/// Expands `text` as a template. Text that does not parse as a template is
/// returned unchanged.
///
/// # Errors
///
/// Returns errors raised while rendering a template that did parse, such as
/// a missing included template.
pub fn string_template_replace(
    engine: &Engine,
    text: &str,
    context: &BTreeMap<String, ContextValue>,
) -> Result<String, FormDesignerError> {
    let mut context = Context::from_map(context.clone());
    context.set_auto_escape(false);
    match engine.render_string(text, &mut context) {
        Err(FormDesignerError::TemplateSyntaxError(message)) => {
            tracing::debug!(%message, "template syntax error, keeping literal text");
            Ok(text.to_string())
        }
        other => other,
    }
}

fn recipient_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*[,;]+\s*").expect("valid regex"))
}

/// Splits a recipient string on `,` and `;`, then expands each recipient
/// as a template. Empty recipients are dropped.
///
/// # Errors
///
/// See [`string_template_replace`].
pub fn expand_recipients(
    engine: &Engine,
    mail_to: &str,
    context: &BTreeMap<String, ContextValue>,
) -> Result<Vec<String>, FormDesignerError> {
    let mut recipients = Vec::new();
    for recipient in recipient_separator().split(mail_to.trim()) {
        let expanded = string_template_replace(engine, recipient, context)?;
        let expanded = expanded.trim();
        if !expanded.is_empty() {
            recipients.push(expanded.to_string());
        }
    }
    Ok(recipients)
}

/// Stores a [`FormLog`] with the result data of `form`.
///
/// # Errors
///
/// Returns `BadRequest` for a definition that was never stored, or the
/// store's error.
pub async fn log(
    store: &dyn FormStore,
    definition: &FormDefinition,
    form: &BaseForm,
) -> Result<FormLog, FormDesignerError> {
    let id = definition.id.ok_or_else(|| {
        FormDesignerError::BadRequest(format!(
            "Form '{}' must be saved before logging",
            definition.name
        ))
    })?;
    let entries = form_data(definition, form)
        .iter()
        .map(FormDataEntry::to_log_entry)
        .collect();
    store.add_log(id, entries).await
}

/// Builds the notification mail for a valid submission.
///
/// Recipients come from `mail_to`, the sender from `mail_from` (the
/// settings default when empty) and the subject from `mail_subject`
/// (the form's display name when empty); all three are expanded with the
/// submitted values.
///
/// # Errors
///
/// Returns template errors from the message body.
pub fn build_mail(
    engine: &Engine,
    settings: &FormDesignerSettings,
    definition: &FormDefinition,
    form: &BaseForm,
) -> Result<EmailMessage, FormDesignerError> {
    let data = form_data(definition, form);
    let body = compile_message(engine, definition, &data, None)?;
    let context = form_data_dict(&data);

    let to = match non_empty(definition.mail_to.as_ref()) {
        Some(mail_to) => expand_recipients(engine, mail_to, &context)?,
        None => Vec::new(),
    };
    let from = match non_empty(definition.mail_from.as_ref()) {
        Some(mail_from) => string_template_replace(engine, mail_from, &context)?,
        None => settings.email.default_from_email.clone(),
    };
    let subject = match non_empty(definition.mail_subject.as_ref()) {
        Some(subject) => string_template_replace(engine, subject, &context)?,
        None => definition.display_name().to_string(),
    };

    Ok(EmailMessage::new(subject, body, from, to))
}

/// Sends the notification mail for a valid submission. Transport errors are
/// returned, not swallowed.
///
/// # Errors
///
/// Returns template errors or the backend's error.
pub async fn send_mail(
    engine: &Engine,
    backend: &dyn EmailBackend,
    settings: &FormDesignerSettings,
    definition: &FormDefinition,
    form: &BaseForm,
) -> Result<EmailMessage, FormDesignerError> {
    let message = build_mail(engine, settings, definition, form)?;
    tracing::debug!(from = %message.from_email, to = ?message.to, "Mail");
    backend.send(&message).await?;
    Ok(message)
}
