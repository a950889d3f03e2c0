//! The `check` command.
//!
//! Validates the settings and every stored form definition, and reports
//! problems that would otherwise surface only when a form is requested.

use async_trait::async_trait;

use form_designer_core::FormDesignerError;
use form_designer_models::build_form;
use form_designer_views::admin::check_definition;
use form_designer_views::FormServices;

use crate::command::ManagementCommand;

/// Runs the configuration checks.
pub struct CheckCommand;

/// The result of a single check.
#[derive(Debug, Clone)]
pub struct CheckMessage {
    /// Severity.
    pub level: CheckLevel,
    /// What is wrong.
    pub msg: String,
    /// How to fix it.
    pub hint: Option<String>,
    /// Identifier such as `forms.E001`.
    pub id: String,
}

/// Severity of a check result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckLevel {
    /// May indicate a problem.
    Warning,
    /// Must be fixed.
    Error,
}

impl std::fmt::Display for CheckLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

impl CheckMessage {
    fn new(level: CheckLevel, id: &str, msg: impl Into<String>, hint: Option<&str>) -> Self {
        Self {
            level,
            msg: msg.into(),
            hint: hint.map(str::to_string),
            id: id.to_string(),
        }
    }
}

/// Checks the settings and all stored definitions.
pub async fn run_checks(services: &FormServices) -> Result<Vec<CheckMessage>, FormDesignerError> {
    let settings = &services.settings;
    let mut messages = Vec::new();

    if services
        .engine
        .get_template(&settings.default_form_template)
        .is_err()
    {
        messages.push(CheckMessage::new(
            CheckLevel::Error,
            "settings.E001",
            format!(
                "Default form template '{}' cannot be loaded",
                settings.default_form_template
            ),
            Some("Set default_form_template to one of the form_templates"),
        ));
    }
    if !settings.submit_flag_name.contains("{}") {
        messages.push(CheckMessage::new(
            CheckLevel::Warning,
            "settings.W001",
            "submit_flag_name does not contain '{}'",
            Some("Without the form name every form shares one submit flag"),
        ));
    }
    for (model, _) in settings.choice_model_choices.iter().flatten() {
        if !services.registry.contains(model) {
            messages.push(CheckMessage::new(
                CheckLevel::Warning,
                "settings.W002",
                format!("Choice model '{model}' is allowed but not registered"),
                Some("Add its records under choice_models"),
            ));
        }
    }

    for definition in services.store.list_definitions().await? {
        if let Err(err) = check_definition(&definition, settings) {
            for (attr, errors) in err.messages_by_field() {
                for error in errors {
                    messages.push(CheckMessage::new(
                        CheckLevel::Error,
                        "forms.E001",
                        format!("{}: {attr}: {error}", definition.name),
                        None,
                    ));
                }
            }
        }
        if let Err(err) = build_form(&definition, &services.registry, settings, None) {
            messages.push(CheckMessage::new(
                CheckLevel::Error,
                "forms.E002",
                format!("{}: {err}", definition.name),
                None,
            ));
        }
        if let Some(template) = definition.form_template_name.as_deref().filter(|t| !t.is_empty()) {
            if services.engine.get_template(template).is_err() {
                messages.push(CheckMessage::new(
                    CheckLevel::Error,
                    "forms.E003",
                    format!("{}: form template '{template}' cannot be loaded", definition.name),
                    None,
                ));
            }
        }
    }

    Ok(messages)
}

#[async_trait]
impl ManagementCommand for CheckCommand {
    fn name(&self) -> &'static str {
        "check"
    }

    fn help(&self) -> &'static str {
        "Checks the settings and stored form definitions"
    }

    async fn handle(
        &self,
        _matches: &clap::ArgMatches,
        services: &FormServices,
    ) -> Result<(), FormDesignerError> {
        services.store.migrate().await?;
        let messages = run_checks(services).await?;

        if messages.is_empty() {
            tracing::info!("System check identified no issues");
            return Ok(());
        }

        let errors = messages
            .iter()
            .filter(|m| m.level == CheckLevel::Error)
            .count();
        for msg in &messages {
            let hint = msg
                .hint
                .as_ref()
                .map_or(String::new(), |h| format!("\n\tHINT: {h}"));
            tracing::warn!("{} ({}): {}{}", msg.level, msg.id, msg.msg, hint);
        }
        tracing::info!(
            "System check identified {} issue(s) ({} error(s))",
            messages.len(),
            errors
        );

        if errors > 0 {
            return Err(FormDesignerError::ConfigurationError(format!(
                "System check found {errors} error(s)"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use form_designer_core::FormDesignerSettings;
    use form_designer_models::{FormDefinition, FormDefinitionField};

    use super::*;

    #[tokio::test]
    async fn test_defaults_have_no_issues() {
        let (services, _) = FormServices::in_memory(FormDesignerSettings::default());
        assert!(run_checks(&services).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_settings_problems() {
        let settings = FormDesignerSettings {
            default_form_template: "missing.html".into(),
            submit_flag_name: "submit".into(),
            choice_model_choices: Some(vec![("topics".into(), "Topics".into())]),
            ..FormDesignerSettings::default()
        };
        let (services, _) = FormServices::in_memory(settings);
        let ids: Vec<_> = run_checks(&services)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, ["settings.E001", "settings.W001", "settings.W002"]);
    }

    #[tokio::test]
    async fn test_broken_definition_is_reported() {
        let (services, _) = FormServices::in_memory(FormDesignerSettings::default());
        let mut def = FormDefinition::new("broken");
        def.fields
            .push(FormDefinitionField::new("code", "forms.RegexField"));
        services.store.create_definition(&def).await.unwrap();

        let messages = run_checks(&services).await.unwrap();
        assert!(messages.iter().any(|m| m.id == "forms.E001"
            && m.msg == "broken: fields[0].regex: This field class requires a regular expression."));
        assert!(messages.iter().any(|m| m.id == "forms.E002"));
        assert!(messages.iter().all(|m| m.level == CheckLevel::Error));
    }
}
