//! The form view: binds, validates and delivers a designed form.
//!
//! [`process_form`] decides whether a request is a submission, validates it,
//! and on success logs and mails the data. It returns a [`ProcessedForm`]
//! that either asks for a redirect or carries everything a template needs
//! to render the page.

use std::collections::BTreeMap;

use http::Method;

use form_designer_core::{FormDesignerError, QueryDict};
use form_designer_forms::BaseForm;
use form_designer_models::{build_form, delivery, FormDefinition};
use form_designer_template::{Context, ContextValue};

use crate::services::FormServices;

/// The parts of an HTTP request the form view looks at.
#[derive(Debug, Clone)]
pub struct FormRequest {
    /// Request method.
    pub method: Method,
    /// Request path, used as the last redirect fallback.
    pub path: String,
    /// Parsed query string.
    pub query: QueryDict,
    /// Parsed form-encoded body. Empty for requests without one.
    pub body: QueryDict,
    /// Value of the `Referer` header.
    pub referer: Option<String>,
}

impl FormRequest {
    /// A GET request for `path` with the given query string.
    pub fn get(path: impl Into<String>, query: &str) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: QueryDict::parse(query),
            body: QueryDict::new(),
            referer: None,
        }
    }

    /// A POST request for `path` with a form-encoded body.
    pub fn post(path: impl Into<String>, body: &str) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            query: QueryDict::new(),
            body: QueryDict::parse(body),
            referer: None,
        }
    }

    /// Sets the `Referer`.
    #[must_use]
    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Returns the submitted data if this request carries `flag`.
    fn submitted_data(&self, flag: &str) -> Option<&QueryDict> {
        if self.method == Method::POST && self.body.contains_key(flag) {
            Some(&self.body)
        } else if self.method == Method::GET && self.query.contains_key(flag) {
            Some(&self.query)
        } else {
            None
        }
    }
}

/// Outcome of [`process_form`].
#[derive(Debug, Clone)]
pub struct ProcessedForm {
    /// Success or error message, if any.
    pub message: Option<String>,
    /// The submission failed validation.
    pub form_error: bool,
    /// The submission was valid and delivered.
    pub form_success: bool,
    /// The form to render: bound after an invalid submission, fresh
    /// otherwise.
    pub form: BaseForm,
    /// The processed definition.
    pub form_definition: FormDefinition,
    /// Template used to render the form.
    pub form_template: String,
    /// Where to send the client instead of rendering a page.
    pub redirect: Option<String>,
}

impl ProcessedForm {
    /// Builds the template context for the page.
    pub fn context(&self) -> Context {
        let mut context = Context::new();
        context.set(
            "message",
            self.message
                .as_deref()
                .map_or(ContextValue::None, ContextValue::from),
        );
        context.set("form_error", ContextValue::Bool(self.form_error));
        context.set("form_success", ContextValue::Bool(self.form_success));
        context.set("form", self.form.as_context());
        context.set(
            "form_definition",
            definition_context(&self.form_definition),
        );
        context.set("form_template", ContextValue::from(self.form_template.as_str()));
        context
    }
}

/// The definition as a template value, with `display_name` added.
pub fn definition_context(definition: &FormDefinition) -> ContextValue {
    let mut map = match serde_json::to_value(definition).map(ContextValue::from) {
        Ok(ContextValue::Dict(map)) => map,
        _ => BTreeMap::new(),
    };
    map.insert(
        "display_name".to_string(),
        ContextValue::from(definition.display_name()),
    );
    ContextValue::Dict(map)
}

/// Processes one request against a definition.
///
/// A request is a submission when a POST body or a GET query carries the
/// definition's submit flag. A valid submission is logged when `log_data`
/// is set and mailed when `mail_to` is set; afterwards the client is
/// redirected (to the `Referer`, else the form's `action`, else the request
/// path) when `success_redirect` is set and the form is not embedded.
///
/// # Errors
///
/// Returns `ImproperlyConfigured` for broken field definitions, and storage,
/// template or mail transport errors from delivery.
pub async fn process_form(
    services: &FormServices,
    definition: &FormDefinition,
    request: &FormRequest,
    is_embedded: bool,
) -> Result<ProcessedForm, FormDesignerError> {
    let settings = &services.settings;
    let flag = definition.submit_flag_name(settings);
    let form_template = definition
        .form_template_name
        .clone()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| settings.default_form_template.clone());

    let mut result = ProcessedForm {
        message: None,
        form_error: false,
        form_success: false,
        form: BaseForm::default(),
        form_definition: definition.clone(),
        form_template,
        redirect: None,
    };

    let Some(data) = request.submitted_data(&flag) else {
        let initial = definition.allow_get_initial.then_some(&request.query);
        result.form = build_form(definition, &services.registry, settings, initial)?;
        return Ok(result);
    };

    let mut form = build_form(definition, &services.registry, settings, None)?;
    form.bind(data);

    if !form.is_valid() {
        tracing::debug!(form = %definition.name, errors = ?form.errors(), "invalid submission");
        result.form_error = true;
        result.message = Some(
            non_empty(definition.error_message.as_deref())
                .unwrap_or(&settings.default_error_message)
                .to_string(),
        );
        result.form = form;
        return Ok(result);
    }

    if definition.log_data {
        delivery::log(services.store.as_ref(), definition, &form).await?;
    }
    if non_empty(definition.mail_to.as_deref()).is_some() {
        delivery::send_mail(
            &services.engine,
            services.mail.as_ref(),
            settings,
            definition,
            &form,
        )
        .await?;
    }
    tracing::info!(form = %definition.name, "form submitted");

    result.form_success = true;
    result.message = Some(
        non_empty(definition.success_message.as_deref())
            .unwrap_or(&settings.default_success_message)
            .to_string(),
    );

    if definition.success_redirect && !is_embedded {
        let target = request
            .referer
            .as_deref()
            .and_then(|r| non_empty(Some(r)))
            .or_else(|| non_empty(definition.action.as_deref()))
            .unwrap_or(&request.path);
        result.redirect = Some(target.to_string());
    }

    result.form = if definition.success_clear {
        build_form(definition, &services.registry, settings, None)?
    } else {
        form
    };
    Ok(result)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use form_designer_core::FormDesignerSettings;
    use form_designer_mail::InMemoryBackend;
    use form_designer_models::FormDefinitionField;

    use super::*;

    async fn setup(configure: impl FnOnce(&mut FormDefinition)) -> (FormServices, InMemoryBackend, FormDefinition) {
        let (services, outbox) = FormServices::in_memory(FormDesignerSettings::default());
        let mut def = FormDefinition::new("contact");
        def.title = Some("Contact".into());
        let mut name = FormDefinitionField::new("name", "forms.CharField");
        name.label = Some("Name".into());
        def.fields.push(name);
        configure(&mut def);
        let def = services.store.create_definition(&def).await.unwrap();
        (services, outbox, def)
    }

    #[tokio::test]
    async fn test_plain_get_is_not_a_submission() {
        let (services, _, def) = setup(|_| {}).await;
        let result = process_form(&services, &def, &FormRequest::get("/contact/", "name=Ann"), false)
            .await
            .unwrap();
        assert!(!result.form_success && !result.form_error);
        assert!(result.message.is_none());
        assert!(!result.form.is_bound());
        assert!(result.form.as_p().contains(r#"value="Ann""#));
        assert_eq!(result.form_template, "html/formdefinition/forms/as_p.html");
    }

    #[tokio::test]
    async fn test_initial_from_query_can_be_disabled() {
        let (services, _, def) = setup(|d| d.allow_get_initial = false).await;
        let result = process_form(&services, &def, &FormRequest::get("/contact/", "name=Ann"), false)
            .await
            .unwrap();
        assert!(!result.form.as_p().contains("Ann"));
    }

    #[tokio::test]
    async fn test_invalid_submission() {
        let (services, outbox, def) = setup(|d| d.mail_to = Some("a@example.com".into())).await;
        let request = FormRequest::post("/contact/", "submit__contact=1");
        let result = process_form(&services, &def, &request, false).await.unwrap();
        assert!(result.form_error);
        assert_eq!(
            result.message.as_deref(),
            Some("The data could not be submitted, please try again.")
        );
        assert!(result.form.is_bound());
        assert!(services.store.list_logs(def.id.unwrap()).await.unwrap().is_empty());
        assert_eq!(outbox.message_count().await, 0);
    }

    #[tokio::test]
    async fn test_valid_submission_logs_and_mails() {
        let (services, outbox, def) = setup(|d| {
            d.mail_to = Some("a@example.com".into());
            d.success_message = Some("Thanks!".into());
        })
        .await;
        let request = FormRequest::post("/contact/", "name=Ann&submit__contact=1");
        let result = process_form(&services, &def, &request, false).await.unwrap();

        assert!(result.form_success);
        assert_eq!(result.message.as_deref(), Some("Thanks!"));
        assert!(result.redirect.is_none());
        assert!(!result.form.is_bound());

        let logs = services.store.list_logs(def.id.unwrap()).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].data[0].value, serde_json::json!("Ann"));
        assert_eq!(outbox.messages().await[0].body, "Name: Ann\n");
    }

    #[tokio::test]
    async fn test_post_flag_in_query_is_ignored() {
        let (services, _, def) = setup(|_| {}).await;
        let mut request = FormRequest::post("/contact/", "name=Ann");
        request.query = QueryDict::parse("submit__contact=1");
        let result = process_form(&services, &def, &request, false).await.unwrap();
        assert!(!result.form_success && !result.form_error);
    }

    #[tokio::test]
    async fn test_get_submission() {
        let (services, _, def) = setup(|d| d.log_data = false).await;
        let request = FormRequest::get("/contact/", "name=Ann&submit__contact=1");
        let result = process_form(&services, &def, &request, false).await.unwrap();
        assert!(result.form_success);
        assert!(services.store.list_logs(def.id.unwrap()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_redirect_targets() {
        let (services, _, def) = setup(|d| d.success_redirect = true).await;
        let body = "name=Ann&submit__contact=1";

        let request = FormRequest::post("/contact/", body).referer("/from/");
        let result = process_form(&services, &def, &request, false).await.unwrap();
        assert_eq!(result.redirect.as_deref(), Some("/from/"));

        let request = FormRequest::post("/contact/", body);
        let result = process_form(&services, &def, &request, false).await.unwrap();
        assert_eq!(result.redirect.as_deref(), Some("/contact/"));

        let result = process_form(&services, &def, &request, true).await.unwrap();
        assert!(result.redirect.is_none());

        let mut with_action = def.clone();
        with_action.action = Some("/thanks/".into());
        let result = process_form(&services, &with_action, &request, false)
            .await
            .unwrap();
        assert_eq!(result.redirect.as_deref(), Some("/thanks/"));
    }

    #[tokio::test]
    async fn test_keep_data_after_success() {
        let (services, _, def) = setup(|d| d.success_clear = false).await;
        let request = FormRequest::post("/contact/", "name=Ann&submit__contact=1");
        let result = process_form(&services, &def, &request, false).await.unwrap();
        assert!(result.form.is_bound());
        assert!(result.form.as_p().contains(r#"value="Ann""#));
    }

    #[tokio::test]
    async fn test_context_keys() {
        let (services, _, mut def) = setup(|_| {}).await;
        def.form_template_name = Some("html/formdefinition/forms/as_ul.html".into());
        let result = process_form(&services, &def, &FormRequest::get("/contact/", ""), false)
            .await
            .unwrap();
        let context = result.context();
        assert_eq!(
            context.get("form_template").and_then(ContextValue::as_str),
            Some("html/formdefinition/forms/as_ul.html")
        );
        let definition = context.get("form_definition").unwrap();
        assert_eq!(
            definition.resolve_path("display_name").and_then(ContextValue::as_str),
            Some("Contact")
        );
        assert!(context.get("form").is_some());
    }
}
