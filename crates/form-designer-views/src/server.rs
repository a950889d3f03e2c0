//! HTTP server for designed forms.
//!
//! [`FormApp`] serves every stored definition at `/{name}/` (full page) and
//! `/{name}/embedded/` (fragment without redirects), plus the admin API
//! under `/admin/api/`.
//!
//! # Examples
//!
//! ```no_run
//! use form_designer_core::FormDesignerSettings;
//! use form_designer_views::{FormApp, FormServices};
//!
//! # async fn example() -> Result<(), form_designer_core::FormDesignerError> {
//! let services = FormServices::from_settings(FormDesignerSettings::default())?;
//! services.store.migrate().await?;
//! FormApp::new(services).run("127.0.0.1:8000").await?;
//! # Ok(())
//! # }
//! ```

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use form_designer_core::logging::form_span;
use form_designer_core::{FormDesignerError, QueryDict};
use form_designer_template::builtins;

use crate::admin;
use crate::multipart;
use crate::process::{process_form, FormRequest};
use crate::services::FormServices;

/// The form-designer web application.
pub struct FormApp {
    services: FormServices,
}

impl FormApp {
    /// Creates the application.
    pub const fn new(services: FormServices) -> Self {
        Self { services }
    }

    /// Returns the shared services.
    pub const fn services(&self) -> &FormServices {
        &self.services
    }

    /// Converts the application into an axum router.
    pub fn into_axum_router(self) -> Router {
        let pages = Router::new()
            .route("/{name}/", get(full_page).post(full_page))
            .route("/{name}/embedded/", get(embedded_page).post(embedded_page))
            .with_state(self.services.clone());

        pages
            .nest("/admin/api", admin::router(self.services))
            .layer(TraceLayer::new_for_http())
    }

    /// Serves the application on `addr` until the process is stopped.
    ///
    /// # Errors
    ///
    /// Returns `ImproperlyConfigured` if the address cannot be bound, or
    /// `InternalServerError` if serving fails.
    pub async fn run(self, addr: &str) -> Result<(), FormDesignerError> {
        let debug = self.services.settings.debug;
        let router = self.into_axum_router();
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            FormDesignerError::ImproperlyConfigured(format!("Failed to bind to {addr}: {e}"))
        })?;

        if debug {
            tracing::info!("Starting development server at http://{addr}/");
        }

        axum::serve(listener, router)
            .await
            .map_err(|e| FormDesignerError::InternalServerError(format!("Server error: {e}")))
    }
}

impl std::fmt::Debug for FormApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormApp")
            .field("services", &self.services)
            .finish()
    }
}

async fn full_page(
    State(services): State<FormServices>,
    Path(name): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = match form_request(method, &uri, &headers, &body) {
        Ok(request) => request,
        Err(err) => return page_error(err),
    };
    render_page(&services, &name, &request, false)
        .instrument(form_span(&name, request.method.as_str()))
        .await
        .unwrap_or_else(page_error)
}

async fn embedded_page(
    State(services): State<FormServices>,
    Path(name): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = match form_request(method, &uri, &headers, &body) {
        Ok(request) => request,
        Err(err) => return page_error(err),
    };
    render_page(&services, &name, &request, true)
        .instrument(form_span(&name, request.method.as_str()))
        .await
        .unwrap_or_else(page_error)
}

/// Builds the form request. Multipart bodies are flattened with file parts
/// reduced to their file names; every other body is read as urlencoded.
fn form_request(
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<FormRequest, FormDesignerError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let body = if multipart::is_multipart(content_type) {
        let boundary = multipart::extract_boundary(content_type).ok_or_else(|| {
            FormDesignerError::BadRequest("Multipart body without a boundary".into())
        })?;
        multipart::parse_multipart(body, boundary)?
    } else {
        QueryDict::parse(&String::from_utf8_lossy(body))
    };

    Ok(FormRequest {
        method,
        path: uri.path().to_string(),
        query: QueryDict::parse(uri.query().unwrap_or_default()),
        body,
        referer: headers
            .get(header::REFERER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    })
}

async fn render_page(
    services: &FormServices,
    name: &str,
    request: &FormRequest,
    is_embedded: bool,
) -> Result<Response, FormDesignerError> {
    let definition = services.store.get_definition_by_name(name).await?;
    let result = process_form(services, &definition, request, is_embedded).await?;

    if let Some(target) = result.redirect {
        return Ok(Redirect::to(&target).into_response());
    }

    let template = if is_embedded {
        builtins::EMBEDDED
    } else {
        builtins::DETAIL
    };
    let mut context = result.context();
    let html = services.engine.render_to_string(template, &mut context)?;
    Ok(Html(html).into_response())
}

#[allow(clippy::needless_pass_by_value)]
fn page_error(err: FormDesignerError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::error!(error = %err, "page failed");
        return (status, "Internal Server Error").into_response();
    }
    (status, status.canonical_reason().unwrap_or_default()).into_response()
}

#[cfg(test)]
mod tests {
    use form_designer_core::FormDesignerSettings;

    use super::*;

    #[test]
    fn test_form_request_from_parts() {
        let mut headers = HeaderMap::new();
        headers.insert(header::REFERER, "/from/".parse().unwrap());
        let uri: Uri = "/contact/?name=Ann".parse().unwrap();
        let request = form_request(Method::POST, &uri, &headers, b"email=a%40b.c").unwrap();
        assert_eq!(request.path, "/contact/");
        assert_eq!(request.query.get("name"), Some("Ann"));
        assert_eq!(request.body.get("email"), Some("a@b.c"));
        assert_eq!(request.referer.as_deref(), Some("/from/"));
    }

    #[test]
    fn test_form_request_reads_multipart() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            "multipart/form-data; boundary=XX".parse().unwrap(),
        );
        let body = "--XX\r\nContent-Disposition: form-data; name=\"doc\"; filename=\"a.txt\"\r\n\r\n\
                    hello\r\n--XX--\r\n";
        let uri: Uri = "/upload/".parse().unwrap();
        let request = form_request(Method::POST, &uri, &headers, body.as_bytes()).unwrap();
        assert_eq!(request.body.get("doc"), Some("a.txt"));

        headers.insert(header::CONTENT_TYPE, "multipart/form-data".parse().unwrap());
        assert!(matches!(
            form_request(Method::POST, &uri, &headers, body.as_bytes()),
            Err(FormDesignerError::BadRequest(_))
        ));
    }

    #[test]
    fn test_page_error_hides_details() {
        let response = page_error(FormDesignerError::DatabaseError("secret".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let response = page_error(FormDesignerError::DoesNotExist("x".into()));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_run_invalid_address() {
        let (services, _) = FormServices::in_memory(FormDesignerSettings::default());
        assert!(FormApp::new(services).run("invalid-address").await.is_err());
    }
}
