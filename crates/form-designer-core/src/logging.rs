//! Logging integration for form-designer.
//!
//! Provides helpers for configuring [`tracing`]-based logging from
//! [`FormDesignerSettings`] and for creating per-submission spans.

use crate::settings::FormDesignerSettings;

/// Sets up the global tracing subscriber based on the given settings.
///
/// The filter is read from `settings.log_level` (e.g. "debug",
/// "`form_designer_views=debug`"). In debug mode a pretty, human-readable
/// format is used; otherwise a structured JSON format is used. Installing a
/// second subscriber is silently ignored.
pub fn setup_logging(settings: &FormDesignerSettings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates a tracing span for processing one form request.
///
/// # Examples
///
/// ```
/// use form_designer_core::logging::form_span;
///
/// let span = form_span("contact", "POST");
/// let _guard = span.enter();
/// tracing::info!("processing submission");
/// ```
pub fn form_span(form_name: &str, method: &str) -> tracing::Span {
    tracing::info_span!("form", name = form_name, method = method)
}
