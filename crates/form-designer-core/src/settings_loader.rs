//! Settings loading from configuration files.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (deep-merged over the defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `FORM_DESIGNER_DEBUG` | `debug` |
//! | `FORM_DESIGNER_LOG_LEVEL` | `log_level` |
//! | `FORM_DESIGNER_BIND` | `bind` |
//! | `FORM_DESIGNER_DATABASE` | `database.path` |
//! | `FORM_DESIGNER_EMAIL_BACKEND` | `email.backend` |
//! | `FORM_DESIGNER_EMAIL_HOST` | `email.host` |
//! | `FORM_DESIGNER_EMAIL_PORT` | `email.port` |
//! | `FORM_DESIGNER_EMAIL_USER` | `email.username` |
//! | `FORM_DESIGNER_EMAIL_PASSWORD` | `email.password` |
//! | `FORM_DESIGNER_DEFAULT_FROM_EMAIL` | `email.default_from_email` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use form_designer_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("form_designer.toml").unwrap();
//! ```

use std::path::{Path, PathBuf};

use crate::error::FormDesignerError;
use crate::settings::FormDesignerSettings;

/// Loads settings from a TOML string.
///
/// Any settings not present in the TOML keep their default values.
pub fn from_toml_str(toml_str: &str) -> Result<FormDesignerSettings, FormDesignerError> {
    let toml_value: toml::Value = toml::from_str(toml_str).map_err(|e| {
        FormDesignerError::ConfigurationError(format!("Failed to parse TOML: {e}"))
    })?;
    merge_over_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<FormDesignerSettings, FormDesignerError> {
    let content = read_config(path.as_ref(), "TOML")?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
pub fn from_toml_file_with_env(
    path: impl AsRef<Path>,
) -> Result<FormDesignerSettings, FormDesignerError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
pub fn from_json_str(json_str: &str) -> Result<FormDesignerSettings, FormDesignerError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str).map_err(|e| {
        FormDesignerError::ConfigurationError(format!("Failed to parse JSON: {e}"))
    })?;
    merge_over_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<FormDesignerSettings, FormDesignerError> {
    let content = read_config(path.as_ref(), "JSON")?;
    from_json_str(&content)
}

/// Loads settings from a file, choosing the format by extension
/// (`.json` is JSON, anything else is TOML), then applies the environment.
pub fn from_file_with_env(
    path: impl AsRef<Path>,
) -> Result<FormDesignerSettings, FormDesignerError> {
    let path = path.as_ref();
    let mut settings = if path.extension().is_some_and(|ext| ext == "json") {
        from_json_file(path)?
    } else {
        from_toml_file(path)?
    };
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> FormDesignerSettings {
    let mut settings = FormDesignerSettings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies `FORM_DESIGNER_*` environment variable overrides.
pub fn apply_env_overrides(settings: &mut FormDesignerSettings) {
    if let Ok(val) = std::env::var("FORM_DESIGNER_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }

    if let Ok(val) = std::env::var("FORM_DESIGNER_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Ok(val) = std::env::var("FORM_DESIGNER_BIND") {
        settings.bind = val;
    }

    if let Ok(val) = std::env::var("FORM_DESIGNER_DATABASE") {
        settings.database.path = PathBuf::from(val);
    }

    if let Ok(val) = std::env::var("FORM_DESIGNER_EMAIL_BACKEND") {
        settings.email.backend = val;
    }

    if let Ok(val) = std::env::var("FORM_DESIGNER_EMAIL_HOST") {
        settings.email.host = val;
    }

    if let Ok(val) = std::env::var("FORM_DESIGNER_EMAIL_PORT") {
        if let Ok(port) = val.parse::<u16>() {
            settings.email.port = port;
        }
    }

    if let Ok(val) = std::env::var("FORM_DESIGNER_EMAIL_USER") {
        settings.email.username = Some(val);
    }

    if let Ok(val) = std::env::var("FORM_DESIGNER_EMAIL_PASSWORD") {
        settings.email.password = Some(val);
    }

    if let Ok(val) = std::env::var("FORM_DESIGNER_DEFAULT_FROM_EMAIL") {
        settings.email.default_from_email = val;
    }
}

// ============================================================
// Helpers
// ============================================================

fn read_config(path: &Path, format: &str) -> Result<String, FormDesignerError> {
    std::fs::read_to_string(path).map_err(|e| {
        FormDesignerError::ConfigurationError(format!(
            "Failed to read {format} file '{}': {e}",
            path.display()
        ))
    })
}

fn merge_over_defaults(
    value: serde_json::Value,
    format: &str,
) -> Result<FormDesignerSettings, FormDesignerError> {
    let default_json = serde_json::to_value(FormDesignerSettings::default()).map_err(|e| {
        FormDesignerError::ConfigurationError(format!(
            "Failed to serialize default settings: {e}"
        ))
    })?;

    let merged = merge_json(default_json, value);
    serde_json::from_value(merged).map_err(|e| {
        FormDesignerError::ConfigurationError(format!(
            "Failed to deserialize settings from {format}: {e}"
        ))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
/// Arrays are replaced wholesale, never concatenated.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}
