//! CSV export of submission logs.

use form_designer_core::FormDesignerError;
use form_designer_models::FormLog;

/// Writes logs as CSV: a `created` column followed by one column per
/// distinct field label, in the order labels first appear. Rows follow the
/// order of `logs`.
///
/// # Errors
///
/// Returns `SerializationError` if the CSV writer fails.
pub fn logs_to_csv(logs: &[FormLog]) -> Result<String, FormDesignerError> {
    let mut labels: Vec<&str> = Vec::new();
    for entry in logs.iter().flat_map(|log| &log.data) {
        if !labels.contains(&entry.label.as_str()) {
            labels.push(&entry.label);
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(std::iter::once("created").chain(labels.iter().copied()))
        .map_err(csv_error)?;

    for log in logs {
        let mut row = Vec::with_capacity(labels.len() + 1);
        row.push(log.created.format("%Y-%m-%d %H:%M:%S").to_string());
        for label in &labels {
            let cell = log
                .data
                .iter()
                .find(|entry| entry.label == *label)
                .map(|entry| display_value(&entry.value))
                .unwrap_or_default();
            row.push(cell);
        }
        writer.write_record(&row).map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| FormDesignerError::SerializationError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| FormDesignerError::SerializationError(e.to_string()))
}

fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[allow(clippy::needless_pass_by_value)]
fn csv_error(err: csv::Error) -> FormDesignerError {
    FormDesignerError::SerializationError(err.to_string())
}
