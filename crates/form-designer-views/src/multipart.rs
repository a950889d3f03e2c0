//! `multipart/form-data` bodies.
//!
//! Forms with a file field are rendered with `enctype="multipart/form-data"`.
//! Their bodies are flattened into a [`QueryDict`]: text parts keep their
//! value and file parts contribute the submitted file name. File contents
//! are not kept.

use form_designer_core::{FormDesignerError, QueryDict};

/// Returns `true` if `content_type` names a multipart form body.
pub fn is_multipart(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("multipart/form-data"))
}

/// Extracts the `boundary` parameter of a multipart `Content-Type`.
pub fn extract_boundary(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .filter_map(|param| param.trim().strip_prefix("boundary="))
        .map(|boundary| boundary.trim_matches('"'))
        .find(|boundary| !boundary.is_empty())
}

/// Parses a multipart body into form data.
///
/// # Errors
///
/// Returns `BadRequest` if the body contains no part delimited by
/// `boundary`.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Result<QueryDict, FormDesignerError> {
    let delimiter = format!("--{boundary}");
    let text = String::from_utf8_lossy(body);
    if !text.contains(&delimiter) {
        return Err(FormDesignerError::BadRequest(
            "Multipart body does not contain its boundary".into(),
        ));
    }

    let mut data = QueryDict::new();
    for part in text.split(delimiter.as_str()) {
        let part = part.strip_prefix("\r\n").unwrap_or(part);
        if part.is_empty() || part.starts_with("--") {
            continue;
        }
        let Some((headers, content)) = part
            .split_once("\r\n\r\n")
            .or_else(|| part.split_once("\n\n"))
        else {
            continue;
        };
        let content = content
            .strip_suffix("\r\n")
            .or_else(|| content.strip_suffix('\n'))
            .unwrap_or(content);

        let Some(disposition) = headers.lines().find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case("content-disposition")
                .then(|| value.trim())
        }) else {
            continue;
        };
        let Some(name) = disposition_param(disposition, "name") else {
            continue;
        };

        match disposition_param(disposition, "filename") {
            // An empty file input.
            Some(filename) if filename.is_empty() => {}
            Some(filename) => data.append(&name, &filename),
            None => data.append(&name, content),
        }
    }
    Ok(data)
}

/// Reads `param="value"` (or an unquoted value) from a
/// `Content-Disposition` header.
fn disposition_param(disposition: &str, param: &str) -> Option<String> {
    disposition.split(';').skip(1).find_map(|item| {
        let (key, value) = item.trim().split_once('=')?;
        (key.trim() == param).then(|| value.trim().trim_matches('"').to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "----FormBoundary7MA4";

    fn body(parts: &[&str]) -> String {
        let mut out = String::new();
        for part in parts {
            out.push_str(&format!("--{BOUNDARY}\r\n{part}\r\n"));
        }
        out.push_str(&format!("--{BOUNDARY}--\r\n"));
        out
    }

    #[test]
    fn test_is_multipart() {
        assert!(is_multipart("multipart/form-data; boundary=x"));
        assert!(is_multipart("Multipart/Form-Data"));
        assert!(!is_multipart("application/x-www-form-urlencoded"));
    }

    #[test]
    fn test_extract_boundary() {
        assert_eq!(
            extract_boundary("multipart/form-data; boundary=----abc"),
            Some("----abc")
        );
        assert_eq!(
            extract_boundary("multipart/form-data; boundary=\"q r\""),
            Some("q r")
        );
        assert_eq!(extract_boundary("multipart/form-data; boundary="), None);
        assert_eq!(extract_boundary("multipart/form-data"), None);
    }

    #[test]
    fn test_text_and_file_parts() {
        let raw = body(&[
            "Content-Disposition: form-data; name=\"name\"\r\n\r\nAnn Lee",
            "Content-Disposition: form-data; name=\"tags\"\r\n\r\na",
            "Content-Disposition: form-data; name=\"tags\"\r\n\r\nb",
            "Content-Disposition: form-data; name=\"doc\"; filename=\"cv.pdf\"\r\n\
             Content-Type: application/pdf\r\n\r\n%PDF-1.4 binary",
        ]);
        let data = parse_multipart(raw.as_bytes(), BOUNDARY).unwrap();
        assert_eq!(data.get("name"), Some("Ann Lee"));
        assert_eq!(data.get_list("tags").unwrap(), &["a", "b"]);
        assert_eq!(data.get("doc"), Some("cv.pdf"));
    }

    #[test]
    fn test_multiline_value_and_empty_file_input() {
        let raw = body(&[
            "Content-Disposition: form-data; name=\"message\"\r\n\r\nline one\r\nline two",
            "Content-Disposition: form-data; name=\"doc\"; filename=\"\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n",
        ]);
        let data = parse_multipart(raw.as_bytes(), BOUNDARY).unwrap();
        assert_eq!(data.get("message"), Some("line one\r\nline two"));
        assert!(!data.contains_key("doc"));
    }

    #[test]
    fn test_missing_boundary_is_bad_request() {
        assert!(matches!(
            parse_multipart(b"name=Ann", BOUNDARY),
            Err(FormDesignerError::BadRequest(_))
        ));
    }
}
