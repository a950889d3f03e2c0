//! Submitted form data and query strings.
//!
//! [`QueryDict`] maps each key to every value submitted for it. Single-valued
//! lookups return the **last** value, matching how browsers and HTML forms
//! resolve duplicates; multi-valued fields (multiple selects, checkbox groups)
//! read the whole list.

use std::collections::HashMap;

/// A dictionary for query string and form-encoded data.
///
/// # Examples
///
/// ```
/// use form_designer_core::QueryDict;
///
/// let qd = QueryDict::parse("topic=sales&topic=support&name=Ann+Lee");
/// assert_eq!(qd.get("topic"), Some("support"));
/// assert_eq!(qd.get_list("topic"), Some(&vec!["sales".to_string(), "support".to_string()]));
/// assert_eq!(qd.get("name"), Some("Ann Lee"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDict {
    data: HashMap<String, Vec<String>>,
}

impl QueryDict {
    /// Creates a new, empty `QueryDict`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a URL-encoded string (e.g. `"key1=val1&key2=val2"`).
    ///
    /// Handles percent-encoding and `+` as space, and keeps every value of
    /// repeated keys in submission order.
    pub fn parse(query_string: &str) -> Self {
        let mut qd = Self::new();

        for pair in query_string.split('&') {
            if pair.is_empty() {
                continue;
            }

            let (key, value) = pair
                .find('=')
                .map_or((pair, ""), |eq_pos| (&pair[..eq_pos], &pair[eq_pos + 1..]));

            qd.append(&percent_decode(key), &percent_decode(value));
        }

        qd
    }

    /// Builds a `QueryDict` from `(key, value)` pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut qd = Self::new();
        for (key, value) in pairs {
            qd.append(key.as_ref(), value.as_ref());
        }
        qd
    }

    /// Returns the last value for the given key, or `None` if not present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(|values| values.last())
            .map(String::as_str)
    }

    /// Returns all values for the given key, or `None` if not present.
    pub fn get_list(&self, key: &str) -> Option<&Vec<String>> {
        self.data.get(key)
    }

    /// Sets a single value for the given key, replacing any existing values.
    pub fn set(&mut self, key: &str, value: &str) {
        self.data.insert(key.to_string(), vec![value.to_string()]);
    }

    /// Appends a value to the list for the given key.
    pub fn append(&mut self, key: &str, value: &str) {
        self.data
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }

    /// Returns `true` if the specified key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the `QueryDict` contains no keys.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Encodes this `QueryDict` as a URL query string with sorted pairs.
    pub fn urlencode(&self) -> String {
        let mut parts: Vec<String> = self
            .data
            .iter()
            .flat_map(|(key, values)| {
                values
                    .iter()
                    .map(move |value| format!("{}={}", percent_encode(key), percent_encode(value)))
            })
            .collect();
        parts.sort();
        parts.join("&")
    }
}

/// Decodes a percent-encoded string.
fn percent_decode(input: &str) -> String {
    let plus_decoded = input.replace('+', " ");
    percent_encoding::percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}

/// Percent-encodes a string for use in a URL query.
fn percent_encode(input: &str) -> String {
    percent_encoding::utf8_percent_encode(input, percent_encoding::NON_ALPHANUMERIC).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let qd = QueryDict::new();
        assert!(qd.is_empty());
        assert_eq!(qd.len(), 0);
    }

    #[test]
    fn test_parse_multiple_values_keeps_order() {
        let qd = QueryDict::parse("color=red&color=blue&color=green");
        assert_eq!(qd.get("color"), Some("green"));
        assert_eq!(
            qd.get_list("color"),
            Some(&vec![
                "red".to_string(),
                "blue".to_string(),
                "green".to_string()
            ])
        );
    }

    #[test]
    fn test_parse_percent_and_plus() {
        let qd = QueryDict::parse("email=ann%40example.com&msg=hello+world&flag");
        assert_eq!(qd.get("email"), Some("ann@example.com"));
        assert_eq!(qd.get("msg"), Some("hello world"));
        assert_eq!(qd.get("flag"), Some(""));
    }

    #[test]
    fn test_parse_skips_empty_pairs() {
        let qd = QueryDict::parse("&&a=1&");
        assert_eq!(qd.len(), 1);
    }

    #[test]
    fn test_set_replaces() {
        let mut qd = QueryDict::from_pairs([("a", "1"), ("a", "2")]);
        qd.set("a", "3");
        assert_eq!(qd.get_list("a"), Some(&vec!["3".to_string()]));
    }

    #[test]
    fn test_urlencode_roundtrip() {
        let qd = QueryDict::from_pairs([("name", "Ann Lee"), ("topic", "a&b")]);
        let encoded = qd.urlencode();
        assert_eq!(encoded, "name=Ann%20Lee&topic=a%26b");
        assert_eq!(QueryDict::parse(&encoded), qd);
    }
}
