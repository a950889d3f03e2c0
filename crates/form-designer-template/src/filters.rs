//! Built-in template filters.
//!
//! The filter set covers what form and message templates need. Filter names
//! are checked against the [`default_registry`] at parse time, so a template
//! using an unknown filter never compiles.

use std::collections::HashMap;
use std::sync::OnceLock;

use form_designer_core::FormDesignerError;

use crate::context::{escape_html, ContextValue};

/// A template filter function.
pub trait Filter: Send + Sync {
    /// Returns the filter name.
    fn name(&self) -> &'static str;

    /// Applies the filter to a value with the given arguments.
    fn apply(
        &self,
        value: &ContextValue,
        args: &[ContextValue],
    ) -> Result<ContextValue, FormDesignerError>;
}

/// A registry of available template filters.
pub struct FilterRegistry {
    filters: HashMap<&'static str, Box<dyn Filter>>,
}

impl FilterRegistry {
    /// Creates a new empty filter registry.
    pub fn new() -> Self {
        Self {
            filters: HashMap::new(),
        }
    }

    /// Registers a filter, replacing any filter of the same name.
    pub fn register(&mut self, filter: Box<dyn Filter>) {
        self.filters.insert(filter.name(), filter);
    }

    /// Returns `true` if a filter with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Applies a named filter to a value.
    ///
    /// # Errors
    ///
    /// Returns `TemplateSyntaxError` if no filter has that name.
    pub fn apply(
        &self,
        name: &str,
        value: &ContextValue,
        args: &[ContextValue],
    ) -> Result<ContextValue, FormDesignerError> {
        let filter = self.filters.get(name).ok_or_else(|| {
            FormDesignerError::TemplateSyntaxError(format!("Invalid filter: '{name}'"))
        })?;
        filter.apply(value, args)
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the registry holding every built-in filter.
pub fn default_registry() -> &'static FilterRegistry {
    static REGISTRY: OnceLock<FilterRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut r = FilterRegistry::new();
        // Text
        r.register(Box::new(LowerFilter));
        r.register(Box::new(UpperFilter));
        r.register(Box::new(TitleFilter));
        r.register(Box::new(CapfirstFilter));
        r.register(Box::new(CutFilter));
        r.register(Box::new(TruncatecharsFilter));
        r.register(Box::new(LinebreaksbrFilter));
        // Escaping
        r.register(Box::new(EscapeFilter));
        r.register(Box::new(SafeFilter));
        // Lists
        r.register(Box::new(LengthFilter));
        r.register(Box::new(FirstFilter));
        r.register(Box::new(LastFilter));
        r.register(Box::new(JoinFilter));
        // Logic
        r.register(Box::new(DefaultFilter));
        r.register(Box::new(DefaultIfNoneFilter));
        r.register(Box::new(YesnoFilter));
        r
    })
}

fn first_arg(args: &[ContextValue], filter: &str) -> Result<ContextValue, FormDesignerError> {
    args.first().cloned().ok_or_else(|| {
        FormDesignerError::TemplateSyntaxError(format!("Filter '{filter}' requires an argument"))
    })
}

struct LowerFilter;
impl Filter for LowerFilter {
    fn name(&self) -> &'static str {
        "lower"
    }
    fn apply(
        &self,
        value: &ContextValue,
        _args: &[ContextValue],
    ) -> Result<ContextValue, FormDesignerError> {
        Ok(ContextValue::String(value.to_display_string().to_lowercase()))
    }
}

struct UpperFilter;
impl Filter for UpperFilter {
    fn name(&self) -> &'static str {
        "upper"
    }
    fn apply(
        &self,
        value: &ContextValue,
        _args: &[ContextValue],
    ) -> Result<ContextValue, FormDesignerError> {
        Ok(ContextValue::String(value.to_display_string().to_uppercase()))
    }
}

struct TitleFilter;
impl Filter for TitleFilter {
    fn name(&self) -> &'static str {
        "title"
    }
    fn apply(
        &self,
        value: &ContextValue,
        _args: &[ContextValue],
    ) -> Result<ContextValue, FormDesignerError> {
        let mut out = String::new();
        let mut at_word_start = true;
        for ch in value.to_display_string().chars() {
            if ch.is_alphanumeric() {
                if at_word_start {
                    out.extend(ch.to_uppercase());
                } else {
                    out.extend(ch.to_lowercase());
                }
                at_word_start = false;
            } else {
                out.push(ch);
                at_word_start = ch != '\'';
            }
        }
        Ok(ContextValue::String(out))
    }
}

struct CapfirstFilter;
impl Filter for CapfirstFilter {
    fn name(&self) -> &'static str {
        "capfirst"
    }
    fn apply(
        &self,
        value: &ContextValue,
        _args: &[ContextValue],
    ) -> Result<ContextValue, FormDesignerError> {
        let s = value.to_display_string();
        let mut chars = s.chars();
        let out = chars.next().map_or_else(String::new, |first| {
            first.to_uppercase().chain(chars).collect()
        });
        Ok(ContextValue::String(out))
    }
}

struct CutFilter;
impl Filter for CutFilter {
    fn name(&self) -> &'static str {
        "cut"
    }
    fn apply(
        &self,
        value: &ContextValue,
        args: &[ContextValue],
    ) -> Result<ContextValue, FormDesignerError> {
        let needle = first_arg(args, "cut")?.to_display_string();
        Ok(ContextValue::String(
            value.to_display_string().replace(&needle, ""),
        ))
    }
}

struct TruncatecharsFilter;
impl Filter for TruncatecharsFilter {
    fn name(&self) -> &'static str {
        "truncatechars"
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn apply(
        &self,
        value: &ContextValue,
        args: &[ContextValue],
    ) -> Result<ContextValue, FormDesignerError> {
        let Some(limit) = first_arg(args, "truncatechars")?.as_float() else {
            return Ok(value.clone());
        };
        let limit = limit.max(0.0) as usize;
        let s = value.to_display_string();
        if s.chars().count() <= limit {
            return Ok(ContextValue::String(s));
        }
        let kept: String = s.chars().take(limit.saturating_sub(1)).collect();
        Ok(ContextValue::String(format!("{kept}\u{2026}")))
    }
}

struct LinebreaksbrFilter;
impl Filter for LinebreaksbrFilter {
    fn name(&self) -> &'static str {
        "linebreaksbr"
    }
    fn apply(
        &self,
        value: &ContextValue,
        _args: &[ContextValue],
    ) -> Result<ContextValue, FormDesignerError> {
        let s = value.to_display_string();
        let escaped = if value.is_safe() { s } else { escape_html(&s) };
        Ok(ContextValue::SafeString(
            escaped.replace("\r\n", "\n").replace('\n', "<br>"),
        ))
    }
}

struct EscapeFilter;
impl Filter for EscapeFilter {
    fn name(&self) -> &'static str {
        "escape"
    }
    fn apply(
        &self,
        value: &ContextValue,
        _args: &[ContextValue],
    ) -> Result<ContextValue, FormDesignerError> {
        Ok(ContextValue::SafeString(escape_html(
            &value.to_display_string(),
        )))
    }
}

struct SafeFilter;
impl Filter for SafeFilter {
    fn name(&self) -> &'static str {
        "safe"
    }
    fn apply(
        &self,
        value: &ContextValue,
        _args: &[ContextValue],
    ) -> Result<ContextValue, FormDesignerError> {
        Ok(ContextValue::SafeString(value.to_display_string()))
    }
}

struct LengthFilter;
impl Filter for LengthFilter {
    fn name(&self) -> &'static str {
        "length"
    }
    fn apply(
        &self,
        value: &ContextValue,
        _args: &[ContextValue],
    ) -> Result<ContextValue, FormDesignerError> {
        Ok(ContextValue::from(value.len().unwrap_or(0)))
    }
}

struct FirstFilter;
impl Filter for FirstFilter {
    fn name(&self) -> &'static str {
        "first"
    }
    fn apply(
        &self,
        value: &ContextValue,
        _args: &[ContextValue],
    ) -> Result<ContextValue, FormDesignerError> {
        Ok(match value {
            ContextValue::List(items) => items.first().cloned().unwrap_or(ContextValue::None),
            ContextValue::String(s) | ContextValue::SafeString(s) => s
                .chars()
                .next()
                .map_or(ContextValue::None, |c| ContextValue::String(c.to_string())),
            _ => ContextValue::None,
        })
    }
}

struct LastFilter;
impl Filter for LastFilter {
    fn name(&self) -> &'static str {
        "last"
    }
    fn apply(
        &self,
        value: &ContextValue,
        _args: &[ContextValue],
    ) -> Result<ContextValue, FormDesignerError> {
        Ok(match value {
            ContextValue::List(items) => items.last().cloned().unwrap_or(ContextValue::None),
            ContextValue::String(s) | ContextValue::SafeString(s) => s
                .chars()
                .last()
                .map_or(ContextValue::None, |c| ContextValue::String(c.to_string())),
            _ => ContextValue::None,
        })
    }
}

struct JoinFilter;
impl Filter for JoinFilter {
    fn name(&self) -> &'static str {
        "join"
    }
    fn apply(
        &self,
        value: &ContextValue,
        args: &[ContextValue],
    ) -> Result<ContextValue, FormDesignerError> {
        let separator = first_arg(args, "join")?.to_display_string();
        match value {
            ContextValue::List(items) => Ok(ContextValue::String(
                items
                    .iter()
                    .map(ContextValue::to_display_string)
                    .collect::<Vec<_>>()
                    .join(&separator),
            )),
            other => Ok(other.clone()),
        }
    }
}

struct DefaultFilter;
impl Filter for DefaultFilter {
    fn name(&self) -> &'static str {
        "default"
    }
    fn apply(
        &self,
        value: &ContextValue,
        args: &[ContextValue],
    ) -> Result<ContextValue, FormDesignerError> {
        if value.is_truthy() {
            Ok(value.clone())
        } else {
            first_arg(args, "default")
        }
    }
}

struct DefaultIfNoneFilter;
impl Filter for DefaultIfNoneFilter {
    fn name(&self) -> &'static str {
        "default_if_none"
    }
    fn apply(
        &self,
        value: &ContextValue,
        args: &[ContextValue],
    ) -> Result<ContextValue, FormDesignerError> {
        if matches!(value, ContextValue::None) {
            first_arg(args, "default_if_none")
        } else {
            Ok(value.clone())
        }
    }
}

struct YesnoFilter;
impl Filter for YesnoFilter {
    fn name(&self) -> &'static str {
        "yesno"
    }
    fn apply(
        &self,
        value: &ContextValue,
        args: &[ContextValue],
    ) -> Result<ContextValue, FormDesignerError> {
        let mapping = args
            .first()
            .map_or_else(|| "yes,no,maybe".to_string(), ContextValue::to_display_string);
        let parts: Vec<&str> = mapping.split(',').collect();
        let yes = parts.first().copied().unwrap_or("yes");
        let no = parts.get(1).copied().unwrap_or("no");
        let maybe = parts.get(2).copied().unwrap_or(no);

        let result = match value {
            ContextValue::None => maybe,
            v if v.is_truthy() => yes,
            _ => no,
        };
        Ok(ContextValue::String(result.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(name: &str, value: ContextValue, args: &[ContextValue]) -> ContextValue {
        default_registry().apply(name, &value, args).unwrap()
    }

    #[test]
    fn test_registry_contains() {
        let r = default_registry();
        assert!(r.contains("default"));
        assert!(r.contains("linebreaksbr"));
        assert!(!r.contains("nonexistent"));
    }

    #[test]
    fn test_unknown_filter_errors() {
        let result = default_registry().apply("bogus", &ContextValue::None, &[]);
        assert!(matches!(
            result,
            Err(FormDesignerError::TemplateSyntaxError(_))
        ));
    }

    #[test]
    fn test_case_filters() {
        assert_eq!(apply("lower", "HeLLo".into(), &[]), "hello".into());
        assert_eq!(apply("upper", "hello".into(), &[]), "HELLO".into());
        assert_eq!(
            apply("title", "contact us today".into(), &[]),
            "Contact Us Today".into()
        );
        assert_eq!(apply("capfirst", "name".into(), &[]), "Name".into());
    }

    #[test]
    fn test_default_filters() {
        assert_eq!(
            apply("default", "".into(), &["n/a".into()]),
            "n/a".into()
        );
        assert_eq!(apply("default", "x".into(), &["n/a".into()]), "x".into());
        assert_eq!(
            apply("default_if_none", ContextValue::None, &["-".into()]),
            "-".into()
        );
        assert_eq!(
            apply("default_if_none", "".into(), &["-".into()]),
            "".into()
        );
    }

    #[test]
    fn test_default_requires_argument() {
        assert!(default_registry()
            .apply("default", &ContextValue::None, &[])
            .is_err());
    }

    #[test]
    fn test_list_filters() {
        let list = ContextValue::from(vec!["sales", "support"]);
        assert_eq!(apply("length", list.clone(), &[]), ContextValue::Integer(2));
        assert_eq!(apply("first", list.clone(), &[]), "sales".into());
        assert_eq!(apply("last", list.clone(), &[]), "support".into());
        assert_eq!(apply("join", list, &[", ".into()]), "sales, support".into());
    }

    #[test]
    fn test_yesno() {
        assert_eq!(apply("yesno", true.into(), &[]), "yes".into());
        assert_eq!(apply("yesno", false.into(), &[]), "no".into());
        assert_eq!(apply("yesno", ContextValue::None, &[]), "maybe".into());
        assert_eq!(
            apply("yesno", true.into(), &["ja,nein".into()]),
            "ja".into()
        );
    }

    #[test]
    fn test_linebreaksbr_escapes_first() {
        let out = apply("linebreaksbr", "a<b\nc".into(), &[]);
        assert!(out.is_safe());
        assert_eq!(out.to_display_string(), "a&lt;b<br>c");
    }

    #[test]
    fn test_truncatechars() {
        assert_eq!(
            apply("truncatechars", "Hello world".into(), &[ContextValue::Integer(6)]),
            "Hello\u{2026}".into()
        );
        assert_eq!(
            apply("truncatechars", "Hi".into(), &[ContextValue::Integer(6)]),
            "Hi".into()
        );
    }

    #[test]
    fn test_safe_and_escape() {
        assert!(apply("safe", "<b>".into(), &[]).is_safe());
        let escaped = apply("escape", "<b>".into(), &[]);
        assert_eq!(escaped.to_display_string(), "&lt;b&gt;");
        assert!(escaped.is_safe());
    }

    #[test]
    fn test_cut() {
        assert_eq!(apply("cut", "a b c".into(), &[" ".into()]), "abc".into());
    }
}
