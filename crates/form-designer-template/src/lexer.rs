//! Template lexer.
//!
//! Splits template source into [`Token`]s: literal text, `{{ variable }}`,
//! `{% tag args %}` and `{# comment #}`.

use form_designer_core::FormDesignerError;

/// A token produced by the template lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A literal text segment.
    Text(String),
    /// A variable expression, trimmed: `{{ expression }}`.
    Variable(String),
    /// A block tag name and its whitespace-separated arguments.
    Block(String, Vec<String>),
    /// A comment's text.
    Comment(String),
}

const DELIMITERS: [(&str, &str); 3] = [("{{", "}}"), ("{%", "%}"), ("{#", "#}")];

/// Tokenizes template source.
///
/// # Errors
///
/// Returns `TemplateSyntaxError` when a `{{`, `{%` or `{#` is never closed,
/// or when a variable or tag is empty.
pub fn tokenize(source: &str) -> Result<Vec<Token>, FormDesignerError> {
    let mut tokens = Vec::new();
    let mut rest = source;

    while let Some((pos, (open, close))) = next_opening(rest) {
        if pos > 0 {
            tokens.push(Token::Text(rest[..pos].to_string()));
        }

        let inner_start = pos + open.len();
        let Some(inner_len) = rest[inner_start..].find(close) else {
            return Err(FormDesignerError::TemplateSyntaxError(format!(
                "Unclosed tag: expected '{close}' after '{open}'"
            )));
        };
        let inner = rest[inner_start..inner_start + inner_len].trim();

        tokens.push(match open {
            "{{" => {
                if inner.is_empty() {
                    return Err(FormDesignerError::TemplateSyntaxError(
                        "Empty variable tag".to_string(),
                    ));
                }
                Token::Variable(inner.to_string())
            }
            "{%" => {
                let mut parts = split_block_args(inner).into_iter();
                let Some(name) = parts.next() else {
                    return Err(FormDesignerError::TemplateSyntaxError(
                        "Empty block tag".to_string(),
                    ));
                };
                Token::Block(name, parts.collect())
            }
            _ => Token::Comment(inner.to_string()),
        });

        rest = &rest[inner_start + inner_len + close.len()..];
    }

    if !rest.is_empty() {
        tokens.push(Token::Text(rest.to_string()));
    }

    Ok(tokens)
}

/// Finds the earliest opening delimiter in `s`.
fn next_opening(s: &str) -> Option<(usize, (&'static str, &'static str))> {
    DELIMITERS
        .iter()
        .filter_map(|pair| s.find(pair.0).map(|pos| (pos, *pair)))
        .min_by_key(|(pos, _)| *pos)
}

/// Splits block tag content on whitespace, keeping quoted strings together.
fn split_block_args(content: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in content.chars() {
        match (quote, ch) {
            (None, '\'' | '"') => {
                quote = Some(ch);
                current.push(ch);
            }
            (Some(q), c) if c == q => {
                quote = None;
                current.push(ch);
            }
            (None, c) if c.is_whitespace() => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}
