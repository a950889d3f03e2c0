//! Template parser and renderer.
//!
//! Converts lexer [`Token`]s into a tree of [`Node`]s and renders that tree
//! against a [`Context`]. Every tag must be closed and every filter must exist
//! in the [`default_registry`]; anything else is a `TemplateSyntaxError`
//! raised before rendering starts.

use std::collections::BTreeMap;

use form_designer_core::FormDesignerError;

use crate::context::{escape_html, Context, ContextValue};
use crate::engine::TemplateRenderer;
use crate::filters::default_registry;
use crate::lexer::Token;

/// A variable reference or a literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A dotted variable path such as `field.label`.
    Variable(String),
    /// A string, number, boolean or `None` literal.
    Literal(ContextValue),
}

impl Expression {
    /// Resolves this expression against a context. Undefined variables
    /// resolve to [`ContextValue::None`].
    pub fn resolve(&self, context: &Context) -> ContextValue {
        match self {
            Self::Variable(path) => context.get(path).cloned().unwrap_or(ContextValue::None),
            Self::Literal(value) => value.clone(),
        }
    }
}

/// A filter applied to a value, with its optional argument.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    /// The registered filter name.
    pub name: String,
    /// The filter arguments (zero or one).
    pub args: Vec<Expression>,
}

/// An expression followed by a chain of filters: `name|lower|default:"-"`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpression {
    /// The value the filters apply to.
    pub base: Expression,
    /// Filters in application order.
    pub filters: Vec<FilterCall>,
}

impl FilterExpression {
    /// Resolves the base expression and applies each filter in turn.
    ///
    /// # Errors
    ///
    /// Propagates errors raised by filters.
    pub fn resolve(&self, context: &Context) -> Result<ContextValue, FormDesignerError> {
        let registry = default_registry();
        let mut value = self.base.resolve(context);
        for filter in &self.filters {
            let args: Vec<ContextValue> = filter.args.iter().map(|a| a.resolve(context)).collect();
            value = registry.apply(&filter.name, &value, &args)?;
        }
        Ok(value)
    }
}

/// A condition in an `{% if %}` or `{% elif %}` tag.
#[derive(Debug, Clone, PartialEq)]
pub enum IfCondition {
    /// Truthiness of a value.
    Value(FilterExpression),
    /// `not <condition>`.
    Not(Box<IfCondition>),
    /// `<condition> and <condition>`.
    And(Box<IfCondition>, Box<IfCondition>),
    /// `<condition> or <condition>`.
    Or(Box<IfCondition>, Box<IfCondition>),
    /// `==`, `!=`, `<`, `>`, `<=`, `>=`.
    Compare(FilterExpression, String, FilterExpression),
    /// `a in b`, or `a not in b` when `negated`.
    In {
        /// The value searched for.
        needle: FilterExpression,
        /// The list, string or dict searched.
        haystack: FilterExpression,
        /// Whether this is `not in`.
        negated: bool,
    },
    /// The `{% else %}` branch.
    Else,
}

impl IfCondition {
    /// Evaluates this condition against a context.
    ///
    /// # Errors
    ///
    /// Propagates filter errors from the operands.
    pub fn evaluate(&self, context: &Context) -> Result<bool, FormDesignerError> {
        Ok(match self {
            Self::Value(expr) => expr.resolve(context)?.is_truthy(),
            Self::Not(inner) => !inner.evaluate(context)?,
            Self::And(left, right) => left.evaluate(context)? && right.evaluate(context)?,
            Self::Or(left, right) => left.evaluate(context)? || right.evaluate(context)?,
            Self::Compare(left, op, right) => {
                compare_values(&left.resolve(context)?, op, &right.resolve(context)?)
            }
            Self::In {
                needle,
                haystack,
                negated,
            } => value_in(&needle.resolve(context)?, &haystack.resolve(context)?) != *negated,
            Self::Else => true,
        })
    }
}

fn value_in(needle: &ContextValue, haystack: &ContextValue) -> bool {
    match haystack {
        ContextValue::List(items) => items.iter().any(|item| item == needle),
        ContextValue::String(s) | ContextValue::SafeString(s) => {
            needle.as_str().is_some_and(|n| s.contains(n))
        }
        ContextValue::Dict(map) => needle.as_str().is_some_and(|key| map.contains_key(key)),
        _ => false,
    }
}

fn compare_values(left: &ContextValue, op: &str, right: &ContextValue) -> bool {
    if op == "==" {
        return left == right;
    }
    if op == "!=" {
        return left != right;
    }
    let ordering = match (left.as_float(), right.as_float()) {
        (Some(l), Some(r)) => l.partial_cmp(&r),
        _ => Some(left.to_display_string().cmp(&right.to_display_string())),
    };
    ordering.is_some_and(|ord| match op {
        "<" => ord.is_lt(),
        ">" => ord.is_gt(),
        "<=" => ord.is_le(),
        ">=" => ord.is_ge(),
        _ => false,
    })
}

/// A node in the parsed template tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text.
    Text(String),
    /// `{{ expression|filters }}`.
    Variable(FilterExpression),
    /// `{% if %}` with its `elif`/`else` branches, tried in order.
    If {
        /// `(condition, body)` pairs.
        branches: Vec<(IfCondition, Vec<Node>)>,
    },
    /// `{% for a, b in items [reversed] %}` with an optional `{% empty %}`.
    For {
        /// Loop variable names.
        loop_vars: Vec<String>,
        /// The iterated value.
        iterable: FilterExpression,
        /// Whether to iterate in reverse.
        reversed: bool,
        /// Body rendered per item.
        body: Vec<Node>,
        /// Body rendered when there are no items.
        empty_body: Vec<Node>,
    },
    /// `{% with name=value %}`.
    With {
        /// Names bound for the body.
        assignments: Vec<(String, FilterExpression)>,
        /// The body.
        body: Vec<Node>,
    },
    /// `{% include name [with k=v ...] [only] %}`.
    Include {
        /// Expression yielding the included template's name.
        template_name: FilterExpression,
        /// Extra names bound for the included template.
        extra_context: Vec<(String, FilterExpression)>,
        /// When set, the included template sees only `extra_context`.
        only: bool,
    },
}

/// A parsed template.
#[derive(Debug, Clone)]
pub struct Template {
    /// The template name.
    pub name: String,
    /// The parsed node tree.
    pub nodes: Vec<Node>,
}

/// Parses a token stream into a [`Template`].
///
/// # Errors
///
/// Returns `TemplateSyntaxError` for unknown tags, unknown filters, unclosed
/// blocks, and malformed expressions.
pub fn parse(name: &str, tokens: &[Token]) -> Result<Template, FormDesignerError> {
    let mut parser = ParserState { tokens, pos: 0 };
    let mut nodes = Vec::new();
    while let Some(token) = parser.next_token() {
        if let Some(node) = parser.parse_token(token)? {
            nodes.push(node);
        }
    }
    Ok(Template {
        name: name.to_string(),
        nodes,
    })
}

fn syntax_error(message: impl Into<String>) -> FormDesignerError {
    FormDesignerError::TemplateSyntaxError(message.into())
}

struct ParserState<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> ParserState<'a> {
    fn next_token(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn parse_token(&mut self, token: &'a Token) -> Result<Option<Node>, FormDesignerError> {
        match token {
            Token::Text(text) => Ok(Some(Node::Text(text.clone()))),
            Token::Comment(_) => Ok(None),
            Token::Variable(expr) => Ok(Some(Node::Variable(parse_filter_expression(expr)?))),
            Token::Block(tag, args) => self.parse_tag(tag, args),
        }
    }

    /// Parses nodes until one of `end_tags`, returning the body and the
    /// closing tag with its arguments.
    fn parse_until(
        &mut self,
        end_tags: &[&str],
    ) -> Result<(Vec<Node>, &'a str, &'a [String]), FormDesignerError> {
        let mut nodes = Vec::new();
        while let Some(token) = self.next_token() {
            if let Token::Block(tag, args) = token {
                if end_tags.contains(&tag.as_str()) {
                    return Ok((nodes, tag.as_str(), args.as_slice()));
                }
            }
            if let Some(node) = self.parse_token(token)? {
                nodes.push(node);
            }
        }
        Err(syntax_error(format!(
            "Unclosed tag: expected one of {}",
            end_tags.join(", ")
        )))
    }

    fn parse_tag(
        &mut self,
        tag: &str,
        args: &'a [String],
    ) -> Result<Option<Node>, FormDesignerError> {
        match tag {
            "if" => self.parse_if(args).map(Some),
            "for" => self.parse_for(args).map(Some),
            "with" => self.parse_with(args).map(Some),
            "include" => parse_include(args).map(Some),
            "comment" => {
                self.skip_comment()?;
                Ok(None)
            }
            _ => Err(syntax_error(format!("Invalid block tag: '{tag}'"))),
        }
    }

    fn parse_if(&mut self, args: &'a [String]) -> Result<Node, FormDesignerError> {
        let mut branches = Vec::new();
        let mut condition = parse_if_condition(args)?;

        loop {
            let (body, end, end_args) = self.parse_until(&["elif", "else", "endif"])?;
            branches.push((condition, body));
            match end {
                "elif" => condition = parse_if_condition(end_args)?,
                "else" => {
                    let (body, _, _) = self.parse_until(&["endif"])?;
                    branches.push((IfCondition::Else, body));
                    break;
                }
                _ => break,
            }
        }

        Ok(Node::If { branches })
    }

    fn parse_for(&mut self, args: &'a [String]) -> Result<Node, FormDesignerError> {
        let in_pos = args
            .iter()
            .position(|a| a == "in")
            .ok_or_else(|| syntax_error("'for' statements should use the format 'for x in y'"))?;

        let loop_vars: Vec<String> = args[..in_pos]
            .join(" ")
            .split(',')
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if loop_vars.is_empty() || !loop_vars.iter().all(|v| is_variable_path(v)) {
            return Err(syntax_error("'for' tag received an invalid loop variable"));
        }

        let mut rest = &args[in_pos + 1..];
        let reversed = rest.last().is_some_and(|a| a == "reversed");
        if reversed {
            rest = &rest[..rest.len() - 1];
        }
        if rest.len() != 1 {
            return Err(syntax_error("'for' tag requires a single iterable"));
        }
        let iterable = parse_filter_expression(&rest[0])?;

        let (body, end, _) = self.parse_until(&["empty", "endfor"])?;
        let empty_body = if end == "empty" {
            self.parse_until(&["endfor"])?.0
        } else {
            Vec::new()
        };

        Ok(Node::For {
            loop_vars,
            iterable,
            reversed,
            body,
            empty_body,
        })
    }

    fn parse_with(&mut self, args: &'a [String]) -> Result<Node, FormDesignerError> {
        let assignments = match args {
            [value, as_kw, name] if as_kw == "as" => {
                vec![(name.clone(), parse_filter_expression(value)?)]
            }
            _ => parse_assignments(args)?,
        };
        if assignments.is_empty() {
            return Err(syntax_error("'with' expected at least one variable assignment"));
        }
        let (body, _, _) = self.parse_until(&["endwith"])?;
        Ok(Node::With { assignments, body })
    }

    /// Skips everything up to `{% endcomment %}` without parsing it.
    fn skip_comment(&mut self) -> Result<(), FormDesignerError> {
        while let Some(token) = self.next_token() {
            if matches!(token, Token::Block(tag, _) if tag == "endcomment") {
                return Ok(());
            }
        }
        Err(syntax_error("Unclosed tag: expected endcomment"))
    }
}

fn parse_include(args: &[String]) -> Result<Node, FormDesignerError> {
    let (name, rest) = args
        .split_first()
        .ok_or_else(|| syntax_error("'include' tag takes at least one argument"))?;
    let template_name = parse_filter_expression(name)?;

    let mut only = false;
    let mut extra_context = Vec::new();
    let mut options = rest.iter().peekable();
    while let Some(option) = options.next() {
        match option.as_str() {
            "only" => only = true,
            "with" => {
                let mut pairs = Vec::new();
                while let Some(pair) = options.next_if(|a| a.contains('=')) {
                    pairs.push(pair.clone());
                }
                extra_context.extend(parse_assignments(&pairs)?);
            }
            other => {
                return Err(syntax_error(format!(
                    "Unknown argument for 'include' tag: '{other}'"
                )))
            }
        }
    }

    Ok(Node::Include {
        template_name,
        extra_context,
        only,
    })
}

fn parse_assignments(args: &[String]) -> Result<Vec<(String, FilterExpression)>, FormDesignerError> {
    args.iter()
        .map(|arg| {
            let (key, value) = arg
                .split_once('=')
                .ok_or_else(|| syntax_error(format!("Expected 'name=value', got '{arg}'")))?;
            if !is_variable_path(key) || key.contains('.') {
                return Err(syntax_error(format!("Invalid variable name: '{key}'")));
            }
            Ok((key.to_string(), parse_filter_expression(value)?))
        })
        .collect()
}

fn parse_if_condition(args: &[String]) -> Result<IfCondition, FormDesignerError> {
    if args.is_empty() {
        return Err(syntax_error("'if' statement requires a condition"));
    }
    let mut pos = 0;
    let condition = parse_or(args, &mut pos)?;
    if pos != args.len() {
        return Err(syntax_error(format!(
            "Unused '{}' at end of if expression",
            args[pos]
        )));
    }
    Ok(condition)
}

fn parse_or(args: &[String], pos: &mut usize) -> Result<IfCondition, FormDesignerError> {
    let mut left = parse_and(args, pos)?;
    while args.get(*pos).is_some_and(|a| a == "or") {
        *pos += 1;
        let right = parse_and(args, pos)?;
        left = IfCondition::Or(Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_and(args: &[String], pos: &mut usize) -> Result<IfCondition, FormDesignerError> {
    let mut left = parse_not(args, pos)?;
    while args.get(*pos).is_some_and(|a| a == "and") {
        *pos += 1;
        let right = parse_not(args, pos)?;
        left = IfCondition::And(Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_not(args: &[String], pos: &mut usize) -> Result<IfCondition, FormDesignerError> {
    if args.get(*pos).is_some_and(|a| a == "not") {
        *pos += 1;
        return Ok(IfCondition::Not(Box::new(parse_not(args, pos)?)));
    }
    parse_comparison(args, pos)
}

fn parse_operand(args: &[String], pos: &mut usize) -> Result<FilterExpression, FormDesignerError> {
    let arg = args
        .get(*pos)
        .ok_or_else(|| syntax_error("Unexpected end of if expression"))?;
    if matches!(arg.as_str(), "and" | "or" | "not" | "in") {
        return Err(syntax_error(format!("Unexpected '{arg}' in if expression")));
    }
    *pos += 1;
    parse_filter_expression(arg)
}

fn parse_comparison(args: &[String], pos: &mut usize) -> Result<IfCondition, FormDesignerError> {
    let left = parse_operand(args, pos)?;

    match args.get(*pos).map(String::as_str) {
        Some(op @ ("==" | "!=" | "<" | ">" | "<=" | ">=")) => {
            *pos += 1;
            let right = parse_operand(args, pos)?;
            Ok(IfCondition::Compare(left, op.to_string(), right))
        }
        Some("in") => {
            *pos += 1;
            Ok(IfCondition::In {
                needle: left,
                haystack: parse_operand(args, pos)?,
                negated: false,
            })
        }
        Some("not") if args.get(*pos + 1).is_some_and(|a| a == "in") => {
            *pos += 2;
            Ok(IfCondition::In {
                needle: left,
                haystack: parse_operand(args, pos)?,
                negated: true,
            })
        }
        _ => Ok(IfCondition::Value(left)),
    }
}

/// Parses `base|filter|filter:arg`.
///
/// # Errors
///
/// Returns `TemplateSyntaxError` for malformed expressions and for filters
/// that are not registered.
pub fn parse_filter_expression(expr: &str) -> Result<FilterExpression, FormDesignerError> {
    let mut parts = split_outside_quotes(expr, '|').into_iter();
    let base = parse_expression(parts.next().unwrap_or_default())?;

    let registry = default_registry();
    let mut filters = Vec::new();
    for part in parts {
        let part = part.trim();
        let (name, arg) = match split_outside_quotes(part, ':').as_slice() {
            [name] => (name.trim(), None),
            [name, arg] => (name.trim(), Some(parse_expression(arg)?)),
            _ => return Err(syntax_error(format!("Could not parse filter '{part}'"))),
        };
        if !registry.contains(name) {
            return Err(syntax_error(format!("Invalid filter: '{name}'")));
        }
        filters.push(FilterCall {
            name: name.to_string(),
            args: arg.into_iter().collect(),
        });
    }

    Ok(FilterExpression { base, filters })
}

/// Parses a single variable path or literal.
///
/// # Errors
///
/// Returns `TemplateSyntaxError` if `s` is neither a literal nor a valid
/// dotted variable path.
pub fn parse_expression(s: &str) -> Result<Expression, FormDesignerError> {
    let s = s.trim();

    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        return Ok(Expression::Literal(ContextValue::String(
            s[1..s.len() - 1].to_string(),
        )));
    }

    match s {
        "True" => return Ok(Expression::Literal(ContextValue::Bool(true))),
        "False" => return Ok(Expression::Literal(ContextValue::Bool(false))),
        "None" => return Ok(Expression::Literal(ContextValue::None)),
        _ => {}
    }

    if s.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.') {
        if let Ok(i) = s.parse::<i64>() {
            return Ok(Expression::Literal(ContextValue::Integer(i)));
        }
        if let Ok(f) = s.parse::<f64>() {
            return Ok(Expression::Literal(ContextValue::Float(f)));
        }
    }

    if is_variable_path(s) {
        Ok(Expression::Variable(s.to_string()))
    } else {
        Err(syntax_error(format!("Could not parse the remainder: '{s}'")))
    }
}

fn is_variable_path(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with('_')
        && s.split('.')
            .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_alphanumeric() || c == '_'))
}

/// Splits on `sep` outside single or double quotes.
fn split_outside_quotes(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;

    for (i, ch) in s.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == sep => {
                parts.push(&s[start..i]);
                start = i + ch.len_utf8();
            }
            None => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Renders a node tree to a string.
///
/// # Errors
///
/// Propagates filter errors and failures to load included templates.
pub fn render_nodes(
    nodes: &[Node],
    context: &mut Context,
    engine: &dyn TemplateRenderer,
) -> Result<String, FormDesignerError> {
    let mut output = String::new();
    for node in nodes {
        render_node(node, context, engine, &mut output)?;
    }
    Ok(output)
}

fn render_node(
    node: &Node,
    context: &mut Context,
    engine: &dyn TemplateRenderer,
    output: &mut String,
) -> Result<(), FormDesignerError> {
    match node {
        Node::Text(text) => output.push_str(text),
        Node::Variable(expr) => {
            let value = expr.resolve(context)?;
            let text = value.to_display_string();
            if context.auto_escape() && !value.is_safe() {
                output.push_str(&escape_html(&text));
            } else {
                output.push_str(&text);
            }
        }
        Node::If { branches } => {
            for (condition, body) in branches {
                if condition.evaluate(context)? {
                    output.push_str(&render_nodes(body, context, engine)?);
                    break;
                }
            }
        }
        Node::For {
            loop_vars,
            iterable,
            reversed,
            body,
            empty_body,
        } => {
            let items = iterable.resolve(context)?;
            render_for(loop_vars, &items, *reversed, body, empty_body, context, engine, output)?;
        }
        Node::With { assignments, body } => {
            let mut bound = Vec::with_capacity(assignments.len());
            for (name, expr) in assignments {
                bound.push((name, expr.resolve(context)?));
            }
            context.push();
            for (name, value) in bound {
                context.set(name.as_str(), value);
            }
            let rendered = render_nodes(body, context, engine);
            context.pop();
            output.push_str(&rendered?);
        }
        Node::Include {
            template_name,
            extra_context,
            only,
        } => {
            let name = template_name.resolve(context)?.to_display_string();
            let mut extra = BTreeMap::new();
            for (key, expr) in extra_context {
                extra.insert(key.clone(), expr.resolve(context)?);
            }

            let rendered = if *only {
                let mut isolated = Context::from_map(extra);
                isolated.set_auto_escape(context.auto_escape());
                engine.render_template(&name, &mut isolated)
            } else {
                context.push();
                context.update(extra);
                let rendered = engine.render_template(&name, context);
                context.pop();
                rendered
            };
            output.push_str(&rendered?);
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn render_for(
    loop_vars: &[String],
    items: &ContextValue,
    reversed: bool,
    body: &[Node],
    empty_body: &[Node],
    context: &mut Context,
    engine: &dyn TemplateRenderer,
    output: &mut String,
) -> Result<(), FormDesignerError> {
    let mut list: Vec<ContextValue> = match items {
        ContextValue::List(list) => list.clone(),
        ContextValue::Dict(map) if loop_vars.len() == 2 => map
            .iter()
            .map(|(k, v)| ContextValue::List(vec![ContextValue::String(k.clone()), v.clone()]))
            .collect(),
        ContextValue::Dict(map) => map.keys().map(|k| ContextValue::String(k.clone())).collect(),
        _ => Vec::new(),
    };
    if reversed {
        list.reverse();
    }

    if list.is_empty() {
        output.push_str(&render_nodes(empty_body, context, engine)?);
        return Ok(());
    }

    let parent_loop = context.get("forloop").cloned();
    let total = list.len();

    for (idx, item) in list.into_iter().enumerate() {
        context.push();

        match (loop_vars, item) {
            ([single], item) => context.set(single.as_str(), item),
            (vars, ContextValue::List(values)) => {
                for (j, var) in vars.iter().enumerate() {
                    context.set(
                        var.as_str(),
                        values.get(j).cloned().unwrap_or(ContextValue::None),
                    );
                }
            }
            (vars, item) => {
                if let Some(first) = vars.first() {
                    context.set(first.as_str(), item);
                }
            }
        }

        let mut forloop = BTreeMap::new();
        forloop.insert("counter".to_string(), ContextValue::from(idx + 1));
        forloop.insert("counter0".to_string(), ContextValue::from(idx));
        forloop.insert("revcounter".to_string(), ContextValue::from(total - idx));
        forloop.insert("revcounter0".to_string(), ContextValue::from(total - idx - 1));
        forloop.insert("first".to_string(), ContextValue::Bool(idx == 0));
        forloop.insert("last".to_string(), ContextValue::Bool(idx + 1 == total));
        if let Some(parent) = &parent_loop {
            forloop.insert("parentloop".to_string(), parent.clone());
        }
        context.set("forloop", ContextValue::Dict(forloop));

        let rendered = render_nodes(body, context, engine);
        context.pop();
        output.push_str(&rendered?);
    }

    Ok(())
}
