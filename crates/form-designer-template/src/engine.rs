//! The template engine.
//!
//! [`Engine`] resolves template names against the configured template
//! directories and then the built-in templates, parses them, and renders them
//! against a [`Context`]. Templates whose name ends in `.txt` render with
//! auto-escaping off.

use std::path::PathBuf;

use form_designer_core::{FormDesignerError, FormDesignerSettings};

use crate::builtins;
use crate::context::Context;
use crate::lexer;
use crate::loaders::{FileSystemLoader, StringLoader, TemplateLoader};
use crate::parser::{self, Template};

/// Renders templates by name. Implemented by [`Engine`] and used by
/// `{% include %}`.
pub trait TemplateRenderer: Send + Sync {
    /// Renders a named template with the given context.
    ///
    /// # Errors
    ///
    /// Returns `TemplateDoesNotExist` or `TemplateSyntaxError`.
    fn render_template(&self, name: &str, context: &mut Context)
        -> Result<String, FormDesignerError>;
}

/// The template engine.
///
/// # Examples
///
/// ```
/// use form_designer_template::{Context, ContextValue, Engine};
///
/// let engine = Engine::new();
/// engine.add_string_template("hello.txt", "Hello {{ name }}!");
///
/// let mut ctx = Context::new();
/// ctx.set("name", ContextValue::from("<World>"));
/// assert_eq!(engine.render_to_string("hello.txt", &mut ctx).unwrap(), "Hello <World>!");
/// ```
pub struct Engine {
    loaders: Vec<Box<dyn TemplateLoader>>,
    string_loader: StringLoader,
}

impl Engine {
    /// Creates an engine that knows only the built-in templates.
    pub fn new() -> Self {
        let string_loader = StringLoader::new();
        for (name, source) in builtins::templates() {
            string_loader.add(name, source);
        }
        Self {
            loaders: Vec::new(),
            string_loader,
        }
    }

    /// Creates an engine that searches `dirs` before the built-in templates.
    pub fn with_dirs(dirs: Vec<PathBuf>) -> Self {
        let mut engine = Self::new();
        if !dirs.is_empty() {
            engine.add_loader(Box::new(FileSystemLoader::new(dirs)));
        }
        engine
    }

    /// Creates an engine from the `template_dirs` setting.
    pub fn from_settings(settings: &FormDesignerSettings) -> Self {
        Self::with_dirs(settings.template_dirs.clone())
    }

    /// Adds a loader, consulted after previously added loaders and before
    /// the built-in templates.
    pub fn add_loader(&mut self, loader: Box<dyn TemplateLoader>) {
        self.loaders.push(loader);
    }

    /// Adds or replaces an in-memory template.
    pub fn add_string_template(&self, name: &str, source: &str) {
        self.string_loader.add(name, source);
    }

    fn load_source(&self, name: &str) -> Result<String, FormDesignerError> {
        for loader in &self.loaders {
            if let Ok(source) = loader.load(name) {
                return Ok(source);
            }
        }
        self.string_loader.load(name)
    }

    /// Loads and parses a template by name.
    ///
    /// # Errors
    ///
    /// Returns `TemplateDoesNotExist` if no loader has the template, or
    /// `TemplateSyntaxError` if it does not parse.
    pub fn get_template(&self, name: &str) -> Result<Template, FormDesignerError> {
        let source = self.load_source(name)?;
        parser::parse(name, &lexer::tokenize(&source)?)
    }

    /// Renders a template by name. Auto-escaping is switched off for `.txt`
    /// templates and on for everything else.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is missing, fails to parse, or fails
    /// to render.
    pub fn render_to_string(
        &self,
        name: &str,
        context: &mut Context,
    ) -> Result<String, FormDesignerError> {
        tracing::debug!(template = name, "rendering template");
        context.set_auto_escape(!name.ends_with(".txt"));
        self.render_template(name, context)
    }

    /// Parses and renders template source directly, keeping the context's
    /// auto-escape setting.
    ///
    /// # Errors
    ///
    /// Returns `TemplateSyntaxError` if `source` does not parse, or a render
    /// error from an included template.
    pub fn render_string(
        &self,
        source: &str,
        context: &mut Context,
    ) -> Result<String, FormDesignerError> {
        let template = parser::parse("<string>", &lexer::tokenize(source)?)?;
        parser::render_nodes(&template.nodes, context, self)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer for Engine {
    fn render_template(
        &self,
        name: &str,
        context: &mut Context,
    ) -> Result<String, FormDesignerError> {
        let template = self.get_template(name)?;
        parser::render_nodes(&template.nodes, context, self)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::context::ContextValue;

    fn entry(name: &str, label: &str, value: ContextValue) -> ContextValue {
        let mut map = BTreeMap::new();
        map.insert("name".to_string(), ContextValue::from(name));
        map.insert("label".to_string(), ContextValue::from(label));
        map.insert("value".to_string(), value);
        ContextValue::Dict(map)
    }

    #[test]
    fn test_data_message_builtin() {
        let engine = Engine::new();
        let mut ctx = Context::new();
        ctx.set(
            "data",
            ContextValue::List(vec![
                entry("name", "Name", "Ann & Bob".into()),
                entry("age", "Age", ContextValue::Integer(42)),
            ]),
        );
        let out = engine
            .render_to_string(builtins::DATA_MESSAGE, &mut ctx)
            .unwrap();
        assert_eq!(out, "Name: Ann & Bob\nAge: 42\n");
    }

    #[test]
    fn test_html_templates_escape() {
        let engine = Engine::new();
        engine.add_string_template("x.html", "{{ v }}");
        let mut ctx = Context::new();
        ctx.set("v", ContextValue::from("<i>"));
        assert_eq!(engine.render_to_string("x.html", &mut ctx).unwrap(), "&lt;i&gt;");
    }

    #[test]
    fn test_render_string_keeps_context_escaping() {
        let engine = Engine::new();
        let mut ctx = Context::new();
        ctx.set_auto_escape(false);
        ctx.set("email", ContextValue::from("a&b@example.com"));
        assert_eq!(
            engine.render_string("{{ email }}", &mut ctx).unwrap(),
            "a&b@example.com"
        );
    }

    #[test]
    fn test_missing_template() {
        let engine = Engine::new();
        assert!(matches!(
            engine.render_to_string("nope.html", &mut Context::new()),
            Err(FormDesignerError::TemplateDoesNotExist(_))
        ));
    }

    #[test]
    fn test_template_dirs_override_builtins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("txt/formdefinition")).unwrap();
        std::fs::write(
            dir.path().join(builtins::DATA_MESSAGE),
            "custom {{ data|length }}",
        )
        .unwrap();

        let engine = Engine::with_dirs(vec![dir.path().to_path_buf()]);
        let mut ctx = Context::new();
        ctx.set("data", ContextValue::List(vec![]));
        assert_eq!(
            engine
                .render_to_string(builtins::DATA_MESSAGE, &mut ctx)
                .unwrap(),
            "custom 0"
        );
    }

    #[test]
    fn test_include_resolves_through_engine() {
        let engine = Engine::new();
        engine.add_string_template("outer.html", "<{% include inner %}>");
        engine.add_string_template("inner.html", "{{ who }}");
        let mut ctx = Context::new();
        ctx.set("inner", ContextValue::from("inner.html"));
        ctx.set("who", ContextValue::from("me"));
        assert_eq!(engine.render_to_string("outer.html", &mut ctx).unwrap(), "<me>");
    }
}
