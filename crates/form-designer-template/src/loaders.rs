//! Template loaders.
//!
//! A [`TemplateLoader`] finds template source by name. The engine asks the
//! configured directories first ([`FileSystemLoader`]) and falls back to the
//! in-memory templates ([`StringLoader`]) that hold the built-ins.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use form_designer_core::FormDesignerError;

/// Loads template source text by name.
pub trait TemplateLoader: Send + Sync {
    /// Loads the template source with the given name.
    ///
    /// # Errors
    ///
    /// Returns `TemplateDoesNotExist` if the template cannot be found.
    fn load(&self, name: &str) -> Result<String, FormDesignerError>;
}

/// Loads templates from directories on the filesystem, first match wins.
pub struct FileSystemLoader {
    dirs: Vec<PathBuf>,
}

impl FileSystemLoader {
    /// Creates a loader searching `dirs` in order.
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }
}

impl TemplateLoader for FileSystemLoader {
    fn load(&self, name: &str) -> Result<String, FormDesignerError> {
        // Names must stay inside the template directories.
        let relative = Path::new(name);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(FormDesignerError::TemplateDoesNotExist(name.to_string()));
        }

        for dir in &self.dirs {
            let path = dir.join(relative);
            if path.is_file() {
                return std::fs::read_to_string(&path).map_err(|e| {
                    FormDesignerError::TemplateDoesNotExist(format!(
                        "Error reading template '{}': {e}",
                        path.display()
                    ))
                });
            }
        }

        Err(FormDesignerError::TemplateDoesNotExist(name.to_string()))
    }
}

/// Holds templates in memory, keyed by name.
pub struct StringLoader {
    templates: RwLock<HashMap<String, String>>,
}

impl StringLoader {
    /// Creates an empty `StringLoader`.
    pub fn new() -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
        }
    }

    /// Adds or replaces a template.
    pub fn add(&self, name: impl Into<String>, source: impl Into<String>) {
        self.templates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), source.into());
    }
}

impl Default for StringLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateLoader for StringLoader {
    fn load(&self, name: &str) -> Result<String, FormDesignerError> {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| FormDesignerError::TemplateDoesNotExist(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_loader_add_and_overwrite() {
        let loader = StringLoader::new();
        loader.add("x.txt", "one");
        assert_eq!(loader.load("x.txt").unwrap(), "one");
        loader.add("x.txt", "two");
        assert_eq!(loader.load("x.txt").unwrap(), "two");
    }

    #[test]
    fn test_string_loader_missing() {
        assert!(matches!(
            StringLoader::new().load("missing.html"),
            Err(FormDesignerError::TemplateDoesNotExist(_))
        ));
    }

    #[test]
    fn test_filesystem_loader_searches_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(second.path().join("html")).unwrap();
        std::fs::write(second.path().join("html/page.html"), "second").unwrap();

        let loader = FileSystemLoader::new(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);
        assert_eq!(loader.load("html/page.html").unwrap(), "second");

        std::fs::create_dir_all(first.path().join("html")).unwrap();
        std::fs::write(first.path().join("html/page.html"), "first").unwrap();
        assert_eq!(loader.load("html/page.html").unwrap(), "first");
    }

    #[test]
    fn test_filesystem_loader_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FileSystemLoader::new(vec![dir.path().join("templates")]);
        std::fs::write(dir.path().join("secret.txt"), "nope").unwrap();
        assert!(loader.load("../secret.txt").is_err());
        assert!(loader.load("/etc/passwd").is_err());
    }
}
