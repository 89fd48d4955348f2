//! Prompt Loader - Load and cache prompt templates
//!
//! Templates are looked up as `<name>.md` in an optional directory first and
//! fall back to the built-in set. Parsed templates are cached in memory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{PostforgeError, Result};
use crate::prompt::builtin;
use crate::prompt::render::PromptTemplate;

/// Loads and caches prompt templates
pub struct PromptLoader {
    /// Directory whose `<name>.md` files override the built-ins
    templates_dir: Option<PathBuf>,
    /// Parsed templates by name
    cache: RwLock<HashMap<String, PromptTemplate>>,
}

impl Default for PromptLoader {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptLoader {
    /// Loader that reads `templates_dir` before falling back to built-ins
    pub fn new(templates_dir: impl AsRef<Path>) -> Self {
        Self {
            templates_dir: Some(templates_dir.as_ref().to_path_buf()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Loader that only knows the built-in templates
    pub fn builtin() -> Self {
        Self {
            templates_dir: None,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Load a template by name and cache it
    pub fn load(&self, name: &str) -> Result<PromptTemplate> {
        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(template) = cache.get(name) {
                return Ok(template.clone());
            }
        }

        let body = match self.template_path(name).filter(|p| p.exists()) {
            Some(path) => {
                log::debug!("Loading template '{}' from {}", name, path.display());
                std::fs::read_to_string(&path).map_err(|e| {
                    PostforgeError::Template(format!(
                        "Failed to load template '{}' from {}: {}",
                        name,
                        path.display(),
                        e
                    ))
                })?
            }
            None => builtin::template(name)
                .ok_or_else(|| PostforgeError::Template(format!("no template named '{}'", name)))?
                .to_string(),
        };

        let template = PromptTemplate::parse(name, body)?;

        self.cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), template.clone());

        Ok(template)
    }

    /// Whether a template can be resolved, on disk or built in
    pub fn exists(&self, name: &str) -> bool {
        self.template_path(name).is_some_and(|p| p.exists()) || builtin::template(name).is_some()
    }

    fn template_path(&self, name: &str) -> Option<PathBuf> {
        self.templates_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.md", name)))
    }

    /// Names of every resolvable template, sorted
    pub fn list_available(&self) -> Result<Vec<String>> {
        let mut templates: Vec<String> = builtin::names().iter().map(|s| s.to_string()).collect();

        if let Some(dir) = self.templates_dir.as_ref().filter(|d| d.is_dir()) {
            for entry in std::fs::read_dir(dir)?.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "md")
                    && let Some(stem) = path.file_stem()
                    && let Some(name) = stem.to_str()
                {
                    templates.push(name.to_string());
                }
            }
        }

        templates.sort();
        templates.dedup();
        Ok(templates)
    }

    /// Clear the template cache
    pub fn clear_cache(&self) {
        self.cache.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn templates_dir(&self) -> Option<&Path> {
        self.templates_dir.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::fields::PromptField;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_loader() -> (PromptLoader, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let loader = PromptLoader::new(temp_dir.path());
        (loader, temp_dir)
    }

    fn write_template(temp_dir: &TempDir, name: &str, content: &str) {
        let path = temp_dir.path().join(format!("{}.md", name));
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_new_loader() {
        let (loader, temp_dir) = create_test_loader();
        assert_eq!(loader.templates_dir(), Some(temp_dir.path()));
        assert!(PromptLoader::builtin().templates_dir().is_none());
    }

    #[test]
    fn test_load_from_directory() {
        let (loader, temp_dir) = create_test_loader();
        write_template(&temp_dir, "custom", "Hello {{ticker}}!");

        let template = loader.load("custom").unwrap();
        assert_eq!(template.body(), "Hello {{ticker}}!");
        assert!(template.required_fields().contains(&PromptField::Ticker));
    }

    #[test]
    fn test_directory_overrides_builtin() {
        let (loader, temp_dir) = create_test_loader();
        write_template(&temp_dir, "twitter", "Short: {{ticker}}");

        let template = loader.load("twitter").unwrap();
        assert_eq!(template.body(), "Short: {{ticker}}");
    }

    #[test]
    fn test_falls_back_to_builtin() {
        let (loader, _temp_dir) = create_test_loader();
        let template = loader.load("xueqiu").unwrap();
        assert!(template.required_fields().contains(&PromptField::Disclaimer));
    }

    #[test]
    fn test_load_caches_template() {
        let (loader, temp_dir) = create_test_loader();
        write_template(&temp_dir, "test", "Original content");

        let first = loader.load("test").unwrap();
        assert_eq!(first.body(), "Original content");

        write_template(&temp_dir, "test", "Modified content");

        let second = loader.load("test").unwrap();
        assert_eq!(second.body(), "Original content");

        loader.clear_cache();
        let third = loader.load("test").unwrap();
        assert_eq!(third.body(), "Modified content");
    }

    #[test]
    fn test_load_missing_template() {
        let loader = PromptLoader::builtin();
        let err = loader.load("linkedin").unwrap_err();
        assert!(matches!(err, PostforgeError::Template(_)));
    }

    #[test]
    fn test_load_rejects_unknown_placeholder() {
        let (loader, temp_dir) = create_test_loader();
        write_template(&temp_dir, "bad", "{{ticker}} hits {{price_target}}");

        let err = loader.load("bad").unwrap_err();
        assert!(err.is_invalid_request());
    }

    #[test]
    fn test_exists() {
        let (loader, temp_dir) = create_test_loader();
        write_template(&temp_dir, "exists", "content");

        assert!(loader.exists("exists"));
        assert!(loader.exists("youtube"));
        assert!(!loader.exists("nonexistent"));
    }

    #[test]
    fn test_list_available_merges_sources() {
        let (loader, temp_dir) = create_test_loader();
        write_template(&temp_dir, "alpha", "a");
        write_template(&temp_dir, "twitter", "t");
        fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

        let names = loader.list_available().unwrap();
        assert_eq!(names.first().map(String::as_str), Some("alpha"));
        assert_eq!(names.iter().filter(|n| *n == "twitter").count(), 1);
        assert!(!names.iter().any(|n| n == "notes"));
    }
}
