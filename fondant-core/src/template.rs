use std::path::Path;

use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;
use walkdir::WalkDir;

use crate::scanner::normalize;
use crate::site::path_to_name;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template error: {0}")]
    Tera(#[from] tera::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Tera with the includes directory loaded and a context shared by every
/// render.
pub struct TemplateRenderer {
    tera: Tera,
    context: Context,
}

impl TemplateRenderer {
    /// Load every file under `includes_dir`, named by its path relative to it
    /// (`layouts/base.njk`). A missing directory just means no layouts.
    pub fn new(includes_dir: &Path) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();

        if includes_dir.is_dir() {
            let mut files = Vec::new();
            for entry in WalkDir::new(includes_dir).sort_by_file_name() {
                let entry = entry.map_err(std::io::Error::from)?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let name = entry
                    .path()
                    .strip_prefix(includes_dir)
                    .map(|p| path_to_name(&normalize(p)))
                    .unwrap_or_default();
                files.push((entry.path().to_path_buf(), Some(name)));
            }
            tera.add_template_files(files)?;
        }

        Ok(Self {
            tera,
            context: Context::new(),
        })
    }

    /// Register page sources as templates so they can extend layouts.
    pub fn add_raw_templates<I, N, C>(&mut self, templates: I) -> Result<(), TemplateError>
    where
        I: IntoIterator<Item = (N, C)>,
        N: AsRef<str>,
        C: AsRef<str>,
    {
        self.tera.add_raw_templates(templates)?;
        Ok(())
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Add a value every render will see.
    pub fn add_to_context<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        self.context.insert(key, value);
    }

    /// Render with the shared context overlaid by `extra`.
    pub fn render(&self, template: &str, extra: &Context) -> Result<String, TemplateError> {
        let mut context = self.context.clone();
        context.extend(extra.clone());
        Ok(self.tera.render(template, &context)?)
    }
}
