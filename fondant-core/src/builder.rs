use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::Context;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::{BuildConfig, SiteConfig};
use crate::markdown::{DEFAULT_SYNTAX_THEME, render_markdown};
use crate::site::{Collection, Page, PageFormat};
use crate::template::{TemplateError, TemplateRenderer};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Source directory not specified")]
    MissingSourceDir,
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Scan error: {0}")]
    Scan(#[from] crate::scanner::ScanError),
    #[error("data file {}: {source}", .path.display())]
    Data {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("page {page} uses layout {layout}, which is not in the includes directory")]
    MissingLayout { page: String, layout: String },
}

/// What a build produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub pages: usize,
    pub posts: usize,
    pub copied_files: usize,
}

#[derive(Serialize)]
struct PageContext<'a> {
    url: String,
    title: &'a str,
    date: Option<String>,
    description: Option<&'a str>,
    source: String,
}

pub struct SiteBuilder {
    source_dir: Option<PathBuf>,
    output_dir: PathBuf,
    includes_dir: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    passthrough: Vec<String>,
    posts_dir: String,
    syntax_theme: String,
    live_reload: Option<String>,
    site: SiteConfig,
    pages: Vec<Page>,
    custom: HashMap<String, serde_json::Value>,
}

impl Default for SiteBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteBuilder {
    pub fn new() -> Self {
        Self {
            source_dir: None,
            output_dir: PathBuf::from("./_site"),
            includes_dir: None,
            data_dir: None,
            passthrough: Vec::new(),
            posts_dir: "blog/posts".to_string(),
            syntax_theme: DEFAULT_SYNTAX_THEME.to_string(),
            live_reload: None,
            site: SiteConfig::default(),
            pages: Vec::new(),
            custom: HashMap::new(),
        }
    }

    /// Take every path from a `[build]` table.
    pub fn layout(self, build: &BuildConfig) -> Self {
        self.source_dir(build.input_dir())
            .output_dir(build.output_dir())
            .includes_dir(build.includes_dir())
            .data_dir(build.data_dir())
            .passthrough(build.passthrough.clone())
            .posts_dir(&build.posts)
    }

    // Required configuration
    pub fn source_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.source_dir = Some(path.as_ref().to_path_buf());
        self
    }

    // Optional paths
    pub fn output_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_dir = path.as_ref().to_path_buf();
        self
    }

    pub fn includes_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.includes_dir = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn passthrough(mut self, dirs: Vec<String>) -> Self {
        self.passthrough = dirs;
        self
    }

    pub fn posts_dir(mut self, dir: &str) -> Self {
        self.posts_dir = dir.to_string();
        self
    }

    pub fn syntax_theme<S: Into<String>>(mut self, theme: S) -> Self {
        self.syntax_theme = theme.into();
        self
    }

    /// Inject the live-reload client pointing at `ws_url` into every page.
    pub fn live_reload<S: Into<String>>(mut self, ws_url: S) -> Self {
        self.live_reload = Some(ws_url.into());
        self
    }

    pub fn site_config(mut self, config: SiteConfig) -> Self {
        self.site = config;
        self
    }

    pub fn add_custom<T: Serialize>(mut self, key: &str, value: T) -> Result<Self, BuildError> {
        let json_value = serde_json::to_value(value).map_err(|source| BuildError::Data {
            path: PathBuf::from(key),
            source,
        })?;
        self.custom.insert(key.to_string(), json_value);
        Ok(self)
    }

    pub fn add_pages(mut self, pages: Vec<Page>) -> Self {
        self.pages.extend(pages);
        self
    }

    pub fn build(self) -> Result<Site, BuildError> {
        let source_dir = self.source_dir.ok_or(BuildError::MissingSourceDir)?;
        let includes_dir = self
            .includes_dir
            .unwrap_or_else(|| source_dir.join("_includes"));
        let data_dir = self.data_dir.unwrap_or_else(|| source_dir.join("_data"));

        let mut renderer = TemplateRenderer::new(&includes_dir)?;

        let templates: Vec<(String, &str)> = self
            .pages
            .iter()
            .filter(|p| p.format != PageFormat::Markdown)
            .map(|p| (p.template_name(), p.body.as_str()))
            .collect();
        renderer.add_raw_templates(templates)?;

        let posts: Vec<&Page> = self
            .pages
            .iter()
            .filter(|p| p.format == PageFormat::Markdown && p.is_under(&self.posts_dir))
            .collect();
        let posts = Collection::reverse_chronological("posts", &posts);

        let mut collections = HashMap::new();
        collections.insert(posts.name.clone(), posts.items.clone());

        renderer.add_to_context("site", &self.site);
        renderer.add_to_context("collections", &collections);
        for (key, value) in load_data(&data_dir)? {
            renderer.add_to_context(&key, &value);
        }
        for (key, value) in &self.custom {
            renderer.add_to_context(key, value);
        }

        Ok(Site {
            pages: self.pages,
            posts,
            renderer,
            source_dir,
            output_dir: self.output_dir,
            passthrough: self.passthrough,
            syntax_theme: self.syntax_theme,
            live_reload: self.live_reload,
        })
    }
}

/// Each `*.json` in the data directory, keyed by file stem.
fn load_data(data_dir: &Path) -> Result<Vec<(String, serde_json::Value)>, BuildError> {
    let mut data = Vec::new();
    if !data_dir.is_dir() {
        return Ok(data);
    }

    for entry in std::fs::read_dir(data_dir)? {
        let path = entry?.path();
        if path.extension().is_none_or(|e| e != "json") {
            continue;
        }
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
            continue;
        };
        let raw = std::fs::read_to_string(&path)?;
        let value: serde_json::Value = serde_json::from_str(&raw).map_err(|source| BuildError::Data {
            path: path.clone(),
            source,
        })?;
        debug!(key = %stem, "loaded data file");
        data.push((stem, value));
    }

    Ok(data)
}

pub struct Site {
    pages: Vec<Page>,
    posts: Collection,
    renderer: TemplateRenderer,
    source_dir: PathBuf,
    output_dir: PathBuf,
    passthrough: Vec<String>,
    syntax_theme: String,
    live_reload: Option<String>,
}

impl Site {
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn posts(&self) -> &Collection {
        &self.posts
    }

    /// Render one page to its final HTML.
    pub fn render_page(&self, page: &Page) -> Result<String, BuildError> {
        let mut context = Context::new();
        context.insert(
            "page",
            &PageContext {
                url: page.url(),
                title: &page.title,
                date: page.date.map(|d| d.format("%Y-%m-%d").to_string()),
                description: page.front.description.as_deref(),
                source: page.template_name(),
            },
        );

        let content = match page.format {
            PageFormat::Markdown => render_markdown(&page.body, &self.syntax_theme),
            PageFormat::Html | PageFormat::Njk => {
                self.renderer.render(&page.template_name(), &context)?
            }
        };

        let html = match &page.front.layout {
            Some(layout) => {
                if !self.renderer.has_template(layout) {
                    return Err(BuildError::MissingLayout {
                        page: page.template_name(),
                        layout: layout.clone(),
                    });
                }
                context.insert("content", &content);
                self.renderer.render(layout, &context)?
            }
            None => content,
        };

        Ok(match &self.live_reload {
            Some(ws_url) => crate::reload::inject_livereload_script(&html, ws_url),
            None => html,
        })
    }

    pub fn render_all(&self) -> Result<BuildSummary, BuildError> {
        std::fs::create_dir_all(&self.output_dir)?;

        for page in &self.pages {
            let html = self.render_page(page)?;
            let output_path = self.output_dir.join(page.out_path());
            if let Some(parent) = output_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&output_path, html)?;
            debug!(page = %page.template_name(), out = %output_path.display(), "rendered");
        }

        let copied_files = self.copy_passthrough()?;

        let summary = BuildSummary {
            pages: self.pages.len(),
            posts: self.posts.items.len(),
            copied_files,
        };
        info!(
            pages = summary.pages,
            posts = summary.posts,
            copied = summary.copied_files,
            "site rendered"
        );
        Ok(summary)
    }

    /// Copy each passthrough directory into the output unchanged.
    fn copy_passthrough(&self) -> Result<usize, BuildError> {
        let mut copied = 0;
        for dir in &self.passthrough {
            let from = self.source_dir.join(dir);
            if !from.is_dir() {
                debug!(dir = %dir, "passthrough directory missing, skipping");
                continue;
            }

            for entry in WalkDir::new(&from) {
                let entry = entry.map_err(std::io::Error::from)?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let relative = entry
                    .path()
                    .strip_prefix(&self.source_dir)
                    .unwrap_or(entry.path());
                let to = self.output_dir.join(relative);
                if let Some(parent) = to.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::copy(entry.path(), &to)?;
                copied += 1;
            }
        }
        Ok(copied)
    }
}
