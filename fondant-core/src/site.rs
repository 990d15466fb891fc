use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const FRONT_MATTER_FENCE: &str = "+++";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFormat {
    /// Rendered as a template.
    Html,
    /// Nunjucks-style template, rendered the same way as `Html`.
    Njk,
    Markdown,
}

impl PageFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "html" | "htm" => Some(PageFormat::Html),
            "njk" => Some(PageFormat::Njk),
            "md" | "markdown" => Some(PageFormat::Markdown),
            _ => None,
        }
    }
}

/// TOML block between `+++` fences at the top of a page.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct FrontMatter {
    pub title: Option<String>,
    /// `YYYY-MM-DD`.
    pub date: Option<String>,
    /// Template under the includes directory wrapping this page.
    pub layout: Option<String>,
    pub description: Option<String>,
    /// Overrides the output location, e.g. `/thanks/`.
    pub permalink: Option<String>,
}

/// Split a page into its front matter and body. Pages without a leading
/// fence have no front matter.
pub fn split_front_matter(content: &str) -> (Option<&str>, &str) {
    let Some(after) = content
        .strip_prefix(FRONT_MATTER_FENCE)
        .and_then(|rest| rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n")))
    else {
        return (None, content);
    };

    let mut offset = 0;
    for line in after.split_inclusive('\n') {
        if line.trim_end() == FRONT_MATTER_FENCE {
            let body = &after[offset + line.len()..];
            return (Some(&after[..offset]), body);
        }
        offset += line.len();
    }

    (None, content)
}

#[derive(Debug, Clone)]
pub struct Page {
    /// Path relative to the input directory.
    pub path: PathBuf,
    pub format: PageFormat,
    pub front: FrontMatter,
    pub title: String,
    pub date: Option<NaiveDate>,
    /// Source with the front matter removed.
    pub body: String,
}

impl Page {
    /// Template name the page is registered under.
    pub fn template_name(&self) -> String {
        path_to_name(&self.path)
    }

    /// Output file relative to the output directory. `index.*` keeps its
    /// directory; anything else gets a directory of its own.
    pub fn out_path(&self) -> PathBuf {
        if let Some(permalink) = &self.front.permalink {
            let trimmed = permalink.trim_matches('/');
            return if trimmed.ends_with(".html") {
                PathBuf::from(trimmed)
            } else {
                PathBuf::from(trimmed).join("index.html")
            };
        }

        let dir = self.path.parent().unwrap_or(Path::new(""));
        match self.path.file_stem().and_then(|s| s.to_str()) {
            Some("index") | None => dir.join("index.html"),
            Some(stem) => dir.join(stem).join("index.html"),
        }
    }

    /// Root-relative URL with a trailing slash.
    pub fn url(&self) -> String {
        let out = self.out_path();
        let name = path_to_name(&out);
        let url = match name.strip_suffix("index.html") {
            Some(dir) => dir.to_string(),
            None => name,
        };
        format!("/{url}")
    }

    pub fn is_under(&self, dir: &str) -> bool {
        let dir = dir.trim_matches('/');
        !dir.is_empty() && self.path.starts_with(dir)
    }
}

pub(crate) fn path_to_name(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionItem {
    pub title: String,
    pub url: String,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Collection {
    pub name: String,
    pub items: Vec<CollectionItem>,
}

impl Collection {
    /// Newest first. Undated entries go last, ties break on title.
    pub fn reverse_chronological(name: &str, pages: &[&Page]) -> Self {
        let mut items: Vec<CollectionItem> = pages
            .iter()
            .map(|p| CollectionItem {
                title: p.title.clone(),
                url: p.url(),
                date: p.date,
                description: p.front.description.clone(),
            })
            .collect();

        items.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.title.cmp(&b.title)));

        Self {
            name: name.to_string(),
            items,
        }
    }
}
