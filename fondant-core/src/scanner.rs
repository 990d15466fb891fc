use std::path::{Component, Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::BuildConfig;
use crate::markdown::first_heading;
use crate::site::{FrontMatter, Page, PageFormat, split_front_matter};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("invalid path: {}", .0.display())]
    InvalidPath(PathBuf),
    #[error("bad front matter in {}: {source}", .path.display())]
    FrontMatter {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("bad date {date:?} in {}, expected YYYY-MM-DD", .path.display())]
    Date { path: PathBuf, date: String },
}

/// Finds the pages of a site.
pub struct SiteScanner {
    source_dir: PathBuf,
    /// Paths, relative to the source, that are never pages.
    excluded: Vec<PathBuf>,
    ignores: Vec<String>,
    build: BuildConfig,
}

impl SiteScanner {
    pub fn new(build: &BuildConfig) -> Self {
        let source_dir = build.input_dir();
        let mut excluded: Vec<PathBuf> = [&build.includes, &build.data]
            .into_iter()
            .chain(build.passthrough.iter())
            .map(|p| normalize(Path::new(p)))
            .collect();
        excluded.extend(
            normalize(&build.output_dir())
                .strip_prefix(normalize(&source_dir))
                .ok()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf),
        );
        excluded.push(PathBuf::from("node_modules"));
        excluded.push(PathBuf::from("target"));

        Self {
            source_dir,
            excluded,
            ignores: build.ignores.clone(),
            build: build.clone(),
        }
    }

    pub fn scan(&self) -> Result<Vec<Page>, ScanError> {
        debug!(source = %self.source_dir.display(), "scanning");
        let mut pages = Vec::new();

        let walker = WalkDir::new(&self.source_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.skip(e.path()));

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(format) = path
                .extension()
                .and_then(|e| e.to_str())
                .filter(|e| self.build.is_template_format(e))
                .and_then(PageFormat::from_extension)
            else {
                continue;
            };

            pages.push(self.scan_page(path, format)?);
        }

        debug!(pages = pages.len(), "scan complete");
        Ok(pages)
    }

    fn skip(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.source_dir) else {
            return true;
        };
        let relative = normalize(relative);

        let hidden = relative
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        let ignored = self
            .ignores
            .iter()
            .any(|i| relative == normalize(Path::new(i)));
        let excluded = self.excluded.iter().any(|e| relative.starts_with(e));

        hidden || ignored || excluded
    }

    fn scan_page(&self, path: &Path, format: PageFormat) -> Result<Page, ScanError> {
        let content = std::fs::read_to_string(path)?;
        let relative = path
            .strip_prefix(&self.source_dir)
            .map_err(|_| ScanError::InvalidPath(path.to_path_buf()))?;
        let relative = normalize(relative);

        let (front, body) = split_front_matter(&content);
        let front: FrontMatter = match front {
            Some(raw) => toml::from_str(raw).map_err(|source| ScanError::FrontMatter {
                path: relative.clone(),
                source,
            })?,
            None => FrontMatter::default(),
        };

        let date = front
            .date
            .as_deref()
            .map(|d| {
                NaiveDate::parse_from_str(d, "%Y-%m-%d").map_err(|_| ScanError::Date {
                    path: relative.clone(),
                    date: d.to_string(),
                })
            })
            .transpose()?;

        let title = front
            .title
            .clone()
            .or_else(|| match format {
                PageFormat::Markdown => first_heading(body),
                _ => None,
            })
            .unwrap_or_else(|| {
                relative
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default()
            });

        let page = Page {
            path: relative,
            format,
            front,
            title,
            date,
            body: body.to_string(),
        };
        if page.is_under(&self.build.posts) && page.date.is_none() {
            warn!(path = %page.path.display(), "post has no date, it will sort last");
        }
        Ok(page)
    }
}

/// Drop `.` components so `./css` and `css` compare equal.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn build_for(root: &Path) -> BuildConfig {
        BuildConfig {
            input: root.to_string_lossy().to_string(),
            output: root.join("_site").to_string_lossy().to_string(),
            ..BuildConfig::default()
        }
    }

    #[test]
    fn test_finds_pages_and_skips_everything_else() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "index.html", "<h1>Home</h1>");
        write(root, "about.njk", "+++\ntitle = \"About us\"\n+++\n<p>hi</p>");
        write(root, "blog/posts/first.md", "+++\ndate = \"2024-02-14\"\n+++\n# Valentine Truffles\n");
        write(root, "README.md", "# readme");
        write(root, "PROJECT_RULES.md", "# rules");
        write(root, "_includes/layouts/base.njk", "{{ content }}");
        write(root, "_data/shop.json", "{}");
        write(root, "includes/header.html", "<header></header>");
        write(root, "css/site.css", "body{}");
        write(root, "_site/old/index.html", "stale");
        write(root, ".git/HEAD", "ref");
        write(root, "notes.txt", "not a page");

        let pages = SiteScanner::new(&build_for(root)).scan().unwrap();
        let mut paths: Vec<_> = pages.iter().map(|p| p.template_name()).collect();
        paths.sort();
        assert_eq!(paths, ["about.njk", "blog/posts/first.md", "index.html"]);

        let about = pages.iter().find(|p| p.template_name() == "about.njk").unwrap();
        assert_eq!(about.title, "About us");
        assert_eq!(about.body, "<p>hi</p>");

        let post = pages.iter().find(|p| p.format == PageFormat::Markdown).unwrap();
        assert_eq!(post.title, "Valentine Truffles");
        assert_eq!(post.date, NaiveDate::from_ymd_opt(2024, 2, 14));
    }

    #[test]
    fn test_bad_date_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "blog/posts/x.md", "+++\ndate = \"14/02/2024\"\n+++\n");

        let err = SiteScanner::new(&build_for(dir.path())).scan().unwrap_err();
        assert!(matches!(err, ScanError::Date { .. }));
    }

    #[test]
    fn test_untitled_page_uses_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "faq.html", "<p>?</p>");

        let pages = SiteScanner::new(&build_for(dir.path())).scan().unwrap();
        assert_eq!(pages[0].title, "faq");
    }
}
