use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parsing(#[from] toml::de::Error),
}

/// Contents of `fondant.toml` that the build itself cares about.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub build: BuildConfig,
}

impl Config {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&data)?;

        Ok(config)
    }
}

/// Exposed to every template as `site`.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct SiteConfig {
    pub title: String,
    pub tagline: Option<String>,
    pub description: Option<String>,
    /// Absolute URL the site is deployed at, for canonical links.
    pub url: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Fondant".into(),
            tagline: None,
            description: None,
            url: None,
        }
    }
}

/// Where things live. `includes` and `data` are relative to `input`;
/// `output` is relative to the working directory.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct BuildConfig {
    pub input: String,
    pub output: String,
    pub includes: String,
    pub data: String,
    /// Files never published.
    pub ignores: Vec<String>,
    /// Directories copied to the output verbatim.
    pub passthrough: Vec<String>,
    /// Extensions treated as pages.
    pub template_formats: Vec<String>,
    /// Markdown under this directory forms the `posts` collection.
    pub posts: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            input: ".".into(),
            output: "_site".into(),
            includes: "_includes".into(),
            data: "_data".into(),
            ignores: vec!["README.md".into(), "PROJECT_RULES.md".into()],
            passthrough: vec![
                "css".into(),
                "js".into(),
                "images".into(),
                "includes".into(),
            ],
            template_formats: vec!["html".into(), "njk".into(), "md".into()],
            posts: "blog/posts".into(),
        }
    }
}

impl BuildConfig {
    pub fn input_dir(&self) -> PathBuf {
        PathBuf::from(&self.input)
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.output)
    }

    pub fn includes_dir(&self) -> PathBuf {
        self.input_dir().join(&self.includes)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.input_dir().join(&self.data)
    }

    pub fn is_template_format(&self, ext: &str) -> bool {
        self.template_formats
            .iter()
            .any(|f| f.eq_ignore_ascii_case(ext))
    }
}
