//! Loading the shared header and footer fragments into their placeholders.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use thiserror::Error;
use tracing::debug;

use crate::dom::{Dom, NodeId};
use crate::hooks::DomHooks;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request for {path} failed: {source}")]
    Http {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// Any non-2xx answer. The body of an error page is never injected, even
    /// though a browser `fetch` would hand it over as ordinary text.
    #[error("{path} answered with status {status}")]
    Status { path: String, status: u16 },

    /// The response declared a content type outside `text/*`. A response
    /// without a content type is taken as `text/html`.
    #[error("{path} is not markup (content type {content_type})")]
    NotText { path: String, content_type: String },

    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid fragment path {0}")]
    InvalidPath(String),

    #[error("fetch task for {path} stopped: {reason}")]
    Task { path: String, reason: String },
}

/// Where fragment markup comes from.
#[async_trait]
pub trait FragmentSource: Send + Sync {
    /// Fetch the markup served at an absolute site path such as
    /// `/includes/header.html`.
    async fn fetch(&self, path: &str) -> Result<String, FetchError>;
}

/// Fetch fragments from a running site over HTTP.
pub struct HttpFragmentSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFragmentSource {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fondant/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| FetchError::Http {
                path: base_url.to_string(),
                source,
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl FragmentSource for HttpFragmentSource {
    async fn fetch(&self, path: &str) -> Result<String, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        let http = |source: reqwest::Error| FetchError::Http {
            path: path.to_string(),
            source,
        };

        let response = self.client.get(&url).send().await.map_err(http)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_string();
        if !content_type.starts_with("text/") {
            return Err(FetchError::NotText {
                path: path.to_string(),
                content_type,
            });
        }

        response.text().await.map_err(http)
    }
}

/// Read fragments straight out of a built site directory.
pub struct DirFragmentSource {
    root: PathBuf,
}

impl DirFragmentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl FragmentSource for DirFragmentSource {
    async fn fetch(&self, path: &str) -> Result<String, FetchError> {
        let relative = path.trim_start_matches('/');
        if relative.split('/').any(|part| part == "..") {
            return Err(FetchError::InvalidPath(path.to_string()));
        }

        let bytes = tokio::fs::read(self.root.join(relative))
            .await
            .map_err(|source| FetchError::Io {
                path: path.to_string(),
                source,
            })?;
        String::from_utf8(bytes).map_err(|_| FetchError::NotText {
            path: path.to_string(),
            content_type: "binary".into(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fragment {
    Header,
    Footer,
}

impl Fragment {
    pub const ALL: [Fragment; 2] = [Fragment::Header, Fragment::Footer];

    pub fn placeholder_id(self, hooks: &DomHooks) -> &str {
        match self {
            Fragment::Header => &hooks.header_placeholder_id,
            Fragment::Footer => &hooks.footer_placeholder_id,
        }
    }

    pub fn path(self, hooks: &DomHooks) -> &str {
        match self {
            Fragment::Header => &hooks.header_fragment_path,
            Fragment::Footer => &hooks.footer_fragment_path,
        }
    }
}

impl std::fmt::Display for Fragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fragment::Header => write!(f, "header"),
            Fragment::Footer => write!(f, "footer"),
        }
    }
}

/// One finished fetch, ready to be spliced into the page.
#[derive(Debug)]
pub struct FragmentLoad {
    pub fragment: Fragment,
    pub placeholder: NodeId,
    pub result: Result<String, FetchError>,
}

/// In-flight fragment fetches. They run on their own tasks; nothing here
/// touches the document, so the page stays free to handle events while they
/// are pending.
pub struct IncludeTasks {
    pending: FuturesUnordered<BoxFuture<'static, FragmentLoad>>,
    skipped: Vec<Fragment>,
}

impl IncludeTasks {
    /// Next fetch to finish, in completion order.
    pub async fn next(&mut self) -> Option<FragmentLoad> {
        self.pending.next().await
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Fragments whose placeholder was missing, so nothing was fetched.
    pub fn skipped(&self) -> &[Fragment] {
        &self.skipped
    }
}

pub struct IncludeLoader;

impl IncludeLoader {
    /// Start one fetch per placeholder present in `dom`. Must be called from
    /// within a tokio runtime.
    pub fn start<D: Dom + ?Sized>(
        dom: &D,
        hooks: &DomHooks,
        source: Arc<dyn FragmentSource>,
    ) -> IncludeTasks {
        let mut tasks = IncludeTasks {
            pending: FuturesUnordered::new(),
            skipped: Vec::new(),
        };

        for fragment in Fragment::ALL {
            let Some(placeholder) = dom.by_id(fragment.placeholder_id(hooks)) else {
                debug!(%fragment, "no placeholder, skipping");
                tasks.skipped.push(fragment);
                continue;
            };

            let path = fragment.path(hooks).to_string();
            let source = Arc::clone(&source);
            let handle = tokio::spawn({
                let path = path.clone();
                async move { source.fetch(&path).await }
            });

            debug!(%fragment, %path, "fetching fragment");
            tasks.pending.push(
                async move {
                    let result = match handle.await {
                        Ok(result) => result,
                        Err(e) => Err(FetchError::Task {
                            path,
                            reason: e.to_string(),
                        }),
                    };
                    FragmentLoad {
                        fragment,
                        placeholder,
                        result,
                    }
                }
                .boxed(),
            );
        }

        tasks
    }
}
