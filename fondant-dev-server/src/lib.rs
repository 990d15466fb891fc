use anyhow::{Result, bail};
use axum::{
    Router,
    extract::State,
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc};
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

/// Websocket route the injected client connects to.
pub const LIVERELOAD_PATH: &str = "/__livereload";

const RELOAD_MESSAGE: &str = "reload";
const MIN_RELOAD_INTERVAL: Duration = Duration::from_millis(1000);

/// Configuration for the live development server
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    pub host: String,
    pub port: u16,
    /// Built site to serve and watch
    pub root: PathBuf,
    pub open_browser: bool,
    /// Substrings, or `*suffix` patterns, of paths that never trigger a reload
    pub ignore_patterns: Vec<String>,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            root: PathBuf::from("_site"),
            open_browser: false,
            ignore_patterns: Vec::new(),
        }
    }
}

impl DevServerConfig {
    pub fn addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    /// URL the live-reload client should connect to.
    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}{}", self.host, self.port, LIVERELOAD_PATH)
    }
}

/// Serves the built site, including the `/includes/` fragments the pages
/// fetch at load time, and tells connected pages to reload when the output
/// changes.
pub struct DevServer {
    config: DevServerConfig,
}

impl DevServer {
    pub fn new(config: DevServerConfig) -> Self {
        Self { config }
    }

    pub fn router(root: &Path, reloads: broadcast::Sender<String>) -> Router {
        Router::new()
            .route(LIVERELOAD_PATH, get(livereload_socket))
            .fallback_service(ServeDir::new(root).append_index_html_on_directories(true))
            .with_state(ReloadState { reloads })
    }

    pub async fn run(self) -> Result<()> {
        if !self.config.root.is_dir() {
            bail!("nothing to serve, {} is not a directory", self.config.root.display());
        }

        let (reload_tx, _) = broadcast::channel::<String>(16);

        let watcher = watch_output(
            self.config.root.clone(),
            reload_tx.clone(),
            self.config.ignore_patterns.clone(),
        );
        tokio::spawn(async move {
            if let Err(e) = watcher.await {
                warn!(error = %e, "output watcher stopped");
            }
        });

        let app = Self::router(&self.config.root, reload_tx);
        let addr = self.config.addr()?;

        info!(%addr, root = %self.config.root.display(), "serving site");
        info!(url = %self.config.ws_url(), "live reload enabled");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        if self.config.open_browser
            && let Err(e) = open::that(format!("http://{addr}"))
        {
            warn!(error = %e, "failed to open browser");
        }

        Ok(axum::serve(listener, app).await?)
    }
}

#[derive(Clone)]
struct ReloadState {
    reloads: broadcast::Sender<String>,
}

async fn livereload_socket(
    ws: WebSocketUpgrade,
    State(state): State<ReloadState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| forward_reloads(socket, state.reloads))
}

async fn forward_reloads(mut socket: WebSocket, reloads: broadcast::Sender<String>) {
    let mut rx = reloads.subscribe();

    if socket.send(Message::Text("connected".into())).await.is_err() {
        return;
    }
    debug!("live reload client connected");

    loop {
        tokio::select! {
            msg = rx.recv() => {
                let Ok(text) = msg else { break };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => {
                if msg.is_none() {
                    break;
                }
            }
        }
    }
}

/// Whether a changed path should be ignored.
pub fn is_ignored(path: &Path, ignore: &[String]) -> bool {
    let path = path.to_string_lossy();
    ignore.iter().any(|pattern| match pattern.strip_prefix('*') {
        Some(suffix) => path.ends_with(suffix),
        None => path.contains(pattern.as_str()),
    })
}

/// Rate limit for reload broadcasts: a burst of writes from one rebuild
/// becomes a single reload.
#[derive(Debug)]
pub struct ReloadGate {
    last: Option<Instant>,
    interval: Duration,
}

impl ReloadGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            last: None,
            interval,
        }
    }

    pub fn allow(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) <= self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

async fn watch_output(
    root: PathBuf,
    reloads: broadcast::Sender<String>,
    ignore_patterns: Vec<String>,
) -> Result<()> {
    let (tx, mut rx) = mpsc::channel(100);

    let mut debouncer = new_debouncer(Duration::from_millis(500), move |res: DebounceEventResult| {
        let Ok(events) = res else { return };
        events
            .into_iter()
            .filter(|event| !is_ignored(&event.path, &ignore_patterns))
            .for_each(|event| {
                let _ = tx.blocking_send(event.path);
            });
    })?;

    debouncer
        .watcher()
        .watch(&root, notify::RecursiveMode::Recursive)?;
    debug!(path = %root.display(), "watching output");

    let mut gate = ReloadGate::new(MIN_RELOAD_INTERVAL);
    while let Some(path) = rx.recv().await {
        if gate.allow(Instant::now()) {
            debug!(changed = %path.display(), "sending reload");
            // no receivers just means no page is open
            let _ = reloads.send(RELOAD_MESSAGE.to_string());
        }
    }

    Ok(())
}
