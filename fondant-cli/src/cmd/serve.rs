use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use fondant_core::build_site;
use fondant_dev_server::{DevServer, DevServerConfig};
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, error, info};

use crate::config::FondantConfig;

pub fn make_subcommand() -> Command {
    super::build::add_site_args(Command::new("serve"))
        .about("Build, serve and rebuild the site on changes, with live reload")
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Port to serve on"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .help("Host to bind to"),
        )
        .arg(
            Arg::new("open")
                .long("open")
                .help("Open browser automatically")
                .action(clap::ArgAction::SetTrue),
        )
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    let config = FondantConfig::load(args)?;
    let config_file = args
        .get_one::<String>("config")
        .map(PathBuf::from)
        .unwrap_or_default();

    let server_config = DevServerConfig {
        host: config.serve.host.clone(),
        port: config.serve.port,
        root: config.build().output_dir(),
        open_browser: config.serve.open,
        ignore_patterns: vec![".git".to_string(), "*.tmp".to_string()],
    };
    let ws_url = server_config.ws_url();

    build_site(&config.core, Some(&ws_url))?;

    let server = DevServer::new(server_config);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!(error = %e, "dev server stopped");
        }
    });

    let watcher_handle = tokio::spawn(async move {
        if let Err(e) = watch_sources(config, config_file, ws_url).await {
            error!(error = %e, "source watcher stopped");
        }
    });

    let _ = tokio::try_join!(server_handle, watcher_handle)?;

    Ok(())
}

/// Whether a change under the input directory should trigger a rebuild.
/// The output usually lives inside the input, and writing it must not
/// trigger another build.
pub fn is_source_change(path: &Path, output_dir: &Path, config_file: &Path) -> bool {
    let abs = |p: &Path| p.canonicalize().unwrap_or_else(|_| p.to_path_buf());
    let path = abs(path);

    path == abs(config_file) || !path.starts_with(abs(output_dir))
}

async fn watch_sources(config: FondantConfig, config_file: PathBuf, ws_url: String) -> Result<()> {
    let input_dir = config.build().input_dir();
    let output_dir = config.build().output_dir();

    let (tx, mut rx) = tokio::sync::mpsc::channel(100);

    let mut debouncer = new_debouncer(Duration::from_millis(500), move |res: DebounceEventResult| {
        if let Ok(events) = res {
            for event in events {
                let _ = tx.blocking_send(event.path);
            }
        }
    })?;

    debouncer
        .watcher()
        .watch(&input_dir, notify::RecursiveMode::Recursive)?;
    if config_file.exists() && !config_file.starts_with(&input_dir) {
        debouncer
            .watcher()
            .watch(&config_file, notify::RecursiveMode::NonRecursive)?;
    }
    info!(input = %input_dir.display(), "watching sources");

    while let Some(path) = rx.recv().await {
        if !is_source_change(&path, &output_dir, &config_file) {
            continue;
        }
        debug!(changed = %path.display(), "rebuilding");

        // the config file itself may have changed
        let config = if config_file.exists() {
            match fondant_core::config::Config::read(&config_file) {
                Ok(mut fresh) => {
                    fresh.build = config.core.build.clone();
                    fresh
                }
                Err(e) => {
                    error!(error = %e, "config reload failed, keeping previous");
                    config.core.clone()
                }
            }
        } else {
            config.core.clone()
        };

        match build_site(&config, Some(&ws_url)) {
            Ok(summary) => info!(pages = summary.pages, "site rebuilt"),
            Err(e) => error!(error = %e, "build failed"),
        }
    }

    Ok(())
}
