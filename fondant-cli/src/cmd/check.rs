//! Boots a built page against its fragment source, the way a browser would
//! on load, and reports whether the shared chrome came through.

use anyhow::{Context, Result, bail};
use clap::{Arg, ArgMatches, Command};
use fondant_client::{
    DirFragmentSource, FragmentSource, FragmentStatus, HttpFragmentSource, IncludeReport, MemoryDom,
    Page,
};
use std::{path::Path, sync::Arc};
use tracing::debug;

use crate::config::FondantConfig;

pub fn make_subcommand() -> Command {
    super::build::add_site_args(Command::new("check-includes"))
        .about("Load a built page and verify its header and footer fragments resolve")
        .arg(
            Arg::new("page")
                .long("page")
                .value_name("PATH")
                .help("Page to check, relative to the output directory")
                .default_value("index.html"),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .value_name("URL")
                .help("Fetch fragments from a running server instead of the output directory"),
        )
        .arg(
            Arg::new("query")
                .long("query")
                .value_name("QUERY")
                .help("Query string the page is loaded with, e.g. success=true")
                .default_value(""),
        )
        .arg(
            Arg::new("print")
                .long("print")
                .help("Print the page markup after the fragments are applied")
                .action(clap::ArgAction::SetTrue),
        )
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    let config = FondantConfig::load(args)?;
    let output_dir = config.build().output_dir();

    let page_path = args
        .get_one::<String>("page")
        .map(String::as_str)
        .unwrap_or("index.html");
    let query = args.get_one::<String>("query").map(String::as_str).unwrap_or("");

    let source: Arc<dyn FragmentSource> = match args.get_one::<String>("base-url") {
        Some(url) => Arc::new(HttpFragmentSource::new(url)?),
        None => Arc::new(DirFragmentSource::new(&output_dir)),
    };

    let (page, report) = check_page(&output_dir.join(page_path), &config, query, source).await?;

    for (fragment, status) in &report.outcomes {
        match status {
            FragmentStatus::Loaded { bytes } => println!("{fragment}: loaded ({bytes} bytes)"),
            FragmentStatus::Failed(reason) => println!("{fragment}: FAILED ({reason})"),
            FragmentStatus::Skipped => println!("{fragment}: no placeholder"),
        }
    }
    println!(
        "navigation: {}",
        if page.nav().is_some() { "armed" } else { "not found" }
    );
    if page.banner_shown() {
        println!("success banner: shown");
    }
    if args.get_flag("print") {
        println!("{}", page.dom().to_html());
    }

    let failed = report
        .outcomes
        .iter()
        .filter(|(_, s)| matches!(s, FragmentStatus::Failed(_)))
        .count();
    if failed > 0 {
        bail!("{failed} fragment(s) failed to load for {page_path}");
    }
    Ok(())
}

async fn check_page(
    path: &Path,
    config: &FondantConfig,
    query: &str,
    source: Arc<dyn FragmentSource>,
) -> Result<(Page<MemoryDom>, IncludeReport)> {
    let html = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading built page {}", path.display()))?;
    debug!(page = %path.display(), bytes = html.len(), "checking page");

    let dom = MemoryDom::parse(&html);
    let (mut page, tasks) = Page::boot(dom, config.client.clone(), query, source);
    let report = page.settle(tasks).await;

    Ok((page, report))
}
