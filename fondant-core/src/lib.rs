pub mod builder;
pub mod config;
pub mod markdown;
pub mod reload;
pub mod scanner;
pub mod site;
pub mod template;

use builder::{BuildError, BuildSummary, SiteBuilder};
use config::Config;
use scanner::SiteScanner;

// Re-export main types
pub use builder::Site;
pub use site::{Collection, CollectionItem, FrontMatter, Page, PageFormat};
pub use template::{TemplateError, TemplateRenderer};

/// Scan, render and copy a whole site as described by `config`. With
/// `live_reload` set, pages get the reload client for that websocket URL.
pub fn build_site(config: &Config, live_reload: Option<&str>) -> Result<BuildSummary, BuildError> {
    let pages = SiteScanner::new(&config.build).scan()?;

    let mut builder = SiteBuilder::new()
        .layout(&config.build)
        .site_config(config.site.clone())
        .add_pages(pages);
    if let Some(ws_url) = live_reload {
        builder = builder.live_reload(ws_url);
    }

    builder.build()?.render_all()
}
