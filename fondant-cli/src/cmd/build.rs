use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use fondant_core::build_site;
use tracing::info;

use crate::config::{DEFAULT_CONFIG_FILE, FondantConfig};

/// Arguments every subcommand shares.
pub fn add_site_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("DIR")
                .help("Directory containing the site's templates and markdown"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Directory the built site is written to"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file")
                .default_value(DEFAULT_CONFIG_FILE),
        )
}

pub fn make_subcommand() -> Command {
    add_site_args(Command::new("build")).about("Build the static site")
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    let config = FondantConfig::load(args)?;

    let summary = build_site(&config.core, None)?;

    info!(
        pages = summary.pages,
        posts = summary.posts,
        copied = summary.copied_files,
        "build finished"
    );
    println!("Site built successfully in {}", config.build().output);

    Ok(())
}
