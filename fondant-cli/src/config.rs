use anyhow::Result;
use clap::ArgMatches;
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use fondant_client::DomHooks;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "./fondant.toml";

/// Complete configuration that merges CLI args, env vars, config files, and defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FondantConfig {
    /// `[site]` and `[build]`, handed to fondant-core
    #[serde(flatten)]
    pub core: fondant_core::config::Config,
    #[serde(default)]
    pub serve: ServeConfig,
    /// DOM contract shared with the page behaviours
    #[serde(default)]
    pub client: DomHooks,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServeConfig {
    pub host: String,
    pub port: u16,
    /// Open browser automatically
    pub open: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            open: false,
        }
    }
}

impl FondantConfig {
    /// Load configuration with cascading precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables (FONDANT_*)
    /// 3. Configuration file
    /// 4. Defaults (lowest priority)
    pub fn load(args: &ArgMatches) -> Result<Self> {
        let config_file = args
            .try_get_one::<String>("config")
            .ok()
            .flatten()
            .map(String::as_str)
            .unwrap_or(DEFAULT_CONFIG_FILE);

        let mut builder = ConfigBuilder::builder();

        builder = builder.add_source(ConfigBuilder::try_from(&Self::default())?);

        if Path::new(config_file).exists() {
            builder = builder.add_source(File::new(config_file, FileFormat::Toml));
        }

        // FONDANT_BUILD__OUTPUT=dist, FONDANT_SERVE__PORT=8080
        builder = builder.add_source(
            Environment::with_prefix("FONDANT")
                .prefix_separator("_")
                .separator("__"),
        );

        // Only override with CLI args that are actually defined for this command
        let overrides = [
            ("input", "build.input"),
            ("output", "build.output"),
            ("host", "serve.host"),
            ("port", "serve.port"),
        ];
        for (arg, key) in overrides {
            if let Some(value) = args.try_get_one::<String>(arg).ok().flatten() {
                builder = builder.set_override(key, value.clone())?;
            }
        }
        if args.try_get_one::<bool>("open").ok().flatten() == Some(&true) {
            builder = builder.set_override("serve.open", true)?;
        }

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn build(&self) -> &fondant_core::config::BuildConfig {
        &self.core.build
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Arg, ArgAction, Command};

    fn command() -> Command {
        Command::new("test")
            .arg(Arg::new("input").long("input"))
            .arg(Arg::new("output").long("output"))
            .arg(Arg::new("config").long("config"))
            .arg(Arg::new("port").long("port"))
            .arg(Arg::new("open").long("open").action(ArgAction::SetTrue))
    }

    #[test]
    fn test_default_config() {
        let config = FondantConfig::default();
        assert_eq!(config.build().input, ".");
        assert_eq!(config.build().output, "_site");
        assert_eq!(config.serve.port, 3000);
        assert_eq!(config.client.header_fragment_path, "/includes/header.html");
    }

    #[test]
    fn test_cli_args_override() {
        let matches = command()
            .try_get_matches_from(vec![
                "test",
                "--input", "/custom/source",
                "--output", "/custom/output",
                "--port", "8080",
                "--open",
                "--config", "/nonexistent/fondant.toml",
            ])
            .unwrap();

        let config = FondantConfig::load(&matches).unwrap();
        assert_eq!(config.build().input, "/custom/source");
        assert_eq!(config.build().output, "/custom/output");
        assert_eq!(config.serve.port, 8080);
        assert!(config.serve.open);
        // Should still have defaults for non-overridden values
        assert_eq!(config.build().includes, "_includes");
    }

    #[test]
    fn test_file_sits_between_defaults_and_cli() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fondant.toml");
        std::fs::write(
            &path,
            r#"
            [site]
            title = "Golden Ticket Chocolates"

            [build]
            output = "dist"
            posts = "news"

            [client]
            success_param = "sent"
            "#,
        )
        .unwrap();

        let matches = command()
            .try_get_matches_from(vec![
                "test",
                "--config", path.to_str().unwrap(),
                "--output", "public",
            ])
            .unwrap();

        let config = FondantConfig::load(&matches).unwrap();
        assert_eq!(config.core.site.title, "Golden Ticket Chocolates");
        assert_eq!(config.build().output, "public");
        assert_eq!(config.build().posts, "news");
        assert_eq!(config.client.success_param, "sent");
        assert_eq!(config.client.nav_toggle_class, "nav-toggle");
    }
}
