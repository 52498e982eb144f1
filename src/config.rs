//! Application configuration types.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::directive::Options;
use crate::prefix::GlobalLib;

/// Option key that is never accepted from the configuration file.
const RESERVED_PATH_KEY: &str = "path";

/// Application configuration loaded from config file.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Install prefix settings.
    pub prefix: PrefixConfig,
    /// Resolution engine settings.
    pub resolver: ResolverConfig,
    /// Options forwarded verbatim to the resolution engine.
    pub options: Options,
}

/// Load configuration from disk.
///
/// A missing file is created empty. A `path` key under `[options]` is dropped, since the
/// working path is always chosen by the update command.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or parsed.
pub fn load(path: &Path) -> anyhow::Result<Config> {
    log::debug!(
        "Checking if configuration file exists at {}...",
        path.display()
    );
    if !path.exists() {
        log::warn!(
            "Could not find configuration at {}, so creating and using an empty configuration...",
            path.display()
        );
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("could not create path to configuration file")?;
        }
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .context("could not create configuration file")?;
    }

    log::debug!("Loading configuration from {}...", path.display());
    let config =
        parse(&fs::read_to_string(path).context("could not read configuration file")?)?;
    log::trace!("Loaded configuration: {config:#?}");
    Ok(config)
}

/// Parse configuration from TOML text.
///
/// # Errors
///
/// Returns an error if the text is not a valid configuration.
pub fn parse(text: &str) -> anyhow::Result<Config> {
    let mut config: Config =
        toml::from_str(text).context("could not deserialize configuration file")?;
    if config.options.remove(RESERVED_PATH_KEY).is_some() {
        log::warn!("Ignoring `path` under [options], the update command picks the path itself");
    }
    Ok(config)
}

/// Install prefix configuration.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PrefixConfig {
    /// Global prefix. Derived from the environment when unset.
    pub global: Option<PathBuf>,
    /// How the global update directory is derived from the global modules root.
    pub global_lib: GlobalLib,
}

/// Resolution engine configuration.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Executable implementing the reify protocol.
    pub command: String,
    /// Arguments passed before the path and update arguments.
    pub args: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            command: "arborist".to_string(),
            args: vec!["reify".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse("").unwrap();
        assert!(config.prefix.global.is_none());
        assert_eq!(config.prefix.global_lib, GlobalLib::Parent);
        assert_eq!(config.resolver.command, "arborist");
        assert_eq!(config.resolver.args, vec!["reify".to_string()]);
        assert!(config.options.is_empty());
    }

    #[test]
    fn parses_all_sections() {
        let config = parse(
            r#"
            [prefix]
            global = "/opt/global"
            global_lib = "strip-node-modules"

            [resolver]
            command = "/usr/bin/resolver"
            args = ["apply", "--quiet"]

            [options]
            registry = "https://registry.example"
            save = false
            fetchRetries = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.prefix.global, Some(PathBuf::from("/opt/global")));
        assert_eq!(config.prefix.global_lib, GlobalLib::StripNodeModules);
        assert_eq!(config.resolver.command, "/usr/bin/resolver");
        assert_eq!(config.resolver.args, vec!["apply", "--quiet"]);
        assert_eq!(config.options["registry"], json!("https://registry.example"));
        assert_eq!(config.options["save"], json!(false));
        assert_eq!(config.options["fetchRetries"], json!(3));
    }

    #[test]
    fn drops_path_option() {
        let config = parse(
            r#"
            [options]
            path = "/somewhere/else"
            global = true
            "#,
        )
        .unwrap();
        assert!(!config.options.contains_key("path"));
        assert_eq!(config.options["global"], json!(true));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(parse("[prefix\nglobal = 1").is_err());
    }

    #[test]
    fn load_creates_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.toml");

        let config = load(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.resolver.command, "arborist");
    }

    #[test]
    fn load_reads_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[resolver]\ncommand = \"custom\"\n").unwrap();

        let config = load(&path).unwrap();

        assert_eq!(config.resolver.command, "custom");
        assert_eq!(config.resolver.args, vec!["reify".to_string()]);
    }
}
