//! Runtime context shared with the update command.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::Config;
use crate::directive::Options;
use crate::prefix::{self, GlobalLib};

/// Flags given on the command line, layered over the configuration file.
#[derive(Clone, Debug, Default)]
pub struct Flags {
    /// Operate on the global install instead of the local project.
    pub global: bool,
    /// Legacy depth limit, as typed. Accepted but has no effect.
    pub depth: Option<String>,
    /// Print machine-readable output.
    pub json: bool,
    /// Ask the engine not to touch the filesystem.
    pub dry_run: bool,
    /// Explicit local prefix, skipping discovery.
    pub prefix: Option<PathBuf>,
    /// Explicit global prefix, overriding the configuration file.
    pub global_prefix: Option<PathBuf>,
}

/// Read-only context for one update invocation.
///
/// Built once before the command runs and only ever borrowed by it.
#[derive(Clone, Debug)]
pub struct RuntimeContext {
    /// Local install root.
    pub project_root: PathBuf,
    /// Directory global packages are physically installed into.
    pub global_modules_root: PathBuf,
    /// Whether the global install is targeted.
    pub global: bool,
    /// Deprecated depth option, kept only to warn about it.
    pub depth: Option<Value>,
    /// Resolved options forwarded to the engine.
    pub options: Options,
    /// Rule deriving the global update directory.
    pub global_lib: GlobalLib,
    /// Whether output is machine-readable.
    pub json: bool,
}

impl RuntimeContext {
    /// Resolve the context from the configuration file, command line flags and working directory.
    ///
    /// Command line flags win over the `[options]` table. `global`, `json` and `dryRun` are
    /// always present in the resolved options. `depth` is moved out of them into the context.
    ///
    /// # Errors
    ///
    /// Returns an error if no global prefix is configured and none can be derived.
    pub fn resolve(config: &Config, flags: &Flags, cwd: &Path) -> anyhow::Result<Self> {
        let mut options = config.options.clone();
        let global = layer_flag(&mut options, "global", flags.global);
        let json = layer_flag(&mut options, "json", flags.json);
        layer_flag(&mut options, "dryRun", flags.dry_run);
        let configured_depth = options.remove("depth");

        let project_root = match &flags.prefix {
            Some(prefix) => cwd.join(prefix),
            None => prefix::find_local_prefix(cwd),
        };
        let global_prefix = flags
            .global_prefix
            .as_ref()
            .or(flags.prefix.as_ref().filter(|_| global))
            .or(config.prefix.global.as_ref());
        let global_prefix = match global_prefix {
            Some(global_prefix) => cwd.join(global_prefix),
            None => prefix::default_global_prefix()?,
        };
        let global_modules_root = prefix::global_dir(&global_prefix);
        log::debug!(
            "Resolved prefixes: local {}, global modules {}",
            project_root.display(),
            global_modules_root.display()
        );

        let ctx = Self {
            project_root,
            global_modules_root,
            global,
            depth: flags.depth.as_deref().map(parse_depth).or(configured_depth),
            options,
            global_lib: config.prefix.global_lib,
            json,
        };
        log::trace!("Resolved runtime context: {ctx:#?}");
        Ok(ctx)
    }

    /// Whether the deprecated depth option was given a value other than the default.
    ///
    /// Unset, `null`, `false`, `0` and the empty string count as the default. Anything else,
    /// including `-1`, `Infinity` and fractions, does not.
    #[must_use]
    pub fn depth_is_set(&self) -> bool {
        self.depth.as_ref().is_some_and(is_truthy)
    }

    /// Directory the update runs in.
    ///
    /// The global lib directory derived from the global modules root when global, the project
    /// root otherwise.
    #[must_use]
    pub fn target_path(&self) -> PathBuf {
        if self.global {
            self.global_lib.resolve(&self.global_modules_root)
        } else {
            self.project_root.clone()
        }
    }
}

/// Read a depth typed on the command line. Values that are not JSON, such as `Infinity`, are
/// kept as strings.
fn parse_depth(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(value) => *value,
        Value::Number(number) => number.as_f64().is_some_and(|number| number.abs() > 0.0),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::String(_)) | Err(_) => !text.is_empty(),
            Ok(parsed) => is_truthy(&parsed),
        },
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Set a boolean option from a flag, keeping a `true` from the configuration file when the flag
/// is off. Returns the resulting value.
fn layer_flag(options: &mut Options, key: &str, flag: bool) -> bool {
    let value = flag || options.get(key).and_then(Value::as_bool).unwrap_or(false);
    options.insert(key.to_string(), Value::Bool(value));
    value
}
