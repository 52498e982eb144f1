//! What the update command asks the resolution engine to do.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};

/// Flat option name to value mapping, forwarded to the engine untouched.
pub type Options = BTreeMap<String, serde_json::Value>;

/// Which installed dependencies an update covers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateTarget {
    /// Every installed dependency. Serialized as `true`.
    All,
    /// Only the named packages, in the order given. Serialized as an array.
    Named(Vec<String>),
}

impl UpdateTarget {
    /// Build the target from the package names given on the command line.
    ///
    /// No names means everything. Names are kept as given, duplicates included.
    #[must_use]
    pub fn from_targets(targets: &[String]) -> Self {
        if targets.is_empty() {
            Self::All
        } else {
            Self::Named(targets.to_vec())
        }
    }
}

impl Serialize for UpdateTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::All => serializer.serialize_bool(true),
            Self::Named(names) => names.serialize(serializer),
        }
    }
}

/// Arguments the engine is constructed with: every resolved option plus the working path.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EngineArgs {
    /// Resolved options, flattened alongside `path` when serialized.
    #[serde(flatten)]
    pub options: Options,
    /// Directory the engine reifies.
    pub path: PathBuf,
}

/// Argument of the engine's reify operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReifyRequest {
    /// Dependencies to update.
    pub update: UpdateTarget,
}

/// Everything one update invocation hands to the engine.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReifyDirective {
    /// Resolved options. Never contains a `path` key.
    pub options: Options,
    /// Directory to reify.
    pub path: PathBuf,
    /// Dependencies to update.
    pub update: UpdateTarget,
}

impl ReifyDirective {
    /// Assemble a directive for `path` from the resolved options and requested package names.
    #[must_use]
    pub fn new(options: Options, path: &Path, targets: &[String]) -> Self {
        Self {
            options,
            path: path.to_path_buf(),
            update: UpdateTarget::from_targets(targets),
        }
    }

    /// The engine's construction arguments.
    #[must_use]
    pub fn engine_args(&self) -> EngineArgs {
        EngineArgs {
            options: self.options.clone(),
            path: self.path.clone(),
        }
    }

    /// The engine's reify request.
    #[must_use]
    pub fn request(&self) -> ReifyRequest {
        ReifyRequest {
            update: self.update.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn no_targets_means_all() {
        assert_eq!(UpdateTarget::from_targets(&[]), UpdateTarget::All);
    }

    #[test]
    fn targets_are_kept_as_given() {
        let targets = names(&["b", "a", "b"]);
        assert_eq!(
            UpdateTarget::from_targets(&targets),
            UpdateTarget::Named(names(&["b", "a", "b"]))
        );
    }

    #[test]
    fn all_serializes_as_true() {
        let request = ReifyRequest {
            update: UpdateTarget::All,
        };
        assert_eq!(serde_json::to_value(&request).unwrap(), json!({ "update": true }));
    }

    #[test]
    fn named_serializes_as_array() {
        let request = ReifyRequest {
            update: UpdateTarget::Named(names(&["ipt"])),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "update": ["ipt"] })
        );
    }

    #[test]
    fn engine_args_flatten_options_next_to_path() {
        let mut options = Options::new();
        options.insert("global".to_string(), json!(false));
        options.insert("registry".to_string(), json!("https://registry.example"));
        let directive = ReifyDirective::new(options, Path::new("/project/a"), &[]);

        assert_eq!(
            serde_json::to_value(directive.engine_args()).unwrap(),
            json!({
                "global": false,
                "registry": "https://registry.example",
                "path": "/project/a",
            })
        );
    }

    #[test]
    fn request_carries_the_directive_update() {
        let directive = ReifyDirective::new(Options::new(), Path::new("/p"), &names(&["x", "y"]));
        assert_eq!(directive.request().update, directive.update);
        assert_eq!(directive.engine_args().path, PathBuf::from("/p"));
    }
}
