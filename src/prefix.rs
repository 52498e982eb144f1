//! Install prefix discovery.
//!
//! The local prefix is the project root packages are installed into. The global prefix holds the
//! global modules directory (`lib/node_modules` on unix), and the directory one level above that
//! is where global updates are run from.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

/// Name of the directory packages are physically installed into.
pub const MODULES_DIR: &str = "node_modules";

/// Name of the project manifest that marks a local prefix.
pub const MANIFEST_FILE: &str = "package.json";

/// Rule turning the global modules root into the directory global updates run in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GlobalLib {
    /// Go one level up from the global modules root, whatever its last component is.
    #[default]
    Parent,
    /// Drop a trailing `node_modules` component, keeping the path as is otherwise.
    StripNodeModules,
}

impl GlobalLib {
    /// Apply the rule to a global modules root.
    #[must_use]
    pub fn resolve(self, global_modules_root: &Path) -> PathBuf {
        match self {
            Self::Parent => parent_dir(global_modules_root),
            Self::StripNodeModules => {
                if global_modules_root.file_name().is_some_and(|name| name == MODULES_DIR) {
                    parent_dir(global_modules_root)
                } else {
                    global_modules_root.to_path_buf()
                }
            }
        }
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => PathBuf::from("."),
        Some(parent) => parent.to_path_buf(),
        None => path.to_path_buf(),
    }
}

/// Find the local prefix for `cwd`.
///
/// Walks up from `cwd` to the nearest directory holding a `package.json` or a `node_modules`
/// directory. Falls back to `cwd` itself when no ancestor qualifies.
#[must_use]
pub fn find_local_prefix(cwd: &Path) -> PathBuf {
    log::debug!("Looking for a local prefix above {}...", cwd.display());
    for dir in cwd.ancestors() {
        if dir.join(MANIFEST_FILE).is_file() || dir.join(MODULES_DIR).is_dir() {
            log::debug!("Found local prefix at {}", dir.display());
            return dir.to_path_buf();
        }
    }
    log::debug!(
        "No package.json or node_modules above {}, using it as the prefix",
        cwd.display()
    );
    cwd.to_path_buf()
}

/// Directory global packages are installed into for a given global prefix.
#[must_use]
pub fn global_dir(global_prefix: &Path) -> PathBuf {
    if cfg!(windows) {
        global_prefix.join(MODULES_DIR)
    } else {
        global_prefix.join("lib").join(MODULES_DIR)
    }
}

/// Global prefix used when neither the config file nor the environment names one.
///
/// Honors `PREFIX`, then derives the prefix from the location of the running executable
/// (`<prefix>/bin/<exe>` on unix, `<prefix>/<exe>` on windows).
///
/// # Errors
///
/// Returns an error if the path of the running executable cannot be determined.
pub fn default_global_prefix() -> anyhow::Result<PathBuf> {
    if let Some(prefix) = env::var_os("PREFIX").filter(|prefix| !prefix.is_empty()) {
        log::debug!("Using global prefix from PREFIX");
        return Ok(PathBuf::from(prefix));
    }

    let exe = env::current_exe().context("could not determine the path of the executable")?;
    let bin_dir = exe.parent().unwrap_or(&exe);
    let prefix = if cfg!(windows) {
        bin_dir.to_path_buf()
    } else {
        parent_dir(bin_dir)
    };
    log::debug!("Derived global prefix {} from executable", prefix.display());
    Ok(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parent_rule_goes_one_level_up() {
        let root = Path::new("/usr/local/global/lib/node_modules");
        assert_eq!(
            GlobalLib::Parent.resolve(root),
            PathBuf::from("/usr/local/global/lib")
        );
    }

    #[test]
    fn parent_rule_ignores_last_component_name() {
        let root = Path::new("/opt/pkgs/modules");
        assert_eq!(GlobalLib::Parent.resolve(root), PathBuf::from("/opt/pkgs"));
    }

    #[test]
    fn parent_rule_keeps_filesystem_root() {
        assert_eq!(GlobalLib::Parent.resolve(Path::new("/")), PathBuf::from("/"));
    }

    #[test]
    fn parent_rule_on_bare_relative_dir() {
        assert_eq!(
            GlobalLib::Parent.resolve(Path::new("node_modules")),
            PathBuf::from(".")
        );
    }

    #[test]
    fn strip_rule_only_strips_node_modules() {
        assert_eq!(
            GlobalLib::StripNodeModules.resolve(Path::new("/g/lib/node_modules")),
            PathBuf::from("/g/lib")
        );
        assert_eq!(
            GlobalLib::StripNodeModules.resolve(Path::new("/g/lib/modules")),
            PathBuf::from("/g/lib/modules")
        );
    }

    #[test]
    fn global_lib_deserializes_from_kebab_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            rule: GlobalLib,
        }
        let wrapper: Wrapper = toml::from_str(r#"rule = "strip-node-modules""#).unwrap();
        assert_eq!(wrapper.rule, GlobalLib::StripNodeModules);
        let wrapper: Wrapper = toml::from_str(r#"rule = "parent""#).unwrap();
        assert_eq!(wrapper.rule, GlobalLib::Parent);
    }

    #[test]
    fn finds_prefix_with_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let project = tmp.path().join("project");
        let nested = project.join("src").join("deep");
        fs::create_dir_all(&nested).unwrap();
        fs::write(project.join(MANIFEST_FILE), "{}").unwrap();

        assert_eq!(find_local_prefix(&nested), project);
    }

    #[test]
    fn finds_prefix_with_modules_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let project = tmp.path().join("project");
        let nested = project.join("lib");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir_all(project.join(MODULES_DIR)).unwrap();

        assert_eq!(find_local_prefix(&nested), project);
    }

    #[test]
    fn nearest_prefix_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let outer = tmp.path().join("outer");
        let inner = outer.join("inner");
        fs::create_dir_all(&inner).unwrap();
        fs::write(outer.join(MANIFEST_FILE), "{}").unwrap();
        fs::write(inner.join(MANIFEST_FILE), "{}").unwrap();

        assert_eq!(find_local_prefix(&inner), inner);
    }

    #[test]
    fn global_dir_layout() {
        let dir = global_dir(Path::new("/usr/local"));
        if cfg!(windows) {
            assert_eq!(dir, PathBuf::from("/usr/local/node_modules"));
        } else {
            assert_eq!(dir, PathBuf::from("/usr/local/lib/node_modules"));
        }
    }

    #[test]
    fn global_dir_round_trips_through_parent_rule() {
        let prefix = Path::new("/usr/local");
        let lib = GlobalLib::Parent.resolve(&global_dir(prefix));
        if cfg!(windows) {
            assert_eq!(lib, prefix);
        } else {
            assert_eq!(lib, prefix.join("lib"));
        }
    }
}
