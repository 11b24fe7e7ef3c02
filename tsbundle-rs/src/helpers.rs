//! The `tslib` runtime helper module.
//!
//! Transpiled files import their helpers from `tslib` instead of inlining
//! them. Every such import resolves to the single virtual id
//! [`VIRTUAL_HELPERS_ID`], so the bundle carries one copy of the helpers no
//! matter how many files use them. The module served there is the library
//! followed by any runtime helpers the compiler's lowering passes import.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use crate::compiler::package_json::PackageJson;
use crate::error::{PluginError, PluginResult};
use crate::host::FsResolutionHost;

/// The import specifier transpiled code uses for helpers.
pub const HELPERS_ID: &str = "tslib";
/// The id the helper module is served under. The `\0` prefix keeps other
/// plugins (and the include filter) away from it.
pub const VIRTUAL_HELPERS_ID: &str = "\0tslib";

/// Entry used when `tslib`'s `package.json` has no `module` field.
const FALLBACK_ENTRY: &str = "tslib.es6.js";

/// Where the helper library's text comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HelperSource {
    /// `node_modules/tslib`, searched upwards from the working directory.
    #[default]
    Discover,
    /// An ES module file, relative to the working directory.
    File(PathBuf),
    /// The helper module's text.
    Inline(String),
}

/// Helper text loaded once per plugin instance.
#[derive(Debug, Clone)]
pub struct HelperModule {
    source: Arc<str>,
}

impl HelperModule {
    pub fn load(source: &HelperSource, cwd: &Path) -> PluginResult<Self> {
        let text = match source {
            HelperSource::Inline(text) => text.clone(),
            HelperSource::File(path) => read_helpers(&cwd.join(path))?,
            HelperSource::Discover => read_helpers(&discover_entry(cwd)?)?,
        };
        Ok(Self {
            source: Arc::from(text),
        })
    }

    /// Appends definitions the compiler's output imports next to the
    /// library's exports.
    pub fn with_runtime(self, runtime: Option<String>) -> Self {
        match runtime {
            Some(runtime) => Self {
                source: Arc::from(format!("{}\n{runtime}", self.source)),
            },
            None => self,
        }
    }

    pub fn source(&self) -> Arc<str> {
        self.source.clone()
    }
}

fn discover_entry(cwd: &Path) -> PluginResult<PathBuf> {
    for dir in cwd.ancestors() {
        let package_dir = dir.join("node_modules").join(HELPERS_ID);
        let Some(package) = PackageJson::read(&FsResolutionHost, &package_dir) else {
            continue;
        };
        let entry = package.module.as_deref().unwrap_or(FALLBACK_ENTRY);
        let path = package_dir.join(entry);
        debug!("Using tslib helpers from {}", path.display());
        return Ok(path);
    }
    Err(PluginError::HelperLoad {
        path: cwd.join("node_modules").join(HELPERS_ID),
        reason: "package not found in any parent node_modules directory".to_string(),
    })
}

fn read_helpers(path: &Path) -> PluginResult<String> {
    fs::read_to_string(path).map_err(|err| PluginError::HelperLoad {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}
