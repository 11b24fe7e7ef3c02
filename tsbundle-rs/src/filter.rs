//! Include/exclude filtering of module ids.

use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::error::{PluginError, PluginResult};
use crate::text::normalize_slashes;

pub const DEFAULT_INCLUDE: &[&str] = &["*.{ts,tsx}", "**/*.{ts,tsx}"];
pub const DEFAULT_EXCLUDE: &[&str] = &["*.d.ts", "**/*.d.ts"];

/// Decides which module ids the plugin transforms.
///
/// Relative patterns are anchored at the working directory; patterns that
/// are absolute or start with `*` match as written. An id is selected when it
/// matches an include pattern and no exclude pattern. Virtual ids (those
/// containing `\0`) are never selected.
#[derive(Debug, Clone)]
pub struct FileFilter {
    include: GlobSet,
    exclude: GlobSet,
}

impl FileFilter {
    pub fn new(
        include: Option<&[String]>,
        exclude: Option<&[String]>,
        cwd: &Path,
    ) -> PluginResult<Self> {
        let include = match include {
            Some(patterns) => build_globset(patterns, cwd)?,
            None => build_globset(DEFAULT_INCLUDE, cwd)?,
        };
        let exclude = match exclude {
            Some(patterns) => build_globset(patterns, cwd)?,
            None => build_globset(DEFAULT_EXCLUDE, cwd)?,
        };
        Ok(Self { include, exclude })
    }

    pub fn matches(&self, id: &str) -> bool {
        if id.contains('\0') {
            return false;
        }
        let id = normalize_slashes(id);
        self.include.is_match(&id) && !self.exclude.is_match(&id)
    }
}

fn build_globset<S: AsRef<str>>(patterns: &[S], cwd: &Path) -> PluginResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = anchor_pattern(pattern.as_ref(), cwd);
        let glob = GlobBuilder::new(&pattern)
            .literal_separator(true)
            .build()
            .map_err(|err| {
                PluginError::configuration(format!("invalid glob pattern '{pattern}': {err}"))
            })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|err| PluginError::configuration(format!("failed to build glob matcher: {err}")))
}

fn anchor_pattern(pattern: &str, cwd: &Path) -> String {
    if pattern.starts_with('*') || Path::new(pattern).is_absolute() {
        return normalize_slashes(pattern);
    }
    let relative = pattern.strip_prefix("./").unwrap_or(pattern);
    normalize_slashes(&cwd.join(relative).to_string_lossy())
}
