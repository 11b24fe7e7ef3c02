//! Error types for tsbundle-rs.

use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostic::Diagnostic;

/// Result type alias using PluginError.
pub type PluginResult<T> = Result<T, PluginError>;

/// Errors raised by the plugin.
///
/// `Configuration` and `HelperLoad` only occur while constructing a plugin;
/// `Transpile` is raised per file and aborts the build in progress.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Unknown option, unsupported module kind, bad tsconfig or glob pattern.
    #[error("tsbundle: {0}")]
    Configuration(String),

    /// The tslib helper module could not be located or read.
    #[error("tsbundle: error loading `tslib` helper library from {path}: {reason}")]
    HelperLoad { path: PathBuf, reason: String },

    /// At least one error diagnostic was reported for `file`.
    #[error("There were TypeScript errors transpiling {file}")]
    Transpile {
        file: String,
        diagnostics: Vec<Diagnostic>,
    },

    /// The compiler produced a source map that is not valid JSON.
    #[error("Invalid source map produced for {file}: {reason}")]
    InvalidSourceMap { file: String, reason: String },
}

impl PluginError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        PluginError::Configuration(message.into())
    }

    /// Returns true for errors that can only occur while constructing a plugin.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            PluginError::Configuration(_) | PluginError::HelperLoad { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transpile_error_message() {
        let err = PluginError::Transpile {
            file: "/src/main.ts".to_string(),
            diagnostics: vec![],
        };
        assert_eq!(
            err.to_string(),
            "There were TypeScript errors transpiling /src/main.ts"
        );
        assert!(!err.is_construction_error());
    }

    #[test]
    fn test_configuration_error_message() {
        let err = PluginError::configuration("Couldn't process compiler options");
        assert!(err.to_string().contains("Couldn't process compiler options"));
        assert!(err.is_construction_error());
    }
}
