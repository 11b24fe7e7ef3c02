use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::compiler::{Compiler, TranspileInput};
use crate::diagnostic::{Diagnostic, DiagnosticCategory, MODULES_BELOW_ES2015_DIAGNOSTIC};
use crate::error::{PluginError, PluginResult};
use crate::filter::FileFilter;
use crate::options::compiler_options::CompilerOptions;

/// A version 3 source map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMapJson {
    #[serde(default = "source_map_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub names: Vec<String>,
    pub mappings: String,
}

fn source_map_version() -> u32 {
    3
}

/// The result of transforming one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub code: String,
    pub map: Option<SourceMapJson>,
}

/// Compiles selected files to JavaScript, one file at a time.
pub struct Transpiler {
    compiler: Arc<dyn Compiler>,
    options: Arc<CompilerOptions>,
    filter: FileFilter,
}

impl Transpiler {
    pub fn new(
        compiler: Arc<dyn Compiler>,
        options: Arc<CompilerOptions>,
        filter: FileFilter,
    ) -> Self {
        Self {
            compiler,
            options,
            filter,
        }
    }

    /// Returns `Ok(None)` for files outside the include/exclude filter.
    pub fn transform(&self, code: &str, id: &str) -> PluginResult<Option<TransformOutput>> {
        if !self.filter.matches(id) {
            return Ok(None);
        }
        debug!("Transpiling {id}");

        let output = self.compiler.transpile_module(TranspileInput {
            source: code,
            file_name: id,
            options: &self.options,
            report_diagnostics: true,
        });

        let diagnostics: Vec<Diagnostic> = output
            .diagnostics
            .into_iter()
            .filter(|diagnostic| diagnostic.code != MODULES_BELOW_ES2015_DIAGNOSTIC)
            .collect();
        for diagnostic in &diagnostics {
            self.log_diagnostic(diagnostic);
        }
        if diagnostics.iter().any(|d| d.category.is_error()) {
            return Err(PluginError::Transpile {
                file: id.to_string(),
                diagnostics,
            });
        }

        let map = match output.source_map_text {
            Some(text) if self.options.source_map => Some(parse_source_map(&text, id)?),
            _ => None,
        };

        Ok(Some(TransformOutput {
            code: output.output_text,
            map,
        }))
    }

    fn log_diagnostic(&self, diagnostic: &Diagnostic) {
        let message = self
            .compiler
            .flatten_diagnostic_message(&diagnostic.message, "\n");
        let line = diagnostic.format_with(&message);
        match diagnostic.category {
            DiagnosticCategory::Error => error!("{line}"),
            DiagnosticCategory::Warning => warn!("{line}"),
            DiagnosticCategory::Suggestion | DiagnosticCategory::Message => info!("{line}"),
        }
    }
}

fn parse_source_map(text: &str, id: &str) -> PluginResult<SourceMapJson> {
    serde_json::from_str(text).map_err(|err| PluginError::InvalidSourceMap {
        file: id.to_string(),
        reason: err.to_string(),
    })
}
