//! The compile capability the plugin delegates to.
//!
//! [`Compiler`] exposes exactly what the plugin uses: option parsing,
//! module resolution, single-file transpilation, diagnostic message
//! flattening and the runtime helpers its output imports. Everything except
//! transpilation has a default implementation, so alternative compilers (and
//! test stubs) only need to provide `transpile_module`.

mod deno;
mod lower;
pub(crate) mod package_json;
pub mod resolve;

use std::path::{Path, PathBuf};

use crate::diagnostic::{flatten_message, Diagnostic, DiagnosticMessage};
use crate::host::ModuleResolutionHost;
use crate::options::compiler_options::{
    parse_compiler_options, CompilerOptions, ParsedCompilerOptions, RawCompilerOptions,
};

pub use deno::{DenoAstCompiler, EMIT_FAILURE_DIAGNOSTIC, SYNTAX_ERROR_DIAGNOSTIC};

/// One file to transpile.
#[derive(Debug, Clone, Copy)]
pub struct TranspileInput<'a> {
    pub source: &'a str,
    pub file_name: &'a str,
    pub options: &'a CompilerOptions,
    pub report_diagnostics: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TranspileOutput {
    pub output_text: String,
    pub diagnostics: Vec<Diagnostic>,
    /// Source map JSON, when one was produced.
    pub source_map_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    pub resolved_file_name: PathBuf,
    /// Whether the file was found inside a `node_modules` directory.
    pub is_external_library_import: bool,
}

pub trait Compiler: Send + Sync {
    /// Validates a raw options mapping and converts it to typed options.
    fn parse_options(&self, raw: &RawCompilerOptions, base_dir: &Path) -> ParsedCompilerOptions {
        parse_compiler_options(raw, base_dir)
    }

    /// Resolves `module_name` imported from `containing_file`.
    fn resolve_module(
        &self,
        module_name: &str,
        containing_file: &str,
        options: &CompilerOptions,
        host: &dyn ModuleResolutionHost,
    ) -> Option<ResolvedModule> {
        resolve::node_module_name_resolver(module_name, containing_file, options, host)
    }

    /// Compiles one file's text without consulting any other file.
    fn transpile_module(&self, input: TranspileInput<'_>) -> TranspileOutput;

    fn flatten_diagnostic_message(&self, message: &DiagnosticMessage, new_line: &str) -> String {
        flatten_message(message, new_line)
    }

    /// Helper definitions transpiled output imports from `tslib` beyond the
    /// library's own exports. Served as part of the helper module.
    fn runtime_helpers(&self) -> Option<String> {
        None
    }
}
