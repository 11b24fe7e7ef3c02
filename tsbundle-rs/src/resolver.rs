use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::trace;

use crate::compiler::Compiler;
use crate::host::FsResolutionHost;
use crate::options::compiler_options::CompilerOptions;
use crate::text::normalize_slashes;

/// Outcome of resolving one import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(PathBuf),
    /// No file found, or no importer to resolve against. The bundler's own
    /// resolution takes over.
    Unresolved,
    /// The import resolved to a declaration file, which has no runtime code.
    Suppressed(PathBuf),
}

/// Resolves imports with the compiler's resolution capability and the
/// plugin's effective options.
pub struct ModuleResolver {
    compiler: Arc<dyn Compiler>,
    options: Arc<CompilerOptions>,
    host: FsResolutionHost,
}

impl ModuleResolver {
    pub fn new(compiler: Arc<dyn Compiler>, options: Arc<CompilerOptions>) -> Self {
        Self {
            compiler,
            options,
            host: FsResolutionHost,
        }
    }

    pub fn resolve(&self, specifier: &str, importer: Option<&str>) -> Resolution {
        let Some(importer) = importer else {
            return Resolution::Unresolved;
        };
        let importer = normalize_slashes(importer);

        let Some(resolved) =
            self.compiler
                .resolve_module(specifier, &importer, &self.options, &self.host)
        else {
            trace!("'{specifier}' from {importer} left to the bundler");
            return Resolution::Unresolved;
        };

        let path = resolved.resolved_file_name;
        if is_declaration_file(&path) {
            trace!("'{specifier}' from {importer} is a declaration file");
            Resolution::Suppressed(path)
        } else {
            Resolution::Resolved(path)
        }
    }
}

/// `.d.ts`, `.d.mts`, `.d.cts` and arbitrary-extension declarations such as
/// `styles.d.css.ts`.
fn is_declaration_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    if [".d.ts", ".d.mts", ".d.cts"]
        .iter()
        .any(|suffix| name.ends_with(suffix))
    {
        return true;
    }
    name.strip_suffix(".ts")
        .and_then(|stem| stem.rsplit_once('.'))
        .is_some_and(|(rest, _)| rest.ends_with(".d"))
}
