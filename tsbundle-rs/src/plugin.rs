//! The bundler-facing plugin.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info};

use crate::compiler::{Compiler, DenoAstCompiler};
use crate::error::{PluginError, PluginResult};
use crate::filter::FileFilter;
use crate::helpers::{HelperModule, HELPERS_ID, VIRTUAL_HELPERS_ID};
use crate::options::reconcile::{reconcile, EffectiveOptions, OptionLayers};
use crate::options::{tsconfig, PluginOptions};
use crate::resolver::{ModuleResolver, Resolution};
use crate::transpiler::{TransformOutput, Transpiler};

/// A module id handed back to the bundler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolvedId {
    /// An absolute path on disk.
    File(PathBuf),
    /// An id with no file behind it, served by [`Plugin::load`].
    Virtual(String),
}

/// The hooks a bundler calls while building a module graph.
///
/// `None` from `resolve_id` or `load` defers to the bundler's own behavior;
/// `Ok(None)` from `transform` leaves the text unchanged.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn resolve_id(&self, specifier: &str, importer: Option<&str>) -> Option<ResolvedId>;

    fn load(&self, id: &str) -> Option<Arc<str>>;

    fn transform(&self, code: &str, id: &str) -> PluginResult<Option<TransformOutput>>;
}

/// Lets a module bundler consume TypeScript.
///
/// Everything is prepared by [`TypeScriptPlugin::new`]; the hooks only read
/// that state, so one instance can serve concurrent builds.
pub struct TypeScriptPlugin {
    effective: EffectiveOptions,
    resolver: ModuleResolver,
    transpiler: Transpiler,
    helpers: HelperModule,
}

impl TypeScriptPlugin {
    /// Validates the options and loads everything the hooks need.
    ///
    /// Fails with [`PluginError::Configuration`] for unusable options or
    /// project configuration and [`PluginError::HelperLoad`] when the helper
    /// library cannot be read.
    pub fn new(options: PluginOptions) -> PluginResult<Self> {
        let cwd = match options.cwd {
            Some(cwd) => cwd,
            None => env::current_dir().map_err(|err| {
                PluginError::configuration(format!("cannot determine working directory: {err}"))
            })?,
        };

        let filter = FileFilter::new(
            options.include.as_deref(),
            options.exclude.as_deref(),
            &cwd,
        )?;
        let compiler: Arc<dyn Compiler> = match options.compiler {
            Some(compiler) => compiler,
            None => Arc::new(DenoAstCompiler),
        };

        let project = tsconfig::project_compiler_options(&options.tsconfig, &cwd)?;
        let base_dir = tsconfig::project_dir(&options.tsconfig, &cwd);
        let effective = reconcile(
            OptionLayers::new(project, options.compiler_options),
            compiler.as_ref(),
            &base_dir,
        )?;
        debug!("Effective compiler options: {:?}", effective.raw());

        let helpers =
            HelperModule::load(&options.helpers, &cwd)?.with_runtime(compiler.runtime_helpers());

        let compiler_options = effective.compiler_options().clone();
        info!("TypeScript plugin ready in {}", cwd.display());
        Ok(Self {
            resolver: ModuleResolver::new(compiler.clone(), compiler_options.clone()),
            transpiler: Transpiler::new(compiler, compiler_options, filter),
            helpers,
            effective,
        })
    }

    pub fn effective_options(&self) -> &EffectiveOptions {
        &self.effective
    }
}

impl Plugin for TypeScriptPlugin {
    fn name(&self) -> &str {
        "typescript"
    }

    fn resolve_id(&self, specifier: &str, importer: Option<&str>) -> Option<ResolvedId> {
        if specifier == HELPERS_ID {
            return Some(ResolvedId::Virtual(VIRTUAL_HELPERS_ID.to_string()));
        }
        match self.resolver.resolve(specifier, importer) {
            Resolution::Resolved(path) => Some(ResolvedId::File(path)),
            Resolution::Unresolved | Resolution::Suppressed(_) => None,
        }
    }

    fn load(&self, id: &str) -> Option<Arc<str>> {
        (id == VIRTUAL_HELPERS_ID).then(|| self.helpers.source())
    }

    fn transform(&self, code: &str, id: &str) -> PluginResult<Option<TransformOutput>> {
        self.transpiler.transform(code, id)
    }
}
