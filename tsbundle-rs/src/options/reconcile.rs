//! Layered compiler-options reconciliation.
//!
//! Three layers are merged, lowest precedence first: built-in defaults, the
//! project configuration, and the options given to the plugin. The project
//! and override layers are first adjusted so nothing incompatible with
//! single-file, ES-module output reaches the compiler.

use std::path::Path;
use std::sync::Arc;

use log::{debug, error};
use serde_json::Value;

use super::compiler_options::{is_known_compiler_option, CompilerOptions, RawCompilerOptions};
use crate::compiler::Compiler;
use crate::error::{PluginError, PluginResult};

/// Module kinds producing ES-module output the bundler can consume.
pub const ACCEPTED_MODULE_KINDS: [&str; 2] = ["es2015", "es6"];

/// Options implying declaration output, whole-program emit or incremental
/// build state. They are dropped rather than forwarded.
const NEUTRALIZED_OPTIONS: &[&str] = &[
    "declaration",
    "declarationDir",
    "declarationMap",
    "emitDeclarationOnly",
    "composite",
    "incremental",
    "tsBuildInfoFile",
    "outFile",
    "out",
];

/// Built-in defaults, the lowest-precedence layer.
pub fn default_compiler_options() -> RawCompilerOptions {
    RawCompilerOptions::new()
        .with("module", "es2015")
        .with("target", "es5")
        .with("sourceMap", true)
        .with("noEmitHelpers", true)
        .with("importHelpers", true)
}

/// The three configuration sources, named by precedence.
#[derive(Debug, Clone, Default)]
pub struct OptionLayers {
    pub defaults: RawCompilerOptions,
    pub project: RawCompilerOptions,
    pub overrides: RawCompilerOptions,
}

impl OptionLayers {
    pub fn new(project: RawCompilerOptions, overrides: RawCompilerOptions) -> Self {
        Self {
            defaults: default_compiler_options(),
            project,
            overrides,
        }
    }

    /// Adjusts the project and override layers, then merges all three.
    pub fn merge(self) -> RawCompilerOptions {
        let OptionLayers {
            defaults,
            mut project,
            mut overrides,
        } = self;
        adjust_compiler_options(&mut project);
        adjust_compiler_options(&mut overrides);

        let mut merged = defaults;
        merged.overlay(&project);
        merged.overlay(&overrides);
        merged
    }
}

/// Rewrites one layer for use by the bundler.
///
/// A boolean `inlineSourceMap` becomes `sourceMap` (the two are never both
/// meaningful for a bundler), `module` is lower-cased, and options in
/// [`NEUTRALIZED_OPTIONS`] are removed.
pub fn adjust_compiler_options(options: &mut RawCompilerOptions) {
    if let Some(Value::Bool(inline)) = options.get("inlineSourceMap").cloned() {
        options.insert("sourceMap", inline);
        options.remove("inlineSourceMap");
    }

    if let Some(Value::String(module)) = options.get("module") {
        let lowered = module.to_ascii_lowercase();
        options.insert("module", lowered);
    }

    for name in NEUTRALIZED_OPTIONS {
        if options.remove(name).is_some() {
            debug!("Ignoring compiler option '{name}', which has no meaning when bundling");
        }
    }
}

/// The validated configuration shared by every component of one plugin
/// instance.
#[derive(Debug)]
pub struct EffectiveOptions {
    raw: RawCompilerOptions,
    compiler_options: Arc<CompilerOptions>,
}

impl EffectiveOptions {
    /// The merged mapping that was validated.
    pub fn raw(&self) -> &RawCompilerOptions {
        &self.raw
    }

    pub fn compiler_options(&self) -> &Arc<CompilerOptions> {
        &self.compiler_options
    }
}

/// Merges the layers and validates the result against the allow-list, the
/// module-kind requirement and the compiler's own options parser.
pub fn reconcile(
    layers: OptionLayers,
    compiler: &dyn Compiler,
    base_dir: &Path,
) -> PluginResult<EffectiveOptions> {
    let merged = layers.merge();

    let unknown: Vec<&String> = merged
        .keys()
        .filter(|name| !is_known_compiler_option(name))
        .collect();
    if !unknown.is_empty() {
        for name in &unknown {
            error!("tsbundle: Unknown compiler option '{name}'.");
        }
        return Err(PluginError::configuration(format!(
            "Couldn't process compiler options: unknown option(s) {}",
            unknown
                .iter()
                .map(|name| format!("'{name}'"))
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    let module = merged.get("module").and_then(Value::as_str).unwrap_or("");
    if !ACCEPTED_MODULE_KINDS.contains(&module) {
        let found = merged
            .get("module")
            .map(|value| match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| "undefined".to_string());
        return Err(PluginError::configuration(format!(
            "The module kind should be 'es2015', found: '{found}'"
        )));
    }

    let parsed = compiler.parse_options(&merged, base_dir);
    if !parsed.errors.is_empty() {
        for diagnostic in &parsed.errors {
            error!(
                "tsbundle: {}",
                compiler.flatten_diagnostic_message(&diagnostic.message, "\n")
            );
        }
        return Err(PluginError::configuration(
            "Couldn't process compiler options",
        ));
    }

    Ok(EffectiveOptions {
        raw: merged,
        compiler_options: Arc::new(parsed.options),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{TranspileInput, TranspileOutput};
    use crate::options::compiler_options::ModuleKind;
    use serde_json::json;

    struct StubCompiler;

    impl Compiler for StubCompiler {
        fn transpile_module(&self, _input: TranspileInput<'_>) -> TranspileOutput {
            TranspileOutput::default()
        }
    }

    fn reconcile_layers(
        project: RawCompilerOptions,
        overrides: RawCompilerOptions,
    ) -> PluginResult<EffectiveOptions> {
        reconcile(
            OptionLayers::new(project, overrides),
            &StubCompiler,
            Path::new("/project"),
        )
    }

    #[test]
    fn test_defaults_alone_are_valid() {
        let effective =
            reconcile_layers(RawCompilerOptions::new(), RawCompilerOptions::new()).unwrap();
        let options = effective.compiler_options();
        assert_eq!(options.module, ModuleKind::Es2015);
        assert!(options.source_map);
        assert!(options.import_helpers);
        assert!(options.no_emit_helpers);
    }

    #[test]
    fn test_precedence_overrides_then_project_then_defaults() {
        let effective = reconcile_layers(
            RawCompilerOptions::new()
                .with("target", "es2017")
                .with("removeComments", true),
            RawCompilerOptions::new().with("target", "es2020"),
        )
        .unwrap();
        assert_eq!(effective.raw().get("target"), Some(&json!("es2020")));
        assert_eq!(effective.raw().get("removeComments"), Some(&json!(true)));
        assert_eq!(effective.raw().get("module"), Some(&json!("es2015")));
    }

    #[test]
    fn test_inline_source_map_folds_into_source_map() {
        let mut layer = RawCompilerOptions::new()
            .with("inlineSourceMap", false)
            .with("sourceMap", true);
        adjust_compiler_options(&mut layer);
        assert_eq!(layer.get("sourceMap"), Some(&json!(false)));
        assert!(!layer.contains_key("inlineSourceMap"));
    }

    #[test]
    fn test_declaration_options_are_neutralized() {
        let effective = reconcile_layers(
            RawCompilerOptions::new().with("composite", true),
            RawCompilerOptions::new()
                .with("declaration", true)
                .with("outFile", "bundle.js"),
        )
        .unwrap();
        for name in ["declaration", "outFile", "composite"] {
            assert!(!effective.raw().contains_key(name), "{name} forwarded");
        }
    }

    #[test]
    fn test_module_kind_is_case_insensitive() {
        let effective = reconcile_layers(
            RawCompilerOptions::new().with("module", "ES6"),
            RawCompilerOptions::new(),
        )
        .unwrap();
        assert_eq!(effective.raw().get("module"), Some(&json!("es6")));
    }

    #[test]
    fn test_rejects_commonjs_module_kind() {
        let err = reconcile_layers(
            RawCompilerOptions::new(),
            RawCompilerOptions::new().with("module", "commonjs"),
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'commonjs'"), "{message}");
        assert!(err.is_construction_error());
    }

    #[test]
    fn test_rejects_unknown_option() {
        let err = reconcile_layers(
            RawCompilerOptions::new(),
            RawCompilerOptions::new().with("foo", "bar"),
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Couldn't process compiler options"), "{message}");
        assert!(message.contains("'foo'"), "{message}");
    }

    #[test]
    fn test_parser_errors_abort() {
        let err = reconcile_layers(
            RawCompilerOptions::new(),
            RawCompilerOptions::new().with("target", 5),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Couldn't process compiler options"));
    }
}
