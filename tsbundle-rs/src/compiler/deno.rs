use std::path::Path;
use std::sync::Arc;

use deno_ast::diagnostics::Diagnostic as _;
use deno_ast::{
    DecoratorsTranspileOption, EmitOptions, JsxAutomaticOptions, JsxClassicOptions, JsxRuntime,
    MediaType, ModuleSpecifier, ParseDiagnostic, ParseParams, SourceMap, SourceMapOption,
    TranspileOptions,
};
use log::{trace, warn};

use super::lower::{self, runtime_helpers_source};
use super::{Compiler, TranspileInput, TranspileOutput};
use crate::diagnostic::{Diagnostic, MODULES_BELOW_ES2015_DIAGNOSTIC};
use crate::options::compiler_options::{CompilerOptions, JsxEmit, ModuleKind};
use crate::text::{normalize_slashes, strip_bom};

/// Code reported for syntax errors.
pub const SYNTAX_ERROR_DIAGNOSTIC: u32 = 1005;
/// Code reported when emit fails after a successful parse.
pub const EMIT_FAILURE_DIAGNOSTIC: u32 = 5033;

/// [`Compiler`] backed by `deno_ast`. Strips types, lowers JSX and
/// decorators, down-levels syntax to `target` with the swc compat passes and
/// emits ES module JavaScript with an optional source map.
///
/// Module syntax is kept whatever the target, so ES3/ES5 targets also get
/// the module diagnostic the plugin filters out.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenoAstCompiler;

impl Compiler for DenoAstCompiler {
    fn transpile_module(&self, input: TranspileInput<'_>) -> TranspileOutput {
        let TranspileInput {
            source,
            file_name,
            options,
            report_diagnostics,
        } = input;

        let mut diagnostics = Vec::new();
        if options.module == ModuleKind::Es2015 && options.target.predates_modules() {
            diagnostics.push(Diagnostic::error(
                MODULES_BELOW_ES2015_DIAGNOSTIC,
                "Cannot compile modules into 'es2015' when targeting 'ES5' or lower.",
            ));
        }

        let output = match specifier_for(file_name) {
            Some(specifier) => emit(specifier, source, file_name, options, &mut diagnostics),
            None => {
                diagnostics.push(Diagnostic::error(
                    EMIT_FAILURE_DIAGNOSTIC,
                    format!("Could not write file '{file_name}': invalid file name."),
                ));
                TranspileOutput::default()
            }
        };

        TranspileOutput {
            diagnostics: if report_diagnostics {
                diagnostics
            } else {
                Vec::new()
            },
            ..output
        }
    }

    fn runtime_helpers(&self) -> Option<String> {
        runtime_helpers_source()
            .map_err(|err| warn!("Unable to build the lowering runtime helpers: {err}"))
            .ok()
    }
}

fn emit(
    specifier: ModuleSpecifier,
    source: &str,
    file_name: &str,
    options: &CompilerOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> TranspileOutput {
    let media_type = MediaType::from_path(Path::new(file_name));
    trace!("Transpiling {file_name} as {media_type:?}");

    let parsed = match deno_ast::parse_module(ParseParams {
        specifier,
        text: Arc::from(strip_bom(source)),
        media_type,
        capture_tokens: false,
        scope_analysis: false,
        maybe_syntax: None,
    }) {
        Ok(parsed) => parsed,
        Err(err) => {
            diagnostics.push(syntax_error(&err, file_name));
            return TranspileOutput::default();
        }
    };

    let recoverable: Vec<Diagnostic> = parsed
        .diagnostics()
        .iter()
        .map(|diagnostic| syntax_error(diagnostic, file_name))
        .collect();
    let had_syntax_errors = !recoverable.is_empty();
    diagnostics.extend(recoverable);

    let emit_options = EmitOptions {
        source_map: if options.source_map {
            SourceMapOption::Separate
        } else {
            SourceMapOption::None
        },
        source_map_file: Some(file_name.to_string()),
        inline_sources: options.inline_sources,
        remove_comments: options.remove_comments,
        ..Default::default()
    };

    let comments = parsed.comments().as_single_threaded();
    let source_map = SourceMap::single(parsed.specifier().clone(), parsed.text().to_string());
    let transpile_options = transpile_options(options, media_type);
    let lowered = parsed.globals().with(|marks| {
        let program = deno_ast::fold_program(
            (*parsed.program()).clone(),
            &transpile_options,
            &source_map,
            &comments,
            marks,
            Box::new(parsed.diagnostics().iter()),
        )
        .map_err(|err| vec![err.to_string()])?;
        lower::lower(program, options, marks, &comments)
    });

    let program = match lowered {
        Ok(program) => program,
        Err(messages) => {
            // Syntax errors already reported above also fail the emit.
            if !had_syntax_errors {
                diagnostics.extend(
                    messages
                        .into_iter()
                        .map(|message| Diagnostic::error(EMIT_FAILURE_DIAGNOSTIC, message)),
                );
            }
            return TranspileOutput::default();
        }
    };

    match deno_ast::emit((&program).into(), &comments, &source_map, &emit_options) {
        Ok(emitted) => TranspileOutput {
            output_text: emitted.text,
            diagnostics: Vec::new(),
            source_map_text: emitted.source_map,
        },
        Err(err) => {
            diagnostics.push(Diagnostic::error(EMIT_FAILURE_DIAGNOSTIC, err.to_string()));
            TranspileOutput::default()
        }
    }
}

fn transpile_options(options: &CompilerOptions, media_type: MediaType) -> TranspileOptions {
    let allows_jsx = matches!(media_type, MediaType::Jsx | MediaType::Tsx);
    let jsx = match options.jsx.filter(|_| allows_jsx) {
        Some(JsxEmit::React) => Some(JsxRuntime::Classic(JsxClassicOptions {
            factory: options
                .jsx_factory
                .clone()
                .unwrap_or_else(|| "React.createElement".to_string()),
            fragment_factory: options
                .jsx_fragment_factory
                .clone()
                .unwrap_or_else(|| "React.Fragment".to_string()),
        })),
        Some(mode @ (JsxEmit::ReactJsx | JsxEmit::ReactJsxDev)) => {
            Some(JsxRuntime::Automatic(JsxAutomaticOptions {
                development: mode == JsxEmit::ReactJsxDev,
                import_source: Some(
                    options
                        .jsx_import_source
                        .clone()
                        .unwrap_or_else(|| "react".to_string()),
                ),
            }))
        }
        Some(JsxEmit::Preserve | JsxEmit::ReactNative) | None => None,
    };

    let decorators = if options.experimental_decorators {
        DecoratorsTranspileOption::LegacyTypeScript {
            emit_metadata: options.emit_decorator_metadata,
        }
    } else {
        DecoratorsTranspileOption::Ecma
    };

    TranspileOptions {
        jsx,
        decorators,
        verbatim_module_syntax: options.verbatim_module_syntax,
        ..Default::default()
    }
}

fn syntax_error(diagnostic: &ParseDiagnostic, file_name: &str) -> Diagnostic {
    let position = diagnostic.display_position();
    Diagnostic::error(SYNTAX_ERROR_DIAGNOSTIC, diagnostic.message().to_string()).with_location(
        file_name,
        position.line_number,
        position.column_number,
    )
}

fn specifier_for(file_name: &str) -> Option<ModuleSpecifier> {
    let path = Path::new(file_name);
    if path.is_absolute() {
        return ModuleSpecifier::from_file_path(path).ok();
    }
    ModuleSpecifier::parse("file:///")
        .ok()?
        .join(&normalize_slashes(file_name))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticCategory;
    use crate::options::compiler_options::ScriptTarget;

    fn es2015_options() -> CompilerOptions {
        CompilerOptions {
            target: ScriptTarget::Es2015,
            ..CompilerOptions::default()
        }
    }

    fn transpile(source: &str, file_name: &str, options: &CompilerOptions) -> TranspileOutput {
        DenoAstCompiler.transpile_module(TranspileInput {
            source,
            file_name,
            options,
            report_diagnostics: true,
        })
    }

    #[test]
    fn test_strips_types() {
        let output = transpile(
            "const answer: number = 42;\nexport default answer;\n",
            "/src/main.ts",
            &es2015_options(),
        );
        assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
        assert!(output.output_text.contains("const answer = 42"));
        assert!(output.output_text.contains("export default answer"));
        assert!(!output.output_text.contains(": number"));
    }

    #[test]
    fn test_syntax_error_is_located() {
        let output = transpile("export const x = ;\n", "/src/broken.ts", &es2015_options());
        let error = output
            .diagnostics
            .iter()
            .find(|d| d.code == SYNTAX_ERROR_DIAGNOSTIC)
            .expect("syntax error reported");
        assert_eq!(error.category, DiagnosticCategory::Error);
        let location = error.location.as_ref().unwrap();
        assert_eq!(location.file, "/src/broken.ts");
        assert_eq!(location.line, 1);
    }

    #[test]
    fn test_es5_target_reports_module_diagnostic() {
        let output = transpile("export {};\n", "/src/main.ts", &CompilerOptions::default());
        assert!(output
            .diagnostics
            .iter()
            .any(|d| d.code == MODULES_BELOW_ES2015_DIAGNOSTIC && d.category.is_error()));
    }

    #[test]
    fn test_diagnostics_suppressed_when_not_requested() {
        let output = DenoAstCompiler.transpile_module(TranspileInput {
            source: "export const x = ;",
            file_name: "/src/main.ts",
            options: &CompilerOptions::default(),
            report_diagnostics: false,
        });
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_source_map_follows_option() {
        let mut options = es2015_options();
        options.source_map = true;
        let with_map = transpile("export const a: string = 'a';\n", "/src/a.ts", &options);
        let map = with_map.source_map_text.expect("source map emitted");
        assert!(map.contains("\"mappings\""));

        options.source_map = false;
        let without_map = transpile("export const a: string = 'a';\n", "/src/a.ts", &options);
        assert!(without_map.source_map_text.is_none());
    }

    #[test]
    fn test_classic_jsx_factory() {
        let mut options = es2015_options();
        options.jsx = Some(JsxEmit::React);
        options.jsx_factory = Some("h".to_string());
        let output = transpile(
            "export const el = <div>hi</div>;\n",
            "/src/view.tsx",
            &options,
        );
        assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
        assert!(output.output_text.contains("h(\"div\""), "{}", output.output_text);
    }

    const DERIVED_ASYNC: &str = "class Base {}\n\
        export class Derived extends Base {\n  size = () => 1;\n}\n\
        export const total = async (xs: number[]) => {\n  const ys = [...xs];\n  return ys.length;\n};\n";

    #[test]
    fn test_es5_target_lowers_syntax_with_inline_helpers() {
        let output = transpile(DERIVED_ASYNC, "/src/derived.ts", &CompilerOptions::default());
        let code = &output.output_text;
        assert!(
            output.diagnostics.iter().all(|d| d.code == MODULES_BELOW_ES2015_DIAGNOSTIC),
            "{:?}",
            output.diagnostics
        );
        assert!(!code.contains("class Base"), "{code}");
        assert!(!code.contains("class Derived"), "{code}");
        assert!(!code.contains("=>"), "{code}");
        assert!(!code.contains("const "), "{code}");
        assert!(!code.contains("..."), "{code}");
        assert!(code.contains("function _inherits("), "{code}");
        assert!(code.contains("function _async_to_generator("), "{code}");
        assert!(!code.contains("tslib"), "{code}");
    }

    #[test]
    fn test_import_helpers_come_from_tslib() {
        let options = CompilerOptions {
            import_helpers: true,
            ..CompilerOptions::default()
        };
        let output = transpile(DERIVED_ASYNC, "/src/derived.ts", &options);
        let code = &output.output_text;
        assert!(code.contains("from \"tslib\""), "{code}");
        assert!(code.contains("_inherits"), "{code}");
        assert!(!code.contains("function _inherits("), "{code}");
        assert!(!code.contains("@swc/helpers"), "{code}");
    }

    #[test]
    fn test_no_emit_helpers_leaves_bare_references() {
        let options = CompilerOptions {
            no_emit_helpers: true,
            ..CompilerOptions::default()
        };
        let output = transpile(DERIVED_ASYNC, "/src/derived.ts", &options);
        let code = &output.output_text;
        assert!(code.contains("_inherits("), "{code}");
        assert!(!code.contains("function _inherits("), "{code}");
        assert!(!code.contains("import "), "{code}");
    }

    #[test]
    fn test_newer_target_keeps_syntax() {
        let options = CompilerOptions {
            target: ScriptTarget::EsNext,
            ..CompilerOptions::default()
        };
        let output = transpile(DERIVED_ASYNC, "/src/derived.ts", &options);
        let code = &output.output_text;
        assert!(code.contains("class Derived extends Base"), "{code}");
        assert!(code.contains("async"), "{code}");
        assert!(code.contains("=>"), "{code}");
        assert!(!code.contains("_inherits"), "{code}");
    }

    #[test]
    fn test_relative_file_name() {
        let output = transpile("export let n: number = 1;\n", "src/n.ts", &es2015_options());
        assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
        assert!(output.output_text.contains("export let n = 1"));
    }
}
