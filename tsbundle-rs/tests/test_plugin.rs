use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};

use tsbundle_rs::compiler::{Compiler, TranspileInput, TranspileOutput};
use tsbundle_rs::{
    HelperSource, Plugin, PluginError, PluginOptions, ResolvedId, TsConfigSource,
    TypeScriptPlugin, VIRTUAL_HELPERS_ID,
};

static INIT: Once = Once::new();

fn initialize() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

fn helpers_fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("tslib.es6.js")
}

fn base_options(cwd: &Path) -> PluginOptions {
    PluginOptions::new()
        .cwd(cwd)
        .tsconfig(TsConfigSource::Disabled)
        .helpers(HelperSource::File(helpers_fixture()))
}

fn plugin(cwd: &Path) -> TypeScriptPlugin {
    initialize();
    TypeScriptPlugin::new(base_options(cwd)).unwrap()
}

/// Records the `strictNullChecks` value of every call.
#[derive(Default)]
struct RecordingCompiler {
    strict_null_checks: Mutex<Vec<Option<bool>>>,
}

impl Compiler for RecordingCompiler {
    fn transpile_module(&self, input: TranspileInput<'_>) -> TranspileOutput {
        self.strict_null_checks
            .lock()
            .unwrap()
            .push(input.options.strict_null_checks);
        TranspileOutput {
            output_text: "export default 1337;".to_string(),
            ..TranspileOutput::default()
        }
    }
}

#[test]
fn test_transform_strips_types() {
    let dir = tempfile::tempdir().unwrap();
    let id = dir.path().join("main.ts");
    let output = plugin(dir.path())
        .transform(
            "interface Point { x: number }\nexport const origin: Point = { x: 0 };\n",
            &id.to_string_lossy(),
        )
        .unwrap()
        .unwrap();

    assert!(!output.code.contains("interface"), "{}", output.code);
    assert!(!output.code.contains(": Point"), "{}", output.code);
    assert!(output.code.contains("origin"));
    assert!(output.map.is_some());
}

#[rstest]
#[case("main.js")]
#[case("types.d.ts")]
#[case("data.json")]
fn test_transform_skips_unselected_files(#[case] name: &str) {
    let dir = tempfile::tempdir().unwrap();
    let id = dir.path().join(name);
    let result = plugin(dir.path())
        .transform("export {};", &id.to_string_lossy())
        .unwrap();
    assert!(result.is_none());
}

#[test]
fn test_syntax_error_fails_transform() {
    let dir = tempfile::tempdir().unwrap();
    let id = dir.path().join("broken.ts");
    let err = plugin(dir.path())
        .transform("export const = 1;\n", &id.to_string_lossy())
        .unwrap_err();

    match err {
        PluginError::Transpile { file, diagnostics } => {
            assert_eq!(file, id.to_string_lossy());
            assert!(diagnostics.iter().any(|d| d.category.is_error()));
        }
        other => panic!("expected a transpile error, got {other}"),
    }
}

#[test]
fn test_source_maps_can_be_disabled() {
    initialize();
    let dir = tempfile::tempdir().unwrap();
    let plugin = TypeScriptPlugin::new(
        base_options(dir.path())
            .compiler_option("inlineSourceMap", false)
            .compiler_option("sourceMap", true),
    )
    .unwrap();

    let id = dir.path().join("main.ts");
    let output = plugin
        .transform("export const n: number = 1;\n", &id.to_string_lossy())
        .unwrap()
        .unwrap();
    assert!(output.map.is_none());
}

#[test]
fn test_custom_compiler_receives_effective_options() {
    initialize();
    let dir = tempfile::tempdir().unwrap();
    let compiler = Arc::new(RecordingCompiler::default());
    let plugin = TypeScriptPlugin::new(
        base_options(dir.path())
            .compiler(compiler.clone())
            .compiler_option("strictNullChecks", true),
    )
    .unwrap();

    let id = dir.path().join("main.ts");
    let output = plugin
        .transform("whatever", &id.to_string_lossy())
        .unwrap()
        .unwrap();
    assert_eq!(output.code, "export default 1337;");
    assert_eq!(*compiler.strict_null_checks.lock().unwrap(), vec![Some(true)]);
}

#[rstest]
#[case("module", "commonjs", "commonjs")]
#[case("module", "AMD", "amd")]
#[case("foo", "bar", "Couldn't process compiler options")]
#[case("target", "es1999", "Couldn't process compiler options")]
fn test_invalid_options_fail_construction(
    #[case] name: &str,
    #[case] value: &str,
    #[case] expected: &str,
) {
    initialize();
    let dir = tempfile::tempdir().unwrap();
    let err = TypeScriptPlugin::new(base_options(dir.path()).compiler_option(name, value))
        .err()
        .unwrap();
    assert!(err.is_construction_error());
    assert!(err.to_string().contains(expected), "{err}");
}

#[test]
fn test_declaration_option_is_ignored() {
    initialize();
    let dir = tempfile::tempdir().unwrap();
    let plugin = TypeScriptPlugin::new(
        base_options(dir.path())
            .compiler_option("declaration", true)
            .compiler_option("declarationDir", "types"),
    )
    .unwrap();
    assert!(!plugin.effective_options().raw().contains_key("declaration"));
}

#[test]
fn test_invalid_tsconfig_fails_construction() {
    initialize();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("tsconfig.json"), "{ \"compilerOptions\": ").unwrap();
    let err = TypeScriptPlugin::new(base_options(dir.path()).tsconfig(TsConfigSource::Discover))
        .err()
        .unwrap();
    assert!(matches!(err, PluginError::Configuration(_)), "{err}");
}

#[test]
fn test_tsconfig_extends_chain() {
    initialize();
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("config")).unwrap();
    fs::write(
        dir.path().join("config/base.json"),
        r#"{ "compilerOptions": { "jsx": "react", "removeComments": true } }"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("tsconfig.json"),
        r#"{
            "extends": "./config/base",
            // local overrides
            "compilerOptions": { "removeComments": false }
        }"#,
    )
    .unwrap();

    let plugin =
        TypeScriptPlugin::new(base_options(dir.path()).tsconfig(TsConfigSource::Discover)).unwrap();
    let options = plugin.effective_options().compiler_options();
    assert!(options.jsx.is_some());
    assert!(!options.remove_comments);
}

#[test]
fn test_resolve_id() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src/lib")).unwrap();
    fs::write(dir.path().join("src/main.ts"), "").unwrap();
    fs::write(dir.path().join("src/lib/index.ts"), "").unwrap();
    fs::write(dir.path().join("src/globals.d.ts"), "").unwrap();
    let plugin = plugin(dir.path());
    let importer = dir.path().join("src/main.ts");
    let importer = importer.to_string_lossy();

    assert_eq!(
        plugin.resolve_id("./lib", Some(&importer)),
        Some(ResolvedId::File(dir.path().join("src/lib/index.ts")))
    );
    assert_eq!(plugin.resolve_id("./globals", Some(&importer)), None);
    assert_eq!(plugin.resolve_id("./lib", None), None);
    assert_eq!(
        plugin.resolve_id("tslib", None),
        Some(ResolvedId::Virtual(VIRTUAL_HELPERS_ID.to_string()))
    );

    let helpers = plugin.load(VIRTUAL_HELPERS_ID).unwrap();
    assert!(helpers.starts_with(&fs::read_to_string(helpers_fixture()).unwrap()));
    assert!(helpers.contains("function _async_to_generator("));
}

#[test]
fn test_jsx_react() {
    initialize();
    let dir = tempfile::tempdir().unwrap();
    let plugin =
        TypeScriptPlugin::new(base_options(dir.path()).compiler_option("jsx", "react")).unwrap();
    let id = dir.path().join("view.tsx");
    let output = plugin
        .transform(
            "export const View = (props: { name: string }) => <p>{props.name}</p>;\n",
            &id.to_string_lossy(),
        )
        .unwrap()
        .unwrap();
    assert!(output.code.contains("React.createElement"), "{}", output.code);
    assert!(!output.code.contains("=>"), "{}", output.code);
    assert!(!output.code.contains("const "), "{}", output.code);
}

const DERIVED_ASYNC: &str = "class A {}\nexport class B extends A {}\n\
    export const f = async (xs: number[]) => {\n  const y = [...xs];\n  for (let i of y) { await i; }\n  return y;\n};\n";

#[test]
fn test_default_target_lowers_syntax() {
    let dir = tempfile::tempdir().unwrap();
    let id = dir.path().join("derived.ts");
    let output = plugin(dir.path())
        .transform(DERIVED_ASYNC, &id.to_string_lossy())
        .unwrap()
        .unwrap();
    let code = &output.code;

    for construct in ["class A", "class B", "=>", "const ", "let ", "...", "async "] {
        assert!(!code.contains(construct), "{construct:?} in {code}");
    }
    assert!(code.contains("from \"tslib\""), "{code}");
    assert!(!code.contains("function _inherits("), "{code}");
}

#[test]
fn test_helpers_stay_out_of_source_maps() {
    let dir = tempfile::tempdir().unwrap();
    let id = dir.path().join("derived.ts");
    let plugin = plugin(dir.path());
    let output = plugin
        .transform(DERIVED_ASYNC, &id.to_string_lossy())
        .unwrap()
        .unwrap();
    let map = output.map.expect("source map emitted");
    assert_eq!(map.sources.len(), 1, "{:?}", map.sources);
    assert!(map.sources[0].ends_with("derived.ts"), "{:?}", map.sources);

    let helpers = plugin.load(VIRTUAL_HELPERS_ID).unwrap();
    for name in ["_inherits", "_async_to_generator", "_ts_generator", "_to_consumable_array"] {
        assert!(
            helpers.contains(&format!("function {name}(")),
            "{name} missing from helper module"
        );
    }
}

#[test]
fn test_module_declarations_resolve_to_nothing() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("main.ts"), "").unwrap();
    fs::write(dir.path().join("types.d.mts"), "export type Id = string;\n").unwrap();
    let plugin = plugin(dir.path());
    let importer = dir.path().join("main.ts");

    assert_eq!(
        plugin.resolve_id("./types.mjs", Some(&importer.to_string_lossy())),
        None
    );
}

#[test]
fn test_concurrent_transforms() {
    let dir = tempfile::tempdir().unwrap();
    let plugin = plugin(dir.path());
    let ids: Vec<String> = (0..8)
        .map(|i| dir.path().join(format!("m{i}.ts")).to_string_lossy().into_owned())
        .collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let plugin = &plugin;
                scope.spawn(move || {
                    plugin
                        .transform(&format!("export const value{i}: number = {i};\n"), id)
                        .unwrap()
                        .unwrap()
                })
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            let output = handle.join().unwrap();
            assert!(output.code.contains(&format!("value{i} = {i}")), "{}", output.code);
        }
    });
}
