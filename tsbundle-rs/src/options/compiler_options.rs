//! Raw and parsed TypeScript compiler options.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::diagnostic::Diagnostic;

/// `Unknown compiler option '{0}'.`
pub const UNKNOWN_OPTION_DIAGNOSTIC: u32 = 5023;
/// `Compiler option '{0}' requires a value of type {1}.`
pub const OPTION_TYPE_DIAGNOSTIC: u32 = 5024;
/// `Argument for '{0}' option must be: {1}.`
pub const OPTION_VALUE_DIAGNOSTIC: u32 = 6046;

/// Every compiler option name the plugin recognises. Options outside this
/// list are rejected before they reach the compiler.
pub const KNOWN_COMPILER_OPTIONS: &[&str] = &[
    "allowArbitraryExtensions",
    "allowImportingTsExtensions",
    "allowJs",
    "allowSyntheticDefaultImports",
    "allowUmdGlobalAccess",
    "allowUnreachableCode",
    "allowUnusedLabels",
    "alwaysStrict",
    "baseUrl",
    "charset",
    "checkJs",
    "composite",
    "customConditions",
    "declaration",
    "declarationDir",
    "declarationMap",
    "downlevelIteration",
    "emitBOM",
    "emitDeclarationOnly",
    "emitDecoratorMetadata",
    "esModuleInterop",
    "exactOptionalPropertyTypes",
    "experimentalDecorators",
    "forceConsistentCasingInFileNames",
    "importHelpers",
    "incremental",
    "inlineSourceMap",
    "inlineSources",
    "isolatedModules",
    "jsx",
    "jsxFactory",
    "jsxFragmentFactory",
    "jsxImportSource",
    "keyofStringsOnly",
    "lib",
    "mapRoot",
    "maxNodeModuleJsDepth",
    "module",
    "moduleDetection",
    "moduleResolution",
    "newLine",
    "noEmit",
    "noEmitHelpers",
    "noEmitOnError",
    "noErrorTruncation",
    "noFallthroughCasesInSwitch",
    "noImplicitAny",
    "noImplicitOverride",
    "noImplicitReturns",
    "noImplicitThis",
    "noImplicitUseStrict",
    "noLib",
    "noPropertyAccessFromIndexSignature",
    "noResolve",
    "noStrictGenericChecks",
    "noUncheckedIndexedAccess",
    "noUnusedLocals",
    "noUnusedParameters",
    "out",
    "outDir",
    "outFile",
    "paths",
    "preserveConstEnums",
    "preserveSymlinks",
    "preserveValueImports",
    "pretty",
    "reactNamespace",
    "removeComments",
    "resolveJsonModule",
    "resolvePackageJsonExports",
    "resolvePackageJsonImports",
    "rootDir",
    "rootDirs",
    "skipDefaultLibCheck",
    "skipLibCheck",
    "sourceMap",
    "sourceRoot",
    "strict",
    "strictBindCallApply",
    "strictFunctionTypes",
    "strictNullChecks",
    "strictPropertyInitialization",
    "stripInternal",
    "suppressExcessPropertyErrors",
    "suppressImplicitAnyIndexErrors",
    "target",
    "traceResolution",
    "tsBuildInfoFile",
    "typeRoots",
    "types",
    "useDefineForClassFields",
    "useUnknownInCatchVariables",
    "verbatimModuleSyntax",
];

pub fn is_known_compiler_option(name: &str) -> bool {
    KNOWN_COMPILER_OPTIONS.contains(&name)
}

/// An unvalidated compiler-options mapping, as found in `tsconfig.json`
/// `compilerOptions` or passed to the plugin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCompilerOptions(Map<String, Value>);

impl RawCompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Copies every entry of `other` over this mapping.
    pub fn overlay(&mut self, other: &RawCompilerOptions) {
        for (key, value) in other.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for RawCompilerOptions {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Module code generation kind (`--module`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    None,
    CommonJs,
    Amd,
    Umd,
    System,
    Es2015,
    Es2020,
    Es2022,
    EsNext,
    Node16,
    NodeNext,
    Preserve,
}

impl ModuleKind {
    const CHOICES: &'static str =
        "'none', 'commonjs', 'amd', 'umd', 'system', 'es6', 'es2015', 'es2020', 'es2022', 'esnext', 'node16', 'nodenext', 'preserve'";
}

impl FromStr for ModuleKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "none" => ModuleKind::None,
            "commonjs" => ModuleKind::CommonJs,
            "amd" => ModuleKind::Amd,
            "umd" => ModuleKind::Umd,
            "system" => ModuleKind::System,
            "es6" | "es2015" => ModuleKind::Es2015,
            "es2020" => ModuleKind::Es2020,
            "es2022" => ModuleKind::Es2022,
            "esnext" => ModuleKind::EsNext,
            "node16" => ModuleKind::Node16,
            "nodenext" => ModuleKind::NodeNext,
            "preserve" => ModuleKind::Preserve,
            _ => return Err(()),
        })
    }
}

/// ECMAScript target version (`--target`). Ordered oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScriptTarget {
    Es3,
    Es5,
    Es2015,
    Es2016,
    Es2017,
    Es2018,
    Es2019,
    Es2020,
    Es2021,
    Es2022,
    Es2023,
    EsNext,
}

impl ScriptTarget {
    const CHOICES: &'static str = "'es3', 'es5', 'es6', 'es2015', 'es2016', 'es2017', 'es2018', 'es2019', 'es2020', 'es2021', 'es2022', 'es2023', 'esnext'";

    /// Targets whose runtimes have no native module syntax.
    pub fn predates_modules(self) -> bool {
        self <= ScriptTarget::Es5
    }
}

impl fmt::Display for ScriptTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScriptTarget::Es3 => "ES3",
            ScriptTarget::Es5 => "ES5",
            ScriptTarget::Es2015 => "ES2015",
            ScriptTarget::Es2016 => "ES2016",
            ScriptTarget::Es2017 => "ES2017",
            ScriptTarget::Es2018 => "ES2018",
            ScriptTarget::Es2019 => "ES2019",
            ScriptTarget::Es2020 => "ES2020",
            ScriptTarget::Es2021 => "ES2021",
            ScriptTarget::Es2022 => "ES2022",
            ScriptTarget::Es2023 => "ES2023",
            ScriptTarget::EsNext => "ESNext",
        };
        f.write_str(name)
    }
}

impl FromStr for ScriptTarget {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "es3" => ScriptTarget::Es3,
            "es5" => ScriptTarget::Es5,
            "es6" | "es2015" => ScriptTarget::Es2015,
            "es2016" => ScriptTarget::Es2016,
            "es2017" => ScriptTarget::Es2017,
            "es2018" => ScriptTarget::Es2018,
            "es2019" => ScriptTarget::Es2019,
            "es2020" => ScriptTarget::Es2020,
            "es2021" => ScriptTarget::Es2021,
            "es2022" => ScriptTarget::Es2022,
            "es2023" => ScriptTarget::Es2023,
            "esnext" => ScriptTarget::EsNext,
            _ => return Err(()),
        })
    }
}

/// JSX emit mode (`--jsx`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsxEmit {
    Preserve,
    React,
    ReactNative,
    ReactJsx,
    ReactJsxDev,
}

impl JsxEmit {
    const CHOICES: &'static str = "'preserve', 'react-native', 'react-jsx', 'react-jsxdev', 'react'";
}

impl FromStr for JsxEmit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "preserve" => JsxEmit::Preserve,
            "react" => JsxEmit::React,
            "react-native" => JsxEmit::ReactNative,
            "react-jsx" => JsxEmit::ReactJsx,
            "react-jsxdev" => JsxEmit::ReactJsxDev,
            _ => return Err(()),
        })
    }
}

/// Module resolution strategy (`--moduleResolution`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleResolutionKind {
    Classic,
    Node10,
    Node16,
    NodeNext,
    Bundler,
}

impl ModuleResolutionKind {
    const CHOICES: &'static str = "'node10', 'node', 'classic', 'node16', 'nodenext', 'bundler'";
}

impl FromStr for ModuleResolutionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "classic" => ModuleResolutionKind::Classic,
            "node" | "node10" => ModuleResolutionKind::Node10,
            "node16" => ModuleResolutionKind::Node16,
            "nodenext" => ModuleResolutionKind::NodeNext,
            "bundler" => ModuleResolutionKind::Bundler,
            _ => return Err(()),
        })
    }
}

/// Validated compiler options consumed by the compile and resolve
/// capabilities. Options that only matter to a type checker are accepted
/// upstream but have no field here.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilerOptions {
    pub module: ModuleKind,
    pub target: ScriptTarget,
    pub module_resolution: ModuleResolutionKind,
    pub jsx: Option<JsxEmit>,
    pub jsx_factory: Option<String>,
    pub jsx_fragment_factory: Option<String>,
    pub jsx_import_source: Option<String>,
    pub source_map: bool,
    pub inline_sources: bool,
    pub remove_comments: bool,
    pub experimental_decorators: bool,
    pub emit_decorator_metadata: bool,
    pub import_helpers: bool,
    pub no_emit_helpers: bool,
    pub verbatim_module_syntax: bool,
    pub allow_js: bool,
    pub resolve_json_module: bool,
    pub strict_null_checks: Option<bool>,
    /// Absolute `baseUrl`.
    pub base_url: Option<PathBuf>,
    /// `paths` mappings in declaration order.
    pub paths: Vec<(String, Vec<String>)>,
    /// Directory `paths` substitutions are relative to when no `baseUrl` is set.
    pub paths_base_path: Option<PathBuf>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            module: ModuleKind::Es2015,
            target: ScriptTarget::Es5,
            module_resolution: ModuleResolutionKind::Node10,
            jsx: None,
            jsx_factory: None,
            jsx_fragment_factory: None,
            jsx_import_source: None,
            source_map: false,
            inline_sources: false,
            remove_comments: false,
            experimental_decorators: false,
            emit_decorator_metadata: false,
            import_helpers: false,
            no_emit_helpers: false,
            verbatim_module_syntax: false,
            allow_js: false,
            resolve_json_module: false,
            strict_null_checks: None,
            base_url: None,
            paths: Vec::new(),
            paths_base_path: None,
        }
    }
}

/// Output of an options parser: the typed options plus every problem found.
#[derive(Debug, Clone)]
pub struct ParsedCompilerOptions {
    pub options: CompilerOptions,
    pub errors: Vec<Diagnostic>,
}

/// Parses a raw mapping into [`CompilerOptions`], collecting a diagnostic
/// for every unknown option or ill-typed value. Relative paths are resolved
/// against `base_dir`.
pub fn parse_compiler_options(raw: &RawCompilerOptions, base_dir: &Path) -> ParsedCompilerOptions {
    let mut options = CompilerOptions::default();
    let mut errors = Vec::new();

    for (key, value) in raw.iter() {
        let name = key.as_str();
        match name {
            "module" => {
                if let Some(kind) = parse_choice(name, value, ModuleKind::CHOICES, &mut errors) {
                    options.module = kind;
                }
            }
            "target" => {
                if let Some(target) = parse_choice(name, value, ScriptTarget::CHOICES, &mut errors)
                {
                    options.target = target;
                }
            }
            "moduleResolution" => {
                if let Some(kind) =
                    parse_choice(name, value, ModuleResolutionKind::CHOICES, &mut errors)
                {
                    options.module_resolution = kind;
                }
            }
            "jsx" => {
                options.jsx = parse_choice(name, value, JsxEmit::CHOICES, &mut errors);
            }
            "jsxFactory" => options.jsx_factory = parse_string(name, value, &mut errors),
            "jsxFragmentFactory" => {
                options.jsx_fragment_factory = parse_string(name, value, &mut errors)
            }
            "jsxImportSource" => {
                options.jsx_import_source = parse_string(name, value, &mut errors)
            }
            "baseUrl" => {
                options.base_url =
                    parse_string(name, value, &mut errors).map(|url| base_dir.join(url));
            }
            "paths" => {
                if let Some(paths) = parse_paths(value, &mut errors) {
                    options.paths = paths;
                    options.paths_base_path = Some(base_dir.to_path_buf());
                }
            }
            "strictNullChecks" => {
                options.strict_null_checks = parse_bool(name, value, &mut errors);
            }
            _ => {
                if let Some(field) = bool_field(&mut options, name) {
                    if let Some(flag) = parse_bool(name, value, &mut errors) {
                        *field = flag;
                    }
                } else if !is_known_compiler_option(name) {
                    errors.push(Diagnostic::error(
                        UNKNOWN_OPTION_DIAGNOSTIC,
                        format!("Unknown compiler option '{name}'."),
                    ));
                }
            }
        }
    }

    ParsedCompilerOptions { options, errors }
}

fn bool_field<'a>(options: &'a mut CompilerOptions, name: &str) -> Option<&'a mut bool> {
    Some(match name {
        "sourceMap" => &mut options.source_map,
        "inlineSources" => &mut options.inline_sources,
        "removeComments" => &mut options.remove_comments,
        "experimentalDecorators" => &mut options.experimental_decorators,
        "emitDecoratorMetadata" => &mut options.emit_decorator_metadata,
        "importHelpers" => &mut options.import_helpers,
        "noEmitHelpers" => &mut options.no_emit_helpers,
        "verbatimModuleSyntax" => &mut options.verbatim_module_syntax,
        "allowJs" => &mut options.allow_js,
        "resolveJsonModule" => &mut options.resolve_json_module,
        _ => return None,
    })
}

fn parse_choice<T: FromStr>(
    name: &str,
    value: &Value,
    choices: &str,
    errors: &mut Vec<Diagnostic>,
) -> Option<T> {
    match value.as_str().map(T::from_str) {
        Some(Ok(parsed)) => Some(parsed),
        _ => {
            errors.push(Diagnostic::error(
                OPTION_VALUE_DIAGNOSTIC,
                format!("Argument for '--{name}' option must be: {choices}."),
            ));
            None
        }
    }
}

fn parse_string(name: &str, value: &Value, errors: &mut Vec<Diagnostic>) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        _ => {
            errors.push(type_error(name, "string"));
            None
        }
    }
}

fn parse_bool(name: &str, value: &Value, errors: &mut Vec<Diagnostic>) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        _ => {
            errors.push(type_error(name, "boolean"));
            None
        }
    }
}

fn parse_paths(value: &Value, errors: &mut Vec<Diagnostic>) -> Option<Vec<(String, Vec<String>)>> {
    let Some(object) = value.as_object() else {
        errors.push(type_error("paths", "object"));
        return None;
    };

    let mut paths = Vec::with_capacity(object.len());
    for (pattern, substitutions) in object {
        let substitutions: Option<Vec<String>> = substitutions
            .as_array()
            .and_then(|items| items.iter().map(|s| s.as_str().map(String::from)).collect());
        match substitutions {
            Some(substitutions) => paths.push((pattern.clone(), substitutions)),
            None => {
                errors.push(Diagnostic::error(
                    OPTION_TYPE_DIAGNOSTIC,
                    format!("Substitutions for pattern '{pattern}' should be an array of strings."),
                ));
            }
        }
    }
    Some(paths)
}

fn type_error(name: &str, expected: &str) -> Diagnostic {
    Diagnostic::error(
        OPTION_TYPE_DIAGNOSTIC,
        format!("Compiler option '{name}' requires a value of type {expected}."),
    )
}
