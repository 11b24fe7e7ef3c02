//! Plugin configuration.
//!
//! - `compiler_options`: raw and typed compiler options, the allow-list and
//!   the default options parser
//! - `reconcile`: merging defaults, project configuration and overrides
//! - `tsconfig`: project configuration discovery

pub mod compiler_options;
pub mod reconcile;
pub mod tsconfig;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use crate::compiler::Compiler;
use crate::error::{PluginError, PluginResult};
use crate::helpers::HelperSource;
use compiler_options::RawCompilerOptions;

/// Where the project configuration comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TsConfigSource {
    /// Nearest `tsconfig.json` at or above the working directory.
    #[default]
    Discover,
    /// Skip project configuration entirely.
    Disabled,
    /// An explicit config file, relative to the working directory.
    File(PathBuf),
}

/// Options supplied once when constructing a [`crate::TypeScriptPlugin`].
#[derive(Clone, Default)]
pub struct PluginOptions {
    /// Glob patterns of files to transform. Defaults to `.ts`/`.tsx` files.
    pub include: Option<Vec<String>>,
    /// Glob patterns of files never to transform. Defaults to `.d.ts` files.
    pub exclude: Option<Vec<String>>,
    pub tsconfig: TsConfigSource,
    /// Replacement compile capability. Defaults to [`crate::DenoAstCompiler`].
    pub compiler: Option<Arc<dyn Compiler>>,
    pub helpers: HelperSource,
    /// Working directory; defaults to the process's current directory.
    pub cwd: Option<PathBuf>,
    /// Compiler options with the highest precedence.
    pub compiler_options: RawCompilerOptions,
}

impl PluginOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    pub fn tsconfig(mut self, source: TsConfigSource) -> Self {
        self.tsconfig = source;
        self
    }

    pub fn compiler(mut self, compiler: Arc<dyn Compiler>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    pub fn helpers(mut self, helpers: HelperSource) -> Self {
        self.helpers = helpers;
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn compiler_option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.compiler_options.insert(name, value);
        self
    }

    /// Builds options from a JSON object in the shape bundler configs use:
    /// `include`/`exclude` (string or array), `tsconfig` (boolean or path),
    /// every other key being a compiler option.
    pub fn from_json(value: Value) -> PluginResult<Self> {
        let Value::Object(mut map) = value else {
            return Err(PluginError::configuration(
                "plugin options must be a JSON object",
            ));
        };

        let mut options = PluginOptions::new();
        if let Some(include) = map.remove("include") {
            options.include = Some(pattern_list("include", include)?);
        }
        if let Some(exclude) = map.remove("exclude") {
            options.exclude = Some(pattern_list("exclude", exclude)?);
        }
        if let Some(tsconfig) = map.remove("tsconfig") {
            options.tsconfig = match tsconfig {
                Value::Bool(false) => TsConfigSource::Disabled,
                Value::Bool(true) | Value::Null => TsConfigSource::Discover,
                Value::String(path) => TsConfigSource::File(PathBuf::from(path)),
                other => {
                    return Err(PluginError::configuration(format!(
                        "`tsconfig` must be a boolean or a path, found: {other}"
                    )))
                }
            };
        }
        options.compiler_options = RawCompilerOptions::from(map);
        Ok(options)
    }
}

impl fmt::Debug for PluginOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginOptions")
            .field("include", &self.include)
            .field("exclude", &self.exclude)
            .field("tsconfig", &self.tsconfig)
            .field("compiler", &self.compiler.as_ref().map(|_| "<custom>"))
            .field("helpers", &self.helpers)
            .field("cwd", &self.cwd)
            .field("compiler_options", &self.compiler_options)
            .finish()
    }
}

fn pattern_list(name: &str, value: Value) -> PluginResult<Vec<String>> {
    match value {
        Value::String(pattern) => Ok(vec![pattern]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(pattern) => Ok(pattern),
                other => Err(PluginError::configuration(format!(
                    "`{name}` patterns must be strings, found: {other}"
                ))),
            })
            .collect(),
        other => Err(PluginError::configuration(format!(
            "`{name}` must be a pattern or a list of patterns, found: {other}"
        ))),
    }
}
