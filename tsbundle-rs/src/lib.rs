#![doc = include_str!("../README.md")]

pub mod bundler;
pub mod compiler;
pub mod diagnostic;
pub mod error;
pub mod filter;
pub mod helpers;
pub mod host;
pub mod options;
pub mod plugin;
pub mod resolver;
pub mod text;
pub mod transpiler;

pub use compiler::{Compiler, DenoAstCompiler, ResolvedModule, TranspileInput, TranspileOutput};
pub use diagnostic::{Diagnostic, DiagnosticCategory, DiagnosticMessage};
pub use error::{PluginError, PluginResult};
pub use helpers::{HelperSource, HELPERS_ID, VIRTUAL_HELPERS_ID};
pub use options::compiler_options::{CompilerOptions, RawCompilerOptions};
pub use options::{PluginOptions, TsConfigSource};
pub use plugin::{Plugin, ResolvedId, TypeScriptPlugin};
pub use transpiler::{SourceMapJson, TransformOutput};
pub use serde_json;
