//! `tsconfig.json` discovery and loading.
//!
//! Only `compilerOptions` is read. Files are JSONC (comments and trailing
//! commas allowed). A relative `extends` is followed, the extending file's
//! options taking precedence.

use std::fs;
use std::path::{Path, PathBuf};

use jsonc_parser::ParseOptions;
use log::{debug, warn};
use serde_json::Value;

use super::compiler_options::RawCompilerOptions;
use super::TsConfigSource;
use crate::error::{PluginError, PluginResult};

pub const TSCONFIG_FILE_NAME: &str = "tsconfig.json";

/// Walks from `start` up to the file-system root looking for `tsconfig.json`.
pub fn find_tsconfig(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(TSCONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Produces the project-configuration layer for the given source.
pub fn project_compiler_options(
    source: &TsConfigSource,
    cwd: &Path,
) -> PluginResult<RawCompilerOptions> {
    match source {
        TsConfigSource::Disabled => Ok(RawCompilerOptions::new()),
        TsConfigSource::Discover => match find_tsconfig(cwd) {
            Some(path) => {
                debug!("Using compiler options from {}", path.display());
                read_compiler_options(&path)
            }
            None => {
                debug!("No {TSCONFIG_FILE_NAME} found above {}", cwd.display());
                Ok(RawCompilerOptions::new())
            }
        },
        TsConfigSource::File(path) => read_compiler_options(&cwd.join(path)),
    }
}

/// The directory path-valued options (`baseUrl`, `paths`) are relative to:
/// that of the project configuration file, or `cwd` when there is none.
pub fn project_dir(source: &TsConfigSource, cwd: &Path) -> PathBuf {
    let config = match source {
        TsConfigSource::Disabled => None,
        TsConfigSource::Discover => find_tsconfig(cwd),
        TsConfigSource::File(path) => Some(cwd.join(path)),
    };
    config
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cwd.to_path_buf())
}

/// Reads `compilerOptions` from a config file, following `extends`.
pub fn read_compiler_options(path: &Path) -> PluginResult<RawCompilerOptions> {
    let mut chain = Vec::new();
    read_with_extends(path, &mut chain)
}

fn read_with_extends(path: &Path, chain: &mut Vec<PathBuf>) -> PluginResult<RawCompilerOptions> {
    if chain.iter().any(|seen| seen == path) {
        return Err(PluginError::configuration(format!(
            "Circularity detected while resolving configuration: {}",
            path.display()
        )));
    }
    chain.push(path.to_path_buf());

    let config = parse_config_file(path)?;
    let config_dir = path.parent().unwrap_or(Path::new("."));

    let mut options = RawCompilerOptions::new();
    for parent in extends_entries(&config) {
        match resolve_extends(config_dir, parent) {
            Some(parent_path) => options.overlay(&read_with_extends(&parent_path, chain)?),
            None => warn!(
                "Ignoring non-relative `extends` \"{parent}\" in {}",
                path.display()
            ),
        }
    }

    if let Some(own) = config.get("compilerOptions") {
        match own {
            Value::Object(map) => options.overlay(&RawCompilerOptions::from(map.clone())),
            _ => {
                return Err(PluginError::configuration(format!(
                    "`compilerOptions` in {} must be an object",
                    path.display()
                )))
            }
        }
    }

    chain.pop();
    Ok(options)
}

fn parse_config_file(path: &Path) -> PluginResult<Value> {
    let text = fs::read_to_string(path).map_err(|err| {
        PluginError::configuration(format!("Cannot read file '{}': {err}", path.display()))
    })?;
    let value = jsonc_parser::parse_to_serde_value(&text, &ParseOptions::default()).map_err(
        |err| PluginError::configuration(format!("Failed to parse {}: {err}", path.display())),
    )?;

    match value {
        Some(value @ Value::Object(_)) => Ok(value),
        None => Ok(Value::Object(Default::default())),
        Some(_) => Err(PluginError::configuration(format!(
            "{} must contain a JSON object",
            path.display()
        ))),
    }
}

fn extends_entries(config: &Value) -> Vec<&str> {
    match config.get("extends") {
        Some(Value::String(parent)) => vec![parent.as_str()],
        Some(Value::Array(parents)) => parents.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn resolve_extends(config_dir: &Path, parent: &str) -> Option<PathBuf> {
    let is_relative = parent.starts_with("./") || parent.starts_with("../");
    if !is_relative && !Path::new(parent).is_absolute() {
        return None;
    }

    let candidate = config_dir.join(parent);
    if candidate.is_file() || parent.ends_with(".json") {
        Some(candidate)
    } else {
        Some(config_dir.join(format!("{parent}.json")))
    }
}
