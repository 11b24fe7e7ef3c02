use std::collections::{BTreeSet, HashMap};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use deno_ast::swc::ast::{EsVersion, Module, ModuleDecl, ModuleItem};
use deno_ast::swc::bundler::{Bundler, Config as BundlerConfig, Load, ModuleData, ModuleType, Resolve};
use deno_ast::swc::codegen::text_writer::JsWriter;
use deno_ast::swc::codegen::{Config as CodegenConfig, Emitter};
use deno_ast::swc::common::comments::SingleThreadedComments;
use deno_ast::swc::common::sync::Lrc;
use deno_ast::swc::common::{FileName, Globals, SourceMap, GLOBALS};
use deno_ast::swc::loader::resolve::Resolution;
use deno_ast::swc::parser::lexer::Lexer;
use deno_ast::swc::parser::{EsSyntax, Parser, StringInput, Syntax};
use log::{debug, trace};

use super::import_meta::ImportMetaHook;
use crate::compiler::resolve::normalize_path;
use crate::plugin::{Plugin, ResolvedId};
use crate::text::{strip_bom, transform_json_source};

/// Extensions tried for relative imports the plugin leaves unresolved.
const FALLBACK_EXTENSIONS: &[&str] = &["", ".js", ".mjs"];

#[derive(Debug, Clone, Default)]
pub struct BundleOptions {
    /// Bare specifiers left as imports in the output instead of bundled.
    pub external: Vec<String>,
    pub minify: bool,
}

#[derive(Debug)]
pub struct BundleEmit {
    pub code: String,
    /// Sources of the import declarations remaining in `code`.
    pub imports: Vec<String>,
}

/// Bundles `entry` and everything it imports into one ES module, calling
/// `plugin` for every resolution, load and transform.
pub fn bundle(
    entry: impl AsRef<Path>,
    plugin: &dyn Plugin,
    options: BundleOptions,
) -> anyhow::Result<BundleEmit> {
    let entry = entry.as_ref();
    let entry = if entry.is_absolute() {
        normalize_path(entry)
    } else {
        normalize_path(&env::current_dir()?.join(entry))
    };
    debug!("Bundling {} with plugin '{}'", entry.display(), plugin.name());

    let globals = Globals::new();
    GLOBALS.set(&globals, || {
        let source_map = Lrc::new(SourceMap::default());

        let loader = PluginLoader {
            plugin,
            source_map: source_map.clone(),
        };
        let resolver = PluginResolver {
            plugin,
            external: &options.external,
        };

        let config = BundlerConfig {
            module: ModuleType::Es,
            external_modules: options
                .external
                .iter()
                .map(|name| name.as_str().into())
                .collect(),
            ..Default::default()
        };

        let mut bundler = Bundler::new(
            &globals,
            source_map.clone(),
            loader,
            resolver,
            config,
            Box::new(ImportMetaHook),
        );

        let mut entries = HashMap::new();
        entries.insert("bundle".to_string(), FileName::Real(entry.clone()));

        let bundles = bundler
            .bundle(entries)
            .with_context(|| format!("Unable to bundle {}", entry.display()))?;
        let Some(output) = bundles.first() else {
            bail!("Bundler produced no output");
        };

        let mut buf = Vec::new();
        {
            let cfg = CodegenConfig::default()
                .with_minify(options.minify)
                .with_target(EsVersion::EsNext)
                .with_omit_last_semi(false);

            let mut emitter = Emitter {
                cfg,
                cm: source_map.clone(),
                comments: None,
                wr: Box::new(JsWriter::new(source_map.clone(), "\n", &mut buf, None)),
            };
            emitter
                .emit_module(&output.module)
                .context("Unable to emit during bundling")?;
        }

        Ok(BundleEmit {
            code: String::from_utf8(buf).context("Emitted code is an invalid string")?,
            imports: remaining_imports(&output.module),
        })
    })
}

struct PluginLoader<'a> {
    plugin: &'a dyn Plugin,
    source_map: Lrc<SourceMap>,
}

impl Load for PluginLoader<'_> {
    fn load(&self, file: &FileName) -> anyhow::Result<ModuleData> {
        let (id, source) = match file {
            FileName::Custom(id) => {
                let source = self
                    .plugin
                    .load(id)
                    .ok_or_else(|| anyhow!("No plugin provides virtual module {id:?}"))?;
                (id.clone(), source.to_string())
            }
            FileName::Real(path) => {
                let id = path.to_string_lossy().into_owned();
                let source = match self.plugin.load(&id) {
                    Some(source) => source.to_string(),
                    None => fs::read_to_string(path)
                        .with_context(|| format!("Unable to read {}", path.display()))?,
                };
                (id, source)
            }
            other => bail!("Unsupported file name: {other:?}"),
        };
        let source = strip_bom(&source);

        let code = match self.plugin.transform(source, &id)? {
            Some(output) => output.code,
            None if id.ends_with(".json") => transform_json_source(source),
            None => source.to_string(),
        };
        trace!("Loaded {id} ({} bytes)", code.len());

        let source_file = self.source_map.new_source_file(file.clone().into(), code);
        let comments = SingleThreadedComments::default();
        let lexer = Lexer::new(
            Syntax::Es(EsSyntax::default()),
            EsVersion::EsNext,
            StringInput::from(&*source_file),
            Some(&comments),
        );
        let mut parser = Parser::new_from(lexer);
        let module = parser
            .parse_module()
            .map_err(|err| anyhow!("Unable to parse {id}: {err:?}"))?;

        Ok(ModuleData {
            fm: source_file,
            module,
            helpers: Default::default(),
        })
    }
}

struct PluginResolver<'a> {
    plugin: &'a dyn Plugin,
    external: &'a [String],
}

impl Resolve for PluginResolver<'_> {
    fn resolve(&self, base: &FileName, module_specifier: &str) -> anyhow::Result<Resolution> {
        if self.external.iter().any(|name| name == module_specifier) {
            return Ok(Resolution {
                filename: FileName::Custom(module_specifier.to_string()),
                slug: None,
            });
        }

        let importer = match base {
            FileName::Real(path) => Some(path.to_string_lossy().into_owned()),
            FileName::Custom(id) => Some(id.clone()),
            _ => None,
        };

        let filename = match self.plugin.resolve_id(module_specifier, importer.as_deref()) {
            Some(ResolvedId::File(path)) => FileName::Real(path),
            Some(ResolvedId::Virtual(id)) => FileName::Custom(id),
            None => FileName::Real(fallback_resolve(base, module_specifier)?),
        };

        Ok(Resolution {
            filename,
            slug: None,
        })
    }
}

/// Resolves a relative import of plain JavaScript next to the importer.
fn fallback_resolve(base: &FileName, specifier: &str) -> anyhow::Result<PathBuf> {
    let FileName::Real(importer) = base else {
        bail!("Could not resolve '{specifier}' from {base}");
    };
    if !(specifier.starts_with("./") || specifier.starts_with("../")) {
        bail!(
            "Could not resolve '{specifier}' from {}; bare imports must be listed as external",
            importer.display()
        );
    }

    let dir = importer.parent().unwrap_or_else(|| Path::new("/"));
    let candidate = normalize_path(&dir.join(specifier));
    FALLBACK_EXTENSIONS
        .iter()
        .map(|ext| PathBuf::from(format!("{}{ext}", candidate.display())))
        .find(|path| path.is_file())
        .ok_or_else(|| anyhow!("Could not resolve '{specifier}' from {}", importer.display()))
}

fn remaining_imports(module: &Module) -> Vec<String> {
    let imports: BTreeSet<String> = module
        .body
        .iter()
        .filter_map(|item| match item {
            ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => Some(&*import.src),
            ModuleItem::ModuleDecl(ModuleDecl::ExportAll(export)) => Some(&*export.src),
            ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(export)) => export.src.as_deref(),
            _ => None,
        })
        .map(|src| src.value.to_string_lossy().into_owned())
        .collect();
    imports.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_resolves_relative_javascript() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main.ts"), "").unwrap();
        fs::write(dir.path().join("vendor.mjs"), "").unwrap();
        let base = FileName::Real(dir.path().join("main.ts"));

        assert_eq!(
            fallback_resolve(&base, "./vendor").unwrap(),
            dir.path().join("vendor.mjs")
        );
        assert_eq!(
            fallback_resolve(&base, "./vendor.mjs").unwrap(),
            dir.path().join("vendor.mjs")
        );
        assert!(fallback_resolve(&base, "./missing").is_err());
        assert!(fallback_resolve(&base, "react").is_err());
    }
}
