//! TypeScript's "node" module resolution.
//!
//! Algorithm, for an import of `name` from `containing_file`:
//! 1. `paths` mappings whose pattern matches `name` are tried first
//! 2. Relative and absolute names resolve against the importing directory
//! 3. Bare names try `baseUrl`, then each ancestor's `node_modules`
//!    (the package itself, then its `@types` counterpart)
//!
//! A candidate path is tried as a file (adding `.ts`, `.tsx`, `.d.ts`, and
//! `.js`/`.jsx` when `allowJs` is set; `.js` in the name maps to `.ts`),
//! then as a directory (`package.json` `typings`/`types`/`main`, then
//! `index`). All file-system access goes through the host.

use std::path::{Component, Path, PathBuf};

use super::package_json::PackageJson;
use super::ResolvedModule;
use crate::host::ModuleResolutionHost;
use crate::options::compiler_options::CompilerOptions;

const TS_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".d.ts"];
const JS_EXTENSIONS: &[&str] = &[".js", ".jsx"];

struct Resolver<'a> {
    options: &'a CompilerOptions,
    host: &'a dyn ModuleResolutionHost,
    extensions: Vec<&'static str>,
}

/// Resolves `module_name` as TypeScript does with `moduleResolution: node`.
pub fn node_module_name_resolver(
    module_name: &str,
    containing_file: &str,
    options: &CompilerOptions,
    host: &dyn ModuleResolutionHost,
) -> Option<ResolvedModule> {
    let mut extensions = TS_EXTENSIONS.to_vec();
    if options.allow_js {
        extensions.extend_from_slice(JS_EXTENSIONS);
    }
    let resolver = Resolver {
        options,
        host,
        extensions,
    };

    let containing_dir = Path::new(containing_file)
        .parent()
        .unwrap_or_else(|| Path::new(""));

    if let Some(found) = resolver.try_paths_mapping(module_name) {
        return Some(local(found));
    }

    if is_relative_or_absolute(module_name) {
        let candidate = normalize_path(&containing_dir.join(module_name));
        return resolver.load_file_or_directory(&candidate).map(local);
    }

    if let Some(base_url) = &options.base_url {
        let candidate = normalize_path(&base_url.join(module_name));
        if let Some(found) = resolver.load_file_or_directory(&candidate) {
            return Some(local(found));
        }
    }

    resolver
        .load_from_node_modules(module_name, containing_dir)
        .map(|found| ResolvedModule {
            resolved_file_name: found,
            is_external_library_import: true,
        })
}

fn local(path: PathBuf) -> ResolvedModule {
    ResolvedModule {
        resolved_file_name: path,
        is_external_library_import: false,
    }
}

impl Resolver<'_> {
    fn try_paths_mapping(&self, module_name: &str) -> Option<PathBuf> {
        if self.options.paths.is_empty() {
            return None;
        }
        let base = self
            .options
            .base_url
            .as_deref()
            .or(self.options.paths_base_path.as_deref())?;

        // The matching pattern with the longest prefix wins.
        let (substitutions, star) = self
            .options
            .paths
            .iter()
            .filter_map(|(pattern, subs)| {
                match_pattern(pattern, module_name).map(|star| (pattern, subs, star))
            })
            .max_by_key(|(pattern, _, _)| pattern.find('*').unwrap_or(pattern.len()))
            .map(|(_, subs, star)| (subs, star))?;

        substitutions.iter().find_map(|substitution| {
            let path = substitution.replacen('*', star, 1);
            let candidate = normalize_path(&base.join(path));
            if has_known_extension(&candidate) && self.host.file_exists(&candidate) {
                return Some(candidate);
            }
            self.load_file_or_directory(&candidate)
        })
    }

    fn load_file_or_directory(&self, candidate: &Path) -> Option<PathBuf> {
        self.load_module_from_file(candidate)
            .or_else(|| self.load_from_directory(candidate))
    }

    fn load_module_from_file(&self, candidate: &Path) -> Option<PathBuf> {
        let text = candidate.to_string_lossy();

        // `import "./foo.js"` may refer to `foo.ts`.
        for (js_ext, ts_exts) in [
            (".js", TS_EXTENSIONS),
            (".jsx", &[".tsx", ".d.ts"][..]),
            (".mjs", &[".mts", ".d.mts"][..]),
            (".cjs", &[".cts", ".d.cts"][..]),
        ] {
            if let Some(stem) = text.strip_suffix(js_ext) {
                if let Some(found) = self.first_existing(stem, ts_exts) {
                    return Some(found);
                }
                if self.options.allow_js && self.host.file_exists(candidate) {
                    return Some(candidate.to_path_buf());
                }
            }
        }

        if self.options.resolve_json_module
            && text.ends_with(".json")
            && self.host.file_exists(candidate)
        {
            return Some(candidate.to_path_buf());
        }

        self.first_existing(&text, &self.extensions)
    }

    fn first_existing(&self, stem: &str, extensions: &[&str]) -> Option<PathBuf> {
        extensions
            .iter()
            .map(|ext| PathBuf::from(format!("{stem}{ext}")))
            .find(|path| self.host.file_exists(path))
    }

    fn load_from_directory(&self, candidate: &Path) -> Option<PathBuf> {
        if !self.host.directory_exists(candidate) {
            return None;
        }

        if let Some(pkg) = PackageJson::read(self.host, candidate) {
            let entries = [pkg.types_entry(), pkg.main_entry()];
            for entry in entries.into_iter().flatten() {
                let path = normalize_path(&candidate.join(entry));
                if is_typescript_file(&path) && self.host.file_exists(&path) {
                    return Some(path);
                }
                if let Some(found) = self.load_module_from_file(&path) {
                    return Some(found);
                }
                if self.host.directory_exists(&path) {
                    if let Some(found) = self.load_module_from_file(&path.join("index")) {
                        return Some(found);
                    }
                }
            }
        }

        self.load_module_from_file(&candidate.join("index"))
    }

    fn load_from_node_modules(&self, module_name: &str, start: &Path) -> Option<PathBuf> {
        let types_name = mangle_scoped_package_name(module_name);
        for dir in start.ancestors() {
            if dir.file_name().is_some_and(|name| name == "node_modules") {
                continue;
            }
            let node_modules = dir.join("node_modules");
            if !self.host.directory_exists(&node_modules) {
                continue;
            }
            let package = normalize_path(&node_modules.join(module_name));
            if let Some(found) = self.load_file_or_directory(&package) {
                return Some(found);
            }
            let types = node_modules.join("@types").join(&types_name);
            if let Some(found) = self.load_file_or_directory(&types) {
                return Some(found);
            }
        }
        None
    }
}

/// Returns the text matched by `*`, or an empty string for an exact match.
fn match_pattern<'a>(pattern: &str, module_name: &'a str) -> Option<&'a str> {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            if module_name.len() >= prefix.len() + suffix.len()
                && module_name.starts_with(prefix)
                && module_name.ends_with(suffix)
            {
                Some(&module_name[prefix.len()..module_name.len() - suffix.len()])
            } else {
                None
            }
        }
        None => (pattern == module_name).then_some(""),
    }
}

/// `@scope/pkg` lives at `@types/scope__pkg`.
fn mangle_scoped_package_name(name: &str) -> String {
    match name.strip_prefix('@').and_then(|rest| rest.split_once('/')) {
        Some((scope, rest)) => format!("{scope}__{rest}"),
        None => name.to_string(),
    }
}

fn is_relative_or_absolute(name: &str) -> bool {
    name == "."
        || name == ".."
        || name.starts_with("./")
        || name.starts_with("../")
        || Path::new(name).is_absolute()
}

fn is_typescript_file(path: &Path) -> bool {
    let text = path.to_string_lossy();
    TS_EXTENSIONS.iter().any(|ext| text.ends_with(ext))
}

fn has_known_extension(path: &Path) -> bool {
    let text = path.to_string_lossy();
    TS_EXTENSIONS
        .iter()
        .chain(JS_EXTENSIONS)
        .any(|ext| text.ends_with(ext))
}

/// Lexically resolves `.` and `..` components.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
