use anyhow::anyhow;
use deno_ast::swc::ast::{Bool, Expr, KeyValueProp, Lit, PropName, Str};
use deno_ast::swc::bundler::{Hook, ModuleRecord};
use deno_ast::swc::common::{FileName, Span};
use deno_ast::ModuleSpecifier;

/// Replaces `import.meta` in bundled modules with the values it had before
/// bundling. Files on disk get their `file://` URL, `filename` and `dirname`;
/// virtual modules only get `url`. `main` is true for the entry module alone.
pub struct ImportMetaHook;

impl Hook for ImportMetaHook {
    fn get_import_meta_props(
        &self,
        span: Span,
        module_record: &ModuleRecord,
    ) -> anyhow::Result<Vec<KeyValueProp>> {
        let mut props = Vec::with_capacity(4);
        match &module_record.file_name {
            FileName::Real(path) => {
                let url = ModuleSpecifier::from_file_path(path)
                    .map_err(|()| anyhow!("{} is not an absolute path", path.display()))?;
                props.push(string_prop("url", url.as_str(), span));
                props.push(string_prop("filename", &path.to_string_lossy(), span));
                if let Some(dir) = path.parent() {
                    props.push(string_prop("dirname", &dir.to_string_lossy(), span));
                }
            }
            other => props.push(string_prop("url", &other.to_string(), span)),
        }
        props.push(KeyValueProp {
            key: PropName::Ident("main".into()),
            value: Box::new(Expr::Lit(Lit::Bool(Bool {
                span,
                value: module_record.is_entry,
            }))),
        });
        Ok(props)
    }
}

fn string_prop(key: &str, value: &str, span: Span) -> KeyValueProp {
    KeyValueProp {
        key: PropName::Ident(key.into()),
        value: Box::new(Expr::Lit(Lit::Str(Str {
            span,
            value: value.into(),
            raw: None,
        }))),
    }
}
