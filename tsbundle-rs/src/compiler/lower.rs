//! Down-levelling of stripped modules to the configured `target`.
//!
//! The compat passes reference their runtime helpers (`_inherits`,
//! `_async_to_generator`, ...) either inline, as globals, or as named imports
//! of `tslib`. In the import form every file shares the one helper module the
//! plugin serves, which also exports the definitions built by
//! [`runtime_helpers_source`].

use deno_ast::swc::ast::{
    Decl, ExportNamedSpecifier, ExportSpecifier, Ident, ImportSpecifier, Module, ModuleDecl,
    ModuleExportName, ModuleItem, NamedExport, Pat, Program, Stmt,
};
use deno_ast::swc::common::comments::SingleThreadedComments;
use deno_ast::swc::common::errors::{DiagnosticBuilder, Emitter, Handler, HANDLER};
use deno_ast::swc::common::sync::{Lock, Lrc};
use deno_ast::swc::common::{Globals, Mark, DUMMY_SP, GLOBALS};
use deno_ast::swc::transforms::compat;
use deno_ast::swc::transforms::helpers::{inject_helpers, Helpers, HELPERS};
use deno_ast::swc::transforms::{fixer, hygiene};
use deno_ast::{EmitError, EmitOptions, Marks, SourceMap, SourceMapOption};

use crate::helpers::HELPERS_ID;
use crate::options::compiler_options::{CompilerOptions, ScriptTarget};

/// Module prefix the helper injector uses for external helpers.
const EXTERNAL_HELPERS_PREFIX: &str = "@swc/helpers/_/";

/// How lowered code gets at its runtime helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HelperEmit {
    /// `import { _inherits } from "tslib"` (`importHelpers`).
    Import,
    /// Bare references to helpers defined elsewhere (`noEmitHelpers`).
    Global,
    /// Definitions copied into every file that needs them.
    Inline,
}

impl HelperEmit {
    pub(crate) fn for_options(options: &CompilerOptions) -> Self {
        if options.import_helpers {
            HelperEmit::Import
        } else if options.no_emit_helpers {
            HelperEmit::Global
        } else {
            HelperEmit::Inline
        }
    }
}

/// Lowers a program whose types have already been stripped to
/// `options.target`. Returns the messages of any errors the passes report.
pub(crate) fn lower(
    program: Program,
    options: &CompilerOptions,
    marks: &Marks,
    comments: &SingleThreadedComments,
) -> Result<Program, Vec<String>> {
    let target = options.target;
    let unresolved = marks.unresolved;
    let emit = HelperEmit::for_options(options);

    let errors = Lrc::new(Lock::new(Vec::new()));
    let handler = Handler::with_emitter(
        true,
        false,
        Box::new(ErrorCollector {
            messages: errors.clone(),
        }),
    );

    let passes = (
        (target < ScriptTarget::Es2022)
            .then(|| compat::es2022(compat::es2022::Config::default(), unresolved)),
        (target < ScriptTarget::Es2021).then(compat::es2021),
        (target < ScriptTarget::Es2020)
            .then(|| compat::es2020(compat::es2020::Config::default(), unresolved)),
        (target < ScriptTarget::Es2019).then(compat::es2019),
        (target < ScriptTarget::Es2018).then(|| compat::es2018(compat::es2018::Config::default())),
        (target < ScriptTarget::Es2017)
            .then(|| compat::es2017(compat::es2017::Config::default(), unresolved)),
        (target < ScriptTarget::Es2016).then(compat::es2016),
        (target < ScriptTarget::Es2015).then(|| {
            compat::es2015(
                unresolved,
                Some(comments.clone()),
                compat::es2015::Config::default(),
            )
        }),
        (target < ScriptTarget::Es5).then(|| compat::es3(true)),
        inject_helpers(marks.top_level),
    );

    let mut program = HANDLER.set(&handler, || {
        HELPERS.set(&Helpers::new(emit != HelperEmit::Inline), || {
            program.apply(passes)
        })
    });

    let errors = std::mem::take(&mut *errors.lock());
    if !errors.is_empty() {
        return Err(errors);
    }

    if let Program::Module(module) = &mut program {
        rewrite_helper_imports(module, emit);
    }
    Ok(program.apply((hygiene(), fixer(Some(comments)))))
}

/// Points external helper imports at `tslib`, or drops them when helpers are
/// globals.
fn rewrite_helper_imports(module: &mut Module, emit: HelperEmit) {
    if emit == HelperEmit::Inline {
        return;
    }
    module.body.retain_mut(|item| {
        let ModuleItem::ModuleDecl(ModuleDecl::Import(import)) = item else {
            return true;
        };
        let source = import.src.value.to_string_lossy();
        let Some(helper) = source.strip_prefix(EXTERNAL_HELPERS_PREFIX) else {
            return true;
        };
        if emit == HelperEmit::Global {
            return false;
        }

        let helper = Ident::from(deno_ast::swc::atoms::Atom::from(helper));
        for specifier in &mut import.specifiers {
            if let ImportSpecifier::Named(named) = specifier {
                named.imported = Some(ModuleExportName::Ident(helper.clone()));
            }
        }
        import.src = Box::new(HELPERS_ID.into());
        true
    });
}

/// Builds an ES module defining every runtime helper the lowering passes can
/// import, each exported under its own name.
pub(crate) fn runtime_helpers_source() -> Result<String, EmitError> {
    let globals = Globals::new();
    let module = GLOBALS.set(&globals, || {
        let helpers = Helpers::new(false);
        let mut program = Program::Module(Module {
            span: DUMMY_SP,
            body: Vec::new(),
            shebang: None,
        });
        HELPERS.set(&helpers, || {
            enable_runtime_helpers(&helpers);
            program.mutate(inject_helpers(Mark::new()));
        });
        program
    });
    let Program::Module(mut module) = module else {
        return Ok(String::new());
    };

    let specifiers = module
        .body
        .iter()
        .flat_map(declared_names)
        .map(|orig| {
            ExportSpecifier::Named(ExportNamedSpecifier {
                span: DUMMY_SP,
                orig: ModuleExportName::Ident(orig),
                exported: None,
                is_type_only: false,
            })
        })
        .collect();
    module
        .body
        .push(ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(NamedExport {
            span: DUMMY_SP,
            specifiers,
            src: None,
            type_only: false,
            with: None,
        })));

    let program = Program::Module(module);
    let emitted = deno_ast::emit(
        (&program).into(),
        &SingleThreadedComments::default(),
        &SourceMap::default(),
        &EmitOptions {
            source_map: SourceMapOption::None,
            ..Default::default()
        },
    )?;
    Ok(emitted.text)
}

fn declared_names(item: &ModuleItem) -> Vec<Ident> {
    match item {
        ModuleItem::Stmt(Stmt::Decl(Decl::Fn(function))) => vec![function.ident.clone()],
        ModuleItem::Stmt(Stmt::Decl(Decl::Var(var))) => var
            .decls
            .iter()
            .filter_map(|decl| match &decl.name {
                Pat::Ident(binding) => Some(binding.id.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

macro_rules! runtime_helpers {
    ($($name:ident),* $(,)?) => {
        fn enable_runtime_helpers(helpers: &Helpers) {
            $(helpers.$name();)*
        }
    };
}

// Every ES5-compatible helper the injector knows about.
runtime_helpers![
    apply_decorated_descriptor,
    array_like_to_array,
    array_with_holes,
    array_without_holes,
    assert_this_initialized,
    async_generator,
    async_generator_delegate,
    async_iterator,
    async_to_generator,
    await_async_generator,
    await_value,
    call_super,
    check_private_redeclaration,
    class_apply_descriptor_destructure,
    class_apply_descriptor_get,
    class_apply_descriptor_set,
    class_apply_descriptor_update,
    class_call_check,
    class_check_private_static_access,
    class_check_private_static_field_descriptor,
    class_extract_field_descriptor,
    class_name_tdz_error,
    class_private_field_destructure,
    class_private_field_get,
    class_private_field_init,
    class_private_field_loose_base,
    class_private_field_loose_key,
    class_private_field_set,
    class_private_field_update,
    class_private_method_get,
    class_private_method_init,
    class_private_method_set,
    class_static_private_field_destructure,
    class_static_private_field_spec_get,
    class_static_private_field_spec_set,
    class_static_private_field_update,
    class_static_private_method_get,
    construct,
    create_class,
    create_for_of_iterator_helper_loose,
    create_super,
    decorate,
    defaults,
    define_enumerable_properties,
    define_property,
    dispose,
    export_star,
    extends,
    get,
    get_prototype_of,
    identity,
    inherits,
    inherits_loose,
    initializer_define_property,
    initializer_warning_helper,
    instanceof,
    interop_require_default,
    interop_require_wildcard,
    is_native_function,
    is_native_reflect_construct,
    iterable_to_array,
    iterable_to_array_limit,
    iterable_to_array_limit_loose,
    jsx,
    new_arrow_check,
    non_iterable_rest,
    non_iterable_spread,
    object_destructuring_empty,
    object_spread,
    object_spread_props,
    object_without_properties,
    object_without_properties_loose,
    overload_yield,
    possible_constructor_return,
    read_only_error,
    set,
    set_prototype_of,
    skip_first_generator_next,
    sliced_to_array,
    sliced_to_array_loose,
    super_prop_base,
    tagged_template_literal,
    tagged_template_literal_loose,
    throw,
    to_array,
    to_consumable_array,
    to_primitive,
    to_property_key,
    ts_add_disposable_resource,
    ts_decorate,
    ts_dispose_resources,
    ts_generator,
    ts_metadata,
    ts_param,
    ts_rewrite_relative_import_extension,
    ts_values,
    type_of,
    unsupported_iterable_to_array,
    update,
    using,
    using_ctx,
    wrap_async_generator,
    wrap_native_super,
    write_only_error,
];

struct ErrorCollector {
    messages: Lrc<Lock<Vec<String>>>,
}

impl Emitter for ErrorCollector {
    fn emit(&mut self, db: &mut DiagnosticBuilder<'_>) {
        if db.is_error() {
            self.messages.lock().push(db.message());
        }
    }
}
