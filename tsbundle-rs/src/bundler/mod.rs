//! A minimal bundler host for a [`crate::Plugin`].
//!
//! The swc bundler (re-exported by `deno_ast`) builds the module graph and
//! emits one ES module. Every resolution, load and transform is routed
//! through the plugin first:
//!
//! - `emit`: the `Load`/`Resolve` implementations and code generation
//! - `import_meta`: static `import.meta` values for bundled modules

mod emit;
mod import_meta;

pub use emit::{bundle, BundleEmit, BundleOptions};
