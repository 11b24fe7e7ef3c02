//! The `package.json` fields module resolution looks at.

use std::path::Path;

use serde::Deserialize;

use crate::host::ModuleResolutionHost;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageJson {
    pub types: Option<String>,
    pub typings: Option<String>,
    pub main: Option<String>,
    pub module: Option<String>,
}

impl PackageJson {
    /// Reads `<dir>/package.json` through the host. Missing or malformed
    /// files yield `None`.
    pub fn read(host: &dyn ModuleResolutionHost, dir: &Path) -> Option<Self> {
        let text = host.read_file(&dir.join("package.json"))?;
        serde_json::from_str(&text).ok()
    }

    /// The declaration entry point, `typings` taking precedence over `types`.
    pub fn types_entry(&self) -> Option<&str> {
        self.typings
            .as_deref()
            .or(self.types.as_deref())
            .filter(|entry| !entry.is_empty())
    }

    pub fn main_entry(&self) -> Option<&str> {
        self.main.as_deref().filter(|entry| !entry.is_empty())
    }
}
