//! Module descriptors

use crate::members::ModuleMembers;
use derive_more::Display;
use jz_scope::ScopeId;
use std::path::{Path, PathBuf};

/// Extension of preprocessed modules
pub const TOP_LEVEL_EXTENSION: &str = ".mcss";

/// Extensions resolvers try, most specific first
pub const EXTENSIONS: [&str; 3] = [".global.mcss", ".module.mcss", TOP_LEVEL_EXTENSION];

/// How a module is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ModuleType {
    /// `*.css`: plain CSS, only ICSS imports allowed
    #[display("plain-css")]
    PlainCss,
    /// `*.module.css`: CSS module with local classes
    #[display("css-module")]
    CssModule,
    /// Anything else: the full preprocessed language
    #[display("preprocess")]
    Preprocess,
}

impl ModuleType {
    /// Type implied by the file name
    #[must_use]
    pub fn infer(path: &Path) -> Self {
        let name = file_name(path);
        if name.ends_with(".module.css") {
            Self::CssModule
        } else if name.ends_with(".css") {
            Self::PlainCss
        } else {
            Self::Preprocess
        }
    }
}

/// Whether class names are kept or made local
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum IdentifierScope {
    /// Class names are emitted as written
    #[display("global")]
    Global,
    /// Class names are generated from a template
    #[display("local")]
    Local,
}

impl IdentifierScope {
    /// Scope implied by the file name
    #[must_use]
    pub fn infer(path: &Path) -> Self {
        if file_name(path).ends_with(".global.mcss") {
            Self::Global
        } else {
            Self::Local
        }
    }
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|name| name.to_str()).unwrap_or_default()
}

/// A module being compiled or already compiled
#[derive(Debug, Clone)]
pub struct Module {
    /// Module identifier
    pub path: PathBuf,
    /// Evaluation mode
    pub module_type: ModuleType,
    /// Class name handling
    pub identifier_scope: IdentifierScope,
    /// Top-level frame
    pub scope: ScopeId,
    /// Published surface
    pub exports: ModuleMembers,
}

impl Module {
    /// Module at `path` with types inferred from the file name
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, scope: ScopeId) -> Self {
        let path = path.into();
        Self {
            module_type: ModuleType::infer(&path),
            identifier_scope: IdentifierScope::infer(&path),
            path,
            scope,
            exports: ModuleMembers::new(),
        }
    }

    /// File stem without any of the known extensions
    #[must_use]
    pub fn stem(&self) -> &str {
        let name = file_name(&self.path);
        EXTENSIONS
            .iter()
            .chain(&[".module.css", ".css"])
            .find_map(|extension| name.strip_suffix(extension))
            .unwrap_or(name)
    }

    /// Generated name for the local class `name`
    ///
    /// Global modules keep the name; otherwise `[name]` and `[module]` in
    /// `template` are substituted.
    #[must_use]
    pub fn class_identifier(&self, name: &str, template: &str) -> String {
        match self.identifier_scope {
            IdentifierScope::Global => name.to_string(),
            IdentifierScope::Local => template
                .replace("[module]", self.stem())
                .replace("[name]", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jz_scope::ScopeTree;

    #[test]
    fn test_infer_module_type() {
        assert_eq!(ModuleType::infer(Path::new("/a/button.module.css")), ModuleType::CssModule);
        assert_eq!(ModuleType::infer(Path::new("/a/reset.css")), ModuleType::PlainCss);
        assert_eq!(ModuleType::infer(Path::new("/a/theme.mcss")), ModuleType::Preprocess);
        assert_eq!(ModuleType::PlainCss.to_string(), "plain-css");
    }

    #[test]
    fn test_infer_identifier_scope() {
        assert_eq!(IdentifierScope::infer(Path::new("/a/app.global.mcss")), IdentifierScope::Global);
        assert_eq!(IdentifierScope::infer(Path::new("/a/app.module.mcss")), IdentifierScope::Local);
    }

    #[test]
    fn test_class_identifier() {
        let mut tree = ScopeTree::new();
        let local = Module::new("/src/button.module.mcss", tree.create_root());
        assert_eq!(local.stem(), "button");
        assert_eq!(local.class_identifier("primary", "[module]__[name]"), "button__primary");

        let global = Module::new("/src/app.global.mcss", tree.create_root());
        assert_eq!(global.class_identifier("primary", "[module]__[name]"), "primary");
    }
}
