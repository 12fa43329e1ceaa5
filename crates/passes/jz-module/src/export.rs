//! `@export` processing

use crate::members::{Export, ModuleMembers};
use jz_ast::{ExportAtRule, ExportSpecifiers};
use jz_scope::{ScopeId, ScopeTree};
use jz_span::FileSpan;
use std::path::Path;
use thiserror::Error;

/// Errors raised while populating an export registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    /// Re-exported name missing from the dependency
    #[error("\"{request}\" does not export {name}")]
    MissingExport {
        /// Request string of the dependency
        request: String,
        /// Missing name
        name: String,
        /// Location of the specifier
        span: FileSpan,
    },

    /// Exported name not declared in the module
    #[error("There is no local {name} declared.")]
    MissingLocal {
        /// Missing name
        name: String,
        /// Location of the specifier
        span: FileSpan,
    },

    /// Name exported twice
    #[error("Duplicate export {name}")]
    DuplicateExport {
        /// Exported name
        name: String,
        /// Location of the second export
        span: FileSpan,
    },
}

impl ExportError {
    /// Location of the offending specifier
    #[must_use]
    pub fn span(&self) -> FileSpan {
        match self {
            Self::MissingExport { span, .. }
            | Self::MissingLocal { span, .. }
            | Self::DuplicateExport { span, .. } => *span,
        }
    }
}

/// Dependency an `@export ... from` reads from
#[derive(Debug, Clone, Copy)]
pub struct ExportSource<'a> {
    /// Request string as written
    pub request: &'a str,
    /// Resolved module identifier
    pub path: &'a Path,
    /// The dependency's finalized registry
    pub members: &'a ModuleMembers,
}

/// Adds the names an `@export` publishes to `exports`
///
/// Without `from`, names are looked up in `scope` of `scopes`. With `from`, the
/// caller passes the dependency's registry as `source` and entries are tagged
/// with its path.
///
/// # Errors
///
/// Returns an [`ExportError`] for names missing locally or in the dependency and
/// for names exported twice.
pub fn process_export(
    export: &ExportAtRule,
    span: FileSpan,
    scopes: &ScopeTree,
    scope: ScopeId,
    exports: &mut ModuleMembers,
    source: Option<ExportSource<'_>>,
) -> Result<(), ExportError> {
    match (&export.specifiers, source) {
        (ExportSpecifiers::All, Some(source)) => {
            let mut tagged = ModuleMembers::new();
            for (name, entry) in source.members.iter() {
                tagged.add(name, entry.clone().with_source(source.path));
            }
            match exports.add_all(&tagged).into_iter().next() {
                Some(name) => Err(ExportError::DuplicateExport { name, span }),
                None => Ok(()),
            }
        }
        (ExportSpecifiers::All, None) => {
            for (name, member) in scopes.frame(scope).members() {
                if !exports.add(name, Export::from(member.clone())) {
                    return Err(ExportError::DuplicateExport {
                        name: name.to_string(),
                        span,
                    });
                }
            }
            Ok(())
        }
        (ExportSpecifiers::Named(specifiers), source) => {
            for specifier in specifiers {
                let entry = match source {
                    Some(source) => source
                        .members
                        .get(&specifier.local)
                        .map(|entry| entry.clone().with_source(source.path))
                        .ok_or_else(|| ExportError::MissingExport {
                            request: source.request.to_string(),
                            name: specifier.local.clone(),
                            span: specifier.span,
                        })?,
                    None => scopes
                        .get(scope, &specifier.local)
                        .map(|member| Export::from(member.clone()))
                        .or_else(|| exports.get(&specifier.local).cloned())
                        .ok_or_else(|| ExportError::MissingLocal {
                            name: specifier.local.clone(),
                            span: specifier.span,
                        })?,
                };

                let name = specifier.exported_name();
                if !exports.add(name, entry) {
                    return Err(ExportError::DuplicateExport {
                        name: name.to_string(),
                        span: specifier.span,
                    });
                }
                tracing::debug!(export = name, local = %specifier.local, "exported");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jz_ast::{ExportSpecifier, Value};
    use jz_scope::Member;

    fn specifier(local: &str, exported: Option<&str>) -> ExportSpecifier {
        ExportSpecifier {
            local: local.to_string(),
            exported: exported.map(str::to_string),
            span: FileSpan::default(),
        }
    }

    fn named(specifiers: Vec<ExportSpecifier>, request: Option<&str>) -> ExportAtRule {
        ExportAtRule {
            request: request.map(str::to_string),
            specifiers: ExportSpecifiers::Named(specifiers),
        }
    }

    fn other() -> ModuleMembers {
        let mut members = ModuleMembers::new();
        members.add("$bar", Export::from(Member::variable(Value::number(1.0, "px"))));
        members.add("$foo", Export::from(Member::variable(Value::Color("red".to_string()))));
        members
    }

    fn variable(exports: &ModuleMembers, name: &str) -> Value {
        match exports.get(name) {
            Some(Export::Variable(variable)) => variable.value.clone(),
            other => panic!("expected variable {name}, got {other:?}"),
        }
    }

    #[test]
    fn test_reexport_named_from_dependency() {
        let mut scopes = ScopeTree::new();
        let scope = scopes.create_root();
        let dependency = other();
        let source = ExportSource {
            request: "./other",
            path: Path::new("/other"),
            members: &dependency,
        };
        let mut exports = ModuleMembers::new();

        let export = named(vec![specifier("$bar", None), specifier("$foo", None)], Some("./other"));
        process_export(&export, FileSpan::default(), &scopes, scope, &mut exports, Some(source))
            .unwrap();

        assert_eq!(exports.len(), 2);
        assert_eq!(exports.names().collect::<Vec<_>>(), vec!["$bar", "$foo"]);
        assert_eq!(variable(&exports, "$bar"), Value::number(1.0, "px"));
        assert_eq!(variable(&exports, "$foo"), Value::Color("red".to_string()));
        assert_eq!(exports.get("$foo").and_then(Export::source), Some(Path::new("/other")));
    }

    #[test]
    fn test_reexport_all() {
        let mut scopes = ScopeTree::new();
        let scope = scopes.create_root();
        let dependency = other();
        let export = ExportAtRule {
            request: Some("./other".to_string()),
            specifiers: ExportSpecifiers::All,
        };
        let mut exports = ModuleMembers::new();

        process_export(
            &export,
            FileSpan::default(),
            &scopes,
            scope,
            &mut exports,
            Some(ExportSource {
                request: "./other",
                path: Path::new("/other"),
                members: &dependency,
            }),
        )
        .unwrap();

        assert_eq!(exports.names().collect::<Vec<_>>(), vec!["$bar", "$foo"]);
    }

    #[test]
    fn test_export_local_with_alias() {
        let mut scopes = ScopeTree::new();
        let scope = scopes.create_root();
        scopes.set(scope, "$bar", Member::variable(Value::number(1.0, "px")));
        scopes.set(scope, "$foo", Member::variable(Value::Color("red".to_string())));
        let mut exports = ModuleMembers::new();

        let export = named(vec![specifier("$bar", Some("$baz")), specifier("$foo", None)], None);
        process_export(&export, FileSpan::default(), &scopes, scope, &mut exports, None).unwrap();

        assert_eq!(exports.names().collect::<Vec<_>>(), vec!["$baz", "$foo"]);
        assert!(!exports.contains("$bar"));
        assert_eq!(variable(&exports, "$baz"), Value::number(1.0, "px"));
    }

    #[test]
    fn test_export_errors() {
        let mut scopes = ScopeTree::new();
        let scope = scopes.create_root();
        let dependency = other();
        let source = ExportSource {
            request: "./other",
            path: Path::new("/other"),
            members: &dependency,
        };

        let missing = named(vec![specifier("$baz", None), specifier("$foo", None)], Some("./other"));
        let error = process_export(
            &missing,
            FileSpan::default(),
            &scopes,
            scope,
            &mut ModuleMembers::new(),
            Some(source),
        )
        .unwrap_err();
        assert_eq!(error.to_string(), "\"./other\" does not export $baz");

        let local = named(vec![specifier("$baz", None)], None);
        let error = process_export(
            &local,
            FileSpan::default(),
            &scopes,
            scope,
            &mut ModuleMembers::new(),
            None,
        )
        .unwrap_err();
        assert_eq!(error.to_string(), "There is no local $baz declared.");

        scopes.set(scope, "$a", Member::variable(Value::Null));
        let twice = named(vec![specifier("$a", None), specifier("$a", None)], None);
        let error = process_export(
            &twice,
            FileSpan::default(),
            &scopes,
            scope,
            &mut ModuleMembers::new(),
            None,
        )
        .unwrap_err();
        assert_eq!(error.to_string(), "Duplicate export $a");
    }
}
