//! Export registry of a module

use indexmap::IndexMap;
use jz_ast::{ClassSelector, Value};
use jz_scope::{Function, Member, Mixin, Variable};
use std::iter;
use std::path::{Path, PathBuf};

/// A class exported by a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassReference {
    /// Class selector as written in the module
    pub selector: ClassSelector,
    /// Generated class name
    pub identifier: String,
    /// Generated names of every class this one composes, transitively
    pub composes: Vec<String>,
    /// Module the class was re-exported from
    pub source: Option<PathBuf>,
}

impl ClassReference {
    /// Class without composition
    #[must_use]
    pub fn new(selector: ClassSelector, identifier: impl Into<String>) -> Self {
        Self {
            selector,
            identifier: identifier.into(),
            composes: Vec::new(),
            source: None,
        }
    }

    /// Appends `other` and everything it composes to this chain
    pub fn compose(&mut self, other: &Self) {
        for identifier in iter::once(&other.identifier).chain(&other.composes) {
            if *identifier != self.identifier && !self.composes.contains(identifier) {
                self.composes.push(identifier.clone());
            }
        }
    }

    /// Own identifier followed by the composed ones, space separated
    #[must_use]
    pub fn class_list(&self) -> String {
        iter::once(self.identifier.as_str())
            .chain(self.composes.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Entry of a [`ModuleMembers`] registry
#[derive(Debug, Clone)]
pub enum Export {
    /// Variable
    Variable(Variable),
    /// Class reference
    Class(ClassReference),
    /// Function
    Function(Function),
    /// Mixin
    Mixin(Mixin),
}

impl Export {
    /// Classification used in messages and logs
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Variable(_) => "variable",
            Self::Class(_) => "class",
            Self::Function(_) => "function",
            Self::Mixin(_) => "mixin",
        }
    }

    /// Module the entry was re-exported from
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        match self {
            Self::Variable(Variable { source, .. })
            | Self::Class(ClassReference { source, .. })
            | Self::Function(Function { source, .. })
            | Self::Mixin(Mixin { source, .. }) => source.as_deref(),
        }
    }

    /// Tags the entry with `module` unless it already names its origin
    #[must_use]
    pub fn with_source(self, module: &Path) -> Self {
        match self {
            Self::Class(mut class) => {
                if class.source.is_none() {
                    class.source = Some(module.to_path_buf());
                }
                Self::Class(class)
            }
            other => Self::from(other.into_member().with_source(module)),
        }
    }

    /// Scope member an importer binds; classes become their class list
    #[must_use]
    pub fn into_member(self) -> Member {
        match self {
            Self::Variable(variable) => Member::Variable(variable),
            Self::Function(function) => Member::Function(function),
            Self::Mixin(mixin) => Member::Mixin(mixin),
            Self::Class(class) => Member::Variable(Variable {
                value: Value::unquoted(class.class_list()),
                source: class.source,
            }),
        }
    }
}

impl From<Member> for Export {
    fn from(member: Member) -> Self {
        match member {
            Member::Variable(variable) => Self::Variable(variable),
            Member::Function(function) => Self::Function(function),
            Member::Mixin(mixin) => Self::Mixin(mixin),
        }
    }
}

/// Insertion ordered mapping from exported name to entry
#[derive(Debug, Clone, Default)]
pub struct ModuleMembers {
    entries: IndexMap<String, Export>,
}

impl ModuleMembers {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry exported as `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Export> {
        self.entries.get(name)
    }

    /// Class exported as `name`
    #[must_use]
    pub fn class(&self, name: &str) -> Option<&ClassReference> {
        match self.entries.get(name)? {
            Export::Class(class) => Some(class),
            _ => None,
        }
    }

    /// Mutable class exported as `name`
    pub fn class_mut(&mut self, name: &str) -> Option<&mut ClassReference> {
        match self.entries.get_mut(name)? {
            Export::Class(class) => Some(class),
            _ => None,
        }
    }

    /// Whether `name` is exported
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Adds an entry; returns `false` and keeps the existing one when `name` is taken
    pub fn add(&mut self, name: impl Into<String>, export: Export) -> bool {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return false;
        }
        tracing::trace!(entry = %name, kind = export.kind_name(), "export");
        self.entries.insert(name, export);
        true
    }

    /// Copies every entry of `other`; names already present are skipped and returned
    pub fn add_all(&mut self, other: &Self) -> Vec<String> {
        other
            .entries
            .iter()
            .filter_map(|(name, export)| {
                (!self.add(name.clone(), export.clone())).then(|| name.clone())
            })
            .collect()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Export)> {
        self.entries.iter().map(|(name, export)| (name.as_str(), export))
    }

    /// Exported names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is exported
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jz_span::FileSpan;

    fn class(name: &str, identifier: &str) -> ClassReference {
        ClassReference::new(ClassSelector::new(name, FileSpan::default()), identifier)
    }

    #[test]
    fn test_add_all_is_shallow_copy() {
        let mut other = ModuleMembers::new();
        other.add("$bar", Export::from(Member::variable(Value::number(1.0, "px"))));
        other.add("$foo", Export::from(Member::variable(Value::Color("red".to_string()))));

        let mut members = ModuleMembers::new();
        members.add("$foo", Export::from(Member::variable(Value::Null)));
        let skipped = members.add_all(&other);

        assert_eq!(skipped, vec!["$foo".to_string()]);
        assert_eq!(members.names().collect::<Vec<_>>(), vec!["$foo", "$bar"]);
        assert_eq!(other.len(), 2);
    }

    #[test]
    fn test_compose_is_transitive() {
        let base = class("base", "base_a");
        let mut button = class("button", "button_a");
        button.compose(&base);

        let mut primary = class("primary", "primary_b");
        primary.compose(&button);
        primary.compose(&base);

        assert_eq!(primary.composes, vec!["button_a", "base_a"]);
        assert_eq!(primary.class_list(), "primary_b button_a base_a");
    }

    #[test]
    fn test_with_source_keeps_origin() {
        let export = Export::from(Member::variable(Value::Null))
            .with_source(Path::new("/a.mcss"))
            .with_source(Path::new("/b.mcss"));
        assert_eq!(export.source(), Some(Path::new("/a.mcss")));

        let imported = Export::Class(class("btn", "btn_x")).into_member();
        assert_eq!(imported.kind(), jz_scope::MemberKind::Variable);
    }
}
