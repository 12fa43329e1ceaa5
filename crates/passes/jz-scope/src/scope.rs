//! Scope tree
//!
//! All frames of a compilation live in one arena. A frame is created per module,
//! nested rule, mixin or function invocation and control-flow body; its parent
//! link is an index, so closures can keep pointing at a frame after the walk of
//! the block that created it finished.
//!
//! Closing a frame hands its slot back for reuse unless the frame is pinned.
//! Declaring a function or mixin pins its closure frame and every ancestor.

use crate::error::ScopeError;
use crate::interop::Callable;
use crate::member::{Member, MemberKind, Mixin};
use indexmap::IndexMap;
use jz_ast::{Node, SelectorList, Value};
use jz_span::FileSpan;
use la_arena::{Arena, Idx};
use rustc_hash::FxBuildHasher;
use std::iter;
use std::rc::Rc;

/// Index of a frame in the [`ScopeTree`]
pub type ScopeId = Idx<ScopeFrame>;

/// Body passed to a mixin by `@include ... { ... }`
#[derive(Debug, Clone)]
pub struct ContentBlock {
    /// Nodes of the block
    pub nodes: Rc<Vec<Node>>,
    /// Frame of the `@include`, the block evaluates there
    pub scope: ScopeId,
}

/// One frame of the scope chain
#[derive(Debug, Clone, Default)]
pub struct ScopeFrame {
    /// Parent frame, `None` for module roots and closed frames
    parent: Option<ScopeId>,
    /// Members declared in this frame, in declaration order
    members: IndexMap<String, Member, FxBuildHasher>,
    /// Arguments of the innermost invocation
    arguments: Option<Value>,
    /// Content block of the innermost mixin invocation
    content_block: Option<ContentBlock>,
    /// Selector of the innermost style rule
    current_rule: Option<Rc<SelectorList>>,
    /// Kept alive after closing
    pinned: bool,
    /// Handed back to the free list
    released: bool,
}

impl ScopeFrame {
    /// Members declared in this frame
    pub fn members(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members.iter().map(|(name, member)| (name.as_str(), member))
    }

    /// Parent frame
    #[must_use]
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    /// Whether the frame outlives its construct
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }
}

/// Arena of scope frames shared by every module of a compilation
#[derive(Debug, Clone, Default)]
pub struct ScopeTree {
    frames: Arena<ScopeFrame>,
    /// Closed frames whose slots can be handed out again
    free: Vec<ScopeId>,
}

impl ScopeTree {
    /// Creates an empty tree
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frame without parent, used as a module's top-level scope
    ///
    /// Roots stay alive for the whole compilation.
    pub fn create_root(&mut self) -> ScopeId {
        self.alloc(ScopeFrame {
            pinned: true,
            ..ScopeFrame::default()
        })
    }

    /// Creates a frame whose parent is `parent`
    pub fn create_child(&mut self, parent: ScopeId) -> ScopeId {
        self.alloc(ScopeFrame {
            parent: Some(parent),
            ..ScopeFrame::default()
        })
    }

    fn alloc(&mut self, frame: ScopeFrame) -> ScopeId {
        match self.free.pop() {
            Some(id) => {
                self.frames[id] = frame;
                id
            }
            None => self.frames.alloc(frame),
        }
    }

    /// Number of slots ever allocated, reused slots counted once
    #[must_use]
    pub fn allocated(&self) -> usize {
        self.frames.len()
    }

    /// Keeps `scope` and its ancestors from being reused once closed
    pub fn pin(&mut self, scope: ScopeId) {
        let mut next = Some(scope);
        while let Some(id) = next {
            let frame = &mut self.frames[id];
            if frame.pinned {
                break;
            }
            frame.pinned = true;
            next = frame.parent;
        }
    }

    /// Frame data
    #[must_use]
    pub fn frame(&self, scope: ScopeId) -> &ScopeFrame {
        &self.frames[scope]
    }

    /// `scope` followed by each of its ancestors
    pub fn ancestors(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        iter::successors(Some(scope), |id| self.frames[*id].parent)
    }

    /// Binds `name` in `scope` only; returns `false` without touching the frame
    /// when the name is already declared there
    pub fn set(&mut self, scope: ScopeId, name: &str, member: Member) -> bool {
        if self.frames[scope].members.contains_key(name) {
            return false;
        }
        tracing::trace!(?scope, member = name, kind = %member.kind(), "declare");
        if let Some(closure) = member.closure() {
            self.pin(closure);
        }
        self.frames[scope].members.insert(name.to_string(), member);
        true
    }

    /// [`ScopeTree::set`] that reports a duplicate as an error
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::DuplicateDeclaration`] when `name` already exists in
    /// `scope`.
    pub fn declare(
        &mut self,
        scope: ScopeId,
        name: &str,
        member: Member,
        span: FileSpan,
    ) -> Result<(), ScopeError> {
        let kind = member.kind();
        if self.set(scope, name, member) {
            Ok(())
        } else {
            Err(ScopeError::DuplicateDeclaration {
                name: name.to_string(),
                kind,
                span,
            })
        }
    }

    /// Nearest definition of `name`
    #[must_use]
    pub fn get(&self, scope: ScopeId, name: &str) -> Option<&Member> {
        self.get_with_scope(scope, name).map(|(member, _)| member)
    }

    /// Nearest definition of `name` with the frame that holds it
    #[must_use]
    pub fn get_with_scope(&self, scope: ScopeId, name: &str) -> Option<(&Member, ScopeId)> {
        self.ancestors(scope).find_map(|id| {
            self.frames[id]
                .members
                .get(name)
                .map(|member| (member, id))
        })
    }

    /// Value of the nearest definition of `name` if it is a variable
    #[must_use]
    pub fn get_variable(&self, scope: ScopeId, name: &str) -> Option<&Value> {
        match self.get(scope, name)? {
            Member::Variable(variable) => Some(&variable.value),
            _ => None,
        }
    }

    /// Nearest definition of `name` if it is a function
    #[must_use]
    pub fn get_function(&self, scope: ScopeId, name: &str) -> Option<&Callable> {
        match self.get(scope, name)? {
            Member::Function(function) => Some(&function.callable),
            _ => None,
        }
    }

    /// Nearest definition of `name` if it is a mixin
    #[must_use]
    pub fn get_mixin(&self, scope: ScopeId, name: &str) -> Option<&Mixin> {
        match self.get(scope, name)? {
            Member::Mixin(mixin) => Some(mixin),
            _ => None,
        }
    }

    /// [`ScopeTree::get_variable`] with a positioned error
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::Unresolved`] with suggestions when no variable is
    /// visible under `name`.
    pub fn resolve_variable(
        &self,
        scope: ScopeId,
        name: &str,
        span: FileSpan,
    ) -> Result<&Value, ScopeError> {
        self.get_variable(scope, name)
            .ok_or_else(|| self.unresolved(scope, name, MemberKind::Variable, span))
    }

    /// [`ScopeTree::get_function`] with a positioned error
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::Unresolved`] when no function is visible under `name`.
    pub fn resolve_function(
        &self,
        scope: ScopeId,
        name: &str,
        span: FileSpan,
    ) -> Result<&Callable, ScopeError> {
        self.get_function(scope, name)
            .ok_or_else(|| self.unresolved(scope, name, MemberKind::Function, span))
    }

    /// [`ScopeTree::get_mixin`] with a positioned error
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::Unresolved`] when no mixin is visible under `name`.
    pub fn resolve_mixin(
        &self,
        scope: ScopeId,
        name: &str,
        span: FileSpan,
    ) -> Result<&Mixin, ScopeError> {
        self.get_mixin(scope, name)
            .ok_or_else(|| self.unresolved(scope, name, MemberKind::Mixin, span))
    }

    /// Error for a missing `name`, suggesting visible names of the same kind
    #[must_use]
    pub fn unresolved(
        &self,
        scope: ScopeId,
        name: &str,
        kind: MemberKind,
        span: FileSpan,
    ) -> ScopeError {
        let visible = self.ancestors(scope).flat_map(|id| {
            self.frames[id]
                .members
                .iter()
                .filter(move |(_, member)| member.kind() == kind)
                .map(|(candidate, _)| candidate.as_str())
        });

        ScopeError::Unresolved {
            name: name.to_string(),
            kind,
            span,
            suggestions: ScopeError::compute_suggestions(name, visible),
        }
    }

    /// Arguments of the innermost invocation visible from `scope`
    #[must_use]
    pub fn arguments(&self, scope: ScopeId) -> Option<&Value> {
        self.ancestors(scope)
            .find_map(|id| self.frames[id].arguments.as_ref())
    }

    /// Sets the arguments slot of `scope` only
    pub fn set_arguments(&mut self, scope: ScopeId, arguments: Value) {
        self.frames[scope].arguments = Some(arguments);
    }

    /// Content block of the innermost mixin invocation visible from `scope`
    #[must_use]
    pub fn content_block(&self, scope: ScopeId) -> Option<&ContentBlock> {
        self.ancestors(scope)
            .find_map(|id| self.frames[id].content_block.as_ref())
    }

    /// Sets the content block slot of `scope` only
    pub fn set_content_block(&mut self, scope: ScopeId, block: ContentBlock) {
        self.frames[scope].content_block = Some(block);
    }

    /// Selector of the innermost rule visible from `scope`
    #[must_use]
    pub fn current_rule(&self, scope: ScopeId) -> Option<&Rc<SelectorList>> {
        self.ancestors(scope)
            .find_map(|id| self.frames[id].current_rule.as_ref())
    }

    /// Sets the current rule slot of `scope` only
    pub fn set_current_rule(&mut self, scope: ScopeId, rule: Rc<SelectorList>) {
        self.frames[scope].current_rule = Some(rule);
    }

    /// Copies every member declared in `source` into `target`
    ///
    /// With a namespace, names are qualified as `namespace.name`. Names already
    /// declared in `target` are left alone and returned.
    pub fn import_from(
        &mut self,
        target: ScopeId,
        source: ScopeId,
        namespace: Option<&str>,
    ) -> Vec<String> {
        let members: Vec<(String, Member)> = self.frames[source]
            .members
            .iter()
            .map(|(name, member)| (qualify(namespace, name), member.clone()))
            .collect();

        members
            .into_iter()
            .filter_map(|(name, member)| (!self.set(target, &name, member)).then_some(name))
            .collect()
    }

    /// Detaches `scope` from its parent and returns the former parent
    ///
    /// Unless pinned, the frame is emptied and its slot reused by the next
    /// frame created, so `scope` must not be used afterwards.
    pub fn close(&mut self, scope: ScopeId) -> Option<ScopeId> {
        let frame = &mut self.frames[scope];
        let parent = frame.parent.take();
        if !frame.pinned && !frame.released {
            *frame = ScopeFrame {
                released: true,
                ..ScopeFrame::default()
            };
            self.free.push(scope);
            tracing::trace!(?scope, "frame released");
        }
        parent
    }
}

/// `namespace.name`, or `name` without namespace
#[must_use]
pub fn qualify(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(namespace) => format!("{namespace}.{name}"),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jz_ast::{CallableDeclaration, CallableDefinition, ParameterList, build};

    fn number(value: f64) -> Member {
        Member::variable(Value::number(value, "px"))
    }

    #[test]
    fn test_set_rejects_duplicate_in_same_frame() {
        let mut tree = ScopeTree::new();
        let root = tree.create_root();

        assert!(tree.set(root, "$gap", number(1.0)));
        assert!(!tree.set(root, "$gap", number(2.0)));
        assert_eq!(tree.get_variable(root, "$gap"), Some(&Value::number(1.0, "px")));

        let error = tree
            .declare(root, "$gap", number(3.0), FileSpan::default())
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "variable $gap has already been declared in this scope"
        );
    }

    #[test]
    fn test_nearest_definition_wins() {
        let mut tree = ScopeTree::new();
        let root = tree.create_root();
        let child = tree.create_child(root);
        let grandchild = tree.create_child(child);

        tree.set(root, "$gap", number(1.0));
        tree.set(child, "$gap", number(2.0));

        assert_eq!(tree.get_variable(grandchild, "$gap"), Some(&Value::number(2.0, "px")));
        assert_eq!(tree.get_variable(root, "$gap"), Some(&Value::number(1.0, "px")));
        let (_, owner) = tree.get_with_scope(grandchild, "$gap").unwrap();
        assert_eq!(owner, child);

        let sibling = tree.create_child(root);
        assert_eq!(tree.get_variable(sibling, "$gap"), Some(&Value::number(1.0, "px")));
        let (_, owner) = tree.get_with_scope(sibling, "$gap").unwrap();
        assert_eq!(owner, root);
    }

    #[test]
    fn test_kind_narrowed_lookup() {
        let mut tree = ScopeTree::new();
        let root = tree.create_root();
        tree.set(root, "$gap", number(1.0));

        assert!(tree.get_function(root, "$gap").is_none());
        assert!(tree.get_mixin(root, "$gap").is_none());
        assert!(tree.get_variable(root, "$missing").is_none());

        let error = tree
            .resolve_variable(root, "$gp", FileSpan::default())
            .unwrap_err();
        assert_eq!(error.to_string(), "Undefined variable $gp, did you mean $gap?");
    }

    #[test]
    fn test_dynamic_slots_fall_back_without_writing_through() {
        let mut tree = ScopeTree::new();
        let root = tree.create_root();
        let child = tree.create_child(root);

        tree.set_arguments(root, Value::number(1.0, ""));
        tree.set_current_rule(root, Rc::new(build::class_selector("outer")));
        assert_eq!(tree.arguments(child), Some(&Value::number(1.0, "")));

        tree.set_arguments(child, Value::number(2.0, ""));
        tree.set_current_rule(child, Rc::new(build::class_selector("inner")));
        assert_eq!(tree.arguments(child), Some(&Value::number(2.0, "")));
        assert_eq!(tree.arguments(root), Some(&Value::number(1.0, "")));
        assert_eq!(tree.current_rule(root).unwrap().to_string(), ".outer");
        assert_eq!(tree.current_rule(child).unwrap().to_string(), ".inner");

        assert!(tree.content_block(child).is_none());
        tree.set_content_block(root, ContentBlock {
            nodes: Rc::new(vec![build::decl("color", build::color("red"))]),
            scope: root,
        });
        assert_eq!(tree.content_block(child).unwrap().nodes.len(), 1);
    }

    #[test]
    fn test_import_from_with_namespace() {
        let mut tree = ScopeTree::new();
        let theme = tree.create_root();
        let module = tree.create_root();
        tree.set(theme, "$primary", number(1.0));
        tree.set(theme, "$secondary", number(2.0));
        tree.set(module, "$primary", number(9.0));

        let skipped = tree.import_from(module, theme, None);
        assert_eq!(skipped, vec!["$primary".to_string()]);
        assert_eq!(tree.get_variable(module, "$primary"), Some(&Value::number(9.0, "px")));

        let skipped = tree.import_from(module, theme, Some("theme"));
        assert!(skipped.is_empty());
        assert_eq!(
            tree.get_variable(module, "theme.$secondary"),
            Some(&Value::number(2.0, "px"))
        );
    }

    #[test]
    fn test_close_detaches_parent() {
        let mut tree = ScopeTree::new();
        let root = tree.create_root();
        let child = tree.create_child(root);
        tree.set(root, "$gap", number(1.0));

        assert_eq!(tree.close(child), Some(root));
        assert!(tree.get(child, "$gap").is_none());
        assert_eq!(tree.frame(child).parent(), None);
        assert!(tree.get(root, "$gap").is_some());
    }

    #[test]
    fn test_closed_frames_are_reused() {
        let mut tree = ScopeTree::new();
        let root = tree.create_root();

        for value in 0..100 {
            let body = tree.create_child(root);
            tree.set(body, "$i", number(f64::from(value)));
            tree.close(body);
        }
        assert_eq!(tree.allocated(), 2);

        let fresh = tree.create_child(root);
        assert!(tree.get(fresh, "$i").is_none());
        assert_eq!(tree.frame(fresh).parent(), Some(root));

        tree.close(root);
        assert!(tree.frame(root).is_pinned());
    }

    #[test]
    fn test_closure_frames_stay_alive() {
        let mut tree = ScopeTree::new();
        let root = tree.create_root();
        let outer = tree.create_child(root);
        let inner = tree.create_child(outer);
        tree.set(outer, "$radius", number(2.0));

        let definition = Rc::new(CallableDefinition {
            declaration: CallableDeclaration {
                name: "rounded".to_string(),
                parameters: ParameterList::default(),
                span: FileSpan::default(),
            },
            body: Vec::new(),
        });
        tree.set(inner, "rounded", Member::mixin(definition, inner));
        assert!(tree.frame(outer).is_pinned());

        tree.close(inner);
        tree.close(outer);
        let reused = tree.create_child(root);
        assert_ne!(reused, inner);
        assert_ne!(reused, outer);
        assert!(tree.get_mixin(inner, "rounded").is_some());
        assert_eq!(tree.get_variable(outer, "$radius"), Some(&Value::number(2.0, "px")));
    }
}
