//! Evaluation of one module's stylesheet against the scope chain
//!
//! Variables, functions and mixins are declared as the walk meets them, so a
//! name is only visible after its declaration. `@export` rules are collected
//! during the walk and processed once the whole module has been evaluated.

use crate::error::CompileError;
use crate::options::CompileOptions;
use crate::output::OutputNode;
use indexmap::IndexMap;
use jz_ast::{
    AtRule, AtRuleKind, CallableDeclaration, CallableDefinition, ClassSelector, ComposeAtRule,
    Declaration, ExportAtRule, IcssImportAtRule, ImportAtRule, ImportSpecifiers, IncludeAtRule,
    Node, Rule, SelectorComponent, SelectorList, UseAtRule, Value,
};
use jz_graph::{DependencyError, NOT_ALLOWED_IN_CSS};
use jz_module::{
    ClassReference, Export, ExportError, ExportSource, Module, ModuleType, process_export,
};
use jz_reduce::{Builtins, ReduceError, Reducer, Step, statements};
use jz_scope::{Callable, ContentBlock, Member, ScopeId, ScopeTree, qualify};
use jz_span::FileSpan;
use std::mem;
use std::path::PathBuf;
use std::rc::Rc;

/// Where a block is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Context {
    /// Outside of any style rule
    top_level: bool,
    /// Inside a mixin body or a content block
    in_mixin: bool,
}

impl Context {
    const MODULE: Self = Self {
        top_level: true,
        in_mixin: false,
    };

    const MIXIN: Self = Self {
        top_level: false,
        in_mixin: true,
    };

    fn nested(self) -> Self {
        Self {
            top_level: false,
            ..self
        }
    }
}

/// Compiler for a single module
pub(crate) struct ModuleCompiler<'ctx> {
    scopes: &'ctx mut ScopeTree,
    builtins: &'ctx Builtins,
    /// Modules compiled before this one
    modules: &'ctx IndexMap<PathBuf, Module>,
    options: &'ctx CompileOptions,
    /// Request string to resolved module
    dependencies: IndexMap<String, PathBuf>,
    module: Module,
    /// Mixin nesting
    depth: usize,
    exports: Vec<(ExportAtRule, FileSpan, ScopeId)>,
}

impl<'ctx> ModuleCompiler<'ctx> {
    pub(crate) fn new(
        scopes: &'ctx mut ScopeTree,
        builtins: &'ctx Builtins,
        modules: &'ctx IndexMap<PathBuf, Module>,
        options: &'ctx CompileOptions,
        dependencies: IndexMap<String, PathBuf>,
        module: Module,
    ) -> Self {
        Self {
            scopes,
            builtins,
            modules,
            options,
            dependencies,
            module,
            depth: 0,
            exports: Vec::new(),
        }
    }

    /// Evaluates `nodes` as the module body and finalizes the export registry
    pub(crate) fn run(mut self, nodes: &[Node]) -> Result<(Module, Vec<OutputNode>), CompileError> {
        let root = self.module.scope;
        let output = self.block(nodes, root, Context::MODULE)?;

        for (export, span, scope) in mem::take(&mut self.exports) {
            self.export(&export, span, scope)?;
        }

        Ok((self.module, output))
    }

    fn reducer(&mut self) -> Reducer<'_> {
        Reducer::new(self.scopes, self.builtins, self.options.reduce_options())
            .with_depth(self.depth)
    }

    /// Compiled dependency registered for `request`
    fn dependency(&self, request: &str, span: FileSpan) -> Result<&'ctx Module, CompileError> {
        let modules = self.modules;
        let path = self
            .dependencies
            .get(request)
            .ok_or_else(|| CompileError::UnresolvedRequest {
                request: request.to_string(),
                span,
            })?;

        modules
            .get(path)
            .ok_or_else(|| CompileError::DependencyNotCompiled {
                request: request.to_string(),
                path: path.clone(),
                span,
            })
    }

    fn block(
        &mut self,
        nodes: &[Node],
        scope: ScopeId,
        context: Context,
    ) -> Result<Vec<OutputNode>, CompileError> {
        let mut output = Vec::new();
        for step in statements(nodes)? {
            match step {
                Step::Conditional(_) => {
                    output.extend(self.conditional(step.branches(), scope, context)?);
                }
                Step::Node(Node::Declaration(decl)) => {
                    output.extend(self.declaration(decl, scope)?);
                }
                Step::Node(Node::Rule(rule)) => output.push(self.rule(rule, scope, context)?),
                Step::Node(Node::AtRule(at_rule)) => {
                    self.at_rule(at_rule, scope, context, &mut output)?;
                }
            }
        }
        Ok(output)
    }

    /// [`Self::block`] in a frame that is closed afterwards
    fn scoped_block(
        &mut self,
        nodes: &[Node],
        frame: ScopeId,
        context: Context,
    ) -> Result<Vec<OutputNode>, CompileError> {
        let output = self.block(nodes, frame, context);
        self.scopes.close(frame);
        output
    }

    fn declaration(
        &mut self,
        decl: &Declaration,
        scope: ScopeId,
    ) -> Result<Option<OutputNode>, CompileError> {
        let value = self.reducer().reduce(&decl.value, scope)?;

        if let Some(name) = decl.variable_name() {
            self.scopes
                .declare(scope, name, Member::variable(value), decl.span)?;
            return Ok(None);
        }

        // Null valued properties are dropped
        if matches!(value, Value::Null) {
            return Ok(None);
        }

        let prop = self.reducer().reduce(&decl.prop, scope)?;
        Ok(Some(OutputNode::Declaration {
            prop: prop.to_string(),
            value: value.to_string(),
            important: decl.important,
        }))
    }

    fn rule(
        &mut self,
        rule: &Rule,
        scope: ScopeId,
        context: Context,
    ) -> Result<OutputNode, CompileError> {
        let exported = context.top_level && self.module.module_type != ModuleType::PlainCss;
        if let Some(class) = rule.selector.single_class().filter(|_| exported) {
            self.export_class(class);
        }

        let frame = self.scopes.create_child(scope);
        self.scopes
            .set_current_rule(frame, Rc::new(rule.selector.clone()));
        let children = self.scoped_block(&rule.children, frame, context.nested())?;

        Ok(OutputNode::Rule {
            selector: self.render_selector(&rule.selector),
            children,
        })
    }

    fn export_class(&mut self, class: &ClassSelector) {
        let identifier = self
            .module
            .class_identifier(&class.name, &self.options.class_name_template);
        let reference = ClassReference::new(class.clone(), identifier);
        if self
            .module
            .exports
            .add(class.name.clone(), Export::Class(reference))
        {
            tracing::debug!(class = %class.name, "class exported");
        }
    }

    /// Selector text with generated class names
    fn render_selector(&self, selector: &SelectorList) -> String {
        if self.module.module_type == ModuleType::PlainCss {
            return selector.to_string();
        }

        let mut rendered = selector.clone();
        let components = rendered
            .selectors
            .iter_mut()
            .flat_map(|selector| selector.components.iter_mut());
        for component in components {
            if let SelectorComponent::Class(class) = component {
                class.name = self
                    .module
                    .class_identifier(&class.name, &self.options.class_name_template);
            }
        }
        rendered.to_string()
    }

    fn at_rule(
        &mut self,
        at_rule: &AtRule,
        scope: ScopeId,
        context: Context,
        output: &mut Vec<OutputNode>,
    ) -> Result<(), CompileError> {
        let span = at_rule.span;
        if self.module.module_type == ModuleType::PlainCss
            && NOT_ALLOWED_IN_CSS.contains(&at_rule.name.as_str())
        {
            return Err(DependencyError::NotAllowed {
                name: at_rule.name.clone(),
                span,
            }
            .into());
        }

        match &at_rule.kind {
            AtRuleKind::Import(import) => self.import(import, span, scope)?,
            AtRuleKind::Use(use_rule) => self.use_module(use_rule, span, scope)?,
            AtRuleKind::IcssImport(icss) => self.icss_import(icss, span, scope)?,
            AtRuleKind::Export(export) => {
                // Read once the walk is over
                self.scopes.pin(scope);
                self.exports.push((export.clone(), span, scope));
            }
            AtRuleKind::Compose(compose) => self.compose(compose, span, scope)?,
            AtRuleKind::Mixin(declaration) => {
                let definition = definition(declaration, at_rule);
                self.scopes.declare(
                    scope,
                    &declaration.name,
                    Member::mixin(definition, scope),
                    span,
                )?;
            }
            AtRuleKind::Function(declaration) => {
                let callable = Callable::User {
                    definition: definition(declaration, at_rule),
                    closure: scope,
                };
                self.scopes.declare(
                    scope,
                    &declaration.name,
                    Member::function(callable, Some(span)),
                    span,
                )?;
            }
            AtRuleKind::Include(include) => output.extend(self.include(include, at_rule, scope)?),
            AtRuleKind::Content => output.extend(self.content(span, scope, context)?),
            AtRuleKind::Return(_) => return Err(CompileError::ReturnOutsideFunction { span }),
            AtRuleKind::If(_) | AtRuleKind::ElseIf(_) | AtRuleKind::Else => {
                output.extend(self.conditional([at_rule], scope, context)?);
            }
            AtRuleKind::Each(condition) => {
                let iterations = self.reducer().each_iterations(condition, scope)?;
                for bindings in iterations {
                    let frame = self.scopes.create_child(scope);
                    for (name, value) in bindings {
                        self.scopes
                            .declare(frame, &name, Member::variable(value), span)?;
                    }
                    output.extend(self.scoped_block(at_rule.body(), frame, context)?);
                }
            }
            AtRuleKind::For(condition) => {
                let values = self.reducer().for_iterations(condition, scope)?;
                for value in values {
                    let frame = self.scopes.create_child(scope);
                    self.scopes.declare(
                        frame,
                        &condition.variable,
                        Member::variable(value),
                        span,
                    )?;
                    output.extend(self.scoped_block(at_rule.body(), frame, context)?);
                }
            }
            AtRuleKind::Css => {
                let children = match &at_rule.children {
                    Some(children) => {
                        let frame = self.scopes.create_child(scope);
                        Some(self.scoped_block(children, frame, context)?)
                    }
                    None => None,
                };
                output.push(OutputNode::AtRule {
                    name: at_rule.name.clone(),
                    params: at_rule.params.clone(),
                    children,
                });
            }
        }
        Ok(())
    }

    /// Body of the first branch whose condition holds, in a fresh frame
    fn conditional<'node>(
        &mut self,
        branches: impl IntoIterator<Item = &'node AtRule>,
        scope: ScopeId,
        context: Context,
    ) -> Result<Vec<OutputNode>, CompileError> {
        let Some(branch) = self.reducer().select_branch(branches, scope)? else {
            return Ok(Vec::new());
        };
        let frame = self.scopes.create_child(scope);
        self.scoped_block(branch.body(), frame, context)
    }

    /// Binds every export of `dependency` in `scope`
    fn bind_all(
        &mut self,
        dependency: &Module,
        namespace: Option<&str>,
        span: FileSpan,
        scope: ScopeId,
    ) -> Result<(), CompileError> {
        for (name, entry) in dependency.exports.iter() {
            let member = entry.clone().with_source(&dependency.path).into_member();
            self.scopes
                .declare(scope, &qualify(namespace, name), member, span)?;
        }
        Ok(())
    }

    /// Binds one export of `dependency` as `local`
    fn bind_one(
        &mut self,
        dependency: &Module,
        request: &str,
        imported: &str,
        local: &str,
        span: FileSpan,
        scope: ScopeId,
    ) -> Result<(), CompileError> {
        let entry = dependency
            .exports
            .get(imported)
            .ok_or_else(|| ExportError::MissingExport {
                request: request.to_string(),
                name: imported.to_string(),
                span,
            })?;
        let member = entry.clone().with_source(&dependency.path).into_member();
        self.scopes.declare(scope, local, member, span)?;
        Ok(())
    }

    fn import(
        &mut self,
        import: &ImportAtRule,
        span: FileSpan,
        scope: ScopeId,
    ) -> Result<(), CompileError> {
        let dependency = self.dependency(&import.request, span)?;
        match &import.specifiers {
            ImportSpecifiers::Named(specifiers) => {
                for specifier in specifiers {
                    self.bind_one(
                        dependency,
                        &import.request,
                        &specifier.imported,
                        specifier.local_name(),
                        specifier.span,
                        scope,
                    )?;
                }
            }
            ImportSpecifiers::Namespace(namespace) => {
                self.bind_all(dependency, Some(namespace), span, scope)?;
            }
        }
        tracing::debug!(request = %import.request, target = %dependency.path.display(), "imported");
        Ok(())
    }

    fn use_module(
        &mut self,
        use_rule: &UseAtRule,
        span: FileSpan,
        scope: ScopeId,
    ) -> Result<(), CompileError> {
        let namespace = use_rule.namespace();

        if use_rule.is_builtin() {
            if !self.options.builtin_modules {
                return Err(CompileError::UnresolvedRequest {
                    request: use_rule.request.clone(),
                    span,
                });
            }
            // Built-ins are registered under their module name already
            if namespace != use_rule.request {
                let builtins = self.builtins;
                for (name, callable) in builtins.module(&use_rule.request) {
                    self.scopes.declare(
                        scope,
                        &qualify(Some(&namespace), name),
                        Member::function(callable.clone(), None),
                        span,
                    )?;
                }
            }
            return Ok(());
        }

        let dependency = self.dependency(&use_rule.request, span)?;
        self.bind_all(dependency, Some(&namespace), span, scope)?;
        tracing::debug!(request = %use_rule.request, %namespace, "used");
        Ok(())
    }

    fn icss_import(
        &mut self,
        icss: &IcssImportAtRule,
        span: FileSpan,
        scope: ScopeId,
    ) -> Result<(), CompileError> {
        let dependency = self.dependency(&icss.request, span)?;
        for binding in &icss.bindings {
            self.bind_one(
                dependency,
                &icss.request,
                &binding.imported,
                &binding.local,
                binding.span,
                scope,
            )?;
        }
        Ok(())
    }

    /// Extends the composition chain of the enclosing class rule
    fn compose(
        &mut self,
        compose: &ComposeAtRule,
        span: FileSpan,
        scope: ScopeId,
    ) -> Result<(), CompileError> {
        let target = self
            .scopes
            .current_rule(scope)
            .and_then(|rule| rule.single_class())
            .map(|class| class.name.clone())
            .filter(|name| self.module.exports.class(name).is_some())
            .ok_or(CompileError::ComposeOutsideClassRule { span })?;

        let mut composed = Vec::with_capacity(compose.classes.len());
        match &compose.request {
            Some(request) => {
                let dependency = self.dependency(request, span)?;
                for class in &compose.classes {
                    let reference = dependency.exports.class(&class.name).ok_or_else(|| {
                        ExportError::MissingExport {
                            request: request.clone(),
                            name: class.name.clone(),
                            span: class.span,
                        }
                    })?;
                    composed.push(reference.clone());
                }
            }
            None => {
                for class in &compose.classes {
                    let reference = self.module.exports.class(&class.name).ok_or_else(|| {
                        CompileError::UnknownClass {
                            name: class.name.clone(),
                            span: class.span,
                        }
                    })?;
                    composed.push(reference.clone());
                }
            }
        }

        if let Some(reference) = self.module.exports.class_mut(&target) {
            for other in &composed {
                reference.compose(other);
            }
            tracing::debug!(class = %target, composes = ?reference.composes, "composed");
        }
        Ok(())
    }

    fn include(
        &mut self,
        include: &IncludeAtRule,
        at_rule: &AtRule,
        scope: ScopeId,
    ) -> Result<Vec<OutputNode>, CompileError> {
        let span = at_rule.span;
        let mixin = self.scopes.resolve_mixin(scope, &include.name, span)?.clone();
        let declaration = &mixin.definition.declaration;

        if self.depth >= self.options.max_call_depth {
            return Err(ReduceError::RecursionLimit {
                callee: declaration.name.clone(),
                limit: self.options.max_call_depth,
                span,
            }
            .into());
        }

        let (positional, named) = self.reducer().reduce_arguments(&include.args, scope)?;
        let frame = self.scopes.create_child(mixin.closure);
        if let Some(children) = &at_rule.children {
            self.scopes.set_content_block(
                frame,
                ContentBlock {
                    nodes: Rc::new(children.clone()),
                    scope,
                },
            );
        }
        if let Some(rule) = self.scopes.current_rule(scope).cloned() {
            self.scopes.set_current_rule(frame, rule);
        }

        tracing::trace!(mixin = %declaration.name, depth = self.depth, "include");
        self.depth += 1;
        let bound = self.reducer().bind_into(
            &declaration.name,
            &declaration.parameters,
            positional,
            named,
            frame,
            span,
        );
        let output = match bound {
            Ok(()) => self.block(&mixin.definition.body, frame, Context::MIXIN),
            Err(error) => Err(error.into()),
        };
        self.depth -= 1;
        self.scopes.close(frame);
        output
    }

    /// Evaluates the content block of the innermost include in its caller's scope
    fn content(
        &mut self,
        span: FileSpan,
        scope: ScopeId,
        context: Context,
    ) -> Result<Vec<OutputNode>, CompileError> {
        if !context.in_mixin {
            return Err(CompileError::ContentOutsideMixin { span });
        }
        let Some(block) = self.scopes.content_block(scope).cloned() else {
            return Ok(Vec::new());
        };

        let frame = self.scopes.create_child(block.scope);
        if let Some(rule) = self.scopes.current_rule(scope).cloned() {
            self.scopes.set_current_rule(frame, rule);
        }
        self.scoped_block(&block.nodes, frame, context)
    }

    fn export(
        &mut self,
        export: &ExportAtRule,
        span: FileSpan,
        scope: ScopeId,
    ) -> Result<(), CompileError> {
        let source = match &export.request {
            Some(request) => {
                let dependency = self.dependency(request, span)?;
                Some(ExportSource {
                    request,
                    path: &dependency.path,
                    members: &dependency.exports,
                })
            }
            None => None,
        };
        process_export(
            export,
            span,
            self.scopes,
            scope,
            &mut self.module.exports,
            source,
        )?;
        Ok(())
    }
}

fn definition(declaration: &CallableDeclaration, at_rule: &AtRule) -> Rc<CallableDefinition> {
    Rc::new(CallableDefinition {
        declaration: declaration.clone(),
        body: at_rule.body().to_vec(),
    })
}
