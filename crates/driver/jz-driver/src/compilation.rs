//! Compilation context shared by every module

use crate::error::CompileError;
use crate::options::CompileOptions;
use crate::output::EvaluatedStylesheet;
use crate::walk::ModuleCompiler;
use indexmap::IndexMap;
use jz_ast::Stylesheet;
use jz_ast::lower::{RawNode, lower};
use jz_ast::parse::Parse;
use jz_graph::{DependencyEdge, DependencyErrors, ModuleDescriptor};
use jz_module::{Module, ModuleMembers};
use jz_reduce::Builtins;
use jz_scope::ScopeTree;
use std::path::{Path, PathBuf};

/// Scope frames, built-ins and the finalized modules of one compilation
///
/// Modules are compiled one at a time, dependencies first. A module only ever
/// reads the export registries of modules compiled before it.
#[derive(Debug)]
pub struct Compilation {
    options: CompileOptions,
    scopes: ScopeTree,
    builtins: Builtins,
    modules: IndexMap<PathBuf, Module>,
}

impl Default for Compilation {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}

impl Compilation {
    /// Empty compilation
    #[must_use]
    pub fn new(options: CompileOptions) -> Self {
        Self {
            builtins: Builtins::new(options.builtin_modules),
            options,
            scopes: ScopeTree::new(),
            modules: IndexMap::new(),
        }
    }

    /// Options in effect
    #[must_use]
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Every scope frame created so far
    #[must_use]
    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    /// Compiled module at `path`
    #[must_use]
    pub fn module(&self, path: &Path) -> Option<&Module> {
        self.modules.get(path)
    }

    /// Export registry of the compiled module at `path`
    #[must_use]
    pub fn exports_of(&self, path: &Path) -> Option<&ModuleMembers> {
        self.module(path).map(|module| &module.exports)
    }

    /// Compiled modules in compilation order
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    /// Discovers the dependencies of `module` with the configured failure mode
    ///
    /// # Errors
    ///
    /// See [`jz_graph::discover`].
    pub async fn discover(
        &self,
        module: &ModuleDescriptor,
        stylesheet: &Stylesheet,
    ) -> Result<Vec<DependencyEdge>, DependencyErrors> {
        let options = self.options.discover_options();
        jz_graph::discover(module, stylesheet, options).await
    }

    /// Evaluates the module at `path` and publishes its export registry
    ///
    /// `dependencies` are the module's discovered edges; every target they
    /// reference must have been compiled already.
    ///
    /// # Errors
    ///
    /// Returns the first [`CompileError`]; the module is not registered then.
    #[tracing::instrument(level = "debug", skip_all, fields(module = %path.display()))]
    pub fn compile(
        &mut self,
        path: &Path,
        stylesheet: &Stylesheet,
        dependencies: &[DependencyEdge],
    ) -> Result<EvaluatedStylesheet, CompileError> {
        let scope = self.scopes.create_root();
        let module = Module::new(path, scope);
        tracing::debug!(module_type = %module.module_type, "compiling");

        let dependencies = dependencies
            .iter()
            .map(|edge| (edge.request.clone(), edge.target.clone()))
            .collect();
        let compiler = ModuleCompiler::new(
            &mut self.scopes,
            &self.builtins,
            &self.modules,
            &self.options,
            dependencies,
            module,
        );
        let (module, nodes) = compiler.run(&stylesheet.nodes)?;

        tracing::debug!(exports = module.exports.len(), "module compiled");
        self.modules.insert(path.to_path_buf(), module);
        Ok(EvaluatedStylesheet { nodes })
    }

    /// Lowers the walker's tree with `parser`, then compiles it
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::Syntax`] for fragments the parser rejects, then
    /// see [`Compilation::compile`].
    pub fn compile_raw(
        &mut self,
        path: &Path,
        nodes: &[RawNode],
        parser: &impl Parse,
        dependencies: &[DependencyEdge],
    ) -> Result<EvaluatedStylesheet, CompileError> {
        let stylesheet = lower(nodes, parser)?;
        self.compile(path, &stylesheet, dependencies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;
    use jz_ast::{BinaryOp, ParameterList, build};
    use jz_graph::EdgeKind;
    use jz_module::Export;
    use jz_span::FileSpan;

    fn edge(from: &str, request: &str, target: &str) -> DependencyEdge {
        DependencyEdge {
            from: PathBuf::from(from),
            request: request.to_string(),
            target: PathBuf::from(target),
            kind: EdgeKind::Import,
            span: FileSpan::default(),
        }
    }

    fn compile(compilation: &mut Compilation, path: &str, nodes: Vec<jz_ast::Node>) -> String {
        compilation
            .compile(Path::new(path), &Stylesheet::new(nodes), &[])
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_variables_are_substituted_and_removed() {
        let mut compilation = Compilation::default();
        let output = compile(
            &mut compilation,
            "/app.mcss",
            vec![
                build::decl("$gap", build::num(4.0, "px")),
                build::class_rule(
                    "card",
                    vec![
                        build::decl(
                            "padding",
                            build::binary(BinaryOp::Mul, build::var("$gap"), build::num(2.0, "")),
                        ),
                        build::decl("margin", build::null()),
                    ],
                ),
            ],
        );

        expect![[r#"
            .card {
              padding: 8px;
            }
        "#]]
        .assert_eq(&output);
    }

    #[test]
    fn test_duplicate_variable_is_an_error() {
        let mut compilation = Compilation::default();
        let error = compilation
            .compile(
                Path::new("/app.mcss"),
                &Stylesheet::new(vec![
                    build::decl("$a", build::num(1.0, "")),
                    build::decl("$a", build::num(2.0, "")),
                ]),
                &[],
            )
            .unwrap_err();

        assert_eq!(error.to_string(), "variable $a has already been declared in this scope");
        assert!(compilation.module(Path::new("/app.mcss")).is_none());
    }

    #[test]
    fn test_class_names_follow_the_template() {
        let options = CompileOptions {
            class_name_template: "[module]__[name]".to_string(),
            ..CompileOptions::default()
        };
        let mut compilation = Compilation::new(options);
        let output = compile(
            &mut compilation,
            "/src/button.mcss",
            vec![
                build::class_rule("base", vec![build::decl("display", build::ident("block"))]),
                build::class_rule("primary", vec![build::compose(&["base"], None)]),
            ],
        );

        expect![[r#"
            .button__base {
              display: block;
            }
            .button__primary {
            }
        "#]]
        .assert_eq(&output);

        let exports = compilation.exports_of(Path::new("/src/button.mcss")).unwrap();
        assert_eq!(
            exports.class("primary").unwrap().class_list(),
            "button__primary button__base"
        );
    }

    #[test]
    fn test_imports_read_compiled_dependencies() {
        let mut compilation = Compilation::default();
        compile(
            &mut compilation,
            "/theme.mcss",
            vec![
                build::decl("$primary", build::color("#336699")),
                build::export(&[("$primary", None)], None),
            ],
        );

        let output = compilation
            .compile(
                Path::new("/app.mcss"),
                &Stylesheet::new(vec![
                    build::import(&[("$primary", Some("$brand"))], "./theme"),
                    build::class_rule("link", vec![build::decl("color", build::var("$brand"))]),
                ]),
                &[edge("/app.mcss", "./theme", "/theme.mcss")],
            )
            .unwrap();

        expect![[r#"
            .link {
              color: #336699;
            }
        "#]]
        .assert_eq(&output.to_string());

        let imported = compilation
            .scopes()
            .get(compilation.module(Path::new("/app.mcss")).unwrap().scope, "$brand")
            .unwrap();
        assert_eq!(imported.source(), Some(Path::new("/theme.mcss")));
    }

    #[test]
    fn test_dependency_must_be_compiled_first() {
        let mut compilation = Compilation::default();
        let error = compilation
            .compile(
                Path::new("/app.mcss"),
                &Stylesheet::new(vec![build::import(&[("$a", None)], "./theme")]),
                &[edge("/app.mcss", "./theme", "/theme.mcss")],
            )
            .unwrap_err();
        assert_eq!(error.to_string(), "\"./theme\" (/theme.mcss) has not been compiled yet");

        let error = compilation
            .compile(
                Path::new("/app.mcss"),
                &Stylesheet::new(vec![build::import(&[("$a", None)], "./other")]),
                &[],
            )
            .unwrap_err();
        assert_eq!(error.to_string(), "\"./other\" has not been resolved");
    }

    #[test]
    fn test_mixin_with_content_and_arguments() {
        let mut compilation = Compilation::default();
        let output = compile(
            &mut compilation,
            "/app.mcss",
            vec![
                build::decl("$color", build::color("red")),
                build::mixin(
                    "hover",
                    ParameterList::new(
                        vec![build::param_default("$weight", build::ident("bold"))],
                        None,
                    ),
                    vec![
                        build::decl("font-weight", build::var("$weight")),
                        build::rule(
                            build::selector(vec![
                                jz_ast::SelectorComponent::Parent,
                                jz_ast::SelectorComponent::PseudoClass("hover".to_string()),
                            ]),
                            vec![build::content()],
                        ),
                    ],
                ),
                build::class_rule(
                    "link",
                    vec![
                        build::decl("$local", build::ident("underline")),
                        build::include(
                            "hover",
                            build::args(vec![], vec![]),
                            Some(vec![
                                build::decl("color", build::var("$color")),
                                build::decl("text-decoration", build::var("$local")),
                            ]),
                        ),
                    ],
                ),
            ],
        );

        expect![[r#"
            .link {
              font-weight: bold;
              &:hover {
                color: red;
                text-decoration: underline;
              }
            }
        "#]]
        .assert_eq(&output);
    }

    #[test]
    fn test_user_function_and_control_flow() {
        let mut compilation = Compilation::default();
        let output = compile(
            &mut compilation,
            "/app.mcss",
            vec![
                build::function(
                    "double",
                    ParameterList::new(vec![build::param("$n")], None),
                    vec![build::return_value(build::binary(
                        BinaryOp::Mul,
                        build::var("$n"),
                        build::num(2.0, ""),
                    ))],
                ),
                build::for_range(
                    "$i",
                    build::num(1.0, ""),
                    build::num(2.0, ""),
                    true,
                    vec![build::rule(
                        build::selector(vec![jz_ast::SelectorComponent::Type("h1".to_string())]),
                        vec![build::decl(
                            "margin",
                            build::call("double", vec![build::var("$i")]),
                        )],
                    )],
                ),
                build::if_block(
                    build::boolean(false),
                    vec![build::decl("display", build::ident("none"))],
                ),
                build::else_block(vec![build::decl("display", build::ident("block"))]),
            ],
        );

        expect![[r#"
            h1 {
              margin: 2;
            }
            h1 {
              margin: 4;
            }
            display: block;
        "#]]
        .assert_eq(&output);
    }

    #[test]
    fn test_loop_frames_are_reused() {
        let mut compilation = Compilation::default();
        compile(
            &mut compilation,
            "/grid.mcss",
            vec![
                build::function(
                    "double",
                    ParameterList::new(vec![build::param("$n")], None),
                    vec![build::return_value(build::binary(
                        BinaryOp::Mul,
                        build::var("$n"),
                        build::num(2.0, ""),
                    ))],
                ),
                build::class_rule(
                    "grid",
                    vec![build::for_range(
                        "$i",
                        build::num(1.0, ""),
                        build::num(200.0, ""),
                        true,
                        vec![build::decl("--cell", build::call("double", vec![build::var("$i")]))],
                    )],
                ),
            ],
        );

        let allocated = compilation.scopes().allocated();
        assert!(allocated < 10, "{allocated} frames for a 200 step loop");
    }

    #[test]
    fn test_structural_misuse() {
        let cases = vec![
            (build::return_value(build::num(1.0, "")), "@return is only allowed in a function body"),
            (build::content(), "@content is only allowed in a mixin body"),
            (
                build::compose(&["base"], None),
                "@compose is only allowed in a top-level single class rule",
            ),
            (build::else_block(vec![]), "@else must follow an @if or @else if"),
        ];

        for (node, message) in cases {
            let mut compilation = Compilation::default();
            let error = compilation
                .compile(Path::new("/app.mcss"), &Stylesheet::new(vec![node]), &[])
                .unwrap_err();
            assert_eq!(error.to_string(), message);
        }
    }

    #[test]
    fn test_exports_are_processed_after_the_walk() {
        let mut compilation = Compilation::default();
        compile(
            &mut compilation,
            "/app.mcss",
            vec![
                build::export(&[("$late", Some("$value"))], None),
                build::decl("$late", build::num(1.0, "em")),
                build::class_rule("card", vec![]),
            ],
        );

        let exports = compilation.exports_of(Path::new("/app.mcss")).unwrap();
        let names: Vec<_> = exports.names().collect();
        assert_eq!(names, vec!["card", "$value"]);
        assert!(matches!(exports.get("card"), Some(Export::Class(_))));
    }

    #[test]
    fn test_plain_css_keeps_class_names() {
        let options = CompileOptions {
            class_name_template: "x-[name]".to_string(),
            ..CompileOptions::default()
        };
        let mut compilation = Compilation::new(options);
        let output = compile(
            &mut compilation,
            "/reset.css",
            vec![build::class_rule("a", vec![build::decl("margin", build::num(0.0, ""))])],
        );

        assert_eq!(output, ".a {\n  margin: 0;\n}\n");
        assert!(compilation.exports_of(Path::new("/reset.css")).unwrap().is_empty());
    }
}
