//! Dependency discovery for one module
//!
//! Every at-rule that references another module is resolved through the
//! module's [`Resolver`]. Synchronous answers are recorded right away, pending
//! ones are spawned on a [`JoinSet`] and joined before the edges are reported,
//! in at-rule order.

use crate::error::{DependencyError, DependencyErrors};
use crate::graph::{DependencyEdge, EdgeKind};
use crate::resolver::{Resolution, Resolver};
use indexmap::IndexMap;
use jz_ast::{AtRule, AtRuleKind, Stylesheet, walk_at_rules};
use jz_module::ModuleType;
use jz_span::FileSpan;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::{Id, JoinSet};

/// At-rules rejected in plain CSS modules
pub const NOT_ALLOWED_IN_CSS: [&str; 10] = [
    "use", "export", "compose", "return", "else", "function", "mixin", "include", "if", "else if",
];

/// Module whose dependencies are discovered
#[derive(Clone)]
pub struct ModuleDescriptor {
    /// Module identifier
    pub path: PathBuf,
    /// Evaluation mode, decides which at-rules are legal
    pub module_type: ModuleType,
    /// Resolver for the module's requests
    pub resolver: Arc<dyn Resolver>,
}

impl ModuleDescriptor {
    /// Descriptor with the module type inferred from the file name
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, resolver: Arc<dyn Resolver>) -> Self {
        let path = path.into();
        Self {
            module_type: ModuleType::infer(&path),
            path,
            resolver,
        }
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("path", &self.path)
            .field("module_type", &self.module_type)
            .finish_non_exhaustive()
    }
}

/// Options of the discovery
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoverOptions {
    /// Report the first failure and abort outstanding resolutions
    pub fail_fast: bool,
}

/// A referencing at-rule waiting for its target
#[derive(Debug)]
struct Request {
    request: String,
    kind: EdgeKind,
    span: FileSpan,
}

/// Request and edge kind of a referencing at-rule
fn referenced(at_rule: &AtRule) -> Option<(&str, EdgeKind)> {
    match &at_rule.kind {
        AtRuleKind::Import(import) => Some((&import.request, EdgeKind::Import)),
        AtRuleKind::Export(export) => Some((export.request.as_deref()?, EdgeKind::Export)),
        AtRuleKind::Compose(compose) => Some((compose.request.as_deref()?, EdgeKind::Compose)),
        AtRuleKind::Use(use_rule) if !use_rule.is_builtin() => {
            Some((&use_rule.request, EdgeKind::Use))
        }
        AtRuleKind::IcssImport(icss) => Some((&icss.request, EdgeKind::IcssImport)),
        _ => None,
    }
}

/// Collects the referencing at-rules of `stylesheet`, rejecting the ones the
/// module type forbids
fn collect(
    module: &ModuleDescriptor,
    stylesheet: &Stylesheet,
) -> Vec<Result<Request, DependencyError>> {
    let mut requests = Vec::new();
    walk_at_rules(stylesheet, |at_rule| {
        if module.module_type == ModuleType::PlainCss
            && NOT_ALLOWED_IN_CSS.contains(&at_rule.name.as_str())
        {
            requests.push(Err(DependencyError::NotAllowed {
                name: at_rule.name.clone(),
                span: at_rule.span,
            }));
        } else if let Some((request, kind)) = referenced(at_rule) {
            requests.push(Ok(Request {
                request: request.to_string(),
                kind,
                span: at_rule.span,
            }));
        }
    });
    requests
}

fn settle(
    from: &Path,
    request: &Request,
    outcome: anyhow::Result<Option<PathBuf>>,
) -> Result<DependencyEdge, DependencyError> {
    match outcome {
        Ok(Some(target)) => {
            tracing::debug!(request = %request.request, target = %target.display(), "resolved");
            Ok(DependencyEdge {
                from: from.to_path_buf(),
                request: request.request.clone(),
                target,
                kind: request.kind,
                span: request.span,
            })
        }
        Ok(None) => Err(DependencyError::Unresolvable {
            request: request.request.clone(),
            from: from.to_path_buf(),
            span: request.span,
        }),
        Err(error) => Err(DependencyError::Rejected {
            request: request.request.clone(),
            from: from.to_path_buf(),
            message: format!("{error:#}"),
            span: request.span,
        }),
    }
}

/// Resolves every module reference of `stylesheet`
///
/// Pending resolutions run as tasks on the current tokio runtime.
///
/// # Errors
///
/// Returns every failure in at-rule order, or only the first one with
/// [`DiscoverOptions::fail_fast`].
#[tracing::instrument(level = "debug", skip_all, fields(module = %module.path.display()))]
pub async fn discover(
    module: &ModuleDescriptor,
    stylesheet: &Stylesheet,
    options: DiscoverOptions,
) -> Result<Vec<DependencyEdge>, DependencyErrors> {
    let fail = |error: DependencyError| DependencyErrors {
        module: module.path.clone(),
        errors: vec![error],
    };

    let collected = collect(module, stylesheet);
    let mut outcomes: Vec<Option<Result<DependencyEdge, DependencyError>>> =
        Vec::with_capacity(collected.len());
    let mut requests: Vec<Option<Request>> = Vec::with_capacity(collected.len());
    let mut tasks = JoinSet::new();
    // Task to at-rule position, also known for tasks that panicked
    let mut positions: IndexMap<Id, usize> = IndexMap::new();

    for (index, entry) in collected.into_iter().enumerate() {
        let outcome = match entry {
            Err(error) => Some(Err(error)),
            Ok(request) => match module.resolver.resolve(&module.path, &request.request) {
                Resolution::Resolved(target) => Some(settle(&module.path, &request, Ok(Some(target)))),
                Resolution::Unresolved => Some(settle(&module.path, &request, Ok(None))),
                Resolution::Pending(pending) => {
                    let handle = tasks.spawn(pending);
                    positions.insert(handle.id(), index);
                    requests.push(Some(request));
                    outcomes.push(None);
                    continue;
                }
            },
        };

        match outcome {
            Some(Err(error)) if options.fail_fast => {
                tasks.abort_all();
                return Err(fail(error));
            }
            outcome => {
                requests.push(None);
                outcomes.push(outcome);
            }
        }
    }

    while let Some(joined) = tasks.join_next_with_id().await {
        let (id, outcome) = match joined {
            Ok((id, outcome)) => (id, outcome),
            Err(error) => (error.id(), Err(anyhow::anyhow!("{error}"))),
        };
        let Some(&index) = positions.get(&id) else {
            continue;
        };
        let Some(request) = requests[index].take() else {
            continue;
        };

        match settle(&module.path, &request, outcome) {
            Err(error) if options.fail_fast => {
                tasks.abort_all();
                return Err(fail(error));
            }
            settled => outcomes[index] = Some(settled),
        }
    }

    // Every task was joined, anything left never reported back
    for (index, request) in requests.into_iter().enumerate() {
        if let Some(request) = request {
            outcomes[index] = Some(Err(DependencyError::Rejected {
                request: request.request,
                from: module.path.clone(),
                message: "resolution did not complete".to_string(),
                span: request.span,
            }));
        }
    }

    let mut edges = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();
    for outcome in outcomes.into_iter().flatten() {
        match outcome {
            Ok(edge) => edges.push(edge),
            Err(error) => errors.push(error),
        }
    }

    if errors.is_empty() {
        tracing::debug!(edges = edges.len(), "dependencies discovered");
        Ok(edges)
    } else {
        tracing::debug!(errors = errors.len(), "dependency discovery failed");
        Err(DependencyErrors {
            module: module.path.clone(),
            errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jz_ast::{ParameterList, build};
    use std::time::Duration;

    fn resolve_known(_: &Path, request: &str) -> Resolution {
        match request {
            "./theme" => Resolution::Resolved(PathBuf::from("/src/theme.mcss")),
            "./slow" => Resolution::pending(async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(Some(PathBuf::from("/src/slow.mcss")))
            }),
            "./broken" => Resolution::pending(async { Err(anyhow::anyhow!("permission denied")) }),
            "./later-missing" => Resolution::pending(async { Ok(None) }),
            "./crashing" => Resolution::pending(crash()),
            _ => Resolution::Unresolved,
        }
    }

    async fn crash() -> anyhow::Result<Option<PathBuf>> {
        panic!("resolver crashed")
    }

    fn descriptor(path: &str) -> ModuleDescriptor {
        ModuleDescriptor::new(path, Arc::new(resolve_known))
    }

    #[tokio::test]
    async fn test_edges_keep_at_rule_order() {
        let stylesheet = Stylesheet::new(vec![
            build::import(&[("$slow", None)], "./slow"),
            build::use_module("math", None),
            build::class_rule("button", vec![build::compose(&["base"], Some("./theme"))]),
            build::export(&[("$a", None)], None),
        ]);

        let edges = discover(&descriptor("/src/app.mcss"), &stylesheet, DiscoverOptions::default())
            .await
            .unwrap();

        let summary: Vec<_> = edges
            .iter()
            .map(|edge| (edge.kind, edge.target.display().to_string()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (EdgeKind::Import, "/src/slow.mcss".to_string()),
                (EdgeKind::Compose, "/src/theme.mcss".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_failures_are_aggregated() {
        let stylesheet = Stylesheet::new(vec![
            build::import(&[("$a", None)], "./missing"),
            build::import(&[("$b", None)], "./broken"),
            build::import(&[("$c", None)], "./theme"),
            build::use_module("./later-missing", None),
        ]);

        let errors = discover(&descriptor("/src/app.mcss"), &stylesheet, DiscoverOptions::default())
            .await
            .unwrap_err();

        let messages: Vec<_> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "Unable to locate \"./missing\" from \"/src/app.mcss\"",
                "Failed to resolve \"./broken\" from \"/src/app.mcss\": permission denied",
                "Unable to locate \"./later-missing\" from \"/src/app.mcss\"",
            ]
        );
    }

    #[tokio::test]
    async fn test_panicking_resolution_blames_its_own_request() {
        let stylesheet = Stylesheet::new(vec![
            build::import(&[("$slow", None)], "./slow"),
            build::import(&[("$a", None)], "./broken"),
            build::import(&[("$b", None)], "./crashing"),
            build::import(&[("$c", None)], "./later-missing"),
        ]);

        let errors = discover(&descriptor("/src/app.mcss"), &stylesheet, DiscoverOptions::default())
            .await
            .unwrap_err();

        let failures: Vec<_> = errors
            .iter()
            .map(|error| match error {
                DependencyError::Rejected {
                    request, message, ..
                } => (request.as_str(), message.contains("panicked")),
                DependencyError::Unresolvable { request, .. } => (request.as_str(), false),
                DependencyError::NotAllowed { .. } => panic!("unexpected {error}"),
            })
            .collect();
        assert_eq!(
            failures,
            vec![("./broken", false), ("./crashing", true), ("./later-missing", false)]
        );
    }

    #[tokio::test]
    async fn test_fail_fast_reports_first_failure() {
        let stylesheet = Stylesheet::new(vec![
            build::import(&[("$slow", None)], "./slow"),
            build::import(&[("$a", None)], "./missing"),
            build::import(&[("$b", None)], "./other-missing"),
        ]);

        let errors = discover(
            &descriptor("/src/app.mcss"),
            &stylesheet,
            DiscoverOptions { fail_fast: true },
        )
        .await
        .unwrap_err();

        assert_eq!(errors.errors.len(), 1);
        assert_eq!(
            errors.first().unwrap().to_string(),
            "Unable to locate \"./missing\" from \"/src/app.mcss\""
        );
    }

    #[tokio::test]
    async fn test_plain_css_rejects_preprocessor_rules() {
        let stylesheet = Stylesheet::new(vec![
            build::icss_import("./theme", &[("primary", "primary")]),
            build::mixin("button", ParameterList::default(), vec![]),
            build::class_rule("a", vec![build::include("button", build::args(vec![], vec![]), None)]),
        ]);

        let errors = discover(&descriptor("/src/reset.css"), &stylesheet, DiscoverOptions::default())
            .await
            .unwrap_err();

        let messages: Vec<_> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "At rule mixin is not allowed in css files",
                "At rule include is not allowed in css files",
            ]
        );
    }
}
