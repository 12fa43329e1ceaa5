//! Dependency discovery against real files

use jz_ast::{Stylesheet, build};
use jz_graph::{DiscoverOptions, EdgeKind, FsResolver, ModuleDescriptor, discover};
use std::fs;
use std::sync::Arc;

#[tokio::test]
async fn test_fs_resolver_finds_module_files() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("app.mcss"), "")?;
    fs::write(dir.path().join("theme.module.mcss"), "")?;
    fs::create_dir(dir.path().join("shared"))?;
    fs::write(dir.path().join("shared").join("reset.css"), "")?;

    let stylesheet = Stylesheet::new(vec![
        build::import(&[("$gap", None)], "./theme"),
        build::icss_import("./shared/reset.css", &[("$reset", "reset")]),
        build::use_module("math", None),
    ]);
    let module = ModuleDescriptor::new(dir.path().join("app.mcss"), Arc::new(FsResolver::default()));

    let edges = discover(&module, &stylesheet, DiscoverOptions::default())
        .await
        .map_err(|errors| anyhow::anyhow!("{errors}"))?;

    let found: Vec<_> = edges
        .iter()
        .map(|edge| {
            (
                edge.kind,
                edge.target.file_name().and_then(|name| name.to_str()).map(str::to_string),
            )
        })
        .collect();
    assert_eq!(
        found,
        vec![
            (EdgeKind::Import, Some("theme.module.mcss".to_string())),
            (EdgeKind::IcssImport, Some("reset.css".to_string())),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_fs_resolver_reports_missing_files() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let from = dir.path().join("app.mcss");
    fs::write(&from, "")?;

    let stylesheet = Stylesheet::new(vec![
        build::import(&[("$a", None)], "./absent"),
        build::import(&[("$b", None)], "bare-package"),
    ]);
    let module = ModuleDescriptor::new(from.clone(), Arc::new(FsResolver::default()));

    let errors = discover(&module, &stylesheet, DiscoverOptions::default())
        .await
        .expect_err("both requests are unresolvable");

    let messages: Vec<_> = errors.iter().map(ToString::to_string).collect();
    assert_eq!(
        messages,
        vec![
            format!("Unable to locate \"./absent\" from \"{}\"", from.display()),
            format!("Unable to locate \"bare-package\" from \"{}\"", from.display()),
        ]
    );
    Ok(())
}
