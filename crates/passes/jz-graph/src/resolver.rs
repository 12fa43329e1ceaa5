//! Request resolution

use anyhow::Context;
use jz_module::EXTENSIONS;
use std::fmt;
use std::future::Future;
use std::io::ErrorKind;
use std::iter;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs;

/// Resolution that completes later; `Ok(None)` means nothing was found
pub type PendingResolution =
    Pin<Box<dyn Future<Output = anyhow::Result<Option<PathBuf>>> + Send + 'static>>;

/// Answer of a [`Resolver`]
pub enum Resolution {
    /// Target known right away
    Resolved(PathBuf),
    /// Target looked up asynchronously; the future may also fail
    Pending(PendingResolution),
    /// No target
    Unresolved,
}

impl Resolution {
    /// Wraps a future as a pending resolution
    #[must_use]
    pub fn pending(
        future: impl Future<Output = anyhow::Result<Option<PathBuf>>> + Send + 'static,
    ) -> Self {
        Self::Pending(Box::pin(future))
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(path) => f.debug_tuple("Resolved").field(path).finish(),
            Self::Pending(_) => f.write_str("Pending"),
            Self::Unresolved => f.write_str("Unresolved"),
        }
    }
}

/// Maps a request string found in `from` to a module identifier
pub trait Resolver: Send + Sync {
    /// Resolves `request` relative to the module `from`
    fn resolve(&self, from: &Path, request: &str) -> Resolution;
}

impl<F> Resolver for F
where
    F: Fn(&Path, &str) -> Resolution + Send + Sync,
{
    fn resolve(&self, from: &Path, request: &str) -> Resolution {
        self(from, request)
    }
}

/// Resolves relative and absolute requests against the file system
///
/// The request is tried as written, then with each extension appended. Bare
/// requests (package names) are left unresolved.
#[derive(Debug, Clone)]
pub struct FsResolver {
    extensions: Vec<String>,
}

impl Default for FsResolver {
    fn default() -> Self {
        Self::new(EXTENSIONS.iter().map(|extension| (*extension).to_string()).collect())
    }
}

impl FsResolver {
    /// Resolver trying `extensions` in order
    #[must_use]
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    /// Paths tried for `request`, most literal first
    #[must_use]
    pub fn candidates(&self, from: &Path, request: &str) -> Vec<PathBuf> {
        let base = from.parent().unwrap_or(Path::new("")).join(request);
        iter::once(base.clone())
            .chain(self.extensions.iter().map(|extension| {
                let mut name = base.clone().into_os_string();
                name.push(extension);
                PathBuf::from(name)
            }))
            .collect()
    }
}

impl Resolver for FsResolver {
    fn resolve(&self, from: &Path, request: &str) -> Resolution {
        let relative = request.starts_with("./") || request.starts_with("../");
        if !relative && !Path::new(request).is_absolute() {
            return Resolution::Unresolved;
        }

        let candidates = self.candidates(from, request);
        Resolution::pending(async move {
            for candidate in candidates {
                match fs::metadata(&candidate).await {
                    Ok(metadata) if metadata.is_file() => return Ok(Some(candidate)),
                    Ok(_) => {}
                    Err(error) if error.kind() == ErrorKind::NotFound => {}
                    Err(error) => {
                        return Err(error)
                            .with_context(|| format!("Failed to inspect {}", candidate.display()));
                    }
                }
            }
            Ok(None)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates() {
        let resolver = FsResolver::default();
        let candidates = resolver.candidates(Path::new("/src/app.mcss"), "./theme");
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/src/./theme"),
                PathBuf::from("/src/./theme.global.mcss"),
                PathBuf::from("/src/./theme.module.mcss"),
                PathBuf::from("/src/./theme.mcss"),
            ]
        );
    }

    #[test]
    fn test_bare_request_is_unresolved() {
        let resolver = FsResolver::default();
        assert!(matches!(
            resolver.resolve(Path::new("/src/app.mcss"), "normalize"),
            Resolution::Unresolved
        ));
    }

    #[tokio::test]
    async fn test_missing_file_resolves_to_none() {
        let resolver = FsResolver::default();
        let Resolution::Pending(pending) =
            resolver.resolve(Path::new("/nonexistent-jz-dir/app.mcss"), "./missing")
        else {
            panic!("expected a pending resolution");
        };
        assert!(pending.await.unwrap().is_none());
    }
}
