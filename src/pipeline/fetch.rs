//! Template fetch: bring `bucket/key` into the scratch directory.
//!
//! Each run loads its template from its own `<id>.template.pptx`, so runs
//! sharing a scratch directory never read or delete each other's files.
//! A copy named after the key's basename may be kept for later runs: when it
//! exists it is hard-linked (or copied) into place and no storage call is
//! made. Downloads land in the run's `<id>.part` first and are renamed into
//! place, so a crashed download never looks like a finished template.

use crate::error::CertgenError;
use crate::pipeline::scratch::{ArtifactKind, Scratch};
use crate::storage::ObjectStore;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of [`Fetcher::fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedTemplate {
    /// The run's working copy.
    pub path: PathBuf,
    /// `true` when an existing shared copy was used.
    pub reused: bool,
    /// Bytes downloaded; 0 when reused.
    pub bytes: u64,
    /// `true` when a shared copy exists for later runs after this fetch.
    pub shared: bool,
}

/// Local files involved in fetching one run's template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePaths {
    /// `<dir>/<basename of key>`, shared by every run of that template.
    pub shared: PathBuf,
    /// `<dir>/<id>.template.pptx`, the copy this run loads.
    pub working: PathBuf,
    /// `<dir>/<id>.part`, this run's download or link in progress.
    pub partial: PathBuf,
}

impl TemplatePaths {
    pub fn for_run(scratch: &Scratch, key: &str) -> Result<Self, CertgenError> {
        Ok(Self {
            shared: local_path_for(scratch.dir(), key)?,
            working: scratch.path_for(ArtifactKind::TemplateCopy),
            partial: scratch.path_for(ArtifactKind::Partial),
        })
    }
}

/// Local path of the shared template copy for `key` inside `dir`.
///
/// The key's last `/`-separated segment is used; keys without a usable
/// basename are configuration errors.
pub fn local_path_for(dir: &Path, key: &str) -> Result<PathBuf, CertgenError> {
    let name = key.rsplit('/').next().unwrap_or_default();
    if name.is_empty() || name == "." || name == ".." || name.contains('\\') {
        return Err(CertgenError::Config(format!(
            "template key '{key}' has no usable file name"
        )));
    }
    Ok(dir.join(name))
}

/// Hard-link `from` to `to`, copying when linking is not possible.
/// An existing `to` is replaced.
async fn link_or_copy(from: &Path, to: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(to).await {
        Err(e) if e.kind() != ErrorKind::NotFound => return Err(e),
        _ => {}
    }
    match tokio::fs::hard_link(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(e),
        Err(e) => {
            debug!("Hard link {} failed ({}), copying", to.display(), e);
            tokio::fs::copy(from, to).await.map(|_| ())
        }
    }
}

/// Downloads templates from one bucket.
pub struct Fetcher<'a> {
    store: &'a dyn ObjectStore,
    bucket: &'a str,
}

impl<'a> Fetcher<'a> {
    pub fn new(store: &'a dyn ObjectStore, bucket: &'a str) -> Self {
        Self { store, bucket }
    }

    /// Bring `key` to `paths.working`, reusing `paths.shared` when present.
    ///
    /// With `keep_shared`, a downloaded template is also published at
    /// `paths.shared` for later runs.
    pub async fn fetch(
        &self,
        key: &str,
        paths: &TemplatePaths,
        keep_shared: bool,
    ) -> Result<FetchedTemplate, CertgenError> {
        if tokio::fs::try_exists(&paths.shared).await.unwrap_or(false) {
            match link_or_copy(&paths.shared, &paths.working).await {
                Ok(()) => {
                    info!("'{}' already exists, reusing local copy", paths.shared.display());
                    return Ok(FetchedTemplate {
                        path: paths.working.clone(),
                        reused: true,
                        bytes: 0,
                        shared: true,
                    });
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!("'{}' vanished, downloading instead", paths.shared.display());
                }
                Err(source) => {
                    return Err(CertgenError::Scratch {
                        path: paths.working.clone(),
                        source,
                    })
                }
            }
        }

        info!("Downloading {}/{}", self.bucket, key);
        let bytes = self
            .store
            .download(self.bucket, key, &paths.partial)
            .await
            .map_err(|source| CertgenError::Fetch {
                key: key.to_string(),
                source,
            })?;

        tokio::fs::rename(&paths.partial, &paths.working)
            .await
            .map_err(|source| CertgenError::Scratch {
                path: paths.working.clone(),
                source,
            })?;
        debug!("Template stored at {} ({} bytes)", paths.working.display(), bytes);

        let shared = keep_shared && share(paths).await;
        Ok(FetchedTemplate {
            path: paths.working.clone(),
            reused: false,
            bytes,
            shared,
        })
    }
}

/// Publish the working copy at the shared path. The link is staged at the
/// run's partial path and renamed over the shared name, so other runs only
/// ever see a complete file.
async fn share(paths: &TemplatePaths) -> bool {
    let result = async {
        link_or_copy(&paths.working, &paths.partial).await?;
        tokio::fs::rename(&paths.partial, &paths.shared).await
    }
    .await;
    match result {
        Ok(()) => {
            debug!("Template kept at {}", paths.shared.display());
            true
        }
        Err(e) => {
            warn!(
                "Could not keep template copy at {}: {}",
                paths.shared.display(),
                e
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ArtifactId;
    use crate::storage::{LocalStore, StorageError};

    fn run_paths(scratch: &Path, id: &str) -> TemplatePaths {
        let scratch = Scratch::new(scratch, ArtifactId::parse(id).unwrap()).unwrap();
        TemplatePaths::for_run(&scratch, "templates/t.pptx").unwrap()
    }

    fn object_store(body: &[u8]) -> (tempfile::TempDir, LocalStore) {
        let objects = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(objects.path().join("public/templates")).unwrap();
        std::fs::write(objects.path().join("public/templates/t.pptx"), body).unwrap();
        let store = LocalStore::new(objects.path());
        (objects, store)
    }

    #[test]
    fn local_path_uses_basename() {
        let dir = Path::new("/tmp");
        assert_eq!(
            local_path_for(dir, "templates/2025/cert_template.pptx").unwrap(),
            PathBuf::from("/tmp/cert_template.pptx")
        );
        assert!(local_path_for(dir, "templates/").is_err());
        assert!(local_path_for(dir, "..").is_err());
        assert!(local_path_for(dir, "").is_err());
    }

    #[test]
    fn run_paths_are_per_artifact() {
        let scratch = tempfile::tempdir().unwrap();
        let a = run_paths(scratch.path(), "a");
        let b = run_paths(scratch.path(), "b");
        assert_eq!(a.shared, b.shared);
        assert_eq!(a.shared, scratch.path().join("t.pptx"));
        assert_eq!(a.working, scratch.path().join("a.template.pptx"));
        assert_eq!(a.partial, scratch.path().join("a.part"));
        assert_ne!(a.working, b.working);
        assert_ne!(a.partial, b.partial);
    }

    #[tokio::test]
    async fn download_without_sharing_leaves_only_the_working_copy() {
        let (_objects, store) = object_store(b"PK..");
        let scratch = tempfile::tempdir().unwrap();
        let paths = run_paths(scratch.path(), "run1");

        let fetched = Fetcher::new(&store, "public")
            .fetch("templates/t.pptx", &paths, false)
            .await
            .unwrap();
        assert!(!fetched.reused && !fetched.shared);
        assert_eq!(fetched.bytes, 4);
        assert_eq!(fetched.path, paths.working);
        assert!(paths.working.exists());
        assert!(!paths.partial.exists());
        assert!(!paths.shared.exists());
    }

    #[tokio::test]
    async fn shared_copy_serves_later_runs() {
        let (objects, store) = object_store(b"PK..");
        let scratch = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(&store, "public");

        let first = run_paths(scratch.path(), "run1");
        let fetched = fetcher.fetch("templates/t.pptx", &first, true).await.unwrap();
        assert!(fetched.shared);
        assert_eq!(std::fs::read(&first.shared).unwrap(), b"PK..");
        assert!(!first.partial.exists());

        std::fs::remove_file(objects.path().join("public/templates/t.pptx")).unwrap();
        let second = run_paths(scratch.path(), "run2");
        let fetched = fetcher.fetch("templates/t.pptx", &second, false).await.unwrap();
        assert!(fetched.reused);
        assert_eq!(fetched.bytes, 0);
        assert_eq!(std::fs::read(&second.working).unwrap(), b"PK..");

        // Removing one run's copy leaves the other files intact.
        std::fs::remove_file(&first.working).unwrap();
        assert!(first.shared.exists() && second.working.exists());
    }

    #[tokio::test]
    async fn missing_object_is_fetch_error() {
        let objects = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let store = LocalStore::new(objects.path());
        let err = Fetcher::new(&store, "public")
            .fetch("nope.pptx", &run_paths(scratch.path(), "run1"), false)
            .await
            .unwrap_err();
        match err {
            CertgenError::Fetch { key, source } => {
                assert_eq!(key, "nope.pptx");
                assert!(matches!(source, StorageError::NotFound { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
