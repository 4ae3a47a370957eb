//! Git repository wrapper

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use git2::Repository;
use keysmith_credentials::Vcs;
use tracing::{debug, instrument, warn};

use crate::{GitError, Result};

/// Repository discovered from the project directory
pub struct GitRepo {
    // git2::Repository is Send but not Sync
    repo: Mutex<Repository>,
    workdir: PathBuf,
}

impl std::fmt::Debug for GitRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepo")
            .field("workdir", &self.workdir)
            .finish()
    }
}

impl GitRepo {
    /// Discover and open a repository by searching parent directories
    #[instrument(fields(start_path = %start_path.display()))]
    pub fn discover(start_path: &Path) -> Result<Self> {
        let repo = Repository::discover(start_path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                GitError::NotARepository(start_path.to_path_buf())
            } else {
                GitError::OpenFailed(e.to_string())
            }
        })?;

        // Bare repositories have no work tree to protect
        let workdir = repo
            .workdir()
            .ok_or_else(|| GitError::NotARepository(start_path.to_path_buf()))?;
        let workdir = workdir.canonicalize().unwrap_or_else(|_| workdir.to_path_buf());
        debug!(workdir = %workdir.display(), "discovered git repository");

        Ok(Self {
            repo: Mutex::new(repo),
            workdir,
        })
    }

    /// Root of the work tree
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Express `path` relative to the work tree
    fn relative(&self, path: &Path) -> Result<PathBuf> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workdir.join(path)
        };
        let resolved = canonicalize_lenient(&absolute);

        resolved
            .strip_prefix(&self.workdir)
            .map(Path::to_path_buf)
            .map_err(|_| GitError::OutsideRepository(path.to_path_buf()))
    }

    fn with_repo<T>(&self, f: impl FnOnce(&Repository) -> Result<T>) -> Result<T> {
        let repo = self
            .repo
            .lock()
            .map_err(|_| GitError::OpenFailed("repository lock poisoned".to_string()))?;
        f(&repo)
    }

    /// Whether the ignore rules match `path`
    pub fn is_path_ignored(&self, path: &Path) -> Result<bool> {
        let relative = self.relative(path)?;
        self.with_repo(|repo| Ok(repo.is_path_ignored(&relative)?))
    }

    /// Whether `path` is already in the index
    pub fn is_tracked(&self, path: &Path) -> Result<bool> {
        let relative = self.relative(path)?;
        self.with_repo(|repo| {
            let index = repo.index()?;
            Ok(index.get_path(&relative, 0).is_some())
        })
    }
}

/// Canonicalize the longest existing ancestor so paths that are about to
/// be written still resolve through symlinks such as `/var -> /private/var`
fn canonicalize_lenient(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => canonicalize_lenient(parent).join(name),
        _ => path.to_path_buf(),
    }
}

impl Vcs for GitRepo {
    fn is_ignored(&self, path: &Path) -> bool {
        match self.relative(path) {
            Err(_) => true,
            Ok(_) => {
                let tracked = self.is_tracked(path).unwrap_or(false);
                let ignored = self.is_path_ignored(path).unwrap_or_else(|e| {
                    warn!(path = %path.display(), error = %e, "could not check ignore rules");
                    false
                });
                ignored && !tracked
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, GitRepo) {
        let temp = TempDir::new().unwrap();
        Repository::init(temp.path()).unwrap();
        std::fs::write(temp.path().join(".gitignore"), "*.jks\nsecrets/\n").unwrap();
        let repo = GitRepo::discover(temp.path()).unwrap();
        (temp, repo)
    }

    #[test]
    fn test_discover_repo() {
        let (temp, _) = init_repo();
        let subdir = temp.path().join("sub").join("dir");
        std::fs::create_dir_all(&subdir).unwrap();

        let repo = GitRepo::discover(&subdir).unwrap();
        assert_eq!(repo.workdir(), temp.path().canonicalize().unwrap());
    }

    #[test]
    fn test_not_a_repo() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            GitRepo::discover(temp.path()),
            Err(GitError::NotARepository(_))
        ));
    }

    #[test]
    fn test_ignore_rules() {
        let (temp, repo) = init_repo();

        assert!(repo.is_ignored(&temp.path().join("release.jks")));
        assert!(repo.is_ignored(&temp.path().join("secrets").join("dist.p12")));
        assert!(!repo.is_ignored(&temp.path().join("credentials.json")));
        assert!(repo.is_ignored(Path::new("upload.jks")));
    }

    #[test]
    fn test_tracked_file_is_not_protected() {
        let (temp, _) = init_repo();
        std::fs::write(temp.path().join("release.jks"), b"keystore").unwrap();
        {
            let inner = Repository::open(temp.path()).unwrap();
            let mut index = inner.index().unwrap();
            index.add_path(Path::new("release.jks")).unwrap();
            index.write().unwrap();
        }

        let repo_again = GitRepo::discover(temp.path()).unwrap();
        assert!(repo_again.is_tracked(Path::new("release.jks")).unwrap());
        assert!(!repo_again.is_ignored(&temp.path().join("release.jks")));
    }

    #[test]
    fn test_path_outside_repository_is_safe() {
        let (_temp, repo) = init_repo();
        let elsewhere = TempDir::new().unwrap();
        assert!(repo.is_ignored(&elsewhere.path().join("credentials.json")));
        assert!(matches!(
            repo.is_tracked(&elsewhere.path().join("credentials.json")),
            Err(GitError::OutsideRepository(_))
        ));
    }
}
