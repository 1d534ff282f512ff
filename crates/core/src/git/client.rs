//! Local Git repository access via `git2`, and the local [`RevisionSource`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use git2::{Commit, ErrorCode, ObjectType, Oid, Repository};
use tracing::{debug, info, instrument};

use crate::errors::{GitError, SourceError};
use crate::source::{decode_text, Comparison, RevisionSource};

const FILEMODE_LINK: i32 = 0o120000;

/// Read-only client wrapping a `git2::Repository`.
pub struct GitClient {
    repo: Repository,
    repo_path: PathBuf,
}

impl GitClient {
    /// Open an existing Git repository at `repo_path`.
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Result<Self, GitError> {
        let path = repo_path.as_ref();
        debug!(path = %path.display(), "opening git repository");
        let repo = Repository::open(path)
            .map_err(|_| GitError::RepositoryNotFound(path.display().to_string()))?;
        Ok(Self {
            repo,
            repo_path: path.to_path_buf(),
        })
    }

    /// Open the repository containing `path`, searching parent directories.
    pub fn discover<P: AsRef<Path>>(path: P) -> Result<Self, GitError> {
        let path = path.as_ref();
        let repo = Repository::discover(path)
            .map_err(|_| GitError::RepositoryNotFound(path.display().to_string()))?;
        let repo_path = repo.path().to_path_buf();
        info!(path = %repo_path.display(), "discovered git repository");
        Ok(Self { repo, repo_path })
    }

    /// Path of the repository's git directory.
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Resolve a branch, tag, or SHA to a commit.
    pub fn resolve_commit(&self, rev: &str) -> Result<Commit<'_>, GitError> {
        self.repo
            .revparse_single(rev)
            .and_then(|obj| obj.peel_to_commit())
            .map_err(|_| GitError::RefNotFound(rev.to_string()))
    }

    /// The best common ancestor of two revisions.
    #[instrument(skip(self))]
    pub fn merge_base(&self, base: &str, head: &str) -> Result<Oid, GitError> {
        let base_id = self.resolve_commit(base)?.id();
        let head_id = self.resolve_commit(head)?.id();
        match self.repo.merge_base(base_id, head_id) {
            Ok(oid) => Ok(oid),
            Err(e) if e.code() == ErrorCode::NotFound => Err(GitError::NoMergeBase {
                base: base.to_string(),
                head: head.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Paths that differ between the trees of two commits, in diff order.
    /// Renames are reported as a deletion plus an addition.
    #[instrument(skip(self))]
    pub fn changed_files(&self, from: Oid, to: Oid) -> Result<Vec<String>, GitError> {
        let old_tree = self.repo.find_commit(from)?.tree()?;
        let new_tree = self.repo.find_commit(to)?.tree()?;
        let diff = self
            .repo
            .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), None)?;

        let files: Vec<String> = diff
            .deltas()
            .filter_map(|delta| {
                delta
                    .new_file()
                    .path()
                    .or_else(|| delta.old_file().path())
                    .map(|p| p.to_string_lossy().into_owned())
            })
            .collect();
        debug!(count = files.len(), "listed changed files");
        Ok(files)
    }

    /// Raw content of `path` at `rev`, or `None` if no regular file exists
    /// there.
    pub fn read_file(&self, path: &str, rev: &str) -> Result<Option<Vec<u8>>, GitError> {
        let tree = self.resolve_commit(rev)?.tree()?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if entry.kind() != Some(ObjectType::Blob) || entry.filemode() == FILEMODE_LINK {
            return Ok(None);
        }
        let blob = self.repo.find_blob(entry.id())?;
        Ok(Some(blob.content().to_vec()))
    }
}

// ---------------------------------------------------------------------------
// RevisionSource
// ---------------------------------------------------------------------------

/// A [`RevisionSource`] reading a local repository.
///
/// `git2` is blocking, so every call opens the repository on a blocking
/// worker; concurrent fetches do not contend on a shared handle.
#[derive(Debug, Clone)]
pub struct LocalRepoSource {
    repo_path: PathBuf,
}

impl LocalRepoSource {
    /// Open the repository containing `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GitError> {
        let client = GitClient::discover(path)?;
        Ok(Self {
            repo_path: client.repo_path().to_path_buf(),
        })
    }

    async fn with_client<T, F>(&self, f: F) -> Result<T, SourceError>
    where
        T: Send + 'static,
        F: FnOnce(&GitClient) -> Result<T, SourceError> + Send + 'static,
    {
        let path = self.repo_path.clone();
        tokio::task::spawn_blocking(move || {
            let client = GitClient::new(&path)?;
            f(&client)
        })
        .await
        .map_err(|e| SourceError::TaskFailed(e.to_string()))?
    }
}

#[async_trait]
impl RevisionSource for LocalRepoSource {
    async fn compare(&self, base_ref: &str, head_ref: &str) -> Result<Comparison, SourceError> {
        let base_ref = base_ref.to_string();
        let head_ref = head_ref.to_string();
        self.with_client(move |client| {
            let merge_base = client.merge_base(&base_ref, &head_ref)?;
            let head = client.resolve_commit(&head_ref)?.id();
            let files = client.changed_files(merge_base, head)?;
            Ok(Comparison {
                merge_base_sha: merge_base.to_string(),
                files,
            })
        })
        .await
    }

    async fn fetch(&self, path: &str, rev: &str) -> Result<Option<String>, SourceError> {
        let path = path.to_string();
        let rev = rev.to_string();
        self.with_client(move |client| match client.read_file(&path, &rev)? {
            Some(bytes) => decode_text(bytes, &path, &rev).map(Some),
            None => Ok(None),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;

    /// Write `files` (path, content; `None` deletes) and commit on HEAD.
    fn commit(repo: &Repository, files: &[(&str, Option<&str>)], message: &str) -> Oid {
        let workdir = repo.workdir().unwrap().to_path_buf();
        let mut index = repo.index().unwrap();
        for (path, content) in files {
            let full = workdir.join(path);
            match content {
                Some(text) => {
                    std::fs::create_dir_all(full.parent().unwrap()).unwrap();
                    std::fs::write(&full, text).unwrap();
                    index.add_path(Path::new(path)).unwrap();
                }
                None => {
                    std::fs::remove_file(&full).unwrap();
                    index.remove_path(Path::new(path)).unwrap();
                }
            }
        }
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Test", "test@test.com").unwrap();
        let parent = repo.head().ok().map(|h| h.peel_to_commit().unwrap());
        let parents: Vec<&Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    #[test]
    fn test_read_file_and_absence() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let first = commit(&repo, &[("src/a.txt", Some("one\n"))], "first");
        let second = commit(&repo, &[("src/a.txt", None), ("b.txt", Some("two\n"))], "second");

        let client = GitClient::new(dir.path()).unwrap();
        let at_first = client.read_file("src/a.txt", &first.to_string()).unwrap();
        assert_eq!(at_first.as_deref(), Some(&b"one\n"[..]));
        assert!(client.read_file("src/a.txt", &second.to_string()).unwrap().is_none());
        assert!(client.read_file("b.txt", &first.to_string()).unwrap().is_none());
        // Directories are not files.
        assert!(client.read_file("src", &first.to_string()).unwrap().is_none());
    }

    #[test]
    fn test_changed_files() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let first = commit(&repo, &[("keep.txt", Some("k")), ("edit.txt", Some("1"))], "first");
        let second = commit(
            &repo,
            &[("edit.txt", Some("2")), ("new.txt", Some("n")), ("keep.txt", None)],
            "second",
        );

        let client = GitClient::new(dir.path()).unwrap();
        let mut files = client.changed_files(first, second).unwrap();
        files.sort();
        assert_eq!(files, ["edit.txt", "keep.txt", "new.txt"]);
    }

    #[test]
    fn test_merge_base_of_branches() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let root = commit(&repo, &[("f.txt", Some("a"))], "root");
        repo.branch("feature", &repo.find_commit(root).unwrap(), false)
            .unwrap();
        let tip = commit(&repo, &[("f.txt", Some("b"))], "main tip");

        let client = GitClient::new(dir.path()).unwrap();
        assert_eq!(client.merge_base(&tip.to_string(), "feature").unwrap(), root);
    }

    #[test]
    fn test_unknown_ref() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit(&repo, &[("f.txt", Some("a"))], "root");
        let client = GitClient::new(dir.path()).unwrap();
        assert!(matches!(
            client.read_file("f.txt", "no-such-branch"),
            Err(GitError::RefNotFound(_))
        ));
    }

    #[test]
    fn test_repo_not_found() {
        assert!(matches!(
            GitClient::new("/nonexistent"),
            Err(GitError::RepositoryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_local_source_rejects_binary() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        std::fs::write(dir.path().join("blob.bin"), [0xffu8, 0xfe, 0x00]).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("blob.bin")).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Test", "test@test.com").unwrap();
        let oid = repo.commit(Some("HEAD"), &sig, &sig, "bin", &tree, &[]).unwrap();

        let source = LocalRepoSource::open(dir.path()).unwrap();
        let err = source.fetch("blob.bin", &oid.to_string()).await.unwrap_err();
        assert!(matches!(err, SourceError::NotText { .. }));
        assert_eq!(source.fetch("missing.txt", &oid.to_string()).await.unwrap(), None);
    }
}
