//! Local git repositories standing in for git registries.
//!
//! A [`GitRemote`] is a normal (non-bare) repository in a temporary
//! directory. Its path works as a registry url, so drivers exercise the real
//! libgit2 transport without a network.

use std::fs;
use std::path::Path;

use git2::{IndexAddOption, Oid, Repository, RepositoryInitOptions, Signature};
use tempfile::TempDir;

pub struct GitRemote {
    dir: TempDir,
    repo: Repository,
}

impl Default for GitRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl GitRemote {
    /// Initialise an empty repository whose initial branch is `main`.
    ///
    /// # Panics
    /// Panics if the repository cannot be created.
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("GitRemote: no temp dir: {e}"));
        let mut options = RepositoryInitOptions::new();
        options.initial_head("main");
        let repo = Repository::init_opts(dir.path(), &options)
            .unwrap_or_else(|e| panic!("GitRemote: failed to init repository: {e}"));
        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the repository as a registry url.
    pub fn url(&self) -> String {
        self.dir.path().to_string_lossy().into_owned()
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    fn signature() -> Signature<'static> {
        Signature::now("Test User", "test@test.com")
            .unwrap_or_else(|e| panic!("GitRemote: bad signature: {e}"))
    }

    /// Write files into the working tree and commit everything on the
    /// current branch.
    ///
    /// # Panics
    /// Panics if any filesystem or git operation fails.
    pub fn commit(&self, files: &[(&str, &str)], message: &str) -> Oid {
        for (path, content) in files {
            let target = self.path().join(path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&target, content).unwrap();
        }
        self.commit_all(message)
    }

    /// Delete files from the working tree and commit.
    pub fn remove(&self, paths: &[&str], message: &str) -> Oid {
        for path in paths {
            fs::remove_file(self.path().join(path)).unwrap();
        }
        self.commit_all(message)
    }

    fn commit_all(&self, message: &str) -> Oid {
        let mut index = self.repo.index().unwrap();
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .unwrap();
        index.update_all(["*"].iter(), None).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();

        let signature = Self::signature();
        let parent = self
            .repo
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok());
        let parents: Vec<_> = parent.iter().collect();
        self.repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .unwrap_or_else(|e| panic!("GitRemote: commit failed: {e}"))
    }

    fn head_commit(&self) -> git2::Commit<'_> {
        self.repo.head().unwrap().peel_to_commit().unwrap()
    }

    /// Create an annotated tag at HEAD.
    pub fn tag(&self, name: &str) -> Oid {
        let commit = self.head_commit();
        self.repo
            .tag(name, commit.as_object(), &Self::signature(), name, false)
            .unwrap_or_else(|e| panic!("GitRemote: tag {name} failed: {e}"));
        commit.id()
    }

    /// Create a lightweight tag at HEAD.
    pub fn lightweight_tag(&self, name: &str) -> Oid {
        let commit = self.head_commit();
        self.repo
            .tag_lightweight(name, commit.as_object(), false)
            .unwrap_or_else(|e| panic!("GitRemote: tag {name} failed: {e}"));
        commit.id()
    }

    /// Create a branch at HEAD without switching to it.
    pub fn branch(&self, name: &str) -> Oid {
        let commit = self.head_commit();
        self.repo
            .branch(name, &commit, false)
            .unwrap_or_else(|e| panic!("GitRemote: branch {name} failed: {e}"));
        commit.id()
    }

    /// Point HEAD at another branch and check out its tree.
    pub fn checkout(&self, branch: &str) {
        self.repo
            .set_head(&format!("refs/heads/{branch}"))
            .unwrap_or_else(|e| panic!("GitRemote: checkout {branch} failed: {e}"));
        self.repo
            .checkout_head(Some(git2::build::CheckoutBuilder::default().force()))
            .unwrap();
    }

    pub fn head(&self) -> Oid {
        self.head_commit().id()
    }
}
