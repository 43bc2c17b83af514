//! Git registry driver
//!
//! A git registry is a repository whose tree is the package content. Tags
//! that parse as semver are releases; configured branches (and the remote's
//! default branch) are exposed as branch heads. The package name is only a
//! label: every package of a git registry sees the same tree, narrowed by
//! its include/exclude patterns.
//!
//! Objects are fetched into a bare mirror under the content cache, guarded
//! by the registry's cache lock.

use std::collections::BTreeMap;

use arm_fs::PackageFile;
use arm_fs::file::sort_canonical;
use git2::{
    AutotagOption, Cred, CredentialType, Direction, ErrorClass, ErrorCode, FetchOptions,
    ObjectType, Oid, Remote, RemoteCallbacks, Repository, TreeWalkMode, TreeWalkResult,
};

use crate::cache::ContentCache;
use crate::config::RegistryConfig;
use crate::driver::RegistryDriver;
use crate::error::{Error, Result};
use crate::version::{Version, parse_tag};

const MAX_CREDENTIAL_ATTEMPTS: usize = 3;
const FETCH_REFSPECS: [&str; 2] = ["+refs/heads/*:refs/heads/*", "+refs/tags/*:refs/tags/*"];

pub struct GitDriver {
    name: String,
    url: String,
    branches: Vec<String>,
    key: String,
    cache: ContentCache,
}

/// Refs advertised by the remote.
#[derive(Debug, Default)]
struct RemoteRefs {
    /// Branch name to commit
    heads: BTreeMap<String, Oid>,
    /// Tag name to commit (peeled when annotated)
    tags: BTreeMap<String, Oid>,
    default_branch: Option<String>,
}

impl GitDriver {
    pub fn new(name: &str, config: &RegistryConfig, cache: ContentCache) -> Result<Self> {
        let url = config.url.clone().ok_or_else(|| Error::InvalidConfig {
            registry: name.to_string(),
            message: "git registries require a url".to_string(),
        })?;
        Ok(Self {
            name: name.to_string(),
            url,
            branches: config.branches.clone(),
            key: config.cache_key(),
            cache,
        })
    }

    fn remote_error(&self, err: git2::Error) -> Error {
        let auth = err.code() == ErrorCode::Auth
            || (err.class() == ErrorClass::Http && err.message().contains("401"));
        if auth {
            Error::AuthFailed {
                registry: self.name.clone(),
                message: err.message().to_string(),
            }
        } else {
            Error::Unreachable {
                registry: self.name.clone(),
                message: err.message().to_string(),
            }
        }
    }

    fn list_remote(&self) -> Result<RemoteRefs> {
        let mut remote = Remote::create_detached(self.url.as_str())?;
        let connection = remote
            .connect_auth(Direction::Fetch, Some(callbacks()), None)
            .map_err(|e| self.remote_error(e))?;

        let mut refs = RemoteRefs::default();
        for head in connection.list().map_err(|e| self.remote_error(e))? {
            let name = head.name();
            if let Some(branch) = name.strip_prefix("refs/heads/") {
                refs.heads.insert(branch.to_string(), head.oid());
            } else if let Some(tag) = name.strip_prefix("refs/tags/") {
                match tag.strip_suffix("^{}") {
                    // Peeled entry of an annotated tag wins over the tag object
                    Some(peeled) => {
                        refs.tags.insert(peeled.to_string(), head.oid());
                    }
                    None => {
                        refs.tags.entry(tag.to_string()).or_insert(head.oid());
                    }
                }
            }
        }
        refs.default_branch = connection
            .default_branch()
            .ok()
            .and_then(|buf| buf.as_str().map(str::to_string))
            .and_then(|r| r.strip_prefix("refs/heads/").map(str::to_string));
        Ok(refs)
    }

    fn open_mirror(&self) -> Result<Repository> {
        let dir = self.cache.mirror_dir(&self.key);
        if dir.join("HEAD").is_file() {
            return Ok(Repository::open_bare(&dir)?);
        }
        std::fs::create_dir_all(&dir).map_err(|e| arm_fs::Error::io(&dir, e))?;
        Ok(Repository::init_bare(&dir)?)
    }

    /// Make sure the mirror holds `commit`, fetching when it does not.
    fn ensure_commit(&self, mirror: &Repository, commit: Oid) -> Result<()> {
        if mirror.find_commit(commit).is_ok() {
            return Ok(());
        }
        tracing::debug!(registry = %self.name, url = %self.url, "Updating git mirror");
        let mut remote = mirror.remote_anonymous(&self.url)?;
        let mut options = FetchOptions::new();
        options.remote_callbacks(callbacks());
        options.download_tags(AutotagOption::None);
        remote
            .fetch(&FETCH_REFSPECS, Some(&mut options), None)
            .map_err(|e| self.remote_error(e))?;
        Ok(())
    }

    fn read_commit(&self, mirror: &Repository, package: &str, version: &Version) -> Result<Vec<PackageFile>> {
        let not_found = || Error::VersionNotFound {
            registry: self.name.clone(),
            package: package.to_string(),
            version: version.display.clone(),
        };
        let oid = Oid::from_str(&version.id).map_err(|_| not_found())?;
        let commit = mirror.find_commit(oid).map_err(|_| not_found())?;
        read_tree(mirror, &commit.tree()?)
    }
}

impl RegistryDriver for GitDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_versions(&self, _package: &str) -> Result<Vec<Version>> {
        let refs = self.list_remote()?;
        let mut versions = Vec::new();

        for (tag, oid) in &refs.tags {
            match parse_tag(tag) {
                Some(semver) => versions.push(Version::tagged(oid.to_string(), semver)),
                None => tracing::trace!(registry = %self.name, tag, "Ignoring non-semver tag"),
            }
        }

        let mut branches: Vec<&str> = self.branches.iter().map(String::as_str).collect();
        if let Some(default) = refs.default_branch.as_deref() {
            if !branches.contains(&default) {
                branches.push(default);
            }
        }
        for branch in branches {
            let Some(oid) = refs.heads.get(branch) else {
                tracing::debug!(registry = %self.name, branch, "Configured branch not on remote");
                continue;
            };
            let default = refs.default_branch.as_deref() == Some(branch);
            versions.push(Version::branch_head(oid.to_string(), branch, default));
        }
        Ok(versions)
    }

    fn fetch(&self, package: &str, version: &Version) -> Result<Vec<PackageFile>> {
        let oid = Oid::from_str(&version.id).map_err(|_| Error::VersionNotFound {
            registry: self.name.clone(),
            package: package.to_string(),
            version: version.display.clone(),
        })?;
        let _lock = self.cache.lock(&self.key)?;
        let mirror = self.open_mirror()?;
        self.ensure_commit(&mirror, oid)?;
        self.read_commit(&mirror, package, version)
    }
}

/// Every blob in a tree, in canonical order.
///
/// Symlinks and submodules are skipped.
fn read_tree(repo: &Repository, tree: &git2::Tree<'_>) -> Result<Vec<PackageFile>> {
    let mut entries = Vec::new();
    let mut walk_error = None;
    tree.walk(TreeWalkMode::PreOrder, |dir, entry| {
        if entry.kind() != Some(ObjectType::Blob) || entry.filemode() == 0o120000 {
            return TreeWalkResult::Ok;
        }
        let Some(name) = entry.name() else {
            return TreeWalkResult::Ok;
        };
        match repo.find_blob(entry.id()) {
            Ok(blob) => {
                entries.push(PackageFile::new(format!("{dir}{name}"), blob.content()));
                TreeWalkResult::Ok
            }
            Err(e) => {
                walk_error = Some(e);
                TreeWalkResult::Abort
            }
        }
    })?;
    if let Some(err) = walk_error {
        return Err(err.into());
    }
    sort_canonical(&mut entries);
    Ok(entries)
}

/// Credential callbacks: ssh agent, then git credential helpers, then the
/// platform default.
fn callbacks() -> RemoteCallbacks<'static> {
    let mut attempts = 0;
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url, username, allowed| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::new(
                ErrorCode::Auth,
                ErrorClass::Net,
                "no credentials accepted",
            ));
        }
        if allowed.contains(CredentialType::SSH_KEY) {
            return Cred::ssh_key_from_agent(username.unwrap_or("git"));
        }
        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            if let Ok(config) = git2::Config::open_default() {
                if let Ok(cred) = Cred::credential_helper(&config, url, username) {
                    return Ok(cred);
                }
            }
        }
        if allowed.contains(CredentialType::DEFAULT) {
            return Cred::default();
        }
        Err(git2::Error::new(
            ErrorCode::Auth,
            ErrorClass::Net,
            "no usable credentials",
        ))
    });
    callbacks
}

