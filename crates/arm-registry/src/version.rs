//! Versions, constraints and the resolver.
//!
//! A [`Version`] is an immutable snapshot of a package: an opaque resolved
//! id (commit SHA, package id, slug) plus a display name. Tagged versions
//! carry a parsed semver; branch heads do not and never order against tags.
//!
//! Constraint grammar:
//!
//! | Input            | Constraint              |
//! |------------------|-------------------------|
//! | `1.2.3`, `v1.2.3`| exact `1.2.3`           |
//! | `^1.2.3`         | caret (same major)      |
//! | `~1.2.3`         | tilde (same major.minor)|
//! | `1`              | `^1.0.0`                |
//! | `1.2`            | `~1.2.0`                |
//! | `latest`         | greatest tag, else default branch |
//! | `main`           | head of branch `main`   |

use std::cmp::Ordering;
use std::fmt;

use semver::Prerelease;

use crate::error::{Error, Result};

/// How a version was produced on the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionKind {
    /// A released, immutable version (git tag, package release)
    Tagged,
    /// The current tip of a branch
    BranchHead { branch: String, default: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    /// Opaque resolved id, stable across lookups
    pub id: String,
    /// Name used for directories and listings
    pub display: String,
    pub semver: Option<semver::Version>,
    pub kind: VersionKind,
}

impl Version {
    pub fn tagged(id: impl Into<String>, semver: semver::Version) -> Self {
        Self {
            id: id.into(),
            display: semver.to_string(),
            semver: Some(semver),
            kind: VersionKind::Tagged,
        }
    }

    pub fn branch_head(id: impl Into<String>, branch: impl Into<String>, default: bool) -> Self {
        let branch = branch.into();
        Self {
            id: id.into(),
            display: branch.clone(),
            semver: None,
            kind: VersionKind::BranchHead { branch, default },
        }
    }

    pub fn is_tagged(&self) -> bool {
        matches!(self.kind, VersionKind::Tagged)
    }

    pub fn is_default_branch(&self) -> bool {
        matches!(self.kind, VersionKind::BranchHead { default: true, .. })
    }

    pub fn branch(&self) -> Option<&str> {
        match &self.kind {
            VersionKind::BranchHead { branch, .. } => Some(branch),
            VersionKind::Tagged => None,
        }
    }

    pub fn is_prerelease(&self) -> bool {
        self.semver.as_ref().is_some_and(|v| !v.pre.is_empty())
    }

    /// Semver precedence, defined only when both versions are tagged.
    ///
    /// Build metadata is ignored.
    pub fn precedence_cmp(&self, other: &Version) -> Option<Ordering> {
        match (&self.semver, &other.semver) {
            (Some(a), Some(b)) => Some(precedence(a).cmp(&precedence(b))),
            _ => None,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

fn precedence(v: &semver::Version) -> (u64, u64, u64, &Prerelease) {
    (v.major, v.minor, v.patch, &v.pre)
}

/// Parse a tag or release name such as `v1.2.3` or `1.2.3-rc.1`.
pub fn parse_tag(name: &str) -> Option<semver::Version> {
    let trimmed = name.strip_prefix('v').unwrap_or(name);
    semver::Version::parse(trimmed).ok()
}

/// User intent over versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Exact(semver::Version),
    Caret(semver::Version),
    Tilde(semver::Version),
    BranchHead(String),
    Latest,
}

impl Constraint {
    /// Parse user input, expanding shorthands.
    pub fn parse(input: &str) -> Result<Self> {
        let text = input.trim();
        let invalid = |reason: &str| Error::InvalidConstraint {
            constraint: input.to_string(),
            reason: reason.to_string(),
        };

        if text.is_empty() {
            return Err(invalid("constraint is empty"));
        }
        if text == "latest" {
            return Ok(Self::Latest);
        }
        if let Some(rest) = text.strip_prefix('^') {
            return parse_partial(rest)
                .map(Self::Caret)
                .ok_or_else(|| invalid("expected ^MAJOR[.MINOR[.PATCH]]"));
        }
        if let Some(rest) = text.strip_prefix('~') {
            return parse_partial(rest)
                .map(Self::Tilde)
                .ok_or_else(|| invalid("expected ~MAJOR[.MINOR[.PATCH]]"));
        }

        let unprefixed = match text.strip_prefix('v') {
            Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
            _ => text,
        };
        if unprefixed.starts_with(|c: char| c.is_ascii_digit()) {
            match parse_version_text(unprefixed) {
                Ok(constraint) => return Ok(constraint),
                // Dotted numbers can only have meant a version; anything
                // else may still be a branch such as `2024-refresh`
                Err(reason) if unprefixed.chars().all(|c| c.is_ascii_digit() || c == '.') => {
                    return Err(invalid(&reason));
                }
                Err(_) => {}
            }
        }

        if git2::Reference::is_valid_name(&format!("refs/heads/{text}")) {
            return Ok(Self::BranchHead(text.to_string()));
        }
        Err(invalid("neither a version nor a valid branch name"))
    }

    /// Whether the constraint itself names a prerelease.
    pub fn names_prerelease(&self) -> bool {
        match self {
            Self::Exact(v) | Self::Caret(v) | Self::Tilde(v) => !v.pre.is_empty(),
            Self::BranchHead(_) | Self::Latest => false,
        }
    }

    /// Whether a single version satisfies the constraint.
    ///
    /// `Latest` matches any tagged release; picking the greatest is the
    /// resolver's job.
    pub fn matches(&self, version: &Version) -> bool {
        if let Self::BranchHead(name) = self {
            return version.branch() == Some(name.as_str());
        }
        let Some(candidate) = version.semver.as_ref() else {
            return false;
        };
        if !candidate.pre.is_empty() && !self.names_prerelease() {
            return false;
        }
        let at_least = |base: &semver::Version| precedence(candidate) >= precedence(base);
        match self {
            Self::Exact(v) => precedence(candidate) == precedence(v),
            Self::Caret(v) => candidate.major == v.major && at_least(v),
            Self::Tilde(v) => candidate.major == v.major && candidate.minor == v.minor && at_least(v),
            Self::Latest => true,
            Self::BranchHead(_) => false,
        }
    }
}

/// `1` is `^1.0.0`, `1.2` is `~1.2.0`, and a full version is exact.
fn parse_version_text(text: &str) -> std::result::Result<Constraint, String> {
    let core = text.split(['-', '+']).next().unwrap_or(text);
    match core.split('.').count() {
        1 | 2 if core.len() == text.len() => parse_partial(text)
            .map(|v| {
                if core.contains('.') {
                    Constraint::Tilde(v)
                } else {
                    Constraint::Caret(v)
                }
            })
            .ok_or_else(|| "not a valid version".to_string()),
        3 => semver::Version::parse(text)
            .map(Constraint::Exact)
            .map_err(|e| e.to_string()),
        _ => Err("not a valid version".to_string()),
    }
}

impl fmt::Display for Constraint {
    /// The normalized form stored in the manifest.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(v) => write!(f, "{v}"),
            Self::Caret(v) => write!(f, "^{v}"),
            Self::Tilde(v) => write!(f, "~{v}"),
            Self::BranchHead(name) => f.write_str(name),
            Self::Latest => f.write_str("latest"),
        }
    }
}

impl std::str::FromStr for Constraint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// `1` → 1.0.0, `1.2` → 1.2.0, `1.2.3[-pre]` as-is.
fn parse_partial(text: &str) -> Option<semver::Version> {
    let text = text.trim();
    let text = text.strip_prefix('v').unwrap_or(text);
    let core = text.split(['-', '+']).next().unwrap_or(text);
    let padded = match core.split('.').count() {
        1 if core == text => format!("{text}.0.0"),
        2 if core == text => format!("{text}.0"),
        3 => text.to_string(),
        _ => return None,
    };
    semver::Version::parse(&padded).ok()
}

/// Pick the version a constraint resolves to.
///
/// Among tagged candidates the greatest semver wins. `Latest` falls back to
/// the default branch head when no release exists.
pub fn resolve<'a>(constraint: &Constraint, versions: &'a [Version]) -> Option<&'a Version> {
    match constraint {
        Constraint::BranchHead(_) => versions.iter().find(|v| constraint.matches(v)),
        _ => {
            let best = versions
                .iter()
                .filter(|v| constraint.matches(v))
                .max_by(|a, b| a.precedence_cmp(b).unwrap_or(Ordering::Equal));
            match (best, constraint) {
                (None, Constraint::Latest) => versions.iter().find(|v| v.is_default_branch()),
                (best, _) => best,
            }
        }
    }
}
