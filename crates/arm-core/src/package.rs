//! Package identities and install requests

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// `<registry>/<name>` identity of a dependency.
///
/// The name may itself contain `/` (GitLab package names often do); only
/// the first separator splits off the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageKey {
    pub registry: String,
    pub name: String,
}

impl PackageKey {
    pub fn new(registry: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            registry: registry.into(),
            name: name.into(),
        }
    }

    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || {
            Error::invalid_config(format!(
                "'{input}' is not a package reference (expected <registry>/<name>)"
            ))
        };
        let (registry, name) = input.split_once('/').ok_or_else(invalid)?;
        if registry.trim().is_empty() || name.trim().is_empty() || name.contains('@') {
            return Err(invalid());
        }
        Ok(Self::new(registry, name))
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.name)
    }
}

impl FromStr for PackageKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A package reference as typed on the command line: `reg/name[@constraint]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub key: PackageKey,
    /// Raw constraint text, `None` when no `@` was given
    pub constraint: Option<String>,
}

impl PackageSpec {
    pub fn parse(input: &str) -> Result<Self> {
        let (key, constraint) = match input.rsplit_once('@') {
            Some((key, constraint)) => (key, Some(constraint.to_string())),
            None => (input, None),
        };
        if constraint.as_deref() == Some("") {
            return Err(Error::invalid_config(format!(
                "'{input}' has an empty version after '@'"
            )));
        }
        Ok(Self {
            key: PackageKey::parse(key)?,
            constraint,
        })
    }
}

impl FromStr for PackageSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("reg/pkg", "reg", "pkg", None)]
    #[case("reg/pkg@1.2.3", "reg", "pkg", Some("1.2.3"))]
    #[case("lab/group/rules@^1", "lab", "group/rules", Some("^1"))]
    #[case("team/rules@main", "team", "rules", Some("main"))]
    fn parses_specs(
        #[case] input: &str,
        #[case] registry: &str,
        #[case] name: &str,
        #[case] constraint: Option<&str>,
    ) {
        let spec = PackageSpec::parse(input).unwrap();
        assert_eq!(spec.key, PackageKey::new(registry, name));
        assert_eq!(spec.constraint.as_deref(), constraint);
    }

    #[rstest]
    #[case("pkg")]
    #[case("/pkg")]
    #[case("reg/")]
    #[case("reg/pkg@")]
    fn rejects_malformed_specs(#[case] input: &str) {
        assert!(PackageSpec::parse(input).is_err());
    }

    #[test]
    fn key_display_round_trips() {
        let key = PackageKey::parse("lab/group/rules").unwrap();
        assert_eq!(key.to_string(), "lab/group/rules");
    }
}
