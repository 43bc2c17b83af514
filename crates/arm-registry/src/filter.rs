//! Include/exclude content filter

use arm_fs::PackageFile;
use glob::{MatchOptions, Pattern};

use crate::error::{Error, Result};

/// Include patterns used when a package names none.
pub const DEFAULT_INCLUDE: [&str; 2] = ["*.yml", "*.yaml"];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    // `*` stays within one path segment; `**` crosses directories
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compiled include/exclude glob lists.
///
/// A path is selected when it matches at least one include pattern and no
/// exclude pattern.
#[derive(Debug, Clone)]
pub struct ContentSelector {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl ContentSelector {
    /// Compile pattern lists. An empty include list means [`DEFAULT_INCLUDE`].
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let include = if include.is_empty() {
            DEFAULT_INCLUDE.iter().map(|p| compile(p)).collect::<Result<_>>()?
        } else {
            include.iter().map(|p| compile(p)).collect::<Result<_>>()?
        };
        let exclude = exclude.iter().map(|p| compile(p)).collect::<Result<_>>()?;
        Ok(Self { include, exclude })
    }

    /// Selector that keeps every file.
    pub fn all() -> Self {
        Self {
            include: Pattern::new("**").into_iter().collect(),
            exclude: Vec::new(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        let included = self
            .include
            .iter()
            .any(|p| p.matches_with(path, MATCH_OPTIONS));
        included
            && !self
                .exclude
                .iter()
                .any(|p| p.matches_with(path, MATCH_OPTIONS))
    }

    /// Keep only the selected files, preserving order.
    pub fn apply(&self, files: Vec<PackageFile>) -> Vec<PackageFile> {
        files
            .into_iter()
            .filter(|f| self.matches(f.path.as_str()))
            .collect()
    }
}

impl Default for ContentSelector {
    fn default() -> Self {
        Self {
            include: DEFAULT_INCLUDE
                .iter()
                .filter_map(|p| Pattern::new(p).ok())
                .collect(),
            exclude: Vec::new(),
        }
    }
}

/// Validate a single glob without building a selector.
pub fn validate_pattern(pattern: &str) -> Result<()> {
    compile(pattern).map(|_| ())
}

fn compile(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|e| Error::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.msg.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case(&[], &[], "a.yml", true)]
    #[case(&[], &[], "a.yaml", true)]
    #[case(&[], &[], "dir/a.yml", false)]
    #[case(&[], &[], "README.md", false)]
    #[case(&["**/*.yml"], &[], "dir/sub/a.yml", true)]
    #[case(&["**/*.yml"], &[], "a.yml", true)]
    #[case(&["rules/*.yml"], &[], "rules/x/a.yml", false)]
    #[case(&["**/*.yml"], &["**/draft-*"], "rules/draft-a.yml", false)]
    #[case(&["**/*.yml"], &["rules/**"], "rules/a.yml", false)]
    #[case(&["**/*.yml"], &["rules/**"], "other/a.yml", true)]
    fn selects_paths(
        #[case] include: &[&str],
        #[case] exclude: &[&str],
        #[case] path: &str,
        #[case] expected: bool,
    ) {
        let selector = ContentSelector::new(&strings(include), &strings(exclude)).unwrap();
        assert_eq!(selector.matches(path), expected);
    }

    #[test]
    fn apply_keeps_order() {
        let selector = ContentSelector::default();
        let files = vec![
            PackageFile::new("b.yml", "b"),
            PackageFile::new("notes.txt", "n"),
            PackageFile::new("a.yaml", "a"),
        ];
        let kept: Vec<_> = selector
            .apply(files)
            .into_iter()
            .map(|f| f.path.as_str().to_string())
            .collect();
        assert_eq!(kept, vec!["b.yml", "a.yaml"]);
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = ContentSelector::new(&strings(&["[unclosed"]), &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }
}
