//! Compile targets

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Tool whose native file format a sink receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompileTarget {
    Cursor,
    #[serde(rename = "amazonq")]
    AmazonQ,
    Copilot,
    Markdown,
}

impl CompileTarget {
    pub const ALL: [CompileTarget; 4] = [
        CompileTarget::Cursor,
        CompileTarget::AmazonQ,
        CompileTarget::Copilot,
        CompileTarget::Markdown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cursor => "cursor",
            Self::AmazonQ => "amazonq",
            Self::Copilot => "copilot",
            Self::Markdown => "markdown",
        }
    }

    /// Whether raw source files are installed next to the compiled output.
    pub fn keeps_sources(&self) -> bool {
        matches!(self, Self::Markdown)
    }
}

impl fmt::Display for CompileTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompileTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cursor" => Ok(Self::Cursor),
            "amazonq" => Ok(Self::AmazonQ),
            "copilot" => Ok(Self::Copilot),
            "markdown" => Ok(Self::Markdown),
            _ => Err(Error::UnsupportedTarget {
                target: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("cursor", CompileTarget::Cursor)]
    #[case("amazonq", CompileTarget::AmazonQ)]
    #[case("Copilot", CompileTarget::Copilot)]
    #[case("markdown", CompileTarget::Markdown)]
    fn parses_known_targets(#[case] input: &str, #[case] expected: CompileTarget) {
        assert_eq!(input.parse::<CompileTarget>().unwrap(), expected);
    }

    #[test]
    fn unknown_target_is_unsupported() {
        let err = "windsurf".parse::<CompileTarget>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedTarget { ref target } if target == "windsurf"));
    }

    #[test]
    fn serde_uses_cli_names() {
        let json = serde_json::to_string(&CompileTarget::AmazonQ).unwrap();
        assert_eq!(json, "\"amazonq\"");
        for target in CompileTarget::ALL {
            let back: CompileTarget =
                serde_json::from_str(&format!("\"{}\"", target.as_str())).unwrap();
            assert_eq!(back, target);
        }
    }
}
