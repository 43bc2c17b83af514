//! Tests for the resource schema wire form and validated model

use arm_meta::schema::{ScopeDocument, API_VERSION};
use arm_meta::{Enforcement, Error, ResourceDocument, ResourceKind, parse_resource};
use pretty_assertions::assert_eq;
use rstest::rstest;

#[test]
fn test_scope_accepts_list_form() {
    let text = r#"
apiVersion: v1
kind: Ruleset
metadata: {id: r, name: R}
spec:
  rules:
    a:
      name: A
      scope:
        - files: ["src/**/*.rs"]
        - files: ["tests/**/*.rs", "benches/*.rs"]
      body: Body
"#;
    let resource = parse_resource(text).unwrap();
    assert_eq!(
        resource.items[0].scope_files,
        vec!["src/**/*.rs", "tests/**/*.rs", "benches/*.rs"]
    );
}

#[test]
fn test_document_serializes_camel_case() {
    let doc = ResourceDocument {
        api_version: Some(API_VERSION.to_string()),
        kind: Some("Ruleset".to_string()),
        ..Default::default()
    };
    let yaml = serde_yaml::to_string(&doc).unwrap();
    assert!(yaml.contains("apiVersion: v1"));
    assert!(!yaml.contains("metadata"));
}

#[test]
fn test_scope_document_flattens_files() {
    let scope = ScopeDocument::from_files(vec!["*.md".into()]);
    assert_eq!(scope.files(), vec!["*.md".to_string()]);
}

#[rstest]
#[case("may", Some(Enforcement::May))]
#[case("should", Some(Enforcement::Should))]
#[case("must", Some(Enforcement::Must))]
#[case("MUST", None)]
#[case("never", None)]
fn test_enforcement_parse(#[case] input: &str, #[case] expected: Option<Enforcement>) {
    assert_eq!(Enforcement::parse(input), expected);
}

#[rstest]
#[case("Ruleset", Some(ResourceKind::Ruleset))]
#[case("ruleset", Some(ResourceKind::Ruleset))]
#[case("Promptset", Some(ResourceKind::Promptset))]
#[case("rules", None)]
fn test_kind_parse(#[case] input: &str, #[case] expected: Option<ResourceKind>) {
    assert_eq!(ResourceKind::parse(input), expected);
}

#[test]
fn test_validation_message_lists_all_issues() {
    let err = parse_resource("apiVersion: v1\nkind: Ruleset\n").unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
    let message = err.to_string();
    assert!(message.contains("metadata: is required"), "{message}");
    assert!(message.contains("spec: is required"), "{message}");
}

#[test]
fn test_prompt_items_drop_enforcement() {
    let text = r#"
apiVersion: v1
kind: Promptset
metadata: {id: p, name: P}
spec:
  prompts:
    ask:
      name: Ask
      enforcement: must
      body: Ask a question.
"#;
    let resource = parse_resource(text).unwrap();
    assert_eq!(resource.items[0].enforcement, None);
}
