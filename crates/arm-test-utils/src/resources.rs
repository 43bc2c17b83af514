//! Ruleset and promptset YAML builders.

/// A ruleset document with one `must` rule per `(id, body)` pair.
pub fn ruleset_yaml(id: &str, rules: &[(&str, &str)]) -> String {
    let mut out = format!(
        "apiVersion: v1\nkind: Ruleset\nmetadata:\n  id: {id}\n  name: {id}\nspec:\n  rules:\n"
    );
    for (rule_id, body) in rules {
        out.push_str(&format!(
            "    {rule_id}:\n      name: {rule_id}\n      enforcement: must\n      body: {body:?}\n"
        ));
    }
    out
}

/// A ruleset rule limited to file globs.
pub fn scoped_ruleset_yaml(id: &str, rule_id: &str, body: &str, globs: &[&str]) -> String {
    let mut out = format!(
        "apiVersion: v1\nkind: Ruleset\nmetadata:\n  id: {id}\n  name: {id}\nspec:\n  rules:\n    {rule_id}:\n      name: {rule_id}\n      enforcement: should\n      priority: 10\n      body: {body:?}\n      scope:\n"
    );
    for glob in globs {
        out.push_str(&format!("        - files: [{glob:?}]\n"));
    }
    out
}

/// A promptset document with one prompt per `(id, body)` pair.
pub fn promptset_yaml(id: &str, prompts: &[(&str, &str)]) -> String {
    let mut out = format!(
        "apiVersion: v1\nkind: Promptset\nmetadata:\n  id: {id}\n  name: {id}\nspec:\n  prompts:\n"
    );
    for (prompt_id, body) in prompts {
        out.push_str(&format!(
            "    {prompt_id}:\n      name: {prompt_id}\n      body: {body:?}\n"
        ));
    }
    out
}
