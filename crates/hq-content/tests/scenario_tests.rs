//! Merge scenarios on realistic installation files

use hq_content::{MergeEngine, MergeStrategy};
use pretty_assertions::assert_eq;
use rstest::rstest;

const TEMPLATE_CLAUDE: &str = "\
# HQ

Version 2 instructions. Workers live in `workers/`.

## Learned Rules

<!-- add rules here -->

## Commands

Use `/run`.
";

const LOCAL_CLAUDE: &str = "\
# HQ

Version 1 instructions.

## Learned Rules

- Always run tests before committing
- Prefer small pull requests

- Never touch `agents.md` without asking
";

#[test]
fn core_instructions_keep_three_custom_rules() {
    let strategy = MergeStrategy::SectionMerge {
        sections: vec!["Learned Rules".into()],
    };
    let out = MergeEngine::new().merge(&strategy, TEMPLATE_CLAUDE, LOCAL_CLAUDE);

    assert!(out.success);
    assert!(out.rules_preserved);
    assert!(out.merged.contains("Version 2 instructions."));
    assert!(!out.merged.contains("Version 1 instructions."));
    for rule in [
        "- Always run tests before committing",
        "- Prefer small pull requests",
        "- Never touch `agents.md` without asking",
    ] {
        assert!(out.merged.contains(rule), "lost {rule}");
    }
    assert!(out.merged.ends_with("## Commands\n\nUse `/run`.\n"));
    assert!(!out.merged.contains("<!-- add rules here -->"));
}

#[test]
fn crlf_section_survives_byte_for_byte() {
    let template = "# HQ\r\nnew\r\n## Learned Rules\r\n## End\r\n";
    let local = "# HQ\r\nold\r\n## Learned Rules\r\n- a\r\n\r\n- b\r\n";
    let strategy = MergeStrategy::SectionMerge {
        sections: vec!["Learned Rules".into()],
    };
    let out = MergeEngine::new().merge(&strategy, template, local);
    assert_eq!(
        out.merged,
        "# HQ\r\nnew\r\n## Learned Rules\r\n- a\r\n\r\n- b\r\n## End\r\n"
    );
}

#[rstest]
#[case::overwrite(MergeStrategy::Overwrite, "overwrite")]
#[case::never(MergeStrategy::NeverOverwrite, "never_overwrite")]
#[case::section(MergeStrategy::SectionMerge { sections: vec![] }, "section_merge")]
#[case::yaml(MergeStrategy::YamlMerge { fields: vec![] }, "yaml_merge")]
fn strategy_serializes_with_tag(#[case] strategy: MergeStrategy, #[case] tag: &str) {
    let value = serde_yaml::to_value(&strategy).unwrap();
    assert_eq!(value["strategy"].as_str(), Some(tag));
}

#[test]
fn registry_update_keeps_local_workers() {
    let template = "\
version: 5
workers:
  - id: architect
    path: workers/architect
  - id: reviewer
    path: workers/reviewer
";
    let local = "\
version: 4
workers:
  - id: architect
    path: workers/architect
    note: tuned locally
  - id: my-bot
    path: workers/my-bot
";
    let strategy = MergeStrategy::AdditiveMerge {
        list_key: "workers".into(),
        id_field: "id".into(),
    };
    let out = MergeEngine::new().merge(&strategy, template, local);

    assert!(out.success);
    assert_eq!(
        out.merged,
        "\
version: 5
workers:
  - id: architect
    path: workers/architect
    note: tuned locally
  - id: my-bot
    path: workers/my-bot
  - id: reviewer
    path: workers/reviewer
"
    );
}

#[test]
fn command_rules_union_is_idempotent() {
    let template = "# /ship\n\n## Rules\n\n- Run lint\n- Tag release\n";
    let local = "# /ship\n\n## Rules\n\n- Run lint\n- Ping the team\n";
    let strategy = MergeStrategy::PreserveRulesSection {
        section: "Rules".into(),
    };
    let engine = MergeEngine::new();
    let once = engine.merge(&strategy, template, local);
    let twice = engine.merge(&strategy, template, &once.merged);
    assert_eq!(once.merged, twice.merged);
    assert_eq!(once.merged.matches("- Run lint").count(), 1);
    assert!(once.merged.contains("- Ping the team\n- Tag release\n"));
}

#[test]
fn core_instructions_merge_layout() {
    let strategy = MergeStrategy::SectionMerge {
        sections: vec!["Learned Rules".into()],
    };
    let out = MergeEngine::new().merge(&strategy, TEMPLATE_CLAUDE, LOCAL_CLAUDE);

    insta::assert_snapshot!(out.merged, @r###"
    # HQ

    Version 2 instructions. Workers live in `workers/`.

    ## Learned Rules

    - Always run tests before committing
    - Prefer small pull requests

    - Never touch `agents.md` without asking

    ## Commands

    Use `/run`.
    "###);
}

#[test]
fn worker_definition_merge_layout() {
    let template = "\
id: dev
name: Developer
instructions: |
  Write code for the team.
context:
  - knowledge/dev
";
    let local = "\
id: dev
name: Dev
instructions: |
  Write code for the team.
  Always format before committing.
context:
  - knowledge/old
my_notes: keep this
";
    let strategy = MergeStrategy::YamlMerge {
        fields: vec!["instructions".into(), "context".into()],
    };
    let out = MergeEngine::new().merge(&strategy, template, local);

    assert!(out.success);
    insta::assert_snapshot!(out.merged, @r###"
    id: dev
    name: Developer
    instructions: |
      Write code for the team.
      Always format before committing.
    context:
      - knowledge/old
    my_notes: keep this
    "###);
}
