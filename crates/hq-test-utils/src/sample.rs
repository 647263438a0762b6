//! A v1 installation and the v2 template it upgrades to.
//!
//! | Path | Relationship |
//! |---|---|
//! | `.claude/CLAUDE.md` | modified, section merge keeps three learned rules |
//! | `agents.md` | modified, never overwritten |
//! | `workers/registry.yaml` | modified, `reviewer` appended |
//! | `workers/dev/worker.yaml` | modified, local instructions kept |
//! | `.claude/commands/ship.md` | modified, rules unioned |
//! | `knowledge/public/guide.md` | unchanged |
//! | `docs/handbook.md` -> `knowledge/public/handbook.md` | renamed |
//! | `projects/mine/README.md` | local only |
//! | `workers/reviewer/worker.yaml`, `.claude/commands/learn.md`, `knowledge/private/.gitkeep` | new |

use crate::TestTree;

pub const LOCAL_RULES: [&str; 3] = [
    "- Always run the test suite before committing",
    "- Keep pull requests under 400 lines",
    "- Ask before touching production credentials",
];

pub const LOCAL_CLAUDE: &str = "\
# HQ

You are running HQ v1. Workers live in `workers/`.

## Learned Rules

- Always run the test suite before committing
- Keep pull requests under 400 lines

- Ask before touching production credentials
";

pub const TEMPLATE_CLAUDE: &str = "\
# HQ

You are running HQ v2. Workers live in `workers/` and skills in `.claude/skills/`.

## Learned Rules

<!-- Rules added by /learn appear here -->

## Commands

Run `/ship` to release.
";

pub const LOCAL_WORKER: &str = "\
id: dev
name: Developer
version: 1
instructions: |
  Write Rust with care.
  Prefer small functions.
my_setting: true
";

pub const TEMPLATE_WORKER: &str = "\
id: dev
name: Developer
version: 2
instructions: |
  Default developer instructions.
tools:
  - read
  - write
";

pub const LOCAL_REGISTRY: &str = "\
version: 1
workers:
  - id: dev
    path: workers/dev
  - id: my-bot
    path: workers/my-bot
";

pub const TEMPLATE_REGISTRY: &str = "\
version: 2
workers:
  - id: dev
    path: workers/dev
  - id: reviewer
    path: workers/reviewer
";

pub const LOCAL_SHIP: &str = "\
# /ship

Release the current branch.

## Rules

- Run the linter
- Notify #releases when done
";

pub const TEMPLATE_SHIP: &str = "\
# /ship

Release the current branch with a changelog entry.

## Rules

- Run the linter
- Tag the release

## Steps

1. Build
";

pub const HANDBOOK: &str = "\
# Handbook

How we work: small changes, reviewed by a peer, shipped daily.
";

pub const GUIDE: &str = "# Guide\n\nShared knowledge.\n";

/// The v1 installation.
pub fn installation_v1() -> TestTree {
    TestTree::new()
        .file(".hq-version", "1.0.0\n")
        .file(".claude/CLAUDE.md", LOCAL_CLAUDE)
        .file("agents.md", "# About me\n\nI maintain the infra team.\n")
        .file("workers/registry.yaml", LOCAL_REGISTRY)
        .file("workers/dev/worker.yaml", LOCAL_WORKER)
        .file(".claude/commands/ship.md", LOCAL_SHIP)
        .file("knowledge/public/guide.md", GUIDE)
        .file("knowledge/private/notes.md", "private\n")
        .file("docs/handbook.md", HANDBOOK)
        .file("projects/mine/README.md", "# Mine\n")
}

/// The v2 template.
pub fn template_v2() -> TestTree {
    TestTree::new()
        .file(".hq-version", "2.0.0\n")
        .file(".claude/CLAUDE.md", TEMPLATE_CLAUDE)
        .file("agents.md", "# About you\n\n## Preferences\n\nFill this in.\n")
        .file("workers/registry.yaml", TEMPLATE_REGISTRY)
        .file("workers/dev/worker.yaml", TEMPLATE_WORKER)
        .file(
            "workers/reviewer/worker.yaml",
            "id: reviewer\ninstructions: |\n  Review diffs.\n",
        )
        .file(".claude/commands/ship.md", TEMPLATE_SHIP)
        .file(".claude/commands/learn.md", "# /learn\n\nRecord a rule.\n")
        .file("knowledge/public/guide.md", GUIDE)
        .file("knowledge/public/handbook.md", HANDBOOK)
        .file("knowledge/private/.gitkeep", "")
}
