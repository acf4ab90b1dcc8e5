//! Shell scripts injected into instance images.
//!
//! Every instance image carries the same five scripts; they differ only in the
//! repository directory, base commit, and commands the catalog supplies.

use indoc::{formatdoc, indoc};
use itertools::Itertools;

use crate::image::File;

pub const CHECK_GIT_CHANGES: &str = "check_git_changes.sh";
pub const PREPARE: &str = "prepare.sh";
pub const RUN: &str = "run.sh";
pub const TEST_RUN: &str = "test-run.sh";
pub const FIX_RUN: &str = "fix-run.sh";
pub const FIX_PATCH: &str = "fix.patch";
pub const TEST_PATCH: &str = "test.patch";

/// Fails if the working tree has uncommitted changes.
pub fn check_git_changes() -> File {
    let content = indoc! {r#"
        #!/bin/bash
        set -e

        if ! git rev-parse --is-inside-work-tree > /dev/null 2>&1; then
          echo "check_git_changes: Not inside a git repository"
          exit 1
        fi

        if [[ -n $(git status --porcelain) ]]; then
          echo "check_git_changes: Uncommitted changes"
          exit 1
        fi

        echo "check_git_changes: No uncommitted changes"
        exit 0
    "#};
    File::builder().name(CHECK_GIT_CHANGES).content(content).build()
}

/// Checks out the base commit on a clean tree, then runs the prepare steps.
pub fn prepare(repo: &str, sha: &str, steps: &[String]) -> File {
    let content = formatdoc! {"
        #!/bin/bash
        set -e

        cd /home/{repo}
        git reset --hard
        bash /home/{CHECK_GIT_CHANGES}
        git checkout {sha}
        bash /home/{CHECK_GIT_CHANGES}
        {steps}
        ",
        steps = commands(steps),
    };
    File::builder().name(PREPARE).content(content).build()
}

/// Runs the tests on the base commit.
pub fn run(repo: &str, test: &[String]) -> File {
    File::builder()
        .name(RUN)
        .content(stage(repo, &[], test))
        .build()
}

/// Applies the test patch, then runs the tests.
pub fn test_run(repo: &str, test: &[String]) -> File {
    File::builder()
        .name(TEST_RUN)
        .content(stage(repo, &[TEST_PATCH], test))
        .build()
}

/// Applies the test and fix patches, then runs the tests.
pub fn fix_run(repo: &str, test: &[String]) -> File {
    File::builder()
        .name(FIX_RUN)
        .content(stage(repo, &[TEST_PATCH, FIX_PATCH], test))
        .build()
}

fn stage(repo: &str, patches: &[&str], test: &[String]) -> String {
    let apply = if patches.is_empty() {
        String::new()
    } else {
        let paths = patches.iter().map(|patch| format!("/home/{patch}")).join(" ");
        format!("git apply --whitespace=nowarn {paths}\n")
    };
    formatdoc! {"
        #!/bin/bash
        set -e

        cd /home/{repo}
        {apply}{test}
        ",
        test = commands(test),
    }
}

/// One command per line, without a trailing newline.
fn commands(lines: &[String]) -> String {
    lines.iter().map(|line| line.trim_end()).join("\n")
}
