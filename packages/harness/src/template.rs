//! Placeholder interpolation for catalog commands.
//!
//! Supports:
//! - `{{ org }}`, `{{ repo }}` - The repository being built
//! - `{{ number }}` - The pull request number
//! - `{{ sha }}` - The base commit of the pull request

use std::collections::BTreeMap;

use crate::pr::PullRequest;

/// Values available to a template, keyed by placeholder name.
pub type Variables = BTreeMap<&'static str, String>;

/// The variables describing a repository, shared by every pull request
/// against it.
pub fn repo_variables(org: &str, repo: &str) -> Variables {
    Variables::from([("org", org.to_string()), ("repo", repo.to_string())])
}

/// The variables describing a pull request.
pub fn variables(pr: &PullRequest) -> Variables {
    let mut variables = repo_variables(&pr.org, &pr.repo);
    variables.insert("number", pr.number.to_string());
    variables.insert("sha", pr.base.sha.clone());
    variables
}

/// Interpolate a template string with the given variables.
///
/// Unknown placeholders are left as-is in the template.
///
/// # Examples
///
/// ```
/// use harness::template::{Variables, interpolate};
///
/// let variables = Variables::from([("repo", String::from("flask"))]);
/// let result = interpolate("cd /home/{{ repo }}", &variables);
/// assert_eq!(result, "cd /home/flask");
/// ```
pub fn interpolate(template: &str, variables: &Variables) -> String {
    let mut result = template.to_string();

    for (key, value) in variables {
        let pattern = format!("{{{{ {key} }}}}");
        result = result.replace(&pattern, value);
    }

    result
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq as pretty_assert_eq;

    use super::*;
    use crate::pr::Base;

    #[test]
    fn test_pull_request_variables() {
        let pr = PullRequest::builder()
            .org("tokio-rs")
            .repo("axum")
            .number(42)
            .base(Base::builder().sha("deadbeef").build())
            .fix_patch("")
            .test_patch("")
            .build();

        let result = interpolate(
            "git -C /home/{{ repo }} checkout {{ sha }} # {{ org }}#{{ number }}",
            &variables(&pr),
        );
        pretty_assert_eq!(result, "git -C /home/axum checkout deadbeef # tokio-rs#42");
    }

    #[test]
    fn test_unknown_placeholder_left_asis() {
        let result = interpolate("echo {{ branch }}", &Variables::new());
        pretty_assert_eq!(result, "echo {{ branch }}");
    }

    #[test]
    fn test_no_placeholders() {
        let variables = Variables::from([("repo", String::from("flask"))]);
        pretty_assert_eq!(interpolate("pytest -rA", &variables), "pytest -rA");
    }
}
