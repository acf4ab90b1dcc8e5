//! The shipped catalog loads and every entry resolves.

use harness::config::Config;
use harness::pr::Base;
use harness::{Catalog, Format, LogParser, PullRequest, catalog::Language};
use indoc::indoc;
use pretty_assertions::assert_eq as pretty_assert_eq;

use crate::catalog_dir;

#[test]
fn test_shipped_catalog_loads() {
    let catalog = Catalog::load(&catalog_dir()).unwrap();
    assert!(catalog.len() >= 10, "only {} entries", catalog.len());

    for spec in catalog.iter() {
        let resolved = spec.resolve(1);
        assert!(!resolved.test.is_empty(), "{} has no test command", spec.full_name());
    }
}

#[test]
fn test_variant_ranges() {
    let catalog = Catalog::load(&catalog_dir()).unwrap();
    let flask = catalog.get("pallets", "flask").unwrap();

    pretty_assert_eq!(flask.resolve(4000).base_image, "python:3.7-slim");
    pretty_assert_eq!(flask.resolve(5000).base_image, "python:3.11-slim");
}

#[test]
fn test_system_packages_install_before_clone() {
    let catalog = Catalog::load(&catalog_dir()).unwrap();

    for (org, repo, number, installer) in [
        ("pallets", "flask", 6000, "apt-get install"),
        ("pallets", "flask", 4000, "apt-get install"),
        ("django", "django", 17000, "apt-get install"),
        ("bats-core", "bats-core", 900, "apk add"),
    ] {
        let pr = PullRequest::builder()
            .org(org)
            .repo(repo)
            .number(number)
            .base(Base::builder().sha("4a5c7b3").build())
            .fix_patch("")
            .test_patch("")
            .build();
        let dockerfile = catalog
            .instance(&pr, &Config::default())
            .unwrap()
            .base_image()
            .dockerfile
            .to_string();

        let install = dockerfile.find(installer).unwrap();
        let clone = dockerfile.find("git clone").unwrap();
        assert!(install < clone, "{org}/{repo}#{number}:\n{dockerfile}");
    }
}

#[test]
fn test_language_defaults_and_overrides() {
    let catalog = Catalog::load(&catalog_dir()).unwrap();

    let cobra = catalog.get("spf13", "cobra").unwrap();
    pretty_assert_eq!(cobra.language, Language::Go);
    pretty_assert_eq!(cobra.parser().label(), "go");

    let django = catalog.get("django", "django").unwrap();
    pretty_assert_eq!(django.parser().label(), "unittest");
}

#[test]
fn test_patterns_parser_from_catalog() {
    let catalog = Catalog::load(&catalog_dir()).unwrap();
    let redis = catalog.get("redis", "redis").unwrap();
    let parser = redis.parser();
    assert!(matches!(parser, LogParser::Patterns(_)));

    let result = parser.parse(indoc! {"
        [ok]: SET and GET an item (1 ms)
        [err]: EXPIRE - set timeouts multiple times in tests/unit/expire.tcl
        [skip]: DEBUG RELOAD with a key that has expired
        [ok]: DEL against a single item (0 ms)
        [ok]: SET and GET an item (2 ms)
    "});

    pretty_assert_eq!(
        result.passed().iter().collect::<Vec<_>>(),
        ["DEL against a single item", "SET and GET an item"]
    );
    pretty_assert_eq!(
        result.failed().iter().collect::<Vec<_>>(),
        ["EXPIRE - set timeouts multiple times in tests/unit/expire.tcl"]
    );
    pretty_assert_eq!(result.skipped_count(), 1);
}

#[test]
fn test_every_builtin_format_is_reachable_by_name() {
    for format in Format::ALL {
        let parser = format.to_string().parse::<Format>().map(LogParser::builtin).unwrap();
        pretty_assert_eq!(parser.label(), format.to_string());
    }
}
