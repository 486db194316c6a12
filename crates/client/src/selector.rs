//! Selector matching: decides whether a provider applies to a resource.

use globset::GlobBuilder;
use openctx_types::{ResourceDescriptor, Selector};
use url::Url;

/// Whether a provider declaring `selectors` applies to `resource`.
///
/// - `None` applies to every resource.
/// - `Some([])` applies to none.
/// - Otherwise every selector in the list must match (AND across the list).
pub fn matches(selectors: Option<&[Selector]>, resource: &ResourceDescriptor<'_>) -> bool {
    match selectors {
        None => true,
        Some([]) => false,
        Some(selectors) => selectors.iter().all(|selector| selector_matches(selector, resource)),
    }
}

/// Within one selector every present condition must hold.
pub fn selector_matches(selector: &Selector, resource: &ResourceDescriptor<'_>) -> bool {
    if let Some(pattern) = &selector.path
        && !path_matches(pattern, resource.uri)
    {
        return false;
    }
    if let Some(needle) = &selector.content_contains {
        return resource.content.is_some_and(|content| content.contains(needle.as_str()));
    }
    true
}

/// Test a glob against the URI's path component, and against the raw URI for
/// patterns written with a scheme. `*` stays within one path segment and only
/// `**` crosses `/`. An invalid glob never matches.
fn path_matches(pattern: &str, uri: &str) -> bool {
    let Ok(glob) = GlobBuilder::new(pattern).literal_separator(true).build() else {
        return false;
    };
    let matcher = glob.compile_matcher();
    if matcher.is_match(uri) {
        return true;
    }
    Url::parse(uri).is_ok_and(|url| matcher.is_match(url.path()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource<'a>(uri: &'a str, content: Option<&'a str>) -> ResourceDescriptor<'a> {
        ResourceDescriptor::new(uri, content)
    }

    #[test]
    fn undefined_selector_applies_everywhere() {
        for uri in ["file:///a.go", "https://example.com/x.ts", "not a uri"] {
            assert!(matches(None, &resource(uri, None)));
            assert!(matches(None, &resource(uri, Some("anything"))));
        }
    }

    #[test]
    fn empty_selector_applies_nowhere() {
        for uri in ["file:///a.go", "file:///src/main.go", "https://example.com/x.ts"] {
            assert!(!matches(Some(&[]), &resource(uri, Some("package main"))));
        }
    }

    #[test]
    fn path_glob_matches_by_extension() {
        let selectors = [Selector::path("**/*.go")];
        assert!(matches(Some(&selectors), &resource("file:///home/dev/src/main.go", None)));
        assert!(!matches(Some(&selectors), &resource("file:///home/dev/src/main.ts", None)));
    }

    #[test]
    fn single_star_stays_within_one_segment() {
        let shallow = [Selector::path("*.go")];
        assert!(!matches(Some(&shallow), &resource("file:///a/b/c.go", None)));

        let rooted = [Selector::path("/*.go")];
        assert!(matches(Some(&rooted), &resource("file:///c.go", None)));
        assert!(!matches(Some(&rooted), &resource("file:///a/b/c.go", None)));

        let deep = [Selector::path("**/*.go")];
        assert!(matches(Some(&deep), &resource("file:///a/b/c.go", None)));
    }

    #[test]
    fn content_contains_fails_closed_without_content() {
        let selectors = [Selector::content_contains("package main")];
        assert!(!matches(Some(&selectors), &resource("file:///a.go", None)));
        assert!(matches(Some(&selectors), &resource("file:///a.go", Some("package main\n"))));
        assert!(!matches(Some(&selectors), &resource("file:///a.go", Some("package lib\n"))));
    }

    #[test]
    fn conditions_within_one_selector_are_conjunctive() {
        let selector = Selector {
            path: Some("**/*.go".to_string()),
            content_contains: Some("func".to_string()),
        };
        assert!(selector_matches(&selector, &resource("file:///a.go", Some("func main() {}"))));
        assert!(!selector_matches(&selector, &resource("file:///a.ts", Some("func main() {}"))));
        assert!(!selector_matches(&selector, &resource("file:///a.go", Some("var x = 1"))));
    }

    #[test]
    fn every_selector_in_the_list_must_match() {
        let selectors = [Selector::path("**/*.go"), Selector::path("**/*.ts")];
        assert!(!matches(Some(&selectors), &resource("file:///a.go", Some(""))));
        assert!(!matches(Some(&selectors), &resource("file:///a.ts", Some(""))));

        let both = [Selector::path("**/*.go"), Selector::content_contains("TODO")];
        assert!(matches(Some(&both), &resource("file:///a.go", Some("// TODO"))));
    }

    #[test]
    fn invalid_glob_never_matches() {
        let selectors = [Selector::path("a[")];
        assert!(!matches(Some(&selectors), &resource("file:///a[", None)));
    }

    #[test]
    fn scheme_qualified_patterns_match_the_raw_uri() {
        let selectors = [Selector::path("https://github.com/**")];
        assert!(matches(Some(&selectors), &resource("https://github.com/org/repo", None)));
        assert!(!matches(Some(&selectors), &resource("https://gitlab.com/org/repo", None)));
    }
}
