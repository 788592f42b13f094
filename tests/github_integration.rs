use gh_changelog::github::{parse_upstream_prs, RestComparison, RestPull};

// Integration tests focus on decoding gh payloads
// Mock tests are better as unit tests inside the module

#[test]
fn test_compare_fixture_deserialization() {
    let compare_json = include_str!("../fixtures/github/compare.json");
    let comparison: RestComparison = serde_json::from_str(compare_json).unwrap();

    assert_eq!(comparison.total_commits, Some(3));
    assert_eq!(comparison.commits.len(), 3);
    assert_eq!(
        comparison.commits[0].sha,
        "8d1e2a4f0c6b3a9e5d7f1b2c4a6e8d0f1a3b5c7d"
    );
}

#[test]
fn test_pulls_fixture_deserialization() {
    let pulls_json = include_str!("../fixtures/github/pulls.json");
    let pulls: Vec<RestPull> = serde_json::from_str(pulls_json).unwrap();

    assert_eq!(pulls.len(), 3);

    let backport = &pulls[0];
    assert!(backport.is_merged());
    assert!(backport.has_label("kind/backports"));
    assert_eq!(
        parse_upstream_prs(backport.body.as_deref().unwrap()),
        vec![5, 6]
    );

    assert_eq!(pulls[1].user.login, "alice");
    assert!(pulls[1].body.is_none());
    assert!(!pulls[2].is_merged());
}
