use googletest::{assert_that, matchers::*};

use crate::{Path, PathParseError, PathSet, Segment, close};

fn p(s: &str) -> Path {
    s.parse().expect("valid path")
}

#[test]
fn renders_root_fields_and_wildcards() {
    assert_eq!(Path::root().to_string(), ".$");
    let path = Path::root().child("image").child("pullSecrets").wildcard().child("name");
    assert_eq!(path.to_string(), ".$.image.pullSecrets.[*].name");
}

#[test]
fn parses_rendered_form() {
    assert_eq!(p(".$"), Path::root());
    assert_eq!(
        p(".$.test.[*].key"),
        Path::from_segments(vec![
            Segment::field("test"),
            Segment::Wildcard,
            Segment::field("key"),
        ])
    );
    assert_eq!(
        "$.a".parse::<Path>(),
        Err(PathParseError::MissingRoot("$.a".to_string()))
    );
    assert_eq!(
        ".$.a..b".parse::<Path>(),
        Err(PathParseError::EmptySegment(".$.a..b".to_string()))
    );
    assert!(".$a".parse::<Path>().is_err());
}

#[test]
fn descendants_sort_directly_after_their_ancestor() {
    let mut paths = vec![p(".$.a-b"), p(".$.a.b"), p(".$.a"), p(".$.b"), p(".$")];
    paths.sort();
    let rendered: Vec<String> = paths.iter().map(ToString::to_string).collect();
    assert_eq!(rendered, vec![".$", ".$.a", ".$.a.b", ".$.a-b", ".$.b"]);
}

#[test]
fn wildcard_orders_by_its_marker() {
    // `[` sorts between upper and lower case ASCII letters
    let mut paths = vec![p(".$.x.b"), p(".$.x.[*]"), p(".$.x.B")];
    paths.sort();
    let rendered: Vec<String> = paths.iter().map(ToString::to_string).collect();
    assert_eq!(rendered, vec![".$.x.B", ".$.x.[*]", ".$.x.b"]);
}

#[test]
fn ancestor_relation_is_segment_aware() {
    assert!(p(".$.foo").is_ancestor_or_self_of(&p(".$.foo.bar")));
    assert!(p(".$.foo").is_ancestor_or_self_of(&p(".$.foo")));
    assert!(!p(".$.foo").is_ancestor_or_self_of(&p(".$.foobar")));
    assert!(Path::root().is_ancestor_or_self_of(&p(".$.x")));
}

#[test]
fn insert_keeps_the_set_prefix_closed() {
    let mut set = PathSet::new();
    assert!(set.insert(p(".$.a.b.c")));
    assert!(!set.insert(p(".$.a.b.c")));
    assert!(!set.insert(p(".$.a")));
    assert_eq!(set.to_strings(), vec![".$", ".$.a", ".$.a.b", ".$.a.b.c"]);
    assert!(set.is_closed());
}

#[test]
fn close_is_idempotent() {
    let once = close([p(".$.x.[*].y"), p(".$.z")]);
    let twice = close(once.clone());
    assert_eq!(once, twice);
    assert!(once.is_closed());
    assert_that!(once.to_strings(), contains(eq(".$.x.[*]")));
    assert_eq!(
        once.to_strings(),
        vec![".$", ".$.x", ".$.x.[*]", ".$.x.[*].y", ".$.z"]
    );
}

#[test]
fn close_of_root_only() {
    let set = close([Path::root()]);
    assert_eq!(set.len(), 1);
    assert!(set.contains(&Path::root()));
}

#[test]
fn paths_serialize_as_strings() {
    let set = close([p(".$.a")]);
    let json = serde_json::to_string(&set).expect("serialize");
    similar_asserts::assert_eq!(json, r#"[".$",".$.a"]"#);
    let back: Path = serde_json::from_str(r#"".$.a.[*]""#).expect("deserialize");
    assert_eq!(back, p(".$.a").wildcard());
}

#[test]
fn ancestors_exclude_the_path_itself() {
    let ancestors: Vec<String> = p(".$.a.b").ancestors().map(|a| a.to_string()).collect();
    assert_eq!(ancestors, vec![".$", ".$.a"]);
    assert_eq!(Path::root().ancestors().count(), 0);
}
