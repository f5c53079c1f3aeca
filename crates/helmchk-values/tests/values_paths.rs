use color_eyre::eyre;
use helmchk_values::{DocumentError, extract_values_paths, load_values_paths, parse_values_document};
use indoc::indoc;
use test_util::prelude::*;

fn paths_of(src: &str) -> eyre::Result<Vec<String>> {
    let doc = parse_values_document("values.yaml", src)?;
    Ok(extract_values_paths(&doc).to_strings())
}

#[test]
fn nested_mappings_and_sequences() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths_of(indoc! {r#"
        image:
          repository: nginx
          tag: ""
        imagePullSecrets:
          - name: regcred
          - name: other
            optional: true
        replicaCount: 1
    "#})?;
    sim_assert_eq!(
        got,
        vec![
            ".$",
            ".$.image",
            ".$.image.repository",
            ".$.image.tag",
            ".$.imagePullSecrets",
            ".$.imagePullSecrets.[*]",
            ".$.imagePullSecrets.[*].name",
            ".$.imagePullSecrets.[*].optional",
            ".$.replicaCount",
        ]
    );
    Ok(())
}

#[test]
fn empty_containers_and_nulls_are_leaves() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths_of(indoc! {r#"
        podAnnotations: {}
        tolerations: []
        nodeName:
    "#})?;
    sim_assert_eq!(
        got,
        vec![".$", ".$.nodeName", ".$.podAnnotations", ".$.tolerations"]
    );
    Ok(())
}

#[test]
fn empty_document_is_only_the_root() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    sim_assert_eq!(paths_of("")?, vec![".$"]);
    sim_assert_eq!(paths_of("# nothing but a comment\n")?, vec![".$"]);
    Ok(())
}

#[test]
fn non_string_keys_are_stringified() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths_of(indoc! {r#"
        ports:
          8080: http
          true: yes
    "#})?;
    assert_that!(got, contains(eq(".$.ports.8080")));
    assert_that!(got, contains(eq(".$.ports.true")));
    Ok(())
}

#[test]
fn nested_sequences_collapse_per_level() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths_of(indoc! {r#"
        matrix:
          - [1, 2]
          - - a: 1
    "#})?;
    sim_assert_eq!(
        got,
        vec![
            ".$",
            ".$.matrix",
            ".$.matrix.[*]",
            ".$.matrix.[*].[*]",
            ".$.matrix.[*].[*].a",
        ]
    );
    Ok(())
}

#[test]
fn merge_keys_are_applied() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths_of(indoc! {r#"
        base: &base
          cpu: 1
        worker:
          <<: *base
          memory: 2
    "#})?;
    assert_that!(got, contains(eq(".$.worker.cpu")));
    assert_that!(got, contains(eq(".$.worker.memory")));
    assert_that!(got, not(contains(eq(".$.worker.<<"))));
    Ok(())
}

#[test]
fn tagged_values_are_walked_through() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths_of("config: !custom\n  key: value\n")?;
    assert_that!(got, contains(eq(".$.config.key")));
    Ok(())
}

#[test]
fn invalid_yaml_is_a_document_error() {
    let _guard = Builder::default().build();
    let err = parse_values_document("broken.yaml", "a: [unterminated\n").unwrap_err();
    assert!(matches!(err, DocumentError::Parse { ref path, .. } if path == "broken.yaml"));
}

#[test]
fn missing_file_is_a_document_error() {
    let _guard = Builder::default().build();
    let root = vfs::VfsPath::new(vfs::MemoryFS::new());
    let missing = root.join("values.yaml").expect("join");
    let err = load_values_paths(&missing).unwrap_err();
    assert!(matches!(err, DocumentError::Read { .. }));
}

#[test]
fn loads_from_virtual_filesystem() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let root = vfs::VfsPath::new(vfs::MemoryFS::new());
    let path = test_util::write(&root.join("values.yaml")?, "a:\n  b: 1\n")?;
    let got = load_values_paths(&path)?.to_strings();
    sim_assert_eq!(got, vec![".$", ".$.a", ".$.a.b"]);
    Ok(())
}
