use color_eyre::eyre;
use helmchk_ir::{
    EntryContext, ExtractorOptions, PathExtractor, ResolutionError, ScopedPathExtractor,
    extract_template_paths,
};
use helmchk_template::{SourceKind, TemplateSet};
use indoc::indoc;
use test_util::prelude::*;

fn template_set(sources: &[(&str, &str)]) -> eyre::Result<TemplateSet> {
    let mut set = TemplateSet::new();
    for (name, src) in sources {
        set.add_source(name, src, SourceKind::Entry)?;
    }
    Ok(set)
}

fn paths(sources: &[(&str, &str)]) -> eyre::Result<Vec<String>> {
    let set = template_set(sources)?;
    Ok(extract_template_paths(&set)?.to_strings())
}

// ===========================================================================
// field access
// ===========================================================================

#[test]
fn single_values_reference() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    sim_assert_eq!(paths(&[("foo", "{{ .Values.foo }}")])?, vec![".$", ".$.foo"]);
    Ok(())
}

#[test]
fn references_from_several_templates() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[("foo", "{{ .Values.foo }}"), ("bar", "{{ .Values.bar }}")])?;
    sim_assert_eq!(got, vec![".$", ".$.bar", ".$.foo"]);
    Ok(())
}

#[test]
fn duplicate_references_are_merged() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[
        ("foo", "{{ .Values.foo }}"),
        ("foo-again", "{{ .Values.foo }}{{ .Values.foo }}"),
    ])?;
    sim_assert_eq!(got, vec![".$", ".$.foo"]);
    Ok(())
}

#[test]
fn top_level_fields_other_than_values_are_ignored() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[(
        "foo",
        "{{ .foo }}{{ .Release.Name }}{{ .Chart.Name }}{{ .Capabilities.KubeVersion }}{{ . }}",
    )])?;
    sim_assert_eq!(got, Vec::<String>::new());
    Ok(())
}

#[test]
fn dollar_reaches_values_from_any_context() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[(
        "foo",
        "{{ range .Values.items }}{{ .name }}{{ $.Values.global.tag }}{{ end }}",
    )])?;
    sim_assert_eq!(
        got,
        vec![
            ".$",
            ".$.global",
            ".$.global.tag",
            ".$.items",
            ".$.items.[*]",
            ".$.items.[*].name",
        ]
    );
    Ok(())
}

// ===========================================================================
// variables
// ===========================================================================

#[test]
fn variable_declaration_records_its_path() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[("foo", "{{ $aa := .Values.test1.test2 }}")])?;
    sim_assert_eq!(got, vec![".$", ".$.test1", ".$.test1.test2"]);
    Ok(())
}

#[test]
fn variables_chain_through_other_variables() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[(
        "foo",
        "{{ $aa := .Values.test1 }}{{ $bb := $aa.test2 }}{{ $bb.test3 }}",
    )])?;
    sim_assert_eq!(
        got,
        vec![".$", ".$.test1", ".$.test1.test2", ".$.test1.test2.test3"]
    );
    Ok(())
}

#[test]
fn field_access_on_a_variable() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[("foo", "{{ $value := .Values.test }}{{ $value.value }}")])?;
    sim_assert_eq!(got, vec![".$", ".$.test", ".$.test.value"]);
    Ok(())
}

#[test]
fn redeclaration_keeps_both_targets() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[(
        "foo",
        "{{ $value := .Values.test1 }}{{ $value := .Values.test2 }}{{ $value.value }}",
    )])?;
    sim_assert_eq!(
        got,
        vec![
            ".$",
            ".$.test1",
            ".$.test1.value",
            ".$.test2",
            ".$.test2.value",
        ]
    );
    Ok(())
}

#[test]
fn assignment_adds_to_the_declared_variable() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[(
        "foo",
        "{{ $x := .Values.a }}{{ if .Values.flag }}{{ $x = .Values.b }}{{ end }}{{ $x.c }}",
    )])?;
    sim_assert_eq!(
        got,
        vec![".$", ".$.a", ".$.a.c", ".$.b", ".$.b.c", ".$.flag"]
    );
    Ok(())
}

#[test]
fn default_yields_every_alternative() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[(
        "foo",
        "{{ $name := default .Values.test1 .Values.test2 }}{{ $name.test3 }}",
    )])?;
    sim_assert_eq!(
        got,
        vec![
            ".$",
            ".$.test1",
            ".$.test1.test3",
            ".$.test2",
            ".$.test2.test3",
        ]
    );
    Ok(())
}

#[test]
fn undefined_variable_is_a_resolution_error() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let set = template_set(&[("templates/foo.yaml", "ok\n{{ $nope.a }}")])?;
    let err = extract_template_paths(&set).unwrap_err();
    let ResolutionError::UndefinedVariable { name, unit, pos } = err else {
        panic!("expected an undefined variable, got {err:?}");
    };
    sim_assert_eq!(name, "$nope");
    sim_assert_eq!(unit, "templates/foo.yaml");
    sim_assert_eq!(pos.line, 2);
    Ok(())
}

#[test]
fn variables_do_not_escape_their_construct() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let set = template_set(&[(
        "foo",
        "{{ if .Values.a }}{{ $x := .Values.b }}{{ end }}{{ $x }}",
    )])?;
    let err = extract_template_paths(&set).unwrap_err();
    assert!(matches!(err, ResolutionError::UndefinedVariable { ref name, .. } if name == "$x"));
    Ok(())
}

#[test]
fn assignment_to_an_undeclared_variable_is_an_error() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let set = template_set(&[("foo", "{{ $x = .Values.b }}")])?;
    let err = extract_template_paths(&set).unwrap_err();
    assert!(matches!(err, ResolutionError::UndeclaredAssignment { .. }));
    Ok(())
}

// ===========================================================================
// range, with, if
// ===========================================================================

#[test]
fn range_records_the_collection_and_its_elements() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[("foo", "{{ range $key, $value := .Values.test }}{{ end }}")])?;
    sim_assert_eq!(got, vec![".$", ".$.test", ".$.test.[*]"]);
    Ok(())
}

#[test]
fn range_binds_key_and_value_to_the_element() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[(
        "foo",
        "{{ range $key, $value := .Values.test }}{{ $key.key }}{{ $value.value.test1 }}{{ end }}",
    )])?;
    sim_assert_eq!(
        got,
        vec![
            ".$",
            ".$.test",
            ".$.test.[*]",
            ".$.test.[*].key",
            ".$.test.[*].value",
            ".$.test.[*].value.test1",
        ]
    );
    Ok(())
}

#[test]
fn range_variables_hold_the_collection_in_else() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[(
        "foo",
        "{{ range $i, $x := .Values.a }}{{ $x.b }}{{ else }}{{ $x }}{{ $x.fallback }}{{ end }}",
    )])?;
    sim_assert_eq!(
        got,
        vec![".$", ".$.a", ".$.a.[*]", ".$.a.[*].b", ".$.a.fallback"]
    );
    Ok(())
}

#[test]
fn range_variables_do_not_escape_the_loop() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let set = template_set(&[(
        "foo",
        "{{ range $x := .Values.a }}{{ else }}{{ end }}{{ $x }}",
    )])?;
    let err = extract_template_paths(&set).unwrap_err();
    assert!(matches!(err, ResolutionError::UndefinedVariable { ref name, .. } if name == "$x"));
    Ok(())
}

#[test]
fn with_narrows_the_context() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[("foo", "{{ with .Values.test1 }}{{ .test2 }}{{ end }}")])?;
    sim_assert_eq!(got, vec![".$", ".$.test1", ".$.test1.test2"]);
    Ok(())
}

#[test]
fn with_and_bare_dot() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[("foo", "{{ with .Values.test1 }}{{ . }}{{ end }}")])?;
    sim_assert_eq!(got, vec![".$", ".$.test1"]);
    Ok(())
}

#[test]
fn with_else_runs_in_the_outer_context() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[(
        "foo",
        "{{ with .Values.a }}{{ .b }}{{ else with .Values.c }}{{ .d }}{{ else }}{{ .Values.e }}{{ end }}",
    )])?;
    sim_assert_eq!(
        got,
        vec![".$", ".$.a", ".$.a.b", ".$.c", ".$.c.d", ".$.e"]
    );
    Ok(())
}

#[test]
fn if_keeps_the_context() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[(
        "foo",
        "{{ if .Values.test1 }}{{ . }}{{ .Values.test2 }}{{ else if .Values.test3 }}{{ end }}",
    )])?;
    sim_assert_eq!(got, vec![".$", ".$.test1", ".$.test2", ".$.test3"]);
    Ok(())
}

// ===========================================================================
// sub-templates
// ===========================================================================

#[test]
fn template_invocation_analyzes_the_define_with_its_argument() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[
        ("foo", r#"{{ define "T1" }}{{ .test2 }}{{ end }} {{ .Values.foo }}"#),
        ("bar", r#"{{ template "T1" .Values.test1 }}"#),
        ("baz", "{{ .Values.bar }}"),
    ])?;
    sim_assert_eq!(
        got,
        vec![".$", ".$.bar", ".$.foo", ".$.test1", ".$.test1.test2"]
    );
    Ok(())
}

#[test]
fn nested_template_invocations() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[(
        "foo",
        indoc! {r#"
            {{- define "T1" }}{{ .test1 }}{{ end }}
            {{- define "T2" }}{{ template "T1" .test2 }}{{ end }}
            {{- define "T3" }}{{ template "T2" .test3 }}{{ end }}
            {{- template "T1" .Values.test1 }}
            {{- template "T2" .Values.test1 }}
            {{- template "T3" .Values.test1 }}
        "#},
    )])?;
    sim_assert_eq!(
        got,
        vec![
            ".$",
            ".$.test1",
            ".$.test1.test1",
            ".$.test1.test2",
            ".$.test1.test2.test1",
            ".$.test1.test3",
            ".$.test1.test3.test2",
            ".$.test1.test3.test2.test1",
        ]
    );
    Ok(())
}

#[test]
fn one_unit_invoked_with_different_contexts() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[(
        "foo",
        r#"{{ define "t" }}{{ .name }}{{ end }}{{ template "t" .Values.x }}{{ include "t" .Values.y }}"#,
    )])?;
    sim_assert_eq!(got, vec![".$", ".$.x", ".$.x.name", ".$.y", ".$.y.name"]);
    Ok(())
}

#[test]
fn include_with_a_dict_context() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[(
        "foo",
        indoc! {r#"
            {{- define "x" }}{{ .ctx.b }}{{ .root.Values.z }}{{ .missing }}{{ end }}
            {{- include "x" (dict "ctx" .Values.a "root" $) | nindent 4 }}
        "#},
    )])?;
    sim_assert_eq!(got, vec![".$", ".$.a", ".$.a.b", ".$.z"]);
    Ok(())
}

#[test]
fn block_is_a_define_and_an_invocation() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[("foo", r#"{{ block "b" .Values.a }}{{ .c }}{{ end }}"#)])?;
    sim_assert_eq!(got, vec![".$", ".$.a", ".$.a.c"]);
    Ok(())
}

#[test]
fn uninvoked_self_reference_contributes_nothing() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let mut set = TemplateSet::new();
    set.add_source(
        "_helpers.tpl",
        r#"{{ define "loop" }}{{ .Values.a }}{{ template "loop" . }}{{ end }}"#,
        SourceKind::Partial,
    )?;
    set.add_source("foo", "{{ .Values.b }}", SourceKind::Entry)?;
    sim_assert_eq!(extract_template_paths(&set)?.to_strings(), vec![".$", ".$.b"]);
    Ok(())
}

#[test]
fn invoked_self_recursion_terminates() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[(
        "foo",
        indoc! {r#"
            {{- define "tree" }}{{ .name }}{{ range .children }}{{ template "tree" . }}{{ end }}{{ end }}
            {{- template "tree" .Values.root }}
        "#},
    )])?;
    sim_assert_eq!(
        got,
        vec![
            ".$",
            ".$.root",
            ".$.root.children",
            ".$.root.children.[*]",
            ".$.root.name",
        ]
    );
    Ok(())
}

#[test]
fn recursion_with_a_finite_dict_context_follows_each_context() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[(
        "foo",
        indoc! {r#"
            {{- define "walk" }}{{ .cur.name }}{{ if .next }}{{ include "walk" (dict "cur" .next) }}{{ end }}{{ end }}
            {{- include "walk" (dict "cur" .Values.first "next" .Values.second) }}
        "#},
    )])?;
    sim_assert_eq!(
        got,
        vec![".$", ".$.first", ".$.first.name", ".$.second", ".$.second.name"]
    );
    Ok(())
}

#[test]
fn recursion_with_a_growing_dict_context_terminates() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[(
        "foo",
        indoc! {r#"
            {{- define "node" }}{{ .node.name }}{{ include "node" (dict "node" .node.child) }}{{ end }}
            {{- include "node" (dict "node" .Values.tree) }}
        "#},
    )])?;
    sim_assert_eq!(
        got,
        vec![".$", ".$.tree", ".$.tree.child", ".$.tree.name"]
    );
    Ok(())
}

#[test]
fn missing_templates_contribute_nothing() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[("foo", r#"{{ template "missing" .Values.a }}{{ include "gone" . }}"#)])?;
    sim_assert_eq!(got, vec![".$", ".$.a"]);
    Ok(())
}

// ===========================================================================
// functions and pipelines
// ===========================================================================

#[test]
fn modelled_functions() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let set = template_set(&[(
        "foo",
        indoc! {r#"
            {{ index .Values.map "key" }}
            {{ (.Values.hosts | first).host }}
            {{ (required "msg" .Values.req).sub }}
            {{ (ternary .Values.t1 .Values.t2 true).x }}
            {{ (get .Values.labels "app") }}
            {{ (dig "a" "b" "none" .Values.nested) }}
            {{ (coalesce .Values.c1 .Values.c2).y }}
            {{ .Values.plain | toYaml | nindent 2 }}
        "#},
    )])?;
    let got = extract_template_paths(&set)?;
    for expected in [
        ".$.map.key",
        ".$.hosts.[*].host",
        ".$.req.sub",
        ".$.t1.x",
        ".$.t2.x",
        ".$.labels.app",
        ".$.nested.a.b",
        ".$.c1.y",
        ".$.c2.y",
        ".$.plain",
    ] {
        assert_that!(got, has_value_path(expected));
    }
    assert!(got.is_closed());
    Ok(())
}

#[test]
fn pipeline_passes_the_previous_result_last() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let got = paths(&[("foo", r#"{{ (.Values.a | default .Values.b).c | quote }}"#)])?;
    sim_assert_eq!(got, vec![".$", ".$.a", ".$.a.c", ".$.b", ".$.b.c"]);
    Ok(())
}

#[test]
fn values_entry_context() -> eyre::Result<()> {
    let _guard = Builder::default().build();
    let set = template_set(&[("foo", "{{ .foo }}{{ with .bar }}{{ .baz }}{{ end }}")])?;
    let extractor = ScopedPathExtractor::new(ExtractorOptions {
        entry_context: EntryContext::Values,
        ..ExtractorOptions::default()
    });
    sim_assert_eq!(
        extractor.extract(&set)?.to_strings(),
        vec![".$", ".$.bar", ".$.bar.baz", ".$.foo"]
    );
    Ok(())
}
