use serde_json::json;

use super::*;

fn ns(v: serde_json::Value) -> Namespace {
    Namespace::from_value(v)
}

#[test]
fn interpolates_dotted_paths_and_blanks_unresolved() {
    let m = Markup::parse("Hi {{user.name}}! {{missing.path}}.").unwrap();
    let out = m.render(&ns(json!({"user": {"name": "Ada"}})), MarkupTarget::Css);
    assert_eq!(out, "Hi Ada! .");
}

#[test]
fn html_target_escapes_unless_triple_stache() {
    let m = Markup::parse("<p>{{msg}}</p>{{{msg}}}").unwrap();
    let out = m.render(&ns(json!({"msg": "<b>&</b>"})), MarkupTarget::Html);
    assert_eq!(out, "<p>&lt;b&gt;&amp;&lt;/b&gt;</p><b>&</b>");
}

#[test]
fn if_else_uses_truthiness() {
    let m = Markup::parse("{{#if on}}yes{{else}}no{{/if}}").unwrap();
    assert_eq!(m.render(&ns(json!({"on": true})), MarkupTarget::Html), "yes");
    assert_eq!(m.render(&ns(json!({"on": 0})), MarkupTarget::Html), "no");
    assert_eq!(m.render(&ns(json!({"on": ""})), MarkupTarget::Html), "no");
    assert_eq!(m.render(&ns(json!({})), MarkupTarget::Html), "no");
    assert_eq!(m.render(&ns(json!({"on": [1]})), MarkupTarget::Html), "yes");
}

#[test]
fn each_iterates_arrays_with_this_and_index() {
    let m = Markup::parse("{{#each styles.colors}}[{{@index}}:{{this}}]{{/each}}").unwrap();
    let out = m.render(
        &ns(json!({"styles": {"colors": ["#000", "#fff"]}})),
        MarkupTarget::Css,
    );
    assert_eq!(out, "[0:#000][1:#fff]");
}

#[test]
fn each_item_fields_shadow_root_and_fall_back() {
    let m = Markup::parse("{{#each people}}{{name}}@{{site}};{{/each}}").unwrap();
    let out = m.render(
        &ns(json!({"site": "home", "people": [{"name": "a"}, {"name": "b", "site": "x"}]})),
        MarkupTarget::Script,
    );
    assert_eq!(out, "a@home;b@x;");
}

#[test]
fn numbers_render_without_trailing_zero() {
    let m = Markup::parse("{{n}}/{{f}}/{{list}}").unwrap();
    let out = m.render(&ns(json!({"n": 10.0, "f": 0.5, "list": [1, "a"]})), MarkupTarget::Css);
    assert_eq!(out, "10/0.5/1,a");
}

#[test]
fn syntax_errors_are_single_document_failures() {
    for bad in [
        "{{#if a}}open",
        "{{/if}}",
        "{{#each a}}{{/if}}",
        "{{#unless a}}{{/unless}}",
        "{{unclosed",
        "{{}}",
        "{{else}}",
        "{{#if a}}x{{else}}y{{else}}z{{/if}}",
    ] {
        let err = Markup::parse(bad).unwrap_err();
        assert!(err.to_string().contains("markup error:"), "{bad}: {err}");
    }
}

#[test]
fn comments_are_dropped_and_paths_listed() {
    let m = Markup::parse("{{! note }}{{b}}{{#if a}}{{c}}{{/if}}{{#each d}}{{e}}{{/each}}").unwrap();
    assert_eq!(m.render(&ns(json!({"b": 1})), MarkupTarget::Html), "1");
    assert_eq!(m.referenced_paths(), vec!["a", "b", "c", "d"]);
}
