use serde_json::json;
use std::cell::RefCell;
use wbi_map::template::{
    Context, DiagnosticSink, Template, TemplateError, compile_template, compile_template_with,
};

#[derive(Default)]
struct Recorder {
    reports: RefCell<Vec<(TemplateError, String)>>,
}

impl DiagnosticSink for Recorder {
    fn report(&self, error: &TemplateError, listing: &str) {
        self.reports
            .borrow_mut()
            .push((error.clone(), listing.to_string()));
    }
}

fn render(source: &str, ctx: serde_json::Value) -> Option<String> {
    compile_template(source, &Context::from(ctx))
}

#[test]
fn substitutes_context_fields() {
    let ctx = Context::new().with("currentIndicator", "42.0%");
    assert_eq!(
        compile_template("Value: {{ currentIndicator }}", &ctx).as_deref(),
        Some("Value: 42.0%")
    );
}

#[test]
fn text_without_markers_is_returned_as_is() {
    assert_eq!(render("plain <b>text</b>", json!({})).as_deref(), Some("plain <b>text</b>"));
    assert_eq!(render("", json!({})).as_deref(), Some(""));
}

#[test]
fn numbers_render_like_script_numbers() {
    let out = render("{{ a }}|{{ b }}|{{ a + b }}", json!({"a": 3, "b": 0.5}));
    assert_eq!(out.as_deref(), Some("3|0.5|3.5"));
}

#[test]
fn if_else_spans_markers() {
    let tpl = "{{ if (v > 10) { }}high{{ } else { }}low{{ } }}";
    assert_eq!(render(tpl, json!({"v": 12})).as_deref(), Some("high"));
    assert_eq!(render(tpl, json!({"v": 3})).as_deref(), Some("low"));
}

#[test]
fn counting_loop() {
    let tpl = "{{ for (var i = 0; i < 3; i++) { }}{{ i }},{{ } }}";
    assert_eq!(render(tpl, json!({})).as_deref(), Some("0,1,2,"));
}

#[test]
fn for_in_over_object() {
    let tpl = "{{ for (var k in obj) { }}{{ k }}={{ obj[k] }};{{ } }}";
    let out = render(tpl, json!({"obj": {"a": 1, "b": "two"}}));
    assert_eq!(out.as_deref(), Some("a=1;b=two;"));
}

#[test]
fn switch_with_default_and_break() {
    let tpl = "{{ switch (kind) { case 'a': }}A{{ break; default: }}D{{ } }}";
    assert_eq!(render(tpl, json!({"kind": "a"})).as_deref(), Some("A"));
    assert_eq!(render(tpl, json!({"kind": "z"})).as_deref(), Some("D"));
}

#[test]
fn switch_falls_through_without_break() {
    let tpl = "{{ switch (n) { case 1: }}one {{ case 2: }}two{{ } }}";
    assert_eq!(render(tpl, json!({"n": 1})).as_deref(), Some("one two"));
    assert_eq!(render(tpl, json!({"n": 2})).as_deref(), Some("two"));
}

#[test]
fn var_shadows_context_field() {
    let tpl = "{{ var label = 'x' + label; }}{{ label }}";
    assert_eq!(render(tpl, json!({"label": "y"})).as_deref(), Some("xy"));
}

#[test]
fn methods_and_ternary() {
    let tpl = "{{ n.toFixed(2) }} {{ n > 3 ? 'big' : 'small' }} {{ s.toUpperCase() }}";
    let out = render(tpl, json!({"n": 3.14159, "s": "ok"}));
    assert_eq!(out.as_deref(), Some("3.14 big OK"));
}

#[test]
fn null_fields_render_empty() {
    assert_eq!(render("[{{ x }}]", json!({"x": null})).as_deref(), Some("[]"));
}

#[test]
fn keyword_prefixed_names_are_control_code() {
    // `format` starts with `for`, so the marker is treated as a statement.
    let out = render("a{{ format }}b", json!({"format": "zzz"}));
    assert_eq!(out.as_deref(), Some("ab"));
}

#[test]
fn newlines_and_tabs_are_dropped() {
    let out = render("line1\n\tline2 {{ x }}", json!({"x": 1}));
    assert_eq!(out.as_deref(), Some("line1line2 1"));
}

#[test]
fn undefined_field_reports_and_yields_none() {
    let sink = Recorder::default();
    let out = compile_template_with("Value: {{ missing }}", &Context::new(), &sink);
    assert_eq!(out, None);
    let reports = sink.reports.borrow();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, TemplateError::Reference("missing".into()));
    assert!(reports[0].1.contains("emit missing"));
}

#[test]
fn syntax_errors_yield_none() {
    let sink = Recorder::default();
    let ctx = Context::new().with("x", 1.0);
    assert_eq!(compile_template_with("{{ if (x { }}a{{ } }}", &ctx, &sink), None);
    assert_eq!(compile_template_with("{{ x + }}", &ctx, &sink), None);
    assert_eq!(compile_template_with("{{ if (x) { }}unclosed", &ctx, &sink), None);
    assert_eq!(sink.reports.borrow().len(), 3);
    assert!(
        sink.reports
            .borrow()
            .iter()
            .all(|(err, _)| matches!(err, TemplateError::Syntax(_)))
    );
}

#[test]
fn reading_a_property_of_null_is_a_type_error() {
    let sink = Recorder::default();
    let ctx = Context::from(json!({"x": null}));
    assert_eq!(compile_template_with("{{ x.length }}", &ctx, &sink), None);
    assert!(matches!(sink.reports.borrow()[0].0, TemplateError::Type(_)));
}

#[test]
fn last_character_of_a_string_with_emoji() {
    let ctx = Context::new().with("s", "Kenya \u{1F1F0}\u{1F1EA}");
    assert_eq!(
        compile_template("{{ s[s.length - 1] }}", &ctx).as_deref(),
        Some("\u{1F1EA}")
    );
}

#[test]
fn deeply_nested_template_is_rejected() {
    let sink = Recorder::default();
    let ctx = Context::new().with("x", 1.0);
    let depth = 10_000;
    let source = format!("{{{{ {}x{} }}}}", "(".repeat(depth), ")".repeat(depth));
    assert_eq!(compile_template_with(&source, &ctx, &sink), None);
    let reports = sink.reports.borrow();
    assert_eq!(reports.len(), 1);
    assert!(matches!(reports[0].0, TemplateError::Range(_)));

    let shallow = format!("{{{{ {}x{} }}}}", "(".repeat(30), ")".repeat(30));
    assert_eq!(render(&shallow, json!({"x": 1})).as_deref(), Some("1"));
}

#[test]
fn runaway_loop_is_stopped() {
    let sink = Recorder::default();
    let out = compile_template_with("{{ for (;;) { }}x{{ } }}", &Context::new(), &sink);
    assert_eq!(out, None);
    assert!(matches!(sink.reports.borrow()[0].0, TemplateError::Range(_)));
}

#[test]
fn every_call_recompiles_from_source() {
    let tpl = "{{ v }}";
    let a = compile_template(tpl, &Context::new().with("v", "a"));
    let b = compile_template(tpl, &Context::new().with("v", "b"));
    assert_eq!((a.as_deref(), b.as_deref()), (Some("a"), Some("b")));
}

#[test]
fn listing_shows_instructions_in_order() {
    let listing = Template::scan("Hi {{ if (x) { }}{{ x }}{{ } }}").listing();
    let lines: Vec<&str> = listing.lines().map(str::trim).collect();
    assert_eq!(
        lines,
        vec!["0: text \"Hi \"", "1: exec if (x) {", "2: emit x", "3: exec }"]
    );
}
