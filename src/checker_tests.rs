use std::collections::HashMap;

use rayon::prelude::*;
use serde_json::{json, Value};

use crate::cache::CompilationCache;
use crate::checker::SvelteTypeChecker;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::CheckerError;
use crate::options::CompilerOptions;
use crate::program::Program;

const APP: &str = "src/App.svelte.ts";

const COMPONENTS: &[(&str, &str)] = &[
    (
        "src/Profile.svelte.d.ts",
        "export default class Profile { user: { name: string; age: number }; }",
    ),
    (
        "src/Widget.svelte.d.ts",
        "export default class Widget { title: string; size?: number; }",
    ),
    (
        "src/Input.svelte.d.ts",
        "export default class Input { value: string; placeholder?: string; }",
    ),
    (
        "src/Card.svelte.d.ts",
        r#"
        import { SvelteComponentTyped } from "svelte";
        export default class Card extends SvelteComponentTyped<{ title: string; count: number }> {}
        "#,
    ),
    ("src/helper.ts", "const helper = () => 1;\nexport default helper;"),
    ("src/ui/Button.svelte.d.ts", "export default class Button { label: string; }"),
    (
        "src/ui/index.ts",
        r#"export { default as Button } from "./Button.svelte";"#,
    ),
];

struct Fixture {
    cache: CompilationCache,
    sources: HashMap<String, String>,
    program: Program,
}

impl Fixture {
    fn new() -> Self {
        let mut program = Program::new();
        for (file, text) in COMPONENTS {
            program.add_module(*file, text);
        }
        Self {
            cache: CompilationCache::new(),
            sources: HashMap::new(),
            program,
        }
    }

    /// Registers a compiled component. `build` receives the full template
    /// text so node offsets can be taken from it.
    fn add(
        &mut self,
        script_file: &str,
        script: &str,
        markup: &str,
        build: impl Fn(&str) -> Vec<Value>,
    ) {
        let template = format!("<script lang=\"ts\">\n{}\n</script>\n\n{}\n", script, markup);
        let html = fragment(build(&template));
        let compilation = json!({ "ast": { "html": html } }).to_string();
        self.cache
            .insert_json(script_file, script, &compilation)
            .unwrap();
        self.sources.insert(
            crate::source::template_file_for_script(script_file),
            template,
        );
    }

    fn checker(
        &self,
        options: CompilerOptions,
    ) -> SvelteTypeChecker<'_, HashMap<String, String>, Program> {
        SvelteTypeChecker::new(options, &self.cache, &self.sources, &self.program)
    }

    fn check(&self, script_file: &str) -> Vec<Diagnostic> {
        self.checker(CompilerOptions::strict())
            .gather_all_diagnostics(script_file)
            .unwrap()
    }
}

fn at(template: &str, needle: &str) -> u32 {
    template
        .find(needle)
        .unwrap_or_else(|| panic!("`{}` not in template", needle)) as u32
}

fn fragment(children: Vec<Value>) -> Value {
    json!({ "type": "Fragment", "start": 0, "end": 0, "children": children })
}

/// `opening` is the start of the tag, e.g. `<Profile user`; it must be unique.
fn component(template: &str, opening: &str, attributes: Vec<Value>, children: Vec<Value>) -> Value {
    let start = at(template, opening);
    let rest = &template[start as usize..];
    let end = start + rest.find('>').unwrap_or(0) as u32 + 1;
    let name = opening
        .trim_start_matches('<')
        .split(|c: char| !c.is_alphanumeric())
        .next()
        .unwrap_or_default();
    json!({
        "type": "InlineComponent", "name": name, "start": start, "end": end,
        "attributes": attributes, "children": children
    })
}

/// `name={ident}`
fn bound(template: &str, name: &str, ident: &str) -> Value {
    let snippet = format!("{}={{{}}}", name, ident);
    let start = at(template, &snippet);
    let tag_start = start + name.len() as u32 + 1;
    let ident_start = tag_start + 1;
    json!({
        "type": "Attribute", "name": name, "start": start, "end": start + snippet.len() as u32,
        "value": [{
            "type": "MustacheTag", "start": tag_start, "end": tag_start + ident.len() as u32 + 2,
            "expression": {
                "type": "Identifier", "name": ident,
                "start": ident_start, "end": ident_start + ident.len() as u32
            }
        }]
    })
}

/// `name="text"`
fn text(template: &str, name: &str, value: &str) -> Value {
    let snippet = format!("{}=\"{}\"", name, value);
    let start = at(template, &snippet);
    let text_start = start + name.len() as u32 + 2;
    json!({
        "type": "Attribute", "name": name, "start": start, "end": start + snippet.len() as u32,
        "value": [{
            "type": "Text", "start": text_start, "end": text_start + value.len() as u32,
            "raw": value, "data": value
        }]
    })
}

/// `{...ident}`
fn spread(template: &str, ident: &str) -> Value {
    let snippet = format!("{{...{}}}", ident);
    let start = at(template, &snippet);
    let ident_start = start + 4;
    json!({
        "type": "Spread", "start": start, "end": start + snippet.len() as u32,
        "expression": {
            "type": "Identifier", "name": ident,
            "start": ident_start, "end": ident_start + ident.len() as u32
        }
    })
}

fn codes(diagnostics: &[Diagnostic]) -> Vec<u32> {
    diagnostics.iter().map(|d| d.code).collect()
}

#[test]
fn test_missing_object_property_is_type_mismatch() {
    let mut fixture = Fixture::new();
    fixture.add(
        APP,
        "import Profile from \"./Profile.svelte\";\nlet user: { name: string };",
        "<Profile user={user} />",
        |t| vec![component(t, "<Profile", vec![bound(t, "user", "user")], vec![])],
    );

    let diagnostics = fixture.check(APP);
    assert_eq!(codes(&diagnostics), vec![DiagnosticCode::ComponentTypesNotAssignable.code()]);
    let message = &diagnostics[0].message_text;
    assert!(
        message.starts_with(
            "Type '{ name: string; }' is not assignable to type '{ name: string; age: number; }'."
        ),
        "{}",
        message
    );
    assert!(message.contains("Property 'age' is missing"), "{}", message);
    assert_eq!(diagnostics[0].file, "src/App.svelte");
}

#[test]
fn test_unknown_attribute_is_reported() {
    let mut fixture = Fixture::new();
    fixture.add(
        APP,
        "import Widget from \"./Widget.svelte\";",
        "<Widget foo=\"bar\" />",
        |t| vec![component(t, "<Widget", vec![text(t, "foo", "bar")], vec![])],
    );

    let diagnostics = fixture.check(APP);
    assert_eq!(codes(&diagnostics), vec![DiagnosticCode::NonExistentProperty.code()]);
    assert!(diagnostics[0].message_text.contains("'foo'"));
    assert_eq!(diagnostics[0].length, "foo=\"bar\"".len() as u32);
}

#[test]
fn test_component_without_import() {
    let mut fixture = Fixture::new();
    fixture.add(APP, "let unrelated = 1;", "<Foo />", |t| {
        vec![component(t, "<Foo", vec![], vec![])]
    });

    let diagnostics = fixture.check(APP);
    assert_eq!(codes(&diagnostics), vec![DiagnosticCode::ComponentImportNotFound.code()]);
    assert_eq!(
        diagnostics[0].message_text,
        "Import declaration for 'Foo' cannot be found."
    );
}

#[test]
fn test_undeclared_identifier_only_reports_declaration() {
    let mut fixture = Fixture::new();
    fixture.add(
        APP,
        "import Input from \"./Input.svelte\";\nlet missing = \"\";",
        "<Input value={missingVar} />",
        |t| vec![component(t, "<Input", vec![bound(t, "value", "missingVar")], vec![])],
    );

    let diagnostics = fixture.check(APP);
    assert_eq!(codes(&diagnostics), vec![DiagnosticCode::DeclarationNotFound.code()]);
    assert!(diagnostics[0].message_text.starts_with("Cannot find name 'missingVar'."));
}

#[test]
fn test_repeated_runs_are_identical() {
    let mut fixture = Fixture::new();
    fixture.add(
        APP,
        "import Widget from \"./Widget.svelte\";\nlet size = \"large\";",
        "<Widget title={nope} size={size} extra=\"1\" />\n<Missing />",
        |t| {
            vec![
                component(
                    t,
                    "<Widget",
                    vec![
                        bound(t, "title", "nope"),
                        bound(t, "size", "size"),
                        text(t, "extra", "1"),
                    ],
                    vec![],
                ),
                component(t, "<Missing", vec![], vec![]),
            ]
        },
    );

    let first = fixture.check(APP);
    let second = fixture.check(APP);
    assert_eq!(first, second);
    assert_eq!(
        codes(&first),
        vec![
            DiagnosticCode::DeclarationNotFound.code(),
            DiagnosticCode::ComponentTypesNotAssignable.code(),
            DiagnosticCode::NonExistentProperty.code(),
            DiagnosticCode::ComponentImportNotFound.code(),
        ]
    );
    let starts: Vec<u32> = first.iter().map(|d| d.start).collect();
    let mut sorted = starts.clone();
    sorted.sort_unstable();
    assert_eq!(starts, sorted);
}

#[test]
fn test_unknown_property_reported_iff_not_a_member() {
    let mut fixture = Fixture::new();
    fixture.add(
        APP,
        "import Widget from \"./Widget.svelte\";",
        "<Widget title=\"a\" size=\"b\" color=\"c\" Title=\"d\" />",
        |t| {
            vec![component(
                t,
                "<Widget",
                vec![
                    text(t, "title", "a"),
                    text(t, "size", "b"),
                    text(t, "color", "c"),
                    text(t, "Title", "d"),
                ],
                vec![],
            )]
        },
    );

    let diagnostics = fixture.check(APP);
    let flagged: Vec<&str> = diagnostics
        .iter()
        .filter(|d| d.code == DiagnosticCode::NonExistentProperty.code())
        .map(|d| d.message_text.split('\'').nth(1).unwrap_or_default())
        .collect();
    assert_eq!(flagged, vec!["color", "Title"]);
    assert!(diagnostics[1].message_text.contains("Did you mean 'title'?"));
}

#[test]
fn test_spread_superset_passes_subset_fails() {
    let mut fixture = Fixture::new();
    fixture.add(
        APP,
        "import Card from \"./Card.svelte\";\nlet full = { title: \"t\", count: 1, extra: true };",
        "<Card {...full} />",
        |t| vec![component(t, "<Card", vec![spread(t, "full")], vec![])],
    );
    fixture.add(
        "src/Partial.svelte.ts",
        "import Card from \"./Card.svelte\";\nlet partial = { title: \"t\" };",
        "<Card {...partial} />",
        |t| vec![component(t, "<Card", vec![spread(t, "partial")], vec![])],
    );

    assert!(fixture.check(APP).is_empty());

    let diagnostics = fixture.check("src/Partial.svelte.ts");
    assert_eq!(codes(&diagnostics), vec![DiagnosticCode::ComponentTypesNotAssignable.code()]);
    assert_eq!(
        diagnostics[0].message_text,
        "Type '{ title: string; }' is not assignable to the props of component 'Card'."
    );
}

#[test]
fn test_import_without_class_declaration_is_skipped() {
    let mut fixture = Fixture::new();
    fixture.add(
        APP,
        "import Helper from \"./helper\";\nimport Gone from \"./Gone.svelte\";",
        "<Helper anything={undeclared} />\n<Gone whatever=\"1\" />",
        |t| {
            vec![
                component(t, "<Helper", vec![bound(t, "anything", "undeclared")], vec![]),
                component(t, "<Gone", vec![text(t, "whatever", "1")], vec![]),
            ]
        },
    );

    assert!(fixture.check(APP).is_empty());
}

#[test]
fn test_else_branch_and_nested_components_are_walked() {
    let mut fixture = Fixture::new();
    fixture.add(
        APP,
        "import Widget from \"./Widget.svelte\";\nimport Input from \"./Input.svelte\";\nlet ok = true;",
        "{#if ok}<Widget title={ok} />{:else}<Widget><Input bogus=\"x\" /></Widget>{/if}",
        |t| {
            let nested = component(t, "<Input", vec![text(t, "bogus", "x")], vec![]);
            vec![json!({
                "type": "IfBlock",
                "start": at(t, "{#if"),
                "end": at(t, "{/if}") + 5,
                "expression": { "type": "Identifier", "name": "ok", "start": 0, "end": 0 },
                "children": [component(t, "<Widget title", vec![bound(t, "title", "ok")], vec![])],
                "else": {
                    "type": "ElseBlock",
                    "children": [component(t, "<Widget>", vec![], vec![nested])]
                }
            })]
        },
    );

    let diagnostics = fixture.check(APP);
    assert_eq!(
        codes(&diagnostics),
        vec![
            DiagnosticCode::ComponentTypesNotAssignable.code(),
            DiagnosticCode::NonExistentProperty.code(),
        ]
    );
    assert!(diagnostics[1].message_text.contains("'bogus'"));
}

#[test]
fn test_component_through_barrel_re_export() {
    let mut fixture = Fixture::new();
    fixture.add(
        APP,
        "import { Button } from \"./ui\";\nlet count = 3;",
        "<Button label={count} />",
        |t| vec![component(t, "<Button", vec![bound(t, "label", "count")], vec![])],
    );

    let diagnostics = fixture.check(APP);
    assert_eq!(codes(&diagnostics), vec![DiagnosticCode::ComponentTypesNotAssignable.code()]);
    assert!(diagnostics[0]
        .message_text
        .starts_with("Type 'number' is not assignable to type 'string'."));
}

#[test]
fn test_strict_null_checks_follow_options() {
    let mut fixture = Fixture::new();
    fixture.add(
        APP,
        "import Input from \"./Input.svelte\";\nlet maybe: string | null = null;",
        "<Input value={maybe} />",
        |t| vec![component(t, "<Input", vec![bound(t, "value", "maybe")], vec![])],
    );

    let strict = fixture.check(APP);
    assert_eq!(codes(&strict), vec![DiagnosticCode::ComponentTypesNotAssignable.code()]);

    let loose = fixture
        .checker(CompilerOptions::from_tsconfig_json(r#"{ "compilerOptions": {} }"#).unwrap())
        .gather_all_diagnostics(APP)
        .unwrap();
    assert!(loose.is_empty());
}

#[test]
fn test_optional_prop_accepts_possibly_undefined_value() {
    let mut fixture = Fixture::new();
    fixture.add(
        APP,
        "import Input from \"./Input.svelte\";\nlet hint: string | undefined = undefined;",
        "<Input value=\"\" placeholder={hint} />",
        |t| {
            let attributes = vec![text(t, "value", ""), bound(t, "placeholder", "hint")];
            vec![component(t, "<Input", attributes, vec![])]
        },
    );

    assert!(fixture.check(APP).is_empty());
}

#[test]
fn test_svelte_special_elements_need_no_import() {
    let mut fixture = Fixture::new();
    fixture.add(
        APP,
        "import Widget from \"./Widget.svelte\";\nlet next = 1;",
        "<svelte:self depth={next}><Widget bogus=\"x\" /></svelte:self>",
        |t| {
            let nested = component(t, "<Widget", vec![text(t, "bogus", "x")], vec![]);
            vec![json!({
                "type": "InlineComponent", "name": "svelte:self",
                "start": at(t, "<svelte:self"), "end": at(t, "</svelte:self>") + 14,
                "attributes": [bound(t, "depth", "next")],
                "children": [nested]
            })]
        },
    );

    let diagnostics = fixture.check(APP);
    assert_eq!(codes(&diagnostics), vec![DiagnosticCode::NonExistentProperty.code()]);
    assert!(diagnostics[0].message_text.contains("'bogus'"));
}

#[test]
fn test_diagnostic_positions_follow_reconstructed_source() {
    let mut fixture = Fixture::new();
    fixture.add(
        APP,
        "import Widget from \"./Widget.svelte\";",
        "<Widget foo=\"bar\" />",
        |t| vec![component(t, "<Widget", vec![text(t, "foo", "bar")], vec![])],
    );

    let diagnostic = &fixture.check(APP)[0];
    let template = &fixture.sources["src/App.svelte"];
    assert_eq!(diagnostic.start, at(template, "foo=\"bar\""));
    let source = crate::source::SourceFile::new(
        "src/App.svelte",
        crate::source::reconstruct_source(template, "import Widget from \"./Widget.svelte\";"),
    );
    assert_eq!(
        (diagnostic.line, diagnostic.column),
        source.line_and_column(diagnostic.start)
    );
}

#[test]
fn test_file_missing_from_cache_is_an_error() {
    let fixture = Fixture::new();
    let err = fixture
        .checker(CompilerOptions::strict())
        .gather_all_diagnostics("src/Nope.svelte.ts")
        .unwrap_err();
    assert!(matches!(err, CheckerError::NotInCompilationCache(ref f) if f == "src/Nope.svelte.ts"));
    assert_eq!(
        err.to_string(),
        "Script source file src/Nope.svelte.ts doesn't exist in CompilationCache"
    );
}

#[test]
fn test_unreadable_template_is_an_error() {
    let mut fixture = Fixture::new();
    fixture.add(APP, "", "<p />", |_| vec![]);
    fixture.sources.clear();

    let err = fixture
        .checker(CompilerOptions::strict())
        .gather_all_diagnostics(APP)
        .unwrap_err();
    assert!(matches!(
        err,
        CheckerError::MissingTemplateSource { ref file, .. } if file == "src/App.svelte"
    ));
}

#[test]
fn test_parallel_checks_match_sequential() {
    let mut fixture = Fixture::new();
    let files: Vec<String> = (0..8).map(|i| format!("src/Page{}.svelte.ts", i)).collect();
    for (i, file) in files.iter().enumerate() {
        let script = format!(
            "import Widget from \"./Widget.svelte\";\nlet title = {};",
            if i % 2 == 0 { "\"ok\"" } else { "42" }
        );
        fixture.add(file, &script, "<Widget title={title} nope=\"1\" />", |t| {
            vec![component(
                t,
                "<Widget",
                vec![bound(t, "title", "title"), text(t, "nope", "1")],
                vec![],
            )]
        });
    }

    let checker = fixture.checker(CompilerOptions::strict());
    let sequential: Vec<Vec<Diagnostic>> = files
        .iter()
        .map(|f| checker.gather_all_diagnostics(f).unwrap())
        .collect();
    let parallel: Vec<Vec<Diagnostic>> = files
        .par_iter()
        .map(|f| checker.gather_all_diagnostics(f).unwrap())
        .collect();

    assert_eq!(sequential, parallel);
    assert_eq!(sequential[0].len(), 1);
    assert_eq!(sequential[1].len(), 2);
}
