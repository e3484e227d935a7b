use std::io::Write;

use chrono::{TimeZone, Utc};
use tagscript_engine::{Channel, Guild, Interpreter, Limits, Member, Response, Seed, Target};

fn seed() -> Seed {
    Seed::for_invocation(
        Member::new(80351110224678912, "alice").with_nick("Ally"),
        None,
        Channel::new(81384788765712384, "general"),
        Some(Guild::new(81384788765712384, "Tag Club")),
        "hi there friend",
    )
}

fn interpreter() -> Interpreter {
    Interpreter::new(Limits {
        rng_seed: Some(7),
        ..Limits::default()
    })
}

fn process(source: &str) -> Response {
    let interpreter = interpreter();
    let template = interpreter.parse(source);
    let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
    interpreter.process_at(&template, &seed(), now)
}

fn run(source: &str) -> String {
    process(source).body.unwrap_or_default()
}

#[test]
fn assignment_then_use() {
    assert_eq!(run("Hello {var:name}(World){name}!"), "Hello World!");
    assert_eq!(
        run("{let:greeting}(Hi {user}){greeting}, again {greeting}"),
        "Hi Ally, again Hi Ally"
    );
}

#[test]
fn use_before_assignment_stays_literal() {
    assert_eq!(run("{name}{var:name}(x)"), "{name}");
}

#[test]
fn conditionals() {
    assert_eq!(run("{if:true}(Yes|No)"), "Yes");
    assert_eq!(run("{if:false}(Yes|No)"), "No");
    assert_eq!(run("{if:}(Yes|No)"), "No");
    assert_eq!(run("{if:{args:1}==hi}(greeting|other)"), "greeting");
    assert_eq!(run("{if:{math}(2+2)>3}(big|small)"), "big");
}

#[test]
fn unknown_blocks_pass_through() {
    assert_eq!(run("{notarealblock:foo}(bar)"), "{notarealblock:foo}(bar)");
    assert_eq!(run("{python:__import__('os')}"), "{python:__import__('os')}");
    assert_eq!(run("{missing}"), "{missing}");
    assert_eq!(run("{user.nonsense}"), "{user.nonsense}");
}

#[test]
fn unknown_block_keeps_inner_source() {
    assert_eq!(run("{nope:{var:x}(1)}{x}"), "{nope:{var:x}(1)}{x}");

    let source = "a{nope:{stop}(gone)}b{later:{react:x}{delete}}";
    let response = process(source);
    assert_eq!(response.body.as_deref(), Some(source));
    assert!(response.actions.is_empty());
}

#[test]
fn plain_text_round_trips() {
    let samples = [
        "",
        "just some words",
        "punctuation: (a) | b } c ) d",
        "unicode ünïcødé 🎉 text",
        "lonely { brace",
        "{}",
        "{:x}",
    ];
    for sample in samples {
        assert_eq!(process(sample).body.as_deref().unwrap_or(""), sample);
    }
}

#[test]
fn empty_output_has_no_body() {
    let response = process("{var:x}(1)");
    assert_eq!(response.body, None);
    assert!(!response.truncated);
}

#[test]
fn escapes_produce_delimiters() {
    assert_eq!(run(r"\{user\}"), "{user}");
    assert_eq!(run(r"{if:1}(a\|b|c)"), "a|b");
}

#[test]
fn seed_variables() {
    assert_eq!(run("{user}"), "Ally");
    assert_eq!(run("{user.name} {user.mention}"), "alice <@80351110224678912>");
    assert_eq!(run("{target.id}"), "80351110224678912");
    assert_eq!(run("{server} has {server.member_count}"), "Tag Club has 0");
    assert_eq!(run("{channel:mention}"), "<#81384788765712384>");
    assert_eq!(run("{args:2} / {args:2+} / {args}"), "there / there friend / hi there friend");
    assert_eq!(run("{USER}"), "Ally");
}

#[test]
fn variable_with_payload_keeps_payload() {
    assert_eq!(run("{args:1}({user})"), "hi(Ally)");
}

#[test]
fn seed_names_are_reserved() {
    assert_eq!(run("{var:user}(mallory){user}"), "Ally");
}

#[test]
fn builtin_names_are_reserved_when_absent() {
    let dm = Seed::for_invocation(
        Member::new(1, "alice"),
        None,
        Channel::new(2, "dm"),
        None,
        "",
    );
    let response = Interpreter::default().process("{var:server}(Fake Club){server}", &dm);
    assert_eq!(response.body.as_deref(), Some("{server}"));
}

#[test]
fn delete_first_write_wins() {
    let response = process("{delete:false}{delete}");
    assert_eq!(response.actions.delete, Some(false));
    assert_eq!(response.body, None);
}

#[test]
fn actions_are_collected() {
    let response = process(
        "{redirect:dm}{react:👍 🎉}{require:Mods}(Nope){cooldown:1|60}{override:admin}{c:ping}done",
    );
    assert_eq!(response.body.as_deref(), Some("done"));
    assert_eq!(response.actions.target, Some(Target::Dm));
    assert_eq!(response.actions.reactions, vec!["👍", "🎉"]);
    assert_eq!(
        response.actions.keys(),
        vec!["target", "override", "requires", "cooldown", "react", "commands"]
    );
}

#[test]
fn stop_replaces_body() {
    let response = process("before{react:x}{stop}(halted {user})after{react:y}");
    assert_eq!(response.body.as_deref(), Some("halted Ally"));
    assert_eq!(response.actions.reactions, vec!["x"]);
    assert!(!response.truncated);
}

#[test]
fn conditional_stop_continues_when_false() {
    assert_eq!(run("a{stop:{args:1}==bye}(gone)b"), "ab");
}

#[test]
fn math_with_variables() {
    assert_eq!(run("{var:n}(4){math}({n} * 2 + 1)"), "9");
    assert_eq!(run("{m:10/4}"), "2.5");
    assert_eq!(run("{math}(1/0)"), "{math}(1/0)");
}

#[test]
fn embeds() {
    let response =
        process(r##"{embed}({"title": "Hi", "description": "d", "color": "#00ff00"})"##);
    assert_eq!(response.body, None);
    assert_eq!(response.embeds.len(), 1);
    assert_eq!(response.embeds[0].title.as_deref(), Some("Hi"));
    assert_eq!(response.embeds[0].color, Some(0x00ff00));
    assert!(response.actions.embed);

    let response = process("{embed}(title:Welcome {user}|description:Enjoy)");
    assert_eq!(response.embeds[0].title.as_deref(), Some("Welcome Ally"));
    assert_eq!(response.embeds[0].description.as_deref(), Some("Enjoy"));
}

#[test]
fn time_blocks_use_the_call_clock() {
    assert_eq!(run("{strf:%Y-%m-%d}"), "2024-03-09");
    assert_eq!(run("{unix}"), "1709993100");
    assert_eq!(run("{strf:%Y}(1000000000)"), "2001");
}

#[test]
fn text_blocks() {
    assert_eq!(run("{upper}({user})"), "ALLY");
    assert_eq!(run("{replace:there,world}({args})"), "hi world friend");
    assert_eq!(run("{in:there}({args})"), "true");
    assert_eq!(run("{index:friend}({args})"), "3");
    assert_eq!(run("{ordinal}({len}(abc))"), "3rd");
    assert_eq!(run("{urlencode}({args})"), "hi%20there%20friend");
}

#[test]
fn random_choice_is_reproducible_with_seeded_limits() {
    let source = "{random}(a|b|c|d|e|f) {range:1-1000} {50}(x)";
    assert_eq!(run(source), run(source));
    assert_eq!(run("{random:fixed}(a|b|c)"), run("{random:fixed}(a|b|c)"));
}

#[test]
fn random_only_evaluates_chosen_branch() {
    let response = process("{random}({react:a}|{react:b})");
    assert_eq!(response.actions.reactions.len(), 1);
}

#[test]
fn deterministic_without_impure_blocks() {
    let interpreter = Interpreter::default();
    let source = "{var:x}({args:1}){upper}({x}) {if:{x}==hi}(yes|no)";
    let first = interpreter.process(source, &seed());
    let second = interpreter.process(source, &seed());
    assert_eq!(first, second);
    assert_eq!(first.body.as_deref(), Some("HI yes"));
}

#[test]
fn debug_trace_lists_resolved_variables() {
    let response = process("{debug}{user}{args:1}{var:x}(1){x}{missing}");
    let debug = response.debug.expect("debug trace");
    assert_eq!(debug.get("user").map(String::as_str), Some("Ally"));
    assert_eq!(debug.get("args:1").map(String::as_str), Some("hi"));
    assert_eq!(debug.get("x").map(String::as_str), Some("1"));
    assert!(!debug.contains_key("missing"));
    assert_eq!(process("{user}").debug, None);
}

#[test]
fn node_limit_truncates() {
    let source = "x{delete}".repeat(10_000);
    let response = process(&source);
    assert!(response.truncated);
    assert_eq!(response.actions.delete, Some(true));
    let body = response.body.unwrap_or_default();
    assert!(!body.is_empty());
    assert!(body.len() < 10_000);
    assert!(body.chars().all(|c| c == 'x'));
}

#[test]
fn output_limit_stops_exponential_growth() {
    let mut source = String::from("{var:a}(xxxxxxxx)");
    for _ in 0..40 {
        source.push_str("{var:a}({a}{a})");
    }
    source.push_str("{a}");
    let response = process(&source);
    assert!(response.truncated);
}

#[test]
fn time_budget_truncates() {
    let interpreter = Interpreter::new(Limits {
        time_budget_ms: 0,
        ..Limits::default()
    });
    let source = "x{delete}".repeat(50);
    let response = interpreter.process(&source, &seed());
    assert!(response.truncated);
    assert!(response.body.unwrap_or_default().len() < 50);
}

#[test]
fn range_span_overflow_is_kept_as_text() {
    assert_eq!(run("{rangef:-1e308-1e308}"), "{rangef:-1e308-1e308}");
    assert_eq!(run("{rangef:1e308--1e308}(seed)"), "{rangef:1e308--1e308}(seed)");
}

#[test]
fn replace_cannot_outgrow_the_output_limit() {
    let interpreter = Interpreter::new(Limits {
        max_output_bytes: 1024,
        ..Limits::default()
    });
    let source = format!("{{replace:a,{}}}({})", "b".repeat(16), "a".repeat(100));
    let response = interpreter.process(&source, &seed());
    assert!(response.body.unwrap_or_default().len() <= 1024);
}

#[test]
fn deep_nesting_is_bounded() {
    let source = format!("{}x{}", "{if:1}(".repeat(60), ")".repeat(60));
    let interpreter = interpreter();
    let template = interpreter.parse(&source);
    assert!(!template.warnings.is_empty());
    let response = interpreter.process_template(&template, &seed());
    assert!(!response.truncated);
    assert!(response.body.unwrap_or_default().contains("{if:1}("));
}

#[test]
fn malformed_input_never_panics() {
    let samples = [
        "{{{{{{{{{{",
        "}}}}}}}}}}",
        "((((((((((",
        "{a:{b:{c:(",
        "{if:1}(((|))",
        "\\",
        "{\\}",
        "{var:}(x){}",
        "{embed}({\"title\": )",
        "{range:--}",
        "{strf:%}",
    ];
    for sample in samples {
        let _ = process(sample);
    }
}

#[test]
fn shared_across_threads() {
    let interpreter = Interpreter::default();
    let seed = seed();
    std::thread::scope(|scope| {
        for n in 0..4 {
            let (interpreter, seed) = (&interpreter, &seed);
            scope.spawn(move || {
                let response = interpreter.process(&format!("{{var:n}}({n}){{n}}"), seed);
                assert_eq!(response.body, Some(n.to_string()));
            });
        }
    });
}

#[test]
fn limits_and_seed_files_load() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");

    let limits_path = dir.path().join("limits.toml");
    let mut file = std::fs::File::create(&limits_path).unwrap();
    writeln!(file, "max_nodes = 4\nrng_seed = 1").unwrap();
    let limits = Limits::load(&limits_path).unwrap();
    assert_eq!(limits.max_nodes, 4);

    let seed_path = dir.path().join("seed.toml");
    std::fs::write(
        &seed_path,
        "args = \"one two\"\n[user]\nid = 5\nname = \"bob\"\n",
    )
    .unwrap();
    let seed = Seed::load(&seed_path).unwrap();

    // Four nodes: `{user}`, " ", `{args:2}` and its parameter text.
    let response = Interpreter::new(limits).process("{user} {args:2} a b c", &seed);
    assert_eq!(response.body.as_deref(), Some("bob two"));
    assert!(response.truncated);

    let missing = Seed::load(dir.path().join("nope.toml")).unwrap_err();
    assert!(missing.to_string().contains("nope.toml"));
    std::fs::write(&seed_path, "args = [").unwrap();
    assert!(Seed::load(&seed_path).is_err());
}
