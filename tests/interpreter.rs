mod common;

use pretty_assertions::assert_eq;

use rox::error::RuntimeErrorKind;
use rox::interpreter::InterpreterConfig;
use rox::Failure;

fn runtime_error(source: &str) -> (Vec<String>, String, RuntimeErrorKind) {
    let (output, result) = common::run(source);

    match result {
        Err(Failure::Runtime(error)) => {
            let kind = error
                .runtime_kind()
                .cloned()
                .unwrap_or_else(|| panic!("not a runtime error: {error}"));
            (output, error.to_string(), kind)
        }
        other => panic!("expected runtime failure, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Scoping & closures
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn shadowing_restores_outer_binding() {
    let output = common::output_of(
        "var a = \"global\"; { var a = \"local\"; print a; } print a;",
    );

    assert_eq!(output, vec!["local", "global"]);
}

#[test]
fn closures_have_independent_persistent_state() {
    let output = common::output_of(
        "\
fun makeCounter() {
  var count = 0;
  fun counter() {
    count = count + 1;
    return count;
  }
  return counter;
}
var a = makeCounter();
var b = makeCounter();
print a();
print a();
print b();
print a();
",
    );

    assert_eq!(output, vec!["1", "2", "1", "3"]);
}

#[test]
fn recursion_through_function_name() {
    let output = common::output_of(
        "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(15);",
    );

    assert_eq!(output, vec!["610"]);
}

#[test]
fn return_unwinds_nested_blocks_and_loops() {
    let output = common::output_of(
        "\
fun find() {
  for (var i = 0; i < 10; i = i + 1) {
    { if (i == 3) return i; }
  }
  return -1;
}
print find();
var i = \"outer\";
print i;
",
    );

    assert_eq!(output, vec!["3", "outer"]);
}

// ─────────────────────────────────────────────────────────────────────────
// Classes
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn super_dispatches_statically_and_binds_this() {
    let output = common::output_of(
        "\
class A { greet() { return \"A\"; } }
class B < A { greet() { return super.greet() + \"B\"; } }
print B().greet();
",
    );

    assert_eq!(output, vec!["AB"]);
}

#[test]
fn super_method_sees_subclass_instance() {
    let output = common::output_of(
        "\
class A { name() { return this.kind; } }
class B < A { name() { return \"B:\" + super.name(); } }
class C < B {}
var c = C();
c.kind = \"c\";
print c.name();
",
    );

    assert_eq!(output, vec!["B:c"]);
}

#[test]
fn initializer_returns_instance_with_fields() {
    let output = common::output_of(
        "\
class Point {
  init(x, y) {
    this.x = x;
    this.y = y;
    if (x > 100) return;
    this.small = true;
  }
}
var p = Point(1, 2);
print p.x + p.y;
print p.small;
var q = Point(200, 0);
print q;
print p.init(5, 6) == p;
print p.x;
",
    );

    assert_eq!(output, vec!["3", "true", "Point instance", "true", "5"]);
}

#[test]
fn inherited_initializer_sets_arity() {
    let (_, message, kind) = runtime_error(
        "class A { init(a, b) {} } class B < A {} B(1);",
    );

    assert_eq!(kind, RuntimeErrorKind::ArityMismatch { expected: 2, got: 1 });
    assert_eq!(message, "Expected 2 arguments but got 1.\n[line 1]");
}

#[test]
fn fields_shadow_methods_and_methods_are_bound() {
    let output = common::output_of(
        "\
class Box {
  init(v) { this.v = v; }
  get() { return this.v; }
}
var a = Box(\"a\");
var m = a.get;
a.v = \"changed\";
print m();
a.get = \"field\";
print a.get;
print Box;
print m;
",
    );

    assert_eq!(output, vec!["changed", "field", "Box", "<fn get>"]);
}

// ─────────────────────────────────────────────────────────────────────────
// Values
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn truthiness_and_equality() {
    let output = common::output_of(
        "\
if (0) print \"0 truthy\";
if (\"\") print \"empty truthy\";
if (!nil) print \"nil falsy\";
if (!false) print \"false falsy\";
print 1 == \"1\";
print nil == nil;
print \"a\" + \"b\" == \"ab\";
print 1 / 0;
print -1 / 0;
print 2.5 * 2;
print 7 / 2;
",
    );

    assert_eq!(
        output,
        vec![
            "0 truthy",
            "empty truthy",
            "nil falsy",
            "false falsy",
            "false",
            "true",
            "true",
            "inf",
            "-inf",
            "5",
            "3.5",
        ]
    );
}

#[test]
fn logical_operators_yield_operands() {
    let output = common::output_of(
        "print nil or \"yes\"; print 0 and \"second\"; print false and undefined; print 1 or undefined;",
    );

    assert_eq!(output, vec!["yes", "second", "false", "1"]);
}

// ─────────────────────────────────────────────────────────────────────────
// Runtime errors
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn arity_mismatch_does_not_run_the_body() {
    let (output, _, kind) = runtime_error(
        "fun f() { print \"ran\"; }\nprint \"start\";\nf(1);",
    );

    assert_eq!(output, vec!["start"]);
    assert_eq!(kind, RuntimeErrorKind::ArityMismatch { expected: 0, got: 1 });
}

#[test]
fn runtime_error_messages() {
    let cases = [
        ("print undefined;", "Undefined variable 'undefined'.\n[line 1]"),
        ("undefined = 1;", "Undefined variable 'undefined'.\n[line 1]"),
        ("\"not\"();", "Can only call functions and classes.\n[line 1]"),
        ("print 1 - \"a\";", "Operands must be numbers.\n[line 1]"),
        ("print -\"a\";", "Operand must be a number.\n[line 1]"),
        ("print 1 + nil;", "Operands must be two numbers or two strings.\n[line 1]"),
        ("print 1.field;", "Only instances have properties.\n[line 1]"),
        ("var x = 1;\nx.field = 2;", "Only instances have properties.\n[line 2]"),
        ("class A {}\nprint A().missing;", "Undefined property 'missing'.\n[line 2]"),
        ("var NotClass = 1;\nclass B < NotClass {}", "Superclass must be a class.\n[line 2]"),
    ];

    for (source, expected) in cases {
        let (_, message, _) = runtime_error(source);
        assert_eq!(message, expected, "source: {source}");
    }
}

#[test]
fn unbounded_recursion_is_a_stack_overflow() {
    let (output, result) = common::run_with_config(
        "fun f(n) { return f(n + 1); }\nprint \"go\";\nf(0);",
        InterpreterConfig { max_call_depth: 200 },
    );

    let Err(Failure::Runtime(error)) = result else {
        panic!("expected runtime failure");
    };

    assert_eq!(output, vec!["go"]);
    assert_eq!(error.runtime_kind(), Some(&RuntimeErrorKind::StackOverflow));
    assert_eq!(error.to_string(), "Stack overflow.\n[line 1]");
}

#[test]
fn default_depth_limit_is_reached_without_crashing() {
    let (_, _, kind) = runtime_error("fun f() { f(); } f();");

    assert_eq!(kind, RuntimeErrorKind::StackOverflow);
}

#[test]
fn session_survives_runtime_error() {
    let (mut lox, output) = common::session(InterpreterConfig::default());

    lox.run_line("var a = 1;").unwrap();
    assert!(lox.run_line("{ var b = 2; b(); }").is_err());
    lox.run_line("a = a + 1;").unwrap();
    lox.run_line("a;").unwrap();
    lox.run_line("fun f() { return a * 10; }").unwrap();
    lox.run_line("f()").unwrap_err();
    lox.run_line("f();").unwrap();

    // Lone expression statements echo their value, assignments included.
    assert_eq!(output.lines(), vec!["2", "2", "20"]);
}

#[test]
fn repl_inputs_share_resolution_state() {
    let (mut lox, output) = common::session(InterpreterConfig::default());

    lox.run_line("fun outer() { var x = \"x\"; fun inner() { return x; } return inner; }")
        .unwrap();
    lox.run_line("var g = outer();").unwrap();
    lox.run_line("print g();").unwrap();
    lox.run_line("{ var y = \"y\"; print y; }").unwrap();
    lox.run_line("print g();").unwrap();

    assert_eq!(output.lines(), vec!["x", "y", "x"]);
}

// ─────────────────────────────────────────────────────────────────────────
// Deep nesting
// ─────────────────────────────────────────────────────────────────────────

const NESTING: usize = 5000;

/// Runs `source` on a thread with a main-thread-sized stack.  Scanning,
/// parsing, resolving and running grow the stack as needed, but dropping the
/// finished tree still recurses once per level.
fn deep_output_of(source: String) -> Vec<String> {
    std::thread::Builder::new()
        .stack_size(8 * 1024 * 1024)
        .spawn(move || common::output_of(&source))
        .unwrap()
        .join()
        .unwrap()
}

#[test]
fn deeply_nested_groupings_run() {
    let source = format!("print {}1{};", "(".repeat(NESTING), ")".repeat(NESTING));

    assert_eq!(deep_output_of(source), vec!["1"]);
}

#[test]
fn deeply_nested_blocks_resolve_to_the_outermost_scope() {
    let source = format!(
        "{{ var x = \"outer\"; {} print x; {} }}",
        "{".repeat(NESTING),
        "}".repeat(NESTING)
    );

    assert_eq!(deep_output_of(source), vec!["outer"]);
}

#[test]
fn long_unary_and_assignment_chains_run() {
    let source = format!(
        "var a; var b = {}true; a = {}2; print b; print a;",
        "!".repeat(NESTING),
        "a = ".repeat(NESTING)
    );

    assert_eq!(deep_output_of(source), vec!["true", "2"]);
}
