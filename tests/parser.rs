use pretty_assertions::assert_eq;

use rox::ast::{Expr, ExprId, LiteralValue, Stmt};
use rox::ast_printer::AstPrinter;
use rox::parser::Parser;
use rox::tokenize;

fn parse(source: &str) -> Vec<Stmt> {
    let (tokens, errors) = tokenize(source);
    assert!(errors.is_empty(), "lex errors: {errors:?}");
    Parser::new(tokens).parse().expect("source should parse")
}

fn parse_errors(source: &str) -> Vec<String> {
    let (tokens, _) = tokenize(source);
    Parser::new(tokens)
        .parse()
        .expect_err("source should not parse")
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[test]
fn precedence_follows_the_grammar() {
    let program = parse("print 1 + 2 * 3 == 7 and !false;");
    let json = AstPrinter::to_json(&program);
    let expr = &json["body"][0]["expression"];

    assert_eq!(expr["_type"], "LogicalExpression");
    assert_eq!(expr["left"]["operator"], "==");
    assert_eq!(expr["left"]["left"]["operator"], "+");
    assert_eq!(expr["left"]["left"]["right"]["operator"], "*");
    assert_eq!(expr["right"]["_type"], "UnaryExpression");
}

#[test]
fn for_loops_desugar_to_while() {
    let program = parse("for (var i = 0; i < 3; i = i + 1) print i;");

    let [Stmt::Block(outer)] = program.as_slice() else {
        panic!("expected a single block, got {program:?}");
    };
    assert!(matches!(outer[0], Stmt::Var { .. }));

    let Stmt::While { body, .. } = &outer[1] else {
        panic!("expected while loop");
    };
    let Stmt::Block(inner) = body.as_ref() else {
        panic!("expected body block");
    };
    assert!(matches!(inner[0], Stmt::Print(_)));
    assert!(matches!(inner[1], Stmt::Expression(Expr::Assign { .. })));
}

#[test]
fn empty_for_condition_is_true() {
    let program = parse("for (;;) print 1;");

    let [Stmt::While { condition, .. }] = program.as_slice() else {
        panic!("expected a bare while loop");
    };
    assert!(matches!(condition, Expr::Literal(LiteralValue::True)));
}

#[test]
fn class_declaration_with_superclass() {
    let program = parse("class B < A { init(x) { this.x = x; } get() { return super.get(); } }");

    let [Stmt::Class(class)] = program.as_slice() else {
        panic!("expected a class");
    };
    assert_eq!(class.name.lexeme, "B");
    assert!(matches!(&class.superclass, Some(Expr::Variable { name, .. }) if name.lexeme == "A"));

    let names: Vec<&str> = class.methods.iter().map(|m| m.name.lexeme.as_str()).collect();
    assert_eq!(names, vec!["init", "get"]);
    assert_eq!(class.methods[0].params.len(), 1);
}

#[test]
fn resolvable_nodes_get_distinct_ids() {
    let (tokens, _) = tokenize("a = b; print c;");
    let mut parser = Parser::with_first_id(tokens, ExprId(10));
    let program = parser.parse().unwrap();

    let Stmt::Expression(Expr::Assign { id: assign, value, .. }) = &program[0] else {
        panic!("expected assignment");
    };
    let Expr::Variable { id: read_b, .. } = value.as_ref() else {
        panic!("expected variable");
    };
    let Stmt::Print(Expr::Variable { id: read_c, .. }) = &program[1] else {
        panic!("expected print");
    };

    let mut ids = vec![*assign, *read_b, *read_c];
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
    assert!(ids.iter().all(|id| id.0 >= 10));
    assert!(parser.next_id().0 >= 13);
}

#[test]
fn errors_carry_location_context() {
    assert_eq!(
        parse_errors("print 1"),
        vec!["[line 1] Error at end: Expected ';' after value"]
    );
    assert_eq!(
        parse_errors("var = 1;"),
        vec!["[line 1] Error at '=': Expected variable name"]
    );
}

#[test]
fn invalid_assignment_target_is_reported() {
    assert_eq!(
        parse_errors("1 + 2 = 3;"),
        vec!["[line 1] Error at '=': Invalid assignment target"]
    );
}

#[test]
fn parser_recovers_and_reports_every_error() {
    let errors = parse_errors("print ;\nvar x = 1;\nprint x\nprint 2;");

    assert_eq!(errors.len(), 2);
    assert!(errors[0].starts_with("[line 1]"));
    assert!(errors[1].starts_with("[line 4]"));
}

#[test]
fn parse_expression_requires_end_of_input() {
    let (tokens, _) = tokenize("(1 + 2) * 3");
    assert!(Parser::new(tokens).parse_expression().is_ok());

    let (tokens, _) = tokenize("1 2");
    assert!(Parser::new(tokens).parse_expression().is_err());
}
