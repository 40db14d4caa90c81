use serde_json::{json, Value as Json};

use crate::ast::{Expr, FunctionDecl, LiteralValue, Stmt};
use crate::class::INITIALIZER_NAME;
use crate::stack::ensure_sufficient_stack;
use crate::token::Token;

/// Renders a parsed program as an ESTree‑flavoured JSON document.
///
/// Every node is an object tagged with `"_type"`; optional children that are
/// absent (an `else` branch, a `var` initializer, a superclass) are `null`.
pub struct AstPrinter;

impl AstPrinter {
    /// Pretty‑printed JSON for the whole program.
    pub fn print(statements: &[Stmt]) -> String {
        // Serialising a `serde_json::Value` cannot fail.
        serde_json::to_string_pretty(&Self::to_json(statements)).unwrap_or_default()
    }

    pub fn to_json(statements: &[Stmt]) -> Json {
        json!({
            "_type": "Program",
            "body": Self::stmts(statements),
        })
    }

    fn stmts(statements: &[Stmt]) -> Vec<Json> {
        statements.iter().map(Self::stmt).collect()
    }

    fn stmt(stmt: &Stmt) -> Json {
        ensure_sufficient_stack(|| Self::stmt_inner(stmt))
    }

    fn stmt_inner(stmt: &Stmt) -> Json {
        match stmt {
            // ── declarations ────────────────────────────────────────────
            Stmt::Var { name, initializer } => json!({
                "_type": "VariableDeclaration",
                "id": name.lexeme,
                "init": initializer.as_ref().map(Self::expr),
            }),

            Stmt::Function(declaration) => Self::function(declaration, "function"),

            Stmt::Class(declaration) => {
                let methods: Vec<Json> = declaration
                    .methods
                    .iter()
                    .map(|method| {
                        let kind = if method.name.lexeme == INITIALIZER_NAME {
                            "initializer"
                        } else {
                            "method"
                        };
                        Self::function(method, kind)
                    })
                    .collect();

                json!({
                    "_type": "ClassStatement",
                    "id": declaration.name.lexeme,
                    "superclass": declaration.superclass.as_ref().map(Self::expr),
                    "body": methods,
                })
            }

            // ── control flow ────────────────────────────────────────────
            Stmt::Block(statements) => json!({
                "_type": "BlockStatement",
                "body": Self::stmts(statements),
            }),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => json!({
                "_type": "IfStatement",
                "condition": Self::expr(condition),
                "consequent": Self::stmt(then_branch),
                "alternate": else_branch.as_deref().map(Self::stmt),
            }),

            Stmt::While { condition, body } => json!({
                "_type": "WhileStatement",
                "condition": Self::expr(condition),
                "body": Self::stmt(body),
            }),

            Stmt::Return { value, .. } => json!({
                "_type": "ReturnStatement",
                "argument": value.as_ref().map(Self::expr),
            }),

            // ── simple statements ───────────────────────────────────────
            Stmt::Print(expr) => json!({
                "_type": "PrintStatement",
                "expression": Self::expr(expr),
            }),

            Stmt::Expression(expr) => json!({
                "_type": "ExpressionStatement",
                "expression": Self::expr(expr),
            }),
        }
    }

    fn function(declaration: &FunctionDecl, kind: &str) -> Json {
        let params: Vec<Json> = declaration.params.iter().map(identifier).collect();

        json!({
            "_type": "FunctionStatement",
            "id": declaration.name.lexeme,
            "kind": kind,
            "params": params,
            "body": Self::stmts(&declaration.body),
        })
    }

    fn expr(expr: &Expr) -> Json {
        ensure_sufficient_stack(|| Self::expr_inner(expr))
    }

    fn expr_inner(expr: &Expr) -> Json {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(literal) => match literal {
                LiteralValue::Number(n) => json!({ "_type": "NumberLiteral", "value": n }),
                LiteralValue::Str(s) => json!({ "_type": "StringLiteral", "value": s }),
                LiteralValue::True => json!({ "_type": "BooleanLiteral", "value": true }),
                LiteralValue::False => json!({ "_type": "BooleanLiteral", "value": false }),
                LiteralValue::Nil => json!({ "_type": "NilLiteral", "value": null }),
            },

            // ── operators ───────────────────────────────────────────────
            Expr::Grouping(inner) => json!({
                "_type": "GroupExpression",
                "expression": Self::expr(inner),
            }),

            Expr::Unary { operator, right } => json!({
                "_type": "UnaryExpression",
                "operator": operator.lexeme,
                "right": Self::expr(right),
            }),

            Expr::Binary {
                left,
                operator,
                right,
            } => json!({
                "_type": "BinaryExpression",
                "operator": operator.lexeme,
                "left": Self::expr(left),
                "right": Self::expr(right),
            }),

            Expr::Logical {
                left,
                operator,
                right,
            } => json!({
                "_type": "LogicalExpression",
                "operator": operator.lexeme,
                "left": Self::expr(left),
                "right": Self::expr(right),
            }),

            // ── names ───────────────────────────────────────────────────
            Expr::Variable { name, .. } => identifier(name),

            Expr::Assign { name, value, .. } => json!({
                "_type": "AssignmentExpression",
                "left": identifier(name),
                "right": Self::expr(value),
            }),

            // ── calls & properties ──────────────────────────────────────
            Expr::Call {
                callee, arguments, ..
            } => {
                let arguments: Vec<Json> = arguments.iter().map(Self::expr).collect();

                json!({
                    "_type": "CallExpression",
                    "callee": Self::expr(callee),
                    "arguments": arguments,
                })
            }

            Expr::Get { object, name } => json!({
                "_type": "GetExpression",
                "object": Self::expr(object),
                "property": identifier(name),
            }),

            Expr::Set {
                object,
                name,
                value,
            } => json!({
                "_type": "SetExpression",
                "left": {
                    "_type": "MemberExpression",
                    "object": Self::expr(object),
                    "property": identifier(name),
                },
                "right": Self::expr(value),
            }),

            Expr::This { .. } => json!({ "_type": "This" }),

            Expr::Super { method, .. } => json!({
                "_type": "MemberExpression",
                "object": { "_type": "Super" },
                "property": identifier(method),
            }),
        }
    }
}

fn identifier(name: &Token) -> Json {
    json!({ "_type": "Identifier", "name": name.lexeme })
}
