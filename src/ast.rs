//! Syntax tree consumed by the resolver and the interpreter.
//!
//! Expression and statement kinds are closed enums, so every pass over the
//! tree is an exhaustive `match`.  Nodes that the resolver can bind to a scope
//! (`Variable`, `Assign`, `This`, `Super`) carry an [`ExprId`] handed out by the
//! parser; the resolution table is keyed on those ids.

use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::token::Token;

/// Stable identity of a resolvable expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ExprId(pub u32);

impl ExprId {
    /// The id following this one.
    pub fn next(self) -> ExprId {
        ExprId(self.0 + 1)
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A **literal constant** that appears directly in the source code.
///
/// The parser converts the token's payload at parse time, so literals do not
/// keep their token around.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Integral lexemes such as `"3"` are still stored as `3.0`.
    Number(f64),
    Str(String),
    True,
    False,
    Nil,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(LiteralValue),

    /// Parenthesised sub‑expression.
    Grouping(Box<Expr>),

    /// `!x` or `-x`.
    Unary {
        operator: Token,
        right: Box<Expr>,
    },

    /// Arithmetic, comparison and equality operators.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    Variable {
        id: ExprId,
        name: Token,
    },

    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    Call {
        callee: Box<Expr>,
        /// The closing `)`, retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// `object.name`
    Get {
        object: Box<Expr>,
        name: Token,
    },

    /// `object.name = value`
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    This {
        id: ExprId,
        keyword: Token,
    },

    /// `super.method`
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },
}

/// Shared by every closure created from the declaration.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: Token,

    /// Always an [`Expr::Variable`] when present.
    pub superclass: Option<Expr>,

    pub methods: Vec<Rc<FunctionDecl>>,
}

/// A program is a sequence of these nodes returned by `Parser::parse`.
#[derive(Debug, Clone)]
pub enum Stmt {
    Expression(Expr),

    Print(Expr),

    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    Function(Rc<FunctionDecl>),

    Return {
        /// The `return` keyword, for diagnostics.
        keyword: Token,
        value: Option<Expr>,
    },

    Class(ClassDecl),
}
