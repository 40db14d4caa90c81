//! Static resolver pass for the **Lox** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<String, bool>` tracking declared/defined).
//! 2. Report static errors (redeclaration, forward‑read in initializer, invalid
//!    `return`, misplaced `this`/`super`, self‑inheritance).
//! 3. Record, for *each* local variable occurrence, how many scopes separate it
//!    from its binding.  Occurrences left out of the table are globals.
//!
//! Errors do not stop the walk: every diagnostic in the program is collected
//! and returned together.  The interpreter must not run a program whose
//! resolution failed.

use std::collections::HashMap;

use log::{debug, info};

use crate::ast::{ClassDecl, Expr, ExprId, FunctionDecl, Stmt};
use crate::class::INITIALIZER_NAME;
use crate::error::{LoxError, ResolveErrorKind};
use crate::stack::ensure_sufficient_stack;
use crate::token::Token;

/// Expression id → number of scopes between the reference and its binding.
pub type Resolutions = HashMap<ExprId, usize>;

/// What kind of function body are we in?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

/// What kind of class body are we in?  Used to validate `this` and `super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Resolver: tracks scopes, enforces static rules, and records binding
/// distances for locals.
pub struct Resolver {
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    resolutions: Resolutions,
    errors: Vec<LoxError>,
    current_function: FunctionType,
    current_class: ClassType,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        info!("Resolver instantiated");
        Resolver {
            scopes: Vec::new(),
            resolutions: HashMap::new(),
            errors: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    /// Walk all top‑level statements.
    pub fn resolve(mut self, statements: &[Stmt]) -> Result<Resolutions, Vec<LoxError>> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        self.resolve_stmts(statements);

        info!(
            "Resolve pass finished: {} local reference(s), {} error(s)",
            self.resolutions.len(),
            self.errors.len()
        );

        if self.errors.is_empty() {
            Ok(self.resolutions)
        } else {
            Err(self.errors)
        }
    }

    fn error(&mut self, token: &Token, kind: ResolveErrorKind) {
        debug!("Static error at line {}: {}", token.line, kind);
        self.errors.push(LoxError::resolve(token, kind));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmts(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        ensure_sufficient_stack(|| self.resolve_stmt_inner(stmt));
    }

    fn resolve_stmt_inner(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Class(declaration) => self.resolve_class(declaration),

            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_stmts(statements);
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function(declaration) => {
                // name is visible inside its own body
                self.declare(&declaration.name);
                self.define(&declaration.name);
                self.resolve_function(declaration, FunctionType::Function);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch.as_deref() {
                    self.resolve_stmt(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, ResolveErrorKind::ReturnOutsideFunction);
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, ResolveErrorKind::ValueReturnedFromInitializer);
                    }
                    self.resolve_expr(expr);
                }
            }
        }
    }

    fn resolve_class(&mut self, declaration: &ClassDecl) {
        let enclosing = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(&declaration.name);
        self.define(&declaration.name);

        if let Some(superclass) = &declaration.superclass {
            if let Expr::Variable { name, .. } = superclass {
                if name.lexeme == declaration.name.lexeme {
                    self.error(name, ResolveErrorKind::SelfInheritance);
                }
            }

            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass);

            self.begin_scope();
            self.bind_implicit("super");
        }

        self.begin_scope();
        self.bind_implicit("this");

        for method in &declaration.methods {
            let kind = if method.name.lexeme == INITIALIZER_NAME {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, kind);
        }

        self.end_scope();

        if declaration.superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        ensure_sufficient_stack(|| self.resolve_expr_inner(expr));
    }

    fn resolve_expr_inner(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => {
                // Cannot read in own initializer
                let uninitialized = self
                    .scopes
                    .last()
                    .is_some_and(|scope| scope.get(&name.lexeme) == Some(&false));

                if uninitialized {
                    self.error(name, ResolveErrorKind::SelfReferenceInInitializer);
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                // First resolve RHS, then bind LHS
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }

            // Property names are looked up dynamically.
            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, ResolveErrorKind::ThisOutsideClass);
                    return;
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.error(keyword, ResolveErrorKind::SuperOutsideClass);
                    }
                    ClassType::Class => {
                        self.error(keyword, ResolveErrorKind::SuperWithoutSuperclass);
                    }
                    ClassType::Subclass => {}
                }

                self.resolve_local(*id, keyword);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.
    fn resolve_function(&mut self, declaration: &FunctionDecl, kind: FunctionType) {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &declaration.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&declaration.body);
        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        if scope.contains_key(&name.lexeme) {
            self.error(name, ResolveErrorKind::DuplicateDeclaration);
            return;
        }

        scope.insert(name.lexeme.clone(), false);
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    /// `this` / `super` are defined without a declaring token.
    fn bind_implicit(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at depth `d`, or leave it out of the
    /// table if no scope declares it (a global).
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        // innermost → outermost
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' {} at depth {}", name.lexeme, id, depth);
                self.resolutions.insert(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' {} as global", name.lexeme, id);
    }
}
