//! Tree‑walking evaluator.
//!
//! The interpreter executes a resolved program against a chain of
//! [`Environment`]s.  Variable references the resolver bound to a local scope
//! are read at their recorded distance; everything else goes to the globals.
//!
//! `return` is not an error: statements complete with a [`Completion`], and
//! only a function call boundary turns `Completion::Return` back into a value.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{ClassDecl, Expr, ExprId, LiteralValue, Stmt};
use crate::class::{LoxClass, INITIALIZER_NAME};
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result, RuntimeErrorKind};
use crate::function::LoxFunction;
use crate::resolver::Resolutions;
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Calls deeper than this fail with a `Stack overflow.` runtime error.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

/// Runtime limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterConfig {
    pub max_call_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Normal,
    /// A `return` is unwinding to the nearest call boundary.
    Return(Value),
}

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    locals: Resolutions,
    output: Box<dyn Write>,
    config: InterpreterConfig,
    call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter printing to stdout with the default limits.
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        info!("Initializing Interpreter with {:?}", config);

        let globals: EnvRef = Rc::new(RefCell::new(Environment::new()));

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output: Box::new(io::stdout()),
            config,
            call_depth: 0,
        }
    }

    /// Send `print` output (and REPL echoes) to `output` instead of stdout.
    pub fn with_output(mut self, output: Box<dyn Write>) -> Self {
        self.output = output;
        self
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn globals(&self) -> &EnvRef {
        &self.globals
    }

    /// Merge a resolver result into the local‑binding table.
    pub fn resolve(&mut self, resolutions: Resolutions) {
        debug!("Recording {} resolved reference(s)", resolutions.len());
        self.locals.extend(resolutions);
    }

    /// Runs a list of top‑level statements (a "program").  The first runtime
    /// error stops the run; the interpreter stays usable for the next one.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            if let Completion::Return(_) = self.execute(stmt)? {
                debug!("Top-level return, stopping");
                break;
            }
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Write one line to the output sink.
    pub fn emit(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{}", text)?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Completion> {
        ensure_sufficient_stack(|| self.execute_stmt(stmt))
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> Result<Completion> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                debug!("Printing {}", value);
                self.emit(&value.to_string())?;
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
            }

            Stmt::Block(statements) => {
                let scope = Environment::child_of(&self.environment);
                return self.execute_block(statements, scope);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Completion::Return(value) = self.execute(body)? {
                        return Ok(Completion::Return(value));
                    }
                }
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);
                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );
                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning {}", value);
                return Ok(Completion::Return(value));
            }

            Stmt::Class(declaration) => self.declare_class(declaration)?,
        }

        Ok(Completion::Normal)
    }

    /// Run `statements` with `environment` as the current scope, restoring the
    /// previous scope however the block exits.
    pub fn execute_block(&mut self, statements: &[Stmt], environment: EnvRef) -> Result<Completion> {
        let previous = std::mem::replace(&mut self.environment, environment);
        let result = self.execute_sequence(statements);
        self.environment = previous;
        result
    }

    fn execute_sequence(&mut self, statements: &[Stmt]) -> Result<Completion> {
        for stmt in statements {
            match self.execute(stmt)? {
                Completion::Normal => {}
                abrupt => return Ok(abrupt),
            }
        }

        Ok(Completion::Normal)
    }

    fn declare_class(&mut self, declaration: &ClassDecl) -> Result<()> {
        debug!("Declaring class '{}'", declaration.name.lexeme);

        let superclass: Option<Rc<LoxClass>> = match &declaration.superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let at = match expr {
                        Expr::Variable { name, .. } => name,
                        _ => &declaration.name,
                    };
                    return Err(LoxError::runtime(at, RuntimeErrorKind::SuperclassNotAClass));
                }
            },
            None => None,
        };

        // Visible (as nil) to the method bodies while the class is built.
        self.environment
            .borrow_mut()
            .define(&declaration.name.lexeme, Value::Nil);

        let enclosing: Option<EnvRef> = superclass.as_ref().map(|class| {
            let scope = Environment::child_of(&self.environment);
            scope
                .borrow_mut()
                .define("super", Value::Class(Rc::clone(class)));
            std::mem::replace(&mut self.environment, scope)
        });

        let methods: HashMap<String, Rc<LoxFunction>> = declaration
            .methods
            .iter()
            .map(|method| {
                let function = LoxFunction::new(
                    Rc::clone(method),
                    Rc::clone(&self.environment),
                    method.name.lexeme == INITIALIZER_NAME,
                );
                (method.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        if let Some(previous) = enclosing {
            self.environment = previous;
        }

        let class = LoxClass::new(declaration.name.lexeme.clone(), superclass, methods);

        self.environment
            .borrow_mut()
            .assign(&declaration.name, Value::Class(Rc::new(class)))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        ensure_sufficient_stack(|| self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::from(s.as_str()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                self.evaluate_unary(operator, right)
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                evaluate_binary(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;

                match operator.token_type {
                    TokenType::OR if left.is_truthy() => Ok(left),
                    TokenType::AND if !left.is_truthy() => Ok(left),
                    _ => self.evaluate(right),
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(&self.environment, distance, name, value.clone())?
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                self.call_value(&callee, paren, values)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => instance.get(name),
                _ => Err(LoxError::runtime(name, RuntimeErrorKind::NotAnInstance)),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(LoxError::runtime(name, RuntimeErrorKind::NotAnInstance));
                };

                let value = self.evaluate(value)?;
                instance.set(name, value.clone());

                Ok(value)
            }

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn evaluate_unary(&self, operator: &Token, right: Value) -> Result<Value> {
        match operator.token_type {
            TokenType::MINUS => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(LoxError::runtime(
                    operator,
                    RuntimeErrorKind::OperandMustBeNumber,
                )),
            },
            TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
            _ => unreachable!("parser only builds unary nodes for '-' and '!'"),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    /// `super.method`: the method comes from the superclass captured when the
    /// class was declared, and is bound to the current `this`, which lives one
    /// scope inside the `super` scope.
    fn evaluate_super(&self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value> {
        let distance = self.locals.get(&id).copied().ok_or_else(|| {
            LoxError::runtime(
                keyword,
                RuntimeErrorKind::UndefinedVariable(keyword.lexeme.clone()),
            )
        })?;

        let Value::Class(superclass) = Environment::get_at(&self.environment, distance, keyword)?
        else {
            return Err(LoxError::runtime(
                keyword,
                RuntimeErrorKind::SuperclassNotAClass,
            ));
        };

        let this = Environment::lookup_at(&self.environment, distance.saturating_sub(1), "this");
        let Some(Value::Instance(instance)) = this else {
            return Err(LoxError::runtime(keyword, RuntimeErrorKind::NotAnInstance));
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(instance)))),
            None => Err(LoxError::runtime(
                method,
                RuntimeErrorKind::UndefinedProperty(method.lexeme.clone()),
            )),
        }
    }

    /// Checks callability, arity and call depth, then invokes.
    fn call_value(&mut self, callee: &Value, paren: &Token, arguments: Vec<Value>) -> Result<Value> {
        let Some(callable) = callee.as_callable() else {
            return Err(LoxError::runtime(paren, RuntimeErrorKind::NotCallable));
        };

        if arguments.len() != callable.arity() {
            return Err(LoxError::runtime(
                paren,
                RuntimeErrorKind::ArityMismatch {
                    expected: callable.arity(),
                    got: arguments.len(),
                },
            ));
        }

        if self.call_depth >= self.config.max_call_depth {
            debug!("Call depth limit {} reached", self.config.max_call_depth);
            return Err(LoxError::runtime(paren, RuntimeErrorKind::StackOverflow));
        }

        debug!("Calling {} with {} argument(s)", callee, arguments.len());

        self.call_depth += 1;
        let result = callable.call(self, arguments);
        self.call_depth -= 1;

        result
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        // Top-level classes and closures reference the globals that hold them.
        if let Ok(mut globals) = self.globals.try_borrow_mut() {
            globals.clear();
        }
    }
}

fn evaluate_binary(operator: &Token, left: Value, right: Value) -> Result<Value> {
    let value = match operator.token_type {
        TokenType::PLUS => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (Value::String(a), Value::String(b)) => Value::from(format!("{}{}", a, b)),
            _ => {
                return Err(LoxError::runtime(
                    operator,
                    RuntimeErrorKind::OperandsMustBeNumbersOrStrings,
                ))
            }
        },
        TokenType::MINUS => {
            let (a, b) = numbers(operator, &left, &right)?;
            Value::Number(a - b)
        }
        // IEEE division: x / 0 is a signed infinity, not an error.
        TokenType::SLASH => {
            let (a, b) = numbers(operator, &left, &right)?;
            Value::Number(a / b)
        }
        TokenType::STAR => {
            let (a, b) = numbers(operator, &left, &right)?;
            Value::Number(a * b)
        }
        TokenType::GREATER => {
            let (a, b) = numbers(operator, &left, &right)?;
            Value::Bool(a > b)
        }
        TokenType::GREATER_EQUAL => {
            let (a, b) = numbers(operator, &left, &right)?;
            Value::Bool(a >= b)
        }
        TokenType::LESS => {
            let (a, b) = numbers(operator, &left, &right)?;
            Value::Bool(a < b)
        }
        TokenType::LESS_EQUAL => {
            let (a, b) = numbers(operator, &left, &right)?;
            Value::Bool(a <= b)
        }
        TokenType::EQUAL_EQUAL => Value::Bool(left == right),
        TokenType::BANG_EQUAL => Value::Bool(left != right),
        _ => unreachable!("parser only builds binary nodes for binary operators"),
    };

    Ok(value)
}

fn numbers(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => {
            debug!(
                "'{}' applied to {} and {}",
                operator.lexeme,
                left.type_name(),
                right.type_name()
            );
            Err(LoxError::runtime(
                operator,
                RuntimeErrorKind::OperandsMustBeNumbers,
            ))
        }
    }
}
