//! Centralised error hierarchy for the **Lox interpreter**.
//!
//! All subsystems (scanner, parser, resolver, runtime) convert their internal
//! failure modes into one of the variants defined here.  This enables a
//! uniform `Result<T>` alias throughout the crate and ergonomic inter‑operation
//! with `anyhow` in the binary, while still preserving rich diagnostic detail.
//!
//! Every diagnostic has the same shape: a source line, an optional location
//! context (` at 'lexeme'` / ` at end`) and a message.
//!
//! The module **does not** print diagnostics itself.

use std::io;
use thiserror::Error;

use log::info;

use crate::token::{Token, TokenType};

/// Context‑sensitive rule violations detected by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveErrorKind {
    #[error("Already a variable with this name in this scope.")]
    DuplicateDeclaration,

    #[error("Can't read local variable in its own initializer.")]
    SelfReferenceInInitializer,

    #[error("Can't return from top-level code.")]
    ReturnOutsideFunction,

    #[error("Can't return a value from an initializer.")]
    ValueReturnedFromInitializer,

    #[error("Can't use 'this' outside of a class.")]
    ThisOutsideClass,

    #[error("Can't use 'super' outside of a class.")]
    SuperOutsideClass,

    #[error("Can't use 'super' in a class with no superclass.")]
    SuperWithoutSuperclass,

    #[error("A class can't inherit from itself.")]
    SelfInheritance,
}

/// Failures raised while evaluating a resolved program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeErrorKind {
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),

    #[error("Undefined property '{0}'.")]
    UndefinedProperty(String),

    #[error("Can only call functions and classes.")]
    NotCallable,

    #[error("Expected {expected} arguments but got {got}.")]
    ArityMismatch { expected: usize, got: usize },

    #[error("Only instances have properties.")]
    NotAnInstance,

    #[error("Superclass must be a class.")]
    SuperclassNotAClass,

    #[error("Operand must be a number.")]
    OperandMustBeNumber,

    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers,

    #[error("Operands must be two numbers or two strings.")]
    OperandsMustBeNumbersOrStrings,

    #[error("Stack overflow.")]
    StackOverflow,
}

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        line: usize,
        location: String,
    },

    /// Static‑analysis failure reported by the resolver.
    #[error("[line {line}] Error{location}: {kind}")]
    Resolve {
        kind: ResolveErrorKind,
        line: usize,
        location: String,
    },

    /// Runtime evaluation error, located at the offending token.
    #[error("{kind}\n[line {line}]")]
    Runtime { kind: RuntimeErrorKind, line: usize },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops,
    /// including writes to the output sink.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        LoxError::Parse {
            message,
            line: token.line,
            location: location_of(token),
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve(token: &Token, kind: ResolveErrorKind) -> Self {
        info!("Creating Resolve error: line={}, kind={:?}", token.line, kind);

        LoxError::Resolve {
            kind,
            line: token.line,
            location: location_of(token),
        }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime(token: &Token, kind: RuntimeErrorKind) -> Self {
        info!("Creating Runtime error: line={}, kind={:?}", token.line, kind);

        LoxError::Runtime {
            kind,
            line: token.line,
        }
    }

    /// Source line of the diagnostic, if it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            LoxError::Lex { line, .. }
            | LoxError::Parse { line, .. }
            | LoxError::Resolve { line, .. }
            | LoxError::Runtime { line, .. } => Some(*line),
            LoxError::Io(_) => None,
        }
    }

    /// The resolver rule that was violated, for static errors.
    pub fn resolve_kind(&self) -> Option<&ResolveErrorKind> {
        match self {
            LoxError::Resolve { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// The runtime failure class, for runtime errors.
    pub fn runtime_kind(&self) -> Option<&RuntimeErrorKind> {
        match self {
            LoxError::Runtime { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

fn location_of(token: &Token) -> String {
    if token.token_type == TokenType::EOF {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_diagnostics_carry_location_context() {
        let token = Token::new(TokenType::IDENTIFIER, "a", 3);
        let err = LoxError::resolve(&token, ResolveErrorKind::DuplicateDeclaration);

        assert_eq!(
            err.to_string(),
            "[line 3] Error at 'a': Already a variable with this name in this scope."
        );
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn parse_errors_at_eof_say_at_end() {
        let token = Token::new(TokenType::EOF, "", 7);
        let err = LoxError::parse(&token, "Expected expression");

        assert_eq!(err.to_string(), "[line 7] Error at end: Expected expression");
    }

    #[test]
    fn runtime_errors_put_the_line_last() {
        let token = Token::new(TokenType::MINUS, "-", 2);
        let err = LoxError::runtime(&token, RuntimeErrorKind::OperandsMustBeNumbers);

        assert_eq!(err.to_string(), "Operands must be numbers.\n[line 2]");
        assert_eq!(
            err.runtime_kind(),
            Some(&RuntimeErrorKind::OperandsMustBeNumbers)
        );
    }

    #[test]
    fn io_errors_have_no_source_line() {
        let err = LoxError::from(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"));

        assert_eq!(err.line(), None);
        assert_eq!(err.to_string(), "sink closed");
    }
}
