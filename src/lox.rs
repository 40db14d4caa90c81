//! Session driver: scan → parse → resolve → interpret.
//!
//! A [`Lox`] session owns one interpreter, so globals defined by one input are
//! visible to the next.  This is what the REPL and the `run` command use.

use std::io::Write;

use log::{debug, info};
use thiserror::Error;

use crate::ast::{ExprId, Stmt};
use crate::error::LoxError;
use crate::interpreter::{Interpreter, InterpreterConfig};
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::tokenize;

/// Why a source unit did not run to completion.
#[derive(Debug, Error)]
pub enum Failure {
    /// Lexical, syntax or resolution errors.  Nothing was executed.
    #[error("{} static error(s)", .0.len())]
    Static(Vec<LoxError>),

    /// Execution stopped at the first runtime error.
    #[error(transparent)]
    Runtime(LoxError),
}

impl Failure {
    /// `sysexits.h` code for this failure: `EX_DATAERR` or `EX_SOFTWARE`.
    pub fn exit_code(&self) -> i32 {
        match self {
            Failure::Static(_) => 65,
            Failure::Runtime(_) => 70,
        }
    }

    /// Every diagnostic carried by this failure.
    pub fn diagnostics(&self) -> &[LoxError] {
        match self {
            Failure::Static(errors) => errors,
            Failure::Runtime(error) => std::slice::from_ref(error),
        }
    }
}

pub struct Lox {
    interpreter: Interpreter,
    next_id: ExprId,
}

impl Lox {
    /// A session printing to stdout.
    pub fn new(config: InterpreterConfig) -> Self {
        Self::from_interpreter(Interpreter::with_config(config))
    }

    /// A session printing to `output`.
    pub fn with_output(config: InterpreterConfig, output: Box<dyn Write>) -> Self {
        Self::from_interpreter(Interpreter::with_config(config).with_output(output))
    }

    fn from_interpreter(interpreter: Interpreter) -> Self {
        info!("Lox session started");
        Self {
            interpreter,
            next_id: ExprId(0),
        }
    }

    /// Run a whole program.
    pub fn run(&mut self, source: &str) -> Result<(), Failure> {
        let statements = self.compile(source)?;
        self.interpreter
            .interpret(&statements)
            .map_err(Failure::Runtime)
    }

    /// Run one REPL input.  A lone expression statement has its value echoed.
    pub fn run_line(&mut self, source: &str) -> Result<(), Failure> {
        let statements = self.compile(source)?;

        if let [Stmt::Expression(expr)] = statements.as_slice() {
            let value = self.interpreter.evaluate(expr).map_err(Failure::Runtime)?;
            debug!("Echoing {}", value);
            return self
                .interpreter
                .emit(&value.to_string())
                .map_err(Failure::Runtime);
        }

        self.interpreter
            .interpret(&statements)
            .map_err(Failure::Runtime)
    }

    /// Scan, parse and resolve `source`, installing its resolutions in the
    /// interpreter.  Lexical and syntax errors are reported together.
    fn compile(&mut self, source: &str) -> Result<Vec<Stmt>, Failure> {
        let (tokens, mut errors) = tokenize(source);

        let mut parser = Parser::with_first_id(tokens, self.next_id);
        let parsed = parser.parse();
        self.next_id = parser.next_id();

        let statements = match parsed {
            Ok(statements) if errors.is_empty() => statements,
            Ok(_) => return Err(Failure::Static(errors)),
            Err(parse_errors) => {
                errors.extend(parse_errors);
                return Err(Failure::Static(errors));
            }
        };

        let resolutions = Resolver::new()
            .resolve(&statements)
            .map_err(Failure::Static)?;
        self.interpreter.resolve(resolutions);

        Ok(statements)
    }
}
