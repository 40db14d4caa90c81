use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::callable::Callable;
use crate::class::LoxInstance;
use crate::environment::{EnvRef, Environment};
use crate::error::Result;
use crate::interpreter::{Completion, Interpreter};
use crate::value::Value;

/// A user function or method paired with the scope it was created in.
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: EnvRef,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn is_initializer(&self) -> bool {
        self.is_initializer
    }

    /// A copy of this function whose scope additionally binds `this`.
    /// `self` is left untouched.
    pub fn bind(&self, instance: Rc<LoxInstance>) -> LoxFunction {
        debug!("Binding '{}' to {}", self.name(), instance);

        let environment = Environment::child_of(&self.closure);
        environment
            .borrow_mut()
            .define("this", Value::Instance(instance));

        LoxFunction::new(
            Rc::clone(&self.declaration),
            environment,
            self.is_initializer,
        )
    }

    /// `this` as seen from the body of a bound initializer.
    fn bound_instance(&self) -> Value {
        Environment::lookup_at(&self.closure, 0, "this").unwrap_or(Value::Nil)
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value> {
        let environment = Environment::child_of(&self.closure);

        {
            let mut scope = environment.borrow_mut();
            for (param, argument) in self.declaration.params.iter().zip(arguments) {
                scope.define(&param.lexeme, argument);
            }
        }

        let completion = interpreter.execute_block(&self.declaration.body, environment)?;

        // An initializer hands back its instance however the body ends.
        if self.is_initializer {
            return Ok(self.bound_instance());
        }

        match completion {
            Completion::Return(value) => Ok(value),
            Completion::Normal => Ok(Value::Nil),
        }
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

// Never print the closure: scopes can reach back to this function.
impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxFunction")
            .field("name", &self.name())
            .field("arity", &self.arity())
            .field("is_initializer", &self.is_initializer)
            .finish()
    }
}
