use crate::error::{LoxError, Result, RuntimeErrorKind};
use crate::token::Token;
use crate::value::Value;
use log::trace;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a scope.  Closures, bound methods and the interpreter all
/// hold these, so a scope lives as long as its longest holder.
pub type EnvRef = Rc<RefCell<Environment>>;

/// One lexical scope at run time: its own bindings plus a link outward.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap a fresh child of `enclosing` in a shared handle.
    pub fn child_of(enclosing: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            enclosing,
        ))))
    }

    pub fn enclosing(&self) -> Option<EnvRef> {
        self.enclosing.clone()
    }

    /// Bind `name` in this scope only, replacing any previous binding here.
    pub fn define(&mut self, name: &str, value: Value) {
        trace!("define {} = {}", name, value);
        self.values.insert(name.to_string(), value);
    }

    /// Look `name` up here, then outward.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

    /// Overwrite the nearest existing binding of `name`.  Never creates one.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    /// The scope exactly `distance` links outward from `env`.
    pub fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
        let mut scope = Rc::clone(env);

        for _ in 0..distance {
            let parent = scope.borrow().enclosing()?;
            scope = parent;
        }

        Some(scope)
    }

    /// Read `name` from the scope `distance` links out, without searching
    /// further.  The resolver guarantees the binding exists.
    pub fn get_at(env: &EnvRef, distance: usize, name: &Token) -> Result<Value> {
        Self::lookup_at(env, distance, &name.lexeme).ok_or_else(|| undefined(name))
    }

    pub fn assign_at(env: &EnvRef, distance: usize, name: &Token, value: Value) -> Result<()> {
        let scope = Self::ancestor(env, distance).ok_or_else(|| undefined(name))?;
        let mut scope = scope.borrow_mut();

        match scope.values.get_mut(&name.lexeme) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(undefined(name)),
        }
    }

    /// Like [`Environment::get_at`] for names that have no token of their own
    /// (`this` inside an initializer).
    pub fn lookup_at(env: &EnvRef, distance: usize, name: &str) -> Option<Value> {
        let scope = Self::ancestor(env, distance)?;
        let value = scope.borrow().values.get(name).cloned();
        value
    }

    /// Drop every binding.  Breaks reference cycles that run through this
    /// scope (class → method closure → scope → class).
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

fn undefined(name: &Token) -> LoxError {
    LoxError::runtime(name, RuntimeErrorKind::UndefinedVariable(name.lexeme.clone()))
}
