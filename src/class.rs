use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::callable::Callable;
use crate::error::{LoxError, Result, RuntimeErrorKind};
use crate::function::LoxFunction;
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

/// Name of the method that runs when a class is called.
pub const INITIALIZER_NAME: &str = "init";

/// A class value: its methods plus an optional superclass.  Immutable once
/// built.
pub struct LoxClass {
    name: String,
    superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    pub fn new(
        name: impl Into<String>,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, Rc<LoxFunction>>,
    ) -> Self {
        Self {
            name: name.into(),
            superclass,
            methods,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn superclass(&self) -> Option<&Rc<LoxClass>> {
        self.superclass.as_ref()
    }

    /// Own methods first, then up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        match self.methods.get(name) {
            Some(method) => Some(Rc::clone(method)),
            None => self
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name)),
        }
    }
}

impl Callable for Rc<LoxClass> {
    fn arity(&self) -> usize {
        self.find_method(INITIALIZER_NAME)
            .map_or(0, |initializer| initializer.arity())
    }

    /// Creates an instance, runs `init` on it if there is one, and yields the
    /// instance whatever `init` returned.
    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value> {
        let instance = Rc::new(LoxInstance::new(Rc::clone(self)));

        debug!("Instantiated {}", instance);

        if let Some(initializer) = self.find_method(INITIALIZER_NAME) {
            initializer
                .bind(Rc::clone(&instance))
                .call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl fmt::Display for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Debug for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        methods.sort_unstable();

        f.debug_struct("LoxClass")
            .field("name", &self.name)
            .field(
                "superclass",
                &self.superclass.as_ref().map(|superclass| superclass.name()),
            )
            .field("methods", &methods)
            .finish()
    }
}

/// An object: a class reference plus fields created on first write.
pub struct LoxInstance {
    class: Rc<LoxClass>,
    fields: RefCell<HashMap<String, Value>>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    pub fn class(&self) -> &Rc<LoxClass> {
        &self.class
    }

    /// Fields shadow methods; a method found on the class comes back bound to
    /// this instance.
    pub fn get(self: &Rc<Self>, name: &Token) -> Result<Value> {
        if let Some(value) = self.fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        match self.class.find_method(&name.lexeme) {
            Some(method) => Ok(Value::Function(Rc::new(method.bind(Rc::clone(self))))),
            None => Err(LoxError::runtime(
                name,
                RuntimeErrorKind::UndefinedProperty(name.lexeme.clone()),
            )),
        }
    }

    pub fn set(&self, name: &Token, value: Value) {
        self.fields.borrow_mut().insert(name.lexeme.clone(), value);
    }
}

impl fmt::Display for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class.name)
    }
}

// Field values may lead back here, so only their names are shown.
impl fmt::Debug for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.fields.borrow();
        let mut names: Vec<&str> = fields.keys().map(String::as_str).collect();
        names.sort_unstable();

        f.debug_struct("LoxInstance")
            .field("class", &self.class.name)
            .field("fields", &names)
            .finish()
    }
}
