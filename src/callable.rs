use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::value::Value;

/// Anything a call expression can invoke.
///
/// The interpreter checks the argument count against [`Callable::arity`]
/// before calling, so implementations may assume `arguments.len() == arity()`.
pub trait Callable {
    fn arity(&self) -> usize;

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value>;
}
