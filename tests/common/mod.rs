#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use rox::interpreter::InterpreterConfig;
use rox::{Failure, Lox};

/// A `Write` sink whose contents stay readable after it has been handed to
/// the interpreter.
#[derive(Clone, Default)]
pub struct OutputCapture(Rc<RefCell<Vec<u8>>>);

impl OutputCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(str::to_string).collect()
    }
}

impl Write for OutputCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A session printing into a fresh capture.
pub fn session(config: InterpreterConfig) -> (Lox, OutputCapture) {
    let output = OutputCapture::new();
    let lox = Lox::with_output(config, Box::new(output.clone()));
    (lox, output)
}

/// Run `source` as a program; returns printed lines and the outcome.
pub fn run(source: &str) -> (Vec<String>, Result<(), Failure>) {
    run_with_config(source, InterpreterConfig::default())
}

pub fn run_with_config(source: &str, config: InterpreterConfig) -> (Vec<String>, Result<(), Failure>) {
    let (mut lox, output) = session(config);
    let result = lox.run(source);
    (output.lines(), result)
}

/// Run `source`, which must succeed, and return what it printed.
pub fn output_of(source: &str) -> Vec<String> {
    let (lines, result) = run(source);
    if let Err(failure) = result {
        panic!("program failed: {:?}", failure.diagnostics());
    }
    lines
}
