#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use treelox as lox;

use lox::ast::Expr;
use lox::ast_printer::AstPrinter;
use lox::error::LoxError;
use lox::parser::Parser;
use lox::runner::{RunError, Runner};
use lox::scanner::scan_tokens;

/// In‑memory `print` sink that stays readable after the interpreter takes
/// ownership of its boxed writer.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("print output is UTF-8")
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A runner wired to a fresh buffer.
pub fn session() -> (Runner, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let runner = Runner::with_output(Box::new(buffer.clone()));
    (runner, buffer)
}

/// Run a program that must succeed; returns everything it printed.
pub fn run_ok(source: &str) -> String {
    let (mut runner, buffer) = session();

    if let Err(e) = runner.run(source) {
        panic!("program failed: {}\n--- source ---\n{}", e, source);
    }

    buffer.contents()
}

/// Run a program that must fail; returns the error and what was printed
/// before it.
pub fn run_err(source: &str) -> (RunError, String) {
    let (mut runner, buffer) = session();

    match runner.run(source) {
        Ok(()) => panic!(
            "program unexpectedly succeeded, printing:\n{}",
            buffer.contents()
        ),
        Err(e) => (e, buffer.contents()),
    }
}

/// Bare messages of a static failure, in reported order.
pub fn static_messages(err: &RunError) -> Vec<String> {
    match err {
        RunError::Static(errors) => errors.iter().map(LoxError::message).collect(),
        RunError::Runtime(e) => panic!("expected static errors, got runtime error: {}", e),
    }
}

pub fn runtime_message(err: &RunError) -> String {
    match err {
        RunError::Runtime(e) => e.message(),
        RunError::Static(errors) => panic!("expected a runtime error, got {:?}", errors),
    }
}

/// Scan and parse `source` as a single expression; panics on any error.
pub fn parse_expr(source: &str) -> Expr {
    let (tokens, lex_errors) = scan_tokens(source);
    assert!(lex_errors.is_empty(), "lex errors: {:?}", lex_errors);

    match Parser::new(tokens).parse_expression() {
        Ok(expr) => expr,
        Err(errors) => panic!("parse errors: {:?}", errors),
    }
}

pub fn print_expr(source: &str) -> String {
    AstPrinter::print(&parse_expr(source))
}
