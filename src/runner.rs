//! Source‑to‑output pipeline: scan → parse → resolve → interpret.
//!
//! Lexical, syntax and resolution diagnostics are gathered for the whole
//! input; if there are any, nothing is executed.  A runtime error aborts the
//! current input only, so an interactive session survives it.

use std::io::Write;

use log::{debug, info};
use thiserror::Error;

use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::parser::{Parser, ReplInput};
use crate::resolver::Resolver;
use crate::scanner::scan_tokens;
use crate::value::Value;

#[derive(Debug, Error)]
pub enum RunError {
    /// Syntax and resolution diagnostics, in the order they were found.
    #[error("{}", render(.0))]
    Static(Vec<LoxError>),

    #[error(transparent)]
    Runtime(LoxError),
}

fn render(errors: &[LoxError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl RunError {
    /// Conventional process exit code (sysexits `EX_DATAERR` / `EX_SOFTWARE`).
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Static(_) => 65,
            RunError::Runtime(_) => 70,
        }
    }
}

/// A long‑lived interpreter session.  Globals persist across calls.
pub struct Runner {
    interpreter: Interpreter,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    pub fn new() -> Self {
        Self {
            interpreter: Interpreter::new(),
        }
    }

    /// Session whose `print` output goes to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        Self {
            interpreter: Interpreter::with_output(out),
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Run a whole script.
    pub fn run(&mut self, source: &str) -> Result<(), RunError> {
        info!("Running script of {} bytes", source.len());

        let (tokens, mut errors) = scan_tokens(source);

        let statements = match Parser::new(tokens).parse() {
            Ok(statements) => statements,
            Err(parse_errors) => {
                errors.extend(parse_errors);
                return Err(RunError::Static(errors));
            }
        };

        if !errors.is_empty() {
            return Err(RunError::Static(errors));
        }

        Resolver::new(&mut self.interpreter)
            .resolve(&statements)
            .map_err(RunError::Static)?;

        debug!("Front end clean; executing {} statement(s)", statements.len());

        self.interpreter
            .interpret(&statements)
            .map_err(RunError::Runtime)
    }

    /// Run one line of interactive input.  A bare expression yields its
    /// value; statements yield `None` after executing.
    pub fn run_line(&mut self, line: &str) -> Result<Option<Value>, RunError> {
        debug!("Running interactive line: {:?}", line);

        let (tokens, mut errors) = scan_tokens(line);

        let input = match Parser::new(tokens).parse_repl() {
            Ok(input) => input,
            Err(parse_errors) => {
                errors.extend(parse_errors);
                return Err(RunError::Static(errors));
            }
        };

        if !errors.is_empty() {
            return Err(RunError::Static(errors));
        }

        match input {
            ReplInput::Expression(expr) => {
                Resolver::new(&mut self.interpreter)
                    .resolve_expression(&expr)
                    .map_err(RunError::Static)?;

                self.interpreter
                    .evaluate(&expr)
                    .map(Some)
                    .map_err(RunError::Runtime)
            }
            ReplInput::Statements(statements) => {
                Resolver::new(&mut self.interpreter)
                    .resolve(&statements)
                    .map_err(RunError::Static)?;

                self.interpreter
                    .interpret(&statements)
                    .map(|()| None)
                    .map_err(RunError::Runtime)
            }
        }
    }

    /// Parse, resolve and evaluate a single expression spanning the whole
    /// input.
    pub fn evaluate(&mut self, source: &str) -> Result<Value, RunError> {
        let (tokens, mut errors) = scan_tokens(source);

        let expr = match Parser::new(tokens).parse_expression() {
            Ok(expr) => expr,
            Err(parse_errors) => {
                errors.extend(parse_errors);
                return Err(RunError::Static(errors));
            }
        };

        if !errors.is_empty() {
            return Err(RunError::Static(errors));
        }

        Resolver::new(&mut self.interpreter)
            .resolve_expression(&expr)
            .map_err(RunError::Static)?;

        self.interpreter.evaluate(&expr).map_err(RunError::Runtime)
    }
}
