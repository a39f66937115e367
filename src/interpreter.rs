//! Tree‑walking evaluator.
//!
//! Statements execute against a chain of [`Environment`] frames.  Variable
//! references consult the resolver's side table: a recorded distance reads
//! the frame that many hops out, anything else goes straight to globals.
//!
//! Non‑local exits (`break`, `return`, runtime errors) travel as the `Err`
//! side of [`Flow`] and are caught at the loop, the call frame and the
//! top‑level entry points respectively.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info};

use crate::ast::{Expr, ExprId, LiteralValue, Stmt};
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenType};
use crate::value::{Callable, Class, Function, Instance, NativeFunction, Value};

/// Early exit from statement execution.
#[derive(Debug)]
pub enum Signal {
    Break,
    Return(Value),
    Error(LoxError),
}

impl From<LoxError> for Signal {
    fn from(err: LoxError) -> Self {
        Signal::Error(err)
    }
}

/// Convenient alias for evaluator results.
pub type Flow<T> = std::result::Result<T, Signal>;

/// Nested Lox calls allowed before a call fails with "Stack overflow.".
const MAX_CALL_DEPTH: usize = 16_384;

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    locals: HashMap<ExprId, usize>,
    out: Box<dyn Write>,
    call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Interpreter printing to standard output.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Interpreter printing to `out`; globals are pre‑populated with the
    /// native functions.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals = Environment::new().into_ref();

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::Callable(Callable::Native(Rc::new(NativeFunction {
                name: "clock".to_string(),
                arity: 0,
                func: |_args: &[Value]| {
                    let millis = Utc::now().timestamp_millis();
                    Ok(Value::Number(millis as f64 / 1000.0))
                },
            }))),
        );

        Self {
            environment: globals.clone(),
            globals,
            locals: HashMap::new(),
            out,
            call_depth: 0,
        }
    }

    /// Side‑table hook used by the resolver.
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    pub fn globals(&self) -> &EnvRef {
        &self.globals
    }

    /// Interprets a list of statements (a "program").  The first runtime
    /// error aborts the remainder.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        let result = statements
            .iter()
            .try_for_each(|stmt| self.execute(stmt))
            .map_err(into_error);

        // Output produced before a runtime error still reaches the sink.
        self.out.flush()?;
        result?;

        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Evaluates a single top‑level expression.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        let value = self.eval(expr).map_err(into_error)?;

        debug!("Expression evaluated to: {}", value);
        Ok(value)
    }

    // ─────────────────────────────── statements ─────────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> Flow<()> {
        ensure_sufficient_stack(|| self.execute_stmt(stmt))
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> Flow<()> {
        match stmt {
            Stmt::Expression(expr) => {
                self.eval(expr)?;
            }

            Stmt::Print(expr) => {
                let value = self.eval(expr)?;
                writeln!(self.out, "{}", value).map_err(LoxError::from)?;
                debug!("Printed value: {}", value);
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Nil,
                };
                self.environment.borrow_mut().define(&name.lexeme, value);
            }

            Stmt::Block(statements) => {
                let env = Environment::with_enclosing(self.environment.clone()).into_ref();
                self.execute_block(statements, env)?;
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition)?.is_truthy() {
                    self.execute(then_branch)?;
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)?;
                }
            }

            Stmt::While { condition, body } => {
                debug!("Entering while loop");

                while self.eval(condition)?.is_truthy() {
                    match self.execute(body) {
                        Ok(()) => {}
                        Err(Signal::Break) => {
                            debug!("Break caught at loop boundary");
                            break;
                        }
                        Err(other) => return Err(other),
                    }
                }
            }

            Stmt::Break { .. } => return Err(Signal::Break),

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);

                let function = Function::new(decl.clone(), self.environment.clone(), false);
                self.environment.borrow_mut().define(
                    &decl.name.lexeme,
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                return Err(Signal::Return(value));
            }

            Stmt::Class {
                name,
                methods,
                static_methods,
            } => {
                debug!("Declaring class '{}'", name.lexeme);

                // Predeclare so method bodies can refer to the class.
                self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

                let metaclass = if static_methods.is_empty() {
                    None
                } else {
                    let statics = static_methods
                        .iter()
                        .map(|decl| {
                            let function =
                                Function::new(decl.clone(), self.environment.clone(), false);
                            (decl.name.lexeme.clone(), Rc::new(function))
                        })
                        .collect();
                    Some(Rc::new(Class::new(
                        format!("{} metaclass", name.lexeme),
                        statics,
                        None,
                    )))
                };

                let table = methods
                    .iter()
                    .map(|decl| {
                        let is_init = decl.name.lexeme == "init";
                        let function =
                            Function::new(decl.clone(), self.environment.clone(), is_init);
                        (decl.name.lexeme.clone(), Rc::new(function))
                    })
                    .collect();

                let class = Class::new(name.lexeme.clone(), table, metaclass);

                self.environment
                    .borrow_mut()
                    .assign(name, Value::Callable(Callable::Class(Rc::new(class))))?;
            }
        }

        Ok(())
    }

    /// Run `statements` with `environment` as the current frame.  The previous
    /// frame is restored on every exit path.
    pub fn execute_block(&mut self, statements: &[Stmt], environment: EnvRef) -> Flow<()> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let result = statements.iter().try_for_each(|stmt| self.execute(stmt));

        self.environment = previous;
        result
    }

    // ────────────────────────────── expressions ─────────────────────────────

    fn eval(&mut self, expr: &Expr) -> Flow<Value> {
        ensure_sufficient_stack(|| self.eval_expr(expr))
    }

    fn eval_expr(&mut self, expr: &Expr) -> Flow<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.eval(inner),

            Expr::Unary { operator, right } => {
                let right = self.eval(right)?;

                match operator.token_type {
                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(LoxError::runtime(operator, "Operand must be a number.").into()),
                    },
                    _ => Err(invalid_operator(operator).into()),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;

                Ok(binary(operator, left, right)?)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.eval(left)?;

                let decided = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if decided {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }

            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition)?.is_truthy() {
                    self.eval(then_branch)
                } else {
                    self.eval(else_branch)
                }
            }

            Expr::Variable { id, name } => Ok(self.look_up_variable(*id, name)?),

            Expr::Assign { id, name, value } => {
                let value = self.eval(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        self.environment
                            .borrow_mut()
                            .assign_at(distance, name, value.clone())?;
                    }
                    None => {
                        self.globals.borrow_mut().assign(name, value.clone())?;
                    }
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.eval(callee)?;

                let mut args = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.eval(arg)?);
                }

                self.call_value(callee, paren, args)
            }

            Expr::Get { object, name } => {
                let object = self.eval(object)?;
                self.get_property(object, name)
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object = self.eval(object)?;

                match object {
                    Value::Instance(instance) => {
                        let value = self.eval(value)?;
                        instance.borrow_mut().set_field(&name.lexeme, value.clone());
                        Ok(value)
                    }
                    Value::Callable(Callable::Class(class)) => {
                        let value = self.eval(value)?;
                        class.set_field(&name.lexeme, value.clone());
                        Ok(value)
                    }
                    _ => Err(LoxError::runtime(name, "Only instances have fields.").into()),
                }
            }

            Expr::This { id, keyword } => Ok(self.look_up_variable(*id, keyword)?),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => self.environment.borrow().get_at(distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    // ─────────────────────────────── calls ──────────────────────────────────

    fn call_value(&mut self, callee: Value, paren: &Token, args: Vec<Value>) -> Flow<Value> {
        let Value::Callable(callable) = callee else {
            return Err(LoxError::runtime(paren, "Can only call functions and classes.").into());
        };

        if args.len() != callable.arity() {
            let msg = format!(
                "Expected {} arguments but got {}.",
                callable.arity(),
                args.len()
            );
            return Err(LoxError::runtime(paren, msg).into());
        }

        match callable {
            Callable::Native(native) => {
                debug!("Calling native function '{}'", native.name);

                let result =
                    (native.func)(&args).map_err(|msg| LoxError::runtime(paren, msg))?;
                Ok(result)
            }
            Callable::Function(function) => self.call_function(&function, args, paren),
            Callable::Class(class) => self.instantiate(&class, args, paren),
        }
    }

    /// Invoke a user function: new frame under its closure, parameters bound,
    /// body run; `return` is caught here.  `at` locates the call for the
    /// depth-limit error.
    fn call_function(&mut self, function: &Function, args: Vec<Value>, at: &Token) -> Flow<Value> {
        debug!("Calling user-defined function '{}'", function.name());

        if self.call_depth >= MAX_CALL_DEPTH {
            debug!("Call depth limit of {} reached", MAX_CALL_DEPTH);
            return Err(LoxError::runtime(at, "Stack overflow.").into());
        }

        let mut frame = Environment::with_enclosing(function.closure.clone());
        for (param, arg) in function
            .declaration
            .params
            .iter()
            .flatten()
            .zip(args)
        {
            frame.define(&param.lexeme, arg);
        }

        self.call_depth += 1;
        let result = self.execute_block(&function.declaration.body, frame.into_ref());
        self.call_depth -= 1;

        let returned = match result {
            Ok(()) => Value::Nil,
            Err(Signal::Return(value)) => value,
            Err(other) => return Err(other),
        };

        if function.is_initializer {
            // `init` always yields the instance, whatever it returned.
            let this = Token::synthetic("this", function.declaration.name.line);
            return Ok(function.closure.borrow().get_at(0, &this)?);
        }

        debug!("Function '{}' returned: {}", function.name(), returned);
        Ok(returned)
    }

    fn instantiate(&mut self, class: &Rc<Class>, args: Vec<Value>, at: &Token) -> Flow<Value> {
        debug!("Constructing instance of '{}'", class.name);

        let instance = Value::Instance(Rc::new(RefCell::new(Instance::new(class.clone()))));

        if let Some(init) = class.find_method("init") {
            self.call_function(&init.bind(instance.clone()), args, at)?;
        }

        Ok(instance)
    }

    /// Fields first, then methods bound to the receiver.  A getter is run on
    /// the spot and its result substituted.
    fn get_property(&mut self, object: Value, name: &Token) -> Flow<Value> {
        let (field, method) = match &object {
            Value::Instance(instance) => {
                let instance = instance.borrow();
                (
                    instance.field(&name.lexeme),
                    instance.class.find_method(&name.lexeme),
                )
            }
            Value::Callable(Callable::Class(class)) => (
                class.field(&name.lexeme),
                class
                    .metaclass()
                    .and_then(|meta| meta.find_method(&name.lexeme)),
            ),
            _ => return Err(LoxError::runtime(name, "Only instances have properties.").into()),
        };

        if let Some(value) = field {
            return Ok(value);
        }

        let Some(method) = method else {
            let msg = format!("Undefined property '{}'.", name.lexeme);
            return Err(LoxError::runtime(name, msg).into());
        };

        let bound = method.bind(object);

        if bound.is_getter() {
            debug!("Invoking getter '{}'", name.lexeme);
            return self.call_function(&bound, Vec::new(), name);
        }

        Ok(Value::Callable(Callable::Function(Rc::new(bound))))
    }
}

// ───────────────────────────── operator helpers ─────────────────────────────

fn binary(operator: &Token, left: Value, right: Value) -> Result<Value> {
    match operator.token_type {
        TokenType::COMMA => Ok(right),

        TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),
        TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

        TokenType::PLUS => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), b) => Ok(Value::String(format!("{}{}", a, b))),
            (a, Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            _ => Err(LoxError::runtime(
                operator,
                "Operands must be two numbers or two strings.",
            )),
        },

        TokenType::MINUS => numbers(operator, &left, &right).map(|(a, b)| Value::Number(a - b)),
        TokenType::STAR => numbers(operator, &left, &right).map(|(a, b)| Value::Number(a * b)),
        TokenType::SLASH => {
            let (a, b) = numbers(operator, &left, &right)?;
            if b == 0.0 {
                return Err(LoxError::runtime(operator, "Division by zero."));
            }
            Ok(Value::Number(a / b))
        }

        TokenType::GREATER => numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a > b)),
        TokenType::GREATER_EQUAL => {
            numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a >= b))
        }
        TokenType::LESS => numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a < b)),
        TokenType::LESS_EQUAL => {
            numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a <= b))
        }

        _ => Err(invalid_operator(operator)),
    }
}

fn numbers(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(LoxError::runtime(
            operator,
            format!("Operands of '{}' must be numbers.", operator.lexeme),
        )),
    }
}

fn invalid_operator(operator: &Token) -> LoxError {
    LoxError::runtime(
        operator,
        format!("Invalid operator '{}'.", operator.lexeme),
    )
}

/// A signal that escaped to the top level.  The parser and resolver keep
/// `break`/`return` inside their constructs, so only errors arrive here in
/// practice.
fn into_error(signal: Signal) -> LoxError {
    match signal {
        Signal::Error(e) => e,
        Signal::Break => LoxError::Runtime {
            message: "Unexpected 'break'.".to_string(),
            line: 0,
        },
        Signal::Return(_) => LoxError::Runtime {
            message: "Unexpected 'return'.".to_string(),
            line: 0,
        },
    }
}
