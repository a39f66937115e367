//! Static resolver pass for the **Lox** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of maps from name to declared/defined/read state).
//! 2. Report static errors (redeclaration, read in own initializer, unread
//!    locals, misplaced `return` or `this`).
//! 3. Tell the interpreter, for *each* variable occurrence, how many scopes
//!    outward its binding lives.  Occurrences found in no tracked scope are
//!    left unrecorded and fall back to the global frame at run time.
//!
//! Errors are collected rather than returned early so a single run reports
//! all of them.

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::stack::ensure_sufficient_stack;
use crate::token::Token;
use log::{debug, info};
use std::collections::HashMap;

/// What kind of function body we are inside.  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum VariableState {
    Declared,
    Defined,
    Read,
}

#[derive(Debug)]
struct Local<'a> {
    name: &'a Token,
    state: VariableState,
}

/// Resolver: tracks scopes, enforces static rules, and *records* binding
/// distances by calling back into the interpreter.
pub struct Resolver<'a, 'interp> {
    interpreter: &'interp mut Interpreter,
    scopes: Vec<HashMap<&'a str, Local<'a>>>,
    current_function: FunctionType,
    current_class: ClassType,
    errors: Vec<LoxError>,
}

impl<'a, 'interp> Resolver<'a, 'interp> {
    /// Create a new resolver bound to the given interpreter.
    pub fn new(interpreter: &'interp mut Interpreter) -> Self {
        info!("Resolver instantiated");

        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            errors: Vec::new(),
        }
    }

    /// Walk all top‑level statements.
    pub fn resolve(mut self, statements: &'a [Stmt]) -> Result<(), Vec<LoxError>> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        self.resolve_stmts(statements);
        self.finish()
    }

    /// Resolve a lone top‑level expression (interactive mode).
    pub fn resolve_expression(mut self, expr: &'a Expr) -> Result<(), Vec<LoxError>> {
        info!("Beginning resolve pass over a single expression");

        self.resolve_expr(expr);
        self.finish()
    }

    fn finish(self) -> Result<(), Vec<LoxError>> {
        if self.errors.is_empty() {
            info!("Resolve pass finished cleanly");

            Ok(())
        } else {
            info!("Resolve pass finished with {} error(s)", self.errors.len());

            Err(self.errors)
        }
    }

    fn error(&mut self, token: &Token, message: &str) {
        debug!("Resolve error at '{}': {}", token.lexeme, message);

        self.errors.push(LoxError::resolve(token, message));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmts(&mut self, statements: &'a [Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &'a Stmt) {
        ensure_sufficient_stack(|| self.resolve_stmt_inner(stmt))
    }

    fn resolve_stmt_inner(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_stmts(statements);
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function(decl) => {
                // the name is visible *inside* its own body for recursion
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(decl, FunctionType::Function);
            }

            Stmt::Class {
                name,
                methods,
                static_methods,
            } => self.resolve_class(name, methods, static_methods),

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            // Placement of `break` is checked by the parser.
            Stmt::Break { .. } => {}

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Can't return a value from an initializer.");
                    }
                    self.resolve_expr(expr);
                }
            }
        }
    }

    /// Instance methods and static methods each get their own scope binding
    /// `this`; the two are siblings so scope distances inside either match
    /// the single bound frame the interpreter inserts.
    fn resolve_class(
        &mut self,
        name: &'a Token,
        methods: &'a [std::rc::Rc<FunctionDecl>],
        static_methods: &'a [std::rc::Rc<FunctionDecl>],
    ) {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(name);
        self.define(name);

        self.begin_this_scope(name);
        for method in methods {
            let kind = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, kind);
        }
        self.end_scope();

        if !static_methods.is_empty() {
            self.begin_this_scope(name);
            for method in static_methods {
                self.resolve_function(method, FunctionType::Method);
            }
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &'a Expr) {
        ensure_sufficient_stack(|| self.resolve_expr_inner(expr))
    }

    fn resolve_expr_inner(&mut self, expr: &'a Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }

            Expr::Variable { id, name } => {
                let in_own_initializer = self
                    .scopes
                    .last()
                    .and_then(|scope| scope.get(name.lexeme.as_str()))
                    .is_some_and(|local| local.state == VariableState::Declared);

                if in_own_initializer {
                    self.error(name, "Can't read local variable in its own initializer.");
                }

                self.resolve_local(*id, name, true);
            }

            Expr::Assign { id, name, value } => {
                // First resolve RHS, then bind LHS
                self.resolve_expr(value);
                self.resolve_local(*id, name, false);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            // Property names are looked up dynamically.
            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                    return;
                }

                self.resolve_local(*id, keyword, true);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function’s parameters + body.
    fn resolve_function(&mut self, decl: &'a FunctionDecl, kind: FunctionType) {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in decl.params.iter().flatten() {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&decl.body);
        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Scope hosting `this`.  The binding is pre‑marked as read: methods
    /// that never mention `this` are fine.
    fn begin_this_scope(&mut self, class_name: &'a Token) {
        let mut scope = HashMap::new();
        scope.insert(
            "this",
            Local {
                name: class_name,
                state: VariableState::Read,
            },
        );
        self.scopes.push(scope);
    }

    /// Pop the innermost scope, flagging every local that was defined but
    /// never read.
    fn end_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else {
            return;
        };

        let mut unread: Vec<&'a Token> = scope
            .values()
            .filter(|local| local.state == VariableState::Defined)
            .map(|local| local.name)
            .collect();

        // HashMap order is arbitrary; report in source order.
        unread.sort_by(|a, b| a.line.cmp(&b.line).then_with(|| a.lexeme.cmp(&b.lexeme)));

        for name in unread {
            self.error(name, "Local variable is not read.");
        }
    }

    fn declare(&mut self, name: &'a Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        if scope.contains_key(name.lexeme.as_str()) {
            self.error(name, "Already a variable with this name in this scope.");
            return;
        }

        scope.insert(
            name.lexeme.as_str(),
            Local {
                name,
                state: VariableState::Declared,
            },
        );
    }

    fn define(&mut self, name: &'a Token) {
        if let Some(local) = self
            .scopes
            .last_mut()
            .and_then(|scope| scope.get_mut(name.lexeme.as_str()))
        {
            if local.state == VariableState::Declared {
                local.state = VariableState::Defined;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this variable occurrence as a local at depth `d`, marking the
    /// binding read when `is_read`; leave it unrecorded if not found in
    /// *any* scope (global).
    fn resolve_local(&mut self, id: ExprId, name: &Token, is_read: bool) {
        // innermost → outermost
        for (depth, scope) in self.scopes.iter_mut().rev().enumerate() {
            if let Some(local) = scope.get_mut(name.lexeme.as_str()) {
                if is_read {
                    local.state = VariableState::Read;
                }

                debug!("Resolved '{}' {} at depth {}", name.lexeme, id, depth);
                self.interpreter.note_local(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' {} as global", name.lexeme, id);
    }
}
