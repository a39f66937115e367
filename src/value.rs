//! Runtime values.
//!
//! `Value` is closed: nil, booleans, numbers, strings, callables and
//! instances.  Callables come in three flavours (native, user function,
//! class); a class is called to construct an instance.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::environment::{EnvRef, Environment};

/// Signature of a host function exposed to scripts.
pub type NativeFn = fn(&[Value]) -> Result<Value, String>;

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Callable(Callable),
    Instance(Rc<RefCell<Instance>>),
}

impl Value {
    /// `nil` and `false` are falsy; everything else, `0` and `""` included,
    /// is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            _ => true,
        }
    }
}

impl PartialEq for Value {
    /// Primitives compare by value; callables and instances by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a.same(b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::String(s) => write!(f, "{}", s),

            Value::Callable(c) => write!(f, "{}", c),

            Value::Instance(i) => write!(f, "{} instance", i.borrow().class.name),
        }
    }
}

// Closures and environments reference each other, so a derived `Debug`
// would recurse forever.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

#[derive(Clone)]
pub enum Callable {
    Native(Rc<NativeFunction>),
    Function(Rc<Function>),
    Class(Rc<Class>),
}

impl Callable {
    pub fn arity(&self) -> usize {
        match self {
            Callable::Native(n) => n.arity,
            Callable::Function(f) => f.arity(),
            Callable::Class(c) => c.arity(),
        }
    }

    fn same(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Native(a), Callable::Native(b)) => Rc::ptr_eq(a, b),
            (Callable::Function(a), Callable::Function(b)) => Rc::ptr_eq(a, b),
            (Callable::Class(a), Callable::Class(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Native(_) => write!(f, "<native fn>"),
            Callable::Function(func) => write!(f, "<fn {}>", func.declaration.name.lexeme),
            Callable::Class(class) => write!(f, "{}", class.name),
        }
    }
}

pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub func: NativeFn,
}

/// A user function or method: its declaration plus the environment it
/// closed over.
pub struct Function {
    pub declaration: Rc<FunctionDecl>,
    pub closure: EnvRef,
    pub is_initializer: bool,
}

impl Function {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn arity(&self) -> usize {
        self.declaration.arity()
    }

    pub fn is_getter(&self) -> bool {
        self.declaration.is_getter()
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    /// A copy of this method whose closure is a new frame binding `this`.
    pub fn bind(&self, this: Value) -> Function {
        let mut environment = Environment::with_enclosing(self.closure.clone());
        environment.define("this", this);

        Function::new(
            self.declaration.clone(),
            environment.into_ref(),
            self.is_initializer,
        )
    }
}

pub struct Class {
    pub name: String,
    methods: HashMap<String, Rc<Function>>,

    /// Holds the static methods; looked up when a property is read off the
    /// class value itself.
    metaclass: Option<Rc<Class>>,

    /// Fields stored directly on the class value (`Point.origin = ...`).
    fields: RefCell<HashMap<String, Value>>,
}

impl Class {
    pub fn new(
        name: impl Into<String>,
        methods: HashMap<String, Rc<Function>>,
        metaclass: Option<Rc<Class>>,
    ) -> Self {
        Self {
            name: name.into(),
            methods,
            metaclass,
            fields: RefCell::new(HashMap::new()),
        }
    }

    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        self.methods.get(name).cloned()
    }

    pub fn metaclass(&self) -> Option<&Rc<Class>> {
        self.metaclass.as_ref()
    }

    /// Constructor arity follows `init`, or zero without one.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.borrow().get(name).cloned()
    }

    pub fn set_field(&self, name: &str, value: Value) {
        self.fields.borrow_mut().insert(name.to_string(), value);
    }
}

pub struct Instance {
    pub class: Rc<Class>,
    fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    /// Fields shadow methods: a set always lands in field storage.
    pub fn set_field(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }
}
