use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;

/// Shared handle to a scope frame.  Closures and the active call stack hold
/// clones of the same handle, so a write through one is seen by all.
pub type EnvRef = Rc<RefCell<Environment>>;

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

    /// Wrap into a fresh shared handle.
    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    /// Create or overwrite `name` in this frame.
    pub fn define(&mut self, name: &str, value: Value) {
        debug!("Defining '{}' = {}", name, value);

        self.values.insert(name.to_string(), value);
    }

    /// Value bound in *this* frame only.
    pub fn get_own(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    /// Dynamic lookup walking outward through every enclosing frame.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

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

    /// Read `name` from the frame exactly `distance` hops outward.
    pub fn get_at(&self, distance: usize, name: &Token) -> Result<Value> {
        if distance == 0 {
            return self.get_own(&name.lexeme).ok_or_else(|| undefined(name));
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow().get_at(distance - 1, name),
            None => Err(undefined(name)),
        }
    }

    /// Write `name` in the frame exactly `distance` hops outward.
    pub fn assign_at(&mut self, distance: usize, name: &Token, value: Value) -> Result<()> {
        if distance == 0 {
            return match self.values.get_mut(&name.lexeme) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(undefined(name)),
            };
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign_at(distance - 1, name, value),
            None => Err(undefined(name)),
        }
    }
}

fn undefined(name: &Token) -> LoxError {
    LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
}
