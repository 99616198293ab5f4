use std::collections::HashMap;

use crate::error::RuntimeError;
use crate::runtime_value::RuntimeValue;

/// A single lexical scope: one `{ ... }` body, loop header, or the program itself.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    variables: HashMap<String, RuntimeValue>,
}

impl Scope {
    pub fn get_variable(&self, name: &str) -> Option<&RuntimeValue> {
        self.variables.get(name)
    }
}

/// The full environment is a stack of scopes; the bottom one holds globals.
#[derive(Debug)]
pub struct Environment {
    scopes: Vec<Scope>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            scopes: vec![Scope::default()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Pop the innermost scope. The global scope is never popped.
    pub fn pop_scope(&mut self) -> Option<Scope> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Declare a variable in the innermost scope, overwriting a previous declaration there.
    pub fn declare(&mut self, name: &str, value: RuntimeValue) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.variables.insert(name.to_string(), value);
        }
    }

    /// Look up a variable, searching from innermost scope outward.
    pub fn get_variable(&self, name: &str) -> Option<&RuntimeValue> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get_variable(name))
    }

    /// Assign to the innermost scope that declares `name`.
    pub fn assign(&mut self, name: &str, value: RuntimeValue) -> Result<(), RuntimeError> {
        let slot = self
            .scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.variables.get_mut(name))
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.to_string()))?;
        *slot = value;
        Ok(())
    }

    pub fn globals(&self) -> &Scope {
        &self.scopes[0]
    }
}
