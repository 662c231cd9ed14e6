use crate::interpreter::{RuntimeError, Value};
use crate::scanner::Token;
use crate::types::{create_shared, Shared};
use std::collections::HashMap;

/// One scope frame: bindings plus a link to the enclosing frame. Frames are
/// reference counted so a closure can keep its defining frame alive after
/// the block or call that created it has returned.
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Shared<Environment>>,
}

impl Environment {
    pub fn new(enclosing: Option<Shared<Environment>>) -> Shared<Environment> {
        create_shared(Environment {
            values: HashMap::default(),
            enclosing,
        })
    }

    /// A name may be defined at most once per frame.
    pub fn define(&mut self, name: &Token, val: Value) -> Result<(), RuntimeError> {
        if self.values.contains_key(&*name.lexeme) {
            return RuntimeError::new(
                name.clone(),
                &format!("Variable '{}' already defined in this scope.", name.lexeme),
            );
        }
        self.values.insert(name.lexeme.to_string(), val);
        Ok(())
    }

    /// Seeds a native binding; only used while populating the global frame.
    pub fn define_native(&mut self, name: String, val: Value) {
        self.values.insert(name, val);
    }

    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(val) = self.values.get(&*name.lexeme) {
            Ok(val.clone())
        } else if let Some(enclosing) = self.enclosing.as_ref() {
            enclosing.borrow().get(name)
        } else {
            RuntimeError::new(
                name.clone(),
                &format!("Undefined variable '{}'.", name.lexeme),
            )
        }
    }

    /// Mutates the nearest enclosing frame that already defines the name.
    pub fn assign(&mut self, name: &Token, val: Value) -> Result<(), RuntimeError> {
        let id = &*name.lexeme;
        if let Some(value) = self.values.get_mut(id) {
            *value = val;
            Ok(())
        } else if let Some(enclosing) = self.enclosing.as_mut() {
            enclosing.borrow_mut().assign(name, val)?;
            Ok(())
        } else {
            RuntimeError::new(
                name.clone(),
                &format!("Undefined variable '{}'.", name.lexeme),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{Literal, TokenType};
    use std::sync::Arc;

    fn name(id: &str) -> Token {
        Token {
            token_type: TokenType::IDENTIFIER,
            lexeme: Arc::new(id.to_owned()),
            line: 1,
        }
    }

    fn number(n: f64) -> Value {
        Value::Primitive(Literal::Number(n))
    }

    fn as_number(val: Value) -> f64 {
        match val {
            Value::Primitive(Literal::Number(n)) => n,
            other => panic!("expected number, got {}", other),
        }
    }

    #[test]
    fn define_then_get() {
        let env = Environment::new(None);
        env.borrow_mut().define(&name("a"), number(1.0)).unwrap();
        let val = env.borrow().get(&name("a")).unwrap();
        assert_eq!(as_number(val), 1.0);
    }

    #[test]
    fn redefinition_in_same_frame_is_an_error() {
        let env = Environment::new(None);
        env.borrow_mut().define(&name("a"), number(1.0)).unwrap();
        assert!(env.borrow_mut().define(&name("a"), number(2.0)).is_err());
    }

    #[test]
    fn shadowing_in_child_frame_is_allowed() {
        let parent = Environment::new(None);
        parent.borrow_mut().define(&name("a"), number(1.0)).unwrap();
        let child = Environment::new(Some(parent.clone()));
        child.borrow_mut().define(&name("a"), number(2.0)).unwrap();
        assert_eq!(as_number(child.borrow().get(&name("a")).unwrap()), 2.0);
        assert_eq!(as_number(parent.borrow().get(&name("a")).unwrap()), 1.0);
    }

    #[test]
    fn assign_walks_out_to_the_defining_frame() {
        let parent = Environment::new(None);
        parent.borrow_mut().define(&name("a"), number(1.0)).unwrap();
        let child = Environment::new(Some(parent.clone()));
        child.borrow_mut().assign(&name("a"), number(5.0)).unwrap();
        assert_eq!(as_number(parent.borrow().get(&name("a")).unwrap()), 5.0);
    }

    #[test]
    fn undefined_reads_and_assigns_fail() {
        let env = Environment::new(None);
        assert!(env.borrow().get(&name("missing")).is_err());
        assert!(env.borrow_mut().assign(&name("missing"), number(0.0)).is_err());
    }
}
