use crate::environment::Environment;
use crate::expr::Stmt;
use crate::interpreter::{Interpreter, RuntimeError, Signal, Value};
use crate::scanner::{Literal, Token};
use crate::types::Shared;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Anything invokable: native standard-library bindings and user-declared
/// functions share this contract.
pub trait Callable {
    fn arity(&self) -> usize;
    fn call(&self, interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError>;
    fn name(&self) -> String;
}

impl Display for dyn Callable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

/// A user-declared function: parameter list, shared body block, and the
/// environment that was active at the declaration site.
pub struct Function {
    name: Token,
    params: Vec<Token>,
    body: Rc<Stmt>,
    closure: Shared<Environment>,
}

impl Function {
    pub fn new(
        name: &Token,
        params: &[Token],
        body: &Rc<Stmt>,
        closure: Shared<Environment>,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.clone(),
            params: params.to_vec(),
            body: Rc::clone(body),
            closure,
        })
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Callable for Function {
    fn arity(&self) -> usize {
        self.params.len()
    }

    fn call(&self, interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
        let old_env = interpreter.environment.clone();
        let environment = Environment::new(Some(self.closure.clone()));
        {
            let mut frame = environment.borrow_mut();
            for (param, arg) in self.params.iter().zip(args) {
                frame.define(param, arg.clone())?;
            }
        }
        interpreter.environment = environment;
        let res = interpreter.interpret_stmt(&self.body);
        interpreter.environment = old_env;
        // The return signal is caught exactly here; falling off the end
        // yields nil.
        match res? {
            Some(Signal::Return { value, .. }) => Ok(value),
            _ => Ok(Value::Primitive(Literal::NIL)),
        }
    }

    fn name(&self) -> String {
        self.name.to_string()
    }
}
