use crate::function::Callable;
use crate::interpreter::{Interpreter, RuntimeError, Value};
use crate::scanner::Literal;
use chrono::Local;
use std::rc::Rc;
use std::sync::Arc;

/// `clock()` returns the current wall-clock time as text.
pub struct Clock;

impl Callable for Clock {
    fn arity(&self) -> usize {
        0
    }

    fn call(&self, _: &mut Interpreter, _: &[Value]) -> Result<Value, RuntimeError> {
        let now = Local::now().format("%a %b %e %H:%M:%S %Y").to_string();
        Ok(Value::Primitive(Literal::String(Arc::new(now))))
    }

    fn name(&self) -> String {
        "clock".to_string()
    }
}

/// The native registry seeded into the global frame before user code runs.
pub fn natives() -> Vec<Rc<dyn Callable>> {
    vec![Rc::new(Clock)]
}
