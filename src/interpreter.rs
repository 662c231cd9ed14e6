use crate::environment::Environment;
use crate::expr::{Expr, Stmt};
use crate::function::{Callable, Function};
use crate::scanner::{Literal, Token, TokenType};
use crate::stdlib;
use crate::types::Shared;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{self, Write};
use std::rc::Rc;
use std::sync::Arc;

/// Language-level recursion guard; exceeding it is a distinct runtime
/// error rather than a process abort.
const MAX_CALL_DEPTH: usize = 128;

#[derive(Clone)]
pub enum Value {
    Primitive(Literal),
    Function(Rc<dyn Callable>),
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primitive(l) => write!(f, "{}", l),
            Self::Function(func) => write!(f, "{}", func),
        }
    }
}

#[derive(Debug)]
pub struct RuntimeError {
    token: Token,
    msg: String,
}

impl RuntimeError {
    pub fn new<T>(token: Token, msg: &str) -> Result<T, Self> {
        Err(Self {
            token,
            msg: msg.to_string(),
        })
    }
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[line {}] Runtime error: {}", self.token.line, self.msg)
    }
}

impl Error for RuntimeError {}

/// Non-local control transfer, threaded back through every statement
/// evaluation instead of being thrown.
pub enum Signal {
    Return { keyword: Token, value: Value },
}

pub struct Interpreter {
    pub environment: Shared<Environment>,
    pub globals: Shared<Environment>,
    out: Box<dyn Write>,
    depth: usize,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Program `print` output goes to `out`; diagnostics and runtime errors
    /// stay on stderr so the two channels remain distinguishable.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        let globals = Environment::new(None);
        for native in stdlib::natives() {
            let name = native.name();
            globals
                .borrow_mut()
                .define_native(name, Value::Function(native));
        }
        let environment = Environment::new(Some(globals.clone()));
        Self {
            environment,
            globals,
            out,
            depth: 0,
        }
    }

    /// Runs top-level statements in order. A return signal escaping the
    /// outermost call boundary is a reported error, not a silent no-op.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        if let Some(Signal::Return { keyword, .. }) = self.interpret_stmts(statements)? {
            return RuntimeError::new(keyword, "Can't return from top-level code.");
        }
        Ok(())
    }

    pub fn visit(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        let res = match expr {
            Expr::Empty => Value::Primitive(Literal::NIL),
            Expr::LiteralNode(literal) => Value::Primitive(literal.clone()),
            Expr::Grouping(expr) => self.visit(expr)?,
            Expr::Unary { operator, right } => {
                let right_val = self.visit(right)?;
                match &operator.token_type {
                    TokenType::BANG => Value::Primitive(Literal::Boolean(!is_truthy(&right_val))),
                    // Non-coercible operands degrade to nil, they do not
                    // raise.
                    TokenType::MINUS => match coerce_number(&right_val) {
                        Some(num) => Value::Primitive(Literal::Number(-num)),
                        None => Value::Primitive(Literal::NIL),
                    },
                    _ => RuntimeError::new(operator.clone(), "Invalid unary operator.")?,
                }
            }
            Expr::Binary {
                left,
                right,
                operator,
            } => self.visit_binary(left, operator, right)?,
            Expr::Variable { name } => self.environment.borrow().get(name)?,
            Expr::Assign { name, value } => {
                let val = self.visit(value)?;
                self.environment.borrow_mut().assign(name, val.clone())?;
                val
            }
            Expr::Call {
                callee,
                args,
                paren,
            } => {
                let callee = self.visit(callee)?;
                let token = Token {
                    token_type: TokenType::IDENTIFIER,
                    lexeme: Arc::new(callee.to_string()),
                    line: paren.line,
                };
                // Arguments evaluate left to right before any callable or
                // arity check, so their side effects happen even when the
                // call itself is rejected.
                let mut arguments = vec![];
                for arg in args {
                    arguments.push(self.visit(arg)?);
                }
                let func = if let Value::Function(callee) = callee {
                    callee
                } else {
                    RuntimeError::new(token.clone(), "Can only call functions.")?
                };

                if func.arity() != arguments.len() {
                    RuntimeError::new(
                        token.clone(),
                        &format!(
                            "Expected {} arguments but got {}.",
                            func.arity(),
                            arguments.len()
                        ),
                    )?
                }
                if self.depth >= MAX_CALL_DEPTH {
                    RuntimeError::new(token, "Stack overflow.")?
                }
                self.depth += 1;
                let res = func.call(self, &arguments);
                self.depth -= 1;
                res?
            }
        };
        Ok(res)
    }

    fn visit_binary(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<Value, RuntimeError> {
        let token_type = &operator.token_type;
        let res = match token_type {
            // Equality is structural and must see nil operands, so it is
            // handled before the nil-degradation rule below.
            TokenType::EqualEqual | TokenType::BangEqual => {
                let left = self.visit(left)?;
                let right = self.visit(right)?;
                let eq = is_equal([left, right]);
                let res = match token_type {
                    TokenType::EqualEqual => eq,
                    _ => !eq,
                };
                Value::Primitive(Literal::Boolean(res))
            }
            // and/or short-circuit the right operand but always yield the
            // truthiness combination as a boolean.
            TokenType::AND => {
                let left = self.visit(left)?;
                let res = if !is_truthy(&left) {
                    false
                } else {
                    is_truthy(&self.visit(right)?)
                };
                Value::Primitive(Literal::Boolean(res))
            }
            TokenType::OR => {
                let left = self.visit(left)?;
                let res = if is_truthy(&left) {
                    true
                } else {
                    is_truthy(&self.visit(right)?)
                };
                Value::Primitive(Literal::Boolean(res))
            }
            _ => {
                let left = self.visit(left)?;
                let right = self.visit(right)?;
                // A nil operand degrades the whole operation to nil.
                if is_nil(&left) || is_nil(&right) {
                    return Ok(Value::Primitive(Literal::NIL));
                }
                match [left, right] {
                    [Value::Primitive(Literal::Number(left_val)), Value::Primitive(Literal::Number(right_val))] =>
                    {
                        let res = match token_type {
                            TokenType::MINUS => Ok(Literal::Number(left_val - right_val)),
                            TokenType::SLASH => Ok(Literal::Number(left_val / right_val)),
                            TokenType::STAR => Ok(Literal::Number(left_val * right_val)),
                            TokenType::PLUS => Ok(Literal::Number(left_val + right_val)),
                            TokenType::GREATER => Ok(Literal::Boolean(left_val > right_val)),
                            TokenType::LESS => Ok(Literal::Boolean(left_val < right_val)),
                            TokenType::LessEqual => Ok(Literal::Boolean(left_val <= right_val)),
                            TokenType::GreaterEqual => Ok(Literal::Boolean(left_val >= right_val)),
                            _ => RuntimeError::new(
                                operator.clone(),
                                "Unsupported binary operator for Number.",
                            ),
                        };
                        res.map(Value::Primitive)?
                    }
                    [Value::Primitive(Literal::String(sl)), Value::Primitive(Literal::String(sr))] => {
                        let res = match token_type {
                            TokenType::PLUS => Literal::String(Arc::new(sl.to_string() + &*sr)),
                            TokenType::GREATER => Literal::Boolean(sl > sr),
                            TokenType::LESS => Literal::Boolean(sl < sr),
                            TokenType::GreaterEqual => Literal::Boolean(sl >= sr),
                            TokenType::LessEqual => Literal::Boolean(sl <= sr),
                            _ => RuntimeError::new(
                                operator.clone(),
                                "Unsupported binary operator for String.",
                            )?,
                        };
                        Value::Primitive(res)
                    }
                    _ => RuntimeError::new(operator.clone(), "Unsupported operand types.")?,
                }
            }
        };
        Ok(res)
    }

    pub fn interpret_stmts(&mut self, statements: &[Stmt]) -> Result<Option<Signal>, RuntimeError> {
        for statement in statements {
            let res = self.interpret_stmt(statement)?;
            if res.is_some() {
                return Ok(res);
            }
        }
        Ok(None)
    }

    pub fn interpret_stmt(&mut self, statement: &Stmt) -> Result<Option<Signal>, RuntimeError> {
        match statement {
            Stmt::Expression(expr) => {
                let _ = self.visit(expr)?;
            }
            Stmt::Print(expr) => {
                let val = self.visit(expr)?;
                let _ = writeln!(self.out, "{}", val);
            }
            Stmt::Var { name, initializer } => {
                let value = if let Some(init) = initializer {
                    self.visit(init)?
                } else {
                    Value::Primitive(Literal::NIL)
                };
                self.environment.borrow_mut().define(name, value)?;
            }
            Stmt::Block { statements } => {
                let res = self.execute_block(statements, self.environment.clone())?;
                if res.is_some() {
                    return Ok(res);
                }
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let val = self.visit(condition)?;
                let res = if is_truthy(&val) {
                    self.interpret_stmt(then_branch)?
                } else if let Some(else_statement) = else_branch {
                    self.interpret_stmt(else_statement)?
                } else {
                    None
                };
                if res.is_some() {
                    return Ok(res);
                }
            }
            Stmt::While { condition, body } => {
                while is_truthy(&self.visit(condition)?) {
                    let res = self.interpret_stmt(body)?;
                    if res.is_some() {
                        return Ok(res);
                    }
                }
            }
            Stmt::Function { name, params, body } => {
                let func = Function::new(name, params, body, self.environment.clone());
                self.environment
                    .borrow_mut()
                    .define(name, Value::Function(func))?;
            }
            Stmt::Return { keyword, value } => {
                let value = if let Some(expr) = value {
                    self.visit(expr)?
                } else {
                    Value::Primitive(Literal::NIL)
                };
                return Ok(Some(Signal::Return {
                    keyword: keyword.clone(),
                    value,
                }));
            }
        }
        Ok(None)
    }

    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        previous: Shared<Environment>,
    ) -> Result<Option<Signal>, RuntimeError> {
        let env = Environment::new(Some(previous.clone()));
        self.environment = env;
        let res = self.interpret_stmts(statements);
        self.environment = previous;
        res
    }
}

fn is_truthy(val: &Value) -> bool {
    match val {
        Value::Primitive(l) => !matches!(l, Literal::NIL | Literal::Boolean(false)),
        _ => true,
    }
}

fn is_nil(val: &Value) -> bool {
    matches!(val, Value::Primitive(Literal::NIL))
}

fn coerce_number(val: &Value) -> Option<f64> {
    match val {
        Value::Primitive(Literal::Number(num)) => Some(*num),
        Value::Primitive(Literal::String(s)) => s.trim().parse().ok(),
        Value::Primitive(Literal::Boolean(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn is_equal([left_val, right_val]: [Value; 2]) -> bool {
    match [left_val, right_val] {
        [Value::Primitive(left_val), Value::Primitive(right_val)] => {
            match [left_val, right_val] {
                [Literal::Number(l), Literal::Number(r)] => l == r,
                [Literal::Boolean(l), Literal::Boolean(r)] => l == r,
                [Literal::String(l), Literal::String(r)] => l == r,
                [Literal::NIL, Literal::NIL] => true,
                _ => false,
            }
        }
        [Value::Function(l), Value::Function(r)] => Rc::ptr_eq(&l, &r),
        _ => false,
    }
}
