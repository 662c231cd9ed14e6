use crate::scanner::{Literal, Token};
use std::rc::Rc;

#[derive(Clone)]
pub enum Expr {
    /// Placeholder produced at a parse-error site; evaluates to nil.
    Empty,
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Grouping(Box<Expr>),
    LiteralNode(Literal),
    Unary {
        operator: Token,
        right: Box<Expr>,
    },
    Variable {
        name: Token,
    },
    Assign {
        name: Token,
        value: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        paren: Token,
        args: Vec<Expr>,
    },
}

#[derive(Clone)]
pub enum Stmt {
    Expression(Expr),
    Print(Expr),
    Var {
        name: Token,
        initializer: Option<Expr>,
    },
    Block {
        statements: Vec<Stmt>,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    /// The body block is shared between the declaration and every closure
    /// created from it, never copied.
    Function {
        name: Token,
        params: Vec<Token>,
        body: Rc<Stmt>,
    },
    Return {
        keyword: Token,
        value: Option<Expr>,
    },
}
