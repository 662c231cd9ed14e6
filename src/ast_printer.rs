use crate::expr::{Expr, Stmt};
use crate::scanner::Literal;

pub fn print_expr(expr: &Expr) -> String {
    match expr {
        Expr::Empty => "()".to_string(),
        Expr::Binary {
            left,
            operator,
            right,
        } => {
            format!("({} {} {})", operator, print_expr(left), print_expr(right))
        }
        Expr::Grouping(expression) => {
            format!("(group {})", print_expr(expression))
        }
        Expr::LiteralNode(Literal::String(s)) => {
            format!("\"{}\"", s)
        }
        Expr::LiteralNode(val) => {
            format!("{}", val)
        }
        Expr::Unary { operator, right } => {
            format!("({} {})", operator, print_expr(right))
        }
        Expr::Variable { name } => name.to_string(),
        Expr::Assign { name, value } => {
            format!("(= {} {})", name, print_expr(value))
        }
        Expr::Call { callee, args, .. } => {
            if args.is_empty() {
                format!("(call {})", print_expr(callee))
            } else {
                let args: Vec<String> = args.iter().map(print_expr).collect();
                format!("(call {} {})", print_expr(callee), args.join(" "))
            }
        }
    }
}

pub fn print_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Expression(expr) => format!("{};", print_expr(expr)),
        Stmt::Print(expr) => format!("(print {})", print_expr(expr)),
        Stmt::Var {
            name,
            initializer: Some(init),
        } => format!("(var {} {})", name, print_expr(init)),
        Stmt::Var {
            name,
            initializer: None,
        } => format!("(var {})", name),
        Stmt::Block { statements } => {
            let inner: Vec<String> = statements.iter().map(print_stmt).collect();
            format!("{{ {} }}", inner.join(" "))
        }
        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let mut out = format!("(if {} {}", print_expr(condition), print_stmt(then_branch));
            if let Some(else_branch) = else_branch {
                out.push_str(&format!(" {}", print_stmt(else_branch)));
            }
            out.push(')');
            out
        }
        Stmt::While { condition, body } => {
            format!("(while {} {})", print_expr(condition), print_stmt(body))
        }
        Stmt::Function { name, params, body } => {
            let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
            format!("(fun {} ({}) {})", name, params.join(" "), print_stmt(body))
        }
        Stmt::Return { value: Some(v), .. } => format!("(return {})", print_expr(v)),
        Stmt::Return { value: None, .. } => "(return)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{Token, TokenType};
    use std::sync::Arc;

    fn token(token_type: TokenType, lexeme: &str) -> Token {
        Token {
            token_type,
            lexeme: Arc::new(lexeme.to_owned()),
            line: 1,
        }
    }

    #[test]
    fn prints_nested_expression() {
        let expr = Expr::Binary {
            left: Box::new(Expr::Unary {
                operator: token(TokenType::MINUS, "-"),
                right: Box::new(Expr::LiteralNode(Literal::Number(123f64))),
            }),
            operator: token(TokenType::STAR, "*"),
            right: Box::new(Expr::Grouping(Box::new(Expr::LiteralNode(
                Literal::Number(45.67),
            )))),
        };
        assert_eq!(print_expr(&expr), "(* (- 123) (group 45.67))");
    }

    #[test]
    fn printing_is_idempotent() {
        let stmt = Stmt::Print(Expr::Binary {
            left: Box::new(Expr::Variable {
                name: token(TokenType::IDENTIFIER, "a"),
            }),
            operator: token(TokenType::PLUS, "+"),
            right: Box::new(Expr::LiteralNode(Literal::String(Arc::new(
                "suffix".to_owned(),
            )))),
        });
        let first = print_stmt(&stmt);
        let second = print_stmt(&stmt);
        assert_eq!(first, second);
        assert_eq!(first, "(print (+ a \"suffix\"))");
    }

    #[test]
    fn error_placeholder_prints_as_empty() {
        assert_eq!(print_expr(&Expr::Empty), "()");
    }
}
