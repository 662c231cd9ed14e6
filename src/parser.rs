use crate::diagnostics::Diagnostics;
use crate::expr::{Expr, Stmt};
use crate::scanner::{Literal, Token, TokenType, TokenType::*};
use std::rc::Rc;

/// Caps grammar recursion (nested groupings, unary chains, nested blocks)
/// so pathological input becomes a diagnostic instead of exhausting the
/// native stack. This also bounds the depth of any tree handed to the
/// evaluator.
const MAX_NESTING_DEPTH: usize = 64;

/// Recursive-descent parser over the scanner's token stream. Syntax errors
/// become diagnostics and parsing keeps going with placeholder nodes; there
/// is no synchronization to the next statement boundary.
pub struct Parser<'d> {
    tokens: Vec<Token>,
    current: usize,
    depth: usize,
    diagnostics: &'d mut Diagnostics,
}

impl<'d> Parser<'d> {
    pub fn new(tokens: Vec<Token>, diagnostics: &'d mut Diagnostics) -> Self {
        Self {
            tokens,
            current: 0,
            depth: 0,
            diagnostics,
        }
    }

    pub fn parse(&mut self) -> Vec<Stmt> {
        let mut stmts = vec![];
        while !self.is_at_end() {
            stmts.push(self.declaration());
        }
        stmts
    }

    fn declaration(&mut self) -> Stmt {
        if self.too_deep() {
            return Stmt::Expression(Expr::Empty);
        }
        self.depth += 1;
        let stmt = if self.match_(vec![FUN]) {
            self.function_declaration()
        } else if self.match_(vec![VAR]) {
            self.var_declaration()
        } else {
            self.statement()
        };
        self.depth -= 1;
        stmt
    }

    /// Reports and consumes one token once the nesting cap is reached, so
    /// every caller makes progress through the rest of the input.
    fn too_deep(&mut self) -> bool {
        if self.depth < MAX_NESTING_DEPTH {
            return false;
        }
        let token = self.peek().clone();
        self.diagnostics.parse_error(&token, "Nesting too deep.");
        self.advance();
        true
    }

    fn var_declaration(&mut self) -> Stmt {
        let name = self.consume(IDENTIFIER, "Expect variable name.");
        let initializer = if self.match_(vec![EQUAL]) {
            Some(*self.expression())
        } else {
            None
        };
        self.consume(SEMICOLON, "Expect ';' after variable declaration.");
        Stmt::Var { name, initializer }
    }

    fn function_declaration(&mut self) -> Stmt {
        let name = self.consume(IDENTIFIER, "Expect function name.");
        self.consume(LeftParen, "Expect '(' after function name.");
        let mut params = vec![];
        if !self.check(RightParen) {
            loop {
                params.push(self.consume(IDENTIFIER, "Expect parameter name."));
                if !self.match_(vec![COMMA]) {
                    break;
                }
            }
        }
        self.consume(RightParen, "Expect ')' after parameters.");
        self.consume(LeftBrace, "Expect '{' before function body.");
        let body = Rc::new(self.block());
        Stmt::Function { name, params, body }
    }

    fn statement(&mut self) -> Stmt {
        if self.too_deep() {
            return Stmt::Expression(Expr::Empty);
        }
        self.depth += 1;
        let stmt = if self.match_(vec![PRINT]) {
            self.print_statement()
        } else if self.match_(vec![LeftBrace]) {
            self.block()
        } else if self.match_(vec![IF]) {
            self.if_statement()
        } else if self.match_(vec![WHILE]) {
            self.while_statement()
        } else if self.match_(vec![FOR]) {
            self.for_statement()
        } else if self.match_(vec![RETURN]) {
            self.return_statement()
        } else {
            self.expression_statement()
        };
        self.depth -= 1;
        stmt
    }

    fn print_statement(&mut self) -> Stmt {
        let expr = self.expression();
        self.consume(SEMICOLON, "Expect ';' after value.");
        Stmt::Print(*expr)
    }

    fn block(&mut self) -> Stmt {
        let mut statements = vec![];
        while !self.check(RightBrace) && !self.is_at_end() {
            statements.push(self.declaration());
        }
        self.consume(RightBrace, "Expect '}' after block.");
        Stmt::Block { statements }
    }

    fn if_statement(&mut self) -> Stmt {
        self.consume(LeftParen, "Expect '(' after 'if'.");
        let condition = *self.expression();
        self.consume(RightParen, "Expect ')' after if condition.");
        let then_branch = Box::new(self.statement());
        let else_branch = if self.match_(vec![ELSE]) {
            Some(Box::new(self.statement()))
        } else {
            None
        };
        Stmt::If {
            condition,
            then_branch,
            else_branch,
        }
    }

    fn while_statement(&mut self) -> Stmt {
        self.consume(LeftParen, "Expect '(' after 'while'.");
        let condition = *self.expression();
        self.consume(RightParen, "Expect ')' after condition.");
        let body = Box::new(self.statement());
        Stmt::While { condition, body }
    }

    /// Desugars to a while loop: the initializer and the loop go into a
    /// block, the increment becomes the last statement of the loop body and
    /// a missing condition defaults to `true`.
    fn for_statement(&mut self) -> Stmt {
        self.consume(LeftParen, "Expect '(' after 'for'.");
        let initializer = if self.match_(vec![SEMICOLON]) {
            None
        } else if self.match_(vec![VAR]) {
            Some(self.var_declaration())
        } else {
            Some(self.expression_statement())
        };
        let condition = if !self.check(SEMICOLON) {
            Some(*self.expression())
        } else {
            None
        };
        self.consume(SEMICOLON, "Expect ';' after loop condition.");
        let increment = if !self.check(RightParen) {
            Some(*self.expression())
        } else {
            None
        };
        self.consume(RightParen, "Expect ')' after for clauses.");

        let mut body = self.statement();
        if let Some(increment) = increment {
            body = Stmt::Block {
                statements: vec![body, Stmt::Expression(increment)],
            };
        }
        body = Stmt::While {
            condition: condition.unwrap_or(Expr::LiteralNode(Literal::Boolean(true))),
            body: Box::new(body),
        };
        if let Some(initializer) = initializer {
            body = Stmt::Block {
                statements: vec![initializer, body],
            };
        }
        body
    }

    fn return_statement(&mut self) -> Stmt {
        let keyword = self.previous().clone();
        let value = if !self.check(SEMICOLON) {
            Some(*self.expression())
        } else {
            None
        };
        self.consume(SEMICOLON, "Expect ';' after return value.");
        Stmt::Return { keyword, value }
    }

    fn expression_statement(&mut self) -> Stmt {
        let expr = self.expression();
        self.consume(SEMICOLON, "Expect ';' after expression.");
        Stmt::Expression(*expr)
    }

    fn expression(&mut self) -> Box<Expr> {
        if self.too_deep() {
            return Box::new(Expr::Empty);
        }
        self.depth += 1;
        let expr = self.assignment();
        self.depth -= 1;
        expr
    }

    fn assignment(&mut self) -> Box<Expr> {
        let expr = self.or();
        if self.match_(vec![EQUAL]) {
            let equals = self.previous().clone();
            let value = self.expression();
            if let Expr::Variable { name } = *expr {
                return Box::new(Expr::Assign { name, value });
            }
            self.diagnostics
                .parse_error(&equals, "Invalid assignment target.");
            // Best effort: keep the right-hand side as the result node.
            return value;
        }
        expr
    }

    fn or(&mut self) -> Box<Expr> {
        let mut expr = self.and();
        while self.match_(vec![OR]) {
            let operator = self.previous().clone();
            let right = self.and();
            expr = Box::new(Expr::Binary {
                left: expr,
                operator,
                right,
            });
        }
        expr
    }

    fn and(&mut self) -> Box<Expr> {
        let mut expr = self.equality();
        while self.match_(vec![AND]) {
            let operator = self.previous().clone();
            let right = self.equality();
            expr = Box::new(Expr::Binary {
                left: expr,
                operator,
                right,
            });
        }
        expr
    }

    fn equality(&mut self) -> Box<Expr> {
        let mut expr = self.comparison();
        while self.match_(vec![BangEqual, EqualEqual]) {
            let operator = self.previous().clone();
            let right = self.comparison();
            expr = Box::new(Expr::Binary {
                left: expr,
                operator,
                right,
            });
        }
        expr
    }

    fn comparison(&mut self) -> Box<Expr> {
        let mut expr = self.term();

        while self.match_(vec![GREATER, GreaterEqual, LESS, LessEqual]) {
            let operator = self.previous().clone();
            let right = self.term();
            expr = Box::new(Expr::Binary {
                left: expr,
                operator,
                right,
            });
        }
        expr
    }

    fn term(&mut self) -> Box<Expr> {
        let mut expr = self.factor();

        while self.match_(vec![MINUS, PLUS]) {
            let operator = self.previous().clone();
            let right = self.factor();
            expr = Box::new(Expr::Binary {
                left: expr,
                operator,
                right,
            });
        }
        expr
    }

    fn factor(&mut self) -> Box<Expr> {
        let mut expr = self.unary();

        while self.match_(vec![SLASH, STAR]) {
            let operator = self.previous().clone();
            let right = self.unary();
            expr = Box::new(Expr::Binary {
                left: expr,
                operator,
                right,
            });
        }
        expr
    }

    fn unary(&mut self) -> Box<Expr> {
        if self.too_deep() {
            return Box::new(Expr::Empty);
        }
        self.depth += 1;
        let expr = if self.match_(vec![BANG, MINUS]) {
            let operator = self.previous().clone();
            let right = self.unary();
            Box::new(Expr::Unary { operator, right })
        } else {
            self.call()
        };
        self.depth -= 1;
        expr
    }

    fn call(&mut self) -> Box<Expr> {
        let mut expr = self.primary();
        while self.match_(vec![LeftParen]) {
            expr = self.finish_call(expr);
        }
        expr
    }

    fn finish_call(&mut self, callee: Box<Expr>) -> Box<Expr> {
        let mut args = vec![];
        if !self.check(RightParen) {
            loop {
                args.push(*self.expression());
                if !self.match_(vec![COMMA]) {
                    break;
                }
            }
        }
        let paren = self.consume(RightParen, "Expect ')' after arguments.");
        Box::new(Expr::Call {
            callee,
            paren,
            args,
        })
    }

    fn primary(&mut self) -> Box<Expr> {
        let mut paren = false;
        let expr = match &self.peek().token_type {
            FALSE => Expr::LiteralNode(Literal::Boolean(false)),
            TRUE => Expr::LiteralNode(Literal::Boolean(true)),
            NIL => Expr::LiteralNode(Literal::NIL),
            STRING(s) | NUMBER(s) => Expr::LiteralNode(s.clone()),
            IDENTIFIER => Expr::Variable {
                name: self.peek().clone(),
            },
            LeftParen => {
                self.advance();
                let exp = Expr::Grouping(self.expression());
                self.consume(RightParen, "Expect ')' after expression.");
                paren = true;
                exp
            }
            _ => {
                let token = self.peek().clone();
                self.diagnostics.parse_error(&token, "Expect expression.");
                Expr::Empty
            }
        };
        if !paren {
            self.advance();
        }
        Box::new(expr)
    }

    fn match_(&mut self, types: Vec<TokenType>) -> bool {
        for type_ in types {
            if self.check(type_) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn consume(&mut self, type_: TokenType, msg: &str) -> Token {
        if self.check(type_) {
            return self.advance().clone();
        }
        let token = self.peek().clone();
        self.diagnostics.parse_error(&token, msg);
        token
    }

    fn check(&self, type_: TokenType) -> bool {
        if self.is_at_end() {
            false
        } else {
            self.peek().token_type == type_
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        matches!(&self.peek().token_type, EOF)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_printer::print_stmt;
    use crate::scanner::Scanner;

    fn parse(source: &str) -> (Vec<Stmt>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let mut scanner = Scanner::new(source);
        scanner.scan_tokens(&mut diagnostics);
        let stmts = Parser::new(scanner.tokens, &mut diagnostics).parse();
        (stmts, diagnostics)
    }

    fn parse_one(source: &str) -> String {
        let (stmts, diagnostics) = parse(source);
        assert!(diagnostics.is_empty(), "{:?}", diagnostics.records());
        assert_eq!(stmts.len(), 1);
        print_stmt(&stmts[0])
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(parse_one("1 + 2 * 3;"), "(+ 1 (* 2 3));");
    }

    #[test]
    fn comparison_below_term() {
        assert_eq!(parse_one("1 + 2 < 3 - 4;"), "(< (+ 1 2) (- 3 4));");
    }

    #[test]
    fn equality_below_comparison() {
        assert_eq!(parse_one("1 < 2 == true;"), "(== (< 1 2) true);");
    }

    #[test]
    fn logical_operators_lowest() {
        assert_eq!(
            parse_one("a or b and c == d;"),
            "(or a (and b (== c d)));"
        );
    }

    #[test]
    fn unary_is_right_associative() {
        assert_eq!(parse_one("!!x;"), "(! (! x));");
        assert_eq!(parse_one("--1;"), "(- (- 1));");
    }

    #[test]
    fn assignment_is_right_associative() {
        assert_eq!(parse_one("a = b = 1;"), "(= a (= b 1));");
    }

    #[test]
    fn grouping_overrides_precedence() {
        assert_eq!(parse_one("(1 + 2) * 3;"), "(* (group (+ 1 2)) 3);");
    }

    #[test]
    fn calls_chain_left_to_right() {
        assert_eq!(parse_one("f(a)(b);"), "(call (call f a) b);");
    }

    #[test]
    fn var_declaration_with_initializer() {
        assert_eq!(parse_one("var a = 1;"), "(var a 1)");
        assert_eq!(parse_one("var b;"), "(var b)");
    }

    #[test]
    fn function_declaration() {
        assert_eq!(
            parse_one("fun add(a, b) { return a + b; }"),
            "(fun add (a b) { (return (+ a b)) })"
        );
    }

    #[test]
    fn if_with_else() {
        assert_eq!(
            parse_one("if (a) print 1; else print 2;"),
            "(if a (print 1) (print 2))"
        );
    }

    #[test]
    fn for_desugars_to_while() {
        assert_eq!(
            parse_one("for (var i = 0; i < 3; i = i + 1) print i;"),
            "{ (var i 0) (while (< i 3) { (print i) (= i (+ i 1)); }) }"
        );
    }

    #[test]
    fn for_without_clauses_defaults_condition_to_true() {
        assert_eq!(parse_one("for (;;) print 1;"), "(while true (print 1))");
    }

    #[test]
    fn missing_semicolon_is_a_diagnostic_not_a_failure() {
        let (stmts, diagnostics) = parse("print 1");
        assert_eq!(stmts.len(), 1);
        assert_eq!(diagnostics.records().len(), 1);
        assert!(diagnostics.records()[0].msg.contains("Expect ';'"));
    }

    #[test]
    fn missing_expression_yields_placeholder() {
        let (stmts, diagnostics) = parse("1 + ;");
        assert_eq!(stmts.len(), 1);
        assert!(!diagnostics.is_empty());
        assert_eq!(print_stmt(&stmts[0]), "(+ 1 ());");
    }

    #[test]
    fn invalid_assignment_target_keeps_right_hand_side() {
        let (stmts, diagnostics) = parse("1 = 2;");
        assert_eq!(diagnostics.records().len(), 1);
        assert!(diagnostics.records()[0]
            .msg
            .contains("Invalid assignment target."));
        assert_eq!(print_stmt(&stmts[0]), "2;");
    }

    #[test]
    fn parse_always_terminates_on_malformed_input() {
        for source in ["(", ")", "fun", "fun f(", "{ var", "if (x", "= 3;", "f(1,"] {
            let (_, diagnostics) = parse(source);
            assert!(!diagnostics.is_empty(), "no diagnostic for {:?}", source);
        }
    }

    #[test]
    fn deep_grouping_is_a_diagnostic_not_an_abort() {
        let source = format!("print {}1{};", "(".repeat(20_000), ")".repeat(20_000));
        let (_, diagnostics) = parse(&source);
        assert!(diagnostics
            .records()
            .iter()
            .any(|d| d.msg.contains("Nesting too deep.")));
    }

    #[test]
    fn deep_unary_and_block_nesting_terminate() {
        let unary = format!("print {}1;", "!".repeat(10_000));
        let (_, diagnostics) = parse(&unary);
        assert!(diagnostics
            .records()
            .iter()
            .any(|d| d.msg.contains("Nesting too deep.")));

        let blocks = "{".repeat(10_000);
        let (_, diagnostics) = parse(&blocks);
        assert!(!diagnostics.is_empty());
    }

    #[test]
    fn moderate_nesting_parses_cleanly() {
        let source = format!("print {}1{};", "(".repeat(20), ")".repeat(20));
        let (_, diagnostics) = parse(&source);
        assert!(diagnostics.is_empty(), "{:?}", diagnostics.records());
    }
}
