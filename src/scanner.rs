use crate::diagnostics::Diagnostics;
use phf::phf_map;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use TokenType::*;

static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "and" => AND,
    "class" => CLASS,
    "else" => ELSE,
    "false" => FALSE,
    "for" => FOR,
    "fun" => FUN,
    "if" => IF,
    "nil" => NIL,
    "or" => OR,
    "print" => PRINT,
    "return" => RETURN,
    "super" => SUPER,
    "this" => THIS,
    "true" => TRUE,
    "var" => VAR,
    "while" => WHILE,
};

#[derive(Clone, Debug, PartialEq)]
pub enum TokenType {
    // Single-character tokens.
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    COMMA,
    DOT,
    MINUS,
    PLUS,
    SEMICOLON,
    SLASH,
    STAR,

    // One or two character tokens.
    BANG,
    BangEqual,
    EQUAL,
    EqualEqual,
    GREATER,
    GreaterEqual,
    LESS,
    LessEqual,

    // Literals.
    IDENTIFIER,
    STRING(Literal),
    NUMBER(Literal),

    // Keywords.
    AND,
    CLASS,
    ELSE,
    FALSE,
    FUN,
    FOR,
    IF,
    NIL,
    OR,
    PRINT,
    RETURN,
    SUPER,
    THIS,
    TRUE,
    VAR,
    WHILE,
    EOF,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub(crate) token_type: TokenType,
    pub(crate) lexeme: Arc<String>,
    pub(crate) line: usize,
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.lexeme)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(Arc<String>),
    Number(f64),
    NIL,
    Boolean(bool),
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(ref s) => write!(f, "{}", s),
            Self::Number(s) => write!(f, "{}", s),
            Self::NIL => write!(f, "nil"),
            Self::Boolean(s) => write!(f, "{}", s),
        }
    }
}

pub struct Scanner {
    source: String,
    pub(crate) tokens: Vec<Token>,
    // Byte offsets, always on a char boundary.
    start: usize,
    current: usize,
    line: usize,
}

impl Scanner {
    pub fn new(source: &str) -> Scanner {
        Scanner {
            source: source.to_owned(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        if let Some(ch) = ch {
            self.current += ch.len_utf8();
        }
        ch
    }

    /// Total: bad input becomes a diagnostic and scanning continues. The
    /// stream always ends in an EOF token.
    pub fn scan_tokens(&mut self, diagnostics: &mut Diagnostics) -> &Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token(diagnostics);
        }
        self.tokens.push(Token {
            token_type: EOF,
            lexeme: Arc::new("".to_owned()),
            line: self.line,
        });
        &self.tokens
    }

    fn scan_token(&mut self, diagnostics: &mut Diagnostics) {
        let c = self.advance();
        if let Some(ch) = c {
            let token = match ch {
                '(' => Some(LeftParen),
                ')' => Some(RightParen),
                '{' => Some(LeftBrace),
                '}' => Some(RightBrace),
                ',' => Some(COMMA),
                '.' => Some(DOT),
                '-' => Some(MINUS),
                '+' => Some(PLUS),
                ';' => Some(SEMICOLON),
                '*' => Some(STAR),
                '!' => Some(if self.match_char('=') {
                    BangEqual
                } else {
                    BANG
                }),
                '=' => Some(if self.match_char('=') {
                    EqualEqual
                } else {
                    EQUAL
                }),
                '<' => Some(if self.match_char('=') {
                    LessEqual
                } else {
                    LESS
                }),
                '>' => Some(if self.match_char('=') {
                    GreaterEqual
                } else {
                    GREATER
                }),
                '/' => {
                    if self.match_char('/') {
                        while self.peek().filter(|&x| x != '\n').is_some() && !self.is_at_end() {
                            self.advance();
                        }
                        None
                    } else {
                        Some(SLASH)
                    }
                }
                ' ' | '\r' | '\t' => None,
                '\n' => {
                    self.line += 1;
                    None
                }
                '"' => {
                    self.string(diagnostics);
                    None
                }
                ch => {
                    if ch.is_ascii_digit() {
                        self.number();
                    } else if ch.is_ascii_alphabetic() {
                        self.identifier();
                    } else {
                        diagnostics
                            .scan_error(self.line, &format!("Unexpected character '{}'.", ch));
                    }
                    None
                }
            };
            if let Some(token) = token {
                self.add_token(token);
            }
        }
    }

    fn identifier(&mut self) {
        loop {
            match self.peek() {
                Some(ch) if ch.is_ascii_alphabetic() => {
                    self.advance();
                }
                _ => break,
            }
        }
        let txt = &self.source[self.start..self.current];
        let token_type = KEYWORDS.get(txt).unwrap_or(&IDENTIFIER);
        self.add_token(token_type.clone())
    }

    fn number(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        // A '.' only belongs to the number when a digit follows it.
        match (self.peek(), self.peek_next()) {
            (Some(ch), Some(next)) if ch == '.' && next.is_ascii_digit() => {
                self.advance();
                while let Some(ch) = self.peek() {
                    if !ch.is_ascii_digit() {
                        break;
                    }
                    self.advance();
                }
            }
            _ => {}
        }
        let val: f64 = self.source[self.start..self.current]
            .parse()
            .unwrap_or_default();
        self.add_token(NUMBER(Literal::Number(val)));
    }

    fn string(&mut self, diagnostics: &mut Diagnostics) {
        while let Some(ch) = self.peek() {
            if ch == '"' {
                break;
            }
            if ch == '\n' {
                self.line += 1;
            }
            self.advance();
        }
        if self.is_at_end() {
            diagnostics.scan_error(self.line, "Unterminated string.");
            return;
        }
        self.advance();
        let val = self.source[self.start + 1..self.current - 1].to_owned();
        self.add_token(STRING(Literal::String(Arc::new(val))));
    }

    fn peek(&self) -> Option<char> {
        self.source[self.current..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.source[self.current..].chars();
        chars.next();
        chars.next()
    }

    fn match_char(&mut self, expected_char: char) -> bool {
        match self.peek() {
            Some(c) if c == expected_char => {
                self.advance();
                true
            }
            _ => false,
        }
    }

    fn add_token(&mut self, token_type: TokenType) {
        let lexeme = (&self.source[self.start..self.current]).to_owned();
        self.tokens.push(Token {
            token_type,
            lexeme: Arc::new(lexeme),
            line: self.line,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> (Vec<Token>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let mut scanner = Scanner::new(source);
        scanner.scan_tokens(&mut diagnostics);
        (scanner.tokens, diagnostics)
    }

    #[test]
    fn punctuation_and_operators() {
        let source = "(){},.-+;/* ! != = == > >= < <=";
        let (tokens, diagnostics) = scan(source);
        assert!(diagnostics.is_empty());
        let types: Vec<TokenType> = tokens.into_iter().map(|t| t.token_type).collect();
        assert_eq!(
            types,
            vec![
                LeftParen, RightParen, LeftBrace, RightBrace, COMMA, DOT, MINUS, PLUS, SEMICOLON,
                SLASH, STAR, BANG, BangEqual, EQUAL, EqualEqual, GREATER, GreaterEqual, LESS,
                LessEqual, EOF,
            ]
        );
    }

    #[test]
    fn lexemes_reproduce_source_text() {
        let source = "var fun if ( ) <= != print while";
        let (tokens, _) = scan(source);
        let rendered: Vec<String> = tokens
            .iter()
            .filter(|t| t.token_type != EOF)
            .map(|t| t.lexeme.to_string())
            .collect();
        assert_eq!(rendered.join(" "), source);
    }

    #[test]
    fn keywords_are_classified() {
        let (tokens, _) = scan("and class else false fun for if nil or print return super this true var while");
        assert_eq!(tokens.len(), 17);
        assert!(tokens
            .iter()
            .all(|t| t.token_type != IDENTIFIER));
    }

    #[test]
    fn identifier_stops_at_non_alphabetic() {
        let (tokens, _) = scan("counter1");
        assert_eq!(tokens[0].token_type, IDENTIFIER);
        assert_eq!(&*tokens[0].lexeme, "counter");
        assert!(matches!(tokens[1].token_type, NUMBER(_)));
    }

    #[test]
    fn number_literals() {
        let (tokens, _) = scan("12 3.5 7.");
        assert_eq!(tokens[0].token_type, NUMBER(Literal::Number(12.0)));
        assert_eq!(tokens[1].token_type, NUMBER(Literal::Number(3.5)));
        // No digit after the dot: the dot is its own token.
        assert_eq!(tokens[2].token_type, NUMBER(Literal::Number(7.0)));
        assert_eq!(tokens[3].token_type, DOT);
    }

    #[test]
    fn string_literal_spans_lines() {
        let (tokens, diagnostics) = scan("\"one\ntwo\" x");
        assert!(diagnostics.is_empty());
        assert_eq!(
            tokens[0].token_type,
            STRING(Literal::String(Arc::new("one\ntwo".to_owned())))
        );
        // Identifier after the closing quote carries the updated line.
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn unterminated_string_is_a_diagnostic() {
        let (tokens, diagnostics) = scan("\"oops");
        assert_eq!(diagnostics.records().len(), 1);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token_type, EOF);
    }

    #[test]
    fn unexpected_character_is_skipped() {
        let (tokens, diagnostics) = scan("var @ x;");
        assert_eq!(diagnostics.records().len(), 1);
        let types: Vec<TokenType> = tokens.into_iter().map(|t| t.token_type).collect();
        assert_eq!(types, vec![VAR, IDENTIFIER, SEMICOLON, EOF]);
    }

    #[test]
    fn non_ascii_string_contents_survive() {
        let (tokens, diagnostics) = scan("print \"héllo wörld\";");
        assert!(diagnostics.is_empty());
        assert_eq!(
            tokens[1].token_type,
            STRING(Literal::String(Arc::new("héllo wörld".to_owned())))
        );
        assert_eq!(&*tokens[1].lexeme, "\"héllo wörld\"");
    }

    #[test]
    fn non_ascii_outside_strings_is_a_diagnostic_not_a_panic() {
        // 'caf' scans as an identifier, 'é' is reported and skipped.
        let (tokens, diagnostics) = scan("var café = 1;");
        assert_eq!(diagnostics.records().len(), 1);
        let types: Vec<TokenType> = tokens.into_iter().map(|t| t.token_type).collect();
        assert_eq!(
            types,
            vec![
                VAR,
                IDENTIFIER,
                EQUAL,
                NUMBER(Literal::Number(1.0)),
                SEMICOLON,
                EOF,
            ]
        );
    }

    #[test]
    fn non_ascii_comments_are_discarded() {
        let (tokens, diagnostics) = scan("// naïve café note\n1;");
        assert!(diagnostics.is_empty());
        assert_eq!(tokens[0].token_type, NUMBER(Literal::Number(1.0)));
    }

    #[test]
    fn large_input_scans_completely() {
        let source = "1 + 2;\n".repeat(30_000);
        let (tokens, diagnostics) = scan(&source);
        assert!(diagnostics.is_empty());
        assert_eq!(tokens.len(), 30_000 * 4 + 1);
    }

    #[test]
    fn line_comments_are_discarded() {
        let (tokens, _) = scan("1; // trailing comment\n2;");
        let types: Vec<TokenType> = tokens.into_iter().map(|t| t.token_type).collect();
        assert_eq!(
            types,
            vec![
                NUMBER(Literal::Number(1.0)),
                SEMICOLON,
                NUMBER(Literal::Number(2.0)),
                SEMICOLON,
                EOF,
            ]
        );
    }

    #[test]
    fn line_numbers_are_one_based() {
        let (tokens, _) = scan("a\nb\nc");
        let lines: Vec<usize> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 2, 3, 3]);
    }
}
