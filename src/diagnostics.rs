use crate::scanner::{Token, TokenType};
use ansi_rgb::{red, Foreground};
use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq)]
pub enum Stage {
    Scan,
    Parse,
}

/// A single scan or parse problem. Scanning and parsing never fail outright;
/// they record one of these and keep going.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub stage: Stage,
    pub line: usize,
    pub msg: String,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let stage = match self.stage {
            Stage::Scan => "Syntax error",
            Stage::Parse => "Parse error",
        };
        write!(f, "[line {}] {}: {}", self.line, stage, self.msg)
    }
}

/// Collects diagnostics from the scanner and parser instead of writing to a
/// global channel. The driver flushes the records to stderr after parsing.
#[derive(Default)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scan_error(&mut self, line: usize, msg: &str) {
        self.records.push(Diagnostic {
            stage: Stage::Scan,
            line,
            msg: msg.to_string(),
        });
    }

    pub fn parse_error(&mut self, token: &Token, msg: &str) {
        let location = if token.token_type == TokenType::EOF {
            "at end".to_string()
        } else {
            format!("at '{}'", token.lexeme)
        };
        self.records.push(Diagnostic {
            stage: Stage::Parse,
            line: token.line,
            msg: format!("{} {}", location, msg),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    pub fn flush(&mut self) {
        for record in self.records.drain(..) {
            eprintln!("{}", record.fg(red()));
        }
    }
}
