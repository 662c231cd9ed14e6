use ansi_rgb::{green, red, Foreground};
use clap::{arg, command};
use rustyline::error::ReadlineError;
use rustyline::Editor;
use std::fs;

mod ast_printer;
mod diagnostics;
mod environment;
mod expr;
mod function;
mod interpreter;
mod parser;
mod scanner;
mod stdlib;
mod types;

use crate::diagnostics::Diagnostics;
use crate::interpreter::Interpreter;

fn main() {
    let matches = command!()
        .arg(arg!([name] "Optional file name"))
        .arg(arg!(--ast "Print the parsed syntax tree before running"))
        .get_matches();
    let show_ast = matches.is_present("ast");
    if let Some(filename) = matches.value_of("name") {
        run_file(filename, show_ast);
    } else {
        run_prompt(show_ast);
    }
}

fn run_file(filename: &str, show_ast: bool) {
    let contents = match fs::read_to_string(filename) {
        Ok(contents) => contents,
        Err(e) => {
            eprintln!("Could not read {}: {}", filename, e);
            return;
        }
    };
    let mut interpreter = Interpreter::new();
    run(&contents, &mut interpreter, show_ast);
}

fn run(line: &str, interpreter: &mut Interpreter, show_ast: bool) {
    let mut diagnostics = Diagnostics::new();
    let mut scanner = scanner::Scanner::new(line);
    scanner.scan_tokens(&mut diagnostics);
    let statements = {
        let mut parser = parser::Parser::new(scanner.tokens, &mut diagnostics);
        parser.parse()
    };
    diagnostics.flush();
    if show_ast {
        for statement in &statements {
            println!("{}", ast_printer::print_stmt(statement));
        }
    }
    if let Err(e) = interpreter.interpret(&statements) {
        eprintln!("{}", e.fg(red()));
    }
}

fn run_prompt(show_ast: bool) {
    let mut rl = Editor::<()>::new();
    let history_path = "history.txt";
    if rl.load_history(history_path).is_err() {
        println!("No previous history.");
    }
    let mut interpreter = Interpreter::new();
    loop {
        let read_line = rl.readline(&">> ".fg(green()).to_string());
        match read_line {
            Ok(line) => {
                if line.trim() == "exit" {
                    break;
                }
                rl.add_history_entry(line.as_str());
                run(&line, &mut interpreter, show_ast);
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    rl.save_history(history_path).ok();
}
