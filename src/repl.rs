//! Interactive line driver over the core pipeline.
//!
//! Each line is lexed, parsed and evaluated against one long-lived
//! environment, so `let` bindings persist for the whole session. Parse
//! errors are printed one per line and the line is not evaluated.

use std::io::{self, BufRead, Write};

use crate::environment::Environment;
use crate::evaluator;
use crate::lexer::Lexer;
use crate::parser::Parser;

const PROMPT: &str = ">> ";

pub fn start(input: impl BufRead, mut output: impl Write) -> io::Result<()> {
    let env = Environment::new();

    let mut lines = input.lines();
    loop {
        write!(output, "{PROMPT}")?;
        output.flush()?;

        let Some(line) = lines.next() else {
            return Ok(());
        };
        let line = line?;

        let mut parser = Parser::new(Lexer::new(&line));
        let program = parser.parse_program();
        if !parser.errors().is_empty() {
            for error in parser.errors() {
                writeln!(output, "{error}")?;
            }
            continue;
        }

        match evaluator::eval(&program, &env, &mut output) {
            Ok(result) => writeln!(output, "{}", result.inspect())?,
            Err(error) => writeln!(output, "ERROR: {error}")?,
        }
    }
}
