use std::fs;
use std::io::{self, IsTerminal, Read, Write};

use anyhow::{Context, Result, bail};
use monkey::environment::Environment;
use monkey::object::Object;
use monkey::{evaluator, parser, repl};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let input_path = args.next();
    if args.next().is_some() {
        bail!("Only one input file is supported");
    }

    let source = match &input_path {
        Some(path) => fs::read_to_string(path).with_context(|| format!("Reading {path}"))?,
        None => {
            let stdin = io::stdin();
            if stdin.is_terminal() {
                return repl::start(stdin.lock(), io::stdout().lock()).context("Running REPL");
            }
            let mut buffer = String::new();
            stdin
                .lock()
                .read_to_string(&mut buffer)
                .context("Reading stdin")?;
            buffer
        }
    };

    run_source(&source)
}

fn run_source(source: &str) -> Result<()> {
    let program = match parser::parse(source) {
        Ok(program) => program,
        Err(errors) => {
            for error in &errors {
                eprintln!("{error}");
            }
            bail!("{} parse error(s)", errors.len());
        }
    };

    let env = Environment::new();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match evaluator::eval(&program, &env, &mut out) {
        Ok(result) => {
            if result != Object::Null {
                writeln!(out, "{}", result.inspect())?;
            }
            Ok(())
        }
        Err(error) => bail!("ERROR: {error}"),
    }
}
