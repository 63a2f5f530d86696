//! `exprc`: a thin command-line front end over `passerine_expr`.
//!
//! Reads an expression from argv (or stdin, if no argument is given),
//! compiles it, and either prints the evaluated result or a diagnostic
//! pointing at the byte column the compiler gave up at. This is the Rust
//! equivalent of the "example programs" spec.md §1 waves off as external
//! collaborators: every teacher crate in this corpus ships one.

use std::io::{self, Read};
use std::process::ExitCode;

use clap::Parser;
use passerine_expr::{create_with_diagnostics, eval, Env, FunctionTable};

#[derive(Parser)]
#[command(name = "exprc", about = "Compile and evaluate an arithmetic expression")]
struct Args {
    /// The expression to evaluate. Reads stdin if omitted.
    expression: Option<String>,
}

fn read_expression(args: Args) -> io::Result<String> {
    match args.expression {
        Some(text) => Ok(text),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let text = match read_expression(args) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("exprc: could not read expression: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut env = Env::new();
    let funcs = FunctionTable::new();

    match create_with_diagnostics(&text, &mut env, &funcs) {
        Ok(expr) => {
            println!("{}", eval(&expr, &env));
            ExitCode::SUCCESS
        }
        Err(syntax) => {
            eprintln!("{text}");
            eprintln!("{}^ {}", " ".repeat(syntax.near()), syntax.kind());
            ExitCode::FAILURE
        }
    }
}
