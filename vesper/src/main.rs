//! Vesper CLI

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use vesper::interp::boot;
use vesper::repl::Repl;

#[derive(Parser)]
#[command(name = "vesper", version, about = "Vesper - a message-passing scripting language")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Script to run when no subcommand is given
    file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a Vesper script
    Run {
        /// Source file to run
        file: PathBuf,
    },
    /// Start an interactive session
    Repl,
    /// Parse and dump the AST as JSON (debug)
    Parse {
        /// Source file to parse
        file: PathBuf,
    },
    /// Tokenize and dump tokens (debug)
    Tokens {
        /// Source file to tokenize
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match (cli.command, cli.file) {
        (Some(Command::Run { file }), _) => run_file(&file),
        (Some(Command::Repl), _) => run_repl(),
        (Some(Command::Parse { file }), _) => parse_file(&file),
        (Some(Command::Tokens { file }), _) => tokenize_file(&file),
        (None, Some(file)) => run_file(&file),
        (None, None) => run_repl(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();

    let program = match vesper::parser::parse(&source) {
        Ok(program) => program,
        Err(err) => {
            vesper::error::report_error(&filename, &source, &err);
            std::process::exit(1);
        }
    };

    let mut interp = boot();
    vesper::stdlib::install(&mut interp);
    // modules resolve relative to the script first
    if let Some(dir) = path.parent() {
        let dir = dir.display().to_string();
        if !dir.is_empty() {
            interp.add_search_path(&dir);
        }
    }

    let toplevel = interp.toplevel_scope();
    if let Err(err) = interp.run_stmts(&program.stmts, toplevel) {
        eprintln!("Runtime error: {}", err.message);
        std::process::exit(1);
    }

    Ok(())
}

fn run_repl() -> Result<(), Box<dyn std::error::Error>> {
    let mut repl = Repl::new()?;
    repl.run()?;
    Ok(())
}

fn parse_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();

    match vesper::parser::parse(&source) {
        Ok(program) => {
            println!("{}", serde_json::to_string_pretty(&program)?);
            Ok(())
        }
        Err(err) => {
            vesper::error::report_error(&filename, &source, &err);
            std::process::exit(1);
        }
    }
}

fn tokenize_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;

    match vesper::lexer::tokenize(&source) {
        Ok(tokens) => {
            for (tok, span) in &tokens {
                println!("{:?} @ {}..{}", tok, span.start, span.end);
            }
            Ok(())
        }
        Err(err) => {
            vesper::error::report_error(&path.display().to_string(), &source, &err);
            std::process::exit(1);
        }
    }
}
