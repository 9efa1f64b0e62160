//! Interactive read-eval-print loop
//!
//! The session threads one scope chain across inputs, so a `let` or `fn`
//! entered on one line is visible on the next, exactly as consecutive
//! statements in a script body would be.

use crate::interp::{boot, Interp, ScopeRef};
use crate::parser::parse;
use crate::stdlib;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::path::PathBuf;
use std::rc::Rc;

const PROMPT: &str = "> ";
const HISTORY_FILE: &str = ".vesper_history";

/// REPL state
pub struct Repl {
    editor: DefaultEditor,
    interp: Interp,
    scope: ScopeRef,
    history_path: Option<PathBuf>,
}

impl Repl {
    pub fn new() -> RlResult<Self> {
        let editor = DefaultEditor::new()?;
        let mut interp = boot();
        stdlib::install(&mut interp);
        let scope = interp.toplevel_scope();

        let history_path = dirs_home().map(|h| h.join(HISTORY_FILE));

        let mut repl = Repl {
            editor,
            interp,
            scope,
            history_path,
        };

        if let Some(ref path) = repl.history_path {
            let _ = repl.editor.load_history(path);
        }

        Ok(repl)
    }

    /// Run the REPL until `:quit` or end of input
    pub fn run(&mut self) -> RlResult<()> {
        println!("Vesper REPL");
        println!("Type :help for help, :quit to exit.\n");

        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();

                    if line.is_empty() {
                        continue;
                    }

                    let _ = self.editor.add_history_entry(line);

                    if line.starts_with(':') {
                        if self.handle_command(line) {
                            break;
                        }
                        continue;
                    }

                    self.eval_input(line);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Goodbye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {err}");
                    break;
                }
            }
        }

        if let Some(ref path) = self.history_path {
            let _ = self.editor.save_history(path);
        }

        Ok(())
    }

    /// Handle commands starting with `:`; returns true to exit
    fn handle_command(&mut self, cmd: &str) -> bool {
        match cmd {
            ":quit" | ":q" | ":exit" => {
                println!("Goodbye!");
                true
            }
            ":help" | ":h" | ":?" => {
                self.print_help();
                false
            }
            ":reset" => {
                self.interp = boot();
                stdlib::install(&mut self.interp);
                self.scope = self.interp.toplevel_scope();
                println!("Session reset.");
                false
            }
            ":clear" => {
                print!("\x1B[2J\x1B[1;1H");
                false
            }
            _ => {
                println!("Unknown command: {cmd}");
                println!("Type :help for help.");
                false
            }
        }
    }

    fn print_help(&self) {
        println!("Vesper REPL Commands:");
        println!("  :help, :h, :?   Show this help");
        println!("  :quit, :q       Exit the REPL");
        println!("  :reset          Discard all session bindings");
        println!("  :clear          Clear the screen");
        println!();
        println!("You can enter:");
        println!("  - Expressions: 1 + 2, [1, 2].len()");
        println!("  - Bindings: let x = 3, fn double(n) {{ n * 2 }}");
        println!("  - Declarations: struct Point {{ x, y }}, use \"lib/math\"");
    }

    fn eval_input(&mut self, input: &str) {
        let program = match parse(input) {
            Ok(program) => program,
            Err(err) => {
                crate::error::report_error("<repl>", input, &err);
                return;
            }
        };

        let scope = Rc::clone(&self.scope);
        match self.interp.run_stmts(&program.stmts, scope) {
            Ok((value, scope)) => {
                // bindings introduced by this line stay live
                self.scope = scope;
                match self.interp.show(&value) {
                    Ok(text) => println!("{text}"),
                    Err(err) => eprintln!("Runtime error: {}", err.message),
                }
            }
            Err(err) => {
                eprintln!("Runtime error: {}", err.message);
            }
        }
    }
}

fn dirs_home() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::Value;

    #[test]
    fn test_dirs_home_returns_some() {
        let home = dirs_home();
        assert!(home.is_some());
    }

    #[test]
    fn test_session_scope_persists_bindings() {
        let mut interp = boot();
        let scope = interp.toplevel_scope();
        let program = parse("let x = 41").expect("parse");
        let (_, scope) = interp
            .run_stmts(&program.stmts, scope)
            .expect("first line runs");
        let program = parse("x + 1").expect("parse");
        let (value, _) = interp
            .run_stmts(&program.stmts, scope)
            .expect("second line sees x");
        assert!(matches!(value, Value::Int(42)));
    }
}
