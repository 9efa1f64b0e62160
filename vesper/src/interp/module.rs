//! Module loading
//!
//! `use "path"` resolves `path` against the dynamic variable
//! `$module_path` (a list of base-directory strings, defaulting to the
//! current directory), appending the `.vsp` extension. A module runs once
//! in a fresh scope seeded from the kernel prelude; the scope its last
//! statement sees becomes the module's public face, and the loaded module
//! is cached by its source path, so a diamond of `use`s shares one copy.

use super::error::{InterpResult, RuntimeError};
use super::eval::Interp;
use super::value::{ModuleVal, Value};
use std::path::PathBuf;
use std::rc::Rc;

/// File extension for module sources
pub const MODULE_EXT: &str = "vsp";

impl Interp {
    /// Load a module by search-path-relative name, reusing the cached
    /// copy when this path has been loaded before.
    pub fn load_module(&mut self, path: &str) -> InterpResult<Rc<ModuleVal>> {
        let key = self.interner.intern(path);
        if let Some(module) = self.modules.get(&key) {
            return Ok(Rc::clone(module));
        }

        let file = self.resolve_module_path(path)?;
        let source = std::fs::read_to_string(&file)
            .map_err(|e| RuntimeError::module_not_found(&format!("{path}: {e}")))?;
        let program = crate::parser::parse(&source)
            .map_err(|e| RuntimeError::compile(format!("in module {path}: {}", e.message())))?;

        // The module body may rebind $module_path or introduce its own
        // dynamic variables; none of that survives the load.
        let saved_dynamic = Rc::clone(&self.dynamic);
        let scope = self.seeded_module_scope();
        let result = self.run_stmts(&program.stmts, scope);
        self.dynamic = saved_dynamic;
        let (_, final_scope) = result?;

        let module = Rc::new(ModuleVal {
            name: key,
            scope: final_scope,
        });
        self.modules.insert(key, Rc::clone(&module));
        Ok(module)
    }

    /// Evict any cached copy and load the module fresh from disk
    pub fn reload_module(&mut self, path: &str) -> InterpResult<Rc<ModuleVal>> {
        let key = self.interner.intern(path);
        self.modules.remove(&key);
        self.load_module(path)
    }

    /// Probe `$module_path` entries for `{base}/{path}.vsp`
    fn resolve_module_path(&mut self, path: &str) -> InterpResult<PathBuf> {
        for base in self.module_search_paths() {
            let candidate = PathBuf::from(base).join(format!("{path}.{MODULE_EXT}"));
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        Err(RuntimeError::module_not_found(path))
    }

    /// The current search path: the string entries of `$module_path`,
    /// or `.` when it is unbound or holds anything unusable.
    pub fn module_search_paths(&mut self) -> Vec<String> {
        let sym = self.syms.module_path;
        let mut paths = Vec::new();
        if let Some(Value::List(entries)) = self.dynamic.borrow().get(sym) {
            for entry in entries.borrow().iter() {
                if let Value::Str(s) = entry {
                    paths.push(s.as_str().to_string());
                }
            }
        }
        if paths.is_empty() {
            paths.push(".".to_string());
        }
        paths
    }

    /// Prepend a directory to `$module_path`, as the CLI does for the
    /// directory of the script being run.
    pub fn add_search_path(&mut self, dir: &str) {
        let sym = self.syms.module_path;
        let current = self.dynamic.borrow().get(sym);
        if let Some(Value::List(entries)) = current {
            entries
                .borrow_mut()
                .push_front(Value::str(dir.to_string()));
        } else {
            let list = Value::list(vec![Value::str(dir.to_string())]);
            self.dynamic.borrow_mut().define(sym, list);
        }
    }
}
