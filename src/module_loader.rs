use std::path::{Path, PathBuf};
use std::rc::Rc;

use hashbrown::HashSet;
use log::debug;

use crate::bytecode::chunk::Chunk;
use crate::compiler::Compiler;
use crate::errors::ErrorReport;
use crate::lexer::morphology::Dictionary;
use crate::parser::Parser;
use crate::semantic::SemanticAnalyzer;

/// Loads 가져오기 (import) targets: reads the module file, runs the full
/// front-end pipeline, and hands the compiled chunk back to the VM for
/// execution in the shared global environment. All I/O happens between VM
/// dispatches, never during one.
pub struct ModuleLoader {
   /// Canonical paths that have already been executed. Importing a module
   /// twice is a no-op.
   executed: HashSet<PathBuf>,
}

impl ModuleLoader {
   pub fn new() -> ModuleLoader {
      ModuleLoader {
         executed: HashSet::new(),
      }
   }

   /// Resolves and compiles a module.
   ///
   /// # Returns
   /// - `Ok(Some(chunk))`: The module's chunk, to be executed once.
   /// - `Ok(None)`: The module was already executed.
   /// - `Err(String)`: The module could not be read or compiled.
   pub fn load(&mut self, path: &str, dictionary: &Dictionary) -> Result<Option<Rc<Chunk>>, String> {
      let resolved = resolve_path(path);
      let canonical = resolved
         .canonicalize()
         .map_err(|e| format!("Cannot open module '{}': {}.", path, e))?;

      if self.executed.contains(&canonical) {
         return Ok(None);
      }

      let source = std::fs::read_to_string(&canonical)
         .map_err(|e| format!("Cannot read module '{}': {}.", path, e))?;

      debug!("loading module {}", canonical.display());

      let module = Parser::parse(&source, dictionary).map_err(|e| first_error(path, &e))?;
      SemanticAnalyzer::analyze(&module, dictionary).map_err(|e| first_error(path, &e))?;
      let chunk = Compiler::compile(&module).map_err(|e| first_error(path, &e))?;

      self.executed.insert(canonical);
      Ok(Some(chunk))
   }
}

impl Default for ModuleLoader {
   fn default() -> Self {
      ModuleLoader::new()
   }
}

/// Appends the conventional extension when the import path has none.
fn resolve_path(path: &str) -> PathBuf {
   let p = Path::new(path);
   if p.extension().is_none() {
      PathBuf::from(format!("{}.ksj", path))
   } else {
      p.to_path_buf()
   }
}

fn first_error(path: &str, errors: &[ErrorReport]) -> String {
   match errors.first() {
      Some(e) => format!("Module '{}' at {}:{}: {}: {}", path, e.line, e.column, e.kind, e.message),
      None => format!("Module '{}' failed to compile.", path),
   }
}
