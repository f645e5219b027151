use std::rc::Rc;

use crate::compiler::Compiler;
use crate::errors::{report_errors_list, report_runtime_error};
use crate::lexer::morphology::Dictionary;
use crate::objects::Value;
use crate::parser::Parser;
use crate::semantic::SemanticAnalyzer;
use crate::virtual_machine::VM;

/// The kinds of outcomes an interpretation can have.
pub enum InterpretResult {
   Ok(Value),
   ParseError,
   SemanticError,
   CompileError,
   RuntimeError,
}

impl InterpretResult {
   pub fn is_ok(&self) -> bool {
      matches!(self, InterpretResult::Ok(_))
   }
}

/// One interpreter instance: the dictionary, the VM, and its persistent
/// global environment. The REPL reuses a single instance across inputs;
/// file mode uses a fresh one per file.
pub struct Interpreter {
   dictionary: Rc<Dictionary>,
   pub vm: VM,
   /// Global names defined by earlier inputs in this session, so a later
   /// REPL line can refer to them.
   session_globals: Vec<String>,
}

impl Interpreter {
   pub fn new() -> Interpreter {
      let dictionary = Rc::new(Dictionary::default());
      let vm = VM::new(Rc::clone(&dictionary));

      Interpreter {
         dictionary,
         vm,
         session_globals: vec![],
      }
   }

   /// Runs a source string through the full pipeline: lex/parse, semantic
   /// analysis, bytecode compilation, and VM execution. Diagnostics are
   /// reported to stderr as they surface; any error prevents the next
   /// phase from running.
   pub fn interpret(&mut self, filename: &str, source: &str) -> InterpretResult {
      let module = match Parser::parse(source, &self.dictionary) {
         Ok(module) => module,
         Err(errors) => {
            report_errors_list(filename, &errors);
            return InterpretResult::ParseError;
         }
      };

      if let Err(errors) =
         SemanticAnalyzer::analyze_with_globals(&module, &self.dictionary, &self.session_globals)
      {
         report_errors_list(filename, &errors);
         return InterpretResult::SemanticError;
      }

      let chunk = match Compiler::compile(&module) {
         Ok(chunk) => chunk,
         Err(errors) => {
            report_errors_list(filename, &errors);
            return InterpretResult::CompileError;
         }
      };

      match self.vm.run(chunk) {
         Ok(value) => {
            self.remember_globals(&module);
            InterpretResult::Ok(value)
         }
         Err(error) => {
            report_runtime_error(filename, &error);
            InterpretResult::RuntimeError
         }
      }
   }

   /// Records the top-level names a successful input bound.
   fn remember_globals(&mut self, module: &crate::parser::ast::Module) {
      use crate::parser::ast::{AssignTarget, Stmt};

      for stmt in &module.body {
         let name = match stmt {
            Stmt::VarDecl(decl) => Some(&decl.name),
            Stmt::FuncDecl(decl) => Some(&decl.name),
            Stmt::Class(decl) => Some(&decl.name),
            Stmt::Assignment(assign) => match &assign.target {
               AssignTarget::Variable(name) => Some(name),
               _ => None,
            },
            _ => None,
         };

         if let Some(name) = name {
            if !self.session_globals.contains(name) {
               self.session_globals.push(name.clone());
            }
         }
      }
   }
}

impl Default for Interpreter {
   fn default() -> Self {
      Interpreter::new()
   }
}
