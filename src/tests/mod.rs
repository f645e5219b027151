use std::rc::Rc;

use crate::bytecode::chunk::Chunk;
use crate::compiler::Compiler;
use crate::errors::RuntimeError;
use crate::lexer::morphology::Dictionary;
use crate::objects::Value;
use crate::parser::Parser;
use crate::semantic::SemanticAnalyzer;
use crate::virtual_machine::VM;

mod bytecode;
mod compiler;
mod jit;
mod lexer;
mod parser;
mod vm;

/// Compiles a source string, panicking on any front-end error.
pub(crate) fn compile_source(src: &str) -> Rc<Chunk> {
   let dictionary = Dictionary::default();

   let module = match Parser::parse(src, &dictionary) {
      Ok(module) => module,
      Err(errors) => panic!("parser had errors: {:?}", errors.first().map(|e| &e.message)),
   };

   if let Err(errors) = SemanticAnalyzer::analyze(&module, &dictionary) {
      panic!("semantic analyzer had errors: {:?}", errors.first().map(|e| &e.message));
   }

   match Compiler::compile(&module) {
      Ok(chunk) => chunk,
      Err(errors) => panic!("compiler had errors: {:?}", errors.first().map(|e| &e.message)),
   }
}

/// Runs a source string on a fresh VM with output capture enabled.
pub(crate) fn run_source(src: &str) -> (VM, Result<Value, RuntimeError>) {
   let chunk = compile_source(src);
   let mut vm = VM::new(Rc::new(Dictionary::default()));
   vm.enable_output_capture();
   let result = vm.run(chunk);
   (vm, result)
}

/// Runs a source string and returns the captured PRINT lines, panicking
/// on any error.
pub(crate) fn run_expect(src: &str) -> Vec<String> {
   let (vm, result) = run_source(src);
   if let Err(e) = result {
      panic!("runtime error: {}: {}", e.error, e.message);
   }
   vm.captured_output().to_vec()
}
