#![allow(dead_code)]

use std::fs;
use std::process;

// Crate-level modules
mod bytecode;
mod compiler;
mod environment;
mod errors;
mod interpreter;
mod jit;
mod lexer;
mod module_loader;
mod natives;
mod objects;
mod parser;
mod repl;
mod semantic;
mod virtual_machine;

#[cfg(test)]
mod tests;

use interpreter::Interpreter;

fn main() {
   env_logger::init();

   let args: Vec<String> = std::env::args().collect();

   match args.len() {
      1 => repl::run(),
      2 => run_file(&args[1]),
      _ => {
         eprintln!("사용법: {} [파일.ksj]", args[0]);
         process::exit(1);
      }
   }
}

/// Loads and executes a source file. Exit code 0 on success, 1 on any
/// lexer, parser, semantic, compile, or runtime error.
fn run_file(filename: &str) {
   let source = match fs::read_to_string(filename) {
      Ok(s) => s,
      Err(e) => {
         eprintln!("{}: {}", filename, e);
         process::exit(1);
      }
   };

   let mut interpreter = Interpreter::new();
   let result = interpreter.interpret(filename, &source);

   if result.is_ok() {
      process::exit(0);
   } else {
      process::exit(1);
   }
}
