use std::rc::Rc;

use crate::bytecode::chunk::{Chunk, FunctionSpan};
use crate::bytecode::OpCode;
use crate::errors::{CompilerErrorType, ErrorReport};
use crate::objects::Value;
use crate::parser::ast::*;

// Submodules
mod expressions;
mod functions;
mod loops;
mod statements;

pub use functions::PendingFunction;

/// A local variable occupying a stack slot in the current function frame.
pub(self) struct Local {
   pub name: String,
   pub depth: usize,
}

/// Represents the bytecode compiler and its internal state. Lowers a parsed
/// module into a single chunk: main code first, then a HALT, then every
/// function body (entries are backpatched into BUILD_FUNCTION operands).
pub struct Compiler<'m> {
   pub(self) chunk: Chunk,
   /// Locals of the function currently being compiled, frame-relative.
   pub(self) locals: Vec<Local>,
   pub(self) scope_depth: usize,
   /// 0 while compiling top-level code, 1+ inside function bodies.
   pub(self) function_depth: usize,
   pub(self) next_function_id: usize,
   /// Function bodies waiting to be emitted after the main code.
   pub(self) pending: Vec<PendingFunction<'m>>,
   pub(self) errors: Vec<ErrorReport>,
}

impl<'m> Compiler<'m> {
   /// Compiles a module into a chunk.
   ///
   /// # Returns
   /// - `Ok(Rc<Chunk>)`: The compiled chunk.
   /// - `Err(Vec<ErrorReport>)`: Structural compile errors (jump out of
   ///   range, pool overflow, too many locals).
   pub fn compile(module: &'m Module) -> Result<Rc<Chunk>, Vec<ErrorReport>> {
      let mut compiler = Compiler {
         chunk: Chunk::new(),
         locals: vec![],
         scope_depth: 0,
         function_depth: 0,
         next_function_id: 0,
         pending: vec![],
         errors: vec![],
      };

      for stmt in &module.body {
         compiler.compile_statement(stmt);
      }

      compiler.emit_op(OpCode::Halt, compiler.last_line(module));
      compiler.compile_pending_functions();

      if compiler.errors.is_empty() {
         Ok(Rc::new(compiler.chunk))
      } else {
         Err(compiler.errors)
      }
   }

   fn last_line(&self, module: &Module) -> usize {
      module.body.last().map(|s| s.location().line).unwrap_or(1)
   }

   // ---------------------------------------------------------------------
   // Emission helpers
   // ---------------------------------------------------------------------

   pub(self) fn emit_op(&mut self, op: OpCode, line: usize) {
      self.chunk.write_op(op, line);
   }

   pub(self) fn emit_byte(&mut self, byte: u8, line: usize) {
      self.chunk.write(byte, line);
   }

   pub(self) fn emit_op_with_byte(&mut self, op: OpCode, operand: u8, line: usize) {
      self.emit_op(op, line);
      self.emit_byte(operand, line);
   }

   /// Adds a constant and emits LOAD_CONST for it.
   pub(self) fn emit_constant(&mut self, value: Value, location: Location) {
      match self.chunk.add_constant(value) {
         Ok(idx) => self.emit_op_with_byte(OpCode::LoadConst, idx, location.line),
         Err(_) => self.error_at(location, CompilerErrorType::TooManyConstants, "The constant pool is full (256 entries)."),
      }
   }

   /// Interns a name into the chunk's name pool.
   pub(self) fn make_name(&mut self, name: &str, location: Location) -> u8 {
      match self.chunk.add_name(name) {
         Ok(idx) => idx,
         Err(_) => {
            self.error_at(location, CompilerErrorType::TooManyNames, "The name pool is full (256 entries).");
            0
         }
      }
   }

   /// Emits a forward jump with a placeholder operand.
   ///
   /// # Returns
   /// `usize`: The offset of the operand byte, for `patch_jump`.
   pub(self) fn emit_jump(&mut self, op: OpCode, line: usize) -> usize {
      self.emit_op(op, line);
      self.emit_byte(0xFF, line);
      self.chunk.len() - 1
   }

   /// Backpatches a forward jump to land on the current offset.
   pub(self) fn patch_jump(&mut self, operand_offset: usize, location: Location) {
      // The ip sits just past the operand when the jump applies.
      let distance = self.chunk.len() - (operand_offset + 1);

      if distance > u8::MAX as usize {
         self.error_at(location, CompilerErrorType::JumpTooFar, "Jump distance exceeds one byte (255).");
         return;
      }

      self.chunk.patch(operand_offset, distance as u8);
   }

   /// Emits a backward LOOP jump targeting `loop_start`.
   pub(self) fn emit_loop(&mut self, loop_start: usize, location: Location) {
      self.emit_op(OpCode::Loop, location.line);

      // +1 for the operand byte the ip will have consumed.
      let distance = self.chunk.len() + 1 - loop_start;

      if distance > u8::MAX as usize {
         self.error_at(location, CompilerErrorType::JumpTooFar, "Loop body exceeds the one-byte jump range (255).");
         self.emit_byte(0xFF, location.line);
         return;
      }

      self.emit_byte(distance as u8, location.line);
   }

   // ---------------------------------------------------------------------
   // Scopes and locals
   // ---------------------------------------------------------------------

   pub(self) fn begin_scope(&mut self) {
      self.scope_depth += 1;
   }

   /// Closes the innermost scope, popping its locals off the stack.
   pub(self) fn end_scope(&mut self, line: usize) {
      self.scope_depth -= 1;

      while let Some(local) = self.locals.last() {
         if local.depth <= self.scope_depth {
            break;
         }
         self.locals.pop();
         self.emit_op(OpCode::Pop, line);
      }
   }

   /// Declares a local occupying the current stack top.
   pub(self) fn add_local(&mut self, name: &str, location: Location) {
      if self.locals.len() >= u8::MAX as usize {
         self.error_at(location, CompilerErrorType::TooManyLocals, "Too many locals in one function (255).");
         return;
      }

      self.locals.push(Local {
         name: String::from(name),
         depth: self.scope_depth,
      });
   }

   /// Resolves a name against the current frame's locals, innermost first.
   pub(self) fn resolve_local(&self, name: &str) -> Option<u8> {
      for (i, local) in self.locals.iter().enumerate().rev() {
         if local.name == name {
            return Some(i as u8);
         }
      }
      None
   }

   /// True when declarations at the current position bind globals by name.
   pub(self) fn at_global_scope(&self) -> bool {
      self.function_depth == 0 && self.scope_depth == 0
   }

   pub(self) fn error_at(&mut self, location: Location, kind: CompilerErrorType, message: &str) {
      self.errors.push(ErrorReport::new(
         location.line,
         location.column,
         kind.name(),
         String::from(message),
      ));
   }

   /// Registers a function span in the chunk for the detector and the JIT.
   pub(self) fn register_span(&mut self, id: usize, name: &str, entry: usize, end: usize, arity: u8) {
      self.chunk.add_function_span(FunctionSpan {
         id,
         name: String::from(name),
         entry,
         end,
         arity,
      });
   }
}
