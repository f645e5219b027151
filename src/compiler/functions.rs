use crate::bytecode::OpCode;
use crate::errors::CompilerErrorType;
use crate::compiler::{Compiler, Local};
use crate::parser::ast::*;

/// A function body queued for emission after the main code. The
/// BUILD_FUNCTION instruction referencing it carries a placeholder entry
/// offset until the body is compiled.
pub struct PendingFunction<'m> {
   pub func: &'m FuncLit,
   pub name: String,
   /// Offset of the 2-byte entry operand to backpatch.
   pub patch_at: usize,
   pub id: usize,
   pub is_method: bool,
}

impl<'m> Compiler<'m> {
   /// Emits BUILD_FUNCTION for a literal and queues its body. Bodies are
   /// compiled after HALT so no jump-over is needed, whatever their size.
   pub(super) fn compile_function_literal(&mut self, func: &'m FuncLit, name: &str, is_method: bool) {
      if func.params.len() > u8::MAX as usize {
         self.error_at(func.location, CompilerErrorType::MaxArity, "A function takes at most 255 parameters.");
         return;
      }

      let id = self.next_function_id;
      self.next_function_id += 1;

      self.emit_op(OpCode::BuildFunction, func.location.line);
      self.emit_byte(func.params.len() as u8, func.location.line);
      let patch_at = self.chunk.len();
      self.chunk.write16(0xFFFF, func.location.line);

      self.pending.push(PendingFunction {
         func,
         name: String::from(name),
         patch_at,
         id,
         is_method,
      });
   }

   /// Compiles every queued function body. Bodies may queue further nested
   /// literals, so this drains by index rather than iterating.
   pub(super) fn compile_pending_functions(&mut self) {
      let mut i = 0;

      while i < self.pending.len() {
         let PendingFunction {
            func,
            name,
            patch_at,
            id,
            is_method: _,
         } = {
            let p = &self.pending[i];
            PendingFunction {
               func: p.func,
               name: p.name.clone(),
               patch_at: p.patch_at,
               id: p.id,
               is_method: p.is_method,
            }
         };

         let entry = self.chunk.len();
         if entry > u16::MAX as usize {
            self.error_at(
               func.location,
               CompilerErrorType::JumpTooFar,
               "Function entry is beyond the 16-bit addressable range.",
            );
            i += 1;
            continue;
         }
         self.chunk.patch16(patch_at, entry as u16);

         self.compile_function_body(func, &name);

         let end = self.chunk.len();
         self.register_span(id, &name, entry, end, func.params.len() as u8);

         i += 1;
      }
   }

   /// Compiles one body with a fresh locals frame: parameters occupy
   /// slots 0..arity, declared locals continue from there.
   fn compile_function_body(&mut self, func: &'m FuncLit, _name: &str) {
      let saved_locals = std::mem::take(&mut self.locals);
      let saved_depth = self.scope_depth;

      self.function_depth += 1;
      self.scope_depth = 1;

      for param in &func.params {
         self.locals.push(Local {
            name: param.clone(),
            depth: 1,
         });
      }

      for stmt in &func.body {
         self.compile_statement(stmt);
      }

      // Every body ends in RETURN; a fall-through returns null. The frame
      // unwind discards locals, so no scope-closing POPs are needed.
      if !matches!(func.body.last(), Some(Stmt::Return(_))) {
         let last_line = func.body.last().map(|s| s.location().line).unwrap_or(func.location.line);
         self.emit_op(OpCode::LoadNull, last_line);
         self.emit_op(OpCode::Return, last_line);
      }

      self.function_depth -= 1;
      self.scope_depth = saved_depth;
      self.locals = saved_locals;
   }
}
