use crate::bytecode::OpCode;
use crate::compiler::Compiler;
use crate::objects::Value;
use crate::parser::ast::*;

impl<'m> Compiler<'m> {
   /// Range-for lowering. The induction variable is an integer stack slot
   /// seeded with the start bound; the comparison is chosen at compile
   /// time from the bound keyword and the step is fixed at one.
   ///
   /// ```text
   /// <start>              ; induction slot
   /// loop:  LOAD_VAR i
   ///        <end>
   ///        LE/LT/…
   ///        JUMP_IF_FALSE exit
   ///        POP
   ///        <body>
   ///        LOAD_VAR i; LOAD_CONST 1; ADD; STORE_VAR i; POP
   ///        LOOP loop
   /// exit:  POP           ; condition
   ///        POP           ; induction slot
   /// ```
   pub(super) fn compile_range_for(&mut self, s: &'m RangeForStmt) {
      self.begin_scope();

      self.compile_expression(&s.start);
      self.add_local(&s.variable, s.location);
      let slot = self
         .resolve_local(&s.variable)
         .expect("induction variable was just declared");

      let loop_start = self.chunk.len();

      self.emit_op_with_byte(OpCode::LoadVar, slot, s.location.line);
      self.compile_expression(&s.end);

      let comparison = match s.bound {
         RangeBound::UpToInclusive | RangeBound::AtMost => OpCode::Le,
         RangeBound::LessThan => OpCode::Lt,
         RangeBound::AtLeast => OpCode::Ge,
         RangeBound::GreaterThan => OpCode::Gt,
      };
      self.emit_op(comparison, s.location.line);

      let exit_jump = self.emit_jump(OpCode::JumpIfFalse, s.location.line);
      self.emit_op(OpCode::Pop, s.location.line);

      self.compile_statement(&s.body);

      // i = i + 1
      self.emit_op_with_byte(OpCode::LoadVar, slot, s.location.line);
      self.emit_constant(Value::Int(1), s.location);
      self.emit_op(OpCode::Add, s.location.line);
      self.emit_op_with_byte(OpCode::StoreVar, slot, s.location.line);
      self.emit_op(OpCode::Pop, s.location.line);

      self.emit_loop(loop_start, s.location);

      self.patch_jump(exit_jump, s.location);
      self.emit_op(OpCode::Pop, s.location.line);

      self.end_scope(s.location.line);
   }

   /// `N번 반복` counts a hidden slot down to zero.
   pub(super) fn compile_repeat_for(&mut self, s: &'m RepeatForStmt) {
      self.begin_scope();

      self.compile_expression(&s.count);
      self.add_local("<반복횟수>", s.location);
      let slot = self
         .resolve_local("<반복횟수>")
         .expect("repeat counter was just declared");

      let loop_start = self.chunk.len();

      self.emit_op_with_byte(OpCode::LoadVar, slot, s.location.line);
      self.emit_constant(Value::Int(0), s.location);
      self.emit_op(OpCode::Gt, s.location.line);

      let exit_jump = self.emit_jump(OpCode::JumpIfFalse, s.location.line);
      self.emit_op(OpCode::Pop, s.location.line);

      self.compile_statement(&s.body);

      self.emit_op_with_byte(OpCode::LoadVar, slot, s.location.line);
      self.emit_constant(Value::Int(1), s.location);
      self.emit_op(OpCode::Sub, s.location.line);
      self.emit_op_with_byte(OpCode::StoreVar, slot, s.location.line);
      self.emit_op(OpCode::Pop, s.location.line);

      self.emit_loop(loop_start, s.location);

      self.patch_jump(exit_jump, s.location);
      self.emit_op(OpCode::Pop, s.location.line);

      self.end_scope(s.location.line);
   }
}
