use std::rc::Rc;

use crate::bytecode::OpCode;
use crate::errors::CompilerErrorType;
use crate::compiler::Compiler;
use crate::objects::Value;
use crate::parser::ast::*;

impl<'m> Compiler<'m> {
   pub(super) fn compile_expression(&mut self, expr: &'m Expr) {
      match expr {
         Expr::IntLit(lit) => self.emit_constant(Value::Int(lit.value), lit.location),
         Expr::FloatLit(lit) => self.emit_constant(Value::Float(lit.value), lit.location),
         Expr::StrLit(lit) => {
            self.emit_constant(Value::Str(Rc::new(lit.value.clone())), lit.location)
         }
         Expr::BoolLit(lit) => {
            let op = if lit.value { OpCode::LoadTrue } else { OpCode::LoadFalse };
            self.emit_op(op, lit.location.line);
         }
         Expr::Identifier(id) => self.compile_identifier(id),
         Expr::ArrayLit(arr) => self.compile_array_literal(arr),
         Expr::DictLit(dict) => self.compile_dict_literal(dict),
         Expr::Binary(bin) => self.compile_binary(bin),
         Expr::Unary(un) => self.compile_unary(un),
         Expr::Call(call) => self.compile_call(call),
         Expr::Index(ix) => self.compile_index(ix),
         Expr::FuncLitExpr(func) => {
            self.compile_function_literal(func, "<익명>", false);
         }
         Expr::Range(range) => self.compile_range(range),
         Expr::JosaCall(jc) => self.compile_josa_call(jc),
         Expr::Match(m) => self.compile_match(m),
         Expr::Member(m) => {
            self.compile_expression(&m.target);
            let name = self.make_name(&m.field, m.location);
            self.emit_op_with_byte(OpCode::LoadField, name, m.location.line);
         }
         Expr::This(t) => self.emit_op(OpCode::LoadThis, t.location.line),
      }
   }

   /// Locals resolve to stack slots; everything else goes through the
   /// global name pool.
   fn compile_identifier(&mut self, id: &IdentExpr) {
      if let Some(slot) = self.resolve_local(&id.name) {
         self.emit_op_with_byte(OpCode::LoadVar, slot, id.location.line);
         return;
      }

      let name = self.make_name(&id.name, id.location);
      self.emit_op_with_byte(OpCode::LoadGlobal, name, id.location.line);
   }

   fn compile_array_literal(&mut self, arr: &'m ArrayLitExpr) {
      if arr.elements.len() > u8::MAX as usize {
         self.error_at(arr.location, CompilerErrorType::TooManyConstants, "An array literal holds at most 255 elements.");
         return;
      }

      for element in &arr.elements {
         self.compile_expression(element);
      }

      self.emit_op_with_byte(OpCode::BuildArray, arr.elements.len() as u8, arr.location.line);
   }

   fn compile_dict_literal(&mut self, dict: &'m DictLitExpr) {
      if dict.entries.len() > u8::MAX as usize {
         self.error_at(dict.location, CompilerErrorType::TooManyConstants, "A dictionary literal holds at most 255 entries.");
         return;
      }

      for (key, value) in &dict.entries {
         self.emit_constant(Value::Str(Rc::new(key.clone())), dict.location);
         self.compile_expression(value);
      }

      self.emit_op_with_byte(OpCode::BuildDict, dict.entries.len() as u8, dict.location.line);
   }

   fn compile_binary(&mut self, bin: &'m BinaryExpr) {
      // Fold literal operands at compile time; behavior must match the
      // runtime exactly, so division by zero is left to the VM.
      if let Some(folded) = fold_binary(bin) {
         self.emit_constant(folded, bin.location);
         return;
      }

      self.compile_expression(&bin.left);
      self.compile_expression(&bin.right);

      let op = match bin.op {
         BinaryOp::Add => OpCode::Add,
         BinaryOp::Sub => OpCode::Sub,
         BinaryOp::Mul => OpCode::Mul,
         BinaryOp::Div => OpCode::Div,
         BinaryOp::Mod => OpCode::Mod,
         BinaryOp::Eq => OpCode::Eq,
         BinaryOp::NotEq => OpCode::Ne,
         BinaryOp::Less => OpCode::Lt,
         BinaryOp::Greater => OpCode::Gt,
         BinaryOp::LessEq => OpCode::Le,
         BinaryOp::GreaterEq => OpCode::Ge,
         BinaryOp::And => OpCode::And,
         BinaryOp::Or => OpCode::Or,
      };

      self.emit_op(op, bin.location.line);
   }

   fn compile_unary(&mut self, un: &'m UnaryExpr) {
      // Fold a negated literal.
      if un.op == UnaryOp::Negate {
         if let Expr::IntLit(lit) = un.operand.as_ref() {
            self.emit_constant(Value::Int(-lit.value), un.location);
            return;
         }
         if let Expr::FloatLit(lit) = un.operand.as_ref() {
            self.emit_constant(Value::Float(-lit.value), un.location);
            return;
         }
      }

      self.compile_expression(&un.operand);

      let op = match un.op {
         UnaryOp::Negate => OpCode::Neg,
         UnaryOp::Not => OpCode::Not,
      };
      self.emit_op(op, un.location.line);
   }

   pub(super) fn compile_call(&mut self, call: &'m CallExpr) {
      if call.args.len() > u8::MAX as usize {
         self.error_at(call.location, CompilerErrorType::MaxArity, "A call passes at most 255 arguments.");
         return;
      }

      // 출력(x) lowers straight to the PRINT instruction.
      if let Expr::Identifier(id) = call.callee.as_ref() {
         if id.name == "출력" && call.args.len() == 1 && self.resolve_local(&id.name).is_none() {
            self.compile_expression(&call.args[0]);
            self.emit_op(OpCode::Print, call.location.line);
            self.emit_op(OpCode::LoadNull, call.location.line);
            return;
         }
      }

      // Method call: obj.method(args) dispatches through the class.
      if let Expr::Member(member) = call.callee.as_ref() {
         self.compile_expression(&member.target);
         for arg in &call.args {
            self.compile_expression(arg);
         }
         let name = self.make_name(&member.field, member.location);
         self.emit_op(OpCode::CallMethod, call.location.line);
         self.emit_byte(name, call.location.line);
         self.emit_byte(call.args.len() as u8, call.location.line);
         return;
      }

      self.compile_expression(&call.callee);
      for arg in &call.args {
         self.compile_expression(arg);
      }

      self.emit_op_with_byte(OpCode::Call, call.args.len() as u8, call.location.line);
   }

   fn compile_index(&mut self, ix: &'m IndexExpr) {
      self.compile_expression(&ix.target);
      self.compile_expression(&ix.index);
      self.emit_op(OpCode::IndexGet, ix.location.line);
   }

   /// A standalone range materializes as an array of its integer values.
   fn compile_range(&mut self, range: &'m RangeExpr) {
      self.compile_expression(&range.start);
      self.compile_expression(&range.end);

      let inclusive = match range.bound {
         RangeBound::UpToInclusive | RangeBound::AtMost | RangeBound::AtLeast => 1u8,
         RangeBound::LessThan | RangeBound::GreaterThan => 0u8,
      };

      self.emit_op_with_byte(OpCode::BuildRange, inclusive, range.location.line);
   }

   fn compile_josa_call(&mut self, jc: &'m JosaCallExpr) {
      self.compile_expression(&jc.target);

      let name = self.make_name(&jc.method, jc.location);
      self.emit_op(OpCode::JosaCall, jc.location.line);
      self.emit_byte(jc.josa as u8, jc.location.line);
      self.emit_byte(name, jc.location.line);
   }

   /// Lowers a match expression to a chain of compare-and-branch arms.
   /// The scrutinee stays on the stack until an arm takes it.
   fn compile_match(&mut self, m: &'m MatchExpr) {
      self.compile_expression(&m.scrutinee);

      let mut end_jumps = vec![];
      let mut took_wildcard = false;

      for arm in &m.arms {
         match &arm.pattern {
            MatchPattern::Literal(pattern) => {
               self.emit_op(OpCode::Dup, arm.location.line);
               self.compile_expression(pattern);
               self.emit_op(OpCode::Eq, arm.location.line);

               let next_arm = self.emit_jump(OpCode::JumpIfFalse, arm.location.line);
               self.emit_op(OpCode::Pop, arm.location.line); // comparison result
               self.emit_op(OpCode::Pop, arm.location.line); // scrutinee
               self.compile_expression(&arm.result);
               end_jumps.push(self.emit_jump(OpCode::Jump, arm.location.line));

               self.patch_jump(next_arm, arm.location);
               self.emit_op(OpCode::Pop, arm.location.line); // comparison result
            }
            MatchPattern::Wildcard => {
               self.emit_op(OpCode::Pop, arm.location.line); // scrutinee
               self.compile_expression(&arm.result);
               end_jumps.push(self.emit_jump(OpCode::Jump, arm.location.line));
               took_wildcard = true;
               break;
            }
         }
      }

      if !took_wildcard {
         // No arm matched: the match evaluates to null.
         self.emit_op(OpCode::Pop, m.location.line);
         self.emit_op(OpCode::LoadNull, m.location.line);
      }

      for jump in end_jumps {
         self.patch_jump(jump, m.location);
      }
   }
}

/// Evaluates a binary operation over two literals at compile time.
/// Divisions and modulos with a zero right side are never folded; the
/// runtime raises ZeroDivision for them.
fn fold_binary(bin: &BinaryExpr) -> Option<Value> {
   let (a, b) = match (bin.left.as_ref(), bin.right.as_ref()) {
      (Expr::IntLit(a), Expr::IntLit(b)) => (a.value, b.value),
      _ => return None,
   };

   match bin.op {
      BinaryOp::Add => a.checked_add(b).map(Value::Int),
      BinaryOp::Sub => a.checked_sub(b).map(Value::Int),
      BinaryOp::Mul => a.checked_mul(b).map(Value::Int),
      BinaryOp::Div if b != 0 => a.checked_div(b).map(Value::Int),
      BinaryOp::Mod if b != 0 => a.checked_rem(b).map(Value::Int),
      BinaryOp::Eq => Some(Value::Bool(a == b)),
      BinaryOp::NotEq => Some(Value::Bool(a != b)),
      BinaryOp::Less => Some(Value::Bool(a < b)),
      BinaryOp::Greater => Some(Value::Bool(a > b)),
      BinaryOp::LessEq => Some(Value::Bool(a <= b)),
      BinaryOp::GreaterEq => Some(Value::Bool(a >= b)),
      _ => None,
   }
}
