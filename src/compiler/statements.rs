use std::rc::Rc;

use crate::bytecode::OpCode;
use crate::errors::CompilerErrorType;
use crate::compiler::Compiler;
use crate::objects::Value;
use crate::parser::ast::*;

impl<'m> Compiler<'m> {
   pub(super) fn compile_statement(&mut self, stmt: &'m Stmt) {
      match stmt {
         Stmt::VarDecl(decl) => self.compile_var_declaration(decl),
         Stmt::Assignment(assign) => self.compile_assignment(assign),
         Stmt::ExprStmt(s) => {
            self.compile_expression(&s.expr);
            self.emit_op(OpCode::Pop, s.location.line);
         }
         Stmt::Return(s) => self.compile_return(s),
         Stmt::If(s) => self.compile_if(s),
         Stmt::While(s) => self.compile_while(s),
         Stmt::RangeFor(s) => self.compile_range_for(s),
         Stmt::RepeatFor(s) => self.compile_repeat_for(s),
         Stmt::Block(s) => {
            self.begin_scope();
            for inner in &s.body {
               self.compile_statement(inner);
            }
            self.end_scope(s.location.line);
         }
         Stmt::Import(s) => {
            let name = self.make_name(&s.path, s.location);
            self.emit_op_with_byte(OpCode::Import, name, s.location.line);
         }
         Stmt::Try(s) => self.compile_try(s),
         Stmt::Throw(s) => {
            self.compile_expression(&s.value);
            self.emit_op(OpCode::Throw, s.location.line);
         }
         Stmt::FuncDecl(decl) => self.compile_function_declaration(decl),
         Stmt::Class(decl) => self.compile_class_declaration(decl),
      }
   }

   /// Declarations at the global scope bind by name; everywhere else the
   /// initializer's stack slot becomes the local.
   fn compile_var_declaration(&mut self, decl: &'m VarDeclStmt) {
      self.compile_expression(&decl.value);

      if self.at_global_scope() {
         let name = self.make_name(&decl.name, decl.location);
         self.emit_op_with_byte(OpCode::StoreGlobal, name, decl.location.line);
         self.emit_op(OpCode::Pop, decl.location.line);
      } else {
         self.add_local(&decl.name, decl.location);
      }
   }

   fn compile_assignment(&mut self, assign: &'m AssignmentStmt) {
      match &assign.target {
         AssignTarget::Variable(name) => {
            self.compile_expression(&assign.value);

            if let Some(slot) = self.resolve_local(name) {
               self.emit_op_with_byte(OpCode::StoreVar, slot, assign.location.line);
            } else {
               let idx = self.make_name(name, assign.location);
               self.emit_op_with_byte(OpCode::StoreGlobal, idx, assign.location.line);
            }

            // STORE_VAR / STORE_GLOBAL leave the value on the stack.
            self.emit_op(OpCode::Pop, assign.location.line);
         }
         AssignTarget::Index { target, index } => {
            self.compile_expression(target);
            self.compile_expression(index);
            self.compile_expression(&assign.value);
            self.emit_op(OpCode::IndexSet, assign.location.line);
         }
         AssignTarget::Member { target, field } => {
            self.compile_expression(target);
            self.compile_expression(&assign.value);
            let name = self.make_name(field, assign.location);
            self.emit_op_with_byte(OpCode::StoreField, name, assign.location.line);
         }
      }
   }

   /// Return in tail position lowers the call through TAIL_CALL; the VM
   /// treats both call forms identically.
   fn compile_return(&mut self, s: &'m ReturnStmt) {
      match &s.value {
         Some(Expr::Call(call)) => {
            self.compile_tail_call(call);
         }
         Some(value) => self.compile_expression(value),
         None => self.emit_op(OpCode::LoadNull, s.location.line),
      }

      self.emit_op(OpCode::Return, s.location.line);
   }

   fn compile_tail_call(&mut self, call: &'m CallExpr) {
      // Member calls and PRINT keep their own lowering.
      match call.callee.as_ref() {
         Expr::Member(_) => {
            self.compile_call(call);
            return;
         }
         Expr::Identifier(id) if id.name == "출력" => {
            self.compile_call(call);
            return;
         }
         _ => {}
      }

      if call.args.len() > u8::MAX as usize {
         self.error_at(call.location, CompilerErrorType::MaxArity, "A call passes at most 255 arguments.");
         return;
      }

      self.compile_expression(&call.callee);
      for arg in &call.args {
         self.compile_expression(arg);
      }

      self.emit_op_with_byte(OpCode::TailCall, call.args.len() as u8, call.location.line);
   }

   /// if/else lowering: condition, JUMP_IF_FALSE over the then branch,
   /// explicit POPs on both edges (the conditional jumps do not pop).
   fn compile_if(&mut self, s: &'m IfStmt) {
      self.compile_condition(&s.condition);

      let branch = Self::branch_for_condition(&s.condition);
      let else_jump = self.emit_jump(branch, s.location.line);
      self.emit_op(OpCode::Pop, s.location.line);
      self.compile_statement(&s.then_branch);

      let end_jump = self.emit_jump(OpCode::Jump, s.location.line);

      self.patch_jump(else_jump, s.location);
      self.emit_op(OpCode::Pop, s.location.line);

      if let Some(else_branch) = &s.else_branch {
         self.compile_statement(else_branch);
      }

      self.patch_jump(end_jump, s.location);
   }

   fn compile_while(&mut self, s: &'m WhileStmt) {
      let loop_start = self.chunk.len();

      self.compile_condition(&s.condition);

      let branch = Self::branch_for_condition(&s.condition);
      let exit_jump = self.emit_jump(branch, s.location.line);
      self.emit_op(OpCode::Pop, s.location.line);

      self.compile_statement(&s.body);
      self.emit_loop(loop_start, s.location);

      self.patch_jump(exit_jump, s.location);
      self.emit_op(OpCode::Pop, s.location.line);
   }

   /// Peephole: `!x` as a branch condition compiles to the mirrored jump
   /// instead of NOT + JUMP_IF_FALSE. The branch edges POP either way, so
   /// the observable behavior is identical.
   fn compile_condition(&mut self, condition: &'m Expr) {
      if let Expr::Unary(un) = condition {
         if un.op == UnaryOp::Not {
            self.compile_expression(&un.operand);
            return;
         }
      }

      self.compile_expression(condition);
   }

   /// Branch opcode matching `compile_condition`'s normalization.
   fn branch_for_condition(condition: &Expr) -> OpCode {
      match condition {
         Expr::Unary(un) if un.op == UnaryOp::Not => OpCode::JumpIfTrue,
         _ => OpCode::JumpIfFalse,
      }
   }

   fn compile_try(&mut self, s: &'m TryStmt) {
      self.emit_op(OpCode::SetupCatch, s.location.line);
      let handler_operand = self.chunk.len();
      self.chunk.write16(0xFFFF, s.location.line);

      self.compile_statement(&s.body);
      self.emit_op(OpCode::EndCatch, s.location.line);
      let end_jump = self.emit_jump(OpCode::Jump, s.location.line);

      // The handler target is absolute; the VM pushes the raised error
      // value before resuming here.
      let handler = self.chunk.len();
      if handler > u16::MAX as usize {
         self.error_at(s.location, CompilerErrorType::JumpTooFar, "Catch handler is beyond the addressable range.");
      }
      self.chunk.patch16(handler_operand, handler as u16);

      self.begin_scope();
      self.add_local(&s.error_name, s.location);
      self.compile_statement(&s.catch_body);
      self.end_scope(s.location.line);

      self.patch_jump(end_jump, s.location);
   }

   fn compile_function_declaration(&mut self, decl: &'m FuncDeclStmt) {
      self.compile_function_literal(&decl.func, &decl.name, false);

      if self.at_global_scope() {
         let name = self.make_name(&decl.name, decl.location);
         self.emit_op_with_byte(OpCode::StoreGlobal, name, decl.location.line);
         self.emit_op(OpCode::Pop, decl.location.line);
      } else {
         self.add_local(&decl.name, decl.location);
      }
   }

   /// Class lowering: push one name constant per field, then for each
   /// method (constructor included) the function value and its name, then
   /// CLASS_DEF. The VM rebuilds the definition and binds it globally.
   fn compile_class_declaration(&mut self, decl: &'m ClassDeclStmt) {
      for field in &decl.fields {
         self.emit_constant(Value::Str(Rc::new(field.name.clone())), field.location);
      }

      let mut method_count = 0u8;

      if let Some(ctor) = &decl.constructor {
         self.compile_function_literal(ctor, "생성자", true);
         self.emit_constant(Value::Str(Rc::new(String::from("생성자"))), decl.location);
         method_count += 1;
      }

      for (method_name, method) in &decl.methods {
         self.compile_function_literal(method, method_name, true);
         self.emit_constant(Value::Str(Rc::new(method_name.clone())), decl.location);
         method_count += 1;
      }

      let name = self.make_name(&decl.name, decl.location);
      self.emit_op(OpCode::ClassDef, decl.location.line);
      self.emit_byte(name, decl.location.line);
      self.emit_byte(decl.fields.len() as u8, decl.location.line);
      self.emit_byte(method_count, decl.location.line);
   }
}
