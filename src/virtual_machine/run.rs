use std::rc::Rc;

use crate::bytecode::OpCode;
use crate::errors::{RuntimeError, RuntimeErrorType};
use crate::objects::{ClassObj, FunctionObj, Value};
use crate::virtual_machine::call_frame::FrameKind;
use crate::virtual_machine::{RuntimeResult, VM};

use hashbrown::HashMap;

/// Pops the stack or raises StackUnderflow.
macro_rules! pop_stack {
   ($vm:expr) => {
      match $vm.stack.pop() {
         Some(value) => value,
         None => {
            return $vm.runtime_error(
               RuntimeErrorType::StackUnderflow,
               String::from("Value stack underflow."),
            )
         }
      }
   };
}

impl VM {
   /// The execution loop: fetch, decode, dispatch, repeat. Limits are
   /// checked before every instruction; errors unwind to the innermost
   /// 시도 handler or end the run.
   pub(crate) fn execute(&mut self) -> Result<Value, RuntimeError> {
      loop {
         if let Some(breach) = self.check_limits() {
            if let RuntimeResult::Error { error, message } = breach {
               return Err(RuntimeError {
                  error,
                  message,
                  line: self.current_line(),
               });
            }
         }

         self.count_instruction();
         self.op_ip = self.current_frame().ip;

         let op = match self.current_frame_mut().next_op() {
            Some(op) => op,
            None => {
               return Err(RuntimeError {
                  error: RuntimeErrorType::StackUnderflow,
                  message: String::from("Malformed bytecode: bad opcode."),
                  line: self.current_line(),
               })
            }
         };

         let result = self.dispatch(op);

         match result {
            RuntimeResult::Continue => {}
            RuntimeResult::End(value) => return Ok(value),
            RuntimeResult::Error { error, message } => {
               let line = self.current_line();
               if !self.unwind_to_handler(error, &message) {
                  return Err(RuntimeError { error, message, line });
               }
            }
         }
      }
   }

   fn dispatch(&mut self, op: OpCode) -> RuntimeResult {
      match op {
         // Constant loads
         OpCode::LoadConst => self.op_load_constant(),
         OpCode::LoadTrue => {
            self.push_stack(Value::Bool(true));
            RuntimeResult::Continue
         }
         OpCode::LoadFalse => {
            self.push_stack(Value::Bool(false));
            RuntimeResult::Continue
         }
         OpCode::LoadNull => {
            self.push_stack(Value::Null);
            RuntimeResult::Continue
         }

         // Variables
         OpCode::LoadVar => self.op_load_var(),
         OpCode::StoreVar => self.op_store_var(),
         OpCode::LoadGlobal => self.op_load_global(),
         OpCode::StoreGlobal => self.op_store_global(),

         // Arithmetic and logic
         OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Mod => {
            self.binary_operation(op)
         }
         OpCode::Neg => self.op_negate(),
         OpCode::Eq | OpCode::Ne => self.equality_operation(op),
         OpCode::Lt | OpCode::Gt | OpCode::Le | OpCode::Ge => self.comparison_operation(op),
         OpCode::And | OpCode::Or => self.logic_operation(op),
         OpCode::Not => {
            let value = pop_stack!(self);
            self.push_stack(Value::Bool(value.is_falsy()));
            RuntimeResult::Continue
         }

         // Jumps
         OpCode::Jump => {
            let offset = self.current_frame_mut().next_byte() as usize;
            self.current_frame_mut().ip += offset;
            RuntimeResult::Continue
         }
         OpCode::JumpIfFalse => {
            let offset = self.current_frame_mut().next_byte() as usize;
            if self.peek_stack(0).is_falsy() {
               self.current_frame_mut().ip += offset;
            }
            RuntimeResult::Continue
         }
         OpCode::JumpIfTrue => {
            let offset = self.current_frame_mut().next_byte() as usize;
            if self.peek_stack(0).is_truthy() {
               self.current_frame_mut().ip += offset;
            }
            RuntimeResult::Continue
         }
         OpCode::Loop => {
            let offset = self.current_frame_mut().next_byte() as usize;
            self.current_frame_mut().ip -= offset;
            RuntimeResult::Continue
         }

         // Calls
         OpCode::Call | OpCode::TailCall => {
            let arg_count = self.current_frame_mut().next_byte();
            let callee = self.peek_stack(arg_count as usize).clone();
            self.call_value(callee, arg_count)
         }
         OpCode::Return => self.op_return(),
         OpCode::BuildFunction => self.op_build_function(),

         // Collections
         OpCode::BuildArray => self.op_build_array(),
         OpCode::BuildDict => self.op_build_dict(),
         OpCode::BuildRange => self.op_build_range(),
         OpCode::IndexGet => self.op_index_get(),
         OpCode::IndexSet => self.op_index_set(),
         OpCode::ArrayAppend => self.op_array_append(),

         // Postposition dispatch
         OpCode::JosaCall => self.op_josa_call(),

         // Stack manipulation
         OpCode::Pop => {
            pop_stack!(self);
            RuntimeResult::Continue
         }
         OpCode::Dup => {
            let top = self.peek_stack(0).clone();
            self.push_stack(top);
            RuntimeResult::Continue
         }
         OpCode::Swap => {
            let a = pop_stack!(self);
            let b = pop_stack!(self);
            self.push_stack(a);
            self.push_stack(b);
            RuntimeResult::Continue
         }

         // Miscellaneous
         OpCode::Print => {
            let value = pop_stack!(self);
            self.write_output(format!("{}", value));
            RuntimeResult::Continue
         }
         OpCode::Halt => self.op_halt(),

         // Modules
         OpCode::Import => {
            let idx = self.current_frame_mut().next_byte() as usize;
            match self.current_frame().chunk.get_name(idx) {
               Some(path) => {
                  let path = String::from(path);
                  self.import_module(&path)
               }
               None => self.runtime_error(
                  RuntimeErrorType::UndefinedName,
                  String::from("Malformed bytecode: bad module name index."),
               ),
            }
         }

         // Classes
         OpCode::ClassDef => self.op_class_def(),
         OpCode::LoadField => self.op_load_field(),
         OpCode::StoreField => self.op_store_field(),
         OpCode::CallMethod => self.op_call_method(),
         OpCode::LoadThis => match self.current_frame().this.clone() {
            Some(this) => {
               self.push_stack(this);
               RuntimeResult::Continue
            }
            None => self.runtime_error(
               RuntimeErrorType::TypeMismatch,
               String::from("자신 is only available inside a method."),
            ),
         },

         // Exceptions
         OpCode::SetupCatch => {
            let target = self.current_frame_mut().next_short() as usize;
            self.push_handler(target);
            RuntimeResult::Continue
         }
         OpCode::EndCatch => {
            self.pop_handler();
            RuntimeResult::Continue
         }
         OpCode::Throw => {
            let value = pop_stack!(self);
            let (kind, message) = match &value {
               Value::Error(e) => (e.kind.clone(), e.message.clone()),
               other => (String::from("오류"), format!("{}", other)),
            };
            self.runtime_error(
               RuntimeErrorType::UncaughtThrow,
               format!("{}: {}", kind, message),
            )
         }
      }
   }

   fn op_load_constant(&mut self) -> RuntimeResult {
      let idx = self.current_frame_mut().next_byte() as usize;
      match self.current_frame().constant(idx) {
         Some(value) => {
            self.push_stack(value);
            RuntimeResult::Continue
         }
         None => self.runtime_error(
            RuntimeErrorType::StackUnderflow,
            String::from("Malformed bytecode: bad constant index."),
         ),
      }
   }

   fn op_load_var(&mut self) -> RuntimeResult {
      let slot = self.current_frame_mut().next_byte() as usize;
      let position = self.current_frame().stack_base + slot;

      if position >= self.stack.len() {
         return self.runtime_error(
            RuntimeErrorType::StackUnderflow,
            String::from("Local slot out of range."),
         );
      }

      self.push_stack(self.stack[position].clone());
      RuntimeResult::Continue
   }

   fn op_store_var(&mut self) -> RuntimeResult {
      let slot = self.current_frame_mut().next_byte() as usize;
      let position = self.current_frame().stack_base + slot;

      if position >= self.stack.len() {
         self.stack.resize(position + 1, Value::Null);
      }

      self.stack[position] = self.peek_stack(0).clone();
      RuntimeResult::Continue
   }

   /// Globals resolve through the environment first, then through the
   /// native function table. An unbound name is UndefinedGlobal.
   fn op_load_global(&mut self) -> RuntimeResult {
      let idx = self.current_frame_mut().next_byte() as usize;
      let name = match self.current_frame().chunk.get_name(idx) {
         Some(n) => String::from(n),
         None => {
            return self.runtime_error(
               RuntimeErrorType::UndefinedGlobal,
               String::from("Malformed bytecode: bad name index."),
            )
         }
      };

      if let Some(value) = self.globals.lookup(crate::environment::Environment::GLOBAL, &name) {
         let value = value.clone();
         self.push_stack(value);
         return RuntimeResult::Continue;
      }

      if let Some(native) = self.natives.get(&name) {
         self.push_stack(Value::Native(native));
         return RuntimeResult::Continue;
      }

      self.runtime_error(
         RuntimeErrorType::UndefinedGlobal,
         format!("Undefined variable '{}'.", name),
      )
   }

   fn op_store_global(&mut self) -> RuntimeResult {
      let idx = self.current_frame_mut().next_byte() as usize;
      let name = match self.current_frame().chunk.get_name(idx) {
         Some(n) => String::from(n),
         None => {
            return self.runtime_error(
               RuntimeErrorType::UndefinedGlobal,
               String::from("Malformed bytecode: bad name index."),
            )
         }
      };

      let value = self.peek_stack(0).clone();
      self
         .globals
         .assign(crate::environment::Environment::GLOBAL, &name, value);
      RuntimeResult::Continue
   }

   fn op_return(&mut self) -> RuntimeResult {
      let result = pop_stack!(self);
      let frame = self.frames.pop().expect("RETURN outside any frame");

      // A 반환 inside a 시도 block leaves the handler behind; drop
      // handlers that referred to the popped frame.
      self.prune_handlers();

      match frame.kind {
         FrameKind::Script => RuntimeResult::End(result),
         FrameKind::Module => {
            self.stack.truncate(frame.stack_base);
            RuntimeResult::Continue
         }
         FrameKind::Function => {
            // Drop the frame's window and the callee slot beneath it.
            self.stack.truncate(frame.stack_base.saturating_sub(1));
            self.push_stack(result);
            RuntimeResult::Continue
         }
         FrameKind::Constructor => {
            let instance = frame.this.clone().unwrap_or(Value::Null);
            self.stack.truncate(frame.stack_base.saturating_sub(1));
            self.push_stack(instance);
            RuntimeResult::Continue
         }
      }
   }

   fn op_halt(&mut self) -> RuntimeResult {
      let frame = self.frames.pop().expect("HALT outside any frame");
      self.prune_handlers();

      match frame.kind {
         FrameKind::Module => {
            self.stack.truncate(frame.stack_base);
            RuntimeResult::Continue
         }
         _ => RuntimeResult::End(self.stack.pop().unwrap_or(Value::Null)),
      }
   }

   /// BUILD_FUNCTION resolves its entry offset against the chunk's
   /// function span registry.
   fn op_build_function(&mut self) -> RuntimeResult {
      let arity = self.current_frame_mut().next_byte();
      let entry = self.current_frame_mut().next_short() as usize;

      let chunk = Rc::clone(&self.current_frame().chunk);
      let span = match chunk.span_at_entry(entry) {
         Some(span) => span,
         None => {
            return self.runtime_error(
               RuntimeErrorType::NotCallable,
               String::from("Malformed bytecode: unregistered function entry."),
            )
         }
      };

      let func = FunctionObj {
         name: span.name.clone(),
         arity,
         entry: span.entry,
         end: span.end,
         id: span.id,
         chunk: Rc::clone(&chunk),
      };

      self.push_stack(Value::Function(Rc::new(func)));
      RuntimeResult::Continue
   }

   fn op_build_array(&mut self) -> RuntimeResult {
      let count = self.current_frame_mut().next_byte() as usize;
      let mut elements = Vec::with_capacity(count);

      for _ in 0..count {
         elements.push(pop_stack!(self));
      }
      elements.reverse();

      self.push_stack(Value::array(elements));
      RuntimeResult::Continue
   }

   fn op_build_dict(&mut self) -> RuntimeResult {
      let count = self.current_frame_mut().next_byte() as usize;
      let mut entries = HashMap::new();

      for _ in 0..count {
         let value = pop_stack!(self);
         let key = pop_stack!(self);
         match key {
            Value::Str(k) => {
               entries.insert((*k).clone(), value);
            }
            other => {
               return self.runtime_error(
                  RuntimeErrorType::TypeMismatch,
                  format!("Dictionary keys must be strings, not '{}'.", other.type_name()),
               )
            }
         }
      }

      self.push_stack(Value::Dict(Rc::new(std::cell::RefCell::new(entries))));
      RuntimeResult::Continue
   }

   /// BUILD_RANGE materializes an integer range as an array.
   fn op_build_range(&mut self) -> RuntimeResult {
      let inclusive = self.current_frame_mut().next_byte() == 1;
      let end = pop_stack!(self);
      let start = pop_stack!(self);

      let (start, end) = match (start.as_int(), end.as_int()) {
         (Some(s), Some(e)) => (s, e),
         _ => {
            return self.runtime_error(
               RuntimeErrorType::TypeMismatch,
               String::from("Range bounds must be integers."),
            )
         }
      };

      let upper = if inclusive { end + 1 } else { end };
      let length = upper.saturating_sub(start);

      if length > 10_000_000 {
         return self.runtime_error(
            RuntimeErrorType::IndexOutOfBounds,
            String::from("Range is too large to materialize."),
         );
      }

      let elements = (start..upper).map(Value::Int).collect::<Vec<Value>>();
      self.push_stack(Value::array(elements));
      RuntimeResult::Continue
   }

   fn op_index_get(&mut self) -> RuntimeResult {
      let index = pop_stack!(self);
      let target = pop_stack!(self);

      let array = match target {
         Value::Array(a) => a,
         other => {
            return self.runtime_error(
               RuntimeErrorType::TypeMismatch,
               format!("Cannot index a value of type '{}'.", other.type_name()),
            )
         }
      };

      let idx = match index.as_int() {
         Some(i) => i,
         None => {
            return self.runtime_error(
               RuntimeErrorType::TypeMismatch,
               String::from("Array indices must be integers."),
            )
         }
      };

      let elements = array.borrow();
      if idx < 0 || idx as usize >= elements.len() {
         return self.runtime_error(
            RuntimeErrorType::IndexOutOfBounds,
            format!("Index {} is out of bounds (length {}).", idx, elements.len()),
         );
      }

      let value = elements[idx as usize].clone();
      drop(elements);
      self.push_stack(value);
      RuntimeResult::Continue
   }

   fn op_index_set(&mut self) -> RuntimeResult {
      let value = pop_stack!(self);
      let index = pop_stack!(self);
      let target = pop_stack!(self);

      let array = match target {
         Value::Array(a) => a,
         other => {
            return self.runtime_error(
               RuntimeErrorType::TypeMismatch,
               format!("Cannot index a value of type '{}'.", other.type_name()),
            )
         }
      };

      let idx = match index.as_int() {
         Some(i) => i,
         None => {
            return self.runtime_error(
               RuntimeErrorType::TypeMismatch,
               String::from("Array indices must be integers."),
            )
         }
      };

      let mut elements = array.borrow_mut();
      if idx < 0 || idx as usize >= elements.len() {
         return self.runtime_error(
            RuntimeErrorType::IndexOutOfBounds,
            format!("Index {} is out of bounds (length {}).", idx, elements.len()),
         );
      }

      elements[idx as usize] = value;
      RuntimeResult::Continue
   }

   fn op_array_append(&mut self) -> RuntimeResult {
      let value = pop_stack!(self);
      let target = pop_stack!(self);

      match target {
         Value::Array(a) => {
            a.borrow_mut().push(value);
            RuntimeResult::Continue
         }
         other => self.runtime_error(
            RuntimeErrorType::TypeMismatch,
            format!("Cannot append to a value of type '{}'.", other.type_name()),
         ),
      }
   }

   /// JOSA_CALL dispatches a named method through a postposition. Defined
   /// for array targets only; anything else is a type mismatch.
   fn op_josa_call(&mut self) -> RuntimeResult {
      let josa_byte = self.current_frame_mut().next_byte();
      let idx = self.current_frame_mut().next_byte() as usize;

      if crate::lexer::tokens::JosaKind::from_u8(josa_byte).is_none() {
         return self.runtime_error(
            RuntimeErrorType::TypeMismatch,
            String::from("Malformed bytecode: bad postposition kind."),
         );
      }

      let method = match self.current_frame().chunk.get_name(idx) {
         Some(n) => String::from(n),
         None => {
            return self.runtime_error(
               RuntimeErrorType::UndefinedName,
               String::from("Malformed bytecode: bad method name index."),
            )
         }
      };

      let target = pop_stack!(self);

      let array = match target {
         Value::Array(a) => a,
         other => {
            return self.runtime_error(
               RuntimeErrorType::TypeMismatch,
               format!(
                  "A postposition method does not apply to a value of type '{}'.",
                  other.type_name()
               ),
            )
         }
      };

      match method.as_str() {
         "정렬한다" | "정렬" => {
            let mut sorted = array.borrow().clone();
            sorted.sort_by(|a, b| match (a.as_int(), b.as_int()) {
               (Some(x), Some(y)) => x.cmp(&y),
               _ => std::cmp::Ordering::Equal,
            });
            self.push_stack(Value::array(sorted));
            RuntimeResult::Continue
         }
         "역순으로_나열한다" | "역순" => {
            let mut reversed = array.borrow().clone();
            reversed.reverse();
            self.push_stack(Value::array(reversed));
            RuntimeResult::Continue
         }
         other => self.runtime_error(
            RuntimeErrorType::UndefinedName,
            format!("Unknown array method '{}'.", other),
         ),
      }
   }

   /// CLASS_DEF pops the method (value, name) pairs and the field names
   /// pushed before it, then binds the finished class globally.
   fn op_class_def(&mut self) -> RuntimeResult {
      let name_idx = self.current_frame_mut().next_byte() as usize;
      let field_count = self.current_frame_mut().next_byte() as usize;
      let method_count = self.current_frame_mut().next_byte() as usize;

      let class_name = match self.current_frame().chunk.get_name(name_idx) {
         Some(n) => String::from(n),
         None => {
            return self.runtime_error(
               RuntimeErrorType::UndefinedName,
               String::from("Malformed bytecode: bad class name index."),
            )
         }
      };

      let mut methods = HashMap::new();
      let mut constructor = None;

      for _ in 0..method_count {
         let method_name = match pop_stack!(self) {
            Value::Str(s) => (*s).clone(),
            _ => {
               return self.runtime_error(
                  RuntimeErrorType::TypeMismatch,
                  String::from("Malformed bytecode: method name is not a string."),
               )
            }
         };
         let func = match pop_stack!(self) {
            Value::Function(f) => f,
            _ => {
               return self.runtime_error(
                  RuntimeErrorType::TypeMismatch,
                  String::from("Malformed bytecode: method body is not a function."),
               )
            }
         };

         if method_name == "생성자" {
            constructor = Some(func);
         } else {
            methods.insert(method_name, func);
         }
      }

      let mut fields = Vec::with_capacity(field_count);
      for _ in 0..field_count {
         match pop_stack!(self) {
            Value::Str(s) => fields.push((*s).clone()),
            _ => {
               return self.runtime_error(
                  RuntimeErrorType::TypeMismatch,
                  String::from("Malformed bytecode: field name is not a string."),
               )
            }
         }
      }
      fields.reverse();

      let class = ClassObj {
         name: class_name.clone(),
         fields,
         constructor,
         methods,
      };

      self.globals.define(
         crate::environment::Environment::GLOBAL,
         &class_name,
         Value::Class(Rc::new(class)),
      );

      RuntimeResult::Continue
   }

   fn op_load_field(&mut self) -> RuntimeResult {
      let idx = self.current_frame_mut().next_byte() as usize;
      let field = match self.current_frame().chunk.get_name(idx) {
         Some(n) => String::from(n),
         None => {
            return self.runtime_error(
               RuntimeErrorType::UndefinedName,
               String::from("Malformed bytecode: bad field name index."),
            )
         }
      };

      let target = pop_stack!(self);
      match target {
         Value::Instance(instance) => {
            let value = instance.borrow().fields.get(&field).cloned();
            match value {
               Some(v) => {
                  self.push_stack(v);
                  RuntimeResult::Continue
               }
               None => self.runtime_error(
                  RuntimeErrorType::UndefinedName,
                  format!("Unknown field '{}'.", field),
               ),
            }
         }
         other => self.runtime_error(
            RuntimeErrorType::TypeMismatch,
            format!("Cannot read a field of a value of type '{}'.", other.type_name()),
         ),
      }
   }

   fn op_store_field(&mut self) -> RuntimeResult {
      let idx = self.current_frame_mut().next_byte() as usize;
      let field = match self.current_frame().chunk.get_name(idx) {
         Some(n) => String::from(n),
         None => {
            return self.runtime_error(
               RuntimeErrorType::UndefinedName,
               String::from("Malformed bytecode: bad field name index."),
            )
         }
      };

      let value = pop_stack!(self);
      let target = pop_stack!(self);

      match target {
         Value::Instance(instance) => {
            instance.borrow_mut().fields.insert(field, value);
            RuntimeResult::Continue
         }
         other => self.runtime_error(
            RuntimeErrorType::TypeMismatch,
            format!("Cannot write a field of a value of type '{}'.", other.type_name()),
         ),
      }
   }

   fn op_call_method(&mut self) -> RuntimeResult {
      let idx = self.current_frame_mut().next_byte() as usize;
      let arg_count = self.current_frame_mut().next_byte();

      let method_name = match self.current_frame().chunk.get_name(idx) {
         Some(n) => String::from(n),
         None => {
            return self.runtime_error(
               RuntimeErrorType::UndefinedName,
               String::from("Malformed bytecode: bad method name index."),
            )
         }
      };

      let receiver = self.peek_stack(arg_count as usize).clone();
      let instance = match &receiver {
         Value::Instance(i) => Rc::clone(i),
         other => {
            return self.runtime_error(
               RuntimeErrorType::TypeMismatch,
               format!("Cannot call a method on a value of type '{}'.", other.type_name()),
            )
         }
      };

      let method = instance.borrow().class.methods.get(&method_name).cloned();
      match method {
         Some(func) => self.call_method(func, receiver, arg_count, FrameKind::Function),
         None => self.runtime_error(
            RuntimeErrorType::UndefinedName,
            format!(
               "'{}' has no method '{}'.",
               instance.borrow().class.name,
               method_name
            ),
         ),
      }
   }

   fn equality_operation(&mut self, op: OpCode) -> RuntimeResult {
      let b = pop_stack!(self);
      let a = pop_stack!(self);

      let equal = a.equals(&b);
      let result = match op {
         OpCode::Eq => equal,
         _ => !equal,
      };

      self.push_stack(Value::Bool(result));
      RuntimeResult::Continue
   }

   fn comparison_operation(&mut self, op: OpCode) -> RuntimeResult {
      let b = pop_stack!(self);
      let a = pop_stack!(self);

      let ordering = match a.compare(&b) {
         Some(o) => o,
         None => {
            return self.runtime_error(
               RuntimeErrorType::TypeMismatch,
               format!("Cannot compare '{}' with '{}'.", a.type_name(), b.type_name()),
            )
         }
      };

      let result = match op {
         OpCode::Lt => ordering == std::cmp::Ordering::Less,
         OpCode::Gt => ordering == std::cmp::Ordering::Greater,
         OpCode::Le => ordering != std::cmp::Ordering::Greater,
         _ => ordering != std::cmp::Ordering::Less,
      };

      self.push_stack(Value::Bool(result));
      RuntimeResult::Continue
   }

   fn logic_operation(&mut self, op: OpCode) -> RuntimeResult {
      let b = pop_stack!(self);
      let a = pop_stack!(self);

      let result = match op {
         OpCode::And => a.is_truthy() && b.is_truthy(),
         _ => a.is_truthy() || b.is_truthy(),
      };

      self.push_stack(Value::Bool(result));
      RuntimeResult::Continue
   }

   fn op_negate(&mut self) -> RuntimeResult {
      let value = pop_stack!(self);

      match value {
         Value::Int(v) => {
            self.push_stack(Value::Int(-v));
            RuntimeResult::Continue
         }
         Value::Float(v) => {
            self.push_stack(Value::Float(-v));
            RuntimeResult::Continue
         }
         other => self.runtime_error(
            RuntimeErrorType::TypeMismatch,
            format!("Cannot negate a value of type '{}'.", other.type_name()),
         ),
      }
   }
}
