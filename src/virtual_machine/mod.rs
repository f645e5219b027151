use std::rc::Rc;
use std::time::Instant;

use hashbrown::HashMap;
use log::debug;

use crate::bytecode::chunk::Chunk;
use crate::environment::Environment;
use crate::errors::{LimitKind, RuntimeError, RuntimeErrorType};
use crate::jit::hot_path::HOT_THRESHOLD;
use crate::jit::JitRuntime;
use crate::lexer::morphology::Dictionary;
use crate::module_loader::ModuleLoader;
use crate::natives::Natives;
use crate::objects::{ClassObj, FunctionObj, InstanceObj, Value};
use crate::virtual_machine::call_frame::{CallFrame, FrameKind};

// Submodules
mod arithmetic;
pub mod call_frame;
mod run;

/// Runtime safety limits. The loop checks all three before every
/// instruction; wall time is sampled every `TIME_SAMPLE_INTERVAL`
/// instructions to keep the check off the hot path.
#[derive(Clone, Copy, Debug)]
pub struct RuntimeLimits {
   pub max_instructions: u64,
   pub max_time_ms: u64,
   pub max_stack_depth: usize,
}

impl Default for RuntimeLimits {
   fn default() -> Self {
      RuntimeLimits {
         max_instructions: 10_000_000,
         max_time_ms: 5_000,
         max_stack_depth: 65_536,
      }
   }
}

pub(crate) const TIME_SAMPLE_INTERVAL: u64 = 256;

/// The result of executing one instruction.
pub enum RuntimeResult {
   Continue,
   /// The program finished with this value.
   End(Value),
   Error {
      error: RuntimeErrorType,
      message: String,
   },
}

/// An installed 시도 handler: where to land, and how much machinery to
/// unwind before landing there.
struct CatchHandler {
   target_ip: usize,
   stack_size: usize,
   frame_depth: usize,
}

/// Represents the Sejong virtual machine: a value stack, a frame stack,
/// and a global environment, executing one chunk at a time. Strictly
/// single-threaded and cooperative; every observable side effect occurs
/// in bytecode order.
pub struct VM {
   pub(crate) stack: Vec<Value>,
   pub(crate) frames: Vec<CallFrame>,
   pub(crate) globals: Environment,
   pub(crate) natives: Natives,
   pub(crate) jit: JitRuntime,
   limits: RuntimeLimits,
   instruction_count: u64,
   start_time: Option<Instant>,
   handlers: Vec<CatchHandler>,
   module_loader: ModuleLoader,
   dictionary: Rc<Dictionary>,
   /// Offset of the instruction currently executing, for error lines.
   op_ip: usize,
   /// When set, PRINT output is collected here instead of stdout.
   capture: Option<Vec<String>>,
}

impl VM {
   pub fn new(dictionary: Rc<Dictionary>) -> VM {
      let mut globals = Environment::new();
      for (name, value) in Natives::builtin_variables() {
         globals.define(Environment::GLOBAL, name, value);
      }

      VM {
         stack: Vec::with_capacity(256),
         frames: Vec::with_capacity(64),
         globals,
         natives: Natives::default(),
         jit: JitRuntime::new(),
         limits: RuntimeLimits::default(),
         instruction_count: 0,
         start_time: None,
         handlers: vec![],
         module_loader: ModuleLoader::new(),
         dictionary,
         op_ip: 0,
         capture: None,
      }
   }

   /// Collects PRINT output for inspection instead of writing stdout.
   pub fn enable_output_capture(&mut self) {
      self.capture = Some(vec![]);
   }

   pub fn captured_output(&self) -> &[String] {
      match &self.capture {
         Some(lines) => lines,
         None => &[],
      }
   }

   pub(crate) fn write_output(&mut self, line: String) {
      match &mut self.capture {
         Some(lines) => lines.push(line),
         None => println!("{}", line),
      }
   }

   // Limit setters; implementations must expose all three.

   pub fn set_max_instructions(&mut self, max: u64) {
      self.limits.max_instructions = max;
   }

   pub fn set_max_execution_time_ms(&mut self, max: u64) {
      self.limits.max_time_ms = max;
   }

   pub fn set_max_stack_depth(&mut self, max: usize) {
      self.limits.max_stack_depth = max;
   }

   pub fn limits(&self) -> RuntimeLimits {
      self.limits
   }

   pub fn instruction_count(&self) -> u64 {
      self.instruction_count
   }

   /// Executes a chunk to completion. The global environment persists
   /// across calls, which is what the REPL relies on.
   pub fn run(&mut self, chunk: Rc<Chunk>) -> Result<Value, RuntimeError> {
      self.frames.push(CallFrame {
         kind: FrameKind::Script,
         chunk,
         ip: 0,
         stack_base: self.stack.len(),
         function: None,
         this: None,
         region: None,
      });

      // Limits apply per run.
      self.instruction_count = 0;
      self.start_time = Some(Instant::now());

      let result = self.execute();

      // A failed run leaves no residue behind for the next REPL input.
      if result.is_err() {
         self.stack.clear();
         self.frames.clear();
         self.handlers.clear();
      }

      result
   }

   // ---------------------------------------------------------------------
   // Stack and frame helpers
   // ---------------------------------------------------------------------

   pub(crate) fn current_frame(&self) -> &CallFrame {
      self.frames.last().expect("the VM always runs inside a frame")
   }

   pub(crate) fn current_frame_mut(&mut self) -> &mut CallFrame {
      self.frames.last_mut().expect("the VM always runs inside a frame")
   }

   pub(crate) fn push_stack(&mut self, value: Value) {
      self.stack.push(value);
   }

   pub(crate) fn peek_stack(&self, distance: usize) -> &Value {
      &self.stack[self.stack.len() - 1 - distance]
   }

   /// The source line of the instruction currently executing.
   pub(crate) fn current_line(&self) -> usize {
      self.current_frame().line_at(self.op_ip)
   }

   pub(crate) fn runtime_error(&self, error: RuntimeErrorType, message: String) -> RuntimeResult {
      RuntimeResult::Error { error, message }
   }

   // ---------------------------------------------------------------------
   // Limit checks
   // ---------------------------------------------------------------------

   /// Checked before every instruction. Limit breaches are not catchable
   /// by 시도 handlers.
   pub(crate) fn check_limits(&self) -> Option<RuntimeResult> {
      if self.stack.len() >= self.limits.max_stack_depth {
         return Some(RuntimeResult::Error {
            error: RuntimeErrorType::RuntimeLimitExceeded(LimitKind::StackDepth),
            message: format!("Stack depth limit ({}) exceeded.", self.limits.max_stack_depth),
         });
      }

      if self.instruction_count >= self.limits.max_instructions {
         return Some(RuntimeResult::Error {
            error: RuntimeErrorType::RuntimeLimitExceeded(LimitKind::Instructions),
            message: format!("Instruction limit ({}) exceeded.", self.limits.max_instructions),
         });
      }

      if self.instruction_count % TIME_SAMPLE_INTERVAL == 0 {
         if let Some(start) = self.start_time {
            if start.elapsed().as_millis() as u64 >= self.limits.max_time_ms {
               return Some(RuntimeResult::Error {
                  error: RuntimeErrorType::RuntimeLimitExceeded(LimitKind::Time),
                  message: format!("Execution time limit ({} ms) exceeded.", self.limits.max_time_ms),
               });
            }
         }
      }

      None
   }

   pub(crate) fn count_instruction(&mut self) {
      self.instruction_count += 1;
   }

   // ---------------------------------------------------------------------
   // Calls
   // ---------------------------------------------------------------------

   /// Dispatches a CALL. The callable sits below its arguments; after the
   /// call completes, callable and arguments are gone and one result
   /// value stands in their place.
   pub(crate) fn call_value(&mut self, callee: Value, arg_count: u8) -> RuntimeResult {
      match callee {
         Value::Function(f) => self.call_function(f, arg_count),
         Value::Native(n) => {
            let mut args = Vec::with_capacity(arg_count as usize);
            for _ in 0..arg_count {
               match self.stack.pop() {
                  Some(v) => args.push(v),
                  None => {
                     return self.runtime_error(
                        RuntimeErrorType::StackUnderflow,
                        String::from("Value stack underflow in native call."),
                     )
                  }
               }
            }
            args.reverse();

            match Natives::call(&n, args) {
               Ok(result) => {
                  self.stack.pop(); // the native function itself
                  self.push_stack(result);
                  RuntimeResult::Continue
               }
               Err(e) => self.runtime_error(e.error, e.message),
            }
         }
         Value::Class(class) => self.create_instance(class, arg_count),
         other => self.runtime_error(
            RuntimeErrorType::NotCallable,
            format!("Cannot call a value of type '{}'.", other.type_name()),
         ),
      }
   }

   /// Calls a user function, consulting the hot-path detector and the JIT
   /// tiers before falling back to an interpreted frame.
   pub(crate) fn call_function(&mut self, func: Rc<FunctionObj>, arg_count: u8) -> RuntimeResult {
      if arg_count != func.arity {
         return self.runtime_error(
            RuntimeErrorType::ArityMismatch,
            format!("'{}' expects {} arguments but got {}.", func.name, func.arity, arg_count),
         );
      }

      let count = self.jit.detector.record(&func);
      if count >= HOT_THRESHOLD {
         self.jit.promote(&func, count);
      }

      // Tier-2 fold plan: with integer arguments the call completes with
      // zero callee instructions.
      if let Some(result) = self.jit.try_fold_call(&func, &self.stack) {
         self.stack.truncate(self.stack.len() - arg_count as usize);
         self.stack.pop(); // the callee
         self.push_stack(result);
         return RuntimeResult::Continue;
      }

      // Tier-2 inlined body: run the transformed copy in a normal frame.
      if let Some(region) = self.jit.optimized_region(&func) {
         self.frames.push(CallFrame {
            kind: FrameKind::Function,
            chunk: Rc::clone(&func.chunk),
            ip: 0,
            stack_base: self.stack.len() - arg_count as usize,
            function: Some(func),
            this: None,
            region: Some(region),
         });
         return RuntimeResult::Continue;
      }

      // Tier-1 template over the integer stack window.
      if let Some(result) = self.jit.try_template_call(&func, &self.stack) {
         self.stack.truncate(self.stack.len() - arg_count as usize);
         self.stack.pop();
         self.push_stack(Value::Int(result));
         return RuntimeResult::Continue;
      }

      let entry = func.entry;
      let chunk = Rc::clone(&func.chunk);
      self.frames.push(CallFrame {
         kind: FrameKind::Function,
         chunk,
         ip: entry,
         stack_base: self.stack.len() - arg_count as usize,
         function: Some(func),
         this: None,
         region: None,
      });

      RuntimeResult::Continue
   }

   /// Calls a method with its receiver bound as 자신.
   pub(crate) fn call_method(
      &mut self,
      func: Rc<FunctionObj>,
      this: Value,
      arg_count: u8,
      kind: FrameKind,
   ) -> RuntimeResult {
      if arg_count != func.arity {
         return self.runtime_error(
            RuntimeErrorType::ArityMismatch,
            format!("'{}' expects {} arguments but got {}.", func.name, func.arity, arg_count),
         );
      }

      let entry = func.entry;
      let chunk = Rc::clone(&func.chunk);
      self.frames.push(CallFrame {
         kind,
         chunk,
         ip: entry,
         stack_base: self.stack.len() - arg_count as usize,
         function: Some(func),
         this: Some(this),
         region: None,
      });

      RuntimeResult::Continue
   }

   /// Instantiates a class: fields default to null, then the 생성자 runs
   /// with 자신 bound to the new instance.
   fn create_instance(&mut self, class: Rc<ClassObj>, arg_count: u8) -> RuntimeResult {
      let mut fields = HashMap::new();
      for field in &class.fields {
         fields.insert(field.clone(), Value::Null);
      }

      let instance = Value::Instance(Rc::new(std::cell::RefCell::new(InstanceObj {
         class: Rc::clone(&class),
         fields,
      })));

      match &class.constructor {
         Some(ctor) => {
            self.call_method(Rc::clone(ctor), instance, arg_count, FrameKind::Constructor)
         }
         None => {
            if arg_count != 0 {
               return self.runtime_error(
                  RuntimeErrorType::ArityMismatch,
                  format!("'{}' has no 생성자 and takes no arguments.", class.name),
               );
            }
            self.stack.pop(); // the class value
            self.push_stack(instance);
            RuntimeResult::Continue
         }
      }
   }

   // ---------------------------------------------------------------------
   // Exception handlers
   // ---------------------------------------------------------------------

   pub(crate) fn push_handler(&mut self, target_ip: usize) {
      self.handlers.push(CatchHandler {
         target_ip,
         stack_size: self.stack.len(),
         frame_depth: self.frames.len(),
      });
   }

   pub(crate) fn pop_handler(&mut self) {
      self.handlers.pop();
   }

   /// Drops handlers whose owning frame is gone.
   pub(crate) fn prune_handlers(&mut self) {
      let depth = self.frames.len();
      self.handlers.retain(|h| h.frame_depth <= depth);
   }

   /// Unwinds to the innermost 시도 handler, pushing the raised error as a
   /// value. Limit breaches are never caught.
   pub(crate) fn unwind_to_handler(&mut self, error: RuntimeErrorType, message: &str) -> bool {
      if let RuntimeErrorType::RuntimeLimitExceeded(_) = error {
         return false;
      }

      let handler = match self.handlers.pop() {
         Some(h) => h,
         None => return false,
      };

      debug!("unwinding to handler at ip {}", handler.target_ip);

      self.frames.truncate(handler.frame_depth);
      self.stack.truncate(handler.stack_size);
      self.current_frame_mut().ip = handler.target_ip;

      self.push_stack(Value::Error(Rc::new(crate::objects::ErrorObj {
         kind: String::from(error.name()),
         message: String::from(message),
      })));

      true
   }

   // ---------------------------------------------------------------------
   // Modules
   // ---------------------------------------------------------------------

   pub(crate) fn import_module(&mut self, path: &str) -> RuntimeResult {
      let dictionary = Rc::clone(&self.dictionary);
      match self.module_loader.load(path, &dictionary) {
         Ok(Some(chunk)) => {
            self.frames.push(CallFrame {
               kind: FrameKind::Module,
               chunk,
               ip: 0,
               stack_base: self.stack.len(),
               function: None,
               this: None,
               region: None,
            });
            RuntimeResult::Continue
         }
         Ok(None) => RuntimeResult::Continue,
         Err(message) => self.runtime_error(RuntimeErrorType::UndefinedName, message),
      }
   }
}
