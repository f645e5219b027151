use std::rc::Rc;

use log::debug;

use crate::bytecode::OpCode;
use crate::jit::hot_path::{CompileTier, HotPathDetector, HOT_THRESHOLD};
use crate::jit::tier1::JitCompilerT1;
use crate::jit::tier2::{JitCompilerT2, OptimizedRegion};
use crate::objects::{FunctionObj, Value};

// Submodules
pub mod hot_path;
pub mod inline_analyzer;
pub mod inline_transformer;
pub mod tier1;
pub mod tier2;

/// Identity of a hot bytecode region: the owning chunk and the function's
/// entry/end offsets within it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegionKey {
   pub chunk: usize,
   pub start: usize,
   pub end: usize,
}

impl RegionKey {
   pub fn of(func: &FunctionObj) -> RegionKey {
      RegionKey {
         chunk: Rc::as_ptr(&func.chunk) as usize,
         start: func.entry,
         end: func.end,
      }
   }
}

/// Counters exposed for tests and diagnostics.
#[derive(Default)]
pub struct JitStats {
   /// Calls answered by a tier-2 fold with zero callee instructions.
   pub folded_calls: u64,
   /// Calls answered by a tier-1 template.
   pub template_calls: u64,
   /// Frames entered through a tier-2 inlined body.
   pub inlined_frames: u64,
}

/// Owns the detector, both compiler tiers, and every handle they issue.
/// Installation is atomic from the VM's perspective: a CALL sees either
/// the old entry or the new one, never a torn state. Handles die with
/// this runtime.
pub struct JitRuntime {
   pub detector: HotPathDetector,
   pub tier1: JitCompilerT1,
   pub tier2: JitCompilerT2,
   pub stats: JitStats,
   /// Scratch integer stack for template execution.
   scratch: Vec<i64>,
}

impl JitRuntime {
   pub fn new() -> JitRuntime {
      JitRuntime {
         detector: HotPathDetector::new(),
         tier1: JitCompilerT1::new(),
         tier2: JitCompilerT2::new(),
         stats: JitStats::default(),
         scratch: vec![0; 256],
      }
   }

   /// Tier promotion, called when a function's invocation count reaches
   /// the threshold. The 100th call compiles a tier-1 template; calls
   /// beyond that run the tier-2 pipeline once, and a successful tier-2
   /// plan evicts the tier-1 entry for the region.
   pub fn promote(&mut self, func: &FunctionObj, count: u64) {
      let key = RegionKey::of(func);

      if count == HOT_THRESHOLD {
         if self.tier1.compile_function(&func.chunk, key) {
            self.detector.set_tier(&key, CompileTier::Tier1);
            debug!("'{}' promoted to tier-1 after {} calls", func.name, count);
         }
         return;
      }

      if count > HOT_THRESHOLD && !self.tier2.attempted(&key) {
         if self.tier2.compile(func, count, &self.detector) {
            self.tier1.remove(&key);
            self.detector.set_tier(&key, CompileTier::Tier2);
            debug!("'{}' promoted to tier-2 after {} calls", func.name, count);
         }
      }
   }

   /// Applies a tier-2 fold plan to a call whose arguments sit on top of
   /// the value stack. A plan is only ever installed for the slot-exact
   /// canonical body `LOAD_VAR 0; LOAD_VAR 1; <arith>; RETURN`, so the
   /// first argument is always the left operand. Succeeds only when every
   /// argument is an integer and the operation is defined for them;
   /// otherwise the caller falls back to the ordinary call path.
   pub fn try_fold_call(&mut self, func: &FunctionObj, stack: &[Value]) -> Option<Value> {
      let key = RegionKey::of(func);
      let arith = self.tier2.fold_op(&key)?;

      let argc = func.arity as usize;
      if stack.len() < argc || argc != 2 {
         return None;
      }

      let args = &stack[stack.len() - argc..];
      let (a, b) = match (args[0].as_int(), args[1].as_int()) {
         (Some(a), Some(b)) => (a, b),
         _ => return None,
      };

      let result = match arith {
         OpCode::Add => a.wrapping_add(b),
         OpCode::Sub => a.wrapping_sub(b),
         OpCode::Mul => a.wrapping_mul(b),
         OpCode::Div => {
            if b == 0 {
               return None;
            }
            a.wrapping_div(b)
         }
         OpCode::Mod => {
            if b == 0 {
               return None;
            }
            a.wrapping_rem(b)
         }
         _ => return None,
      };

      self.stats.folded_calls += 1;
      Some(Value::Int(result))
   }

   /// The tier-2 inlined body for a region, if one is installed.
   pub fn optimized_region(&mut self, func: &FunctionObj) -> Option<Rc<OptimizedRegion>> {
      let key = RegionKey::of(func);
      let region = self.tier2.region(&key)?;
      self.stats.inlined_frames += 1;
      Some(region)
   }

   /// Runs a tier-1 template for a call whose arguments sit on top of the
   /// value stack. All arguments must be integers; a template trap falls
   /// back to interpretation.
   pub fn try_template_call(&mut self, func: &FunctionObj, stack: &[Value]) -> Option<i64> {
      let key = RegionKey::of(func);

      let argc = func.arity as usize;
      if stack.len() < argc || !self.tier1.contains(&key) {
         return None;
      }

      for (i, arg) in stack[stack.len() - argc..].iter().enumerate() {
         self.scratch[i] = arg.as_int()?;
      }

      let template = self.tier1.get_mut(&key)?;
      let result = template.invoke(&mut self.scratch, argc)?;
      template.execution_count += 1;

      self.stats.template_calls += 1;
      Some(result)
   }
}

impl Default for JitRuntime {
   fn default() -> Self {
      JitRuntime::new()
   }
}
