use hashbrown::HashMap;

use crate::bytecode::chunk::Chunk;
use crate::bytecode::OpCode;
use crate::jit::hot_path::HOT_THRESHOLD;
use crate::objects::Value;

/// Largest callee body, in bytes, eligible for inlining.
pub const MAX_INLINE_SIZE: usize = 50;
/// Transform passes over one region; each pass may expose new call sites.
pub const MAX_INLINE_DEPTH: usize = 3;
/// Cumulative bytes of callee bodies inlined into one region.
pub const MAX_TOTAL_INLINE_SIZE: usize = 200;
/// Largest complexity score eligible for tier-2.
pub const MAX_COMPLEXITY: i64 = 100;

/// Everything the tier-2 pipeline knows about one function region.
pub struct FunctionMetadata {
   pub function_id: usize,
   pub bytecode_offset: usize,
   pub bytecode_size: usize,
   pub execution_count: u64,
   pub opcodes: Vec<OpCode>,
   pub opcode_count: HashMap<OpCode, usize>,
   pub has_loops: bool,
   pub has_recursion: bool,
   pub has_conditionals: bool,
   pub has_function_calls: bool,
   pub param_count: u8,
   /// Highest LOAD_VAR/STORE_VAR slot touched, if any.
   pub max_slot: Option<u8>,
   /// Operand slot of every LOAD_VAR, in instruction order. The opcode
   /// sequence alone cannot distinguish `a + b` from `b + a`.
   pub load_var_slots: Vec<u8>,
   pub has_store_var: bool,
   /// Opcodes the transformer refuses to move (handlers, imports, class
   /// machinery).
   pub has_unsupported: bool,
}

impl FunctionMetadata {
   /// Complexity score: size plus weighted structural features. Lower is
   /// simpler.
   pub fn complexity_score(&self) -> i64 {
      let mut score = self.bytecode_size as i64;

      if self.has_loops {
         score += 20;
      }
      if self.has_recursion {
         score += 50;
      }
      if self.has_conditionals {
         score += 5;
      }
      if self.has_function_calls {
         score += 10;
      }

      score
   }

   /// A function with no global reads or writes is pure for the purposes
   /// of constant folding.
   pub fn is_pure(&self) -> bool {
      !self.opcode_count.contains_key(&OpCode::LoadGlobal)
         && !self.opcode_count.contains_key(&OpCode::StoreGlobal)
   }

   /// The canonical two-parameter arithmetic shape:
   /// `LOAD_VAR 0; LOAD_VAR 1; <arith>; RETURN`, with the loads in
   /// exactly that slot order. A body like `반환 b - a` loads slots 1
   /// then 0 and must never fold as `a - b`, so any other slot order or
   /// slot set is rejected.
   pub fn fold_shape(&self) -> Option<OpCode> {
      if self.opcodes.len() != 4 {
         return None;
      }

      if self.load_var_slots != [0, 1] {
         return None;
      }

      match (self.opcodes[0], self.opcodes[1], self.opcodes[2], self.opcodes[3]) {
         (OpCode::LoadVar, OpCode::LoadVar, arith, OpCode::Return)
            if matches!(arith, OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Mod) =>
         {
            Some(arith)
         }
         _ => None,
      }
   }
}

/// Inlining priority: candidates are processed High to Low within the
/// cumulative size budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum InlinePriority {
   None,
   Low,
   Medium,
   High,
}

/// A CALL instruction inside a region, with whatever the analyzer could
/// prove about its callee and arguments.
pub struct CallSite {
   /// Region-relative offset of the CALL opcode.
   pub call_offset: usize,
   /// Region-relative offset of the LOAD_GLOBAL that pushes the callee,
   /// when the site follows the analyzable shape.
   pub window_start: Option<usize>,
   /// Chunk entry offset of the resolved callee.
   pub callee_entry: Option<usize>,
   pub arg_count: u8,
   pub constant_args: Vec<Value>,
   pub has_constant_args: bool,
}

/// Decides what may be inlined and in what order.
pub struct InliningAnalyzer;

impl InliningAnalyzer {
   pub fn new() -> InliningAnalyzer {
      InliningAnalyzer
   }

   /// Walks `[start, end)` of the chunk collecting opcodes, a histogram,
   /// and the structural flags inlining decisions depend on.
   pub fn collect_metadata(
      &self,
      chunk: &Chunk,
      start: usize,
      end: usize,
      function_id: usize,
      param_count: u8,
      execution_count: u64,
      self_name: &str,
   ) -> FunctionMetadata {
      let mut meta = FunctionMetadata {
         function_id,
         bytecode_offset: start,
         bytecode_size: end.saturating_sub(start),
         execution_count,
         opcodes: vec![],
         opcode_count: HashMap::new(),
         has_loops: false,
         has_recursion: false,
         has_conditionals: false,
         has_function_calls: false,
         param_count,
         max_slot: None,
         load_var_slots: vec![],
         has_store_var: false,
         has_unsupported: false,
      };

      let mut ip = start;
      let mut loads_self = false;

      while ip < end {
         let op = match chunk.op_at(ip) {
            Some(op) => op,
            None => {
               meta.has_unsupported = true;
               break;
            }
         };

         meta.opcodes.push(op);
         *meta.opcode_count.entry(op).or_insert(0) += 1;

         match op {
            OpCode::Loop => {
               // A backward jump landing inside the region marks a loop.
               let distance = chunk.try_read(ip + 1).unwrap_or(0) as usize;
               let target = (ip + 2).saturating_sub(distance);
               if target >= start {
                  meta.has_loops = true;
               }
            }
            OpCode::JumpIfFalse | OpCode::JumpIfTrue => meta.has_conditionals = true,
            OpCode::Call | OpCode::TailCall | OpCode::CallMethod => {
               meta.has_function_calls = true;
            }
            OpCode::LoadGlobal => {
               let idx = chunk.try_read(ip + 1).unwrap_or(0) as usize;
               if chunk.get_name(idx) == Some(self_name) {
                  loads_self = true;
               }
            }
            OpCode::LoadVar | OpCode::StoreVar => {
               let slot = chunk.try_read(ip + 1).unwrap_or(0);
               meta.max_slot = Some(meta.max_slot.map_or(slot, |m| m.max(slot)));
               if op == OpCode::StoreVar {
                  meta.has_store_var = true;
               } else {
                  meta.load_var_slots.push(slot);
               }
            }
            OpCode::SetupCatch
            | OpCode::EndCatch
            | OpCode::Throw
            | OpCode::Import
            | OpCode::ClassDef
            | OpCode::BuildFunction => meta.has_unsupported = true,
            _ => {}
         }

         ip += 1 + op.operand_count();
      }

      // Direct recursion: the region loads its own global name and calls.
      // Conservative by design — loading self without calling it also
      // disqualifies the region.
      meta.has_recursion = meta.has_function_calls && loads_self;

      meta
   }

   /// Tier-2 eligibility: small, hot, non-recursive, simple.
   pub fn can_inline(&self, meta: &FunctionMetadata) -> bool {
      meta.bytecode_size <= MAX_INLINE_SIZE
         && meta.execution_count >= HOT_THRESHOLD
         && !meta.has_recursion
         && meta.complexity_score() <= MAX_COMPLEXITY
   }

   /// Classifies an eligible candidate for inlining order.
   pub fn inline_priority(&self, meta: &FunctionMetadata) -> InlinePriority {
      if meta.has_loops {
         return InlinePriority::Low;
      }

      if meta.bytecode_size <= 10 && !meta.has_conditionals {
         return InlinePriority::High;
      }

      InlinePriority::Medium
   }

   /// Scans a code region for CALL sites, recording for each whether the
   /// preceding instructions form the analyzable shape
   /// `LOAD_GLOBAL f; LOAD_CONST a1; …; LOAD_CONST a_argc; CALL argc`.
   pub fn find_call_sites(
      &self,
      code: &[u8],
      chunk: &Chunk,
      extra_constants: &[Value],
   ) -> Vec<CallSite> {
      let mut sites = vec![];
      // (offset, op, operand) history of decoded instructions.
      let mut history: Vec<(usize, OpCode, u8)> = vec![];

      let mut ip = 0;
      while ip < code.len() {
         let op: OpCode = match num_traits::FromPrimitive::from_u8(code[ip]) {
            Some(op) => op,
            None => break,
         };
         let operand = if op.operand_count() >= 1 && ip + 1 < code.len() {
            code[ip + 1]
         } else {
            0
         };

         if let OpCode::Call | OpCode::TailCall = op {
            let argc = operand as usize;
            let site = self.analyze_call_site(&history, ip, argc, chunk, extra_constants);
            sites.push(site);
         }

         history.push((ip, op, operand));
         ip += 1 + op.operand_count();
      }

      sites
   }

   /// Inspects the instructions preceding a CALL: when the last `argc` of
   /// them are constant loads pushed right after the callee's global
   /// load, the site carries constant arguments.
   fn analyze_call_site(
      &self,
      history: &[(usize, OpCode, u8)],
      call_offset: usize,
      argc: usize,
      chunk: &Chunk,
      extra_constants: &[Value],
   ) -> CallSite {
      let mut site = CallSite {
         call_offset,
         window_start: None,
         callee_entry: None,
         arg_count: argc as u8,
         constant_args: vec![],
         has_constant_args: false,
      };

      if history.len() < argc + 1 {
         return site;
      }

      let args = &history[history.len() - argc..];
      let (callee_off, callee_op, callee_operand) = history[history.len() - argc - 1];

      if callee_op != OpCode::LoadGlobal {
         return site;
      }

      let callee_name = match chunk.get_name(callee_operand as usize) {
         Some(n) => n,
         None => return site,
      };
      let span = chunk.function_spans().iter().find(|s| s.name == callee_name);

      site.window_start = Some(callee_off);
      site.callee_entry = span.map(|s| s.entry);

      let mut constant_args = vec![];
      for (_, op, operand) in args {
         if *op != OpCode::LoadConst {
            return site;
         }

         let idx = *operand as usize;
         let value = chunk
            .get_constant(idx)
            .cloned()
            .or_else(|| extra_constants.get(idx.wrapping_sub(chunk.constants().len())).cloned());

         match value {
            Some(v) => constant_args.push(v),
            None => return site,
         }
      }

      site.constant_args = constant_args;
      site.has_constant_args = argc > 0;
      site
   }
}

impl Default for InliningAnalyzer {
   fn default() -> Self {
      InliningAnalyzer::new()
   }
}
