use std::rc::Rc;

use hashbrown::HashMap;
use log::debug;

use crate::bytecode::chunk::{Chunk, FunctionSpan};
use crate::bytecode::OpCode;
use crate::jit::hot_path::HotPathDetector;
use crate::jit::inline_analyzer::{
   CallSite, FunctionMetadata, InliningAnalyzer, MAX_INLINE_DEPTH, MAX_TOTAL_INLINE_SIZE,
};
use crate::jit::inline_transformer::InliningTransformer;
use crate::jit::RegionKey;
use crate::objects::{FunctionObj, Value};

/// A transformed copy of a function body, published atomically into the
/// tier-2 cache. Executes in a normal frame against the original chunk's
/// pools; constants the transform introduced live in `extra_constants`
/// and are addressed past the chunk pool.
pub struct OptimizedRegion {
   pub code: Vec<u8>,
   pub extra_constants: Vec<Value>,
}

/// What tier-2 decided for a hot region.
pub enum Tier2Plan {
   /// The callee is the canonical two-parameter arithmetic shape; calls
   /// with integer arguments complete without executing the callee.
   Fold(OpCode),
   /// An inlined variant of the body replaces the interpreted one.
   Inlined(Rc<OptimizedRegion>),
}

/// The tier-2 JIT: inlining-driven optimization of hot regions. Any
/// analyzer or transformer failure is non-fatal — the region simply keeps
/// its tier-1 template or stays interpreted.
pub struct JitCompilerT2 {
   analyzer: InliningAnalyzer,
   transformer: InliningTransformer,
   /// Attempted regions; `None` marks an ineligible or failed attempt so
   /// it is never retried.
   plans: HashMap<RegionKey, Option<Tier2Plan>>,
   total_compilations: u64,
   successful_compilations: u64,
   total_inlined_functions: u64,
   total_bytecode_reduction: u64,
}

impl JitCompilerT2 {
   pub fn new() -> JitCompilerT2 {
      JitCompilerT2 {
         analyzer: InliningAnalyzer::new(),
         transformer: InliningTransformer::new(),
         plans: HashMap::new(),
         total_compilations: 0,
         successful_compilations: 0,
         total_inlined_functions: 0,
         total_bytecode_reduction: 0,
      }
   }

   pub fn attempted(&self, key: &RegionKey) -> bool {
      self.plans.contains_key(key)
   }

   pub fn fold_op(&self, key: &RegionKey) -> Option<OpCode> {
      match self.plans.get(key) {
         Some(Some(Tier2Plan::Fold(op))) => Some(*op),
         _ => None,
      }
   }

   pub fn region(&self, key: &RegionKey) -> Option<Rc<OptimizedRegion>> {
      match self.plans.get(key) {
         Some(Some(Tier2Plan::Inlined(region))) => Some(Rc::clone(region)),
         _ => None,
      }
   }

   /// Analyzes a hot function and, when it qualifies, publishes a plan.
   ///
   /// # Returns
   /// `bool`: Whether a tier-2 plan now exists for the region.
   pub fn compile(
      &mut self,
      func: &FunctionObj,
      execution_count: u64,
      detector: &HotPathDetector,
   ) -> bool {
      let key = RegionKey::of(func);
      self.total_compilations += 1;

      let meta = self.analyzer.collect_metadata(
         &func.chunk,
         func.entry,
         func.end,
         func.id,
         func.arity,
         execution_count,
         &func.name,
      );

      if meta.has_unsupported || !self.analyzer.can_inline(&meta) {
         debug!("tier-2: '{}' is not eligible (score {})", func.name, meta.complexity_score());
         self.plans.insert(key, None);
         return false;
      }

      if let Some(arith) = meta.fold_shape() {
         debug!("tier-2: fold plan installed for '{}'", func.name);
         self.plans.insert(key, Some(Tier2Plan::Fold(arith)));
         self.successful_compilations += 1;
         return true;
      }

      match self.transform_region(&func.chunk, func, detector) {
         Some((region, inlined, reduction)) => {
            debug!(
               "tier-2: inlined variant for '{}' ({} call sites, {} bytes saved)",
               func.name, inlined, reduction
            );
            self.total_inlined_functions += inlined as u64;
            self.total_bytecode_reduction += reduction as u64;
            self.successful_compilations += 1;
            self.plans.insert(key, Some(Tier2Plan::Inlined(Rc::new(region))));
            true
         }
         None => {
            self.plans.insert(key, None);
            false
         }
      }
   }

   /// The transformer pipeline: up to `MAX_INLINE_DEPTH` passes of
   /// call-site inlining within the cumulative size budget, then
   /// dead-code elimination. Transactional — every edit happens on a
   /// copy, and a failed pass abandons the whole transform.
   fn transform_region(
      &mut self,
      chunk: &Chunk,
      func: &FunctionObj,
      detector: &HotPathDetector,
   ) -> Option<(OptimizedRegion, usize, usize)> {
      let mut code = chunk.code()[func.entry..func.end].to_vec();
      let mut extras: Vec<Value> = vec![];
      let original_size = code.len();

      let mut budget = MAX_TOTAL_INLINE_SIZE;
      let mut inlined_count = 0usize;

      for _pass in 0..MAX_INLINE_DEPTH {
         let applied = self.inline_pass(chunk, func, detector, &mut code, &mut extras, &mut budget)?;
         if applied == 0 {
            break;
         }
         inlined_count += applied;
      }

      if inlined_count == 0 {
         return None;
      }

      // Dead-code elimination with jump fixup over the transformed copy.
      let instrs = self.transformer.decode(&code)?;
      let (kept, _removed) = self.transformer.eliminate_dead_code(&instrs)?;
      code = self.transformer.encode(&kept)?;

      let reduction = original_size.saturating_sub(code.len());
      Some((
         OptimizedRegion {
            code,
            extra_constants: extras,
         },
         inlined_count,
         reduction,
      ))
   }

   /// One pass: find candidate call sites, pick them in priority order
   /// within the budget, and splice their callee bodies in.
   fn inline_pass(
      &mut self,
      chunk: &Chunk,
      func: &FunctionObj,
      detector: &HotPathDetector,
      code: &mut Vec<u8>,
      extras: &mut Vec<Value>,
      budget: &mut usize,
   ) -> Option<usize> {
      let instrs = self.transformer.decode(code)?;
      let offset_of = instruction_offsets(&instrs);
      let index_of: HashMap<usize, usize> = offset_of
         .iter()
         .enumerate()
         .map(|(i, off)| (*off, i))
         .collect();

      let sites = self.analyzer.find_call_sites(code, chunk, extras);

      // Gather viable candidates with their callee metadata.
      let mut candidates: Vec<(CallSite, FunctionSpan, FunctionMetadata)> = vec![];
      for site in sites {
         let callee_entry = match (site.window_start, site.callee_entry) {
            (Some(_), Some(entry)) => entry,
            _ => continue,
         };
         if !site.has_constant_args {
            continue;
         }

         let span = match chunk.span_at_entry(callee_entry) {
            Some(s) => s.clone(),
            None => continue,
         };
         if span.arity != site.arg_count || (span.entry, span.end) == (func.entry, func.end) {
            continue;
         }

         let callee_count = detector.count(&RegionKey {
            chunk: Rc::as_ptr(&func.chunk) as usize,
            start: span.entry,
            end: span.end,
         });

         let cmeta = self.analyzer.collect_metadata(
            chunk,
            span.entry,
            span.end,
            span.id,
            span.arity,
            callee_count,
            &span.name,
         );

         if cmeta.has_unsupported || !self.analyzer.can_inline(&cmeta) {
            continue;
         }

         candidates.push((site, span, cmeta));
      }

      if candidates.is_empty() {
         return Some(0);
      }

      candidates.sort_by(|a, b| {
         let pa = self.analyzer.inline_priority(&a.2);
         let pb = self.analyzer.inline_priority(&b.2);
         pb.cmp(&pa).then(a.2.bytecode_size.cmp(&b.2.bytecode_size))
      });

      // Select within budget, then apply from the highest window start so
      // earlier indexes stay valid.
      let mut selected = vec![];
      for (site, span, cmeta) in candidates {
         if cmeta.bytecode_size <= *budget {
            *budget -= cmeta.bytecode_size;
            selected.push((site, span, cmeta));
         }
      }

      if selected.is_empty() {
         return Some(0);
      }

      selected.sort_by(|a, b| b.0.window_start.cmp(&a.0.window_start));

      let mut working = instrs;
      let mut applied = 0usize;

      for (site, span, cmeta) in selected {
         let start_idx = *index_of.get(&site.window_start?)?;
         let end_idx = *index_of.get(&site.call_offset)?;

         // Whole-call constant folding when the callee is the canonical
         // arithmetic shape; otherwise inline the bound body.
         let replacement = match cmeta.fold_shape() {
            Some(arith) if cmeta.is_pure() => {
               match self.transformer.fold_constant_call(arith, &site.constant_args) {
                  Some(result) => vec![self.transformer.load_const_instr(chunk, &result, extras)?],
                  None => continue, // zero divisor: leave the call alone
               }
            }
            _ => self.transformer.bind_body(
               chunk,
               span.entry,
               span.end,
               span.arity,
               &site.constant_args,
               extras,
            )?,
         };

         working = self.transformer.splice(&working, start_idx, end_idx, replacement)?;
         applied += 1;
      }

      *code = self.transformer.encode(&working)?;
      Some(applied)
   }

   pub fn reset(&mut self) {
      self.plans.clear();
      self.total_compilations = 0;
      self.successful_compilations = 0;
      self.total_inlined_functions = 0;
      self.total_bytecode_reduction = 0;
   }

   pub fn successful_compilations(&self) -> u64 {
      self.successful_compilations
   }

   pub fn total_inlined_functions(&self) -> u64 {
      self.total_inlined_functions
   }
}

impl Default for JitCompilerT2 {
   fn default() -> Self {
      JitCompilerT2::new()
   }
}

/// Byte offset of each instruction in a decoded list.
fn instruction_offsets(instrs: &[crate::jit::inline_transformer::Instr]) -> Vec<usize> {
   let mut offsets = Vec::with_capacity(instrs.len());
   let mut total = 0;
   for instr in instrs {
      offsets.push(total);
      total += 1 + instr.op.operand_count();
   }
   offsets
}
