use log::debug;

use crate::bytecode::chunk::Chunk;
use crate::bytecode::OpCode;
use crate::objects::Value;

/// A decoded instruction. Jump targets are indexes into the instruction
/// list (or `target == list length` for a jump landing exactly past the
/// region), so edits never have to fix raw byte offsets — the encoder
/// recomputes every distance.
#[derive(Clone, Debug)]
pub(crate) struct Instr {
   pub op: OpCode,
   pub operands: Vec<u8>,
   pub target: Option<usize>,
}

impl Instr {
   fn with_operand(op: OpCode, operand: u8) -> Instr {
      Instr {
         op,
         operands: vec![operand],
         target: None,
      }
   }

   fn size(&self) -> usize {
      1 + self.op.operand_count()
   }
}

/// Rewrites bytecode regions: call-site inlining, parameter binding,
/// whole-call constant folding, dead-code elimination, and the jump
/// fixups all of those imply. Every operation works on a decoded copy
/// and publishes nothing on failure.
pub struct InliningTransformer;

impl InliningTransformer {
   pub fn new() -> InliningTransformer {
      InliningTransformer
   }

   /// Decodes a region into the instruction list, resolving jump targets
   /// to instruction indexes. Fails on truncated operands, unknown
   /// opcodes, or jumps landing between instructions.
   pub(crate) fn decode(&self, code: &[u8]) -> Option<Vec<Instr>> {
      let mut instrs = vec![];
      let mut offsets = vec![];
      let mut offset_to_index = hashbrown::HashMap::new();

      let mut ip = 0;
      while ip < code.len() {
         let op: OpCode = num_traits::FromPrimitive::from_u8(code[ip])?;
         let operand_count = op.operand_count();

         if ip + 1 + operand_count > code.len() {
            return None;
         }

         offset_to_index.insert(ip, instrs.len());
         offsets.push(ip);
         instrs.push(Instr {
            op,
            operands: code[ip + 1..ip + 1 + operand_count].to_vec(),
            target: None,
         });

         ip += 1 + operand_count;
      }

      // Resolve jump targets to indexes; a target equal to the region
      // length maps to the sentinel index `instrs.len()`.
      for i in 0..instrs.len() {
         if !instrs[i].op.is_jump() {
            continue;
         }

         let offset = offsets[i];
         let distance = instrs[i].operands[0] as usize;
         let after = offset + 2;

         let target_offset = if instrs[i].op.is_backward_jump() {
            after.checked_sub(distance)?
         } else {
            after + distance
         };

         let target = if target_offset == code.len() {
            instrs.len()
         } else {
            *offset_to_index.get(&target_offset)?
         };

         instrs[i].target = Some(target);
      }

      Some(instrs)
   }

   /// Re-encodes an instruction list, recomputing every jump distance.
   /// Fails when a distance no longer fits in one byte.
   pub(crate) fn encode(&self, instrs: &[Instr]) -> Option<Vec<u8>> {
      let mut offsets = Vec::with_capacity(instrs.len() + 1);
      let mut total = 0;
      for instr in instrs {
         offsets.push(total);
         total += instr.size();
      }
      offsets.push(total);

      let mut code = Vec::with_capacity(total);
      for (i, instr) in instrs.iter().enumerate() {
         code.push(instr.op as u8);

         if let Some(target) = instr.target {
            let after = offsets[i] + 2;
            let target_offset = offsets[target];

            let distance = if instr.op.is_backward_jump() {
               after.checked_sub(target_offset)?
            } else {
               target_offset.checked_sub(after)?
            };

            if distance > u8::MAX as usize {
               return None;
            }
            code.push(distance as u8);
         } else {
            code.extend_from_slice(&instr.operands);
         }
      }

      Some(code)
   }

   /// Replaces the instruction window `[start, end]` (inclusive) with the
   /// replacement list, retargeting every jump across the edit. Fails if
   /// any jump lands inside the window past its first instruction.
   pub(super) fn splice(
      &self,
      instrs: &[Instr],
      start: usize,
      end: usize,
      replacement: Vec<Instr>,
   ) -> Option<Vec<Instr>> {
      let removed = end + 1 - start;
      let added = replacement.len();

      let remap = |t: usize| -> Option<usize> {
         if t < start {
            Some(t)
         } else if t == start {
            Some(start)
         } else if t <= end {
            None // a jump into the middle of the window
         } else {
            Some(t - removed + added)
         }
      };

      let mut out = Vec::with_capacity(instrs.len() - removed + added);

      for (i, instr) in instrs.iter().enumerate() {
         if i >= start && i <= end {
            if i == start {
               for repl in &replacement {
                  let mut r = repl.clone();
                  // Replacement-internal targets are replacement-relative.
                  if let Some(t) = r.target {
                     r.target = Some(start + t);
                  }
                  out.push(r);
               }
            }
            continue;
         }

         let mut instr = instr.clone();
         if let Some(t) = instr.target {
            instr.target = Some(remap(t)?);
         }
         out.push(instr);
      }

      Some(out)
   }

   /// Builds the bound body for inlining: the callee's instructions with
   /// every `LOAD_VAR i` rewritten to load the call site's i-th constant
   /// argument, and the terminating RETURN suppressed so the value it
   /// would return is simply left on the caller's stack.
   ///
   /// # Returns
   /// `None` when the callee body cannot be moved safely: early returns,
   /// stores, loads past the parameters, or jumps at its terminator.
   pub(super) fn bind_body(
      &self,
      chunk: &Chunk,
      callee_entry: usize,
      callee_end: usize,
      param_count: u8,
      constant_args: &[Value],
      extra_constants: &mut Vec<Value>,
   ) -> Option<Vec<Instr>> {
      let body = self.decode(&chunk.code()[callee_entry..callee_end])?;

      if body.is_empty() || body.last()?.op != OpCode::Return {
         return None;
      }

      let trimmed = &body[..body.len() - 1];

      // The dropped RETURN must be unreachable by jumps and unique.
      for instr in trimmed {
         if instr.op == OpCode::Return {
            return None;
         }
         if let Some(t) = instr.target {
            if t >= trimmed.len() {
               return None;
            }
         }
      }

      let mut bound = Vec::with_capacity(trimmed.len());

      for instr in trimmed {
         match instr.op {
            OpCode::StoreVar => return None,
            OpCode::LoadVar => {
               let slot = instr.operands[0];
               if slot >= param_count || (slot as usize) >= constant_args.len() {
                  return None;
               }

               let idx = self.constant_index(chunk, &constant_args[slot as usize], extra_constants)?;
               bound.push(Instr::with_operand(OpCode::LoadConst, idx));
            }
            _ => bound.push(instr.clone()),
         }
      }

      Some(bound)
   }

   /// Evaluates a two-argument arithmetic callee at transform time.
   /// Callers reach this only through the slot-exact fold shape, so the
   /// first constant argument is the left operand. Division or modulo by
   /// zero aborts the fold and the original call stays in place.
   pub(super) fn fold_constant_call(
      &self,
      arith: OpCode,
      constant_args: &[Value],
   ) -> Option<Value> {
      let (a, b) = match (constant_args.first(), constant_args.get(1)) {
         (Some(Value::Int(a)), Some(Value::Int(b))) => (*a, *b),
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

      Some(Value::Int(result))
   }

   /// Finds (or appends) a pool index for a value, looking through the
   /// chunk constants first and the region's extra constants second.
   pub(super) fn constant_index(
      &self,
      chunk: &Chunk,
      value: &Value,
      extra_constants: &mut Vec<Value>,
   ) -> Option<u8> {
      for (i, c) in chunk.constants().iter().enumerate() {
         if c.equals(value) {
            return Some(i as u8);
         }
      }

      let base = chunk.constants().len();
      for (i, c) in extra_constants.iter().enumerate() {
         if c.equals(value) {
            return u8::try_from(base + i).ok();
         }
      }

      let idx = base + extra_constants.len();
      if idx > u8::MAX as usize {
         return None;
      }

      extra_constants.push(value.clone());
      Some(idx as u8)
   }

   /// Reachability analysis via breadth-first search from the region
   /// start; unreachable instructions are removed and every surviving
   /// jump is retargeted.
   ///
   /// # Returns
   /// The pruned list and the number of instructions eliminated.
   pub(crate) fn eliminate_dead_code(&self, instrs: &[Instr]) -> Option<(Vec<Instr>, usize)> {
      if instrs.is_empty() {
         return Some((vec![], 0));
      }

      let sentinel = instrs.len();
      let mut reachable = vec![false; instrs.len()];
      let mut queue = std::collections::VecDeque::new();
      queue.push_back(0usize);

      while let Some(i) = queue.pop_front() {
         if i >= instrs.len() || reachable[i] {
            continue;
         }
         reachable[i] = true;

         let instr = &instrs[i];
         match instr.op {
            OpCode::Return | OpCode::Halt => {}
            OpCode::Jump | OpCode::Loop => {
               if let Some(t) = instr.target {
                  queue.push_back(t);
               }
            }
            OpCode::JumpIfFalse | OpCode::JumpIfTrue => {
               queue.push_back(i + 1);
               if let Some(t) = instr.target {
                  queue.push_back(t);
               }
            }
            _ => queue.push_back(i + 1),
         }
      }

      let eliminated = reachable.iter().filter(|r| !**r).count();
      if eliminated == 0 {
         return Some((instrs.to_vec(), 0));
      }

      debug!("dead-code elimination removed {} instructions", eliminated);

      let mut remap = vec![usize::MAX; instrs.len() + 1];
      let mut kept = vec![];
      for (i, instr) in instrs.iter().enumerate() {
         if reachable[i] {
            remap[i] = kept.len();
            kept.push(instr.clone());
         }
      }
      remap[sentinel] = kept.len();

      for instr in kept.iter_mut() {
         if let Some(t) = instr.target {
            let new_target = remap[t];
            if new_target == usize::MAX {
               return None;
            }
            instr.target = Some(new_target);
         }
      }

      Some((kept, eliminated))
   }

   /// Convenience wrapper producing a LOAD_CONST instruction for a folded
   /// call result.
   pub(super) fn load_const_instr(
      &self,
      chunk: &Chunk,
      value: &Value,
      extra_constants: &mut Vec<Value>,
   ) -> Option<Instr> {
      let idx = self.constant_index(chunk, value, extra_constants)?;
      Some(Instr::with_operand(OpCode::LoadConst, idx))
   }
}

impl Default for InliningTransformer {
   fn default() -> Self {
      InliningTransformer::new()
   }
}
