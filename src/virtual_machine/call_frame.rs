use std::rc::Rc;

use crate::bytecode::chunk::Chunk;
use crate::bytecode::OpCode;
use crate::jit::tier2::OptimizedRegion;
use crate::objects::{FunctionObj, Value};

/// The role a frame plays, which decides what RETURN and HALT do to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
   /// The program's top-level code. RETURN here ends the program.
   Script,
   /// An ordinary function or method call.
   Function,
   /// A constructor call; RETURN yields the instance, not the value.
   Constructor,
   /// An imported module's top-level code; HALT pops it.
   Module,
}

/// Represents a single ongoing call: where to resume reading code, where
/// the frame's stack window begins, and which function is running.
pub struct CallFrame {
   pub kind: FrameKind,
   pub chunk: Rc<Chunk>,
   pub ip: usize,
   /// Index of the first argument / local slot for this frame.
   pub stack_base: usize,
   pub function: Option<Rc<FunctionObj>>,
   /// Bound instance for methods and constructors.
   pub this: Option<Value>,
   /// Replacement code published by the tier-2 JIT. When present, the
   /// frame fetches from it instead of the chunk; constants beyond the
   /// chunk pool resolve into the region's extra constants.
   pub region: Option<Rc<OptimizedRegion>>,
}

impl CallFrame {
   /// The code bytes this frame executes.
   fn code(&self) -> &[u8] {
      match &self.region {
         Some(region) => &region.code,
         None => self.chunk.code(),
      }
   }

   pub fn at_end(&self) -> bool {
      self.ip >= self.code().len()
   }

   pub fn next_op(&mut self) -> Option<OpCode> {
      let byte = *self.code().get(self.ip)?;
      self.ip += 1;
      num_traits::FromPrimitive::from_u8(byte)
   }

   pub fn next_byte(&mut self) -> u8 {
      let byte = self.code()[self.ip];
      self.ip += 1;
      byte
   }

   pub fn next_short(&mut self) -> u16 {
      let code = self.code();
      let value = u16::from_be_bytes([code[self.ip], code[self.ip + 1]]);
      self.ip += 2;
      value
   }

   /// Resolves a constant index against the chunk pool, then against the
   /// optimized region's extra constants.
   pub fn constant(&self, idx: usize) -> Option<Value> {
      if let Some(value) = self.chunk.get_constant(idx) {
         return Some(value.clone());
      }

      match &self.region {
         Some(region) => region
            .extra_constants
            .get(idx - self.chunk.constants().len())
            .cloned(),
         None => None,
      }
   }

   /// The source line of the instruction that begins at `op_ip`. Optimized
   /// regions report the line of the function they replace.
   pub fn line_at(&self, op_ip: usize) -> usize {
      match (&self.region, &self.function) {
         (Some(_), Some(f)) => self.chunk.get_line(f.entry),
         _ => self.chunk.get_line(op_ip),
      }
   }
}
