use crate::bytecode::OpCode;
use crate::objects::Value;
use num_traits::FromPrimitive;

/// One run of instructions sharing a source line. Records are append-only
/// and monotonic in offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineStart {
   pub offset: usize,
   pub line: usize,
}

/// The compile-time extent of one function inside a chunk. The detector
/// and the JIT key hot regions by `(chunk, entry, end)`.
#[derive(Clone, Debug)]
pub struct FunctionSpan {
   pub id: usize,
   pub name: String,
   pub entry: usize,
   pub end: usize,
   pub arity: u8,
}

/// Contains all the necessary information about the instructions to be
/// executed: the code bytes, the constant pool, the name pool, the line
/// map, and the function span registry.
pub struct Chunk {
   /// The raw instruction stream.
   code: Vec<u8>,
   /// Literal constants, addressed by a single-byte operand.
   constants: Vec<Value>,
   /// Identifier names (globals, fields, methods, modules), deduplicated.
   names: Vec<String>,
   /// Run-length-encoded line map.
   lines: Vec<LineStart>,
   /// Extents of every function compiled into this chunk.
   functions: Vec<FunctionSpan>,
}

impl Chunk {
   pub fn new() -> Chunk {
      Chunk {
         code: vec![],
         constants: vec![],
         names: vec![],
         lines: vec![],
         functions: vec![],
      }
   }

   /// Appends a raw byte, recording its source line.
   pub fn write(&mut self, byte: u8, line: usize) {
      self.code.push(byte);

      match self.lines.last() {
         Some(last) if last.line == line => {}
         _ => self.lines.push(LineStart {
            offset: self.code.len() - 1,
            line,
         }),
      }
   }

   pub fn write_op(&mut self, op: OpCode, line: usize) {
      self.write(op as u8, line);
   }

   /// Appends a big-endian 16-bit operand.
   pub fn write16(&mut self, value: u16, line: usize) {
      let bytes = value.to_be_bytes();
      self.write(bytes[0], line);
      self.write(bytes[1], line);
   }

   /// Adds a constant to the pool, reusing an existing equal entry.
   ///
   /// # Returns
   /// - `Ok(u8)`: The constant's position in the pool.
   /// - `Err(())`: The pool already holds 256 constants.
   pub fn add_constant(&mut self, value: Value) -> Result<u8, ()> {
      if let Some((idx, _)) = self.constants.iter().enumerate().find(|(_, c)| c.equals(&value)) {
         return Ok(idx as u8);
      }

      if self.constants.len() >= 256 {
         return Err(());
      }

      self.constants.push(value);
      Ok((self.constants.len() - 1) as u8)
   }

   /// Adds a name to the name pool, deduplicating on insertion. Lookup is
   /// a linear scan; the pool is single-byte addressed.
   pub fn add_name(&mut self, name: &str) -> Result<u8, ()> {
      for (i, n) in self.names.iter().enumerate() {
         if n == name {
            return Ok(i as u8);
         }
      }

      if self.names.len() >= 256 {
         return Err(());
      }

      self.names.push(String::from(name));
      Ok((self.names.len() - 1) as u8)
   }

   pub fn read(&self, offset: usize) -> u8 {
      self.code[offset]
   }

   pub fn try_read(&self, offset: usize) -> Option<u8> {
      self.code.get(offset).copied()
   }

   /// Reads a big-endian 16-bit operand starting at `offset`.
   pub fn read16(&self, offset: usize) -> u16 {
      u16::from_be_bytes([self.code[offset], self.code[offset + 1]])
   }

   /// Decodes the byte at `offset` as an opcode.
   pub fn op_at(&self, offset: usize) -> Option<OpCode> {
      self.try_read(offset).and_then(FromPrimitive::from_u8)
   }

   /// Overwrites the byte at `offset`. Used to backpatch jump operands.
   pub fn patch(&mut self, offset: usize, byte: u8) {
      self.code[offset] = byte;
   }

   pub fn patch16(&mut self, offset: usize, value: u16) {
      let bytes = value.to_be_bytes();
      self.code[offset] = bytes[0];
      self.code[offset + 1] = bytes[1];
   }

   pub fn get_constant(&self, idx: usize) -> Option<&Value> {
      self.constants.get(idx)
   }

   pub fn get_name(&self, idx: usize) -> Option<&str> {
      self.names.get(idx).map(|s| s.as_str())
   }

   /// The source line for the instruction at `offset`.
   pub fn get_line(&self, offset: usize) -> usize {
      for record in self.lines.iter().rev() {
         if offset >= record.offset {
            return record.line;
         }
      }
      1
   }

   pub fn len(&self) -> usize {
      self.code.len()
   }

   pub fn is_empty(&self) -> bool {
      self.code.is_empty()
   }

   pub fn code(&self) -> &[u8] {
      &self.code
   }

   pub fn constants(&self) -> &[Value] {
      &self.constants
   }

   pub fn names(&self) -> &[String] {
      &self.names
   }

   pub fn lines(&self) -> &[LineStart] {
      &self.lines
   }

   /// Registers a compiled function's extent. Entries are append-only at
   /// compile time and read-only during execution.
   pub fn add_function_span(&mut self, span: FunctionSpan) {
      self.functions.push(span);
   }

   pub fn function_spans(&self) -> &[FunctionSpan] {
      &self.functions
   }

   /// Finds the registered function whose body starts at `entry`.
   pub fn span_at_entry(&self, entry: usize) -> Option<&FunctionSpan> {
      self.functions.iter().find(|s| s.entry == entry)
   }
}

impl Default for Chunk {
   fn default() -> Self {
      Chunk::new()
   }
}
