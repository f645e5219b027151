use std::rc::Rc;

use crate::bytecode::chunk::{Chunk, FunctionSpan, LineStart};
use crate::objects::Value;

const MAGIC: &[u8; 4] = b"KSJB";
const VERSION: u8 = 1;

// Constant tags
const TAG_NULL: u8 = 0;
const TAG_INT: u8 = 1;
const TAG_FLOAT: u8 = 2;
const TAG_TRUE: u8 = 3;
const TAG_FALSE: u8 = 4;
const TAG_STR: u8 = 5;

/// A malformed or unsupported on-disk chunk.
#[derive(Debug, PartialEq, Eq)]
pub enum DecodeError {
   BadMagic,
   BadVersion,
   Truncated,
   BadTag,
   BadString,
}

/// Serializes a chunk to the on-disk format: magic, version, then
/// LEB128-length-prefixed sections for code, constants, names, line
/// records, and function spans. Only literal constants are representable;
/// function values never appear in the pool (functions are encoded as
/// BUILD_FUNCTION entry offsets).
///
/// The format is not cross-version stable.
pub fn encode(chunk: &Chunk) -> Option<Vec<u8>> {
   let mut out = vec![];
   out.extend_from_slice(MAGIC);
   out.push(VERSION);

   write_leb128(&mut out, chunk.len() as u64);
   out.extend_from_slice(chunk.code());

   write_leb128(&mut out, chunk.constants().len() as u64);
   for value in chunk.constants() {
      match value {
         Value::Null => out.push(TAG_NULL),
         Value::Int(v) => {
            out.push(TAG_INT);
            out.extend_from_slice(&v.to_be_bytes());
         }
         Value::Float(v) => {
            out.push(TAG_FLOAT);
            out.extend_from_slice(&v.to_be_bytes());
         }
         Value::Bool(true) => out.push(TAG_TRUE),
         Value::Bool(false) => out.push(TAG_FALSE),
         Value::Str(s) => {
            out.push(TAG_STR);
            write_leb128(&mut out, s.len() as u64);
            out.extend_from_slice(s.as_bytes());
         }
         _ => return None,
      }
   }

   write_leb128(&mut out, chunk.names().len() as u64);
   for name in chunk.names() {
      write_leb128(&mut out, name.len() as u64);
      out.extend_from_slice(name.as_bytes());
   }

   write_leb128(&mut out, chunk.lines().len() as u64);
   for record in chunk.lines() {
      write_leb128(&mut out, record.offset as u64);
      write_leb128(&mut out, record.line as u64);
   }

   write_leb128(&mut out, chunk.function_spans().len() as u64);
   for span in chunk.function_spans() {
      write_leb128(&mut out, span.id as u64);
      write_leb128(&mut out, span.name.len() as u64);
      out.extend_from_slice(span.name.as_bytes());
      write_leb128(&mut out, span.entry as u64);
      write_leb128(&mut out, span.end as u64);
      out.push(span.arity);
   }

   Some(out)
}

/// Reads a chunk back from its serialized form.
pub fn decode(bytes: &[u8]) -> Result<Chunk, DecodeError> {
   let mut cursor = Cursor { bytes, pos: 0 };

   if cursor.take(4)? != MAGIC.as_slice() {
      return Err(DecodeError::BadMagic);
   }
   if cursor.byte()? != VERSION {
      return Err(DecodeError::BadVersion);
   }

   let mut chunk = Chunk::new();

   let code_len = cursor.leb128()? as usize;
   let code = cursor.take(code_len)?.to_vec();

   let const_count = cursor.leb128()? as usize;
   let mut constants = vec![];
   for _ in 0..const_count {
      let value = match cursor.byte()? {
         TAG_NULL => Value::Null,
         TAG_INT => {
            let raw: [u8; 8] = cursor.take(8)?.try_into().map_err(|_| DecodeError::Truncated)?;
            Value::Int(i64::from_be_bytes(raw))
         }
         TAG_FLOAT => {
            let raw: [u8; 8] = cursor.take(8)?.try_into().map_err(|_| DecodeError::Truncated)?;
            Value::Float(f64::from_be_bytes(raw))
         }
         TAG_TRUE => Value::Bool(true),
         TAG_FALSE => Value::Bool(false),
         TAG_STR => {
            let len = cursor.leb128()? as usize;
            let raw = cursor.take(len)?;
            let s = std::str::from_utf8(raw).map_err(|_| DecodeError::BadString)?;
            Value::Str(Rc::new(String::from(s)))
         }
         _ => return Err(DecodeError::BadTag),
      };
      constants.push(value);
   }

   let name_count = cursor.leb128()? as usize;
   let mut names = vec![];
   for _ in 0..name_count {
      let len = cursor.leb128()? as usize;
      let raw = cursor.take(len)?;
      let s = std::str::from_utf8(raw).map_err(|_| DecodeError::BadString)?;
      names.push(String::from(s));
   }

   let line_count = cursor.leb128()? as usize;
   let mut lines = vec![];
   for _ in 0..line_count {
      let offset = cursor.leb128()? as usize;
      let line = cursor.leb128()? as usize;
      lines.push(LineStart { offset, line });
   }

   let span_count = cursor.leb128()? as usize;
   let mut spans = vec![];
   for _ in 0..span_count {
      let id = cursor.leb128()? as usize;
      let name_len = cursor.leb128()? as usize;
      let raw = cursor.take(name_len)?;
      let name = String::from(std::str::from_utf8(raw).map_err(|_| DecodeError::BadString)?);
      let entry = cursor.leb128()? as usize;
      let end = cursor.leb128()? as usize;
      let arity = cursor.byte()?;
      spans.push(FunctionSpan {
         id,
         name,
         entry,
         end,
         arity,
      });
   }

   // Rebuild through the chunk's writers so its invariants hold.
   let mut line_iter = lines.iter().peekable();
   let mut current_line = 1;
   for (offset, byte) in code.iter().enumerate() {
      while let Some(record) = line_iter.peek() {
         if record.offset == offset {
            current_line = record.line;
            line_iter.next();
         } else {
            break;
         }
      }
      chunk.write(*byte, current_line);
   }

   for value in constants {
      chunk.add_constant(value).map_err(|_| DecodeError::Truncated)?;
   }
   for name in &names {
      chunk.add_name(name).map_err(|_| DecodeError::Truncated)?;
   }
   for span in spans {
      chunk.add_function_span(span);
   }

   Ok(chunk)
}

fn write_leb128(out: &mut Vec<u8>, mut value: u64) {
   loop {
      let mut byte = (value & 0x7F) as u8;
      value >>= 7;
      if value != 0 {
         byte |= 0x80;
      }
      out.push(byte);
      if value == 0 {
         break;
      }
   }
}

struct Cursor<'a> {
   bytes: &'a [u8],
   pos: usize,
}

impl<'a> Cursor<'a> {
   fn byte(&mut self) -> Result<u8, DecodeError> {
      let b = *self.bytes.get(self.pos).ok_or(DecodeError::Truncated)?;
      self.pos += 1;
      Ok(b)
   }

   fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
      if self.pos + n > self.bytes.len() {
         return Err(DecodeError::Truncated);
      }
      let slice = &self.bytes[self.pos..self.pos + n];
      self.pos += n;
      Ok(slice)
   }

   fn leb128(&mut self) -> Result<u64, DecodeError> {
      let mut result = 0u64;
      let mut shift = 0;
      loop {
         let byte = self.byte()?;
         result |= ((byte & 0x7F) as u64) << shift;
         if byte & 0x80 == 0 {
            break;
         }
         shift += 7;
         if shift >= 64 {
            return Err(DecodeError::Truncated);
         }
      }
      Ok(result)
   }
}
