use crate::bytecode::chunk::{Chunk, FunctionSpan};
use crate::bytecode::disassembler;
use crate::bytecode::serialize::{self, DecodeError};
use crate::bytecode::OpCode;
use crate::objects::Value;
use crate::tests::compile_source;

#[test]
fn chunk_write_records_lines_run_length_encoded() {
   let mut chunk = Chunk::new();

   chunk.write_op(OpCode::LoadTrue, 1);
   chunk.write_op(OpCode::LoadFalse, 1);
   chunk.write_op(OpCode::Pop, 2);
   chunk.write_op(OpCode::Halt, 2);

   // One record per line, not per byte.
   assert_eq!(chunk.lines().len(), 2);
   assert_eq!(chunk.get_line(0), 1);
   assert_eq!(chunk.get_line(1), 1);
   assert_eq!(chunk.get_line(2), 2);
   assert_eq!(chunk.get_line(3), 2);
}

#[test]
fn constant_pool_caps_at_256_entries() {
   let mut chunk = Chunk::new();

   for i in 0..256 {
      assert!(chunk.add_constant(Value::Int(i)).is_ok());
   }

   assert!(chunk.add_constant(Value::Int(999)).is_err());
   // An existing value still resolves to its slot.
   assert_eq!(chunk.add_constant(Value::Int(7)), Ok(7));
}

#[test]
fn name_pool_lookup_is_by_value() {
   let mut chunk = Chunk::new();

   let a = chunk.add_name("첫째").unwrap();
   let b = chunk.add_name("둘째").unwrap();
   let again = chunk.add_name("첫째").unwrap();

   assert_eq!(a, again);
   assert_ne!(a, b);
   assert_eq!(chunk.get_name(a as usize), Some("첫째"));
}

#[test]
fn sixteen_bit_operands_are_big_endian() {
   let mut chunk = Chunk::new();

   chunk.write16(0x1234, 1);
   assert_eq!(chunk.read(0), 0x12);
   assert_eq!(chunk.read(1), 0x34);
   assert_eq!(chunk.read16(0), 0x1234);

   chunk.patch16(0, 0xBEEF);
   assert_eq!(chunk.read16(0), 0xBEEF);
}

#[test]
fn function_spans_resolve_by_entry() {
   let mut chunk = Chunk::new();
   chunk.add_function_span(FunctionSpan {
      id: 0,
      name: String::from("더하기"),
      entry: 10,
      end: 16,
      arity: 2,
   });

   assert!(chunk.span_at_entry(10).is_some());
   assert!(chunk.span_at_entry(11).is_none());
}

#[test]
fn serialized_chunks_roundtrip() {
   let chunk = compile_source("정수 x = 3\n출력(x + 1.5)\n출력(\"문자열\")\n함수 f(a) { 반환 a }\n출력(f(참))");

   let bytes = serialize::encode(&chunk).expect("literal constants serialize");
   let decoded = serialize::decode(&bytes).expect("the chunk decodes");

   assert_eq!(decoded.code(), chunk.code());
   assert_eq!(decoded.constants().len(), chunk.constants().len());
   for (a, b) in decoded.constants().iter().zip(chunk.constants()) {
      assert!(a.equals(b));
   }
   assert_eq!(decoded.names(), chunk.names());
   assert_eq!(decoded.lines(), chunk.lines());
   assert_eq!(decoded.function_spans().len(), chunk.function_spans().len());
}

#[test]
fn decode_rejects_foreign_bytes() {
   assert_eq!(serialize::decode(b"nope").err(), Some(DecodeError::BadMagic));
   assert_eq!(serialize::decode(b"KSJB").err(), Some(DecodeError::Truncated));
}

#[test]
fn disassembler_lists_every_instruction() {
   let chunk = compile_source("정수 x = 7\n출력(x)");
   let listing = disassembler::disassemble(&chunk, "<테스트>");

   assert!(listing.contains("LOAD_CONST"));
   assert!(listing.contains("STORE_GLOBAL"));
   assert!(listing.contains("PRINT"));
   assert!(listing.contains("HALT"));
   assert!(listing.contains("'x'"));
}
