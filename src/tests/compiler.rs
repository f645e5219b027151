use crate::bytecode::chunk::Chunk;
use crate::bytecode::OpCode;
use crate::compiler::Compiler;
use crate::lexer::morphology::Dictionary;
use crate::parser::Parser;
use crate::tests::compile_source;

/// Walks a chunk instruction by instruction, handing each decoded opcode
/// and its operand offset to the callback.
fn walk_chunk(chunk: &Chunk, mut f: impl FnMut(OpCode, usize)) {
   let mut ip = 0;
   while ip < chunk.len() {
      let op = chunk.op_at(ip).expect("every byte at an instruction boundary decodes");
      f(op, ip);
      ip += 1 + op.operand_count();
   }
}

#[test]
fn constant_pool_has_no_duplicate_items() {
   let src = "출력(8) 출력(8) 출력(8) 출력(8)";
   let chunk = compile_source(src);

   assert_eq!(chunk.constants().len(), 1);
}

#[test]
fn every_jump_lands_inside_the_chunk() {
   let src = "만약 (1 < 2) { 출력(1) } 아니면 { 출력(2) }\n동안 (거짓) { 출력(3) }";
   let chunk = compile_source(src);

   walk_chunk(&chunk, |op, ip| {
      if op.is_jump() {
         let distance = chunk.read(ip + 1) as usize;
         let after = ip + 2;
         let target = if op.is_backward_jump() {
            after.checked_sub(distance).expect("backward jump stays in range")
         } else {
            after + distance
         };
         assert!(target <= chunk.len(), "jump at {} escapes the chunk", ip);
      }
   });
}

#[test]
fn constant_and_name_operands_stay_in_their_pools() {
   let src = "정수 x = 10\n출력(x + 3)\ny = \"문자\"";
   let chunk = compile_source(src);

   walk_chunk(&chunk, |op, ip| match op {
      OpCode::LoadConst => {
         assert!((chunk.read(ip + 1) as usize) < chunk.constants().len());
      }
      OpCode::LoadGlobal | OpCode::StoreGlobal => {
         assert!((chunk.read(ip + 1) as usize) < chunk.names().len());
      }
      _ => {}
   });
}

#[test]
fn line_records_are_monotonic_in_offset() {
   let src = "정수 a = 1\n정수 b = 2\n출력(a + b)\n만약 (a < b) { 출력(a) }";
   let chunk = compile_source(src);

   let mut previous = 0;
   for record in chunk.lines() {
      assert!(record.offset >= previous);
      previous = record.offset;
   }
}

#[test]
fn name_pool_deduplicates_on_insertion() {
   let src = "x = 1\nx = 2\nx = 3\n출력(x)";
   let chunk = compile_source(src);

   let count = chunk.names().iter().filter(|n| n.as_str() == "x").count();
   assert_eq!(count, 1);
}

#[test]
fn function_bodies_are_emitted_after_halt() {
   let src = "함수 더하기(a, b) { 반환 a + b }\n출력(더하기(1, 2))";
   let chunk = compile_source(src);

   let spans = chunk.function_spans();
   assert_eq!(spans.len(), 1);
   assert_eq!(spans[0].name, "더하기");
   assert_eq!(spans[0].arity, 2);
   assert!(spans[0].entry < spans[0].end);
   assert!(spans[0].end <= chunk.len());

   // The body region is the canonical two-parameter arithmetic shape.
   assert_eq!(chunk.op_at(spans[0].entry), Some(OpCode::LoadVar));
}

#[test]
fn literal_binary_expressions_fold_at_compile_time() {
   let chunk = compile_source("출력(2 + 3 * 4)");

   // The folded 14 is the only numeric constant; no ADD or MUL remains.
   let mut arithmetic = 0;
   walk_chunk(&chunk, |op, _| {
      if matches!(op, OpCode::Add | OpCode::Mul) {
         arithmetic += 1;
      }
   });

   assert_eq!(arithmetic, 0);
   assert!(chunk.constants().iter().any(|c| c.as_int() == Some(14)));
}

#[test]
fn division_by_literal_zero_is_not_folded() {
   let chunk = compile_source("출력(10 / 0)");

   let mut divisions = 0;
   walk_chunk(&chunk, |op, _| {
      if op == OpCode::Div {
         divisions += 1;
      }
   });

   assert_eq!(divisions, 1);
}

#[test]
fn negated_branch_condition_uses_the_mirrored_jump() {
   let chunk = compile_source("만약 (!거짓) { 출력(1) }");

   let mut saw_jump_if_true = false;
   let mut saw_not = false;
   walk_chunk(&chunk, |op, _| match op {
      OpCode::JumpIfTrue => saw_jump_if_true = true,
      OpCode::Not => saw_not = true,
      _ => {}
   });

   assert!(saw_jump_if_true);
   assert!(!saw_not);
}

#[test]
fn oversized_jump_distance_is_a_fatal_compile_error() {
   // A then-branch far beyond 255 bytes of code.
   let mut src = String::from("만약 (참) {\n");
   for _ in 0..90 {
      src.push_str("출력(123456)\n");
   }
   src.push_str("}");

   let dictionary = Dictionary::default();
   let module = Parser::parse(&src, &dictionary).expect("the source parses");
   let result = Compiler::compile(&module);

   match result {
      Err(errors) => assert!(errors.iter().any(|e| e.kind == "JumpTooFar")),
      Ok(_) => panic!("expected a JumpTooFar error"),
   }
}

#[test]
fn repl_style_globals_compile_by_name() {
   let chunk = compile_source("정수 합 = 0\n합 = 합 + 1");

   assert!(chunk.names().iter().any(|n| n == "합"));

   let mut stores = 0;
   walk_chunk(&chunk, |op, _| {
      if op == OpCode::StoreGlobal {
         stores += 1;
      }
   });
   assert_eq!(stores, 2);
}
