use std::rc::Rc;

use crate::bytecode::chunk::Chunk;
use crate::bytecode::OpCode;
use crate::environment::Environment;
use crate::errors::{LimitKind, RuntimeErrorType};
use crate::lexer::morphology::Dictionary;
use crate::objects::Value;
use crate::tests::{compile_source, run_expect, run_source};
use crate::virtual_machine::VM;

#[test]
fn postposition_split_program_sums_a_range() {
   let output = run_expect(
      "정수 합 = 0\ni가 1부터 10까지 반복 {\n    합 = 합 + i\n}\n출력(합)",
   );

   assert_eq!(output, vec!["55"]);
}

#[test]
fn noun_protection_keeps_a_variable_usable() {
   let output = run_expect("정수 나이 = 30\n출력(나이)");

   assert_eq!(output, vec!["30"]);
}

#[test]
fn division_by_zero_reports_the_operator_line() {
   let (vm, result) = run_source("출력(10 / 0)");

   let error = result.err().expect("the program must fail");
   assert_eq!(error.error, RuntimeErrorType::ZeroDivision);
   assert_eq!(error.line, 1);
   assert!(vm.captured_output().is_empty());
}

#[test]
fn instruction_limit_stops_an_infinite_loop() {
   let chunk = compile_source("동안 (참) { }");
   let mut vm = VM::new(Rc::new(Dictionary::default()));
   vm.enable_output_capture();
   vm.set_max_instructions(50_000);

   let error = vm.run(chunk).err().expect("the loop must be stopped");
   assert_eq!(
      error.error,
      RuntimeErrorType::RuntimeLimitExceeded(LimitKind::Instructions)
   );
   assert_eq!(error.line, 1);
}

#[test]
fn time_limit_is_checked_at_the_sample_interval() {
   let chunk = compile_source("동안 (참) { }");
   let mut vm = VM::new(Rc::new(Dictionary::default()));
   vm.set_max_execution_time_ms(0);

   let error = vm.run(chunk).err().expect("the time limit must fire");
   assert_eq!(
      error.error,
      RuntimeErrorType::RuntimeLimitExceeded(LimitKind::Time)
   );
}

#[test]
fn stack_depth_limit_stops_unbounded_recursion() {
   let chunk = compile_source("함수 f() { 반환 f() }\nf()");
   let mut vm = VM::new(Rc::new(Dictionary::default()));
   vm.set_max_stack_depth(128);

   let error = vm.run(chunk).err().expect("the recursion must be stopped");
   assert_eq!(
      error.error,
      RuntimeErrorType::RuntimeLimitExceeded(LimitKind::StackDepth)
   );
}

#[test]
fn call_pops_arguments_and_pushes_one_result() {
   // The stack is balanced across calls: a call in a loop would otherwise
   // leak one slot per iteration and trip the depth limit.
   let output = run_expect(
      "함수 항등(x) { 반환 x }\n정수 합 = 0\ni가 1부터 50까지 반복 { 합 = 합 + 항등(i) }\n출력(합)",
   );

   assert_eq!(output, vec!["1275"]);
}

#[test]
fn arity_mismatch_is_a_runtime_error() {
   let (_, result) = run_source("함수 f(a) { 반환 a }\nf(1, 2)");

   assert_eq!(result.err().unwrap().error, RuntimeErrorType::ArityMismatch);
}

#[test]
fn calling_a_non_callable_value_fails() {
   let (_, result) = run_source("x = 3\nx(1)");

   assert_eq!(result.err().unwrap().error, RuntimeErrorType::NotCallable);
}

#[test]
fn undefined_global_is_reported() {
   // Bypass the semantic analyzer deliberately: the VM must still catch
   // an unbound LOAD_GLOBAL at run time.
   let dictionary = Dictionary::default();
   let module = crate::parser::Parser::parse("출력(없는변수)", &dictionary).unwrap();
   let chunk = crate::compiler::Compiler::compile(&module).unwrap();

   let mut vm = VM::new(Rc::new(Dictionary::default()));
   vm.enable_output_capture();

   let error = vm.run(chunk).err().expect("the lookup must fail");
   assert_eq!(error.error, RuntimeErrorType::UndefinedGlobal);
}

#[test]
fn string_concatenation_and_promotion() {
   let output = run_expect(
      "출력(\"답: \" + 42)\n출력(1 + 2.5)\n출력(7 / 2)\n출력(7.0 / 2)\n출력(7 % 3)",
   );

   assert_eq!(output, vec!["답: 42", "3.5", "3", "3.5", "1"]);
}

#[test]
fn booleans_print_in_the_source_language() {
   let output = run_expect("출력(참)\n출력(거짓)\n출력(1 < 2)");

   assert_eq!(output, vec!["참", "거짓", "참"]);
}

#[test]
fn arrays_render_recursively() {
   let output = run_expect("출력([1, [2, 3], \"넷\"])");

   assert_eq!(output, vec!["[1, [2, 3], 넷]"]);
}

#[test]
fn array_indexing_reads_and_writes() {
   let output = run_expect("목록 = [10, 20, 30]\n목록[1] = 25\n출력(목록[1])\n출력(목록)");

   assert_eq!(output, vec!["25", "[10, 25, 30]"]);
}

#[test]
fn out_of_bounds_index_is_an_error() {
   let (_, result) = run_source("목록 = [1]\n출력(목록[5])");

   assert_eq!(result.err().unwrap().error, RuntimeErrorType::IndexOutOfBounds);
}

#[test]
fn josa_call_sorts_and_reverses_arrays() {
   let output = run_expect("목록 = [3, 1, 2]\n출력(목록을 정렬한다)\n출력(목록을 역순으로_나열한다)");

   assert_eq!(output, vec!["[1, 2, 3]", "[2, 1, 3]"]);
}

#[test]
fn josa_call_on_a_non_array_is_a_type_mismatch() {
   let (_, result) = run_source("x = 5\n출력(x를 정렬한다)");

   assert_eq!(result.err().unwrap().error, RuntimeErrorType::TypeMismatch);
}

#[test]
fn range_expression_materializes_an_array() {
   let output = run_expect("출력(1부터 4까지)\n출력(1부터 4미만)");

   assert_eq!(output, vec!["[1, 2, 3, 4]", "[1, 2, 3]"]);
}

#[test]
fn repeat_for_runs_the_body_count_times() {
   let output = run_expect("3번 반복 { 출력(\"안녕\") }");

   assert_eq!(output.len(), 3);
}

#[test]
fn while_loop_with_condition() {
   let output = run_expect("정수 n = 0\n동안 (n < 3) { 출력(n)\nn = n + 1 }");

   assert_eq!(output, vec!["0", "1", "2"]);
}

#[test]
fn match_expression_selects_an_arm() {
   let output = run_expect(
      "값 = 2\n출력(값 에 대해 { 1 -> \"하나\", 2 -> \"둘\", _ -> \"기타\" })\n값 = 9\n출력(값 에 대해 { 1 -> \"하나\", _ -> \"기타\" })",
   );

   assert_eq!(output, vec!["둘", "기타"]);
}

#[test]
fn try_catches_a_thrown_value() {
   let output = run_expect("시도 { 던지다 \"문제 발생\" } 오류 이유 { 출력(\"잡음\") }");

   assert_eq!(output, vec!["잡음"]);
}

#[test]
fn try_catches_a_runtime_error() {
   let output = run_expect("시도 { 출력(1 / 0) } 오류 이유 { 출력(타입(이유)) }\n출력(\"계속\")");

   assert_eq!(output, vec!["오류", "계속"]);
}

#[test]
fn uncaught_throw_ends_the_program() {
   let (_, result) = run_source("던지다 \"혼자\"");

   assert_eq!(result.err().unwrap().error, RuntimeErrorType::UncaughtThrow);
}

#[test]
fn limit_breaches_are_not_catchable() {
   let chunk = compile_source("시도 { 동안 (참) { } } 오류 이유 { 출력(\"잡음\") }");
   let mut vm = VM::new(Rc::new(Dictionary::default()));
   vm.enable_output_capture();
   vm.set_max_instructions(10_000);

   let error = vm.run(chunk).err().expect("the limit must surface");
   assert_eq!(
      error.error,
      RuntimeErrorType::RuntimeLimitExceeded(LimitKind::Instructions)
   );
   assert!(vm.captured_output().is_empty());
}

#[test]
fn classes_construct_and_dispatch_methods() {
   let output = run_expect(
      "클래스 사람 {\n 이름\n 생성자(n) { 자신.이름 = n }\n 함수 인사() { 반환 \"안녕, \" + 자신.이름 }\n}\n김 = 사람(\"김세종\")\n출력(김.인사())\n출력(김.이름)",
   );

   assert_eq!(output, vec!["안녕, 김세종", "김세종"]);
}

#[test]
fn builtin_functions_resolve_through_globals() {
   let output = run_expect(
      "출력(길이(\"하나\"))\n출력(대문자(\"abc\"))\n출력(정수(\"42\") + 1)\n출력(절대값(-7))",
   );

   assert_eq!(output, vec!["2", "ABC", "43", "7"]);
}

#[test]
fn builtin_variables_are_seeded() {
   let output = run_expect("출력(타입(작업디렉토리))");

   assert_eq!(output, vec!["문자열"]);
}

#[test]
fn environment_assign_writes_the_nearest_binding() {
   let mut env = Environment::new();

   env.define(Environment::GLOBAL, "x", Value::Int(1));
   let inner = env.push(Environment::GLOBAL);

   // assign walks out to the binding frame.
   env.assign(inner, "x", Value::Int(2));
   assert_eq!(env.lookup(Environment::GLOBAL, "x").unwrap().as_int(), Some(2));

   // assign to an unbound name defines locally.
   env.assign(inner, "y", Value::Int(3));
   assert!(env.lookup(inner, "y").is_some());
   assert!(env.lookup(Environment::GLOBAL, "y").is_none());
}

#[test]
fn manually_built_chunk_exercises_stack_opcodes() {
   let mut chunk = Chunk::new();

   let three = chunk.add_constant(Value::Int(3)).unwrap();
   let seven = chunk.add_constant(Value::Int(7)).unwrap();

   // [3, 7] -> swap -> [7, 3] -> dup -> [7, 3, 3] -> build array(3)
   chunk.write_op(OpCode::LoadConst, 1);
   chunk.write(three, 1);
   chunk.write_op(OpCode::LoadConst, 1);
   chunk.write(seven, 1);
   chunk.write_op(OpCode::Swap, 1);
   chunk.write_op(OpCode::Dup, 1);
   chunk.write_op(OpCode::BuildArray, 1);
   chunk.write(3, 1);

   // append 7 to it, print, halt
   chunk.write_op(OpCode::Dup, 1);
   chunk.write_op(OpCode::LoadConst, 1);
   chunk.write(seven, 1);
   chunk.write_op(OpCode::ArrayAppend, 1);
   chunk.write_op(OpCode::Print, 1);
   chunk.write_op(OpCode::Halt, 1);

   let mut vm = VM::new(Rc::new(Dictionary::default()));
   vm.enable_output_capture();
   vm.run(Rc::new(chunk)).expect("the chunk runs");

   assert_eq!(vm.captured_output(), ["[7, 3, 3, 7]"]);
}

#[test]
fn repl_style_reruns_share_globals() {
   let mut interpreter = crate::interpreter::Interpreter::new();
   interpreter.vm.enable_output_capture();

   assert!(interpreter.interpret("<repl>", "정수 합 = 41").is_ok());
   assert!(interpreter.interpret("<repl>", "합 = 합 + 1").is_ok());
   assert!(interpreter.interpret("<repl>", "출력(합)").is_ok());

   assert_eq!(interpreter.vm.captured_output(), ["42"]);
}
