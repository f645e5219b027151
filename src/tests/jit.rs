use std::rc::Rc;

use crate::bytecode::OpCode;
use crate::jit::hot_path::{CompileTier, HOT_THRESHOLD};
use crate::jit::inline_analyzer::InliningAnalyzer;
use crate::jit::inline_transformer::InliningTransformer;
use crate::jit::RegionKey;
use crate::lexer::morphology::Dictionary;
use crate::tests::compile_source;
use crate::virtual_machine::VM;

/// A source driving a two-parameter callee with literal arguments a given
/// number of times.
fn hot_call_source(iterations: usize) -> String {
   format!(
      "함수 더하기(a, b) {{ 반환 a + b }}\ni가 1부터 {}까지 반복 {{\n    출력(더하기(10, 20))\n}}",
      iterations
   )
}

fn run_vm(src: &str) -> VM {
   let chunk = compile_source(src);
   let mut vm = VM::new(Rc::new(Dictionary::default()));
   vm.enable_output_capture();
   vm.run(chunk).expect("the program runs");
   vm
}

#[test]
fn cold_functions_stay_interpreted() {
   let vm = run_vm(&hot_call_source(50));

   assert_eq!(vm.jit.stats.template_calls, 0);
   assert_eq!(vm.jit.stats.folded_calls, 0);
   assert_eq!(vm.captured_output().len(), 50);
}

#[test]
fn tier1_template_is_cached_at_the_hot_threshold() {
   // Exactly 100 invocations: the 100th call compiles and uses the
   // template; tier-2 has not run yet.
   let vm = run_vm(&hot_call_source(HOT_THRESHOLD as usize));

   assert_eq!(vm.jit.stats.template_calls, 1);
   assert_eq!(vm.jit.stats.folded_calls, 0);
   assert_eq!(vm.captured_output().len(), 100);
   assert!(vm.captured_output().iter().all(|line| line == "30"));
}

#[test]
fn tier2_fold_replaces_the_call_beyond_the_threshold() {
   let vm = run_vm(&hot_call_source(150));

   // Call 100 runs the tier-1 template; calls 101..150 fold with zero
   // callee instructions executed.
   assert_eq!(vm.jit.stats.template_calls, 1);
   assert_eq!(vm.jit.stats.folded_calls, 50);
   assert_eq!(vm.captured_output().len(), 150);
   assert!(vm.captured_output().iter().all(|line| line == "30"));
}

#[test]
fn folded_and_interpreted_results_agree() {
   // The JIT equivalence property, observed end to end: identical output
   // below and above the promotion threshold.
   let cold = run_vm(&hot_call_source(99));
   let hot = run_vm(&hot_call_source(160));

   assert!(cold.captured_output().iter().all(|line| line == "30"));
   assert!(hot.captured_output().iter().all(|line| line == "30"));
}

#[test]
fn reversed_operand_callees_never_fold() {
   // 빼기 loads its parameters in reverse slot order, so the canonical
   // fold shape must reject it: folding would compute a - b instead of
   // b - a. The folded (hot) output must match the interpreted output.
   let src = "함수 빼기(a, b) { 반환 b - a }\ni가 1부터 150까지 반복 {\n    출력(빼기(10, 3))\n}";
   let cold_src = "함수 빼기(a, b) { 반환 b - a }\ni가 1부터 99까지 반복 {\n    출력(빼기(10, 3))\n}";

   let hot = run_vm(src);
   let cold = run_vm(cold_src);

   assert_eq!(hot.jit.stats.folded_calls, 0);
   assert_eq!(hot.captured_output().len(), 150);
   assert!(hot.captured_output().iter().all(|line| line == "-7"));
   assert!(cold.captured_output().iter().all(|line| line == "-7"));
}

#[test]
fn fold_falls_back_when_arguments_are_not_integers() {
   let src = "함수 더하기(a, b) { 반환 a + b }\ni가 1부터 150까지 반복 {\n    출력(더하기(\"가\", \"나\"))\n}";
   let vm = run_vm(src);

   // The fold plan exists but never applies to string arguments; results
   // come from the interpreter and stay correct.
   assert_eq!(vm.jit.stats.folded_calls, 0);
   assert_eq!(vm.jit.stats.template_calls, 0);
   assert!(vm.captured_output().iter().all(|line| line == "가나"));
}

#[test]
fn division_by_zero_aborts_the_fold() {
   let src = "함수 나누기(a, b) { 반환 a / b }\n정수 합 = 0\ni가 1부터 150까지 반복 {\n    합 = 합 + 나누기(30, 3)\n}\n출력(합)";
   let vm = run_vm(src);
   assert_eq!(vm.captured_output(), ["1500"]);

   // With a zero divisor the fold declines and the interpreter raises.
   let failing = "함수 나누기(a, b) { 반환 a / b }\ni가 1부터 150까지 반복 {\n    x = 나누기(30, 3)\n}\n출력(나누기(1, 0))";
   let chunk = compile_source(failing);
   let mut vm = VM::new(Rc::new(Dictionary::default()));
   vm.enable_output_capture();
   let error = vm.run(chunk).err().expect("division by zero must surface");
   assert_eq!(error.error, crate::errors::RuntimeErrorType::ZeroDivision);
}

#[test]
fn detector_counts_and_records_tiers() {
   let src = hot_call_source(120);
   let chunk = compile_source(&src);
   let span = chunk.function_spans()[0].clone();

   let mut vm = VM::new(Rc::new(Dictionary::default()));
   vm.enable_output_capture();
   vm.run(Rc::clone(&chunk)).expect("the program runs");

   let key = RegionKey {
      chunk: Rc::as_ptr(&chunk) as usize,
      start: span.entry,
      end: span.end,
   };

   let entry = vm.jit.detector.entry(&key).expect("the region was counted");
   assert_eq!(entry.invocation_count, 120);
   assert_eq!(entry.last_compile_tier, CompileTier::Tier2);
}

#[test]
fn tier1_handles_non_foldable_integer_bodies() {
   // Not the fold shape and no call sites: tier-2 declines, tier-1 keeps
   // serving the region.
   let src = "함수 셈(a, b) { 반환 a * 2 + b }\n정수 합 = 0\ni가 1부터 150까지 반복 {\n    합 = 합 + 셈(3, 4)\n}\n출력(합)";
   let vm = run_vm(src);

   assert_eq!(vm.captured_output(), ["1500"]);
   assert!(vm.jit.stats.template_calls >= 50);
   assert_eq!(vm.jit.stats.folded_calls, 0);
}

#[test]
fn recursive_functions_are_never_tier2_candidates() {
   let src = "함수 카운트(n) { 만약 (n <= 0) { 반환 0 } 아니면 { } 반환 1 + 카운트(n - 1) }\n정수 합 = 0\ni가 1부터 120까지 반복 { 합 = 합 + 카운트(2) }\n출력(합)";
   let vm = run_vm(src);

   assert_eq!(vm.captured_output(), ["240"]);
   assert_eq!(vm.jit.stats.folded_calls, 0);
   assert_eq!(vm.jit.stats.inlined_frames, 0);
}

#[test]
fn metadata_reflects_structure_and_purity() {
   let chunk = compile_source("함수 더하기(a, b) { 반환 a + b }\n출력(더하기(1, 2))");
   let span = chunk.function_spans()[0].clone();

   let analyzer = InliningAnalyzer::new();
   let meta = analyzer.collect_metadata(&chunk, span.entry, span.end, span.id, span.arity, 500, &span.name);

   assert_eq!(meta.opcodes, vec![OpCode::LoadVar, OpCode::LoadVar, OpCode::Add, OpCode::Return]);
   assert_eq!(meta.opcode_count.get(&OpCode::LoadVar), Some(&2));
   assert!(!meta.has_loops);
   assert!(!meta.has_recursion);
   assert!(!meta.has_conditionals);
   assert!(!meta.has_function_calls);
   assert!(meta.is_pure());
   assert_eq!(meta.fold_shape(), Some(OpCode::Add));
   assert_eq!(meta.complexity_score(), meta.bytecode_size as i64);
   assert!(analyzer.can_inline(&meta));
}

#[test]
fn metadata_flags_loops_and_conditionals() {
   let src = "함수 합계(n) { 정수 s = 0\ni가 1부터 n까지 반복 { s = s + i }\n반환 s }\n출력(합계(3))";
   let chunk = compile_source(src);
   let span = chunk.function_spans()[0].clone();

   let analyzer = InliningAnalyzer::new();
   let meta = analyzer.collect_metadata(&chunk, span.entry, span.end, span.id, span.arity, 500, &span.name);

   assert!(meta.has_loops);
   assert!(meta.has_conditionals);
   assert!(meta.complexity_score() >= meta.bytecode_size as i64 + 25);
}

#[test]
fn recursion_is_detected_through_the_callee_name() {
   let src = "함수 재귀(n) { 반환 재귀(n - 1) }\n출력(1)";
   let chunk = compile_source(src);
   let span = chunk.function_spans()[0].clone();

   let analyzer = InliningAnalyzer::new();
   let meta = analyzer.collect_metadata(&chunk, span.entry, span.end, span.id, span.arity, 500, &span.name);

   assert!(meta.has_recursion);
   assert!(!analyzer.can_inline(&meta));
}

#[test]
fn call_sites_with_constant_arguments_are_recognized() {
   let src = "함수 더하기(a, b) { 반환 a + b }\n함수 감싸기() { 반환 더하기(10, 20) }\n출력(감싸기())";
   let chunk = compile_source(src);
   let wrapper = chunk
      .function_spans()
      .iter()
      .find(|s| s.name == "감싸기")
      .unwrap()
      .clone();

   let analyzer = InliningAnalyzer::new();
   let region = &chunk.code()[wrapper.entry..wrapper.end];
   let sites = analyzer.find_call_sites(region, &chunk, &[]);

   assert_eq!(sites.len(), 1);
   assert!(sites[0].has_constant_args);
   assert_eq!(sites[0].arg_count, 2);
   assert_eq!(sites[0].constant_args.len(), 2);
   assert!(sites[0].callee_entry.is_some());
}

#[test]
fn wrapper_bodies_get_an_inlined_variant() {
   // The wrapper's call site has constant arguments; once both functions
   // are hot, tier-2 folds the inner call away inside the wrapper's body.
   let src = "함수 더하기(a, b) { 반환 a + b }\n함수 감싸기() { 반환 더하기(10, 20) }\ni가 1부터 150까지 반복 {\n    출력(감싸기())\n}";
   let vm = run_vm(src);

   assert!(vm.captured_output().iter().all(|line| line == "30"));
   assert!(vm.jit.stats.inlined_frames > 0, "the wrapper should run its inlined variant");
}

#[test]
fn transformer_roundtrips_a_region() {
   let chunk = compile_source("함수 더하기(a, b) { 반환 a + b }\n출력(더하기(1, 2))");
   let span = chunk.function_spans()[0].clone();
   let region = &chunk.code()[span.entry..span.end];

   let transformer = InliningTransformer::new();
   let instrs = transformer.decode(region).expect("the region decodes");
   let encoded = transformer.encode(&instrs).expect("the region re-encodes");

   assert_eq!(encoded, region);
}

#[test]
fn dead_code_elimination_removes_unreachable_instructions() {
   let chunk = compile_source("함수 고르기(x) { 만약 (x < 1) { 반환 10 } 아니면 { 반환 20 } }\n출력(고르기(0))");
   let span = chunk.function_spans()[0].clone();
   let region = &chunk.code()[span.entry..span.end];

   let transformer = InliningTransformer::new();
   let instrs = transformer.decode(region).expect("the region decodes");
   let (kept, _removed) = transformer.eliminate_dead_code(&instrs).expect("analysis succeeds");

   // Whatever was removed, the result must still encode with valid jumps.
   assert!(transformer.encode(&kept).is_some());
   assert!(kept.len() <= instrs.len());
}

#[test]
fn template_execution_count_tracks_invocations() {
   let vm = run_vm(&hot_call_source(HOT_THRESHOLD as usize));

   assert_eq!(vm.jit.stats.template_calls, 1);
   assert_eq!(vm.jit.tier1.cache_size(), 1);
   assert_eq!(vm.jit.tier1.total_compilations(), 1);
}
