use crate::lexer::morphology::Dictionary;
use crate::parser::ast::*;
use crate::parser::Parser;

fn parse_ok(src: &str) -> Module {
   let dictionary = Dictionary::default();
   match Parser::parse(src, &dictionary) {
      Ok(module) => module,
      Err(errors) => panic!("parser had errors: {:?}", errors.first().map(|e| &e.message)),
   }
}

#[test]
fn variable_declaration_with_annotation() {
   let module = parse_ok("정수 합 = 0");

   assert_eq!(module.body.len(), 1);
   match &module.body[0] {
      Stmt::VarDecl(decl) => {
         assert_eq!(decl.name, "합");
         assert_eq!(decl.annotation, Some(TypeAnnotation::Int));
         assert!(matches!(decl.value, Expr::IntLit(_)));
      }
      _ => panic!("expected a variable declaration"),
   }
}

#[test]
fn range_for_head_is_recognized() {
   let module = parse_ok("i가 1부터 10까지 반복 { 출력(i) }");

   match &module.body[0] {
      Stmt::RangeFor(range) => {
         assert_eq!(range.variable, "i");
         assert_eq!(range.bound, RangeBound::UpToInclusive);
      }
      _ => panic!("expected a range-for statement"),
   }
}

#[test]
fn range_for_accepts_exclusive_bounds() {
   let module = parse_ok("i가 0부터 n 미만 반복 { }");

   match &module.body[0] {
      Stmt::RangeFor(range) => assert_eq!(range.bound, RangeBound::LessThan),
      _ => panic!("expected a range-for statement"),
   }
}

#[test]
fn subject_postposition_without_buteo_is_an_expression() {
   // No 부터 in the lookahead window: this is a josa call, not a loop.
   let module = parse_ok("목록이 정렬한다");

   match &module.body[0] {
      Stmt::ExprStmt(s) => assert!(matches!(s.expr, Expr::JosaCall(_))),
      _ => panic!("expected an expression statement"),
   }
}

#[test]
fn josa_call_records_method_and_kind() {
   let module = parse_ok("목록을 정렬한다");

   match &module.body[0] {
      Stmt::ExprStmt(s) => match &s.expr {
         Expr::JosaCall(jc) => {
            assert_eq!(jc.method, "정렬한다");
            assert_eq!(jc.josa, crate::lexer::tokens::JosaKind::Eul);
         }
         _ => panic!("expected a josa call"),
      },
      _ => panic!("expected an expression statement"),
   }
}

#[test]
fn repeat_for_statement() {
   let module = parse_ok("5번 반복 { 출력(1) }");

   match &module.body[0] {
      Stmt::RepeatFor(repeat) => assert!(matches!(repeat.count, Expr::IntLit(_))),
      _ => panic!("expected a repeat-for statement"),
   }
}

#[test]
fn while_statement() {
   let module = parse_ok("동안 (참) { }");

   match &module.body[0] {
      Stmt::While(w) => assert!(matches!(w.condition, Expr::BoolLit(_))),
      _ => panic!("expected a while statement"),
   }
}

#[test]
fn if_else_chain() {
   let module = parse_ok("만약 (1 < 2) { } 아니면 만약 (2 < 3) { } 아니면 { }");

   match &module.body[0] {
      Stmt::If(s) => {
         assert!(s.else_branch.is_some());
         match s.else_branch.as_deref() {
            Some(Stmt::If(inner)) => assert!(inner.else_branch.is_some()),
            _ => panic!("expected a nested if in the else branch"),
         }
      }
      _ => panic!("expected an if statement"),
   }
}

#[test]
fn function_declaration_binds_a_literal() {
   let module = parse_ok("함수 더하기(a, b) { 반환 a + b }");

   match &module.body[0] {
      Stmt::FuncDecl(decl) => {
         assert_eq!(decl.name, "더하기");
         assert_eq!(decl.func.params, vec!["a", "b"]);
         assert_eq!(decl.func.body.len(), 1);
      }
      _ => panic!("expected a function declaration"),
   }
}

#[test]
fn match_expression_with_wildcard() {
   let module = parse_ok("결과 = 값 에 대해 { 1 -> \"하나\", 2 -> \"둘\", _ -> \"기타\" }");

   match &module.body[0] {
      Stmt::Assignment(assign) => match &assign.value {
         Expr::Match(m) => {
            assert_eq!(m.arms.len(), 3);
            assert!(matches!(m.arms[2].pattern, MatchPattern::Wildcard));
         }
         _ => panic!("expected a match expression"),
      },
      _ => panic!("expected an assignment"),
   }
}

#[test]
fn class_declaration_with_members() {
   let module = parse_ok(
      "클래스 사람 {\n 이름\n 생성자(n) { 자신.이름 = n }\n 함수 인사() { 반환 자신.이름 }\n}",
   );

   match &module.body[0] {
      Stmt::Class(decl) => {
         assert_eq!(decl.name, "사람");
         assert_eq!(decl.fields.len(), 1);
         assert!(decl.constructor.is_some());
         assert_eq!(decl.methods.len(), 1);
      }
      _ => panic!("expected a class declaration"),
   }
}

#[test]
fn try_throw_statements() {
   let module = parse_ok("시도 { 던지다 \"문제\" } 오류 이유 { 출력(이유) }");

   match &module.body[0] {
      Stmt::Try(t) => assert_eq!(t.error_name, "이유"),
      _ => panic!("expected a try statement"),
   }
}

#[test]
fn range_expression_outside_loop_bounds() {
   let module = parse_ok("숫자들 = 1부터 5까지");

   match &module.body[0] {
      Stmt::Assignment(assign) => assert!(matches!(assign.value, Expr::Range(_))),
      _ => panic!("expected an assignment"),
   }
}

#[test]
fn operator_precedence_shapes_the_tree() {
   let module = parse_ok("x = 1 + 2 * 3");

   match &module.body[0] {
      Stmt::Assignment(assign) => match &assign.value {
         Expr::Binary(add) => {
            assert_eq!(add.op, BinaryOp::Add);
            assert!(matches!(add.right.as_ref(), Expr::Binary(mul) if mul.op == BinaryOp::Mul));
         }
         _ => panic!("expected a binary expression"),
      },
      _ => panic!("expected an assignment"),
   }
}

#[test]
fn errors_are_collected_without_aborting() {
   let dictionary = Dictionary::default();
   let result = Parser::parse("만약 1 < 2 { }\n정수 x = 5", &dictionary);

   // The malformed if is reported; parsing continued to the end.
   assert!(result.is_err());
   let errors = result.err().unwrap();
   assert!(!errors.is_empty());
}

#[test]
fn invalid_assignment_target_is_an_error() {
   let dictionary = Dictionary::default();
   let result = Parser::parse("1 + 2 = 3", &dictionary);

   assert!(result.is_err());
}
