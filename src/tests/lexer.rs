use crate::lexer::morphology::{Dictionary, MorphologicalAnalyzer, WordClass};
use crate::lexer::tokens::TokenKind;
use crate::lexer::Lexer;

fn lex_kinds(src: &str) -> Vec<(TokenKind, String)> {
   let dictionary = Dictionary::default();
   Lexer::tokenize(src, &dictionary)
      .into_iter()
      .filter(|t| t.kind != TokenKind::EOF)
      .map(|t| (t.kind, t.lexeme))
      .collect()
}

#[test]
fn postposition_splits_off_content_word() {
   let tokens = lex_kinds("점수를");

   assert_eq!(tokens.len(), 2);
   assert_eq!(tokens[0], (TokenKind::IDENTIFIER, String::from("점수")));
   assert_eq!(tokens[1], (TokenKind::JOSA_REUL, String::from("를")));
}

#[test]
fn two_char_postposition_wins_over_one_char() {
   // 에서 must strip as a whole, not as 서 after 에.
   let tokens = lex_kinds("학교에서");

   assert_eq!(tokens.len(), 2);
   assert_eq!(tokens[0], (TokenKind::IDENTIFIER, String::from("학교")));
   assert_eq!(tokens[1], (TokenKind::JOSA_ESEO, String::from("에서")));
}

#[test]
fn registered_noun_is_never_split() {
   // 나이 ends in the postposition 이 but is a dictionary noun.
   let tokens = lex_kinds("나이");

   assert_eq!(tokens.len(), 1);
   assert_eq!(tokens[0], (TokenKind::IDENTIFIER, String::from("나이")));
}

#[test]
fn noun_with_trailing_postposition_still_splits() {
   // The noun itself is protected, but 나이를 sheds its 를.
   let tokens = lex_kinds("나이를");

   assert_eq!(tokens.len(), 2);
   assert_eq!(tokens[0].1, "나이");
   assert_eq!(tokens[1], (TokenKind::JOSA_REUL, String::from("를")));
}

#[test]
fn ascii_identifier_sheds_postposition() {
   let tokens = lex_kinds("i가");

   assert_eq!(tokens.len(), 2);
   assert_eq!(tokens[0], (TokenKind::IDENTIFIER, String::from("i")));
   assert_eq!(tokens[1], (TokenKind::JOSA_GA, String::from("가")));
}

#[test]
fn underscore_before_hangul_blocks_the_split() {
   let tokens = lex_kinds("size_는");

   assert_eq!(tokens.len(), 1);
   assert_eq!(tokens[0].1, "size_는");
}

#[test]
fn digit_before_hangul_blocks_the_split() {
   let tokens = lex_kinds("값2가");

   assert_eq!(tokens.len(), 1);
}

#[test]
fn builtin_names_are_protected() {
   assert_eq!(lex_kinds("절대경로").len(), 1);
   assert_eq!(lex_kinds("디렉토리인가").len(), 1);
   assert_eq!(lex_kinds("출력").len(), 1);
}

#[test]
fn standalone_postposition_lexes_as_itself() {
   let tokens = lex_kinds("으로");

   assert_eq!(tokens.len(), 1);
   assert_eq!(tokens[0].0, TokenKind::JOSA_EURO);
}

#[test]
fn keywords_reclassify_after_split() {
   // 배열 is both a dictionary noun and the array type keyword.
   let tokens = lex_kinds("배열을");

   assert_eq!(tokens.len(), 2);
   assert_eq!(tokens[0].0, TokenKind::ARRAY_TYPE);
   assert_eq!(tokens[1].0, TokenKind::JOSA_EUL);
}

#[test]
fn split_tokens_concatenate_back_to_the_word() {
   for word in ["점수를", "배열을", "나이", "i가", "학교에서", "크기"] {
      let rebuilt: String = lex_kinds(word).iter().map(|(_, lexeme)| lexeme.as_str()).collect();
      assert_eq!(rebuilt, word);
   }
}

#[test]
fn roundtrip_drops_only_whitespace_and_comments() {
   let src = "정수 합 = 0 # 합계\n합 = 합 + 1 // 증가\n/* 블록 */ 출력(합)";
   let rebuilt: String = lex_kinds(src).iter().map(|(_, lexeme)| lexeme.as_str()).collect();

   let expected: String = src
      .replace("# 합계", "")
      .replace("// 증가", "")
      .replace("/* 블록 */", "")
      .chars()
      .filter(|c| !c.is_whitespace())
      .collect();

   assert_eq!(rebuilt, expected);
}

#[test]
fn match_keyword_fuses_with_following_word() {
   let tokens = lex_kinds("값 에 대해");

   assert_eq!(tokens.len(), 2);
   assert_eq!(tokens[1].0, TokenKind::MATCH_KW);
}

#[test]
fn illegal_byte_becomes_an_illegal_token_and_lexing_continues() {
   let dictionary = Dictionary::default();
   let tokens = Lexer::tokenize("1 @ 2", &dictionary);

   assert_eq!(tokens[0].kind, TokenKind::INTEGER);
   assert_eq!(tokens[1].kind, TokenKind::ILLEGAL);
   assert_eq!(tokens[2].kind, TokenKind::INTEGER);
}

#[test]
fn unterminated_string_is_an_illegal_token() {
   let dictionary = Dictionary::default();
   let tokens = Lexer::tokenize("\"끝나지 않음", &dictionary);

   assert_eq!(tokens[0].kind, TokenKind::ILLEGAL);
}

#[test]
fn string_escapes_are_decoded() {
   let dictionary = Dictionary::default();
   let tokens = Lexer::tokenize("\"줄\\n바꿈\"", &dictionary);

   assert_eq!(tokens[0].kind, TokenKind::STRING);
   assert_eq!(tokens[0].lexeme, "줄\n바꿈");
}

#[test]
fn number_with_dot_is_a_float() {
   let tokens = lex_kinds("3.14 42");

   assert_eq!(tokens[0].0, TokenKind::FLOAT);
   assert_eq!(tokens[1].0, TokenKind::INTEGER);
}

#[test]
fn locations_are_one_based() {
   let dictionary = Dictionary::default();
   let tokens = Lexer::tokenize("정수\n합", &dictionary);

   assert_eq!(tokens[0].line_num, 1);
   assert_eq!(tokens[0].column, 1);
   assert_eq!(tokens[1].line_num, 2);
   assert!(tokens[1].has_valid_location());
}

#[test]
fn dictionary_classification_priority() {
   let dictionary = Dictionary::default();

   // 정수 is both a builtin conversion and a keyword noun: builtin wins.
   assert_eq!(dictionary.word_class("정수"), WordClass::BuiltinFunc);
   // 경로 is both a noun and a builtin variable: the variable wins.
   assert_eq!(dictionary.word_class("경로"), WordClass::BuiltinVar);
   // 로 is a postposition.
   assert_eq!(dictionary.word_class("로"), WordClass::Josa);
   assert_eq!(dictionary.word_class("온도"), WordClass::Noun);
   assert_eq!(dictionary.word_class("정렬하다"), WordClass::Verb);
   assert_eq!(dictionary.word_class("미지의단어"), WordClass::Unknown);
}

#[test]
fn analyzer_yields_one_morpheme_without_a_split() {
   let dictionary = Dictionary::default();
   let analyzer = MorphologicalAnalyzer::new(&dictionary);

   assert_eq!(analyzer.analyze("나이").len(), 1);
   assert_eq!(analyzer.analyze("원의_넓이").len(), 1);
   assert_eq!(analyzer.analyze("절대경로").len(), 1);
}

#[test]
fn analyzer_yields_two_morphemes_on_a_split() {
   let dictionary = Dictionary::default();
   let analyzer = MorphologicalAnalyzer::new(&dictionary);

   let morphemes = analyzer.analyze("점수를");
   assert_eq!(morphemes.len(), 2);
   assert_eq!(morphemes[0].base, "점수");
   assert_eq!(morphemes[1].base, "를");
}
