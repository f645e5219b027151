/// A token that represents a single unit of Sejong code.
#[derive(Clone, Debug)]
pub struct Token {
   /// The token's line number (1-based).
   pub line_num: usize,
   /// The token's column number (1-based).
   pub column: usize,
   /// The token's type.
   pub kind: TokenKind,
   /// The token's lexeme, exactly as it appears in the source.
   pub lexeme: String,
}

impl Token {
   pub fn new(kind: TokenKind, lexeme: &str, line_num: usize, column: usize) -> Token {
      Token {
         line_num,
         column,
         kind,
         lexeme: String::from(lexeme),
      }
   }

   /// A token position is only meaningful for lines starting at 1.
   pub fn has_valid_location(&self) -> bool {
      self.line_num >= 1
   }
}

/// The eleven postposition kinds the parser distinguishes. Other
/// dictionary postpositions (과, 와, 도, …) lex as plain identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum JosaKind {
   Eul,  // 을 (object marker, final consonant)
   Reul, // 를 (object marker, no final consonant)
   I,    // 이 (subject marker, final consonant)
   Ga,   // 가 (subject marker, no final consonant)
   Eun,  // 은 (topic marker, final consonant)
   Neun, // 는 (topic marker, no final consonant)
   Ui,   // 의 (possessive)
   Ro,   // 로 (direction/means)
   Euro, // 으로 (direction/means, final consonant)
   Eseo, // 에서 (location, source)
   E,    // 에 (location, target)
}

impl JosaKind {
   pub fn from_u8(v: u8) -> Option<JosaKind> {
      match v {
         0 => Some(JosaKind::Eul),
         1 => Some(JosaKind::Reul),
         2 => Some(JosaKind::I),
         3 => Some(JosaKind::Ga),
         4 => Some(JosaKind::Eun),
         5 => Some(JosaKind::Neun),
         6 => Some(JosaKind::Ui),
         7 => Some(JosaKind::Ro),
         8 => Some(JosaKind::Euro),
         9 => Some(JosaKind::Eseo),
         10 => Some(JosaKind::E),
         _ => None,
      }
   }
}

/// The types of tokens in a Sejong program.
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, PartialEq)]
#[repr(u8)]
pub enum TokenKind {
   // Literals
   IDENTIFIER,
   INTEGER,
   FLOAT,
   STRING,
   TRUE,  // 참
   FALSE, // 거짓

   // Operators
   ASSIGN,     // =
   PLUS,       // +
   MINUS,      // -
   STAR,       // *
   SLASH,      // /
   PERCENT,    // %
   EQ,         // ==
   NOT_EQ,     // !=
   LESS,       // <
   GREATER,    // >
   LESS_EQ,    // <=
   GREATER_EQ, // >=
   LOGIC_AND,  // &&
   LOGIC_OR,   // ||
   BANG,       // !

   // Delimiters
   L_PAREN,    // (
   R_PAREN,    // )
   L_CURLY,    // {
   R_CURLY,    // }
   L_BRACKET,  // [
   R_BRACKET,  // ]
   COMMA,      // ,
   SEMICOLON,  // ;
   COLON,      // :
   DOT,        // .
   UNDERSCORE, // _
   ARROW,      // ->

   // Postpositions (조사)
   JOSA_EUL,
   JOSA_REUL,
   JOSA_I,
   JOSA_GA,
   JOSA_EUN,
   JOSA_NEUN,
   JOSA_UI,
   JOSA_RO,
   JOSA_EURO,
   JOSA_ESEO,
   JOSA_E,

   // Range keywords
   BUTEO,  // 부터 (from)
   KKAJI,  // 까지 (up to, inclusive)
   MIMAN,  // 미만 (less than)
   CHOGWA, // 초과 (greater than)
   IHA,    // 이하 (at most)
   ISANG,  // 이상 (at least)
   BEON,   // 번 (times)

   // Loop keywords
   REPEAT_KW,    // 반복
   REPEAT_DO_KW, // 반복한다
   EACH_KW,      // 각각

   // Control keywords
   IF_KW,    // 만약
   ELSE_KW,  // 아니면
   WHILE_KW, // 동안

   // Function keywords
   FUNC_KW,   // 함수
   RETURN_KW, // 반환

   // Module keyword
   IMPORT_KW, // 가져오기

   // Type keywords
   INT_TYPE,    // 정수
   FLOAT_TYPE,  // 실수
   CHAR_TYPE,   // 문자
   STRING_TYPE, // 문자열
   BOOL_TYPE,   // 논리
   ARRAY_TYPE,  // 배열

   // Pattern matching
   MATCH_KW, // 에 대해

   // Exception keywords
   TRY_KW,   // 시도
   CATCH_KW, // 오류
   THROW_KW, // 던지다

   // Class keywords
   CLASS_KW,       // 클래스
   CONSTRUCTOR_KW, // 생성자
   THIS_KW,        // 자신

   ILLEGAL,
   EOF,
}

impl TokenKind {
   /// The postposition kind for josa token kinds, `None` for everything else.
   pub fn josa_kind(&self) -> Option<JosaKind> {
      match self {
         TokenKind::JOSA_EUL => Some(JosaKind::Eul),
         TokenKind::JOSA_REUL => Some(JosaKind::Reul),
         TokenKind::JOSA_I => Some(JosaKind::I),
         TokenKind::JOSA_GA => Some(JosaKind::Ga),
         TokenKind::JOSA_EUN => Some(JosaKind::Eun),
         TokenKind::JOSA_NEUN => Some(JosaKind::Neun),
         TokenKind::JOSA_UI => Some(JosaKind::Ui),
         TokenKind::JOSA_RO => Some(JosaKind::Ro),
         TokenKind::JOSA_EURO => Some(JosaKind::Euro),
         TokenKind::JOSA_ESEO => Some(JosaKind::Eseo),
         TokenKind::JOSA_E => Some(JosaKind::E),
         _ => None,
      }
   }

   pub fn is_josa(&self) -> bool {
      self.josa_kind().is_some()
   }
}

/// Maps an identifier string to a keyword token kind.
///
/// # Parameters
/// - `id`: The identifier's string name.
///
/// # Returns
/// `TokenKind`: The kind matched for the given identifier name.
pub fn make_identifier_kind(id: &str) -> TokenKind {
   match id {
      // Postpositions
      "을" => TokenKind::JOSA_EUL,
      "를" => TokenKind::JOSA_REUL,
      "이" => TokenKind::JOSA_I,
      "가" => TokenKind::JOSA_GA,
      "은" => TokenKind::JOSA_EUN,
      "는" => TokenKind::JOSA_NEUN,
      "의" => TokenKind::JOSA_UI,
      "로" => TokenKind::JOSA_RO,
      "으로" => TokenKind::JOSA_EURO,
      "에서" => TokenKind::JOSA_ESEO,
      "에" => TokenKind::JOSA_E,

      // Range and loop keywords
      "부터" => TokenKind::BUTEO,
      "까지" => TokenKind::KKAJI,
      "미만" => TokenKind::MIMAN,
      "초과" => TokenKind::CHOGWA,
      "이하" => TokenKind::IHA,
      "이상" => TokenKind::ISANG,
      "번" => TokenKind::BEON,
      "반복" => TokenKind::REPEAT_KW,
      "반복한다" => TokenKind::REPEAT_DO_KW,
      "각각" => TokenKind::EACH_KW,

      // Control flow
      "만약" => TokenKind::IF_KW,
      "아니면" => TokenKind::ELSE_KW,
      "동안" => TokenKind::WHILE_KW,

      // Functions and modules
      "함수" => TokenKind::FUNC_KW,
      "반환" => TokenKind::RETURN_KW,
      "가져오기" => TokenKind::IMPORT_KW,

      // Types
      "정수" => TokenKind::INT_TYPE,
      "실수" => TokenKind::FLOAT_TYPE,
      "문자" => TokenKind::CHAR_TYPE,
      "문자열" => TokenKind::STRING_TYPE,
      "논리" => TokenKind::BOOL_TYPE,
      "배열" => TokenKind::ARRAY_TYPE,

      // Booleans
      "참" => TokenKind::TRUE,
      "거짓" => TokenKind::FALSE,

      // Exceptions
      "시도" => TokenKind::TRY_KW,
      "오류" => TokenKind::CATCH_KW,
      "던지다" => TokenKind::THROW_KW,

      // Classes
      "클래스" => TokenKind::CLASS_KW,
      "생성자" => TokenKind::CONSTRUCTOR_KW,
      "자신" => TokenKind::THIS_KW,

      _ => TokenKind::IDENTIFIER,
   }
}
