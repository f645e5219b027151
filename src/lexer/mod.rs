use crate::lexer::morphology::{is_hangul_syllable, Dictionary, MorphologicalAnalyzer, WordClass};
use crate::lexer::tokens::{make_identifier_kind, Token, TokenKind};

// Submodules
pub mod morphology;
pub mod tokens;

/// Struct that represents the lexer. Tokens are produced lazily, one call
/// to `next_token` at a time; the lexer is restartable per source file but
/// not mid-stream.
pub struct Lexer<'a> {
   /// A flat list of characters from the source file.
   source: Vec<char>,
   /// The word dictionary used to separate nouns from postpositions.
   dictionary: &'a Dictionary,
   /// The index of the current character.
   current: usize,
   /// The current line number.
   line_num: usize,
   /// The position in the flat source vector of the first
   /// character for the current line.
   line_start: usize,
   /// The position of the first character of the current token.
   token_start: usize,
}

impl<'a> Lexer<'a> {
   /// Creates a lexer over a source string. A UTF-8 BOM is stripped and
   /// CRLF line endings are normalized to LF before lexing.
   pub fn new(src: &str, dictionary: &'a Dictionary) -> Lexer<'a> {
      let src = src.strip_prefix('\u{FEFF}').unwrap_or(src);
      let normalized = src.replace("\r\n", "\n");

      Lexer {
         source: normalized.chars().collect(),
         dictionary,
         current: 0,
         line_num: 1,
         line_start: 0,
         token_start: 0,
      }
   }

   /// Lexes the entire source eagerly. Used by tests and tools that want
   /// the full token list at once.
   pub fn tokenize(src: &str, dictionary: &'a Dictionary) -> Vec<Token> {
      let mut lexer = Lexer::new(src, dictionary);
      let mut tokens = vec![];

      loop {
         let token = lexer.next_token();
         let done = token.kind == TokenKind::EOF;
         tokens.push(token);

         if done {
            break;
         }
      }

      tokens
   }

   fn is_at_end(&self) -> bool {
      self.current >= self.source.len()
   }

   fn get_current(&self) -> char {
      if self.is_at_end() {
         return '\0';
      }
      self.source[self.current]
   }

   fn get_next(&self) -> char {
      if self.current + 1 >= self.source.len() {
         return '\0';
      }
      self.source[self.current + 1]
   }

   fn advance(&mut self) -> char {
      let c = self.get_current();
      self.current += 1;
      c
   }

   /// Matches the current character against a provided character,
   /// consuming it on success.
   fn matches(&mut self, expected: char) -> bool {
      if self.is_at_end() || self.get_current() != expected {
         return false;
      }
      self.current += 1;
      true
   }

   /// Skips whitespace-like characters and comments from the source code.
   fn skip_whitespace(&mut self) {
      loop {
         if self.is_at_end() {
            break;
         }

         let c = self.get_current();

         if c == ' ' || c == '\r' || c == '\t' {
            self.advance();
         } else if c == '\n' {
            self.line_num += 1;
            self.line_start = self.current + 1;
            self.advance();
         } else if c == '#' {
            self.skip_line_comment();
         } else if c == '/' && self.get_next() == '/' {
            self.skip_line_comment();
         } else if c == '/' && self.get_next() == '*' {
            self.skip_block_comment();
         } else {
            break;
         }
      }
   }

   fn skip_line_comment(&mut self) {
      while !self.is_at_end() && self.get_current() != '\n' {
         self.advance();
      }
   }

   /// Block comments do not nest.
   fn skip_block_comment(&mut self) {
      self.advance();
      self.advance();

      while !self.is_at_end() {
         if self.get_current() == '*' && self.get_next() == '/' {
            self.advance();
            self.advance();
            break;
         }

         if self.get_current() == '\n' {
            self.line_num += 1;
            self.line_start = self.current + 1;
         }

         self.advance();
      }
   }

   /// Produces the next token in the stream. After EOF, keeps yielding EOF.
   pub fn next_token(&mut self) -> Token {
      self.skip_whitespace();
      self.token_start = self.current;

      if self.is_at_end() {
         return self.make_token(TokenKind::EOF);
      }

      let c = self.advance();

      match c {
         '=' => {
            if self.matches('=') {
               self.make_token(TokenKind::EQ)
            } else {
               self.make_token(TokenKind::ASSIGN)
            }
         }
         '!' => {
            if self.matches('=') {
               self.make_token(TokenKind::NOT_EQ)
            } else {
               self.make_token(TokenKind::BANG)
            }
         }
         '<' => {
            if self.matches('=') {
               self.make_token(TokenKind::LESS_EQ)
            } else {
               self.make_token(TokenKind::LESS)
            }
         }
         '>' => {
            if self.matches('=') {
               self.make_token(TokenKind::GREATER_EQ)
            } else {
               self.make_token(TokenKind::GREATER)
            }
         }
         '&' => {
            if self.matches('&') {
               self.make_token(TokenKind::LOGIC_AND)
            } else {
               self.make_illegal_token("&")
            }
         }
         '|' => {
            if self.matches('|') {
               self.make_token(TokenKind::LOGIC_OR)
            } else {
               self.make_illegal_token("|")
            }
         }
         '-' => {
            if self.matches('>') {
               self.make_token(TokenKind::ARROW)
            } else {
               self.make_token(TokenKind::MINUS)
            }
         }
         '+' => self.make_token(TokenKind::PLUS),
         '*' => self.make_token(TokenKind::STAR),
         '/' => self.make_token(TokenKind::SLASH),
         '%' => self.make_token(TokenKind::PERCENT),
         '(' => self.make_token(TokenKind::L_PAREN),
         ')' => self.make_token(TokenKind::R_PAREN),
         '{' => self.make_token(TokenKind::L_CURLY),
         '}' => self.make_token(TokenKind::R_CURLY),
         '[' => self.make_token(TokenKind::L_BRACKET),
         ']' => self.make_token(TokenKind::R_BRACKET),
         ',' => self.make_token(TokenKind::COMMA),
         ';' => self.make_token(TokenKind::SEMICOLON),
         ':' => self.make_token(TokenKind::COLON),
         '.' => self.make_token(TokenKind::DOT),
         '"' | '\'' => self.make_string_token(c),
         _ => {
            if c == '_' && !is_identifier_part(self.get_current()) {
               // A lone underscore is the wildcard pattern.
               self.make_token(TokenKind::UNDERSCORE)
            } else if is_identifier_start(c) {
               self.make_identifier_token()
            } else if c.is_ascii_digit() {
               self.make_number_token()
            } else {
               self.make_illegal_token(&String::from(c))
            }
         }
      }
   }

   /// Lexes a numeric literal. A number containing `.` becomes a float.
   fn make_number_token(&mut self) -> Token {
      while self.get_current().is_ascii_digit() {
         self.advance();
      }

      let mut is_float = false;
      if self.get_current() == '.' && self.get_next().is_ascii_digit() {
         is_float = true;
         self.advance();

         while self.get_current().is_ascii_digit() {
            self.advance();
         }
      }

      if is_float {
         self.make_token(TokenKind::FLOAT)
      } else {
         self.make_token(TokenKind::INTEGER)
      }
   }

   /// Lexes a string literal delimited by `"` or `'`, honoring the escape
   /// sequences \n \t \r \\ \" \'. An unterminated string yields an
   /// `ILLEGAL` token and the lexer continues.
   fn make_string_token(&mut self, quote: char) -> Token {
      let mut value = String::new();

      while !self.is_at_end() && self.get_current() != quote {
         let c = self.advance();

         if c == '\n' {
            self.line_num += 1;
            self.line_start = self.current;
            value.push(c);
         } else if c == '\\' {
            let escaped = self.advance();
            match escaped {
               'n' => value.push('\n'),
               't' => value.push('\t'),
               'r' => value.push('\r'),
               '\\' => value.push('\\'),
               '"' => value.push('"'),
               '\'' => value.push('\''),
               other => value.push(other),
            }
         } else {
            value.push(c);
         }
      }

      if self.is_at_end() {
         return self.make_illegal_token(&value);
      }

      self.advance(); // closing quote

      Token {
         line_num: self.line_num,
         column: self.token_column(),
         kind: TokenKind::STRING,
         lexeme: value,
      }
   }

   /// Reads a maximal identifier run and applies the postposition split.
   fn make_identifier_token(&mut self) -> Token {
      while is_identifier_part(self.get_current()) {
         self.advance();
      }

      let word: String = self.source[self.token_start..self.current].iter().collect();

      // The whole run may be a postposition on its own ("으로", "에서").
      if self.dictionary.is_josa(&word) {
         return self.finish_word_token(&word);
      }

      // Builtins and registered nouns are single tokens.
      match self.dictionary.word_class(&word) {
         WordClass::BuiltinFunc | WordClass::BuiltinVar | WordClass::Noun => {
            return self.finish_word_token(&word);
         }
         _ => {}
      }

      let analyzer = MorphologicalAnalyzer::new(self.dictionary);
      let morphemes = analyzer.analyze(&word);

      if morphemes.len() == 2 {
         // Rewind the cursor to the start of the stripped suffix so the
         // postposition lexes as the next token.
         let suffix_len = morphemes[1].base.chars().count();
         self.current -= suffix_len;
         let base = morphemes[0].base.clone();
         return self.finish_word_token(&base);
      }

      self.finish_word_token(&word)
   }

   /// Builds a word token, fusing `에 대해` into the match keyword when the
   /// word `에` is directly followed by whitespace and `대해`.
   fn finish_word_token(&mut self, word: &str) -> Token {
      if word == "에" && (self.get_current() == ' ' || self.get_current() == '\t') {
         let saved_current = self.current;
         let saved_line = self.line_num;
         let saved_line_start = self.line_start;

         while self.get_current() == ' ' || self.get_current() == '\t' {
            self.advance();
         }

         let follow_start = self.current;
         while is_identifier_part(self.get_current()) {
            self.advance();
         }
         let follow: String = self.source[follow_start..self.current].iter().collect();

         if follow == "대해" {
            return Token {
               line_num: self.line_num,
               column: self.token_column(),
               kind: TokenKind::MATCH_KW,
               lexeme: String::from("에 대해"),
            };
         }

         self.current = saved_current;
         self.line_num = saved_line;
         self.line_start = saved_line_start;
      }

      Token {
         line_num: self.line_num,
         column: self.token_column(),
         kind: make_identifier_kind(word),
         lexeme: String::from(word),
      }
   }

   /// Generates a token with the current state of the lexer.
   fn make_token(&self, kind: TokenKind) -> Token {
      let lexeme: String = match kind {
         TokenKind::EOF => String::new(),
         _ => self.source[self.token_start..self.current].iter().collect(),
      };

      Token {
         line_num: self.line_num,
         column: self.token_column(),
         kind,
         lexeme,
      }
   }

   /// Generates an `ILLEGAL` token carrying the offending text.
   fn make_illegal_token(&self, lexeme: &str) -> Token {
      Token {
         line_num: self.line_num,
         column: self.token_column(),
         kind: TokenKind::ILLEGAL,
         lexeme: String::from(lexeme),
      }
   }

   fn token_column(&self) -> usize {
      self.token_start.saturating_sub(self.line_start) + 1
   }
}

/// Identifier start: ASCII letter, underscore, or a Hangul syllable.
fn is_identifier_start(c: char) -> bool {
   c.is_ascii_alphabetic() || c == '_' || is_hangul_syllable(c)
}

/// Identifier continuation additionally allows ASCII digits.
fn is_identifier_part(c: char) -> bool {
   is_identifier_start(c) || c.is_ascii_digit()
}
