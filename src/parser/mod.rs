use std::collections::VecDeque;

use crate::errors::{ErrorReport, LexerErrorType, ParserErrorType};
use crate::lexer::morphology::Dictionary;
use crate::lexer::tokens::{Token, TokenKind};
use crate::lexer::Lexer;
use crate::parser::ast::Module;

// Submodules
pub mod ast;
mod expressions;
mod statements;

/// Expression-parsing feature flags, combined as a bitmask. `RANGE` is the
/// principal toggle: range expressions are forbidden inside for-loop bounds
/// where the range keywords are loop syntax rather than operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseFeatures(u32);

impl ParseFeatures {
   pub const NONE: ParseFeatures = ParseFeatures(0);
   pub const RANGE: ParseFeatures = ParseFeatures(1);
   pub const ALL: ParseFeatures = ParseFeatures(u32::MAX);

   pub fn has(&self, flag: ParseFeatures) -> bool {
      self.0 & flag.0 != 0
   }

   pub fn without(&self, flag: ParseFeatures) -> ParseFeatures {
      ParseFeatures(self.0 & !flag.0)
   }
}

/// Operator precedence, low to high.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
   Lowest,
   Assign,
   Range,
   Or,
   And,
   Equality,
   Comparison,
   Term,
   Factor,
   Unary,
   Call,
   Index,
}

/// Represents the Sejong parser, which converts source text into an
/// abstract syntax tree using Pratt (top-down operator precedence) parsing
/// with a four-token lookahead window.
pub struct Parser<'a> {
   /// The lazy lexer feeding this parser.
   lexer: Lexer<'a>,
   /// The previously consumed token.
   previous: Token,
   /// The current token.
   current: Token,
   /// Tokens fetched ahead of `current`, at most three.
   lookahead: VecDeque<Token>,
   /// Whether the parser is in error-recovery mode.
   is_in_panic: bool,
   /// The list of errors reported while parsing.
   errors: Vec<ErrorReport>,
}

impl<'a> Parser<'a> {
   /// Parses a source string into a Sejong module.
   ///
   /// # Parameters
   /// - `src`: The source string for the program.
   /// - `dictionary`: The word dictionary consulted by the lexer.
   ///
   /// # Returns
   /// - `Ok(Module)`: The parsed program.
   /// - `Err(Vec<ErrorReport>)`: Every syntax error found.
   pub fn parse(src: &str, dictionary: &'a Dictionary) -> Result<Module, Vec<ErrorReport>> {
      let mut parser = Parser {
         lexer: Lexer::new(src, dictionary),
         previous: Token::new(TokenKind::EOF, "", 0, 0),
         current: Token::new(TokenKind::EOF, "", 0, 0),
         lookahead: VecDeque::new(),
         is_in_panic: false,
         errors: vec![],
      };

      parser.advance();

      let mut module = Module { body: vec![] };

      while !parser.check(&TokenKind::EOF) {
         match parser.parse_statement() {
            Some(stmt) => module.body.push(stmt),
            None => parser.synchronize(),
         }
      }

      if parser.errors.is_empty() {
         Ok(module)
      } else {
         Err(parser.errors)
      }
   }

   /// Pulls the next well-formed token from the lexer, reporting illegal
   /// tokens as lexer errors and skipping past them.
   fn fetch_token(&mut self) -> Token {
      loop {
         let token = self.lexer.next_token();

         if token.kind == TokenKind::ILLEGAL {
            let kind = if token.lexeme.len() > 1 {
               LexerErrorType::UnterminatedString
            } else {
               LexerErrorType::InvalidToken
            };
            self.errors.push(ErrorReport::new(
               token.line_num,
               token.column,
               kind.name(),
               format!("Illegal token '{}'.", token.lexeme),
            ));
            continue;
         }

         return token;
      }
   }

   /// Advances the parser to the next token.
   fn advance(&mut self) {
      let next = match self.lookahead.pop_front() {
         Some(t) => t,
         None => self.fetch_token(),
      };

      self.previous = std::mem::replace(&mut self.current, next);
   }

   /// Looks `n` tokens past the current one without consuming anything.
   /// `peek_at(0)` is the current token; the window extends to three ahead.
   fn peek_at(&mut self, n: usize) -> &Token {
      if n == 0 {
         return &self.current;
      }

      while self.lookahead.len() < n {
         let token = self.fetch_token();
         self.lookahead.push_back(token);
      }

      &self.lookahead[n - 1]
   }

   /// Checks that the current token matches the given kind.
   fn check(&self, kind: &TokenKind) -> bool {
      self.current.kind == *kind
   }

   /// Consumes the current token if it matches the given kind.
   fn matches(&mut self, kind: &TokenKind) -> bool {
      if self.check(kind) {
         self.advance();
         true
      } else {
         false
      }
   }

   /// Consumes the current token only if it is of a given kind; reports a
   /// `MissingToken` error otherwise.
   fn consume(&mut self, kind: &TokenKind, message: &str) {
      if self.check(kind) {
         self.advance();
         return;
      }

      self.error_at_current(ParserErrorType::MissingToken, message);
   }

   fn error_at_current(&mut self, kind: ParserErrorType, message: &str) {
      let token = self.current.clone();
      self.error_at_token(&token, kind, message);
   }

   fn error_at_previous(&mut self, kind: ParserErrorType, message: &str) {
      let token = self.previous.clone();
      self.error_at_token(&token, kind, message);
   }

   /// Records an error at the given token. While in panic mode all further
   /// errors are swallowed until the parser resynchronizes.
   fn error_at_token(&mut self, token: &Token, kind: ParserErrorType, message: &str) {
      if self.is_in_panic {
         return;
      }
      self.is_in_panic = true;

      self.errors.push(ErrorReport::new(
         token.line_num,
         token.column,
         kind.name(),
         String::from(message),
      ));
   }

   /// Discards tokens until a statement boundary so one syntax error does
   /// not cascade into dozens.
   fn synchronize(&mut self) {
      self.is_in_panic = false;

      while !self.check(&TokenKind::EOF) {
         if self.previous.kind == TokenKind::SEMICOLON {
            return;
         }

         match self.current.kind {
            TokenKind::R_CURLY
            | TokenKind::FUNC_KW
            | TokenKind::CLASS_KW
            | TokenKind::IF_KW
            | TokenKind::WHILE_KW
            | TokenKind::RETURN_KW
            | TokenKind::IMPORT_KW
            | TokenKind::TRY_KW
            | TokenKind::INT_TYPE
            | TokenKind::FLOAT_TYPE
            | TokenKind::STRING_TYPE
            | TokenKind::BOOL_TYPE => return,
            _ => {}
         }

         self.advance();
      }
   }
}
