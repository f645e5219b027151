use crate::lexer::tokens::TokenKind;
use crate::errors::ParserErrorType;
use crate::parser::ast::*;
use crate::parser::{ParseFeatures, Parser, Precedence};

impl<'a> Parser<'a> {
   /// Parses a full expression with the given feature mask.
   pub(super) fn parse_expression(&mut self, features: ParseFeatures) -> Option<Expr> {
      self.parse_precedence(Precedence::Assign, features)
   }

   /// The Pratt core: parse a prefix expression, then fold infix operators
   /// while their precedence is at least `min_prec`.
   fn parse_precedence(&mut self, min_prec: Precedence, features: ParseFeatures) -> Option<Expr> {
      let mut left = self.parse_prefix(features)?;

      loop {
         let prec = self.infix_precedence(features);
         match prec {
            Some(p) if p >= min_prec => {
               left = self.parse_infix(left, p, features)?;
            }
            _ => break,
         }
      }

      Some(left)
   }

   /// The precedence the current token would have as an infix operator,
   /// `None` if it cannot continue an expression.
   fn infix_precedence(&self, features: ParseFeatures) -> Option<Precedence> {
      match self.current.kind {
         TokenKind::LOGIC_OR => Some(Precedence::Or),
         TokenKind::LOGIC_AND => Some(Precedence::And),
         TokenKind::EQ | TokenKind::NOT_EQ => Some(Precedence::Equality),
         TokenKind::LESS | TokenKind::GREATER | TokenKind::LESS_EQ | TokenKind::GREATER_EQ => {
            Some(Precedence::Comparison)
         }
         TokenKind::PLUS | TokenKind::MINUS => Some(Precedence::Term),
         TokenKind::STAR | TokenKind::SLASH | TokenKind::PERCENT => Some(Precedence::Factor),
         TokenKind::L_PAREN | TokenKind::MATCH_KW => Some(Precedence::Call),
         TokenKind::L_BRACKET | TokenKind::DOT => Some(Precedence::Index),
         TokenKind::BUTEO if features.has(ParseFeatures::RANGE) => Some(Precedence::Range),
         ref k if k.is_josa() => Some(Precedence::Call),
         _ => None,
      }
   }

   fn parse_prefix(&mut self, features: ParseFeatures) -> Option<Expr> {
      let loc = Location::new(self.current.line_num, self.current.column);

      match self.current.kind {
         TokenKind::INTEGER => {
            self.advance();
            match self.previous.lexeme.parse::<i64>() {
               Ok(value) => Some(Expr::IntLit(IntLitExpr { value, location: loc })),
               Err(_) => {
                  self.error_at_previous(ParserErrorType::UnexpectedToken, "Integer literal out of range.");
                  None
               }
            }
         }
         TokenKind::FLOAT => {
            self.advance();
            match self.previous.lexeme.parse::<f64>() {
               Ok(value) => Some(Expr::FloatLit(FloatLitExpr { value, location: loc })),
               Err(_) => {
                  self.error_at_previous(ParserErrorType::UnexpectedToken, "Malformed float literal.");
                  None
               }
            }
         }
         TokenKind::STRING => {
            self.advance();
            Some(Expr::StrLit(StrLitExpr {
               value: self.previous.lexeme.clone(),
               location: loc,
            }))
         }
         TokenKind::TRUE => {
            self.advance();
            Some(Expr::BoolLit(BoolLitExpr { value: true, location: loc }))
         }
         TokenKind::FALSE => {
            self.advance();
            Some(Expr::BoolLit(BoolLitExpr { value: false, location: loc }))
         }
         TokenKind::IDENTIFIER
         | TokenKind::INT_TYPE
         | TokenKind::FLOAT_TYPE
         | TokenKind::CHAR_TYPE
         | TokenKind::STRING_TYPE
         | TokenKind::BOOL_TYPE
         | TokenKind::ARRAY_TYPE => {
            // Type keywords double as built-in conversion functions when
            // they appear in expression position: 정수("42"), 실수(x).
            self.advance();
            Some(Expr::Identifier(IdentExpr {
               name: self.previous.lexeme.clone(),
               location: loc,
            }))
         }
         TokenKind::THIS_KW => {
            self.advance();
            Some(Expr::This(ThisExpr { location: loc }))
         }
         TokenKind::MINUS => {
            self.advance();
            let operand = self.parse_precedence(Precedence::Unary, features)?;
            Some(Expr::Unary(UnaryExpr {
               op: UnaryOp::Negate,
               operand: Box::new(operand),
               location: loc,
            }))
         }
         TokenKind::BANG => {
            self.advance();
            let operand = self.parse_precedence(Precedence::Unary, features)?;
            Some(Expr::Unary(UnaryExpr {
               op: UnaryOp::Not,
               operand: Box::new(operand),
               location: loc,
            }))
         }
         TokenKind::L_PAREN => {
            self.advance();
            let expr = self.parse_expression(features)?;
            self.consume(&TokenKind::R_PAREN, "Expected ')' after expression.");
            Some(expr)
         }
         TokenKind::L_BRACKET => self.parse_array_literal(features),
         TokenKind::L_CURLY => self.parse_dict_literal(features),
         TokenKind::FUNC_KW => {
            self.advance();
            let func = self.parse_function_literal(loc)?;
            Some(Expr::FuncLitExpr(Box::new(func)))
         }
         _ => {
            self.error_at_current(ParserErrorType::UnexpectedToken, "Expected an expression.");
            None
         }
      }
   }

   fn parse_infix(&mut self, left: Expr, prec: Precedence, features: ParseFeatures) -> Option<Expr> {
      let loc = Location::new(self.current.line_num, self.current.column);

      if let Some(josa) = self.current.kind.josa_kind() {
         if !left.accepts_josa() {
            self.error_at_current(
               ParserErrorType::UnexpectedToken,
               "A postposition can only follow an identifier, literal, call, or index.",
            );
            return None;
         }

         self.advance();
         self.consume(&TokenKind::IDENTIFIER, "Expected a method name after the postposition.");
         let method = self.previous.lexeme.clone();

         return Some(Expr::JosaCall(JosaCallExpr {
            target: Box::new(left),
            josa,
            method,
            location: loc,
         }));
      }

      match self.current.kind {
         TokenKind::L_PAREN => self.parse_call(left, features),
         TokenKind::L_BRACKET => {
            self.advance();
            let index = self.parse_expression(features)?;
            self.consume(&TokenKind::R_BRACKET, "Expected ']' after index expression.");
            Some(Expr::Index(IndexExpr {
               target: Box::new(left),
               index: Box::new(index),
               location: loc,
            }))
         }
         TokenKind::DOT => {
            self.advance();
            self.consume(&TokenKind::IDENTIFIER, "Expected a field name after '.'.");
            Some(Expr::Member(MemberExpr {
               target: Box::new(left),
               field: self.previous.lexeme.clone(),
               location: loc,
            }))
         }
         TokenKind::MATCH_KW => self.parse_match(left, features),
         TokenKind::BUTEO => self.parse_range(left, features),
         _ => {
            let op = match self.current.kind {
               TokenKind::PLUS => BinaryOp::Add,
               TokenKind::MINUS => BinaryOp::Sub,
               TokenKind::STAR => BinaryOp::Mul,
               TokenKind::SLASH => BinaryOp::Div,
               TokenKind::PERCENT => BinaryOp::Mod,
               TokenKind::EQ => BinaryOp::Eq,
               TokenKind::NOT_EQ => BinaryOp::NotEq,
               TokenKind::LESS => BinaryOp::Less,
               TokenKind::GREATER => BinaryOp::Greater,
               TokenKind::LESS_EQ => BinaryOp::LessEq,
               TokenKind::GREATER_EQ => BinaryOp::GreaterEq,
               TokenKind::LOGIC_AND => BinaryOp::And,
               TokenKind::LOGIC_OR => BinaryOp::Or,
               _ => {
                  self.error_at_current(ParserErrorType::UnexpectedToken, "Expected an operator.");
                  return None;
               }
            };

            self.advance();
            let right = self.parse_precedence(next_precedence(prec), features)?;

            Some(Expr::Binary(BinaryExpr {
               left: Box::new(left),
               op,
               right: Box::new(right),
               location: loc,
            }))
         }
      }
   }

   fn parse_call(&mut self, callee: Expr, features: ParseFeatures) -> Option<Expr> {
      let loc = Location::new(self.current.line_num, self.current.column);
      self.advance(); // (

      let mut args = vec![];
      if !self.check(&TokenKind::R_PAREN) {
         loop {
            args.push(self.parse_expression(features)?);
            if !self.matches(&TokenKind::COMMA) {
               break;
            }
         }
      }

      self.consume(&TokenKind::R_PAREN, "Expected ')' after call arguments.");

      Some(Expr::Call(CallExpr {
         callee: Box::new(callee),
         args,
         location: loc,
      }))
   }

   /// `start부터 end까지` (or 미만/이하/이상/초과) as a value, only where the
   /// `RANGE` feature is enabled.
   fn parse_range(&mut self, start: Expr, features: ParseFeatures) -> Option<Expr> {
      let loc = Location::new(self.current.line_num, self.current.column);
      self.advance(); // 부터

      let end = self.parse_precedence(Precedence::Or, features)?;
      let bound = self.parse_range_bound()?;

      Some(Expr::Range(RangeExpr {
         start: Box::new(start),
         end: Box::new(end),
         bound,
         location: loc,
      }))
   }

   pub(super) fn parse_range_bound(&mut self) -> Option<RangeBound> {
      let bound = match self.current.kind {
         TokenKind::KKAJI => RangeBound::UpToInclusive,
         TokenKind::MIMAN => RangeBound::LessThan,
         TokenKind::IHA => RangeBound::AtMost,
         TokenKind::ISANG => RangeBound::AtLeast,
         TokenKind::CHOGWA => RangeBound::GreaterThan,
         _ => {
            self.error_at_current(ParserErrorType::MissingToken, "Expected a range bound (까지, 미만, 이하, 이상, 초과).");
            return None;
         }
      };

      self.advance();
      Some(bound)
   }

   /// `expr 에 대해 { pattern -> result … }`.
   fn parse_match(&mut self, scrutinee: Expr, features: ParseFeatures) -> Option<Expr> {
      let loc = Location::new(self.current.line_num, self.current.column);
      self.advance(); // 에 대해

      self.consume(&TokenKind::L_CURLY, "Expected '{' after '에 대해'.");

      let mut arms = vec![];
      while !self.check(&TokenKind::R_CURLY) && !self.check(&TokenKind::EOF) {
         let arm_loc = Location::new(self.current.line_num, self.current.column);

         let pattern = if self.matches(&TokenKind::UNDERSCORE) {
            MatchPattern::Wildcard
         } else {
            MatchPattern::Literal(Box::new(self.parse_expression(features)?))
         };

         self.consume(&TokenKind::ARROW, "Expected '->' after a match pattern.");
         let result = self.parse_expression(features)?;
         self.matches(&TokenKind::COMMA);
         self.matches(&TokenKind::SEMICOLON);

         arms.push(MatchArm {
            pattern,
            result,
            location: arm_loc,
         });
      }

      self.consume(&TokenKind::R_CURLY, "Expected '}' after match arms.");

      Some(Expr::Match(MatchExpr {
         scrutinee: Box::new(scrutinee),
         arms,
         location: loc,
      }))
   }

   fn parse_array_literal(&mut self, features: ParseFeatures) -> Option<Expr> {
      let loc = Location::new(self.current.line_num, self.current.column);
      self.advance(); // [

      let mut elements = vec![];
      if !self.check(&TokenKind::R_BRACKET) {
         loop {
            elements.push(self.parse_expression(features)?);
            if !self.matches(&TokenKind::COMMA) {
               break;
            }
         }
      }

      self.consume(&TokenKind::R_BRACKET, "Expected ']' after array elements.");

      Some(Expr::ArrayLit(ArrayLitExpr { elements, location: loc }))
   }

   /// `{ "키": 값, … }` — keys are strings or bare identifiers.
   fn parse_dict_literal(&mut self, features: ParseFeatures) -> Option<Expr> {
      let loc = Location::new(self.current.line_num, self.current.column);
      self.advance(); // {

      let mut entries = vec![];
      if !self.check(&TokenKind::R_CURLY) {
         loop {
            let key = if self.matches(&TokenKind::STRING) || self.matches(&TokenKind::IDENTIFIER) {
               self.previous.lexeme.clone()
            } else {
               self.error_at_current(ParserErrorType::UnexpectedToken, "Expected a dictionary key.");
               return None;
            };

            self.consume(&TokenKind::COLON, "Expected ':' after a dictionary key.");
            let value = self.parse_expression(features)?;
            entries.push((key, value));

            if !self.matches(&TokenKind::COMMA) {
               break;
            }
         }
      }

      self.consume(&TokenKind::R_CURLY, "Expected '}' after dictionary entries.");

      Some(Expr::DictLit(DictLitExpr { entries, location: loc }))
   }

   /// Parses `(params) { body }` after the 함수 keyword has been consumed.
   pub(super) fn parse_function_literal(&mut self, loc: Location) -> Option<FuncLit> {
      self.consume(&TokenKind::L_PAREN, "Expected '(' after 함수.");

      let mut params = vec![];
      if !self.check(&TokenKind::R_PAREN) {
         loop {
            self.consume(&TokenKind::IDENTIFIER, "Expected a parameter name.");
            params.push(self.previous.lexeme.clone());
            if !self.matches(&TokenKind::COMMA) {
               break;
            }
         }
      }

      self.consume(&TokenKind::R_PAREN, "Expected ')' after parameters.");
      self.consume(&TokenKind::L_CURLY, "Expected '{' before the function body.");

      let body = self.parse_block_body();

      Some(FuncLit {
         params,
         body,
         location: loc,
      })
   }
}

/// The precedence immediately above `p`, for left-associative folding.
fn next_precedence(p: Precedence) -> Precedence {
   match p {
      Precedence::Lowest => Precedence::Assign,
      Precedence::Assign => Precedence::Range,
      Precedence::Range => Precedence::Or,
      Precedence::Or => Precedence::And,
      Precedence::And => Precedence::Equality,
      Precedence::Equality => Precedence::Comparison,
      Precedence::Comparison => Precedence::Term,
      Precedence::Term => Precedence::Factor,
      Precedence::Factor => Precedence::Unary,
      Precedence::Unary => Precedence::Call,
      Precedence::Call => Precedence::Index,
      Precedence::Index => Precedence::Index,
   }
}
