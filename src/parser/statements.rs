use crate::lexer::tokens::TokenKind;
use crate::errors::ParserErrorType;
use crate::parser::ast::*;
use crate::parser::{ParseFeatures, Parser};

impl<'a> Parser<'a> {
   /// Parses a single statement. Returns `None` after reporting an error;
   /// the caller resynchronizes.
   pub(super) fn parse_statement(&mut self) -> Option<Stmt> {
      let current_kind = self.current.kind.clone();
      match current_kind {
         TokenKind::INT_TYPE
         | TokenKind::FLOAT_TYPE
         | TokenKind::CHAR_TYPE
         | TokenKind::STRING_TYPE
         | TokenKind::BOOL_TYPE
         | TokenKind::ARRAY_TYPE => {
            // A type keyword starts a declaration only when an identifier
            // follows; otherwise it is a conversion call: 정수("42").
            if self.peek_at(1).kind == TokenKind::IDENTIFIER {
               self.parse_var_declaration()
            } else {
               self.parse_expression_like_statement()
            }
         }
         TokenKind::IDENTIFIER if self.is_range_for_head() => self.parse_range_for(),
         TokenKind::IF_KW => self.parse_if_statement(),
         TokenKind::WHILE_KW => self.parse_while_statement(),
         TokenKind::RETURN_KW => self.parse_return_statement(),
         TokenKind::FUNC_KW => {
            if self.peek_at(1).kind == TokenKind::IDENTIFIER {
               self.parse_function_declaration()
            } else {
               self.parse_expression_like_statement()
            }
         }
         TokenKind::CLASS_KW => self.parse_class_declaration(),
         TokenKind::IMPORT_KW => self.parse_import_statement(),
         TokenKind::TRY_KW => self.parse_try_statement(),
         TokenKind::THROW_KW => self.parse_throw_statement(),
         TokenKind::L_CURLY => self.parse_block_statement(),
         _ => self.parse_expression_like_statement(),
      }
   }

   /// The LL(4) window that recognizes a range-for head:
   /// `IDENT (가|이) <single-token bound> 부터 …`.
   fn is_range_for_head(&mut self) -> bool {
      let second = self.peek_at(1).kind.clone();
      if second != TokenKind::JOSA_GA && second != TokenKind::JOSA_I {
         return false;
      }

      let third = self.peek_at(2).kind.clone();
      let starts_bound = matches!(
         third,
         TokenKind::INTEGER | TokenKind::IDENTIFIER | TokenKind::FLOAT
      );

      starts_bound && self.peek_at(3).kind == TokenKind::BUTEO
   }

   /// `정수 합 = 0` and friends.
   fn parse_var_declaration(&mut self) -> Option<Stmt> {
      let loc = Location::new(self.current.line_num, self.current.column);

      let annotation = match self.current.kind {
         TokenKind::INT_TYPE => Some(TypeAnnotation::Int),
         TokenKind::FLOAT_TYPE => Some(TypeAnnotation::Float),
         TokenKind::CHAR_TYPE => Some(TypeAnnotation::Char),
         TokenKind::STRING_TYPE => Some(TypeAnnotation::Str),
         TokenKind::BOOL_TYPE => Some(TypeAnnotation::Bool),
         TokenKind::ARRAY_TYPE => Some(TypeAnnotation::Array),
         _ => None,
      };
      self.advance();

      self.consume(&TokenKind::IDENTIFIER, "Expected a variable name.");
      let name = self.previous.lexeme.clone();

      self.consume(&TokenKind::ASSIGN, "Expected '=' after the variable name.");
      let value = self.parse_expression(ParseFeatures::ALL)?;
      self.matches(&TokenKind::SEMICOLON);

      Some(Stmt::VarDecl(VarDeclStmt {
         annotation,
         name,
         value,
         location: loc,
      }))
   }

   /// `i가 1부터 10까지 반복 { … }`.
   fn parse_range_for(&mut self) -> Option<Stmt> {
      let loc = Location::new(self.current.line_num, self.current.column);

      self.advance(); // induction variable
      let variable = self.previous.lexeme.clone();
      self.advance(); // 가 / 이

      // Bounds are parsed with the range feature disabled: 부터/까지 are
      // loop syntax here, not operators.
      let bounds_features = ParseFeatures::ALL.without(ParseFeatures::RANGE);
      let start = self.parse_expression(bounds_features)?;
      self.consume(&TokenKind::BUTEO, "Expected 부터 after the start bound.");
      let end = self.parse_expression(bounds_features)?;
      let bound = self.parse_range_bound()?;

      if !self.matches(&TokenKind::REPEAT_KW) && !self.matches(&TokenKind::REPEAT_DO_KW) {
         self.error_at_current(ParserErrorType::MissingToken, "Expected 반복 after the range bounds.");
         return None;
      }

      let body = self.parse_block_statement()?;

      Some(Stmt::RangeFor(RangeForStmt {
         variable,
         start,
         end,
         bound,
         body: Box::new(body),
         location: loc,
      }))
   }

   /// `만약 (조건) { … } 아니면 { … }`, with `아니면 만약` chains.
   fn parse_if_statement(&mut self) -> Option<Stmt> {
      let loc = Location::new(self.current.line_num, self.current.column);
      self.advance(); // 만약

      self.consume(&TokenKind::L_PAREN, "Expected '(' after 만약.");
      let condition = self.parse_expression(ParseFeatures::ALL)?;
      self.consume(&TokenKind::R_PAREN, "Expected ')' after the condition.");

      let then_branch = self.parse_block_statement()?;

      let else_branch = if self.matches(&TokenKind::ELSE_KW) {
         if self.check(&TokenKind::IF_KW) {
            Some(Box::new(self.parse_if_statement()?))
         } else {
            Some(Box::new(self.parse_block_statement()?))
         }
      } else {
         None
      };

      Some(Stmt::If(IfStmt {
         condition,
         then_branch: Box::new(then_branch),
         else_branch,
         location: loc,
      }))
   }

   /// `동안 (조건) { … }`.
   fn parse_while_statement(&mut self) -> Option<Stmt> {
      let loc = Location::new(self.current.line_num, self.current.column);
      self.advance(); // 동안

      self.consume(&TokenKind::L_PAREN, "Expected '(' after 동안.");
      let condition = self.parse_expression(ParseFeatures::ALL)?;
      self.consume(&TokenKind::R_PAREN, "Expected ')' after the condition.");

      let body = self.parse_block_statement()?;

      Some(Stmt::While(WhileStmt {
         condition,
         body: Box::new(body),
         location: loc,
      }))
   }

   fn parse_return_statement(&mut self) -> Option<Stmt> {
      let loc = Location::new(self.current.line_num, self.current.column);
      self.advance(); // 반환

      // A bare 반환 before a block end returns null.
      let value = if self.check(&TokenKind::R_CURLY)
         || self.check(&TokenKind::SEMICOLON)
         || self.check(&TokenKind::EOF)
      {
         None
      } else {
         Some(self.parse_expression(ParseFeatures::ALL)?)
      };
      self.matches(&TokenKind::SEMICOLON);

      Some(Stmt::Return(ReturnStmt { value, location: loc }))
   }

   /// `함수 이름(a, b) { … }` binds a function literal to a name.
   fn parse_function_declaration(&mut self) -> Option<Stmt> {
      let loc = Location::new(self.current.line_num, self.current.column);
      self.advance(); // 함수

      self.consume(&TokenKind::IDENTIFIER, "Expected a function name.");
      let name = self.previous.lexeme.clone();

      let func = self.parse_function_literal(loc)?;

      Some(Stmt::FuncDecl(FuncDeclStmt {
         name,
         func,
         location: loc,
      }))
   }

   /// `클래스 이름 { 필드… 생성자(…) {…} 함수 메서드(…) {…} }`.
   fn parse_class_declaration(&mut self) -> Option<Stmt> {
      let loc = Location::new(self.current.line_num, self.current.column);
      self.advance(); // 클래스

      self.consume(&TokenKind::IDENTIFIER, "Expected a class name.");
      let name = self.previous.lexeme.clone();
      self.consume(&TokenKind::L_CURLY, "Expected '{' after the class name.");

      let mut fields = vec![];
      let mut constructor = None;
      let mut methods = vec![];

      while !self.check(&TokenKind::R_CURLY) && !self.check(&TokenKind::EOF) {
         let member_loc = Location::new(self.current.line_num, self.current.column);

         match self.current.kind {
            TokenKind::CONSTRUCTOR_KW => {
               self.advance();
               let ctor = self.parse_function_literal(member_loc)?;
               if constructor.is_some() {
                  self.error_at_previous(ParserErrorType::UnexpectedToken, "A class can only have one 생성자.");
               }
               constructor = Some(ctor);
            }
            TokenKind::FUNC_KW => {
               self.advance();
               self.consume(&TokenKind::IDENTIFIER, "Expected a method name.");
               let method_name = self.previous.lexeme.clone();
               let method = self.parse_function_literal(member_loc)?;
               methods.push((method_name, method));
            }
            TokenKind::INT_TYPE
            | TokenKind::FLOAT_TYPE
            | TokenKind::CHAR_TYPE
            | TokenKind::STRING_TYPE
            | TokenKind::BOOL_TYPE
            | TokenKind::ARRAY_TYPE
            | TokenKind::IDENTIFIER => {
               let annotation = match self.current.kind {
                  TokenKind::INT_TYPE => Some(TypeAnnotation::Int),
                  TokenKind::FLOAT_TYPE => Some(TypeAnnotation::Float),
                  TokenKind::CHAR_TYPE => Some(TypeAnnotation::Char),
                  TokenKind::STRING_TYPE => Some(TypeAnnotation::Str),
                  TokenKind::BOOL_TYPE => Some(TypeAnnotation::Bool),
                  TokenKind::ARRAY_TYPE => Some(TypeAnnotation::Array),
                  _ => None,
               };

               if annotation.is_some() {
                  self.advance();
                  self.consume(&TokenKind::IDENTIFIER, "Expected a field name.");
               } else {
                  self.advance();
               }

               fields.push(FieldDecl {
                  annotation,
                  name: self.previous.lexeme.clone(),
                  location: member_loc,
               });
               self.matches(&TokenKind::SEMICOLON);
            }
            _ => {
               self.error_at_current(ParserErrorType::UnexpectedToken, "Expected a class member.");
               return None;
            }
         }
      }

      self.consume(&TokenKind::R_CURLY, "Expected '}' after the class body.");

      Some(Stmt::Class(ClassDeclStmt {
         name,
         fields,
         constructor,
         methods,
         location: loc,
      }))
   }

   /// `가져오기 "경로"`.
   fn parse_import_statement(&mut self) -> Option<Stmt> {
      let loc = Location::new(self.current.line_num, self.current.column);
      self.advance(); // 가져오기

      self.consume(&TokenKind::STRING, "Expected a module path string after 가져오기.");
      let path = self.previous.lexeme.clone();
      self.matches(&TokenKind::SEMICOLON);

      Some(Stmt::Import(ImportStmt { path, location: loc }))
   }

   /// `시도 { … } 오류 이름 { … }`.
   fn parse_try_statement(&mut self) -> Option<Stmt> {
      let loc = Location::new(self.current.line_num, self.current.column);
      self.advance(); // 시도

      let body = self.parse_block_statement()?;

      self.consume(&TokenKind::CATCH_KW, "Expected 오류 after the 시도 block.");
      self.consume(&TokenKind::IDENTIFIER, "Expected a name for the caught error.");
      let error_name = self.previous.lexeme.clone();

      let catch_body = self.parse_block_statement()?;

      Some(Stmt::Try(TryStmt {
         body: Box::new(body),
         error_name,
         catch_body: Box::new(catch_body),
         location: loc,
      }))
   }

   fn parse_throw_statement(&mut self) -> Option<Stmt> {
      let loc = Location::new(self.current.line_num, self.current.column);
      self.advance(); // 던지다

      let value = self.parse_expression(ParseFeatures::ALL)?;
      self.matches(&TokenKind::SEMICOLON);

      Some(Stmt::Throw(ThrowStmt { value, location: loc }))
   }

   pub(super) fn parse_block_statement(&mut self) -> Option<Stmt> {
      let loc = Location::new(self.current.line_num, self.current.column);
      self.consume(&TokenKind::L_CURLY, "Expected '{'.");

      let body = self.parse_block_body();

      Some(Stmt::Block(BlockStmt { body, location: loc }))
   }

   /// Parses statements until the closing brace, consuming it.
   pub(super) fn parse_block_body(&mut self) -> Vec<Stmt> {
      let mut body = vec![];

      while !self.check(&TokenKind::R_CURLY) && !self.check(&TokenKind::EOF) {
         match self.parse_statement() {
            Some(stmt) => body.push(stmt),
            None => self.synchronize(),
         }
      }

      self.consume(&TokenKind::R_CURLY, "Expected '}' after the block.");
      body
   }

   /// Expression-rooted statements: assignment, repeat-for, or a plain
   /// expression statement.
   fn parse_expression_like_statement(&mut self) -> Option<Stmt> {
      let loc = Location::new(self.current.line_num, self.current.column);
      let expr = self.parse_expression(ParseFeatures::ALL)?;

      // `5번 반복 { … }`
      if self.matches(&TokenKind::BEON) {
         if !self.matches(&TokenKind::REPEAT_KW) && !self.matches(&TokenKind::REPEAT_DO_KW) {
            self.error_at_current(ParserErrorType::MissingToken, "Expected 반복 after 번.");
            return None;
         }
         let body = self.parse_block_statement()?;
         return Some(Stmt::RepeatFor(RepeatForStmt {
            count: expr,
            body: Box::new(body),
            location: loc,
         }));
      }

      if self.matches(&TokenKind::ASSIGN) {
         let target = match expr {
            Expr::Identifier(id) => AssignTarget::Variable(id.name),
            Expr::Index(ix) => AssignTarget::Index {
               target: *ix.target,
               index: *ix.index,
            },
            Expr::Member(m) => AssignTarget::Member {
               target: *m.target,
               field: m.field,
            },
            _ => {
               self.error_at_previous(ParserErrorType::UnexpectedToken, "Invalid assignment target.");
               return None;
            }
         };

         let value = self.parse_expression(ParseFeatures::ALL)?;
         self.matches(&TokenKind::SEMICOLON);

         return Some(Stmt::Assignment(AssignmentStmt {
            target,
            value,
            location: loc,
         }));
      }

      self.matches(&TokenKind::SEMICOLON);

      Some(Stmt::ExprStmt(ExprStmt { expr, location: loc }))
   }
}
