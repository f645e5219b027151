use crate::errors::{ErrorReport, SemanticErrorType};
use crate::lexer::morphology::Dictionary;
use crate::parser::ast::*;
use crate::semantic::symbols::{Symbol, SymbolKind, SymbolTable};

// Submodules
pub mod symbols;

/// Array methods reachable through a postposition call.
const JOSA_METHODS: [&str; 4] = ["정렬한다", "정렬", "역순으로_나열한다", "역순"];

/// Walks the AST after parsing, building a lexically scoped symbol table
/// and aggregating semantic errors. Any error prevents bytecode emission.
pub struct SemanticAnalyzer<'a> {
   table: SymbolTable,
   errors: Vec<ErrorReport>,
   dictionary: &'a Dictionary,
   /// Nesting depth of method/constructor bodies, for 자신 checking.
   method_depth: usize,
}

impl<'a> SemanticAnalyzer<'a> {
   /// Analyzes a module. Returns every semantic error found.
   pub fn analyze(module: &Module, dictionary: &'a Dictionary) -> Result<(), Vec<ErrorReport>> {
      SemanticAnalyzer::analyze_with_globals(module, dictionary, &[])
   }

   /// Analyzes a module with a set of names already bound in the global
   /// environment. The REPL passes the names earlier inputs defined so a
   /// later line can refer to them.
   pub fn analyze_with_globals(
      module: &Module,
      dictionary: &'a Dictionary,
      session_globals: &[String],
   ) -> Result<(), Vec<ErrorReport>> {
      let mut analyzer = SemanticAnalyzer {
         table: SymbolTable::new(),
         errors: vec![],
         dictionary,
         method_depth: 0,
      };

      for name in session_globals {
         analyzer.table.declare(
            name,
            Symbol {
               kind: SymbolKind::Variable,
               annotation: None,
               line: 0,
            },
         );
      }

      // First pass: hoist top-level declarations so functions can refer to
      // bindings introduced later in the file.
      for stmt in &module.body {
         analyzer.hoist(stmt);
      }

      for stmt in &module.body {
         analyzer.check_statement(stmt);
      }

      if analyzer.errors.is_empty() {
         Ok(())
      } else {
         Err(analyzer.errors)
      }
   }

   fn hoist(&mut self, stmt: &Stmt) {
      match stmt {
         Stmt::VarDecl(decl) => {
            self.declare(&decl.name, SymbolKind::Variable, decl.annotation, decl.location);
         }
         Stmt::FuncDecl(decl) => {
            self.declare(&decl.name, SymbolKind::Function, None, decl.location);
         }
         Stmt::Class(decl) => {
            self.declare(&decl.name, SymbolKind::Class, None, decl.location);
         }
         Stmt::Assignment(assign) => {
            // Assigning to a never-declared name defines it (the
            // environment's two-phase write contract).
            if let AssignTarget::Variable(name) = &assign.target {
               if self.table.resolve(name).is_none() {
                  self.declare(name, SymbolKind::Variable, None, assign.location);
               }
            }
         }
         _ => {}
      }
   }

   fn declare(
      &mut self,
      name: &str,
      kind: SymbolKind,
      annotation: Option<TypeAnnotation>,
      location: Location,
   ) {
      // Session bindings (line 0) may be redeclared by a later input.
      if let Some(existing) = self.table.local(name) {
         if existing.line > 0 {
            self.errors.push(ErrorReport::new(
               location.line,
               location.column,
               SemanticErrorType::Redefinition.name(),
               format!("'{}' is already declared in this scope.", name),
            ));
            return;
         }
      }

      self.table.declare(
         name,
         Symbol {
            kind,
            annotation,
            line: location.line,
         },
      );
   }

   fn check_statement(&mut self, stmt: &Stmt) {
      match stmt {
         Stmt::VarDecl(decl) => {
            self.check_expression(&decl.value);
            self.check_annotation(decl);

            // Top-level names were hoisted; nested ones declare here.
            if !self.table.declared_locally(&decl.name) {
               self.declare(&decl.name, SymbolKind::Variable, decl.annotation, decl.location);
            }
         }
         Stmt::Assignment(assign) => {
            self.check_expression(&assign.value);
            match &assign.target {
               AssignTarget::Variable(name) => {
                  if self.table.resolve(name).is_none() {
                     self.declare(name, SymbolKind::Variable, None, assign.location);
                  }
               }
               AssignTarget::Index { target, index } => {
                  self.check_expression(target);
                  self.check_expression(index);
               }
               AssignTarget::Member { target, .. } => {
                  self.check_expression(target);
               }
            }
         }
         Stmt::ExprStmt(s) => self.check_expression(&s.expr),
         Stmt::Return(s) => {
            if let Some(value) = &s.value {
               self.check_expression(value);
            }
         }
         Stmt::If(s) => {
            self.check_expression(&s.condition);
            self.check_statement(&s.then_branch);
            if let Some(else_branch) = &s.else_branch {
               self.check_statement(else_branch);
            }
         }
         Stmt::While(s) => {
            self.check_expression(&s.condition);
            self.check_statement(&s.body);
         }
         Stmt::RangeFor(s) => {
            self.check_expression(&s.start);
            self.check_expression(&s.end);

            self.table.push_scope();
            self.declare(&s.variable, SymbolKind::Variable, None, s.location);
            self.check_statement(&s.body);
            self.table.pop_scope();
         }
         Stmt::RepeatFor(s) => {
            self.check_expression(&s.count);
            self.check_statement(&s.body);
         }
         Stmt::Block(s) => {
            self.table.push_scope();
            for inner in &s.body {
               self.check_statement(inner);
            }
            self.table.pop_scope();
         }
         Stmt::Import(_) => {}
         Stmt::Try(s) => {
            self.check_statement(&s.body);
            self.table.push_scope();
            self.declare(&s.error_name, SymbolKind::Variable, None, s.location);
            self.check_statement(&s.catch_body);
            self.table.pop_scope();
         }
         Stmt::Throw(s) => self.check_expression(&s.value),
         Stmt::FuncDecl(decl) => {
            if !self.table.declared_locally(&decl.name) {
               self.declare(&decl.name, SymbolKind::Function, None, decl.location);
            }
            self.check_function(&decl.func, false);
         }
         Stmt::Class(decl) => {
            if !self.table.declared_locally(&decl.name) {
               self.declare(&decl.name, SymbolKind::Class, None, decl.location);
            }

            if let Some(ctor) = &decl.constructor {
               self.check_function(ctor, true);
            }
            for (_, method) in &decl.methods {
               self.check_function(method, true);
            }
         }
      }
   }

   fn check_function(&mut self, func: &FuncLit, is_method: bool) {
      self.table.push_scope();
      if is_method {
         self.method_depth += 1;
      }

      for param in &func.params {
         self.declare(param, SymbolKind::Parameter, None, func.location);
      }

      for stmt in &func.body {
         self.check_statement(stmt);
      }

      if is_method {
         self.method_depth -= 1;
      }
      self.table.pop_scope();
   }

   /// A declared annotation must agree with a literal initializer. An
   /// integer literal may initialize a 실수 variable (numeric promotion).
   fn check_annotation(&mut self, decl: &VarDeclStmt) {
      let annotation = match decl.annotation {
         Some(a) => a,
         None => return,
      };

      let matches = match (&annotation, &decl.value) {
         (TypeAnnotation::Int, Expr::IntLit(_)) => true,
         (TypeAnnotation::Float, Expr::FloatLit(_)) => true,
         (TypeAnnotation::Float, Expr::IntLit(_)) => true,
         (TypeAnnotation::Str, Expr::StrLit(_)) => true,
         (TypeAnnotation::Char, Expr::StrLit(_)) => true,
         (TypeAnnotation::Bool, Expr::BoolLit(_)) => true,
         (TypeAnnotation::Array, Expr::ArrayLit(_)) => true,
         // Non-literal initializers are checked at run time.
         (_, Expr::IntLit(_))
         | (_, Expr::FloatLit(_))
         | (_, Expr::StrLit(_))
         | (_, Expr::BoolLit(_))
         | (_, Expr::ArrayLit(_)) => false,
         _ => true,
      };

      if !matches {
         self.errors.push(ErrorReport::new(
            decl.location.line,
            decl.location.column,
            SemanticErrorType::TypeAnnotationMismatch.name(),
            format!("Initializer does not match the declared type of '{}'.", decl.name),
         ));
      }
   }

   fn check_expression(&mut self, expr: &Expr) {
      match expr {
         Expr::Identifier(id) => {
            if self.table.resolve(&id.name).is_none()
               && !self.dictionary.is_builtin(&id.name)
            {
               self.errors.push(ErrorReport::new(
                  id.location.line,
                  id.location.column,
                  SemanticErrorType::UndefinedName.name(),
                  format!("'{}' is not defined.", id.name),
               ));
            }
         }
         Expr::IntLit(_) | Expr::FloatLit(_) | Expr::StrLit(_) | Expr::BoolLit(_) => {}
         Expr::ArrayLit(arr) => {
            for e in &arr.elements {
               self.check_expression(e);
            }
         }
         Expr::DictLit(dict) => {
            for (_, v) in &dict.entries {
               self.check_expression(v);
            }
         }
         Expr::Binary(b) => {
            self.check_expression(&b.left);
            self.check_expression(&b.right);
         }
         Expr::Unary(u) => self.check_expression(&u.operand),
         Expr::Call(c) => {
            self.check_expression(&c.callee);
            for arg in &c.args {
               self.check_expression(arg);
            }
         }
         Expr::Index(ix) => {
            self.check_expression(&ix.target);
            self.check_expression(&ix.index);
         }
         Expr::FuncLitExpr(f) => self.check_function(f, false),
         Expr::Range(r) => {
            self.check_expression(&r.start);
            self.check_expression(&r.end);
         }
         Expr::JosaCall(jc) => {
            self.check_expression(&jc.target);
            if !JOSA_METHODS.contains(&jc.method.as_str()) {
               self.errors.push(ErrorReport::new(
                  jc.location.line,
                  jc.location.column,
                  SemanticErrorType::UnresolvedReference.name(),
                  format!("Unknown postposition method '{}'.", jc.method),
               ));
            }
         }
         Expr::Match(m) => {
            self.check_expression(&m.scrutinee);
            for arm in &m.arms {
               if let MatchPattern::Literal(p) = &arm.pattern {
                  self.check_expression(p);
               }
               self.check_expression(&arm.result);
            }
         }
         Expr::Member(m) => self.check_expression(&m.target),
         Expr::This(t) => {
            if self.method_depth == 0 {
               self.errors.push(ErrorReport::new(
                  t.location.line,
                  t.location.column,
                  SemanticErrorType::UnresolvedReference.name(),
                  String::from("자신 is only valid inside a method body."),
               ));
            }
         }
      }
   }
}
