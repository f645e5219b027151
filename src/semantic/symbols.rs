use hashbrown::HashMap;

use crate::parser::ast::TypeAnnotation;

/// What a name refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
   Variable,
   Parameter,
   Function,
   Class,
}

/// A single declared name.
#[derive(Clone, Debug)]
pub struct Symbol {
   pub kind: SymbolKind,
   pub annotation: Option<TypeAnnotation>,
   pub line: usize,
}

/// A lexically scoped symbol table: a stack of scopes, innermost last.
pub struct SymbolTable {
   scopes: Vec<HashMap<String, Symbol>>,
}

impl SymbolTable {
   pub fn new() -> SymbolTable {
      SymbolTable {
         scopes: vec![HashMap::new()],
      }
   }

   pub fn push_scope(&mut self) {
      self.scopes.push(HashMap::new());
   }

   pub fn pop_scope(&mut self) {
      self.scopes.pop();
   }

   /// Declares a name in the innermost scope. Returns the previous symbol
   /// when the name was already declared in this same scope.
   pub fn declare(&mut self, name: &str, symbol: Symbol) -> Option<Symbol> {
      self
         .scopes
         .last_mut()
         .expect("symbol table always has a scope")
         .insert(String::from(name), symbol)
   }

   /// Resolves a name against the scope chain, innermost first.
   pub fn resolve(&self, name: &str) -> Option<&Symbol> {
      for scope in self.scopes.iter().rev() {
         if let Some(sym) = scope.get(name) {
            return Some(sym);
         }
      }

      None
   }

   /// The symbol for a name in the innermost scope only.
   pub fn local(&self, name: &str) -> Option<&Symbol> {
      self.scopes.last().and_then(|s| s.get(name))
   }

   /// True when the name is declared in the innermost scope.
   pub fn declared_locally(&self, name: &str) -> bool {
      self
         .scopes
         .last()
         .map(|s| s.contains_key(name))
         .unwrap_or(false)
   }
}
