use hashbrown::HashMap;

use crate::objects::Value;

/// Handle to one environment node in the arena.
pub type EnvHandle = usize;

struct EnvNode {
   bindings: HashMap<String, Value>,
   outer: Option<EnvHandle>,
}

/// Chained name-to-value environments, arena-allocated. Nodes refer to
/// their enclosing environment by index, which keeps closures free of
/// reference cycles.
pub struct Environment {
   arena: Vec<EnvNode>,
}

impl Environment {
   /// Creates the arena with its root (global) node, handle 0.
   pub fn new() -> Environment {
      Environment {
         arena: vec![EnvNode {
            bindings: HashMap::new(),
            outer: None,
         }],
      }
   }

   pub const GLOBAL: EnvHandle = 0;

   /// Allocates a child environment enclosed by `outer`.
   pub fn push(&mut self, outer: EnvHandle) -> EnvHandle {
      self.arena.push(EnvNode {
         bindings: HashMap::new(),
         outer: Some(outer),
      });
      self.arena.len() - 1
   }

   /// Looks a name up through the environment chain.
   pub fn lookup(&self, mut env: EnvHandle, name: &str) -> Option<&Value> {
      loop {
         let node = &self.arena[env];
         if let Some(value) = node.bindings.get(name) {
            return Some(value);
         }
         match node.outer {
            Some(outer) => env = outer,
            None => return None,
         }
      }
   }

   /// Binds a name in the given environment, shadowing any outer binding.
   pub fn define(&mut self, env: EnvHandle, name: &str, value: Value) {
      self.arena[env].bindings.insert(String::from(name), value);
   }

   /// Writes to the nearest enclosing environment that already binds the
   /// name; defines locally when no frame binds it. This two-phase
   /// behavior is part of the environment contract.
   pub fn assign(&mut self, env: EnvHandle, name: &str, value: Value) {
      let mut cursor = env;
      loop {
         if self.arena[cursor].bindings.contains_key(name) {
            self.arena[cursor].bindings.insert(String::from(name), value);
            return;
         }
         match self.arena[cursor].outer {
            Some(outer) => cursor = outer,
            None => break,
         }
      }

      self.define(env, name, value);
   }

   /// True when the name is bound anywhere on the chain.
   pub fn is_bound(&self, env: EnvHandle, name: &str) -> bool {
      self.lookup(env, name).is_some()
   }
}

impl Default for Environment {
   fn default() -> Self {
      Environment::new()
   }
}
