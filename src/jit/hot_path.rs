use hashbrown::HashMap;

use crate::jit::RegionKey;
use crate::objects::FunctionObj;

/// A function becomes hot after this many invocations.
pub const HOT_THRESHOLD: u64 = 100;

/// The tier most recently installed for a region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompileTier {
   None,
   Tier1,
   Tier2,
}

/// Per-region counter state.
pub struct HotPathEntry {
   pub invocation_count: u64,
   pub last_compile_tier: CompileTier,
}

/// Counts user-function invocations by bytecode region. The VM records
/// every CALL whose target is a user function; crossing `HOT_THRESHOLD`
/// triggers tier promotion.
pub struct HotPathDetector {
   counters: HashMap<RegionKey, HotPathEntry>,
}

impl HotPathDetector {
   pub fn new() -> HotPathDetector {
      HotPathDetector {
         counters: HashMap::new(),
      }
   }

   /// Bumps the counter for a function's region.
   ///
   /// # Returns
   /// `u64`: The invocation count including this call.
   pub fn record(&mut self, func: &FunctionObj) -> u64 {
      let key = RegionKey::of(func);
      let entry = self.counters.entry(key).or_insert(HotPathEntry {
         invocation_count: 0,
         last_compile_tier: CompileTier::None,
      });

      entry.invocation_count += 1;
      entry.invocation_count
   }

   pub fn count(&self, key: &RegionKey) -> u64 {
      self
         .counters
         .get(key)
         .map(|e| e.invocation_count)
         .unwrap_or(0)
   }

   pub fn entry(&self, key: &RegionKey) -> Option<&HotPathEntry> {
      self.counters.get(key)
   }

   pub fn set_tier(&mut self, key: &RegionKey, tier: CompileTier) {
      if let Some(entry) = self.counters.get_mut(key) {
         entry.last_compile_tier = tier;
      }
   }

   pub fn reset(&mut self) {
      self.counters.clear();
   }
}

impl Default for HotPathDetector {
   fn default() -> Self {
      HotPathDetector::new()
   }
}
