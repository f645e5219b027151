use num_derive::FromPrimitive;

// Submodules
pub mod chunk;
pub mod disassembler;
pub mod serialize;

/// The set of instructions supported by the virtual machine.
///
/// **NOTE:** Changing the order in which members are declared creates
/// incompatibilities between serialized chunks from different versions.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, FromPrimitive)]
#[repr(u8)]
pub enum OpCode {
   // Constant loads
   LoadConst, // LOAD_CONST [const_index]
   LoadTrue,
   LoadFalse,
   LoadNull,

   // Variables
   LoadVar,     // LOAD_VAR [slot]
   StoreVar,    // STORE_VAR [slot] (does not pop)
   LoadGlobal,  // LOAD_GLOBAL [name_index]
   StoreGlobal, // STORE_GLOBAL [name_index] (does not pop)

   // Arithmetic
   Add,
   Sub,
   Mul,
   Div,
   Mod,
   Neg,

   // Comparison
   Eq,
   Ne,
   Lt,
   Gt,
   Le,
   Ge,

   // Logic
   And,
   Or,
   Not,

   // Control flow. Jump operands are a single unsigned byte; forward
   // jumps add to the ip, LOOP subtracts.
   Jump,        // JUMP [offset]
   JumpIfFalse, // JUMP_IF_FALSE [offset] (does not pop)
   JumpIfTrue,  // JUMP_IF_TRUE [offset] (does not pop)
   Loop,        // LOOP [offset]

   // Functions
   Call,          // CALL [arg_count]
   TailCall,      // TAIL_CALL [arg_count]
   Return,        // pop return value, unwind frame, push it back
   BuildFunction, // BUILD_FUNCTION [param_count] [entry_offset:u16]

   // Collections
   BuildArray,  // BUILD_ARRAY [element_count]
   BuildDict,   // BUILD_DICT [entry_count] (pops 2n: key, value pairs)
   BuildRange,  // BUILD_RANGE [inclusive]: pop end, pop start, push int array
   IndexGet,    // pop index, pop array, push array[index]
   IndexSet,    // pop value, pop index, pop array, array[index] = value
   ArrayAppend, // pop value, pop array, array.push(value)

   // Postposition dispatch
   JosaCall, // JOSA_CALL [josa_kind] [method_name_index]

   // Stack manipulation
   Pop,
   Dup,
   Swap,

   // Miscellaneous
   Print,
   Halt,

   // Modules
   Import, // IMPORT [module_name_index]

   // Classes
   ClassDef,   // CLASS_DEF [name_index] [field_count] [method_count]
   LoadField,  // LOAD_FIELD [name_index]: pop object, push object.field
   StoreField, // STORE_FIELD [name_index]: pop value, pop object
   CallMethod, // CALL_METHOD [name_index] [arg_count]
   LoadThis,

   // Exceptions
   SetupCatch, // SETUP_CATCH [handler_offset:u16] (absolute)
   EndCatch,
   Throw, // pop value, raise it
}

impl OpCode {
   /// The number of operand bytes following this opcode in the stream.
   pub fn operand_count(&self) -> usize {
      match self {
         OpCode::LoadConst
         | OpCode::LoadVar
         | OpCode::StoreVar
         | OpCode::LoadGlobal
         | OpCode::StoreGlobal
         | OpCode::Jump
         | OpCode::JumpIfFalse
         | OpCode::JumpIfTrue
         | OpCode::Loop
         | OpCode::Call
         | OpCode::TailCall
         | OpCode::BuildArray
         | OpCode::BuildDict
         | OpCode::BuildRange
         | OpCode::Import
         | OpCode::LoadField
         | OpCode::StoreField => 1,

         OpCode::JosaCall | OpCode::CallMethod | OpCode::SetupCatch => 2,

         OpCode::BuildFunction | OpCode::ClassDef => 3,

         _ => 0,
      }
   }

   /// True for the relative jump family adjusted by the jump fixup pass.
   pub fn is_jump(&self) -> bool {
      matches!(
         self,
         OpCode::Jump | OpCode::JumpIfFalse | OpCode::JumpIfTrue | OpCode::Loop
      )
   }

   /// True when the jump moves the instruction pointer backwards.
   pub fn is_backward_jump(&self) -> bool {
      matches!(self, OpCode::Loop)
   }
}
