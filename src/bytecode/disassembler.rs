use std::fmt::Write;

use crate::bytecode::chunk::Chunk;
use crate::bytecode::OpCode;

/// Disassembles a chunk into a printable listing. Useful when comparing
/// the bytecode generated for one program against another.
pub fn disassemble(chunk: &Chunk, name: &str) -> String {
   let mut out = String::new();
   let _ = writeln!(out, "== {} ==", name);

   let mut offset = 0;
   while offset < chunk.len() {
      offset = disassemble_instruction(chunk, offset, &mut out);
   }

   out
}

/// Renders one instruction, returning the offset of the next one.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize, out: &mut String) -> usize {
   let _ = write!(out, "{:04} ", offset);

   let line = chunk.get_line(offset);
   if offset > 0 && line == chunk.get_line(offset - 1) {
      let _ = write!(out, "   | ");
   } else {
      let _ = write!(out, "{:4} ", line);
   }

   let op = match chunk.op_at(offset) {
      Some(op) => op,
      None => {
         let _ = writeln!(out, "Unknown opcode {:#04x}", chunk.read(offset));
         return offset + 1;
      }
   };

   let name = op_name(op);

   match op.operand_count() {
      0 => {
         let _ = writeln!(out, "{}", name);
         offset + 1
      }
      1 => {
         let operand = chunk.read(offset + 1);
         let _ = write!(out, "{:<16} {}", name, operand);
         annotate(chunk, op, operand as usize, out);
         let _ = writeln!(out);
         offset + 2
      }
      2 => match op {
         OpCode::SetupCatch => {
            let target = chunk.read16(offset + 1);
            let _ = writeln!(out, "{:<16} -> {}", name, target);
            offset + 3
         }
         _ => {
            let a = chunk.read(offset + 1);
            let b = chunk.read(offset + 2);
            let _ = write!(out, "{:<16} {} {}", name, a, b);
            if let OpCode::JosaCall | OpCode::CallMethod = op {
               if let Some(n) = chunk.get_name(b as usize) {
                  let _ = write!(out, " ('{}')", n);
               }
            }
            let _ = writeln!(out);
            offset + 3
         }
      },
      3 => {
         // BUILD_FUNCTION paramc addr16 / CLASS_DEF name fieldc methodc
         match op {
            OpCode::BuildFunction => {
               let paramc = chunk.read(offset + 1);
               let addr = chunk.read16(offset + 2);
               let _ = writeln!(out, "{:<16} params={} entry={}", name, paramc, addr);
            }
            _ => {
               let a = chunk.read(offset + 1);
               let b = chunk.read(offset + 2);
               let c = chunk.read(offset + 3);
               let _ = write!(out, "{:<16} {} {} {}", name, a, b, c);
               if let Some(n) = chunk.get_name(a as usize) {
                  let _ = write!(out, " ('{}')", n);
               }
               let _ = writeln!(out);
            }
         }
         offset + 4
      }
      _ => offset + 1,
   }
}

fn annotate(chunk: &Chunk, op: OpCode, operand: usize, out: &mut String) {
   match op {
      OpCode::LoadConst => {
         if let Some(value) = chunk.get_constant(operand) {
            let _ = write!(out, " ('{}')", value);
         }
      }
      OpCode::LoadGlobal | OpCode::StoreGlobal | OpCode::Import | OpCode::LoadField | OpCode::StoreField => {
         if let Some(name) = chunk.get_name(operand) {
            let _ = write!(out, " ('{}')", name);
         }
      }
      _ => {}
   }
}

fn op_name(op: OpCode) -> &'static str {
   match op {
      OpCode::LoadConst => "LOAD_CONST",
      OpCode::LoadTrue => "LOAD_TRUE",
      OpCode::LoadFalse => "LOAD_FALSE",
      OpCode::LoadNull => "LOAD_NULL",
      OpCode::LoadVar => "LOAD_VAR",
      OpCode::StoreVar => "STORE_VAR",
      OpCode::LoadGlobal => "LOAD_GLOBAL",
      OpCode::StoreGlobal => "STORE_GLOBAL",
      OpCode::Add => "ADD",
      OpCode::Sub => "SUB",
      OpCode::Mul => "MUL",
      OpCode::Div => "DIV",
      OpCode::Mod => "MOD",
      OpCode::Neg => "NEG",
      OpCode::Eq => "EQ",
      OpCode::Ne => "NE",
      OpCode::Lt => "LT",
      OpCode::Gt => "GT",
      OpCode::Le => "LE",
      OpCode::Ge => "GE",
      OpCode::And => "AND",
      OpCode::Or => "OR",
      OpCode::Not => "NOT",
      OpCode::Jump => "JUMP",
      OpCode::JumpIfFalse => "JUMP_IF_FALSE",
      OpCode::JumpIfTrue => "JUMP_IF_TRUE",
      OpCode::Loop => "LOOP",
      OpCode::Call => "CALL",
      OpCode::TailCall => "TAIL_CALL",
      OpCode::Return => "RETURN",
      OpCode::BuildFunction => "BUILD_FUNCTION",
      OpCode::BuildArray => "BUILD_ARRAY",
      OpCode::BuildDict => "BUILD_DICT",
      OpCode::BuildRange => "BUILD_RANGE",
      OpCode::IndexGet => "INDEX_GET",
      OpCode::IndexSet => "INDEX_SET",
      OpCode::ArrayAppend => "ARRAY_APPEND",
      OpCode::JosaCall => "JOSA_CALL",
      OpCode::Pop => "POP",
      OpCode::Dup => "DUP",
      OpCode::Swap => "SWAP",
      OpCode::Print => "PRINT",
      OpCode::Halt => "HALT",
      OpCode::Import => "IMPORT",
      OpCode::ClassDef => "CLASS_DEF",
      OpCode::LoadField => "LOAD_FIELD",
      OpCode::StoreField => "STORE_FIELD",
      OpCode::CallMethod => "CALL_METHOD",
      OpCode::LoadThis => "LOAD_THIS",
      OpCode::SetupCatch => "SETUP_CATCH",
      OpCode::EndCatch => "END_CATCH",
      OpCode::Throw => "THROW",
   }
}
