use crate::bytecode::OpCode;
use crate::errors::RuntimeErrorType;
use crate::objects::Value;
use crate::virtual_machine::{RuntimeResult, VM};

impl VM {
   /// Executes ADD/SUB/MUL/DIV/MOD with the numeric promotion rules:
   /// int⊗int stays int (except nothing — integer division stays integer),
   /// a mixed operand promotes to float, and ADD concatenates when either
   /// operand is a string.
   pub(crate) fn binary_operation(&mut self, op: OpCode) -> RuntimeResult {
      let b = match self.stack.pop() {
         Some(v) => v,
         None => return self.underflow(),
      };
      let a = match self.stack.pop() {
         Some(v) => v,
         None => return self.underflow(),
      };

      // String concatenation.
      if op == OpCode::Add && (matches!(a, Value::Str(_)) || matches!(b, Value::Str(_))) {
         let joined = format!("{}{}", a, b);
         self.push_stack(Value::from_str(&joined));
         return RuntimeResult::Continue;
      }

      if !a.is_numeric() || !b.is_numeric() {
         return self.runtime_error(
            RuntimeErrorType::TypeMismatch,
            format!(
               "Operands must be numbers, got '{}' and '{}'.",
               a.type_name(),
               b.type_name()
            ),
         );
      }

      // Division or modulo by zero is raised before any stack update.
      if let OpCode::Div | OpCode::Mod = op {
         let zero = match &b {
            Value::Int(v) => *v == 0,
            Value::Float(v) => *v == 0.0,
            _ => false,
         };
         if zero {
            return self.runtime_error(
               RuntimeErrorType::ZeroDivision,
               String::from("Cannot divide by zero."),
            );
         }
      }

      let result = match (&a, &b) {
         (Value::Int(x), Value::Int(y)) => match op {
            OpCode::Add => Value::Int(x.wrapping_add(*y)),
            OpCode::Sub => Value::Int(x.wrapping_sub(*y)),
            OpCode::Mul => Value::Int(x.wrapping_mul(*y)),
            OpCode::Div => Value::Int(x.wrapping_div(*y)),
            _ => Value::Int(x.wrapping_rem(*y)),
         },
         _ => {
            let x = a.as_float().unwrap();
            let y = b.as_float().unwrap();
            match op {
               OpCode::Add => Value::Float(x + y),
               OpCode::Sub => Value::Float(x - y),
               OpCode::Mul => Value::Float(x * y),
               OpCode::Div => Value::Float(x / y),
               _ => Value::Float(x % y),
            }
         }
      };

      self.push_stack(result);
      RuntimeResult::Continue
   }

   fn underflow(&self) -> RuntimeResult {
      self.runtime_error(
         RuntimeErrorType::StackUnderflow,
         String::from("Value stack underflow."),
      )
   }
}
