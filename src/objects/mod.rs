use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use hashbrown::HashMap;

use crate::bytecode::chunk::Chunk;
use crate::errors::RuntimeErrorType;

/// The body of a native (built-in) function.
pub type NativeFn = fn(Vec<Value>) -> Result<Value, NativeError>;

/// A failure raised from inside a native function.
#[derive(Clone, Debug)]
pub struct NativeError {
   pub error: RuntimeErrorType,
   pub message: String,
}

impl NativeError {
   pub fn new(error: RuntimeErrorType, message: String) -> NativeError {
      NativeError { error, message }
   }
}

/// Represents a compiled Sejong function. The body lives in the owning
/// chunk between `entry` and `end`.
pub struct FunctionObj {
   pub name: String,
   pub arity: u8,
   pub entry: usize,
   pub end: usize,
   /// Stable identifier, unique within the owning chunk.
   pub id: usize,
   pub chunk: Rc<Chunk>,
}

impl fmt::Display for FunctionObj {
   fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
      write!(f, "<함수 '{}'>", self.name)
   }
}

/// Represents a native function object.
pub struct NativeFuncObj {
   pub name: String,
   pub min_arity: u8,
   pub max_arity: u8,
   pub body: NativeFn,
}

impl fmt::Display for NativeFuncObj {
   fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
      write!(f, "<내장함수 '{}'>", self.name)
   }
}

/// A first-class error value, as produced by 던지다 and caught by 오류.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorObj {
   pub kind: String,
   pub message: String,
}

/// A class definition.
pub struct ClassObj {
   pub name: String,
   pub fields: Vec<String>,
   pub constructor: Option<Rc<FunctionObj>>,
   pub methods: HashMap<String, Rc<FunctionObj>>,
}

/// A class instance with its own mutable field map.
pub struct InstanceObj {
   pub class: Rc<ClassObj>,
   pub fields: HashMap<String, Value>,
}

/// Resolver state for a promise value. No event loop drives promises in
/// this runtime; they exist as inert data.
pub enum PromiseState {
   Pending,
   Resolved(Value),
}

/// All runtime value types in Sejong.
#[derive(Clone)]
pub enum Value {
   Null,
   Int(i64),
   Float(f64),
   Bool(bool),
   Str(Rc<String>),
   Array(Rc<RefCell<Vec<Value>>>),
   Dict(Rc<RefCell<HashMap<String, Value>>>),
   Function(Rc<FunctionObj>),
   Native(Rc<NativeFuncObj>),
   Error(Rc<ErrorObj>),
   Class(Rc<ClassObj>),
   Instance(Rc<RefCell<InstanceObj>>),
   Promise(Rc<RefCell<PromiseState>>),
}

impl Value {
   pub fn from_str(s: &str) -> Value {
      Value::Str(Rc::new(String::from(s)))
   }

   pub fn array(elements: Vec<Value>) -> Value {
      Value::Array(Rc::new(RefCell::new(elements)))
   }

   /// Gets the string type name of this value.
   pub fn type_name(&self) -> &'static str {
      match self {
         Value::Null => "널",
         Value::Int(_) => "정수",
         Value::Float(_) => "실수",
         Value::Bool(_) => "논리",
         Value::Str(_) => "문자열",
         Value::Array(_) => "배열",
         Value::Dict(_) => "사전",
         Value::Function(_) | Value::Native(_) => "함수",
         Value::Error(_) => "오류",
         Value::Class(_) => "클래스",
         Value::Instance(_) => "객체",
         Value::Promise(_) => "약속",
      }
   }

   pub fn is_int(&self) -> bool {
      matches!(self, Value::Int(_))
   }

   pub fn is_numeric(&self) -> bool {
      matches!(self, Value::Int(_) | Value::Float(_))
   }

   pub fn as_int(&self) -> Option<i64> {
      match self {
         Value::Int(v) => Some(*v),
         _ => None,
      }
   }

   pub fn as_float(&self) -> Option<f64> {
      match self {
         Value::Float(v) => Some(*v),
         Value::Int(v) => Some(*v as f64),
         _ => None,
      }
   }

   /// Null, false, zero of either numeric type, and the empty string are
   /// falsy; everything else is truthy.
   pub fn is_falsy(&self) -> bool {
      match self {
         Value::Null => true,
         Value::Bool(v) => !v,
         Value::Int(v) => *v == 0,
         Value::Float(v) => *v == 0.0,
         Value::Str(s) => s.is_empty(),
         _ => false,
      }
   }

   pub fn is_truthy(&self) -> bool {
      !self.is_falsy()
   }

   /// Structural equality: deep for arrays and dictionaries, numeric across
   /// the int/float divide, identity-or-equal for functions.
   pub fn equals(&self, other: &Value) -> bool {
      match (self, other) {
         (Value::Null, Value::Null) => true,
         (Value::Int(a), Value::Int(b)) => a == b,
         (Value::Float(a), Value::Float(b)) => a == b,
         (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
            (*a as f64) == *b
         }
         (Value::Bool(a), Value::Bool(b)) => a == b,
         (Value::Str(a), Value::Str(b)) => a == b,
         (Value::Array(a), Value::Array(b)) => {
            if Rc::ptr_eq(a, b) {
               return true;
            }
            let a = a.borrow();
            let b = b.borrow();
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
         }
         (Value::Dict(a), Value::Dict(b)) => {
            if Rc::ptr_eq(a, b) {
               return true;
            }
            let a = a.borrow();
            let b = b.borrow();
            a.len() == b.len()
               && a.iter().all(|(k, v)| b.get(k).map(|w| v.equals(w)).unwrap_or(false))
         }
         (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
         (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
         (Value::Error(a), Value::Error(b)) => a == b,
         (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
         (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
         _ => false,
      }
   }

   /// Ordered comparison. Integers and floats promote; strings compare
   /// lexicographically. `None` for unrelated variants.
   pub fn compare(&self, other: &Value) -> Option<Ordering> {
      match (self, other) {
         (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
         (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
         (a, b) if a.is_numeric() && b.is_numeric() => {
            a.as_float().unwrap().partial_cmp(&b.as_float().unwrap())
         }
         _ => None,
      }
   }
}

impl PartialEq for Value {
   fn eq(&self, other: &Value) -> bool {
      self.equals(other)
   }
}

/// Human-readable forms for PRINT: strings unquoted at top level, booleans
/// in the source language, arrays rendered recursively.
impl fmt::Display for Value {
   fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
      match self {
         Value::Null => f.write_str("널"),
         Value::Int(v) => write!(f, "{}", v),
         Value::Float(v) => {
            if v.fract() == 0.0 && v.is_finite() {
               write!(f, "{}.0", v)
            } else {
               write!(f, "{}", v)
            }
         }
         Value::Bool(v) => f.write_str(if *v { "참" } else { "거짓" }),
         Value::Str(s) => f.write_str(s),
         Value::Array(elements) => {
            f.write_str("[")?;
            for (i, e) in elements.borrow().iter().enumerate() {
               if i > 0 {
                  f.write_str(", ")?;
               }
               write!(f, "{}", e)?;
            }
            f.write_str("]")
         }
         Value::Dict(entries) => {
            f.write_str("{")?;
            for (i, (k, v)) in entries.borrow().iter().enumerate() {
               if i > 0 {
                  f.write_str(", ")?;
               }
               write!(f, "'{}': {}", k, v)?;
            }
            f.write_str("}")
         }
         Value::Function(func) => write!(f, "{}", func),
         Value::Native(func) => write!(f, "{}", func),
         Value::Error(e) => write!(f, "<오류 {}: {}>", e.kind, e.message),
         Value::Class(c) => write!(f, "<클래스 '{}'>", c.name),
         Value::Instance(i) => write!(f, "<객체 '{}'>", i.borrow().class.name),
         Value::Promise(p) => match &*p.borrow() {
            PromiseState::Pending => f.write_str("<약속 대기>"),
            PromiseState::Resolved(v) => write!(f, "<약속 {}>", v),
         },
      }
   }
}
