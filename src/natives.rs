use std::io::{self, BufRead, Write};
use std::rc::Rc;

use hashbrown::HashMap;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::errors::RuntimeErrorType;
use crate::objects::{NativeError, NativeFn, NativeFuncObj, Value};

/// Represents the list of native (built-in) functions available to a
/// Sejong program, keyed by their Korean names.
pub struct Natives(HashMap<String, Rc<NativeFuncObj>>);

impl Default for Natives {
   fn default() -> Self {
      let mut natives = Natives(HashMap::new());

      // >>>>>>>>>>>>>>>> Native functions to be added after this line
      natives.add("출력", 1, 1, native_print as NativeFn);
      natives.add("타입", 1, 1, native_type as NativeFn);
      natives.add("길이", 1, 1, native_length as NativeFn);
      natives.add("분리", 2, 2, native_split as NativeFn);
      natives.add("찾기", 2, 2, native_find as NativeFn);
      natives.add("바꾸기", 3, 3, native_replace as NativeFn);
      natives.add("대문자", 1, 1, native_upper as NativeFn);
      natives.add("소문자", 1, 1, native_lower as NativeFn);
      natives.add("정수", 1, 1, native_to_int as NativeFn);
      natives.add("실수", 1, 1, native_to_float as NativeFn);
      natives.add("반올림", 1, 1, native_round as NativeFn);
      natives.add("올림", 1, 1, native_ceil as NativeFn);
      natives.add("내림", 1, 1, native_floor as NativeFn);
      natives.add("절대값", 1, 1, native_abs as NativeFn);
      natives.add("제곱근", 1, 1, native_sqrt as NativeFn);
      natives.add("제곱", 2, 2, native_pow as NativeFn);
      natives.add("랜덤_숫자", 2, 2, native_random_int as NativeFn);
      natives.add("랜덤_문자열", 1, 1, native_random_string as NativeFn);
      natives.add("파일_읽기", 1, 1, native_read_file as NativeFn);
      natives.add("파일_쓰기", 2, 2, native_write_file as NativeFn);
      natives.add("파일_존재", 1, 1, native_file_exists as NativeFn);
      natives.add("입력", 0, 1, native_input as NativeFn);
      // <<<<<<<<<<<<<<<< Native functions to be added before this line

      natives
   }
}

impl Natives {
   fn add(&mut self, name: &str, min_arity: u8, max_arity: u8, body: NativeFn) {
      let name = String::from(name);

      if self.0.contains_key(&name) {
         panic!("Cannot duplicate native function '{}'.", name);
      }

      self.0.insert(
         name.clone(),
         Rc::new(NativeFuncObj {
            name,
            min_arity,
            max_arity,
            body,
         }),
      );
   }

   /// Looks a native function up by name.
   pub fn get(&self, name: &str) -> Option<Rc<NativeFuncObj>> {
      self.0.get(name).cloned()
   }

   /// Calls a native function, verifying its arity first.
   pub fn call(func: &NativeFuncObj, args: Vec<Value>) -> Result<Value, NativeError> {
      let argc = args.len() as u8;

      if argc < func.min_arity || argc > func.max_arity {
         let message = if func.min_arity == func.max_arity {
            format!(
               "'{}' expects {} arguments but got {}.",
               func.name, func.min_arity, argc
            )
         } else {
            format!(
               "'{}' expects {} to {} arguments but got {}.",
               func.name, func.min_arity, func.max_arity, argc
            )
         };

         return Err(NativeError::new(RuntimeErrorType::ArityMismatch, message));
      }

      (func.body)(args)
   }

   /// The built-in variables seeded into the global environment.
   pub fn builtin_variables() -> Vec<(&'static str, Value)> {
      let cwd = std::env::current_dir()
         .map(|p| p.display().to_string())
         .unwrap_or_default();
      let home = std::env::var("HOME").unwrap_or_default();
      let tmp = std::env::temp_dir().display().to_string();

      vec![
         ("작업디렉토리", Value::from_str(&cwd)),
         ("홈디렉토리", Value::from_str(&home)),
         ("임시디렉토리", Value::from_str(&tmp)),
      ]
   }
}

fn type_error(message: String) -> NativeError {
   NativeError::new(RuntimeErrorType::TypeMismatch, message)
}

// >>>>>>>>>>>>>>>>> ================================================ <<<<<<<<<<<<<<<<<<<
// ================= Native function implementations after this line ===================
// >>>>>>>>>>>>>>>>> ================================================ <<<<<<<<<<<<<<<<<<<

/// 출력(값): prints the value's stringification plus a newline.
fn native_print(args: Vec<Value>) -> Result<Value, NativeError> {
   println!("{}", args[0]);
   Ok(Value::Null)
}

/// 타입(값): the value's type name as a string.
fn native_type(args: Vec<Value>) -> Result<Value, NativeError> {
   Ok(Value::from_str(args[0].type_name()))
}

/// 길이(값): character count of a string, element count of an array or
/// dictionary.
fn native_length(args: Vec<Value>) -> Result<Value, NativeError> {
   match &args[0] {
      Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
      Value::Array(a) => Ok(Value::Int(a.borrow().len() as i64)),
      Value::Dict(d) => Ok(Value::Int(d.borrow().len() as i64)),
      other => Err(type_error(format!("길이 does not apply to '{}'.", other.type_name()))),
   }
}

fn native_split(args: Vec<Value>) -> Result<Value, NativeError> {
   match (&args[0], &args[1]) {
      (Value::Str(s), Value::Str(sep)) => {
         let parts = s
            .split(sep.as_str())
            .map(Value::from_str)
            .collect::<Vec<Value>>();
         Ok(Value::array(parts))
      }
      _ => Err(type_error(String::from("분리 expects two strings."))),
   }
}

/// 찾기(문자열, 부분): character index of the first occurrence, -1 if absent.
fn native_find(args: Vec<Value>) -> Result<Value, NativeError> {
   match (&args[0], &args[1]) {
      (Value::Str(s), Value::Str(needle)) => {
         let index = match s.find(needle.as_str()) {
            Some(byte_idx) => s[..byte_idx].chars().count() as i64,
            None => -1,
         };
         Ok(Value::Int(index))
      }
      _ => Err(type_error(String::from("찾기 expects two strings."))),
   }
}

fn native_replace(args: Vec<Value>) -> Result<Value, NativeError> {
   match (&args[0], &args[1], &args[2]) {
      (Value::Str(s), Value::Str(from), Value::Str(to)) => {
         Ok(Value::from_str(&s.replace(from.as_str(), to.as_str())))
      }
      _ => Err(type_error(String::from("바꾸기 expects three strings."))),
   }
}

fn native_upper(args: Vec<Value>) -> Result<Value, NativeError> {
   match &args[0] {
      Value::Str(s) => Ok(Value::from_str(&s.to_uppercase())),
      other => Err(type_error(format!("대문자 does not apply to '{}'.", other.type_name()))),
   }
}

fn native_lower(args: Vec<Value>) -> Result<Value, NativeError> {
   match &args[0] {
      Value::Str(s) => Ok(Value::from_str(&s.to_lowercase())),
      other => Err(type_error(format!("소문자 does not apply to '{}'.", other.type_name()))),
   }
}

/// 정수(값): converts a float (truncating), bool, or decimal string.
fn native_to_int(args: Vec<Value>) -> Result<Value, NativeError> {
   match &args[0] {
      Value::Int(v) => Ok(Value::Int(*v)),
      Value::Float(v) => Ok(Value::Int(*v as i64)),
      Value::Bool(v) => Ok(Value::Int(*v as i64)),
      Value::Str(s) => s
         .trim()
         .parse::<i64>()
         .map(Value::Int)
         .map_err(|_| type_error(format!("'{}' is not an integer.", s))),
      other => Err(type_error(format!("정수 does not apply to '{}'.", other.type_name()))),
   }
}

fn native_to_float(args: Vec<Value>) -> Result<Value, NativeError> {
   match &args[0] {
      Value::Int(v) => Ok(Value::Float(*v as f64)),
      Value::Float(v) => Ok(Value::Float(*v)),
      Value::Str(s) => s
         .trim()
         .parse::<f64>()
         .map(Value::Float)
         .map_err(|_| type_error(format!("'{}' is not a number.", s))),
      other => Err(type_error(format!("실수 does not apply to '{}'.", other.type_name()))),
   }
}

fn native_round(args: Vec<Value>) -> Result<Value, NativeError> {
   numeric_unary(&args[0], "반올림", |v| v.round())
}

fn native_ceil(args: Vec<Value>) -> Result<Value, NativeError> {
   numeric_unary(&args[0], "올림", |v| v.ceil())
}

fn native_floor(args: Vec<Value>) -> Result<Value, NativeError> {
   numeric_unary(&args[0], "내림", |v| v.floor())
}

fn numeric_unary(value: &Value, name: &str, f: fn(f64) -> f64) -> Result<Value, NativeError> {
   match value {
      Value::Int(v) => Ok(Value::Int(*v)),
      Value::Float(v) => Ok(Value::Int(f(*v) as i64)),
      other => Err(type_error(format!("{} does not apply to '{}'.", name, other.type_name()))),
   }
}

fn native_abs(args: Vec<Value>) -> Result<Value, NativeError> {
   match &args[0] {
      Value::Int(v) => Ok(Value::Int(v.abs())),
      Value::Float(v) => Ok(Value::Float(v.abs())),
      other => Err(type_error(format!("절대값 does not apply to '{}'.", other.type_name()))),
   }
}

fn native_sqrt(args: Vec<Value>) -> Result<Value, NativeError> {
   match &args[0] {
      Value::Int(v) => Ok(Value::Float((*v as f64).sqrt())),
      Value::Float(v) => Ok(Value::Float(v.sqrt())),
      other => Err(type_error(format!("제곱근 does not apply to '{}'.", other.type_name()))),
   }
}

fn native_pow(args: Vec<Value>) -> Result<Value, NativeError> {
   match (&args[0], &args[1]) {
      (Value::Int(base), Value::Int(exp)) if *exp >= 0 => {
         Ok(Value::Int(base.pow(*exp as u32)))
      }
      (a, b) if a.is_numeric() && b.is_numeric() => {
         Ok(Value::Float(a.as_float().unwrap().powf(b.as_float().unwrap())))
      }
      _ => Err(type_error(String::from("제곱 expects two numbers."))),
   }
}

/// 랜덤_숫자(min, max): a uniform integer in [min, max].
fn native_random_int(args: Vec<Value>) -> Result<Value, NativeError> {
   match (&args[0], &args[1]) {
      (Value::Int(min), Value::Int(max)) if min <= max => {
         let value = rand::thread_rng().gen_range(*min..=*max);
         Ok(Value::Int(value))
      }
      _ => Err(type_error(String::from("랜덤_숫자 expects two integers, min <= max."))),
   }
}

/// 랜덤_문자열(길이): a random alphanumeric string.
fn native_random_string(args: Vec<Value>) -> Result<Value, NativeError> {
   match &args[0] {
      Value::Int(len) if *len >= 0 => {
         let s: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(*len as usize)
            .map(char::from)
            .collect();
         Ok(Value::from_str(&s))
      }
      _ => Err(type_error(String::from("랜덤_문자열 expects a non-negative length."))),
   }
}

fn native_read_file(args: Vec<Value>) -> Result<Value, NativeError> {
   match &args[0] {
      Value::Str(path) => std::fs::read_to_string(path.as_str())
         .map(|s| Value::from_str(&s))
         .map_err(|e| type_error(format!("Cannot read '{}': {}.", path, e))),
      other => Err(type_error(format!("파일_읽기 does not apply to '{}'.", other.type_name()))),
   }
}

fn native_write_file(args: Vec<Value>) -> Result<Value, NativeError> {
   match (&args[0], &args[1]) {
      (Value::Str(path), value) => {
         std::fs::write(path.as_str(), format!("{}", value))
            .map_err(|e| type_error(format!("Cannot write '{}': {}.", path, e)))?;
         Ok(Value::Null)
      }
      _ => Err(type_error(String::from("파일_쓰기 expects a path string."))),
   }
}

fn native_file_exists(args: Vec<Value>) -> Result<Value, NativeError> {
   match &args[0] {
      Value::Str(path) => Ok(Value::Bool(std::path::Path::new(path.as_str()).exists())),
      other => Err(type_error(format!("파일_존재 does not apply to '{}'.", other.type_name()))),
   }
}

/// 입력(프롬프트?): reads one line from stdin, without the newline.
fn native_input(args: Vec<Value>) -> Result<Value, NativeError> {
   if let Some(Value::Str(prompt)) = args.first() {
      print!("{}", prompt);
      let _ = io::stdout().flush();
   }

   let mut line = String::new();
   io::stdin()
      .lock()
      .read_line(&mut line)
      .map_err(|e| type_error(format!("Cannot read input: {}.", e)))?;

   while line.ends_with('\n') || line.ends_with('\r') {
      line.pop();
   }

   Ok(Value::from_str(&line))
}
