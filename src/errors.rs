use std::fmt;

/// Errors produced while lexing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LexerErrorType {
   InvalidToken,
   UnterminatedString,
}

impl LexerErrorType {
   pub fn name(&self) -> &'static str {
      match self {
         LexerErrorType::InvalidToken => "InvalidToken",
         LexerErrorType::UnterminatedString => "UnterminatedString",
      }
   }
}

/// Errors produced while parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParserErrorType {
   UnexpectedToken,
   MissingToken,
   TrailingInput,
}

impl ParserErrorType {
   pub fn name(&self) -> &'static str {
      match self {
         ParserErrorType::UnexpectedToken => "UnexpectedToken",
         ParserErrorType::MissingToken => "MissingToken",
         ParserErrorType::TrailingInput => "TrailingInput",
      }
   }
}

/// Errors produced by the semantic analyzer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SemanticErrorType {
   UndefinedName,
   Redefinition,
   TypeAnnotationMismatch,
   UnresolvedReference,
}

impl SemanticErrorType {
   pub fn name(&self) -> &'static str {
      match self {
         SemanticErrorType::UndefinedName => "UndefinedName",
         SemanticErrorType::Redefinition => "Redefinition",
         SemanticErrorType::TypeAnnotationMismatch => "TypeAnnotationMismatch",
         SemanticErrorType::UnresolvedReference => "UnresolvedReference",
      }
   }
}

/// Fatal structural errors surfaced by the bytecode compiler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompilerErrorType {
   JumpTooFar,
   TooManyConstants,
   TooManyNames,
   TooManyLocals,
   MaxArity,
}

impl CompilerErrorType {
   pub fn name(&self) -> &'static str {
      match self {
         CompilerErrorType::JumpTooFar => "JumpTooFar",
         CompilerErrorType::TooManyConstants => "TooManyConstants",
         CompilerErrorType::TooManyNames => "TooManyNames",
         CompilerErrorType::TooManyLocals => "TooManyLocals",
         CompilerErrorType::MaxArity => "MaxArity",
      }
   }
}

/// The runtime limit that was breached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LimitKind {
   Instructions,
   Time,
   StackDepth,
}

/// Errors produced while the virtual machine is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeErrorType {
   TypeMismatch,
   ZeroDivision,
   IndexOutOfBounds,
   NotCallable,
   ArityMismatch,
   StackUnderflow,
   RuntimeLimitExceeded(LimitKind),
   UndefinedGlobal,
   UndefinedName,
   /// A value raised by 던지다 that no 시도 handler caught.
   UncaughtThrow,
}

impl RuntimeErrorType {
   pub fn name(&self) -> &'static str {
      match self {
         RuntimeErrorType::TypeMismatch => "TypeMismatch",
         RuntimeErrorType::ZeroDivision => "ZeroDivision",
         RuntimeErrorType::IndexOutOfBounds => "IndexOutOfBounds",
         RuntimeErrorType::NotCallable => "NotCallable",
         RuntimeErrorType::ArityMismatch => "ArityMismatch",
         RuntimeErrorType::StackUnderflow => "StackUnderflow",
         RuntimeErrorType::RuntimeLimitExceeded(_) => "RuntimeLimitExceeded",
         RuntimeErrorType::UndefinedGlobal => "UndefinedGlobal",
         RuntimeErrorType::UndefinedName => "UndefinedName",
         RuntimeErrorType::UncaughtThrow => "UncaughtThrow",
      }
   }
}

impl fmt::Display for RuntimeErrorType {
   fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      f.write_str(self.name())
   }
}

/// A single diagnostic collected by the front end. Every phase reports
/// through this shape so the surface format stays uniform.
#[derive(Clone, Debug)]
pub struct ErrorReport {
   pub line: usize,
   pub column: usize,
   pub kind: String,
   pub message: String,
}

impl ErrorReport {
   pub fn new(line: usize, column: usize, kind: &str, message: String) -> ErrorReport {
      ErrorReport {
         line,
         column,
         kind: String::from(kind),
         message,
      }
   }
}

/// A runtime failure paired with the source line it occurred on.
#[derive(Clone, Debug)]
pub struct RuntimeError {
   pub error: RuntimeErrorType,
   pub message: String,
   pub line: usize,
}

/// Reports a list of front-end errors to stderr, one line each, in the
/// `<filename>:<line>:<col>: <kind>: <message>` form.
pub fn report_errors_list(filename: &str, errors: &[ErrorReport]) {
   for e in errors {
      eprintln!(
         "\x1b[31;1m{}:{}:{}:\x1b[0m \x1b[1m{}:\x1b[0m {}",
         filename, e.line, e.column, e.kind, e.message
      );
   }
}

/// Reports a runtime error to stderr with its source line.
pub fn report_runtime_error(filename: &str, error: &RuntimeError) {
   eprintln!(
      "\x1b[31;1m{}:{}:1:\x1b[0m \x1b[1m{}:\x1b[0m {}",
      filename,
      error.line,
      error.error.name(),
      error.message
   );
}
