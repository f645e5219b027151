use std::io::{self, BufRead, Write};

use crate::interpreter::Interpreter;

/// The interactive REPL. Input is line-buffered and accumulates until
/// every bracket pair balances, so multi-line constructs work naturally;
/// errors print and the loop accepts the next input.
pub fn run() {
   println!("세종 (Sejong) 인터프리터");
   println!("종료하려면 Ctrl-D를 누르세요.");

   let mut interpreter = Interpreter::new();
   let stdin = io::stdin();
   let mut buffer = String::new();

   loop {
      if buffer.is_empty() {
         print!("세종> ");
      } else {
         print!("....> ");
      }
      let _ = io::stdout().flush();

      let mut line = String::new();
      match stdin.lock().read_line(&mut line) {
         Ok(0) => break, // EOF
         Ok(_) => {}
         Err(_) => break,
      }

      buffer.push_str(&line);

      if !brackets_balanced(&buffer) {
         continue;
      }

      let source = std::mem::take(&mut buffer);
      if source.trim().is_empty() {
         continue;
      }

      interpreter.interpret("<repl>", &source);
   }
}

/// True when every ( ) { } [ ] pair in the input balances, ignoring
/// bracket characters inside string literals.
fn brackets_balanced(src: &str) -> bool {
   let mut parens = 0i32;
   let mut curlies = 0i32;
   let mut brackets = 0i32;

   let mut quote: Option<char> = None;
   let mut escaped = false;

   for c in src.chars() {
      if let Some(q) = quote {
         if escaped {
            escaped = false;
         } else if c == '\\' {
            escaped = true;
         } else if c == q {
            quote = None;
         }
         continue;
      }

      match c {
         '"' | '\'' => quote = Some(c),
         '(' => parens += 1,
         ')' => parens -= 1,
         '{' => curlies += 1,
         '}' => curlies -= 1,
         '[' => brackets += 1,
         ']' => brackets -= 1,
         _ => {}
      }
   }

   parens <= 0 && curlies <= 0 && brackets <= 0
}
