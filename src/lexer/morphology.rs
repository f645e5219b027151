use hashbrown::{HashMap, HashSet};

/// Word classes recognized by the dictionary. Lookup priority when a word
/// belongs to several classes: builtin function > builtin variable >
/// postposition > noun > verb.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WordClass {
   Noun,
   Verb,
   Josa,
   BuiltinVar,
   BuiltinFunc,
   Unknown,
}

/// A single unit of morphological analysis. Splitting a word yields two
/// morphemes (base and postposition); an unsplittable word yields one.
#[derive(Clone, Debug, PartialEq)]
pub struct Morpheme {
   pub surface: String,
   pub base: String,
   pub josa: String,
}

impl Morpheme {
   fn whole(word: &str) -> Morpheme {
      Morpheme {
         surface: String::from(word),
         base: String::from(word),
         josa: String::new(),
      }
   }

   fn split(word: &str, base: &str, josa: &str) -> Vec<Morpheme> {
      vec![
         Morpheme {
            surface: String::from(word),
            base: String::from(base),
            josa: String::new(),
         },
         Morpheme {
            surface: String::from(word),
            base: String::from(josa),
            josa: String::from(josa),
         },
      ]
   }
}

/// The immutable word dictionary consulted during lexing. Built once at
/// interpreter construction and only ever read afterwards.
pub struct Dictionary {
   josa: HashSet<String>,
   nouns: HashSet<String>,
   verbs: HashSet<String>,
   builtin_vars: HashSet<String>,
   builtin_funcs: HashSet<String>,
   /// Word class cache keyed by word, resolved with the lookup priority.
   classes: HashMap<String, WordClass>,
}

impl Default for Dictionary {
   fn default() -> Self {
      let mut dict = Dictionary {
         josa: HashSet::new(),
         nouns: HashSet::new(),
         verbs: HashSet::new(),
         builtin_vars: HashSet::new(),
         builtin_funcs: HashSet::new(),
         classes: HashMap::new(),
      };

      dict.seed();
      dict
   }
}

impl Dictionary {
   /// Classifies a word. Builtins shadow postpositions, which shadow nouns,
   /// which shadow verbs.
   pub fn word_class(&self, word: &str) -> WordClass {
      if let Some(class) = self.classes.get(word) {
         return *class;
      }

      WordClass::Unknown
   }

   pub fn is_josa(&self, word: &str) -> bool {
      self.josa.contains(word)
   }

   pub fn is_noun(&self, word: &str) -> bool {
      self.nouns.contains(word)
   }

   pub fn is_builtin_var(&self, word: &str) -> bool {
      self.builtin_vars.contains(word)
   }

   pub fn is_builtin_func(&self, word: &str) -> bool {
      self.builtin_funcs.contains(word)
   }

   /// True when the word is any registered built-in name, function or
   /// variable. Such words are never split.
   pub fn is_builtin(&self, word: &str) -> bool {
      self.is_builtin_func(word) || self.is_builtin_var(word)
   }

   fn add_josa(&mut self, word: &str) {
      self.josa.insert(String::from(word));
      self.reclassify(word);
   }

   fn add_noun(&mut self, word: &str) {
      self.nouns.insert(String::from(word));
      self.reclassify(word);
   }

   fn add_verb(&mut self, word: &str) {
      self.verbs.insert(String::from(word));
      self.reclassify(word);
   }

   fn add_builtin_var(&mut self, word: &str) {
      self.builtin_vars.insert(String::from(word));
      self.reclassify(word);
   }

   fn add_builtin_func(&mut self, word: &str) {
      self.builtin_funcs.insert(String::from(word));
      self.reclassify(word);
   }

   fn reclassify(&mut self, word: &str) {
      let class = if self.builtin_funcs.contains(word) {
         WordClass::BuiltinFunc
      } else if self.builtin_vars.contains(word) {
         WordClass::BuiltinVar
      } else if self.josa.contains(word) {
         WordClass::Josa
      } else if self.nouns.contains(word) {
         WordClass::Noun
      } else if self.verbs.contains(word) {
         WordClass::Verb
      } else {
         WordClass::Unknown
      };

      self.classes.insert(String::from(word), class);
   }

   fn seed(&mut self) {
      // Single-character postpositions.
      for j in ["을", "를", "이", "가", "은", "는", "의", "에", "로", "과", "와", "도", "만"] {
         self.add_josa(j);
      }

      // Two-character postpositions.
      for j in ["에서", "으로", "부터", "까지", "하고", "에게", "한테", "에다", "보다"] {
         self.add_josa(j);
      }

      // Suffix that behaves like a postposition: "3번", "n번".
      self.add_josa("번");

      // Plain nouns whose final syllable collides with a postposition.
      for n in [
         "나이", "거리", "자리", "머리", "다리", "가지", "먼지", "연기", "놀이", "도시", "차이",
      ] {
         self.add_noun(n);
      }

      // Programming nouns.
      for n in [
         "배열", "함수", "변수", "조건", "반복", "타입", "객체", "클래스", "파일", "경로",
         "문자열", "숫자", "결과", "값", "인덱스", "크기", "내용", "이름", "확장자", "디렉토리",
         "온도",
      ] {
         self.add_noun(n);
      }

      // Range, loop, and control keywords registered as nouns so the
      // splitter leaves them intact.
      for n in [
         "부터", "까지", "미만", "초과", "이하", "이상", "반복", "반복한다", "각각", "만약",
         "아니면", "동안", "반환", "가져오기", "문자", "논리", "참", "거짓", "시도", "오류",
         "던지다", "생성자", "자신",
      ] {
         self.add_noun(n);
      }

      // Built-in variables.
      for v in ["경로", "절대경로", "상대경로", "작업디렉토리", "홈디렉토리", "임시디렉토리"] {
         self.add_builtin_var(v);
      }

      // Built-in functions shipped by the runtime.
      for f in [
         "출력", "타입", "길이", "분리", "찾기", "바꾸기", "대문자", "소문자", "정수", "실수",
         "반올림", "올림", "내림", "절대값", "제곱근", "제곱", "랜덤_숫자", "랜덤_문자열",
         "파일_읽기", "파일_쓰기", "파일_존재", "디렉토리인가", "파일인가", "존재하는가", "입력",
      ] {
         self.add_builtin_func(f);
      }

      // Verbs (used for classification only; never split).
      for v in ["정렬하다", "출력하다", "입력하다", "실행하다", "종료하다", "반환하다"] {
         self.add_verb(v);
      }
   }
}

/// Splits Korean words into a content base and a trailing postposition,
/// consulting the dictionary for protected nouns and built-in names.
pub struct MorphologicalAnalyzer<'a> {
   dictionary: &'a Dictionary,
}

impl<'a> MorphologicalAnalyzer<'a> {
   pub fn new(dictionary: &'a Dictionary) -> MorphologicalAnalyzer<'a> {
      MorphologicalAnalyzer { dictionary }
   }

   /// Analyzes a word into one morpheme (no split) or two (base + josa).
   ///
   /// # Parameters
   /// - `word`: The identifier run to analyze.
   ///
   /// # Returns
   /// `Vec<Morpheme>`: One or two morphemes covering the word.
   pub fn analyze(&self, word: &str) -> Vec<Morpheme> {
      if word.is_empty() {
         return vec![Morpheme::whole(word)];
      }

      // A word that is itself a postposition stays whole.
      if self.dictionary.is_josa(word) {
         return vec![Morpheme::whole(word)];
      }

      // Registered built-ins and nouns are never split.
      if self.dictionary.is_builtin(word) || self.dictionary.is_noun(word) {
         return vec![Morpheme::whole(word)];
      }

      // Hangul directly after an underscore or digit never sheds a josa:
      // identifiers like "원의_넓이" or "값2가" stay whole on that side.
      if self.korean_after_underscore_or_digit(word) {
         return vec![Morpheme::whole(word)];
      }

      if let Some(m) = self.try_two_char_josa(word) {
         return m;
      }

      if let Some(m) = self.try_one_char_josa(word) {
         return m;
      }

      if let Some(m) = self.try_ascii_with_josa(word) {
         return m;
      }

      vec![Morpheme::whole(word)]
   }

   /// Longest-suffix first: a two-character postposition needs at least a
   /// one-character base in front of it.
   fn try_two_char_josa(&self, word: &str) -> Option<Vec<Morpheme>> {
      let chars: Vec<char> = word.chars().collect();
      if chars.len() < 3 {
         return None;
      }

      let suffix: String = chars[chars.len() - 2..].iter().collect();
      if !self.dictionary.is_josa(&suffix) {
         return None;
      }

      let base: String = chars[..chars.len() - 2].iter().collect();
      if !self.splittable_base(&base) {
         return None;
      }

      Some(Morpheme::split(word, &base, &suffix))
   }

   fn try_one_char_josa(&self, word: &str) -> Option<Vec<Morpheme>> {
      let chars: Vec<char> = word.chars().collect();
      if chars.len() < 2 {
         return None;
      }

      let suffix: String = chars[chars.len() - 1..].iter().collect();
      if !self.dictionary.is_josa(&suffix) {
         return None;
      }

      let base: String = chars[..chars.len() - 1].iter().collect();
      if !self.splittable_base(&base) {
         return None;
      }

      Some(Morpheme::split(word, &base, &suffix))
   }

   /// ASCII base with a trailing Hangul postposition, e.g. "i가" or "x를".
   fn try_ascii_with_josa(&self, word: &str) -> Option<Vec<Morpheme>> {
      let chars: Vec<char> = word.chars().collect();
      if chars.len() < 2 {
         return None;
      }

      let last = chars[chars.len() - 1];
      if !is_hangul_syllable(last) {
         return None;
      }

      let suffix: String = String::from(last);
      if !self.dictionary.is_josa(&suffix) {
         return None;
      }

      let base: String = chars[..chars.len() - 1].iter().collect();
      if base.is_empty() || !base.chars().all(|c| c.is_ascii()) {
         return None;
      }

      Some(Morpheme::split(word, &base, &suffix))
   }

   /// A candidate base blocks the split when it is empty, when it ends in
   /// an ASCII underscore or digit, or when base + suffix forms a name the
   /// dictionary protects.
   fn splittable_base(&self, base: &str) -> bool {
      if base.is_empty() {
         return false;
      }

      match base.chars().last() {
         Some(c) if c == '_' || c.is_ascii_digit() => false,
         Some(_) => true,
         None => false,
      }
   }

   fn korean_after_underscore_or_digit(&self, word: &str) -> bool {
      let chars: Vec<char> = word.chars().collect();

      for i in 0..chars.len().saturating_sub(1) {
         let c = chars[i];
         if (c == '_' || c.is_ascii_digit()) && is_hangul_syllable(chars[i + 1]) {
            return true;
         }
      }

      false
   }
}

/// True for code points in the Hangul syllables block (U+AC00..U+D7A3).
pub fn is_hangul_syllable(c: char) -> bool {
   ('\u{AC00}'..='\u{D7A3}').contains(&c)
}
