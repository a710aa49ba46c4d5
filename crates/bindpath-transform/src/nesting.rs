//! Nesting depth of raw source text.
//!
//! The parser and the printer recurse once per level of nesting, below the
//! rewriter's own depth guard, so input nested far past `max_depth` is turned
//! away before it reaches them. The scan is lexical. Each open bracket counts
//! one level, and so does each operator or keyword whose operand is parsed
//! recursively: `=`, `=>`, `?`, `!`, `~`, prefix `+`/`-`, `new`, `if` and
//! the like. Those counts reset at `;`, `,` and the end of a block.
//! Strings, comments, regular expressions and template text are skipped.

/// Raw nesting levels accepted per unit of `max_depth`.
pub(crate) const LEVELS_PER_DEPTH: usize = 4;

/// Stack reserved for one transform before counting nesting.
const STACK_BASE: usize = 1024 * 1024;
/// Stack reserved per accepted nesting level.
const STACK_PER_LEVEL: usize = 32 * 1024;

/// Keywords whose operand or body is parsed recursively.
const NESTING_KEYWORDS: &[&str] = &[
    "new", "typeof", "void", "delete", "await", "yield", "if", "else", "while", "for", "with",
    "do",
];

/// Keywords after which a `/` starts a regular expression.
const OPERAND_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
    "await",
];

/// Stack size that covers parsing, rewriting and printing input nested up
/// to `limit` levels.
pub(crate) fn stack_size(limit: usize) -> usize {
    STACK_BASE.saturating_add(limit.saturating_mul(STACK_PER_LEVEL))
}

/// Byte offset at which nesting in `source` first exceeds `limit`, if it
/// ever does.
pub(crate) fn first_excess(source: &str, limit: usize) -> Option<u32> {
    Scanner::new(source.as_bytes()).run(limit)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Top,
    Bracket,
    /// `${` inside a template literal.
    Substitution,
}

#[derive(Debug)]
struct Level {
    frame: Frame,
    /// Recursive operators seen since this level last reset.
    run: usize,
}

struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    levels: Vec<Level>,
    /// Sum of `run` over `levels`.
    runs: usize,
    /// Whether a `/` here starts a regular expression.
    operand: bool,
    /// The previous token was `.` or `?.`, so a keyword is a property name.
    after_dot: bool,
}

impl<'a> Scanner<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            levels: vec![Level {
                frame: Frame::Top,
                run: 0,
            }],
            runs: 0,
            operand: true,
            after_dot: false,
        }
    }

    fn depth(&self) -> usize {
        self.levels.len() - 1 + self.runs
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn run(mut self, limit: usize) -> Option<u32> {
        while let Some(byte) = self.peek(0) {
            let start = self.pos;
            let after_dot = std::mem::take(&mut self.after_dot);
            match byte {
                b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c => {
                    self.pos += 1;
                    self.after_dot = after_dot;
                }
                b'/' if self.peek(1) == Some(b'/') => {
                    self.skip_until(b"\n");
                    self.after_dot = after_dot;
                }
                b'/' if self.peek(1) == Some(b'*') => {
                    self.pos += 2;
                    self.skip_until(b"*/");
                    self.after_dot = after_dot;
                }
                b'/' if self.operand => {
                    self.skip_regex();
                    self.operand = false;
                }
                b'\'' | b'"' => {
                    self.skip_string(byte);
                    self.operand = false;
                }
                b'`' => {
                    self.pos += 1;
                    self.template();
                }
                b'(' | b'[' | b'{' => {
                    self.pos += 1;
                    self.push(Frame::Bracket);
                    self.operand = true;
                }
                b')' | b']' => {
                    self.pos += 1;
                    self.pop();
                    self.operand = false;
                }
                b'}' => {
                    self.pos += 1;
                    if self.pop() == Some(Frame::Substitution) {
                        self.template();
                    } else {
                        if !self.followed_by(b"else") {
                            self.reset_run();
                        }
                        self.operand = true;
                    }
                }
                b';' | b',' => {
                    self.pos += 1;
                    self.reset_run();
                    self.operand = true;
                }
                b'.' if self.bytes[self.pos..].starts_with(b"...") => {
                    self.pos += 3;
                    self.operand = true;
                }
                b'.' if !self.peek(1).is_some_and(|b| b.is_ascii_digit()) => {
                    self.pos += 1;
                    self.after_dot = true;
                    self.operand = false;
                }
                b'0'..=b'9' | b'.' => {
                    self.pos += 1;
                    self.skip_word();
                    self.operand = false;
                }
                b'=' => self.equals(),
                b'!' if self.peek(1) == Some(b'=') => {
                    self.pos += 1;
                    self.skip_byte(b'=');
                    self.operand = true;
                }
                b'!' | b'~' => {
                    self.pos += 1;
                    self.bump();
                    self.operand = true;
                }
                b'?' => self.question(),
                b'+' | b'-' => self.plus_minus(byte),
                b'<' | b'>' => {
                    while matches!(self.peek(0), Some(b'<' | b'>')) {
                        self.pos += 1;
                    }
                    self.skip_byte(b'=');
                    self.operand = true;
                }
                b'*' | b'%' | b'&' | b'|' | b'^' => {
                    self.pos += 1;
                    self.skip_byte(byte);
                    if self.peek(0) == Some(b'=') {
                        self.pos += 1;
                        self.bump();
                    }
                    self.operand = true;
                }
                _ if is_word_byte(byte) || byte == b'#' => self.word(after_dot),
                _ => {
                    self.pos += 1;
                    self.operand = true;
                }
            }

            if self.depth() > limit {
                return Some(start as u32);
            }
        }
        None
    }

    fn push(&mut self, frame: Frame) {
        self.levels.push(Level { frame, run: 0 });
    }

    /// Close the innermost level. A stray closer at the top level is left
    /// for the parser to report.
    fn pop(&mut self) -> Option<Frame> {
        if self.levels.len() == 1 {
            return None;
        }
        let level = self.levels.pop()?;
        self.runs -= level.run;
        Some(level.frame)
    }

    fn bump(&mut self) {
        if let Some(level) = self.levels.last_mut() {
            level.run += 1;
            self.runs += 1;
        }
    }

    fn reset_run(&mut self) {
        if let Some(level) = self.levels.last_mut() {
            self.runs -= level.run;
            level.run = 0;
        }
    }

    fn skip_byte(&mut self, byte: u8) {
        while self.peek(0) == Some(byte) {
            self.pos += 1;
        }
    }

    fn skip_word(&mut self) {
        while self.peek(0).is_some_and(is_word_byte) {
            self.pos += 1;
        }
    }

    /// Move past the next `end`, or to the end of input.
    fn skip_until(&mut self, end: &[u8]) {
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos..].starts_with(end) {
                self.pos += end.len();
                return;
            }
            self.pos += 1;
        }
    }

    fn skip_string(&mut self, quote: u8) {
        self.pos += 1;
        while let Some(byte) = self.peek(0) {
            self.pos += 1;
            match byte {
                b'\\' => self.pos += 1,
                b'\n' => return,
                _ if byte == quote => return,
                _ => {}
            }
        }
    }

    fn skip_regex(&mut self) {
        self.pos += 1;
        let mut in_class = false;
        while let Some(byte) = self.peek(0) {
            self.pos += 1;
            match byte {
                b'\\' => self.pos += 1,
                b'[' => in_class = true,
                b']' => in_class = false,
                b'/' if !in_class => break,
                b'\n' | b'\r' => break,
                _ => {}
            }
        }
        self.skip_word();
    }

    /// Template text up to the closing backtick or the next `${`.
    fn template(&mut self) {
        while let Some(byte) = self.peek(0) {
            match byte {
                b'\\' => self.pos += 2,
                b'`' => {
                    self.pos += 1;
                    self.operand = false;
                    return;
                }
                b'$' if self.peek(1) == Some(b'{') => {
                    self.pos += 2;
                    self.push(Frame::Substitution);
                    self.operand = true;
                    return;
                }
                _ => self.pos += 1,
            }
        }
    }

    fn equals(&mut self) {
        match self.peek(1) {
            Some(b'=') => {
                self.skip_byte(b'=');
            }
            Some(b'>') => {
                self.pos += 2;
                self.bump();
            }
            _ => {
                self.pos += 1;
                self.bump();
            }
        }
        self.operand = true;
    }

    fn question(&mut self) {
        match self.peek(1) {
            Some(b'.') if !self.peek(2).is_some_and(|b| b.is_ascii_digit()) => {
                self.pos += 2;
                self.after_dot = true;
                self.operand = false;
                return;
            }
            Some(b'?') => {
                self.pos += 2;
                if self.peek(0) == Some(b'=') {
                    self.pos += 1;
                    self.bump();
                }
            }
            _ => {
                self.pos += 1;
                self.bump();
            }
        }
        self.operand = true;
    }

    fn plus_minus(&mut self, byte: u8) {
        self.pos += 1;
        match self.peek(0) {
            // `++` and `--` leave the operand state as it was
            Some(next) if next == byte => self.pos += 1,
            Some(b'=') => {
                self.pos += 1;
                self.bump();
                self.operand = true;
            }
            _ => {
                if self.operand {
                    self.bump();
                }
                self.operand = true;
            }
        }
    }

    fn word(&mut self, after_dot: bool) {
        let start = self.pos;
        self.pos += 1;
        self.skip_word();
        if after_dot {
            self.operand = false;
            return;
        }

        let bytes = self.bytes;
        let word = &bytes[start..self.pos];
        let is = |list: &[&str]| list.iter().any(|k| k.as_bytes() == word);
        if is(NESTING_KEYWORDS) {
            self.bump();
        }
        self.operand = is(OPERAND_KEYWORDS);
    }

    /// Whether `word` is the next token, allowing whitespace before it.
    fn followed_by(&self, word: &[u8]) -> bool {
        let rest = self.bytes.get(self.pos..).unwrap_or_default();
        let skip = rest
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(rest.len());
        let rest = &rest[skip..];
        rest.starts_with(word) && !rest.get(word.len()).is_some_and(|&b| is_word_byte(b))
    }
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'$' | b'\\') || byte >= 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth_of(source: &str) -> usize {
        (0..=source.len())
            .find(|&limit| first_excess(source, limit).is_none())
            .unwrap()
    }

    #[test]
    fn test_brackets_nest() {
        assert_eq!(depth_of("a;"), 0);
        assert_eq!(depth_of("f(a[0], { b: 1 });"), 2);
        assert_eq!(depth_of("((((a))));"), 4);
        assert_eq!(first_excess("a; ((b));", 1), Some(4));
    }

    #[test]
    fn test_quoted_text_is_skipped() {
        assert_eq!(depth_of(r#"x("(((", '[[[\'', "\"{{{");"#), 1);
        assert_eq!(depth_of("x // (((\n;"), 0);
        assert_eq!(depth_of("x /* ((( */;"), 0);
    }

    #[test]
    fn test_regex_and_division() {
        assert_eq!(depth_of("x = /(((/g;"), 1);
        assert_eq!(depth_of("x = /[/(]/;"), 1);
        assert_eq!(depth_of("y = a / (b) / c;"), 2);
    }

    #[test]
    fn test_template_substitutions_nest() {
        assert_eq!(depth_of("`((( ${a} )))`;"), 1);
        assert_eq!(depth_of("`${ `${ (a) }` }`;"), 3);
        assert_eq!(depth_of("`a${ {b: 1}.b }c` + (d);"), 2);
    }

    #[test]
    fn test_recursive_operators_count() {
        assert_eq!(depth_of("a = b = c = d;"), 3);
        assert_eq!(depth_of("!!!!a;"), 4);
        assert_eq!(depth_of("x = - - a;"), 3);
        assert_eq!(depth_of("a ? b : c ? d : e;"), 2);
        assert_eq!(depth_of("f = x => y => x + y;"), 3);
    }

    #[test]
    fn test_binary_operators_do_not_count() {
        assert_eq!(depth_of("a + b - c * d == e !== f >= g && h;"), 0);
        assert_eq!(depth_of("i++ - --j;"), 0);
        assert_eq!(depth_of("a?.b ?? c.new;"), 0);
    }

    #[test]
    fn test_runs_reset_at_separators() {
        assert_eq!(depth_of("a = 1; b = 2; c = 3;"), 1);
        assert_eq!(depth_of("f(a = 1, b = 2);"), 2);
        assert_eq!(depth_of("if (a) { b; } c = 1;"), 2);
    }

    #[test]
    fn test_else_chain_keeps_counting() {
        assert_eq!(depth_of("if (a) {} else if (b) {} else {}"), 5);
        assert_eq!(depth_of("if (a) {} b = 1;"), 2);
    }

    #[test]
    fn test_unbalanced_closers_are_ignored() {
        assert_eq!(depth_of(")))]]}}} (a);"), 1);
    }

    #[test]
    fn test_stack_size_grows_with_limit() {
        assert!(stack_size(1024) > stack_size(16));
        assert_eq!(stack_size(usize::MAX), usize::MAX);
    }
}
