//! Quote-aware character scanning and word tokenization.
//!
//! Both the pipe splitter and the context injector need to know which
//! characters of a command are "live" shell syntax and which are protected
//! by quotes or a backslash. [`Scanner`] answers that question one
//! character at a time; [`tokenize`] builds shell words on top of it.

use std::str::CharIndices;

/// Quoting state of the scanner between characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteState {
    /// Outside any quotes.
    #[default]
    Unquoted,
    /// Inside `'...'`.
    Single,
    /// Inside `"..."`.
    Double,
}

/// How a scanned character participates in shell syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// Unquoted, unescaped character. Operators like `|` only count here.
    Bare,
    /// Literal content protected by quotes or a preceding backslash.
    Quoted,
    /// A quote delimiter or escaping backslash. Not part of the word value.
    Syntax,
}

/// Iterator over `(byte_offset, char, class)` for a command string.
///
/// Single quotes protect everything up to the closing quote, including
/// backslashes. Inside double quotes and outside quotes a backslash
/// protects the next character. An unterminated quote protects the rest of
/// the input.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    chars: CharIndices<'a>,
    state: QuoteState,
    escaped: bool,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner positioned at the start of `input`.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices(),
            state: QuoteState::Unquoted,
            escaped: false,
        }
    }

    /// Returns the quoting state after the characters consumed so far.
    #[must_use]
    pub fn state(&self) -> QuoteState {
        self.state
    }
}

impl Iterator for Scanner<'_> {
    type Item = (usize, char, CharClass);

    fn next(&mut self) -> Option<Self::Item> {
        let (idx, ch) = self.chars.next()?;

        if self.escaped {
            self.escaped = false;
            return Some((idx, ch, CharClass::Quoted));
        }

        let class = match (self.state, ch) {
            (QuoteState::Single, '\'') => {
                self.state = QuoteState::Unquoted;
                CharClass::Syntax
            }
            (QuoteState::Single, _) => CharClass::Quoted,
            (QuoteState::Double, '"') => {
                self.state = QuoteState::Unquoted;
                CharClass::Syntax
            }
            (QuoteState::Double, '\\') => {
                self.escaped = true;
                CharClass::Syntax
            }
            (QuoteState::Double, _) => CharClass::Quoted,
            (QuoteState::Unquoted, '\'') => {
                self.state = QuoteState::Single;
                CharClass::Syntax
            }
            (QuoteState::Unquoted, '"') => {
                self.state = QuoteState::Double;
                CharClass::Syntax
            }
            (QuoteState::Unquoted, '\\') => {
                self.escaped = true;
                CharClass::Syntax
            }
            (QuoteState::Unquoted, _) => CharClass::Bare,
        };

        Some((idx, ch, class))
    }
}

/// A shell word with its unquoted value and its byte span in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The word after quote removal (`'a b'` becomes `a b`).
    pub value: String,
    /// Byte offset of the first character of the word.
    pub start: usize,
    /// Byte offset one past the last character of the word.
    pub end: usize,
}

impl Token {
    /// Returns `true` if the word looks like an option (`-x`, `--flag`).
    #[must_use]
    pub fn is_flag(&self) -> bool {
        self.value.starts_with('-') && self.value.len() > 1
    }
}

/// Splits a single command into shell words, keeping source spans.
///
/// Words are separated by unquoted whitespace. Quote removal is applied to
/// the value, so `''` produces an empty word while surrounding whitespace
/// produces none.
#[must_use]
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current: Option<Token> = None;

    for (idx, ch, class) in Scanner::new(input) {
        if class == CharClass::Bare && ch.is_whitespace() {
            if let Some(token) = current.take() {
                tokens.push(token);
            }
            continue;
        }

        let token = current.get_or_insert_with(|| Token {
            value: String::new(),
            start: idx,
            end: idx,
        });
        token.end = idx + ch.len_utf8();
        if class != CharClass::Syntax {
            token.value.push(ch);
        }
    }

    if let Some(token) = current {
        tokens.push(token);
    }
    tokens
}
