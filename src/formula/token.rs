// SPDX-License-Identifier: MIT

//! Formula tokenizer
//!
//! Splits a raw formula into patterns, the `AND`/`OR`/`NOT` keywords and
//! parentheses. Tokenizing never fails: every input, however malformed,
//! produces a token sequence terminated by exactly one [`Token::End`].

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

/// A single lexical unit of a formula
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Literal operand text, preserved verbatim
    Pattern(String),
    And,
    Or,
    Not,
    LParen,
    RParen,
    /// End of input
    End,
}

impl Token {
    /// True for tokens that may begin an operand (`pattern`, `NOT`, `(`)
    pub fn starts_operand(&self) -> bool {
        matches!(self, Token::Pattern(_) | Token::Not | Token::LParen)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Pattern(text) => write!(f, "pattern '{}'", text),
            Token::And => write!(f, "AND"),
            Token::Or => write!(f, "OR"),
            Token::Not => write!(f, "NOT"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::End => write!(f, "end of formula"),
        }
    }
}

/// Left-to-right scanner over a formula string
pub struct Tokenizer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    finished: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            finished: false,
        }
    }

    /// Tokenize the entire input, including the trailing [`Token::End`]
    pub fn tokenize(input: &str) -> Vec<Token> {
        Tokenizer::new(input).collect()
    }

    /// Produce the next token. Returns [`Token::End`] once input is exhausted.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        match self.chars.peek().copied() {
            None => Token::End,
            Some((_, '(')) => {
                self.chars.next();
                Token::LParen
            }
            Some((_, ')')) => {
                self.chars.next();
                Token::RParen
            }
            Some((start, _)) => {
                let end = self.scan_word(start);
                let word = &self.input[start..end];
                keyword(word).unwrap_or_else(|| Token::Pattern(word.to_string()))
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    /// Consume a maximal run of non-whitespace, non-paren characters and
    /// return its end offset.
    fn scan_word(&mut self, start: usize) -> usize {
        let mut end = start;
        while let Some((idx, c)) = self
            .chars
            .next_if(|(_, c)| !c.is_whitespace() && *c != '(' && *c != ')')
        {
            end = idx + c.len_utf8();
        }
        end
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if token == Token::End {
            self.finished = true;
        }
        Some(token)
    }
}

/// Whole-word keyword match. The word is already a maximal run, so a
/// keyword can never be a prefix of a longer operand such as `Android`.
fn keyword(word: &str) -> Option<Token> {
    if word.eq_ignore_ascii_case("AND") {
        Some(Token::And)
    } else if word.eq_ignore_ascii_case("OR") {
        Some(Token::Or)
    } else if word.eq_ignore_ascii_case("NOT") {
        Some(Token::Not)
    } else {
        None
    }
}

/// Tokenize a formula
pub fn tokenize(formula: &str) -> Vec<Token> {
    Tokenizer::tokenize(formula)
}

/// Literal pattern operands of a formula, in order of appearance
pub fn operands(formula: &str) -> Vec<String> {
    Tokenizer::new(formula)
        .filter_map(|token| match token {
            Token::Pattern(text) => Some(text),
            _ => None,
        })
        .collect()
}
