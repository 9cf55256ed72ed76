//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Dap4.
//! The Dap4 project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! Tokenizer for constraint expressions.

use crate::errors::{DapError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Name(String),
    Str(String),
    Long(i64),
    Double(f64),
    Comma,
    Semi,
    Dot,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Star,
    Colon,
    Pipe,
    Bang,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    EqEq,
    Ne,
    Match,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token's first character.
    pub offset: usize,
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '_' | '/' | '\\' | '%')
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '/' | '\\' | '%' | '-' | '+')
}

pub fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let simple = match c {
            ',' => Some(TokenKind::Comma),
            ';' => Some(TokenKind::Semi),
            '.' => Some(TokenKind::Dot),
            '{' => Some(TokenKind::LBrace),
            '}' => Some(TokenKind::RBrace),
            '[' => Some(TokenKind::LBracket),
            ']' => Some(TokenKind::RBracket),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '*' => Some(TokenKind::Star),
            ':' => Some(TokenKind::Colon),
            '|' => Some(TokenKind::Pipe),
            _ => None,
        };
        if let Some(kind) = simple {
            chars.next();
            tokens.push(Token { kind, offset });
            continue;
        }

        match c {
            '<' | '>' | '=' | '!' => {
                chars.next();
                let next = chars.peek().map(|&(_, n)| n);
                let kind = match (c, next) {
                    ('<', Some('=')) => TokenKind::Le,
                    ('>', Some('=')) => TokenKind::Ge,
                    ('=', Some('=')) => TokenKind::EqEq,
                    ('=', Some('~')) => TokenKind::Match,
                    ('!', Some('=')) => TokenKind::Ne,
                    ('<', _) => TokenKind::Lt,
                    ('>', _) => TokenKind::Gt,
                    ('=', _) => TokenKind::Eq,
                    _ => TokenKind::Bang,
                };
                if matches!(
                    kind,
                    TokenKind::Le
                        | TokenKind::Ge
                        | TokenKind::EqEq
                        | TokenKind::Match
                        | TokenKind::Ne
                ) {
                    chars.next();
                }
                tokens.push(Token { kind, offset });
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some((_, ch)) = chars.next() {
                    match ch {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some((_, escaped)) => value.push(escaped),
                            None => break,
                        },
                        other => value.push(other),
                    }
                }
                if !closed {
                    return Err(DapError::grammar(
                        "unterminated string constant",
                        format!("offset {offset}"),
                    ));
                }
                tokens.push(Token {
                    kind: TokenKind::Str(value),
                    offset,
                });
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' => {
                tokens.push(lex_number(text, &mut chars, offset)?);
            }
            c if is_name_start(c) => {
                let mut name = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if ch == '\\' {
                        chars.next();
                        match chars.next() {
                            Some((_, escaped)) => name.push(escaped),
                            None => {
                                return Err(DapError::grammar(
                                    "dangling escape in name",
                                    format!("offset {offset}"),
                                ))
                            }
                        }
                    } else if is_name_char(ch) {
                        name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Name(name),
                    offset,
                });
            }
            other => {
                return Err(DapError::grammar(
                    format!("unexpected character '{other}'"),
                    format!("offset {offset}"),
                ))
            }
        }
    }
    Ok(tokens)
}

fn lex_number(
    text: &str,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    offset: usize,
) -> Result<Token> {
    let mut end = offset;
    let mut is_double = false;
    let mut first = true;
    while let Some(&(i, ch)) = chars.peek() {
        let accept = if ch.is_ascii_digit() {
            true
        } else if (ch == '-' || ch == '+')
            && (first || text[..i].ends_with(|p: char| p == 'e' || p == 'E'))
        {
            true
        } else if ch == '.' {
            // A dot is part of the number only when a digit follows it.
            let follows_digit = text[i + 1..].starts_with(|n: char| n.is_ascii_digit());
            if follows_digit {
                is_double = true;
            }
            follows_digit
        } else if ch == 'e' || ch == 'E' {
            is_double = true;
            true
        } else {
            false
        };
        if !accept {
            break;
        }
        first = false;
        end = i + ch.len_utf8();
        chars.next();
    }
    let literal = &text[offset..end];
    let location = || format!("offset {offset}");
    let kind = if is_double {
        TokenKind::Double(
            literal.parse().map_err(|_| {
                DapError::grammar(format!("malformed number '{literal}'"), location())
            })?,
        )
    } else {
        TokenKind::Long(
            literal.parse().map_err(|_| {
                DapError::grammar(format!("malformed integer '{literal}'"), location())
            })?,
        )
    };
    Ok(Token { kind, offset })
}
