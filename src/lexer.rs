use std::{iter::Peekable, str::CharIndices};

use tracing::warn;

use crate::token::{Span, Token, TokenKind};

pub mod error;

pub use error::LexError;

/// Result of a full scan: the token stream (always `Eof`-terminated) plus
/// every diagnostic reported along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Scanned {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<LexError>,
}

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    tokens: Vec<Token>,
    diagnostics: Vec<LexError>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            tokens: Vec::new(),
            diagnostics: Vec::new(),
            line: 1,
            column: 0,
        }
    }

    pub fn scan(mut self) -> Scanned {
        while let Some(&(start, ch)) = self.chars.peek() {
            self.scan_token(start, ch);
        }

        let end = self.input.len();
        self.tokens.push(Token::new(
            TokenKind::Eof,
            "",
            Span {
                start: end,
                end,
                line: self.line,
                column: self.column,
            },
        ));
        Scanned {
            tokens: self.tokens,
            diagnostics: self.diagnostics,
        }
    }

    fn scan_token(&mut self, start: usize, ch: char) {
        let line = self.line;
        let column = self.column;
        self.advance_char();

        let kind = match ch {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '-' => TokenKind::Minus,
            '+' => TokenKind::Plus,
            ';' => TokenKind::Semicolon,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '!' => self.either('=', TokenKind::BangEqual, TokenKind::Bang),
            '=' => self.either('=', TokenKind::EqualEqual, TokenKind::Equal),
            '<' => self.either('=', TokenKind::LessEqual, TokenKind::Less),
            '>' => self.either('=', TokenKind::GreaterEqual, TokenKind::Greater),
            ' ' | '\r' | '\t' | '\n' => return,
            '"' => return self.read_string(start, line, column),
            c if c.is_ascii_digit() => return self.read_number(start, line, column),
            c if c.is_ascii_alphabetic() || c == '_' => {
                return self.read_identifier(start, line, column);
            }
            character => {
                self.report(LexError::UnexpectedCharacter {
                    character,
                    line,
                    column,
                });
                return;
            }
        };

        let end = self.current_index();
        self.tokens.push(Token::new(
            kind,
            &self.input[start..end],
            Span {
                start,
                end,
                line,
                column,
            },
        ));
    }

    /// Maximal munch: consumes `expected` when it follows and picks the
    /// two-character kind.
    fn either(&mut self, expected: char, matched: TokenKind, single: TokenKind) -> TokenKind {
        if matches!(self.chars.peek(), Some(&(_, c)) if c == expected) {
            self.advance_char();
            matched
        } else {
            single
        }
    }

    fn read_identifier(&mut self, start: usize, line: usize, column: usize) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance_char();
            } else {
                break;
            }
        }

        let end = self.current_index();
        let ident = &self.input[start..end];
        let kind = TokenKind::keyword(ident).unwrap_or(TokenKind::Identifier);
        self.tokens.push(Token::new(
            kind,
            ident,
            Span {
                start,
                end,
                line,
                column,
            },
        ));
    }

    fn read_number(&mut self, start: usize, line: usize, column: usize) {
        self.skip_digits();

        let mut is_float = false;
        if self.fraction_follows() {
            is_float = true;
            self.advance_char(); // '.'
            self.skip_digits();
        }

        let end = self.current_index();
        let literal = &self.input[start..end];
        let span = Span {
            start,
            end,
            line,
            column,
        };

        if is_float && let Some(whole) = integral_value(literal) {
            self.tokens.push(Token::number(whole.to_string(), false, span));
            return;
        }
        self.tokens.push(Token::number(literal, is_float, span));
    }

    fn read_string(&mut self, start: usize, line: usize, column: usize) {
        let content_start = start + 1;
        while let Some(&(idx, c)) = self.chars.peek() {
            self.advance_char();
            if c == '"' {
                self.tokens.push(Token::new(
                    TokenKind::String,
                    &self.input[content_start..idx],
                    Span {
                        start,
                        end: idx + 1,
                        line,
                        column,
                    },
                ));
                return;
            }
        }
        self.report(LexError::UnterminatedString { line: self.line });
    }

    fn skip_digits(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    /// True when the next two characters are `.` and a digit.
    fn fraction_follows(&self) -> bool {
        let mut lookahead = self.chars.clone();
        matches!(lookahead.next(), Some((_, '.')))
            && matches!(lookahead.next(), Some((_, c)) if c.is_ascii_digit())
    }

    fn report(&mut self, diagnostic: LexError) {
        self.diagnostics.push(diagnostic);
    }

    fn advance_char(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        next
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }
}

/// Integer value of a fractional literal whose fraction is zero, when it fits
/// in an `i64`.
fn integral_value(literal: &str) -> Option<i64> {
    let value: f64 = literal.parse().ok()?;
    if value != value.floor() {
        return None;
    }
    // 2^63 is the first float past i64::MAX.
    if value >= -(2f64.powi(63)) && value < 2f64.powi(63) {
        Some(value as i64)
    } else {
        None
    }
}

pub fn scan(input: &str) -> Scanned {
    Lexer::new(input).scan()
}

/// Scans `input`, logging each diagnostic and returning the tokens.
pub fn tokenize(input: &str) -> Vec<Token> {
    let scanned = scan(input);
    for diagnostic in &scanned.diagnostics {
        warn!("{diagnostic}");
    }
    scanned.tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).into_iter().map(|token| token.kind).collect()
    }

    #[test]
    fn test_simple_program() {
        let actual = tokenize("cook { pookie x = 5; yap(x); }");
        let expected = vec![
            (TokenKind::Cook, "cook"),
            (TokenKind::LeftBrace, "{"),
            (TokenKind::Pookie, "pookie"),
            (TokenKind::Identifier, "x"),
            (TokenKind::Equal, "="),
            (TokenKind::Number, "5"),
            (TokenKind::Semicolon, ";"),
            (TokenKind::Yap, "yap"),
            (TokenKind::LeftParen, "("),
            (TokenKind::Identifier, "x"),
            (TokenKind::RightParen, ")"),
            (TokenKind::Semicolon, ";"),
            (TokenKind::RightBrace, "}"),
            (TokenKind::Eof, ""),
        ];

        let actual = actual
            .iter()
            .map(|token| (token.kind, token.text.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(actual, expected);
    }

    #[test]
    fn demotes_integral_float_literals() {
        for (input, expected) in [("7.0", "7"), ("2.0", "2"), ("0.0", "0"), ("12.000", "12")] {
            let tokens = tokenize(input);
            assert_eq!(tokens[0].kind, TokenKind::Number);
            assert_eq!(tokens[0].text, expected, "literal {input}");
            assert!(!tokens[0].is_float, "literal {input} should be an integer");
        }
    }

    #[test]
    fn keeps_fractional_literals_as_floats() {
        let tokens = tokenize("3.25");
        assert_eq!(tokens[0].text, "3.25");
        assert!(tokens[0].is_float);
    }

    #[test]
    fn dot_without_digit_is_not_a_fraction() {
        assert_eq!(
            kinds("4."),
            vec![TokenKind::Number, TokenKind::Dot, TokenKind::Eof]
        );
    }

    #[test]
    fn huge_integral_literal_stays_float() {
        let tokens = tokenize("100000000000000000000.0");
        assert!(tokens[0].is_float);
        assert_eq!(tokens[0].text, "100000000000000000000.0");
    }

    #[test]
    fn prefers_two_character_operators() {
        assert_eq!(
            kinds("!= == <= >= ! = < >"),
            vec![
                TokenKind::BangEqual,
                TokenKind::EqualEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::Bang,
                TokenKind::Equal,
                TokenKind::Less,
                TokenKind::Greater,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_literals_span_lines() {
        let input = indoc! {r#"
            yap("one
            two");
            x
        "#};
        let tokens = tokenize(input);
        assert_eq!(tokens[2].kind, TokenKind::String);
        assert_eq!(tokens[2].text, "one\ntwo");
        let x = tokens
            .iter()
            .find(|token| token.kind == TokenKind::Identifier)
            .expect("identifier token");
        assert_eq!(x.span.line, 3);
    }

    #[test]
    fn reports_and_skips_unexpected_characters() {
        let scanned = scan("x @ 1\n# y");
        let kinds = scanned
            .tokens
            .iter()
            .map(|token| token.kind)
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Number,
                TokenKind::Identifier,
                TokenKind::Eof
            ]
        );
        assert_eq!(
            scanned.diagnostics,
            vec![
                LexError::UnexpectedCharacter {
                    character: '@',
                    line: 1,
                    column: 2,
                },
                LexError::UnexpectedCharacter {
                    character: '#',
                    line: 2,
                    column: 0,
                },
            ]
        );
    }

    #[test]
    fn unterminated_string_produces_no_token() {
        let scanned = scan("yap(\"oops\n");
        let kinds = scanned
            .tokens
            .iter()
            .map(|token| token.kind)
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![TokenKind::Yap, TokenKind::LeftParen, TokenKind::Eof]
        );
        assert_eq!(
            scanned.diagnostics,
            vec![LexError::UnterminatedString { line: 2 }]
        );
    }

    #[test]
    fn recognises_every_keyword() {
        let input = "yap fr no_cap cap bet goon bruh solulu delulu oof pookie goated ohio yeet yoink squad sigma ghost cook";
        let kinds = kinds(input);
        assert_eq!(kinds.len(), 20);
        assert!(!kinds.contains(&TokenKind::Identifier));
        assert_eq!(kinds.last(), Some(&TokenKind::Eof));
    }

    #[test]
    fn empty_input_yields_single_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds(" \t\r\n"), vec![TokenKind::Eof]);
    }
}
