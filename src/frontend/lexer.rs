//! Byte-level lexer for Slate.
//!
//! The lexer is UTF-agnostic: it walks raw bytes and treats anything above
//! 127 as an invalid symbol. Tokens are produced into a fixed ring buffer of
//! [`TOKEN_BUFFER_SIZE`] slots; every refill first copies the
//! [`TOKEN_LOOKAHEAD`] window to the front so the parser's lookahead stays
//! valid across refills. End of input is signalled by filling the remaining
//! slots with `InputEnd` tokens.
//!
//! The lexer never surfaces diagnostics itself: malformed lexemes become
//! `Error` tokens (with the specific kind recorded for the parser to pick
//! up), and the parser reports them.

use crate::frontend::ast::Span;
use crate::frontend::diagnostics::ErrorKind;
use crate::frontend::token::{symbol_1, symbol_2, symbol_3, Token, TokenKind, KEYWORDS};
use crate::support::Interner;

/// Capacity of the token ring buffer shared with the parser.
pub const TOKEN_BUFFER_SIZE: usize = 256;
/// Number of slots kept valid for lookahead after any refill.
pub const TOKEN_LOOKAHEAD: usize = 4;

fn is_number(c: u8) -> bool {
    c.is_ascii_digit()
}

fn is_letter(c: u8) -> bool {
    c.is_ascii_alphabetic()
}

fn is_ident_start(c: u8) -> bool {
    c == b'_' || is_letter(c)
}

fn is_ident_middle(c: u8) -> bool {
    c == b'_' || is_letter(c) || is_number(c)
}

/// Lexeme class selected by the first byte.
enum Lexeme {
    Char,
    Str,
    Number,
    Ident,
    Symbol,
}

fn classify(c: u8) -> Lexeme {
    match c {
        b'\'' => Lexeme::Char,
        b'"' => Lexeme::Str,
        _ if is_number(c) => Lexeme::Number,
        _ if is_ident_start(c) => Lexeme::Ident,
        _ => Lexeme::Symbol,
    }
}

pub struct Lexer<'src, 'i> {
    source: &'src [u8],
    cursor: usize,
    started: bool,
    interner: &'i mut Interner,
    line_spans: Vec<Span>,
    /// Specific kinds behind `Error` tokens, for the parser to surface.
    errors: Vec<(Span, ErrorKind)>,
}

impl<'src, 'i> Lexer<'src, 'i> {
    pub fn new(source: &'src str, interner: &'i mut Interner) -> Self {
        Self {
            source: source.as_bytes(),
            cursor: 0,
            started: false,
            interner,
            line_spans: vec![Span::new(0, 0)],
            errors: Vec::new(),
        }
    }

    /// Per-module line table; complete once `InputEnd` has been produced.
    pub fn take_line_spans(&mut self) -> Vec<Span> {
        std::mem::take(&mut self.line_spans)
    }

    /// Intern a name on behalf of the parser (used for the implicit `self`
    /// parameter, which has no identifier token).
    pub fn intern(&mut self, text: &str) -> crate::support::NameId {
        self.interner.intern(text)
    }

    /// Look up the specific error kind recorded for an `Error` token.
    pub fn error_kind_at(&self, span: Span) -> Option<ErrorKind> {
        self.errors
            .iter()
            .find(|(error_span, _)| error_span.start == span.start)
            .map(|&(_, kind)| kind)
    }

    /// Fill the ring buffer. On refills the last [`TOKEN_LOOKAHEAD`] tokens
    /// are copied to the front first, so buffer positions `0..LOOKAHEAD`
    /// continue the stream the parser was looking at.
    pub fn fill_token_buffer(&mut self, tokens: &mut [Token; TOKEN_BUFFER_SIZE]) {
        let copy_count = if self.started { TOKEN_LOOKAHEAD } else { 0 };
        self.started = true;

        for k in 0..copy_count {
            tokens[k] = tokens[TOKEN_BUFFER_SIZE - TOKEN_LOOKAHEAD + k];
        }

        for k in copy_count..TOKEN_BUFFER_SIZE {
            self.skip_whitespace();

            if self.peek(0).is_none() {
                if let Some(last) = self.line_spans.last_mut() {
                    if last.end < self.cursor {
                        last.end = self.cursor;
                    }
                }
                let end = Span::new(self.cursor, self.cursor);
                for slot in tokens.iter_mut().skip(k) {
                    *slot = Token::new(TokenKind::InputEnd, end);
                }
                return;
            }

            tokens[k] = self.lex_token();
        }
    }

    fn lex_token(&mut self) -> Token {
        let start = self.cursor;
        let kind = match classify(self.source[self.cursor]) {
            Lexeme::Char => self.lex_char(),
            Lexeme::Str => self.lex_string(),
            Lexeme::Number => self.lex_number(),
            Lexeme::Ident => self.lex_ident(),
            Lexeme::Symbol => self.lex_symbol(),
        };
        Token::new(kind, Span::new(start, self.cursor))
    }

    fn lex_char(&mut self) -> TokenKind {
        self.consume();

        let c = match self.peek(0) {
            Some(c) => c,
            None => return TokenKind::Error,
        };
        let value = match c {
            b'\\' => {
                self.consume();
                let esc = match self.peek(0) {
                    Some(esc) => esc,
                    None => return TokenKind::Error,
                };
                let value = match esc {
                    b't' => b'\t',
                    b'r' => b'\r',
                    b'n' => b'\n',
                    b'0' => 0,
                    b'\\' => b'\\',
                    b'\'' => b'\'',
                    _ => return TokenKind::Error,
                };
                self.consume();
                value
            }
            b'\'' => return TokenKind::Error,
            _ => {
                self.consume();
                c
            }
        };

        if self.peek(0) != Some(b'\'') {
            return TokenKind::Error;
        }
        self.consume();

        // Char literals are represented as integer literals of the code point.
        TokenKind::IntLit(value as u64)
    }

    fn lex_string(&mut self) -> TokenKind {
        self.consume();
        let mut value = String::new();

        loop {
            let c = match self.peek(0) {
                Some(c) => c,
                None => return TokenKind::Error,
            };
            match c {
                b'\\' => {
                    self.consume();
                    let esc = match self.peek(0) {
                        Some(esc) => esc,
                        None => return TokenKind::Error,
                    };
                    match esc {
                        b't' => value.push('\t'),
                        b'r' => value.push('\r'),
                        b'n' => value.push('\n'),
                        b'0' => value.push('\0'),
                        b'\\' => value.push('\\'),
                        b'"' => value.push('"'),
                        _ => return TokenKind::Error,
                    }
                    self.consume();
                }
                b'"' => break,
                b'\n' => return TokenKind::Error,
                _ => {
                    value.push(c as char);
                    self.consume();
                }
            }
        }
        self.consume();

        TokenKind::StrLit(self.interner.intern(&value))
    }

    fn lex_number(&mut self) -> TokenKind {
        let start = self.cursor;

        // Measure the lexeme first so float parsing sees a terminated slice.
        let mut offset = 0;
        let mut is_float = false;
        while let Some(c) = self.peek(offset) {
            if !is_float && c == b'.' {
                is_float = true;
            } else if !is_number(c) {
                break;
            }
            offset += 1;
        }

        if is_float {
            for _ in 0..offset {
                self.consume();
            }
            let text = match std::str::from_utf8(&self.source[start..start + offset]) {
                Ok(text) => text,
                Err(_) => return TokenKind::Error,
            };
            match text.parse::<f64>() {
                Ok(value) => TokenKind::FloatLit(value),
                Err(_) => TokenKind::Error,
            }
        } else {
            let mut integer: u64 = 0;
            let mut overflowed = false;
            for _ in 0..offset {
                let digit = (self.source[self.cursor] - b'0') as u64;
                integer = match integer.checked_mul(10).and_then(|v| v.checked_add(digit)) {
                    Some(value) => value,
                    None => {
                        overflowed = true;
                        0
                    }
                };
                self.consume();
            }
            if overflowed {
                self.errors
                    .push((Span::new(start, self.cursor), ErrorKind::LexIntegerOverflow));
                return TokenKind::Error;
            }
            TokenKind::IntLit(integer)
        }
    }

    fn lex_ident(&mut self) -> TokenKind {
        let start = self.cursor;
        self.consume();
        while self.peek(0).is_some_and(is_ident_middle) {
            self.consume();
        }

        let text = match std::str::from_utf8(&self.source[start..self.cursor]) {
            Ok(text) => text,
            Err(_) => return TokenKind::Error,
        };

        // `true` / `false` map straight to bool-literal tokens.
        if let Some(&keyword) = KEYWORDS.get(text) {
            return keyword;
        }
        TokenKind::Ident(self.interner.intern(text))
    }

    /// Three-level maximal munch over the symbol tables.
    fn lex_symbol(&mut self) -> TokenKind {
        let first = self.source[self.cursor];
        self.consume();
        let mut kind = match symbol_1(first) {
            Some(kind) => kind,
            None => return TokenKind::Error,
        };

        let Some(second) = self.peek(0) else { return kind };
        match symbol_2(kind, second) {
            Some(extended) => {
                kind = extended;
                self.consume();
            }
            None => return kind,
        }

        let Some(third) = self.peek(0) else { return kind };
        if let Some(extended) = symbol_3(kind, third) {
            kind = extended;
            self.consume();
        }
        kind
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek(0) {
            if c == b' ' || c == b'\t' || c == b'\r' || c == b'\n' {
                if c == b'\n' {
                    self.new_line();
                }
                self.consume();
            } else if c == b'/' && self.peek(1) == Some(b'/') {
                self.consume();
                self.consume();
                while let Some(c) = self.peek(0) {
                    if c == b'\n' {
                        break;
                    }
                    self.consume();
                }
            } else if c == b'/' && self.peek(1) == Some(b'*') {
                self.consume();
                self.consume();
                let mut depth = 1u32;
                while depth != 0 {
                    let Some(c) = self.peek(0) else { break };
                    if c == b'\n' {
                        self.new_line();
                    }
                    self.consume();

                    if c == b'/' && self.peek(0) == Some(b'*') {
                        self.consume();
                        depth += 1;
                    } else if c == b'*' && self.peek(0) == Some(b'/') {
                        self.consume();
                        depth -= 1;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn new_line(&mut self) {
        if let Some(last) = self.line_spans.last_mut() {
            last.end = self.cursor;
        }
        self.line_spans.push(Span::new(self.cursor + 1, self.cursor + 1));
    }

    fn consume(&mut self) {
        self.cursor += 1;
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.source.get(self.cursor + offset).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::token::BasicType;

    fn lex_short(source: &str) -> Vec<TokenKind> {
        // For inputs under the buffer size a single fill is enough.
        let mut interner = Interner::new();
        let mut lexer = Lexer::new(source, &mut interner);
        let mut tokens = [Token::input_end(); TOKEN_BUFFER_SIZE];
        lexer.fill_token_buffer(&mut tokens);
        tokens
            .iter()
            .take_while(|token| token.kind != TokenKind::InputEnd)
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn keywords_and_idents() {
        let kinds = lex_short("struct foo enum bar impl");
        assert_eq!(kinds.len(), 5);
        assert_eq!(kinds[0], TokenKind::KwStruct);
        assert!(matches!(kinds[1], TokenKind::Ident(_)));
        assert_eq!(kinds[2], TokenKind::KwEnum);
        assert!(matches!(kinds[3], TokenKind::Ident(_)));
        assert_eq!(kinds[4], TokenKind::KwImpl);
    }

    #[test]
    fn basic_type_keywords() {
        let kinds = lex_short("i32 u64 f32 bool string");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Basic(BasicType::I32),
                TokenKind::Basic(BasicType::U64),
                TokenKind::Basic(BasicType::F32),
                TokenKind::Basic(BasicType::Bool),
                TokenKind::Basic(BasicType::String),
            ]
        );
    }

    #[test]
    fn bool_literals_rewrite() {
        let kinds = lex_short("true false");
        assert_eq!(kinds, vec![TokenKind::BoolLit(true), TokenKind::BoolLit(false)]);
    }

    #[test]
    fn symbol_maximal_munch() {
        let kinds = lex_short("= == <<= << -> - >= >> >>=");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Assign,
                TokenKind::IsEquals,
                TokenKind::ShiftLeftEquals,
                TokenKind::ShiftLeft,
                TokenKind::Arrow,
                TokenKind::Minus,
                TokenKind::GreaterEquals,
                TokenKind::ShiftRight,
                TokenKind::ShiftRightEquals,
            ]
        );
    }

    #[test]
    fn adjacent_symbols_do_not_overmerge() {
        let kinds = lex_short("::: .. .");
        assert_eq!(
            kinds,
            vec![TokenKind::ColonColon, TokenKind::Colon, TokenKind::DotDot, TokenKind::Dot]
        );
    }

    #[test]
    fn integer_literals() {
        let kinds = lex_short("0 42 18446744073709551615");
        assert_eq!(
            kinds,
            vec![TokenKind::IntLit(0), TokenKind::IntLit(42), TokenKind::IntLit(u64::MAX)]
        );
    }

    #[test]
    fn integer_literal_at_2_pow_63() {
        let kinds = lex_short("9223372036854775808");
        assert_eq!(kinds, vec![TokenKind::IntLit(1u64 << 63)]);
    }

    #[test]
    fn integer_overflow_is_rejected() {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new("18446744073709551616", &mut interner);
        let mut tokens = [Token::input_end(); TOKEN_BUFFER_SIZE];
        lexer.fill_token_buffer(&mut tokens);
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(
            lexer.error_kind_at(tokens[0].span),
            Some(ErrorKind::LexIntegerOverflow)
        );
    }

    #[test]
    fn float_literals() {
        let kinds = lex_short("3.14 1. 0.5");
        assert!(matches!(kinds[0], TokenKind::FloatLit(f) if (f - 3.14).abs() < 1e-9));
        assert!(matches!(kinds[1], TokenKind::FloatLit(f) if f == 1.0));
        assert!(matches!(kinds[2], TokenKind::FloatLit(f) if f == 0.5));
    }

    #[test]
    fn second_dot_ends_the_float() {
        let kinds = lex_short("1.2.3");
        assert!(matches!(kinds[0], TokenKind::FloatLit(f) if (f - 1.2).abs() < 1e-9));
        assert_eq!(kinds[1], TokenKind::Dot);
        assert_eq!(kinds[2], TokenKind::IntLit(3));
    }

    #[test]
    fn char_literals_become_integers() {
        let kinds = lex_short(r"'a' '\n' '\0' '\\'");
        assert_eq!(
            kinds,
            vec![
                TokenKind::IntLit(b'a' as u64),
                TokenKind::IntLit(b'\n' as u64),
                TokenKind::IntLit(0),
                TokenKind::IntLit(b'\\' as u64),
            ]
        );
    }

    #[test]
    fn string_literals_intern_with_escapes() {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new(r#""hello\n" "hello\n""#, &mut interner);
        let mut tokens = [Token::input_end(); TOKEN_BUFFER_SIZE];
        lexer.fill_token_buffer(&mut tokens);
        let (first, second) = match (tokens[0].kind, tokens[1].kind) {
            (TokenKind::StrLit(a), TokenKind::StrLit(b)) => (a, b),
            other => panic!("expected two string literals, got {:?}", other),
        };
        assert_eq!(first, second);
        assert_eq!(interner.get(first), "hello\n");
    }

    #[test]
    fn unterminated_string_on_newline_is_error() {
        let kinds = lex_short("\"abc\ndef");
        assert_eq!(kinds[0], TokenKind::Error);
    }

    #[test]
    fn nested_block_comment_returns_to_code_once() {
        let kinds = lex_short("1 /* outer /* inner */ still comment */ 2");
        assert_eq!(kinds, vec![TokenKind::IntLit(1), TokenKind::IntLit(2)]);
    }

    #[test]
    fn line_comment_runs_to_newline() {
        let kinds = lex_short("1 // comment ; tokens\n2");
        assert_eq!(kinds, vec![TokenKind::IntLit(1), TokenKind::IntLit(2)]);
    }

    #[test]
    fn high_bytes_are_error_tokens() {
        let source = String::from_utf8(vec![b'a', b' ', 0xC3, 0xA9]).unwrap();
        let kinds = lex_short(&source);
        assert!(matches!(kinds[0], TokenKind::Ident(_)));
        assert_eq!(kinds[1], TokenKind::Error);
    }

    #[test]
    fn line_spans_track_newlines() {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new("ab\ncd\ne", &mut interner);
        let mut tokens = [Token::input_end(); TOKEN_BUFFER_SIZE];
        lexer.fill_token_buffer(&mut tokens);
        let spans = lexer.take_line_spans();
        assert_eq!(spans, vec![Span::new(0, 2), Span::new(3, 5), Span::new(6, 7)]);
    }

    #[test]
    fn input_end_fills_remaining_slots() {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new("x", &mut interner);
        let mut tokens = [Token::input_end(); TOKEN_BUFFER_SIZE];
        lexer.fill_token_buffer(&mut tokens);
        assert!(matches!(tokens[0].kind, TokenKind::Ident(_)));
        assert!(tokens[1..].iter().all(|token| token.kind == TokenKind::InputEnd));
    }

    #[test]
    fn refill_preserves_lookahead_window() {
        let source = "x ".repeat(TOKEN_BUFFER_SIZE * 2);
        let mut interner = Interner::new();
        let mut lexer = Lexer::new(&source, &mut interner);
        let mut tokens = [Token::input_end(); TOKEN_BUFFER_SIZE];

        lexer.fill_token_buffer(&mut tokens);
        let window: Vec<Token> = tokens[TOKEN_BUFFER_SIZE - TOKEN_LOOKAHEAD..].to_vec();
        lexer.fill_token_buffer(&mut tokens);
        assert_eq!(&tokens[..TOKEN_LOOKAHEAD], window.as_slice());
        // And the stream continues where the window left off.
        assert_eq!(
            tokens[TOKEN_LOOKAHEAD].span.start,
            window[TOKEN_LOOKAHEAD - 1].span.end + 1
        );
    }

    #[test]
    fn spans_are_byte_offsets() {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new("ab + cd", &mut interner);
        let mut tokens = [Token::input_end(); TOKEN_BUFFER_SIZE];
        lexer.fill_token_buffer(&mut tokens);
        assert_eq!(tokens[0].span, Span::new(0, 2));
        assert_eq!(tokens[1].span, Span::new(3, 4));
        assert_eq!(tokens[2].span, Span::new(5, 7));
    }
}
