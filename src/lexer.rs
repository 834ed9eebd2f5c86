use crate::ast::Token;
use chrono::NaiveDate;
use thiserror::Error;

/// A lexical error: an unknown character, a bad escape, an unterminated
/// string or an impossible date.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} on line {line}")]
pub struct LexError {
    pub message: String,
    pub line: usize,
}

/// Converts program text into tokens on demand.
///
/// Newlines are tokens (they terminate statements) and the lexer counts
/// them, so [`Lexer::line`] is always the line of the last token returned.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
        }
    }

    /// 1-based line of the current position.
    pub fn line(&self) -> usize {
        self.line
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            line: self.line,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch != '\n' && ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_comment(&mut self) -> String {
        self.position += 2; // Consume "//"
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch == '\n' {
                break;
            }
            result.push(ch);
            self.advance();
        }
        result
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let mut result = String::new();
        self.advance(); // Consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    self.advance(); // Consume backslash
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some('"') => result.push('"'),
                        Some('\'') => result.push('\''),
                        Some('\\') => result.push('\\'),
                        Some(ch) => return Err(self.error(format!("Invalid escape sequence: \\{ch}"))),
                        None => return Err(self.error("Unterminated string: unexpected end after backslash")),
                    }
                    self.advance();
                }
                '\n' => {
                    result.push(ch);
                    self.line += 1;
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(self.error("Unterminated string: missing closing quote"))
    }

    fn digits_at(&self, from: usize) -> usize {
        self.input[from.min(self.input.len())..]
            .iter()
            .take_while(|c| c.is_ascii_digit())
            .count()
    }

    /// Length of a `d/m/yyyy` literal starting at the current position, if
    /// there is one.
    fn date_length(&self) -> Option<usize> {
        let start = self.position;
        let day = self.digits_at(start);
        if !(1..=2).contains(&day) || self.input.get(start + day) != Some(&'/') {
            return None;
        }
        let month_at = start + day + 1;
        let month = self.digits_at(month_at);
        if !(1..=2).contains(&month) || self.input.get(month_at + month) != Some(&'/') {
            return None;
        }
        let year_at = month_at + month + 1;
        if self.digits_at(year_at) != 4 {
            return None;
        }
        Some(year_at + 4 - start)
    }

    fn read_date(&mut self, length: usize) -> Result<Token, LexError> {
        let text: String = self.input[self.position..self.position + length].iter().collect();
        self.position += length;

        let mut parts = text.split('/').map(|p| p.parse::<u32>().unwrap_or(0));
        let (day, month, year) = (
            parts.next().unwrap_or(0),
            parts.next().unwrap_or(0),
            parts.next().unwrap_or(0),
        );
        NaiveDate::from_ymd_opt(year as i32, month, day)
            .map(Token::Date)
            .ok_or_else(|| self.error(format!("Invalid date literal: {text}")))
    }

    fn read_number(&mut self) -> Token {
        let mut number = String::new();
        let mut is_double = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_double
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_double = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if !is_double && let Ok(n) = number.parse::<i64>() {
            return Token::Integer(n);
        }
        // Digits only, so this can only fail on absurd lengths
        Token::Double(number.parse::<f64>().unwrap_or(f64::INFINITY))
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    fn double(&mut self, token: Token) -> Token {
        self.position += 2;
        token
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        let Some(ch) = self.current_char() else {
            return Ok(Token::Eof);
        };
        let next = self.peek_char(1);

        let token = match ch {
            '\n' => {
                self.advance();
                self.line += 1;
                Token::Newline
            }
            ';' => self.single(Token::Semicolon),
            '/' if next == Some('/') => Token::Comment(self.read_comment()),
            '^' => self.single(Token::Caret),
            '*' => self.single(Token::Star),
            '/' => self.single(Token::Slash),
            '%' => self.single(Token::Percent),
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '<' if next == Some('<') => self.double(Token::ShiftLeft),
            '<' if next == Some('=') => self.double(Token::LtEq),
            '<' => self.single(Token::Lt),
            '>' if next == Some('>') => self.double(Token::ShiftRight),
            '>' if next == Some('=') => self.double(Token::GtEq),
            '>' => self.single(Token::Gt),
            '=' if next == Some('=') => self.double(Token::EqEq),
            '=' => self.single(Token::Equals),
            '!' if next == Some('=') => self.double(Token::NotEq),
            '!' => self.single(Token::Bang),
            '&' => self.single(Token::Ampersand),
            '|' => self.single(Token::Pipe),
            '~' => self.single(Token::Tilde),
            '(' => self.single(Token::LParen),
            ')' => self.single(Token::RParen),
            '{' => self.single(Token::LBrace),
            '}' => self.single(Token::RBrace),
            '.' => self.single(Token::Dot),
            ',' => self.single(Token::Comma),
            ':' => self.single(Token::Colon),
            '"' | '\'' => Token::String(self.read_string(ch)?),
            c if c.is_ascii_digit() => match self.date_length() {
                Some(length) => self.read_date(length)?,
                None => self.read_number(),
            },
            c if c.is_alphabetic() || c == '_' => {
                let ident = self.read_identifier();

                match ident.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "xor" => Token::Xor,
                    "not" => Token::Not,
                    "let" => Token::Let,
                    "if" => Token::If,
                    "else" => Token::Else,
                    "while" => Token::While,
                    "empty" => Token::Empty,
                    "true" => Token::Boolean(true),
                    "false" => Token::Boolean(false),
                    _ => Token::Identifier(ident),
                }
            }
            c => return Err(self.error(format!("Unexpected character '{c}'"))),
        };
        Ok(token)
    }

    /// Lexes the whole input, up to and including [`Token::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }
}

/// True when `text` lexes as exactly one identifier.
pub fn is_identifier(text: &str) -> bool {
    let mut lexer = Lexer::new(text);
    matches!(lexer.next_token(), Ok(Token::Identifier(_))) && matches!(lexer.next_token(), Ok(Token::Eof))
}

#[test]
fn test_keywords() {
    let mut lexer = Lexer::new("and or xor not let empty true false");
    assert_eq!(lexer.next_token(), Ok(Token::And));
    assert_eq!(lexer.next_token(), Ok(Token::Or));
    assert_eq!(lexer.next_token(), Ok(Token::Xor));
    assert_eq!(lexer.next_token(), Ok(Token::Not));
    assert_eq!(lexer.next_token(), Ok(Token::Let));
    assert_eq!(lexer.next_token(), Ok(Token::Empty));
    assert_eq!(lexer.next_token(), Ok(Token::Boolean(true)));
    assert_eq!(lexer.next_token(), Ok(Token::Boolean(false)));
    assert_eq!(lexer.next_token(), Ok(Token::Eof));
}

#[test]
fn test_sheet_names() {
    assert!(is_identifier("Summary"));
    assert!(is_identifier("Sheet_2"));
    assert!(!is_identifier("My Sheet"));
    assert!(!is_identifier("2024"));
    assert!(!is_identifier("if"));
}
