//! Lexer for JPQL-style query strings
//!
//! Keywords are case-insensitive. Dotted paths such as `m.username` come
//! out as a single identifier token.

use std::fmt;
use thiserror::Error as ThisError;

/// Token types produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    /// `select`
    Select,
    /// `from`
    From,
    /// `where`
    Where,
    /// `as`
    As,
    /// `and`
    And,
    /// `or`
    Or,
    /// `not`
    Not,
    /// `is`
    Is,
    /// `order by`
    OrderBy,
    /// `asc`
    Asc,
    /// `desc`
    Desc,
    /// `nulls`
    Nulls,
    /// `first`
    First,
    /// `last`
    Last,
    /// `limit`
    Limit,
    /// `offset`
    Offset,

    // Operators
    /// `=`
    Eq,
    /// `<>` or `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,

    // Literals
    /// Integer literal, sign included
    Integer(i64),
    /// Float literal, including `nan` and `infinity`
    Float(f64),
    /// Quoted string with quotes removed
    String(String),
    /// `true` or `false`
    Boolean(bool),
    /// `null`
    Null,

    /// Name or dotted path
    Identifier(String),
    /// Named parameter, without the leading colon
    Parameter(String),

    // Punctuation
    /// `,`
    Comma,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,

    /// End of input
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Select => write!(f, "select"),
            Token::From => write!(f, "from"),
            Token::Where => write!(f, "where"),
            Token::As => write!(f, "as"),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::Not => write!(f, "not"),
            Token::Is => write!(f, "is"),
            Token::OrderBy => write!(f, "order by"),
            Token::Asc => write!(f, "asc"),
            Token::Desc => write!(f, "desc"),
            Token::Nulls => write!(f, "nulls"),
            Token::First => write!(f, "first"),
            Token::Last => write!(f, "last"),
            Token::Limit => write!(f, "limit"),
            Token::Offset => write!(f, "offset"),
            Token::Eq => write!(f, "="),
            Token::Ne => write!(f, "<>"),
            Token::Lt => write!(f, "<"),
            Token::Le => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Ge => write!(f, ">="),
            Token::Integer(i) => write!(f, "{}", i),
            Token::Float(fl) => write!(f, "{}", crate::value::FloatLiteral(*fl)),
            Token::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Token::Boolean(b) => write!(f, "{}", b),
            Token::Null => write!(f, "null"),
            Token::Identifier(id) => write!(f, "{}", id),
            Token::Parameter(name) => write!(f, ":{}", name),
            Token::Comma => write!(f, ","),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

/// Lexer state
pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    /// Lexer over `input`, positioned at the start.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token, LexerError> {
        self.skip_whitespace();

        let Some(ch) = self.current_char() else {
            return Ok(Token::Eof);
        };

        match ch {
            ',' => return Ok(self.single(Token::Comma)),
            '(' => return Ok(self.single(Token::LeftParen)),
            ')' => return Ok(self.single(Token::RightParen)),
            '=' => return Ok(self.single(Token::Eq)),
            '<' => {
                self.advance();
                return Ok(match self.current_char() {
                    Some('=') => self.single(Token::Le),
                    Some('>') => self.single(Token::Ne),
                    _ => Token::Lt,
                });
            }
            '>' => {
                self.advance();
                if self.current_char() == Some('=') {
                    return Ok(self.single(Token::Ge));
                }
                return Ok(Token::Gt);
            }
            '!' => {
                self.advance();
                if self.current_char() == Some('=') {
                    return Ok(self.single(Token::Ne));
                }
                return Err(LexerError::UnexpectedCharacter {
                    ch,
                    position: self.position - 1,
                });
            }
            '\'' => return self.read_string(),
            ':' => return self.read_parameter(),
            '-' if self.peek_char().is_some_and(|c| c.is_ascii_digit()) => {
                return self.read_number();
            }
            '-' if self.peek_char().is_some_and(|c| c.is_alphabetic()) => {
                return self.read_negative_word();
            }
            _ => {}
        }

        if ch.is_ascii_digit() {
            return self.read_number();
        }

        if ch.is_alphabetic() || ch == '_' {
            return Ok(self.read_identifier_or_keyword());
        }

        Err(LexerError::UnexpectedCharacter {
            ch,
            position: self.position,
        })
    }

    /// Tokenize entire input; the last token is always [`Token::Eof`].
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexerError> {
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

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    fn skip_whitespace(&mut self) {
        while self.current_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn read_number(&mut self) -> Result<Token, LexerError> {
        let start = self.position;
        let mut is_float = false;

        if self.current_char() == Some('-') {
            self.advance();
        }

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                self.advance();
            } else if ch == '.' && !is_float && self.peek_char().is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                self.advance();
            } else {
                break;
            }
        }

        if self.exponent_follows() {
            is_float = true;
            self.advance();
            if matches!(self.current_char(), Some('+' | '-')) {
                self.advance();
            }
            while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let num_str: String = self.input[start..self.position].iter().collect();

        if is_float {
            num_str
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| LexerError::InvalidNumber(num_str))
        } else {
            num_str
                .parse::<i64>()
                .map(Token::Integer)
                .map_err(|_| LexerError::InvalidNumber(num_str))
        }
    }

    /// `e` or `E`, an optional sign, then at least one digit.
    fn exponent_follows(&self) -> bool {
        if !matches!(self.current_char(), Some('e' | 'E')) {
            return false;
        }
        let digit_at = |offset: usize| {
            self.input
                .get(self.position + offset)
                .is_some_and(|c| c.is_ascii_digit())
        };
        match self.input.get(self.position + 1).copied() {
            Some('+' | '-') => digit_at(2),
            _ => digit_at(1),
        }
    }

    /// `-infinity`; any other word after a bare minus is an error.
    fn read_negative_word(&mut self) -> Result<Token, LexerError> {
        let position = self.position;
        self.advance();
        let word = self.read_word(false);
        if word.eq_ignore_ascii_case("infinity") {
            return Ok(Token::Float(f64::NEG_INFINITY));
        }
        self.position = position;
        Err(LexerError::UnexpectedCharacter { ch: '-', position })
    }

    /// Reads a quoted string; a doubled quote stands for one quote.
    fn read_string(&mut self) -> Result<Token, LexerError> {
        let start = self.position;
        self.advance();
        let mut text = String::new();

        loop {
            match self.current_char() {
                None => return Err(LexerError::UnterminatedString { position: start }),
                Some('\'') if self.peek_char() == Some('\'') => {
                    text.push('\'');
                    self.advance();
                    self.advance();
                }
                Some('\'') => {
                    self.advance();
                    return Ok(Token::String(text));
                }
                Some(ch) => {
                    text.push(ch);
                    self.advance();
                }
            }
        }
    }

    fn read_parameter(&mut self) -> Result<Token, LexerError> {
        let start = self.position;
        self.advance();
        let name = self.read_word(false);
        if name.is_empty() {
            return Err(LexerError::EmptyParameter { position: start });
        }
        Ok(Token::Parameter(name))
    }

    fn read_word(&mut self, allow_dot: bool) -> String {
        let start = self.position;
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' || (allow_dot && ch == '.') {
                self.advance();
            } else {
                break;
            }
        }
        self.input[start..self.position].iter().collect()
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        let text = self.read_word(true);
        let lowercase = text.to_lowercase();

        // "order" is only a keyword when followed by "by"
        if lowercase == "order" {
            let rollback = self.position;
            self.skip_whitespace();
            if self.read_word(false).eq_ignore_ascii_case("by") {
                return Token::OrderBy;
            }
            self.position = rollback;
        }

        match lowercase.as_str() {
            "select" => Token::Select,
            "from" => Token::From,
            "where" => Token::Where,
            "as" => Token::As,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "is" => Token::Is,
            "asc" => Token::Asc,
            "desc" => Token::Desc,
            "nulls" => Token::Nulls,
            "first" => Token::First,
            "last" => Token::Last,
            "limit" => Token::Limit,
            "offset" => Token::Offset,
            "true" => Token::Boolean(true),
            "false" => Token::Boolean(false),
            "null" => Token::Null,
            "nan" => Token::Float(f64::NAN),
            "infinity" => Token::Float(f64::INFINITY),
            _ => Token::Identifier(text),
        }
    }
}

/// Lexer errors
#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum LexerError {
    /// Character that starts no token
    #[error("unexpected character '{ch}' at {position}")]
    UnexpectedCharacter {
        /// Offending character
        ch: char,
        /// Character offset
        position: usize,
    },
    /// Digits that do not fit the literal type
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    /// Quote never closed
    #[error("unterminated string starting at {position}")]
    UnterminatedString {
        /// Offset of the opening quote
        position: usize,
    },
    /// `:` not followed by a name
    #[error("parameter without a name at {position}")]
    EmptyParameter {
        /// Offset of the colon
        position: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input).tokenize().unwrap()
    }

    #[test]
    fn test_simple_select() {
        assert_eq!(
            tokens("select m from Member m"),
            vec![
                Token::Select,
                Token::Identifier("m".to_string()),
                Token::From,
                Token::Identifier("Member".to_string()),
                Token::Identifier("m".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_where_with_parameter() {
        let tokens = tokens("SELECT m FROM Member m WHERE m.username = :username");
        assert_eq!(tokens[4], Token::Where);
        assert_eq!(tokens[5], Token::Identifier("m.username".to_string()));
        assert_eq!(tokens[6], Token::Eq);
        assert_eq!(tokens[7], Token::Parameter("username".to_string()));
    }

    #[test]
    fn test_string_with_escaped_quote() {
        assert_eq!(
            tokens("'it''s'"),
            vec![Token::String("it's".to_string()), Token::Eof]
        );
    }

    #[test]
    fn test_order_by_and_nulls() {
        let tokens = tokens("order by m.age desc nulls last");
        assert_eq!(
            tokens,
            vec![
                Token::OrderBy,
                Token::Identifier("m.age".to_string()),
                Token::Desc,
                Token::Nulls,
                Token::Last,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_order_alone_is_identifier() {
        assert_eq!(
            tokens("order x"),
            vec![
                Token::Identifier("order".to_string()),
                Token::Identifier("x".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            tokens("= != <> < <= > >="),
            vec![
                Token::Eq,
                Token::Ne,
                Token::Ne,
                Token::Lt,
                Token::Le,
                Token::Gt,
                Token::Ge,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("42 3.5 -7"),
            vec![
                Token::Integer(42),
                Token::Float(3.5),
                Token::Integer(-7),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_exponent_and_special_floats() {
        assert_eq!(
            tokens("1e20 2.5E-3 -4e+2 7e"),
            vec![
                Token::Float(1e20),
                Token::Float(2.5e-3),
                Token::Float(-400.0),
                Token::Integer(7),
                Token::Identifier("e".to_string()),
                Token::Eof
            ]
        );

        let special = tokens("infinity -Infinity NaN m.nan");
        assert_eq!(special[0], Token::Float(f64::INFINITY));
        assert_eq!(special[1], Token::Float(f64::NEG_INFINITY));
        assert!(matches!(special[2], Token::Float(f) if f.is_nan()));
        assert_eq!(special[3], Token::Identifier("m.nan".to_string()));

        assert_eq!(
            Lexer::new("-x").tokenize(),
            Err(LexerError::UnexpectedCharacter { ch: '-', position: 0 })
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            Lexer::new("'open").tokenize(),
            Err(LexerError::UnterminatedString { position: 0 })
        );
        assert_eq!(
            Lexer::new("a ; b").tokenize(),
            Err(LexerError::UnexpectedCharacter {
                ch: ';',
                position: 2
            })
        );
        assert_eq!(
            Lexer::new(": x").tokenize(),
            Err(LexerError::EmptyParameter { position: 0 })
        );
    }
}
