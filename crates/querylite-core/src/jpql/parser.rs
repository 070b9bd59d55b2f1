//! Parser for JPQL-style query strings
//!
//! Grammar:
//!
//! ```text
//! select <alias> from <Entity> [as] <alias>
//!     [where <condition>]
//!     [order by <alias.field> [asc|desc] [nulls first|last], ...]
//!     [limit <n>] [offset <n>]
//! ```

use super::ast::*;
use super::lexer::{Lexer, LexerError, Token};
use crate::expr::{CompareOp, Direction, NullOrdering};
use crate::value::Value;
use thiserror::Error as ThisError;

/// Nesting limit for parentheses and `not`. Runs of `and`/`or` are flat
/// and do not count.
const MAX_DEPTH: usize = 64;

/// Recursive descent parser over a tokenized query string.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
}

impl Parser {
    /// Tokenizes `input`; lexer errors are reported here.
    pub fn new(input: &str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
            depth: 0,
        })
    }

    /// Parse the whole input as one statement
    pub fn parse(&mut self) -> Result<Statement, ParseError> {
        self.expect_token(Token::Select)?;
        let projection = self.expect_identifier("alias")?;

        self.expect_token(Token::From)?;
        let entity = self.expect_identifier("entity name")?;
        if self.current_token() == &Token::As {
            self.advance();
        }
        let alias = self.expect_identifier("alias")?;

        let condition = if self.current_token() == &Token::Where {
            self.advance();
            Some(self.parse_condition()?)
        } else {
            None
        };

        let order_by = self.parse_order_by()?;
        let (limit, offset) = self.parse_paging()?;

        self.expect_token(Token::Eof)?;

        Ok(Statement {
            projection,
            entity,
            alias,
            condition,
            order_by,
            limit,
            offset,
        })
    }

    fn parse_condition(&mut self) -> Result<Condition, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Condition, ParseError> {
        let mut operands = vec![self.parse_and()?];

        while self.current_token() == &Token::Or {
            self.advance();
            operands.push(self.parse_and()?);
        }

        Ok(collapse(operands, Condition::Or))
    }

    fn parse_and(&mut self) -> Result<Condition, ParseError> {
        let mut operands = vec![self.parse_not()?];

        while self.current_token() == &Token::And {
            self.advance();
            operands.push(self.parse_not()?);
        }

        Ok(collapse(operands, Condition::And))
    }

    fn parse_not(&mut self) -> Result<Condition, ParseError> {
        if self.current_token() == &Token::Not {
            self.advance();
            self.enter()?;
            let inner = self.parse_not();
            self.depth -= 1;
            return Ok(Condition::Not(Box::new(inner?)));
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Condition, ParseError> {
        if self.current_token() == &Token::LeftParen {
            self.advance();
            self.enter()?;
            let inner = self.parse_condition();
            self.depth -= 1;
            let inner = inner?;
            self.expect_token(Token::RightParen)?;
            return Ok(inner);
        }

        if let Token::Boolean(value) = *self.current_token() {
            self.advance();
            return Ok(Condition::Constant(value));
        }

        let left = self.parse_path()?;

        if self.current_token() == &Token::Is {
            self.advance();
            let negated = if self.current_token() == &Token::Not {
                self.advance();
                true
            } else {
                false
            };
            self.expect_token(Token::Null)?;
            return Ok(Condition::IsNull {
                path: left,
                negated,
            });
        }

        let op = match self.current_token() {
            Token::Eq => CompareOp::Eq,
            Token::Ne => CompareOp::Ne,
            Token::Lt => CompareOp::Lt,
            Token::Le => CompareOp::Lte,
            Token::Gt => CompareOp::Gt,
            Token::Ge => CompareOp::Gte,
            found => {
                return Err(ParseError::UnexpectedToken {
                    expected: "comparison operator or is".to_string(),
                    found: found.clone(),
                })
            }
        };
        self.advance();

        let right = self.parse_operand()?;
        Ok(Condition::Compare { left, op, right })
    }

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        let operand = match self.current_token().clone() {
            Token::Identifier(text) => Operand::Path(split_path(&text)?),
            Token::Parameter(name) => Operand::Parameter(name),
            Token::Integer(i) => Operand::Literal(Value::Integer(i)),
            Token::Float(f) => Operand::Literal(Value::Float(f)),
            Token::String(s) => Operand::Literal(Value::String(s)),
            Token::Boolean(b) => Operand::Literal(Value::Boolean(b)),
            Token::Null => Operand::Literal(Value::Null),
            found => {
                return Err(ParseError::UnexpectedToken {
                    expected: "value, path or parameter".to_string(),
                    found,
                })
            }
        };
        self.advance();
        Ok(operand)
    }

    fn parse_path(&mut self) -> Result<Path, ParseError> {
        match self.current_token().clone() {
            Token::Identifier(text) => {
                let path = split_path(&text)?;
                self.advance();
                Ok(path)
            }
            found => Err(ParseError::UnexpectedToken {
                expected: "alias.field".to_string(),
                found,
            }),
        }
    }

    fn parse_order_by(&mut self) -> Result<Vec<OrderItem>, ParseError> {
        let mut items = Vec::new();
        if self.current_token() != &Token::OrderBy {
            return Ok(items);
        }
        self.advance();

        loop {
            let path = self.parse_path()?;

            let direction = match self.current_token() {
                Token::Desc => {
                    self.advance();
                    Direction::Desc
                }
                Token::Asc => {
                    self.advance();
                    Direction::Asc
                }
                _ => Direction::Asc,
            };

            let nulls = if self.current_token() == &Token::Nulls {
                self.advance();
                let nulls = match self.current_token() {
                    Token::First => NullOrdering::First,
                    Token::Last => NullOrdering::Last,
                    found => {
                        return Err(ParseError::UnexpectedToken {
                            expected: "first or last".to_string(),
                            found: found.clone(),
                        })
                    }
                };
                self.advance();
                nulls
            } else {
                NullOrdering::default()
            };

            items.push(OrderItem {
                path,
                direction,
                nulls,
            });

            if self.current_token() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }

        Ok(items)
    }

    fn parse_paging(&mut self) -> Result<(Option<u64>, Option<u64>), ParseError> {
        let mut limit = None;
        let mut offset = None;

        if self.current_token() == &Token::Limit {
            self.advance();
            let n = self.expect_integer()?;
            limit = Some(u64::try_from(n).map_err(|_| ParseError::InvalidLimitValue(n))?);
        }

        if self.current_token() == &Token::Offset {
            self.advance();
            let n = self.expect_integer()?;
            offset = Some(u64::try_from(n).map_err(|_| ParseError::InvalidOffsetValue(n))?);
        }

        Ok((limit, offset))
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        Ok(())
    }

    fn current_token(&self) -> &Token {
        // tokenize always ends with Eof and advance never moves past it
        &self.tokens[self.position]
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn expect_token(&mut self, expected: Token) -> Result<(), ParseError> {
        if self.current_token() == &expected {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: self.current_token().clone(),
            })
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String, ParseError> {
        match self.current_token().clone() {
            Token::Identifier(name) if !name.contains('.') => {
                self.advance();
                Ok(name)
            }
            found => Err(ParseError::UnexpectedToken {
                expected: what.to_string(),
                found,
            }),
        }
    }

    fn expect_integer(&mut self) -> Result<i64, ParseError> {
        match self.current_token() {
            Token::Integer(n) => {
                let n = *n;
                self.advance();
                Ok(n)
            }
            found => Err(ParseError::UnexpectedToken {
                expected: "integer".to_string(),
                found: found.clone(),
            }),
        }
    }
}

/// A run of one operand is the operand itself.
fn collapse(mut operands: Vec<Condition>, run: fn(Vec<Condition>) -> Condition) -> Condition {
    if operands.len() == 1 {
        operands.remove(0)
    } else {
        run(operands)
    }
}

fn split_path(text: &str) -> Result<Path, ParseError> {
    match text.split_once('.') {
        Some((alias, field)) if !alias.is_empty() && !field.is_empty() && !field.contains('.') => {
            Ok(Path {
                alias: alias.to_string(),
                field: field.to_string(),
            })
        }
        _ => Err(ParseError::InvalidPath(text.to_string())),
    }
}

/// Parser errors
#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum ParseError {
    /// The text could not be tokenized
    #[error("lexer error: {0}")]
    Lexer(#[from] LexerError),
    /// Token out of place
    #[error("expected {expected}, found {found}")]
    UnexpectedToken {
        /// What the grammar allows here
        expected: String,
        /// What the input had
        found: Token,
    },
    /// Identifier that is not `alias.field`
    #[error("expected alias.field, found {0}")]
    InvalidPath(String),
    /// Negative `limit`
    #[error("invalid limit value: {0} (must be non-negative)")]
    InvalidLimitValue(i64),
    /// Negative `offset`
    #[error("invalid offset value: {0} (must be non-negative)")]
    InvalidOffsetValue(i64),
    /// Parentheses or `not` nested past the limit
    #[error("conditions nested deeper than {0} levels")]
    TooDeep(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<Statement, ParseError> {
        Parser::new(input)?.parse()
    }

    fn path(alias: &str, field: &str) -> Path {
        Path {
            alias: alias.to_string(),
            field: field.to_string(),
        }
    }

    #[test]
    fn test_simple_select() {
        let stmt = parse("select m from Member m").unwrap();
        assert_eq!(stmt.projection, "m");
        assert_eq!(stmt.entity, "Member");
        assert_eq!(stmt.alias, "m");
        assert!(stmt.condition.is_none());
        assert!(stmt.order_by.is_empty());
    }

    #[test]
    fn test_as_keyword() {
        let stmt = parse("SELECT m FROM Member AS m").unwrap();
        assert_eq!(stmt.alias, "m");
    }

    #[test]
    fn test_where_with_parameter() {
        let stmt = parse("select m from Member m where m.username = :username").unwrap();
        assert_eq!(
            stmt.condition,
            Some(Condition::Compare {
                left: path("m", "username"),
                op: CompareOp::Eq,
                right: Operand::Parameter("username".to_string()),
            })
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let stmt =
            parse("select m from Member m where m.age = 1 or m.age = 2 and m.username is null")
                .unwrap();
        match stmt.condition {
            Some(Condition::Or(operands)) => {
                assert_eq!(operands.len(), 2);
                assert!(matches!(operands[0], Condition::Compare { .. }));
                assert!(matches!(&operands[1], Condition::And(inner) if inner.len() == 2));
            }
            other => panic!("expected disjunction, got {:?}", other),
        }
    }

    #[test]
    fn test_not_and_parentheses() {
        let stmt = parse(
            "select m from Member m where not (m.age >= 10 and m.username is not null)",
        )
        .unwrap();
        match stmt.condition {
            Some(Condition::Not(inner)) => assert!(matches!(*inner, Condition::And(_))),
            other => panic!("expected negation, got {:?}", other),
        }
    }

    #[test]
    fn test_order_by_with_nulls() {
        let stmt = parse(
            "select m from Member m order by m.age desc, m.username asc nulls last, m.id",
        )
        .unwrap();
        assert_eq!(
            stmt.order_by,
            vec![
                OrderItem {
                    path: path("m", "age"),
                    direction: Direction::Desc,
                    nulls: NullOrdering::First,
                },
                OrderItem {
                    path: path("m", "username"),
                    direction: Direction::Asc,
                    nulls: NullOrdering::Last,
                },
                OrderItem {
                    path: path("m", "id"),
                    direction: Direction::Asc,
                    nulls: NullOrdering::First,
                },
            ]
        );
    }

    #[test]
    fn test_limit_offset() {
        let stmt = parse("select m from Member m limit 10 offset 5").unwrap();
        assert_eq!((stmt.limit, stmt.offset), (Some(10), Some(5)));

        assert_eq!(
            parse("select m from Member m limit -1"),
            Err(ParseError::InvalidLimitValue(-1))
        );
    }

    #[test]
    fn test_invalid_path() {
        assert_eq!(
            parse("select m from Member m where username = 'a'"),
            Err(ParseError::InvalidPath("username".to_string()))
        );
    }

    #[test]
    fn test_trailing_garbage() {
        assert!(matches!(
            parse("select m from Member m m"),
            Err(ParseError::UnexpectedToken {
                found: Token::Identifier(_),
                ..
            })
        ));
    }

    #[test]
    fn test_deep_nesting_rejected() {
        let query = format!(
            "select m from Member m where {}m.age = 1{}",
            "(".repeat(100),
            ")".repeat(100)
        );
        assert_eq!(parse(&query), Err(ParseError::TooDeep(MAX_DEPTH)));
    }

    #[test]
    fn test_long_and_run_is_flat() {
        let terms = vec!["m.age = 1"; 5_000].join(" and ");
        let stmt = parse(&format!("select m from Member m where {}", terms)).unwrap();
        match stmt.condition {
            Some(Condition::And(operands)) => {
                assert_eq!(operands.len(), 5_000);
                assert!(operands
                    .iter()
                    .all(|c| matches!(c, Condition::Compare { .. })));
            }
            other => panic!("expected conjunction, got {:?}", other),
        }

        let terms = vec!["m.age = 1 and m.age = 2"; 2_000].join(" or ");
        let stmt = parse(&format!("select m from Member m where {}", terms)).unwrap();
        assert!(matches!(stmt.condition, Some(Condition::Or(ref runs)) if runs.len() == 2_000));
    }

    #[test]
    fn test_boolean_constant_condition() {
        let stmt = parse("select m from Member m where true").unwrap();
        assert_eq!(stmt.condition, Some(Condition::Constant(true)));

        let stmt = parse("select m from Member m where m.age = 1 and (false)").unwrap();
        assert_eq!(
            stmt.condition,
            Some(Condition::And(vec![
                Condition::Compare {
                    left: path("m", "age"),
                    op: CompareOp::Eq,
                    right: Operand::Literal(Value::Integer(1)),
                },
                Condition::Constant(false),
            ]))
        );
    }

    #[test]
    fn test_lexer_error_is_wrapped() {
        assert!(matches!(
            parse("select m from Member m where m.username = 'open"),
            Err(ParseError::Lexer(LexerError::UnterminatedString { .. }))
        ));
    }
}
