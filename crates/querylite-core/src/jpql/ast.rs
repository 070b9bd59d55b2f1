//! Syntax tree of a parsed query string, before names are resolved
//! against a schema.

use crate::expr::{CompareOp, Direction, NullOrdering};
use crate::value::Value;

/// One `select` statement
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Alias named in the select list
    pub projection: String,
    /// Entity named after `from`
    pub entity: String,
    /// Alias bound to the entity
    pub alias: String,
    /// `where` clause
    pub condition: Option<Condition>,
    /// `order by` keys, primary first
    pub order_by: Vec<OrderItem>,
    /// `limit` value
    pub limit: Option<u64>,
    /// `offset` value
    pub offset: Option<u64>,
}

/// `alias.field`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    /// Alias before the dot
    pub alias: String,
    /// Field name after the dot
    pub field: String,
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Another field
    Path(Path),
    /// Literal value
    Literal(Value),
    /// `:name`, without the colon
    Parameter(String),
}

/// A `where` condition
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `path op operand`
    Compare {
        /// Left-hand field
        left: Path,
        /// Operator
        op: CompareOp,
        /// Right-hand side
        right: Operand,
    },
    /// `path is [not] null`
    IsNull {
        /// Tested field
        path: Path,
        /// Set for `is not null`
        negated: bool,
    },
    /// Operands of one `and` run, in source order
    And(Vec<Condition>),
    /// Operands of one `or` run, in source order
    Or(Vec<Condition>),
    /// `not (condition)`
    Not(Box<Condition>),
    /// `true` or `false` standing alone as a condition
    Constant(bool),
}

/// One `order by` key
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    /// Sorted field
    pub path: Path,
    /// `asc` unless `desc` is given
    pub direction: Direction,
    /// `nulls first` unless `nulls last` is given
    pub nulls: NullOrdering,
}
