//! Row-level predicate evaluation and sort comparison.
//!
//! Stores that hold rows in memory can use these directly instead of
//! translating the query into another language.

use crate::expr::{CompareOp, Direction, Expr, NullOrdering, Operand, Order};
use crate::value::{Row, Value};
use std::cmp::Ordering;

const NULL: &Value = &Value::Null;

impl Expr {
    /// Three-valued evaluation against a row.
    ///
    /// `None` is SQL "unknown": any comparison touching a null, comparisons
    /// between incompatible types, and unbound parameters.
    pub fn evaluate(&self, row: &Row) -> Option<bool> {
        match self {
            Expr::Compare { field, op, operand } => {
                let left = row.value(field.name()).unwrap_or(NULL);
                let right = match operand {
                    Operand::Value(value) => value,
                    Operand::Field(other) => row.value(other.name()).unwrap_or(NULL),
                    Operand::Parameter(_) => return None,
                };
                compare(left, *op, right)
            }
            Expr::IsNull { field, negated } => {
                let is_null = row.value(field.name()).map_or(true, Value::is_null);
                Some(is_null != *negated)
            }
            Expr::And(children) => {
                let mut result = Some(true);
                for child in children {
                    match child.evaluate(row) {
                        Some(false) => return Some(false),
                        None => result = None,
                        Some(true) => {}
                    }
                }
                result
            }
            Expr::Or(children) => {
                let mut result = Some(false);
                for child in children {
                    match child.evaluate(row) {
                        Some(true) => return Some(true),
                        None => result = None,
                        Some(false) => {}
                    }
                }
                result
            }
            Expr::Not(inner) => inner.evaluate(row).map(|b| !b),
        }
    }

    /// True only when the predicate definitely holds for the row.
    pub fn matches(&self, row: &Row) -> bool {
        self.evaluate(row) == Some(true)
    }
}

fn compare(left: &Value, op: CompareOp, right: &Value) -> Option<bool> {
    if left.is_null() || right.is_null() {
        return None;
    }
    left.partial_compare(right).map(|ordering| op.accepts(ordering))
}

/// Multi-key comparison of two rows.
///
/// Keys are applied in order and later keys only break ties of earlier ones.
/// Null placement follows each key's flag regardless of direction.
pub fn compare_rows(a: &Row, b: &Row, orders: &[Order]) -> Ordering {
    for order in orders {
        let left = a.value(order.field.name()).unwrap_or(NULL);
        let right = b.value(order.field.name()).unwrap_or(NULL);

        let ordering = match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => nulls_side(order.nulls),
            (false, true) => nulls_side(order.nulls).reverse(),
            (false, false) => {
                let ordering = left.sort_compare(right);
                match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            }
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn nulls_side(nulls: NullOrdering) -> Ordering {
    match nulls {
        NullOrdering::First => Ordering::Less,
        NullOrdering::Last => Ordering::Greater,
    }
}

/// Stable sort of `rows` by `orders`.
pub fn sort_rows(rows: &mut [Row], orders: &[Order]) {
    if !orders.is_empty() {
        rows.sort_by(|a, b| compare_rows(a, b, orders));
    }
}
