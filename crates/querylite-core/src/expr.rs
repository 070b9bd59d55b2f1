//! Expression builder.
//!
//! Field constants produce comparison and ordering nodes; predicates combine
//! with `and` / `or` / `not`. Every node is immutable and children are held
//! behind `Arc`, so a predicate built once can be reused in any number of
//! queries without copying the tree.

use crate::schema::{Entity, Field, FieldType};
use crate::value::Value;
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Untyped reference to an entity field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    entity: Cow<'static, str>,
    name: Cow<'static, str>,
}

impl FieldRef {
    /// Reference to field `name` of entity `entity`.
    pub fn new(entity: impl Into<Cow<'static, str>>, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            entity: entity.into(),
            name: name.into(),
        }
    }

    /// Owning entity name.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
}

impl CompareOp {
    pub(crate) fn accepts(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            CompareOp::Eq => ordering == Equal,
            CompareOp::Ne => ordering != Equal,
            CompareOp::Lt => ordering == Less,
            CompareOp::Lte => ordering != Greater,
            CompareOp::Gt => ordering == Greater,
            CompareOp::Gte => ordering != Less,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "="),
            CompareOp::Ne => write!(f, "<>"),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Lte => write!(f, "<="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Gte => write!(f, ">="),
        }
    }
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Literal value
    Value(Value),
    /// Another field of the same row
    Field(FieldRef),
    /// Named parameter of a string query, replaced before execution
    Parameter(String),
}

/// Predicate tree node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Binary comparison; unknown when either side is null
    Compare {
        /// Left-hand side
        field: FieldRef,
        /// Operator
        op: CompareOp,
        /// Right-hand side
        operand: Operand,
    },
    /// Null test; never unknown
    IsNull {
        /// Tested field
        field: FieldRef,
        /// `is not null` when set
        negated: bool,
    },
    /// Conjunction; an empty list is always true
    And(Vec<Arc<Expr>>),
    /// Disjunction; an empty list is always false
    Or(Vec<Arc<Expr>>),
    /// Negation; unknown stays unknown
    Not(Arc<Expr>),
}

impl Expr {
    /// Conjunction of `parts`, flattening nested conjunctions in order.
    pub fn and_all(parts: impl IntoIterator<Item = Arc<Expr>>) -> Expr {
        let mut children = Vec::new();
        for part in parts {
            match part.as_ref() {
                Expr::And(nested) => children.extend(nested.iter().cloned()),
                _ => children.push(part),
            }
        }
        Expr::And(children)
    }

    /// Disjunction of `parts`, flattening nested disjunctions in order.
    pub fn or_all(parts: impl IntoIterator<Item = Arc<Expr>>) -> Expr {
        let mut children = Vec::new();
        for part in parts {
            match part.as_ref() {
                Expr::Or(nested) => children.extend(nested.iter().cloned()),
                _ => children.push(part),
            }
        }
        Expr::Or(children)
    }

    /// Every field referenced anywhere in the tree, operands included.
    pub fn fields(&self) -> Vec<&FieldRef> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a FieldRef>) {
        match self {
            Expr::Compare { field, operand, .. } => {
                out.push(field);
                if let Operand::Field(other) = operand {
                    out.push(other);
                }
            }
            Expr::IsNull { field, .. } => out.push(field),
            Expr::And(children) | Expr::Or(children) => {
                for child in children {
                    child.collect_fields(out);
                }
            }
            Expr::Not(inner) => inner.collect_fields(out),
        }
    }

    /// Names of the parameters still present in the tree.
    pub fn parameters(&self) -> Vec<&str> {
        match self {
            Expr::Compare {
                operand: Operand::Parameter(name),
                ..
            } => vec![name.as_str()],
            Expr::Compare { .. } | Expr::IsNull { .. } => Vec::new(),
            Expr::And(children) | Expr::Or(children) => {
                children.iter().flat_map(|c| c.parameters()).collect()
            }
            Expr::Not(inner) => inner.parameters(),
        }
    }

    /// Renders the tree with every field qualified by `alias`.
    pub fn display_with<'a>(&'a self, alias: &'a str) -> impl fmt::Display + 'a {
        Qualified {
            expr: self,
            alias: Some(alias),
        }
    }
}

struct Qualified<'a> {
    expr: &'a Expr,
    alias: Option<&'a str>,
}

impl Qualified<'_> {
    fn child<'b>(&'b self, expr: &'b Expr) -> Qualified<'b> {
        Qualified {
            expr,
            alias: self.alias,
        }
    }

    fn field(&self, f: &mut fmt::Formatter<'_>, field: &FieldRef) -> fmt::Result {
        match self.alias {
            Some(alias) => write!(f, "{}.{}", alias, field.name()),
            None => write!(f, "{}", field.name()),
        }
    }

    fn join(&self, f: &mut fmt::Formatter<'_>, children: &[Arc<Expr>], sep: &str) -> fmt::Result {
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", sep)?;
            }
            // `and` binds tighter than `or`, so only disjunctions nested in a
            // conjunction need parentheses.
            if sep == "and" && matches!(child.as_ref(), Expr::Or(c) if c.len() > 1) {
                write!(f, "({})", self.child(child))?;
            } else {
                write!(f, "{}", self.child(child))?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Qualified<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expr {
            Expr::Compare { field, op, operand } => {
                self.field(f, field)?;
                write!(f, " {} ", op)?;
                match operand {
                    Operand::Value(value) => write!(f, "{}", value),
                    Operand::Field(other) => self.field(f, other),
                    Operand::Parameter(name) => write!(f, ":{}", name),
                }
            }
            Expr::IsNull { field, negated } => {
                self.field(f, field)?;
                if *negated {
                    write!(f, " is not null")
                } else {
                    write!(f, " is null")
                }
            }
            Expr::And(children) if children.is_empty() => write!(f, "true"),
            Expr::Or(children) if children.is_empty() => write!(f, "false"),
            Expr::And(children) => self.join(f, children, "and"),
            Expr::Or(children) => self.join(f, children, "or"),
            Expr::Not(inner) => write!(f, "not ({})", self.child(inner)),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let qualified = Qualified {
            expr: self,
            alias: None,
        };
        fmt::Display::fmt(&qualified, f)
    }
}

/// A boolean expression over entity `E`.
pub struct Predicate<E> {
    expr: Arc<Expr>,
    _marker: PhantomData<fn() -> E>,
}

impl<E> Predicate<E> {
    pub(crate) fn from_expr(expr: Expr) -> Self {
        Self::from_shared(Arc::new(expr))
    }

    pub(crate) fn from_shared(expr: Arc<Expr>) -> Self {
        Self {
            expr,
            _marker: PhantomData,
        }
    }

    /// The underlying tree.
    pub fn expr(&self) -> &Arc<Expr> {
        &self.expr
    }

    /// Consumes the predicate, returning its tree.
    pub fn into_expr(self) -> Arc<Expr> {
        self.expr
    }

    /// Both predicates hold.
    pub fn and(self, other: Predicate<E>) -> Self {
        Self::from_expr(Expr::and_all([self.expr, other.expr]))
    }

    /// Either predicate holds.
    pub fn or(self, other: Predicate<E>) -> Self {
        Self::from_expr(Expr::or_all([self.expr, other.expr]))
    }

    /// Negates the predicate.
    pub fn not(self) -> Self {
        Self::from_expr(Expr::Not(self.expr))
    }

    /// Conjunction of every predicate, in the given order.
    pub fn all(parts: impl IntoIterator<Item = Predicate<E>>) -> Self {
        Self::from_expr(Expr::and_all(parts.into_iter().map(|p| p.expr)))
    }

    /// Disjunction of every predicate, in the given order.
    pub fn any(parts: impl IntoIterator<Item = Predicate<E>>) -> Self {
        Self::from_expr(Expr::or_all(parts.into_iter().map(|p| p.expr)))
    }
}

impl<E> Clone for Predicate<E> {
    fn clone(&self) -> Self {
        Self::from_shared(Arc::clone(&self.expr))
    }
}

impl<E> PartialEq for Predicate<E> {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
    }
}

impl<E> fmt::Debug for Predicate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.expr).finish()
    }
}

impl<E> fmt::Display for Predicate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.expr.as_ref(), f)
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first
    Asc,
    /// Largest first
    Desc,
}

/// Where nulls go, independent of the sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullOrdering {
    /// Before every non-null value
    #[default]
    First,
    /// After every non-null value
    Last,
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Sorted field
    pub field: FieldRef,
    /// Ascending or descending
    pub direction: Direction,
    /// Placement of null values
    pub nulls: NullOrdering,
}

impl Order {
    /// Renders the key with fields qualified by `alias`.
    pub fn display_with<'a>(&'a self, alias: &'a str) -> impl fmt::Display + 'a {
        QualifiedOrder { order: self, alias }
    }
}

struct QualifiedOrder<'a> {
    order: &'a Order,
    alias: &'a str,
}

impl fmt::Display for QualifiedOrder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self.order.direction {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        write!(f, "{}.{} {}", self.alias, self.order.field.name(), direction)?;
        if self.order.nulls == NullOrdering::Last {
            write!(f, " nulls last")?;
        }
        Ok(())
    }
}

/// A sort key over entity `E`.
pub struct OrderSpecifier<E> {
    order: Order,
    _marker: PhantomData<fn() -> E>,
}

impl<E> OrderSpecifier<E> {
    fn new(field: FieldRef, direction: Direction) -> Self {
        Self {
            order: Order {
                field,
                direction,
                nulls: NullOrdering::default(),
            },
            _marker: PhantomData,
        }
    }

    /// Sorts nulls before every non-null value. This is the default.
    pub fn nulls_first(mut self) -> Self {
        self.order.nulls = NullOrdering::First;
        self
    }

    /// Sorts nulls after every non-null value. No effect on a non-nullable
    /// field.
    pub fn nulls_last(mut self) -> Self {
        self.order.nulls = NullOrdering::Last;
        self
    }

    /// The untyped sort key.
    pub fn order(&self) -> &Order {
        &self.order
    }

    /// Consumes the specifier, returning the untyped sort key.
    pub fn into_order(self) -> Order {
        self.order
    }
}

impl<E> Clone for OrderSpecifier<E> {
    fn clone(&self) -> Self {
        Self {
            order: self.order.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E> PartialEq for OrderSpecifier<E> {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
    }
}

impl<E> fmt::Debug for OrderSpecifier<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OrderSpecifier").field(&self.order).finish()
    }
}

impl<E: Entity, T: FieldType> Field<E, T> {
    fn compare(&self, op: CompareOp, value: impl Into<T::Operand>) -> Predicate<E> {
        let operand: T::Operand = value.into();
        Predicate::from_expr(Expr::Compare {
            field: self.to_ref(),
            op,
            operand: Operand::Value(operand.into()),
        })
    }

    fn compare_field<U>(&self, op: CompareOp, other: &Field<E, U>) -> Predicate<E> {
        Predicate::from_expr(Expr::Compare {
            field: self.to_ref(),
            op,
            operand: Operand::Field(other.to_ref()),
        })
    }

    /// `field = value`
    pub fn eq(&self, value: impl Into<T::Operand>) -> Predicate<E> {
        self.compare(CompareOp::Eq, value)
    }

    /// `field <> value`
    pub fn ne(&self, value: impl Into<T::Operand>) -> Predicate<E> {
        self.compare(CompareOp::Ne, value)
    }

    /// `field < value`
    pub fn lt(&self, value: impl Into<T::Operand>) -> Predicate<E> {
        self.compare(CompareOp::Lt, value)
    }

    /// `field <= value`
    pub fn lte(&self, value: impl Into<T::Operand>) -> Predicate<E> {
        self.compare(CompareOp::Lte, value)
    }

    /// `field > value`
    pub fn gt(&self, value: impl Into<T::Operand>) -> Predicate<E> {
        self.compare(CompareOp::Gt, value)
    }

    /// `field >= value`
    pub fn gte(&self, value: impl Into<T::Operand>) -> Predicate<E> {
        self.compare(CompareOp::Gte, value)
    }

    /// `field = other`, both read from the same row
    pub fn eq_field<U>(&self, other: &Field<E, U>) -> Predicate<E>
    where
        U: FieldType<Operand = T::Operand>,
    {
        self.compare_field(CompareOp::Eq, other)
    }

    /// `field <> other`
    pub fn ne_field<U>(&self, other: &Field<E, U>) -> Predicate<E>
    where
        U: FieldType<Operand = T::Operand>,
    {
        self.compare_field(CompareOp::Ne, other)
    }

    /// `field < other`
    pub fn lt_field<U>(&self, other: &Field<E, U>) -> Predicate<E>
    where
        U: FieldType<Operand = T::Operand>,
    {
        self.compare_field(CompareOp::Lt, other)
    }

    /// `field > other`
    pub fn gt_field<U>(&self, other: &Field<E, U>) -> Predicate<E>
    where
        U: FieldType<Operand = T::Operand>,
    {
        self.compare_field(CompareOp::Gt, other)
    }

    /// Holds when the field is null.
    pub fn is_null(&self) -> Predicate<E> {
        Predicate::from_expr(Expr::IsNull {
            field: self.to_ref(),
            negated: false,
        })
    }

    /// Holds when the field has a value.
    pub fn is_not_null(&self) -> Predicate<E> {
        Predicate::from_expr(Expr::IsNull {
            field: self.to_ref(),
            negated: true,
        })
    }

    /// Ascending sort key, nulls first.
    pub fn asc(&self) -> OrderSpecifier<E> {
        OrderSpecifier::new(self.to_ref(), Direction::Asc)
    }

    /// Descending sort key, nulls first.
    pub fn desc(&self) -> OrderSpecifier<E> {
        OrderSpecifier::new(self.to_ref(), Direction::Desc)
    }
}
