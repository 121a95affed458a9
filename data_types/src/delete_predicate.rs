//! The row predicate attached to a delete, carried opaquely through the
//! coordinator and evaluated only by the storage nodes.

use ordered_float::OrderedFloat;
use std::fmt;

/// A conjunction of column comparisons selecting the rows to delete.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeletePredicate {
    /// The expressions; all must match for a row to be deleted.
    pub exprs: Vec<DeleteExpr>,
}

impl fmt::Display for DeletePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for expr in &self.exprs {
            if !first {
                write!(f, " AND ")?;
            }
            first = false;
            write!(f, "{}", expr)?;
        }
        Ok(())
    }
}

/// A single column comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeleteExpr {
    /// The column the comparison applies to.
    pub column: String,
    /// The comparison operator.
    pub op: Op,
    /// The literal compared against. [`Scalar::Null`] combined with
    /// [`Op::Eq`]/[`Op::Ne`] expresses `IS NULL` / `IS NOT NULL`.
    pub scalar: Scalar,
}

impl DeleteExpr {
    /// Build an expression comparing `column` against `scalar` with `op`.
    pub fn new(column: impl Into<String>, op: Op, scalar: Scalar) -> Self {
        Self {
            column: column.into(),
            op,
            scalar,
        }
    }
}

impl fmt::Display for DeleteExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.op, &self.scalar) {
            (Op::Eq, Scalar::Null) => write!(f, r#""{}" IS NULL"#, self.column),
            (Op::Ne, Scalar::Null) => write!(f, r#""{}" IS NOT NULL"#, self.column),
            (op, scalar) => write!(f, r#""{}"{}{}"#, self.column, op, scalar),
        }
    }
}

/// Comparison operators supported by delete predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Strict equality.
    Eq,
    /// Inequality.
    Ne,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "!="),
            Self::Lt => write!(f, "<"),
            Self::Le => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::Ge => write!(f, ">="),
        }
    }
}

/// Literal values delete predicates can compare against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scalar {
    /// SQL NULL; meaningful only with [`Op::Eq`] and [`Op::Ne`].
    Null,
    /// A boolean literal.
    Bool(bool),
    /// A signed integer literal.
    I64(i64),
    /// A float literal, ordered so predicates can be hashed and compared.
    F64(OrderedFloat<f64>),
    /// A string literal.
    String(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(value) => value.fmt(f),
            Self::I64(value) => value.fmt(f),
            Self::F64(value) => value.fmt(f),
            Self::String(value) => write!(f, "'{}'", value),
        }
    }
}
