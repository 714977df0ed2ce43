//! Column expressions.
//!
//! Every builder method returns a new [`Column`]; the receiver is never
//! modified. Comparison builders such as [`Column::eq`] and [`Column::lt`]
//! build AST nodes and do not compare anything in Rust.

use std::fmt;

use super::{Aggregate, BinaryOp, Func, NullCheck, Operand, TableRef, UnaryOp};
use crate::error::{PdsqlError, PdsqlResult};

/// Name of the sentinel column selecting all columns.
pub const STAR: &str = "*";

/// A value-level expression: a column reference or a derived expression.
#[derive(Debug, Clone)]
pub struct Column {
    pub(crate) name: String,
    pub(crate) owner: Option<TableRef>,
    /// Aggregate and unary functions, innermost first.
    pub(crate) funcs: Vec<Func>,
    pub(crate) binary: Option<Box<BinaryExpr>>,
    pub(crate) null_check: NullCheck,
}

/// Two ordered children joined by a binary operator.
#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: Operand,
    pub right: Operand,
}

#[allow(clippy::should_implement_trait)]
impl Column {
    /// A column reference that is not bound to any table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: None,
            funcs: Vec::new(),
            binary: None,
            null_check: NullCheck::Unset,
        }
    }

    /// The `*` sentinel.
    pub fn star() -> Self {
        Self::new(STAR)
    }

    pub(crate) fn owned(name: impl Into<String>, owner: TableRef) -> Self {
        Self {
            owner: Some(owner),
            ..Self::new(name)
        }
    }

    /// Build a binary node from two operands.
    pub fn binary_node(op: BinaryOp, left: impl Into<Operand>, right: impl Into<Operand>) -> Self {
        Self {
            binary: Some(Box::new(BinaryExpr {
                op,
                left: left.into(),
                right: right.into(),
            })),
            ..Self::new(String::new())
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> Option<&TableRef> {
        self.owner.as_ref()
    }

    pub fn funcs(&self) -> &[Func] {
        &self.funcs
    }

    pub fn binary_expr(&self) -> Option<&BinaryExpr> {
        self.binary.as_deref()
    }

    pub fn null_check(&self) -> NullCheck {
        self.null_check
    }

    pub fn is_count_star(&self) -> bool {
        self.name == STAR
    }

    pub fn is_binary(&self) -> bool {
        self.binary.is_some()
    }

    /// The aggregate applied to this node, if any.
    pub fn aggregate_func(&self) -> Option<Aggregate> {
        self.funcs.iter().find_map(|f| match f {
            Func::Aggregate(agg) => Some(*agg),
            Func::Unary(_) => None,
        })
    }

    pub fn has_aggregate(&self) -> bool {
        self.aggregate_func().is_some()
    }

    pub fn has_unary(&self) -> bool {
        self.funcs.iter().any(|f| matches!(f, Func::Unary(_)))
    }

    /// True if this node or any column beneath it carries an aggregate.
    /// Nested subqueries are not inspected.
    pub fn contains_aggregate(&self) -> bool {
        if self.has_aggregate() {
            return true;
        }
        match &self.binary {
            Some(bin) => [&bin.left, &bin.right]
                .into_iter()
                .filter_map(Operand::as_column)
                .any(Column::contains_aggregate),
            None => false,
        }
    }

    /// A plain reference: no functions, operators or null check.
    pub fn is_bare(&self) -> bool {
        self.binary.is_none()
            && self.funcs.is_empty()
            && self.null_check == NullCheck::Unset
            && !self.is_count_star()
    }

    /// Set the aggregate from a token such as `"sum"`.
    pub fn aggregate(&self, token: &str) -> PdsqlResult<Column> {
        self.with_aggregate(token.parse()?)
    }

    pub fn with_aggregate(&self, agg: Aggregate) -> PdsqlResult<Column> {
        if let Some(existing) = self.aggregate_func() {
            return Err(PdsqlError::duplicate(format!(
                "cannot apply {} to {}: aggregate {} already set",
                agg, self, existing
            )));
        }
        let mut col = self.clone();
        col.funcs.push(Func::Aggregate(agg));
        Ok(col)
    }

    pub fn sum(&self) -> PdsqlResult<Column> {
        self.with_aggregate(Aggregate::Sum)
    }

    pub fn avg(&self) -> PdsqlResult<Column> {
        self.with_aggregate(Aggregate::Avg)
    }

    pub fn count(&self) -> PdsqlResult<Column> {
        self.with_aggregate(Aggregate::Count)
    }

    pub fn first(&self) -> PdsqlResult<Column> {
        self.with_aggregate(Aggregate::First)
    }

    pub fn last(&self) -> PdsqlResult<Column> {
        self.with_aggregate(Aggregate::Last)
    }

    pub fn max(&self) -> PdsqlResult<Column> {
        self.with_aggregate(Aggregate::Max)
    }

    pub fn min(&self) -> PdsqlResult<Column> {
        self.with_aggregate(Aggregate::Min)
    }

    /// Apply a unary function from a token such as `"ceil"`.
    pub fn apply(&self, token: &str) -> PdsqlResult<Column> {
        self.with_unary(token.parse()?)
    }

    pub fn with_unary(&self, op: UnaryOp) -> PdsqlResult<Column> {
        if self.funcs.contains(&Func::Unary(op)) {
            return Err(PdsqlError::duplicate(format!(
                "{} already applied to {}",
                op, self
            )));
        }
        let mut col = self.clone();
        col.funcs.push(Func::Unary(op));
        Ok(col)
    }

    pub fn abs(&self) -> PdsqlResult<Column> {
        self.with_unary(UnaryOp::Abs)
    }

    pub fn ceil(&self) -> PdsqlResult<Column> {
        self.with_unary(UnaryOp::Ceil)
    }

    pub fn floor(&self) -> PdsqlResult<Column> {
        self.with_unary(UnaryOp::Floor)
    }

    pub fn round(&self) -> PdsqlResult<Column> {
        self.with_unary(UnaryOp::Round)
    }

    /// Logical negation, `NOT(...)`.
    pub fn not(&self) -> PdsqlResult<Column> {
        self.with_unary(UnaryOp::Not)
    }

    /// Combine with another operand using an operator token such as `"eq"`.
    pub fn binary(&self, token: &str, other: impl Into<Operand>) -> PdsqlResult<Column> {
        Ok(self.combine(token.parse()?, other))
    }

    /// New node owning copies of `self` and `other`.
    pub fn combine(&self, op: BinaryOp, other: impl Into<Operand>) -> Column {
        Column::binary_node(op, self.clone(), other)
    }

    pub fn add(&self, other: impl Into<Operand>) -> Column {
        self.combine(BinaryOp::Add, other)
    }

    pub fn sub(&self, other: impl Into<Operand>) -> Column {
        self.combine(BinaryOp::Sub, other)
    }

    pub fn mul(&self, other: impl Into<Operand>) -> Column {
        self.combine(BinaryOp::Mul, other)
    }

    pub fn div(&self, other: impl Into<Operand>) -> Column {
        self.combine(BinaryOp::Div, other)
    }

    pub fn modulo(&self, other: impl Into<Operand>) -> Column {
        self.combine(BinaryOp::Mod, other)
    }

    pub fn concat(&self, other: impl Into<Operand>) -> Column {
        self.combine(BinaryOp::Concat, other)
    }

    pub fn and(&self, other: impl Into<Operand>) -> Column {
        self.combine(BinaryOp::And, other)
    }

    pub fn or(&self, other: impl Into<Operand>) -> Column {
        self.combine(BinaryOp::Or, other)
    }

    pub fn eq(&self, other: impl Into<Operand>) -> Column {
        self.combine(BinaryOp::Eq, other)
    }

    pub fn ne(&self, other: impl Into<Operand>) -> Column {
        self.combine(BinaryOp::Ne, other)
    }

    pub fn lt(&self, other: impl Into<Operand>) -> Column {
        self.combine(BinaryOp::Lt, other)
    }

    pub fn gt(&self, other: impl Into<Operand>) -> Column {
        self.combine(BinaryOp::Gt, other)
    }

    pub fn le(&self, other: impl Into<Operand>) -> Column {
        self.combine(BinaryOp::Le, other)
    }

    pub fn ge(&self, other: impl Into<Operand>) -> Column {
        self.combine(BinaryOp::Ge, other)
    }

    /// `col IN (...)`: a literal tuple or a subquery.
    pub fn is_in(&self, other: impl Into<Operand>) -> Column {
        self.combine(BinaryOp::In, other)
    }

    /// `col BETWEEN low AND high`.
    pub fn between(&self, low: impl Into<Operand>, high: impl Into<Operand>) -> Column {
        self.combine(BinaryOp::Between, Column::binary_node(BinaryOp::And, low, high))
    }

    pub fn like(&self, pattern: impl Into<Operand>) -> Column {
        self.combine(BinaryOp::Like, pattern)
    }

    pub fn is_null(&self) -> PdsqlResult<Column> {
        self.with_null_check(NullCheck::IsNull)
    }

    pub fn not_null(&self) -> PdsqlResult<Column> {
        self.with_null_check(NullCheck::IsNotNull)
    }

    fn with_null_check(&self, check: NullCheck) -> PdsqlResult<Column> {
        if self.null_check != NullCheck::Unset {
            return Err(PdsqlError::duplicate(format!(
                "null check already set on {}",
                self
            )));
        }
        let mut col = self.clone();
        col.null_check = check;
        Ok(col)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.binary {
            Some(bin) => write!(f, "({}, {})", bin.left, bin.right)?,
            None => write!(f, "{}", self.name)?,
        }
        if let Some(qualifier) = self.owner.as_ref().and_then(TableRef::qualifier) {
            write!(f, "({})", qualifier)?;
        }
        if let Some(agg) = self.aggregate_func() {
            write!(f, " agg:{}", agg)?;
        }
        let unary: Vec<String> = self
            .funcs
            .iter()
            .filter(|func| matches!(func, Func::Unary(_)))
            .map(|func| func.to_string())
            .collect();
        if !unary.is_empty() {
            write!(f, " unary:{}", unary.join(","))?;
        }
        if let Some(bin) = &self.binary {
            write!(f, " binary:{}", bin.op)?;
        }
        Ok(())
    }
}

impl From<&str> for Column {
    fn from(name: &str) -> Self {
        Column::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Table;

    #[test]
    fn test_unary_does_not_touch_receiver() {
        let c1 = Column::new("C1");
        let c = c1.abs().unwrap();
        assert!(c.has_unary());
        assert!(!c1.has_unary());
        assert!(matches!(c.abs(), Err(PdsqlError::DuplicateOperator(_))));
    }

    #[test]
    fn test_unary_ordering() {
        let c = Column::new("x").abs().unwrap().ceil().unwrap();
        assert_eq!(
            c.funcs(),
            &[Func::Unary(UnaryOp::Abs), Func::Unary(UnaryOp::Ceil)]
        );
    }

    #[test]
    fn test_single_aggregate() {
        let c = Column::new("x").sum().unwrap();
        assert_eq!(c.aggregate_func(), Some(Aggregate::Sum));
        assert!(matches!(c.max(), Err(PdsqlError::DuplicateOperator(_))));
        assert!(matches!(c.aggregate("avg"), Err(PdsqlError::DuplicateOperator(_))));
        // a unary function between aggregates does not reset the rule
        assert!(c.abs().unwrap().count().is_err());
    }

    #[test]
    fn test_invalid_tokens() {
        let c = Column::new("x");
        assert!(matches!(c.aggregate("median"), Err(PdsqlError::InvalidOperator(_))));
        assert!(matches!(c.apply("sqrt"), Err(PdsqlError::InvalidOperator(_))));
        assert!(matches!(c.binary("xor", 1), Err(PdsqlError::InvalidOperator(_))));
        assert!(c.binary("ge", 1).unwrap().is_binary());
    }

    #[test]
    fn test_binary_copies_operands() {
        let a = Column::new("a");
        let b = Column::new("b").sum().unwrap();
        let sum = a.add(b.clone());
        assert!(!a.is_binary());
        assert!(sum.is_binary());
        let bin = sum.binary_expr().unwrap();
        assert_eq!(bin.op, BinaryOp::Add);
        assert_eq!(bin.left.as_column().unwrap().name(), "a");
        assert!(bin.right.as_column().unwrap().has_aggregate());
        assert!(!sum.has_aggregate());
        assert!(sum.contains_aggregate());
    }

    #[test]
    fn test_null_check_once() {
        let c = Column::new("x").not_null().unwrap();
        assert_eq!(c.null_check(), NullCheck::IsNotNull);
        assert!(matches!(c.is_null(), Err(PdsqlError::DuplicateOperator(_))));
        assert!(c.not_null().is_err());
        // derived nodes start with a fresh null check
        assert!(c.eq(1).is_null().is_ok());
    }

    #[test]
    fn test_count_star_and_bare() {
        assert!(Column::star().is_count_star());
        assert!(!Column::star().is_bare());
        assert!(Column::new("x").is_bare());
        assert!(!Column::new("x").floor().unwrap().is_bare());
    }

    #[test]
    fn test_display() {
        let t1 = Table::new("t1");
        let c = t1.col("c").sum().unwrap().abs().unwrap();
        assert_eq!(c.to_string(), "c(t1) agg:SUM unary:ABS");
        let b = t1.col("a").eq(3);
        assert_eq!(b.to_string(), "(a(t1), 3) binary:eq");
    }
}
