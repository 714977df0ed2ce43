//! Relation-level expressions.
//!
//! A [`Table`] is either a named table or subquery carrying an ordered log
//! of relational operations, or a set operation over two tables. Every
//! builder call returns a new table; the receiver is left untouched, so a
//! base table can be shared between any number of derived queries.

use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::sync::{Arc, OnceLock};

use tracing::debug;

use super::column::STAR;
use super::{Aggregate, Column, Func, Operand, SetOp, Value};
use crate::engine::{Driver, DriverHandle, ResultSet};
use crate::error::{PdsqlError, PdsqlResult};
use crate::transpiler::ToSql;

/// Non-owning reference to the table a column is drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableRef {
    pub name: Option<String>,
    pub alias: Option<String>,
}

impl TableRef {
    /// Name used to qualify columns: the alias if set, else the table name.
    pub fn qualifier(&self) -> Option<&str> {
        self.alias.as_deref().or(self.name.as_deref())
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualifier().unwrap_or("<subquery>"))
    }
}

/// Where a table's rows come from.
#[derive(Debug, Clone)]
pub enum Source {
    Named(String),
    Subquery(Box<Table>),
    /// Set operation. The owning table may only order and limit it.
    Set(Box<SetOperation>),
}

#[derive(Debug, Clone)]
pub struct SetOperation {
    pub op: SetOp,
    pub left: Table,
    pub right: Table,
}

/// One projected expression, optionally aliased.
#[derive(Debug, Clone)]
pub struct Projection {
    pub alias: Option<String>,
    pub expr: Operand,
}

impl From<Column> for Projection {
    fn from(col: Column) -> Self {
        Self {
            alias: None,
            expr: Operand::Column(col),
        }
    }
}

impl From<Value> for Projection {
    fn from(value: Value) -> Self {
        Self {
            alias: None,
            expr: Operand::Value(value),
        }
    }
}

impl From<i32> for Projection {
    fn from(v: i32) -> Self {
        Value::from(v).into()
    }
}

impl From<i64> for Projection {
    fn from(v: i64) -> Self {
        Value::from(v).into()
    }
}

impl From<(&str, Column)> for Projection {
    fn from((alias, col): (&str, Column)) -> Self {
        Self {
            alias: Some(alias.to_string()),
            expr: Operand::Column(col),
        }
    }
}

impl From<(String, Column)> for Projection {
    fn from((alias, col): (String, Column)) -> Self {
        Self {
            alias: Some(alias),
            expr: Operand::Column(col),
        }
    }
}

/// A joined table with an optional `ON` condition.
#[derive(Debug, Clone)]
pub struct Join {
    pub table: Table,
    pub on: Option<Column>,
}

/// Entry in a table's operation log.
#[derive(Debug, Clone)]
pub enum Operation {
    Select(Vec<Projection>),
    Where(Column),
    WhereExists(Table),
    Group(Column),
    Having(Column),
    Order(Column),
    Join(Join),
}

/// Kind tag of an [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Select,
    Where,
    WhereExists,
    Group,
    Having,
    Order,
    Join,
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Select(_) => OperationKind::Select,
            Operation::Where(_) => OperationKind::Where,
            Operation::WhereExists(_) => OperationKind::WhereExists,
            Operation::Group(_) => OperationKind::Group,
            Operation::Having(_) => OperationKind::Having,
            Operation::Order(_) => OperationKind::Order,
            Operation::Join(_) => OperationKind::Join,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Select => write!(f, "select"),
            OperationKind::Where => write!(f, "where"),
            OperationKind::WhereExists => write!(f, "where_exists"),
            OperationKind::Group => write!(f, "group"),
            OperationKind::Having => write!(f, "having"),
            OperationKind::Order => write!(f, "order"),
            OperationKind::Join => write!(f, "join"),
        }
    }
}

/// A relation-level expression.
#[derive(Debug, Clone)]
pub struct Table {
    pub(crate) source: Source,
    pub(crate) alias: Option<String>,
    pub(crate) operations: Vec<Operation>,
    pub(crate) limit: Option<u64>,
    pub(crate) distinct: bool,
    pub(crate) reverse: bool,
    pub(crate) driver: Option<DriverHandle>,
    compiled: OnceLock<String>,
}

impl Table {
    /// A named table.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_source(Source::Named(name.into()))
    }

    /// A named table under an alias, needed for self-joins.
    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            ..Self::new(name)
        }
    }

    /// A table whose rows come from another query.
    pub fn from_query(query: Table) -> Self {
        let driver = query.driver.clone();
        Self {
            driver,
            ..Self::with_source(Source::Subquery(Box::new(query)))
        }
    }

    fn with_source(source: Source) -> Self {
        Self {
            source,
            alias: None,
            operations: Vec::new(),
            limit: None,
            distinct: false,
            reverse: false,
            driver: None,
            compiled: OnceLock::new(),
        }
    }

    /// Copy of this table with an empty compile cache.
    fn derive(&self) -> Table {
        let mut copy = self.clone();
        copy.compiled = OnceLock::new();
        copy
    }

    fn push(&self, op: Operation) -> Table {
        let mut copy = self.derive();
        copy.operations.push(op);
        copy
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn is_reversed(&self) -> bool {
        self.reverse
    }

    pub fn has_operation(&self, kind: OperationKind) -> bool {
        self.operations.iter().any(|op| op.kind() == kind)
    }

    /// The reference columns of this table point back to.
    pub fn reference(&self) -> TableRef {
        let name = match &self.source {
            Source::Named(name) => Some(name.clone()),
            Source::Subquery(_) | Source::Set(_) => None,
        };
        TableRef {
            name,
            alias: self.alias.clone(),
        }
    }

    /// Column of this table by name.
    pub fn col(&self, name: impl Into<String>) -> Column {
        Column::owned(name, self.reference())
    }

    /// `COUNT(*)` scoped to this table. The table itself is unchanged.
    pub fn count(&self) -> Column {
        let mut col = Column::owned(STAR, self.reference());
        col.funcs.push(Func::Aggregate(Aggregate::Count));
        col
    }

    /// Rename the table. Columns taken before the rename keep the old name.
    pub fn alias(&self, alias: impl Into<String>) -> Table {
        let mut copy = self.derive();
        copy.alias = Some(alias.into());
        copy
    }

    /// Attach the driver used by [`Table::run`].
    pub fn with_driver(&self, driver: Arc<dyn Driver>) -> Table {
        let mut copy = self.derive();
        copy.driver = Some(DriverHandle::new(driver));
        copy
    }

    /// Project columns or literals, each optionally aliased.
    ///
    /// An empty projection list leaves the query unchanged.
    pub fn select<I, P>(&self, cols: I) -> Table
    where
        I: IntoIterator<Item = P>,
        P: Into<Projection>,
    {
        let projections: Vec<Projection> = cols.into_iter().map(Into::into).collect();
        if projections.is_empty() {
            return self.clone();
        }
        self.push(Operation::Select(projections))
    }

    /// Project a single column under an alias.
    pub fn select_as(&self, alias: &str, col: Column) -> Table {
        self.select([(alias, col)])
    }

    /// Filter rows. Successive calls are AND-ed in call order.
    pub fn where_(&self, cond: Column) -> PdsqlResult<Table> {
        if cond.contains_aggregate() {
            return Err(PdsqlError::aggregate("WHERE", &cond));
        }
        Ok(self.push(Operation::Where(cond)))
    }

    /// Keep rows for which the subquery returns at least one row.
    pub fn where_exists(&self, subquery: Table) -> Table {
        self.push(Operation::WhereExists(subquery))
    }

    pub fn group(&self, col: Column) -> PdsqlResult<Table> {
        if col.contains_aggregate() {
            return Err(PdsqlError::aggregate("GROUP BY", &col));
        }
        Ok(self.push(Operation::Group(col)))
    }

    /// Filter groups. Aggregates are allowed; compiling requires a `group`.
    pub fn having(&self, cond: Column) -> Table {
        self.push(Operation::Having(cond))
    }

    pub fn order(&self, col: Column) -> PdsqlResult<Table> {
        if col.contains_aggregate() {
            return Err(PdsqlError::aggregate("ORDER BY", &col));
        }
        Ok(self.push(Operation::Order(col)))
    }

    /// `INNER JOIN` without a condition.
    pub fn join(&self, table: Table) -> Table {
        self.push(Operation::Join(Join { table, on: None }))
    }

    /// `INNER JOIN ... ON cond`.
    pub fn join_on(&self, table: Table, cond: Column) -> PdsqlResult<Table> {
        if cond.contains_aggregate() {
            return Err(PdsqlError::aggregate("JOIN", &cond));
        }
        Ok(self.push(Operation::Join(Join {
            table,
            on: Some(cond),
        })))
    }

    pub fn limit(&self, n: i64) -> PdsqlResult<Table> {
        if let Some(existing) = self.limit {
            return Err(PdsqlError::LimitAlreadySet(existing));
        }
        let n = u64::try_from(n).map_err(|_| {
            PdsqlError::TypeMismatch(format!("limit must be a non-negative integer, got {}", n))
        })?;
        let mut copy = self.derive();
        copy.limit = Some(n);
        Ok(copy)
    }

    pub fn distinct(&self) -> Table {
        let mut copy = self.derive();
        copy.distinct = true;
        copy
    }

    /// Flip the sort direction. Applying it twice restores the original.
    pub fn reverse(&self) -> Table {
        let mut copy = self.derive();
        copy.reverse = !copy.reverse;
        copy
    }

    /// Single row by position: `0` is the first row, `-1` the last.
    pub fn row(&self, index: i64) -> PdsqlResult<Table> {
        match index {
            0 => self.limit(1),
            -1 => self.reverse().limit(1),
            _ => Err(PdsqlError::UnsupportedAccess(format!("row({})", index))),
        }
    }

    /// Leading rows with `..k`, trailing rows with `-k..`.
    pub fn rows<R: RangeBounds<i64>>(&self, range: R) -> PdsqlResult<Table> {
        match (range.start_bound(), range.end_bound()) {
            (Bound::Unbounded, Bound::Excluded(&k)) if k > 0 => self.limit(k),
            (Bound::Included(&k), Bound::Unbounded) if k < 0 => match k.checked_neg() {
                Some(n) => self.reverse().limit(n),
                None => Err(PdsqlError::UnsupportedAccess(format!("rows({}..)", k))),
            },
            (start, end) => Err(PdsqlError::UnsupportedAccess(format!(
                "rows({:?}, {:?})",
                start, end
            ))),
        }
    }

    fn set_op(&self, op: SetOp, other: Table) -> Table {
        let driver = self.driver.clone();
        Table {
            driver,
            ..Table::with_source(Source::Set(Box::new(SetOperation {
                op,
                left: self.clone(),
                right: other,
            })))
        }
    }

    pub fn union(&self, other: Table) -> Table {
        self.set_op(SetOp::Union, other)
    }

    pub fn intersect(&self, other: Table) -> Table {
        self.set_op(SetOp::Intersect, other)
    }

    pub fn except(&self, other: Table) -> Table {
        self.set_op(SetOp::Except, other)
    }

    /// Compile to SQL, caching the text on this instance.
    pub fn compile(&self) -> PdsqlResult<String> {
        if let Some(sql) = self.compiled.get() {
            return Ok(sql.clone());
        }
        let sql = self.to_sql()?;
        Ok(self.compiled.get_or_init(|| sql).clone())
    }

    /// Compile and execute through the attached driver.
    pub fn run(&self) -> PdsqlResult<ResultSet> {
        let driver = self
            .driver
            .as_ref()
            .ok_or_else(|| PdsqlError::NoDriver(self.reference().to_string()))?;
        let sql = self.compile()?;
        debug!(sql = %sql, "executing query");
        driver.execute(&sql)
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
        let indent = "\t".repeat(level);
        match &self.source {
            Source::Named(name) => write!(f, "{}{}", indent, name)?,
            Source::Subquery(_) => write!(f, "{}<subquery>", indent)?,
            Source::Set(set) => write!(f, "{}{}", indent, set.op)?,
        }
        if let Some(alias) = &self.alias {
            write!(f, " as {}", alias)?;
        }
        writeln!(f)?;

        let inner = "\t".repeat(level + 1);
        match &self.source {
            Source::Subquery(query) => query.fmt_tree(f, level + 1)?,
            Source::Set(set) => {
                set.left.fmt_tree(f, level + 1)?;
                set.right.fmt_tree(f, level + 1)?;
            }
            Source::Named(_) => {}
        }
        for op in &self.operations {
            writeln!(f, "{}{}:", inner, op.kind())?;
            match op {
                Operation::Select(projections) => {
                    for p in projections {
                        match &p.alias {
                            Some(alias) => writeln!(f, "{}\t{} as {}", inner, p.expr, alias)?,
                            None => writeln!(f, "{}\t{}", inner, p.expr)?,
                        }
                    }
                }
                Operation::Where(col)
                | Operation::Group(col)
                | Operation::Having(col)
                | Operation::Order(col) => writeln!(f, "{}\t{}", inner, col)?,
                Operation::WhereExists(table) => table.fmt_tree(f, level + 2)?,
                Operation::Join(join) => {
                    join.table.fmt_tree(f, level + 2)?;
                    if let Some(on) = &join.on {
                        writeln!(f, "{}\ton {}", inner, on)?;
                    }
                }
            }
        }
        if self.distinct {
            writeln!(f, "{}distinct", inner)?;
        }
        if self.reverse {
            writeln!(f, "{}reversed", inner)?;
        }
        if let Some(n) = self.limit {
            writeln!(f, "{}limit: {}", inner, n)?;
        }
        Ok(())
    }
}

/// Indented tree of the operation log, for diagnostics.
impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}
