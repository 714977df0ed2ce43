use std::fmt;
use std::str::FromStr;

use crate::error::PdsqlError;

/// Aggregate functions. A column carries at most one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Avg,
    Count,
    First,
    Last,
    Max,
    Min,
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregate::Sum => write!(f, "SUM"),
            Aggregate::Avg => write!(f, "AVG"),
            Aggregate::Count => write!(f, "COUNT"),
            Aggregate::First => write!(f, "FIRST"),
            Aggregate::Last => write!(f, "LAST"),
            Aggregate::Max => write!(f, "MAX"),
            Aggregate::Min => write!(f, "MIN"),
        }
    }
}

impl FromStr for Aggregate {
    type Err = PdsqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(Aggregate::Sum),
            "avg" => Ok(Aggregate::Avg),
            "count" => Ok(Aggregate::Count),
            "first" => Ok(Aggregate::First),
            "last" => Ok(Aggregate::Last),
            "max" => Ok(Aggregate::Max),
            "min" => Ok(Aggregate::Min),
            _ => Err(PdsqlError::InvalidOperator(s.to_string())),
        }
    }
}

/// Unary functions, applied in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Abs,
    Ceil,
    Floor,
    Round,
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Abs => write!(f, "ABS"),
            UnaryOp::Ceil => write!(f, "CEIL"),
            UnaryOp::Floor => write!(f, "FLOOR"),
            UnaryOp::Round => write!(f, "ROUND"),
            UnaryOp::Not => write!(f, "NOT"),
        }
    }
}

impl FromStr for UnaryOp {
    type Err = PdsqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abs" => Ok(UnaryOp::Abs),
            "ceil" => Ok(UnaryOp::Ceil),
            "floor" => Ok(UnaryOp::Floor),
            "round" => Ok(UnaryOp::Round),
            "not" => Ok(UnaryOp::Not),
            _ => Err(PdsqlError::InvalidOperator(s.to_string())),
        }
    }
}

/// Entry in a column's ordered function list.
///
/// Aggregates share the list with unary functions so that `sum().abs()` and
/// `abs().sum()` wrap in different orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Aggregate(Aggregate),
    Unary(UnaryOp),
}

impl fmt::Display for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Func::Aggregate(agg) => write!(f, "{}", agg),
            Func::Unary(op) => write!(f, "{}", op),
        }
    }
}

/// Binary operators for column expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    In,
    Between,
    Like,
}

impl BinaryOp {
    /// SQL token for the operator.
    ///
    /// Infix operators render between their operands; `Mod` renders as a
    /// function call.
    pub fn sql_symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "MOD",
            BinaryOp::Concat => "+",
            BinaryOp::Or => "OR",
            BinaryOp::And => "AND",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::In => "IN",
            BinaryOp::Between => "BETWEEN",
            BinaryOp::Like => "LIKE",
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, BinaryOp::Mod)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::Concat => "concat",
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Lt => "lt",
            BinaryOp::Gt => "gt",
            BinaryOp::Le => "le",
            BinaryOp::Ge => "ge",
            BinaryOp::In => "in",
            BinaryOp::Between => "between",
            BinaryOp::Like => "like",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for BinaryOp {
    type Err = PdsqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "add" | "+" => Ok(BinaryOp::Add),
            "sub" | "-" => Ok(BinaryOp::Sub),
            "mul" | "*" => Ok(BinaryOp::Mul),
            "div" | "/" => Ok(BinaryOp::Div),
            "mod" | "%" => Ok(BinaryOp::Mod),
            "concat" => Ok(BinaryOp::Concat),
            "or" => Ok(BinaryOp::Or),
            "and" => Ok(BinaryOp::And),
            "eq" | "=" | "==" => Ok(BinaryOp::Eq),
            "ne" | "<>" | "!=" => Ok(BinaryOp::Ne),
            "lt" | "<" => Ok(BinaryOp::Lt),
            "gt" | ">" => Ok(BinaryOp::Gt),
            "le" | "<=" => Ok(BinaryOp::Le),
            "ge" | ">=" => Ok(BinaryOp::Ge),
            "in" => Ok(BinaryOp::In),
            "between" => Ok(BinaryOp::Between),
            "like" => Ok(BinaryOp::Like),
            _ => Err(PdsqlError::InvalidOperator(s.to_string())),
        }
    }
}

/// Null check on a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullCheck {
    #[default]
    Unset,
    IsNull,
    IsNotNull,
}

impl NullCheck {
    pub fn sql_suffix(&self) -> Option<&'static str> {
        match self {
            NullCheck::Unset => None,
            NullCheck::IsNull => Some("IS NULL"),
            NullCheck::IsNotNull => Some("IS NOT NULL"),
        }
    }
}

/// Set operation type for combining queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Union,
    Intersect,
    Except,
}

impl fmt::Display for SetOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetOp::Union => write!(f, "UNION"),
            SetOp::Intersect => write!(f, "INTERSECT"),
            SetOp::Except => write!(f, "EXCEPT"),
        }
    }
}
