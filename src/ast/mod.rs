pub mod column;
pub mod operators;
pub mod table;
pub mod values;

pub use self::column::{BinaryExpr, Column};
pub use self::operators::{Aggregate, BinaryOp, Func, NullCheck, SetOp, UnaryOp};
pub use self::table::{
    Join, Operation, OperationKind, Projection, SetOperation, Source, Table, TableRef,
};
pub use self::values::{Operand, Value};
