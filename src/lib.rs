//! # PDSQL: composable SQL query trees
//!
//! Build queries as immutable trees of tables and columns, then compile
//! them to SQL text.
//!
//! ## Quick Example
//!
//! ```rust
//! use pdsql::prelude::*;
//!
//! let counties = Table::new("counties");
//! let query = counties
//!     .where_(counties.col("statecode").eq("WV"))?
//!     .select([counties.col("name")]);
//!
//! assert_eq!(
//!     query.compile()?,
//!     "SELECT counties.name FROM counties WHERE (counties.statecode = 'WV');"
//! );
//! # Ok::<(), pdsql::PdsqlError>(())
//! ```
//!
//! Every builder returns a new tree, so a base table can be shared by any
//! number of derived queries. Compilation works on a private copy and adds
//! an implicit `SELECT *` where no projection was given. It also turns the
//! first selective, correlated `EXISTS` filter of the outer query into an
//! `IN` filter.

pub mod ast;
pub mod config;
pub mod engine;
pub mod error;
pub mod transpiler;

pub use error::{PdsqlError, PdsqlResult};

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::engine::{Driver, ResultRow, ResultSet, SqlxDriver};
    pub use crate::error::*;
    pub use crate::transpiler::ToSql;
}

/// Compile a table or column tree to SQL.
///
/// # Example
///
/// ```
/// use pdsql::ast::Table;
///
/// let t1 = Table::new("t1");
/// assert_eq!(pdsql::compile(&t1).unwrap(), "SELECT * FROM t1;");
/// assert_eq!(pdsql::compile(&t1.col("a").add(1)).unwrap(), "(t1.a + 1);");
/// ```
pub fn compile<T: transpiler::ToSql>(node: &T) -> PdsqlResult<String> {
    node.to_sql()
}
