//! SQL compiler for PDSQL trees.
//!
//! Compilation clones the input, runs the rewrite passes on the clone and
//! then emits a flat token list joined by single spaces. Nested statements
//! are wrapped in one pair of parentheses; the top-level statement is not.

pub mod rewrite;

#[cfg(test)]
mod tests;

use tracing::trace;

use crate::ast::column::STAR;
use crate::ast::*;
use crate::error::{PdsqlError, PdsqlResult};

/// Trait for converting AST nodes to SQL.
pub trait ToSql {
    /// Compile this node into a `;`-terminated SQL statement.
    fn to_sql(&self) -> PdsqlResult<String>;
}

impl ToSql for Table {
    fn to_sql(&self) -> PdsqlResult<String> {
        let mut root = self.clone();
        rewrite::implicit_projection(&mut root);
        rewrite::exists_to_in(&mut root);

        let mut names = DerivedNames::default();
        let sql = format!("{};", root.statement_tokens(&mut names)?.join(" "));
        trace!(sql = %sql, "compiled table");
        Ok(sql)
    }
}

impl ToSql for Column {
    fn to_sql(&self) -> PdsqlResult<String> {
        let mut root = self.clone();
        rewrite::implicit_projection_column(&mut root);

        let mut names = DerivedNames::default();
        let sql = format!("{};", root.tokens(&mut names)?.join(" "));
        trace!(sql = %sql, "compiled column");
        Ok(sql)
    }
}

/// Correlation names for derived tables that have no alias, unique within
/// one compile call.
#[derive(Default)]
struct DerivedNames {
    count: usize,
}

impl DerivedNames {
    fn next(&mut self) -> String {
        self.count += 1;
        format!("sq{}", self.count)
    }
}

impl Table {
    /// Tokens of this statement, without enclosing parentheses.
    fn statement_tokens(&self, names: &mut DerivedNames) -> PdsqlResult<Vec<String>> {
        if let Source::Set(set) = &self.source {
            return self.set_tokens(set, names);
        }

        if self.has_operation(OperationKind::Having) && !self.has_operation(OperationKind::Group) {
            return Err(PdsqlError::MissingGroupBy(self.reference().to_string()));
        }

        let source = self.source_tokens(names)?;
        let mut projections = Vec::new();
        let mut joins = Vec::new();
        let mut exists = Vec::new();
        let mut filters = Vec::new();
        let mut groups = Vec::new();
        let mut havings = Vec::new();
        let mut orders = Vec::new();

        for op in &self.operations {
            match op {
                Operation::Select(list) => {
                    for projection in list {
                        projections.push(projection.tokens(names)?);
                    }
                }
                Operation::Join(join) => {
                    let mut tokens = vec!["INNER JOIN".to_string()];
                    tokens.extend(join.table.join_target_tokens(names)?);
                    if let Some(on) = &join.on {
                        tokens.push("ON".to_string());
                        tokens.extend(on.tokens(names)?);
                    }
                    joins.push(tokens);
                }
                Operation::WhereExists(sub) => exists.push(clause(&[
                    "EXISTS".to_string(),
                    sub.subquery(names)?,
                ])),
                Operation::Where(cond) => filters.push(clause(&cond.tokens(names)?)),
                Operation::Group(col) => groups.push(col.tokens(names)?),
                Operation::Having(cond) => havings.push(clause(&cond.tokens(names)?)),
                Operation::Order(col) => orders.push(col.tokens(names)?),
            }
        }

        let mut tokens = vec!["SELECT".to_string()];
        if self.distinct {
            tokens.push("DISTINCT".to_string());
        }
        if projections.is_empty() {
            projections.push(vec![STAR.to_string()]);
        }
        tokens.extend(join_list(projections, ","));

        tokens.push("FROM".to_string());
        tokens.extend(source);
        tokens.extend(joins.into_iter().flatten());

        // EXISTS clauses precede plain filters
        exists.extend(filters);
        if !exists.is_empty() {
            tokens.push("WHERE".to_string());
            tokens.extend(join_list(exists.into_iter().map(|c| vec![c]), "AND"));
        }

        if !groups.is_empty() {
            tokens.push("GROUP BY".to_string());
            tokens.extend(join_list(groups, ","));
        }

        if !havings.is_empty() {
            tokens.push("HAVING".to_string());
            tokens.extend(join_list(havings.into_iter().map(|c| vec![c]), "AND"));
        }

        tokens.extend(self.order_limit_tokens(orders));
        Ok(tokens)
    }

    /// `left OP right [ORDER BY ...] [LIMIT n]`.
    ///
    /// Only ordering may be logged on a set operation; anything else has to
    /// go through [`Table::from_query`]. `distinct` adds nothing since the
    /// set operators already remove duplicates.
    fn set_tokens(&self, set: &SetOperation, names: &mut DerivedNames) -> PdsqlResult<Vec<String>> {
        let mut orders = Vec::new();
        for op in &self.operations {
            match op {
                Operation::Order(col) => orders.push(col.tokens(names)?),
                other => {
                    return Err(PdsqlError::TypeMismatch(format!(
                        "{} on a {} result; wrap it with Table::from_query",
                        other.kind(),
                        set.op
                    )));
                }
            }
        }

        let mut tokens = set.left.set_arm_tokens(names)?;
        tokens.push(set.op.to_string());
        tokens.extend(set.right.set_arm_tokens(names)?);
        tokens.extend(self.order_limit_tokens(orders));
        Ok(tokens)
    }

    /// An arm that orders or limits its own rows is nested as a derived
    /// table, since those clauses would otherwise bind to the whole set.
    fn set_arm_tokens(&self, names: &mut DerivedNames) -> PdsqlResult<Vec<String>> {
        if self.limit.is_none() && !self.has_operation(OperationKind::Order) {
            return self.statement_tokens(names);
        }
        let name = names.next();
        Ok(vec![
            "SELECT".to_string(),
            STAR.to_string(),
            "FROM".to_string(),
            self.subquery(names)?,
            "AS".to_string(),
            quote_identifier(&name),
        ])
    }

    fn order_limit_tokens(&self, orders: Vec<Vec<String>>) -> Vec<String> {
        let mut tokens = Vec::new();
        if !orders.is_empty() {
            tokens.push("ORDER BY".to_string());
            tokens.extend(join_list(orders, ","));
            tokens.push(if self.reverse { "DESC" } else { "ASC" }.to_string());
        }
        if let Some(n) = self.limit {
            tokens.push("LIMIT".to_string());
            tokens.push(n.to_string());
        }
        tokens
    }

    /// This statement as a single parenthesized token.
    fn subquery(&self, names: &mut DerivedNames) -> PdsqlResult<String> {
        Ok(format!("({})", self.statement_tokens(names)?.join(" ")))
    }

    fn source_tokens(&self, names: &mut DerivedNames) -> PdsqlResult<Vec<String>> {
        let alias = match (&self.alias, &self.source) {
            (Some(alias), _) => Some(alias.clone()),
            (None, Source::Named(_)) => None,
            (None, _) => Some(names.next()),
        };
        let mut tokens = match &self.source {
            Source::Named(name) => vec![name.clone()],
            Source::Subquery(query) => vec![query.subquery(names)?],
            Source::Set(_) => vec![self.subquery(names)?],
        };
        if let Some(alias) = alias {
            tokens.push("AS".to_string());
            tokens.push(quote_identifier(&alias));
        }
        Ok(tokens)
    }

    /// A joined table that only projects is referenced by name; anything
    /// else is joined as a subquery named after its qualifier.
    fn join_target_tokens(&self, names: &mut DerivedNames) -> PdsqlResult<Vec<String>> {
        let plain = !matches!(self.source, Source::Set(_))
            && self.limit.is_none()
            && !self.distinct
            && self
                .operations
                .iter()
                .all(|op| matches!(op, Operation::Select(_)));
        if plain {
            return self.source_tokens(names);
        }

        let name = match self.reference().qualifier() {
            Some(qualifier) => qualifier.to_string(),
            None => names.next(),
        };
        Ok(vec![
            self.subquery(names)?,
            "AS".to_string(),
            quote_identifier(&name),
        ])
    }
}

impl Projection {
    fn tokens(&self, names: &mut DerivedNames) -> PdsqlResult<Vec<String>> {
        let mut tokens = vec![self.expr.to_sql_fragment(names)?];
        if let Some(alias) = &self.alias {
            tokens.push("AS".to_string());
            tokens.push(quote_identifier(alias));
        }
        Ok(tokens)
    }
}

impl Column {
    fn tokens(&self, names: &mut DerivedNames) -> PdsqlResult<Vec<String>> {
        let mut tokens = match &self.binary {
            Some(bin) => vec![bin.to_sql_fragment(names)?],
            None => vec![self.reference_sql()],
        };

        for func in &self.funcs {
            let inner = tokens.join(" ");
            let inner = if is_enclosed(&inner) {
                &inner[1..inner.len() - 1]
            } else {
                inner.as_str()
            };
            tokens = vec![format!("{}({})", func, inner)];
        }

        if let Some(suffix) = self.null_check.sql_suffix() {
            tokens.push(suffix.to_string());
        }
        Ok(tokens)
    }

    /// `qualifier.name`. An alias is quoted here exactly when its
    /// declaration would not fold to the same identifier unquoted.
    fn reference_sql(&self) -> String {
        let Some(owner) = &self.owner else {
            return self.name.clone();
        };
        match (&owner.alias, owner.qualifier()) {
            _ if self.is_count_star() => self.name.clone(),
            (Some(alias), _) if !is_plain_identifier(alias) => {
                format!("{}.{}", quote_identifier(alias), self.name)
            }
            (_, Some(qualifier)) => format!("{}.{}", qualifier, self.name),
            (_, None) => self.name.clone(),
        }
    }
}

impl BinaryExpr {
    fn to_sql_fragment(&self, names: &mut DerivedNames) -> PdsqlResult<String> {
        let left = self.left.to_sql_fragment(names)?;
        let symbol = self.op.sql_symbol();

        if self.op.is_function() {
            let right = self.right.to_sql_fragment(names)?;
            return Ok(format!("{}({} , {})", symbol, left, right));
        }

        let right = match (&self.op, &self.right) {
            (BinaryOp::Between, Operand::Column(range)) => match range.binary_expr() {
                Some(bounds) if bounds.op == BinaryOp::And && range.funcs.is_empty() => format!(
                    "{} AND {}",
                    bounds.left.to_sql_fragment(names)?,
                    bounds.right.to_sql_fragment(names)?
                ),
                _ => self.right.to_sql_fragment(names)?,
            },
            _ => self.right.to_sql_fragment(names)?,
        };
        Ok(format!("({} {} {})", left, symbol, right))
    }
}

impl Operand {
    fn to_sql_fragment(&self, names: &mut DerivedNames) -> PdsqlResult<String> {
        match self {
            Operand::Column(col) => Ok(col.tokens(names)?.join(" ")),
            Operand::Value(value) => Ok(value.to_string()),
            Operand::Table(table) => table.subquery(names),
        }
    }
}

/// A WHERE or HAVING clause, parenthesized unless already enclosed.
fn clause(tokens: &[String]) -> String {
    let text = tokens.join(" ");
    if is_enclosed(&text) {
        text
    } else {
        format!("({})", text)
    }
}

/// Interleave token groups with a separator token.
fn join_list<I>(groups: I, separator: &str) -> Vec<String>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut tokens = Vec::new();
    for (i, group) in groups.into_iter().enumerate() {
        if i > 0 {
            tokens.push(separator.to_string());
        }
        tokens.extend(group);
    }
    tokens
}

/// True if the first `(` closes at the last character.
fn is_enclosed(text: &str) -> bool {
    if !(text.starts_with('(') && text.ends_with(')')) {
        return false;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    for (i, ch) in text.char_indices() {
        match ch {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth -= 1;
                if depth == 0 && i != text.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Lowercase identifier that case-folding engines leave unchanged.
fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Quote an alias as a delimited identifier.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
