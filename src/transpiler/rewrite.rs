//! Rewrite passes run on the compiler's private copy of the tree.

use tracing::{debug, trace};

use crate::ast::*;

/// Give every reachable table without a projection a `SELECT *`.
///
/// Walks subquery sources, set operation arms, joins, `where_exists`
/// subqueries and subqueries nested in column operands.
pub fn implicit_projection(table: &mut Table) {
    match &mut table.source {
        Source::Named(_) => {}
        Source::Subquery(query) => implicit_projection(query),
        Source::Set(set) => {
            implicit_projection(&mut set.left);
            implicit_projection(&mut set.right);
            return;
        }
    }

    for op in &mut table.operations {
        match op {
            Operation::Select(projections) => {
                for projection in projections {
                    implicit_projection_operand(&mut projection.expr);
                }
            }
            Operation::Where(col)
            | Operation::Group(col)
            | Operation::Having(col)
            | Operation::Order(col) => implicit_projection_column(col),
            Operation::WhereExists(sub) => implicit_projection(sub),
            Operation::Join(join) => {
                implicit_projection(&mut join.table);
                if let Some(on) = &mut join.on {
                    implicit_projection_column(on);
                }
            }
        }
    }

    if !table.has_operation(OperationKind::Select) {
        trace!(table = %table.reference(), "adding implicit projection");
        table
            .operations
            .push(Operation::Select(vec![Column::star().into()]));
    }
}

/// Apply [`implicit_projection`] to subqueries inside a column expression.
pub fn implicit_projection_column(col: &mut Column) {
    if let Some(bin) = &mut col.binary {
        implicit_projection_operand(&mut bin.left);
        implicit_projection_operand(&mut bin.right);
    }
}

fn implicit_projection_operand(operand: &mut Operand) {
    match operand {
        Operand::Column(col) => implicit_projection_column(col),
        Operand::Table(table) => implicit_projection(table),
        Operand::Value(_) => {}
    }
}

/// Rewrite the first selective, correlated `where_exists` of the root into
/// an `IN` filter.
///
/// A subquery qualifies when its filters contain both an equality between
/// one of its own columns and a literal, and an equality between an outer
/// column and one of its own columns. The correlating equality is removed,
/// the subquery projects its side of it, and the outer query filters on
/// `outer_column IN (subquery)`. Only the root is inspected and at most one
/// subquery is rewritten per call. Returns whether a rewrite happened.
pub fn exists_to_in(root: &mut Table) -> bool {
    if matches!(root.source, Source::Set(_)) {
        return false;
    }
    let outer = root.reference();

    for idx in 0..root.operations.len() {
        let Operation::WhereExists(sub) = &root.operations[idx] else {
            continue;
        };
        let Some((where_idx, outer_col, inner_col)) = find_correlation(&outer, sub) else {
            continue;
        };

        let mut sub = sub.clone();
        sub.operations.remove(where_idx);
        sub.operations
            .retain(|op| !matches!(op, Operation::Select(_)));
        sub.operations
            .push(Operation::Select(vec![inner_col.into()]));

        debug!(
            outer = %outer,
            inner = %sub.reference(),
            column = %outer_col,
            "rewriting EXISTS subquery as IN"
        );
        root.operations.remove(idx);
        root.operations.push(Operation::Where(outer_col.is_in(sub)));
        return true;
    }
    false
}

/// Locate the correlating filter of `sub` against `outer`.
///
/// Returns its position in the subquery's log with the outer and inner
/// columns, provided the subquery also has a selective equality.
fn find_correlation(outer: &TableRef, sub: &Table) -> Option<(usize, Column, Column)> {
    let inner = sub.reference();
    if outer.qualifier().is_none() || inner.qualifier().is_none() || *outer == inner {
        return None;
    }
    let owned_by = |col: &Column, table: &TableRef| col.owner() == Some(table);

    let mut selective = false;
    let mut correlating = None;

    for (idx, op) in sub.operations.iter().enumerate() {
        let Operation::Where(cond) = op else {
            continue;
        };
        let Some(bin) = equality(cond) else {
            continue;
        };
        let left = bin.left.as_column().filter(|c| c.is_bare());
        let right = bin.right.as_column().filter(|c| c.is_bare());

        match (left, right) {
            (Some(l), Some(r)) if correlating.is_none() => {
                if owned_by(l, outer) && owned_by(r, &inner) {
                    correlating = Some((idx, l.clone(), r.clone()));
                } else if owned_by(r, outer) && owned_by(l, &inner) {
                    correlating = Some((idx, r.clone(), l.clone()));
                }
            }
            (Some(c), None) if bin.right.is_literal() && owned_by(c, &inner) => selective = true,
            (None, Some(c)) if bin.left.is_literal() && owned_by(c, &inner) => selective = true,
            _ => {}
        }
    }

    if selective { correlating } else { None }
}

/// The binary node of a plain `=` condition.
fn equality(cond: &Column) -> Option<&BinaryExpr> {
    if !cond.funcs().is_empty() || cond.null_check() != NullCheck::Unset {
        return None;
    }
    cond.binary_expr().filter(|bin| bin.op == BinaryOp::Eq)
}
