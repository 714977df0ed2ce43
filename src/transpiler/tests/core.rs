use pretty_assertions::assert_eq;

use crate::ast::*;
use crate::error::PdsqlError;
use crate::transpiler::ToSql;

#[test]
fn test_select_star_default() {
    assert_eq!(Table::new("t1").compile().unwrap(), "SELECT * FROM t1;");
}

#[test]
fn test_select() {
    let t1 = Table::new("t1");
    assert_eq!(
        t1.select(Vec::<Column>::new()).compile().unwrap(),
        "SELECT * FROM t1;"
    );
    assert_eq!(
        t1.select([t1.col("c1")]).compile().unwrap(),
        "SELECT t1.c1 FROM t1;"
    );
    assert_eq!(
        t1.select([("c1", t1.col("c1"))]).compile().unwrap(),
        "SELECT t1.c1 AS \"c1\" FROM t1;"
    );
    assert_eq!(
        t1.select([t1.col("c1"), t1.col("c2")]).compile().unwrap(),
        "SELECT t1.c1 , t1.c2 FROM t1;"
    );
    assert_eq!(
        t1.select::<_, Projection>([t1.col("c1").into(), ("c2", t1.col("c2")).into()])
            .compile()
            .unwrap(),
        "SELECT t1.c1 , t1.c2 AS \"c2\" FROM t1;"
    );
    assert_eq!(
        t1.select([("c1", t1.col("c1")), ("c2", t1.col("c2"))])
            .compile()
            .unwrap(),
        "SELECT t1.c1 AS \"c1\" , t1.c2 AS \"c2\" FROM t1;"
    );
}

#[test]
fn test_repeated_select_appends() {
    let t1 = Table::new("t1");
    let q = t1.select([t1.col("a")]).select_as("b2", t1.col("b"));
    assert_eq!(q.compile().unwrap(), "SELECT t1.a , t1.b AS \"b2\" FROM t1;");
}

#[test]
fn test_distinct() {
    let t1 = Table::new("t1");
    assert_eq!(
        t1.select([t1.col("col")]).distinct().compile().unwrap(),
        "SELECT DISTINCT t1.col FROM t1;"
    );
}

#[test]
fn test_is_null() {
    let t1 = Table::new("t1");
    let col = t1.col("col");
    assert_eq!(
        t1.where_(col.is_null().unwrap()).unwrap().compile().unwrap(),
        "SELECT * FROM t1 WHERE (t1.col IS NULL);"
    );
    assert_eq!(
        t1.where_(col.not_null().unwrap()).unwrap().compile().unwrap(),
        "SELECT * FROM t1 WHERE (t1.col IS NOT NULL);"
    );
    assert!(matches!(
        col.not_null().unwrap().is_null(),
        Err(PdsqlError::DuplicateOperator(_))
    ));
}

#[test]
fn test_limiting() {
    let t1 = Table::new("t1");
    let query = t1.select([t1.col("c")]).order(t1.col("c")).unwrap();
    assert_eq!(
        query.row(0).unwrap().compile().unwrap(),
        "SELECT t1.c FROM t1 ORDER BY t1.c ASC LIMIT 1;"
    );
    assert_eq!(
        query.row(-1).unwrap().compile().unwrap(),
        "SELECT t1.c FROM t1 ORDER BY t1.c DESC LIMIT 1;"
    );
    assert_eq!(
        query.rows(..5).unwrap().compile().unwrap(),
        "SELECT t1.c FROM t1 ORDER BY t1.c ASC LIMIT 5;"
    );
    assert_eq!(
        query.rows(-5..).unwrap().compile().unwrap(),
        "SELECT t1.c FROM t1 ORDER BY t1.c DESC LIMIT 5;"
    );
}

#[test]
fn test_reverse() {
    let t1 = Table::new("t1");
    let query = t1.select([t1.col("c")]).order(t1.col("c")).unwrap();
    assert_eq!(
        query.compile().unwrap(),
        "SELECT t1.c FROM t1 ORDER BY t1.c ASC;"
    );
    let query = query.reverse();
    assert_eq!(
        query.compile().unwrap(),
        "SELECT t1.c FROM t1 ORDER BY t1.c DESC;"
    );
    let query = query.reverse();
    assert_eq!(
        query.compile().unwrap(),
        "SELECT t1.c FROM t1 ORDER BY t1.c ASC;"
    );
}

#[test]
fn test_reverse_without_order() {
    let t1 = Table::new("t1");
    assert_eq!(t1.reverse().compile().unwrap(), "SELECT * FROM t1;");
    assert_eq!(
        t1.row(-1).unwrap().compile().unwrap(),
        "SELECT * FROM t1 LIMIT 1;"
    );
}

#[test]
fn test_order_by_several_columns() {
    let t1 = Table::new("t1");
    let q = t1
        .order(t1.col("a"))
        .unwrap()
        .order(t1.col("b"))
        .unwrap()
        .reverse();
    assert_eq!(
        q.compile().unwrap(),
        "SELECT * FROM t1 ORDER BY t1.a , t1.b DESC;"
    );
}

#[test]
fn test_group() {
    let t1 = Table::new("t1");
    let col = t1.col("col");
    assert!(matches!(
        t1.having(col.eq(1)).compile(),
        Err(PdsqlError::MissingGroupBy(t)) if t == "t1"
    ));
    assert_eq!(
        t1.group(col.clone()).unwrap().having(col.eq(1)).compile().unwrap(),
        "SELECT * FROM t1 GROUP BY t1.col HAVING (t1.col = 1);"
    );
}

#[test]
fn test_missing_group_by_in_subquery() {
    let t1 = Table::new("t1");
    let t2 = Table::new("t2");
    let sub = t2.having(t2.count().gt(1));
    let q = t1.where_(t1.col("a").is_in(sub)).unwrap();
    assert!(matches!(q.compile(), Err(PdsqlError::MissingGroupBy(_))));
}

#[test]
fn test_aggregation() {
    let c = Table::new("counties");
    let statecode = c.col("statecode");
    let q = c
        .group(statecode.clone())
        .unwrap()
        .select([statecode.clone(), c.count()])
        .order(statecode.clone())
        .unwrap();
    assert_eq!(
        q.compile().unwrap(),
        "SELECT counties.statecode , COUNT(*) FROM counties GROUP BY counties.statecode \
         ORDER BY counties.statecode ASC;"
    );

    let q = c
        .group(statecode.clone())
        .unwrap()
        .having(c.count().gt(10))
        .select([statecode]);
    assert_eq!(
        q.compile().unwrap(),
        "SELECT counties.statecode FROM counties GROUP BY counties.statecode \
         HAVING (COUNT(*) > 10);"
    );
}

#[test]
fn test_function_order() {
    let t1 = Table::new("t1");
    let x = t1.col("x");
    let compile = |col: Column| t1.select([col]).compile().unwrap();
    assert_eq!(
        compile(x.abs().unwrap().ceil().unwrap()),
        "SELECT CEIL(ABS(t1.x)) FROM t1;"
    );
    assert_eq!(
        compile(x.sum().unwrap().abs().unwrap()),
        "SELECT ABS(SUM(t1.x)) FROM t1;"
    );
    assert_eq!(
        compile(x.abs().unwrap().sum().unwrap()),
        "SELECT SUM(ABS(t1.x)) FROM t1;"
    );
}

#[test]
fn test_binary_operators() {
    let t1 = Table::new("t1");
    let a = t1.col("a");
    let b = t1.col("b");
    let compile = |col: Column| t1.select([col]).compile().unwrap();
    assert_eq!(compile(a.sub(b.clone())), "SELECT (t1.a - t1.b) FROM t1;");
    assert_eq!(compile(a.concat(b.clone())), "SELECT (t1.a + t1.b) FROM t1;");
    assert_eq!(compile(a.modulo(2)), "SELECT MOD(t1.a , 2) FROM t1;");
    assert_eq!(
        compile(a.mul(b.clone()).div(4)),
        "SELECT ((t1.a * t1.b) / 4) FROM t1;"
    );
    assert_eq!(
        compile(a.sub(b).abs().unwrap()),
        "SELECT ABS(t1.a - t1.b) FROM t1;"
    );
}

#[test]
fn test_conditions() {
    let t1 = Table::new("t1");
    let not_in = t1
        .col("col2")
        .is_in(Value::list(["a", "b"]))
        .not()
        .unwrap();
    assert_eq!(
        t1.where_(not_in.clone()).unwrap().compile().unwrap(),
        "SELECT * FROM t1 WHERE (NOT(t1.col2 IN ('a','b')));"
    );

    let either = t1.col("col1").eq(4).or(not_in);
    assert_eq!(
        t1.where_(either).unwrap().compile().unwrap(),
        "SELECT * FROM t1 WHERE ((t1.col1 = 4) OR NOT(t1.col2 IN ('a','b')));"
    );

    assert_eq!(
        t1.where_(t1.col("x").between(1, 5)).unwrap().compile().unwrap(),
        "SELECT * FROM t1 WHERE (t1.x BETWEEN 1 AND 5);"
    );
    assert_eq!(
        t1.where_(t1.col("name").like("Cal%")).unwrap().compile().unwrap(),
        "SELECT * FROM t1 WHERE (t1.name LIKE 'Cal%');"
    );
    assert_eq!(
        t1.where_(t1.col("name").ne("O'Brien")).unwrap().compile().unwrap(),
        "SELECT * FROM t1 WHERE (t1.name <> 'O''Brien');"
    );
}

#[test]
fn test_where_clauses_and_together() {
    let t1 = Table::new("t1");
    let q = t1
        .where_(t1.col("a").gt(1))
        .unwrap()
        .where_(t1.col("b").le(2.5))
        .unwrap();
    assert_eq!(
        q.compile().unwrap(),
        "SELECT * FROM t1 WHERE (t1.a > 1) AND (t1.b <= 2.5);"
    );
}

#[test]
fn test_join_on() {
    let c = Table::new("counties");
    let s = Table::new("states");
    let q = c
        .join_on(s.clone(), s.col("statecode").eq(c.col("statecode")))
        .unwrap()
        .where_(
            s.col("statecode")
                .eq("WV")
                .and(c.col("population_1950").gt(c.col("population_2010"))),
        )
        .unwrap()
        .select([
            c.col("name"),
            c.col("population_1950").sub(c.col("population_2010")),
        ]);
    assert_eq!(
        q.compile().unwrap(),
        "SELECT counties.name , (counties.population_1950 - counties.population_2010) \
         FROM counties INNER JOIN states ON (states.statecode = counties.statecode) \
         WHERE ((states.statecode = 'WV') AND (counties.population_1950 > counties.population_2010));"
    );
}

#[test]
fn test_self_join_with_aliases() {
    let pc = Table::aliased("committees", "pc");
    let sc = Table::aliased("committees", "sc");
    let q = sc
        .join_on(
            pc.clone(),
            pc.col("id")
                .eq(sc.col("parent_committee"))
                .and(pc.col("chairman").eq(sc.col("chairman"))),
        )
        .unwrap()
        .select([pc.col("id"), sc.col("id")]);
    assert_eq!(
        q.compile().unwrap(),
        "SELECT pc.id , sc.id FROM committees AS \"sc\" INNER JOIN committees AS \"pc\" \
         ON ((pc.id = sc.parent_committee) AND (pc.chairman = sc.chairman));"
    );
}

#[test]
fn test_join_filtered_table_as_subquery() {
    let t1 = Table::new("t1");
    let t2 = Table::new("t2");
    let q = t1.join(t2.where_(t2.col("x").eq(1)).unwrap());
    assert_eq!(
        q.compile().unwrap(),
        "SELECT * FROM t1 INNER JOIN (SELECT * FROM t2 WHERE (t2.x = 1)) AS \"t2\";"
    );
}

#[test]
fn test_subquery_source() {
    let c = Table::new("counties");
    let nc = Table::from_query(
        c.group(c.col("statecode"))
            .unwrap()
            .select_as("num_counties", c.count()),
    );
    let q = nc.select([nc.col("num_counties").avg().unwrap()]);
    assert_eq!(
        q.compile().unwrap(),
        "SELECT AVG(num_counties) FROM (SELECT COUNT(*) AS \"num_counties\" FROM counties \
         GROUP BY counties.statecode) AS \"sq1\";"
    );

    let named = nc.alias("nc");
    let q = named.select([named.col("num_counties").max().unwrap()]);
    assert_eq!(
        q.compile().unwrap(),
        "SELECT MAX(nc.num_counties) FROM (SELECT COUNT(*) AS \"num_counties\" FROM counties \
         GROUP BY counties.statecode) AS \"nc\";"
    );
}

#[test]
fn test_unaliased_derived_tables_get_names() {
    let t1 = Table::new("t1");
    let t2 = Table::new("t2");
    let c = Table::new("counties");

    let q = Table::from_query(c.select([c.col("statecode")]));
    assert_eq!(
        q.compile().unwrap(),
        "SELECT * FROM (SELECT counties.statecode FROM counties) AS \"sq1\";"
    );

    let q = t1.join(Table::from_query(t2.limit(3).unwrap()));
    assert_eq!(
        q.compile().unwrap(),
        "SELECT * FROM t1 INNER JOIN (SELECT * FROM t2 LIMIT 3) AS \"sq1\";"
    );

    let q = Table::from_query(t1.clone()).join(Table::new("t3").union(t2));
    assert_eq!(
        q.compile().unwrap(),
        "SELECT * FROM (SELECT * FROM t1) AS \"sq1\" \
         INNER JOIN (SELECT * FROM t3 UNION SELECT * FROM t2) AS \"sq2\";"
    );
}

#[test]
fn test_generated_names_restart_per_compile() {
    let c = Table::new("counties");
    let q = Table::from_query(c.clone());
    let first = q.compile().unwrap();
    assert_eq!(first, "SELECT * FROM (SELECT * FROM counties) AS \"sq1\";");
    assert_eq!(Table::from_query(c).to_sql().unwrap(), first);
}

#[test]
fn test_mixed_case_alias_quoted_consistently() {
    let pc = Table::aliased("committees", "PC");
    let q = pc.select([pc.col("id")]);
    assert_eq!(
        q.compile().unwrap(),
        "SELECT \"PC\".id FROM committees AS \"PC\";"
    );

    // lowercase aliases fold to themselves and stay bare
    let sc = Table::aliased("committees", "sc_2");
    assert_eq!(
        sc.select([sc.col("id")]).compile().unwrap(),
        "SELECT sc_2.id FROM committees AS \"sc_2\";"
    );
}

#[test]
fn test_non_finite_float_literal() {
    let t1 = Table::new("t1");
    assert_eq!(
        t1.where_(t1.col("x").lt(f64::INFINITY)).unwrap().compile().unwrap(),
        "SELECT * FROM t1 WHERE (t1.x < NULL);"
    );
}

#[test]
fn test_scalar_subquery_operand() {
    let c = Table::new("counties");
    let s = Table::new("states");
    let pop_sums = c
        .where_(c.col("statecode").eq(s.col("statecode")))
        .unwrap()
        .select([c.col("population_2010").sum().unwrap()]);
    let q = s
        .where_(s.col("population_2010").ne(pop_sums))
        .unwrap()
        .select([s.col("statecode")]);
    assert_eq!(
        q.compile().unwrap(),
        "SELECT states.statecode FROM states WHERE (states.population_2010 <> \
         (SELECT SUM(counties.population_2010) FROM counties \
         WHERE (counties.statecode = states.statecode)));"
    );
}

#[test]
fn test_not_in_subquery() {
    let s = Table::new("states");
    let se = Table::new("senators");
    let co = Table::new("committees");
    let with_chairmen = se
        .join_on(co.clone(), se.col("name").eq(co.col("chairman")))
        .unwrap()
        .select([se.col("statecode")]);
    let q = s
        .where_(s.col("statecode").is_in(with_chairmen).not().unwrap())
        .unwrap()
        .select([s.col("statecode")]);
    assert_eq!(
        q.compile().unwrap(),
        "SELECT states.statecode FROM states WHERE (NOT(states.statecode IN \
         (SELECT senators.statecode FROM senators INNER JOIN committees \
         ON (senators.name = committees.chairman))));"
    );
}

#[test]
fn test_literal_projection() {
    let t1 = Table::new("t1");
    assert_eq!(t1.select([1]).compile().unwrap(), "SELECT 1 FROM t1;");
}

#[test]
fn test_compile_column() {
    let t1 = Table::new("t1");
    assert_eq!(t1.col("a").add(1).to_sql().unwrap(), "(t1.a + 1);");
    assert_eq!(Column::new("x").sum().unwrap().to_sql().unwrap(), "SUM(x);");
    assert_eq!(
        crate::compile(&t1.col("a").is_null().unwrap()).unwrap(),
        "t1.a IS NULL;"
    );
}

#[test]
fn test_immutability() {
    let t1 = Table::new("t1");
    let base = t1.select([t1.col("c")]);
    let before = base.compile().unwrap();

    let _ = base.where_(t1.col("c").eq(1)).unwrap();
    let _ = base.limit(3).unwrap();
    let _ = base.reverse().distinct();
    let _ = base.union(Table::new("t2"));

    assert_eq!(base.compile().unwrap(), before);
    assert_eq!(Table::new("t1").select([t1.col("c")]).compile().unwrap(), before);
}

#[test]
fn test_compile_leaves_tree_untouched() {
    let t1 = Table::new("t1");
    let q = t1.join(Table::new("t2"));
    q.compile().unwrap();
    assert!(!q.has_operation(OperationKind::Select));
    match &q.operations()[0] {
        Operation::Join(join) => assert!(join.table.operations().is_empty()),
        other => panic!("unexpected operation {:?}", other.kind()),
    }
}

#[test]
fn test_idempotent_compile() {
    let t1 = Table::new("t1");
    let q = t1
        .where_(t1.col("a").eq("x"))
        .unwrap()
        .order(t1.col("a"))
        .unwrap();
    let first = q.compile().unwrap();
    assert_eq!(q.compile().unwrap(), first);
    assert_eq!(q.to_sql().unwrap(), first);
}
