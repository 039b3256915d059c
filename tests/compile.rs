use relquery::ast::resolve::THIS;
use relquery::ast::table::{JoinKind, UnionKind};
use relquery::ast::{Stmt, TableOps, TablePath};
use relquery::compiler::{Compiler, Dialect};
use relquery::schema::{ColumnType, Schema};

fn users() -> relquery::TableRef {
    TablePath::at(
        vec!["users".to_string()],
        Some(Schema::new(vec![
            ("id".to_string(), ColumnType::Int),
            ("age".to_string(), ColumnType::Int),
        ])),
    )
}

fn orders() -> relquery::TableRef {
    TablePath::at(
        vec!["orders".to_string()],
        Some(Schema::new(vec![
            ("id".to_string(), ColumnType::Int),
            ("user_id".to_string(), ColumnType::Int),
            ("amount".to_string(), ColumnType::Float),
        ])),
    )
}

#[test]
fn select_where_order_by_limit_chain() {
    let query = users()
        .r#where(vec![Some(THIS.col("age").ge(18))])
        .unwrap()
        .order_by(vec![Some(THIS.col("age"))])
        .unwrap()
        .limit(10)
        .unwrap();

    let sql = Compiler::new(Dialect::Generic).compile(&query).unwrap();
    assert!(sql.contains("WHERE"));
    assert!(sql.contains("ORDER BY"));
    assert!(sql.contains("LIMIT 10"));
}

#[test]
fn select_concat_appends_projections() {
    let query = users()
        .select(vec![Some(users().get("id").unwrap())])
        .unwrap()
        .select_concat(vec![Some(users().get("age").unwrap())])
        .unwrap();

    let sql = Compiler::new(Dialect::Generic).compile(&query).unwrap();
    assert!(sql.contains("\"id\""));
    assert!(sql.contains("\"age\""));
}

#[test]
fn join_qualifies_columns_from_both_sides() {
    let u = users();
    let o = orders();
    let on = vec![u.get("id").unwrap().eq_expr(o.get("user_id").unwrap())];
    let joined = u.join(o, JoinKind::Inner, on);

    let sql = Compiler::new(Dialect::Generic).compile(&joined).unwrap();
    assert!(sql.contains("JOIN"));
    assert!(sql.contains("\"users\".\"id\""));
    assert!(sql.contains("\"orders\".\"user_id\""));
}

#[test]
fn union_of_two_selects_compiles_with_keyword() {
    let a = users().select(vec![Some(users().get("id").unwrap())]).unwrap();
    let b = users().select(vec![Some(users().get("id").unwrap())]).unwrap();
    let combined = a.union(b, UnionKind::UnionAll).unwrap();

    let sql = Compiler::new(Dialect::Generic).compile(&combined).unwrap();
    assert!(sql.contains("UNION ALL"));
}

#[test]
fn cte_surfaces_as_leading_with_clause() {
    let cte = users()
        .r#where(vec![Some(THIS.col("age").ge(21))])
        .unwrap()
        .cte("adults");
    let query = cte.select(vec![Some(cte.get("id").unwrap())]).unwrap();

    let sql = Compiler::new(Dialect::Generic).compile(&query).unwrap();
    assert!(sql.starts_with("WITH \"adults\" AS ("));
    assert!(sql.contains("SELECT \"adults\".\"id\"") || sql.contains("FROM \"adults\""));
}

#[test]
fn count_wraps_table_in_count_select() {
    let query = users().count();
    let sql = Compiler::new(Dialect::Generic).compile(&query).unwrap();
    assert!(sql.contains("count(*)"));
    assert!(!sql.contains("AS \"count\""));
}

#[test]
fn join_on_appends_conditions_incrementally() {
    let u = users();
    let o = orders();
    let joined = u
        .join(o.clone(), JoinKind::Inner, vec![])
        .on(vec![u.get("id").unwrap().eq_expr(o.get("user_id").unwrap())])
        .unwrap();

    let sql = Compiler::new(Dialect::Generic).compile(&joined).unwrap();
    assert!(sql.contains("ON (\"users\".\"id\" = \"orders\".\"user_id\")"));
}

#[test]
fn on_fails_on_a_non_join_table() {
    assert!(users().on(vec![]).is_err());
}

#[test]
fn join_select_sets_projection_in_place_without_nesting() {
    let u = users();
    let o = orders();
    let joined = u.join(o.clone(), JoinKind::Inner, vec![u.get("id").unwrap().eq_expr(o.get("user_id").unwrap())]);

    let first = joined.select(vec![Some(u.get("id").unwrap())]).unwrap();
    assert!(matches!(first.as_ref(), relquery::ast::table::TableNode::Join { .. }));

    // A second `select` replaces the join's own projection instead of
    // wrapping it in a further `Select`.
    let second = first.select(vec![Some(o.get("amount").unwrap())]).unwrap();
    assert!(matches!(second.as_ref(), relquery::ast::table::TableNode::Join { .. }));

    let sql = Compiler::new(Dialect::Generic).compile(&second).unwrap();
    assert!(sql.starts_with("SELECT \"orders\".\"amount\" FROM"));
}

#[test]
fn select_over_join_wraps_it_in_parens_with_an_alias() {
    let u = users();
    let o = orders();
    let joined = u.join(o.clone(), JoinKind::Inner, vec![u.get("id").unwrap().eq_expr(o.get("user_id").unwrap())]);

    let sql = Compiler::new(Dialect::Generic).compile(&joined.count()).unwrap();
    assert!(sql.contains("FROM (SELECT * FROM"));
    assert!(sql.contains("JOIN"));
    assert!(sql.contains(") AS \"tmp"));
}

#[test]
fn self_join_on_shared_identity_column_is_ambiguous() {
    let u = users();
    let joined = u.join(u.clone(), JoinKind::Inner, vec![]);
    let query = joined.select(vec![Some(u.get("id").unwrap())]).unwrap();

    let err = Compiler::new(Dialect::Generic).compile(&query);
    assert!(err.is_err());
}

#[test]
fn get_normalizes_to_schemas_actual_casing() {
    let t = TablePath::at(
        vec!["people".to_string()],
        Some(Schema::new(vec![("Name".to_string(), ColumnType::Text)]).case_insensitive()),
    );
    let col = t.get("name").unwrap();
    match col {
        relquery::Expr::Column { name, .. } => assert_eq!(name, "Name"),
        other => panic!("expected Column, got {other:?}"),
    }
}

#[test]
fn reserved_operations_fail_as_not_implemented() {
    assert!(users().group_by(vec![]).is_err());
    assert!(users().insert_values(vec![], vec![]).is_err());
    assert!(users().with_schema(Schema::new(vec![])).is_err());
    assert!(users().at("2024-01-01").is_err());
}

#[test]
fn create_and_drop_table_statements() {
    let ctx = relquery::compiler::Context::root(Dialect::Generic.handler(), Default::default());

    let create = Stmt::CreateTable {
        table: users(),
        if_not_exists: true,
    };
    let sql = create.compile(&ctx).unwrap().unwrap();
    assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"users\""));

    let drop = Stmt::DropTable {
        table: users(),
        if_exists: true,
    };
    let sql = drop.compile(&ctx).unwrap().unwrap();
    assert_eq!(sql, "DROP TABLE IF EXISTS \"users\"");
}

#[test]
fn insert_to_table_renders_value_rows() {
    let ctx = relquery::compiler::Context::root(Dialect::Generic.handler(), Default::default());
    let insert = Stmt::InsertToTable {
        table: users(),
        columns: vec!["id".to_string(), "age".to_string()],
        rows: vec![
            vec![relquery::Expr::lit(1i64), relquery::Expr::lit(30i64)],
            vec![relquery::Expr::lit(2i64), relquery::Expr::lit(40i64)],
        ],
    };
    let sql = insert.compile(&ctx).unwrap().unwrap();
    assert_eq!(
        sql,
        "INSERT INTO \"users\" (\"id\", \"age\") VALUES (1, 30), (2, 40)"
    );
}

#[test]
fn mysql_dialect_quotes_with_backticks_and_uses_rand() {
    let query = users().select(vec![Some(relquery::ast::Expr::Random)]).unwrap();
    let sql = Compiler::new(Dialect::MySql).compile(&query).unwrap();
    assert!(sql.contains('`'));
    assert!(sql.contains("RAND()"));
}

#[test]
fn unresolved_placeholder_fails_to_compile() {
    let bare = relquery::ast::resolve::THIS.col("age");
    // Building a Select bypassing resolve_names isn't possible through the
    // public builder surface (every builder call resolves eagerly); this
    // instead checks direct compilation of an unbound placeholder errors.
    let ctx = relquery::compiler::Context::root(Dialect::Generic.handler(), Default::default());
    use relquery::compiler::Compilable;
    assert!(bare.compile(&ctx).is_err());
}
