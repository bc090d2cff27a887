use super::*;
use crate::condition::Condition;
use crate::dialect::Dialect;
use crate::error::OrmError;
use crate::row::Row;
use crate::value::Value;

#[test]
fn test_simple_select() {
    let mut qb = QueryBuilder::new();
    qb.from("student");
    assert_eq!(qb.to_sql().unwrap(), "SELECT *\nFROM \"student\"");
}

#[test]
fn test_select_columns() {
    let mut qb = QueryBuilder::new();
    qb.select("id, name, student.dorm_id").from("student");
    assert_eq!(
        qb.to_sql().unwrap(),
        "SELECT \"id\",\"name\",\"student\".\"dorm_id\"\nFROM \"student\""
    );
}

#[test]
fn test_select_function_untouched() {
    let mut qb = QueryBuilder::new();
    qb.select("COUNT(*) AS total").from("student");
    assert_eq!(
        qb.to_sql().unwrap(),
        "SELECT COUNT(*) AS total\nFROM \"student\""
    );
}

#[test]
fn test_join() {
    let mut qb = QueryBuilder::new();
    qb.select("s.*")
        .from(("student", "s"))
        .left_join(("dorm", "d"), &[("d.id", "s.dorm_id")]);
    assert_eq!(
        qb.to_sql().unwrap(),
        "SELECT \"s\".*\nFROM \"student\" AS s\nLEFT JOIN \"dorm\" AS d ON \"d\".\"id\" = \"s\".\"dorm_id\""
    );
}

#[test]
fn test_join_multiple_pairs() {
    let mut qb = QueryBuilder::new();
    qb.from("a").join(
        "b",
        &[("a.id", "b.a_id"), ("a.kind", "b.kind")],
        JoinType::Inner,
    );
    assert!(
        qb.to_sql()
            .unwrap()
            .ends_with("INNER JOIN \"b\" ON \"a\".\"id\" = \"b\".\"a_id\" AND \"a\".\"kind\" = \"b\".\"kind\"")
    );
}

#[test]
fn test_where_chain_conjunctions() {
    let mut qb = QueryBuilder::new();
    qb.from("student")
        .or_where(Condition::eq("a", 1))
        .and_where(Condition::eq("b", 2))
        .or_where(Condition::gt("c", 3))
        .and_where(Condition::is_null("d"));
    let built = qb.compile(false).unwrap();
    assert_eq!(
        built.sql(),
        "SELECT *\nFROM \"student\"\nWHERE ( \"a\" = ? ) AND ( \"b\" = ? ) OR ( \"c\" > ? ) AND ( \"d\" IS NULL )"
    );
    assert_eq!(
        built.params(),
        &[Value::Int(1), Value::Int(2), Value::Int(3)]
    );
}

#[test]
fn test_compile_clears_state() {
    let mut qb = QueryBuilder::new();
    qb.select("name")
        .from("student")
        .and_eq("id", 4)
        .order_by("name", Order::Asc)
        .limit(10);
    let first = qb.compile(false).unwrap();
    assert!(first.sql().contains("WHERE"));

    let second = qb.compile(false).unwrap();
    assert_eq!(second.sql(), "SELECT *\nFROM ");
    assert!(second.params().is_empty());
}

#[test]
fn test_compile_retained_keeps_state() {
    let mut qb = QueryBuilder::new();
    qb.from("student").and_eq("id", 4);
    let a = qb.compile_retained(false).unwrap();
    let b = qb.compile_retained(false).unwrap();
    assert_eq!(a, b);
    assert!(qb.has_where());
}

#[test]
fn test_in_list_literal() {
    let mut qb = QueryBuilder::new();
    qb.from("student").and_in("status", [1, 2, 3]);
    assert_eq!(
        qb.to_sql().unwrap(),
        "SELECT *\nFROM \"student\"\nWHERE ( \"status\" IN (1,2,3) )"
    );
}

#[test]
fn test_in_list_dialect_escaping() {
    let mut qb = QueryBuilder::with_dialect(Dialect::MySql);
    qb.from("t").and_in("name", [r"a\b"]);
    assert!(qb.to_sql().unwrap().ends_with(r#"( "name" IN ('a\\b') )"#));
}

#[test]
fn test_order_and_pagination() {
    let mut qb = QueryBuilder::new();
    qb.from("student")
        .order_by("created_at", Order::Desc)
        .order_by("name", None)
        .paginate(2, 20);
    assert_eq!(
        qb.to_sql().unwrap(),
        "SELECT *\nFROM \"student\"\nORDER BY \"created_at\" DESC,\"name\"\nLIMIT 20 OFFSET 20"
    );
}

#[test]
fn test_offset_without_limit_per_dialect() {
    let mut qb = QueryBuilder::with_dialect(Dialect::Postgres);
    qb.from("t").offset(5);
    assert!(qb.to_sql().unwrap().ends_with("\nOFFSET 5"));

    let mut qb = QueryBuilder::with_dialect(Dialect::Sqlite);
    qb.from("t").offset(5);
    assert!(qb.to_sql().unwrap().ends_with("\nLIMIT -1 OFFSET 5"));
}

#[test]
fn test_count_sql() {
    let mut qb = QueryBuilder::new();
    qb.from("student")
        .and_eq("dorm_id", 1)
        .order_by("name", None)
        .paginate(1, 20);
    let built = qb.compile(true).unwrap();
    assert_eq!(
        built.sql(),
        "SELECT COUNT(*)\nFROM \"student\"\nWHERE ( \"dorm_id\" = ? )"
    );
}

#[test]
fn test_group_by_having() {
    let mut qb = QueryBuilder::new();
    qb.select("dorm_id, COUNT(*) AS n")
        .from("student")
        .group_by("dorm_id")
        .and_having(Condition::raw("COUNT(*) > ?", [5]))
        .or_having(Condition::raw_sql("COUNT(*) = 1"));
    let built = qb.compile_retained(false).unwrap();
    assert_eq!(
        built.sql(),
        "SELECT dorm_id, COUNT(*) AS n\nFROM \"student\"\nGROUP BY \"dorm_id\"\nHAVING ( COUNT(*) > ? ) OR ( COUNT(*) = 1 )"
    );
    assert_eq!(built.params(), &[Value::Int(5)]);
}

#[test]
fn test_count_with_group_by_wraps_subquery() {
    let mut qb = QueryBuilder::new();
    qb.from("student").group_by("dorm_id");
    let built = qb.compile(true).unwrap();
    assert_eq!(
        built.sql(),
        "SELECT COUNT(*) FROM (SELECT 1 FROM \"student\" GROUP BY \"dorm_id\") AS t"
    );
}

#[test]
fn test_raw_condition_mismatch_fails_compile() {
    let mut qb = QueryBuilder::new();
    qb.from("t").and_where(Condition::raw("a = ? AND b = ?", [1]));
    assert!(matches!(qb.compile(false), Err(OrmError::Validation(_))));
}

#[test]
fn test_clear() {
    let mut qb = QueryBuilder::new();
    qb.from("t").and_eq("a", 1).limit(3);
    qb.clear();
    assert_eq!(qb.to_sql().unwrap(), "SELECT *\nFROM ");
}

#[test]
fn test_insert_builder() {
    let mut ib = InsertBuilder::new("student");
    ib.set("name", "Ann").set("dorm_id", 2);
    let built = ib.build().unwrap();
    assert_eq!(
        built.sql(),
        "INSERT INTO \"student\" (\"dorm_id\", \"name\") VALUES (?, ?)"
    );
    assert_eq!(built.params(), &[Value::Int(2), Value::from("Ann")]);
}

#[test]
fn test_insert_default_values() {
    let ib = InsertBuilder::new("dorm");
    assert_eq!(
        ib.to_sql().unwrap(),
        "INSERT INTO \"dorm\" DEFAULT VALUES"
    );
}

#[test]
fn test_update_builder() {
    let mut ub = UpdateBuilder::new("student");
    ub.set_row(&Row::new().with("name", "Bo")).and_eq("id", 7);
    let built = ub.build().unwrap();
    assert_eq!(
        built.sql(),
        "UPDATE \"student\" SET \"name\" = ? WHERE ( \"id\" = ? )"
    );
    assert_eq!(built.params(), &[Value::from("Bo"), Value::Int(7)]);
}

#[test]
fn test_update_without_where_is_rejected() {
    let mut ub = UpdateBuilder::new("student");
    ub.set("name", "Bo");
    let err = ub.build().unwrap_err();
    assert!(err.is_illegal_update());
}

#[test]
fn test_update_without_set_is_rejected() {
    let mut ub = UpdateBuilder::new("student");
    ub.and_eq("id", 1);
    assert!(ub.build().unwrap_err().is_illegal_update());
}

#[test]
fn test_delete_builder() {
    let mut db = DeleteBuilder::new("membership");
    db.and_eq("student_id", 1).and_in("club_id", [2, 3]);
    assert_eq!(
        db.to_sql().unwrap(),
        "DELETE FROM \"membership\" WHERE ( \"student_id\" = ? ) AND ( \"club_id\" IN (2,3) )"
    );
}

#[test]
fn test_delete_without_where_is_rejected() {
    let db = DeleteBuilder::new("student");
    assert!(db.build().unwrap_err().is_illegal_delete());
}
