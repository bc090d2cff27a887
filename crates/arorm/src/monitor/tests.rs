use super::*;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_query_type_detection() {
    assert_eq!(QueryType::from_sql("SELECT * FROM student"), QueryType::Select);
    assert_eq!(QueryType::from_sql("  select * FROM student"), QueryType::Select);
    assert_eq!(
        QueryType::from_sql("WITH cte AS (SELECT 1) SELECT * FROM cte"),
        QueryType::Select
    );
    assert_eq!(
        QueryType::from_sql("WITH gone AS (SELECT id FROM car) DELETE FROM car WHERE id IN (SELECT id FROM gone)"),
        QueryType::Delete
    );
    assert_eq!(
        QueryType::from_sql("INSERT INTO student (name) VALUES (?)"),
        QueryType::Insert
    );
    assert_eq!(QueryType::from_sql("UPDATE student SET name = ?"), QueryType::Update);
    assert_eq!(
        QueryType::from_sql("-- cascade\nDELETE FROM car WHERE student_id = ?"),
        QueryType::Delete
    );
    assert_eq!(
        QueryType::from_sql("WITH x AS (SELECT ')' AS p) UPDATE car SET name = (SELECT p FROM x)"),
        QueryType::Update
    );
    assert_eq!(QueryType::from_sql("CREATE TABLE t (id INT)"), QueryType::Other);
}

#[test]
fn test_returning_clause_yields_rows() {
    assert!(QueryType::yields_rows("SELECT 1"));
    assert!(QueryType::yields_rows("INSERT INTO dorm (name) VALUES (?) RETURNING id"));
    assert!(QueryType::yields_rows("delete from car where id = ? returning *"));
    assert!(!QueryType::yields_rows("INSERT INTO dorm (name) VALUES (?)"));
    assert!(!QueryType::yields_rows("UPDATE car SET name = 'returning' WHERE id = ?"));
    assert!(!QueryType::yields_rows(r#"UPDATE car SET "returning" = 1"#));
    assert!(!QueryType::yields_rows(
        "WITH gone AS (DELETE FROM car RETURNING id) INSERT INTO log SELECT id FROM gone"
    ));
}

#[test]
fn test_tracing_monitor_truncation() {
    let monitor = TracingMonitor::new().max_sql_length(10);
    assert_eq!(monitor.truncate_sql("SELECT * FROM student"), "SELECT * F...");
    assert_eq!(monitor.truncate_sql("SELECT 1"), "SELECT 1");
    assert_eq!(
        TracingMonitor::new().no_truncate().truncate_sql(&"x".repeat(300)).len(),
        300
    );
}

#[test]
fn test_truncate_respects_char_boundary() {
    assert_eq!(truncate_sql_bytes("héllo", 2), "h");
}

#[test]
fn test_error_result_is_truncated() {
    let QueryResult::Error(msg) = QueryResult::error("e".repeat(1000)) else {
        panic!("expected an error result");
    };
    assert_eq!(msg.len(), 515);
}

#[test]
fn test_stats_monitor() {
    let stats = StatsMonitor::new();
    let select = QueryContext::new("SELECT * FROM student", 0);
    let insert = QueryContext::new("INSERT INTO student (name) VALUES (?)", 1);

    stats.on_query_complete(&select, Duration::from_millis(10), &QueryResult::Rows(3));
    stats.on_query_complete(&select, Duration::from_millis(50), &QueryResult::Rows(1));
    stats.on_query_complete(
        &insert,
        Duration::from_millis(5),
        &QueryResult::error("constraint failed"),
    );
    stats.on_cache_hit(&select);
    stats.on_cache_miss(&select);

    let snapshot = stats.stats();
    assert_eq!(snapshot.total_queries, 3);
    assert_eq!(snapshot.select_count, 2);
    assert_eq!(snapshot.insert_count, 1);
    assert_eq!(snapshot.failed_queries, 1);
    assert_eq!(snapshot.max_duration, Duration::from_millis(50));
    assert_eq!(snapshot.total_duration, Duration::from_millis(65));
    assert_eq!(snapshot.slowest_query.as_deref(), Some("SELECT * FROM student"));
    assert_eq!(snapshot.cache_hits, 1);
    assert_eq!(snapshot.cache_misses, 1);

    stats.reset();
    assert_eq!(stats.stats(), QueryStats::default());
}

#[test]
fn test_composite_monitor_fans_out() {
    let a = Arc::new(StatsMonitor::new());
    let b = Arc::new(StatsMonitor::new());
    let composite = CompositeMonitor::new()
        .add(a.clone())
        .add_arc(b.clone())
        .add(NoopMonitor);
    assert_eq!(composite.len(), 3);

    let ctx = QueryContext::new("DELETE FROM car WHERE id = ?", 1);
    composite.on_query_complete(&ctx, Duration::from_millis(1), &QueryResult::Affected(1));
    composite.on_cache_hit(&ctx);

    assert_eq!(a.stats().delete_count, 1);
    assert_eq!(b.stats().delete_count, 1);
    assert_eq!(b.stats().cache_hits, 1);
}
