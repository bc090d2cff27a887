use arorm::{Condition, Dialect, Order, QueryBuilder};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

/// SELECT with `n` equality conditions, a join and ordering.
fn build_select(n: usize, dialect: Dialect) -> QueryBuilder {
    let mut qb = QueryBuilder::with_dialect(dialect);
    qb.select("t1.id, t1.name")
        .from(("student", "t1"))
        .left_join(("memberships", "t2"), &[("t2.student_id", "t1.id")]);
    for i in 0..n {
        qb.and_eq(&format!("t1.col{i}"), i as i64);
    }
    qb.order_by("t1.name", Order::Asc).limit(20);
    qb
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_builder/compile");

    for n in [1, 5, 20, 100] {
        let qb = build_select(n, Dialect::Sqlite);
        group.bench_with_input(BenchmarkId::from_parameter(n), &qb, |b, qb| {
            b.iter(|| black_box(qb.compile_retained(false)));
        });
    }

    group.finish();
}

fn bench_build_and_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_builder/build_and_compile");

    for n in [1, 5, 20, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let mut qb = build_select(n, Dialect::Sqlite);
                black_box(qb.compile(false))
            });
        });
    }

    group.finish();
}

fn bench_in_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_builder/in_list");

    for n in [5, 50, 500] {
        let values: Vec<i64> = (0..n).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |b, values| {
            b.iter(|| {
                let condition = Condition::in_list("id", values.iter().copied());
                black_box(condition.to_sql(Dialect::Sqlite))
            });
        });
    }

    group.finish();
}

fn bench_dialect_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_builder/dialect_filter");
    let (sql, _) = build_select(20, Dialect::Postgres)
        .compile(false)
        .expect("valid query")
        .into_parts();

    for dialect in [Dialect::Sqlite, Dialect::Postgres, Dialect::MySql] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{dialect:?}")),
            &sql,
            |b, sql| b.iter(|| black_box(dialect.filter(sql).len())),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_compile,
    bench_build_and_compile,
    bench_in_list,
    bench_dialect_filter
);
criterion_main!(benches);
