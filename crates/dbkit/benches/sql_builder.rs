use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use dbkit::{
    DialectSettings, HasColumnList, HasValueList, HasWhereClause, QueryBuilder, Renderable,
    SelectQuery,
};

/// SELECT `col0`,`col1`,... FROM `t` WHERE `col0` = @col0 AND `col1` = @col1 ...
fn build_select(qb: &QueryBuilder, n: usize) -> SelectQuery {
    let columns: Vec<String> = (0..n).map(|i| format!("col{i}")).collect();
    let f = qb.functions();
    let s = qb.settings();
    columns.iter().fold(qb.select("t").add(&columns), |query, column| {
        query.and_where(f.equals(&s.escape_column(column), &s.parameterize(column)))
    })
}

fn bench_to_sql(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/to_sql");
    let qb = QueryBuilder::new(DialectSettings::mysql());

    for n in [1, 5, 10, 50, 100] {
        let query = build_select(&qb, n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &query, |b, query| {
            b.iter(|| black_box(query.to_sql()));
        });
    }

    group.finish();
}

fn bench_build_and_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/build_and_render");
    let qb = QueryBuilder::new(DialectSettings::mysql());

    for n in [1, 5, 10, 50, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| black_box(build_select(&qb, n).to_sql()));
        });
    }

    group.finish();
}

fn bench_upsert(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/upsert");

    for (name, settings) in [
        ("mysql", DialectSettings::mysql()),
        ("postgres", DialectSettings::postgres()),
    ] {
        let qb = QueryBuilder::new(settings);
        let columns: Vec<String> = (0..20).map(|i| format!("col{i}")).collect();
        group.bench_function(name, |b| {
            b.iter(|| {
                let sql = qb
                    .insert("t")
                    .add_auto_param(&columns)
                    .odku()
                    .add_from_insert(["col0"])
                    .to_sql();
                black_box(sql)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_to_sql, bench_build_and_render, bench_upsert);
criterion_main!(benches);
