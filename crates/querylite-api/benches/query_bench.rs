//! Query build and execution throughput against a MemoryStore.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use querylite::{Entity, MemoryStore, Query, TotalCount, TypedQuery};

#[path = "../tests/common/mod.rs"]
#[allow(dead_code)]
mod common;

use common::{schema, Member};

fn store_with(members: usize) -> MemoryStore {
    let store = MemoryStore::new(schema());
    for i in 0..members {
        let name = (i % 7 != 0).then(|| format!("member{}", i));
        let mut member = Member::new(name.as_deref(), (i % 90) as i32, None);
        store.persist(&mut member).expect("persist");
    }
    store
}

fn bench_build(c: &mut Criterion) {
    c.bench_function("query/build", |b| {
        b.iter(|| {
            let query = Query::select_from(Member::path())
                .filter(Member::AGE.gte(black_box(18)))
                .filter_all([Some(Member::USERNAME.is_not_null()), None])
                .order_by_all([Member::AGE.desc(), Member::USERNAME.asc().nulls_last()])
                .build();
            black_box(query);
        })
    });

    let query = Query::select_from(Member::path())
        .filter(Member::AGE.gte(18).and(Member::USERNAME.is_not_null()))
        .order_by(Member::AGE.desc())
        .build();
    let schema = schema();
    let text = query.to_string();
    c.bench_function("query/parse_jpql", |b| {
        b.iter(|| {
            let parsed = TypedQuery::<Member>::parse(&schema, black_box(&text)).expect("parse");
            black_box(parsed);
        })
    });
}

fn bench_fetch(c: &mut Criterion) {
    let mut group = c.benchmark_group("query/fetch");
    for size in [100, 1_000, 10_000] {
        let store = store_with(size);
        let query = Query::select_from(Member::path())
            .filter(Member::AGE.gte(30).and(Member::AGE.lt(60)))
            .order_by_all([Member::AGE.desc(), Member::USERNAME.asc().nulls_last()])
            .build();

        group.bench_with_input(BenchmarkId::new("sorted", size), &store, |b, store| {
            b.iter(|| black_box(query.fetch(store).expect("fetch")))
        });
        group.bench_with_input(BenchmarkId::new("page_with_total", size), &store, |b, store| {
            b.iter(|| {
                black_box(
                    query
                        .fetch_page(store, 10, 20, TotalCount::Compute)
                        .expect("page"),
                )
            })
        });
        group.bench_with_input(BenchmarkId::new("count", size), &store, |b, store| {
            b.iter(|| black_box(query.fetch_count(store).expect("count")))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_fetch);
criterion_main!(benches);
