use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cibrule::{parse_rule, validate, BoolExpr};

/// `n` date-spec and typed comparisons, a quarter of them invalid.
fn build_tree(n: usize) -> BoolExpr {
    let parts: Vec<String> = (0..n)
        .map(|i| match i % 4 {
            0 => format!("date-spec hours=9-16 weekdays=1-5 months={}", i % 12 + 1),
            1 => format!("attr{i} gt version 1.{i}.0"),
            2 => format!("date in_range 2014-06-26 to duration weeks={i}"),
            _ => format!("date-spec hours={} bogus=1", 20 + i),
        })
        .collect();
    parse_rule(&parts.join(" and "), true, true).unwrap()
}

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");

    for &n in &[4, 20, 100] {
        let tree = build_tree(n);
        group.bench_function(&format!("{n}_expressions"), |b| {
            b.iter(|| validate(black_box(&tree), true, true, true));
        });
        group.bench_function(&format!("{n}_expressions_restricted"), |b| {
            b.iter(|| validate(black_box(&tree), false, false, false));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_validate);
criterion_main!(benches);
