//! Diff engine benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use strata_core::vdom::{diff_trees, VNode};

fn table(rows: usize, highlight: usize) -> VNode {
    VNode::element("table").children((0..rows).map(|row| {
        let tr = VNode::element("tr").key(row.to_string());
        let tr = if row == highlight { tr.prop("class", "active") } else { tr };
        tr.child(VNode::element("td").child(VNode::text(row.to_string())))
            .child(VNode::element("td").child(VNode::text(format!("row {}", row))))
    }))
}

fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff");
    for rows in [10, 100, 1000] {
        let old = table(rows, 0);
        let same = old.clone();
        let moved = table(rows, rows / 2);

        group.bench_with_input(BenchmarkId::new("identical", rows), &rows, |b, _| {
            b.iter(|| diff_trees(black_box(&old), black_box(&same)))
        });
        group.bench_with_input(BenchmarkId::new("one_row_changed", rows), &rows, |b, _| {
            b.iter(|| diff_trees(black_box(&old), black_box(&moved)))
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let tree = table(1000, 0);
    c.bench_function("render_html_1000_rows", |b| b.iter(|| black_box(&tree).render_html()));
}

criterion_group!(benches, bench_diff, bench_render);
criterion_main!(benches);
