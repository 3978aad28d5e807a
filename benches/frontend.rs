mod common;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use brainrot::{lexer, parser};

/// Copy of `source` with a stray `@` after every statement, so the lexer
/// records one diagnostic per `;` and keeps going.
fn with_stray_characters(source: &str) -> String {
    source.replace(';', "; @")
}

fn bench_scan(c: &mut Criterion) {
    for (tag, workloads) in common::workloads_by_tag() {
        let mut group = c.benchmark_group(format!("frontend_scan/{tag}"));
        for workload in &workloads {
            let clean = common::load_source(&workload.path);
            let noisy = with_stray_characters(&clean);
            assert!(
                !lexer::scan(&noisy).diagnostics.is_empty(),
                "{} has no statements to disturb",
                workload.name
            );

            group.throughput(Throughput::Bytes(clean.len() as u64));
            group.bench_with_input(BenchmarkId::new("clean", &workload.name), &clean, |b, src| {
                b.iter(|| black_box(lexer::scan(black_box(src))))
            });
            group.throughput(Throughput::Bytes(noisy.len() as u64));
            group.bench_with_input(
                BenchmarkId::new("diagnostics", &workload.name),
                &noisy,
                |b, src| {
                    b.iter(|| {
                        let scanned = lexer::scan(black_box(src));
                        black_box(scanned.diagnostics.len())
                    })
                },
            );
        }
        group.finish();
    }
}

fn bench_parse(c: &mut Criterion) {
    for (tag, workloads) in common::workloads_by_tag() {
        let mut group = c.benchmark_group(format!("frontend_parse/{tag}"));
        for workload in &workloads {
            let source = common::load_source(&workload.path);
            let tokens = lexer::scan(&source).tokens;
            group.throughput(Throughput::Elements(tokens.len() as u64));
            group.bench_with_input(BenchmarkId::from_parameter(&workload.name), &tokens, |b, tokens| {
                b.iter(|| {
                    let program = parser::parse_tokens(black_box(tokens.clone())).expect("parse");
                    black_box(program)
                })
            });
        }
        group.finish();
    }
}

criterion_group!(benches, bench_scan, bench_parse);
criterion_main!(benches);
