//! Criterion benchmarks for the producer output path: record parsing and
//! post-processing of a full day of minute bars and larger.

use chrono::{Duration, TimeZone};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use market_data::postprocess::finalize;
use market_data::producer::{parse_records, ParseOptions};
use market_data::request::{validate, HistoricalRequest};

fn make_stdout(n: usize) -> String {
    let base = chrono_tz::Asia::Kolkata
        .with_ymd_and_hms(2024, 1, 2, 9, 15, 0)
        .unwrap();
    let mut out = String::with_capacity(n * 64);
    out.push_str("Fetching RELIANCE from NSE,BSE\n");
    for i in 0..n {
        let ts = base + Duration::minutes(i as i64);
        let close = 2500.0 + (i as f64 * 0.1).sin() * 10.0;
        out.push_str(&format!(
            "DATA:{},{:.2},{:.2},{:.2},{:.2},{}\n",
            ts.format("%Y-%m-%d %H:%M:%S"),
            close - 0.5,
            close + 1.5,
            close - 1.5,
            close,
            10_000 + i % 5_000
        ));
    }
    out
}

fn bench_parse_records(c: &mut Criterion) {
    let descriptor = validate(&HistoricalRequest::new("RELIANCE")).unwrap();
    let options = ParseOptions::default();
    let mut group = c.benchmark_group("parse_records");

    for n in [375usize, 3_750, 37_500] {
        let stdout = make_stdout(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &stdout, |b, stdout| {
            b.iter(|| parse_records(black_box(stdout), &descriptor, &options).unwrap())
        });
    }
    group.finish();
}

fn bench_finalize(c: &mut Criterion) {
    let descriptor = validate(&HistoricalRequest::new("RELIANCE")).unwrap();
    let parsed = parse_records(&make_stdout(3_750), &descriptor, &ParseOptions::default()).unwrap();

    c.bench_function("finalize_3750", |b| {
        b.iter(|| finalize(black_box(parsed.records.clone()), &descriptor, 15))
    });
}

criterion_group!(benches, bench_parse_records, bench_finalize);
criterion_main!(benches);
