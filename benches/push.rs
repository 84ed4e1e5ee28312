//! Performance benchmarks for a3s-audit
//!
//! Run with: cargo bench

use a3s_audit::{AccessLog, AuditPipeline, LogEntry, MemorySink, OperationLog, PipelineConfig};
use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;

fn sample_operation(i: usize) -> OperationLog {
    OperationLog::new(format!("trace-{}", i), "u-1", "1", "POST", "/api/documents", 201, 12)
        .with_source("document")
}

fn bench_entry_creation(c: &mut Criterion) {
    c.bench_function("OperationLog::new", |b| {
        b.iter(|| sample_operation(1));
    });

    c.bench_function("LogEntry serialize", |b| {
        let entry: LogEntry = AccessLog::new("t-1", "GET", "/api/users", 200, 3).into();
        b.iter(|| serde_json::to_vec(&entry).unwrap());
    });
}

fn bench_push_live(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    // Workers drain on the runtime threads while the bench thread pushes
    let pipeline = rt.block_on(async {
        let pipeline =
            AuditPipeline::new(PipelineConfig::new(64, 1), Arc::new(MemorySink::new())).unwrap();
        pipeline.start().await.unwrap();
        pipeline
    });

    c.bench_function("push (live pipeline)", |b| {
        b.iter(|| pipeline.push_operation(sample_operation(0)));
    });

    rt.block_on(pipeline.stop());
}

fn bench_push_throughput(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("push_throughput");
    for count in [10, 100, 1000] {
        group.bench_function(format!("{} entries", count), |b| {
            b.to_async(&rt).iter(|| async move {
                let sink = Arc::new(MemorySink::new());
                let pipeline =
                    AuditPipeline::new(PipelineConfig::new(count, 4), sink.clone()).unwrap();
                pipeline.start().await.unwrap();
                for i in 0..count {
                    pipeline.push_operation(sample_operation(i));
                }
                pipeline.stop().await;
                sink.total().await
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_entry_creation,
    bench_push_live,
    bench_push_throughput,
);
criterion_main!(benches);
