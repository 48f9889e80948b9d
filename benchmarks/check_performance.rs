use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tokio::runtime::Runtime;

use selfcheck_guard::prompts::{pack_evidence, parse_yes_no};
use selfcheck_guard::verification::aggregate;
use selfcheck_guard::{CheckConfig, Claim, Completion, EvidenceChunk, HallucinationDetector, PromptConfig};

/// Completion that answers instantly, so the benchmark measures orchestration
struct InstantCompletion;

#[async_trait::async_trait]
impl Completion for InstantCompletion {
    async fn complete(&self, _prompt: &str, temperature: f32) -> anyhow::Result<String> {
        if temperature > 0.0 {
            Ok("The unemployment rate was 3.5% in March 2023.".to_string())
        } else {
            Ok("Yes".to_string())
        }
    }
}

/// Benchmark evidence packing over growing retrieval results
fn bench_evidence_packing(c: &mut Criterion) {
    let mut group = c.benchmark_group("evidence_packing");

    for chunk_count in [10, 100, 1_000].iter() {
        let chunks: Vec<EvidenceChunk> = (0..*chunk_count)
            .map(|i| {
                EvidenceChunk::new(
                    format!("Chunk {} reports the unemployment rate was 3.5% in March 2023.", i),
                    (i % 97) as f32 / 97.0,
                )
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("chunks", chunk_count), &chunks, |b, chunks| {
            b.iter(|| black_box(pack_evidence(black_box(chunks), 512)));
        });
    }

    group.finish();
}

/// Benchmark response parsing and aggregation
fn bench_parsing_and_aggregation(c: &mut Criterion) {
    c.bench_function("parse_yes_no", |b| {
        b.iter(|| black_box(parse_yes_no(black_box("  \"No, the report never mentions it.\" "))))
    });

    let flags: Vec<bool> = (0..64).map(|i| i % 3 != 0).collect();
    c.bench_function("aggregate_64", |b| b.iter(|| black_box(aggregate(black_box(&flags), 0.5))));
}

/// Benchmark a full consistency check against an instant completion
fn bench_consistency_check(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("consistency_check");
    group.significance_level(0.1).sample_size(20);

    for sample_count in [2, 5, 10].iter() {
        let checks = CheckConfig { sample_count: *sample_count, ..Default::default() };
        let detector = HallucinationDetector::new(Arc::new(InstantCompletion), &checks, &PromptConfig::default())
            .unwrap();
        let answer = Claim::from("The unemployment rate was 3.5%");

        let (detector, answer) = (&detector, &answer);
        group.bench_with_input(BenchmarkId::new("samples", sample_count), sample_count, |b, _| {
            b.to_async(&rt).iter(move || async move {
                black_box(detector.check(answer, "What was the unemployment rate?").await);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_evidence_packing,
    bench_parsing_and_aggregation,
    bench_consistency_check
);
criterion_main!(benches);
