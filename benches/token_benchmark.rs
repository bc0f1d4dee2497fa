use clarity_api::models::LicenseTier;
use clarity_api::services::stripe::{sign_payload, verify_signature};
use clarity_api::tokens;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

fn benchmark_tokens(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokens");

    group.bench_function("secure_token", |b| b.iter(tokens::secure_token));

    group.bench_function("license_key", |b| {
        b.iter(|| tokens::license_key(black_box(LicenseTier::Pro)))
    });

    group.finish();
}

fn benchmark_webhook_signature(c: &mut Criterion) {
    // Roughly the size of a checkout.session.completed event
    let payload = vec![b'x'; 4096];
    let secret = "whsec_bench";
    let now = chrono::Utc::now();
    let timestamp = now.timestamp();
    let header = sign_payload(&payload, timestamp, secret).expect("HMAC accepts any key length");

    c.bench_function("verify_webhook_signature", |b| {
        b.iter(|| verify_signature(black_box(&payload), black_box(&header), secret, now))
    });
}

criterion_group!(benches, benchmark_tokens, benchmark_webhook_signature);
criterion_main!(benches);
