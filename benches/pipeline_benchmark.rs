//! Pipeline benchmarks
//!
//! Verifies the latency budget on the hot path: a full `process` call is
//! CPU-bound (hashing, regex, arithmetic) and must stay well inside the
//! 5 ms soft budget on realistic payloads.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mirage_core::{config, DeceptionFactory, Orchestrator, Request, TrackingToken};

/// Realistic request corpus: benign traffic and the common attack shapes.
fn payloads() -> Vec<(&'static str, Request)> {
    vec![
        (
            "benign_small",
            Request::builder("/api/profile")
                .timestamp(1.0)
                .source_address("203.0.113.10")
                .user_agent("Mozilla/5.0 (X11; Linux x86_64)")
                .param("user", "john")
                .param("action", "view")
                .build(),
        ),
        (
            "benign_form",
            Request::builder("/api/register")
                .timestamp(1.0)
                .source_address("203.0.113.11")
                .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X)")
                .body(benign_form_body())
                .build(),
        ),
        (
            "sqli_union",
            Request::builder("/api/search")
                .timestamp(1.0)
                .source_address("203.0.113.12")
                .user_agent("sqlmap/1.7")
                .param("q", "1 UNION SELECT password FROM users--")
                .build(),
        ),
        (
            "xss_event",
            Request::builder("/api/comment")
                .timestamp(1.0)
                .source_address("203.0.113.13")
                .user_agent("curl/8.0")
                .body("<img src=x onerror=alert(document.cookie)>")
                .build(),
        ),
        (
            "path_traversal",
            Request::builder("/api/files/read")
                .timestamp(1.0)
                .source_address("203.0.113.14")
                .user_agent("curl/8.0")
                .param("path", "../../etc/passwd")
                .build(),
        ),
        (
            "mixed_attack",
            Request::builder("/api/render")
                .timestamp(1.0)
                .source_address("203.0.113.15")
                .user_agent("curl/8.0")
                .param("user", "' OR 1=1--")
                .param("cb", "<script>alert(1)</script>")
                .param("file", "../../etc/passwd")
                .param("cmd", "; cat /etc/passwd")
                .build(),
        ),
    ]
}

fn benign_form_body() -> String {
    let mut body = String::with_capacity(600);
    body.push_str("username=john_doe_123&");
    body.push_str("email=john.doe@example.com&");
    body.push_str("first_name=John&last_name=Doe&");
    body.push_str("address=123 Main Street, Apt 4B&city=Springfield&state=IL&zip=62704&");
    body.push_str("bio=Backend developer, ten years of web services and infrastructure.&");
    body.push_str("preferences=dark_mode,notifications,weekly_digest");
    body
}

fn bench_process(c: &mut Criterion) {
    let orchestrator = Orchestrator::with_defaults().expect("builtin config");
    let corpus = payloads();

    let mut group = c.benchmark_group("process");
    for (name, request) in &corpus {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(name), request, |b, req| {
            b.iter(|| black_box(orchestrator.process(req)));
        });
    }
    group.finish();
}

fn bench_config_load(c: &mut Criterion) {
    c.bench_function("config_load_builtin", |b| {
        b.iter(|| black_box(config::load_default().unwrap()));
    });
}

fn bench_payload_build(c: &mut Criterion) {
    let config = config::load_default().unwrap();
    let scenario = config
        .policies
        .scenarios
        .iter()
        .find(|s| s.template_id == "sql_honeypot")
        .unwrap();
    let strategy = config
        .policies
        .strategies
        .iter()
        .find(|s| s.name == scenario.counter_strategy)
        .unwrap();
    let token = TrackingToken::from_bytes([17u8; 16]);

    c.bench_function("sql_honeypot_high_tier", |b| {
        b.iter(|| {
            black_box(
                DeceptionFactory::build(scenario, strategy.high, &token, 1.0).unwrap(),
            )
        });
    });
}

criterion_group!(benches, bench_process, bench_config_load, bench_payload_build);
criterion_main!(benches);
