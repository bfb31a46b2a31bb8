//! Benchmarks for name and custom uploader templates
//!
//! Covers `%` token rendering and `{...}` placeholder parsing/evaluation.

use chrono::DateTime;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use droplift_common::ResponseInfo;
use droplift_custom::engine::{Renderer, Scope};
use droplift_custom::syntax;
use droplift_naming::{Counters, NameContext, NameTemplate, DEFAULT_PATTERN};
use std::sync::Arc;

/// Literal text only (baseline)
const NAME_LITERAL: &str = "screenshot";

/// Date tokens with a counter
const NAME_DATED: &str = "%y-%mo-%d_%h-%mi-%s_%i{4}";

/// Mixed random, date and counter tokens
const NAME_MIXED: &str = "%mon2_%y%mo%d_%ra{8}_%rx{4}_%guid_%ib{36}";

const PLACEHOLDER_SIMPLE: &str = "https://up.example.com/{filename}";

const PLACEHOLDER_NESTED: &str =
    "{regex:{json:data.files[0].url}|https?://([^/]+)/(.+)|2}?ref={base64:{input}}";

const RESPONSE_URL: &str = "{json:data.link}";

fn context() -> NameContext {
    let now = DateTime::parse_from_rfc3339("2024-03-05T13:04:05+00:00").unwrap();
    NameContext::new(now, Arc::new(Counters::new())).with_seed(42)
}

fn bench_name_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("name_render");

    for (label, pattern) in [
        ("literal", NAME_LITERAL),
        ("default", DEFAULT_PATTERN),
        ("dated", NAME_DATED),
        ("mixed", NAME_MIXED),
    ] {
        let template = NameTemplate::compile(pattern);
        let mut ctx = context();
        group.throughput(Throughput::Bytes(pattern.len() as u64));
        group.bench_with_input(BenchmarkId::new("compiled", label), &template, |b, t| {
            b.iter(|| t.render(black_box(&mut ctx)));
        });
    }

    group.finish();
}

fn bench_name_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("name_compile");

    group.bench_function("mixed", |b| {
        b.iter(|| NameTemplate::compile(black_box(NAME_MIXED)));
    });

    group.finish();
}

fn bench_placeholder_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("placeholder_parse");

    for (label, template) in [
        ("simple", PLACEHOLDER_SIMPLE),
        ("nested", PLACEHOLDER_NESTED),
    ] {
        group.throughput(Throughput::Bytes(template.len() as u64));
        group.bench_with_input(BenchmarkId::new("template", label), &template, |b, t| {
            b.iter(|| syntax::parse(black_box(t)));
        });
    }

    group.finish();
}

fn bench_response_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("response_render");

    let response = ResponseInfo {
        status: 200,
        url: "https://up.example.com/api".into(),
        headers: vec![("Content-Type".into(), "application/json".into())],
        body: r#"{"data":{"link":"https://i.example.com/abc.png","files":[{"url":"https://i.example.com/abc.png"}]}}"#
            .into(),
    };
    let scope = Scope {
        file_name: "shot.png",
        input: "holiday",
        uploader_name: "Example",
        response: Some(&response),
    };

    for (label, template) in [("json", RESPONSE_URL), ("nested", PLACEHOLDER_NESTED)] {
        group.bench_with_input(BenchmarkId::new("template", label), &template, |b, t| {
            b.iter(|| Renderer::new(scope).render(black_box(t)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_name_render,
    bench_name_compile,
    bench_placeholder_parse,
    bench_response_render,
);

criterion_main!(benches);
