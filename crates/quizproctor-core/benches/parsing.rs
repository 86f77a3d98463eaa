use criterion::{black_box, criterion_group, criterion_main, Criterion};

use quizproctor_core::model::parse_time_limit_minutes;

fn bench_time_limit(c: &mut Criterion) {
    let mut group = c.benchmark_group("time_limit");

    let long_prefix = format!("{}45 phút", "thời gian làm bài ".repeat(20));

    group.bench_function("short", |b| {
        b.iter(|| parse_time_limit_minutes(black_box("10 phút")))
    });

    group.bench_function("empty", |b| b.iter(|| parse_time_limit_minutes(black_box(""))));

    group.bench_function("long_prefix", |b| {
        b.iter(|| parse_time_limit_minutes(black_box(&long_prefix)))
    });

    group.finish();
}

fn bench_quiz_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("quiz_parsing");

    let small_toml = generate_quiz_toml(10);
    let medium_toml = generate_quiz_toml(50);
    let large_toml = generate_quiz_toml(200);

    group.bench_function("10_questions", |b| {
        b.iter(|| {
            quizproctor_core::parser::parse_quiz_str(
                black_box(&small_toml),
                black_box("bench.toml".as_ref()),
            )
        })
    });

    group.bench_function("50_questions", |b| {
        b.iter(|| {
            quizproctor_core::parser::parse_quiz_str(
                black_box(&medium_toml),
                black_box("bench.toml".as_ref()),
            )
        })
    });

    group.bench_function("200_questions", |b| {
        b.iter(|| {
            quizproctor_core::parser::parse_quiz_str(
                black_box(&large_toml),
                black_box("bench.toml".as_ref()),
            )
        })
    });

    group.finish();
}

fn generate_quiz_toml(n: usize) -> String {
    let mut s = String::new();
    s.push_str(
        r#"[quiz]
id = "bench"
title = "Benchmark"
time_limit = "45 phút"
"#,
    );
    for i in 0..n {
        s.push_str(&format!(
            r#"
[[questions]]
prompt = "Question {i}: which option is correct?"
options = ["A{i}", "B{i}", "C{i}", "D{i}"]
correct_answer = "B{i}"
explanation = "B{i} is correct because it is the second option."
topics = ["bench", "topic-{i}"]
"#
        ));
    }
    s
}

criterion_group!(benches, bench_time_limit, bench_quiz_parsing);
criterion_main!(benches);
