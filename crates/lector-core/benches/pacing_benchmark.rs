use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lector_core::{tokenize, PacingPolicy, PlaybackSpeed, PunctuationClass};

const PASSAGE: &str = "It was the best of times, it was the worst of times; it was the age \
    of wisdom, it was the age of foolishness. It was the epoch of belief: it was the epoch \
    of incredulity! It was the season of Light, it was the season of Darkness?\n";

fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize");

    // Roughly a paragraph, a chapter and a short book
    let sizes = vec![("paragraph", 1), ("chapter", 100), ("book", 2_000)];

    for (name, repeat) in sizes {
        let text = PASSAGE.repeat(repeat);
        group.bench_with_input(BenchmarkId::new("split_whitespace", name), &text, |b, text| {
            b.iter(|| black_box(tokenize(black_box(text))));
        });
    }

    group.finish();
}

fn bench_punctuation_class(c: &mut Criterion) {
    let words = vec!["times,", "foolishness.", "belief:", "Darkness?", "wisdom", "Light"];

    c.bench_function("punctuation_class", |b| {
        b.iter(|| {
            for word in &words {
                black_box(PunctuationClass::of(black_box(word)));
            }
        });
    });
}

fn bench_pace(c: &mut Criterion) {
    let policy = PacingPolicy::default();
    let words = tokenize(PASSAGE);
    let mut group = c.benchmark_group("pace");

    for value in [0.1_f32, 0.35, 1.0] {
        let speed = PlaybackSpeed::new(value).unwrap();
        group.bench_with_input(BenchmarkId::new("passage", value), &speed, |b, &speed| {
            b.iter(|| {
                for word in words.iter() {
                    black_box(policy.pace(black_box(word), black_box(speed)));
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tokenize, bench_punctuation_class, bench_pace);
criterion_main!(benches);
