use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use lumen::*;

// Benchmark scenarios. All are valid with the built-in registry.

const TRAIL: &str = r#"
a = window(width=64, height=48)
b = a.mouse-motion
a.display.source = b
"#;

const LARGE_TRAIL: &str = r#"
/* full-HD window, wide brush */
main = window(width=1920, height=1080, title="bench")
trail = main.mouse-motion(decay=0.95, radius=12)
main.display.source = trail
"#;

fn scenarios() -> Vec<(&'static str, &'static str)> {
    vec![("trail", TRAIL), ("large_trail", LARGE_TRAIL)]
}

/// `n_windows` independent windows, each with its own trail.
fn generate_scaling_script(n_windows: usize) -> String {
    let mut script = String::new();
    for w in 0..n_windows {
        script.push_str(&format!("w{w} = window(width=32, height=32)\n"));
        script.push_str(&format!("t{w} = w{w}.mouse-motion(decay=0.8)\n"));
        script.push_str(&format!("w{w}.display.source = t{w}\n"));
    }
    script
}

fn registry() -> registry::Registry {
    registry::Registry::with_builtins().expect("built-in registry")
}

fn load(source: &str, registry: &registry::Registry) -> session::Session {
    session::Session::load(source, registry).expect("benchmark scenario must load")
}

// ── Parse ───────────────────────────────────────────────────────────────────

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (name, source) in scenarios() {
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, src| {
            b.iter(|| {
                let result = parser::parse(black_box(src));
                assert!(result.is_ok());
                result
            })
        });
    }
    for n in [8, 64, 256] {
        let script = generate_scaling_script(n);
        group.bench_with_input(BenchmarkId::new("windows", n), &script, |b, src| {
            b.iter(|| parser::parse(black_box(src)))
        });
    }
    group.finish();
}

// ── Load + build ────────────────────────────────────────────────────────────

fn bench_build(c: &mut Criterion) {
    let reg = registry();
    let mut group = c.benchmark_group("build");
    for n in [1, 16, 128] {
        let script = generate_scaling_script(n);
        group.bench_with_input(BenchmarkId::new("load", n), &script, |b, src| {
            b.iter(|| load(black_box(src), &reg))
        });
        group.bench_with_input(BenchmarkId::new("graph", n), &script, |b, src| {
            b.iter_batched(
                || load(src, &reg),
                |mut session| {
                    session.build().expect("graph must build");
                    session
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

// ── Frame update ────────────────────────────────────────────────────────────

fn bench_frame(c: &mut Criterion) {
    let reg = registry();
    let mut group = c.benchmark_group("frame");
    for (name, source) in scenarios() {
        let mut session = load(source, &reg);
        session.build().expect("graph must build");
        group.bench_function(BenchmarkId::new("update", name), |b| {
            b.iter(|| session.step(None).expect("frame"))
        });

        let mut profiler = profile::Profiler::new();
        group.bench_function(BenchmarkId::new("profiled", name), |b| {
            b.iter(|| session.step(Some(&mut profiler)).expect("frame"))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_build, bench_frame);
criterion_main!(benches);
