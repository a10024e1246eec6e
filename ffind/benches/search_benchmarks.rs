#![allow(unused_must_use)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ffind::{run_to, Dialect, Pattern, PatternFlags, SearchConfig};
use std::{fs, io, path::Path};
use tempfile::tempdir;

fn create_test_tree(root: &Path, width: usize, depth: usize) -> io::Result<()> {
    if depth == 0 {
        return Ok(());
    }
    for i in 0..width {
        let dir = root.join(format!("dir_{}", i));
        fs::create_dir(&dir)?;
        for j in 0..8 {
            fs::write(dir.join(format!("file_{}.txt", j)), "")?;
        }
        fs::write(dir.join(format!("module_{}.rs", i)), "")?;
        create_test_tree(&dir, width, depth - 1)?;
    }
    Ok(())
}

fn create_base_config(root: &Path) -> SearchConfig {
    SearchConfig {
        roots: vec![root.to_path_buf()],
        pattern: Some("*.rs".to_string()),
        thread_count: 1,
        ..SearchConfig::default()
    }
}

fn bench_dialects(c: &mut Criterion) {
    let candidates: Vec<String> = (0..1000)
        .map(|i| format!("./src/component_{}/sub/module_{}.rs", i % 37, i))
        .collect();

    let patterns = [
        ("*/module_*.rs", Dialect::Glob),
        (r"*/module_\*.rs", Dialect::GlobEscaped),
        ("module_", Dialect::Literal),
        (r"/module_[0-9]*\.rs$", Dialect::PosixBasic),
        (r"/module_[0-9]+\.rs$", Dialect::PosixExtended),
        (r"(?<=/)module_\d+\.rs$", Dialect::Pcre),
        (r"/module_\d+\.rs$", Dialect::JavaScript),
    ];

    let mut group = c.benchmark_group("Dialects");
    for (text, dialect) in patterns {
        let pattern = Pattern::compile(text, dialect, PatternFlags::default()).unwrap();
        group.bench_function(dialect.name(), |b| {
            b.iter(|| {
                candidates
                    .iter()
                    .filter(|candidate| pattern.is_match(black_box(candidate)))
                    .count()
            })
        });
    }
    group.finish();
}

fn bench_thread_scaling(c: &mut Criterion) -> io::Result<()> {
    let dir = tempdir()?;
    create_test_tree(dir.path(), 6, 3)?;

    let mut group = c.benchmark_group("Thread Scaling");
    for threads in [1, 2, 4, 8] {
        let config = SearchConfig {
            thread_count: threads,
            ..create_base_config(dir.path())
        };
        group.bench_function(format!("threads_{}", threads), |b| {
            b.iter(|| run_to(black_box(&config), io::sink()).unwrap())
        });
    }
    group.finish();
    Ok(())
}

fn bench_tree_scaling(c: &mut Criterion) -> io::Result<()> {
    let mut group = c.benchmark_group("Tree Scaling");
    for width in [2, 4, 8] {
        let dir = tempdir()?;
        create_test_tree(dir.path(), width, 3)?;
        let config = SearchConfig {
            thread_count: 4,
            ..create_base_config(dir.path())
        };
        group.bench_function(format!("width_{}", width), |b| {
            b.iter(|| run_to(black_box(&config), io::sink()).unwrap())
        });
    }
    group.finish();
    Ok(())
}

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = bench_dialects, bench_thread_scaling, bench_tree_scaling
}

#[test]
fn ensure_benchmarks_valid() {
    benches();
}

criterion_main!(benches);
