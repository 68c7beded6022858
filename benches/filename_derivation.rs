//! Benchmarks for output filename derivation
//!
//! Every notification entry goes through this, so batches of a few hundred
//! recordings hit the season/episode regex and the sanitizer repeatedly.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dvrflow::derive::{derive_output_filename, sanitize_filename};
use dvrflow_common::Recording;

fn recording(title: &str, filename: &str, episode: Option<&str>, year: Option<i64>) -> Recording {
    Recording {
        uuid: "5c1f9a7e20b34d6f8a21".to_string(),
        status: "Completed OK".to_string(),
        filename: filename.to_string(),
        title: title.to_string(),
        channel_name: "ABC TV".to_string(),
        episode_disp: episode.map(str::to_string),
        copyright_year: year,
    }
}

fn bench_derive_output_filename(c: &mut Criterion) {
    let mut group = c.benchmark_group("derive_output_filename");

    let episodic = recording(
        "Grand Designs",
        "/recordings/Grand Designs.ts",
        Some("Season 12 - Episode 4"),
        None,
    );
    let film = recording(
        "The Third Man",
        "/recordings/The Third Man (1949).ts",
        Some("Classic feature"),
        Some(1949),
    );
    let bare = recording("News", "/recordings/News.ts", None, None);

    group.bench_function("season_episode", |b| {
        b.iter(|| derive_output_filename(black_box(&episodic)));
    });

    group.bench_function("copyright_year", |b| {
        b.iter(|| derive_output_filename(black_box(&film)));
    });

    group.bench_function("basename_only", |b| {
        b.iter(|| derive_output_filename(black_box(&bare)));
    });

    group.finish();
}

fn bench_sanitize_filename(c: &mut Criterion) {
    let mut group = c.benchmark_group("sanitize_filename");

    for len in [16usize, 64, 256] {
        let name: String = "Doctor Who: (Special) ".chars().cycle().take(len).collect();
        group.bench_with_input(BenchmarkId::from_parameter(len), &name, |b, name| {
            b.iter(|| sanitize_filename(black_box(name)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_derive_output_filename,
    bench_sanitize_filename
);
criterion_main!(benches);
